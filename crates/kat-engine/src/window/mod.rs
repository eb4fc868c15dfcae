//! Windows and the render loop.
//!
//! [`Window`] drives frames over any [`WindowBackend`]. [`WinitBackend`] is
//! the desktop backend.

mod backend;
mod config;
mod desktop;
mod render_loop;

pub use backend::WindowBackend;
pub use config::WindowConfig;
pub use desktop::WinitBackend;
pub use render_loop::{LoopState, Window};
