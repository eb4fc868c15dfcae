//! Color model.
//!
//! Scope:
//! - color representation (straight RGBA, `f32` channels)
//! - named palette constants

pub mod color;
pub mod palette;

pub use color::Color;
