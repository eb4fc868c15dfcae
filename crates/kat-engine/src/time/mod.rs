//! Time subsystem.
//!
//! Provides stable, testable frame timing utilities without coupling to the runtime.
//! Intended usage:
//! - one `FrameClock` per render loop, fed by a `Clock`
//! - call `advance(clock.now())` once per presented frame

mod clock;
mod frame_clock;

pub use clock::{Clock, MonotonicClock};
pub use frame_clock::{FrameClock, FrameTime};
