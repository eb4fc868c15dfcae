//! Core engine-facing contracts.
//!
//! This module defines the stable interface between the render loop and
//! application code.

mod app;

pub use app::{App, AppControl};
