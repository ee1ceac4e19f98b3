//! Utility Module
//!
//! - [`FrameTimer`]: frame delta time with a short averaging window

pub mod frame_timer;

pub use frame_timer::FrameTimer;
