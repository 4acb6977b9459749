//! A minimal Direct3D 12 renderer built around a frame-pacing protocol:
//! a ring of command allocators guarded by one monotonic fence, a swap
//! chain paced by its frame-latency waitable, and a single command list per
//! frame bracketed by back-buffer state transitions.
//!
//! The protocol in [`frame`] and [`renderer`] is generic over a
//! [`frame::Backend`]; `d3d12` provides the Windows implementation.

pub mod camera;
pub mod config;
#[cfg(windows)]
pub mod d3d12;
pub mod error;
pub mod frame;
#[cfg(windows)]
pub mod framework;
pub mod renderer;
pub mod ui;
pub mod vertex;

pub use config::{parse_args, Config};
pub use error::{Error, Result};
