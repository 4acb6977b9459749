//! Error types for the starter renderer.

use std::path::PathBuf;

use thiserror::Error;

/// Every failure the renderer can report.
///
/// None of these are retried: creation errors abort initialization and a
/// removed device ends the frame loop.
#[derive(Error, Debug)]
pub enum Error {
    /// No hardware adapter supports Direct3D 12 at feature level 11.0
    #[error("no hardware adapter supports Direct3D 12 at feature level 11.0")]
    NoAdapter,

    /// A Win32 / Direct3D call failed
    #[cfg(windows)]
    #[error(transparent)]
    Windows(#[from] windows::core::Error),

    /// The GPU device was removed or reset; fatal
    #[error("the GPU device was removed: {reason}")]
    DeviceRemoved { reason: String },

    /// An OS wait on a fence or swap-chain event failed
    #[error("waiting on a synchronization event failed: {0}")]
    WaitFailed(String),

    /// A frame was requested while the back buffers were released for a resize
    #[error("back buffers are released; no render target is available for this frame")]
    RenderTargetsReleased,

    /// Shader compilation failed
    #[error("failed to compile {path:?}: {message}")]
    Shader { path: PathBuf, message: String },

    /// The window system failed
    #[error("window error: {0}")]
    Window(String),

    /// The configuration file could not be parsed
    #[error("failed to parse {path:?}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// The command line could not be parsed, or help was requested
    #[error(transparent)]
    Args(#[from] clap::Error),

    /// A configuration value or command-line argument is invalid
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A backend failure without a richer error type
    #[error("backend error: {0}")]
    Backend(String),
}

impl Error {
    /// Whether the device is gone and the process should stop rendering.
    pub fn is_device_removed(&self) -> bool {
        matches!(self, Self::DeviceRemoved { .. })
    }
}

/// Result type alias using the renderer's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
