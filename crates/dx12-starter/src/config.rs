//! Settings loaded from `dx12-starter.toml`, overridden by command-line flags.

use std::path::{Path, PathBuf};

use clap::Parser;
use glam::Vec4;
use log::{debug, info};
use serde::Deserialize;

use crate::{Error, Result};

pub const DEFAULT_CONFIG_PATH: &str = "dx12-starter.toml";

/// Frame slots and back buffers must both stay in this range.
const BUFFER_COUNT_RANGE: std::ops::RangeInclusive<usize> = 2..=16;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub graphics: GraphicsConfig,
    pub debug: DebugConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "DX12 Starter".to_string(),
            width: 1280,
            height: 800,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct GraphicsConfig {
    /// Command allocators cycled by the frame ring.
    pub frame_slot_count: usize,
    pub back_buffer_count: usize,
    /// Straight alpha; premultiplied when the back buffer is cleared.
    pub clear_color: [f32; 4],
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            frame_slot_count: 3,
            back_buffer_count: 3,
            clear_color: [0.45, 0.55, 0.60, 1.0],
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    pub debug_layer: bool,
    pub gpu_validation: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            debug_layer: cfg!(debug_assertions),
            gpu_validation: false,
        }
    }
}

impl Config {
    pub fn client_width(&self) -> u32 {
        self.window.width
    }

    pub fn client_height(&self) -> u32 {
        self.window.height
    }

    pub fn title(&self) -> &str {
        &self.window.title
    }

    pub fn debug_layer_enabled(&self) -> bool {
        self.debug.debug_layer || self.debug.gpu_validation
    }

    pub fn gpu_validation_enabled(&self) -> bool {
        self.debug.gpu_validation
    }

    pub fn frame_slot_count(&self) -> usize {
        self.graphics.frame_slot_count
    }

    pub fn back_buffer_count(&self) -> usize {
        self.graphics.back_buffer_count
    }

    pub fn clear_color(&self) -> Vec4 {
        Vec4::from_array(self.graphics.clear_color)
    }

    /// Loads the file at `path`, or the defaults if it does not exist.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("config file not found at {path:?}, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })?;

        info!("loaded configuration from {path:?}");
        debug!("{config:?}");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(Error::InvalidConfig(format!(
                "window size {}x{} is empty",
                self.window.width, self.window.height
            )));
        }
        for (name, count) in [
            ("frame_slot_count", self.graphics.frame_slot_count),
            ("back_buffer_count", self.graphics.back_buffer_count),
        ] {
            if !BUFFER_COUNT_RANGE.contains(&count) {
                return Err(Error::InvalidConfig(format!(
                    "{name} = {count} is outside {BUFFER_COUNT_RANGE:?}"
                )));
            }
        }
        Ok(())
    }
}

/// Command-line flags. Each one overrides the matching value from the
/// config file.
#[derive(Parser, Debug)]
#[command(name = "dx12-starter", about = "Direct3D 12 starter renderer", long_about = None)]
struct Args {
    /// Path of the TOML config file.
    #[arg(long = "config", value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
    config_path: PathBuf,

    /// Client area width in pixels.
    #[arg(long)]
    width: Option<u32>,

    /// Client area height in pixels.
    #[arg(long)]
    height: Option<u32>,

    /// Turn off the D3D12 debug layer and GPU-based validation.
    #[arg(long)]
    no_debug_layer: bool,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(width) = self.width {
            config.window.width = width;
        }
        if let Some(height) = self.height {
            config.window.height = height;
        }
        if self.no_debug_layer {
            config.debug.debug_layer = false;
            config.debug.gpu_validation = false;
        }
    }
}

/// Parses `args` (program name first) into a validated [`Config`].
pub fn parse_args(args: impl Iterator<Item = String>) -> Result<Config> {
    let args = Args::try_parse_from(args)?;
    debug!("command line: {args:?}");

    let mut config = Config::load_from_path(&args.config_path)?;
    args.apply(&mut config);

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        std::iter::once("dx12-starter".to_string())
            .chain(list.iter().map(|s| s.to_string()))
            .collect::<Vec<_>>()
            .into_iter()
    }

    fn temp_config(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "dx12-starter-{}-{name}.toml",
            std::process::id()
        ));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn defaults_match_the_frame_protocol() {
        let config = Config::default();

        assert_eq!(config.frame_slot_count(), 3);
        assert_eq!(config.back_buffer_count(), 3);
        assert_eq!((config.client_width(), config.client_height()), (1280, 800));
        assert_eq!(config.clear_color(), Vec4::new(0.45, 0.55, 0.60, 1.0));
        assert!(!config.gpu_validation_enabled());
        config.validate().unwrap();
    }

    #[test]
    fn partial_toml_keeps_the_other_defaults() {
        let config: Config = toml::from_str(
            r#"
            [window]
            width = 1920

            [graphics]
            frame_slot_count = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.client_width(), 1920);
        assert_eq!(config.client_height(), 800);
        assert_eq!(config.frame_slot_count(), 2);
        assert_eq!(config.back_buffer_count(), 3);
        assert_eq!(config.debug, DebugConfig::default());
    }

    #[test]
    fn gpu_validation_implies_the_debug_layer() {
        let mut config = Config::default();
        config.debug.debug_layer = false;
        config.debug.gpu_validation = true;

        assert!(config.debug_layer_enabled());
    }

    #[test]
    fn flags_override_the_file() {
        let path = temp_config(
            "flags",
            "[window]\nwidth = 640\nheight = 480\n[debug]\ndebug_layer = true\n",
        );

        let config = parse_args(args(&[
            "--config",
            path.to_str().unwrap(),
            "--height",
            "600",
            "--no-debug-layer",
        ]))
        .unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!((config.client_width(), config.client_height()), (640, 600));
        assert!(!config.debug_layer_enabled());
    }

    #[test]
    fn missing_file_uses_defaults() {
        let config = parse_args(args(&["--config", "does/not/exist.toml"])).unwrap();

        assert_eq!(config.window, WindowConfig::default());
    }

    #[test]
    fn bad_input_is_rejected() {
        assert!(parse_args(args(&["--width"])).is_err());
        assert!(parse_args(args(&["--width", "wide"])).is_err());
        assert!(parse_args(args(&["--fullscreen"])).is_err());
        assert!(parse_args(args(&["--config", "does/not/exist.toml", "--width", "0"])).is_err());

        let path = temp_config("slots", "[graphics]\nframe_slot_count = 1\n");
        let err = parse_args(args(&["--config", path.to_str().unwrap()])).unwrap_err();
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(err, Error::InvalidConfig(_)), "{err}");
    }

    #[test]
    fn unknown_flags_are_command_line_errors() {
        let err = parse_args(args(&["--fullscreen"])).unwrap_err();

        assert!(matches!(err, Error::Args(_)), "{err}");
    }

    #[test]
    fn help_is_reported_instead_of_running() {
        let err = parse_args(args(&["--help"])).unwrap_err();

        match err {
            Error::Args(e) => assert_eq!(e.kind(), clap::error::ErrorKind::DisplayHelp),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn malformed_toml_names_the_file() {
        let path = temp_config("malformed", "[window\nwidth = ");

        let err = Config::load_from_path(&path).unwrap_err();
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(err, Error::Config { path: p, .. } if p == path));
    }
}
