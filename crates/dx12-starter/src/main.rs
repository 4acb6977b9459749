use anyhow::Context;
use env_logger::Builder;
use log::{info, warn, LevelFilter};

use dx12_starter::{parse_args, Config, Error};

fn main() -> anyhow::Result<()> {
    let config = match parse_args(std::env::args()) {
        Ok(config) => config,
        // prints help, version and usage errors the way clap formats them
        Err(Error::Args(e)) => e.exit(),
        Err(e) => return Err(e).context("failed to read the configuration"),
    };
    init_logging(&config);

    // change cwd so opening HLSL files will not fail
    match std::env::current_exe() {
        Ok(path) => {
            if let Some(dir) = path.parent() {
                if let Err(e) = std::env::set_current_dir(dir) {
                    warn!("failed to change the current working directory: {e}");
                }
            }
        }
        Err(e) => warn!("failed to get the path of this program: {e}"),
    }

    run(&config)
}

fn init_logging(config: &Config) {
    let mut builder = Builder::new();
    let level = if config.debug_layer_enabled() {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    builder.filter_level(level);
    // RUST_LOG still wins for anything it names
    builder.parse_default_env();
    builder.init();
}

#[cfg(windows)]
fn run(config: &Config) -> anyhow::Result<()> {
    use dx12_starter::{d3d12, framework};

    info!(
        "starting: {}x{}, {} frame slots, {} back buffers",
        config.client_width(),
        config.client_height(),
        config.frame_slot_count(),
        config.back_buffer_count()
    );

    framework::run(config, ".").context("renderer stopped with an error")?;

    if config.debug_layer_enabled() {
        if let Err(e) = d3d12::device::report_live_objects() {
            warn!("failed to report live objects: {e}");
        }
    }
    info!("exited cleanly");
    Ok(())
}

#[cfg(not(windows))]
fn run(_config: &Config) -> anyhow::Result<()> {
    info!("nothing to run on this platform");
    anyhow::bail!("dx12-starter requires Windows and Direct3D 12")
}
