//! The immediate-mode UI collaborator.
//!
//! The renderer does not know what the UI draws. It calls [`Ui::update`]
//! once per frame on the window thread, then [`Ui::render`] while the frame's
//! render-target pass is open, and records the returned draws after the
//! scene.

use std::time::{Duration, Instant};

use glam::Vec4;
use log::info;
use raw_window_handle::RawWindowHandle;

use crate::frame::{Backend, DrawCommand};
use crate::Result;

pub trait Ui<B: Backend> {
    /// Called once, after the device and the shader-visible heap exist.
    /// Descriptor 1 of `srv_heap` belongs to the UI.
    fn init(
        &mut self,
        window: RawWindowHandle,
        device: &B::Device,
        srv_heap: &B::DescriptorHeap,
    ) -> Result<()>;

    /// Starts a new UI frame and builds the widgets.
    fn update(&mut self);

    /// Draw data for the current UI frame.
    fn render(&mut self) -> Vec<DrawCommand>;

    /// Straight-alpha color the back buffer is cleared to.
    fn clear_color(&self) -> Vec4;
}

/// Frames per second, averaged over one-second windows.
#[derive(Debug)]
pub struct FpsCounter {
    window_start: Instant,
    frames: u32,
}

impl FpsCounter {
    const WINDOW: Duration = Duration::from_secs(1);

    pub fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            frames: 0,
        }
    }

    /// Counts a frame; returns the average once a full window has passed.
    pub fn tick(&mut self, now: Instant) -> Option<f64> {
        self.frames += 1;
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < Self::WINDOW {
            return None;
        }
        let fps = f64::from(self.frames) / elapsed.as_secs_f64();
        self.window_start = now;
        self.frames = 0;
        Some(fps)
    }
}

/// Minimal UI: no widgets, logs the frame rate once per second.
#[derive(Debug)]
pub struct DebugUi {
    clear_color: Vec4,
    fps: FpsCounter,
    initialized: bool,
}

impl DebugUi {
    pub fn new(clear_color: Vec4) -> Self {
        Self {
            clear_color,
            fps: FpsCounter::new(Instant::now()),
            initialized: false,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn set_clear_color(&mut self, color: Vec4) {
        self.clear_color = color;
    }
}

impl<B: Backend> Ui<B> for DebugUi {
    fn init(
        &mut self,
        _window: RawWindowHandle,
        _device: &B::Device,
        _srv_heap: &B::DescriptorHeap,
    ) -> Result<()> {
        self.initialized = true;
        self.fps = FpsCounter::new(Instant::now());
        Ok(())
    }

    fn update(&mut self) {
        if let Some(fps) = self.fps.tick(Instant::now()) {
            info!("{fps:.1} fps ({:.2} ms/frame)", 1000.0 / fps);
        }
    }

    fn render(&mut self) -> Vec<DrawCommand> {
        Vec::new()
    }

    fn clear_color(&self) -> Vec4 {
        self.clear_color
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::mock::Mock;

    #[test]
    fn fps_is_reported_once_per_window() {
        let start = Instant::now();
        let mut counter = FpsCounter::new(start);

        for i in 1..60 {
            assert_eq!(counter.tick(start + Duration::from_millis(i * 16)), None);
        }
        let fps = counter.tick(start + Duration::from_secs(1)).unwrap();

        assert!((fps - 60.0).abs() < 1e-9);
        assert_eq!(counter.tick(start + Duration::from_millis(1016)), None);
    }

    #[test]
    fn debug_ui_draws_nothing() {
        let mut ui = DebugUi::new(Vec4::new(0.1, 0.2, 0.3, 1.0));

        assert!(Ui::<Mock>::render(&mut ui).is_empty());
        assert_eq!(Ui::<Mock>::clear_color(&ui), Vec4::new(0.1, 0.2, 0.3, 1.0));
    }
}
