//! Window and event loop.

use std::path::{Path, PathBuf};

use log::{error, info};
use raw_window_handle::{HasWindowHandle, RawWindowHandle};
use windows::Win32::Foundation::HWND;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use crate::d3d12::{create_renderer, D3d12, Renderer};
use crate::ui::{DebugUi, Ui};
use crate::{Config, Error, Result};

// fields drop in order: UI, then the renderer (drains the GPU), then the window
struct State {
    ui: DebugUi,
    renderer: Renderer,
    window: Window,
}

impl State {
    fn build(config: &Config, shader_dir: &Path, event_loop: &ActiveEventLoop) -> Result<Self> {
        let attributes = Window::default_attributes()
            .with_title(config.title())
            .with_inner_size(PhysicalSize::new(
                config.client_width(),
                config.client_height(),
            ));
        let window = event_loop
            .create_window(attributes)
            .map_err(|e| Error::Window(e.to_string()))?;

        let raw_handle = window
            .window_handle()
            .map_err(|e| Error::Window(e.to_string()))?
            .as_raw();
        let RawWindowHandle::Win32(handle) = raw_handle else {
            return Err(Error::Window(format!(
                "unsupported window handle {raw_handle:?}"
            )));
        };
        let hwnd = HWND(handle.hwnd.get() as *mut std::ffi::c_void);

        let size = window.inner_size();
        let renderer = create_renderer(config, hwnd, size.width, size.height, shader_dir)?;

        let mut ui = DebugUi::new(config.clear_color());
        Ui::<D3d12>::init(&mut ui, raw_handle, renderer.device(), renderer.srv_heap())?;

        Ok(Self {
            ui,
            renderer,
            window,
        })
    }

    fn redraw(&mut self) -> Result<()> {
        let size = self.window.inner_size();
        if size.width == 0 || size.height == 0 {
            // minimized
            return Ok(());
        }

        Ui::<D3d12>::update(&mut self.ui);
        self.renderer.frame().render_frame(&mut self.ui)?;
        Ok(())
    }
}

struct App<'a> {
    config: &'a Config,
    shader_dir: PathBuf,
    state: Option<State>,
    error: Option<Error>,
}

impl App<'_> {
    fn fail(&mut self, event_loop: &ActiveEventLoop, e: Error) {
        error!("{e}");
        // drain and release everything before the loop exits
        self.state = None;
        self.error = Some(e);
        event_loop.exit();
    }
}

impl ApplicationHandler for App<'_> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        match State::build(self.config, &self.shader_dir, event_loop) {
            Ok(state) => self.state = Some(state),
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(state) = self.state.as_mut() else {
            return;
        };

        let result = match event {
            WindowEvent::CloseRequested => {
                info!("close requested");
                self.state = None;
                event_loop.exit();
                return;
            }
            WindowEvent::Resized(size) => state.renderer.frame().resize(size.width, size.height),
            WindowEvent::RedrawRequested => state.redraw(),
            _ => Ok(()),
        };

        if let Err(e) = result {
            self.fail(event_loop, e);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }
}

/// Opens the window and renders until it is closed or a frame fails.
pub fn run(config: &Config, shader_dir: impl Into<PathBuf>) -> Result<()> {
    let event_loop = EventLoop::new().map_err(|e| Error::Window(e.to_string()))?;
    // frames are paced by the swap chain, not by window messages
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App {
        config,
        shader_dir: shader_dir.into(),
        state: None,
        error: None,
    };
    event_loop
        .run_app(&mut app)
        .map_err(|e| Error::Window(e.to_string()))?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
