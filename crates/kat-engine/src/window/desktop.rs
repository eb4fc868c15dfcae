use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window as WinitWindow, WindowAttributes, WindowId};

use crate::device::SharedDevice;
use crate::gpu::{Gpu, GpuInit, SurfaceErrorAction, WgpuDevice};
use crate::time::MonotonicClock;

use super::{Window, WindowBackend, WindowConfig};

/// How long [`WinitBackend::new`] waits per pump for the window to appear.
const CREATE_POLL: Duration = Duration::from_millis(10);

/// Receives winit callbacks between pumps.
struct Handler {
    attributes: Option<WindowAttributes>,
    window: Option<Arc<WinitWindow>>,
    pending_resize: Option<PhysicalSize<u32>>,
    close_requested: bool,
    error: Option<anyhow::Error>,
}

impl ApplicationHandler for Handler {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Some(attributes) = self.attributes.take() else {
            return;
        };
        match event_loop.create_window(attributes) {
            Ok(window) => self.window = Some(Arc::new(window)),
            Err(e) => self.error = Some(anyhow::Error::new(e).context("failed to create window")),
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => self.close_requested = true,
            WindowEvent::Resized(size) => self.pending_resize = Some(size),
            _ => {}
        }
    }
}

/// Desktop window backed by winit, presenting through [`WgpuDevice`].
///
/// Events are pumped without blocking, so the render loop stays in charge of
/// frame pacing.
pub struct WinitBackend {
    device: Rc<WgpuDevice>,
    handler: Handler,
    event_loop: EventLoop<()>,
}

impl WinitBackend {
    /// Creates the window and a GPU context for it.
    pub fn new(config: &WindowConfig, init: GpuInit) -> Result<Self> {
        config.validate()?;

        let mut event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let attributes = WinitWindow::default_attributes()
            .with_title(config.title.clone())
            .with_inner_size(LogicalSize::new(config.width, config.height));

        let mut handler = Handler {
            attributes: Some(attributes),
            window: None,
            pending_resize: None,
            close_requested: false,
            error: None,
        };

        let window = loop {
            if let PumpStatus::Exit(code) = event_loop.pump_app_events(Some(CREATE_POLL), &mut handler) {
                bail!("event loop exited with code {code} before the window was created");
            }
            if let Some(err) = handler.error.take() {
                return Err(err);
            }
            if let Some(window) = &handler.window {
                break Arc::clone(window);
            }
        };

        let gpu = pollster::block_on(Gpu::for_window(window, init, config.vsync_interval))?;
        handler.pending_resize = None;

        log::info!("window \"{}\" opened ({}x{})", config.title, config.width, config.height);

        Ok(Self {
            device: Rc::new(WgpuDevice::new(gpu)),
            handler,
            event_loop,
        })
    }

    pub fn wgpu_device(&self) -> &Rc<WgpuDevice> {
        &self.device
    }

    pub fn device(&self) -> SharedDevice {
        self.device.clone()
    }
}

impl WindowBackend for WinitBackend {
    fn poll_events(&mut self) {
        if let PumpStatus::Exit(code) = self
            .event_loop
            .pump_app_events(Some(Duration::ZERO), &mut self.handler)
        {
            log::debug!("event loop exited with code {code}");
            self.handler.close_requested = true;
        }
        if let Some(size) = self.handler.pending_resize.take() {
            log::debug!("resized to {}x{}", size.width, size.height);
            self.device.resize(size);
        }
    }

    fn should_close(&self) -> bool {
        self.handler.close_requested
    }

    fn swap_buffers(&mut self) {
        if let Some(window) = &self.handler.window {
            window.pre_present_notify();
        }
        if let Err(SurfaceErrorAction::Fatal) = self.device.present() {
            log::error!("fatal surface error; closing window");
            self.handler.close_requested = true;
        }
    }

    fn set_swap_interval(&mut self, interval: u32) {
        self.device.set_swap_interval(interval);
    }
}

impl Window<WinitBackend, MonotonicClock> {
    /// Opens a desktop window with default GPU settings.
    pub fn open(config: &WindowConfig) -> Result<Self> {
        Self::open_with(config, GpuInit::default())
    }

    pub fn open_with(config: &WindowConfig, init: GpuInit) -> Result<Self> {
        let backend = WinitBackend::new(config, init)?;
        Ok(Window::with_backend(backend, MonotonicClock::new(), config.vsync_interval))
    }

    /// Device that renders into this window.
    pub fn device(&self) -> SharedDevice {
        self.backend().device()
    }
}
