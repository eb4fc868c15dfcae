use std::sync::Arc;

use anyhow::{bail, ensure, Context, Result};
use wgpu::SurfaceError;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use super::surface;
use super::{GpuFrame, GpuInit, SurfaceErrorAction};

/// Format of headless render targets. Linear, so read-back bytes equal the
/// colors that were written.
pub const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

enum Target {
    Surface {
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    },
    Offscreen {
        texture: wgpu::Texture,
    },
}

/// Owns wgpu core objects and the frame target.
///
/// This type is the low-level rendering context:
/// - creates and stores Adapter/Device/Queue
/// - owns either a window surface (swapchain) or an offscreen texture
/// - acquires frames and provides an encoder + view for rendering
pub struct Gpu {
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    target: Target,
}

impl Gpu {
    /// Creates a GPU context presenting to `window`.
    ///
    /// The surface keeps its own reference to the window.
    pub async fn for_window(window: Arc<Window>, init: GpuInit, swap_interval: u32) -> Result<Self> {
        let size = window.inner_size();
        ensure!(size.width > 0 && size.height > 0, "window has zero size");

        let instance = new_instance();
        let surface = instance
            .create_surface(window)
            .context("failed to create wgpu surface")?;

        let (adapter, device, queue) = request_device(&instance, Some(&surface), &init).await?;

        let caps = surface.get_capabilities(&adapter);
        let format = surface::choose_surface_format(&caps, init.prefer_srgb)
            .context("no supported surface formats")?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode: surface::present_mode_for_interval(swap_interval),
            alpha_mode: surface::choose_alpha_mode(&caps, init.alpha_mode),
            view_formats: vec![],
            desired_maximum_frame_latency: init.desired_maximum_frame_latency,
        };
        surface.configure(&device, &config);

        log::info!(
            "gpu ready: {} ({:?}), surface {format:?} {}x{}",
            adapter.get_info().name,
            adapter.get_info().backend,
            size.width,
            size.height
        );

        Ok(Self {
            adapter,
            device,
            queue,
            target: Target::Surface { surface, config },
        })
    }

    /// Creates a GPU context rendering into a `width`×`height` texture.
    pub async fn headless(width: u32, height: u32, init: GpuInit) -> Result<Self> {
        ensure!(width > 0 && height > 0, "offscreen target has zero size");

        let instance = new_instance();
        let (adapter, device, queue) = request_device(&instance, None, &init).await?;
        let texture = offscreen_texture(&device, width, height);

        log::info!(
            "gpu ready: {} ({:?}), offscreen {width}x{height}",
            adapter.get_info().name,
            adapter.get_info().backend
        );

        Ok(Self {
            adapter,
            device,
            queue,
            target: Target::Offscreen { texture },
        })
    }

    /// Returns the format of the frame target.
    pub fn format(&self) -> wgpu::TextureFormat {
        match &self.target {
            Target::Surface { config, .. } => config.format,
            Target::Offscreen { texture } => texture.format(),
        }
    }

    /// Returns the current drawable size (physical pixels).
    pub fn size(&self) -> PhysicalSize<u32> {
        match &self.target {
            Target::Surface { config, .. } => PhysicalSize::new(config.width, config.height),
            Target::Offscreen { texture } => PhysicalSize::new(texture.width(), texture.height()),
        }
    }

    pub fn is_headless(&self) -> bool {
        matches!(self.target, Target::Offscreen { .. })
    }

    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    /// Returns a reference to the logical device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Returns a reference to the command queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Reconfigures the target after a resize. Zero sizes are ignored.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        match &mut self.target {
            Target::Surface { surface, config } => {
                surface::apply_resize(surface, &self.device, config, new_size);
            }
            Target::Offscreen { texture } => {
                if new_size.width > 0 && new_size.height > 0 {
                    *texture = offscreen_texture(&self.device, new_size.width, new_size.height);
                }
            }
        }
    }

    /// Switches the surface present mode for a new swap interval.
    pub fn set_swap_interval(&mut self, interval: u32) {
        if interval > 1 {
            log::debug!("swap interval {interval} is presented as 1");
        }
        if let Target::Surface { surface, config } = &mut self.target {
            config.present_mode = surface::present_mode_for_interval(interval);
            surface.configure(&self.device, config);
        }
    }

    /// Acquires the next frame texture and creates an encoder.
    pub fn begin_frame(&self) -> std::result::Result<GpuFrame, SurfaceError> {
        let (surface_texture, view) = match &self.target {
            Target::Surface { surface, .. } => {
                let st = surface.get_current_texture()?;
                let view = st.texture.create_view(&wgpu::TextureViewDescriptor::default());
                (Some(st), view)
            }
            Target::Offscreen { texture } => {
                (None, texture.create_view(&wgpu::TextureViewDescriptor::default()))
            }
        };

        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("kat frame encoder"),
            });

        Ok(GpuFrame {
            surface_texture,
            view,
            encoder,
        })
    }

    /// Submits the recorded commands and presents the frame.
    pub fn submit(&self, frame: GpuFrame) {
        let GpuFrame {
            surface_texture,
            view,
            encoder,
        } = frame;
        self.queue.submit(std::iter::once(encoder.finish()));
        drop(view);
        if let Some(st) = surface_texture {
            st.present();
        }
    }

    /// Converts a `SurfaceError` into a higher-level action.
    pub fn handle_surface_error(&mut self, err: SurfaceError) -> SurfaceErrorAction {
        match &self.target {
            Target::Surface { surface, config } => {
                surface::map_surface_error(surface, &self.device, config, err)
            }
            Target::Offscreen { .. } => SurfaceErrorAction::SkipFrame,
        }
    }

    /// Reads the offscreen target back as tightly packed RGBA8 rows.
    pub fn read_pixels(&self) -> Result<Vec<u8>> {
        let Target::Offscreen { texture } = &self.target else {
            bail!("read_pixels needs an offscreen target");
        };

        let (width, height) = (texture.width(), texture.height());
        let unpadded = width * 4;
        let padded = unpadded.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
            * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

        let readback = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("kat readback buffer"),
            size: u64::from(padded) * u64::from(height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("kat readback encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let (tx, rx) = std::sync::mpsc::channel();
        readback.map_async(wgpu::MapMode::Read, .., move |result| {
            let _ = tx.send(result);
        });
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .context("device poll failed during readback")?;
        rx.recv()
            .context("readback map callback never ran")?
            .context("failed to map readback buffer")?;

        let mapped = readback.get_mapped_range(..);
        let mut pixels = Vec::with_capacity((unpadded * height) as usize);
        for row in mapped.chunks(padded as usize) {
            pixels.extend_from_slice(&row[..unpadded as usize]);
        }
        drop(mapped);
        readback.unmap();

        Ok(pixels)
    }
}

fn new_instance() -> wgpu::Instance {
    // Use all backends to allow wgpu to select the optimal platform backend.
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    })
}

async fn request_device(
    instance: &wgpu::Instance,
    compatible_surface: Option<&wgpu::Surface<'_>>,
    init: &GpuInit,
) -> Result<(wgpu::Adapter, wgpu::Device, wgpu::Queue)> {
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: init.power_preference,
            compatible_surface,
            force_fallback_adapter: false,
        })
        .await
        .context("failed to find a suitable GPU adapter")?;

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("kat-engine device"),
            required_features: init.required_features,
            required_limits: init.required_limits.clone(),
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        })
        .await
        .context("failed to create wgpu device/queue")?;

    Ok((adapter, device, queue))
}

fn offscreen_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("kat offscreen target"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: OFFSCREEN_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}
