//! GPU presentation of composed frames.
//!
//! The simulation and compositor run on the CPU; the GPU only shows the
//! result. [`GpuState`] owns the surface and device and draws the latest
//! frame through the [`display`] pass, with an optional egui overlay.

pub mod display;
#[cfg(feature = "egui")]
pub mod egui_integration;

use std::sync::Arc;

use winit::window::Window;

use crate::error::ResourceInitError;
use display::DisplayPass;
#[cfg(feature = "egui")]
use egui_integration::EguiIntegration;

pub struct GpuState {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    display: DisplayPass,
    zoom: f32,
    #[cfg(feature = "egui")]
    egui: EguiIntegration,
}

impl GpuState {
    pub async fn new(window: Arc<Window>, frame_size: u32, zoom: f32) -> Result<Self, ResourceInitError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(ResourceInitError::NoAdapter)?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(ResourceInitError::UnsupportedSurface)?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .ok_or(ResourceInitError::UnsupportedSurface)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let display = DisplayPass::new(&device, frame_size, surface_format);
        display.set_view(&queue, (config.width, config.height), zoom);

        #[cfg(feature = "egui")]
        let egui = EguiIntegration::new(&device, surface_format, &window);

        tracing::info!(
            adapter = %adapter.get_info().name,
            format = ?surface_format,
            width = config.width,
            height = config.height,
            "display initialized"
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            display,
            zoom,
            #[cfg(feature = "egui")]
            egui,
        })
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.display
                .set_view(&self.queue, (self.config.width, self.config.height), self.zoom);
        }
    }

    /// Reconfigure the surface at its current size.
    pub fn reconfigure(&mut self) {
        self.resize(winit::dpi::PhysicalSize {
            width: self.config.width,
            height: self.config.height,
        });
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom;
        self.display
            .set_view(&self.queue, (self.config.width, self.config.height), zoom);
    }

    /// Upload the next frame to display.
    pub fn upload(&mut self, frame: &image::RgbaImage) {
        self.display.upload(&self.device, &self.queue, frame);
    }

    #[cfg(feature = "egui")]
    pub fn egui(&mut self) -> &mut EguiIntegration {
        &mut self.egui
    }

    fn begin(&self) -> Result<(wgpu::SurfaceTexture, wgpu::TextureView, wgpu::CommandEncoder), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Display Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.display.draw(&mut render_pass);
        }

        Ok((output, view, encoder))
    }

    /// Draw the last uploaded frame.
    pub fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let (output, _view, encoder) = self.begin()?;
        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    /// Draw the last uploaded frame with an egui overlay built by `run_ui`.
    #[cfg(feature = "egui")]
    pub fn render_with_ui(
        &mut self,
        window: &Window,
        run_ui: impl FnMut(&egui::Context),
    ) -> Result<(), wgpu::SurfaceError> {
        let ui_output = self.egui.run(window, run_ui);
        let (output, view, mut encoder) = self.begin()?;
        self.egui.paint(
            &self.device,
            &self.queue,
            &mut encoder,
            &view,
            [self.config.width, self.config.height],
            ui_output,
        );
        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}
