use std::sync::Arc;

use winit::window::Window;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::rendering::context::{Connection, GpuContext};
use crate::rendering::render_pass::{background_color, create_background_render_pass};
use crate::rendering::render_pipeline::ParticlePipeline;
use crate::simulation::types::ViewUniforms;

/// Whether a frame reached the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Presented {
    Yes,
    Skipped,
}

// Main renderer struct
pub(crate) struct Renderer {
    particle_pipeline: ParticlePipeline,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    size: winit::dpi::PhysicalSize<u32>,
    window: Arc<Window>,
    context: Arc<GpuContext>,
}

impl Renderer {
    pub(crate) fn new(window: Arc<Window>, connection: Connection, config: &Config) -> Self {
        let Connection {
            context,
            surface,
            surface_config,
        } = connection;

        let particle_pipeline = ParticlePipeline::new(&context.device, config, surface_config.format);
        log::debug!(
            "rendering {:?} on {}",
            surface_config.format,
            context.info.name
        );
        let size = window.inner_size();

        Self {
            particle_pipeline,
            surface,
            surface_config,
            size,
            window,
            context,
        }
    }

    pub(crate) fn get_window(&self) -> &Window {
        &self.window
    }

    pub(crate) fn get_size(&self) -> winit::dpi::PhysicalSize<u32> {
        self.size
    }

    pub(crate) fn viewport(&self) -> [f32; 2] {
        [self.surface_config.width as f32, self.surface_config.height as f32]
    }

    pub(crate) fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.surface_config.width = new_size.width;
            self.surface_config.height = new_size.height;
            self.configure_surface();
        }
    }

    fn configure_surface(&self) {
        self.surface.configure(&self.context.device, &self.surface_config);
    }

    /// Clears to the background level and draws `count` particles from
    /// `particles`.
    pub(crate) fn render(
        &mut self,
        view: &ViewUniforms,
        brightness: f32,
        particles: &wgpu::Buffer,
        count: u32,
    ) -> Result<Presented> {
        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("surface lost or outdated, reconfiguring");
                self.configure_surface();
                return Ok(Presented::Skipped);
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("timed out waiting for the next swapchain texture");
                return Ok(Presented::Skipped);
            }
            Err(err) => return Err(Error::Frame(err)),
        };

        let texture_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.particle_pipeline.update_view(&self.context.queue, view);

        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Particle Command Encoder"),
            });

        {
            let mut render_pass = create_background_render_pass(
                &mut encoder,
                &texture_view,
                background_color(brightness),
            );
            self.particle_pipeline
                .render_pass(&mut render_pass, particles, count);
        }

        // submit will accept anything that implements IntoIter
        self.context.queue.submit(std::iter::once(encoder.finish()));
        self.window.pre_present_notify();
        surface_texture.present();

        Ok(Presented::Yes)
    }

    /// Blocks until every submitted draw has executed.
    pub(crate) fn flush(&self) -> Result<()> {
        self.context.wait_idle("flush")
    }
}
