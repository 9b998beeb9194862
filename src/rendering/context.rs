use std::sync::Arc;

use winit::window::Window;

use crate::config::Config;
use crate::error::{Error, Result};

/// The logical device shared by the compute and render halves.
pub(crate) struct GpuContext {
    pub(crate) device: wgpu::Device,
    pub(crate) queue: wgpu::Queue,
    pub(crate) info: wgpu::AdapterInfo,
}

/// A device plus the window surface it was chosen for.
pub(crate) struct Connection {
    pub(crate) context: Arc<GpuContext>,
    pub(crate) surface: wgpu::Surface<'static>,
    pub(crate) surface_config: wgpu::SurfaceConfiguration,
}

impl GpuContext {
    /// Finds an adapter that can present to `window`, opens a device on it
    /// large enough for the particle buffer, and configures the surface.
    pub(crate) async fn connect(window: Arc<Window>, config: &Config) -> Result<Connection> {
        // The instance is a handle to our GPU
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;
        let adapter = select_adapter(&instance, &surface, config.adapter_filter.as_deref())?;
        let info = adapter.get_info();
        log::info!(
            "using adapter {} ({:?}, {:?} backend, driver {} {})",
            info.name,
            info.device_type,
            info.backend,
            info.driver,
            info.driver_info
        );

        let required_limits = particle_limits(&adapter.limits(), config.buffer_size())?;
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Particle Device"),
                required_features: wgpu::Features::empty(),
                required_limits,
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await?;

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_config = configure_surface(&device, &surface, &surface_caps, size);

        Ok(Connection {
            context: Arc::new(GpuContext { device, queue, info }),
            surface,
            surface_config,
        })
    }

    /// Blocks until every submission so far has completed.
    pub(crate) fn wait_idle(&self, stage: &'static str) -> Result<()> {
        self.device
            .poll(wgpu::PollType::Wait)
            .map(|_| ())
            .map_err(|err| Error::gpu(stage, err))
    }
}

fn select_adapter(
    instance: &wgpu::Instance,
    surface: &wgpu::Surface<'_>,
    filter: Option<&str>,
) -> Result<wgpu::Adapter> {
    let mut candidates: Vec<wgpu::Adapter> = instance
        .enumerate_adapters(wgpu::Backends::PRIMARY)
        .into_iter()
        .filter(|adapter| adapter.is_surface_supported(surface))
        .collect();

    for adapter in &candidates {
        let info = adapter.get_info();
        log::debug!("found adapter {} ({:?})", info.name, info.device_type);
    }

    if let Some(filter) = filter {
        candidates.retain(|adapter| matches_filter(&describe(&adapter.get_info()), filter));
    }

    let pick = candidates
        .iter()
        .position(|adapter| adapter.get_info().device_type == wgpu::DeviceType::DiscreteGpu)
        .unwrap_or(0);

    if candidates.is_empty() {
        return Err(Error::NoAdapter {
            filter: filter.map(str::to_string),
        });
    }
    Ok(candidates.swap_remove(pick))
}

fn describe(info: &wgpu::AdapterInfo) -> String {
    format!(
        "{} {:#06x} {} {:?}",
        info.name, info.vendor, info.driver, info.backend
    )
}

fn matches_filter(description: &str, filter: &str) -> bool {
    description.to_lowercase().contains(&filter.to_lowercase())
}

/// Default limits, raised to whatever the adapter allows for buffer sizes.
/// Fails when even that is too small for `buffer_size` bytes.
fn particle_limits(adapter: &wgpu::Limits, buffer_size: u64) -> Result<wgpu::Limits> {
    let limit = adapter
        .max_buffer_size
        .min(u64::from(adapter.max_storage_buffer_binding_size));
    if buffer_size > limit {
        return Err(Error::BufferTooLarge {
            required: buffer_size,
            limit,
        });
    }

    Ok(wgpu::Limits {
        max_buffer_size: adapter.max_buffer_size,
        max_storage_buffer_binding_size: adapter.max_storage_buffer_binding_size,
        ..wgpu::Limits::default()
    })
}

pub(super) fn configure_surface(
    device: &wgpu::Device,
    surface: &wgpu::Surface<'_>,
    surface_caps: &wgpu::SurfaceCapabilities,
    size: winit::dpi::PhysicalSize<u32>,
) -> wgpu::SurfaceConfiguration {
    // Shader code assumes an sRGB surface texture
    let surface_format = surface_caps
        .formats
        .iter()
        .copied()
        .find(wgpu::TextureFormat::is_srgb)
        .unwrap_or(surface_caps.formats[0]);

    let surface_config = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format: surface_format,
        width: size.width.max(1),
        height: size.height.max(1),
        present_mode: wgpu::PresentMode::AutoVsync,
        alpha_mode: surface_caps.alpha_modes[0],
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    };
    surface.configure(device, &surface_config);
    surface_config
}
