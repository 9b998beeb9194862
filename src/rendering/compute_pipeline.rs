use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use wgpu::util::DeviceExt;

use crate::config::{Config, KERNEL_SOURCE};
use crate::error::{Error, Result};
use crate::rendering::context::GpuContext;
use crate::simulation::attractors::AttractorSet;
use crate::simulation::kernels::{InitLayout, Kernel, KernelBackend};
use crate::simulation::types::{
    AttractorUniform, KernelParams, particle_buffer_size, spawn_batch, workgroup_count,
};

const ALL_KERNELS: [Kernel; 7] = [
    Kernel::Init(InitLayout::Cube),
    Kernel::Init(InitLayout::Circle),
    Kernel::Accelerate,
    Kernel::Move,
    Kernel::Generate,
    Kernel::ZoomIn,
    Kernel::ZoomOut,
];

/// The compute program and the particle buffer it works on.
///
/// Every kernel shares one bind group: the particles (read-write storage),
/// the attractor state and a small parameter block.
pub(crate) struct ParticleKernels {
    pipelines: HashMap<Kernel, wgpu::ComputePipeline>,
    bind_group: wgpu::BindGroup,
    particles: wgpu::Buffer,
    attractor_buffer: wgpu::Buffer,
    params_buffer: wgpu::Buffer,
    params: KernelParams,
    context: Arc<GpuContext>,
}

impl ParticleKernels {
    /// Compiles every kernel and allocates a zeroed particle buffer. Any
    /// compiler diagnostic is fatal.
    pub(crate) fn new(context: Arc<GpuContext>, config: &Config) -> Result<Self> {
        let source = config.read_shader(KERNEL_SOURCE)?;
        let device = &context.device;

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Particle Kernels"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Particle Kernel Bind Group Layout"),
            entries: &[
                // particles
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // attractors
                uniform_entry(1),
                // params
                uniform_entry(2),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Particle Kernel Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipelines: HashMap<_, _> = ALL_KERNELS
            .into_iter()
            .map(|kernel| {
                let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                    label: Some(kernel.name()),
                    layout: Some(&pipeline_layout),
                    module: &module,
                    entry_point: Some(kernel.entry_point()),
                    compilation_options: Default::default(),
                    cache: None,
                });
                (kernel, pipeline)
            })
            .collect();

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            let log = build_log(&module, &err);
            return Err(Error::ComputeBuild { log });
        }
        log::info!("compiled {} kernels from {KERNEL_SOURCE}", pipelines.len());

        let particles = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Particle Buffer"),
            size: particle_buffer_size(config.particle_count),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::VERTEX,
            mapped_at_creation: false,
        });

        let params = KernelParams {
            count: config.particle_count,
            seed: rand::random::<u32>(),
            frame: 0,
            _padding: 0,
        };

        let attractor_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Attractor Buffer"),
            contents: bytemuck::cast_slice(&[AttractorSet::default().to_uniform(0)]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Kernel Params Buffer"),
            contents: bytemuck::cast_slice(&[params]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Particle Kernel Bind Group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: particles.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: attractor_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: params_buffer.as_entire_binding(),
                },
            ],
        });

        Ok(Self {
            pipelines,
            bind_group,
            particles,
            attractor_buffer,
            params_buffer,
            params,
            context,
        })
    }
}

impl KernelBackend for ParticleKernels {
    type Buffer = wgpu::Buffer;

    fn buffer(&self) -> &wgpu::Buffer {
        &self.particles
    }

    /// Drains any in-flight draw that still reads the buffer, then opens an
    /// error scope covering the compute batch.
    fn acquire(&mut self) -> Result<()> {
        self.context.wait_idle("acquire")?;
        self.context
            .device
            .push_error_scope(wgpu::ErrorFilter::Validation);
        Ok(())
    }

    fn enqueue(&mut self, kernel: Kernel, attractors: Option<&AttractorSet>) -> Result<()> {
        let Some(pipeline) = self.pipelines.get(&kernel) else {
            return Err(Error::gpu("enqueue", format!("no pipeline for `{}`", kernel.name())));
        };
        let queue = &self.context.queue;

        if let Some(attractors) = attractors {
            let uniform: AttractorUniform = attractors.to_uniform(spawn_batch(self.params.count));
            queue.write_buffer(&self.attractor_buffer, 0, bytemuck::cast_slice(&[uniform]));
        }
        if let Kernel::Init(_) = kernel {
            self.params.seed = rand::random::<u32>();
        }
        self.params.frame = self.params.frame.wrapping_add(1);
        queue.write_buffer(&self.params_buffer, 0, bytemuck::cast_slice(&[self.params]));

        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(kernel.name()),
            });
        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(kernel.name()),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(pipeline);
            compute_pass.set_bind_group(0, &self.bind_group, &[]);
            // Every kernel covers the full range and bounds-checks itself
            compute_pass.dispatch_workgroups(workgroup_count(self.params.count), 1, 1);
        }
        queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.context.wait_idle("finish")
    }

    fn release(&mut self) -> Result<()> {
        match pollster::block_on(self.context.device.pop_error_scope()) {
            Some(err) => Err(Error::gpu("compute", err)),
            None => Ok(()),
        }
    }
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Collects the compiler messages for `module`, falling back to the error
/// text when the compiler itself reported nothing.
pub(super) fn build_log(module: &wgpu::ShaderModule, err: &wgpu::Error) -> String {
    let info = pollster::block_on(module.get_compilation_info());
    let mut log = String::new();
    for message in &info.messages {
        match &message.location {
            Some(location) => {
                let _ = writeln!(
                    log,
                    "{}:{}: {:?}: {}",
                    location.line_number, location.line_position, message.message_type, message.message
                );
            }
            None => {
                let _ = writeln!(log, "{:?}: {}", message.message_type, message.message);
            }
        }
    }
    if log.is_empty() {
        log = err.to_string();
    }
    log
}
