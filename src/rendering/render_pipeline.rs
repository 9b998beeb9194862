use wgpu::util::DeviceExt;

use crate::config::{Config, FRAGMENT_SOURCE, VERTEX_SOURCE};
use crate::rendering::compute_pipeline::build_log;
use crate::simulation::types::{Particle, ViewUniforms};

// Only the position of each particle feeds the vertex stage
const PARTICLE_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];

/// Colours simply add up where particles overlap.
const ADDITIVE: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
};

/// Draws each particle as a screen-aligned quad, instanced straight out of
/// the particle buffer.
pub(crate) struct ParticlePipeline {
    pipeline: Option<wgpu::RenderPipeline>,
    view_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl ParticlePipeline {
    /// Builds the render program. Shader problems are logged and leave the
    /// pipeline unset, in which case only the background is drawn.
    pub(crate) fn new(device: &wgpu::Device, config: &Config, format: wgpu::TextureFormat) -> Self {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Particle View Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let view_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Particle View Buffer"),
            contents: bytemuck::cast_slice(&[ViewUniforms::default()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Particle View Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: view_buffer.as_entire_binding(),
            }],
        });

        let vertex = compile_stage(device, config, VERTEX_SOURCE);
        let fragment = compile_stage(device, config, FRAGMENT_SOURCE);
        let pipeline = match (vertex, fragment) {
            (Some(vertex), Some(fragment)) => {
                link(device, &bind_group_layout, &vertex, &fragment, format)
            }
            _ => None,
        };
        if pipeline.is_none() {
            log::warn!("particle shaders unavailable, drawing background only");
        }

        Self {
            pipeline,
            view_buffer,
            bind_group,
        }
    }

    pub(crate) fn update_view(&self, queue: &wgpu::Queue, view: &ViewUniforms) {
        queue.write_buffer(&self.view_buffer, 0, bytemuck::cast_slice(&[*view]));
    }

    pub(crate) fn render_pass(&self, render_pass: &mut wgpu::RenderPass<'_>, particles: &wgpu::Buffer, count: u32) {
        let Some(pipeline) = &self.pipeline else {
            return;
        };
        render_pass.set_pipeline(pipeline);
        render_pass.set_bind_group(0, &self.bind_group, &[]);
        render_pass.set_vertex_buffer(0, particles.slice(..));

        // Draw 6 vertices (2 triangles) per particle instance
        render_pass.draw(0..6, 0..count);
    }
}

fn compile_stage(device: &wgpu::Device, config: &Config, file: &str) -> Option<wgpu::ShaderModule> {
    let source = match config.read_shader(file) {
        Ok(source) => source,
        Err(err) => {
            log::error!("{err}");
            return None;
        }
    };

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(file),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => {
            log::error!("failed to compile {file}:\n{}", build_log(&module, &err));
            None
        }
        None => Some(module),
    }
}

fn link(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    vertex: &wgpu::ShaderModule,
    fragment: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
) -> Option<wgpu::RenderPipeline> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Particle Render Pipeline Layout"),
        bind_group_layouts: &[bind_group_layout],
        push_constant_ranges: &[],
    });

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Particle Render Pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: vertex,
            entry_point: Some("vs_main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: size_of::<Particle>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Instance,
                attributes: &PARTICLE_ATTRIBUTES,
            }],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: fragment,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(ADDITIVE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
        cache: None,
    });

    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => {
            log::error!("failed to link particle shaders: {err}");
            None
        }
        None => Some(pipeline),
    }
}
