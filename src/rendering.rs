pub(crate) mod camera;
pub(crate) mod compute_pipeline;
pub(crate) mod context;
mod render_pass;
mod render_pipeline;
mod renderer;

pub(crate) use compute_pipeline::ParticleKernels;
pub(crate) use context::GpuContext;
pub(crate) use renderer::{Presented, Renderer};
