use bytemuck::{Pod, Zeroable};

pub(crate) const COMPUTE_WORKGROUP_SIZE: u32 = 256;

// Fraction of the particle field re-spawned per frame while spawning.
const SPAWN_DIVISOR: u32 = 100;

// One particle record. The compute kernels write it and the vertex stage
// reads it from the same buffer, so the layout is shared verbatim.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub(crate) struct Particle {
    pub(crate) position: [f32; 4], // xyz = position, w = unused
    pub(crate) velocity: [f32; 4], // xyz = velocity, w = unused
}

const _: () = assert!(std::mem::size_of::<Particle>() == 32);

// Attractor state read by `gen` and `accelerate`
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub(crate) struct AttractorUniform {
    pub(crate) cursor: [f32; 4], // x, y, z (pan compensation), attraction strength
    pub(crate) counts: [u32; 4], // active points, spawn cursor, spawn batch, unused
    pub(crate) points: [[f32; 4]; 10],
}

// Launch parameters shared by every kernel
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub(crate) struct KernelParams {
    pub(crate) count: u32,
    pub(crate) seed: u32,
    pub(crate) frame: u32,
    pub(crate) _padding: u32,
}

// Everything the vertex stage reads besides the particles themselves.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub(crate) struct ViewUniforms {
    pub(crate) p: [[f32; 4]; 4],  // projection * transform
    pub(crate) hsv: [f32; 4],     // hue, saturation, value, point size in pixels
    pub(crate) pointer: [f32; 4], // pointer x, pointer y, viewport width, viewport height
}

pub(crate) const fn particle_buffer_size(count: u32) -> u64 {
    count as u64 * std::mem::size_of::<Particle>() as u64
}

pub(crate) const fn workgroup_count(count: u32) -> u32 {
    count.div_ceil(COMPUTE_WORKGROUP_SIZE)
}

pub(crate) fn spawn_batch(count: u32) -> u32 {
    (count / SPAWN_DIVISOR).max(1)
}
