use crate::error::Result;
use crate::simulation::attractors::AttractorSet;
use crate::simulation::controls::ToggleFlags;
use crate::simulation::handoff::SharedBuffer;
use crate::simulation::types::spawn_batch;

pub(crate) const ZOOM_FACTOR: f32 = 0.9;

/// Starting arrangement written by the initialize operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub(crate) enum InitLayout {
    #[default]
    Cube,
    Circle,
}

/// The named operations of the compute program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Kernel {
    Init(InitLayout),
    Accelerate,
    Move,
    Generate,
    ZoomIn,
    ZoomOut,
}

impl Kernel {
    pub(crate) const fn name(self) -> &'static str {
        match self {
            Kernel::Init(InitLayout::Cube) => "init",
            Kernel::Init(InitLayout::Circle) => "init2",
            Kernel::Accelerate => "accelerate",
            Kernel::Move => "move",
            Kernel::Generate => "gen",
            Kernel::ZoomIn => "zoomin",
            Kernel::ZoomOut => "zoomout",
        }
    }

    /// WGSL reserves `move`, every other entry point is spelled like the
    /// operation.
    pub(crate) const fn entry_point(self) -> &'static str {
        match self {
            Kernel::Move => "move_particles",
            other => other.name(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Zoom {
    In,
    Out,
}

impl Zoom {
    pub(crate) fn kernel(self) -> Kernel {
        match self {
            Zoom::In => Kernel::ZoomIn,
            Zoom::Out => Kernel::ZoomOut,
        }
    }

    /// Scale applied to positions by the matching kernel.
    pub(crate) fn factor(self) -> f32 {
        match self {
            Zoom::In => 1.0 / ZOOM_FACTOR,
            Zoom::Out => ZOOM_FACTOR,
        }
    }
}

/// The GPU side of the compute subsystem.
///
/// `acquire`/`release` bracket every batch of dispatches; `finish` blocks
/// until everything enqueued so far has executed. [`SharedBuffer`] makes sure
/// the calls arrive in that order.
pub(crate) trait KernelBackend {
    type Buffer;

    fn buffer(&self) -> &Self::Buffer;

    fn acquire(&mut self) -> Result<()>;

    fn enqueue(&mut self, kernel: Kernel, attractors: Option<&AttractorSet>) -> Result<()>;

    fn finish(&mut self) -> Result<()>;

    fn release(&mut self) -> Result<()>;
}

/// Runs one frame of the compute path: `gen` when spawning, `accelerate`
/// unless exploding, then `move`, inside a single acquire/release pair.
pub(crate) fn dispatch_frame<B: KernelBackend>(
    shared: &mut SharedBuffer<B>,
    flags: &ToggleFlags,
    attractors: &mut AttractorSet,
    particle_count: u32,
) -> Result<()> {
    let mut access = shared.acquire_for_compute()?;

    if flags.spawning {
        access.dispatch(Kernel::Generate, Some(&*attractors))?;
        attractors.advance_spawn(spawn_batch(particle_count), particle_count);
    }
    if !flags.exploding {
        access.dispatch(Kernel::Accelerate, Some(&*attractors))?;
    }
    access.dispatch(Kernel::Move, None)?;

    access.release_for_render()
}

pub(crate) fn dispatch_zoom<B: KernelBackend>(
    shared: &mut SharedBuffer<B>,
    zoom: Zoom,
) -> Result<()> {
    let mut access = shared.acquire_for_compute()?;
    access.dispatch(zoom.kernel(), None)?;
    access.release_for_render()
}

pub(crate) fn dispatch_init<B: KernelBackend>(
    shared: &mut SharedBuffer<B>,
    layout: InitLayout,
) -> Result<()> {
    let mut access = shared.acquire_for_compute()?;
    access.dispatch(Kernel::Init(layout), None)?;
    access.release_for_render()
}
