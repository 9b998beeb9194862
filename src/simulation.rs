pub(crate) mod attractors;
pub(crate) mod controls;
pub(crate) mod handoff;
pub(crate) mod kernels;
pub(crate) mod types;

#[cfg(test)]
pub(crate) mod testing;

use glam::Mat4;

use crate::error::Result;
use crate::rendering::camera::{Camera, MOVE_STEP};
use attractors::AttractorSet;
use controls::{Command, HeldControl, HeldKeys, Palette, ToggleFlags};
use handoff::{HandoffError, SharedBuffer};
use kernels::{InitLayout, KernelBackend, Zoom};
use types::ViewUniforms;

/// Which path a frame took through the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FramePath {
    RenderOnly,
    ComputeThenRender,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Exit,
}

/// Interaction state plus the shared particle buffer it drives.
///
/// Everything here is independent of the window: input arrives already
/// translated into pointer coordinates, commands and held controls, and the
/// GPU is reached only through the [`KernelBackend`].
pub(crate) struct Simulation<B: KernelBackend> {
    particles: SharedBuffer<B>,
    particle_count: u32,
    layout: InitLayout,
    attractors: AttractorSet,
    flags: ToggleFlags,
    palette: Palette,
    camera: Camera,
}

impl<B: KernelBackend> Simulation<B> {
    /// Takes over a freshly allocated buffer and runs the initialize kernel
    /// on it.
    pub(crate) fn new(backend: B, particle_count: u32, layout: InitLayout, aspect: f32) -> Result<Self> {
        let mut particles = SharedBuffer::new(backend);
        kernels::dispatch_init(&mut particles, layout)?;
        log::info!(
            "initialized {particle_count} particles with `{}`",
            kernels::Kernel::Init(layout).name()
        );

        Ok(Self {
            particles,
            particle_count,
            layout,
            attractors: AttractorSet::default(),
            flags: ToggleFlags::default(),
            palette: Palette::default(),
            camera: Camera::new(aspect),
        })
    }

    /// Everything a frame does before drawing: held keys, hue, and the
    /// compute path when running.
    pub(crate) fn advance(&mut self, held: &HeldKeys) -> Result<FramePath> {
        for &control in held {
            self.hold(control);
        }
        self.palette.advance_hue(self.flags.frozen_hue);

        if self.flags.paused {
            return Ok(FramePath::RenderOnly);
        }

        kernels::dispatch_frame(
            &mut self.particles,
            &self.flags,
            &mut self.attractors,
            self.particle_count,
        )?;
        Ok(FramePath::ComputeThenRender)
    }

    fn hold(&mut self, control: HeldControl) {
        match control {
            HeldControl::DollyIn => self.camera.dolly_by(MOVE_STEP),
            HeldControl::DollyOut => self.camera.dolly_by(-MOVE_STEP),
            HeldControl::PanRight => self.attractors.z += self.camera.pan_by(MOVE_STEP),
            HeldControl::PanLeft => self.attractors.z += self.camera.pan_by(-MOVE_STEP),
            colour => self.palette.hold(colour),
        }
    }

    pub(crate) fn pointer_moved(&mut self, x: f32, y: f32) {
        self.attractors.set_pointer(x, y);
    }

    pub(crate) fn pin_attractor(&mut self) {
        if self.attractors.pin_pointer() {
            log::debug!("attractor {} pinned", self.attractors.len());
        }
    }

    /// Horizontal scroll tunes the attraction strength, vertical scroll zooms
    /// the particle field. Returns `true` when a zoom ran and the caller
    /// should draw straight away.
    pub(crate) fn scroll(&mut self, horizontal: f32, vertical: f32) -> Result<bool> {
        if horizontal != 0.0 {
            if horizontal > 0.0 {
                self.attractors.strengthen();
            } else {
                self.attractors.weaken();
            }
            log::debug!("attraction strength {:.3}", self.attractors.strength());
        }

        let zoom = if vertical > 0.0 {
            Zoom::Out
        } else if vertical < 0.0 {
            Zoom::In
        } else {
            return Ok(false);
        };

        kernels::dispatch_zoom(&mut self.particles, zoom)?;
        self.attractors.rescale(zoom.factor());
        log::debug!("zoom {zoom:?}");
        Ok(true)
    }

    pub(crate) fn apply(&mut self, command: Command) -> Result<Flow> {
        match command {
            Command::TogglePause => self.flags.paused = !self.flags.paused,
            Command::Quit => return Ok(Flow::Exit),
            Command::ToggleExplode => self.flags.exploding = !self.flags.exploding,
            Command::ClearAttractors => self.attractors.clear(),
            Command::ToggleFreezeHue => self.flags.frozen_hue = !self.flags.frozen_hue,
            Command::ToggleSpawn => self.flags.spawning = !self.flags.spawning,
            Command::Reset => self.reset()?,
        }
        Ok(Flow::Continue)
    }

    /// Re-initializes the particles in place and recentres the view.
    pub(crate) fn reset(&mut self) -> Result<()> {
        kernels::dispatch_init(&mut self.particles, self.layout)?;
        self.attractors.z = 0.0;
        self.camera.reset_position();
        log::debug!("particles reset");
        Ok(())
    }

    pub(crate) fn transform(&self) -> Mat4 {
        self.camera
            .transform(self.flags.paused, self.attractors.pointer())
    }

    pub(crate) fn view_uniforms(&self, viewport: [f32; 2]) -> ViewUniforms {
        let pointer = self.attractors.pointer();
        ViewUniforms {
            p: self.transform().to_cols_array_2d(),
            hsv: [
                self.palette.hue,
                self.palette.saturation,
                self.palette.value,
                self.palette.point_size,
            ],
            pointer: [pointer.x, pointer.y, viewport[0], viewport[1]],
        }
    }

    pub(crate) fn background(&self) -> f32 {
        self.palette.brightness
    }

    /// The particle buffer as a vertex source for this frame's draw.
    pub(crate) fn particles(&self) -> Result<&B::Buffer, HandoffError> {
        self.particles.for_render()
    }

    pub(crate) fn particle_count(&self) -> u32 {
        self.particle_count
    }

    #[cfg(test)]
    pub(crate) fn flags(&self) -> ToggleFlags {
        self.flags
    }

    #[cfg(test)]
    pub(crate) fn backend(&self) -> &B {
        self.particles.backend()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::camera::DEFAULT_DOLLY;
    use crate::simulation::attractors::MIN_STRENGTH;
    use crate::simulation::kernels::Kernel;
    use crate::simulation::testing::RecordingBackend;

    fn simulation() -> Simulation<RecordingBackend> {
        Simulation::new(RecordingBackend::default(), 1000, InitLayout::Cube, 1.0).unwrap()
    }

    #[test]
    fn startup_initializes_particles_once() {
        let sim = simulation();
        assert_eq!(sim.backend().kernels(), vec![Kernel::Init(InitLayout::Cube)]);
        assert!(sim.particles().is_ok());
    }

    #[test]
    fn handoffs_stay_paired_across_everything() {
        let mut sim = simulation();
        let mut held = HeldKeys::new();
        held.insert(HeldControl::PanLeft);

        for frame in 0..40 {
            match frame % 7 {
                0 => {
                    sim.apply(Command::ToggleSpawn).unwrap();
                },
                1 => {
                    sim.scroll(0.0, 1.0).unwrap();
                },
                2 => {
                    sim.apply(Command::ToggleExplode).unwrap();
                },
                3 => {
                    sim.scroll(0.0, -2.0).unwrap();
                },
                4 => {
                    sim.apply(Command::TogglePause).unwrap();
                },
                5 => sim.reset().unwrap(),
                _ => {}
            }
            sim.advance(&held).unwrap();
            assert!(sim.particles().is_ok());
        }

        let backend = sim.backend();
        assert_eq!(backend.acquires(), backend.releases());
        assert!(backend.acquires() > 0);
    }

    #[test]
    fn pause_switches_frame_path_without_touching_particles() {
        let mut sim = simulation();
        let held = HeldKeys::new();
        assert_eq!(sim.advance(&held).unwrap(), FramePath::ComputeThenRender);

        let calls_before = sim.backend().calls.len();
        sim.apply(Command::TogglePause).unwrap();
        assert_eq!(sim.backend().calls.len(), calls_before);

        assert_eq!(sim.advance(&held).unwrap(), FramePath::RenderOnly);
        assert_eq!(sim.backend().calls.len(), calls_before);

        sim.apply(Command::TogglePause).unwrap();
        assert_eq!(sim.advance(&held).unwrap(), FramePath::ComputeThenRender);
        assert!(sim.backend().calls.len() > calls_before);
    }

    #[test]
    fn reset_restores_view_and_reinitializes() {
        let mut sim = simulation();
        let mut held = HeldKeys::new();
        held.insert(HeldControl::PanRight);
        held.insert(HeldControl::DollyOut);
        for _ in 0..25 {
            sim.advance(&held).unwrap();
        }
        sim.apply(Command::TogglePause).unwrap();
        assert_ne!(sim.camera.pan(), 0.0);
        assert_ne!(sim.attractors.z, 0.0);

        assert_eq!(sim.apply(Command::Reset).unwrap(), Flow::Continue);

        assert_eq!(sim.camera.pan(), 0.0);
        assert_eq!(sim.camera.dolly(), DEFAULT_DOLLY);
        assert_eq!(sim.attractors.z, 0.0);
        assert_eq!(
            sim.backend().kernels().last(),
            Some(&Kernel::Init(InitLayout::Cube))
        );
    }

    #[test]
    fn zoom_round_trip_restores_attractors() {
        let mut sim = simulation();
        for (x, y) in [(0.4, 0.2), (-0.6, -0.1), (0.9, -0.8)] {
            sim.pointer_moved(x, y);
            sim.pin_attractor();
        }
        let original = sim.attractors.points().to_vec();

        for _ in 0..5 {
            assert!(sim.scroll(0.0, 1.0).unwrap());
        }
        for _ in 0..5 {
            assert!(sim.scroll(0.0, -1.0).unwrap());
        }

        for (now, then) in sim.attractors.points().iter().zip(&original) {
            assert!((now[0] - then[0]).abs() < 1e-5);
            assert!((now[1] - then[1]).abs() < 1e-5);
        }
        let zooms: Vec<_> = sim
            .backend()
            .kernels()
            .into_iter()
            .filter(|k| matches!(k, Kernel::ZoomIn | Kernel::ZoomOut))
            .collect();
        assert_eq!(zooms.len(), 10);
        assert_eq!(zooms[0], Kernel::ZoomOut);
        assert_eq!(zooms[9], Kernel::ZoomIn);
    }

    #[test]
    fn horizontal_scroll_only_tunes_strength() {
        let mut sim = simulation();
        let calls = sim.backend().calls.len();
        for _ in 0..200 {
            assert!(!sim.scroll(-1.0, 0.0).unwrap());
        }
        assert_eq!(sim.attractors.strength(), MIN_STRENGTH);
        assert_eq!(sim.backend().calls.len(), calls);
    }

    #[test]
    fn toggles_flip_exactly_one_flag() {
        let mut sim = simulation();
        let cases = [
            (Command::TogglePause, ToggleFlags { paused: true, ..Default::default() }),
            (Command::ToggleExplode, ToggleFlags { exploding: true, ..Default::default() }),
            (Command::ToggleSpawn, ToggleFlags { spawning: true, ..Default::default() }),
            (Command::ToggleFreezeHue, ToggleFlags { frozen_hue: true, ..Default::default() }),
        ];
        for (command, expected) in cases {
            sim.apply(command).unwrap();
            assert_eq!(sim.flags(), expected);
            sim.apply(command).unwrap();
            assert_eq!(sim.flags(), ToggleFlags::default());
        }
        assert_eq!(sim.apply(Command::Quit).unwrap(), Flow::Exit);
    }

    #[test]
    fn pan_drags_attractor_plane_along() {
        let mut sim = simulation();
        sim.apply(Command::TogglePause).unwrap();
        let mut held = HeldKeys::new();
        held.insert(HeldControl::PanRight);
        for _ in 0..10 {
            sim.advance(&held).unwrap();
        }
        assert!((sim.camera.pan() - 0.2).abs() < 1e-5);
        assert!((sim.attractors.z - sim.camera.pan()).abs() < 1e-6);
    }

    #[test]
    fn camera_follows_pointer_only_while_paused() {
        let mut sim = simulation();
        sim.pointer_moved(0.3, -0.4);
        let running = sim.transform();
        assert!(running.abs_diff_eq(sim.camera.transform(false, sim.attractors.pointer()), 1e-6));

        sim.apply(Command::TogglePause).unwrap();
        let paused = sim.transform();
        assert!(!paused.abs_diff_eq(running, 1e-3));
    }

    #[test]
    fn view_uniforms_carry_palette_and_pointer() {
        let mut sim = simulation();
        sim.pointer_moved(0.5, -0.25);
        let view = sim.view_uniforms([1400.0, 1400.0]);
        assert_eq!(view.hsv, [0.0, 0.6, 1.0, 1.0]);
        assert_eq!(view.pointer, [0.5, -0.25, 1400.0, 1400.0]);
    }
}
