use std::f32::consts::PI;

use glam::{Mat4, Vec2, Vec3};

use crate::simulation::controls::step;

pub(crate) const FIELD_OF_VIEW_DEGREES: f32 = 90.0;
pub(crate) const NEAR: f32 = 0.1;
pub(crate) const FAR: f32 = 50.0;

pub(crate) const DEFAULT_PAN: f32 = 0.0;
pub(crate) const DEFAULT_DOLLY: f32 = -1.5;
pub(crate) const MOVE_STEP: f32 = 0.02;
const PAN_LIMIT: f32 = 5.0;
const DOLLY_RANGE: (f32, f32) = (-45.0, 1.0);

// Camera struct to encapsulate camera-related functionality
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Camera {
    pan: f32,   // x offset of the world
    dolly: f32, // z offset of the world
    projection: Mat4,
}

impl Camera {
    /// The projection is fixed here and never changes afterwards.
    pub(crate) fn new(aspect: f32) -> Self {
        Self {
            pan: DEFAULT_PAN,
            dolly: DEFAULT_DOLLY,
            projection: Mat4::perspective_rh(
                FIELD_OF_VIEW_DEGREES.to_radians(),
                aspect,
                NEAR,
                FAR,
            ),
        }
    }

    #[cfg(test)]
    pub(crate) fn pan(&self) -> f32 {
        self.pan
    }

    #[cfg(test)]
    pub(crate) fn dolly(&self) -> f32 {
        self.dolly
    }

    #[cfg(test)]
    pub(crate) fn projection(&self) -> Mat4 {
        self.projection
    }

    /// Moves sideways, returning how far the camera actually went after
    /// clamping.
    pub(crate) fn pan_by(&mut self, delta: f32) -> f32 {
        let before = self.pan;
        self.pan = step(self.pan, delta, -PAN_LIMIT, PAN_LIMIT);
        self.pan - before
    }

    pub(crate) fn dolly_by(&mut self, delta: f32) {
        self.dolly = step(self.dolly, delta, DOLLY_RANGE.0, DOLLY_RANGE.1);
    }

    pub(crate) fn reset_position(&mut self) {
        self.pan = DEFAULT_PAN;
        self.dolly = DEFAULT_DOLLY;
    }

    pub(crate) fn translation(&self) -> Mat4 {
        Mat4::from_translation(Vec3::new(self.pan, 0.0, self.dolly))
    }

    /// Yaw follows the horizontal pointer, pitch the vertical one, both
    /// spanning half a turn each way.
    pub(crate) fn orientation(pointer: Vec2) -> Mat4 {
        let pitch = Mat4::from_rotation_x(pointer.y * PI);
        let yaw = Mat4::from_rotation_y(-pointer.x * PI);
        pitch * yaw
    }

    /// Combined matrix for the vertex stage. The pointer only steers the
    /// camera while the simulation is paused; a running simulation is always
    /// viewed head-on.
    pub(crate) fn transform(&self, paused: bool, pointer: Vec2) -> Mat4 {
        let orientation = if paused {
            Self::orientation(pointer)
        } else {
            Mat4::IDENTITY
        };

        // Column-major, so this reads right to left: rotate, translate, project
        self.projection * self.translation() * orientation
    }
}
