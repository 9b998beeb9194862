use glam::Vec2;

use crate::simulation::types::AttractorUniform;

pub(crate) const MAX_ATTRACTORS: usize = 10;

pub(crate) const DEFAULT_STRENGTH: f32 = 0.05;
pub(crate) const MIN_STRENGTH: f32 = 0.002;
pub(crate) const STRENGTH_STEP: f32 = 0.001;

/// The pointer plus the points it has pinned down.
///
/// Storage is a fixed array: once ten points are active further presses are
/// ignored, and clearing only resets the count so stale positions stay in
/// the array, masked by `n`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AttractorSet {
    pub(crate) x: f32,
    pub(crate) y: f32,
    pub(crate) z: f32,
    n: usize,
    points: [[f32; 2]; MAX_ATTRACTORS],
    strength: f32,
    spawn_count: u32,
}

impl Default for AttractorSet {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            n: 0,
            points: [[0.0; 2]; MAX_ATTRACTORS],
            strength: DEFAULT_STRENGTH,
            spawn_count: 0,
        }
    }
}

impl AttractorSet {
    pub(crate) fn pointer(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub(crate) fn set_pointer(&mut self, x: f32, y: f32) {
        self.x = x;
        self.y = y;
    }

    /// Pins the current pointer position. Returns `false` when full.
    pub(crate) fn pin_pointer(&mut self) -> bool {
        if self.n >= MAX_ATTRACTORS {
            return false;
        }
        self.points[self.n] = [self.x, self.y];
        self.n += 1;
        true
    }

    pub(crate) fn clear(&mut self) {
        self.n = 0;
    }

    pub(crate) fn len(&self) -> usize {
        self.n
    }

    pub(crate) fn points(&self) -> &[[f32; 2]] {
        &self.points[..self.n]
    }

    pub(crate) fn strength(&self) -> f32 {
        self.strength
    }

    pub(crate) fn strengthen(&mut self) {
        self.strength += STRENGTH_STEP;
    }

    pub(crate) fn weaken(&mut self) {
        self.strength = (self.strength - STRENGTH_STEP).max(MIN_STRENGTH);
    }

    /// Keeps the active points glued to a particle field that was just
    /// scaled by `factor`.
    pub(crate) fn rescale(&mut self, factor: f32) {
        for point in &mut self.points[..self.n] {
            point[0] *= factor;
            point[1] *= factor;
        }
    }

    #[cfg(test)]
    pub(crate) fn spawn_count(&self) -> u32 {
        self.spawn_count
    }

    pub(crate) fn advance_spawn(&mut self, batch: u32, capacity: u32) {
        if capacity > 0 {
            self.spawn_count = ((u64::from(self.spawn_count) + u64::from(batch))
                % u64::from(capacity)) as u32;
        }
    }

    pub(crate) fn to_uniform(&self, spawn_batch: u32) -> AttractorUniform {
        let mut points = [[0.0; 4]; MAX_ATTRACTORS];
        for (slot, point) in points.iter_mut().zip(self.points()) {
            *slot = [point[0], point[1], 0.0, 0.0];
        }
        AttractorUniform {
            cursor: [self.x, self.y, self.z, self.strength],
            counts: [self.n as u32, self.spawn_count, spawn_batch, 0],
            points,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eleventh_press_is_ignored() {
        let mut set = AttractorSet::default();
        for i in 0..MAX_ATTRACTORS {
            set.set_pointer(i as f32 * 0.1, -(i as f32) * 0.1);
            assert!(set.pin_pointer());
        }
        let before = set.clone();

        set.set_pointer(0.9, 0.9);
        for _ in 0..50 {
            assert!(!set.pin_pointer());
        }

        assert_eq!(set.len(), MAX_ATTRACTORS);
        assert_eq!(set.points(), before.points());
    }

    #[test]
    fn clear_masks_points_and_reuses_storage() {
        let mut set = AttractorSet::default();
        set.set_pointer(0.5, 0.25);
        set.pin_pointer();
        set.pin_pointer();
        set.clear();
        assert_eq!(set.len(), 0);
        assert!(set.points().is_empty());

        set.set_pointer(-0.5, 0.75);
        set.pin_pointer();
        assert_eq!(set.points(), &[[-0.5, 0.75]]);
    }

    #[test]
    fn strength_has_a_floor_but_no_ceiling() {
        let mut set = AttractorSet::default();
        for _ in 0..1000 {
            set.weaken();
            assert!(set.strength() >= MIN_STRENGTH);
        }
        assert_eq!(set.strength(), MIN_STRENGTH);

        for _ in 0..2000 {
            set.strengthen();
        }
        assert!(set.strength() > 1.9);
    }

    #[test]
    fn rescale_round_trips() {
        let mut set = AttractorSet::default();
        for (x, y) in [(0.3, -0.7), (-0.9, 0.1), (0.05, 0.95)] {
            set.set_pointer(x, y);
            set.pin_pointer();
        }
        let original = set.points().to_vec();

        for _ in 0..7 {
            set.rescale(0.9);
        }
        for _ in 0..7 {
            set.rescale(1.0 / 0.9);
        }

        for (now, then) in set.points().iter().zip(&original) {
            assert!((now[0] - then[0]).abs() < 1e-5);
            assert!((now[1] - then[1]).abs() < 1e-5);
        }
    }

    #[test]
    fn rescale_leaves_inactive_slots_alone() {
        let mut set = AttractorSet::default();
        set.set_pointer(0.5, 0.5);
        set.pin_pointer();
        set.clear();
        set.rescale(0.5);
        set.pin_pointer();
        assert_eq!(set.points(), &[[0.5, 0.5]]);
    }

    #[test]
    fn spawn_cursor_wraps_at_capacity() {
        let mut set = AttractorSet::default();
        set.advance_spawn(100, 250);
        set.advance_spawn(100, 250);
        assert_eq!(set.spawn_count(), 200);
        set.advance_spawn(100, 250);
        assert_eq!(set.spawn_count(), 50);
    }

    #[test]
    fn uniform_packs_active_points_only() {
        let mut set = AttractorSet::default();
        set.set_pointer(0.25, -0.5);
        set.pin_pointer();
        set.z = 0.1;

        let uniform = set.to_uniform(7);
        assert_eq!(uniform.cursor, [0.25, -0.5, 0.1, DEFAULT_STRENGTH]);
        assert_eq!(uniform.counts, [1, 0, 7, 0]);
        assert_eq!(uniform.points[0], [0.25, -0.5, 0.0, 0.0]);
        assert_eq!(uniform.points[1], [0.0; 4]);
    }
}
