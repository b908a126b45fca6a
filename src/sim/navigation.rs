//! Navigable floor queries
//!
//! Beans and the spawner never place anything off the floor. The level
//! geometry belongs to the host; the simulation only asks it to snap points.

use glam::Vec3;

use crate::flatten;

/// Host-provided navigable surface
pub trait NavSurface {
    /// Nearest navigable position within `radius` of `point`, if any
    fn sample_position(&self, point: Vec3, radius: f32) -> Option<Vec3>;

    /// Nearest navigable position regardless of distance
    fn clamp(&self, point: Vec3) -> Vec3 {
        self.sample_position(point, f32::INFINITY).unwrap_or(point)
    }
}

/// Flat circular arena floor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiscSurface {
    pub center: Vec3,
    pub radius: f32,
}

impl DiscSurface {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self {
            center,
            radius: radius.max(0.0),
        }
    }

    pub fn contains(&self, point: Vec3) -> bool {
        flatten(point - self.center).length() <= self.radius
    }
}

impl NavSurface for DiscSurface {
    fn sample_position(&self, point: Vec3, radius: f32) -> Option<Vec3> {
        let offset = flatten(point - self.center);
        let dist = offset.length();
        let on_floor = if dist > self.radius {
            self.center + offset * (self.radius / dist)
        } else {
            self.center + offset
        };

        if on_floor.distance(point) <= radius {
            Some(on_floor)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inside_point_snaps_to_floor_height() {
        let floor = DiscSurface::new(Vec3::ZERO, 10.0);
        let hit = floor.sample_position(Vec3::new(3.0, 0.5, 4.0), 1.0).unwrap();
        assert_eq!(hit, Vec3::new(3.0, 0.0, 4.0));
    }

    #[test]
    fn test_outside_point_within_radius_is_pulled_in() {
        let floor = DiscSurface::new(Vec3::ZERO, 10.0);
        let hit = floor.sample_position(Vec3::new(12.0, 0.0, 0.0), 3.0).unwrap();
        assert!((hit - Vec3::new(10.0, 0.0, 0.0)).length() < 1e-5);
        assert!(floor.contains(hit));
    }

    #[test]
    fn test_far_point_has_no_sample() {
        let floor = DiscSurface::new(Vec3::ZERO, 10.0);
        assert!(floor.sample_position(Vec3::new(20.0, 0.0, 0.0), 3.0).is_none());
        let clamped = floor.clamp(Vec3::new(20.0, 0.0, 0.0));
        assert!((clamped.x - 10.0).abs() < 1e-5);
    }
}
