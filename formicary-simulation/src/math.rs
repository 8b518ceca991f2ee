//! Ground-plane vector helpers shared by the behavior systems.

use glam::{Quat, Vec3};

/// Distance between two points projected onto the ground plane (x/z).
pub fn ground_distance(a: Vec3, b: Vec3) -> f32 {
    let dx = a.x - b.x;
    let dz = a.z - b.z;
    (dx * dx + dz * dz).sqrt()
}

/// Unit heading from one point toward another on the ground plane, or
/// `None` when the points coincide.
pub fn direction_to(from: Vec3, to: Vec3) -> Option<Vec3> {
    let d = Vec3::new(to.x - from.x, 0.0, to.z - from.z);
    (d.length_squared() > f32::EPSILON).then(|| d.normalize())
}

/// Rotates a vector around the vertical axis.
pub fn rotate_y(v: Vec3, angle_radians: f32) -> Vec3 {
    Quat::from_rotation_y(angle_radians) * v
}

/// World positions of the three sensor cones: local offsets rotated by
/// the shortest-arc rotation taking canonical forward (+z) onto the
/// heading, then translated by the agent position.
pub fn sensor_world_positions(
    position: Vec3,
    heading: Vec3,
    offsets: [Vec3; 3],
) -> [Vec3; 3] {
    let heading = heading.normalize_or_zero();
    let rotation = if heading == Vec3::ZERO {
        Quat::IDENTITY
    } else {
        Quat::from_rotation_arc(Vec3::Z, heading)
    };

    [
        position + rotation * offsets[0],
        position + rotation * offsets[1],
        position + rotation * offsets[2],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn ground_distance_ignores_elevation() {
        let a = Vec3::new(0.0, 10.0, 0.0);
        let b = Vec3::new(3.0, -5.0, 4.0);
        assert!((ground_distance(a, b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn direction_to_is_unit_and_planar() {
        let d = direction_to(Vec3::ZERO, Vec3::new(10.0, 3.0, 0.0)).unwrap();
        assert!(approx(d, Vec3::X));
        assert!(direction_to(Vec3::ONE, Vec3::ONE).is_none());
    }

    #[test]
    fn sensors_rotate_with_heading() {
        let offsets = [
            Vec3::new(0.0, 0.0, 2.0),
            Vec3::new(-1.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 1.0),
        ];
        // Facing +x: local +z maps to +x, local -x maps to +z.
        let [front, left, right] =
            sensor_world_positions(Vec3::ZERO, Vec3::X, offsets);
        assert!(approx(front, Vec3::new(2.0, 0.0, 0.0)));
        assert!(approx(left, Vec3::new(1.0, 0.0, 1.0)));
        assert!(approx(right, Vec3::new(1.0, 0.0, -1.0)));
    }

    #[test]
    fn rotate_y_quarter_turn() {
        let v = rotate_y(Vec3::Z, std::f32::consts::FRAC_PI_2);
        assert!(approx(v, Vec3::X));
    }
}
