//! # Collision & Integration Engine
//!
//! One call to [`step`] advances every ball by `dt` seconds.
//!
//! ## Per-ball order (ball index ascending)
//!
//! ```text
//! 1. integrate      p += v * dt
//! 2. X/Z walls      clamp into [-range, range], v_axis = -v_axis * d
//! 3. floor/ceiling  y < r or y > room: y = max(y, r), v = (vx*d, -vy*d, vz*d)
//! 4. pairs j > i    separate to touching (a wall-pinned ball's share goes
//!                   to its partner), exchange normal velocity
//! 5. gravity        vy -= g * dt
//! ```
//!
//! Pair resolution is sequential: a ball moved or re-aimed by pair `(i, j)`
//! is seen in that state by pair `(i, k)` later in the same tick. Every
//! unordered pair is visited exactly once, so the step is O(n²).
//!
//! The ceiling is not a hard wall. A ball above `room_size` has its
//! velocity reflected and damped but its height is left alone.

use crate::config::SimConfig;
use crate::math::Vec3;
use crate::state::SimulationState;

/// Below this center distance two balls are treated as coincident and
/// separated along [`Vec3::Y`].
pub const COINCIDENT_EPSILON: f32 = 1e-6;

/// Counters for one [`step`], for logging and tests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepReport {
    /// X/Z wall contacts.
    pub wall_bounces: u32,
    /// Floor or ceiling contacts.
    pub floor_bounces: u32,
    /// Interpenetrating pairs resolved.
    pub contacts: u32,
    /// Pairs whose centers coincided and were split along the fallback axis.
    pub coincident: u32,
}

/// Room geometry derived once per step.
#[derive(Clone, Copy, Debug)]
struct Room {
    /// Largest allowed |x| and |z| of a ball center.
    range: f32,
    radius: f32,
    height: f32,
    dampening: f32,
}

impl Room {
    fn new(config: &SimConfig) -> Self {
        Self {
            range: config.room_size / 2.0 - config.radius,
            radius: config.radius,
            height: config.room_size,
            dampening: config.dampening,
        }
    }

    /// Clamps an X or Z component, reflecting and damping its velocity.
    fn bounce_axis(&self, position: &mut f32, velocity: &mut f32) -> bool {
        if *position < -self.range || *position > self.range {
            *position = position.clamp(-self.range, self.range);
            *velocity = -*velocity * self.dampening;
            true
        } else {
            false
        }
    }

    /// Floor and ceiling contact. Damps all three axes.
    fn bounce_floor(&self, position: &mut Vec3, velocity: &mut Vec3) -> bool {
        if position.y < self.radius || position.y > self.height {
            position.y = position.y.max(self.radius);
            velocity.x *= self.dampening;
            velocity.y = -velocity.y * self.dampening;
            velocity.z *= self.dampening;
            true
        } else {
            false
        }
    }

    /// Pulls a center back inside the walls and above the floor without
    /// touching its velocity. Returns the correction applied.
    fn contain(&self, position: &mut Vec3) -> Vec3 {
        let before = *position;
        position.x = position.x.clamp(-self.range, self.range);
        position.z = position.z.clamp(-self.range, self.range);
        position.y = position.y.max(self.radius);
        *position - before
    }
}

/// Advances the simulation by `dt` seconds.
///
/// Never fails. Coincident centers are split along a fixed axis instead of
/// normalizing a zero vector.
pub fn step(state: &mut SimulationState, dt: f32) -> StepReport {
    let config = *state.config();
    let room = Room::new(&config);
    let count = config.num_balls;
    let (positions, velocities) = state.arenas_mut();
    let mut report = StepReport::default();

    for i in 0..count {
        let mut position = Vec3::load(positions, i);
        let mut velocity = Vec3::load(velocities, i);

        position += velocity * dt;

        if room.bounce_axis(&mut position.x, &mut velocity.x) {
            report.wall_bounces += 1;
        }
        if room.bounce_axis(&mut position.z, &mut velocity.z) {
            report.wall_bounces += 1;
        }
        if room.bounce_floor(&mut position, &mut velocity) {
            report.floor_bounces += 1;
        }

        position.store(positions, i);
        velocity.store(velocities, i);

        for j in (i + 1)..count {
            resolve_pair(positions, velocities, i, j, &room, &mut report);
        }

        let mut velocity = Vec3::load(velocities, i);
        velocity.y -= config.gravity * dt;
        velocity.store(velocities, i);
    }

    tracing::trace!(
        dt,
        contacts = report.contacts,
        wall_bounces = report.wall_bounces,
        floor_bounces = report.floor_bounces,
        "step"
    );

    report
}

/// Separates and re-aims balls `i` and `j` if they interpenetrate.
///
/// Equal masses, no friction, restitution 1: only the velocity components
/// along the contact normal are exchanged.
fn resolve_pair(
    positions: &mut [f32],
    velocities: &mut [f32],
    i: usize,
    j: usize,
    room: &Room,
    report: &mut StepReport,
) {
    let mut pi = Vec3::load(positions, i);
    let mut pj = Vec3::load(positions, j);

    let offset = pi - pj;
    let distance = offset.length();
    if distance >= 2.0 * room.radius {
        return;
    }

    let normal = if distance > COINCIDENT_EPSILON {
        offset * (1.0 / distance)
    } else {
        report.coincident += 1;
        tracing::warn!(i, j, distance, "coincident balls, separating along +Y");
        Vec3::Y
    };

    // Each ball moves half the penetration depth. Whatever a wall takes
    // back from one ball is handed to its partner.
    let push = normal * (room.radius - 0.5 * distance);
    pi += push;
    pj -= push;
    let lost = room.contain(&mut pi);
    pj += lost;
    let lost = room.contain(&mut pj);
    pi += lost;
    room.contain(&mut pi);
    pi.store(positions, i);
    pj.store(positions, j);

    let mut vi = Vec3::load(velocities, i);
    let mut vj = Vec3::load(velocities, j);
    let impulse = (vi - vj).dot(normal);
    vi -= normal * impulse;
    vj += normal * impulse;
    vi.store(velocities, i);
    vj.store(velocities, j);

    report.contacts += 1;
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 0.01;

    /// Room 10, radius 1, dampening 0.5, no gravity.
    fn state(num_balls: usize) -> SimulationState {
        let config = SimConfig::new(num_balls, 10.0, 1.0, 0.5, 100.0).with_gravity(0.0);
        SimulationState::zeroed(config).unwrap()
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_integration_moves_by_velocity() {
        let mut s = state(1);
        s.set_ball(0, Vec3::new(0.0, 5.0, 0.0), Vec3::new(1.0, 2.0, -3.0));

        let report = step(&mut s, DT);

        assert_eq!(report, StepReport::default());
        let p = s.position(0);
        assert!(approx(p.x, 0.01) && approx(p.y, 5.02) && approx(p.z, -0.03), "{p:?}");
    }

    #[test]
    fn test_x_wall_clamps_and_damps_only_that_axis() {
        let mut s = state(1);
        // range = 10/2 - 1 = 4
        s.set_ball(0, Vec3::new(3.99, 5.0, 0.0), Vec3::new(2.0, 0.0, 1.0));

        let report = step(&mut s, DT);

        assert_eq!(report.wall_bounces, 1);
        assert_eq!(s.position(0).x, 4.0);
        assert_eq!(s.velocity(0), Vec3::new(-1.0, 0.0, 1.0));
    }

    #[test]
    fn test_z_wall_negative_side() {
        let mut s = state(1);
        s.set_ball(0, Vec3::new(0.0, 5.0, -3.999), Vec3::new(0.0, 0.0, -1.0));

        step(&mut s, DT);

        assert_eq!(s.position(0).z, -4.0);
        assert_eq!(s.velocity(0).z, 0.5);
    }

    #[test]
    fn test_floor_bounce_damps_all_axes() {
        let mut s = state(1);
        s.set_ball(0, Vec3::new(0.0, 1.005, 0.0), Vec3::new(2.0, -1.0, 4.0));

        let report = step(&mut s, DT);

        assert_eq!(report.floor_bounces, 1);
        assert_eq!(s.position(0).y, 1.0);
        assert_eq!(s.velocity(0), Vec3::new(1.0, 0.5, 2.0));
    }

    #[test]
    fn test_ceiling_reflects_without_clamping() {
        let mut s = state(1);
        s.set_ball(0, Vec3::new(0.0, 10.0, 0.0), Vec3::new(0.0, 1.0, 0.0));

        step(&mut s, DT);

        // Above the room: velocity flips, height is not pulled down.
        assert!(s.position(0).y > 10.0);
        assert_eq!(s.velocity(0).y, -0.5);
    }

    #[test]
    fn test_gravity_applied_once_per_ball() {
        let config = SimConfig::new(2, 10.0, 1.0, 0.5, 100.0).with_gravity(10.0);
        let mut s = SimulationState::zeroed(config).unwrap();
        s.set_ball(0, Vec3::new(-3.0, 5.0, 0.0), Vec3::ZERO);
        s.set_ball(1, Vec3::new(3.0, 5.0, 0.0), Vec3::ZERO);

        step(&mut s, DT);

        assert!(approx(s.velocity(0).y, -0.1));
        assert!(approx(s.velocity(1).y, -0.1));
        // Gravity lands after integration.
        assert_eq!(s.position(0).y, 5.0);
    }

    #[test]
    fn test_overlapping_pair_is_separated_to_touching() {
        let mut s = state(2);
        s.set_ball(0, Vec3::new(-0.5, 5.0, 0.0), Vec3::ZERO);
        s.set_ball(1, Vec3::new(0.5, 5.0, 0.0), Vec3::ZERO);

        let report = step(&mut s, DT);

        assert_eq!(report.contacts, 1);
        assert!(approx(s.position(0).x, -1.0));
        assert!(approx(s.position(1).x, 1.0));
        assert!(s.position(0).distance(s.position(1)) >= 2.0 - 1e-5);
    }

    #[test]
    fn test_head_on_exchange_conserves_normal_momentum() {
        let mut s = state(2);
        s.set_ball(0, Vec3::new(-0.9, 5.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
        s.set_ball(1, Vec3::new(0.9, 5.0, 0.0), Vec3::new(-2.0, 0.0, 0.0));

        step(&mut s, 0.0);

        // Equal masses swap their normal components.
        assert!(approx(s.velocity(0).x, -2.0));
        assert!(approx(s.velocity(1).x, 1.0));
        let before = 1.0 + -2.0;
        let after = s.velocity(0).x + s.velocity(1).x;
        assert!(approx(before, after));
    }

    #[test]
    fn test_tangential_velocity_untouched() {
        let mut s = state(2);
        s.set_ball(0, Vec3::new(-0.5, 5.0, 0.0), Vec3::new(1.0, 0.0, 3.0));
        s.set_ball(1, Vec3::new(0.5, 5.0, 0.0), Vec3::new(0.0, 0.0, -2.0));

        step(&mut s, 0.0);

        assert!(approx(s.velocity(0).z, 3.0));
        assert!(approx(s.velocity(1).z, -2.0));
        assert!(approx(s.velocity(0).x, 0.0));
        assert!(approx(s.velocity(1).x, 1.0));
    }

    #[test]
    fn test_coincident_balls_stay_finite() {
        let mut s = state(2);
        s.set_ball(0, Vec3::new(0.0, 5.0, 0.0), Vec3::new(0.0, -1.0, 0.0));
        s.set_ball(1, Vec3::new(0.0, 5.0, 0.0), Vec3::new(0.0, 1.0, 0.0));

        let report = step(&mut s, 0.0);

        assert_eq!(report.coincident, 1);
        for i in 0..2 {
            assert!(s.position(i).is_finite());
            assert!(s.velocity(i).is_finite());
        }
        assert!(approx(s.position(0).y, 6.0));
        assert!(approx(s.position(1).y, 4.0));
        // Exchanged along +Y.
        assert!(approx(s.velocity(0).y, 1.0));
        assert!(approx(s.velocity(1).y, -1.0));
    }

    #[test]
    fn test_separation_respects_walls() {
        let mut s = state(2);
        s.set_ball(0, Vec3::new(3.5, 5.0, 0.0), Vec3::ZERO);
        s.set_ball(1, Vec3::new(4.0, 5.0, 0.0), Vec3::ZERO);

        step(&mut s, 0.0);

        // Ball 1 is pinned at the wall, so ball 0 takes the whole push.
        assert_eq!(s.position(1).x, 4.0);
        assert!(approx(s.position(0).x, 2.0));
        assert!(s.position(0).distance(s.position(1)) >= 2.0 - 1e-5);
    }

    #[test]
    fn test_wall_pinned_pair_separates_in_one_step() {
        let mut s = state(2);
        // Ball 0 against the wall, partner inside.
        s.set_ball(0, Vec3::new(4.0, 5.0, 0.0), Vec3::ZERO);
        s.set_ball(1, Vec3::new(3.5, 5.0, 0.5), Vec3::ZERO);

        let report = step(&mut s, 0.0);

        assert_eq!(report.contacts, 1);
        assert!(s.position(0).x <= 4.0);
        assert!(s.position(0).distance(s.position(1)) >= 2.0 - 1e-5);
        assert!(approx(s.position(1).x, 4.0 - 2.0_f32.sqrt()));
    }

    #[test]
    fn test_floor_pinned_pair_separates() {
        let mut s = state(2);
        s.set_ball(0, Vec3::new(0.0, 1.0, 0.0), Vec3::ZERO);
        s.set_ball(1, Vec3::new(0.0, 1.5, 0.0), Vec3::ZERO);

        step(&mut s, 0.0);

        assert_eq!(s.position(0).y, 1.0);
        assert!(approx(s.position(1).y, 3.0));
    }

    #[test]
    fn test_updates_are_visible_to_later_pairs() {
        // Ball 0 is pushed by ball 1, then meets ball 2 at its new position.
        let mut s = state(3);
        s.set_ball(0, Vec3::new(0.0, 5.0, 0.0), Vec3::ZERO);
        s.set_ball(1, Vec3::new(1.0, 5.0, 0.0), Vec3::ZERO);
        s.set_ball(2, Vec3::new(-2.25, 5.0, 0.0), Vec3::ZERO);

        let report = step(&mut s, 0.0);

        // Pair (0,1) pushes ball 0 to x = -0.5, which now overlaps ball 2
        // (distance 1.75): each moves 0.125 apart.
        assert_eq!(report.contacts, 2);
        assert!(approx(s.position(0).x, -0.375));
        assert!(approx(s.position(2).x, -2.375));
    }
}
