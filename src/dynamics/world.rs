use crate::collision::manifold::MAX_CONTACT_POINTS;
use crate::collision::{Manifold, collide, find_contact_points, intersect_aabb};
use crate::dynamics::solver::{ContactScratch, resolve};
use crate::dynamics::{Body, BodyLimits, ResolveMode};
use crate::math::Vec2;

pub const MIN_ITERATIONS: u32 = 1;
pub const MAX_ITERATIONS: u32 = 128;

/// Stable identifier of a body inside one [`World`]. Unlike list indices,
/// handles are not reused and stay valid when other bodies are removed.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(pub u64);

#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorldConfig {
    pub gravity: Vec2,
    pub limits: BodyLimits,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            // Screen-style axes: +y points down.
            gravity: Vec2::new(0.0, 9.81),
            limits: BodyLimits::default(),
        }
    }
}

pub struct World {
    pub config: WorldConfig,
    bodies: Vec<Body>,
    handles: Vec<BodyHandle>,
    next_handle: u64,
    contact_pairs: Vec<(usize, usize)>,
    contact_points: Vec<Vec2>,
    scratch: ContactScratch,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    #[inline]
    pub fn new() -> Self {
        Self::with_config(WorldConfig::default())
    }

    pub fn with_config(config: WorldConfig) -> Self {
        Self {
            config,
            bodies: Vec::new(),
            handles: Vec::new(),
            next_handle: 0,
            contact_pairs: Vec::new(),
            contact_points: Vec::new(),
            scratch: ContactScratch::default(),
        }
    }

    #[inline]
    pub fn gravity(&self) -> Vec2 {
        self.config.gravity
    }

    pub fn add_body(&mut self, body: Body) -> BodyHandle {
        let handle = BodyHandle(self.next_handle);
        self.next_handle += 1;

        tracing::debug!(
            handle = handle.0,
            shape = ?body.shape_type(),
            is_static = body.is_static(),
            "added body"
        );

        self.bodies.push(body);
        self.handles.push(handle);
        handle
    }

    /// Removes the body and shifts every later body down by one index.
    /// Returns `false` if the handle is not (or no longer) in this world.
    ///
    /// Candidate pairs and contact points of the last step are dropped, since
    /// they refer to the old indices.
    pub fn remove_body(&mut self, handle: BodyHandle) -> bool {
        let Some(index) = self.index_of(handle) else {
            return false;
        };
        self.bodies.remove(index);
        self.handles.remove(index);
        self.contact_pairs.clear();
        self.contact_points.clear();
        tracing::debug!(handle = handle.0, index, "removed body");
        true
    }

    /// Current list index of `handle`.
    #[inline]
    pub fn index_of(&self, handle: BodyHandle) -> Option<usize> {
        self.handles.iter().position(|&h| h == handle)
    }

    #[inline]
    pub fn handle_at(&self, index: usize) -> Option<BodyHandle> {
        self.handles.get(index).copied()
    }

    pub fn body(&self, handle: BodyHandle) -> Option<&Body> {
        self.index_of(handle).map(|i| &self.bodies[i])
    }

    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut Body> {
        self.index_of(handle).map(|i| &mut self.bodies[i])
    }

    #[inline]
    pub fn get_body(&self, index: usize) -> Option<&Body> {
        self.bodies.get(index)
    }

    #[inline]
    pub fn get_body_mut(&mut self, index: usize) -> Option<&mut Body> {
        self.bodies.get_mut(index)
    }

    #[inline]
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn bodies(&self) -> impl Iterator<Item = (BodyHandle, &Body)> {
        self.handles.iter().copied().zip(self.bodies.iter())
    }

    pub fn bodies_mut(&mut self) -> impl Iterator<Item = (BodyHandle, &mut Body)> {
        self.handles.iter().copied().zip(self.bodies.iter_mut())
    }

    /// Contact points found during the last substep of the last step.
    #[inline]
    pub fn contact_points(&self) -> &[Vec2] {
        &self.contact_points
    }

    /// Broad-phase pairs of the last substep of the last step.
    pub fn candidate_pairs(&self) -> impl Iterator<Item = (BodyHandle, BodyHandle)> + '_ {
        self.contact_pairs
            .iter()
            .map(|&(i, j)| (self.handles[i], self.handles[j]))
    }

    pub fn clear(&mut self) {
        self.bodies.clear();
        self.handles.clear();
        self.contact_pairs.clear();
        self.contact_points.clear();
    }

    /// Advances the world by `dt`, split into `iterations` substeps
    /// (clamped to `MIN_ITERATIONS..=MAX_ITERATIONS`). Each substep
    /// integrates every body, then, unless `mode` is [`ResolveMode::None`],
    /// runs the broad phase, separates overlapping pairs and resolves their
    /// velocities according to `mode`.
    ///
    /// A non-finite `dt` leaves the world untouched.
    pub fn step(&mut self, dt: f32, iterations: u32, mode: ResolveMode) {
        if !dt.is_finite() {
            return;
        }
        let iterations = iterations.clamp(MIN_ITERATIONS, MAX_ITERATIONS);

        for _ in 0..iterations {
            self.contact_pairs.clear();
            self.contact_points.clear();

            self.step_bodies(dt, iterations);

            if mode == ResolveMode::None {
                continue;
            }

            self.broad_phase();
            self.narrow_phase(mode);
        }

        tracing::trace!(
            bodies = self.bodies.len(),
            pairs = self.contact_pairs.len(),
            contacts = self.contact_points.len(),
            ?mode,
            "world step"
        );
    }

    fn step_bodies(&mut self, dt: f32, iterations: u32) {
        let gravity = self.config.gravity;
        for body in &mut self.bodies {
            body.step(dt, gravity, iterations);
        }
    }

    // O(n^2) broad-phase
    fn broad_phase(&mut self) {
        let n = self.bodies.len();
        for i in 0..n {
            for j in i + 1..n {
                if self.bodies[i].is_static() && self.bodies[j].is_static() {
                    continue;
                }

                let aabb_a = self.bodies[i].aabb();
                let aabb_b = self.bodies[j].aabb();
                if !intersect_aabb(&aabb_a, &aabb_b) {
                    continue;
                }

                self.contact_pairs.push((i, j));
            }
        }
    }

    fn narrow_phase(&mut self, mode: ResolveMode) {
        // Split world so we can borrow parts at the same time.
        let World {
            bodies,
            contact_pairs,
            contact_points,
            scratch,
            ..
        } = self;

        for &(i, j) in contact_pairs.iter() {
            let (a, b) = bodies_two_mut(bodies, i, j);

            let Some(hit) = collide(a, b) else {
                continue;
            };

            separate_bodies(a, b, hit.normal * hit.depth);

            let mut contacts = [Vec2::ZERO; MAX_CONTACT_POINTS];
            let count = find_contact_points(&mut contacts, a, b);
            let manifold = Manifold::new(i, j, hit.normal, hit.depth, contacts, count);

            contact_points.extend_from_slice(manifold.contact_points());

            resolve(mode, &manifold, a, b, scratch);
        }
    }
}

/// Pushes the pair apart along the minimum translation vector `mtv`
/// (pointing from `a` to `b`). A static side does not move.
fn separate_bodies(a: &mut Body, b: &mut Body, mtv: Vec2) {
    if a.is_static() {
        b.move_by(mtv);
    } else if b.is_static() {
        a.move_by(-mtv);
    } else {
        a.move_by(-mtv / 2.0);
        b.move_by(mtv / 2.0);
    }
}

pub fn bodies_two_mut(bodies: &mut [Body], a: usize, b: usize) -> (&mut Body, &mut Body) {
    assert!(a != b, "bodies_two_mut called with identical indices");

    let (i, j) = if a <= b { (a, b) } else { (b, a) };
    let (left, right) = bodies.split_at_mut(j);
    let bi = &mut left[i];
    let bj = &mut right[0];

    if a < b { (bi, bj) } else { (bj, bi) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn zero_gravity() -> World {
        World::with_config(WorldConfig {
            gravity: Vec2::ZERO,
            ..WorldConfig::default()
        })
    }

    #[test]
    fn add_body_returns_valid_handle() {
        let mut world = World::new();
        let h = world.add_body(Body::create_box(1.0, 1.0, 1.0, 0.5, false).unwrap());

        let b = world.body(h).unwrap();
        assert_relative_eq!(b.width(), 1.0);
        assert_eq!(world.index_of(h), Some(0));
        assert_eq!(world.handle_at(0), Some(h));
    }

    #[test]
    fn remove_body_shifts_order_but_keeps_handles() {
        let mut world = World::new();
        let a = world.add_body(Body::create_circle(1.0, 1.0, 0.5, false).unwrap());
        let b = world.add_body(Body::create_circle(2.0, 1.0, 0.5, false).unwrap());
        let c = world.add_body(Body::create_circle(3.0, 1.0, 0.5, false).unwrap());

        assert!(world.remove_body(a));
        assert!(!world.remove_body(a));

        assert_eq!(world.body_count(), 2);
        assert_eq!(world.index_of(b), Some(0));
        assert_eq!(world.index_of(c), Some(1));
        assert_relative_eq!(world.get_body(0).unwrap().radius(), 2.0);
        assert!(world.get_body(2).is_none());
        assert!(world.body(a).is_none());

        let d = world.add_body(Body::create_circle(1.0, 1.0, 0.5, false).unwrap());
        assert_ne!(d, a);
    }

    #[test]
    fn step_static_body_does_not_move() {
        let mut world = World::new();
        let h = world.add_body(Body::create_box(1.0, 1.0, 1.0, 0.5, true).unwrap());
        world.body_mut(h).unwrap().move_to(Vec2::new(0.0, 5.0));

        world.step(0.1, 10, ResolveMode::Basic);

        let b = world.body(h).unwrap();
        assert_relative_eq!(b.position().y, 5.0);
        assert_eq!(b.linear_velocity(), Vec2::ZERO);
    }

    #[test]
    fn free_fall_accumulates_full_gravity_per_step() {
        let mut world = World::with_config(WorldConfig {
            gravity: Vec2::new(0.0, 10.0),
            ..WorldConfig::default()
        });
        let h = world.add_body(Body::create_circle(1.0, 1.0, 0.5, false).unwrap());

        world.step(0.1, 1, ResolveMode::None);
        let b = world.body(h).unwrap();
        assert_relative_eq!(b.linear_velocity().y, 1.0, epsilon = 1e-6);
        assert_relative_eq!(b.position().y, 0.1, epsilon = 1e-6);

        // Ten substeps: v gains g*dt overall, position follows the
        // semi-implicit sum (dt/n)^2 * g * (1 + 2 + ... + n).
        world.step(0.1, 10, ResolveMode::None);
        let b = world.body(h).unwrap();
        assert_relative_eq!(b.linear_velocity().y, 2.0, epsilon = 1e-5);
        assert_relative_eq!(b.position().y, 0.1 + 0.1 + 0.0001 * 10.0 * 55.0, epsilon = 1e-5);
    }

    #[test]
    fn iteration_count_is_clamped() {
        let mut world = World::with_config(WorldConfig {
            gravity: Vec2::new(0.0, 10.0),
            ..WorldConfig::default()
        });
        let h = world.add_body(Body::create_circle(1.0, 1.0, 0.5, false).unwrap());

        // Zero iterations behaves like one.
        world.step(0.1, 0, ResolveMode::None);
        assert_relative_eq!(world.body(h).unwrap().position().y, 0.1, epsilon = 1e-6);

        world.step(0.1, 10_000, ResolveMode::None);
        assert_relative_eq!(world.body(h).unwrap().linear_velocity().y, 2.0, epsilon = 1e-4);
    }

    #[test]
    fn non_finite_dt_is_ignored() {
        let mut world = World::new();
        let h = world.add_body(Body::create_circle(1.0, 1.0, 0.5, false).unwrap());
        world.step(f32::NAN, 4, ResolveMode::Basic);
        world.step(f32::INFINITY, 4, ResolveMode::Basic);
        assert_eq!(world.body(h).unwrap().position(), Vec2::ZERO);
    }

    #[test]
    fn none_mode_skips_collision() {
        let mut world = zero_gravity();
        let a = world.add_body(Body::create_circle(1.0, 1.0, 0.5, false).unwrap());
        let b = world.add_body(Body::create_circle(1.0, 1.0, 0.5, false).unwrap());
        world.body_mut(b).unwrap().move_to(Vec2::new(1.0, 0.0));

        world.step(0.01, 4, ResolveMode::None);

        assert_eq!(world.candidate_pairs().count(), 0);
        assert!(world.contact_points().is_empty());
        assert_eq!(world.body(a).unwrap().position(), Vec2::ZERO);
    }

    #[test]
    fn collision_only_separates_without_changing_velocity() {
        let mut world = zero_gravity();
        let a = world.add_body(Body::create_circle(1.0, 1.0, 0.5, false).unwrap());
        let b = world.add_body(Body::create_circle(1.0, 1.0, 0.5, false).unwrap());
        world.body_mut(b).unwrap().move_to(Vec2::new(1.0, 0.0));
        world.body_mut(a).unwrap().set_linear_velocity(Vec2::new(0.0, 0.0));

        world.step(0.01, 1, ResolveMode::CollisionOnly);

        let pa = world.body(a).unwrap().position();
        let pb = world.body(b).unwrap().position();
        assert_relative_eq!(pa.x, -0.5, epsilon = 1e-5);
        assert_relative_eq!(pb.x, 1.5, epsilon = 1e-5);
        assert_eq!(world.body(a).unwrap().linear_velocity(), Vec2::ZERO);
        assert_eq!(world.contact_points().len(), 1);
    }

    #[test]
    fn static_side_takes_no_separation() {
        let mut world = zero_gravity();
        let ground = world.add_body(Body::create_box(10.0, 2.0, 1.0, 0.0, true).unwrap());
        let ball = world.add_body(Body::create_circle(1.0, 1.0, 0.0, false).unwrap());
        world.body_mut(ball).unwrap().move_to(Vec2::new(0.0, -1.5));

        world.step(0.01, 1, ResolveMode::CollisionOnly);

        assert_eq!(world.body(ground).unwrap().position(), Vec2::ZERO);
        assert_relative_eq!(world.body(ball).unwrap().position().y, -2.0, epsilon = 1e-5);
    }

    #[test]
    fn static_pairs_never_become_candidates() {
        let mut world = zero_gravity();
        let s1 = world.add_body(Body::create_box(4.0, 4.0, 1.0, 0.5, true).unwrap());
        let s2 = world.add_body(Body::create_box(4.0, 4.0, 1.0, 0.5, true).unwrap());
        let d = world.add_body(Body::create_circle(1.0, 1.0, 0.5, false).unwrap());
        world.body_mut(s2).unwrap().move_to(Vec2::new(1.0, 0.0));
        world.body_mut(d).unwrap().move_to(Vec2::new(0.5, 0.0));

        world.step(0.0, 1, ResolveMode::CollisionOnly);

        let pairs: Vec<_> = world.candidate_pairs().collect();
        assert!(!pairs.is_empty());
        assert!(!pairs.contains(&(s1, s2)));
        for (a, b) in pairs {
            assert!(a == d || b == d);
        }
    }

    #[test]
    fn remove_body_drops_last_step_diagnostics() {
        let mut world = zero_gravity();
        let a = world.add_body(Body::create_circle(1.0, 1.0, 0.5, false).unwrap());
        let b = world.add_body(Body::create_circle(1.0, 1.0, 0.5, false).unwrap());
        world.body_mut(b).unwrap().move_to(Vec2::new(1.0, 0.0));

        world.step(0.0, 1, ResolveMode::CollisionOnly);
        assert_eq!(world.candidate_pairs().collect::<Vec<_>>(), vec![(a, b)]);
        assert_eq!(world.contact_points().len(), 1);

        assert!(world.remove_body(a));
        assert_eq!(world.candidate_pairs().count(), 0);
        assert!(world.contact_points().is_empty());

        // Pairs refer to the new indices again after the next step.
        let c = world.add_body(Body::create_circle(1.0, 1.0, 0.5, false).unwrap());
        world.body_mut(c).unwrap().move_to(Vec2::new(2.0, 0.0));
        world.step(0.0, 1, ResolveMode::CollisionOnly);
        assert_eq!(world.candidate_pairs().collect::<Vec<_>>(), vec![(b, c)]);
    }

    #[test]
    fn bodies_two_mut_returns_requested_order() {
        let mut bodies = vec![
            Body::create_circle(1.0, 1.0, 0.5, false).unwrap(),
            Body::create_circle(2.0, 1.0, 0.5, false).unwrap(),
        ];
        let (a, b) = bodies_two_mut(&mut bodies, 1, 0);
        assert_relative_eq!(a.radius(), 2.0);
        assert_relative_eq!(b.radius(), 1.0);
    }

    #[test]
    #[should_panic]
    fn bodies_two_mut_rejects_aliasing() {
        let mut bodies = vec![Body::create_circle(1.0, 1.0, 0.5, false).unwrap()];
        let _ = bodies_two_mut(&mut bodies, 0, 0);
    }
}
