use crate::collision::Manifold;
use crate::collision::manifold::MAX_CONTACT_POINTS;
use crate::dynamics::Body;
use crate::math::Vec2;

/// How far a world step goes after integration.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ResolveMode {
    /// Integrate only; no collision detection.
    None,
    /// Detect and push overlapping bodies apart, leave velocities untouched.
    CollisionOnly,
    /// Single linear impulse per pair, no rotation.
    #[default]
    Basic,
    /// Per-contact impulses with angular response.
    Rotation,
    /// `Rotation` followed by a Coulomb friction pass.
    RotationFriction,
}

/// Per-contact data reused across pairs so resolving a manifold never
/// allocates.
#[derive(Copy, Clone, Debug, Default)]
pub(crate) struct ContactScratch {
    ra: [Vec2; MAX_CONTACT_POINTS],
    rb: [Vec2; MAX_CONTACT_POINTS],
    impulses: [Vec2; MAX_CONTACT_POINTS],
    friction_impulses: [Vec2; MAX_CONTACT_POINTS],
    j: [f32; MAX_CONTACT_POINTS],
}

impl ContactScratch {
    #[inline]
    fn reset(&mut self) {
        *self = Self::default();
    }
}

pub(crate) fn resolve(
    mode: ResolveMode,
    manifold: &Manifold,
    a: &mut Body,
    b: &mut Body,
    scratch: &mut ContactScratch,
) {
    match mode {
        ResolveMode::None | ResolveMode::CollisionOnly => {}
        ResolveMode::Basic => resolve_basic(manifold, a, b),
        ResolveMode::Rotation => {
            apply_normal_impulses(manifold, a, b, scratch);
        }
        ResolveMode::RotationFriction => {
            apply_normal_impulses(manifold, a, b, scratch);
            apply_friction_impulses(manifold, a, b, scratch);
        }
    }
}

/// Coulomb clamp for one contact.
///
/// `jt` is the tangential impulse that would stop sliding, `j` the normal
/// impulse at the same contact and `tangent` the unit sliding direction.
/// Within the static cone the full `jt` is used; otherwise the impulse has
/// magnitude `j * dynamic_friction` and opposes `tangent`.
#[inline]
pub fn friction_impulse(
    jt: f32,
    j: f32,
    tangent: Vec2,
    static_friction: f32,
    dynamic_friction: f32,
) -> Vec2 {
    if jt.abs() <= j * static_friction {
        jt * tangent
    } else {
        -j * dynamic_friction * tangent
    }
}

fn resolve_basic(manifold: &Manifold, a: &mut Body, b: &mut Body) {
    let normal = manifold.normal;
    let relative_velocity = b.linear_velocity() - a.linear_velocity();
    let vn = relative_velocity.dot(normal);

    if vn >= 0.0 {
        return;
    }

    let e = a.restitution().min(b.restitution());
    let j = -(1.0 + e) * vn / (a.inv_mass() + b.inv_mass());
    let impulse = j * normal;

    a.set_linear_velocity(a.linear_velocity() - impulse * a.inv_mass());
    b.set_linear_velocity(b.linear_velocity() + impulse * b.inv_mass());
}

/// Velocity of the contact point on `b` relative to the one on `a`.
#[inline]
fn contact_velocity(a: &Body, b: &Body, ra: Vec2, rb: Vec2) -> Vec2 {
    (b.linear_velocity() + Vec2::cross_scalar_vec(b.angular_velocity(), rb))
        - (a.linear_velocity() + Vec2::cross_scalar_vec(a.angular_velocity(), ra))
}

/// Effective inverse mass of the pair along `dir` at arms `ra`/`rb`.
#[inline]
fn effective_inv_mass(a: &Body, b: &Body, ra: Vec2, rb: Vec2, dir: Vec2) -> f32 {
    let ra_perp_dot = ra.perp().dot(dir);
    let rb_perp_dot = rb.perp().dot(dir);

    a.inv_mass()
        + b.inv_mass()
        + ra_perp_dot * ra_perp_dot * a.inv_inertia()
        + rb_perp_dot * rb_perp_dot * b.inv_inertia()
}

fn apply_normal_impulses(
    manifold: &Manifold,
    a: &mut Body,
    b: &mut Body,
    scratch: &mut ContactScratch,
) {
    let normal = manifold.normal;
    let count = manifold.contact_count;
    let e = a.restitution().min(b.restitution());

    scratch.reset();

    for (i, &contact) in manifold.contact_points().iter().enumerate() {
        let ra = contact - a.position();
        let rb = contact - b.position();
        scratch.ra[i] = ra;
        scratch.rb[i] = rb;

        let vn = contact_velocity(a, b, ra, rb).dot(normal);
        if vn > 0.0 {
            continue;
        }

        let denom = effective_inv_mass(a, b, ra, rb, normal);
        let j = -(1.0 + e) * vn / denom / count as f32;

        scratch.j[i] = j;
        scratch.impulses[i] = j * normal;
    }

    for i in 0..count {
        let impulse = scratch.impulses[i];
        a.apply_impulse(-impulse, scratch.ra[i]);
        b.apply_impulse(impulse, scratch.rb[i]);
    }
}

/// Runs after [`apply_normal_impulses`] and reads the normal impulse
/// magnitudes it left in `scratch`.
fn apply_friction_impulses(
    manifold: &Manifold,
    a: &mut Body,
    b: &mut Body,
    scratch: &mut ContactScratch,
) {
    let normal = manifold.normal;
    let count = manifold.contact_count;

    let static_friction = (a.static_friction() + b.static_friction()) * 0.5;
    let dynamic_friction = (a.dynamic_friction() + b.dynamic_friction()) * 0.5;

    for i in 0..count {
        let ra = scratch.ra[i];
        let rb = scratch.rb[i];

        let relative_velocity = contact_velocity(a, b, ra, rb);
        let tangent = relative_velocity - normal * relative_velocity.dot(normal);

        if tangent.nearly_equal(Vec2::ZERO) {
            continue;
        }
        let tangent = tangent.normalize();

        let denom = effective_inv_mass(a, b, ra, rb, tangent);
        let jt = -relative_velocity.dot(tangent) / denom / count as f32;

        scratch.friction_impulses[i] =
            friction_impulse(jt, scratch.j[i], tangent, static_friction, dynamic_friction);
    }

    for i in 0..count {
        let impulse = scratch.friction_impulses[i];
        a.apply_impulse(-impulse, scratch.ra[i]);
        b.apply_impulse(impulse, scratch.rb[i]);
    }
}
