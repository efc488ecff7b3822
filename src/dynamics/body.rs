use core::f32::consts::PI;
use core::fmt;

use crate::collision::Aabb;
use crate::math::{Transform, Vec2};

pub const MIN_BODY_SIZE: f32 = 0.001;
pub const MAX_BODY_SIZE: f32 = 64.0 * 64.0;

// g/cm^3
pub const MIN_DENSITY: f32 = 0.5;
pub const MAX_DENSITY: f32 = 22.0;

pub const DEFAULT_STATIC_FRICTION: f32 = 0.6;
pub const DEFAULT_DYNAMIC_FRICTION: f32 = 0.4;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ShapeType {
    Circle,
    Box,
}

/// Local-space box geometry plus its cached world-space corners.
#[derive(Clone, Debug, PartialEq)]
pub struct BoxShape {
    pub width: f32,
    pub height: f32,
    vertices: [Vec2; 4],
    transformed: [Vec2; 4],
}

impl BoxShape {
    fn new(width: f32, height: f32) -> Self {
        let left = -width / 2.0;
        let right = left + width;
        let top = -height / 2.0;
        let bottom = top + height;

        let vertices = [
            Vec2::new(left, top),
            Vec2::new(right, top),
            Vec2::new(right, bottom),
            Vec2::new(left, bottom),
        ];

        Self {
            width,
            height,
            vertices,
            transformed: vertices,
        }
    }

    /// Corners in body space, wound (-,-), (+,-), (+,+), (-,+).
    #[inline]
    pub fn local_vertices(&self) -> &[Vec2; 4] {
        &self.vertices
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    Circle { radius: f32 },
    Box(BoxShape),
}

impl Shape {
    #[inline]
    pub fn shape_type(&self) -> ShapeType {
        match self {
            Shape::Circle { .. } => ShapeType::Circle,
            Shape::Box(_) => ShapeType::Box,
        }
    }

    pub fn area(&self) -> f32 {
        match self {
            Shape::Circle { radius } => PI * radius * radius,
            Shape::Box(b) => b.width * b.height,
        }
    }

    /// Radius, or both box sides, strictly positive. NaN fails.
    fn has_positive_extent(&self) -> bool {
        match self {
            Shape::Circle { radius } => *radius > 0.0,
            Shape::Box(b) => b.width > 0.0 && b.height > 0.0,
        }
    }

    /// Moment of inertia about the centroid for a body of mass `mass`.
    pub fn inertia(&self, mass: f32) -> f32 {
        match self {
            Shape::Circle { radius } => 0.5 * mass * radius * radius,
            Shape::Box(b) => mass * (b.width * b.width + b.height * b.height) / 12.0,
        }
    }
}

/// Rejected body parameters. Each variant carries the offending value and the
/// bound it violated.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum BodyError {
    AreaTooSmall { area: f32, min: f32 },
    AreaTooLarge { area: f32, max: f32 },
    DensityTooSmall { density: f32, min: f32 },
    DensityTooLarge { density: f32, max: f32 },
}

impl fmt::Display for BodyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            BodyError::AreaTooSmall { area, min } => {
                write!(f, "area {area} is too small, min area is {min}")
            }
            BodyError::AreaTooLarge { area, max } => {
                write!(f, "area {area} is too big, max area is {max}")
            }
            BodyError::DensityTooSmall { density, min } => {
                write!(f, "density {density} is too small, min density is {min}")
            }
            BodyError::DensityTooLarge { density, max } => {
                write!(f, "density {density} is too big, max density is {max}")
            }
        }
    }
}

impl std::error::Error for BodyError {}

/// Bounds applied when bodies are created.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BodyLimits {
    pub min_body_size: f32,
    pub max_body_size: f32,
    pub min_density: f32,
    pub max_density: f32,
}

impl Default for BodyLimits {
    fn default() -> Self {
        Self {
            min_body_size: MIN_BODY_SIZE,
            max_body_size: MAX_BODY_SIZE,
            min_density: MIN_DENSITY,
            max_density: MAX_DENSITY,
        }
    }
}

impl BodyLimits {
    /// NaN fails every check, so non-finite sizes and densities are rejected too.
    pub fn validate(&self, area: f32, density: f32) -> Result<(), BodyError> {
        if !(area >= self.min_body_size) {
            return Err(BodyError::AreaTooSmall {
                area,
                min: self.min_body_size,
            });
        }
        if !(area <= self.max_body_size) {
            return Err(BodyError::AreaTooLarge {
                area,
                max: self.max_body_size,
            });
        }
        if !(density >= self.min_density) {
            return Err(BodyError::DensityTooSmall {
                density,
                min: self.min_density,
            });
        }
        if !(density <= self.max_density) {
            return Err(BodyError::DensityTooLarge {
                density,
                max: self.max_density,
            });
        }
        Ok(())
    }

    pub fn create_circle(
        &self,
        radius: f32,
        density: f32,
        restitution: f32,
        is_static: bool,
    ) -> Result<Body, BodyError> {
        self.create(Shape::Circle { radius }, density, restitution, is_static)
    }

    pub fn create_box(
        &self,
        width: f32,
        height: f32,
        density: f32,
        restitution: f32,
        is_static: bool,
    ) -> Result<Body, BodyError> {
        self.create(
            Shape::Box(BoxShape::new(width, height)),
            density,
            restitution,
            is_static,
        )
    }

    fn create(
        &self,
        shape: Shape,
        density: f32,
        restitution: f32,
        is_static: bool,
    ) -> Result<Body, BodyError> {
        // A negative radius or a box with two negative sides still has a
        // positive area, so the extents are checked first and reported as
        // zero area.
        let area = shape.area();
        let checked = if shape.has_positive_extent() {
            self.validate(area, density)
        } else {
            Err(BodyError::AreaTooSmall {
                area: 0.0,
                min: self.min_body_size,
            })
        };
        if let Err(err) = checked {
            tracing::debug!(?err, shape = ?shape.shape_type(), "rejected body");
            return Err(err);
        }
        Ok(Body::from_shape(shape, area, density, restitution, is_static))
    }
}

#[derive(Clone, Debug)]
pub struct Body {
    position: Vec2,
    angle: f32,

    linear_velocity: Vec2,
    angular_velocity: f32,

    force: Vec2,

    shape: Shape,

    density: f32,
    area: f32,
    mass: f32,
    inv_mass: f32,
    inertia: f32,
    inv_inertia: f32,
    restitution: f32,
    static_friction: f32,
    dynamic_friction: f32,
    is_static: bool,

    aabb: Aabb,
    transform_dirty: bool,
    aabb_dirty: bool,

    vertex_updates: u32,
    aabb_updates: u32,
}

impl Body {
    pub fn create_circle(
        radius: f32,
        density: f32,
        restitution: f32,
        is_static: bool,
    ) -> Result<Self, BodyError> {
        BodyLimits::default().create_circle(radius, density, restitution, is_static)
    }

    pub fn create_box(
        width: f32,
        height: f32,
        density: f32,
        restitution: f32,
        is_static: bool,
    ) -> Result<Self, BodyError> {
        BodyLimits::default().create_box(width, height, density, restitution, is_static)
    }

    fn from_shape(shape: Shape, area: f32, density: f32, restitution: f32, is_static: bool) -> Self {
        let (mass, inertia, inv_mass, inv_inertia) = if is_static {
            (0.0, 0.0, 0.0, 0.0)
        } else {
            let mass = area * density;
            let inertia = shape.inertia(mass);
            (mass, inertia, 1.0 / mass, 1.0 / inertia)
        };

        Self {
            position: Vec2::ZERO,
            angle: 0.0,
            linear_velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            force: Vec2::ZERO,
            shape,
            density,
            area,
            mass,
            inv_mass,
            inertia,
            inv_inertia,
            restitution: restitution.clamp(0.0, 1.0),
            static_friction: DEFAULT_STATIC_FRICTION,
            dynamic_friction: DEFAULT_DYNAMIC_FRICTION,
            is_static,
            aabb: Aabb::new(Vec2::ZERO, Vec2::ZERO),
            transform_dirty: true,
            aabb_dirty: true,
            vertex_updates: 0,
            aabb_updates: 0,
        }
    }

    /// Builder-style override of the default Coulomb coefficients.
    pub fn with_friction(mut self, static_friction: f32, dynamic_friction: f32) -> Self {
        self.static_friction = static_friction.max(0.0);
        self.dynamic_friction = dynamic_friction.max(0.0);
        self
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    #[inline]
    pub fn angle(&self) -> f32 {
        self.angle
    }

    #[inline]
    pub fn linear_velocity(&self) -> Vec2 {
        self.linear_velocity
    }

    #[inline]
    pub fn set_linear_velocity(&mut self, v: Vec2) {
        self.linear_velocity = v;
    }

    #[inline]
    pub fn angular_velocity(&self) -> f32 {
        self.angular_velocity
    }

    #[inline]
    pub fn set_angular_velocity(&mut self, w: f32) {
        self.angular_velocity = w;
    }

    /// Force stored by the last [`Body::add_force`] call that has not yet been
    /// cleared by integration.
    #[inline]
    pub fn force(&self) -> Vec2 {
        self.force
    }

    #[inline]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    #[inline]
    pub fn shape_type(&self) -> ShapeType {
        self.shape.shape_type()
    }

    /// Circle radius, or 0 for boxes.
    #[inline]
    pub fn radius(&self) -> f32 {
        match self.shape {
            Shape::Circle { radius } => radius,
            Shape::Box(_) => 0.0,
        }
    }

    /// Box width, or 0 for circles.
    #[inline]
    pub fn width(&self) -> f32 {
        match &self.shape {
            Shape::Circle { .. } => 0.0,
            Shape::Box(b) => b.width,
        }
    }

    /// Box height, or 0 for circles.
    #[inline]
    pub fn height(&self) -> f32 {
        match &self.shape {
            Shape::Circle { .. } => 0.0,
            Shape::Box(b) => b.height,
        }
    }

    #[inline]
    pub fn density(&self) -> f32 {
        self.density
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.area
    }

    #[inline]
    pub fn mass(&self) -> f32 {
        self.mass
    }

    #[inline]
    pub fn inv_mass(&self) -> f32 {
        self.inv_mass
    }

    #[inline]
    pub fn inertia(&self) -> f32 {
        self.inertia
    }

    #[inline]
    pub fn inv_inertia(&self) -> f32 {
        self.inv_inertia
    }

    #[inline]
    pub fn restitution(&self) -> f32 {
        self.restitution
    }

    #[inline]
    pub fn static_friction(&self) -> f32 {
        self.static_friction
    }

    #[inline]
    pub fn dynamic_friction(&self) -> f32 {
        self.dynamic_friction
    }

    #[inline]
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// How many times the world-space vertices have been recomputed.
    #[inline]
    pub fn vertex_updates(&self) -> u32 {
        self.vertex_updates
    }

    /// How many times the bounding box has been recomputed.
    #[inline]
    pub fn aabb_updates(&self) -> u32 {
        self.aabb_updates
    }

    /// World-space box corners, recomputed only after the pose changed.
    /// Circles have no vertices and return an empty slice.
    pub fn transformed_vertices(&mut self) -> &[Vec2] {
        match &mut self.shape {
            Shape::Circle { .. } => &[],
            Shape::Box(b) => {
                if self.transform_dirty {
                    let xf = Transform::new(self.position, self.angle);
                    for (out, v) in b.transformed.iter_mut().zip(b.vertices.iter()) {
                        *out = xf * *v;
                    }
                    self.transform_dirty = false;
                    self.vertex_updates += 1;
                }
                &b.transformed[..]
            }
        }
    }

    pub fn aabb(&mut self) -> Aabb {
        if self.aabb_dirty {
            self.aabb = match self.shape {
                Shape::Circle { radius } => Aabb::from_bounds(
                    self.position.x - radius,
                    self.position.y - radius,
                    self.position.x + radius,
                    self.position.y + radius,
                ),
                Shape::Box(_) => {
                    let position = self.position;
                    Aabb::from_points(self.transformed_vertices())
                        .unwrap_or(Aabb::new(position, position))
                }
            };
            self.aabb_dirty = false;
            self.aabb_updates += 1;
        }
        self.aabb
    }

    /// Advances one substep of `dt / iterations`. Static bodies do not move.
    ///
    /// The pending force is cleared but not integrated.
    pub(crate) fn step(&mut self, dt: f32, gravity: Vec2, iterations: u32) {
        if self.is_static {
            return;
        }

        let dt = dt / iterations as f32;

        self.linear_velocity += gravity * dt;
        self.position += self.linear_velocity * dt;
        self.angle += self.angular_velocity * dt;

        self.force = Vec2::ZERO;
        self.mark_dirty();
    }

    pub fn move_by(&mut self, amount: Vec2) {
        self.position += amount;
        self.mark_dirty();
    }

    pub fn move_to(&mut self, position: Vec2) {
        self.position = position;
        self.mark_dirty();
    }

    pub fn rotate(&mut self, amount: f32) {
        self.angle += amount;
        self.mark_dirty();
    }

    pub fn rotate_to(&mut self, angle: f32) {
        self.angle = angle;
        self.mark_dirty();
    }

    /// Applies `impulse` at `arm`, the offset from the body center to the
    /// point of application.
    #[inline]
    pub fn apply_impulse(&mut self, impulse: Vec2, arm: Vec2) {
        self.linear_velocity += impulse * self.inv_mass;
        self.angular_velocity += arm.cross(impulse) * self.inv_inertia;
    }

    /// Replaces the pending force.
    #[inline]
    pub fn add_force(&mut self, amount: Vec2) {
        self.force = amount;
    }

    #[inline]
    fn mark_dirty(&mut self) {
        self.transform_dirty = true;
        self.aabb_dirty = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn static_bodies_have_zero_inverse_mass_and_inertia() {
        for density in [MIN_DENSITY, 1.0, MAX_DENSITY] {
            let c = Body::create_circle(1.0, density, 0.5, true).unwrap();
            assert_relative_eq!(c.inv_mass(), 0.0);
            assert_relative_eq!(c.inv_inertia(), 0.0);
            assert_relative_eq!(c.mass(), 0.0);

            let b = Body::create_box(2.0, 4.0, density, 0.5, true).unwrap();
            assert_relative_eq!(b.inv_mass(), 0.0);
            assert_relative_eq!(b.inv_inertia(), 0.0);
            assert!(b.is_static());
        }
    }

    #[test]
    fn dynamic_circle_mass_properties() {
        let r = 1.5;
        let density = 2.0;
        let b = Body::create_circle(r, density, 0.5, false).unwrap();

        let mass = PI * r * r * density;
        assert_relative_eq!(b.area(), PI * r * r, epsilon = 1e-5);
        assert_relative_eq!(b.mass(), mass, epsilon = 1e-5);
        assert_relative_eq!(b.inv_mass(), 1.0 / mass, epsilon = 1e-6);
        assert_relative_eq!(b.inertia(), 0.5 * mass * r * r, epsilon = 1e-4);
        assert_relative_eq!(b.inv_inertia(), 1.0 / (0.5 * mass * r * r), epsilon = 1e-6);
    }

    #[test]
    fn dynamic_box_mass_properties() {
        let (w, h) = (2.0, 4.0);
        let b = Body::create_box(w, h, 3.0, 0.2, false).unwrap();

        let mass = w * h * 3.0;
        let i = mass * (w * w + h * h) / 12.0;
        assert_relative_eq!(b.mass(), mass, epsilon = 1e-5);
        assert_relative_eq!(b.inv_mass(), 1.0 / mass, epsilon = 1e-6);
        assert_relative_eq!(b.inertia(), i, epsilon = 1e-4);
        assert_relative_eq!(b.inv_inertia(), 1.0 / i, epsilon = 1e-6);
        assert_relative_eq!(b.width(), w);
        assert_relative_eq!(b.height(), h);
        assert_relative_eq!(b.radius(), 0.0);
    }

    #[test]
    fn restitution_is_clamped() {
        let b = Body::create_circle(1.0, 1.0, 3.0, false).unwrap();
        assert_relative_eq!(b.restitution(), 1.0);
        let b = Body::create_circle(1.0, 1.0, -0.5, false).unwrap();
        assert_relative_eq!(b.restitution(), 0.0);
    }

    #[test]
    fn creation_rejects_out_of_range_parameters() {
        assert!(matches!(
            Body::create_box(0.01, 0.01, 1.0, 0.5, false),
            Err(BodyError::AreaTooSmall { .. })
        ));
        assert!(matches!(
            Body::create_box(100.0, 100.0, 1.0, 0.5, false),
            Err(BodyError::AreaTooLarge { .. })
        ));
        assert!(matches!(
            Body::create_circle(1.0, 0.1, 0.5, false),
            Err(BodyError::DensityTooSmall { .. })
        ));
        assert!(matches!(
            Body::create_circle(1.0, 30.0, 0.5, false),
            Err(BodyError::DensityTooLarge { .. })
        ));
        assert!(matches!(
            Body::create_circle(f32::NAN, 1.0, 0.5, false),
            Err(BodyError::AreaTooSmall { .. })
        ));
        assert!(matches!(
            Body::create_circle(-1.0, 1.0, 0.5, false),
            Err(BodyError::AreaTooSmall { .. })
        ));
        assert!(matches!(
            Body::create_box(-2.0, -2.0, 1.0, 0.5, false),
            Err(BodyError::AreaTooSmall { .. })
        ));
        assert!(matches!(
            Body::create_box(-2.0, 2.0, 1.0, 0.5, true),
            Err(BodyError::AreaTooSmall { .. })
        ));
    }

    #[test]
    fn negative_extent_is_reported_as_zero_area() {
        let err = Body::create_circle(-1.0, 1.0, 0.5, false).unwrap_err();
        assert_eq!(err.to_string(), "area 0 is too small, min area is 0.001");
    }

    #[test]
    fn error_messages_name_the_bound() {
        let err = Body::create_circle(1.0, 30.0, 0.5, false).unwrap_err();
        assert_eq!(err.to_string(), "density 30 is too big, max density is 22");
    }

    #[test]
    fn custom_limits_are_honoured() {
        let limits = BodyLimits {
            max_density: 100.0,
            ..BodyLimits::default()
        };
        assert!(limits.create_circle(1.0, 50.0, 0.5, false).is_ok());
        assert!(Body::create_circle(1.0, 50.0, 0.5, false).is_err());
    }

    #[test]
    fn box_vertices_are_centered() {
        let mut b = Body::create_box(2.0, 4.0, 1.0, 0.5, false).unwrap();
        let v = b.transformed_vertices().to_vec();
        assert_eq!(v.len(), 4);
        assert_relative_eq!(v[0].x, -1.0);
        assert_relative_eq!(v[0].y, -2.0);
        assert_relative_eq!(v[2].x, 1.0);
        assert_relative_eq!(v[2].y, 2.0);

        let mut c = Body::create_circle(1.0, 1.0, 0.5, false).unwrap();
        assert!(c.transformed_vertices().is_empty());
    }

    #[test]
    fn transformed_vertices_are_cached_until_moved() {
        let mut b = Body::create_box(2.0, 2.0, 1.0, 0.5, false).unwrap();

        let first = b.transformed_vertices().to_vec();
        let second = b.transformed_vertices().to_vec();
        assert_eq!(first, second);
        assert_eq!(b.vertex_updates, 1);

        b.move_to(Vec2::new(3.0, 0.0));
        let moved = b.transformed_vertices().to_vec();
        assert_eq!(b.vertex_updates, 2);
        assert_relative_eq!(moved[0].x, 2.0);

        b.rotate(0.5);
        b.transformed_vertices();
        b.transformed_vertices();
        assert_eq!(b.vertex_updates, 3);
    }

    #[test]
    fn aabb_is_cached_until_moved() {
        let mut c = Body::create_circle(1.0, 1.0, 0.5, false).unwrap();
        c.move_to(Vec2::new(2.0, 3.0));

        let a = c.aabb();
        let b = c.aabb();
        assert_eq!(a, b);
        assert_eq!(c.aabb_updates, 1);
        assert_relative_eq!(a.min.x, 1.0);
        assert_relative_eq!(a.max.y, 4.0);

        c.move_by(Vec2::new(1.0, 0.0));
        let moved = c.aabb();
        assert_eq!(c.aabb_updates, 2);
        assert_relative_eq!(moved.min.x, 2.0);
    }

    #[test]
    fn rotated_box_aabb_grows() {
        let mut b = Body::create_box(2.0, 2.0, 1.0, 0.5, false).unwrap();
        b.rotate_to(core::f32::consts::FRAC_PI_4);
        let aabb = b.aabb();
        let half_diag = 2.0_f32.sqrt();
        assert_relative_eq!(aabb.max.x, half_diag, epsilon = 1e-5);
        assert_relative_eq!(aabb.min.y, -half_diag, epsilon = 1e-5);
    }

    #[test]
    fn step_applies_gravity_per_substep() {
        let mut b = Body::create_circle(1.0, 1.0, 0.5, false).unwrap();
        b.add_force(Vec2::new(5.0, 0.0));

        // One of 4 substeps of a 0.4s frame.
        b.step(0.4, Vec2::new(0.0, 10.0), 4);

        assert_relative_eq!(b.linear_velocity().y, 1.0, epsilon = 1e-6);
        assert_relative_eq!(b.position().y, 0.1, epsilon = 1e-6);
        assert_relative_eq!(b.linear_velocity().x, 0.0);
        assert_eq!(b.force(), Vec2::ZERO);
    }

    #[test]
    fn step_skips_static_bodies() {
        let mut b = Body::create_box(2.0, 2.0, 1.0, 0.5, true).unwrap();
        b.set_angular_velocity(1.0);
        b.step(1.0, Vec2::new(0.0, 10.0), 1);
        assert_eq!(b.position(), Vec2::ZERO);
        assert_relative_eq!(b.angle(), 0.0);
    }

    #[test]
    fn apply_impulse_at_offset_spins_body() {
        let mut b = Body::create_box(2.0, 2.0, 1.0, 0.5, false).unwrap();
        b.apply_impulse(Vec2::new(0.0, 4.0), Vec2::new(1.0, 0.0));

        assert_relative_eq!(b.linear_velocity().y, 4.0 * b.inv_mass(), epsilon = 1e-6);
        assert_relative_eq!(b.angular_velocity(), 4.0 * b.inv_inertia(), epsilon = 1e-6);

        let mut s = Body::create_box(2.0, 2.0, 1.0, 0.5, true).unwrap();
        s.apply_impulse(Vec2::new(0.0, 4.0), Vec2::new(1.0, 0.0));
        assert_eq!(s.linear_velocity(), Vec2::ZERO);
        assert_relative_eq!(s.angular_velocity(), 0.0);
    }

    #[test]
    fn add_force_replaces_pending_force() {
        let mut b = Body::create_circle(1.0, 1.0, 0.5, false).unwrap();
        b.add_force(Vec2::new(1.0, 2.0));
        b.add_force(Vec2::new(-0.5, 3.0));
        assert_relative_eq!(b.force().x, -0.5);
        assert_relative_eq!(b.force().y, 3.0);
    }
}
