use crate::math::Vec2;

pub const MAX_CONTACT_POINTS: usize = 2;

/// Contact summary for one colliding pair, rebuilt every substep.
///
/// `body_a`/`body_b` are indices into the world's body list for the substep
/// that produced the manifold. `normal` is unit length and points from A to B.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Manifold {
    pub body_a: usize,
    pub body_b: usize,
    pub normal: Vec2,
    pub depth: f32,
    pub contacts: [Vec2; MAX_CONTACT_POINTS],
    pub contact_count: usize,
}

impl Manifold {
    #[inline]
    pub fn new(
        body_a: usize,
        body_b: usize,
        normal: Vec2,
        depth: f32,
        contacts: [Vec2; MAX_CONTACT_POINTS],
        contact_count: usize,
    ) -> Self {
        debug_assert!(contact_count <= MAX_CONTACT_POINTS);
        Self {
            body_a,
            body_b,
            normal,
            depth,
            contacts,
            contact_count,
        }
    }

    #[inline]
    pub fn contact_points(&self) -> &[Vec2] {
        &self.contacts[..self.contact_count]
    }
}
