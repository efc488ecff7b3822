use core::ops::Mul;

use crate::math::Vec2;

/// Rotation followed by translation, with the sine and cosine of the angle
/// computed once up front.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec2,
    pub sin: f32,
    pub cos: f32,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec2::ZERO,
        sin: 0.0,
        cos: 1.0,
    };

    #[inline]
    pub fn new(position: Vec2, angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self { position, sin, cos }
    }

    /// `R(angle) * v + position`.
    #[inline]
    pub fn apply(self, v: Vec2) -> Vec2 {
        Vec2::new(
            self.cos * v.x - self.sin * v.y + self.position.x,
            self.sin * v.x + self.cos * v.y + self.position.y,
        )
    }
}

impl Mul<Vec2> for Transform {
    type Output = Vec2;
    #[inline]
    fn mul(self, rhs: Vec2) -> Vec2 {
        self.apply(rhs)
    }
}
