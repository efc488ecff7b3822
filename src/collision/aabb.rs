use crate::math::Vec2;

/// Axis-aligned bounding box.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    #[inline]
    pub const fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    #[inline]
    pub const fn from_bounds(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self::new(Vec2::new(min_x, min_y), Vec2::new(max_x, max_y))
    }

    /// Tight box around `points`, or `None` for an empty slice.
    pub fn from_points(points: &[Vec2]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut min = *first;
        let mut max = *first;
        for p in rest {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        Some(Self::new(min, max))
    }

    /// Open-interval overlap: boxes that only share an edge do not overlap.
    #[inline]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        if self.max.x <= other.min.x || other.max.x <= self.min.x {
            return false;
        }
        if self.max.y <= other.min.y || other.max.y <= self.min.y {
            return false;
        }
        true
    }
}
