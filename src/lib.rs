//! A small 2D rigid-body engine.
//!
//! Bodies are circles or boxes. Each [`World::step`] is split into substeps
//! that integrate velocities, prune pairs with bounding boxes, run
//! separating-axis tests, push overlapping bodies apart and resolve contact
//! velocities with sequential impulses (optionally with rotation and
//! Coulomb friction).

pub mod collision;
pub mod dynamics;
pub mod math;

pub use collision::{Aabb, Manifold};
pub use dynamics::{Body, BodyError, BodyHandle, BodyLimits, ResolveMode, ShapeType, World, WorldConfig};
pub use math::Vec2;
