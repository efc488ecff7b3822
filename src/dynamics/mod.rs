pub mod body;
pub mod solver;
pub mod world;

pub use body::{Body, BodyError, BodyLimits, BoxShape, Shape, ShapeType};
pub use solver::{ResolveMode, friction_impulse};
pub use world::{BodyHandle, World, WorldConfig, bodies_two_mut};
