pub mod transform;
pub mod utils;
pub mod vec2;

pub use transform::Transform;
pub use utils::{NEARLY_EQUAL_EPSILON, nearly_equal};
pub use vec2::Vec2;
