pub mod aabb;
pub mod collide;
pub mod manifold;

pub use aabb::Aabb;
pub use collide::{
    Intersection, collide, find_contact_points, intersect_aabb, intersect_circle_polygon,
    intersect_circles, intersect_polygons, point_segment_distance,
};
pub use manifold::Manifold;
