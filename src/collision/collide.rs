use crate::collision::Aabb;
use crate::collision::manifold::MAX_CONTACT_POINTS;
use crate::dynamics::{Body, ShapeType};
use crate::math::Vec2;

/// Minimum translation separating two overlapping shapes: `normal` is unit
/// length and points from the first shape toward the second.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Intersection {
    pub normal: Vec2,
    pub depth: f32,
}

impl Intersection {
    #[inline]
    pub fn flipped(self) -> Self {
        Self {
            normal: -self.normal,
            depth: self.depth,
        }
    }
}

/// Broad-phase reject test. Touching boxes do not intersect.
#[inline]
pub fn intersect_aabb(a: &Aabb, b: &Aabb) -> bool {
    a.overlaps(b)
}

pub fn intersect_circles(
    center_a: Vec2,
    radius_a: f32,
    center_b: Vec2,
    radius_b: f32,
) -> Option<Intersection> {
    let distance = center_a.distance(center_b);
    let radii = radius_a + radius_b;

    if distance >= radii {
        return None;
    }

    Some(Intersection {
        normal: (center_b - center_a).normalize(),
        depth: radii - distance,
    })
}

/// Separating-axis test over every edge normal of both convex polygons.
pub fn intersect_polygons(vertices_a: &[Vec2], vertices_b: &[Vec2]) -> Option<Intersection> {
    let mut normal = Vec2::ZERO;
    let mut depth = f32::MAX;

    for axis in edge_normals(vertices_a).chain(edge_normals(vertices_b)) {
        let (min_a, max_a) = project_vertices(vertices_a, axis);
        let (min_b, max_b) = project_vertices(vertices_b, axis);

        if min_a >= max_b || min_b >= max_a {
            return None;
        }

        let axis_depth = (max_b - min_a).min(max_a - min_b);
        if axis_depth < depth {
            depth = axis_depth;
            normal = axis;
        }
    }

    let direction = centroid(vertices_b) - centroid(vertices_a);
    if direction.dot(normal) < 0.0 {
        normal = -normal;
    }

    Some(Intersection { normal, depth })
}

/// Separating-axis test of a circle against a convex polygon. Besides the
/// polygon's edge normals, the axis from the circle center to the nearest
/// polygon vertex is tested.
///
/// The normal points from the circle toward the polygon.
pub fn intersect_circle_polygon(
    circle_center: Vec2,
    circle_radius: f32,
    polygon_center: Vec2,
    vertices: &[Vec2],
) -> Option<Intersection> {
    let mut normal = Vec2::ZERO;
    let mut depth = f32::MAX;

    let mut test_axis = |axis: Vec2| -> bool {
        let (min_a, max_a) = project_vertices(vertices, axis);
        let (min_b, max_b) = project_circle(circle_center, circle_radius, axis);

        if min_a >= max_b || min_b >= max_a {
            return false;
        }

        let axis_depth = (max_b - min_a).min(max_a - min_b);
        if axis_depth < depth {
            depth = axis_depth;
            normal = axis;
        }
        true
    };

    for axis in edge_normals(vertices) {
        if !test_axis(axis) {
            return None;
        }
    }

    if let Some(cp) = closest_vertex(circle_center, vertices) {
        let to_vertex = cp - circle_center;
        // Center sitting on the vertex gives no usable direction.
        if to_vertex.length_squared() > 0.0 {
            let axis = to_vertex.normalize();
            if !test_axis(axis) {
                return None;
            }
        }
    }

    let direction = polygon_center - circle_center;
    if direction.dot(normal) < 0.0 {
        normal = -normal;
    }

    Some(Intersection { normal, depth })
}

/// Narrow-phase dispatch on the pair of shape kinds. The returned normal
/// always points from `a` toward `b`.
pub fn collide(a: &mut Body, b: &mut Body) -> Option<Intersection> {
    let (center_a, center_b) = (a.position(), b.position());

    match (a.shape_type(), b.shape_type()) {
        (ShapeType::Circle, ShapeType::Circle) => {
            intersect_circles(center_a, a.radius(), center_b, b.radius())
        }
        (ShapeType::Circle, ShapeType::Box) => {
            intersect_circle_polygon(center_a, a.radius(), center_b, b.transformed_vertices())
        }
        (ShapeType::Box, ShapeType::Circle) => {
            // Operands are swapped, so the normal comes back B->A.
            intersect_circle_polygon(center_b, b.radius(), center_a, a.transformed_vertices())
                .map(Intersection::flipped)
        }
        (ShapeType::Box, ShapeType::Box) => {
            intersect_polygons(a.transformed_vertices(), b.transformed_vertices())
        }
    }
}

/// Writes up to two world-space contact points for an intersecting pair and
/// returns how many were written.
pub fn find_contact_points(
    contacts: &mut [Vec2; MAX_CONTACT_POINTS],
    a: &mut Body,
    b: &mut Body,
) -> usize {
    let (center_a, center_b) = (a.position(), b.position());

    match (a.shape_type(), b.shape_type()) {
        (ShapeType::Circle, ShapeType::Circle) => {
            contacts[0] = circles_contact_point(center_a, a.radius(), center_b);
            1
        }
        (ShapeType::Circle, ShapeType::Box) => {
            contacts[0] = circle_polygon_contact_point(center_a, b.transformed_vertices());
            1
        }
        (ShapeType::Box, ShapeType::Circle) => {
            contacts[0] = circle_polygon_contact_point(center_b, a.transformed_vertices());
            1
        }
        (ShapeType::Box, ShapeType::Box) => {
            polygons_contact_points(contacts, a.transformed_vertices(), b.transformed_vertices())
        }
    }
}

/// Squared distance from `p` to segment `ab`, and the closest point on it.
pub fn point_segment_distance(p: Vec2, a: Vec2, b: Vec2) -> (f32, Vec2) {
    let ab = b - a;
    let ap = p - a;

    let ab_len_sq = ab.length_squared();
    let cp = if ab_len_sq == 0.0 {
        a
    } else {
        let d = ab.dot(ap) / ab_len_sq;
        if d <= 0.0 {
            a
        } else if d >= 1.0 {
            b
        } else {
            a + ab * d
        }
    };

    (p.distance_squared(cp), cp)
}

fn circles_contact_point(center_a: Vec2, radius_a: f32, center_b: Vec2) -> Vec2 {
    let dir = (center_b - center_a).normalize();
    center_a + dir * radius_a
}

fn circle_polygon_contact_point(circle_center: Vec2, vertices: &[Vec2]) -> Vec2 {
    let mut contact = Vec2::ZERO;
    let mut min_dist_sq = f32::MAX;

    for (va, vb) in edges(vertices) {
        let (dist_sq, cp) = point_segment_distance(circle_center, va, vb);
        if dist_sq < min_dist_sq {
            min_dist_sq = dist_sq;
            contact = cp;
        }
    }

    contact
}

/// Scans every vertex of each polygon against every edge of the other and
/// keeps the closest point, plus a second one when another point lies at the
/// same distance within the near-equality epsilon.
fn polygons_contact_points(
    contacts: &mut [Vec2; MAX_CONTACT_POINTS],
    vertices_a: &[Vec2],
    vertices_b: &[Vec2],
) -> usize {
    let mut count = 0;
    let mut min_dist_sq = f32::MAX;

    for (points, polygon) in [(vertices_a, vertices_b), (vertices_b, vertices_a)] {
        for &p in points {
            for (va, vb) in edges(polygon) {
                let (dist_sq, cp) = point_segment_distance(p, va, vb);

                if crate::math::nearly_equal(dist_sq, min_dist_sq) {
                    if !cp.nearly_equal(contacts[0]) {
                        contacts[1] = cp;
                        count = 2;
                    }
                } else if dist_sq < min_dist_sq {
                    min_dist_sq = dist_sq;
                    contacts[0] = cp;
                    count = 1;
                }
            }
        }
    }

    count
}

/// Consecutive vertex pairs, wrapping the last vertex back to the first.
#[inline]
fn edges(vertices: &[Vec2]) -> impl Iterator<Item = (Vec2, Vec2)> + '_ {
    let n = vertices.len();
    (0..n).map(move |i| (vertices[i], vertices[(i + 1) % n]))
}

#[inline]
fn edge_normals(vertices: &[Vec2]) -> impl Iterator<Item = Vec2> + '_ {
    edges(vertices).map(|(va, vb)| {
        let edge = vb - va;
        Vec2::new(edge.y, -edge.x).normalize()
    })
}

fn project_vertices(vertices: &[Vec2], axis: Vec2) -> (f32, f32) {
    let mut min = f32::MAX;
    let mut max = f32::MIN;

    for v in vertices {
        let proj = v.dot(axis);
        min = min.min(proj);
        max = max.max(proj);
    }

    (min, max)
}

fn project_circle(center: Vec2, radius: f32, axis: Vec2) -> (f32, f32) {
    let direction_radius = axis.normalize() * radius;

    let p1 = (center + direction_radius).dot(axis);
    let p2 = (center - direction_radius).dot(axis);

    if p1 <= p2 { (p1, p2) } else { (p2, p1) }
}

fn closest_vertex(point: Vec2, vertices: &[Vec2]) -> Option<Vec2> {
    let mut result = None;
    let mut min_dist_sq = f32::MAX;

    for &v in vertices {
        let dist_sq = v.distance_squared(point);
        if dist_sq < min_dist_sq {
            min_dist_sq = dist_sq;
            result = Some(v);
        }
    }

    result
}

fn centroid(vertices: &[Vec2]) -> Vec2 {
    if vertices.is_empty() {
        return Vec2::ZERO;
    }
    let mut sum = Vec2::ZERO;
    for &v in vertices {
        sum += v;
    }
    sum / vertices.len() as f32
}
