mod aabb;
mod ray_box_intersection;
mod ray_triangle_intersection;
mod triangle;

pub use aabb::AABB;
pub use ray_box_intersection::RayIntersectionExt;
pub use triangle::{BarycentricCoordinates, Triangle};

use nalgebra::{Point3, Vector2, Vector3};

pub type FloatType = f32;

pub type ScreenSize = Vector2<u32>;

pub type WorldPoint = Point3<FloatType>;
pub type WorldVector = Vector3<FloatType>;
pub type WorldBox = AABB<WorldPoint>;

/// Tolerance used when normalizing user supplied vectors.
pub const EPSILON: FloatType = 1e-6;

/// Ray/triangle determinants with absolute value below this fraction of the product of
/// edge lengths are treated as parallel (or degenerate triangles) and never produce a hit.
pub const DETERMINANT_EPSILON: FloatType = 1e-5;

/// Hits closer than this to the ray origin are ignored, so that rays spawned from a
/// surface don't intersect that same surface again.
pub const MIN_HIT_DISTANCE: FloatType = 1e-4;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Ray {
    pub origin: WorldPoint,
    /// Normalized direction of the ray
    pub direction: WorldVector,

    /// Componentwise inverse of the ray direction
    /// Zeros in direction get turned into positive infinity regardless of the sign of the zero
    pub inv_direction: WorldVector,
}

impl Ray {
    pub fn new(origin: WorldPoint, direction: WorldVector) -> Ray {
        let direction = direction.normalize();
        let inv_direction = direction.map(|x| if x == 0.0 { FloatType::INFINITY } else { 1.0 / x });

        Ray {
            origin,
            direction,
            inv_direction,
        }
    }

    pub fn point_at(&self, distance: FloatType) -> WorldPoint {
        self.origin + self.direction * distance
    }
}

/// Mirror reflection of `direction` around `normal`.
pub fn reflect(direction: &WorldVector, normal: &WorldVector) -> WorldVector {
    direction - normal * (2.0 * direction.dot(normal))
}

/// Refraction of a normalized `direction` through a surface with normalized `normal`
/// (pointing against the direction), `eta` is the ratio of indices of refraction.
/// Returns None on total internal reflection.
pub fn refract(direction: &WorldVector, normal: &WorldVector, eta: FloatType) -> Option<WorldVector> {
    let cos_i = -direction.dot(normal);
    let sin2_t = eta * eta * (1.0 - cos_i * cos_i);
    if sin2_t > 1.0 {
        return None;
    }
    let cos_t = (1.0 - sin2_t).sqrt();
    Some(direction * eta + normal * (eta * cos_i - cos_t))
}
