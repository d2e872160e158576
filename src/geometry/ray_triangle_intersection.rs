use super::{
    BarycentricCoordinates, DETERMINANT_EPSILON, FloatType, MIN_HIT_DISTANCE, Ray, Triangle,
    WorldPoint,
};

impl Triangle<WorldPoint> {
    /// Calculates ray intersection with the (two sided) triangle.
    /// Returns distance along the ray and barycentric uv coordinates of the hit, or None if
    /// the ray misses, is (nearly) parallel, the triangle is degenerate or the hit is closer
    /// than `MIN_HIT_DISTANCE`.
    /// Adapted from https://en.wikipedia.org/wiki/M%C3%B6ller%E2%80%93Trumbore_intersection_algorithm#Rust_implementation
    pub fn intersect(&self, ray: &Ray) -> Option<(FloatType, BarycentricCoordinates<FloatType>)> {
        let [e1, e2] = self.edges();

        let ray_cross_e2 = ray.direction.cross(&e2);
        let det = e1.dot(&ray_cross_e2);

        // Also catches NaN determinants and zero length edges
        if !(det.abs() > DETERMINANT_EPSILON * e1.norm() * e2.norm()) {
            return None;
        }

        let inv_det = 1.0 / det;
        let s = ray.origin - self[0];
        let u = inv_det * s.dot(&ray_cross_e2);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let s_cross_e1 = s.cross(&e1);
        let v = inv_det * ray.direction.dot(&s_cross_e1);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = inv_det * e2.dot(&s_cross_e1);
        if t.is_finite() && t >= MIN_HIT_DISTANCE {
            Some((t, BarycentricCoordinates { u, v }))
        } else {
            None
        }
    }
}
