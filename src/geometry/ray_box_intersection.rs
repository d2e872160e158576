use crate::geometry::{FloatType, Ray, WorldBox};

pub trait RayIntersectionExt {
    /// Distances along the ray where it enters and leaves the box.
    fn intersect(&self, ray: &Ray) -> (FloatType, FloatType);
}

impl RayIntersectionExt for WorldBox {
    /// Slab test. The ray touches the box iff the entry distance is not above the exit
    /// distance, entry is negative when the ray starts inside.
    fn intersect(&self, ray: &Ray) -> (FloatType, FloatType) {
        // 0 * inf is NaN for a ray parallel to a slab starting on its plane,
        // such slab must not restrict the interval
        let slab_min = (self.min - ray.origin)
            .component_mul(&ray.inv_direction)
            .map(|t| if t.is_nan() { FloatType::NEG_INFINITY } else { t });
        let slab_max = (self.max - ray.origin)
            .component_mul(&ray.inv_direction)
            .map(|t| if t.is_nan() { FloatType::INFINITY } else { t });

        let entry = slab_min.inf(&slab_max).max();
        let exit = slab_min.sup(&slab_max).min();
        (entry, exit)
    }
}
