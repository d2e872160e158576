use arrayvec::ArrayVec;
use assert2::debug_assert;

use crate::{
    geometry::{BarycentricCoordinates, FloatType, Ray, RayIntersectionExt as _, WorldBox},
    scene::Primitive,
};

use super::{BvhNode, NodeIdx};

/// Capacity of the traversal stack, deeper trees are never built.
pub const MAX_TRAVERSAL_DEPTH: usize = 64;

/// Slab test results are widened by this factor, so that rounding errors never reject a box
/// containing a hit that the triangle test accepts.
const BOX_EXIT_TOLERANCE: FloatType = 1.0 + 4.0 * FloatType::EPSILON;

/// Nearest intersection of a ray with a set of primitives.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Hit {
    /// Index of the primitive within its mesh
    pub primitive: u32,
    pub t: FloatType,
    pub uv: BarycentricCoordinates<FloatType>,
}

/// Traversable BVH made of plain slices.
/// Works the same over host owned data and over device memory views.
#[derive(Copy, Clone, Debug)]
pub struct BvhView<'a> {
    nodes: &'a [BvhNode],
    primitive_indices: &'a [u32],
    primitives: &'a [Primitive],
}

impl<'a> BvhView<'a> {
    pub fn new(
        nodes: &'a [BvhNode],
        primitive_indices: &'a [u32],
        primitives: &'a [Primitive],
    ) -> BvhView<'a> {
        debug_assert!(primitive_indices.len() == primitives.len());
        BvhView {
            nodes,
            primitive_indices,
            primitives,
        }
    }

    pub fn primitives(&self) -> &'a [Primitive] {
        self.primitives
    }

    /// Finds the nearest hit with distance at least `MIN_HIT_DISTANCE`.
    pub fn intersect(&self, ray: &Ray) -> Option<Hit> {
        self.intersect_closer_than(ray, FloatType::INFINITY)
    }

    /// Finds the nearest hit with distance below `max_t`.
    pub fn intersect_closer_than(&self, ray: &Ray, max_t: FloatType) -> Option<Hit> {
        let root = self.nodes.first()?;

        let mut stack = ArrayVec::<(NodeIdx, FloatType), MAX_TRAVERSAL_DEPTH>::new();
        let mut best: Option<Hit> = None;
        let mut best_t = max_t;

        if let Some(t1) = box_entry(root.bounds(), ray, best_t) {
            stack.push((NodeIdx::from_raw(0), t1));
        }

        while let Some((index, node_t1)) = stack.pop() {
            if node_t1 > best_t {
                // Something closer than this node's box was found since it was pushed
                continue;
            }

            match &self.nodes[index.index()] {
                BvhNode::Inner { children, .. } => {
                    let [a, b] = children.map(|child| {
                        let t1 = box_entry(self.nodes[child.index()].bounds(), ray, best_t);
                        (child, t1)
                    });

                    // Nearer child goes last, so that it is popped first
                    let (near, far) = match (a.1, b.1) {
                        (Some(ta), Some(tb)) if tb < ta => (b, a),
                        _ => (a, b),
                    };
                    for (child, t1) in [far, near] {
                        if let Some(t1) = t1 {
                            stack.push((child, t1));
                        }
                    }
                }
                BvhNode::Leaf { primitives, .. } => {
                    for primitive_index in &self.primitive_indices[primitives.into_range()] {
                        let primitive = &self.primitives[*primitive_index as usize];
                        match primitive.intersect(ray) {
                            Some((t, uv)) if t < best_t => {
                                best_t = t;
                                best = Some(Hit {
                                    primitive: *primitive_index,
                                    t,
                                    uv,
                                });
                            }
                            _ => {}
                        }
                    }
                }
            }
        }

        best
    }
}

/// Distance along the ray where it enters the box, if it does so before `max_t`.
/// Boxes behind the ray origin are rejected, origin inside the box gives 0.
fn box_entry(bounds: &WorldBox, ray: &Ray, max_t: FloatType) -> Option<FloatType> {
    let (t1, t2) = bounds.intersect(ray);
    let t1 = t1.max(0.0);
    let t2 = (t2 * BOX_EXIT_TOLERANCE).min(max_t);
    (t1 <= t2).then_some(t1)
}

/// Nearest hit found by testing every primitive, the reference for BVH traversal.
pub fn intersect_primitives(primitives: &[Primitive], ray: &Ray) -> Option<Hit> {
    let mut best: Option<Hit> = None;
    for (i, primitive) in primitives.iter().enumerate() {
        match primitive.intersect(ray) {
            Some((t, uv)) if best.is_none_or(|best| t < best.t) => {
                best = Some(Hit {
                    primitive: i as u32,
                    t,
                    uv,
                });
            }
            _ => {}
        }
    }
    best
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        bvh::{Bvh, building::test::random_primitives},
        geometry::{WorldPoint, WorldVector},
        scene::{Material, Mesh},
    };
    use assert2::{assert, let_assert};
    use rand::{Rng as _, SeedableRng as _, rngs::SmallRng};
    use rand_distr::{Distribution as _, UnitSphere};
    use test_case::test_case;

    fn random_ray(rng: &mut SmallRng) -> Ray {
        let origin = WorldPoint::new(
            rng.random_range(-15.0..15.0),
            rng.random_range(-15.0..15.0),
            rng.random_range(-15.0..15.0),
        );
        // Aim roughly at the cluster, so that most rays hit something
        let target = WorldPoint::new(
            rng.random_range(-8.0..8.0),
            rng.random_range(-8.0..8.0),
            rng.random_range(-8.0..8.0),
        );
        Ray::new(origin, target - origin)
    }

    #[test_case(1)]
    #[test_case(2)]
    #[test_case(10)]
    #[test_case(1000)]
    fn matches_brute_force(count: usize) {
        let primitives = random_primitives(count, 42);
        let bvh = Bvh::build(&primitives);
        let view = bvh.view(&primitives);
        let mut rng = SmallRng::seed_from_u64(1234);

        let mut hits = 0;
        for _ in 0..1000 {
            let ray = random_ray(&mut rng);
            let expected = intersect_primitives(&primitives, &ray);
            let actual = view.intersect(&ray);

            match (expected, actual) {
                (None, None) => {}
                (Some(expected), Some(actual)) => {
                    hits += 1;
                    assert!((expected.t - actual.t).abs() <= 1e-6 * expected.t.max(1.0));
                }
                (expected, actual) => panic!("{ray:?}: expected {expected:?}, got {actual:?}"),
            }
        }

        if count == 1000 {
            assert!(hits > 100);
        }
    }

    #[test]
    fn random_directions_from_inside_match_brute_force() {
        let primitives = random_primitives(500, 5);
        let bvh = Bvh::build(&primitives);
        let view = bvh.view(&primitives);
        let mut rng = SmallRng::seed_from_u64(99);

        for _ in 0..1000 {
            let direction: [f32; 3] = UnitSphere.sample(&mut rng);
            let ray = Ray::new(WorldPoint::origin(), WorldVector::from(direction));

            let expected = intersect_primitives(&primitives, &ray).map(|hit| hit.t);
            let actual = view.intersect(&ray).map(|hit| hit.t);
            assert!(expected.is_some() == actual.is_some());
            if let (Some(expected), Some(actual)) = (expected, actual) {
                assert!((expected - actual).abs() <= 1e-6 * expected.max(1.0));
            }
        }
    }

    // The centered ray lands on the diagonal shared by both triangles
    #[test_case(0.0, 0.0)]
    #[test_case(0.2, 0.1)]
    fn square_hit(x: FloatType, y: FloatType) {
        let mesh = Mesh::square(
            WorldPoint::new(-1.0, -1.0, 0.0),
            WorldPoint::new(1.0, -1.0, 0.0),
            WorldPoint::new(1.0, 1.0, 0.0),
            WorldPoint::new(-1.0, 1.0, 0.0),
            Material::default(),
        );
        let bvh = Bvh::build(mesh.primitives());
        let ray = Ray::new(WorldPoint::new(x, y, 5.0), WorldVector::new(0.0, 0.0, -1.0));

        let_assert!(Some(hit) = bvh.view(mesh.primitives()).intersect(&ray));
        assert!((hit.t - 5.0).abs() < 1e-5);
        assert!((hit.uv.u + hit.uv.v + hit.uv.w() - 1.0).abs() < 1e-6);
        assert!(hit.uv.u >= 0.0 && hit.uv.v >= 0.0 && hit.uv.w() >= 0.0);
    }

    #[test]
    fn nearest_of_stacked_squares() {
        let mut primitives = Vec::new();
        for z in [3.0, -2.0, 1.0, 7.0] {
            let mesh = Mesh::square(
                WorldPoint::new(-1.0, -1.0, z),
                WorldPoint::new(1.0, -1.0, z),
                WorldPoint::new(1.0, 1.0, z),
                WorldPoint::new(-1.0, 1.0, z),
                Material::default(),
            );
            primitives.extend_from_slice(mesh.primitives());
        }
        let bvh = Bvh::build(&primitives);
        let ray = Ray::new(WorldPoint::new(0.3, -0.2, 10.0), WorldVector::new(0.0, 0.0, -1.0));

        let_assert!(Some(hit) = bvh.view(&primitives).intersect(&ray));
        assert!((hit.t - 3.0).abs() < 1e-5);
        assert!(primitives[hit.primitive as usize].vertex(0).z == 7.0);

        let_assert!(Some(hit) = bvh.view(&primitives).intersect_closer_than(&ray, 8.5));
        assert!((hit.t - 3.0).abs() < 1e-5);
        assert!(bvh.view(&primitives).intersect_closer_than(&ray, 2.0).is_none());
    }

    #[test]
    fn empty_bvh_never_hits() {
        let bvh = Bvh::build(&[]);
        let ray = Ray::new(WorldPoint::origin(), WorldVector::new(1.0, 0.0, 0.0));
        assert!(bvh.view(&[]).intersect(&ray).is_none());
    }

    #[test]
    fn miss_outside_bounds() {
        let primitives = random_primitives(100, 8);
        let bvh = Bvh::build(&primitives);
        let ray = Ray::new(WorldPoint::new(0.0, 0.0, 50.0), WorldVector::new(0.0, 0.0, 1.0));
        assert!(bvh.view(&primitives).intersect(&ray).is_none());
    }
}
