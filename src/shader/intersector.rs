use crate::{
    bvh::{Hit, intersect_primitives},
    geometry::{BarycentricCoordinates, FloatType, Ray},
    scene::Primitive,
};

use super::SceneView;

/// Nearest intersection of a ray with the whole scene.
#[derive(Copy, Clone, Debug)]
pub struct SceneHit<'a> {
    pub primitive: &'a Primitive,
    pub t: FloatType,
    pub uv: BarycentricCoordinates<FloatType>,
}

/// Strategy for finding the nearest primitive hit by a ray.
pub trait SceneIntersector: Copy + Send + Sync {
    fn intersect<'a>(&self, scene: &SceneView<'a>, ray: &Ray) -> Option<SceneHit<'a>>;
}

/// Tests every primitive of every mesh.
#[derive(Copy, Clone, Debug, Default)]
pub struct BruteForce;

/// Traverses the BVH of every mesh.
#[derive(Copy, Clone, Debug, Default)]
pub struct BvhAccelerated;

impl SceneIntersector for BruteForce {
    fn intersect<'a>(&self, scene: &SceneView<'a>, ray: &Ray) -> Option<SceneHit<'a>> {
        let mut best: Option<SceneHit<'a>> = None;
        for mesh in scene.meshes() {
            let primitives = scene.mesh_primitives(mesh);
            if let Some(hit) = intersect_primitives(primitives, ray) {
                keep_nearest(&mut best, primitives, hit);
            }
        }
        best
    }
}

impl SceneIntersector for BvhAccelerated {
    fn intersect<'a>(&self, scene: &SceneView<'a>, ray: &Ray) -> Option<SceneHit<'a>> {
        let mut best: Option<SceneHit<'a>> = None;
        for mesh in scene.meshes() {
            // Meshes without primitives have no BVH either
            debug_assert!(mesh.primitive_count == 0 || mesh.node_count > 0);
            let Some(bvh) = scene.mesh_bvh(mesh) else {
                continue;
            };
            let max_t = best.map_or(FloatType::INFINITY, |best| best.t);
            if let Some(hit) = bvh.intersect_closer_than(ray, max_t) {
                keep_nearest(&mut best, bvh.primitives(), hit);
            }
        }
        best
    }
}

fn keep_nearest<'a>(best: &mut Option<SceneHit<'a>>, primitives: &'a [Primitive], hit: Hit) {
    if best.is_none_or(|best| hit.t < best.t) {
        *best = Some(SceneHit {
            primitive: &primitives[hit.primitive as usize],
            t: hit.t,
            uv: hit.uv,
        });
    }
}
