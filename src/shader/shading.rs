use rand::Rng;
use rand_distr::{Distribution as _, UnitSphere};

use crate::{
    geometry::{FloatType, Ray, WorldVector, reflect, refract},
    scene::{MaterialKind, colors},
    util::Rgb,
};

use super::{SceneIntersector, SceneView};

/// How the color of a camera ray is computed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Shading {
    /// Color of the nearest surface, no lighting
    Direct,
    /// Recursive bounces until a light or the background is reached
    PathTrace,
}

impl Shading {
    pub fn shade<I: SceneIntersector>(
        &self,
        scene: &SceneView<'_>,
        intersector: I,
        ray: Ray,
        background: Rgb,
        max_depth: u32,
        rng: &mut impl Rng,
    ) -> Rgb {
        match self {
            Shading::Direct => intersector
                .intersect(scene, &ray)
                .map_or(background, |hit| hit.primitive.material().color),
            Shading::PathTrace => path_trace(scene, intersector, ray, background, max_depth, rng),
        }
    }
}

/// Follows a single path through the scene.
/// Paths that don't reach a light or the background within `max_depth` bounces are black.
fn path_trace<I: SceneIntersector>(
    scene: &SceneView<'_>,
    intersector: I,
    mut ray: Ray,
    background: Rgb,
    max_depth: u32,
    rng: &mut impl Rng,
) -> Rgb {
    let mut throughput = colors::WHITE;

    for _ in 0..max_depth {
        let Some(hit) = intersector.intersect(scene, &ray) else {
            return tint(throughput, background);
        };

        let material = hit.primitive.material();
        let normal = hit.primitive.normal_at(&hit.uv);
        let direction = match material.kind {
            MaterialKind::Light => return tint(throughput, material.color),
            MaterialKind::Diffuse => scatter(&facing(&normal, &ray.direction), rng),
            MaterialKind::Reflective => reflect(&ray.direction, &facing(&normal, &ray.direction)),
            MaterialKind::Refractive { index } => {
                transmit(&ray.direction, &normal, index, rng)
            }
        };

        throughput = tint(throughput, material.color);
        ray = Ray::new(ray.point_at(hit.t), direction);
    }

    colors::BLACK
}

/// Normal flipped to the side the ray comes from.
fn facing(normal: &WorldVector, direction: &WorldVector) -> WorldVector {
    if normal.dot(direction) > 0.0 {
        -normal
    } else {
        *normal
    }
}

/// Cosine weighted direction around the normal.
fn scatter(normal: &WorldVector, rng: &mut impl Rng) -> WorldVector {
    let offset: [FloatType; 3] = UnitSphere.sample(rng);
    let direction = normal + WorldVector::from(offset);
    if direction.norm_squared() < 1e-12 {
        *normal
    } else {
        direction
    }
}

/// Refracts or reflects through a dielectric surface, choosing randomly by the Fresnel
/// reflectance.
fn transmit(
    direction: &WorldVector,
    normal: &WorldVector,
    index: FloatType,
    rng: &mut impl Rng,
) -> WorldVector {
    let entering = normal.dot(direction) < 0.0;
    let (normal, eta) = if entering {
        (*normal, 1.0 / index)
    } else {
        (-normal, index)
    };

    let cos_i = (-direction.dot(&normal)).min(1.0);
    match refract(direction, &normal, eta) {
        Some(refracted) if rng.random::<FloatType>() >= schlick(cos_i, index) => refracted,
        _ => reflect(direction, &normal),
    }
}

/// Schlick's approximation of Fresnel reflectance.
fn schlick(cos: FloatType, index: FloatType) -> FloatType {
    let r0 = ((1.0 - index) / (1.0 + index)).powi(2);
    r0 + (1.0 - r0) * (1.0 - cos).powi(5)
}

fn tint(a: Rgb, b: Rgb) -> Rgb {
    Rgb::new(a.r * b.r, a.g * b.g, a.b * b.b)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        bvh::Bvh,
        device::Device,
        geometry::WorldPoint,
        scene::{Material, Mesh, Scene},
        shader::{BvhAccelerated, GpuScene},
    };
    use assert2::assert;
    use rand::{SeedableRng as _, rngs::SmallRng};

    fn square(z: FloatType, material: Material) -> Mesh {
        sized_square(z, 10.0, material)
    }

    fn sized_square(z: FloatType, half_size: FloatType, material: Material) -> Mesh {
        Mesh::square(
            WorldPoint::new(-half_size, -half_size, z),
            WorldPoint::new(half_size, -half_size, z),
            WorldPoint::new(half_size, half_size, z),
            WorldPoint::new(-half_size, half_size, z),
            material,
        )
    }

    fn render_one(scene: &Scene, shading: Shading, ray: Ray, max_depth: u32, seed: u64) -> Rgb {
        let device = Device::default();
        let bvhs: Vec<_> = scene.meshes().iter().map(|m| Bvh::build(m.primitives())).collect();
        let gpu_scene = GpuScene::upload(&device, scene, Some(bvhs.as_slice())).unwrap();
        let mut rng = SmallRng::seed_from_u64(seed);
        shading.shade(
            &gpu_scene.view(),
            BvhAccelerated,
            ray,
            colors::BLUE,
            max_depth,
            &mut rng,
        )
    }

    fn down() -> Ray {
        Ray::new(WorldPoint::new(0.3, 0.1, 5.0), WorldVector::new(0.0, 0.0, -1.0))
    }

    #[test]
    fn direct_returns_surface_color() {
        let mut scene = Scene::new();
        scene.add_mesh(square(0.0, Material::diffuse(colors::RED)));
        assert!(render_one(&scene, Shading::Direct, down(), 5, 0) == colors::RED);
    }

    #[test]
    fn miss_returns_background() {
        let scene = Scene::new();
        assert!(render_one(&scene, Shading::Direct, down(), 5, 0) == colors::BLUE);
        assert!(render_one(&scene, Shading::PathTrace, down(), 5, 0) == colors::BLUE);
    }

    #[test]
    fn light_is_seen_directly() {
        let mut scene = Scene::new();
        scene.add_mesh(square(0.0, Material::light(colors::GREEN)));
        assert!(render_one(&scene, Shading::PathTrace, down(), 5, 0) == colors::GREEN);
    }

    #[test]
    fn mirror_tints_reflection() {
        let mut scene = Scene::new();
        scene.add_mesh(square(0.0, Material::reflective(Rgb::new(0.5, 0.5, 0.5))));
        // Reflected straight up into the blue background
        let color = render_one(&scene, Shading::PathTrace, down(), 5, 0);
        assert!(color == Rgb::new(0.0, 0.0, 0.5));
    }

    #[test]
    fn facing_mirrors_are_cut_at_max_depth() {
        let mut scene = Scene::new();
        scene.add_mesh(square(0.0, Material::reflective(colors::WHITE)));
        scene.add_mesh(square(10.0, Material::reflective(colors::WHITE)));
        assert!(render_one(&scene, Shading::PathTrace, down(), 5, 0) == colors::BLACK);
    }

    #[test]
    fn zero_depth_is_black() {
        let mut scene = Scene::new();
        scene.add_mesh(square(0.0, Material::light(colors::WHITE)));
        assert!(render_one(&scene, Shading::PathTrace, down(), 0, 0) == colors::BLACK);
    }

    /// Diffuse floor under a white light ceiling, with nothing else around, always ends up in
    /// the light after one bounce.
    #[test]
    fn diffuse_under_light() {
        let mut scene = Scene::new();
        scene.add_mesh(square(0.0, Material::diffuse(Rgb::new(0.5, 0.25, 1.0))));
        scene.add_mesh(sized_square(0.01, 1000.0, Material::light(colors::WHITE)));
        for seed in 0..20 {
            let ray = Ray::new(WorldPoint::new(0.3, 0.1, 0.005), WorldVector::new(0.0, 0.0, -1.0));
            let color = render_one(&scene, Shading::PathTrace, ray, 5, seed);
            assert!(color == Rgb::new(0.5, 0.25, 1.0));
        }
    }

    /// Glass either refracts or reflects, never absorbs.
    #[test]
    fn glass_refracts_or_reflects() {
        let mut scene = Scene::new();
        scene.add_mesh(square(0.0, Material::glass(colors::WHITE)));
        scene.add_mesh(square(-5.0, Material::light(colors::RED)));
        for seed in 0..20 {
            let ray = Ray::new(
                WorldPoint::new(0.0, 0.2, 5.0),
                WorldVector::new(0.1, 0.0, -1.0),
            );
            let color = render_one(&scene, Shading::PathTrace, ray, 5, seed);
            assert!(color == colors::RED || color == colors::BLUE);
        }
    }

    #[test]
    fn schlick_at_normal_incidence() {
        assert!((schlick(1.0, 1.5) - 0.04).abs() < 1e-6);
        assert!((schlick(0.0, 1.5) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn total_internal_reflection_reflects() {
        let mut rng = SmallRng::seed_from_u64(0);
        // Leaving glass at a grazing angle
        let direction = WorldVector::new(1.0, 0.0, 0.2).normalize();
        let normal = WorldVector::new(0.0, 0.0, 1.0);
        let out = transmit(&direction, &normal, 1.5, &mut rng);
        assert!(out.z < 0.0);
    }
}
