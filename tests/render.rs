use assert2::{assert, let_assert};
use minitrace::{
    Camera, Environment, Material, Mesh, RenderMode, RenderSettings, Rgb, SampleCount,
    geometry::{ScreenSize, WorldPoint, WorldVector},
    scene::{Primitive, colors},
};
use rand::{Rng as _, SeedableRng as _, rngs::SmallRng};

const WIDTH: u32 = 32;
const HEIGHT: u32 = 24;

fn camera() -> Camera {
    Camera::builder()
        .position(WorldPoint::origin())
        .forward(WorldVector::new(0.0, 1.0, 0.0))
        .up(WorldVector::new(0.0, 0.0, 1.0))
        .resolution(ScreenSize::new(WIDTH, HEIGHT))
        .gamma(1.0)
        .build()
        .unwrap()
}

fn environment(mode: RenderMode, samples: u32, seed: u64, background: Rgb) -> Environment {
    Environment::builder()
        .camera(camera())
        .mode(mode)
        .settings(
            RenderSettings::builder()
                .sample_count(SampleCount::new(samples).unwrap())
                .seed(seed)
                .background(background)
                .build(),
        )
        .build()
}

/// Quad perpendicular to the view axis, `y` away from the camera.
fn wall(y: f32, half_width: f32, half_height: f32, material: Material) -> Mesh {
    Mesh::square(
        WorldPoint::new(-half_width, y, -half_height),
        WorldPoint::new(half_width * 1.1, y, -half_height),
        WorldPoint::new(half_width * 1.1, y, half_height * 0.9),
        WorldPoint::new(-half_width, y, half_height * 0.9),
        material,
    )
}

fn mean_squared_difference(a: &[Rgb], b: &[Rgb]) -> f32 {
    let sum: f32 = a
        .iter()
        .zip(b)
        .map(|(a, b)| {
            let d = *a + *b * -1.0;
            d.r * d.r + d.g * d.g + d.b * d.b
        })
        .sum();
    sum / a.len() as f32
}

#[test]
fn square_in_the_middle() {
    let mut environment = environment(RenderMode::SimpleRender, 1, 0, colors::BLUE);
    environment.add_mesh(wall(5.0, 0.5, 0.5, Material::diffuse(colors::RED)));
    environment.render().unwrap();

    let camera = environment.camera();
    assert!(camera.pixel(WIDTH / 2, HEIGHT / 2) == colors::RED);
    assert!(camera.pixel(WIDTH / 2 - 1, HEIGHT / 2 - 1) == colors::RED);
    for (col, row) in [(0, 0), (WIDTH - 1, 0), (0, HEIGHT - 1), (WIDTH - 1, HEIGHT - 1)] {
        assert!(camera.pixel(col, row) == colors::BLUE);
    }
}

/// Camera straight above a square, its center pixel ray lands on the diagonal shared by
/// the two triangles.
#[test]
fn camera_above_square() {
    use minitrace::bvh::Bvh;

    let mesh = Mesh::square(
        WorldPoint::new(-1.0, -1.0, 0.0),
        WorldPoint::new(1.0, -1.0, 0.0),
        WorldPoint::new(1.0, 1.0, 0.0),
        WorldPoint::new(-1.0, 1.0, 0.0),
        Material::light(colors::RED),
    );
    let bvh = Bvh::build(mesh.primitives());

    for size in [1, 3, 5] {
        let camera = Camera::builder()
            .position(WorldPoint::new(0.0, 0.0, 5.0))
            .forward(WorldVector::new(0.0, 0.0, -1.0))
            .up(WorldVector::new(0.0, 1.0, 0.0))
            .resolution(ScreenSize::new(size, size))
            .gamma(1.0)
            .build()
            .unwrap();
        let center = size / 2;

        let ray = camera.pixel_ray(center as f32, center as f32);
        let_assert!(Some(hit) = bvh.view(mesh.primitives()).intersect(&ray));
        assert!((hit.t - 5.0).abs() < 1e-5);
        assert!((hit.uv.u + hit.uv.v + hit.uv.w() - 1.0).abs() < 1e-6);
        assert!(hit.uv.u >= 0.0 && hit.uv.v >= 0.0 && hit.uv.w() >= 0.0);

        let mut environment = Environment::builder()
            .camera(camera)
            .mode(RenderMode::BvhPathTrace)
            .settings(RenderSettings::builder().seed(3).background(colors::BLUE).build())
            .build();
        environment.add_mesh(mesh.clone());
        environment.render().unwrap();
        assert!(environment.camera().pixel(center, center) == colors::RED);
    }
}

#[test]
fn empty_scene_is_background() {
    for mode in [RenderMode::SimpleRender, RenderMode::PathTrace, RenderMode::BvhPathTrace] {
        let mut environment = environment(mode, 4, 0, colors::GREEN);
        environment.render().unwrap();
        assert!(environment.camera().pixels().iter().all(|&p| p == colors::GREEN));
    }
}

#[test]
fn same_seed_same_frame() {
    let render = || {
        let mut environment = environment(RenderMode::BvhPathTrace, 4, 3, colors::WHITE);
        environment.add_mesh(wall(5.0, 1.0, 1.0, Material::diffuse(colors::RED)));
        environment.add_mesh(wall(3.0, 0.3, 0.3, Material::glass(colors::WHITE)));
        environment.render().unwrap();
        environment.camera().pixels().to_vec()
    };
    assert!(render() == render());
}

/// Flat colored view is the same no matter how many samples are taken.
#[test]
fn multisampling_flat_view() {
    let render = |samples| {
        let mut environment = environment(RenderMode::SimpleRender, samples, 0, colors::BLUE);
        environment.add_mesh(wall(5.0, 20.0, 20.0, Material::diffuse(colors::RED)));
        environment.render().unwrap();
        environment.camera().pixels().to_vec()
    };
    let single = render(1);
    assert!(single.iter().all(|&p| p == colors::RED));
    assert!(render(9) == single);
}

/// Diffuse wall lit by a white sky, partially shadowed by a black floor.
fn noisy_scene(samples: u32, seed: u64) -> Vec<Rgb> {
    let mut environment = environment(RenderMode::BvhPathTrace, samples, seed, colors::WHITE);
    environment.add_mesh(wall(5.0, 20.0, 20.0, Material::diffuse(colors::WHITE)));
    environment.add_square(
        WorldPoint::new(-50.0, -50.0, -1.0),
        WorldPoint::new(50.0, -50.0, -1.0),
        WorldPoint::new(50.0, 50.0, -1.0),
        WorldPoint::new(-50.0, 50.0, -1.0),
        Material::diffuse(colors::BLACK),
    );
    environment.render().unwrap();
    environment.camera().pixels().to_vec()
}

#[test]
fn more_samples_less_noise() {
    let noise_1 = mean_squared_difference(&noisy_scene(1, 1), &noisy_scene(1, 2));
    let noise_4 = mean_squared_difference(&noisy_scene(4, 1), &noisy_scene(4, 2));
    let noise_16 = mean_squared_difference(&noisy_scene(16, 1), &noisy_scene(16, 2));
    assert!(noise_1 > 0.0);
    assert!(noise_4 < noise_1);
    assert!(noise_16 < noise_4);
    assert!(noise_16 < noise_1 * 0.5);
}

/// Both intersection strategies see the same geometry, so with the same per unit seeds the
/// frames are identical.
#[test]
fn bvh_matches_brute_force() {
    let mut rng = SmallRng::seed_from_u64(5);
    let mut random_point = || {
        WorldPoint::new(
            rng.random_range(-3.0..3.0),
            rng.random_range(4.0..8.0),
            rng.random_range(-3.0..3.0),
        )
    };
    let meshes: Vec<Mesh> = (0..4)
        .map(|i| {
            (0..150)
                .map(|_| {
                    let material = if i == 0 {
                        Material::light(colors::WHITE)
                    } else {
                        Material::diffuse(Rgb::new(0.8, 0.6, 0.4))
                    };
                    Primitive::new(random_point(), random_point(), random_point(), material)
                })
                .collect()
        })
        .collect();

    let render = |mode| {
        let mut environment = environment(mode, 4, 9, colors::BLUE);
        for mesh in &meshes {
            environment.add_mesh(mesh.clone());
        }
        environment.render().unwrap();
        environment.camera().pixels().to_vec()
    };
    let brute_force = render(RenderMode::PathTrace);
    let bvh = render(RenderMode::BvhPathTrace);

    let differing = brute_force
        .iter()
        .zip(&bvh)
        .filter(|(a, b)| a != b)
        .count();
    assert!(differing == 0);
}

/// With one sample per pixel every pixel is exactly the shading of the ray through its
/// center.
#[test]
fn single_sample_is_pixel_center_ray() {
    use minitrace::{
        bvh::Bvh,
        device::Device,
        shader::{BruteForce, GpuScene, SceneIntersector as _},
    };

    let mut rng = SmallRng::seed_from_u64(11);
    let mesh: Mesh = (0..40)
        .map(|i| {
            let mut point = || {
                WorldPoint::new(
                    rng.random_range(-2.0..2.0),
                    rng.random_range(4.0..6.0),
                    rng.random_range(-2.0..2.0),
                )
            };
            let color = Rgb::new(i as f32 / 40.0, 0.5, 1.0 - i as f32 / 40.0);
            Primitive::new(point(), point(), point(), Material::diffuse(color))
        })
        .collect();

    let mut environment = environment(RenderMode::SimpleRender, 1, 0, colors::BLUE);
    environment.add_mesh(mesh.clone());
    environment.render().unwrap();

    let device = Device::default();
    let mut scene = minitrace::Scene::new();
    scene.add_mesh(mesh);
    let bvhs = vec![Bvh::build(scene.meshes()[0].primitives())];
    let gpu_scene = GpuScene::upload(&device, &scene, Some(bvhs.as_slice())).unwrap();
    let view = gpu_scene.view();

    let camera = environment.camera();
    for row in 0..HEIGHT {
        for col in 0..WIDTH {
            let ray = camera.pixel_ray(col as f32, row as f32);
            let expected = BruteForce
                .intersect(&view, &ray)
                .map_or(colors::BLUE, |hit| hit.primitive.material().color);
            assert!(camera.pixel(col, row) == expected);
        }
    }
}
