use minitrace::{
    Camera, Environment, Material, Mesh, RenderMode, RenderSettings, SampleCount,
    geometry::{ScreenSize, WorldPoint, WorldVector},
    scene::{Primitive, colors},
};

use indicatif::ProgressBar;

const FRAME_COUNT: u64 = 10;
const OUTPUT_PATH: &str = "render.png";

/// Triangular glass prism standing on the floor.
fn prism() -> Mesh {
    let base = [
        WorldPoint::new(0.0, -1.0, 0.0),
        WorldPoint::new(0.0, 1.0, 0.0),
        WorldPoint::new(1.7, 0.0, 0.0),
    ];
    let top = base.map(|p| p + WorldVector::new(0.0, 0.0, 2.0));
    let glass = Material::glass(colors::WHITE);

    let mut mesh = Mesh::new();
    mesh.push(Primitive::new(base[0], base[1], base[2], glass));
    mesh.push(Primitive::new(top[0], top[2], top[1], glass));
    for i in 0..3 {
        let j = (i + 1) % 3;
        mesh.push(Primitive::new(base[i], base[j], top[j], glass));
        mesh.push(Primitive::new(base[i], top[j], top[i], glass));
    }
    mesh
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let camera = Camera::builder()
        .position(WorldPoint::new(-8.0, 0.0, 3.0))
        .forward(WorldVector::new(1.0, 0.0, -0.2))
        .up(WorldVector::new(0.0, 0.0, 1.0))
        .resolution(ScreenSize::new(1280, 720))
        .build()?;

    let settings = RenderSettings::builder()
        .sample_count(SampleCount::new(16)?)
        .build();

    let mut environment = Environment::builder()
        .camera(camera)
        .mode(RenderMode::BvhPathTrace)
        .settings(settings)
        .build();

    let scaled = |x: f32, y: f32, z: f32| WorldPoint::new(x, y, z) * 2.0;

    environment.add_square(
        WorldPoint::new(20.0, 20.0, 0.0),
        WorldPoint::new(-20.0, 20.0, 0.0),
        WorldPoint::new(-20.0, -20.0, 0.0),
        WorldPoint::new(20.0, -20.0, 0.0),
        Material::diffuse(colors::WHITE),
    );
    // Left panel
    environment.add_square(
        scaled(0.0, -2.0, 0.0),
        scaled(0.0, -2.0, 2.0),
        scaled(2.0, -2.0, 2.0),
        scaled(2.0, -2.0, 0.0),
        Material::light(colors::GREEN),
    );
    // Right panel
    environment.add_square(
        scaled(0.0, 2.0, 0.0),
        scaled(2.0, 2.0, 0.0),
        scaled(2.0, 2.0, 2.0),
        scaled(0.0, 2.0, 2.0),
        Material::light(colors::RED),
    );
    // Back panel
    environment.add_square(
        scaled(2.0, 1.0, 0.0),
        scaled(2.0, -1.0, 0.0),
        scaled(2.0, -1.0, 2.0),
        scaled(2.0, 1.0, 2.0),
        Material::light(colors::WHITE),
    );
    environment.add_mesh(prism());

    environment.compute_bvhs()?;

    let bar = ProgressBar::new(FRAME_COUNT);
    for _ in 0..FRAME_COUNT {
        let stats = environment.render()?;
        bar.set_message(format!("{:.1} fps", stats.fps));
        bar.inc(1);
    }
    bar.finish();

    environment.camera().to_image().save(OUTPUT_PATH)?;
    log::info!("Saved {OUTPUT_PATH}");

    Ok(())
}
