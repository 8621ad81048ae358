use crate::geometry::{Geometry, Plane, Sphere, Triangle};
use crate::math::{Color, Point3, Vec3};
use crate::mesh::{self, MeshError};
use crate::reflect::Reflection;
use crate::world::{Object, World};
use std::f32::consts::FRAC_PI_2;
use std::path::Path;

/// Renderer settings shared by every preset.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub width: usize,
    pub height: usize,
    pub threads: usize,
    pub seed: u64,
    pub shoot_count: u32,
    pub max_bounce: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 160,
            height: 160,
            threads: 4,
            seed: 0,
            shoot_count: 4,
            max_bounce: 3.0,
        }
    }
}

/// Available built-in scenes.
///
/// Geometry and materials live on the preset function's stack frame and the
/// world borrows them, so each preset hands the finished world to a caller
/// closure instead of returning it.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum ScenePreset {
    /// Three hero spheres (diffuse, refractive, mirror) over a checkered
    /// floor, plus a brushed-metal accent and a two-sided mirror wing.
    Spheres,
    /// A triangle mesh loaded from binary STL with smoothed normals,
    /// shaded half glass / half matte.
    Teapot,
    /// A marching-cubes fluid frame rendered as refractive triangles.
    March,
}

/// The shared backdrop: an enclosing white light sphere standing in for the
/// sky, and a checkered ground plane. Leaf materials carry no references,
/// so they can live in one owned struct that every preset borrows from.
struct BaseScene {
    sky: Geometry,
    floor: Geometry,
    sky_light: Reflection<'static>,
    checker: Reflection<'static>,
    floor_diffuse: Reflection<'static>,
}

impl BaseScene {
    fn new() -> Self {
        Self {
            sky: Geometry::Sphere(Sphere::new(Point3::zero(), 100.0)),
            floor: Geometry::Plane(Plane::new(Point3::new(0.0, -1.0, 0.0), Vec3::unit_y())),
            sky_light: Reflection::light(Color::ones()),
            checker: Reflection::checker(0.85, Color::ones(), Color::splat(0.2)),
            floor_diffuse: Reflection::diffuse(Color::ones(), 4),
        }
    }
}

fn fresh_world<'s>(config: &RenderConfig) -> World<'s> {
    let mut world = World::new(config.width, config.height, config.threads, config.seed);
    world.max_bounce = config.max_bounce;
    world.shoot_count = config.shoot_count;
    world.camera.set_position(Point3::new(0.2, 1.0, 2.0));
    world.camera.set_angle(Vec3::new(-0.3, 0.0, 0.0));
    world.camera.perspective(
        FRAC_PI_2,
        config.width as f32 / config.height as f32,
        0.1,
    );
    world.camera.move_axis(2, 0.5);
    world
}

/// The sphere showcase.
pub fn spheres<R>(config: &RenderConfig, run: impl FnOnce(&mut World<'_>) -> R) -> R {
    let base = BaseScene::new();
    let floor_material = Reflection::multiply(&base.checker, &base.floor_diffuse);

    let warm = Geometry::Sphere(Sphere::new(Point3::new(-2.05, 0.0, -5.0), 1.0));
    let glass = Geometry::Sphere(Sphere::new(Point3::new(2.05, 0.0, -5.0), 1.0));
    let chrome = Geometry::Sphere(Sphere::new(Point3::new(0.0, 0.0, -5.0), 1.0));
    let accent = Geometry::Sphere(Sphere::new(Point3::new(0.0, -0.7, -3.2), 0.3));
    let wing = Geometry::Triangle(Triangle::flat(
        Point3::new(0.0, 1.5, -4.5),
        Point3::new(-1.0, 2.0, -2.0),
        Point3::new(1.0, 2.0, -2.0),
        Vec3::new(0.0, -1.0, 0.0),
    ));

    let warm_diffuse = Reflection::diffuse(Color::new(1.0, 0.6, 0.4), 4);
    let water = Reflection::refraction(Color::new(0.6, 0.8, 1.0), 0.85);
    let mirror = Reflection::mirror(Color::ones());
    let brushed = Reflection::fuzzy_mirror(Color::new(1.0, 0.85, 0.6), 0.3, 8);
    let backing = Reflection::diffuse(Color::new(0.3, 0.3, 0.35), 4);
    // Mirror on the underside facing the scene, matte on top.
    let two_sided = Reflection::face(&mirror, &backing);

    let mut world = fresh_world(config);
    world.insert(Object::new(&base.sky, &base.sky_light));
    world.insert(Object::new(&base.floor, &floor_material));
    world.insert(Object::new(&warm, &warm_diffuse));
    world.insert(Object::new(&glass, &water));
    world.insert(Object::new(&chrome, &mirror));
    world.insert(Object::new(&accent, &brushed));
    world.insert(Object::new(&wing, &two_sided));
    run(&mut world)
}

/// An STL mesh over a triangle floor, lit by the sky sphere.
pub fn teapot<R>(
    config: &RenderConfig,
    stl_path: &Path,
    run: impl FnOnce(&mut World<'_>) -> R,
) -> Result<R, MeshError> {
    let mut triangles = mesh::load_stl(stl_path)?;
    for triangle in &mut triangles {
        for p in [&mut triangle.p0, &mut triangle.p1, &mut triangle.p2] {
            p.x += 0.2;
            p.y -= 2.0;
            p.z -= 10.0;
        }
    }
    mesh::merge_vertex_normals(&mut triangles);
    let body_geometry: Vec<Geometry> = triangles.into_iter().map(Geometry::Triangle).collect();

    let base = BaseScene::new();
    let floor1 = Geometry::Triangle(Triangle::flat(
        Point3::new(-20.0, -2.0, 0.0),
        Point3::new(20.0, -2.0, 0.0),
        Point3::new(-20.0, -2.0, -40.0),
        Vec3::unit_y(),
    ));
    let floor2 = Geometry::Triangle(Triangle::flat(
        Point3::new(-20.0, -2.0, -40.0),
        Point3::new(20.0, -2.0, 0.0),
        Point3::new(20.0, -2.0, -40.0),
        Vec3::unit_y(),
    ));
    let floor_checker = Reflection::checker(1.0, Color::ones(), Color::splat(0.3));
    let floor_diffuse = Reflection::diffuse(Color::ones(), 10);
    let floor_material = Reflection::multiply(&floor_checker, &floor_diffuse);

    let body_refract = Reflection::refraction(Color::new(0.6, 0.8, 1.0), 0.85);
    let body_diffuse = Reflection::diffuse(Color::new(1.2, 0.8, 0.6), 10);
    let body = Reflection::combine(&body_refract, &body_diffuse, 0.5, 0.5);

    let mut world = fresh_world(config);
    world.insert(Object::new(&base.sky, &base.sky_light));
    world.insert(Object::new(&floor1, &floor_material));
    world.insert(Object::new(&floor2, &floor_material));
    for triangle in &body_geometry {
        world.insert(Object::new(triangle, &body));
    }
    Ok(run(&mut world))
}

/// A marching-cubes fluid frame in the base scene.
pub fn march<R>(
    config: &RenderConfig,
    data_path: &Path,
    t_min: f32,
    run: impl FnOnce(&mut World<'_>) -> R,
) -> Result<R, MeshError> {
    let frame = mesh::load_march_frame(data_path, t_min)?;
    let fluid_geometry: Vec<Geometry> =
        frame.triangles.into_iter().map(Geometry::Triangle).collect();

    let base = BaseScene::new();
    let floor_material = Reflection::multiply(&base.checker, &base.floor_diffuse);
    // Water-like refraction index.
    let fluid = Reflection::refraction(Color::new(0.6, 0.8, 1.0), 0.70);

    let mut world = fresh_world(config);
    world.insert(Object::new(&base.sky, &base.sky_light));
    world.insert(Object::new(&base.floor, &floor_material));
    for triangle in &fluid_geometry {
        world.insert(Object::new(triangle, &fluid));
    }
    Ok(run(&mut world))
}
