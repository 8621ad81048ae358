use criterion::{criterion_group, criterion_main, Criterion};
use lumen::demos::{self, RenderConfig};
use lumen::math::{Point3, Vec3};
use lumen::ray::Ray;
use std::hint::black_box;

fn bench_trace(c: &mut Criterion) {
    let config = RenderConfig {
        width: 64,
        height: 64,
        threads: 4,
        seed: 7,
        shoot_count: 2,
        max_bounce: 3.0,
    };

    demos::spheres(&config, |world| {
        c.bench_function("nearest_hit", |b| {
            let ray = Ray::new(
                Point3::new(0.2, 1.0, 2.5),
                Vec3::new(0.0, -0.25, -1.0).normalized(),
                0,
            );
            b.iter(|| black_box(world.nearest_hit(black_box(&ray))));
        });

        c.bench_function("render_pass_64x64", |b| {
            b.iter(|| {
                world.clear_framebuffer();
                world.render();
            });
        });
    });
}

criterion_group!(benches, bench_trace);
criterion_main!(benches);
