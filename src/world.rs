use crate::camera::{Eye, EyeAngle};
use crate::geometry::Geometry;
use crate::math::Color;
use crate::ray::{Ray, RayHit};
use crate::reflect::Reflection;
use crate::rtree::RTree;
use log::{debug, info};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;

/// A renderable scene entry: one geometric primitive paired with the
/// material that shades it. Both halves are borrowed from storage that
/// outlives the world, so meshes and materials are shared freely between
/// objects without reference counting.
#[derive(Debug, Clone, Copy)]
pub struct Object<'s> {
    pub geometry: &'s Geometry,
    pub reflection: &'s Reflection<'s>,
}

impl<'s> Object<'s> {
    pub fn new(geometry: &'s Geometry, reflection: &'s Reflection<'s>) -> Self {
        Self {
            geometry,
            reflection,
        }
    }
}

/// Passes accumulate forever in an interactive session; past this count the
/// running-average weights stop changing to keep the arithmetic stable.
pub const SAMPLE_COUNT_CAP: u32 = 1_000_000;

struct Worker {
    rng: SmallRng,
    begin: usize,
    end: usize,
    pass_millis: f32,
}

/// The scene registry and progressive renderer.
///
/// A `World` owns the spatial index over inserted objects, the camera, the
/// accumulation framebuffer with its per-pixel timing shadow, and one
/// seeded random stream per worker thread. Each call to [`World::render`]
/// performs one full pass: every pixel is sampled `shoot_count` times, the
/// result folded into the per-pixel running mean, and `sample_count`
/// advanced by one. Between passes the driver may move the camera (paired
/// with [`World::clear_framebuffer`], since the average is only meaningful
/// over a fixed view) and call [`World::rebalance`] to re-split the pixel
/// range by measured cost.
pub struct World<'s> {
    objects: RTree<'s>,
    pub camera: EyeAngle,
    /// Recursion budget; rays stop once their accumulated `bounce` weight
    /// reaches this.
    pub max_bounce: f32,
    /// Primary rays per pixel per pass.
    pub shoot_count: u32,
    width: usize,
    height: usize,
    framebuffer: Vec<Color>,
    calc_time: Vec<f32>,
    prefix: Vec<f32>,
    sample_count: u32,
    workers: Vec<Worker>,
}

impl<'s> World<'s> {
    /// Allocates the framebuffer and timing buffer, seeds one random stream
    /// per worker from `seed`, and hands every worker an equal contiguous
    /// pixel slice. Two worlds built from the same seed render identically
    /// as long as their partitions match.
    pub fn new(width: usize, height: usize, thread_count: usize, seed: u64) -> Self {
        assert!(width > 0 && height > 0, "framebuffer must be non-empty");
        assert!(thread_count > 0, "need at least one worker");

        let mut master = SmallRng::seed_from_u64(seed);
        let pixel_count = width * height;
        let workers = (0..thread_count)
            .map(|_| Worker {
                rng: SmallRng::seed_from_u64(master.gen()),
                begin: 0,
                end: 0,
                pass_millis: 0.0,
            })
            .collect();

        let mut world = Self {
            objects: RTree::new(),
            camera: EyeAngle::default(),
            max_bounce: 2.0,
            shoot_count: 4,
            width,
            height,
            framebuffer: vec![Color::zero(); pixel_count],
            calc_time: vec![0.0; pixel_count],
            prefix: vec![0.0; pixel_count + 1],
            sample_count: 0,
            workers,
        };
        world.assign_equal_partition();
        world
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Completed passes since the last clear.
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn thread_count(&self) -> usize {
        self.workers.len()
    }

    /// Accumulated linear radiance, row-major, one entry per pixel.
    pub fn framebuffer(&self) -> &[Color] {
        &self.framebuffer
    }

    /// Current `(begin, end)` pixel ranges, one per worker.
    pub fn partition(&self) -> Vec<(usize, usize)> {
        self.workers.iter().map(|w| (w.begin, w.end)).collect()
    }

    /// Registers an object with the spatial index. Must not be called while
    /// a render pass is in flight (enforced by `&mut self`).
    pub fn insert(&mut self, object: Object<'s>) {
        self.objects.insert(object.geometry.bounding_box(), object);
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Restarts accumulation. Pixel data is not zeroed here; the first
    /// pixel visit of the next pass overwrites it because the weights
    /// collapse to zero when `sample_count` is zero.
    pub fn clear_framebuffer(&mut self) {
        self.sample_count = 0;
    }

    /// Closest surface along `ray`, across every inserted object.
    pub fn nearest_hit(&self, ray: &Ray) -> Option<RayHit<'s>> {
        self.objects.nearest_hit(ray)
    }

    /// Single-ray entry point mirroring what the render workers do, drawing
    /// from the stream of the worker named by `ray.thread_id`. Handy for
    /// drivers and tests that want one radiance value without a full pass.
    pub fn get_color(&mut self, ray: &Ray) -> Color {
        let ctx = PassContext {
            objects: &self.objects,
            camera: self.camera.eye(),
            max_bounce: self.max_bounce,
            shoot_count: self.shoot_count,
            sample_count: self.sample_count,
            width: self.width,
            height: self.height,
        };
        let worker = &mut self.workers[ray.thread_id];
        let mut tracer = Tracer {
            ctx: &ctx,
            rng: &mut worker.rng,
            thread_id: ray.thread_id,
        };
        tracer.get_color(ray)
    }

    /// Runs one pass: spawns one thread per partition slot, joins them all,
    /// then advances `sample_count`.
    ///
    /// Workers share the spatial index, camera, and settings read-only and
    /// write disjoint framebuffer/timing slices carved out of the partition,
    /// so the hot path takes no locks. The only blocking point is the join
    /// at the end of the pass.
    pub fn render(&mut self) {
        let pass_start = Instant::now();
        let ctx = PassContext {
            objects: &self.objects,
            camera: self.camera.eye(),
            max_bounce: self.max_bounce,
            shoot_count: self.shoot_count,
            sample_count: self.sample_count,
            width: self.width,
            height: self.height,
        };

        // Carve the buffers into per-worker slices. Ranges are contiguous
        // and ascending, which both the slicing below and `rebalance` keep
        // as an invariant.
        let mut jobs = Vec::with_capacity(self.workers.len());
        let mut pixels_rest: &mut [Color] = &mut self.framebuffer;
        let mut timings_rest: &mut [f32] = &mut self.calc_time;
        let mut cursor = 0usize;
        for worker in self.workers.iter_mut() {
            debug_assert_eq!(worker.begin, cursor);
            let count = worker.end - worker.begin;
            let (pixels, rest) = pixels_rest.split_at_mut(count);
            pixels_rest = rest;
            let (timings, rest) = timings_rest.split_at_mut(count);
            timings_rest = rest;
            cursor += count;
            jobs.push((worker, pixels, timings));
        }
        debug_assert_eq!(cursor, self.width * self.height);

        std::thread::scope(|scope| {
            for (thread_id, (worker, pixels, timings)) in jobs.into_iter().enumerate() {
                let ctx = &ctx;
                scope.spawn(move || {
                    let worker_start = Instant::now();
                    let mut tracer = Tracer {
                        ctx,
                        rng: &mut worker.rng,
                        thread_id,
                    };
                    let n = ctx.sample_count as f32;
                    for (offset, index) in (worker.begin..worker.end).enumerate() {
                        let pixel_start = Instant::now();
                        let color = tracer.sample_pixel(index % ctx.width, index / ctx.width);
                        let millis = pixel_start.elapsed().as_secs_f32() * 1_000.0;

                        if ctx.sample_count == 0 {
                            pixels[offset] = Color::zero();
                            timings[offset] = 0.0;
                        }
                        pixels[offset] = pixels[offset] * (n / (n + 1.0)) + color / (n + 1.0);
                        timings[offset] = (timings[offset] * n + millis) / (n + 1.0);
                    }
                    worker.pass_millis = worker_start.elapsed().as_secs_f32() * 1_000.0;
                });
            }
        });

        for (i, worker) in self.workers.iter().enumerate() {
            debug!(
                "thread {i}: pixels [{}, {}), {:.1} ms",
                worker.begin, worker.end, worker.pass_millis
            );
        }
        info!(
            "pass {} rendered in {:.1} ms",
            self.sample_count + 1,
            pass_start.elapsed().as_secs_f32() * 1_000.0
        );

        if self.sample_count < SAMPLE_COUNT_CAP {
            self.sample_count += 1;
        }
    }

    /// Re-splits the pixel range so each worker gets roughly equal expected
    /// work, assuming the next pass costs what the smoothed per-pixel
    /// timings say the last ones did.
    ///
    /// Builds the prefix sum of the timing buffer, divides the total into
    /// per-thread budgets, and places each boundary at the first pixel whose
    /// prefix reaches its budget multiple. The final worker always runs to
    /// the end of the framebuffer. Only call between passes.
    pub fn rebalance(&mut self) {
        let pixel_count = self.width * self.height;
        self.prefix[0] = 0.0;
        for i in 0..pixel_count {
            self.prefix[i + 1] = self.prefix[i] + self.calc_time[i];
        }
        let total = self.prefix[pixel_count];
        if total <= 0.0 {
            // No cost signal yet (fresh world or cleared timings).
            self.assign_equal_partition();
            return;
        }

        let worker_count = self.workers.len();
        let budget = total / worker_count as f32;
        let mut begin = 0usize;
        for k in 0..worker_count - 1 {
            let target = budget * (k + 1) as f32;
            let end = begin + self.prefix[begin..].partition_point(|&s| s < target);
            let end = end.min(pixel_count);
            self.workers[k].begin = begin;
            self.workers[k].end = end;
            begin = end;
        }
        self.workers[worker_count - 1].begin = begin;
        self.workers[worker_count - 1].end = pixel_count;
    }

    /// Maps accumulated radiance to 8-bit RGB (or RGBA with constant 255
    /// alpha): clamp each channel to [0, 1], scale by 255.99, truncate.
    pub fn get_imagebuffer(&self, alpha: bool) -> Vec<u8> {
        let channels = if alpha { 4 } else { 3 };
        let mut out = Vec::with_capacity(self.framebuffer.len() * channels);
        for pixel in &self.framebuffer {
            let (r, g, b) = pixel.to_rgb8();
            out.push(r);
            out.push(g);
            out.push(b);
            if alpha {
                out.push(255);
            }
        }
        out
    }

    fn assign_equal_partition(&mut self) {
        let pixel_count = self.width * self.height;
        let per_thread = pixel_count / self.workers.len();
        let worker_count = self.workers.len();
        for (i, worker) in self.workers.iter_mut().enumerate() {
            worker.begin = i * per_thread;
            worker.end = if i == worker_count - 1 {
                pixel_count
            } else {
                (i + 1) * per_thread
            };
        }
    }
}

/// Everything a pass shares read-only between workers.
pub(crate) struct PassContext<'w, 's> {
    objects: &'w RTree<'s>,
    camera: &'w Eye,
    max_bounce: f32,
    shoot_count: u32,
    sample_count: u32,
    width: usize,
    height: usize,
}

/// One worker's view of the world during a pass: the shared scene plus the
/// worker's private random stream. Materials recurse through
/// [`Tracer::get_color`] and draw jitter through [`Tracer::random01`]; the
/// recursion keeps no other state, so it is re-entrant by construction.
pub struct Tracer<'w, 's> {
    ctx: &'w PassContext<'w, 's>,
    rng: &'w mut SmallRng,
    thread_id: usize,
}

impl<'w, 's> Tracer<'w, 's> {
    /// Radiance arriving along `ray`: black once the bounce budget is
    /// spent, black into empty space (an emissive sky must be a scene
    /// object), otherwise whatever the hit material computes.
    pub fn get_color(&mut self, ray: &Ray) -> Color {
        if ray.bounce >= self.ctx.max_bounce {
            return Color::zero();
        }
        match self.ctx.objects.nearest_hit(ray) {
            Some(hit) => hit.object.reflection.get_color(ray, &hit, self),
            None => Color::zero(),
        }
    }

    /// Uniform f32 in [0, 1) from the owning worker's stream. `thread_id`
    /// travels on the ray; handing in a foreign id means a material is
    /// about to desynchronize another worker's stream, which the debug
    /// assertion catches.
    pub fn random01(&mut self, thread_id: usize) -> f32 {
        debug_assert_eq!(
            thread_id, self.thread_id,
            "ray drew from a foreign random stream"
        );
        self.rng.gen()
    }

    fn sample_pixel(&mut self, x: usize, y: usize) -> Color {
        let origin = self.ctx.camera.position();
        let mut color = Color::zero();
        for _ in 0..self.ctx.shoot_count {
            let i = (x as f32 + self.random01(self.thread_id)) / self.ctx.width as f32;
            let j = (y as f32 + self.random01(self.thread_id)) / self.ctx.height as f32;
            let direction = (self.ctx.camera.film_of(i, j) - origin).normalized();
            let ray = Ray::new(origin, direction, self.thread_id);
            color += self.get_color(&ray);
        }
        color / self.ctx.shoot_count as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Sphere;
    use crate::math::{Point3, Vec3};
    use std::f32::consts::PI;

    fn coverage_is_exact(partition: &[(usize, usize)], pixel_count: usize) {
        let mut cursor = 0;
        for &(begin, end) in partition {
            assert_eq!(begin, cursor, "partition must be contiguous");
            assert!(end >= begin);
            cursor = end;
        }
        assert_eq!(cursor, pixel_count, "partition must cover the framebuffer");
    }

    #[test]
    fn initial_partition_is_equal_slices() {
        let world = World::new(10, 7, 3, 1);
        let partition = world.partition();
        coverage_is_exact(&partition, 70);
        assert_eq!(partition[0], (0, 23));
        assert_eq!(partition[1], (23, 46));
        assert_eq!(partition[2], (46, 70));
    }

    #[test]
    fn rebalance_uniform_timing_splits_in_half() {
        let mut world = World::new(100, 100, 2, 1);
        world.calc_time.fill(1.0);
        world.rebalance();
        assert_eq!(world.partition(), vec![(0, 5000), (5000, 10000)]);
    }

    #[test]
    fn rebalance_follows_cost_skew() {
        let mut world = World::new(100, 100, 2, 1);
        world.calc_time.fill(0.0);
        world.calc_time[..1000].fill(1.0);
        world.rebalance();
        assert_eq!(world.partition(), vec![(0, 500), (500, 10000)]);
    }

    #[test]
    fn rebalance_without_timing_falls_back_to_equal() {
        let mut world = World::new(8, 8, 4, 1);
        world.rebalance();
        let partition = world.partition();
        coverage_is_exact(&partition, 64);
        assert_eq!(partition[0], (0, 16));
    }

    #[test]
    fn enclosing_light_renders_exact_white() {
        let sky = Geometry::Sphere(Sphere::new(Point3::zero(), 100.0));
        let light = Reflection::light(Color::ones());

        let mut world = World::new(4, 4, 1, 9);
        world.max_bounce = 3.0;
        world.shoot_count = 1;
        world.insert(Object::new(&sky, &light));

        for pass in 1..=3 {
            world.render();
            assert_eq!(world.sample_count(), pass);
            for pixel in world.framebuffer() {
                assert!((*pixel - Color::ones()).length() < 1e-6);
            }
        }
    }

    #[test]
    fn identical_seeds_render_identical_frames() {
        let floor = Geometry::Sphere(Sphere::new(Point3::new(0.0, -101.0, 0.0), 100.0));
        let sky = Geometry::Sphere(Sphere::new(Point3::zero(), 50.0));
        let scatter = Reflection::diffuse(Color::new(0.8, 0.6, 0.4), 4);
        let glow = Reflection::light(Color::ones());

        let render_two_passes = || {
            let mut world = World::new(8, 8, 2, 1234);
            world.max_bounce = 3.0;
            world.insert(Object::new(&floor, &scatter));
            world.insert(Object::new(&sky, &glow));
            world.render();
            world.render();
            world.framebuffer().to_vec()
        };

        assert_eq!(render_two_passes(), render_two_passes());
    }

    #[test]
    fn clear_restarts_accumulation_on_next_pass() {
        let lamp = Geometry::Sphere(Sphere::new(Point3::new(0.0, 0.0, -5.0), 1.0));
        let glow = Reflection::light(Color::ones());

        let mut world = World::new(3, 3, 1, 5);
        world.max_bounce = 3.0;
        world.shoot_count = 1;
        world.insert(Object::new(&lamp, &glow));

        world.render();
        world.render();
        assert_eq!(world.sample_count(), 2);
        let center = world.framebuffer()[4];
        assert!((center - Color::ones()).length() < 1e-6);

        // Turn the camera around: nothing there, so after a clear the next
        // pass must overwrite rather than blend with the stale white.
        world.camera.set_angle(Vec3::new(0.0, PI, 0.0));
        world.clear_framebuffer();
        world.render();
        assert_eq!(world.sample_count(), 1);
        for pixel in world.framebuffer() {
            assert!(pixel.length() < 1e-6);
        }
    }

    #[test]
    fn partition_stays_exact_after_measured_rebalance() {
        let lamp = Geometry::Sphere(Sphere::new(Point3::new(0.0, 0.0, -5.0), 2.0));
        let glow = Reflection::light(Color::ones());

        let mut world = World::new(16, 16, 3, 2);
        world.shoot_count = 1;
        world.insert(Object::new(&lamp, &glow));
        world.render();
        world.rebalance();
        coverage_is_exact(&world.partition(), 256);
        world.render();
        assert_eq!(world.sample_count(), 2);
    }
}
