use crate::geometry::HIT_EPSILON;
use crate::math::{Color, Point3, Vec3};
use crate::ray::{Ray, RayHit};
use crate::world::Tracer;
use std::f32::consts::{FRAC_PI_2, TAU};

/// How a surface turns an incident ray into outgoing radiance.
///
/// Every variant maps `(incident ray, hit, tracer) → color`, recursing into
/// the world for child rays. Recursion is budgeted through the ray's
/// floating-point `bounce` field rather than an integer depth: a mirror or
/// refraction event costs 0.3, a diffuse scatter a full 1.0, so low-variance
/// specular chains are allowed to run deeper than noisy diffuse ones.
///
/// Composite variants (`Combine`, `Multiply`, `Face`) borrow their children;
/// building materials in topological order keeps the graph acyclic and lets
/// a whole scene share leaf materials without reference counting.
#[derive(Debug, Clone, Copy)]
pub enum Reflection<'s> {
    /// Perfect mirror; the child color is filtered by `color`.
    Mirror { color: Color },
    /// Mirror with its reflection direction jittered inside a cone of
    /// half-angle `fuzziness·π/2`. Samples falling under the tangent plane
    /// are discarded; the survivors are averaged.
    FuzzyMirror {
        color: Color,
        fuzziness: f32,
        sample_count: u32,
    },
    /// Lambertian scattering with cosine-weighted hemisphere samples.
    Diffuse { color: Color, sample_count: u32 },
    /// Snell refraction with `index` = (inside speed)/(outside speed);
    /// grazing exits fall back to total internal reflection.
    Refraction { color: Color, index: f32 },
    /// Weighted sum `s1·r1 + s2·r2` (callers usually keep `s1 + s2 = 1`).
    Combine {
        r1: &'s Reflection<'s>,
        r2: &'s Reflection<'s>,
        s1: f32,
        s2: f32,
    },
    /// Element-wise product of two sub-materials, the route by which a
    /// procedural pattern tints a scattering model.
    Multiply {
        r1: &'s Reflection<'s>,
        r2: &'s Reflection<'s>,
    },
    /// Dispatches on which side was struck: `front` when the ray opposes
    /// the surface normal, `back` otherwise.
    Face {
        front: &'s Reflection<'s>,
        back: &'s Reflection<'s>,
    },
    /// Terminal emitter returning `color` regardless of incidence.
    Light { color: Color },
    /// Emitter weighted by how squarely the ray strikes the surface.
    DirectionalLight { color: Color },
    /// Terminal checkerboard color source over the world x/z plane; meant
    /// to be combined with a scattering model through [`Reflection::Multiply`].
    Checker {
        width: f32,
        bright: Color,
        dark: Color,
    },
}

impl<'s> Reflection<'s> {
    pub const fn mirror(color: Color) -> Self {
        Reflection::Mirror { color }
    }

    pub const fn fuzzy_mirror(color: Color, fuzziness: f32, sample_count: u32) -> Self {
        Reflection::FuzzyMirror {
            color,
            fuzziness,
            sample_count,
        }
    }

    pub const fn diffuse(color: Color, sample_count: u32) -> Self {
        Reflection::Diffuse {
            color,
            sample_count,
        }
    }

    pub const fn refraction(color: Color, index: f32) -> Self {
        Reflection::Refraction { color, index }
    }

    pub const fn combine(r1: &'s Reflection<'s>, r2: &'s Reflection<'s>, s1: f32, s2: f32) -> Self {
        Reflection::Combine { r1, r2, s1, s2 }
    }

    pub const fn multiply(r1: &'s Reflection<'s>, r2: &'s Reflection<'s>) -> Self {
        Reflection::Multiply { r1, r2 }
    }

    pub const fn face(front: &'s Reflection<'s>, back: &'s Reflection<'s>) -> Self {
        Reflection::Face { front, back }
    }

    pub const fn light(color: Color) -> Self {
        Reflection::Light { color }
    }

    pub const fn directional_light(color: Color) -> Self {
        Reflection::DirectionalLight { color }
    }

    pub const fn checker(width: f32, bright: Color, dark: Color) -> Self {
        Reflection::Checker {
            width,
            bright,
            dark,
        }
    }

    /// Outgoing radiance for `ray` striking this material at `hit`.
    pub fn get_color(&self, ray: &Ray, hit: &RayHit<'s>, tracer: &mut Tracer<'_, 's>) -> Color {
        match *self {
            Reflection::Mirror { color } => {
                let child = Ray::with_bounce(
                    hit.point(ray),
                    hit.reflect(ray),
                    ray.thread_id,
                    ray.bounce + 0.3,
                );
                tracer.get_color(&child).hadamard(color)
            }

            Reflection::FuzzyMirror {
                color,
                fuzziness,
                sample_count,
            } => {
                let reflection = hit.reflect(ray);
                let (tangent, bitangent) = reflection.orthonormal_basis();
                let mut sum = Color::zero();
                let mut accepted = 0u32;
                for _ in 0..sample_count {
                    let angle = (1.0 - (tracer.random01(ray.thread_id) * FRAC_PI_2).sin())
                        * FRAC_PI_2
                        * fuzziness;
                    let phi = tracer.random01(ray.thread_id) * TAU;
                    let direction = (tangent * (phi.cos() * angle.sin())
                        + bitangent * (phi.sin() * angle.sin())
                        + reflection * angle.cos())
                    .normalized();
                    if direction.dot(hit.normal) < 0.0 {
                        continue;
                    }
                    let child = Ray::with_bounce(
                        hit.point(ray),
                        direction,
                        ray.thread_id,
                        ray.bounce + 0.3,
                    );
                    sum += tracer.get_color(&child);
                    accepted += 1;
                }
                (sum / accepted.max(1) as f32).hadamard(color)
            }

            Reflection::Diffuse {
                color,
                sample_count,
            } => {
                let (tangent, bitangent) = hit.normal.orthonormal_basis();
                let mut sum = Color::zero();
                for _ in 0..sample_count {
                    let phi = tracer.random01(ray.thread_id) * TAU;
                    let sin_z = tracer.random01(ray.thread_id);
                    let cos_z = (1.0 - sin_z * sin_z).sqrt();
                    let direction = tangent * (sin_z * phi.cos())
                        + bitangent * (sin_z * phi.sin())
                        + hit.normal * cos_z;
                    let child = Ray::with_bounce(
                        hit.point(ray),
                        direction,
                        ray.thread_id,
                        ray.bounce + 1.0,
                    );
                    sum += tracer.get_color(&child);
                }
                (sum / sample_count as f32).hadamard(color)
            }

            Reflection::Refraction { color, index } => {
                let direction = refract_direction(ray.direction(), hit.normal, index);
                let child =
                    Ray::with_bounce(hit.point(ray), direction, ray.thread_id, ray.bounce + 0.3);
                tracer.get_color(&child).hadamard(color)
            }

            Reflection::Combine { r1, r2, s1, s2 } => {
                r1.get_color(ray, hit, tracer) * s1 + r2.get_color(ray, hit, tracer) * s2
            }

            Reflection::Multiply { r1, r2 } => r1
                .get_color(ray, hit, tracer)
                .hadamard(r2.get_color(ray, hit, tracer)),

            Reflection::Face { front, back } => {
                if hit.normal.dot(ray.direction()) < 0.0 {
                    front.get_color(ray, hit, tracer)
                } else {
                    back.get_color(ray, hit, tracer)
                }
            }

            Reflection::Light { color } => color,

            Reflection::DirectionalLight { color } => {
                color * ray.direction().dot(hit.normal).abs()
            }

            Reflection::Checker {
                width,
                bright,
                dark,
            } => checker_color(hit.point(ray), width, bright, dark),
        }
    }
}

/// Child-ray direction for a refraction event.
///
/// The incident direction splits into its component along the normal and the
/// tangential remainder. When the ray exits the medium (`d·n > 0`) the
/// effective index is the reciprocal. Snell's law scales the tangential part
/// by `α = √(η²·‖n‖² / (1 − η²·‖tangent‖²))`; when the denominator collapses
/// (`sin(out) ≥ 1`) the ray reflects internally instead.
pub(crate) fn refract_direction(direction: Vec3, normal: Vec3, index: f32) -> Vec3 {
    let n = normal * normal.dot(direction);
    let tangent = direction - n;
    let eta = if normal.dot(direction) > 0.0 {
        1.0 / index
    } else {
        index
    };

    let a2 = eta * eta * n.length_squared();
    let a1 = 1.0 - eta * eta * tangent.length_squared();
    if a1 <= HIT_EPSILON {
        // Total internal reflection.
        tangent - n
    } else {
        (n + tangent * (a2 / a1).sqrt()).normalized()
    }
}

fn checker_color(point: Point3, width: f32, bright: Color, dark: Color) -> Color {
    let ix = (point.x / width).floor() as i64;
    let iz = (point.z / width).floor() as i64;
    if (ix + iz) & 1 != 0 {
        bright
    } else {
        dark
    }
}
