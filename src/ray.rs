use crate::math::{Point3, Vec3};
use crate::world::Object;

/// A parametric ray R(t) = origin + t · direction.
///
/// The direction must be unit length; the constructor caches its element-wise
/// reciprocal for the slab tests run during spatial-index traversal. A ray
/// also carries the recursion budget spent so far (`bounce`) and the id of
/// the worker thread that owns it, which selects the random stream any
/// downstream scattering draws from.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    origin: Point3,
    direction: Vec3,
    inv_direction: Vec3,
    /// Accumulated recursion weight. Cheap events (mirror bounces,
    /// refraction) advance it by 0.3, diffuse scattering by a full 1.0;
    /// tracing stops once it reaches the world's `max_bounce`.
    pub bounce: f32,
    /// Index of the worker whose random stream this ray draws from.
    pub thread_id: usize,
}

impl Ray {
    pub fn new(origin: Point3, direction: Vec3, thread_id: usize) -> Self {
        debug_assert!(
            (direction.length() - 1.0).abs() < 1e-3,
            "ray direction must be unit length, got |d| = {}",
            direction.length()
        );
        Self {
            origin,
            direction,
            inv_direction: Vec3::new(1.0 / direction.x, 1.0 / direction.y, 1.0 / direction.z),
            bounce: 0.0,
            thread_id,
        }
    }

    /// Same as [`Ray::new`] but with an explicit starting budget, used when
    /// a material spawns a child ray.
    pub fn with_bounce(origin: Point3, direction: Vec3, thread_id: usize, bounce: f32) -> Self {
        let mut ray = Self::new(origin, direction, thread_id);
        ray.bounce = bounce;
        ray
    }

    #[inline(always)]
    pub fn origin(&self) -> Point3 {
        self.origin
    }

    #[inline(always)]
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    #[inline(always)]
    pub fn inv_direction(&self) -> Vec3 {
        self.inv_direction
    }

    /// Evaluates the ray at parameter t.
    #[inline(always)]
    pub fn at(&self, t: f32) -> Point3 {
        self.origin + self.direction * t
    }
}

/// The surface-local part of an intersection: hit parameter and normal.
/// Geometry primitives produce these; the spatial index attaches the owning
/// object to form a full [`RayHit`].
#[derive(Debug, Clone, Copy)]
pub struct SurfaceHit {
    /// Distance along the ray, always greater than the self-intersection
    /// epsilon.
    pub t: f32,
    /// Unit surface normal. Spheres report the outward normal even for rays
    /// that start inside; planes report their fixed normal unflipped.
    pub normal: Vec3,
}

/// A resolved intersection: the closest surface along a ray together with
/// the scene object that owns it. "No hit" is `Option::None` at the query
/// boundary; internally traversal tracks the best `t` starting at infinity.
#[derive(Clone, Copy)]
pub struct RayHit<'s> {
    pub t: f32,
    pub normal: Vec3,
    pub object: Object<'s>,
}

impl<'s> RayHit<'s> {
    /// World-space hit point.
    #[inline(always)]
    pub fn point(&self, ray: &Ray) -> Point3 {
        ray.at(self.t)
    }

    /// Direction of the incident ray mirrored about the hit normal.
    #[inline(always)]
    pub fn reflect(&self, ray: &Ray) -> Vec3 {
        ray.direction().reflect(self.normal)
    }
}
