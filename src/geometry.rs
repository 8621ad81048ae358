use crate::aabb::Aabb;
use crate::math::{Point3, Vec3};
use crate::ray::{Ray, SurfaceHit};

/// Shared intersection epsilon. Solutions with `t ≤ HIT_EPSILON` are
/// rejected so a child ray spawned on a surface cannot immediately re-hit
/// the surface it left.
pub const HIT_EPSILON: f32 = 1e-3;

// ─── Sphere ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct Sphere {
    pub center: Point3,
    pub radius: f32,
}

impl Sphere {
    pub const fn new(center: Point3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Solves `(o + t·d − c)² = r²`. Because `d` is unit length the
    /// quadratic is monic, so with `half_b = d·(o−c)` the roots are
    /// `−half_b ∓ √(half_b² − c)`. The smaller positive root beyond the
    /// epsilon wins; the larger one covers a ray starting inside.
    pub fn raycast(&self, ray: &Ray) -> Option<SurfaceHit> {
        let oc = ray.origin() - self.center;
        let half_b = ray.direction().dot(oc);
        let c = oc.length_squared() - self.radius * self.radius;

        let det = half_b * half_b - c;
        if det < HIT_EPSILON {
            return None;
        }
        let det = det.sqrt();

        let t1 = -half_b - det;
        let t2 = -half_b + det;
        let t = if t1 > HIT_EPSILON {
            t1
        } else if t2 > HIT_EPSILON {
            t2
        } else {
            return None;
        };

        // Outward normal in all cases; callers detect an inside hit from
        // the sign of normal·direction.
        let normal = (ray.at(t) - self.center) / self.radius;
        Some(SurfaceHit { t, normal })
    }

    pub fn bounding_box(&self) -> Aabb {
        let r = Vec3::splat(self.radius);
        Aabb::new(self.center - r, self.center + r)
    }
}

// ─── Infinite Plane ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct Plane {
    pub center: Point3,
    pub normal: Vec3,
}

impl Plane {
    pub fn new(center: Point3, normal: Vec3) -> Self {
        Self {
            center,
            normal: normal.normalized(),
        }
    }

    /// `t·(d·n) = (c − o)·n`. Rays grazing the plane (|d·n| under the
    /// epsilon) miss. The plane reports its own normal regardless of which
    /// side the ray approaches from.
    pub fn raycast(&self, ray: &Ray) -> Option<SurfaceHit> {
        let denom = ray.direction().dot(self.normal);
        if denom.abs() < HIT_EPSILON {
            return None;
        }
        let t = (self.center - ray.origin()).dot(self.normal) / denom;
        if t > HIT_EPSILON {
            Some(SurfaceHit {
                t,
                normal: self.normal,
            })
        } else {
            None
        }
    }

    /// Unbounded, so the full-extent box: spatial-index traversal must
    /// always be willing to test the plane.
    pub fn bounding_box(&self) -> Aabb {
        Aabb::everything()
    }
}

// ─── Triangle ───────────────────────────────────────────────────────────────

/// A triangle with per-vertex shading normals. The hit normal is the
/// barycentric interpolation of the vertex normals, which lets triangle
/// meshes shade smoothly across faces.
#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    pub p0: Point3,
    pub p1: Point3,
    pub p2: Point3,
    pub n0: Vec3,
    pub n1: Vec3,
    pub n2: Vec3,
}

impl Triangle {
    pub const fn new(p0: Point3, p1: Point3, p2: Point3, n0: Vec3, n1: Vec3, n2: Vec3) -> Self {
        Self {
            p0,
            p1,
            p2,
            n0,
            n1,
            n2,
        }
    }

    /// All three vertices share one face normal.
    pub const fn flat(p0: Point3, p1: Point3, p2: Point3, normal: Vec3) -> Self {
        Self::new(p0, p1, p2, normal, normal, normal)
    }

    /// Geometric (cross-product) normal of the face, unnormalized.
    pub fn face_normal(&self) -> Vec3 {
        (self.p1 - self.p0).cross(self.p2 - self.p0)
    }

    /// Solves the 3×3 system
    /// `[p1−p0, p2−p0, −d] · (u, v, t)ᵀ = o − p0`
    /// by Cramer's rule with scalar triple products. A hit requires
    /// `u ≥ 0`, `v ≥ 0`, `u + v ≤ 1` and `t` beyond the epsilon.
    pub fn raycast(&self, ray: &Ray) -> Option<SurfaceHit> {
        let c0 = self.p1 - self.p0;
        let c1 = self.p2 - self.p0;
        let c2 = -ray.direction();

        let det = c0.dot(c1.cross(c2));
        if det.abs() < HIT_EPSILON {
            // Degenerate triangle or ray parallel to the face.
            return None;
        }
        let inv_det = 1.0 / det;
        let b = ray.origin() - self.p0;

        let u = inv_det * c1.cross(c2).dot(b);
        let v = inv_det * c2.cross(c0).dot(b);
        let t = inv_det * c0.cross(c1).dot(b);

        if u >= 0.0 && v >= 0.0 && u + v <= 1.0 && t > HIT_EPSILON {
            let normal = (self.n0 + (self.n1 - self.n0) * u + (self.n2 - self.n0) * v).normalized();
            Some(SurfaceHit { t, normal })
        } else {
            None
        }
    }

    pub fn bounding_box(&self) -> Aabb {
        Aabb::new(
            self.p0.min_components(self.p1).min_components(self.p2),
            self.p0.max_components(self.p1).max_components(self.p2),
        )
    }
}

// ─── Geometry Sum Type ──────────────────────────────────────────────────────

/// All primitives the renderer can intersect. An enum rather than trait
/// objects keeps leaf storage in the spatial index contiguous and the
/// dispatch in the traversal loop a jump table.
#[derive(Debug, Clone, Copy)]
pub enum Geometry {
    Sphere(Sphere),
    Plane(Plane),
    Triangle(Triangle),
}

impl Geometry {
    /// Closest intersection beyond the epsilon, or `None`. Degenerate
    /// configurations (zero determinant, grazing rays) are plain misses,
    /// never errors.
    pub fn raycast(&self, ray: &Ray) -> Option<SurfaceHit> {
        match self {
            Geometry::Sphere(s) => s.raycast(ray),
            Geometry::Plane(p) => p.raycast(ray),
            Geometry::Triangle(t) => t.raycast(ray),
        }
    }

    pub fn bounding_box(&self) -> Aabb {
        match self {
            Geometry::Sphere(s) => s.bounding_box(),
            Geometry::Plane(p) => p.bounding_box(),
            Geometry::Triangle(t) => t.bounding_box(),
        }
    }
}

impl From<Sphere> for Geometry {
    fn from(s: Sphere) -> Self {
        Geometry::Sphere(s)
    }
}

impl From<Plane> for Geometry {
    fn from(p: Plane) -> Self {
        Geometry::Plane(p)
    }
}

impl From<Triangle> for Geometry {
    fn from(t: Triangle) -> Self {
        Geometry::Triangle(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_prefers_near_root() {
        let s = Sphere::new(Point3::new(0.0, 0.0, -5.0), 1.0);
        let ray = Ray::new(Point3::zero(), -Vec3::unit_z(), 0);
        let hit = s.raycast(&ray).unwrap();
        assert!((hit.t - 4.0).abs() < 1e-4);
        assert!((hit.normal.z - 1.0).abs() < 1e-4);
    }

    #[test]
    fn sphere_inside_hit_keeps_outward_normal() {
        let s = Sphere::new(Point3::zero(), 2.0);
        let ray = Ray::new(Point3::zero(), Vec3::unit_x(), 0);
        let hit = s.raycast(&ray).unwrap();
        assert!((hit.t - 2.0).abs() < 1e-4);
        // Normal still points away from the center, i.e. along the ray.
        assert!(hit.normal.dot(ray.direction()) > 0.0);
    }

    #[test]
    fn ray_starting_on_surface_does_not_self_hit() {
        let s = Sphere::new(Point3::new(0.0, 0.0, -5.0), 1.0);
        let ray = Ray::new(Point3::new(0.0, 0.0, -4.0), Vec3::unit_z(), 0);
        assert!(s.raycast(&ray).is_none());
    }

    #[test]
    fn plane_parallel_ray_misses() {
        let p = Plane::new(Point3::new(0.0, -1.0, 0.0), Vec3::unit_y());
        let ray = Ray::new(Point3::zero(), Vec3::unit_x(), 0);
        assert!(p.raycast(&ray).is_none());
    }

    #[test]
    fn plane_normal_is_not_flipped_for_back_side() {
        let p = Plane::new(Point3::new(0.0, -1.0, 0.0), Vec3::unit_y());
        // Approach from below: direction and normal agree in sign.
        let ray = Ray::new(Point3::new(0.0, -3.0, 0.0), Vec3::unit_y(), 0);
        let hit = p.raycast(&ray).unwrap();
        assert_eq!(hit.normal, Vec3::unit_y());
        assert!((hit.t - 2.0).abs() < 1e-4);
    }

    fn xy_triangle() -> Triangle {
        Triangle::flat(
            Point3::new(-1.0, -1.0, -3.0),
            Point3::new(1.0, -1.0, -3.0),
            Point3::new(0.0, 1.0, -3.0),
            Vec3::unit_z(),
        )
    }

    #[test]
    fn triangle_interior_hit() {
        let ray = Ray::new(Point3::zero(), -Vec3::unit_z(), 0);
        let hit = xy_triangle().raycast(&ray).unwrap();
        assert!((hit.t - 3.0).abs() < 1e-4);
    }

    #[test]
    fn triangle_exterior_miss() {
        let ray = Ray::new(Point3::new(2.0, 2.0, 0.0), -Vec3::unit_z(), 0);
        assert!(xy_triangle().raycast(&ray).is_none());
    }

    #[test]
    fn triangle_interpolates_vertex_normals() {
        let mut tri = xy_triangle();
        tri.n0 = Vec3::new(1.0, 0.0, 1.0).normalized();
        tri.n1 = Vec3::new(-1.0, 0.0, 1.0).normalized();
        tri.n2 = Vec3::unit_z();
        // Shoot at the p2 vertex corner region: normal leans toward n2.
        let ray = Ray::new(Point3::new(0.0, 0.9, 0.0), -Vec3::unit_z(), 0);
        let hit = tri.raycast(&ray).unwrap();
        assert!((hit.normal.length() - 1.0).abs() < 1e-4);
        assert!(hit.normal.z > 0.95);
    }

    #[test]
    fn bounding_boxes_are_tight_or_infinite() {
        let s = Sphere::new(Point3::new(1.0, 2.0, 3.0), 0.5);
        let bb = s.bounding_box();
        assert_eq!(bb.min, Point3::new(0.5, 1.5, 2.5));
        assert_eq!(bb.max, Point3::new(1.5, 2.5, 3.5));

        let p = Plane::new(Point3::zero(), Vec3::unit_y());
        assert!(p.bounding_box().min.x.is_infinite());
        assert!(p.bounding_box().max.y.is_infinite());
    }
}
