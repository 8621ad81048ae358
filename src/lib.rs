//! # lumen
//!
//! A progressive Monte Carlo path tracer. Every render pass shoots a few
//! jittered primary rays per pixel and folds the result into a per-pixel
//! running mean, so the image sharpens the longer the camera holds still;
//! moving the camera restarts accumulation.
//!
//! ## Architecture
//!
//! - **Geometric primitives**: [`geometry`] — sphere, infinite plane,
//!   triangle with interpolated vertex normals, behind one tagged sum.
//! - **Spatial index**: [`rtree`] — an R-tree with branching factor 4..8,
//!   built while the scene is assembled, traversed lock-free by every
//!   worker with entry-distance pruning.
//! - **Materials**: [`reflect`] — mirror, fuzzy mirror, Lambertian diffuse,
//!   refraction, light sources, and combinators (weighted sum, product,
//!   front/back dispatch) that borrow their children.
//! - **Camera**: [`camera`] — pinhole eye with an orthonormal basis, plus an
//!   Euler-angle wrapper for interactive steering.
//! - **Renderer**: [`world`] — scene registry, recursive ray-color
//!   evaluation with a float bounce budget, per-thread seeded random
//!   streams, and a pixel-range partition rebalanced from measured
//!   per-pixel cost.
//!
//! ## Recursion budget
//!
//! Child rays carry a float `bounce` weight instead of an integer depth.
//! Specular events (mirror, refraction) cost 0.3, diffuse scattering a full
//! 1.0, and recursion stops at `max_bounce` — so cheap, low-variance chains
//! of reflections run deeper than expensive diffuse cascades.
//!
//! The adapters around the core — binary STL and marching-cubes loaders
//! ([`mesh`]), PNG/PPM output ([`output`]), the interactive terminal viewer
//! ([`viewer`]), and scene presets ([`demos`]) — are thin and replaceable.

pub mod aabb;
pub mod camera;
pub mod demos;
pub mod geometry;
pub mod math;
pub mod mesh;
pub mod output;
pub mod ray;
pub mod reflect;
pub mod rtree;
pub mod viewer;
pub mod world;

pub use math::{Color, Point3, Vec3};
pub use ray::{Ray, RayHit, SurfaceHit};
pub use world::{Object, World};
