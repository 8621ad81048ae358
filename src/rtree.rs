use crate::aabb::Aabb;
use crate::ray::{Ray, RayHit};
use crate::world::Object;

/// Branching-factor bounds. Every node except the root holds between
/// `MIN_ENTRIES` and `MAX_ENTRIES` children; an overflowing node splits in
/// two and the split propagates upward, growing the tree at the root so all
/// leaves stay at the same depth.
pub const MIN_ENTRIES: usize = 4;
pub const MAX_ENTRIES: usize = 8;

/// An R-tree over object bounding boxes.
///
/// The scene inserts objects one by one while it is being assembled; after
/// that the tree is only ever read, so the render workers can traverse it
/// concurrently through a shared reference. Traversal carries no state
/// between calls.
pub struct RTree<'s> {
    root: Node<'s>,
    len: usize,
}

enum Node<'s> {
    Branch(Vec<(Aabb, Node<'s>)>),
    Leaf(Vec<(Aabb, Object<'s>)>),
}

impl<'s> Node<'s> {
    fn bounds(&self) -> Aabb {
        match self {
            Node::Branch(children) => merge_all(children.iter().map(|(bb, _)| bb)),
            Node::Leaf(entries) => merge_all(entries.iter().map(|(bb, _)| bb)),
        }
    }
}

fn merge_all<'a>(mut boxes: impl Iterator<Item = &'a Aabb>) -> Aabb {
    let first = *boxes.next().expect("bounds of an empty node");
    boxes.fold(first, |acc, bb| acc.merge(bb))
}

impl<'s> Default for RTree<'s> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'s> RTree<'s> {
    pub fn new() -> Self {
        Self {
            root: Node::Leaf(Vec::new()),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Inserts an object under the given bounding box. Not thread-safe;
    /// the scene must be fully assembled before rendering starts.
    pub fn insert(&mut self, bbox: Aabb, object: Object<'s>) {
        if let Some(sibling) = insert_rec(&mut self.root, bbox, object) {
            // Root overflow: the old root and its split-off sibling become
            // the two children of a fresh root, which is the only way the
            // tree gains height — leaves stay level with each other.
            let old = std::mem::replace(&mut self.root, Node::Branch(Vec::new()));
            let old_bounds = old.bounds();
            let sibling_bounds = sibling.bounds();
            self.root = Node::Branch(vec![(old_bounds, old), (sibling_bounds, sibling)]);
        }
        self.len += 1;
    }

    /// Closest intersection with any stored object, or `None`.
    ///
    /// Depth-first descent: a child subtree is skipped when its box misses
    /// the ray, or when the box's entry parameter already lies beyond the
    /// best hit so far — a skipped subtree can therefore never contain an
    /// intersection closer than the one returned.
    pub fn nearest_hit(&self, ray: &Ray) -> Option<RayHit<'s>> {
        let mut best: Option<RayHit<'s>> = None;
        let mut best_t = f32::INFINITY;
        raycast_rec(&self.root, ray, &mut best_t, &mut best);
        best
    }
}

fn raycast_rec<'s>(
    node: &Node<'s>,
    ray: &Ray,
    best_t: &mut f32,
    best: &mut Option<RayHit<'s>>,
) {
    match node {
        Node::Leaf(entries) => {
            for (bbox, object) in entries {
                let Some((tmin, _)) = bbox.raycast(ray) else {
                    continue;
                };
                if tmin >= *best_t {
                    continue;
                }
                if let Some(hit) = object.geometry.raycast(ray) {
                    if hit.t < *best_t {
                        *best_t = hit.t;
                        *best = Some(RayHit {
                            t: hit.t,
                            normal: hit.normal,
                            object: *object,
                        });
                    }
                }
            }
        }
        Node::Branch(children) => {
            for (bbox, child) in children {
                let Some((tmin, _)) = bbox.raycast(ray) else {
                    continue;
                };
                if tmin >= *best_t {
                    continue;
                }
                raycast_rec(child, ray, best_t, best);
            }
        }
    }
}

/// Recursive insert. Returns a split-off sibling when the visited node
/// overflowed, for the caller to adopt.
fn insert_rec<'s>(node: &mut Node<'s>, bbox: Aabb, object: Object<'s>) -> Option<Node<'s>> {
    match node {
        Node::Leaf(entries) => {
            entries.push((bbox, object));
            if entries.len() > MAX_ENTRIES {
                let (keep, spill) = quadratic_split(std::mem::take(entries));
                *entries = keep;
                Some(Node::Leaf(spill))
            } else {
                None
            }
        }
        Node::Branch(children) => {
            let chosen = choose_subtree(children, &bbox);
            let spilled = insert_rec(&mut children[chosen].1, bbox, object);
            children[chosen].0 = children[chosen].1.bounds();

            if let Some(sibling) = spilled {
                let sibling_bounds = sibling.bounds();
                children.push((sibling_bounds, sibling));
                if children.len() > MAX_ENTRIES {
                    let (keep, spill) = quadratic_split(std::mem::take(children));
                    *children = keep;
                    return Some(Node::Branch(spill));
                }
            }
            None
        }
    }
}

/// Index of the child whose box needs the least volume enlargement to admit
/// `bbox`, ties broken by smaller current volume.
fn choose_subtree(children: &[(Aabb, Node<'_>)], bbox: &Aabb) -> usize {
    let mut chosen = 0;
    let mut chosen_cost = (f32::INFINITY, f32::INFINITY);
    for (i, (child_bbox, _)) in children.iter().enumerate() {
        let volume = child_bbox.volume();
        let cost = (
            finite_cost(child_bbox.merge(bbox).volume() - volume),
            volume,
        );
        if cost < chosen_cost {
            chosen = i;
            chosen_cost = cost;
        }
    }
    chosen
}

/// Guttman's quadratic split. Seeds are the pair of entries whose combined
/// box wastes the most volume; the rest are distributed one at a time to
/// whichever group grows less, with a forced dump once a group must take
/// everything remaining to reach `MIN_ENTRIES`.
fn quadratic_split<T>(mut entries: Vec<(Aabb, T)>) -> (Vec<(Aabb, T)>, Vec<(Aabb, T)>) {
    debug_assert!(entries.len() > MAX_ENTRIES);

    let (seed_a, seed_b) = pick_seeds(&entries);
    // Remove the later index first so the earlier one stays valid.
    let b = entries.swap_remove(seed_b.max(seed_a));
    let a = entries.swap_remove(seed_a.min(seed_b));

    let mut group_a = vec![a];
    let mut group_b = vec![b];
    let mut bounds_a = group_a[0].0;
    let mut bounds_b = group_b[0].0;

    while let Some(next) = entries.pop() {
        let remaining = entries.len() + 1;
        if group_a.len() + remaining <= MIN_ENTRIES {
            bounds_a = bounds_a.merge(&next.0);
            group_a.push(next);
            continue;
        }
        if group_b.len() + remaining <= MIN_ENTRIES {
            bounds_b = bounds_b.merge(&next.0);
            group_b.push(next);
            continue;
        }

        let grow_a = finite_cost(bounds_a.merge(&next.0).volume() - bounds_a.volume());
        let grow_b = finite_cost(bounds_b.merge(&next.0).volume() - bounds_b.volume());
        let take_a = match grow_a.partial_cmp(&grow_b) {
            Some(std::cmp::Ordering::Less) => true,
            Some(std::cmp::Ordering::Greater) => false,
            _ => group_a.len() <= group_b.len(),
        };
        if take_a {
            bounds_a = bounds_a.merge(&next.0);
            group_a.push(next);
        } else {
            bounds_b = bounds_b.merge(&next.0);
            group_b.push(next);
        }
    }

    (group_a, group_b)
}

fn pick_seeds<T>(entries: &[(Aabb, T)]) -> (usize, usize) {
    let mut seeds = (0, 1);
    let mut worst = f32::NEG_INFINITY;
    for i in 0..entries.len() {
        for j in (i + 1)..entries.len() {
            let waste = finite_cost(
                entries[i].0.merge(&entries[j].0).volume()
                    - entries[i].0.volume()
                    - entries[j].0.volume(),
            );
            if waste > worst {
                worst = waste;
                seeds = (i, j);
            }
        }
    }
    seeds
}

/// Volume arithmetic over unbounded boxes (the infinite plane's) produces
/// `∞ − ∞ = NaN`; treat that as "no enlargement" so the heuristics stay
/// total orders. Tree quality degrades gracefully, correctness never
/// depends on it.
fn finite_cost(x: f32) -> f32 {
    if x.is_nan() {
        0.0
    } else {
        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Geometry, Plane, Sphere};
    use crate::math::{Point3, Vec3};
    use crate::reflect::Reflection;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    fn sphere_grid(count: usize, rng: &mut SmallRng) -> Vec<Geometry> {
        (0..count)
            .map(|_| {
                Geometry::Sphere(Sphere::new(
                    Point3::new(
                        rng.gen_range(-20.0..20.0),
                        rng.gen_range(-20.0..20.0),
                        rng.gen_range(-20.0..20.0),
                    ),
                    rng.gen_range(0.1..1.5),
                ))
            })
            .collect()
    }

    fn build<'s>(geometries: &'s [Geometry], material: &'s Reflection<'s>) -> RTree<'s> {
        let mut tree = RTree::new();
        for geometry in geometries {
            tree.insert(
                geometry.bounding_box(),
                Object {
                    geometry,
                    reflection: material,
                },
            );
        }
        tree
    }

    /// Checks node fill bounds, bbox containment, and uniform leaf depth.
    fn check_node(node: &Node<'_>, is_root: bool) -> usize {
        match node {
            Node::Leaf(entries) => {
                if !is_root {
                    assert!(entries.len() >= MIN_ENTRIES);
                }
                assert!(entries.len() <= MAX_ENTRIES);
                0
            }
            Node::Branch(children) => {
                if !is_root {
                    assert!(children.len() >= MIN_ENTRIES);
                } else {
                    assert!(children.len() >= 2);
                }
                assert!(children.len() <= MAX_ENTRIES);
                let mut depth = None;
                for (bbox, child) in children {
                    let inner = child.bounds();
                    assert!(bbox.min.x <= inner.min.x && bbox.max.x >= inner.max.x);
                    assert!(bbox.min.y <= inner.min.y && bbox.max.y >= inner.max.y);
                    assert!(bbox.min.z <= inner.min.z && bbox.max.z >= inner.max.z);
                    let d = check_node(child, false);
                    assert_eq!(*depth.get_or_insert(d), d, "leaves at differing depths");
                }
                depth.unwrap() + 1
            }
        }
    }

    #[test]
    fn invariants_hold_while_growing() {
        let mut rng = SmallRng::seed_from_u64(7);
        let material = Reflection::light(Vec3::ones());
        let geometries = sphere_grid(300, &mut rng);

        let mut tree = RTree::new();
        for (i, geometry) in geometries.iter().enumerate() {
            tree.insert(
                geometry.bounding_box(),
                Object {
                    geometry,
                    reflection: &material,
                },
            );
            assert_eq!(tree.len(), i + 1);
            check_node(&tree.root, true);
        }
    }

    #[test]
    fn traversal_matches_brute_force() {
        let mut rng = SmallRng::seed_from_u64(42);
        let material = Reflection::light(Vec3::ones());
        let mut geometries = sphere_grid(250, &mut rng);
        geometries.push(Geometry::Plane(Plane::new(
            Point3::new(0.0, -25.0, 0.0),
            Vec3::unit_y(),
        )));
        let tree = build(&geometries, &material);

        for _ in 0..500 {
            let origin = Point3::new(
                rng.gen_range(-30.0..30.0),
                rng.gen_range(-30.0..30.0),
                rng.gen_range(-30.0..30.0),
            );
            let direction = Vec3::new(
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
            );
            if direction.length_squared() < 1e-4 {
                continue;
            }
            let ray = Ray::new(origin, direction.normalized(), 0);

            let brute = geometries
                .iter()
                .filter_map(|g| g.raycast(&ray))
                .min_by(|a, b| a.t.total_cmp(&b.t));
            let traversed = tree.nearest_hit(&ray);

            match (brute, traversed) {
                (None, None) => {}
                (Some(b), Some(t)) => assert!((b.t - t.t).abs() < 1e-5),
                (b, t) => panic!(
                    "tree and brute force disagree: brute = {:?}, tree = {:?}",
                    b.map(|h| h.t),
                    t.map(|h| h.t)
                ),
            }
        }
    }

    #[test]
    fn empty_tree_never_hits() {
        let tree = RTree::new();
        let ray = Ray::new(Point3::zero(), Vec3::unit_z(), 0);
        assert!(tree.nearest_hit(&ray).is_none());
    }

    #[test]
    fn infinite_plane_is_always_reachable() {
        let material = Reflection::light(Vec3::ones());
        let mut rng = SmallRng::seed_from_u64(3);
        let mut geometries = sphere_grid(100, &mut rng);
        geometries.push(Geometry::Plane(Plane::new(
            Point3::new(0.0, -50.0, 0.0),
            Vec3::unit_y(),
        )));
        let tree = build(&geometries, &material);

        // Straight down from far outside every sphere: only the plane is there.
        let ray = Ray::new(Point3::new(500.0, 100.0, 500.0), -Vec3::unit_y(), 0);
        let hit = tree.nearest_hit(&ray).expect("plane must be found");
        assert!((hit.t - 150.0).abs() < 1e-2);
    }
}
