//! Rectangle-tree spatial index over 2D ground-plane points.
//!
//! Maps entity keys to points plus a small payload, supporting point
//! insert, remove-by-key and window queries. Queries use an axis-aligned
//! box of side `2 * radius`, not a circular distance filter: diagonal hits
//! slightly beyond the circle are included. Sensor logic depends on that
//! footprint, so it is preserved.

use std::collections::HashMap;

use ordered_float::OrderedFloat;
use smallvec::SmallVec;

use crate::entity::Entity;

/// Maximum number of entries (or children) a node holds before splitting.
const MAX_ENTRIES: usize = 8;

/// Full rebuilds are amortized: one rebuild once removals since the last
/// rebuild exceed the live population (and this floor).
const REBUILD_FLOOR: usize = 64;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Rect {
    /// Empty rect; unioning it with anything yields the other operand.
    const EMPTY: Rect = Rect {
        min_x: f32::INFINITY,
        min_y: f32::INFINITY,
        max_x: f32::NEG_INFINITY,
        max_y: f32::NEG_INFINITY,
    };

    fn point(p: [f32; 2]) -> Self {
        Rect {
            min_x: p[0],
            min_y: p[1],
            max_x: p[0],
            max_y: p[1],
        }
    }

    /// Query window of side `2 * radius` centered on a point.
    pub fn around(p: [f32; 2], radius: f32) -> Self {
        Rect {
            min_x: p[0] - radius,
            min_y: p[1] - radius,
            max_x: p[0] + radius,
            max_y: p[1] + radius,
        }
    }

    fn union(self, other: Rect) -> Rect {
        Rect {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    #[inline]
    fn contains_point(&self, p: [f32; 2]) -> bool {
        p[0] >= self.min_x && p[0] <= self.max_x && p[1] >= self.min_y && p[1] <= self.max_y
    }

    #[inline]
    fn intersects(&self, other: &Rect) -> bool {
        !(other.min_x > self.max_x
            || other.max_x < self.min_x
            || other.min_y > self.max_y
            || other.max_y < self.min_y)
    }

    fn area(&self) -> f32 {
        if self.min_x > self.max_x {
            return 0.0;
        }
        (self.max_x - self.min_x) * (self.max_y - self.min_y)
    }

    /// Area growth required to cover the point.
    fn enlargement(&self, p: [f32; 2]) -> f32 {
        self.union(Rect::point(p)).area() - self.area()
    }

    fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    fn center(&self) -> [f32; 2] {
        [
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        ]
    }
}

#[derive(Debug)]
struct SpatialEntry<T> {
    key: Entity,
    point: [f32; 2],
    payload: T,
}

#[derive(Debug)]
enum Node<T> {
    Leaf {
        bounds: Rect,
        entries: SmallVec<[SpatialEntry<T>; MAX_ENTRIES]>,
    },
    Internal {
        bounds: Rect,
        children: SmallVec<[Box<Node<T>>; MAX_ENTRIES]>,
    },
}

impl<T> Node<T> {
    fn empty_leaf() -> Self {
        Node::Leaf {
            bounds: Rect::EMPTY,
            entries: SmallVec::new(),
        }
    }

    fn bounds(&self) -> Rect {
        match self {
            Node::Leaf { bounds, .. } => *bounds,
            Node::Internal { bounds, .. } => *bounds,
        }
    }

    /// Inserts an entry, returning a split-off sibling when the node
    /// overflowed.
    fn insert(&mut self, entry: SpatialEntry<T>) -> Option<Node<T>> {
        match self {
            Node::Leaf { bounds, entries } => {
                *bounds = bounds.union(Rect::point(entry.point));
                entries.push(entry);
                if entries.len() > MAX_ENTRIES {
                    Some(self.split_leaf())
                } else {
                    None
                }
            }
            Node::Internal { bounds, children } => {
                *bounds = bounds.union(Rect::point(entry.point));

                // Descend into the child needing the least area enlargement,
                // breaking ties by smaller area.
                let best = (0..children.len())
                    .min_by_key(|&i| {
                        let b = children[i].bounds();
                        (
                            OrderedFloat(b.enlargement(entry.point)),
                            OrderedFloat(b.area()),
                        )
                    })
                    .expect("internal nodes are never empty");

                if let Some(sibling) = children[best].insert(entry) {
                    children.push(Box::new(sibling));
                }

                if children.len() > MAX_ENTRIES {
                    Some(self.split_internal())
                } else {
                    None
                }
            }
        }
    }

    /// Splits an overflowing leaf along the longest axis at the median,
    /// keeping the lower half in place and returning the upper half.
    fn split_leaf(&mut self) -> Node<T> {
        let Node::Leaf { bounds, entries } = self else {
            unreachable!("split_leaf on internal node");
        };

        let split_x = bounds.width() >= bounds.height();
        entries.sort_by_key(|e| OrderedFloat(if split_x { e.point[0] } else { e.point[1] }));

        let upper: SmallVec<[SpatialEntry<T>; MAX_ENTRIES]> =
            entries.drain(entries.len() / 2..).collect();

        *bounds = entries
            .iter()
            .fold(Rect::EMPTY, |b, e| b.union(Rect::point(e.point)));
        let upper_bounds = upper
            .iter()
            .fold(Rect::EMPTY, |b, e| b.union(Rect::point(e.point)));

        Node::Leaf {
            bounds: upper_bounds,
            entries: upper,
        }
    }

    /// Splits an overflowing internal node by child centers along the
    /// longest axis.
    fn split_internal(&mut self) -> Node<T> {
        let Node::Internal { bounds, children } = self else {
            unreachable!("split_internal on leaf node");
        };

        let split_x = bounds.width() >= bounds.height();
        children.sort_by_key(|c| {
            let center = c.bounds().center();
            OrderedFloat(if split_x { center[0] } else { center[1] })
        });

        let upper: SmallVec<[Box<Node<T>>; MAX_ENTRIES]> =
            children.drain(children.len() / 2..).collect();

        *bounds = children
            .iter()
            .fold(Rect::EMPTY, |b, c| b.union(c.bounds()));
        let upper_bounds = upper.iter().fold(Rect::EMPTY, |b, c| b.union(c.bounds()));

        Node::Internal {
            bounds: upper_bounds,
            children: upper,
        }
    }

    /// Removes the entry for `key`, guided by its recorded point. Parent
    /// bounds are left stale; they only ever over-approximate, so queries
    /// stay correct and compaction happens on rebuild.
    fn remove(&mut self, key: Entity, point: [f32; 2]) -> bool {
        match self {
            Node::Leaf { bounds, entries } => {
                if !bounds.contains_point(point) {
                    return false;
                }
                if let Some(idx) = entries.iter().position(|e| e.key == key) {
                    entries.swap_remove(idx);
                    true
                } else {
                    false
                }
            }
            Node::Internal { children, .. } => {
                for child in children.iter_mut() {
                    if child.bounds().contains_point(point) && child.remove(key, point) {
                        return true;
                    }
                }
                false
            }
        }
    }

    fn query<'a>(&'a self, window: &Rect, found: &mut Vec<(Entity, [f32; 2], &'a T)>) {
        if !self.bounds().intersects(window) {
            return;
        }
        match self {
            Node::Leaf { entries, .. } => {
                for entry in entries {
                    if window.contains_point(entry.point) {
                        found.push((entry.key, entry.point, &entry.payload));
                    }
                }
            }
            Node::Internal { children, .. } => {
                for child in children {
                    child.query(window, found);
                }
            }
        }
    }

    fn drain_into(self, out: &mut Vec<SpatialEntry<T>>) {
        match self {
            Node::Leaf { entries, .. } => out.extend(entries),
            Node::Internal { children, .. } => {
                for child in children {
                    child.drain_into(out);
                }
            }
        }
    }
}

/// Dynamic spatial index keyed by entity. At most one live entry per key;
/// inserting an existing key replaces its entry.
pub struct SpatialIndex<T> {
    root: Node<T>,
    locations: HashMap<Entity, [f32; 2]>,
    removals_since_rebuild: usize,
}

impl<T> Default for SpatialIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SpatialIndex<T> {
    pub fn new() -> Self {
        Self {
            root: Node::empty_leaf(),
            locations: HashMap::new(),
            removals_since_rebuild: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn contains(&self, key: Entity) -> bool {
        self.locations.contains_key(&key)
    }

    pub fn insert(&mut self, key: Entity, point: [f32; 2], payload: T) {
        if self.locations.contains_key(&key) {
            self.remove(key);
        }
        self.locations.insert(key, point);

        let entry = SpatialEntry {
            key,
            point,
            payload,
        };
        if let Some(sibling) = self.root.insert(entry) {
            let old_root = std::mem::replace(&mut self.root, Node::empty_leaf());
            let bounds = old_root.bounds().union(sibling.bounds());
            let mut children: SmallVec<[Box<Node<T>>; MAX_ENTRIES]> = SmallVec::new();
            children.push(Box::new(old_root));
            children.push(Box::new(sibling));
            self.root = Node::Internal { bounds, children };
        }
    }

    pub fn remove(&mut self, key: Entity) -> bool {
        let Some(point) = self.locations.remove(&key) else {
            return false;
        };
        let removed = self.root.remove(key, point);
        if removed {
            self.removals_since_rebuild += 1;
            if self.removals_since_rebuild >= REBUILD_FLOOR.max(self.len()) {
                self.rebuild();
            }
        }
        removed
    }

    /// All entries within the axis-aligned box of side `2 * radius`
    /// centered on the point.
    pub fn query(&self, point: [f32; 2], radius: f32) -> Vec<(Entity, [f32; 2], &T)> {
        let window = Rect::around(point, radius);
        let mut found = Vec::new();
        self.root.query(&window, &mut found);
        found
    }

    /// Rebuilds the tree from scratch; O(n log n), amortized over the
    /// removals that made it necessary.
    fn rebuild(&mut self) {
        let old_root = std::mem::replace(&mut self.root, Node::empty_leaf());
        let mut entries = Vec::with_capacity(self.len());
        old_root.drain_into(&mut entries);
        self.removals_since_rebuild = 0;

        for entry in entries {
            if let Some(sibling) = self.root.insert(entry) {
                let old = std::mem::replace(&mut self.root, Node::empty_leaf());
                let bounds = old.bounds().union(sibling.bounds());
                let mut children: SmallVec<[Box<Node<T>>; MAX_ENTRIES]> = SmallVec::new();
                children.push(Box::new(old));
                children.push(Box::new(sibling));
                self.root = Node::Internal { bounds, children };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(id: u64) -> Entity {
        Entity::new(id, 0)
    }

    #[test]
    fn exact_position_query_returns_entry() {
        let mut index = SpatialIndex::new();
        index.insert(key(1), [3.0, -4.0], "a");

        let hits = index.query([3.0, -4.0], 0.0);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, key(1));
        assert_eq!(*hits[0].2, "a");
    }

    #[test]
    fn removed_keys_are_never_returned() {
        let mut index = SpatialIndex::new();
        index.insert(key(1), [0.0, 0.0], ());
        index.insert(key(2), [1.0, 1.0], ());

        assert!(index.remove(key(1)));
        assert!(!index.remove(key(1)));

        let hits = index.query([0.0, 0.0], 10.0);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, key(2));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn reinsert_replaces_previous_entry() {
        let mut index = SpatialIndex::new();
        index.insert(key(1), [0.0, 0.0], 10);
        index.insert(key(1), [50.0, 50.0], 20);

        assert!(index.query([0.0, 0.0], 1.0).is_empty());
        let hits = index.query([50.0, 50.0], 1.0);
        assert_eq!(hits.len(), 1);
        assert_eq!(*hits[0].2, 20);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn window_is_a_box_not_a_circle() {
        let mut index = SpatialIndex::new();
        // Diagonal point at distance ~7.07, inside the 5-unit box corner.
        index.insert(key(1), [5.0, 5.0], ());
        let hits = index.query([0.0, 0.0], 5.0);
        assert_eq!(hits.len(), 1);

        // Just past the box edge on one axis.
        index.insert(key(2), [5.1, 0.0], ());
        let hits = index.query([0.0, 0.0], 5.0);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn splits_preserve_all_entries() {
        let mut index = SpatialIndex::new();
        for i in 0..200u64 {
            let x = (i % 20) as f32 * 3.0;
            let y = (i / 20) as f32 * 3.0;
            index.insert(key(i), [x, y], i);
        }
        assert_eq!(index.len(), 200);

        // Global window recovers everything.
        let hits = index.query([30.0, 15.0], 100.0);
        assert_eq!(hits.len(), 200);

        // A tight window recovers exactly the local neighborhood.
        let hits = index.query([0.0, 0.0], 3.5);
        let mut keys: Vec<u64> = hits.iter().map(|(k, _, _)| k.id()).collect();
        keys.sort();
        assert_eq!(keys, vec![0, 1, 20, 21]);
    }

    #[test]
    fn survives_heavy_churn() {
        let mut index = SpatialIndex::new();
        for round in 0..10u64 {
            for i in 0..100u64 {
                let id = round * 100 + i;
                index.insert(key(id), [(id % 37) as f32, (id % 53) as f32], ());
            }
            for i in 0..100u64 {
                let id = round * 100 + i;
                if i % 2 == 0 {
                    assert!(index.remove(key(id)));
                }
            }
        }
        assert_eq!(index.len(), 500);

        let hits = index.query([20.0, 26.0], 60.0);
        assert_eq!(hits.len(), 500);
        for (k, _, _) in hits {
            assert!(k.id() % 2 == 1);
        }
    }
}
