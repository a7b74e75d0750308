use serde::{Serialize, Deserialize};
use tracing::debug;
use crate::core::error::{Error, Result};
use crate::spatial::bounds::Bounds;

/// Depth at which leaves stop subdividing. Coincident points would otherwise
/// split forever; a leaf at this depth keeps accepting past capacity.
pub const DEFAULT_MAX_DEPTH: usize = 16;

/// Point stored in a leaf
#[derive(Debug, Clone, Serialize)]
pub struct Point<T> {
    pub x: f64,
    pub y: f64,
    pub payload: T,
    seq: u64,  // insertion order, breaks distance ties
}

impl<T> Point<T> {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        (self.x - x).hypot(self.y - y)
    }
}

/// Radius query hit: the stored point plus its distance to the query centre
#[derive(Debug, Clone, Copy)]
pub struct Neighbor<'a, T> {
    pub point: &'a Point<T>,
    pub distance: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeStats {
    pub total_nodes: usize,
    pub leaf_nodes: usize,
    pub total_points: usize,
    pub max_depth: usize,
}

/// Quadtree node: a leaf holding points, or an internal node owning exactly
/// four children. Never both.
#[derive(Debug)]
pub struct QuadNode<T> {
    bounds: Bounds,
    depth: usize,
    points: Vec<Point<T>>,
    children: Option<Box<[QuadNode<T>; 4]>>,
}

impl<T> QuadNode<T> {
    fn leaf(bounds: Bounds, depth: usize) -> Self {
        QuadNode {
            bounds,
            depth,
            points: Vec::new(),
            children: None,
        }
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    pub fn points(&self) -> &[Point<T>] {
        &self.points
    }

    /// `[top_left, top_right, bottom_left, bottom_right]` once subdivided
    pub fn children(&self) -> Option<&[QuadNode<T>; 4]> {
        self.children.as_deref()
    }

    fn insert(&mut self, point: Point<T>, capacity: usize, max_depth: usize) -> bool {
        if !self.bounds.contains(point.x, point.y) {
            return false;
        }

        if self.children.is_none() {
            if self.points.len() < capacity || self.depth >= max_depth {
                self.points.push(point);
                return true;
            }
            self.subdivide(capacity, max_depth);
        }

        self.insert_into_child(point, capacity, max_depth)
    }

    /// Leaf -> internal. Happens once per node and is never undone.
    fn subdivide(&mut self, capacity: usize, max_depth: usize) {
        let [top_left, top_right, bottom_left, bottom_right] = self.bounds.quadrants();
        let depth = self.depth + 1;
        self.children = Some(Box::new([
            QuadNode::leaf(top_left, depth),
            QuadNode::leaf(top_right, depth),
            QuadNode::leaf(bottom_left, depth),
            QuadNode::leaf(bottom_right, depth),
        ]));

        debug!(
            depth = self.depth,
            points = self.points.len(),
            min_x = self.bounds.min_x,
            min_y = self.bounds.min_y,
            "subdividing quadtree node"
        );

        for point in std::mem::take(&mut self.points) {
            let placed = self.insert_into_child(point, capacity, max_depth);
            debug_assert!(placed, "redistributed point left its parent's bounds");
        }
    }

    fn insert_into_child(&mut self, point: Point<T>, capacity: usize, max_depth: usize) -> bool {
        let index = self.child_index(point.x, point.y);
        match self.children.as_mut() {
            Some(children) => children[index].insert(point, capacity, max_depth),
            None => false,
        }
    }

    fn child_index(&self, x: f64, y: f64) -> usize {
        let (mid_x, mid_y) = self.bounds.center();
        let column = if x < mid_x { 0 } else { 1 };
        let row = if y < mid_y { 0 } else { 2 };
        column + row
    }

    fn collect_range<'a>(&'a self, range: &Bounds, closed: bool, out: &mut Vec<&'a Point<T>>) {
        let overlaps = if closed {
            self.bounds.intersects_closed(range)
        } else {
            self.bounds.intersects(range)
        };
        if !overlaps {
            return;
        }

        match &self.children {
            Some(children) => {
                for child in children.iter() {
                    child.collect_range(range, closed, out);
                }
            }
            None => {
                out.extend(self.points.iter().filter(|p| {
                    if closed {
                        range.contains_closed(p.x, p.y)
                    } else {
                        range.contains(p.x, p.y)
                    }
                }));
            }
        }
    }

    fn collect_all<'a>(&'a self, out: &mut Vec<&'a Point<T>>) {
        match &self.children {
            Some(children) => {
                for child in children.iter() {
                    child.collect_all(out);
                }
            }
            None => out.extend(self.points.iter()),
        }
    }

    fn accumulate(&self, stats: &mut TreeStats) {
        stats.total_nodes += 1;
        stats.max_depth = stats.max_depth.max(self.depth);
        match &self.children {
            Some(children) => {
                for child in children.iter() {
                    child.accumulate(stats);
                }
            }
            None => {
                stats.leaf_nodes += 1;
                stats.total_points += self.points.len();
            }
        }
    }
}

/// Point quadtree over a fixed rectangular world.
///
/// Each node owns its children outright; there are no parent links.
/// Out-of-bounds inserts are rejected with `false`, not an error.
#[derive(Debug)]
pub struct QuadTree<T> {
    root: QuadNode<T>,
    capacity: usize,
    max_depth: usize,
    next_seq: u64,
    len: usize,
}

impl<T> QuadTree<T> {
    pub fn new(bounds: Bounds, capacity: usize) -> Result<Self> {
        Self::with_max_depth(bounds, capacity, DEFAULT_MAX_DEPTH)
    }

    pub fn with_max_depth(bounds: Bounds, capacity: usize, max_depth: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::invalid_argument("quadtree node capacity must be at least 1"));
        }
        if !bounds.has_area() {
            return Err(Error::invalid_argument(format!(
                "quadtree bounds must have a positive finite area, got {:?}",
                bounds
            )));
        }

        Ok(QuadTree {
            root: QuadNode::leaf(bounds, 0),
            capacity,
            max_depth,
            next_seq: 0,
            len: 0,
        })
    }

    pub fn insert(&mut self, x: f64, y: f64, payload: T) -> bool {
        let point = Point {
            x,
            y,
            payload,
            seq: self.next_seq,
        };
        if !self.root.insert(point, self.capacity, self.max_depth) {
            return false;
        }
        self.next_seq += 1;
        self.len += 1;
        true
    }

    /// Points inside `[x, x + width) x [y, y + height)`, in no particular order
    pub fn query_range(&self, x: f64, y: f64, width: f64, height: f64) -> Vec<&Point<T>> {
        let mut found = Vec::new();
        self.root.collect_range(&Bounds::new(x, y, width, height), false, &mut found);
        found
    }

    /// Points within Euclidean distance `radius` of `(cx, cy)`, nearest first.
    /// Equal distances keep insertion order.
    pub fn query_radius(&self, cx: f64, cy: f64, radius: f64) -> Vec<Neighbor<'_, T>> {
        if !(radius >= 0.0) {
            return Vec::new();
        }

        let mut candidates = Vec::new();
        self.root.collect_range(&Bounds::around(cx, cy, radius), true, &mut candidates);

        let mut hits: Vec<Neighbor<'_, T>> = candidates
            .into_iter()
            .map(|point| Neighbor {
                point,
                distance: point.distance_to(cx, cy),
            })
            .filter(|n| n.distance <= radius)
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.point.seq.cmp(&b.point.seq))
        });
        hits
    }

    /// The `k` points closest to `(cx, cy)`, found by doubling a search radius
    pub fn nearest(&self, cx: f64, cy: f64, k: usize) -> Vec<Neighbor<'_, T>> {
        if k == 0 || self.len == 0 || !cx.is_finite() || !cy.is_finite() {
            return Vec::new();
        }

        let bounds = self.root.bounds;
        let reach = [
            (bounds.min_x, bounds.min_y),
            (bounds.min_x, bounds.max_y),
            (bounds.max_x, bounds.min_y),
            (bounds.max_x, bounds.max_y),
        ]
        .iter()
        .map(|&(x, y)| (x - cx).hypot(y - cy))
        .fold(0.0_f64, f64::max);

        let mut radius = (bounds.width().min(bounds.height()) / 64.0).max(f64::MIN_POSITIVE);
        loop {
            let mut hits = self.query_radius(cx, cy, radius);
            if hits.len() >= k || radius >= reach {
                hits.truncate(k);
                return hits;
            }
            radius = (radius * 2.0).min(reach);
        }
    }

    /// Every stored point, in tree order
    pub fn all_points(&self) -> Vec<&Point<T>> {
        let mut points = Vec::with_capacity(self.len);
        self.root.collect_all(&mut points);
        points
    }

    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats::default();
        self.root.accumulate(&mut stats);
        stats
    }

    /// Drop every point and collapse back to a single leaf
    pub fn clear(&mut self) {
        self.root = QuadNode::leaf(self.root.bounds, 0);
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bounds(&self) -> &Bounds {
        &self.root.bounds
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn root(&self) -> &QuadNode<T> {
        &self.root
    }
}
