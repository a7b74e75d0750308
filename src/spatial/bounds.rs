use serde::{Serialize, Deserialize};

/// Axis-aligned rectangle stored as extents.
///
/// Containment is half-open: `min <= v < max` on both axes, so a point on a
/// shared quadrant edge belongs to exactly one quadrant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Bounds {
            min_x: x,
            min_y: y,
            max_x: x + width,
            max_y: y + height,
        }
    }

    pub fn from_extents(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Bounds { min_x, min_y, max_x, max_y }
    }

    /// Square of side `2 * radius` centred on `(cx, cy)`
    pub fn around(cx: f64, cy: f64, radius: f64) -> Self {
        Bounds::new(cx - radius, cy - radius, 2.0 * radius, 2.0 * radius)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> (f64, f64) {
        (
            self.min_x + self.width() / 2.0,
            self.min_y + self.height() / 2.0,
        )
    }

    pub fn has_area(&self) -> bool {
        self.min_x.is_finite()
            && self.min_y.is_finite()
            && self.max_x.is_finite()
            && self.max_y.is_finite()
            && self.max_x > self.min_x
            && self.max_y > self.min_y
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x < self.max_x && y >= self.min_y && y < self.max_y
    }

    /// Closed containment (`min <= v <= max`), used for radius candidates
    pub fn contains_closed(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Separating-axis test for two half-open rectangles
    pub fn intersects(&self, other: &Bounds) -> bool {
        !(other.min_x >= self.max_x
            || other.max_x <= self.min_x
            || other.min_y >= self.max_y
            || other.max_y <= self.min_y)
    }

    /// Separating-axis test treating `other` as closed on its max edges
    pub fn intersects_closed(&self, other: &Bounds) -> bool {
        !(other.min_x >= self.max_x
            || other.max_x < self.min_x
            || other.min_y >= self.max_y
            || other.max_y < self.min_y)
    }

    /// Split into `[top_left, top_right, bottom_left, bottom_right]`.
    /// "Top" is the low-y half. Children share the parent's exact extents
    /// so a point contained by the parent is contained by exactly one child.
    pub fn quadrants(&self) -> [Bounds; 4] {
        let (mid_x, mid_y) = self.center();
        [
            Bounds::from_extents(self.min_x, self.min_y, mid_x, mid_y),
            Bounds::from_extents(mid_x, self.min_y, self.max_x, mid_y),
            Bounds::from_extents(self.min_x, mid_y, mid_x, self.max_y),
            Bounds::from_extents(mid_x, mid_y, self.max_x, self.max_y),
        ]
    }
}
