//! Footprints, rotated extents and the small set of 2D primitives shared by
//! collision, search and packing.
//!
//! Everything here works in meters. A rotation of 0 degrees puts the boat's
//! length along +x; rectangles use canvas orientation (y grows downwards, so
//! `top` is the smaller y).

use crate::types::{Boat, Point};

/// Hull used when a boat record carries unusable dimensions.
pub const DEFAULT_HULL_LENGTH: f64 = 6.0;
pub const DEFAULT_HULL_WIDTH: f64 = 2.5;

const EPS: f64 = 1e-9;

pub type Corners = [Point; 4];

// -- Footprints ----------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Footprint {
    pub length: f64,
    pub width: f64,
}

impl Footprint {
    pub fn area(&self) -> f64 {
        self.length * self.width
    }
}

/// Hull dimensions and margin of a boat, falling back to conservative
/// defaults when the record is unusable. Bad boat data is locally visible
/// and small, unlike storage geometry, so it is not an error.
pub fn sanitized_dimensions(boat: &Boat) -> (f64, f64, f64) {
    let length = if boat.length.is_finite() && boat.length > 0.0 {
        boat.length
    } else {
        log::warn!(
            "boat {}: invalid length {}, using {DEFAULT_HULL_LENGTH} m",
            boat.id,
            boat.length
        );
        DEFAULT_HULL_LENGTH
    };
    let width = if boat.width.is_finite() && boat.width > 0.0 {
        boat.width
    } else {
        log::warn!(
            "boat {}: invalid width {}, using {DEFAULT_HULL_WIDTH} m",
            boat.id,
            boat.width
        );
        DEFAULT_HULL_WIDTH
    };
    let margin = if boat.safety_margin.is_finite() && boat.safety_margin >= 0.0 {
        boat.safety_margin
    } else {
        log::warn!(
            "boat {}: invalid safety margin {}, using 0",
            boat.id,
            boat.safety_margin
        );
        0.0
    };
    (length, width, margin)
}

pub fn hull_footprint(boat: &Boat) -> Footprint {
    let (length, width, _) = sanitized_dimensions(boat);
    Footprint { length, width }
}

/// Hull expanded by the safety margin on every side.
pub fn effective_footprint(boat: &Boat) -> Footprint {
    let (length, width, margin) = sanitized_dimensions(boat);
    Footprint {
        length: length + 2.0 * margin,
        width: width + 2.0 * margin,
    }
}

// -- Rotation ------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HalfExtents {
    pub dx: f64,
    pub dy: f64,
}

/// Half-size of the axis-aligned box around a `length` x `width` rectangle
/// rotated by `rotation_deg` about its center.
pub fn axis_aligned_half_extents(length: f64, width: f64, rotation_deg: f64) -> HalfExtents {
    let theta = rotation_deg.to_radians();
    let (sin, cos) = (theta.sin().abs(), theta.cos().abs());
    HalfExtents {
        dx: cos * length / 2.0 + sin * width / 2.0,
        dy: sin * length / 2.0 + cos * width / 2.0,
    }
}

/// Map any angle into `[0, 360)`.
pub fn normalize_rotation(deg: f64) -> f64 {
    let r = deg.rem_euclid(360.0);
    // rem_euclid can return 360.0 for tiny negative inputs.
    if r >= 360.0 - EPS {
        0.0
    } else {
        r
    }
}

// -- Unit conversion -----------------------------------------------

/// Fixed meters to canvas-units factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scale {
    pub pixels_per_meter: f64,
}

impl Scale {
    pub fn new(pixels_per_meter: f64) -> Self {
        Self { pixels_per_meter }
    }

    pub fn to_canvas(&self, meters: f64) -> f64 {
        meters * self.pixels_per_meter
    }

    pub fn to_meters(&self, canvas: f64) -> f64 {
        canvas / self.pixels_per_meter
    }
}

// -- Rectangles ----------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self { left, top, right, bottom }
    }

    pub fn from_origin_size(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    pub fn from_center(center: Point, half: HalfExtents) -> Self {
        Self::new(
            center.x - half.dx,
            center.y - half.dy,
            center.x + half.dx,
            center.y + half.dy,
        )
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn area(&self) -> f64 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    pub fn center(&self) -> Point {
        Point::new((self.left + self.right) / 2.0, (self.top + self.bottom) / 2.0)
    }

    /// Bounding-box overlap. Touching edges count as overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        !(self.right < other.left
            || other.right < self.left
            || self.bottom < other.top
            || other.bottom < self.top)
    }

    /// True if `other` lies inside (or on the edge of) `self`.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.left >= self.left - EPS
            && other.right <= self.right + EPS
            && other.top >= self.top - EPS
            && other.bottom <= self.bottom + EPS
    }

    pub fn corners(&self) -> Corners {
        [
            Point::new(self.left, self.top),
            Point::new(self.right, self.top),
            Point::new(self.right, self.bottom),
            Point::new(self.left, self.bottom),
        ]
    }

    pub fn expand(&self, dx: f64, dy: f64) -> Rect {
        Rect::new(self.left - dx, self.top - dy, self.right + dx, self.bottom + dy)
    }
}

// -- Oriented rectangles -------------------------------------------

/// Corners of a `length` x `width` rectangle centered on `center` and
/// rotated by `rotation_deg`.
pub fn oriented_corners(center: Point, length: f64, width: f64, rotation_deg: f64) -> Corners {
    let rot = rotation_deg.to_radians();
    let (sin_r, cos_r) = rot.sin_cos();
    let (half_l, half_w) = (length / 2.0, width / 2.0);
    const SIGNS: [(f64, f64); 4] = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];
    let mut corners = [Point::default(); 4];
    for (i, &(sl, sw)) in SIGNS.iter().enumerate() {
        let lx = sl * half_l;
        let ly = sw * half_w;
        corners[i] = Point::new(
            center.x + lx * cos_r - ly * sin_r,
            center.y + lx * sin_r + ly * cos_r,
        );
    }
    corners
}

pub fn bounding_rect(points: &[Point]) -> Rect {
    let mut rect = Rect::new(
        f64::INFINITY,
        f64::INFINITY,
        f64::NEG_INFINITY,
        f64::NEG_INFINITY,
    );
    for p in points {
        rect.left = rect.left.min(p.x);
        rect.top = rect.top.min(p.y);
        rect.right = rect.right.max(p.x);
        rect.bottom = rect.bottom.max(p.y);
    }
    rect
}

// -- Polygons ------------------------------------------------------

/// Shoelace area, positive regardless of winding order.
pub fn polygon_area(vertices: &[Point]) -> f64 {
    let n = vertices.len();
    if n < 3 {
        return 0.0;
    }
    let mut area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        area += vertices[i].x * vertices[j].y;
        area -= vertices[j].x * vertices[i].y;
    }
    area.abs() / 2.0
}

/// Even-odd ray-casting point-in-polygon test.
pub fn point_in_polygon(p: Point, vertices: &[Point]) -> bool {
    let n = vertices.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (vi, vj) = (vertices[i], vertices[j]);
        if (vi.y > p.y) != (vj.y > p.y) {
            let intersect_x = (vj.x - vi.x) * (p.y - vi.y) / (vj.y - vi.y) + vi.x;
            if p.x < intersect_x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

fn point_on_segment(p: Point, a: Point, b: Point, tolerance: f64) -> bool {
    let (abx, aby) = (b.x - a.x, b.y - a.y);
    let len_sq = abx * abx + aby * aby;
    if len_sq <= EPS {
        return p.distance(&a) <= tolerance;
    }
    let t = (((p.x - a.x) * abx + (p.y - a.y) * aby) / len_sq).clamp(0.0, 1.0);
    let closest = Point::new(a.x + t * abx, a.y + t * aby);
    p.distance(&closest) <= tolerance
}

/// Point inside the polygon or on its boundary.
pub fn polygon_contains_point(p: Point, vertices: &[Point]) -> bool {
    if point_in_polygon(p, vertices) {
        return true;
    }
    let n = vertices.len();
    (0..n).any(|i| point_on_segment(p, vertices[i], vertices[(i + 1) % n], 1e-7))
}

/// Vertex-containment overlap: some vertex of `a` lies in `b` or some vertex
/// of `b` lies in `a`. Two shapes crossing without either containing a
/// vertex of the other are not detected.
pub fn polygons_overlap_by_vertices(a: &[Point], b: &[Point]) -> bool {
    a.iter().any(|&p| point_in_polygon(p, b)) || b.iter().any(|&p| point_in_polygon(p, a))
}

fn orient(a: Point, b: Point, c: Point) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn strictly_opposite(u: f64, v: f64) -> bool {
    (u > EPS && v < -EPS) || (u < -EPS && v > EPS)
}

/// Segments `a-b` and `c-d` cross at a single interior point. Touching and
/// collinear overlap do not count.
pub fn segments_cross(a: Point, b: Point, c: Point, d: Point) -> bool {
    strictly_opposite(orient(c, d, a), orient(c, d, b))
        && strictly_opposite(orient(a, b, c), orient(a, b, d))
}

/// `p` lies in the interior of a convex polygon given in either winding.
pub fn convex_strictly_contains(corners: &[Point], p: Point) -> bool {
    let n = corners.len();
    if n < 3 {
        return false;
    }
    let sides: Vec<f64> = (0..n)
        .map(|i| orient(corners[i], corners[(i + 1) % n], p))
        .collect();
    sides.iter().all(|&s| s > EPS) || sides.iter().all(|&s| s < -EPS)
}

/// The convex quad `corners` lies within the polygon `ring`. Besides corner
/// containment, no ring vertex may sit inside the quad and no ring edge may
/// cut through it, which rejects a quad bridging a concave notch. Shared
/// boundaries are allowed.
pub fn polygon_contains_quad(ring: &[Point], corners: &[Point]) -> bool {
    if !corners.iter().all(|&c| polygon_contains_point(c, ring)) {
        return false;
    }
    if ring.iter().any(|&v| convex_strictly_contains(corners, v)) {
        return false;
    }
    let (n, m) = (ring.len(), corners.len());
    !(0..n).any(|i| {
        let (r0, r1) = (ring[i], ring[(i + 1) % n]);
        (0..m).any(|j| segments_cross(r0, r1, corners[j], corners[(j + 1) % m]))
    })
}
