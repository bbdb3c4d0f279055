//! Storage unit geometry: parsing, bounds, area and capacity.
//!
//! Warehouses are polygons, docks are polylines laid out along the line from
//! their first to their last vertex (a dock drawn as a polygon is accepted
//! and treated by its bounds). Geometry is parsed once at load time
//! and any defect is an error: substituting a default boundary could hide a
//! real out-of-bounds placement.

use crate::config::EngineConfig;
use crate::error::GeometryError;
use crate::geometry::{
    bounding_rect, effective_footprint, normalize_rotation, oriented_corners, polygon_area,
    polygon_contains_quad, sanitized_dimensions, Rect,
};
use crate::types::{Boat, GeoJsonGeometry, GeometrySource, Point, StorageCategory, StorageUnit};

const EPS: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub enum StorageGeometry {
    /// Closed ring without the repeated closing vertex.
    Polygon(Vec<Point>),
    Polyline(Vec<Point>),
}

impl StorageGeometry {
    pub fn vertices(&self) -> &[Point] {
        match self {
            StorageGeometry::Polygon(v) | StorageGeometry::Polyline(v) => v,
        }
    }

    pub fn bounds(&self) -> Rect {
        bounding_rect(self.vertices())
    }

    pub fn area(&self) -> f64 {
        match self {
            StorageGeometry::Polygon(v) => polygon_area(v),
            StorageGeometry::Polyline(_) => 0.0,
        }
    }

    /// Path length of a polyline, perimeter of a polygon.
    pub fn length(&self) -> f64 {
        let v = self.vertices();
        let open: f64 = v.windows(2).map(|w| w[0].distance(&w[1])).sum();
        match self {
            StorageGeometry::Polygon(_) => open + v[v.len() - 1].distance(&v[0]),
            StorageGeometry::Polyline(_) => open,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            StorageGeometry::Polygon(_) => "polygon",
            StorageGeometry::Polyline(_) => "line string",
        }
    }
}

// -- Parsing -------------------------------------------------------

pub fn parse_geometry(storage_id: &str, source: &GeometrySource) -> Result<StorageGeometry, GeometryError> {
    match source {
        GeometrySource::Wkt(text) => parse_wkt(storage_id, text),
        GeometrySource::GeoJson(g) => from_geojson(storage_id, g),
    }
}

fn malformed(storage_id: &str, reason: impl Into<String>) -> GeometryError {
    GeometryError::Malformed {
        storage_id: storage_id.to_string(),
        reason: reason.into(),
    }
}

fn parse_wkt(storage_id: &str, text: &str) -> Result<StorageGeometry, GeometryError> {
    let mut text = text.trim();
    // EWKT as returned by PostGIS: "SRID=4326;POLYGON(...)".
    if text.get(..5).is_some_and(|p| p.eq_ignore_ascii_case("SRID=")) {
        text = match text.split_once(';') {
            Some((_, rest)) => rest.trim(),
            None => return Err(malformed(storage_id, "SRID prefix without geometry")),
        };
    }
    if text.is_empty() {
        return Err(GeometryError::Empty {
            storage_id: storage_id.to_string(),
        });
    }
    let (head, body) = match text.find('(') {
        Some(i) => (text[..i].trim(), text[i..].trim()),
        None => {
            if text.to_ascii_uppercase().ends_with("EMPTY") {
                return Err(GeometryError::Empty {
                    storage_id: storage_id.to_string(),
                });
            }
            return Err(malformed(storage_id, "missing coordinate list"));
        }
    };
    let kind = head.to_ascii_uppercase();
    let inner = strip_parens(body).ok_or_else(|| malformed(storage_id, "unbalanced parentheses"))?;
    match kind.as_str() {
        "POLYGON" => {
            let rings = split_rings(inner).ok_or_else(|| malformed(storage_id, "unbalanced parentheses"))?;
            match rings.len() {
                0 => Err(GeometryError::Empty {
                    storage_id: storage_id.to_string(),
                }),
                1 => {
                    let points = parse_wkt_points(storage_id, rings[0])?;
                    normalize_polygon(storage_id, points)
                }
                _ => Err(malformed(storage_id, "polygons with holes are not supported")),
            }
        }
        "LINESTRING" => {
            let points = parse_wkt_points(storage_id, inner)?;
            normalize_polyline(storage_id, points)
        }
        _ => Err(GeometryError::UnsupportedType {
            storage_id: storage_id.to_string(),
            kind: head.to_string(),
        }),
    }
}

/// Remove one level of enclosing parentheses.
fn strip_parens(s: &str) -> Option<&str> {
    let s = s.trim();
    let inner = s.strip_prefix('(')?.strip_suffix(')')?;
    let mut depth = 0i32;
    for c in inner.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
            }
            _ => {}
        }
    }
    (depth == 0).then_some(inner)
}

/// Split "(a), (b)" into ["a", "b"].
fn split_rings(s: &str) -> Option<Vec<&str>> {
    let mut rings = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '(' => {
                if depth == 0 {
                    start = i + 1;
                }
                depth += 1;
            }
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
                if depth == 0 {
                    rings.push(&s[start..i]);
                }
            }
            ',' | ' ' | '\t' | '\n' | '\r' if depth == 0 => {}
            _ if depth == 0 => return None,
            _ => {}
        }
    }
    (depth == 0).then_some(rings)
}

fn parse_number(storage_id: &str, raw: &str) -> Result<f64, GeometryError> {
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(GeometryError::BadCoordinate {
            storage_id: storage_id.to_string(),
            value: raw.to_string(),
        }),
    }
}

fn parse_wkt_points(storage_id: &str, list: &str) -> Result<Vec<Point>, GeometryError> {
    let mut points = Vec::new();
    for pair in list.split(',') {
        let parts: Vec<&str> = pair.split_whitespace().collect();
        if parts.len() != 2 {
            return Err(malformed(
                storage_id,
                format!("expected `x y`, found `{}`", pair.trim()),
            ));
        }
        points.push(Point::new(
            parse_number(storage_id, parts[0])?,
            parse_number(storage_id, parts[1])?,
        ));
    }
    Ok(points)
}

fn geojson_points(storage_id: &str, coords: &[Vec<f64>]) -> Result<Vec<Point>, GeometryError> {
    coords
        .iter()
        .map(|c| {
            if c.len() < 2 {
                return Err(malformed(storage_id, "position with fewer than 2 numbers"));
            }
            for v in &c[..2] {
                if !v.is_finite() {
                    return Err(GeometryError::BadCoordinate {
                        storage_id: storage_id.to_string(),
                        value: v.to_string(),
                    });
                }
            }
            Ok(Point::new(c[0], c[1]))
        })
        .collect()
}

fn from_geojson(storage_id: &str, g: &GeoJsonGeometry) -> Result<StorageGeometry, GeometryError> {
    match g {
        GeoJsonGeometry::Polygon { coordinates } => match coordinates.len() {
            0 => Err(GeometryError::Empty {
                storage_id: storage_id.to_string(),
            }),
            1 => normalize_polygon(storage_id, geojson_points(storage_id, &coordinates[0])?),
            _ => Err(malformed(storage_id, "polygons with holes are not supported")),
        },
        GeoJsonGeometry::LineString { coordinates } => {
            normalize_polyline(storage_id, geojson_points(storage_id, coordinates)?)
        }
    }
}

fn dedup_consecutive(mut points: Vec<Point>) -> Vec<Point> {
    points.dedup_by(|a, b| a.distance(b) <= EPS);
    points
}

fn normalize_polygon(storage_id: &str, points: Vec<Point>) -> Result<StorageGeometry, GeometryError> {
    let mut points = dedup_consecutive(points);
    if points.len() > 1 && points[0].distance(&points[points.len() - 1]) <= EPS {
        points.pop();
    }
    if points.len() < 3 {
        return Err(GeometryError::TooFewPoints {
            storage_id: storage_id.to_string(),
            kind: "polygon",
            needed: 3,
            got: points.len(),
        });
    }
    if polygon_area(&points) <= EPS {
        return Err(GeometryError::Degenerate {
            storage_id: storage_id.to_string(),
            kind: "polygon",
            measure: "area",
        });
    }
    Ok(StorageGeometry::Polygon(points))
}

fn normalize_polyline(storage_id: &str, points: Vec<Point>) -> Result<StorageGeometry, GeometryError> {
    let points = dedup_consecutive(points);
    if points.len() < 2 {
        return Err(GeometryError::TooFewPoints {
            storage_id: storage_id.to_string(),
            kind: "line string",
            needed: 2,
            got: points.len(),
        });
    }
    let geometry = StorageGeometry::Polyline(points);
    if geometry.length() <= EPS {
        return Err(GeometryError::Degenerate {
            storage_id: storage_id.to_string(),
            kind: "line string",
            measure: "length",
        });
    }
    Ok(geometry)
}

// -- Dock frame ----------------------------------------------------

/// Frame along a dock. `along` runs from the first vertex of the dock line
/// towards its last, `cross` is the signed distance from the line, negative
/// on the left of the walking direction (the top side for a dock drawn left
/// to right). A bent dock is approximated by the chord between its ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DockAxis {
    pub origin: Point,
    /// Unit vector from the dock start towards its end.
    pub direction: (f64, f64),
    span: f64,
}

impl DockAxis {
    pub fn from_polyline(vertices: &[Point]) -> Self {
        match (vertices.first(), vertices.last()) {
            (Some(&first), Some(&last)) if first.distance(&last) > EPS => {
                let span = first.distance(&last);
                DockAxis {
                    origin: first,
                    direction: ((last.x - first.x) / span, (last.y - first.y) / span),
                    span,
                }
            }
            _ => DockAxis::from_bounds(&bounding_rect(vertices)),
        }
    }

    /// Frame along the longer side of `bounds`, through its middle.
    pub fn from_bounds(bounds: &Rect) -> Self {
        let center = bounds.center();
        if bounds.width() >= bounds.height() {
            DockAxis {
                origin: Point::new(bounds.left, center.y),
                direction: (1.0, 0.0),
                span: bounds.width(),
            }
        } else {
            DockAxis {
                origin: Point::new(center.x, bounds.top),
                direction: (0.0, 1.0),
                span: bounds.height(),
            }
        }
    }

    pub fn length(&self) -> f64 {
        self.span
    }

    /// World point at distance `along` from the dock start, offset `cross`
    /// from the line.
    pub fn to_world(&self, along: f64, cross: f64) -> Point {
        let (ux, uy) = self.direction;
        Point::new(
            self.origin.x + ux * along - uy * cross,
            self.origin.y + uy * along + ux * cross,
        )
    }

    /// Rotation of the dock axis itself.
    pub fn base_rotation(&self) -> f64 {
        let (ux, uy) = self.direction;
        let degrees = uy.atan2(ux).to_degrees();
        let snapped = degrees.round();
        if (degrees - snapped).abs() < 1e-9 {
            normalize_rotation(snapped)
        } else {
            normalize_rotation(degrees)
        }
    }

    /// Axis-aligned bounds of the water band `depth` deep on both sides.
    pub fn band_bounds(&self, depth: f64) -> Rect {
        let mid = self.to_world(self.span / 2.0, 0.0);
        bounding_rect(&oriented_corners(mid, self.span, 2.0 * depth, self.base_rotation()))
    }
}

// -- Storage areas -------------------------------------------------

/// A storage unit with its geometry parsed and classified.
#[derive(Debug, Clone)]
pub struct StorageArea {
    pub id: String,
    pub category: StorageCategory,
    pub levels: u32,
    pub geometry: StorageGeometry,
}

impl StorageArea {
    pub fn from_unit(unit: &StorageUnit) -> Result<Self, GeometryError> {
        let geometry = parse_geometry(&unit.id, &unit.geometry)?;
        let category = unit.kind.category();
        if category == StorageCategory::Warehouse {
            if let StorageGeometry::Polyline(_) = geometry {
                return Err(GeometryError::KindMismatch {
                    storage_id: unit.id.clone(),
                    expected: "warehouse",
                    found: geometry.type_name(),
                });
            }
        }
        Ok(Self {
            id: unit.id.clone(),
            category,
            levels: unit.levels.max(1),
            geometry,
        })
    }

    pub fn bounds(&self) -> Rect {
        self.geometry.bounds()
    }

    pub fn dock_axis(&self) -> DockAxis {
        match &self.geometry {
            StorageGeometry::Polyline(vertices) => DockAxis::from_polyline(vertices),
            StorageGeometry::Polygon(_) => DockAxis::from_bounds(&self.bounds()),
        }
    }

    /// Rectangle a placement's footprint must stay inside.
    pub fn placement_bounds(&self, config: &EngineConfig) -> Rect {
        match self.category {
            StorageCategory::Dock => self.dock_axis().band_bounds(config.dock_berth_depth),
            _ => self.bounds(),
        }
    }

    /// True if every corner lies within the placement bounds and, for
    /// polygonal warehouses, inside the polygon.
    pub fn contains_corners(&self, corners: &[Point], config: &EngineConfig) -> bool {
        let bounds = self.placement_bounds(config);
        if !bounds.contains_rect(&bounding_rect(corners)) {
            return false;
        }
        match (&self.geometry, self.category) {
            (StorageGeometry::Polygon(ring), StorageCategory::Warehouse) => {
                polygon_contains_quad(ring, corners)
            }
            _ => true,
        }
    }

    /// Rough number of boats shaped like `reference` the unit can hold.
    pub fn capacity(&self, reference: &Boat, config: &EngineConfig) -> u32 {
        match self.category {
            StorageCategory::Dock => {
                let (_, width, margin) = sanitized_dimensions(reference);
                let usable = self.dock_axis().length() - 2.0 * config.dock_end_margin;
                if usable <= 0.0 {
                    return 0;
                }
                let slot = config.dock_step.max(width + margin);
                2 * (usable / slot).floor() as u32
            }
            _ => {
                let footprint = effective_footprint(reference).area();
                let floor = self.geometry.area() * self.levels as f64 * config.packing_efficiency;
                (floor / footprint).floor() as u32
            }
        }
    }
}
