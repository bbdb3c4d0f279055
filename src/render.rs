//! Rendering adapter. Converts the engine's metric model into canvas shapes
//! and back. Nothing in the collision or placement code depends on this
//! module.

use serde::{Deserialize, Serialize};

use crate::geometry::{effective_footprint, hull_footprint, Footprint, Scale};
use crate::storage::StorageArea;
use crate::types::{Boat, CollisionResult, Point, RestrictionZone};

/// A rectangle in canvas units. `x`/`y` is the rotation pivot and
/// `offset_x`/`offset_y` locate that pivot inside the unrotated rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub rotation: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl CanvasRect {
    fn centered(center: Point, footprint: Footprint, rotation: f64, scale: Scale) -> Self {
        let width = scale.to_canvas(footprint.length);
        let height = scale.to_canvas(footprint.width);
        Self {
            x: scale.to_canvas(center.x),
            y: scale.to_canvas(center.y),
            width,
            height,
            rotation,
            offset_x: width / 2.0,
            offset_y: height / 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoatShapes {
    pub hull: CanvasRect,
    pub margin: CanvasRect,
}

pub fn boat_shapes(boat: &Boat, position: Point, rotation: f64, scale: Scale) -> BoatShapes {
    BoatShapes {
        hull: CanvasRect::centered(position, hull_footprint(boat), rotation, scale),
        margin: CanvasRect::centered(position, effective_footprint(boat), rotation, scale),
    }
}

/// Zones are drawn from their minimum corner, unrotated.
pub fn zone_rect(zone: &RestrictionZone, scale: Scale) -> CanvasRect {
    CanvasRect {
        x: scale.to_canvas(zone.x),
        y: scale.to_canvas(zone.y),
        width: scale.to_canvas(zone.width),
        height: scale.to_canvas(zone.height),
        rotation: 0.0,
        offset_x: 0.0,
        offset_y: 0.0,
    }
}

pub fn storage_outline(area: &StorageArea, scale: Scale) -> Vec<Point> {
    area.geometry
        .vertices()
        .iter()
        .map(|p| Point::new(scale.to_canvas(p.x), scale.to_canvas(p.y)))
        .collect()
}

/// A dragged shape's pivot back to a boat center in meters.
pub fn position_from_canvas(x: f64, y: f64, scale: Scale) -> Point {
    Point::new(scale.to_meters(x), scale.to_meters(y))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Normal,
    Warning,
    Critical,
}

impl From<&CollisionResult> for Severity {
    fn from(result: &CollisionResult) -> Self {
        if result.hull_collision {
            Severity::Critical
        } else if result.margin_collision {
            Severity::Warning
        } else {
            Severity::Normal
        }
    }
}
