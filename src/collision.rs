//! Hull and safety-margin collision detection.
//!
//! A `CollisionEngine` holds the boats and restriction zones of one storage
//! unit level. Hull overlaps (boat/boat or boat/zone) are fatal, margin-only
//! overlaps are warnings. Results are always recomputed from the registry;
//! nothing is cached between calls.
//!
//! The precise test checks vertex containment in both directions on the
//! rotated rectangles. It does not detect two rectangles crossing like a
//! plus sign with no vertex inside the other shape. Zones are always tested
//! against the boat's bounding boxes, whatever the precision, so a boat
//! lying across a narrow strip zone is still caught.

use std::collections::{BTreeMap, HashMap};

use crate::config::CollisionPrecision;
use crate::geometry::{
    bounding_rect, oriented_corners, polygons_overlap_by_vertices, sanitized_dimensions, Corners,
    Rect,
};
use crate::types::{Boat, CollisionResult, Placement, Point, RestrictionZone};

/// Geometric model of a boat at a position. Dimensions are meters.
#[derive(Debug, Clone, PartialEq)]
pub struct BoatBody {
    pub id: String,
    pub length: f64,
    pub width: f64,
    pub margin: f64,
    pub position: Point,
    pub rotation: f64,
}

impl BoatBody {
    pub fn from_boat(boat: &Boat, position: Point, rotation: f64) -> Self {
        let (length, width, margin) = sanitized_dimensions(boat);
        Self {
            id: boat.id.clone(),
            length,
            width,
            margin,
            position,
            rotation,
        }
    }

    pub fn hull_corners(&self) -> Corners {
        oriented_corners(self.position, self.length, self.width, self.rotation)
    }

    pub fn margin_corners(&self) -> Corners {
        oriented_corners(
            self.position,
            self.length + 2.0 * self.margin,
            self.width + 2.0 * self.margin,
            self.rotation,
        )
    }

    pub fn hull_rect(&self) -> Rect {
        bounding_rect(&self.hull_corners())
    }

    pub fn margin_rect(&self) -> Rect {
        bounding_rect(&self.margin_corners())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZoneBody {
    pub id: String,
    pub rect: Rect,
}

impl From<&RestrictionZone> for ZoneBody {
    fn from(zone: &RestrictionZone) -> Self {
        Self {
            id: zone.id.clone(),
            rect: Rect::from_origin_size(zone.x, zone.y, zone.width, zone.height),
        }
    }
}

/// Overlap of two convex quads under the given precision.
pub fn shapes_overlap(a: &Corners, b: &Corners, precision: CollisionPrecision) -> bool {
    if !bounding_rect(a).overlaps(&bounding_rect(b)) {
        return false;
    }
    match precision {
        CollisionPrecision::BoundingBox => true,
        CollisionPrecision::Polygon => polygons_overlap_by_vertices(a, b),
    }
}

/// Boat and zone registry for one storage unit level.
#[derive(Debug, Clone, Default)]
pub struct CollisionEngine {
    precision: CollisionPrecision,
    boats: BTreeMap<String, BoatBody>,
    zones: BTreeMap<String, ZoneBody>,
}

impl CollisionEngine {
    pub fn new(precision: CollisionPrecision) -> Self {
        Self {
            precision,
            boats: BTreeMap::new(),
            zones: BTreeMap::new(),
        }
    }

    /// Build an engine for the placements of `storage_id` on `level`.
    /// Placements whose boat is not in `boats` are skipped.
    pub fn from_records(
        storage_id: &str,
        level: u32,
        boats: &[Boat],
        placements: &[Placement],
        zones: &[RestrictionZone],
        precision: CollisionPrecision,
    ) -> Self {
        let boats_by_id: HashMap<&str, &Boat> = boats.iter().map(|b| (b.id.as_str(), b)).collect();
        let mut engine = Self::new(precision);
        for p in placements
            .iter()
            .filter(|p| p.storage_id == storage_id && p.level_or_ground() == level)
        {
            match boats_by_id.get(p.boat_id.as_str()) {
                Some(boat) => {
                    engine.register_boat(BoatBody::from_boat(boat, p.position, p.rotation));
                }
                None => log::warn!(
                    "placement {} references unknown boat {}, ignored for collisions",
                    p.id,
                    p.boat_id
                ),
            }
        }
        for zone in zones
            .iter()
            .filter(|z| z.storage_id == storage_id && z.level.unwrap_or(0) == level)
        {
            engine.register_zone(ZoneBody::from(zone));
        }
        engine
    }

    pub fn precision(&self) -> CollisionPrecision {
        self.precision
    }

    /// Insert or replace a boat. Returns the previous body for that id.
    pub fn register_boat(&mut self, body: BoatBody) -> Option<BoatBody> {
        self.boats.insert(body.id.clone(), body)
    }

    pub fn unregister_boat(&mut self, id: &str) -> Option<BoatBody> {
        self.boats.remove(id)
    }

    pub fn register_zone(&mut self, zone: ZoneBody) -> Option<ZoneBody> {
        self.zones.insert(zone.id.clone(), zone)
    }

    pub fn unregister_zone(&mut self, id: &str) -> Option<ZoneBody> {
        self.zones.remove(id)
    }

    pub fn boat(&self, id: &str) -> Option<&BoatBody> {
        self.boats.get(id)
    }

    pub fn boats(&self) -> impl Iterator<Item = &BoatBody> {
        self.boats.values()
    }

    pub fn zones(&self) -> impl Iterator<Item = &ZoneBody> {
        self.zones.values()
    }

    pub fn len(&self) -> usize {
        self.boats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boats.is_empty()
    }

    /// Collisions of a body against every other registered boat and every
    /// zone. A registered boat with the same id is ignored, so this also
    /// evaluates a prospective move of a registered boat.
    pub fn check_candidate(&self, body: &BoatBody) -> CollisionResult {
        let hull = body.hull_corners();
        let margin = body.margin_corners();
        let mut result = CollisionResult {
            boat_id: body.id.clone(),
            ..CollisionResult::default()
        };
        for other in self.boats.values().filter(|o| o.id != body.id) {
            if shapes_overlap(&hull, &other.hull_corners(), self.precision) {
                result.hull_collision = true;
                result.colliding_boat_ids.push(other.id.clone());
            } else if shapes_overlap(&margin, &other.margin_corners(), self.precision) {
                result.margin_collision = true;
                result.colliding_boat_ids.push(other.id.clone());
            }
        }
        let (hull_rect, margin_rect) = (body.hull_rect(), body.margin_rect());
        for zone in self.zones.values() {
            if hull_rect.overlaps(&zone.rect) {
                result.hull_collision = true;
                result.colliding_zone_ids.push(zone.id.clone());
            } else if margin_rect.overlaps(&zone.rect) {
                result.margin_collision = true;
                result.colliding_zone_ids.push(zone.id.clone());
            }
        }
        result
    }

    pub fn check_boat(&self, id: &str) -> Option<CollisionResult> {
        self.boats.get(id).map(|body| self.check_candidate(body))
    }

    /// Results for every registered boat, ordered by boat id.
    pub fn recompute_all(&self) -> Vec<CollisionResult> {
        self.boats.values().map(|b| self.check_candidate(b)).collect()
    }

    /// Move a boat and recompute every boat in the unit, since the move can
    /// both create and clear collisions for stationary neighbours.
    pub fn on_position_changed(
        &mut self,
        id: &str,
        position: Point,
        rotation: f64,
    ) -> Vec<CollisionResult> {
        match self.boats.get_mut(id) {
            Some(body) => {
                body.position = position;
                body.rotation = rotation;
            }
            None => {
                log::warn!("position change for unregistered boat {id}");
                return Vec::new();
            }
        }
        self.recompute_all()
    }
}
