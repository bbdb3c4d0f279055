//! Data records exchanged with the storage layer and the UI.
//!
//! Every record derives Serialize + Deserialize and uses camelCase field
//! names, matching the JSON the placement store hands over.

use serde::{Deserialize, Serialize};

// -- Geometry ------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

// -- Boats ---------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum BoatStatus {
    #[default]
    Unplaced,
    Reserved,
    Placed,
    InService,
}

/// Which storage categories may host a boat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum LocationKind {
    Warehouse,
    Dock,
    #[default]
    Either,
}

impl LocationKind {
    pub fn allows(&self, category: StorageCategory) -> bool {
        match (self, category) {
            (LocationKind::Either, StorageCategory::Warehouse | StorageCategory::Dock) => true,
            (LocationKind::Warehouse, StorageCategory::Warehouse) => true,
            (LocationKind::Dock, StorageCategory::Dock) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Boat {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Hull length in meters.
    pub length: f64,
    /// Hull width (beam) in meters.
    pub width: f64,
    #[serde(default)]
    pub safety_margin: f64,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub status: BoatStatus,
    #[serde(default)]
    pub location_kind: LocationKind,
}

impl Boat {
    pub fn new(id: impl Into<String>, length: f64, width: f64, safety_margin: f64) -> Self {
        Self {
            id: id.into(),
            name: None,
            length,
            width,
            safety_margin,
            rotation: 0.0,
            status: BoatStatus::Unplaced,
            location_kind: LocationKind::Either,
        }
    }
}

// -- Storage -------------------------------------------------------

/// Storage category derived from a unit's raw type string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StorageCategory {
    Warehouse,
    Dock,
    Unknown,
}

/// The raw `kind` of a storage unit. Unrecognized strings are preserved so
/// they survive a round trip through the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StorageKind {
    Warehouse,
    Dock,
    Other(String),
}

impl From<String> for StorageKind {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "warehouse" | "hall" | "hangar" | "indoor" => StorageKind::Warehouse,
            "dock" | "pier" | "pontoon" | "jetty" | "berth" => StorageKind::Dock,
            _ => StorageKind::Other(raw),
        }
    }
}

impl From<StorageKind> for String {
    fn from(kind: StorageKind) -> Self {
        match kind {
            StorageKind::Warehouse => "warehouse".into(),
            StorageKind::Dock => "dock".into(),
            StorageKind::Other(raw) => raw,
        }
    }
}

impl StorageKind {
    pub fn category(&self) -> StorageCategory {
        match self {
            StorageKind::Warehouse => StorageCategory::Warehouse,
            StorageKind::Dock => StorageCategory::Dock,
            StorageKind::Other(_) => StorageCategory::Unknown,
        }
    }
}

/// GeoJSON geometry as stored alongside a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeoJsonGeometry {
    Polygon { coordinates: Vec<Vec<Vec<f64>>> },
    LineString { coordinates: Vec<Vec<f64>> },
}

/// Storage geometry as supplied by the store: WKT text or GeoJSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GeometrySource {
    Wkt(String),
    GeoJson(GeoJsonGeometry),
}

fn default_levels() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageUnit {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub kind: StorageKind,
    pub geometry: GeometrySource,
    #[serde(default = "default_levels")]
    pub levels: u32,
}

// -- Placements ----------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlacementStatus {
    Reserved,
    Placed,
    #[serde(other)]
    Other,
}

impl PlacementStatus {
    /// Rank used when choosing between duplicate placements.
    pub fn rank(&self) -> u8 {
        match self {
            PlacementStatus::Placed => 2,
            PlacementStatus::Reserved => 1,
            PlacementStatus::Other => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub id: String,
    pub boat_id: String,
    pub storage_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    /// Boat center in the storage unit's world frame, meters.
    pub position: Point,
    #[serde(default)]
    pub rotation: f64,
    pub status: PlacementStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physically_placed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserved_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Placement {
    pub fn new(
        id: impl Into<String>,
        boat_id: impl Into<String>,
        storage_id: impl Into<String>,
        position: Point,
        rotation: f64,
        status: PlacementStatus,
    ) -> Self {
        Self {
            id: id.into(),
            boat_id: boat_id.into(),
            storage_id: storage_id.into(),
            level: None,
            position,
            rotation,
            status,
            physically_placed_at: None,
            placed_at: None,
            reserved_at: None,
            updated_at: None,
            created_at: None,
        }
    }

    /// The timestamp that best describes when this placement became current.
    pub fn relevant_timestamp(&self) -> Option<&str> {
        self.physically_placed_at
            .as_deref()
            .or(self.placed_at.as_deref())
            .or(self.reserved_at.as_deref())
            .or(self.updated_at.as_deref())
            .or(self.created_at.as_deref())
    }

    pub fn level_or_ground(&self) -> u32 {
        self.level.unwrap_or(0)
    }
}

// -- Restriction zones ---------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestrictionZone {
    pub id: String,
    pub storage_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    /// Minimum corner.
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

// -- Engine output -------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CollisionResult {
    pub boat_id: String,
    pub hull_collision: bool,
    pub margin_collision: bool,
    pub colliding_boat_ids: Vec<String>,
    pub colliding_zone_ids: Vec<String>,
}

impl CollisionResult {
    pub fn is_clear(&self) -> bool {
        !self.hull_collision && !self.margin_collision
    }
}

/// A proposed, uncommitted position for a boat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub position: Point,
    pub rotation: f64,
    /// Lower is better.
    pub score: f64,
}

// -- Tests ---------------------------------------------------------
