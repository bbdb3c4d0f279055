//! Placement maintenance: bounds clamping, rotation toggling, re-layout of a
//! unit and restriction-zone pruning.
//!
//! Each bulk operation is a deterministic transform over records. Running one
//! twice on its own output changes nothing further, except rotation toggling,
//! which is an involution for a 180 degree delta.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::collision::{BoatBody, CollisionEngine, ZoneBody};
use crate::config::EngineConfig;
use crate::error::BatchError;
use crate::geometry::{
    axis_aligned_half_extents, effective_footprint, normalize_rotation, Footprint, Rect,
    DEFAULT_HULL_LENGTH, DEFAULT_HULL_WIDTH,
};
use crate::packing::{distribute_dock, pack_warehouse, PackingOutcome};
use crate::storage::StorageArea;
use crate::types::{Boat, Placement, Point, RestrictionZone, StorageCategory};

// -- Clamping ------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClampKind {
    /// Already inside the bounds.
    Unchanged,
    /// Moved into the bounds.
    Clamped,
    /// The boat is larger than the unit on at least one axis and was put
    /// on the midpoint of that axis. Indicates bad input data.
    Degenerate,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClampOutcome {
    pub position: Point,
    pub kind: ClampKind,
}

fn clamp_axis(value: f64, lo: f64, hi: f64, half: f64) -> (f64, bool) {
    let (min, max) = (lo + half, hi - half);
    if min > max {
        ((lo + hi) / 2.0, true)
    } else {
        (value.clamp(min, max), false)
    }
}

/// Clamp a center so the rotated footprint stays inside `bounds`.
pub fn clamp_to_bounds(
    position: Point,
    footprint: Footprint,
    rotation: f64,
    bounds: &Rect,
) -> ClampOutcome {
    let half = axis_aligned_half_extents(footprint.length, footprint.width, rotation);
    let (x, degenerate_x) = clamp_axis(position.x, bounds.left, bounds.right, half.dx);
    let (y, degenerate_y) = clamp_axis(position.y, bounds.top, bounds.bottom, half.dy);
    let clamped = Point::new(x, y);
    let kind = if degenerate_x || degenerate_y {
        ClampKind::Degenerate
    } else if clamped != position {
        ClampKind::Clamped
    } else {
        ClampKind::Unchanged
    };
    ClampOutcome {
        position: clamped,
        kind,
    }
}

/// Clamp one placement into its unit, using the boat's margin footprint.
pub fn clamp_placement(
    placement: &Placement,
    boat: &Boat,
    area: &StorageArea,
    config: &EngineConfig,
) -> ClampOutcome {
    let outcome = clamp_to_bounds(
        placement.position,
        effective_footprint(boat),
        placement.rotation,
        &area.placement_bounds(config),
    );
    if outcome.kind == ClampKind::Degenerate {
        log::warn!(
            "placement {}: boat {} does not fit storage {}, centered as a fallback",
            placement.id,
            boat.id,
            area.id
        );
    }
    outcome
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClampReport {
    pub clamped: Vec<String>,
    pub degenerate: Vec<String>,
}

/// Clamp every placement whose boat and unit are known. Others pass
/// through untouched.
pub fn clamp_placements(
    boats: &[Boat],
    areas: &[StorageArea],
    placements: &[Placement],
    config: &EngineConfig,
) -> (Vec<Placement>, ClampReport) {
    let boats_by_id: HashMap<&str, &Boat> = boats.iter().map(|b| (b.id.as_str(), b)).collect();
    let areas_by_id: HashMap<&str, &StorageArea> = areas.iter().map(|a| (a.id.as_str(), a)).collect();
    let mut report = ClampReport::default();
    let out = placements
        .iter()
        .map(|p| {
            let mut p = p.clone();
            if let (Some(boat), Some(area)) = (
                boats_by_id.get(p.boat_id.as_str()),
                areas_by_id.get(p.storage_id.as_str()),
            ) {
                let outcome = clamp_placement(&p, boat, area, config);
                match outcome.kind {
                    ClampKind::Unchanged => {}
                    ClampKind::Clamped => report.clamped.push(p.id.clone()),
                    ClampKind::Degenerate => report.degenerate.push(p.id.clone()),
                }
                p.position = outcome.position;
            }
            p
        })
        .collect();
    (out, report)
}

// -- Rotation ------------------------------------------------------

/// Rotate by `delta` degrees, normalized to `[0, 360)`.
pub fn toggle_rotation(rotation: f64, delta: f64) -> f64 {
    normalize_rotation(rotation + delta)
}

/// Toggle the rotation of every placement (or only those in `storage_id`)
/// without moving it.
pub fn bulk_toggle_rotation(
    placements: &[Placement],
    storage_id: Option<&str>,
    delta: f64,
) -> Vec<Placement> {
    placements
        .iter()
        .map(|p| {
            let mut p = p.clone();
            if storage_id.map_or(true, |id| p.storage_id == id) {
                p.rotation = toggle_rotation(p.rotation, delta);
            }
            p
        })
        .collect()
}

// -- Re-layout -----------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayoutOutcome {
    pub placements: Vec<Placement>,
    /// Boats that no longer fit; their placements were left as they were.
    pub unplaced: Vec<String>,
}

/// Recompute the layout of every boat placed in `area`, level by level,
/// from scratch. Restriction zones stay obstacles, and so does every boat
/// that keeps its recorded spot: placements of unknown boats (with default
/// dimensions) and boats the layout could not fit. A boat left unplaced is
/// pinned at its old position and the level is laid out again around it,
/// so the result never adds a hull collision.
pub fn relayout_unit(
    area: &StorageArea,
    boats: &[Boat],
    placements: &[Placement],
    zones: &[RestrictionZone],
    config: &EngineConfig,
) -> Result<RelayoutOutcome, BatchError> {
    if area.category == StorageCategory::Unknown {
        return Err(BatchError::UnsupportedStorageKind {
            id: area.id.clone(),
            kind: "unknown".into(),
        });
    }
    let boats_by_id: HashMap<&str, &Boat> = boats.iter().map(|b| (b.id.as_str(), b)).collect();

    // Per level: boats to lay out and bodies that stay where they are.
    // The first placement per boat wins.
    let mut levels: BTreeMap<u32, LevelLayout> = BTreeMap::new();
    let mut seen: HashSet<(u32, &str)> = HashSet::new();
    for p in placements.iter().filter(|p| p.storage_id == area.id) {
        let level = p.level_or_ground();
        if !seen.insert((level, p.boat_id.as_str())) {
            continue;
        }
        let layout = levels.entry(level).or_default();
        match boats_by_id.get(p.boat_id.as_str()) {
            Some(boat) => {
                layout.movable.push((*boat).clone());
                layout.recorded.insert(boat.id.clone(), (p.position, p.rotation));
            }
            None => {
                log::warn!(
                    "placement {} references unknown boat {}, kept in place with default size",
                    p.id,
                    p.boat_id
                );
                let stand_in = Boat::new(p.boat_id.clone(), DEFAULT_HULL_LENGTH, DEFAULT_HULL_WIDTH, 0.0);
                layout.fixed.push(BoatBody::from_boat(&stand_in, p.position, p.rotation));
            }
        }
    }

    let mut slots: HashMap<(u32, String), (Point, f64)> = HashMap::new();
    let mut unplaced = Vec::new();
    for (level, mut layout) in levels {
        loop {
            let mut engine = CollisionEngine::new(config.precision);
            for zone in zones
                .iter()
                .filter(|z| z.storage_id == area.id && z.level.unwrap_or(0) == level)
            {
                engine.register_zone(ZoneBody::from(zone));
            }
            for body in &layout.fixed {
                engine.register_boat(body.clone());
            }
            let outcome: PackingOutcome = match area.category {
                StorageCategory::Dock => distribute_dock(area, &mut engine, &layout.movable, config),
                _ => pack_warehouse(area, &mut engine, &layout.movable, config),
            };
            if outcome.unplaced.is_empty() {
                for slot in outcome.placed {
                    slots.insert((level, slot.boat_id), (slot.position, slot.rotation));
                }
                break;
            }
            log::debug!(
                "{} level {level}: pinning {} unplaced boats and laying out again",
                area.id,
                outcome.unplaced.len()
            );
            for id in &outcome.unplaced {
                if let (Some(boat), Some(&(position, rotation))) =
                    (boats_by_id.get(id.as_str()), layout.recorded.get(id))
                {
                    layout.fixed.push(BoatBody::from_boat(boat, position, rotation));
                }
            }
            layout.movable.retain(|b| !outcome.unplaced.contains(&b.id));
            unplaced.extend(outcome.unplaced);
        }
    }

    // Slots are consumed so only the first placement per boat moves.
    let placements = placements
        .iter()
        .map(|p| {
            let mut p = p.clone();
            if p.storage_id == area.id {
                if let Some((position, rotation)) = slots.remove(&(p.level_or_ground(), p.boat_id.clone())) {
                    p.position = position;
                    p.rotation = rotation;
                }
            }
            p
        })
        .collect();

    Ok(RelayoutOutcome {
        placements,
        unplaced,
    })
}

#[derive(Debug, Default)]
struct LevelLayout {
    movable: Vec<Boat>,
    fixed: Vec<BoatBody>,
    recorded: HashMap<String, (Point, f64)>,
}

// -- Restriction zones ---------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "reason")]
pub enum ZoneRemoval {
    UnknownStorage,
    NotWarehouse,
    Degenerate,
    OutsideBounds,
    Duplicate { of: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovedZone {
    pub id: String,
    #[serde(flatten)]
    pub reason: ZoneRemoval,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZonePruneOutcome {
    /// Surviving zones, in input order.
    pub kept: Vec<RestrictionZone>,
    pub removed: Vec<RemovedZone>,
}

fn same_rect(a: &RestrictionZone, b: &RestrictionZone) -> bool {
    const TOL: f64 = 1e-6;
    a.storage_id == b.storage_id
        && a.level.unwrap_or(0) == b.level.unwrap_or(0)
        && (a.x - b.x).abs() <= TOL
        && (a.y - b.y).abs() <= TOL
        && (a.width - b.width).abs() <= TOL
        && (a.height - b.height).abs() <= TOL
}

/// Drop zones that cannot constrain anything: on missing or non-warehouse
/// units, with no area, wholly outside their unit, or repeating an earlier
/// zone (earlier by id).
pub fn prune_restriction_zones(areas: &[StorageArea], zones: &[RestrictionZone]) -> ZonePruneOutcome {
    let areas_by_id: HashMap<&str, &StorageArea> = areas.iter().map(|a| (a.id.as_str(), a)).collect();

    let mut order: Vec<usize> = (0..zones.len()).collect();
    order.sort_by(|&a, &b| zones[a].id.cmp(&zones[b].id));

    let mut verdicts: Vec<Option<ZoneRemoval>> = vec![None; zones.len()];
    let mut survivors: Vec<usize> = Vec::new();
    for i in order {
        let zone = &zones[i];
        let verdict = match areas_by_id.get(zone.storage_id.as_str()) {
            None => Some(ZoneRemoval::UnknownStorage),
            Some(area) if area.category != StorageCategory::Warehouse => Some(ZoneRemoval::NotWarehouse),
            Some(area) => {
                let valid = [zone.x, zone.y, zone.width, zone.height]
                    .iter()
                    .all(|v| v.is_finite())
                    && zone.width > 0.0
                    && zone.height > 0.0;
                if !valid {
                    Some(ZoneRemoval::Degenerate)
                } else {
                    let rect = Rect::from_origin_size(zone.x, zone.y, zone.width, zone.height);
                    let bounds = area.bounds();
                    let inter = Rect::new(
                        rect.left.max(bounds.left),
                        rect.top.max(bounds.top),
                        rect.right.min(bounds.right),
                        rect.bottom.min(bounds.bottom),
                    );
                    if inter.width() <= 0.0 || inter.height() <= 0.0 {
                        Some(ZoneRemoval::OutsideBounds)
                    } else {
                        survivors
                            .iter()
                            .find(|&&j| same_rect(&zones[j], zone))
                            .map(|&j| ZoneRemoval::Duplicate {
                                of: zones[j].id.clone(),
                            })
                    }
                }
            }
        };
        if verdict.is_none() {
            survivors.push(i);
        }
        verdicts[i] = verdict;
    }

    let mut outcome = ZonePruneOutcome::default();
    for (zone, verdict) in zones.iter().zip(verdicts) {
        match verdict {
            None => outcome.kept.push(zone.clone()),
            Some(reason) => outcome.removed.push(RemovedZone {
                id: zone.id.clone(),
                reason,
            }),
        }
    }
    if !outcome.removed.is_empty() {
        log::info!("pruned {} restriction zones", outcome.removed.len());
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GeometrySource, PlacementStatus, StorageKind, StorageUnit};

    fn area(id: &str, kind: StorageKind, wkt: &str) -> StorageArea {
        StorageArea::from_unit(&StorageUnit {
            id: id.into(),
            name: None,
            kind,
            geometry: GeometrySource::Wkt(wkt.into()),
            levels: 1,
        })
        .unwrap()
    }

    fn square_warehouse(id: &str, size: f64) -> StorageArea {
        area(
            id,
            StorageKind::Warehouse,
            &format!("POLYGON((0 0, {size} 0, {size} {size}, 0 {size}, 0 0))"),
        )
    }

    fn zone(id: &str, storage: &str, x: f64, y: f64, w: f64, h: f64) -> RestrictionZone {
        RestrictionZone {
            id: id.into(),
            storage_id: storage.into(),
            level: None,
            x,
            y,
            width: w,
            height: h,
            label: None,
        }
    }

    #[test]
    fn clamp_inside_is_noop() {
        let bounds = Rect::new(0.0, 0.0, 20.0, 10.0);
        let fp = Footprint { length: 9.0, width: 4.0 };
        let out = clamp_to_bounds(Point::new(10.0, 5.0), fp, 0.0, &bounds);
        assert_eq!(out.kind, ClampKind::Unchanged);
        assert_eq!(out.position, Point::new(10.0, 5.0));
    }

    #[test]
    fn clamp_pulls_in_and_is_idempotent() {
        let bounds = Rect::new(0.0, 0.0, 20.0, 10.0);
        let fp = Footprint { length: 9.0, width: 4.0 };
        let once = clamp_to_bounds(Point::new(19.0, -3.0), fp, 0.0, &bounds);
        assert_eq!(once.kind, ClampKind::Clamped);
        assert_eq!(once.position, Point::new(15.5, 2.0));
        let twice = clamp_to_bounds(once.position, fp, 0.0, &bounds);
        assert_eq!(twice.kind, ClampKind::Unchanged);
        assert_eq!(twice.position, once.position);
    }

    #[test]
    fn clamp_uses_rotated_extents() {
        let bounds = Rect::new(0.0, 0.0, 20.0, 10.0);
        let fp = Footprint { length: 9.0, width: 4.0 };
        let out = clamp_to_bounds(Point::new(1.0, 1.0), fp, 90.0, &bounds);
        assert!((out.position.x - 2.0).abs() < 1e-9);
        assert!((out.position.y - 4.5).abs() < 1e-9);
    }

    #[test]
    fn clamp_degenerate_centers_under_rotation() {
        // 10 m boat with 0.5 m margin at 45 degrees in a 9 x 9 m warehouse.
        let wh = square_warehouse("w", 9.0);
        let boat = Boat::new("b", 10.0, 3.0, 0.5);
        let p = Placement::new("p", "b", "w", Point::new(2.0, 7.0), 45.0, PlacementStatus::Placed);
        let out = clamp_placement(&p, &boat, &wh, &EngineConfig::default());
        assert_eq!(out.kind, ClampKind::Degenerate);
        assert_eq!(out.position, Point::new(4.5, 4.5));
        let again = clamp_to_bounds(out.position, effective_footprint(&boat), 45.0, &wh.bounds());
        assert_eq!(again.position, out.position);
    }

    #[test]
    fn clamp_placements_reports() {
        let areas = vec![square_warehouse("w", 20.0)];
        let boats = vec![Boat::new("a", 8.0, 3.0, 0.5), Boat::new("big", 30.0, 3.0, 0.5)];
        let placements = vec![
            Placement::new("p1", "a", "w", Point::new(10.0, 10.0), 0.0, PlacementStatus::Placed),
            Placement::new("p2", "a", "w", Point::new(25.0, 10.0), 0.0, PlacementStatus::Placed),
            Placement::new("p3", "big", "w", Point::new(3.0, 3.0), 0.0, PlacementStatus::Placed),
            Placement::new("p4", "a", "elsewhere", Point::new(99.0, 99.0), 0.0, PlacementStatus::Placed),
        ];
        let (out, report) = clamp_placements(&boats, &areas, &placements, &EngineConfig::default());
        assert_eq!(report.clamped, vec!["p2".to_string()]);
        assert_eq!(report.degenerate, vec!["p3".to_string()]);
        assert_eq!(out[1].position, Point::new(15.5, 10.0));
        assert_eq!(out[2].position.x, 10.0);
        assert_eq!(out[3].position, Point::new(99.0, 99.0));
    }

    #[test]
    fn toggle_twice_is_identity() {
        for r in [0.0, 90.0, 180.0, 270.0, 33.0, -45.0, 725.0] {
            let once = toggle_rotation(r, 180.0);
            assert!((0.0..360.0).contains(&once));
            assert!((toggle_rotation(once, 180.0) - normalize_rotation(r)).abs() < 1e-9);
        }
    }

    #[test]
    fn bulk_toggle_filters_unit_and_keeps_position() {
        let placements = vec![
            Placement::new("p1", "a", "w1", Point::new(1.0, 2.0), 90.0, PlacementStatus::Placed),
            Placement::new("p2", "b", "w2", Point::new(3.0, 4.0), 90.0, PlacementStatus::Placed),
        ];
        let out = bulk_toggle_rotation(&placements, Some("w1"), 180.0);
        assert_eq!(out[0].rotation, 270.0);
        assert_eq!(out[0].position, Point::new(1.0, 2.0));
        assert_eq!(out[1].rotation, 90.0);
    }

    #[test]
    fn relayout_is_deterministic_and_stable() {
        let wh = square_warehouse("w", 30.0);
        let boats = vec![Boat::new("a", 8.0, 3.0, 0.5), Boat::new("b", 12.0, 4.0, 0.5)];
        let placements = vec![
            Placement::new("p1", "a", "w", Point::new(20.0, 20.0), 33.0, PlacementStatus::Placed),
            Placement::new("p2", "b", "w", Point::new(21.0, 20.0), 0.0, PlacementStatus::Reserved),
            Placement::new("p3", "a", "other", Point::new(0.0, 0.0), 0.0, PlacementStatus::Placed),
        ];
        let config = EngineConfig::default();
        let first = relayout_unit(&wh, &boats, &placements, &[], &config).unwrap();
        assert!(first.unplaced.is_empty());
        assert_eq!(first.placements[1].position, Point::new(7.0, 3.0));
        assert_eq!(first.placements[0].position, Point::new(18.5, 2.5));
        assert_eq!(first.placements[2], placements[2]);
        let second = relayout_unit(&wh, &boats, &first.placements, &[], &config).unwrap();
        assert_eq!(second.placements, first.placements);
    }

    #[test]
    fn relayout_keeps_leftovers_as_obstacles() {
        let wh = area("w", StorageKind::Warehouse, "POLYGON((0 0, 30 0, 30 10, 0 10, 0 0))");
        let boats: Vec<Boat> = ["a", "b", "c"].iter().map(|id| Boat::new(*id, 12.0, 4.0, 0.5)).collect();
        let placements = vec![
            Placement::new("p1", "a", "w", Point::new(40.0, 40.0), 0.0, PlacementStatus::Placed),
            Placement::new("p2", "b", "w", Point::new(50.0, 50.0), 0.0, PlacementStatus::Placed),
            Placement::new("p3", "c", "w", Point::new(23.0, 5.0), 0.0, PlacementStatus::Placed),
        ];
        let config = EngineConfig::default();
        let out = relayout_unit(&wh, &boats, &placements, &[], &config).unwrap();
        // Only two fit. c stays put, which then crowds b out as well.
        assert_eq!(out.unplaced, vec!["c".to_string(), "b".to_string()]);
        assert_eq!(out.placements[0].position, Point::new(7.0, 3.0));
        assert_eq!(out.placements[1], placements[1]);
        assert_eq!(out.placements[2], placements[2]);
        let engine = CollisionEngine::from_records("w", 0, &boats, &out.placements, &[], config.precision);
        assert!(engine.recompute_all().iter().all(|r| r.is_clear()));
    }

    #[test]
    fn relayout_avoids_unknown_boats() {
        let wh = square_warehouse("w", 30.0);
        let boats = vec![Boat::new("a", 8.0, 3.0, 0.5)];
        let placements = vec![
            Placement::new("p1", "ghost", "w", Point::new(5.0, 3.0), 0.0, PlacementStatus::Placed),
            Placement::new("p2", "a", "w", Point::new(20.0, 20.0), 0.0, PlacementStatus::Placed),
        ];
        let out = relayout_unit(&wh, &boats, &placements, &[], &EngineConfig::default()).unwrap();
        // The first row slot is on top of the unknown boat, so a stays put.
        assert_eq!(out.unplaced, vec!["a".to_string()]);
        assert_eq!(out.placements, placements);

        let clear_of_ghost = vec![
            Placement::new("p1", "ghost", "w", Point::new(25.0, 25.0), 0.0, PlacementStatus::Placed),
            placements[1].clone(),
        ];
        let out = relayout_unit(&wh, &boats, &clear_of_ghost, &[], &EngineConfig::default()).unwrap();
        assert!(out.unplaced.is_empty());
        assert_eq!(out.placements[1].position, Point::new(5.0, 2.5));
    }

    #[test]
    fn relayout_rejects_unknown_kind() {
        let parking = area("x", StorageKind::Other("parking".into()), "POLYGON((0 0, 5 0, 5 5, 0 0))");
        let err = relayout_unit(&parking, &[], &[], &[], &EngineConfig::default()).unwrap_err();
        assert!(matches!(err, BatchError::UnsupportedStorageKind { .. }));
    }

    #[test]
    fn prune_zones() {
        let areas = vec![
            square_warehouse("w", 20.0),
            area("d", StorageKind::Dock, "LINESTRING(0 0, 50 0)"),
        ];
        let zones = vec![
            zone("z3", "w", 2.0, 2.0, 1.0, 1.0),
            zone("z1", "w", 2.0, 2.0, 1.0, 1.0),
            zone("z2", "w", 30.0, 30.0, 2.0, 2.0),
            zone("z4", "w", 5.0, 5.0, 0.0, 2.0),
            zone("z5", "d", 1.0, 1.0, 1.0, 1.0),
            zone("z6", "gone", 1.0, 1.0, 1.0, 1.0),
            zone("z7", "w", 19.0, 19.0, 3.0, 3.0),
        ];
        let out = prune_restriction_zones(&areas, &zones);
        let kept: Vec<&str> = out.kept.iter().map(|z| z.id.as_str()).collect();
        assert_eq!(kept, vec!["z1", "z7"]);
        let reasons: BTreeMap<&str, &ZoneRemoval> = out.removed.iter().map(|r| (r.id.as_str(), &r.reason)).collect();
        assert_eq!(reasons["z3"], &ZoneRemoval::Duplicate { of: "z1".into() });
        assert_eq!(reasons["z2"], &ZoneRemoval::OutsideBounds);
        assert_eq!(reasons["z4"], &ZoneRemoval::Degenerate);
        assert_eq!(reasons["z5"], &ZoneRemoval::NotWarehouse);
        assert_eq!(reasons["z6"], &ZoneRemoval::UnknownStorage);

        let again = prune_restriction_zones(&areas, &out.kept);
        assert_eq!(again.kept, out.kept);
        assert!(again.removed.is_empty());
    }
}
