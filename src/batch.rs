//! Standalone batch transforms over JSON records.
//!
//! Every operation takes the full record set and returns the transformed
//! placements and restriction zones plus an operation report. Nothing here
//! keeps state between calls and identical input gives identical output.

use std::collections::{BTreeMap, BTreeSet};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::collision::{BoatBody, CollisionEngine};
use crate::config::EngineConfig;
use crate::error::BatchError;
use crate::maintenance::{
    bulk_toggle_rotation, clamp_placements, prune_restriction_zones, relayout_unit, ClampReport,
    RemovedZone,
};
use crate::reconcile::{reconcile, RemovedPlacement};
use crate::storage::StorageArea;
use crate::types::{
    Boat, BoatStatus, CollisionResult, Placement, RestrictionZone, StorageCategory, StorageUnit,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchInput {
    #[serde(default)]
    pub boats: Vec<Boat>,
    #[serde(default)]
    pub storage_units: Vec<StorageUnit>,
    #[serde(default)]
    pub placements: Vec<Placement>,
    #[serde(default)]
    pub restriction_zones: Vec<RestrictionZone>,
    #[serde(default)]
    pub config: EngineConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Reconcile,
    /// Re-layout one unit, or every warehouse and dock when `None`.
    Layout { unit: Option<String> },
    Clamp,
    /// Toggle rotations by `delta` (the configured delta when `None`).
    Rotate {
        unit: Option<String>,
        delta: Option<f64>,
    },
    PruneZones,
    Audit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitAudit {
    pub storage_id: String,
    pub level: u32,
    /// Boats with a hull or margin collision.
    pub collisions: Vec<CollisionResult>,
    /// Placements whose margin footprint leaves the unit.
    pub out_of_bounds: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "operation")]
pub enum BatchReport {
    #[serde(rename_all = "camelCase")]
    Reconcile {
        removed: Vec<RemovedPlacement>,
        boat_statuses: BTreeMap<String, BoatStatus>,
    },
    Layout {
        /// Boats left at their old position, per unit.
        unplaced: BTreeMap<String, Vec<String>>,
    },
    Clamp(ClampReport),
    Rotate {
        rotated: usize,
    },
    PruneZones {
        removed: Vec<RemovedZone>,
    },
    Audit {
        units: Vec<UnitAudit>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutput {
    pub placements: Vec<Placement>,
    pub restriction_zones: Vec<RestrictionZone>,
    pub report: BatchReport,
}

/// Parse every unit's geometry. Malformed geometry fails the whole batch.
pub fn parse_areas(units: &[StorageUnit]) -> Result<Vec<StorageArea>, BatchError> {
    units
        .iter()
        .map(|u| StorageArea::from_unit(u).map_err(BatchError::from))
        .collect()
}

pub fn run(op: &Operation, input: &BatchInput) -> Result<BatchOutput, BatchError> {
    input.config.validate()?;
    log::info!(
        "{op:?}: {} boats, {} units, {} placements, {} zones",
        input.boats.len(),
        input.storage_units.len(),
        input.placements.len(),
        input.restriction_zones.len()
    );
    match op {
        Operation::Reconcile => Ok(run_reconcile(input)),
        Operation::Layout { unit } => run_layout(input, unit.as_deref()),
        Operation::Clamp => run_clamp(input),
        Operation::Rotate { unit, delta } => Ok(run_rotate(input, unit.as_deref(), *delta)),
        Operation::PruneZones => run_prune(input),
        Operation::Audit => run_audit(input),
    }
}

/// JSON in, JSON out.
pub fn run_json(op: &Operation, json: &str) -> Result<String, BatchError> {
    let input: BatchInput = serde_json::from_str(json)?;
    let output = run(op, &input)?;
    Ok(serde_json::to_string(&output)?)
}

fn run_reconcile(input: &BatchInput) -> BatchOutput {
    let report = reconcile(&input.boats, &input.storage_units, &input.placements);
    BatchOutput {
        placements: report.kept,
        restriction_zones: input.restriction_zones.clone(),
        report: BatchReport::Reconcile {
            removed: report.removed,
            boat_statuses: report.boat_statuses,
        },
    }
}

fn run_layout(input: &BatchInput, unit: Option<&str>) -> Result<BatchOutput, BatchError> {
    let areas = parse_areas(&input.storage_units)?;
    let targets: Vec<&StorageArea> = match unit {
        Some(id) => {
            let area = areas
                .iter()
                .find(|a| a.id == id)
                .ok_or_else(|| BatchError::UnknownStorage(id.to_string()))?;
            if area.category == StorageCategory::Unknown {
                let kind = input
                    .storage_units
                    .iter()
                    .find(|u| u.id == id)
                    .map(|u| String::from(u.kind.clone()))
                    .unwrap_or_default();
                return Err(BatchError::UnsupportedStorageKind {
                    id: id.to_string(),
                    kind,
                });
            }
            vec![area]
        }
        None => areas
            .iter()
            .filter(|a| a.category != StorageCategory::Unknown)
            .collect(),
    };

    let mut placements = input.placements.clone();
    let mut unplaced = BTreeMap::new();
    for area in targets {
        let outcome = relayout_unit(
            area,
            &input.boats,
            &placements,
            &input.restriction_zones,
            &input.config,
        )?;
        placements = outcome.placements;
        if !outcome.unplaced.is_empty() {
            log::warn!("{}: {} boats no longer fit", area.id, outcome.unplaced.len());
            unplaced.insert(area.id.clone(), outcome.unplaced);
        }
    }
    Ok(BatchOutput {
        placements,
        restriction_zones: input.restriction_zones.clone(),
        report: BatchReport::Layout { unplaced },
    })
}

fn run_clamp(input: &BatchInput) -> Result<BatchOutput, BatchError> {
    let areas = parse_areas(&input.storage_units)?;
    let (placements, report) =
        clamp_placements(&input.boats, &areas, &input.placements, &input.config);
    Ok(BatchOutput {
        placements,
        restriction_zones: input.restriction_zones.clone(),
        report: BatchReport::Clamp(report),
    })
}

fn run_rotate(input: &BatchInput, unit: Option<&str>, delta: Option<f64>) -> BatchOutput {
    let delta = delta.unwrap_or(input.config.rotation_delta);
    let placements = bulk_toggle_rotation(&input.placements, unit, delta);
    let rotated = input
        .placements
        .iter()
        .filter(|p| unit.map_or(true, |id| p.storage_id == id))
        .count();
    BatchOutput {
        placements,
        restriction_zones: input.restriction_zones.clone(),
        report: BatchReport::Rotate { rotated },
    }
}

fn run_prune(input: &BatchInput) -> Result<BatchOutput, BatchError> {
    let areas = parse_areas(&input.storage_units)?;
    let outcome = prune_restriction_zones(&areas, &input.restriction_zones);
    Ok(BatchOutput {
        placements: input.placements.clone(),
        restriction_zones: outcome.kept,
        report: BatchReport::PruneZones {
            removed: outcome.removed,
        },
    })
}

fn audit_unit(area: &StorageArea, input: &BatchInput) -> Vec<UnitAudit> {
    let levels: BTreeSet<u32> = input
        .placements
        .iter()
        .filter(|p| p.storage_id == area.id)
        .map(Placement::level_or_ground)
        .collect();
    let boats_by_id: BTreeMap<&str, &Boat> =
        input.boats.iter().map(|b| (b.id.as_str(), b)).collect();

    levels
        .into_iter()
        .map(|level| {
            let engine = CollisionEngine::from_records(
                &area.id,
                level,
                &input.boats,
                &input.placements,
                &input.restriction_zones,
                input.config.precision,
            );
            let collisions = engine
                .recompute_all()
                .into_iter()
                .filter(|r| !r.is_clear())
                .collect();
            let out_of_bounds = input
                .placements
                .iter()
                .filter(|p| p.storage_id == area.id && p.level_or_ground() == level)
                .filter(|p| match boats_by_id.get(p.boat_id.as_str()) {
                    Some(boat) => {
                        let body = BoatBody::from_boat(boat, p.position, p.rotation);
                        !area.contains_corners(&body.margin_corners(), &input.config)
                    }
                    None => false,
                })
                .map(|p| p.id.clone())
                .collect();
            UnitAudit {
                storage_id: area.id.clone(),
                level,
                collisions,
                out_of_bounds,
            }
        })
        .collect()
}

/// Collision and bounds audit of every unit. Units are checked in parallel;
/// the report keeps input order.
fn run_audit(input: &BatchInput) -> Result<BatchOutput, BatchError> {
    let areas = parse_areas(&input.storage_units)?;
    let units: Vec<UnitAudit> = areas
        .par_iter()
        .map(|area| audit_unit(area, input))
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect();
    let flagged = units
        .iter()
        .filter(|u| !u.collisions.is_empty() || !u.out_of_bounds.is_empty())
        .count();
    log::info!("audited {} unit levels, {} flagged", units.len(), flagged);
    Ok(BatchOutput {
        placements: input.placements.clone(),
        restriction_zones: input.restriction_zones.clone(),
        report: BatchReport::Audit { units },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const YARD_JSON: &str = r#"{
      "boats": [
        {"id": "a", "length": 8, "width": 3, "safetyMargin": 0.5, "locationKind": "warehouse"},
        {"id": "b", "length": 12, "width": 4, "safetyMargin": 0.5},
        {"id": "c", "length": 10, "width": 3, "safetyMargin": 0.5, "locationKind": "dock"}
      ],
      "storageUnits": [
        {"id": "w1", "kind": "warehouse", "geometry": "POLYGON((0 0, 30 0, 30 30, 0 30, 0 0))"},
        {"id": "d1", "kind": "pier", "geometry": {"type": "LineString", "coordinates": [[0, 100], [40, 100]]}},
        {"id": "x1", "kind": "parking", "geometry": "POLYGON((0 0, 5 0, 5 5, 0 5))"}
      ],
      "placements": [
        {"id": "p1", "boatId": "a", "storageId": "w1", "position": {"x": 10, "y": 10}, "rotation": 0, "status": "placed", "placedAt": "2024-01-01"},
        {"id": "p2", "boatId": "a", "storageId": "w1", "position": {"x": 12, "y": 10}, "rotation": 0, "status": "reserved", "reservedAt": "2024-06-01"},
        {"id": "p3", "boatId": "b", "storageId": "w1", "position": {"x": 29, "y": 20}, "rotation": 90, "status": "placed"},
        {"id": "p4", "boatId": "c", "storageId": "d1", "position": {"x": 4, "y": 93.5}, "rotation": 270, "status": "placed"},
        {"id": "p5", "boatId": "c", "storageId": "w1", "position": {"x": 20, "y": 20}, "rotation": 0, "status": "reserved"}
      ],
      "restrictionZones": [
        {"id": "z1", "storageId": "w1", "x": 25, "y": 25, "width": 2, "height": 2},
        {"id": "z2", "storageId": "d1", "x": 0, "y": 0, "width": 2, "height": 2}
      ],
      "config": {"gridStep": 1.0}
    }"#;

    fn input() -> BatchInput {
        serde_json::from_str(YARD_JSON).unwrap()
    }

    fn ids(placements: &[Placement]) -> Vec<&str> {
        placements.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn reconcile_via_batch() {
        let out = run(&Operation::Reconcile, &input()).unwrap();
        assert_eq!(ids(&out.placements), vec!["p1", "p3", "p4"]);
        match out.report {
            BatchReport::Reconcile {
                removed,
                boat_statuses,
            } => {
                assert_eq!(removed.len(), 2);
                assert_eq!(boat_statuses["c"], BoatStatus::Placed);
            }
            other => panic!("unexpected report {other:?}"),
        }
    }

    #[test]
    fn operations_are_deterministic() {
        for op in [
            Operation::Reconcile,
            Operation::Layout { unit: None },
            Operation::Clamp,
            Operation::Rotate {
                unit: None,
                delta: None,
            },
            Operation::PruneZones,
            Operation::Audit,
        ] {
            let a = run_json(&op, YARD_JSON).unwrap();
            let b = run_json(&op, YARD_JSON).unwrap();
            assert_eq!(a, b, "{op:?}");
        }
    }

    #[test]
    fn layout_single_unit_and_unknown_ids() {
        let out = run(
            &Operation::Layout {
                unit: Some("d1".into()),
            },
            &input(),
        )
        .unwrap();
        let p4 = out.placements.iter().find(|p| p.id == "p4").unwrap();
        assert_eq!(p4.rotation, 270.0);
        assert!((p4.position.x - 4.0).abs() < 1e-9);
        assert!((p4.position.y - 93.5).abs() < 1e-9);

        let err = run(&Operation::Layout { unit: Some("nope".into()) }, &input()).unwrap_err();
        assert!(matches!(err, BatchError::UnknownStorage(_)));
        let err = run(&Operation::Layout { unit: Some("x1".into()) }, &input()).unwrap_err();
        assert!(matches!(err, BatchError::UnsupportedStorageKind { ref kind, .. } if kind == "parking"));
    }

    #[test]
    fn clamp_and_rotate() {
        let out = run(&Operation::Clamp, &input()).unwrap();
        let p3 = out.placements.iter().find(|p| p.id == "p3").unwrap();
        assert!((p3.position.x - 27.5).abs() < 1e-9);

        let out = run(
            &Operation::Rotate {
                unit: Some("w1".into()),
                delta: Some(90.0),
            },
            &input(),
        )
        .unwrap();
        assert_eq!(out.report, BatchReport::Rotate { rotated: 4 });
        assert_eq!(out.placements[2].rotation, 180.0);
        assert_eq!(out.placements[3].rotation, 270.0);
    }

    #[test]
    fn prune_drops_dock_zone() {
        let out = run(&Operation::PruneZones, &input()).unwrap();
        let kept: Vec<&str> = out.restriction_zones.iter().map(|z| z.id.as_str()).collect();
        assert_eq!(kept, vec!["z1"]);
    }

    #[test]
    fn audit_flags_overlaps() {
        let out = run(&Operation::Audit, &input()).unwrap();
        let BatchReport::Audit { units } = out.report else {
            panic!("expected audit report");
        };
        let w1: Vec<&UnitAudit> = units.iter().filter(|u| u.storage_id == "w1").collect();
        assert_eq!(w1.len(), 1);
        // p3 pokes out of the right wall.
        assert_eq!(w1[0].out_of_bounds, vec!["p3".to_string()]);
        assert!(units.iter().any(|u| u.storage_id == "d1"));
    }

    #[test]
    fn bad_geometry_fails_the_batch() {
        let mut input = input();
        input.storage_units[0].geometry = crate::types::GeometrySource::Wkt("POLYGON((0 0, 1 1))".into());
        assert!(matches!(run(&Operation::Clamp, &input), Err(BatchError::Geometry(_))));
        // reconciliation only needs unit kinds
        assert!(run(&Operation::Reconcile, &input).is_ok());
    }
}
