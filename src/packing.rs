//! Bulk auto-layout: row packing for warehouses, alternating berths for
//! docks.
//!
//! Both walk a cursor over the unit and place boats longest first. Boats
//! already registered in the collision engine (other boats of the unit,
//! restriction zones) are obstacles; every boat placed here is registered
//! as it lands, so later boats see it.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::collision::{BoatBody, CollisionEngine};
use crate::config::EngineConfig;
use crate::geometry::{normalize_rotation, sanitized_dimensions};
use crate::search::is_valid_placement;
use crate::storage::StorageArea;
use crate::types::{Boat, Point};

const EPS: f64 = 1e-9;

/// Where one boat ended up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutSlot {
    pub boat_id: String,
    pub position: Point,
    pub rotation: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackingOutcome {
    /// In placement order.
    pub placed: Vec<LayoutSlot>,
    /// Boats left without a position, in the order they were tried.
    pub unplaced: Vec<String>,
}

/// Longest first, ties by id so the layout is reproducible.
fn longest_first<'a>(boats: &'a [Boat]) -> Vec<&'a Boat> {
    let mut sorted: Vec<&Boat> = boats.iter().collect();
    sorted.sort_by(|a, b| {
        let (la, _, _) = sanitized_dimensions(a);
        let (lb, _, _) = sanitized_dimensions(b);
        lb.partial_cmp(&la)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    sorted
}

// -- Warehouse rows ------------------------------------------------

enum RowFit {
    Fits { body: BoatBody, width: f64, height: f64 },
    /// Neither orientation fits in the width left in this row.
    RowFull,
    /// Fits the row but is out of bounds or collides.
    Blocked,
}

fn fit_in_row(
    area: &StorageArea,
    engine: &CollisionEngine,
    boat: &Boat,
    cursor: Point,
    config: &EngineConfig,
) -> RowFit {
    let bounds = area.bounds();
    let (length, width, margin) = sanitized_dimensions(boat);
    let (outer_l, outer_w) = (length + 2.0 * margin, width + 2.0 * margin);
    let mut any_fits_width = false;
    for (rotation, w, h) in [(0.0, outer_l, outer_w), (90.0, outer_w, outer_l)] {
        if cursor.x + w > bounds.right - config.row_gap + EPS {
            continue;
        }
        any_fits_width = true;
        if cursor.y + h > bounds.bottom - config.row_gap + EPS {
            continue;
        }
        let center = Point::new(cursor.x + w / 2.0, cursor.y + h / 2.0);
        let body = BoatBody::from_boat(boat, center, rotation);
        if is_valid_placement(area, engine, &body, config) {
            return RowFit::Fits {
                body,
                width: w,
                height: h,
            };
        }
    }
    if any_fits_width {
        RowFit::Blocked
    } else {
        RowFit::RowFull
    }
}

/// First-fit-decreasing row packing of `boats` into a warehouse.
pub fn pack_warehouse(
    area: &StorageArea,
    engine: &mut CollisionEngine,
    boats: &[Boat],
    config: &EngineConfig,
) -> PackingOutcome {
    let bounds = area.bounds();
    let gap = config.row_gap;
    let row_start = bounds.left + gap;
    let mut cursor = Point::new(row_start, bounds.top + gap);
    let mut row_height: f64 = 0.0;
    let mut row_has_items = false;
    let mut outcome = PackingOutcome::default();

    for boat in longest_first(boats) {
        let mut fit = fit_in_row(area, engine, boat, cursor, config);
        if matches!(fit, RowFit::RowFull) && row_has_items {
            cursor = Point::new(row_start, cursor.y + row_height + gap);
            row_height = 0.0;
            row_has_items = false;
            fit = fit_in_row(area, engine, boat, cursor, config);
        }
        match fit {
            RowFit::Fits {
                body,
                width,
                height,
            } => {
                outcome.placed.push(LayoutSlot {
                    boat_id: boat.id.clone(),
                    position: body.position,
                    rotation: body.rotation,
                });
                engine.register_boat(body);
                cursor.x += width + gap;
                row_height = row_height.max(height);
                row_has_items = true;
            }
            RowFit::RowFull | RowFit::Blocked => {
                log::debug!("warehouse {}: no room for boat {} at cursor", area.id, boat.id);
                outcome.unplaced.push(boat.id.clone());
            }
        }
    }

    log::info!(
        "warehouse {}: packed {} boats, {} left unplaced",
        area.id,
        outcome.placed.len(),
        outcome.unplaced.len()
    );
    outcome
}

// -- Dock berths ---------------------------------------------------

/// Berth boats along a dock, alternating sides of the dock line. Boats on
/// the left of the walking direction get rotation 270 and the others 90,
/// relative to the dock axis.
pub fn distribute_dock(
    area: &StorageArea,
    engine: &mut CollisionEngine,
    boats: &[Boat],
    config: &EngineConfig,
) -> PackingOutcome {
    let axis = area.dock_axis();
    let usable_end = axis.length() - config.dock_end_margin;
    let mut cursor = config.dock_end_margin;
    let mut top_side = true;
    let mut outcome = PackingOutcome::default();
    let mut dock_full = false;

    for boat in longest_first(boats) {
        if dock_full {
            outcome.unplaced.push(boat.id.clone());
            continue;
        }
        let (length, width, margin) = sanitized_dimensions(boat);
        if length + 2.0 * margin + config.dock_side_gap > config.dock_berth_depth + EPS {
            log::debug!("dock {}: boat {} is longer than the berth depth", area.id, boat.id);
            outcome.unplaced.push(boat.id.clone());
            continue;
        }
        let along_extent = width + 2.0 * margin;
        let advance = config.dock_step.max(width + margin);
        let offset = length / 2.0 + margin + config.dock_side_gap;
        let (cross, side_rotation) = if top_side {
            (-offset, 270.0)
        } else {
            (offset, 90.0)
        };
        let rotation = normalize_rotation(axis.base_rotation() + side_rotation);

        let mut placed = None;
        while cursor + along_extent <= usable_end + EPS {
            let position = axis.to_world(cursor + along_extent / 2.0, cross);
            let body = BoatBody::from_boat(boat, position, rotation);
            if is_valid_placement(area, engine, &body, config) {
                placed = Some(body);
                break;
            }
            // Occupied berth: walk past it.
            cursor += advance;
        }

        match placed {
            Some(body) => {
                outcome.placed.push(LayoutSlot {
                    boat_id: boat.id.clone(),
                    position: body.position,
                    rotation: body.rotation,
                });
                engine.register_boat(body);
                cursor += advance;
                top_side = !top_side;
            }
            None => {
                dock_full = true;
                outcome.unplaced.push(boat.id.clone());
            }
        }
    }

    log::info!(
        "dock {}: berthed {} boats, {} left unplaced",
        area.id,
        outcome.placed.len(),
        outcome.unplaced.len()
    );
    outcome
}
