//! Single-boat placement suggestions.
//!
//! Candidate centers are enumerated on a fixed grid over the unit's
//! placement bounds, for each configured rotation. Invalid positions are
//! dropped and the rest ranked: next to already placed boats when the unit
//! has any (tight packing), else close to the middle of the unit.

use std::cmp::Ordering;

use crate::collision::{BoatBody, CollisionEngine};
use crate::config::EngineConfig;
use crate::geometry::{axis_aligned_half_extents, effective_footprint, normalize_rotation};
use crate::storage::StorageArea;
use crate::types::{Boat, Candidate, Point};

/// Margin footprint inside the unit and no hull or margin collision with
/// any other boat or restriction zone.
pub fn is_valid_placement(
    area: &StorageArea,
    engine: &CollisionEngine,
    body: &BoatBody,
    config: &EngineConfig,
) -> bool {
    if !area.contains_corners(&body.margin_corners(), config) {
        return false;
    }
    engine.check_candidate(body).is_clear()
}

/// Positions `start, start + step, ...` up to and including `end`.
pub(crate) fn grid_positions(start: f64, end: f64, step: f64) -> impl Iterator<Item = f64> {
    let count = if step > 0.0 && end >= start {
        ((end - start) / step + 1e-9).floor() as usize + 1
    } else {
        0
    };
    (0..count).map(move |i| start + i as f64 * step)
}

fn candidate_order(a: &Candidate, b: &Candidate) -> Ordering {
    a.score
        .total_cmp(&b.score)
        .then(a.rotation.total_cmp(&b.rotation))
        .then(a.position.y.total_cmp(&b.position.y))
        .then(a.position.x.total_cmp(&b.position.x))
}

/// Up to `config.top_k` valid placements for `boat`, best first. An empty
/// result means the boat fits nowhere in this unit.
pub fn suggest_placements(
    area: &StorageArea,
    engine: &CollisionEngine,
    boat: &Boat,
    config: &EngineConfig,
) -> Vec<Candidate> {
    if config.grid_step <= 0.0 {
        log::warn!("grid step {} is not positive, no candidates", config.grid_step);
        return Vec::new();
    }
    let bounds = area.placement_bounds(config);
    let footprint = effective_footprint(boat);
    let neighbours: Vec<Point> = engine
        .boats()
        .filter(|b| b.id != boat.id)
        .map(|b| b.position)
        .collect();
    let center = bounds.center();

    let mut rotations: Vec<f64> = config
        .candidate_rotations
        .iter()
        .map(|&r| normalize_rotation(r))
        .collect();
    rotations.sort_by(f64::total_cmp);
    rotations.dedup();

    let mut candidates = Vec::new();
    for &rotation in &rotations {
        let half = axis_aligned_half_extents(footprint.length, footprint.width, rotation);
        for y in grid_positions(bounds.top + half.dy, bounds.bottom - half.dy, config.grid_step) {
            for x in grid_positions(bounds.left + half.dx, bounds.right - half.dx, config.grid_step) {
                let position = Point::new(x, y);
                let body = BoatBody::from_boat(boat, position, rotation);
                if !is_valid_placement(area, engine, &body, config) {
                    continue;
                }
                let score = if neighbours.is_empty() {
                    position.distance(&center)
                } else {
                    neighbours
                        .iter()
                        .map(|n| position.distance(n))
                        .fold(f64::INFINITY, f64::min)
                };
                candidates.push(Candidate {
                    position,
                    rotation,
                    score,
                });
            }
        }
    }

    log::debug!(
        "boat {} in {}: {} valid grid positions",
        boat.id,
        area.id,
        candidates.len()
    );
    candidates.sort_by(candidate_order);
    candidates.truncate(config.top_k);
    candidates
}
