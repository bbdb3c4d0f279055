//! Placement reconciliation.
//!
//! A boat may hold at most one authoritative placement per storage
//! category, and only in categories its `location_kind` allows. Drift from
//! manual edits or partial migrations is repaired here by choosing a single
//! best placement per (boat, category) and dropping the rest. Placements in
//! units that cannot be classified are always kept.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{
    Boat, BoatStatus, LocationKind, Placement, PlacementStatus, StorageCategory, StorageUnit,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "reason")]
pub enum RemovalReason {
    #[serde(rename_all = "camelCase")]
    Duplicate { kept_id: String },
    DisallowedCategory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovedPlacement {
    pub id: String,
    pub boat_id: String,
    #[serde(flatten)]
    pub reason: RemovalReason,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    /// Surviving placements, in input order.
    pub kept: Vec<Placement>,
    pub removed: Vec<RemovedPlacement>,
    /// Aggregate status per known boat, recomputed from `kept`.
    pub boat_statuses: BTreeMap<String, BoatStatus>,
}

/// Parses an RFC 3339 timestamp, a naive date-time (taken as UTC) or a bare
/// date (midnight UTC).
pub fn parse_instant(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(text) {
        return Some(t.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(text, format) {
            return Some(t.and_utc());
        }
    }
    let date = NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}

fn relevant_instant(p: &Placement) -> Option<DateTime<Utc>> {
    let text = p.relevant_timestamp()?;
    let instant = parse_instant(text);
    if instant.is_none() {
        log::warn!("placement {}: unreadable timestamp {text:?}", p.id);
    }
    instant
}

/// Orders placements best first: status rank, then most recent relevant
/// timestamp, then lowest id. A missing or unreadable timestamp is older
/// than any readable one.
pub fn preference_order(a: &Placement, b: &Placement) -> Ordering {
    b.status
        .rank()
        .cmp(&a.status.rank())
        .then_with(|| relevant_instant(b).cmp(&relevant_instant(a)))
        .then_with(|| a.id.cmp(&b.id))
}

/// Aggregate status implied by a boat's surviving placements.
pub fn aggregate_status<'a>(placements: impl IntoIterator<Item = &'a Placement>) -> BoatStatus {
    let mut status = BoatStatus::Unplaced;
    for p in placements {
        match p.status {
            PlacementStatus::Placed => return BoatStatus::Placed,
            PlacementStatus::Reserved => status = BoatStatus::Reserved,
            PlacementStatus::Other => {}
        }
    }
    status
}

pub fn reconcile(boats: &[Boat], units: &[StorageUnit], placements: &[Placement]) -> ReconcileReport {
    let categories: HashMap<&str, StorageCategory> = units
        .iter()
        .map(|u| (u.id.as_str(), u.kind.category()))
        .collect();
    let kinds: HashMap<&str, LocationKind> = boats
        .iter()
        .map(|b| (b.id.as_str(), b.location_kind))
        .collect();
    let category_of = |p: &Placement| {
        categories
            .get(p.storage_id.as_str())
            .copied()
            .unwrap_or(StorageCategory::Unknown)
    };

    let mut removed_reason: Vec<Option<RemovalReason>> = vec![None; placements.len()];

    // (boat, category) -> candidate indices
    let mut groups: BTreeMap<(&str, StorageCategory), Vec<usize>> = BTreeMap::new();
    for (i, p) in placements.iter().enumerate() {
        let category = category_of(p);
        if category == StorageCategory::Unknown {
            continue;
        }
        if let Some(kind) = kinds.get(p.boat_id.as_str()) {
            if !kind.allows(category) {
                removed_reason[i] = Some(RemovalReason::DisallowedCategory);
                continue;
            }
        }
        groups.entry((p.boat_id.as_str(), category)).or_default().push(i);
    }

    for ((boat_id, category), mut indices) in groups {
        if indices.len() < 2 {
            continue;
        }
        indices.sort_by(|&a, &b| preference_order(&placements[a], &placements[b]));
        let best = &placements[indices[0]];
        log::debug!(
            "boat {boat_id}: {} {:?} placements, keeping {}",
            indices.len(),
            category,
            best.id
        );
        for &i in &indices[1..] {
            removed_reason[i] = Some(RemovalReason::Duplicate {
                kept_id: best.id.clone(),
            });
        }
    }

    let mut report = ReconcileReport::default();
    for (p, reason) in placements.iter().zip(removed_reason) {
        match reason {
            None => report.kept.push(p.clone()),
            Some(reason) => report.removed.push(RemovedPlacement {
                id: p.id.clone(),
                boat_id: p.boat_id.clone(),
                reason,
            }),
        }
    }

    for boat in boats {
        let status = aggregate_status(report.kept.iter().filter(|p| p.boat_id == boat.id));
        report.boat_statuses.insert(boat.id.clone(), status);
    }

    if !report.removed.is_empty() {
        log::info!(
            "reconciled {} placements: kept {}, removed {}",
            placements.len(),
            report.kept.len(),
            report.removed.len()
        );
    }
    report
}
