use proptest::prelude::*;
use yard_engine::collision::CollisionEngine;
use yard_engine::config::{CollisionPrecision, EngineConfig};
use yard_engine::geometry::{axis_aligned_half_extents, Footprint, Rect};
use yard_engine::maintenance::{clamp_to_bounds, ClampKind};
use yard_engine::packing::{distribute_dock, pack_warehouse};
use yard_engine::reconcile::reconcile;
use yard_engine::storage::StorageArea;
use yard_engine::types::{
    Boat, GeometrySource, LocationKind, Placement, PlacementStatus, Point, StorageKind,
    StorageUnit,
};

fn unit(id: &str, kind: StorageKind, wkt: &str) -> StorageUnit {
    StorageUnit {
        id: id.into(),
        name: None,
        kind,
        geometry: GeometrySource::Wkt(wkt.into()),
        levels: 1,
    }
}

fn rect_strategy() -> impl Strategy<Value = Rect> {
    (-50.0f64..50.0, -50.0f64..50.0, 0.0f64..30.0, 0.0f64..30.0)
        .prop_map(|(x, y, w, h)| Rect::from_origin_size(x, y, w, h))
}

fn status_strategy() -> impl Strategy<Value = PlacementStatus> {
    prop_oneof![
        Just(PlacementStatus::Placed),
        Just(PlacementStatus::Reserved),
        Just(PlacementStatus::Other),
    ]
}

fn placements_strategy() -> impl Strategy<Value = Vec<Placement>> {
    let boat_ids = prop_oneof![Just("a"), Just("b"), Just("c"), Just("ghost")];
    let storage_ids = prop_oneof![Just("w1"), Just("w2"), Just("d1"), Just("x1"), Just("gone")];
    let stamps = prop::option::of(prop_oneof![
        Just("2023-05-01"),
        Just("2024-01-15"),
        Just("2024-01-15"),
        Just("2025-02-01"),
    ]);
    prop::collection::vec((boat_ids, storage_ids, status_strategy(), stamps.clone(), stamps), 0..16)
        .prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (boat, storage, status, placed, updated))| {
                    let mut p = Placement::new(
                        format!("p{i:02}"),
                        boat,
                        storage,
                        Point::new(0.0, 0.0),
                        0.0,
                        status,
                    );
                    p.placed_at = placed.map(String::from);
                    p.updated_at = updated.map(String::from);
                    p
                })
                .collect()
        })
}

fn fleet_strategy(max: usize) -> impl Strategy<Value = Vec<Boat>> {
    prop::collection::vec((1.0f64..15.0, 1.0f64..5.0, 0.0f64..1.0), 1..max).prop_map(|dims| {
        dims.into_iter()
            .enumerate()
            .map(|(i, (l, w, m))| Boat::new(format!("b{i:02}"), l, w, m))
            .collect()
    })
}

proptest! {
    #[test]
    fn bounding_box_overlap_is_symmetric(a in rect_strategy(), b in rect_strategy()) {
        prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));
    }

    #[test]
    fn quarter_turn_swaps_half_extents(l in 0.5f64..40.0, w in 0.5f64..10.0) {
        let upright = axis_aligned_half_extents(l, w, 0.0);
        let turned = axis_aligned_half_extents(l, w, 90.0);
        prop_assert!((turned.dx - upright.dy).abs() < 1e-9);
        prop_assert!((turned.dy - upright.dx).abs() < 1e-9);
    }

    #[test]
    fn clamping_is_idempotent(
        x in -100.0f64..100.0,
        y in -100.0f64..100.0,
        length in 0.5f64..30.0,
        width in 0.5f64..8.0,
        rotation in 0.0f64..360.0,
        bounds in rect_strategy(),
    ) {
        let fp = Footprint { length, width };
        let once = clamp_to_bounds(Point::new(x, y), fp, rotation, &bounds);
        let twice = clamp_to_bounds(once.position, fp, rotation, &bounds);
        prop_assert_eq!(twice.position, once.position);
        if once.kind != ClampKind::Degenerate {
            prop_assert_eq!(twice.kind, ClampKind::Unchanged);
        }
    }

    #[test]
    fn reconciling_twice_changes_nothing(placements in placements_strategy()) {
        let boats = vec![
            Boat { location_kind: LocationKind::Warehouse, ..Boat::new("a", 8.0, 3.0, 0.5) },
            Boat { location_kind: LocationKind::Dock, ..Boat::new("b", 8.0, 3.0, 0.5) },
            Boat::new("c", 8.0, 3.0, 0.5),
        ];
        let units = vec![
            unit("w1", StorageKind::Warehouse, "POLYGON((0 0, 10 0, 10 10, 0 10))"),
            unit("w2", StorageKind::from("hangar".to_string()), "POLYGON((0 0, 10 0, 10 10, 0 10))"),
            unit("d1", StorageKind::Dock, "LINESTRING(0 0, 40 0)"),
            unit("x1", StorageKind::from("parking".to_string()), "POLYGON((0 0, 10 0, 10 10, 0 10))"),
        ];
        let once = reconcile(&boats, &units, &placements);
        let twice = reconcile(&boats, &units, &once.kept);
        prop_assert_eq!(&twice.kept, &once.kept);
        prop_assert!(twice.removed.is_empty());
        prop_assert_eq!(twice.boat_statuses, once.boat_statuses);
    }

    #[test]
    fn packed_hulls_never_overlap(boats in fleet_strategy(14)) {
        let area = StorageArea::from_unit(&unit(
            "w",
            StorageKind::Warehouse,
            "POLYGON((0 0, 40 0, 40 30, 0 30, 0 0))",
        ))
        .unwrap();
        let mut engine = CollisionEngine::new(CollisionPrecision::Polygon);
        let outcome = pack_warehouse(&area, &mut engine, &boats, &EngineConfig::default());
        prop_assert_eq!(outcome.placed.len() + outcome.unplaced.len(), boats.len());
        let bodies: Vec<_> = engine.boats().collect();
        for (i, a) in bodies.iter().enumerate() {
            prop_assert!(area.bounds().contains_rect(&a.margin_rect()));
            for b in &bodies[i + 1..] {
                prop_assert!(!a.hull_rect().overlaps(&b.hull_rect()), "{} overlaps {}", a.id, b.id);
            }
        }
    }

    #[test]
    fn dock_berths_alternate_sides(boats in fleet_strategy(20)) {
        let area = StorageArea::from_unit(&unit("d", StorageKind::Dock, "LINESTRING(0 0, 80 0)")).unwrap();
        let mut engine = CollisionEngine::new(CollisionPrecision::Polygon);
        let outcome = distribute_dock(&area, &mut engine, &boats, &EngineConfig::default());
        for (i, slot) in outcome.placed.iter().enumerate() {
            let expected = if i % 2 == 0 { 270.0 } else { 90.0 };
            prop_assert_eq!(slot.rotation, expected);
            prop_assert_eq!(slot.position.y < 0.0, i % 2 == 0);
        }
        prop_assert!(engine.recompute_all().iter().all(|r| !r.hull_collision));
    }
}
