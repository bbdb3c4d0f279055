//! Boat storage yard placement and collision engine.
//!
//! Boats are kept in warehouses (polygons) or along docks (polylines). The
//! engine validates positions against hull and safety-margin overlap,
//! suggests and packs placements, and repairs drifted placement data.
//!
//! With the `python` feature the batch transforms are importable from
//! Python as `*_json` functions taking and returning JSON strings.

pub mod batch;
pub mod collision;
pub mod config;
pub mod error;
pub mod geometry;
pub mod maintenance;
pub mod packing;
pub mod reconcile;
pub mod render;
pub mod search;
pub mod storage;
pub mod types;

#[cfg(feature = "python")]
mod python {
    use pyo3::prelude::*;

    use crate::batch::{run_json, Operation};

    fn run(op: Operation, input_json: &str) -> PyResult<String> {
        run_json(&op, input_json).map_err(|e| {
            PyErr::new::<pyo3::exceptions::PyValueError, _>(format!("{op:?} failed: {e}"))
        })
    }

    /// Deduplicate placements. Takes and returns batch JSON.
    #[pyfunction]
    fn reconcile_json(input_json: &str) -> PyResult<String> {
        run(Operation::Reconcile, input_json)
    }

    /// Re-layout one storage unit, or all of them when `unit` is None.
    #[pyfunction]
    #[pyo3(signature = (input_json, unit=None))]
    fn layout_json(input_json: &str, unit: Option<String>) -> PyResult<String> {
        run(Operation::Layout { unit }, input_json)
    }

    /// Pull out-of-bounds placements back inside their storage unit.
    #[pyfunction]
    fn clamp_json(input_json: &str) -> PyResult<String> {
        run(Operation::Clamp, input_json)
    }

    /// Report hull collisions and out-of-bounds placements per unit and level.
    #[pyfunction]
    fn audit_json(input_json: &str) -> PyResult<String> {
        run(Operation::Audit, input_json)
    }

    #[pymodule]
    fn yard_engine(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(reconcile_json, m)?)?;
        m.add_function(wrap_pyfunction!(layout_json, m)?)?;
        m.add_function(wrap_pyfunction!(clamp_json, m)?)?;
        m.add_function(wrap_pyfunction!(audit_json, m)?)?;
        Ok(())
    }
}
