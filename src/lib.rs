//! Container reconciliation engine for export (DSR) job documents.
//!
//! Keeps the master container list and every operation's linked sections
//! (`containerDetails`, `weighmentDetails`) consistent in both directions:
//!
//! * Phase A ([`mirror`]) aligns the two linked sections inside an operation.
//! * Phase B ([`aggregator`]) summarizes measurement fields per container.
//! * Phase C ([`master_updater`]) folds that summary into the master list.
//! * Phase D ([`operation_updater`]) pushes master identity and values down.
//!
//! [`driver`] sequences the phases to a fixed point. Hosts either call the
//! pure [`reconcile`] after every mutation or hold a [`Reconciler`] session.
pub mod aggregator;
pub mod config;
pub mod converters;
pub mod driver;
pub mod editing;
pub mod errors;
pub mod fields;
pub mod master_updater;
pub mod mirror;
pub mod operation_updater;
pub mod types;

#[cfg(feature = "python")]
mod python;

pub use aggregator::{aggregate, AggregatedContainerInfo, ContainerAggregate};
pub use config::{ConvergenceMode, ReconcileOptions};
pub use driver::{reconcile, step, ChangeKeys, Reconciler, Reconciliation};
pub use editing::SyncStatus;
pub use errors::ReconcilerError;
pub use fields::MasterField;
pub use types::{
    Document, FieldValue, MasterContainer, Operation, Phase, ReconciliationStatus, SectionKind,
    SectionRow,
};

#[cfg(feature = "python")]
use pyo3::prelude::*;

#[cfg(feature = "python")]
#[pymodule]
fn dsr_reconciler(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<python::DocumentReconciler>()?;

    // Phase names as reported in `committed`
    m.add("SECTION_MIRROR", Phase::SectionMirror.to_string())?;
    m.add("MASTER_UPDATE", Phase::MasterUpdate.to_string())?;
    m.add("OPERATION_UPDATE", Phase::OperationUpdate.to_string())?;

    Ok(())
}
