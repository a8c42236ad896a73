//! Reconciliation driver: sequences the phases, detects the fixed point and
//! guards against re-entrant triggering.
//!
//! One *step* runs Phase A; if it changed anything the step commits and
//! ends. Otherwise Phases B + C run; a master change commits and ends the
//! step (its effect on operations is picked up by the next step's Phase D).
//! Otherwise Phase D runs and commits if it changed anything. A step that
//! commits nothing means the document is at a fixed point.
use crate::aggregator::aggregate;
use crate::config::{ConvergenceMode, ReconcileOptions};
use crate::master_updater::MasterUpdater;
use crate::mirror::mirror_operations;
use crate::operation_updater::OperationUpdater;
use crate::types::{Document, Phase, ReconciliationStatus};
use serde_json::{json, Value};
use std::borrow::Cow;

/// Result of one reconciliation call.
#[derive(Debug, Clone)]
pub struct Reconciliation<'a> {
    /// Borrowed when nothing changed, so hosts can skip re-rendering.
    pub document: Cow<'a, Document>,
    /// Phases that committed, in order.
    pub committed: Vec<Phase>,
    /// Steps evaluated, including the final confirming one.
    pub passes: usize,
    /// True when the last step committed nothing.
    pub converged: bool,
}

impl<'a> Reconciliation<'a> {
    pub fn changed(&self) -> bool {
        matches!(self.document, Cow::Owned(_))
    }

    pub fn into_document(self) -> Document {
        self.document.into_owned()
    }
}

/// Run a single step. Returns the committing phase and the new document,
/// or None at a fixed point.
pub fn step(document: &Document, options: &ReconcileOptions) -> Option<(Phase, Document)> {
    let decoupled = document.decoupled_mask(options.honor_dock_lcl);

    if let Cow::Owned(operations) = mirror_operations(&document.operations, &decoupled) {
        return Some((
            Phase::SectionMirror,
            Document {
                operations,
                ..document.clone()
            },
        ));
    }

    let info = aggregate(&document.operations);
    if let Cow::Owned(containers) = MasterUpdater::new(&document.containers, &info).run() {
        return Some((
            Phase::MasterUpdate,
            Document {
                containers,
                ..document.clone()
            },
        ));
    }

    if let Cow::Owned(operations) =
        OperationUpdater::new(&document.containers, &document.operations, &decoupled).run()
    {
        return Some((
            Phase::OperationUpdate,
            Document {
                operations,
                ..document.clone()
            },
        ));
    }

    None
}

/// Pure entry point: reconcile a document according to `options`.
pub fn reconcile<'a>(document: &'a Document, options: &ReconcileOptions) -> Reconciliation<'a> {
    let mut current: Cow<'a, Document> = Cow::Borrowed(document);
    let mut committed = Vec::new();
    let mut passes = 0;
    let mut converged = false;
    let limit = match options.mode {
        ConvergenceMode::FixedPoint => options.max_passes.max(1),
        ConvergenceMode::SingleStep => 1,
    };

    while passes < limit {
        passes += 1;
        match step(&current, options) {
            Some((phase, next)) => {
                log::info!("Reconciler: pass {} committed {}", passes, phase);
                committed.push(phase);
                current = Cow::Owned(next);
            }
            None => {
                converged = true;
                break;
            }
        }
    }

    if converged {
        log::debug!(
            "Reconciler: fixed point after {} passes ({} commits)",
            passes,
            committed.len()
        );
    } else if options.mode == ConvergenceMode::FixedPoint {
        log::warn!(
            "Reconciler: no fixed point within {} passes, committed {:?}",
            limit,
            committed
        );
    }

    Reconciliation {
        document: current,
        committed,
        passes,
        converged,
    }
}

/// Normalized serializations of exactly what the phases read. Edits to any
/// other part of the document leave these unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeKeys {
    linked: String,
    masters: String,
    measurements: String,
}

impl ChangeKeys {
    pub fn of(document: &Document, options: &ReconcileOptions) -> Self {
        let decoupled = document.decoupled_mask(options.honor_dock_lcl);

        let linked: Vec<Value> = document
            .operations
            .iter()
            .zip(&decoupled)
            .map(|(op, decoupled)| {
                json!([
                    decoupled,
                    op.container_details.iter().map(|r| r.container_no()).collect::<Vec<_>>(),
                    op.weighment_details.iter().map(|r| r.container_no()).collect::<Vec<_>>(),
                ])
            })
            .collect();

        let masters: Vec<Value> = document
            .containers
            .iter()
            .map(|m| {
                json!([
                    m.sequence_number,
                    m.container_number,
                    m.gross_weight,
                    m.max_gross_weight,
                    m.tare_weight,
                    m.vgm_weight,
                    m.max_payload,
                    m.packages_stuffed,
                    m.net_weight,
                    m.seal_number,
                    m.shipping_line_seal_number,
                    m.container_size_type,
                ])
            })
            .collect();

        let measurements: Vec<Value> = document
            .operations
            .iter()
            .map(|op| {
                op.container_details
                    .iter()
                    .map(|row| {
                        crate::fields::SYNCABLE_ROW_FIELDS
                            .iter()
                            .map(|key| row.get(key).cloned().unwrap_or(Value::Null))
                            .collect::<Value>()
                    })
                    .collect::<Value>()
            })
            .collect();

        ChangeKeys {
            linked: Value::Array(linked).to_string(),
            masters: Value::Array(masters).to_string(),
            measurements: Value::Array(measurements).to_string(),
        }
    }
}

/// Stateful session for reactive hosts that call in after every mutation.
#[derive(Debug, Default)]
pub struct Reconciler {
    status: ReconciliationStatus,
    options: ReconcileOptions,
    settled: Option<ChangeKeys>,
}

impl Reconciler {
    pub fn new(options: ReconcileOptions) -> Self {
        log::debug!("Reconciler: initialized with {:?}", options);
        Reconciler {
            status: ReconciliationStatus::Idle,
            options,
            settled: None,
        }
    }

    pub fn status(&self) -> ReconciliationStatus {
        self.status
    }

    pub fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    /// React to a document change.
    ///
    /// Returns None while the guard is held (our own commit is still being
    /// applied) or when nothing the phases read has changed since the last
    /// fixed point. When the result commits something the guard stays held
    /// until `release` is called.
    pub fn on_change<'a>(&mut self, document: &'a Document) -> Option<Reconciliation<'a>> {
        if self.status == ReconciliationStatus::Running {
            log::debug!("Reconciler: change ignored, commit in flight");
            return None;
        }

        let keys = ChangeKeys::of(document, &self.options);
        if self.settled.as_ref() == Some(&keys) {
            log::trace!("Reconciler: relevant inputs unchanged");
            return None;
        }

        self.status = ReconciliationStatus::Running;
        let result = reconcile(document, &self.options);

        // Only a fixed point is remembered; a single-step commit must still
        // be reconciled further on the next trigger.
        self.settled = if result.converged {
            Some(ChangeKeys::of(&result.document, &self.options))
        } else {
            None
        };
        if !result.changed() {
            self.status = ReconciliationStatus::Idle;
        }
        Some(result)
    }

    /// Deferred guard release, called once the host has applied a commit.
    pub fn release(&mut self) {
        if self.status == ReconciliationStatus::Running {
            log::trace!("Reconciler: guard released");
        }
        self.status = ReconciliationStatus::Idle;
    }

    /// Forget the last fixed point, e.g. after loading a different job.
    pub fn reset(&mut self) {
        self.status = ReconciliationStatus::Idle;
        self.settled = None;
    }
}
