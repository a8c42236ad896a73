//! Structural edits issued by the master and operation editors.
//!
//! These are the only operations that add or remove master containers or
//! section rows. Deletions cascade by container identity so the next Phase D
//! pass never has to infer them from array lengths.
use crate::converters::normalize_container_no;
use crate::errors::ReconcilerError;
use crate::fields::MasterField;
use crate::types::{Document, FieldValue, MasterContainer, Operation, SectionKind, SectionRow};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Synced,
    OutOfSync,
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStatus::Synced => write!(f, "Synced"),
            SyncStatus::OutOfSync => write!(f, "Out of Sync"),
        }
    }
}

/// Give a freshly opened job one empty container and one default operation.
/// Returns true when anything was added.
pub fn ensure_seeded(doc: &mut Document) -> bool {
    let mut seeded = false;
    if doc.containers.is_empty() {
        doc.containers.push(MasterContainer::empty(1));
        seeded = true;
    }
    if doc.operations.is_empty() {
        doc.operations.push(Operation::with_default_rows());
        seeded = true;
    }
    if seeded {
        log::debug!("Editing: seeded empty job");
    }
    seeded
}

/// Re-densify `sequenceNumber` to 1..N.
pub fn renumber_containers(containers: &mut [MasterContainer]) {
    for (i, container) in containers.iter_mut().enumerate() {
        container.sequence_number = (i + 1) as u32;
    }
}

/// Append an empty master container and return its index.
pub fn add_container(doc: &mut Document) -> usize {
    let next = doc.containers.len() + 1;
    doc.containers.push(MasterContainer::empty(next as u32));
    next - 1
}

/// Delete the master container at `index`, cascading by identity into every
/// operation's linked sections. Returns the removed container.
pub fn delete_container(doc: &mut Document, index: usize) -> Result<MasterContainer, ReconcilerError> {
    let len = doc.containers.len();
    if index >= len {
        return Err(ReconcilerError::ContainerOutOfRange { index, len });
    }

    let removed = doc.containers.remove(index);
    let number = removed.normalized_number();
    if number.is_empty() {
        // blank rows have no identity; remove the positional counterpart
        let decoupled = doc.decoupled_mask(true);
        for (op, decoupled) in doc.operations.iter_mut().zip(decoupled) {
            if decoupled {
                continue;
            }
            for kind in [SectionKind::ContainerDetails, SectionKind::WeighmentDetails] {
                let rows = op.section_mut(kind);
                if index < rows.len() && rows[index].normalized_container_no().is_empty() {
                    rows.remove(index);
                }
            }
        }
    } else {
        remove_rows_by_number(&mut doc.operations, &number);
    }

    renumber_containers(&mut doc.containers);
    log::info!(
        "Editing: deleted container #{} '{}', {} remain",
        index + 1,
        removed.container_number,
        doc.containers.len()
    );
    Ok(removed)
}

/// Delete every master container with this number and every linked row that
/// references it. Returns how many master containers were removed.
pub fn delete_container_by_number(doc: &mut Document, container_no: &str) -> usize {
    let number = normalize_container_no(container_no);
    if number.is_empty() {
        return 0;
    }
    let before = doc.containers.len();
    doc.containers.retain(|c| c.normalized_number() != number);
    let removed = before - doc.containers.len();

    remove_rows_by_number(&mut doc.operations, &number);
    renumber_containers(&mut doc.containers);
    log::info!("Editing: deleted '{}' ({} master rows)", number, removed);
    removed
}

fn remove_rows_by_number(operations: &mut [Operation], number: &str) {
    for op in operations {
        for kind in [SectionKind::ContainerDetails, SectionKind::WeighmentDetails] {
            op.section_mut(kind)
                .retain(|row| row.normalized_container_no() != number);
        }
    }
}

/// Append an operation with a default row in every section and return its index.
pub fn add_operation(doc: &mut Document) -> usize {
    doc.operations.push(Operation::with_default_rows());
    doc.operations.len() - 1
}

/// Remove an operation. A job always keeps at least one.
pub fn delete_operation(doc: &mut Document, index: usize) -> Result<Operation, ReconcilerError> {
    let len = doc.operations.len();
    if index >= len {
        return Err(ReconcilerError::OperationOutOfRange { index, len });
    }
    if len == 1 {
        return Err(ReconcilerError::LastOperation);
    }
    Ok(doc.operations.remove(index))
}

fn operation_mut(doc: &mut Document, index: usize) -> Result<&mut Operation, ReconcilerError> {
    let len = doc.operations.len();
    doc.operations
        .get_mut(index)
        .ok_or(ReconcilerError::OperationOutOfRange { index, len })
}

/// The sibling that moves with `kind` in this operation. Dock + LCL
/// operations keep their linked sections independent, so they have none.
fn coupled_sibling(doc: &Document, op_index: usize, kind: SectionKind) -> Result<Option<SectionKind>, ReconcilerError> {
    let len = doc.operations.len();
    let op = doc
        .operations
        .get(op_index)
        .ok_or(ReconcilerError::OperationOutOfRange { index: op_index, len })?;
    Ok(kind.sibling().filter(|_| !doc.is_dock_lcl(op)))
}

/// Append a default row to a section; linked sections grow together.
/// Returns the new row's index.
pub fn add_section_row(doc: &mut Document, op_index: usize, kind: SectionKind) -> Result<usize, ReconcilerError> {
    let sibling = coupled_sibling(doc, op_index, kind)?;
    let op = operation_mut(doc, op_index)?;
    op.section_mut(kind).push(SectionRow::default_for(kind));
    let index = op.section(kind).len() - 1;
    if let Some(sibling) = sibling {
        let rows = op.section_mut(sibling);
        while rows.len() <= index {
            rows.push(SectionRow::default_for(sibling));
        }
    }
    Ok(index)
}

/// Remove a section row. For a linked section the sibling row at the same
/// index goes too, and the removed container number is returned so the host
/// can cascade with [`delete_container_by_number`]. Dock + LCL operations
/// only lose the one row and report nothing to cascade.
pub fn remove_section_row(
    doc: &mut Document,
    op_index: usize,
    kind: SectionKind,
    row_index: usize,
) -> Result<Option<String>, ReconcilerError> {
    let sibling = coupled_sibling(doc, op_index, kind)?;
    let op = operation_mut(doc, op_index)?;
    let len = op.section(kind).len();
    if row_index >= len {
        return Err(ReconcilerError::RowOutOfRange {
            section: kind.to_string(),
            index: row_index,
            len,
        });
    }

    let removed = op.section_mut(kind).remove(row_index);
    if let Some(sibling) = sibling {
        let rows = op.section_mut(sibling);
        if row_index < rows.len() {
            rows.remove(row_index);
        }
        let number = removed.normalized_container_no();
        return Ok((!number.is_empty()).then_some(number));
    }
    Ok(None)
}

/// Edit a syncable field in the master editor. The value is pushed straight
/// to every `containerDetails` row carrying the same container number so
/// the next aggregation does not fold the old row value back over it.
pub fn set_container_field(
    doc: &mut Document,
    index: usize,
    field: MasterField,
    value: FieldValue,
) -> Result<(), ReconcilerError> {
    let len = doc.containers.len();
    let container = doc
        .containers
        .get_mut(index)
        .ok_or(ReconcilerError::ContainerOutOfRange { index, len })?;
    container.set(field, &value);
    container.recompute_derived();
    // rows get the coerced value the master actually stored
    let stored = container.get(field);

    let number = container.normalized_number();
    if number.is_empty() {
        return Ok(());
    }
    let mut touched = 0;
    for op in &mut doc.operations {
        for row in op
            .container_details
            .iter_mut()
            .filter(|row| row.normalized_container_no() == number)
        {
            row.set(field.row_key(), &stored);
            touched += 1;
        }
    }
    log::debug!("Editing: {:?} of '{}' pushed to {} rows", field, number, touched);
    Ok(())
}

/// Coarse sync indicator: every numbered master container should be
/// referenced by the first container row of some operation.
pub fn sync_status(doc: &Document) -> SyncStatus {
    let masters = doc.containers.iter().filter(|c| c.has_number()).count();
    let referenced = doc
        .operations
        .iter()
        .filter(|op| {
            op.container_details
                .first()
                .is_some_and(|row| !row.container_no().trim().is_empty())
        })
        .count();
    if masters == referenced {
        SyncStatus::Synced
    } else {
        SyncStatus::OutOfSync
    }
}
