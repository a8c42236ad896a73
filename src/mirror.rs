//! Phase A: keep `containerDetails` and `weighmentDetails` of one operation
//! the same length, with matching container numbers at every index.
use crate::types::{Operation, SectionKind, SectionRow};
use std::borrow::Cow;

/// Mirror the linked sections of a single operation. Borrowed output means
/// the operation was already aligned.
pub fn mirror_operation(op: &Operation) -> Cow<'_, Operation> {
    let cd = &op.container_details;
    let wd = &op.weighment_details;
    let n = cd.len().max(wd.len()).max(1);

    let aligned = cd.len() == n
        && wd.len() == n
        && cd.iter().zip(wd).all(|(c, w)| c.container_no() == w.container_no());
    if aligned {
        return Cow::Borrowed(op);
    }

    let mut next = op.clone();
    next.container_details
        .resize_with(n, || SectionRow::default_for(SectionKind::ContainerDetails));
    next.weighment_details
        .resize_with(n, || SectionRow::default_for(SectionKind::WeighmentDetails));

    for (i, (c, w)) in next
        .container_details
        .iter_mut()
        .zip(next.weighment_details.iter_mut())
        .enumerate()
    {
        let from_cd = c.container_no();
        let from_wd = w.container_no();
        if from_cd == from_wd {
            continue;
        }
        // container details win a tie between two non-empty values
        let winner = if from_cd.trim().is_empty() { from_wd } else { from_cd };
        log::trace!("SectionMirror: row {} containerNo -> '{}'", i, winner);
        c.set_container_no(&winner);
        w.set_container_no(&winner);
    }

    Cow::Owned(next)
}

/// Run Phase A across every operation, skipping decoupled (dock + LCL) ones.
pub fn mirror_operations<'a>(operations: &'a [Operation], decoupled: &[bool]) -> Cow<'a, [Operation]> {
    let mut changed: Option<Vec<Operation>> = None;

    for (i, op) in operations.iter().enumerate() {
        if decoupled.get(i).copied().unwrap_or(false) {
            continue;
        }
        if let Cow::Owned(mirrored) = mirror_operation(op) {
            log::debug!(
                "SectionMirror: operation {} realigned ({} rows)",
                i,
                mirrored.container_details.len()
            );
            changed.get_or_insert_with(|| operations.to_vec())[i] = mirrored;
        }
    }

    match changed {
        Some(ops) => Cow::Owned(ops),
        None => Cow::Borrowed(operations),
    }
}
