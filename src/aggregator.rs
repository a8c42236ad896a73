//! Phase B: fold every operation's `containerDetails` rows into one summary
//! per container number.
//!
//! Precedence is explicit: operations are scanned in array order, rows in
//! array order, and a later meaningful value (non-zero number, non-blank
//! text) always replaces an earlier one. Zero or blank values never erase a
//! value captured from an earlier row.
use crate::fields::{MasterField, ROW_TO_MASTER, SYNCABLE_ROW_FIELDS};
use crate::types::{FieldValue, Operation};
use indexmap::IndexMap;

/// Winning field values for one container.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerAggregate {
    fields: IndexMap<MasterField, FieldValue>,
}

impl ContainerAggregate {
    pub fn get(&self, field: MasterField) -> Option<&FieldValue> {
        self.fields.get(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (MasterField, &FieldValue)> {
        self.fields.iter().map(|(field, value)| (*field, value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Read-only per-container summary, keyed by normalized container number.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedContainerInfo {
    entries: IndexMap<String, ContainerAggregate>,
}

impl AggregatedContainerInfo {
    /// Look up by any spelling of the container number.
    pub fn get(&self, container_no: &str) -> Option<&ContainerAggregate> {
        self.entries
            .get(&crate::converters::normalize_container_no(container_no))
    }

    pub fn container_numbers(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn aggregate(operations: &[Operation]) -> AggregatedContainerInfo {
    let mut info = AggregatedContainerInfo::default();

    for op in operations {
        for row in &op.container_details {
            let key = row.normalized_container_no();
            if key.is_empty() {
                continue;
            }
            let entry = info.entries.entry(key).or_default();
            for row_key in SYNCABLE_ROW_FIELDS {
                let Some(field) = ROW_TO_MASTER.get(row_key).copied() else {
                    continue;
                };
                if let Some(value) = row.field(row_key, field.kind()) {
                    if value.is_meaningful() {
                        entry.fields.insert(field, value);
                    }
                }
            }
        }
    }

    log::debug!("Aggregator: {} containers referenced by operations", info.len());
    info
}
