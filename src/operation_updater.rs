//! Phase D: push the master list's existence, order and values down into
//! every operation's linked sections.
use crate::converters::normalize_container_no;
use crate::fields::DOWNSTREAM_FIELDS;
use crate::types::{MasterContainer, Operation, SectionKind, SectionRow};
use std::borrow::Cow;

pub struct OperationUpdater<'a> {
    masters: &'a [MasterContainer],
    operations: &'a [Operation],
    decoupled: &'a [bool],
    targets: Vec<String>,
}

impl<'a> OperationUpdater<'a> {
    pub fn new(
        masters: &'a [MasterContainer],
        operations: &'a [Operation],
        decoupled: &'a [bool],
    ) -> Self {
        // an empty master list still keeps one blank linked row, matching
        // the one-row minimum the section mirror maintains
        let targets = if masters.is_empty() {
            vec![String::new()]
        } else {
            masters.iter().map(MasterContainer::normalized_number).collect()
        };
        OperationUpdater {
            masters,
            operations,
            decoupled,
            targets,
        }
    }

    /// Borrowed output means every operation already matched the master list.
    pub fn run(&self) -> Cow<'a, [Operation]> {
        let mut updated: Option<Vec<Operation>> = None;

        for (i, op) in self.operations.iter().enumerate() {
            let decoupled = self.decoupled.get(i).copied().unwrap_or(false);
            if let Some(next) = self.update_operation(op, decoupled) {
                log::debug!(
                    "OperationUpdater: operation {} synced to {} master containers{}",
                    i,
                    self.masters.len(),
                    if decoupled { " (decoupled)" } else { "" }
                );
                updated.get_or_insert_with(|| self.operations.to_vec())[i] = next;
            }
        }

        match updated {
            Some(ops) => Cow::Owned(ops),
            None => Cow::Borrowed(self.operations),
        }
    }

    fn update_operation(&self, op: &Operation, decoupled: bool) -> Option<Operation> {
        let mut next: Option<Operation> = None;

        if !decoupled {
            for kind in [SectionKind::ContainerDetails, SectionKind::WeighmentDetails] {
                if let Some(rows) = self.align_section(op.section(kind), kind) {
                    *next.get_or_insert_with(|| op.clone()).section_mut(kind) = rows;
                }
            }
        }

        let current = next.as_ref().unwrap_or(op);
        if let Some(rows) = self.copy_measurements(&current.container_details, decoupled) {
            next.get_or_insert_with(|| op.clone()).container_details = rows;
        }

        next
    }

    /// Rebuild a linked section so row `i` belongs to master `i`.
    ///
    /// Rows are matched by container number first, so a reordered or
    /// shortened master list keeps each row's own data. Slots with no match
    /// reuse the unclaimed row at the same index, else a default row.
    /// Unclaimed leftovers are dropped.
    fn align_section(&self, rows: &[SectionRow], kind: SectionKind) -> Option<Vec<SectionRow>> {
        let row_numbers: Vec<String> = rows.iter().map(SectionRow::normalized_container_no).collect();
        let mut used = vec![false; rows.len()];
        let mut picks: Vec<Option<usize>> = vec![None; self.targets.len()];

        for (slot, number) in self.targets.iter().enumerate() {
            if number.is_empty() {
                continue;
            }
            let found = row_numbers
                .iter()
                .enumerate()
                .position(|(j, candidate)| !used[j] && candidate == number);
            if let Some(j) = found {
                used[j] = true;
                picks[slot] = Some(j);
            }
        }
        for (slot, pick) in picks.iter_mut().enumerate() {
            if pick.is_none() && slot < rows.len() && !used[slot] {
                used[slot] = true;
                *pick = Some(slot);
            }
        }

        let aligned: Vec<SectionRow> = picks
            .iter()
            .zip(&self.targets)
            .map(|(pick, number)| {
                let mut row = match pick {
                    Some(j) => rows[*j].clone(),
                    None => SectionRow::default_for(kind),
                };
                if row.container_no() != *number {
                    row.set_container_no(number);
                }
                row
            })
            .collect();

        if aligned.as_slice() == rows {
            None
        } else {
            let dropped = used.iter().filter(|u| !**u).count();
            log::trace!(
                "OperationUpdater: {} {} -> {} rows ({} dropped)",
                kind,
                rows.len(),
                aligned.len(),
                dropped
            );
            Some(aligned)
        }
    }

    /// Copy master measurements onto `containerDetails` rows. Aligned
    /// sections pair row `i` with master `i`; decoupled ones pair by number.
    fn copy_measurements(&self, rows: &[SectionRow], decoupled: bool) -> Option<Vec<SectionRow>> {
        let mut updated: Option<Vec<SectionRow>> = None;

        for (i, row) in rows.iter().enumerate() {
            let master = if decoupled {
                let number = row.normalized_container_no();
                if number.is_empty() {
                    None
                } else {
                    self.masters
                        .iter()
                        .find(|m| normalize_container_no(&m.container_number) == number)
                }
            } else {
                self.masters.get(i)
            };
            let Some(master) = master else {
                continue;
            };

            let stale = DOWNSTREAM_FIELDS
                .iter()
                .any(|field| !row.matches(field.row_key(), &master.downstream_value(*field)));
            if !stale {
                continue;
            }

            let target = &mut updated.get_or_insert_with(|| rows.to_vec())[i];
            for field in DOWNSTREAM_FIELDS {
                target.set(field.row_key(), &master.downstream_value(field));
            }
        }

        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn masters(value: serde_json::Value) -> Vec<MasterContainer> {
        serde_json::from_value(value).unwrap()
    }

    fn ops(value: serde_json::Value) -> Vec<Operation> {
        serde_json::from_value(value).unwrap()
    }

    fn numbers(rows: &[SectionRow]) -> Vec<String> {
        rows.iter().map(SectionRow::container_no).collect()
    }

    #[test]
    fn fills_number_and_copies_weights() {
        let list = masters(json!([{"containerNo": "abcu1234567", "grossWeight": 5000, "tareWeightKgs": 2200, "type": "20 REEFER"}]));
        let operations = ops(json!([{
            "containerDetails": [{"containerNo": "", "grossWeight": 1}],
            "weighmentDetails": [{"containerNo": ""}]
        }]));
        let out = OperationUpdater::new(&list, &operations, &[false]).run();
        let row = &out[0].container_details[0];
        assert_eq!(row.container_no(), "ABCU1234567");
        assert_eq!(row.number("grossWeight"), 5000.0);
        assert_eq!(row.number("vgmWtInvoice"), 7200.0);
        assert_eq!(row.text("containerSize"), "20 REEFER");
        assert_eq!(out[0].weighment_details[0].container_no(), "ABCU1234567");
    }

    #[test]
    fn grows_and_truncates_to_master_length() {
        let list = masters(json!([{"containerNo": "A"}, {"containerNo": "B"}, {"containerNo": "C"}]));
        let operations = ops(json!([
            {"containerDetails": [{"containerNo": "A"}], "weighmentDetails": [{"containerNo": "A"}]},
            {"containerDetails": [{"containerNo": "A"}, {"containerNo": "B"}, {"containerNo": "C"}, {"containerNo": "D"}],
             "weighmentDetails": [{"containerNo": "A"}, {"containerNo": "B"}, {"containerNo": "C"}, {"containerNo": "D"}]}
        ]));
        let out = OperationUpdater::new(&list, &operations, &[false, false]).run();
        for op in out.iter() {
            assert_eq!(numbers(&op.container_details), vec!["A", "B", "C"]);
            assert_eq!(numbers(&op.weighment_details), vec!["A", "B", "C"]);
        }
    }

    #[test]
    fn reordered_master_moves_rows_with_their_data() {
        let list = masters(json!([{"containerNo": "B"}, {"containerNo": "A"}]));
        let operations = ops(json!([{
            "containerDetails": [{"containerNo": "A", "cargoType": "HAZ"}, {"containerNo": "B", "cargoType": "GEN"}],
            "weighmentDetails": [{"containerNo": "A", "regNo": "1"}, {"containerNo": "B", "regNo": "2"}]
        }]));
        let out = OperationUpdater::new(&list, &operations, &[false]).run();
        assert_eq!(out[0].container_details[0].text("cargoType"), "GEN");
        assert_eq!(out[0].container_details[1].text("cargoType"), "HAZ");
        assert_eq!(out[0].weighment_details[1].text("regNo"), "1");
    }

    #[test]
    fn decoupled_operation_keeps_structure_but_gets_values() {
        let list = masters(json!([{"containerNo": "A", "grossWeight": 800}]));
        let operations = ops(json!([{
            "containerDetails": [{"containerNo": "X"}, {"containerNo": "a"}],
            "weighmentDetails": []
        }]));
        let out = OperationUpdater::new(&list, &operations, &[true]).run();
        assert_eq!(numbers(&out[0].container_details), vec!["X", "a"]);
        assert!(out[0].weighment_details.is_empty());
        assert_eq!(out[0].container_details[0].number("grossWeight"), 0.0);
        assert_eq!(out[0].container_details[1].number("grossWeight"), 800.0);
    }

    #[test]
    fn empty_master_collapses_to_one_blank_row() {
        let operations = ops(json!([{
            "containerDetails": [{"containerNo": "A", "cargoType": "HAZ"}, {"containerNo": "B"}],
            "weighmentDetails": [{"containerNo": "A"}, {"containerNo": "B"}]
        }]));
        let out = OperationUpdater::new(&[], &operations, &[false]).run();
        assert_eq!(numbers(&out[0].container_details), vec![""]);
        assert_eq!(out[0].container_details[0].text("cargoType"), "HAZ");
        assert_eq!(numbers(&out[0].weighment_details), vec![""]);
    }

    #[test]
    fn matching_string_values_are_not_rewritten() {
        let list = masters(json!([{"containerNo": "A", "grossWeight": 5000}]));
        let operations = ops(json!([{
            "containerDetails": [{
                "containerNo": "A", "grossWeight": "5000", "maxGrossWeightKgs": 0, "tareWeightKgs": 0,
                "noOfPackages": 0, "maxPayloadKgs": 0, "vgmWtInvoice": "5000", "containerSize": "",
                "shippingLineSealNo": "", "customSealNo": ""
            }],
            "weighmentDetails": [{"containerNo": "A"}]
        }]));
        let out = OperationUpdater::new(&list, &operations, &[false]).run();
        assert!(matches!(out, Cow::Borrowed(_)));
    }
}
