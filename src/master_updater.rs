//! Phase C: merge the aggregate into the master container list.
//!
//! Pure field-value merge. The set and order of master containers never
//! changes here; the master editor alone decides which containers exist.
use crate::aggregator::{AggregatedContainerInfo, ContainerAggregate};
use crate::types::MasterContainer;
use std::borrow::Cow;

pub struct MasterUpdater<'a> {
    masters: &'a [MasterContainer],
    aggregate: &'a AggregatedContainerInfo,
}

impl<'a> MasterUpdater<'a> {
    pub fn new(masters: &'a [MasterContainer], aggregate: &'a AggregatedContainerInfo) -> Self {
        MasterUpdater { masters, aggregate }
    }

    /// Borrowed output means nothing changed.
    pub fn run(&self) -> Cow<'a, [MasterContainer]> {
        let mut updated: Option<Vec<MasterContainer>> = None;

        for (i, master) in self.masters.iter().enumerate() {
            let entry = if master.has_number() {
                self.aggregate.get(&master.container_number)
            } else {
                None
            };
            let mut next = match entry {
                Some(entry) => self.merge(master, entry),
                None => master.clone(),
            };
            // derived weights and position are normalized for every container
            next.recompute_derived();
            next.sequence_number = (i + 1) as u32;

            if next == *master {
                continue;
            }
            log::debug!(
                "MasterUpdater: container #{} '{}' updated",
                next.sequence_number,
                next.container_number
            );
            updated.get_or_insert_with(|| self.masters.to_vec())[i] = next;
        }

        match updated {
            Some(list) => Cow::Owned(list),
            None => Cow::Borrowed(self.masters),
        }
    }

    /// Copy of `master` with every differing aggregate field replaced.
    fn merge(&self, master: &MasterContainer, entry: &ContainerAggregate) -> MasterContainer {
        let mut candidate = master.clone();
        for (field, value) in entry.iter() {
            let current = candidate.get(field);
            if current != *value {
                log::trace!(
                    "MasterUpdater: {} {:?} {:?} -> {:?}",
                    master.container_number,
                    field,
                    current,
                    value
                );
                candidate.set(field, value);
            }
        }
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::aggregate;
    use crate::types::Operation;
    use serde_json::json;

    fn masters(value: serde_json::Value) -> Vec<MasterContainer> {
        serde_json::from_value(value).unwrap()
    }

    fn ops(value: serde_json::Value) -> Vec<Operation> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn applies_weights_and_derives_vgm() {
        let list = masters(json!([{"serialNumber": 1, "containerNo": "ABCU1234567", "maxGrossWeightKgs": 30480}]));
        let info = aggregate(&ops(json!([
            {"containerDetails": [{"containerNo": "abcu1234567", "grossWeight": 5000, "tareWeightKgs": 2200}]}
        ])));
        let out = MasterUpdater::new(&list, &info).run();
        assert!(matches!(out, Cow::Owned(_)));
        assert_eq!(out[0].gross_weight, 5000.0);
        assert_eq!(out[0].tare_weight, 2200.0);
        assert_eq!(out[0].vgm_weight, 7200.0);
        assert_eq!(out[0].max_payload, 28280.0);
    }

    #[test]
    fn never_adds_or_removes_containers() {
        let list = masters(json!([
            {"serialNumber": 1, "containerNo": "A"},
            {"serialNumber": 2, "containerNo": ""},
            {"serialNumber": 3, "containerNo": "C", "sealNo": "OLD"}
        ]));
        let info = aggregate(&ops(json!([
            {"containerDetails": [{"containerNo": "Z", "grossWeight": 1}, {"containerNo": "C", "customSealNo": "NEW"}]}
        ])));
        let out = MasterUpdater::new(&list, &info).run();
        let numbers: Vec<_> = out.iter().map(|m| m.container_number.as_str()).collect();
        assert_eq!(numbers, vec!["A", "", "C"]);
        assert_eq!(out[2].seal_number, "NEW");
        assert_eq!(out[0], list[0]);
    }

    #[test]
    fn fields_without_aggregate_data_are_kept() {
        let list = masters(json!([{"serialNumber": 1, "containerNo": "A", "grossWeight": 900, "sealNo": "S"}]));
        let info = aggregate(&ops(json!([{"containerDetails": [{"containerNo": "A", "noOfPackages": 12}]}])));
        let out = MasterUpdater::new(&list, &info).run();
        assert_eq!(out[0].gross_weight, 900.0);
        assert_eq!(out[0].seal_number, "S");
        assert_eq!(out[0].packages_stuffed, 12.0);
    }

    #[test]
    fn unchanged_list_is_borrowed() {
        let list = masters(json!([{"serialNumber": 1, "containerNo": "A", "grossWeight": 10, "grWtPlusTrWt": 10}]));
        let info = aggregate(&ops(json!([{"containerDetails": [{"containerNo": "A", "grossWeight": 10}]}])));
        assert!(matches!(MasterUpdater::new(&list, &info).run(), Cow::Borrowed(_)));
    }

    #[test]
    fn sequence_numbers_are_densified() {
        let list = masters(json!([
            {"serialNumber": 3, "containerNo": "A"},
            {"serialNumber": 7, "containerNo": "B"}
        ]));
        let info = AggregatedContainerInfo::default();
        let out = MasterUpdater::new(&list, &info).run();
        assert_eq!(out.iter().map(|m| m.sequence_number).collect::<Vec<_>>(), vec![1, 2]);
    }
}
