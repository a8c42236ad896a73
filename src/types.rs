//! Document model: master containers, operations and their section rows
use crate::converters::{
    compact_number, lenient_number, lenient_records, lenient_sequence, lenient_text, normalize_container_no,
    number_from_value, number_to_value, text_from_value,
};
use crate::errors::ReconcilerError;
use crate::fields::{self, FieldKind, MasterField};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use phf::phf_map;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// A single measurement or seal value, as carried between rows and masters.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Zero numbers and blank text carry no information.
    pub fn is_meaningful(&self) -> bool {
        match self {
            FieldValue::Number(n) => *n != 0.0,
            FieldValue::Text(s) => !s.trim().is_empty(),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Number(n) => number_to_value(*n),
            FieldValue::Text(s) => Value::String(s.clone()),
        }
    }
}

/// One physical shipping container of the job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MasterContainer {
    #[serde(rename = "serialNumber", default, deserialize_with = "lenient_sequence")]
    pub sequence_number: u32,
    #[serde(rename = "containerNo", default, deserialize_with = "lenient_text")]
    pub container_number: String,
    #[serde(rename = "sealNo", default, deserialize_with = "lenient_text")]
    pub seal_number: String,
    #[serde(rename = "sealType", default, deserialize_with = "lenient_text")]
    pub seal_type: String,
    #[serde(rename = "type", default, deserialize_with = "lenient_text")]
    pub container_size_type: String,
    #[serde(rename = "grossWeight", default, deserialize_with = "lenient_number", serialize_with = "compact_number")]
    pub gross_weight: f64,
    #[serde(rename = "maxGrossWeightKgs", default, deserialize_with = "lenient_number", serialize_with = "compact_number")]
    pub max_gross_weight: f64,
    #[serde(rename = "tareWeightKgs", default, deserialize_with = "lenient_number", serialize_with = "compact_number")]
    pub tare_weight: f64,
    #[serde(rename = "grWtPlusTrWt", default, deserialize_with = "lenient_number", serialize_with = "compact_number")]
    pub vgm_weight: f64,
    #[serde(rename = "maxPayloadKgs", default, deserialize_with = "lenient_number", serialize_with = "compact_number")]
    pub max_payload: f64,
    #[serde(rename = "shippingLineSealNo", default, deserialize_with = "lenient_text")]
    pub shipping_line_seal_number: String,
    #[serde(rename = "pkgsStuffed", default, deserialize_with = "lenient_number", serialize_with = "compact_number")]
    pub packages_stuffed: f64,
    #[serde(rename = "netWeight", default, deserialize_with = "lenient_number", serialize_with = "compact_number")]
    pub net_weight: f64,
    /// Everything the master editor owns that this engine never touches
    /// (seal date, RFID, seal device id, ...).
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl MasterContainer {
    pub fn empty(sequence_number: u32) -> Self {
        MasterContainer {
            sequence_number,
            ..Default::default()
        }
    }

    pub fn normalized_number(&self) -> String {
        normalize_container_no(&self.container_number)
    }

    pub fn has_number(&self) -> bool {
        !self.container_number.trim().is_empty()
    }

    /// Gross + tare when either is known, else whatever was stored. A sum
    /// that overflows to infinity also keeps the stored value.
    pub fn effective_vgm(&self) -> f64 {
        let sum = self.gross_weight + self.tare_weight;
        if (self.gross_weight != 0.0 || self.tare_weight != 0.0) && sum.is_finite() {
            sum
        } else {
            self.vgm_weight
        }
    }

    /// Max gross - tare when max gross is known, else whatever was stored.
    pub fn effective_max_payload(&self) -> f64 {
        let payload = self.max_gross_weight - self.tare_weight;
        if self.max_gross_weight != 0.0 && payload.is_finite() {
            payload
        } else {
            self.max_payload
        }
    }

    /// Bring `vgm_weight` and `max_payload` in line with their inputs.
    /// Returns true when either stored value moved.
    pub fn recompute_derived(&mut self) -> bool {
        let vgm = self.effective_vgm();
        let payload = self.effective_max_payload();
        let changed = vgm != self.vgm_weight || payload != self.max_payload;
        self.vgm_weight = vgm;
        self.max_payload = payload;
        changed
    }

    pub fn get(&self, field: MasterField) -> FieldValue {
        match field {
            MasterField::GrossWeight => FieldValue::Number(self.gross_weight),
            MasterField::MaxGrossWeight => FieldValue::Number(self.max_gross_weight),
            MasterField::TareWeight => FieldValue::Number(self.tare_weight),
            MasterField::VgmWeight => FieldValue::Number(self.vgm_weight),
            MasterField::MaxPayload => FieldValue::Number(self.max_payload),
            MasterField::PackagesStuffed => FieldValue::Number(self.packages_stuffed),
            MasterField::NetWeight => FieldValue::Number(self.net_weight),
            MasterField::ShippingLineSealNumber => {
                FieldValue::Text(self.shipping_line_seal_number.clone())
            }
            MasterField::SealNumber => FieldValue::Text(self.seal_number.clone()),
            MasterField::ContainerSizeType => FieldValue::Text(self.container_size_type.clone()),
        }
    }

    /// Value as it should appear on a `containerDetails` row; derived
    /// fields are written in their effective form.
    pub fn downstream_value(&self, field: MasterField) -> FieldValue {
        match field {
            MasterField::VgmWeight => FieldValue::Number(self.effective_vgm()),
            MasterField::MaxPayload => FieldValue::Number(self.effective_max_payload()),
            other => self.get(other),
        }
    }

    /// Write one field. A value of the wrong kind is coerced the same way a
    /// malformed JSON field would be.
    pub fn set(&mut self, field: MasterField, value: &FieldValue) {
        let number = match value {
            FieldValue::Number(n) => *n,
            FieldValue::Text(s) => number_from_value(&Value::String(s.clone())),
        };
        let text = match value {
            FieldValue::Text(s) => s.clone(),
            FieldValue::Number(n) => text_from_value(&number_to_value(*n)),
        };
        match field {
            MasterField::GrossWeight => self.gross_weight = number,
            MasterField::MaxGrossWeight => self.max_gross_weight = number,
            MasterField::TareWeight => self.tare_weight = number,
            MasterField::VgmWeight => self.vgm_weight = number,
            MasterField::MaxPayload => self.max_payload = number,
            MasterField::PackagesStuffed => self.packages_stuffed = number,
            MasterField::NetWeight => self.net_weight = number,
            MasterField::ShippingLineSealNumber => self.shipping_line_seal_number = text,
            MasterField::SealNumber => self.seal_number = text,
            MasterField::ContainerSizeType => self.container_size_type = text,
        }
    }
}

/// One record within an operation section: an ordered bag of named fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionRow(pub IndexMap<String, Value>);

impl SectionRow {
    /// Fresh skeleton row for a section, as the operations editor creates it.
    pub fn default_for(kind: SectionKind) -> Self {
        DEFAULT_ROWS
            .get(kind.json_key())
            .cloned()
            .unwrap_or_default()
    }

    pub fn container_no(&self) -> String {
        self.0
            .get(fields::CONTAINER_NO)
            .map(text_from_value)
            .unwrap_or_default()
    }

    pub fn normalized_container_no(&self) -> String {
        normalize_container_no(&self.container_no())
    }

    pub fn set_container_no(&mut self, number: &str) {
        self.0
            .insert(fields::CONTAINER_NO.to_string(), Value::String(number.to_string()));
    }

    pub fn number(&self, key: &str) -> f64 {
        self.0.get(key).map(number_from_value).unwrap_or(0.0)
    }

    pub fn text(&self, key: &str) -> String {
        self.0.get(key).map(text_from_value).unwrap_or_default()
    }

    /// Read a field leniently, as the kind the master side expects.
    pub fn field(&self, key: &str, kind: FieldKind) -> Option<FieldValue> {
        self.0.get(key).map(|value| match kind {
            FieldKind::Number => FieldValue::Number(number_from_value(value)),
            FieldKind::Text => FieldValue::Text(text_from_value(value)),
        })
    }

    /// Compare against a value leniently: "5000" matches 5000, a missing
    /// field matches zero / blank.
    pub fn matches(&self, key: &str, value: &FieldValue) -> bool {
        match value {
            FieldValue::Number(n) => self.number(key) == *n,
            FieldValue::Text(s) => self.text(key) == *s,
        }
    }

    pub fn set(&mut self, key: &str, value: &FieldValue) {
        self.0.insert(key.to_string(), value.to_json());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    ContainerDetails,
    WeighmentDetails,
    TransporterDetails,
    BookingDetails,
    StatusDetails,
}

static SECTION_NAMES: phf::Map<&'static str, SectionKind> = phf_map! {
    "containerDetails" => SectionKind::ContainerDetails,
    "weighmentDetails" => SectionKind::WeighmentDetails,
    "transporterDetails" => SectionKind::TransporterDetails,
    "bookingDetails" => SectionKind::BookingDetails,
    "statusDetails" => SectionKind::StatusDetails,
};

impl SectionKind {
    pub const ALL: [SectionKind; 5] = [
        SectionKind::TransporterDetails,
        SectionKind::ContainerDetails,
        SectionKind::BookingDetails,
        SectionKind::WeighmentDetails,
        SectionKind::StatusDetails,
    ];

    pub fn json_key(self) -> &'static str {
        match self {
            SectionKind::ContainerDetails => "containerDetails",
            SectionKind::WeighmentDetails => "weighmentDetails",
            SectionKind::TransporterDetails => "transporterDetails",
            SectionKind::BookingDetails => "bookingDetails",
            SectionKind::StatusDetails => "statusDetails",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, ReconcilerError> {
        SECTION_NAMES
            .get(name)
            .copied()
            .ok_or_else(|| ReconcilerError::UnknownSection(name.to_string()))
    }

    /// Linked sections mirror container identity with each other and the master.
    pub fn is_linked(self) -> bool {
        matches!(self, SectionKind::ContainerDetails | SectionKind::WeighmentDetails)
    }

    /// The other half of a linked pair.
    pub fn sibling(self) -> Option<SectionKind> {
        match self {
            SectionKind::ContainerDetails => Some(SectionKind::WeighmentDetails),
            SectionKind::WeighmentDetails => Some(SectionKind::ContainerDetails),
            _ => None,
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.json_key())
    }
}

// Default skeleton rows per section (mirrors the operations editor)
static DEFAULT_ROWS: Lazy<IndexMap<&'static str, SectionRow>> = Lazy::new(|| {
    let rows = [
        (
            "transporterDetails",
            json!({
                "transporterName": "", "vehicleNo": "", "containerNo": "",
                "driverName": "", "contactNo": "", "noOfPackages": 0,
                "netWeightKgs": 0, "grossWeightKgs": 0, "images": []
            }),
        ),
        (
            "containerDetails",
            json!({
                "containerNo": "", "containerSize": "", "containerType": "",
                "cargoType": "GEN", "maxGrossWeightKgs": 0, "tareWeightKgs": 0,
                "maxPayloadKgs": 0, "images": []
            }),
        ),
        (
            "bookingDetails",
            json!({
                "shippingLineName": "", "bookingNo": "", "bookingDate": "",
                "vesselName": "", "voyageNo": "", "portOfLoading": "",
                "handoverLocation": "", "validity": "", "images": []
            }),
        ),
        (
            "weighmentDetails",
            json!({
                "weighBridgeName": "", "regNo": "", "dateTime": "", "vehicleNo": "",
                "containerNo": "", "size": "", "grossWeight": 0, "tareWeight": 0,
                "netWeight": 0, "address": ""
            }),
        ),
        (
            "statusDetails",
            json!({
                "goodsRegistrationDate": "", "rmsLetExportOrderDate": "", "leoUpload": [],
                "stuffingDate": "", "stuffingSheetUpload": [], "eGatePassCopyDate": "",
                "eGatePassUpload": [], "handoverForwardingNoteDate": "",
                "handoverImageUpload": [], "handoverConcorTharSanganaRailRoadDate": "",
                "billingDocsSentDt": "", "billingDocsStatus": null
            }),
        ),
    ];
    rows.into_iter()
        .map(|(key, value)| {
            let row = match value {
                Value::Object(map) => SectionRow(map.into_iter().collect()),
                _ => SectionRow::default(),
            };
            (key, row)
        })
        .collect()
});

/// One operational episode of the job with its independent section collections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(default, deserialize_with = "lenient_records")]
    pub transporter_details: Vec<SectionRow>,
    #[serde(default, deserialize_with = "lenient_records")]
    pub container_details: Vec<SectionRow>,
    #[serde(default, deserialize_with = "lenient_records")]
    pub booking_details: Vec<SectionRow>,
    #[serde(default, deserialize_with = "lenient_records")]
    pub weighment_details: Vec<SectionRow>,
    #[serde(default, deserialize_with = "lenient_records")]
    pub status_details: Vec<SectionRow>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl Operation {
    /// A new operation with one default row in every section.
    pub fn with_default_rows() -> Self {
        let mut op = Operation::default();
        for kind in SectionKind::ALL {
            op.section_mut(kind).push(SectionRow::default_for(kind));
        }
        op
    }

    pub fn section(&self, kind: SectionKind) -> &Vec<SectionRow> {
        match kind {
            SectionKind::ContainerDetails => &self.container_details,
            SectionKind::WeighmentDetails => &self.weighment_details,
            SectionKind::TransporterDetails => &self.transporter_details,
            SectionKind::BookingDetails => &self.booking_details,
            SectionKind::StatusDetails => &self.status_details,
        }
    }

    pub fn section_mut(&mut self, kind: SectionKind) -> &mut Vec<SectionRow> {
        match kind {
            SectionKind::ContainerDetails => &mut self.container_details,
            SectionKind::WeighmentDetails => &mut self.weighment_details,
            SectionKind::TransporterDetails => &mut self.transporter_details,
            SectionKind::BookingDetails => &mut self.booking_details,
            SectionKind::StatusDetails => &mut self.status_details,
        }
    }

    /// Per-operation consignment type, when the operation carries its own.
    pub fn consignment_type(&self) -> Option<String> {
        self.extra
            .get(fields::CONSIGNMENT_TYPE)
            .map(text_from_value)
            .filter(|s| !s.trim().is_empty())
    }
}

/// The slice of a job document this engine reads and writes. All other
/// top-level job fields ride along untouched in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, deserialize_with = "lenient_records")]
    pub containers: Vec<MasterContainer>,
    #[serde(default, deserialize_with = "lenient_records")]
    pub operations: Vec<Operation>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl Document {
    pub fn from_json_str(text: &str) -> Result<Self, ReconcilerError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_value(value: Value) -> Result<Self, ReconcilerError> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_value(&self) -> Result<Value, ReconcilerError> {
        Ok(serde_json::to_value(self)?)
    }

    fn job_text(&self, key: &str) -> String {
        self.extra.get(key).map(text_from_value).unwrap_or_default()
    }

    /// Whether an operation runs in dock-stuffed LCL mode, where its linked
    /// sections are decoupled from the master list.
    pub fn is_dock_lcl(&self, op: &Operation) -> bool {
        let dock = self.job_text(fields::GOODS_STUFFED_AT).trim().eq_ignore_ascii_case("dock");
        let consignment = op
            .consignment_type()
            .unwrap_or_else(|| self.job_text(fields::CONSIGNMENT_TYPE));
        dock && consignment.trim().eq_ignore_ascii_case("lcl")
    }

    /// One flag per operation: true when that operation is decoupled.
    pub fn decoupled_mask(&self, honor_dock_lcl: bool) -> Vec<bool> {
        self.operations
            .iter()
            .map(|op| honor_dock_lcl && self.is_dock_lcl(op))
            .collect()
    }
}

/// Re-entrancy guard state held by the owning session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconciliationStatus {
    #[default]
    Idle,
    Running,
}

/// Phases that can commit a change to the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    SectionMirror,
    MasterUpdate,
    OperationUpdate,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::SectionMirror => write!(f, "SECTION_MIRROR"),
            Phase::MasterUpdate => write!(f, "MASTER_UPDATE"),
            Phase::OperationUpdate => write!(f, "OPERATION_UPDATE"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn master_reads_wire_names_leniently() {
        let master: MasterContainer = serde_json::from_value(json!({
            "serialNumber": 1,
            "containerNo": "abcu1234567",
            "grossWeight": "5000",
            "tareWeightKgs": "",
            "type": "20 STANDARD DRY",
            "rfid": "R-1"
        }))
        .unwrap();
        assert_eq!(master.gross_weight, 5000.0);
        assert_eq!(master.tare_weight, 0.0);
        assert_eq!(master.container_size_type, "20 STANDARD DRY");
        assert_eq!(master.normalized_number(), "ABCU1234567");
        assert_eq!(master.extra.get("rfid"), Some(&json!("R-1")));

        let back = serde_json::to_value(&master).unwrap();
        assert_eq!(back["grossWeight"], json!(5000));
        assert_eq!(back["rfid"], json!("R-1"));
    }

    #[test]
    fn derived_fields_follow_inputs() {
        let mut master = MasterContainer {
            gross_weight: 5000.0,
            tare_weight: 2200.0,
            ..Default::default()
        };
        assert!(master.recompute_derived());
        assert_eq!(master.vgm_weight, 7200.0);
        assert_eq!(master.max_payload, 0.0);

        master.max_gross_weight = 30480.0;
        assert!(master.recompute_derived());
        assert_eq!(master.max_payload, 28280.0);
        assert!(!master.recompute_derived());
    }

    #[test]
    fn stored_vgm_survives_without_inputs() {
        let master = MasterContainer {
            vgm_weight: 9100.0,
            ..Default::default()
        };
        assert_eq!(master.effective_vgm(), 9100.0);
    }

    #[test]
    fn overflowing_sums_keep_stored_values() {
        let mut master = MasterContainer {
            gross_weight: 1e308,
            tare_weight: 1e308,
            max_gross_weight: -1e308,
            vgm_weight: 12.0,
            ..Default::default()
        };
        assert_eq!(master.effective_vgm(), 12.0);
        assert_eq!(master.effective_max_payload(), 0.0);
        assert!(!master.recompute_derived());
    }

    #[test]
    fn null_and_non_object_records_decode() {
        let doc = Document::from_value(json!({
            "containers": null,
            "operations": [
                {"containerDetails": null, "weighmentDetails": [null, {"containerNo": "A"}, 7]},
                null
            ]
        }))
        .unwrap();
        assert!(doc.containers.is_empty());
        assert_eq!(doc.operations.len(), 1);
        assert!(doc.operations[0].container_details.is_empty());
        assert_eq!(doc.operations[0].weighment_details.len(), 1);
        assert_eq!(doc.operations[0].weighment_details[0].container_no(), "A");

        let doc = Document::from_value(json!({"containers": [null, {"containerNo": "B"}]})).unwrap();
        assert_eq!(doc.containers.len(), 1);
        assert_eq!(doc.containers[0].container_number, "B");
    }

    #[test]
    fn new_operation_has_one_row_per_section() {
        let op = Operation::with_default_rows();
        for kind in SectionKind::ALL {
            assert_eq!(op.section(kind).len(), 1, "{kind}");
        }
        assert_eq!(op.container_details[0].text("cargoType"), "GEN");
    }

    #[test]
    fn dock_lcl_respects_operation_override() {
        let doc: Document = serde_json::from_value(json!({
            "goods_stuffed_at": "Dock",
            "consignmentType": "lcl",
            "operations": [{}, {"consignmentType": "FCL"}]
        }))
        .unwrap();
        assert_eq!(doc.decoupled_mask(true), vec![true, false]);
        assert_eq!(doc.decoupled_mask(false), vec![false, false]);
    }

    #[test]
    fn unknown_section_is_an_error() {
        assert!(SectionKind::from_name("containerDetails").is_ok());
        assert!(matches!(
            SectionKind::from_name("invoices"),
            Err(ReconcilerError::UnknownSection(_))
        ));
    }
}
