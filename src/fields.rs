//! Field mapping tables between operation section rows and master containers
use phf::phf_map;

pub const CONTAINER_NO: &str = "containerNo";

pub const GROSS_WEIGHT: &str = "grossWeight";
pub const MAX_GROSS_WEIGHT_KGS: &str = "maxGrossWeightKgs";
pub const TARE_WEIGHT_KGS: &str = "tareWeightKgs";
pub const VGM_WT_INVOICE: &str = "vgmWtInvoice";
pub const SHIPPING_LINE_SEAL_NO: &str = "shippingLineSealNo";
pub const CUSTOM_SEAL_NO: &str = "customSealNo";
pub const MAX_PAYLOAD_KGS: &str = "maxPayloadKgs";
pub const CONTAINER_SIZE: &str = "containerSize";
pub const NO_OF_PACKAGES: &str = "noOfPackages";
pub const NET_WEIGHT_KGS: &str = "netWeightKgs";

/// Document-level business-mode flags.
pub const GOODS_STUFFED_AT: &str = "goods_stuffed_at";
pub const CONSIGNMENT_TYPE: &str = "consignmentType";

/// Master container attributes that operations can feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MasterField {
    GrossWeight,
    MaxGrossWeight,
    TareWeight,
    VgmWeight,
    ShippingLineSealNumber,
    SealNumber,
    MaxPayload,
    ContainerSizeType,
    PackagesStuffed,
    NetWeight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Number,
    Text,
}

impl MasterField {
    pub fn kind(self) -> FieldKind {
        match self {
            MasterField::ShippingLineSealNumber
            | MasterField::SealNumber
            | MasterField::ContainerSizeType => FieldKind::Text,
            _ => FieldKind::Number,
        }
    }

    /// Key of the same attribute on a `containerDetails` row.
    pub fn row_key(self) -> &'static str {
        match self {
            MasterField::GrossWeight => GROSS_WEIGHT,
            MasterField::MaxGrossWeight => MAX_GROSS_WEIGHT_KGS,
            MasterField::TareWeight => TARE_WEIGHT_KGS,
            MasterField::VgmWeight => VGM_WT_INVOICE,
            MasterField::ShippingLineSealNumber => SHIPPING_LINE_SEAL_NO,
            MasterField::SealNumber => CUSTOM_SEAL_NO,
            MasterField::MaxPayload => MAX_PAYLOAD_KGS,
            MasterField::ContainerSizeType => CONTAINER_SIZE,
            MasterField::PackagesStuffed => NO_OF_PACKAGES,
            MasterField::NetWeight => NET_WEIGHT_KGS,
        }
    }
}

// Row key -> master attribute, used when folding rows into the aggregate
pub static ROW_TO_MASTER: phf::Map<&'static str, MasterField> = phf_map! {
    "grossWeight" => MasterField::GrossWeight,
    "maxGrossWeightKgs" => MasterField::MaxGrossWeight,
    "tareWeightKgs" => MasterField::TareWeight,
    "vgmWtInvoice" => MasterField::VgmWeight,
    "shippingLineSealNo" => MasterField::ShippingLineSealNumber,
    "customSealNo" => MasterField::SealNumber,
    "maxPayloadKgs" => MasterField::MaxPayload,
    "containerSize" => MasterField::ContainerSizeType,
    "noOfPackages" => MasterField::PackagesStuffed,
    "netWeightKgs" => MasterField::NetWeight,
};

/// Scan order of the syncable row fields. phf maps have no stable iteration
/// order, so precedence-sensitive code walks this slice instead.
pub const SYNCABLE_ROW_FIELDS: [&str; 10] = [
    GROSS_WEIGHT,
    MAX_GROSS_WEIGHT_KGS,
    TARE_WEIGHT_KGS,
    VGM_WT_INVOICE,
    SHIPPING_LINE_SEAL_NO,
    CUSTOM_SEAL_NO,
    MAX_PAYLOAD_KGS,
    CONTAINER_SIZE,
    NO_OF_PACKAGES,
    NET_WEIGHT_KGS,
];

/// Fields copied from the master down into `containerDetails` rows.
pub const DOWNSTREAM_FIELDS: [MasterField; 10] = [
    MasterField::GrossWeight,
    MasterField::MaxGrossWeight,
    MasterField::TareWeight,
    MasterField::PackagesStuffed,
    MasterField::MaxPayload,
    MasterField::VgmWeight,
    MasterField::ContainerSizeType,
    MasterField::ShippingLineSealNumber,
    MasterField::SealNumber,
    MasterField::NetWeight,
];
