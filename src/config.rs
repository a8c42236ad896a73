//! Reconciliation options. Every field has a default so hosts can pass a
//! partial JSON object (or Python keyword arguments).
use crate::errors::ReconcilerError;
use serde::{Deserialize, Serialize};

/// How far one reconciliation call goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvergenceMode {
    /// Keep stepping until no phase reports a change (bounded by `max_passes`).
    #[default]
    FixedPoint,
    /// Commit at most one phase per call and wait for the next trigger.
    SingleStep,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileOptions {
    pub mode: ConvergenceMode,
    pub max_passes: usize,
    pub honor_dock_lcl: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        ReconcileOptions {
            mode: ConvergenceMode::FixedPoint,
            max_passes: 8,
            honor_dock_lcl: true,
        }
    }
}

impl ReconcileOptions {
    pub fn single_step() -> Self {
        ReconcileOptions {
            mode: ConvergenceMode::SingleStep,
            ..Default::default()
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self, ReconcilerError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, ReconcilerError> {
        Ok(serde_json::from_value(value)?)
    }
}
