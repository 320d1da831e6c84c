use serde::{Deserialize, Serialize};

use crate::selection::SelectionExtra;

/// Outward notifications of the map component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChartEvent {
    Ready,
    Error(ChartErrorEvent),
    Select(ChartSelectEvent),
}

impl ChartEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Error(_) => "error",
            Self::Select(_) => "select",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChartSelectEvent {
    pub selected: bool,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    pub country: String,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<Vec<SelectionExtra>>,
}

impl ChartSelectEvent {
    pub fn deselected() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartErrorCode {
    Loading,
}

/// Either a fixed error code or a caller-defined identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChartErrorId {
    Code(ChartErrorCode),
    Custom(String),
}

impl From<ChartErrorCode> for ChartErrorId {
    fn from(code: ChartErrorCode) -> Self {
        Self::Code(code)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartErrorEvent {
    pub id: ChartErrorId,
    pub message: String,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detailed_message: Option<String>,
}
