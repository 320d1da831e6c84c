use thiserror::Error;

use crate::events::{ChartErrorCode, ChartErrorEvent};

pub const LOADING_ERROR_MESSAGE: &str = "Could not load";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    #[error("unrecognized color {0:?}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SvgError {
    #[error("unexpected end of document")]
    UnexpectedEof,
    #[error("malformed markup at byte {0}")]
    Malformed(usize),
    #[error("closing tag </{found}> does not match <{expected}>")]
    MismatchedTag { expected: String, found: String },
    #[error("document has no root element")]
    NoRootElement,
}

/// Failure of a render pass. Always reported through a [`ChartErrorEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("map document is not available")]
    DocumentUnavailable,
    #[error("invalid {option}: {source}")]
    InvalidColor {
        option: &'static str,
        #[source]
        source: ColorError,
    },
}

impl RenderError {
    pub fn to_chart_error(&self) -> ChartErrorEvent {
        ChartErrorEvent {
            id: ChartErrorCode::Loading.into(),
            message: LOADING_ERROR_MESSAGE.to_owned(),
            detailed_message: Some(self.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ChartErrorId;

    #[test]
    fn render_error_converts_to_loading_event() {
        let event = RenderError::InvalidColor {
            option: "min_color",
            source: ColorError::Invalid("blurple".into()),
        }
        .to_chart_error();

        assert_eq!(event.id, ChartErrorId::Code(ChartErrorCode::Loading));
        assert_eq!(event.message, "Could not load");
        assert_eq!(
            event.detailed_message.as_deref(),
            Some("invalid min_color: unrecognized color \"blurple\"")
        );
    }
}
