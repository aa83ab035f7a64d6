use crate::types::TranslationUnit;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parses one front-end dump.
pub fn parse_tu(json: &str) -> Result<TranslationUnit, ParseError> {
    Ok(serde_json::from_str(json)?)
}
