/// Errors produced when parsing commit ids.
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("invalid hex character at position {position}: '{character}'")]
    InvalidHex { position: usize, character: char },

    #[error("invalid hex length: expected 40 or 64, got {actual}")]
    InvalidHexLength { actual: usize },
}
