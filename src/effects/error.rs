use thiserror::Error;

/// Effect pipeline errors.
#[derive(Debug, Error)]
pub enum EffectError {
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    #[error("encoding failed: {0}")]
    Encode(String),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, EffectError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_frame_message_includes_reason() {
        let err = EffectError::InvalidFrame("zero width".to_string());
        assert_eq!(err.to_string(), "invalid frame: zero width");
    }

    #[test]
    fn encode_message_includes_reason() {
        let err = EffectError::Encode("buffer too small".to_string());
        assert_eq!(err.to_string(), "encoding failed: buffer too small");
    }
}
