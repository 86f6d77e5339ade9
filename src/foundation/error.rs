pub type PathlightResult<T> = Result<T, PathlightError>;

#[derive(thiserror::Error, Debug)]
pub enum PathlightError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("resource error: {0}")]
    Resource(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PathlightError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// `true` for errors the caller caused through bad settings or path input.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<serde_json::Error> for PathlightError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_string())
    }
}

impl From<image::ImageError> for PathlightError {
    fn from(e: image::ImageError) -> Self {
        Self::Resource(format!("image: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            PathlightError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(
            PathlightError::resource("x")
                .to_string()
                .contains("resource error:")
        );
        assert!(
            PathlightError::serde("x")
                .to_string()
                .contains("serialization error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = PathlightError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
        assert!(!err.is_configuration());
    }

    #[test]
    fn json_errors_map_to_serde() {
        let e = serde_json::from_str::<u32>("nope").unwrap_err();
        let err = PathlightError::from(e);
        assert!(matches!(err, PathlightError::Serde(_)));
    }
}
