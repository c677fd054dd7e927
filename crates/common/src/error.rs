//! Error types shared across MirrorLink crates.

/// Top-level error type for MirrorLink operations.
#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    #[error("Platform error: {message}")]
    Platform { message: String },

    #[error("Session error: {message}")]
    Session { message: String },

    #[error("Settings error: {message}")]
    Settings { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using MirrorError.
pub type MirrorResult<T> = Result<T, MirrorError>;

impl MirrorError {
    pub fn platform(msg: impl Into<String>) -> Self {
        Self::Platform {
            message: msg.into(),
        }
    }

    pub fn session(msg: impl Into<String>) -> Self {
        Self::Session {
            message: msg.into(),
        }
    }

    pub fn settings(msg: impl Into<String>) -> Self {
        Self::Settings {
            message: msg.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helper_constructors_render_their_context() {
        assert_eq!(
            MirrorError::platform("usb query failed").to_string(),
            "Platform error: usb query failed"
        );
        assert_eq!(
            MirrorError::session("already starting").to_string(),
            "Session error: already starting"
        );
        assert_eq!(
            MirrorError::settings("write failed").to_string(),
            "Settings error: write failed"
        );
    }

    #[test]
    fn io_and_json_errors_convert_transparently() {
        let io: MirrorError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(io, MirrorError::Io(_)));

        let json: MirrorError = serde_json::from_str::<u32>("not json").unwrap_err().into();
        assert!(matches!(json, MirrorError::Json(_)));
    }
}
