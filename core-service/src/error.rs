use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Runtime error: {0}")]
    Runtime(core_runtime::Error),

    #[error("Library error: {0}")]
    Library(#[from] core_library::LibraryError),
}

impl From<core_runtime::Error> for CoreError {
    fn from(err: core_runtime::Error) -> Self {
        match err {
            core_runtime::Error::CapabilityMissing {
                capability,
                message,
            } => CoreError::CapabilityMissing {
                capability,
                message,
            },
            other => CoreError::Runtime(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_capability_keeps_its_own_variant() {
        let err = CoreError::from(core_runtime::Error::CapabilityMissing {
            capability: "SettingsStore".to_string(),
            message: "required".to_string(),
        });
        assert!(matches!(err, CoreError::CapabilityMissing { ref capability, .. } if capability == "SettingsStore"));

        let err = CoreError::from(core_runtime::Error::Config("bad".to_string()));
        assert!(matches!(err, CoreError::Runtime(_)));
    }
}
