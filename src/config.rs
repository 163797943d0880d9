use crate::error::ColmigError;

/// Runtime configuration for one migration run.
///
/// The config is consumed, not owned, by the core: the temp suffix and the
/// bulk-update flag come from whatever deployment descriptor the embedder
/// loads, and `bulk_update_available` is derived externally from the store's
/// platform version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColmigConfig {
    /// Appended to the source schema name to form the temp attribute name.
    pub temp_suffix: String,
    /// When false, migrate steps rewrite references but copy no record data.
    pub migrate_data: bool,
    /// Whether the store exposes an atomic multi-record update primitive.
    pub bulk_update_available: bool,
    /// Records buffered per data-copy flush.
    pub batch_size: usize,
}

impl Default for ColmigConfig {
    fn default() -> Self {
        Self {
            temp_suffix: "_tmp".into(),
            migrate_data: true,
            bulk_update_available: true,
            batch_size: 100,
        }
    }
}

impl ColmigConfig {
    /// Profile for stores without the atomic multi-update primitive; the
    /// data-copy step degrades to sequential per-record updates.
    pub fn sequential() -> Self {
        Self {
            bulk_update_available: false,
            ..Self::default()
        }
    }

    /// Profile that moves schema and references but leaves record data alone.
    pub fn metadata_only() -> Self {
        Self {
            migrate_data: false,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ColmigError> {
        if self.temp_suffix.is_empty() {
            return Err(ColmigError::InvalidConfig {
                message: "temp_suffix must not be empty".into(),
            });
        }
        if self.batch_size == 0 {
            return Err(ColmigError::InvalidConfig {
                message: "batch_size must be at least 1".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ColmigConfig;
    use crate::error::ColmigErrorCode;

    #[test]
    fn default_config_validates() {
        let config = ColmigConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.batch_size, 100);
    }

    #[test]
    fn empty_suffix_is_rejected() {
        let config = ColmigConfig {
            temp_suffix: String::new(),
            ..ColmigConfig::default()
        };
        let err = config.validate().expect_err("empty suffix");
        assert_eq!(err.code(), ColmigErrorCode::InvalidConfig);
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let config = ColmigConfig {
            batch_size: 0,
            ..ColmigConfig::default()
        };
        let err = config.validate().expect_err("zero batch");
        assert_eq!(err.code(), ColmigErrorCode::InvalidConfig);
    }
}
