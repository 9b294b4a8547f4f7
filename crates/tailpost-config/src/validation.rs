//! Configuration validation.

use crate::config::TailpostConfig;
use encoding_rs::Encoding;

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// A value is outside its accepted range.
    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),

    /// An encoding label is not known.
    #[error("unknown text encoding '{0}'")]
    UnknownEncoding(String),

    /// A required path is missing.
    #[error("missing path: {0}")]
    MissingPath(String),
}

/// Checks a [`TailpostConfig`] before it is used.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate settings every command depends on.
    pub fn validate(config: &TailpostConfig) -> Result<(), ValidationError> {
        if config.cache.max_entries == 0 {
            return Err(ValidationError::InvalidValue(
                "cache.max_entries".to_string(),
                "must be greater than 0".to_string(),
            ));
        }

        let ratio = config.cache.prune_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(ValidationError::InvalidValue(
                "cache.prune_ratio".to_string(),
                format!("{ratio} is not in (0, 1]"),
            ));
        }

        if config.cache.path.as_os_str().is_empty() {
            return Err(ValidationError::MissingPath("cache.path".to_string()));
        }

        resolve_encodings(&config.reader.encodings)?;
        Ok(())
    }

    /// Validate settings needed to start watching.
    pub fn validate_for_run(config: &TailpostConfig) -> Result<(), ValidationError> {
        Self::validate(config)?;
        if config.watch.dir.as_os_str().is_empty() {
            return Err(ValidationError::MissingPath("watch.dir".to_string()));
        }
        Ok(())
    }
}

/// Resolve encoding labels to `encoding_rs` encodings.
///
/// Accepts WHATWG labels plus the `cp949` and `utf-8-sig` spellings.
/// Duplicates keep their first position. An empty list is rejected.
pub fn resolve_encodings(labels: &[String]) -> Result<Vec<&'static Encoding>, ValidationError> {
    if labels.is_empty() {
        return Err(ValidationError::InvalidValue(
            "reader.encodings".to_string(),
            "at least one encoding is required".to_string(),
        ));
    }

    let mut resolved: Vec<&'static Encoding> = Vec::with_capacity(labels.len());
    for label in labels {
        let encoding = match label.trim().to_ascii_lowercase().as_str() {
            "cp949" => Some(encoding_rs::EUC_KR),
            "utf-8-sig" | "utf8-sig" => Some(encoding_rs::UTF_8),
            other => Encoding::for_label(other.as_bytes()),
        }
        .ok_or_else(|| ValidationError::UnknownEncoding(label.clone()))?;

        if !resolved.contains(&encoding) {
            resolved.push(encoding);
        }
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn default_config_is_valid() {
        assert!(ConfigValidator::validate(&TailpostConfig::default()).is_ok());
    }

    #[test]
    fn run_requires_watch_dir() {
        let config = TailpostConfig::default();
        assert_eq!(
            ConfigValidator::validate_for_run(&config),
            Err(ValidationError::MissingPath("watch.dir".to_string()))
        );

        let mut config = config;
        config.watch.dir = PathBuf::from("/tmp");
        assert!(ConfigValidator::validate_for_run(&config).is_ok());
    }

    #[test]
    fn rejects_out_of_range_prune_ratio() {
        for ratio in [0.0, -0.5, 1.5] {
            let mut config = TailpostConfig::default();
            config.cache.prune_ratio = ratio;
            assert!(matches!(
                ConfigValidator::validate(&config),
                Err(ValidationError::InvalidValue(field, _)) if field == "cache.prune_ratio"
            ));
        }
    }

    #[test]
    fn rejects_zero_max_entries() {
        let mut config = TailpostConfig::default();
        config.cache.max_entries = 0;
        assert!(ConfigValidator::validate(&config).is_err());
    }

    #[test]
    fn default_encodings_collapse_aliases() {
        let labels = TailpostConfig::default().reader.encodings;
        let resolved = resolve_encodings(&labels).unwrap();
        assert_eq!(resolved, vec![encoding_rs::UTF_8, encoding_rs::EUC_KR]);
    }

    #[test]
    fn empty_encoding_list_is_rejected() {
        let mut config = TailpostConfig::default();
        config.reader.encodings.clear();
        assert!(matches!(
            ConfigValidator::validate(&config),
            Err(ValidationError::InvalidValue(field, _)) if field == "reader.encodings"
        ));
    }

    #[test]
    fn unknown_encoding_is_rejected() {
        let labels = vec!["utf-8".to_string(), "klingon".to_string()];
        assert_eq!(
            resolve_encodings(&labels),
            Err(ValidationError::UnknownEncoding("klingon".to_string()))
        );
    }
}
