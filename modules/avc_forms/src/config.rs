use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::domain::service::ServiceConfig;

/// Width of `patients.code` on backends with bounded VARCHAR columns.
pub const CODE_COLUMN_LENGTH: usize = 255;

/// Configuration for the avc_forms module (`modules.avc_forms`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AvcFormsConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u64,
    #[serde(default = "default_max_code_length")]
    pub max_code_length: usize,
}

impl Default for AvcFormsConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            max_code_length: default_max_code_length(),
        }
    }
}

impl AvcFormsConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_code_length == 0 || self.max_code_length > CODE_COLUMN_LENGTH {
            bail!(
                "max_code_length must be between 1 and {CODE_COLUMN_LENGTH}, got {}",
                self.max_code_length
            );
        }
        if self.max_page_size == 0 {
            bail!("max_page_size must be positive");
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            bail!(
                "default_page_size must be between 1 and max_page_size ({}), got {}",
                self.max_page_size,
                self.default_page_size
            );
        }
        Ok(())
    }
}

impl From<&AvcFormsConfig> for ServiceConfig {
    fn from(cfg: &AvcFormsConfig) -> Self {
        Self {
            default_page_size: cfg.default_page_size,
            max_page_size: cfg.max_page_size,
            max_code_length: cfg.max_code_length,
        }
    }
}

fn default_page_size() -> u64 {
    25
}

fn default_max_page_size() -> u64 {
    100
}

fn default_max_code_length() -> usize {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg: AvcFormsConfig = serde_json::from_str(r#"{"max_page_size": 50}"#).unwrap();
        assert_eq!(cfg.default_page_size, 25);
        assert_eq!(cfg.max_page_size, 50);
        assert_eq!(cfg.max_code_length, 100);
    }

    #[test]
    fn defaults_are_valid() {
        assert!(AvcFormsConfig::default().validate().is_ok());
    }

    #[test]
    fn code_length_beyond_column_width_is_rejected() {
        let cfg = AvcFormsConfig {
            max_code_length: CODE_COLUMN_LENGTH + 1,
            ..Default::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("max_code_length"));

        let at_limit = AvcFormsConfig {
            max_code_length: CODE_COLUMN_LENGTH,
            ..Default::default()
        };
        assert!(at_limit.validate().is_ok());
    }

    #[test]
    fn default_page_size_must_fit_under_max() {
        let cfg = AvcFormsConfig {
            default_page_size: 200,
            max_page_size: 100,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let res: Result<AvcFormsConfig, _> = serde_json::from_str(r#"{"page": 1}"#);
        assert!(res.is_err());
    }
}
