//! Translator configuration.
//!
//! Settings can be given programmatically through the builder, deserialized
//! from a config file, or read from the environment with
//! [`TranslatorConfig::from_env`].

use crate::constants::{defaults, env_vars};
use bon::Builder;
use serde::Deserialize;
use std::collections::HashSet;
use std::env;

/// Controls which attributes become annotations and how many encode
/// buffers are pooled.
///
/// # Examples
///
/// ```
/// use xray_segment_translator::TranslatorConfig;
///
/// let config = TranslatorConfig::builder()
///     .indexed_attributes(vec!["order.id".to_string()])
///     .build();
/// assert!(!config.index_all_attributes);
/// assert_eq!(config.writer_pool_size, 2048);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Builder, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    /// Attribute keys promoted to annotations.
    #[builder(default)]
    pub indexed_attributes: Vec<String>,

    /// Promote every scalar attribute to an annotation.
    #[builder(default)]
    pub index_all_attributes: bool,

    /// Maximum number of idle encode buffers kept by the writer pool.
    #[builder(default = defaults::WRITER_POOL_SIZE)]
    pub writer_pool_size: usize,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl TranslatorConfig {
    /// Reads the configuration from environment variables, using defaults
    /// for anything unset or invalid.
    pub fn from_env() -> Self {
        let indexed_attributes = env::var(env_vars::INDEXED_ATTRIBUTES)
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|key| !key.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let index_all_attributes = env::var(env_vars::INDEX_ALL_ATTRIBUTES)
            .map(|value| matches!(value.trim().to_lowercase().as_str(), "true" | "1"))
            .unwrap_or(false);

        let writer_pool_size = match env::var(env_vars::WRITER_POOL_SIZE) {
            Ok(value) => match value.trim().parse::<usize>() {
                Ok(size) if size > 0 => size,
                _ => {
                    tracing::warn!(
                        value = %value,
                        "Invalid {}, using default {}",
                        env_vars::WRITER_POOL_SIZE,
                        defaults::WRITER_POOL_SIZE
                    );
                    defaults::WRITER_POOL_SIZE
                }
            },
            Err(_) => defaults::WRITER_POOL_SIZE,
        };

        Self {
            indexed_attributes,
            index_all_attributes,
            writer_pool_size,
        }
    }

    /// The indexed keys as a set, for lookups during classification.
    pub(crate) fn indexed_set(&self) -> HashSet<String> {
        self.indexed_attributes.iter().cloned().collect()
    }
}
