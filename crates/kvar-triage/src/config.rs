//! Triage configuration.
//!
//! `[triage]` holds the decision-layer settings; `[inference]` belongs to
//! [`AnalyzerConfig`]. [`KvarConfig`] reads both from one file.
//!
//! ```toml
//! [inference]
//! backend = "ollama"
//!
//! [triage]
//! analyze_timeout_secs = 150
//!
//! [triage.specificity]
//! min_chars = 25
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use kvar_core::defaults;
use kvar_inference::config::substitute_env_vars;
use kvar_inference::{AnalyzerConfig, ConfigError, ConfigResult};

use crate::specificity::SpecificityConfig;

/// Settings of the triage coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    pub specificity: SpecificityConfig,
    /// Added to the confidence of a successful text-plus-image analysis.
    pub confidence_boost: f64,
    /// Coordinator deadline for one analyzer invocation, retries included.
    /// Unset means the retry budget of the configured analyzers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analyze_timeout_secs: Option<u64>,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            specificity: SpecificityConfig::default(),
            confidence_boost: defaults::MULTIMODAL_CONFIDENCE_BOOST,
            analyze_timeout_secs: None,
        }
    }
}

impl TriageConfig {
    /// Defaults with `KVAR_*` overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(chars) = env::var(defaults::ENV_SPECIFICITY_MIN_CHARS)
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.specificity.min_chars = chars;
        }
        if let Some(secs) = env::var(defaults::ENV_TRIAGE_TIMEOUT_SECS)
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.analyze_timeout_secs = Some(secs);
        }
        debug!(
            min_chars = config.specificity.min_chars,
            analyze_timeout_secs = ?config.analyze_timeout_secs,
            "Triage config loaded from environment"
        );
        config
    }

    /// Parse the `[triage]` table of a TOML document.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let content = substitute_env_vars(content)?;

        #[derive(Deserialize)]
        struct TomlRoot {
            #[serde(default)]
            triage: TriageConfig,
        }

        let root: TomlRoot = toml::from_str(&content)?;
        root.triage.validate()?;
        Ok(root.triage)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.analyze_timeout_secs == Some(0) {
            return Err(ConfigError::Validation(
                "analyze_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.confidence_boost) {
            return Err(ConfigError::Validation(format!(
                "confidence_boost must be within [0, 1], got {}",
                self.confidence_boost
            )));
        }
        if self
            .specificity
            .keywords
            .iter()
            .chain(&self.specificity.whole_words)
            .any(|k| k.trim().is_empty())
        {
            return Err(ConfigError::Validation(
                "specificity keywords must not be blank".to_string(),
            ));
        }
        Ok(())
    }

    /// Falls back to a deadline covering the default retry policy.
    pub fn analyze_timeout(&self) -> Duration {
        Duration::from_secs(
            self.analyze_timeout_secs.unwrap_or(defaults::TRIAGE_CALL_TIMEOUT_SECS),
        )
    }
}

/// Complete configuration file.
#[derive(Debug, Clone, Default)]
pub struct KvarConfig {
    pub inference: AnalyzerConfig,
    pub triage: TriageConfig,
}

impl KvarConfig {
    /// Both tables from the environment.
    ///
    /// A coordinator deadline shorter than the analyzer retry budget is
    /// raised to the budget.
    pub fn from_env() -> Self {
        let mut config = Self {
            inference: AnalyzerConfig::from_env(),
            triage: TriageConfig::from_env(),
        };
        if let Err(e) = config.reconcile_timeout() {
            let secs = whole_secs(config.inference.call_budget());
            warn!(error = %e, analyze_timeout_secs = secs, "Raising coordinator deadline");
            config.triage.analyze_timeout_secs = Some(secs);
        }
        config
    }

    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        info!("Loading kvar config from: {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let mut config = Self {
            inference: AnalyzerConfig::from_toml_str(content)?,
            triage: TriageConfig::from_toml_str(content)?,
        };
        config.reconcile_timeout()?;
        Ok(config)
    }

    /// Derive the coordinator deadline from the analyzer retry budget, or
    /// reject an explicit one that would cut retries short.
    fn reconcile_timeout(&mut self) -> ConfigResult<()> {
        let budget = self.inference.call_budget();
        match self.triage.analyze_timeout_secs {
            None => {
                self.triage.analyze_timeout_secs = Some(whole_secs(budget));
                Ok(())
            }
            Some(secs) if Duration::from_secs(secs) < budget => {
                Err(ConfigError::Validation(format!(
                    "triage.analyze_timeout_secs ({}) is shorter than the analyzer retry budget ({:?})",
                    secs, budget
                )))
            }
            Some(_) => Ok(()),
        }
    }
}

/// `duration` rounded up to whole seconds.
fn whole_secs(duration: Duration) -> u64 {
    duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}
