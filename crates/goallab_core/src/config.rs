use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Run Stage2 (appraisal/emotion) after the threat stack.
    pub appraisal: bool,
    pub observation: ObservationParams,
    pub threat: ThreatParams,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            appraisal: true,
            observation: ObservationParams::default(),
            threat: ThreatParams::default(),
        }
    }
}

impl PipelineConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    /// After loading, env var overrides are applied.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: PipelineConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        config.check_weights();
        Ok(config)
    }

    /// Try to load from path; if file doesn't exist, return defaults with env overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({:#}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                cfg
            }
        }
    }

    /// Apply environment variable overrides on top of file-based config.
    fn apply_env_overrides(&mut self) {
        if let Some(n) = env_parse("GOALLAB_R0") {
            self.observation.r0 = n;
        }
        if let Some(n) = env_parse("GOALLAB_RS") {
            self.observation.rs = n;
        }
        if let Some(n) = env_parse("GOALLAB_RH") {
            self.observation.rh = n;
        }
        if let Some(b) = env_parse("GOALLAB_APPRAISAL") {
            self.appraisal = b;
        }
    }

    /// Weights are used as given; drift from 1.0 is only reported.
    fn check_weights(&self) {
        let sum = self.threat.weights.sum();
        if (sum - 1.0).abs() > 1e-6 {
            tracing::warn!("Threat channel weights sum to {:.4}, not 1.0", sum);
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

// ============================================================================
// Sub-configs
// ============================================================================

/// Observation radii: `r0` proximity, `rs` sight falloff, `rh` hearing falloff.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ObservationParams {
    pub r0: f64,
    pub rs: f64,
    pub rh: f64,
}

impl Default for ObservationParams {
    fn default() -> Self {
        Self {
            r0: 5.0,
            rs: 8.0,
            rh: 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct ThreatParams {
    pub weights: ThreatWeights,
    pub social: SocialParams,
}

/// Blend weights for the six threat channels. Defaults sum to 1.00.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ThreatWeights {
    pub env: f64,
    pub soc: f64,
    pub auth: f64,
    pub unc: f64,
    pub body: f64,
    pub sc: f64,
}

impl Default for ThreatWeights {
    fn default() -> Self {
        Self {
            env: 0.28,
            soc: 0.28,
            auth: 0.16,
            unc: 0.12,
            body: 0.10,
            sc: 0.06,
        }
    }
}

impl ThreatWeights {
    pub fn sum(&self) -> f64 {
        self.env + self.soc + self.auth + self.unc + self.body + self.sc
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SocialParams {
    /// Hostility assumed of a stranger with full trust
    pub baseline_hostility: f64,
    /// How much support/trust cancels perceived hostility
    pub shield_strength: f64,
    pub w_los: f64,
    pub w_aud: f64,
    /// Trust used when no `tom:trustEff` atom exists
    pub trust_default: f64,
}

impl Default for SocialParams {
    fn default() -> Self {
        Self {
            baseline_hostility: 0.06,
            shield_strength: 0.85,
            w_los: 0.6,
            w_aud: 0.4,
            trust_default: 0.45,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = PipelineConfig::default();
        assert!(cfg.appraisal);
        assert_eq!(cfg.observation.r0, 5.0);
        assert_eq!(cfg.observation.rs, 8.0);
        assert_eq!(cfg.observation.rh, 10.0);
        assert_eq!(cfg.threat.social.trust_default, 0.45);
    }

    #[test]
    fn test_default_weights_sum_to_one() {
        let w = ThreatWeights::default();
        assert!((w.sum() - 1.0).abs() < 1e-9, "sum = {}", w.sum());
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml_str = r#"
[observation]
r0 = 4.0
"#;
        let cfg: PipelineConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.observation.r0, 4.0);
        // Defaults for unspecified fields
        assert_eq!(cfg.observation.rs, 8.0);
        assert!(cfg.appraisal);
        assert_eq!(cfg.threat.weights, ThreatWeights::default());
    }

    #[test]
    fn test_parse_full_toml() {
        let toml_str = r#"
appraisal = false

[observation]
r0 = 6.0
rs = 9.0
rh = 12.0

[threat.weights]
env = 0.3
soc = 0.3
auth = 0.1
unc = 0.1
body = 0.1
sc = 0.1

[threat.social]
baseline_hostility = 0.1
shield_strength = 0.5
w_los = 0.5
w_aud = 0.5
trust_default = 0.3
"#;
        let cfg: PipelineConfig = toml::from_str(toml_str).unwrap();
        assert!(!cfg.appraisal);
        assert_eq!(cfg.observation.rh, 12.0);
        assert_eq!(cfg.threat.weights.env, 0.3);
        assert_eq!(cfg.threat.social.shield_strength, 0.5);
        assert_eq!(cfg.threat.social.trust_default, 0.3);
    }

    #[test]
    fn test_env_overrides_and_defaults() {
        // Part 1: env overrides
        std::env::set_var("GOALLAB_R0", "7.5");
        std::env::set_var("GOALLAB_APPRAISAL", "false");
        std::env::set_var("GOALLAB_RH", "not-a-number");

        let mut cfg = PipelineConfig::default();
        cfg.apply_env_overrides();

        assert_eq!(cfg.observation.r0, 7.5);
        assert!(!cfg.appraisal);
        // Unparsable values are ignored
        assert_eq!(cfg.observation.rh, 10.0);

        // Clean up env vars before testing defaults
        std::env::remove_var("GOALLAB_R0");
        std::env::remove_var("GOALLAB_APPRAISAL");
        std::env::remove_var("GOALLAB_RH");

        // Part 2: nonexistent path returns defaults (no env interference)
        let cfg = PipelineConfig::load_or_default("/nonexistent/goallab.toml");
        assert_eq!(cfg.observation.r0, 5.0);
        assert!(cfg.appraisal);
    }

    #[test]
    fn test_load_reports_bad_toml() {
        let path = std::env::temp_dir().join("goallab_bad_config_test.toml");
        std::fs::write(&path, "appraisal = [not toml").unwrap();
        let err = PipelineConfig::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse TOML config"));
        let _ = std::fs::remove_file(&path);
    }
}
