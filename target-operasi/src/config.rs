use std::{
    collections::BTreeMap,
    env, fs,
    ops::Deref,
    path::{Path, PathBuf},
};

use amr_client::domain::{Gate, Indicator, UnknownIndicator};
use serde::{Deserialize, Serialize};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "TO_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "target-operasi.toml";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("threshold '{name}' must be finite, got {value}")]
    NotFinite { name: &'static str, value: f64 },
    #[error("threshold '{name}' out of range: {reason}")]
    OutOfRange { name: &'static str, reason: String },
    #[error(transparent)]
    UnknownIndicator(#[from] UnknownIndicator),
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Raw analysis thresholds as written in the `[thresholds]` table.
///
/// Every field has a default; see [`ThresholdSettings::build`] for the
/// checks applied before the engine sees them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThresholdSettings {
    /// Voltage below which a loaded phase counts as dropped (V).
    pub v_drop_tm: f64,
    /// Overvoltage ceiling (V).
    pub v_max: f64,
    /// Current a phase must carry to count as loaded (A).
    pub i_min: f64,
    pub cos_phi_max: f64,
    /// Load current required before a low power factor counts (A).
    pub cos_phi_i_min: f64,
    /// Current below which a phase counts as lost (A).
    pub i_lost_floor: f64,
    /// Current required for a zero active-power phase to count as lost (A).
    pub i_lost_min: f64,
    /// Neutral current floor for the neutral-over-phase rule (A).
    pub i_n_min: f64,
    /// Neutral-to-max-phase current ratio.
    pub netral_vs_fasa: f64,
    /// Overcurrent ceiling (A).
    pub i_max: f64,
    /// Active power below which a loaded phase counts as reversed (kW).
    pub p_reverse_max: f64,
    /// Relative deviation from the three-phase average current.
    pub unbalance_tol: f64,
    pub kl_terbalik: bool,
    pub imp_gt_exp: bool,
    pub v_lost_ada_arus: bool,
    /// Indicator columns switched off entirely.
    pub disabled: Vec<String>,
    /// Weight of every indicator without an entry in `weights`.
    pub weight: f64,
    pub weights: BTreeMap<String, f64>,
    pub min_indicators: usize,
    pub min_score: f64,
    pub top_n: usize,
}

impl Default for ThresholdSettings {
    fn default() -> Self {
        Self {
            v_drop_tm: 56.0,
            v_max: 241.0,
            i_min: 0.5,
            cos_phi_max: 0.4,
            cos_phi_i_min: 0.8,
            i_lost_floor: 0.02,
            i_lost_min: 0.5,
            i_n_min: 1.0,
            netral_vs_fasa: 1.3,
            i_max: 5.0,
            p_reverse_max: 0.1,
            unbalance_tol: 0.5,
            kl_terbalik: false,
            imp_gt_exp: false,
            v_lost_ada_arus: false,
            disabled: Vec::new(),
            weight: 1.0,
            weights: BTreeMap::new(),
            min_indicators: 2,
            min_score: 2.0,
            top_n: 50,
        }
    }
}

fn finite(name: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ConfigError::NotFinite { name, value })
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<f64, ConfigError> {
    if finite(name, value)? < 0.0 {
        return Err(ConfigError::OutOfRange {
            name,
            reason: format!("must be >= 0, got {value}"),
        });
    }
    Ok(value)
}

impl ThresholdSettings {
    pub fn gate(&self, gate: Gate) -> bool {
        match gate {
            Gate::KlTerbalik => self.kl_terbalik,
            Gate::ImpGtExp => self.imp_gt_exp,
            Gate::VLostAdaArus => self.v_lost_ada_arus,
        }
    }

    pub fn set_gate(&mut self, gate: Gate, on: bool) {
        match gate {
            Gate::KlTerbalik => self.kl_terbalik = on,
            Gate::ImpGtExp => self.imp_gt_exp = on,
            Gate::VLostAdaArus => self.v_lost_ada_arus = on,
        }
    }

    /// Validate and freeze into a [`ThresholdConfig`].
    pub fn build(self) -> Result<ThresholdConfig, ConfigError> {
        for (name, value) in [
            ("v_drop_tm", self.v_drop_tm),
            ("v_max", self.v_max),
            ("i_min", self.i_min),
            ("cos_phi_i_min", self.cos_phi_i_min),
            ("i_lost_floor", self.i_lost_floor),
            ("i_lost_min", self.i_lost_min),
            ("i_n_min", self.i_n_min),
            ("netral_vs_fasa", self.netral_vs_fasa),
            ("i_max", self.i_max),
            ("unbalance_tol", self.unbalance_tol),
            ("weight", self.weight),
            ("min_score", self.min_score),
        ] {
            non_negative(name, value)?;
        }
        finite("p_reverse_max", self.p_reverse_max)?;

        if !(0.0..=1.0).contains(&finite("cos_phi_max", self.cos_phi_max)?) {
            return Err(ConfigError::OutOfRange {
                name: "cos_phi_max",
                reason: format!("must be within [0, 1], got {}", self.cos_phi_max),
            });
        }
        if self.top_n < 1 {
            return Err(ConfigError::OutOfRange {
                name: "top_n",
                reason: "must be >= 1".to_string(),
            });
        }
        if self.min_indicators > Indicator::COUNT {
            return Err(ConfigError::OutOfRange {
                name: "min_indicators",
                reason: format!(
                    "catalog has {} indicators, got {}",
                    Indicator::COUNT,
                    self.min_indicators
                ),
            });
        }

        let mut enabled = Indicator::ALL.map(|i| i.gate().map_or(true, |g| self.gate(g)));
        for name in &self.disabled {
            let indicator: Indicator = name.parse()?;
            enabled[indicator.index()] = false;
        }

        let mut weights = [self.weight; Indicator::COUNT];
        for (name, weight) in &self.weights {
            let indicator: Indicator = name.parse()?;
            weights[indicator.index()] = non_negative("weights", *weight)?;
        }

        Ok(ThresholdConfig {
            settings: self,
            enabled,
            weights,
        })
    }
}

/// Validated, immutable thresholds consumed by the engine.
///
/// Only obtainable through [`ThresholdSettings::build`] (or deserialization,
/// which runs the same checks), so the rule catalog never sees an invalid
/// configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "ThresholdSettings")]
pub struct ThresholdConfig {
    settings: ThresholdSettings,
    enabled: [bool; Indicator::COUNT],
    weights: [f64; Indicator::COUNT],
}

impl ThresholdConfig {
    /// Whether `indicator` is evaluated at all. Gated indicators need their
    /// gate on; any indicator can be switched off through `disabled`.
    pub fn is_enabled(&self, indicator: Indicator) -> bool {
        self.enabled[indicator.index()]
    }

    pub fn weight(&self, indicator: Indicator) -> f64 {
        self.weights[indicator.index()]
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        let settings = ThresholdSettings::default();
        Self {
            enabled: Indicator::ALL.map(|i| i.gate().is_none()),
            weights: [settings.weight; Indicator::COUNT],
            settings,
        }
    }
}

impl Deref for ThresholdConfig {
    type Target = ThresholdSettings;

    fn deref(&self) -> &ThresholdSettings {
        &self.settings
    }
}

impl TryFrom<ThresholdSettings> for ThresholdConfig {
    type Error = ConfigError;

    fn try_from(settings: ThresholdSettings) -> Result<Self, ConfigError> {
        settings.build()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Ndjson,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputConfig {
    /// Field delimiter of delimited text input (`,` for CSV, `|` for DAT).
    pub delimiter: char,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self { delimiter: ',' }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Output file; stdout when unset.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub thresholds: ThresholdSettings,
    pub input: InputConfig,
    pub output: OutputConfig,
}

impl AppConfig {
    /// Load from `explicit`, else `$TO_CONFIG`, else `target-operasi.toml`
    /// when present, else built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| env::var_os(CONFIG_ENV).map(PathBuf::from));

        match path {
            Some(path) => Self::from_file(&path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_PATH);
                if fallback.exists() {
                    Self::from_file(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_built_defaults() {
        let built = ThresholdSettings::default().build().unwrap();
        assert_eq!(built, ThresholdConfig::default());
        assert!(built.is_enabled(Indicator::VDrop));
        assert!(!built.is_enabled(Indicator::ReversePhase));
        assert_eq!(built.weight(Indicator::Freeze), 1.0);
        assert_eq!(built.top_n, 50);
    }

    #[test]
    fn rejects_top_n_below_one() {
        let settings = ThresholdSettings {
            top_n: 0,
            ..Default::default()
        };
        assert!(matches!(
            settings.build(),
            Err(ConfigError::OutOfRange { name: "top_n", .. })
        ));
    }

    #[test]
    fn rejects_negative_and_non_finite_thresholds() {
        let negative = ThresholdSettings {
            netral_vs_fasa: -1.3,
            ..Default::default()
        };
        assert!(matches!(
            negative.build(),
            Err(ConfigError::OutOfRange { name: "netral_vs_fasa", .. })
        ));

        let nan = ThresholdSettings {
            v_drop_tm: f64::NAN,
            ..Default::default()
        };
        assert!(matches!(nan.build(), Err(ConfigError::NotFinite { name: "v_drop_tm", .. })));

        let cos_phi = ThresholdSettings {
            cos_phi_max: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            cos_phi.build(),
            Err(ConfigError::OutOfRange { name: "cos_phi_max", .. })
        ));
    }

    #[test]
    fn p_reverse_max_may_be_negative() {
        let settings = ThresholdSettings {
            p_reverse_max: -0.5,
            ..Default::default()
        };
        assert!(settings.build().is_ok());
    }

    #[test]
    fn rejects_unknown_indicator_names() {
        let settings = ThresholdSettings {
            disabled: vec!["v_drop".to_string(), "nope".to_string()],
            ..Default::default()
        };
        assert!(matches!(settings.build(), Err(ConfigError::UnknownIndicator(_))));

        let mut weights = BTreeMap::new();
        weights.insert("bogus".to_string(), 2.0);
        let settings = ThresholdSettings {
            weights,
            ..Default::default()
        };
        assert!(matches!(settings.build(), Err(ConfigError::UnknownIndicator(_))));
    }

    #[test]
    fn gates_disabled_list_and_weights_resolve_per_indicator() {
        let mut settings = ThresholdSettings {
            disabled: vec!["freeze".to_string()],
            weight: 5.0,
            ..Default::default()
        };
        settings.set_gate(Gate::ImpGtExp, true);
        settings.weights.insert("v_drop".to_string(), 10.0);
        let cfg = settings.build().unwrap();

        assert!(cfg.is_enabled(Indicator::ImportGtExport));
        assert!(!cfg.is_enabled(Indicator::ReversePhase));
        assert!(!cfg.is_enabled(Indicator::Freeze));
        assert_eq!(cfg.weight(Indicator::VDrop), 10.0);
        assert_eq!(cfg.weight(Indicator::VLost), 5.0);
    }

    #[test]
    fn app_config_parses_toml_sections() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [thresholds]
            v_drop_tm = 50.0
            top_n = 10
            kl_terbalik = true
            disabled = ["freeze"]

            [thresholds.weights]
            v_drop = 5.0

            [input]
            delimiter = "|"

            [output]
            format = "ndjson"
            path = "hasil.ndjson"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.thresholds.v_drop_tm, 50.0);
        assert_eq!(cfg.thresholds.top_n, 10);
        assert_eq!(cfg.thresholds.i_min, 0.5);
        assert!(cfg.thresholds.kl_terbalik);
        assert_eq!(cfg.thresholds.weights.get("v_drop"), Some(&5.0));
        assert_eq!(cfg.input.delimiter, '|');
        assert_eq!(cfg.output.format, OutputFormat::Ndjson);
        assert_eq!(cfg.output.path, Some(PathBuf::from("hasil.ndjson")));
    }

    #[test]
    fn app_config_rejects_negative_counts_and_unknown_keys() {
        assert!(toml::from_str::<AppConfig>("[thresholds]\ntop_n = -1\n").is_err());
        assert!(toml::from_str::<AppConfig>("[thresholds]\nv_drop_tr = 180.0\n").is_err());
        assert!(toml::from_str::<AppConfig>("[thresholds]\nv_max = \"high\"\n").is_err());
    }

    #[test]
    fn threshold_config_deserialization_validates() {
        assert!(toml::from_str::<ThresholdConfig>("top_n = 0\n").is_err());
        let cfg: ThresholdConfig = toml::from_str("top_n = 5\n").unwrap();
        assert_eq!(cfg.top_n, 5);
    }

    #[test]
    fn from_file_reports_missing_file() {
        let err = AppConfig::from_file(Path::new("/nonexistent/target-operasi.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
