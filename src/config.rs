use crate::problem::{Attribution, ConfigurationError, InstanceData, Tables};
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How the backorder variables are priced in the objective
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackorderPricing {
    /// Use the backorder cost table
    #[display(fmt = "tabulated")]
    Tabulated,
    /// `ratio * production cost` of the first producer feeding the backordered stock
    #[display(fmt = "production_ratio")]
    ProductionRatio,
}

/// What is known about the inventory at the end of the first period
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialInventory {
    /// All warehouse and DC inventory of period 0 is pinned to zero
    #[display(fmt = "empty")]
    Empty,
    /// Period 0 inventory is only restricted by flow balance
    #[display(fmt = "free")]
    Free,
}

impl InitialInventory {
    /// Pooled instances start empty, producer-attributed ones are left to flow balance
    pub fn default_for(attribution: Attribution) -> InitialInventory {
        match attribution {
            Attribution::Pooled => InitialInventory::Empty,
            Attribution::PerProducer => InitialInventory::Free,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelOptions {
    pub pricing: BackorderPricing,
    /// Overrides the attribution's default when set
    pub initial_inventory: Option<InitialInventory>,
    /// Solver output level, 0 is silent
    pub verbosity: u8,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            pricing: BackorderPricing::ProductionRatio,
            initial_inventory: None,
            verbosity: 0,
        }
    }
}

impl ModelOptions {
    pub fn initial_inventory(&self, attribution: Attribution) -> InitialInventory {
        self.initial_inventory
            .unwrap_or_else(|| InitialInventory::default_for(attribution))
    }
}

/// The ratios to evaluate, in order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RatioSequence {
    Explicit(Vec<f64>),
    /// `start + k * step` for `k` in `1..=count`
    Stepped {
        #[serde(default)]
        start: f64,
        step: f64,
        count: usize,
    },
}

impl Default for RatioSequence {
    fn default() -> Self {
        RatioSequence::Stepped {
            start: 0.0,
            step: 0.05,
            count: 50,
        }
    }
}

impl RatioSequence {
    pub fn ratios(&self) -> Vec<f64> {
        match self {
            RatioSequence::Explicit(ratios) => ratios.clone(),
            RatioSequence::Stepped { start, step, count } => {
                (1..=*count).map(|k| start + k as f64 * step).collect()
            }
        }
    }
}

/// Where the instance of a sweep comes from
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceSource {
    /// Tables written directly in the configuration
    Instance(Tables),
    /// Path to a JSON file with the tables, relative to the configuration file
    InstancePath(PathBuf),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SweepConfig {
    #[serde(flatten)]
    pub source: InstanceSource,
    #[serde(default)]
    pub options: ModelOptions,
    #[serde(default)]
    pub ratios: RatioSequence,
    /// Evaluate the ratios on separate threads
    #[serde(default)]
    pub parallel: bool,
}

#[derive(Debug, Display, From)]
pub enum LoadError {
    #[display(fmt = "{}: {}", _0, _1)]
    #[from(ignore)]
    Io(String, std::io::Error),
    #[display(fmt = "invalid json: {}", _0)]
    Json(serde_json::Error),
    #[display(fmt = "invalid instance: {}", _0)]
    Configuration(ConfigurationError),
}

impl std::error::Error for LoadError {}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let file = std::fs::File::open(path).map_err(|err| LoadError::Io(path.display().to_string(), err))?;
    let reader = std::io::BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}

impl SweepConfig {
    pub fn load(path: &Path) -> Result<SweepConfig, LoadError> {
        let mut config: SweepConfig = read_json(path)?;
        if let InstanceSource::InstancePath(relative) = &config.source {
            if relative.is_relative() {
                let base = path.parent().unwrap_or_else(|| Path::new("."));
                config.source = InstanceSource::InstancePath(base.join(relative));
            }
        }
        Ok(config)
    }

    /// Read (if necessary) and validate the instance
    pub fn instance(&self) -> Result<InstanceData, LoadError> {
        let tables = match &self.source {
            InstanceSource::Instance(tables) => tables.clone(),
            InstanceSource::InstancePath(path) => read_json(path)?,
        };
        Ok(InstanceData::new(tables)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_sequence_matches_fifty_steps_of_five_percent() {
        let ratios = RatioSequence::default().ratios();
        assert_eq!(ratios.len(), 50);
        assert!((ratios[0] - 0.05).abs() < 1e-12);
        assert!((ratios[49] - 2.5).abs() < 1e-12);
    }

    #[test]
    fn parses_both_sequence_forms() {
        let explicit: RatioSequence = serde_json::from_str("[0.5, 1.0]").unwrap();
        assert_eq!(explicit.ratios(), vec![0.5, 1.0]);

        let stepped: RatioSequence = serde_json::from_str(r#"{"step": 0.5, "count": 2}"#).unwrap();
        assert_eq!(stepped.ratios(), vec![0.5, 1.0]);
    }

    #[test]
    fn initial_inventory_defaults_follow_attribution() {
        let options = ModelOptions::default();
        assert_eq!(
            options.initial_inventory(Attribution::Pooled),
            InitialInventory::Empty
        );
        assert_eq!(
            options.initial_inventory(Attribution::PerProducer),
            InitialInventory::Free
        );

        let options = ModelOptions {
            initial_inventory: Some(InitialInventory::Free),
            ..ModelOptions::default()
        };
        assert_eq!(
            options.initial_inventory(Attribution::Pooled),
            InitialInventory::Free
        );
    }

    #[test]
    fn parses_config_with_instance_path() {
        let config: SweepConfig = serde_json::from_str(
            r#"{
                "instance_path": "instance.json",
                "options": { "pricing": "tabulated" },
                "ratios": [0.0]
            }"#,
        )
        .unwrap();
        assert!(matches!(config.source, InstanceSource::InstancePath(_)));
        assert_eq!(config.options.pricing, BackorderPricing::Tabulated);
        assert!(!config.parallel);
    }
}
