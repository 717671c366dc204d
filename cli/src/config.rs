use anyhow::Result;
use serde::{Deserialize, Serialize};

use routes::{CurveFitZones, EntityName, Styling};

/// Which entities to analyze and how to draw them.
#[derive(Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub carriers: Vec<Carrier>,
    #[serde(default)]
    pub zones: CurveFitZones,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Carrier {
    /// Used in reports and the stats file
    pub name: String,
    /// The entity in the input samples
    pub tag: EntityName,
    pub icon: String,
    pub color: String,
}

impl Carrier {
    /// For entities found in the input without any configuration
    pub fn unconfigured(tag: EntityName) -> Self {
        let styling = Styling::default();
        Self {
            name: tag.0.clone(),
            tag,
            icon: styling.icon,
            color: styling.color,
        }
    }

    pub fn styling(&self) -> Styling {
        Styling {
            icon: self.icon.clone(),
            color: self.color.clone(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(&fs_err::read_to_string(path)?)?;
        if config.carriers.is_empty() {
            bail!("{path} doesn't list any carriers");
        }
        Ok(config)
    }
}
