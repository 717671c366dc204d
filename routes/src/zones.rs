use anyhow::Result;
use geom::{Bounds, Pt2D};
use serde::{Deserialize, Serialize};

use crate::CurveFitConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ZoneID(pub usize);

/// An area with its own curve fitting parameters. Open yards and tight aisles need different
/// amounts of smoothing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Zone {
    pub name: String,
    pub bounds: Bounds,
    pub curve_fit: CurveFitConfig,
}

/// Curve fitting configuration per zone. With no zones and no default, fitting is disabled.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CurveFitZones {
    #[serde(default)]
    pub zones: Vec<Zone>,
    /// Used outside of every zone
    #[serde(default)]
    pub default: Option<CurveFitConfig>,
}

impl CurveFitZones {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn everywhere(config: CurveFitConfig) -> Self {
        Self {
            zones: Vec::new(),
            default: Some(config),
        }
    }

    pub fn load(path: &str) -> Result<Self> {
        let zones: Self = serde_json::from_str(&fs_err::read_to_string(path)?)?;
        info!("Loaded {} curve fitting zones from {path}", zones.zones.len());
        Ok(zones)
    }

    /// The first zone containing the point. Zones listed earlier win where they overlap.
    pub fn zone_containing(&self, pt: Pt2D) -> Option<ZoneID> {
        self.zones
            .iter()
            .position(|zone| zone.bounds.contains(pt))
            .map(ZoneID)
    }

    pub fn get(&self, id: ZoneID) -> Option<&Zone> {
        self.zones.get(id.0)
    }

    /// None means no curve fitting should happen
    pub fn config_for(&self, zone: Option<ZoneID>) -> Option<&CurveFitConfig> {
        match zone.and_then(|id| self.get(id)) {
            Some(zone) => Some(&zone.curve_fit),
            None => self.default.as_ref(),
        }
    }
}
