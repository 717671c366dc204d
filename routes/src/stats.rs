//! Daily summaries per entity, persisted as one JSON file keyed by date and then entity name.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{EntityName, Routes};

const DATE_FORMAT: &str = "%d/%m/%Y";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    pub number_of_routes: usize,
    pub number_of_stops: usize,
    /// Seconds
    pub sum_of_stop_time: f64,
    /// Seconds
    pub sum_of_moving_time: f64,
    /// Meters
    pub sum_of_distance: f64,
}

impl DailySummary {
    pub fn from_routes(routes: &Routes) -> Self {
        Self {
            number_of_routes: routes.len(),
            number_of_stops: routes.number_of_stops(),
            sum_of_stop_time: routes.sum_stop_time().inner_seconds(),
            sum_of_moving_time: routes.sum_moving_time().inner_seconds(),
            sum_of_distance: routes.sum_distance().inner_meters(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatsFile {
    // Date string, then entity name
    days: BTreeMap<String, BTreeMap<String, DailySummary>>,
}

impl StatsFile {
    /// A missing file is just empty.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs_err::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs_err::write(path.as_ref(), serde_json::to_string(self)?)?;
        Ok(())
    }

    /// Replaces the summary for this entity on this date, leaving other entities alone.
    pub fn record(&mut self, date: NaiveDate, entity: &EntityName, summary: DailySummary) {
        self.days
            .entry(date_key(date))
            .or_insert_with(BTreeMap::new)
            .insert(entity.0.clone(), summary);
    }

    pub fn get(&self, date: NaiveDate, entity: &EntityName) -> Option<&DailySummary> {
        self.days.get(&date_key(date))?.get(entity.as_str())
    }

    /// Entities with a summary on this date
    pub fn entities_on(&self, date: NaiveDate) -> Vec<EntityName> {
        match self.days.get(&date_key(date)) {
            Some(per_entity) => per_entity.keys().cloned().map(EntityName).collect(),
            None => Vec::new(),
        }
    }

    pub fn num_days(&self) -> usize {
        self.days.len()
    }
}

/// Merges one summary into the file at `path`, creating it if needed.
pub fn record_daily_summary<P: AsRef<Path>>(
    path: P,
    date: NaiveDate,
    entity: &EntityName,
    summary: DailySummary,
) -> Result<()> {
    let path = path.as_ref();
    let mut file = StatsFile::load(path)?;
    file.record(date, entity, summary);
    file.save(path)?;
    info!("Recorded {} stats for {entity} in {}", date_key(date), path.display());
    Ok(())
}

fn date_key(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}
