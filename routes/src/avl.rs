//! Loads positional samples from CSV, grouped per entity.

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use geom::{Duration, GPSBounds, LonLat, Pt2D, Time};
use serde::Deserialize;

use crate::{EntityName, Sample};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Only keep samples between these two times, inclusive.
#[derive(Clone, Copy, Debug)]
pub struct TimeWindow {
    pub from: NaiveDateTime,
    pub to: NaiveDateTime,
}

impl TimeWindow {
    pub fn new(from: NaiveDateTime, duration: chrono::Duration) -> Self {
        Self {
            from,
            to: from + duration,
        }
    }

    pub fn contains(&self, datetime: NaiveDateTime) -> bool {
        datetime >= self.from && datetime <= self.to
    }
}

pub struct AvlData {
    /// The calendar date of the first sample. Every `Time` is relative to the start of this day.
    pub date: Option<NaiveDate>,
    /// Only set when the input used longitude and latitude
    pub gps_bounds: Option<GPSBounds>,
    pub samples_per_entity: BTreeMap<EntityName, Vec<Sample>>,
}

pub fn load<R: std::io::Read>(reader: R, window: Option<TimeWindow>) -> Result<AvlData> {
    // Read raw data
    let mut records = Vec::new();
    let mut skipped = 0;
    for rec in csv::Reader::from_reader(reader).deserialize() {
        let rec: Record = rec?;
        let datetime = parse_datetime(&rec.timestamp)?;
        if window.map(|w| w.contains(datetime)).unwrap_or(true) {
            records.push((rec, datetime));
        } else {
            skipped += 1;
        }
    }
    if skipped > 0 {
        info!("Skipped {skipped} samples outside of {:?}", window);
    }

    // Samples in longitude and latitude get projected relative to everything in the file
    let mut gps_bounds = GPSBounds::new();
    let mut any_gps = false;
    for (rec, _) in &records {
        if let Some(gps) = rec.lon_lat() {
            gps_bounds.update(gps);
            any_gps = true;
        }
    }

    let date = records.first().map(|(_, datetime)| datetime.date());
    let mut samples_per_entity: BTreeMap<EntityName, Vec<Sample>> = BTreeMap::new();
    for (rec, datetime) in records {
        // The first date is known if there's any record
        let time = to_time(datetime, date.unwrap_or_else(|| datetime.date()))?;
        let pos = match (rec.x, rec.y, rec.lon_lat()) {
            (Some(x), Some(y), _) => Pt2D::new(x, y),
            (_, _, Some(gps)) => gps.to_pt(&gps_bounds),
            _ => bail!(
                "Sample for {:?} at {} has neither x/y nor longitude/latitude",
                rec.entity,
                rec.timestamp
            ),
        };
        let mut sample = Sample::new(time, pos);
        if let (Some(start), Some(end)) = (&rec.motion_start, &rec.motion_end) {
            let base = date.unwrap_or_else(|| datetime.date());
            sample.motion = Some((
                to_time(parse_datetime(start)?, base)?,
                to_time(parse_datetime(end)?, base)?,
            ));
        }

        samples_per_entity
            .entry(rec.entity)
            .or_insert_with(Vec::new)
            .push(sample);
    }

    for (entity, samples) in &samples_per_entity {
        if let Err(err) = Sample::check_order(samples) {
            bail!("Samples for {entity} aren't sorted: {err}");
        }
    }

    Ok(AvlData {
        date,
        gps_bounds: if any_gps { Some(gps_bounds) } else { None },
        samples_per_entity,
    })
}

fn parse_datetime(raw: &str) -> Result<NaiveDateTime> {
    Ok(NaiveDateTime::parse_from_str(raw.trim(), DATETIME_FORMAT)?)
}

// Samples leaking into following days get 24 hours added per day
fn to_time(datetime: NaiveDateTime, first_date: NaiveDate) -> Result<Time> {
    let days = (datetime.date() - first_date).num_days();
    if days < 0 {
        bail!("{datetime} is before the first day of input, {first_date}");
    }
    let time = datetime.time();
    Ok(Time::START_OF_DAY
        + Duration::hours(24 * days as usize)
        + Duration::hours(time.hour() as usize)
        + Duration::minutes(time.minute() as usize)
        + Duration::seconds(time.second() as f64))
}

#[derive(Deserialize)]
struct Record {
    entity: EntityName,
    timestamp: String,
    #[serde(default)]
    x: Option<f64>,
    #[serde(default)]
    y: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    motion_start: Option<String>,
    #[serde(default)]
    motion_end: Option<String>,
}

impl Record {
    fn lon_lat(&self) -> Option<LonLat> {
        match (self.longitude, self.latitude) {
            (Some(lon), Some(lat)) => Some(LonLat::new(lon, lat)),
            _ => None,
        }
    }
}
