use anyhow::Result;
use geom::Time;
use serde::Serialize;

use crate::Routes;

impl Routes {
    /// One row per route
    pub fn export_to_csv(&self) -> Result<String> {
        let mut out = Vec::new();
        {
            let mut writer = csv::Writer::from_writer(&mut out);
            for (idx, route) in self.iter().enumerate() {
                writer.serialize(ExportRouteRow {
                    route: idx,
                    start_time: route.start_time,
                    end_time: route.end_time,
                    num_samples: route.num_samples(),
                    zone: route
                        .zone
                        .and_then(|id| self.zones().get(id))
                        .map(|zone| zone.name.clone()),
                    stop_time_seconds: route.stats.stop_time.inner_seconds(),
                    moving_time_seconds: route.stats.moving_time.inner_seconds(),
                    distance_meters: route.stats.distance.inner_meters(),
                    stops: route.stats.stops,
                })?;
            }
            writer.flush()?;
        }
        let out = String::from_utf8(out)?;
        Ok(out)
    }

    /// Each route as a LineString in the samples' planar coordinates, with stats as properties.
    /// Single-sample routes become Points.
    pub fn export_to_geojson(&self) -> Result<String> {
        use geojson::{Feature, FeatureCollection, GeoJson};

        let mut features = Vec::new();
        for (idx, route) in self.iter().enumerate() {
            let coords: Vec<Vec<f64>> = self
                .route_samples(idx)?
                .iter()
                .map(|s| vec![s.pos.x(), s.pos.y()])
                .collect();
            let value = if coords.len() == 1 {
                geojson::Value::Point(coords[0].clone())
            } else {
                geojson::Value::LineString(coords)
            };

            let mut feature = Feature {
                bbox: None,
                geometry: Some(geojson::Geometry::new(value)),
                id: None,
                properties: None,
                foreign_members: None,
            };
            feature.set_property("route", idx);
            feature.set_property("start_time", route.start_time.to_string());
            feature.set_property("end_time", route.end_time.to_string());
            feature.set_property("stop_time_seconds", route.stats.stop_time.inner_seconds());
            feature.set_property(
                "moving_time_seconds",
                route.stats.moving_time.inner_seconds(),
            );
            feature.set_property("distance_meters", route.stats.distance.inner_meters());
            feature.set_property("stops", route.stats.stops);
            features.push(feature);
        }

        let gj = GeoJson::FeatureCollection(FeatureCollection {
            features,
            bbox: None,
            foreign_members: None,
        });
        Ok(serde_json::to_string_pretty(&gj)?)
    }
}

#[derive(Serialize)]
struct ExportRouteRow {
    route: usize,
    start_time: Time,
    end_time: Time,
    num_samples: usize,
    zone: Option<String>,
    stop_time_seconds: f64,
    moving_time_seconds: f64,
    distance_meters: f64,
    stops: usize,
}
