#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

mod config;

use std::io::{BufWriter, Write};
use std::path::Path;

use abstutil::{prettyprint_usize, Timer};
use anyhow::Result;
use chrono::{NaiveDate, NaiveTime};
use geom::Duration;
use structopt::StructOpt;

use routes::avl::{self, TimeWindow};
use routes::stats::record_daily_summary;
use routes::{
    BoundaryPolicy, CurveFitZones, DailySummary, EntityName, Routes, SegmentationOptions,
};

use self::config::{Carrier, Config};

#[derive(StructOpt)]
struct Args {
    /// The path to a CSV file with samples
    #[structopt(long)]
    avl: String,
    /// JSON listing carriers and curve fitting zones. Without it, every entity in the input is
    /// analyzed and nothing is curve fit.
    #[structopt(long)]
    config: Option<String>,
    /// JSON with curve fitting zones, replacing any from --config
    #[structopt(long)]
    zones: Option<String>,
    /// Only look at samples from this day (YYYY-MM-DD), starting at --hour and --minute
    #[structopt(long)]
    date: Option<NaiveDate>,
    #[structopt(long, default_value = "0")]
    hour: u32,
    #[structopt(long, default_value = "0")]
    minute: u32,
    /// How many minutes of samples to look at, up to 120
    #[structopt(long, default_value = "120")]
    duration: u32,
    /// Start a new route when motion stops for longer than this many seconds
    #[structopt(long, default_value = "30")]
    threshold: f64,
    /// Samples further apart than this many seconds belong to different motion segments. Has to be
    /// at most --threshold.
    #[structopt(long, default_value = "10")]
    noise_tolerance: f64,
    /// Daily summaries are merged into this file
    #[structopt(long, default_value = "stats.json")]
    stats: String,
    /// Only replay this route, instead of all of them
    #[structopt(long)]
    route: Option<usize>,
    /// Write playback events as JSON lines to this path
    #[structopt(long)]
    playback: Option<String>,
    /// Write a table of routes to this path
    #[structopt(long)]
    routes_csv: Option<String>,
    /// Write route paths as GeoJSON to this path
    #[structopt(long)]
    geojson: Option<String>,
}

impl Args {
    fn window(&self) -> Result<Option<TimeWindow>> {
        let date = match self.date {
            Some(date) => date,
            None => return Ok(None),
        };
        if self.duration > 120 {
            bail!("--duration is {} minutes, but can be at most 120", self.duration);
        }
        let time = match NaiveTime::from_hms_opt(self.hour, self.minute, 0) {
            Some(time) => time,
            None => bail!("--hour {} --minute {} isn't a valid time", self.hour, self.minute),
        };
        Ok(Some(TimeWindow::new(
            date.and_time(time),
            chrono::Duration::minutes(self.duration as i64),
        )))
    }
}

fn main() -> Result<()> {
    abstutil::logger::setup();

    let args = Args::from_iter(abstutil::cli_args());
    let mut timer = Timer::new("analyze routes");
    run(args, &mut timer)
}

fn run(args: Args, timer: &mut Timer) -> Result<()> {
    let window = args.window()?;
    let mut config = match args.config {
        Some(ref path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(ref path) = args.zones {
        config.zones = CurveFitZones::load(path)?;
    }

    timer.start("load samples");
    let data = avl::load(fs_err::File::open(&args.avl)?, window)?;
    timer.stop("load samples");
    let mut samples_per_entity = data.samples_per_entity;
    let date = args.date.or(data.date);

    let carriers: Vec<Carrier> = if config.carriers.is_empty() {
        samples_per_entity
            .keys()
            .cloned()
            .map(Carrier::unconfigured)
            .collect()
    } else {
        config.carriers.clone()
    };

    let opts = SegmentationOptions {
        noise_tolerance: Duration::seconds(args.noise_tolerance),
        ..SegmentationOptions::default()
    };

    let mut playback_out = match args.playback {
        Some(ref path) => Some(BufWriter::new(fs_err::File::create(path)?)),
        None => None,
    };

    timer.start_iter("segment carriers", carriers.len());
    for carrier in &carriers {
        timer.next();
        let samples = match samples_per_entity.remove(&carrier.tag) {
            Some(samples) if !samples.is_empty() => samples,
            _ => {
                warn!("No data for {} in {:?}", carrier.name, window);
                continue;
            }
        };
        let num_samples = samples.len();

        let routes = Routes::new(
            samples,
            config.zones.clone(),
            BoundaryPolicy::time_gap(Duration::seconds(args.threshold)),
            &opts,
        )?;
        print_summary(carrier, num_samples, &routes);

        match date {
            Some(date) => record_daily_summary(
                &args.stats,
                date,
                &EntityName::new(carrier.name.clone()),
                DailySummary::from_routes(&routes),
            )?,
            None => warn!("No date known for {}, not recording stats", carrier.name),
        }

        if let Some(ref mut out) = playback_out {
            let mut count = 0;
            for ev in routes.generate_playback(args.route, &carrier.styling())? {
                writeln!(out, "{}", serde_json::to_string(&ev)?)?;
                count += 1;
            }
            info!("Wrote {} playback events for {}", prettyprint_usize(count), carrier.name);
        }
        if let Some(ref path) = args.routes_csv {
            fs_err::write(
                output_path(path, carrier, carriers.len()),
                routes.export_to_csv()?,
            )?;
        }
        if let Some(ref path) = args.geojson {
            fs_err::write(
                output_path(path, carrier, carriers.len()),
                routes.export_to_geojson()?,
            )?;
        }
    }

    if let Some(mut out) = playback_out {
        out.flush()?;
    }
    Ok(())
}

fn print_summary(carrier: &Carrier, num_samples: usize, routes: &Routes) {
    println!(
        "{} ({:?}), {} samples",
        carrier.name,
        carrier.tag,
        prettyprint_usize(num_samples)
    );
    println!("  Number of routes: {}", routes.len());
    println!("  Number of stops: {}", routes.number_of_stops());
    println!("  Sum of stop time: {}", routes.sum_stop_time());
    println!("  Sum of moving time: {}", routes.sum_moving_time());
    println!("  Sum of distance: {}", routes.sum_distance());
    for (idx, route) in routes.iter().enumerate() {
        println!(
            "  - Route {idx}: {} to {}, {} samples, {} travelled, {} stops",
            route.start_time,
            route.end_time,
            prettyprint_usize(route.num_samples()),
            route.stats.distance,
            route.stats.stops
        );
    }
}

// With more than one carrier, each gets its own file: routes.csv becomes routes_truck.csv
fn output_path(path: &str, carrier: &Carrier, num_carriers: usize) -> String {
    if num_carriers <= 1 {
        return path.to_string();
    }
    let path = Path::new(path);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let file = match path.extension() {
        Some(ext) => format!("{stem}_{}.{}", carrier.name, ext.to_string_lossy()),
        None => format!("{stem}_{}", carrier.name),
    };
    path.with_file_name(file).to_string_lossy().to_string()
}
