//! # Butterfly-map CLI
//!
//! Command-line front end for the butterfly-map library: routes, snapping,
//! points of interest, isochrones and place search from the terminal.

use std::sync::Arc;

use anyhow::{bail, Context};
use butterfly_map::{
    locate, spawn_search, BoundingBox, Coordinate, EnvPosition, IsochroneSpec, Key,
    NominatimClient, OrsClient, Phase, Place, PoiOptions, PoiSearch, Profile, RangeUnit,
    SearchConfig, SearchEvent, ServiceConfig,
};
use clap::{Parser, Subcommand};
use log::{error, LevelFilter};
use serde_json::json;

mod cli;

/// Command-line interface for butterfly-map
#[derive(Parser)]
#[command(name = "butterfly-map")]
#[command(about = "Routing, POI, isochrone and place search against openrouteservice and Nominatim")]
#[command(long_about = "Queries openrouteservice and Nominatim the way the butterfly map does:
  butterfly-map route 50.85,4.35 50.88,4.70             # Car route, Brussels to Leuven
  butterfly-map poi --center 50.85,4.35 --buffer 800    # POIs around a point
  butterfly-map poi --bbox 4.30,50.82,4.40,50.88        # POIs inside a box
  butterfly-map isochrone --center 50.85,4.35 -u time -r 30 -i 10
  butterfly-map search \"grand place\" --pick 0

Coordinates are given as lat,lon. Boxes are minLon,minLat,maxLon,maxLat.
Set ORS_API_KEY for openrouteservice calls. When --center is omitted, the
position is taken from BUTTERFLY_MAP_POSITION.")]
#[command(version = env!("BUTTERFLY_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Hide the progress spinner
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Route between two points
    Route {
        #[arg(allow_hyphen_values = true)]
        from: Coordinate,
        #[arg(allow_hyphen_values = true)]
        to: Coordinate,
        #[arg(short, long, default_value = "driving-car")]
        profile: Profile,
    },

    /// Snap GPS points onto the road network
    Snap {
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
        points: Vec<Coordinate>,
        #[arg(short, long, default_value = "driving-car")]
        profile: Profile,
        /// Search radius in meters
        #[arg(long, default_value_t = 300.0)]
        radius: f64,
    },

    /// Points of interest around a point or inside a box
    Poi {
        #[arg(long, conflicts_with = "bbox", allow_hyphen_values = true)]
        center: Option<Coordinate>,
        /// Buffer around the center in meters (clamped to 50..5000)
        #[arg(long)]
        buffer: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        bbox: Option<BoundingBox>,
        /// Category ids, comma separated
        #[arg(long = "category", value_delimiter = ',')]
        categories: Vec<u32>,
    },

    /// Reachability polygons around a point
    Isochrone {
        #[arg(long, allow_hyphen_values = true)]
        center: Option<Coordinate>,
        #[arg(short, long, default_value = "driving-car")]
        profile: Profile,
        /// distance (km) or time (min)
        #[arg(short, long, default_value = "time")]
        unit: RangeUnit,
        #[arg(short, long)]
        range: f64,
        #[arg(short, long)]
        interval: f64,
    },

    /// Free-text place search
    Search {
        text: String,
        #[arg(long, allow_hyphen_values = true)]
        viewbox: Option<BoundingBox>,
        /// Select the candidate at this index instead of listing them all
        #[arg(long)]
        pick: Option<usize>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("❌ Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging to stderr
    let mut logger = env_logger::Builder::from_default_env();
    logger.target(env_logger::Target::Stderr);
    if cli.verbose {
        logger.filter_level(LevelFilter::Debug);
    }
    logger.init();

    if cli.verbose {
        eprintln!("🦋 Butterfly-map v{} starting...", env!("BUTTERFLY_VERSION"));
    }

    let config = ServiceConfig::from_env().context("Invalid environment configuration")?;
    if cli.verbose {
        config.log();
    }

    match cli.command {
        Command::Route { from, to, profile } => {
            let client = OrsClient::new(config)?;
            let message = format!("🧭 Routing {from} → {to}");
            let route = spin(&message, cli.quiet, client.route(from, to, profile)).await?;
            if cli.json {
                print_json(&json!({
                    "distance_m": route.summary.distance_m,
                    "duration_s": route.summary.duration_s,
                    "path": route.path.iter().map(|c| [c.lat, c.lon]).collect::<Vec<_>>(),
                }))?;
            } else {
                println!(
                    "{profile}: {:.1} km, {} ({} points)",
                    route.summary.distance_km(),
                    route.summary.format_duration(),
                    route.path.len()
                );
            }
        }

        Command::Snap { points, profile, radius } => {
            let client = OrsClient::new(config)?;
            let snapped =
                spin("📍 Snapping", cli.quiet, client.snap(&points, profile, radius)).await?;
            if cli.json {
                let rows: Vec<_> = snapped
                    .iter()
                    .map(|p| {
                        json!({
                            "source_id": p.source_id,
                            "location": [p.location.lat, p.location.lon],
                            "snapped_distance": p.snapped_distance,
                            "name": p.name,
                        })
                    })
                    .collect();
                print_json(&json!(rows))?;
            } else {
                for point in &snapped {
                    println!(
                        "#{} → {} ({:.1} m){}",
                        point.source_id,
                        point.location,
                        point.snapped_distance.unwrap_or(0.0),
                        point.name.as_deref().map(|n| format!(" {n}")).unwrap_or_default()
                    );
                }
                if snapped.len() < points.len() {
                    eprintln!("⚠️  {} point(s) could not be snapped", points.len() - snapped.len());
                }
            }
        }

        Command::Poi { center, buffer, bbox, categories } => {
            let search = match (center, bbox) {
                (Some(center), _) => PoiSearch::Point { center, buffer },
                (None, Some(bbox)) => PoiSearch::Area { bbox: Some(bbox) },
                (None, None) => PoiSearch::Point { center: here().await?, buffer },
            };
            let client = OrsClient::new(config)?;
            let opts = PoiOptions { search, categories };
            let pois = spin("🔎 Looking for places", cli.quiet, client.pois(&opts)).await?;
            if cli.json {
                print_json(&pois.to_geojson())?;
            } else {
                for poi in &pois.features {
                    let distance = poi
                        .properties
                        .distance
                        .map(|d| format!(" ({d:.0} m)"))
                        .unwrap_or_default();
                    println!("{} {}{distance}", poi.coordinate, poi.properties.display_name());
                }
                println!("{} place(s)", pois.features.len());
            }
        }

        Command::Isochrone { center, profile, unit, range, interval } => {
            let center = match center {
                Some(center) => center,
                None => here().await?,
            };
            let spec = IsochroneSpec { profile, center, unit, range, interval };
            let client = OrsClient::new(config)?;
            let bands =
                spin("🗺️  Computing reachability", cli.quiet, client.isochrones(&spec)).await?;
            if cli.json {
                let rows: Vec<_> = bands
                    .iter()
                    .map(|b| {
                        json!({
                            "value": b.value,
                            "ring": b.ring.iter().map(|c| [c.lat, c.lon]).collect::<Vec<_>>(),
                        })
                    })
                    .collect();
                print_json(&json!(rows))?;
            } else {
                let unit_label = match unit {
                    RangeUnit::Distance => "m",
                    RangeUnit::Time => "s",
                };
                for band in &bands {
                    println!("{:>8.0} {unit_label}: {} vertices", band.value, band.ring.len());
                }
            }
        }

        Command::Search { text, viewbox, pick } => {
            search_places(&config, text, viewbox, pick, cli.json, cli.quiet).await?;
        }
    }

    Ok(())
}

/// Drives a search session the way the map's search box does
async fn search_places(
    config: &ServiceConfig,
    text: String,
    viewbox: Option<BoundingBox>,
    pick: Option<usize>,
    as_json: bool,
    quiet: bool,
) -> anyhow::Result<()> {
    let geocoder = Arc::new(NominatimClient::new(config)?);
    let mut session = spawn_search(geocoder, SearchConfig::default());

    if let Some(viewbox) = viewbox {
        session.send(SearchEvent::Viewport(viewbox))?;
    }
    session.input(text)?;

    let settled = spin("🔎 Searching", quiet, session.wait_for(|s| s.phase == Phase::Settled))
        .await
        .context("Search session stopped unexpectedly")?;

    let Some(index) = pick else {
        if as_json {
            let rows: Vec<_> = settled.results.iter().map(place_json).collect();
            print_json(&json!(rows))?;
        } else {
            for (i, place) in settled.results.iter().enumerate() {
                println!("[{i}] {} ({})", place.label, place.coordinate);
            }
        }
        return Ok(());
    };

    if index >= settled.results.len() {
        bail!("No candidate at index {index} ({} found)", settled.results.len());
    }
    for _ in 0..index {
        session.key(Key::ArrowDown)?;
    }
    session.key(Key::Enter)?;

    let place = session
        .next_selection()
        .await
        .context("Search session stopped before a place was selected")?;
    if as_json {
        print_json(&place_json(&place))?;
    } else {
        println!("{} ({})", place.label, place.coordinate);
    }
    Ok(())
}

/// Current position, for commands run without an explicit center
async fn here() -> anyhow::Result<Coordinate> {
    let position = locate(&EnvPosition)
        .await
        .context("No --center given and the current position is unknown")?;
    log::info!("Using current position {}", position.coordinate);
    Ok(position.coordinate)
}

async fn spin<F: std::future::Future>(message: &str, quiet: bool, future: F) -> F::Output {
    cli::ProgressManager::new(message, quiet).run(future).await
}

fn place_json(place: &Place) -> serde_json::Value {
    json!({
        "id": place.id.to_string(),
        "label": place.label,
        "lat": place.coordinate.lat,
        "lon": place.coordinate.lon,
    })
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
