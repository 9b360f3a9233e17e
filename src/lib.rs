//! # Butterfly-map Library
//!
//! Query building and response normalization for an openrouteservice and
//! Nominatim backed map.
//!
//! ## Features
//!
//! - **Coordinate conventions**: UI-facing `lat, lon` values, backend-facing `[lon, lat]` arrays
//! - **Query builders**: route, snap, POI and isochrone payloads with validation and clamping
//! - **Response repair**: POI bodies containing bare `NaN`/`Infinity` are made parseable
//! - **Search session**: debounced place search where the last request always wins
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use butterfly_map::{Coordinate, Profile};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads ORS_API_KEY and friends from the environment
//!     let route = butterfly_map::route(
//!         Coordinate::new(50.85, 4.35),
//!         Coordinate::new(50.88, 4.70),
//!         Profile::CyclingRegular,
//!     )
//!     .await?;
//!     println!("{:.1} km, {}", route.summary.distance_km(), route.summary.format_duration());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Place Search
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use butterfly_map::{spawn_search, Key, NominatimClient, Phase, SearchConfig, ServiceConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let geocoder = Arc::new(NominatimClient::new(&ServiceConfig::from_env()?)?);
//!     let mut search = spawn_search(geocoder, SearchConfig::default());
//!
//!     search.input("brussels")?;
//!     if let Some(snapshot) = search.wait_for(|s| s.phase == Phase::Settled).await {
//!         println!("{} candidates", snapshot.results.len());
//!     }
//!     search.key(Key::Enter)?;
//!     let chosen = search.next_selection().await;
//!     println!("{chosen:?}");
//!
//!     Ok(())
//! }
//! ```

use once_cell::sync::OnceCell;

pub use crate::core::client::OrsClient;
pub use crate::core::config::{
    SearchConfig, ServiceConfig, DEFAULT_NOMINATIM_BASE_URL, DEFAULT_ORS_BASE_URL, ENV_VARIABLES,
};
pub use crate::core::coords::{
    flat_to_nested, nested_to_flat, to_backend_order, to_ui_order, BoundingBox, Coordinate,
    FlatBox, LonLat, NestedBox,
};
pub use crate::core::error::{Error, Result};
pub use crate::core::geocoding::{
    parse_places, Geocoder, NominatimClient, Place, PlaceId, SearchQuery,
};
pub use crate::core::geolocation::{
    locate, Accuracy, EnvPosition, GeolocationError, Position, PositionSource, ATTEMPTS,
    POSITION_ENV,
};
pub use crate::core::isochrone::{
    plan_steps, plan_thresholds, to_meters, to_seconds, RangeUnit, MAX_ISOCHRONE_STEPS,
    MAX_THRESHOLD,
};
pub use crate::core::normalize::{
    normalize_poi_response, repair_non_finite, PoiCategory, PoiFeature, PoiFeatureCollection,
    PoiProperties,
};
pub use crate::core::profile::{suggest_profile, Profile};
pub use crate::core::query::{
    build_isochrone, build_poi, build_route, build_snap, clamp_buffer, BackendRequest,
    GeoJsonPoint, IsochroneRequest, IsochroneSpec, PoiFilters, PoiGeometry, PoiOptions,
    PoiRequest, PoiSearch, RouteRequest, SnapRequest, DEFAULT_POI_BUFFER_M, MAX_POI_BUFFER_M,
    MIN_POI_BUFFER_M, POI_LIMIT,
};
pub use crate::core::response::{
    parse_features, parse_isochrones, parse_route, parse_snap, Feature, Geometry, IsochroneBand,
    Route, RouteSummary, SnappedPoint,
};
pub use crate::core::search::{spawn_search, SearchHandle};
pub use crate::core::session::{Action, Key, Phase, SearchEvent, SearchSession, SearchSnapshot};

// Internal modules
mod core;

static DEFAULT_CLIENT: OnceCell<OrsClient> = OnceCell::new();

/// Shared client configured from the environment, built on first use
pub fn default_client() -> Result<&'static OrsClient> {
    DEFAULT_CLIENT.get_or_try_init(|| {
        let config = ServiceConfig::from_env()?;
        config.log();
        OrsClient::new(config)
    })
}

/// Route between two points using the default client
///
/// # Examples
/// ```rust,no_run
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use butterfly_map::{Coordinate, Profile};
///
/// let route = butterfly_map::route(
///     Coordinate::new(48.8566, 2.3522),
///     Coordinate::new(48.8049, 2.1204),
///     Profile::DrivingCar,
/// )
/// .await?;
/// assert!(!route.path.is_empty());
/// # Ok(())
/// # }
/// ```
pub async fn route(start: Coordinate, end: Coordinate, profile: Profile) -> Result<Route> {
    default_client()?.route(start, end, profile).await
}

/// Snap GPS points onto the road network using the default client
pub async fn snap(
    points: &[Coordinate],
    profile: Profile,
    radius: f64,
) -> Result<Vec<SnappedPoint>> {
    default_client()?.snap(points, profile, radius).await
}

/// Points of interest around a point or inside a box, using the default client
///
/// An intent without a usable center or box returns an empty collection.
pub async fn pois(opts: &PoiOptions) -> Result<PoiFeatureCollection> {
    default_client()?.pois(opts).await
}

/// Reachability polygons, smallest first, using the default client
///
/// # Examples
/// ```rust,no_run
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use butterfly_map::{Coordinate, IsochroneSpec, Profile, RangeUnit};
///
/// // 30 minutes of walking in 10 minute bands
/// let spec = IsochroneSpec {
///     profile: Profile::FootWalking,
///     center: Coordinate::new(50.85, 4.35),
///     unit: RangeUnit::Time,
///     range: 30.0,
///     interval: 10.0,
/// };
/// let bands = butterfly_map::isochrones(&spec).await?;
/// println!("{} bands", bands.len());
/// # Ok(())
/// # }
/// ```
pub async fn isochrones(spec: &IsochroneSpec) -> Result<Vec<IsochroneBand>> {
    default_client()?.isochrones(spec).await
}

/// One-shot place search without debouncing
pub async fn search(text: &str, viewbox: Option<BoundingBox>) -> Result<Vec<Place>> {
    let config = ServiceConfig::from_env()?;
    let geocoder = NominatimClient::new(&config)?;
    let query = SearchQuery {
        text: text.trim().to_string(),
        viewbox,
        limit: SearchConfig::default().limit,
    };
    geocoder.search(&query).await
}
