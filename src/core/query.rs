//! Request payloads for the routing, snapping, POI and isochrone endpoints
//!
//! Every builder takes UI-order coordinates and emits backend-order payloads.
//! Builders validate before constructing anything; a builder that returns
//! `None` or an error means no request must be sent.

use serde::Serialize;

use crate::core::coords::{to_backend_order, BoundingBox, Coordinate, LonLat};
use crate::core::error::Result;
use crate::core::isochrone::{plan_thresholds, RangeUnit};
use crate::core::profile::Profile;

/// Maximum POIs requested per query
pub const POI_LIMIT: u32 = 100;

/// Buffer around a POI center when the caller does not pick one (meters)
pub const DEFAULT_POI_BUFFER_M: u32 = 500;

pub const MIN_POI_BUFFER_M: u32 = 50;
pub const MAX_POI_BUFFER_M: u32 = 5000;

/// A payload that knows which endpoint it is posted to
pub trait BackendRequest: Serialize {
    /// Path relative to the service base URL
    fn path(&self) -> String;
}

/// Body of `POST v2/directions/{profile}/geojson`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteRequest {
    #[serde(skip)]
    pub profile: Profile,
    pub coordinates: Vec<LonLat>,
}

impl BackendRequest for RouteRequest {
    fn path(&self) -> String {
        format!("v2/directions/{}/geojson", self.profile)
    }
}

/// Body of `POST v2/snap/{profile}/geojson`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapRequest {
    #[serde(skip)]
    pub profile: Profile,
    pub locations: Vec<LonLat>,
    pub radius: f64,
}

impl BackendRequest for SnapRequest {
    fn path(&self) -> String {
        format!("v2/snap/{}/geojson", self.profile)
    }
}

/// GeoJSON point used as the POI search center
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoJsonPoint {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub coordinates: LonLat,
}

impl GeoJsonPoint {
    pub fn new(coordinates: LonLat) -> Self {
        Self {
            kind: "Point",
            coordinates,
        }
    }
}

/// Where the POI search looks. The two variants are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PoiGeometry {
    /// Circle around a point, `buffer` in meters
    Point { geojson: GeoJsonPoint, buffer: u32 },
    /// Nested `[[minLon, minLat], [maxLon, maxLat]]` box
    BoundingBox { bbox: [LonLat; 2] },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoiFilters {
    pub category_ids: Vec<u32>,
}

/// Body of `POST pois`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoiRequest {
    pub request: &'static str,
    pub limit: u32,
    pub geometry: PoiGeometry,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<PoiFilters>,
}

impl BackendRequest for PoiRequest {
    fn path(&self) -> String {
        "pois".to_string()
    }
}

/// Body of `POST v2/isochrones/{profile}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IsochroneRequest {
    #[serde(skip)]
    pub profile: Profile,
    pub locations: Vec<LonLat>,
    pub range_type: RangeUnit,
    pub range: Vec<u64>,
}

impl BackendRequest for IsochroneRequest {
    fn path(&self) -> String {
        format!("v2/isochrones/{}", self.profile)
    }
}

/// UI-level POI search intent
#[derive(Debug, Clone, PartialEq)]
pub enum PoiSearch {
    /// Around a clicked point; buffer in meters, `None` for the default
    Point {
        center: Coordinate,
        buffer: Option<f64>,
    },
    /// Inside the visible map area, when the map has reported one
    Area { bbox: Option<BoundingBox> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PoiOptions {
    pub search: PoiSearch,
    /// Category identifiers; empty means no filter
    pub categories: Vec<u32>,
}

/// UI-level isochrone intent. `range` and `interval` are in kilometers or minutes.
#[derive(Debug, Clone, PartialEq)]
pub struct IsochroneSpec {
    pub profile: Profile,
    pub center: Coordinate,
    pub unit: RangeUnit,
    pub range: f64,
    pub interval: f64,
}

/// Route between two clicked points
pub fn build_route(start: Coordinate, end: Coordinate, profile: Profile) -> RouteRequest {
    RouteRequest {
        profile,
        coordinates: vec![to_backend_order(start), to_backend_order(end)],
    }
}

/// Snap GPS points to the road network; `radius` is passed through as given
pub fn build_snap(points: &[Coordinate], profile: Profile, radius: f64) -> SnapRequest {
    SnapRequest {
        profile,
        locations: points.iter().copied().map(to_backend_order).collect(),
        radius,
    }
}

/// Clamps a POI buffer into the accepted range, defaulting when unset or not a number
pub fn clamp_buffer(buffer: Option<f64>) -> u32 {
    match buffer {
        Some(b) if !b.is_nan() => {
            b.round()
                .clamp(MIN_POI_BUFFER_M as f64, MAX_POI_BUFFER_M as f64) as u32
        }
        _ => DEFAULT_POI_BUFFER_M,
    }
}

/// POI query payload, or `None` when the intent cannot produce a valid request
pub fn build_poi(opts: &PoiOptions) -> Option<PoiRequest> {
    let geometry = match &opts.search {
        PoiSearch::Point { center, buffer } => {
            if !center.is_finite() {
                log::warn!("POI search skipped: center {center:?} is not a finite coordinate");
                return None;
            }
            PoiGeometry::Point {
                geojson: GeoJsonPoint::new(to_backend_order(*center)),
                buffer: clamp_buffer(*buffer),
            }
        }
        PoiSearch::Area { bbox } => match bbox {
            Some(bbox) if bbox.is_finite() => {
                let [[min_lon, min_lat], [max_lon, max_lat]] = bbox.to_nested();
                PoiGeometry::BoundingBox {
                    bbox: [LonLat(min_lon, min_lat), LonLat(max_lon, max_lat)],
                }
            }
            Some(bbox) => {
                log::warn!("POI search skipped: bounding box {bbox:?} has non-finite components");
                return None;
            }
            None => {
                log::warn!("POI search skipped: no bounding box for area search");
                return None;
            }
        },
    };

    let filters = if opts.categories.is_empty() {
        None
    } else {
        let mut category_ids = opts.categories.clone();
        category_ids.sort_unstable();
        category_ids.dedup();
        Some(PoiFilters { category_ids })
    };

    Some(PoiRequest {
        request: "pois",
        limit: POI_LIMIT,
        geometry,
        filters,
    })
}

/// Isochrone payload for a single center.
///
/// Fails with `InvalidInput` when the range needs more thresholds than the
/// backend accepts.
pub fn build_isochrone(spec: &IsochroneSpec) -> Result<IsochroneRequest> {
    Ok(IsochroneRequest {
        profile: spec.profile,
        locations: vec![to_backend_order(spec.center)],
        range_type: spec.unit,
        range: plan_thresholds(spec.range, spec.interval, spec.unit)?,
    })
}
