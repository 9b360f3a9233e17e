//! Decoding of route, snap and isochrone GeoJSON responses

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::core::coords::{to_ui_order, Coordinate, LonLat};
use crate::core::error::{Error, Result};

/// GeoJSON geometry, positions kept as raw `[lon, lat, (ele)]` arrays
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Vec<f64>),
    LineString(Vec<Vec<f64>>),
    Polygon(Vec<Vec<Vec<f64>>>),
    MultiPolygon(Vec<Vec<Vec<Vec<f64>>>>),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// Totals reported for a route, in meters and seconds
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct RouteSummary {
    #[serde(default, rename = "distance")]
    pub distance_m: f64,
    #[serde(default, rename = "duration")]
    pub duration_s: f64,
}

impl RouteSummary {
    pub fn distance_km(&self) -> f64 {
        self.distance_m / 1000.0
    }

    /// `"42 min"` or `"1 h 05 min"`
    pub fn format_duration(&self) -> String {
        let minutes = (self.duration_s / 60.0).round() as u64;
        if minutes < 60 {
            format!("{minutes} min")
        } else {
            format!("{} h {:02} min", minutes / 60, minutes % 60)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub summary: RouteSummary,
    /// Route line in UI order
    pub path: Vec<Coordinate>,
}

/// A GPS point moved onto the road network
#[derive(Debug, Clone, PartialEq)]
pub struct SnappedPoint {
    /// Index of the input location this point came from
    pub source_id: usize,
    pub location: Coordinate,
    pub snapped_distance: Option<f64>,
    pub name: Option<String>,
}

/// One reachability polygon
#[derive(Debug, Clone, PartialEq)]
pub struct IsochroneBand {
    /// Threshold in meters or seconds
    pub value: f64,
    /// Outer ring in UI order
    pub ring: Vec<Coordinate>,
}

/// Parses a FeatureCollection body and returns its features
pub fn parse_features(body: &str) -> Result<Vec<Feature>> {
    let value: Value = serde_json::from_str(body)?;
    let features = value
        .get("features")
        .filter(|f| f.is_array())
        .cloned()
        .ok_or_else(|| Error::UnexpectedShape("response has no 'features' array".to_string()))?;

    Vec::<Feature>::deserialize(features)
        .map_err(|e| Error::UnexpectedShape(format!("invalid feature: {e}")))
}

fn position(raw: &[f64]) -> Option<Coordinate> {
    match raw {
        [lon, lat, ..] if lon.is_finite() && lat.is_finite() => {
            Some(to_ui_order(LonLat(*lon, *lat)))
        }
        _ => None,
    }
}

/// Route summary and line from the first feature of a directions response
pub fn parse_route(body: &str) -> Result<Route> {
    let features = parse_features(body)?;
    let first = features
        .into_iter()
        .next()
        .ok_or_else(|| Error::UnexpectedShape("directions response has no route".to_string()))?;

    let summary = match first.properties.get("summary") {
        Some(raw) => RouteSummary::deserialize(raw)
            .map_err(|e| Error::UnexpectedShape(format!("invalid route summary: {e}")))?,
        None => {
            return Err(Error::UnexpectedShape(
                "route has no 'summary' property".to_string(),
            ))
        }
    };

    let path = match first.geometry {
        Some(Geometry::LineString(line)) => line.iter().filter_map(|p| position(p)).collect(),
        _ => Vec::new(),
    };

    Ok(Route { summary, path })
}

/// Snapped points from a snap response; unsnappable inputs are simply absent
pub fn parse_snap(body: &str) -> Result<Vec<SnappedPoint>> {
    let features = parse_features(body)?;
    let mut points = Vec::with_capacity(features.len());

    for (index, feature) in features.into_iter().enumerate() {
        let Some(Geometry::Point(raw)) = &feature.geometry else {
            continue;
        };
        let Some(location) = position(raw) else {
            continue;
        };
        let props = &feature.properties;
        points.push(SnappedPoint {
            source_id: props
                .get("source_id")
                .and_then(Value::as_u64)
                .map_or(index, |id| id as usize),
            location,
            snapped_distance: props.get("snapped_distance").and_then(Value::as_f64),
            name: props.get("name").and_then(Value::as_str).map(str::to_string),
        });
    }

    Ok(points)
}

/// Isochrone polygons sorted by increasing threshold
pub fn parse_isochrones(body: &str) -> Result<Vec<IsochroneBand>> {
    let features = parse_features(body)?;
    let mut bands = Vec::with_capacity(features.len());

    for feature in features {
        let outer = match &feature.geometry {
            Some(Geometry::Polygon(rings)) => rings.first(),
            Some(Geometry::MultiPolygon(polygons)) => polygons.first().and_then(|p| p.first()),
            _ => None,
        };
        let Some(outer) = outer else {
            log::debug!("Skipping isochrone feature without polygon geometry");
            continue;
        };
        let value = feature
            .properties
            .get("value")
            .and_then(Value::as_f64)
            .ok_or_else(|| Error::UnexpectedShape("isochrone feature has no 'value'".to_string()))?;

        bands.push(IsochroneBand {
            value,
            ring: outer.iter().filter_map(|p| position(p)).collect(),
        });
    }

    bands.sort_by(|a, b| a.value.total_cmp(&b.value));
    Ok(bands)
}
