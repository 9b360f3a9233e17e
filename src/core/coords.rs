//! Coordinate ordering conventions
//!
//! The map UI works in (latitude, longitude) while openrouteservice wants
//! (longitude, latitude). The two orders get distinct types so that every
//! crossing between them is an explicit call.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::error::{Error, Result};

/// A UI-facing position, latitude first
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// True when both components are finite numbers
    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.lat, self.lon)
    }
}

/// Parses `"lat,lon"`
impl FromStr for Coordinate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts = parse_components(s)?;
        if parts.len() != 2 {
            return Err(Error::InvalidInput(format!(
                "Expected 'lat,lon', got '{s}'"
            )));
        }
        Ok(Coordinate::new(parts[0], parts[1]))
    }
}

/// A backend-facing position, longitude first. Serializes as `[lon, lat]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LonLat(pub f64, pub f64);

impl LonLat {
    pub fn lon(&self) -> f64 {
        self.0
    }

    pub fn lat(&self) -> f64 {
        self.1
    }
}

/// Converts a UI coordinate to backend order
pub fn to_backend_order(c: Coordinate) -> LonLat {
    LonLat(c.lon, c.lat)
}

/// Converts a backend pair to a UI coordinate
pub fn to_ui_order(pair: LonLat) -> Coordinate {
    Coordinate::new(pair.1, pair.0)
}

/// `[[minLon, minLat], [maxLon, maxLat]]`
pub type NestedBox = [[f64; 2]; 2];

/// `[minLon, minLat, maxLon, maxLat]`
pub type FlatBox = [f64; 4];

/// Flattens a two-corner box. Fails unless both corners carry two finite values.
pub fn nested_to_flat(nested: &[[f64; 2]]) -> Result<FlatBox> {
    let components: Vec<f64> = nested.iter().take(2).flatten().copied().collect();
    let finite = components.iter().filter(|v| v.is_finite()).count();
    if finite < 4 {
        return Err(Error::Shape(format!(
            "nested bounding box needs 4 finite components, found {finite}"
        )));
    }
    Ok([components[0], components[1], components[2], components[3]])
}

/// Splits a flat box into two corners. Fails unless the first four values are finite.
pub fn flat_to_nested(flat: &[f64]) -> Result<NestedBox> {
    let finite = flat.iter().take(4).filter(|v| v.is_finite()).count();
    if finite < 4 {
        return Err(Error::Shape(format!(
            "flat bounding box needs 4 finite components, found {finite}"
        )));
    }
    Ok([[flat[0], flat[1]], [flat[2], flat[3]]])
}

/// A normalized geographic rectangle (min <= max on both axes)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Builds a box from any two opposite corners
    pub fn from_corners(a: LonLat, b: LonLat) -> Self {
        Self {
            min_lon: a.lon().min(b.lon()),
            min_lat: a.lat().min(b.lat()),
            max_lon: a.lon().max(b.lon()),
            max_lat: a.lat().max(b.lat()),
        }
    }

    pub fn from_flat(flat: &[f64]) -> Result<Self> {
        let [[x1, y1], [x2, y2]] = flat_to_nested(flat)?;
        Ok(Self::from_corners(LonLat(x1, y1), LonLat(x2, y2)))
    }

    pub fn from_nested(nested: &[[f64; 2]]) -> Result<Self> {
        let flat = nested_to_flat(nested)?;
        Self::from_flat(&flat)
    }

    /// Smallest box containing every point, or `None` when the iterator is empty.
    /// Callers filter out non-finite points beforehand.
    pub fn enclosing<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = LonLat>,
    {
        points.into_iter().fold(None, |acc: Option<BoundingBox>, p| {
            Some(match acc {
                None => BoundingBox::from_corners(p, p),
                Some(b) => BoundingBox {
                    min_lon: b.min_lon.min(p.lon()),
                    min_lat: b.min_lat.min(p.lat()),
                    max_lon: b.max_lon.max(p.lon()),
                    max_lat: b.max_lat.max(p.lat()),
                },
            })
        })
    }

    pub fn is_finite(&self) -> bool {
        self.to_flat().iter().all(|v| v.is_finite())
    }

    pub fn to_flat(&self) -> FlatBox {
        [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
    }

    pub fn to_nested(&self) -> NestedBox {
        [[self.min_lon, self.min_lat], [self.max_lon, self.max_lat]]
    }

    /// Nominatim `viewbox` parameter: `left,top,right,bottom`
    pub fn to_viewbox(&self) -> String {
        format!(
            "{},{},{},{}",
            self.min_lon, self.max_lat, self.max_lon, self.min_lat
        )
    }
}

/// Parses `"minLon,minLat,maxLon,maxLat"`
impl FromStr for BoundingBox {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts = parse_components(s)?;
        if parts.len() != 4 {
            return Err(Error::InvalidInput(format!(
                "Expected 'minLon,minLat,maxLon,maxLat', got '{s}'"
            )));
        }
        BoundingBox::from_flat(&parts)
    }
}

fn parse_components(s: &str) -> Result<Vec<f64>> {
    s.split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .map_err(|e| Error::InvalidInput(format!("'{}' is not a number: {e}", part.trim())))
        })
        .collect()
}
