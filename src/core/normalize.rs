//! POI response repair and validation
//!
//! openrouteservice can emit `NaN` (and occasionally `Infinity`) in numeric
//! positions of the POI response, most visibly inside `bbox` when the result
//! set is empty or degenerate. Those tokens are not JSON, so the raw text is
//! repaired lexically before it is parsed, and an unusable bounding box is
//! recomputed from the features or dropped.

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};

use crate::core::coords::{to_backend_order, to_ui_order, BoundingBox, Coordinate, LonLat};
use crate::core::error::{Error, Result};

/// Longest first so that a signed token is matched before its unsigned tail
const NON_FINITE_TOKENS: [&str; 5] = ["-Infinity", "+Infinity", "Infinity", "-NaN", "NaN"];

/// A POI category attached to a feature
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoiCategory {
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default)]
    pub category_group: Option<String>,
}

/// Display attributes of a POI feature
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoiProperties {
    #[serde(default)]
    pub osm_id: Option<u64>,
    #[serde(default)]
    pub osm_type: Option<u8>,
    /// Distance from the search center in meters
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category_ids: BTreeMap<String, PoiCategory>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub osm_tags: BTreeMap<String, Value>,
}

impl PoiProperties {
    /// Name tag, else the first category name
    pub fn display_name(&self) -> String {
        self.osm_tags
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| {
                self.category_ids
                    .values()
                    .find_map(|c| c.category_name.clone())
            })
            .unwrap_or_else(|| "Unnamed place".to_string())
    }
}

/// A POI with a valid position
#[derive(Debug, Clone, PartialEq)]
pub struct PoiFeature {
    pub coordinate: Coordinate,
    pub properties: PoiProperties,
}

/// Validated POI response
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PoiFeatureCollection {
    pub features: Vec<PoiFeature>,
    /// Present only when the backend sent a usable box or one could be recomputed
    pub bbox: Option<BoundingBox>,
}

impl PoiFeatureCollection {
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// GeoJSON rendering with a flat `bbox`, for display layers and CLI output
    pub fn to_geojson(&self) -> Value {
        let features: Vec<Value> = self
            .features
            .iter()
            .map(|f| {
                json!({
                    "type": "Feature",
                    "geometry": {
                        "type": "Point",
                        "coordinates": [f.coordinate.lon, f.coordinate.lat],
                    },
                    "properties": f.properties,
                })
            })
            .collect();

        let mut collection = json!({ "type": "FeatureCollection", "features": features });
        if let Some(bbox) = self.bbox {
            collection["bbox"] = json!(bbox.to_flat());
        }
        collection
    }
}

/// Replaces standalone non-finite numeric tokens with `null`.
///
/// Works on token boundaries outside string literals only; returns the input
/// untouched (borrowed) when nothing needed replacing.
pub fn repair_non_finite(raw: &str) -> Cow<'_, str> {
    let bytes = raw.as_bytes();
    let mut repaired: Option<String> = None;
    let mut copied_up_to = 0;
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];

        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            i += 1;
            continue;
        }

        if b == b'"' {
            in_string = true;
            i += 1;
            continue;
        }

        if let Some(token) = non_finite_token_at(bytes, i) {
            let out = repaired.get_or_insert_with(|| String::with_capacity(raw.len()));
            out.push_str(&raw[copied_up_to..i]);
            out.push_str("null");
            i += token.len();
            copied_up_to = i;
            continue;
        }

        i += 1;
    }

    match repaired {
        None => Cow::Borrowed(raw),
        Some(mut out) => {
            out.push_str(&raw[copied_up_to..]);
            Cow::Owned(out)
        }
    }
}

fn non_finite_token_at(bytes: &[u8], i: usize) -> Option<&'static str> {
    if i > 0 && is_word_byte(bytes[i - 1]) {
        return None;
    }
    NON_FINITE_TOKENS.into_iter().find(|token| {
        let end = i + token.len();
        bytes[i..].starts_with(token.as_bytes())
            && bytes.get(end).map_or(true, |b| !is_word_byte(*b))
    })
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'.'
}

/// Repairs, parses and validates a raw POI response
pub fn normalize_poi_response(raw: &str) -> Result<PoiFeatureCollection> {
    let repaired = repair_non_finite(raw);
    if let Cow::Owned(_) = repaired {
        log::debug!("POI response contained non-finite literals, replaced with null");
    }

    let value: Value = serde_json::from_str(&repaired)?;
    let root = value.as_object().ok_or_else(|| {
        Error::UnexpectedShape("POI response is not a JSON object".to_string())
    })?;

    let raw_features = root
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            Error::UnexpectedShape("POI response has no 'features' array".to_string())
        })?;

    let mut features = Vec::with_capacity(raw_features.len());
    for raw_feature in raw_features {
        let Some(position) = point_position(raw_feature) else {
            log::debug!("Skipping POI feature without a finite point geometry");
            continue;
        };
        features.push(PoiFeature {
            coordinate: to_ui_order(position),
            properties: feature_properties(raw_feature)?,
        });
    }

    let bbox = resolve_bbox(root, &features);

    Ok(PoiFeatureCollection { features, bbox })
}

/// Keeps a usable `bbox`, recomputes a broken one, omits it when nothing is valid
fn resolve_bbox(root: &Map<String, Value>, features: &[PoiFeature]) -> Option<BoundingBox> {
    let raw_bbox = root.get("bbox")?;
    if let Some(bbox) = parse_bbox(raw_bbox) {
        return Some(bbox);
    }

    let recomputed = BoundingBox::enclosing(
        features.iter().map(|f| to_backend_order(f.coordinate)),
    );
    match recomputed {
        Some(_) => log::debug!("Recomputed invalid POI bbox from {} features", features.len()),
        None => log::warn!("POI bbox invalid and no feature has a valid position, omitting it"),
    }
    recomputed
}

/// Accepts a flat `[minLon, minLat, maxLon, maxLat]` or nested two-corner box
fn parse_bbox(value: &Value) -> Option<BoundingBox> {
    let items = value.as_array()?;
    let flat: Vec<f64> = if items.iter().all(Value::is_array) {
        items
            .iter()
            .flat_map(|corner| corner.as_array().into_iter().flatten())
            .map(Value::as_f64)
            .collect::<Option<Vec<f64>>>()?
    } else {
        items
            .iter()
            .map(Value::as_f64)
            .collect::<Option<Vec<f64>>>()?
    };

    if flat.len() != 4 {
        return None;
    }
    BoundingBox::from_flat(&flat).ok()
}

/// Finite `[lon, lat]` of a Point feature
fn point_position(feature: &Value) -> Option<LonLat> {
    let geometry = feature.get("geometry")?;
    if geometry.get("type")?.as_str()? != "Point" {
        return None;
    }
    let coordinates = geometry.get("coordinates")?.as_array()?;
    let lon = coordinates.first()?.as_f64()?;
    let lat = coordinates.get(1)?.as_f64()?;
    (lon.is_finite() && lat.is_finite()).then_some(LonLat(lon, lat))
}

fn feature_properties(feature: &Value) -> Result<PoiProperties> {
    match feature.get("properties") {
        None | Some(Value::Null) => Ok(PoiProperties::default()),
        Some(props) => PoiProperties::deserialize(props)
            .map_err(|e| Error::UnexpectedShape(format!("invalid POI properties: {e}"))),
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
