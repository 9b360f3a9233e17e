//! Free-text place search against Nominatim

use std::fmt;

use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::core::client::{build_http_client, join_url};
use crate::core::config::ServiceConfig;
use crate::core::coords::{BoundingBox, Coordinate};
use crate::core::error::{Error, Result};

/// One search request: text plus the map area it is biased to
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub text: String,
    /// Visible map area; the search is bounded to it when present
    pub viewbox: Option<BoundingBox>,
    pub limit: u32,
}

/// Nominatim place identifier (numeric on the public instance, string on some mirrors)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(untagged)]
pub enum PlaceId {
    Number(u64),
    Text(String),
}

impl fmt::Display for PlaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaceId::Number(id) => write!(f, "{id}"),
            PlaceId::Text(id) => f.write_str(id),
        }
    }
}

/// A search candidate
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub id: PlaceId,
    pub label: String,
    pub coordinate: Coordinate,
}

/// Anything that can turn a query into ranked places
pub trait Geocoder: Send + Sync {
    fn search<'a>(&'a self, query: &'a SearchQuery) -> BoxFuture<'a, Result<Vec<Place>>>;
}

#[derive(Debug, Deserialize)]
struct RawPlace {
    place_id: PlaceId,
    display_name: String,
    lat: Value,
    lon: Value,
}

/// lat/lon arrive as numeric strings
fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::String(s) => s.trim().parse::<f64>().ok(),
        other => other.as_f64(),
    };
    number.filter(|v| v.is_finite())
}

/// Decodes a Nominatim `format=json` result list, dropping rows without a usable position
pub fn parse_places(body: &str) -> Result<Vec<Place>> {
    let rows: Vec<RawPlace> = serde_json::from_str(body)?;
    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let lat = coerce_number(&row.lat)?;
            let lon = coerce_number(&row.lon)?;
            Some(Place {
                id: row.place_id,
                label: row.display_name,
                coordinate: Coordinate::new(lat, lon),
            })
        })
        .collect())
}

/// Nominatim search client
#[derive(Clone)]
pub struct NominatimClient {
    http: Client,
    base_url: String,
}

impl NominatimClient {
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        Ok(Self {
            http: build_http_client(config)?,
            base_url: config.nominatim_base_url.clone(),
        })
    }

    /// Query string for `GET /search`
    pub fn query_params(query: &SearchQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("q", query.text.clone()),
            ("format", "json".to_string()),
            ("addressdetails", "0".to_string()),
            ("limit", query.limit.to_string()),
        ];
        if let Some(viewbox) = query.viewbox.filter(BoundingBox::is_finite) {
            params.push(("viewbox", viewbox.to_viewbox()));
            params.push(("bounded", "1".to_string()));
        }
        params
    }

    async fn fetch(&self, query: &SearchQuery) -> Result<Vec<Place>> {
        let url = join_url(&self.base_url, "search");
        let response = self
            .http
            .get(&url)
            .query(&Self::query_params(query))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpError(format!("Place search failed: {status}")));
        }
        let body = response.text().await?;
        parse_places(&body)
    }
}

impl Geocoder for NominatimClient {
    fn search<'a>(&'a self, query: &'a SearchQuery) -> BoxFuture<'a, Result<Vec<Place>>> {
        self.fetch(query).boxed()
    }
}
