//! HTTP client for the openrouteservice endpoints
//!
//! Each call builds its payload through the query builders, so invalid
//! input never reaches the network.

use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, ClientBuilder, StatusCode};
use serde_json::Value;

use crate::core::config::ServiceConfig;
use crate::core::coords::Coordinate;
use crate::core::error::{Error, Result};
use crate::core::normalize::{normalize_poi_response, PoiFeatureCollection};
use crate::core::profile::Profile;
use crate::core::query::{
    build_isochrone, build_poi, build_route, build_snap, BackendRequest, IsochroneSpec, PoiOptions,
};
use crate::core::response::{
    parse_isochrones, parse_route, parse_snap, IsochroneBand, Route, SnappedPoint,
};

/// Longest backend error body quoted back to the user
const MAX_ERROR_EXCERPT: usize = 200;

/// Builds the pooled HTTP client shared by the backend clients
pub(crate) fn build_http_client(config: &ServiceConfig) -> Result<Client> {
    ClientBuilder::new()
        .tcp_keepalive(Duration::from_secs(60))
        .pool_idle_timeout(Duration::from_secs(90))
        .timeout(config.timeout)
        .connect_timeout(Duration::from_secs(10))
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(|e| Error::InvalidInput(format!("Failed to create HTTP client: {e}")))
}

/// Joins a base URL and a relative endpoint path
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Client for routing, snapping, POI and isochrone calls
#[derive(Clone)]
pub struct OrsClient {
    http: Client,
    config: ServiceConfig,
}

impl OrsClient {
    pub fn new(config: ServiceConfig) -> Result<Self> {
        let http = build_http_client(&config)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Route between two points
    pub async fn route(
        &self,
        start: Coordinate,
        end: Coordinate,
        profile: Profile,
    ) -> Result<Route> {
        let request = build_route(start, end, profile);
        let body = self.post(&request).await?;
        parse_route(&body)
    }

    /// Snap GPS points onto the road network within `radius` meters
    pub async fn snap(
        &self,
        points: &[Coordinate],
        profile: Profile,
        radius: f64,
    ) -> Result<Vec<SnappedPoint>> {
        let request = build_snap(points, profile, radius);
        let body = self.post(&request).await?;
        parse_snap(&body)
    }

    /// POIs around a point or inside a box.
    ///
    /// An intent that cannot produce a valid request yields an empty
    /// collection without contacting the backend.
    pub async fn pois(&self, opts: &PoiOptions) -> Result<PoiFeatureCollection> {
        let Some(request) = build_poi(opts) else {
            return Ok(PoiFeatureCollection::default());
        };
        let body = self.post(&request).await?;
        normalize_poi_response(&body)
    }

    /// Reachability polygons, smallest threshold first
    pub async fn isochrones(&self, spec: &IsochroneSpec) -> Result<Vec<IsochroneBand>> {
        let request = build_isochrone(spec)?;
        let body = self.post(&request).await?;
        parse_isochrones(&body)
    }

    /// Posts a payload and returns the raw body of a successful response
    async fn post<R: BackendRequest>(&self, request: &R) -> Result<String> {
        let url = join_url(&self.config.ors_base_url, &request.path());
        log::debug!("POST {url}");

        let mut builder = self
            .http
            .post(&url)
            .header(ACCEPT, "application/json, application/geo+json")
            .json(request);
        if let Some(key) = &self.config.api_key {
            builder = builder.header(AUTHORIZATION, key);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(create_helpful_http_error(&url, status, &body));
        }
        Ok(body)
    }
}

/// Turns a failed backend response into a message a user can act on
fn create_helpful_http_error(url: &str, status: StatusCode, body: &str) -> Error {
    let detail = backend_error_message(body);

    let message = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            format!("Request rejected ({status}): check that ORS_API_KEY is set and valid")
        }
        StatusCode::NOT_FOUND => {
            format!(
                "Endpoint not found ({status}): {url}. \
                 The profile may not be enabled on this server"
            )
        }
        StatusCode::TOO_MANY_REQUESTS => {
            format!("Quota exceeded ({status}): wait before retrying")
        }
        _ => format!("Backend returned {status}"),
    };

    match detail {
        Some(detail) => Error::HttpError(format!("{message}: {detail}")),
        None => Error::HttpError(message),
    }
}

/// Extracts `error.message` (or a string `error`) from a backend error body
fn backend_error_message(body: &str) -> Option<String> {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let from_json = parsed.as_ref().and_then(|v| {
        let error = v.get("error")?;
        error
            .get("message")
            .and_then(Value::as_str)
            .or_else(|| error.as_str())
            .map(str::to_string)
    });

    from_json.or_else(|| {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.chars().take(MAX_ERROR_EXCERPT).collect())
        }
    })
}
