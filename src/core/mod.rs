//! Core library modules for butterfly-map
//!
//! Pure builders and normalizers sit at the bottom; the HTTP clients and
//! the async search driver are layered on top of them.

pub mod client;
pub mod config;
pub mod coords;
pub mod error;
pub mod geocoding;
pub mod geolocation;
pub mod isochrone;
pub mod normalize;
pub mod profile;
pub mod query;
pub mod response;
pub mod search;
pub mod session;
