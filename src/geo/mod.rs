//! Reverse-geocoding boundary
//!
//! The lookup itself is an external service reached through [`GeoLookup`].
//! This module turns its answer into a catalog-aligned [`Selection`] the
//! caller can feed to the store.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::catalog::{region_code, RegionCatalog};
use crate::models::NewVisit;

#[derive(Debug, Error)]
pub enum GeoError {
    #[error("reverse geocoding failed: {0}")]
    Upstream(String),
    #[error("reverse geocoding returned status {0}")]
    Status(u16),
}

/// Location as reported by the reverse geocoder. Any field may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReverseGeocode {
    pub country_code: String,
    pub country_name: String,
    pub principal_subdivision: String,
    pub principal_subdivision_code: String,
    pub locality: String,
    pub continent: String,
}

#[async_trait]
pub trait GeoLookup: Send + Sync {
    async fn reverse_geocode(&self, latitude: f64, longitude: f64) -> Result<ReverseGeocode, GeoError>;
}

/// A country, and possibly one of its regions, picked on the map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub country_code: String,
    pub country_name: String,
    pub region_code: Option<String>,
    /// Catalog name of the region, else the geocoder's subdivision name
    pub region_name: String,
}

impl Selection {
    /// Region code a visit for this selection is filed under; country-level
    /// selections use the country code itself.
    pub fn visit_region_code(&self) -> &str {
        self.region_code.as_deref().unwrap_or(&self.country_code)
    }

    pub fn display_name(&self) -> &str {
        &self.region_name
    }

    pub fn to_new_visit(&self) -> NewVisit {
        NewVisit::new(self.visit_region_code(), self.country_code.clone())
    }
}

/// Map a geocoder answer onto the catalog.
///
/// `None` means the tap should be ignored: no country was resolved, the
/// matched catalog region has no name, or the subdivision is neither in the
/// catalog nor named by the geocoder. A named subdivision without a code
/// gives a country-level selection.
pub fn resolve_selection(catalog: &RegionCatalog, location: &ReverseGeocode) -> Option<Selection> {
    let country_code = location.country_code.trim();
    if country_code.is_empty() {
        return None;
    }

    let subdivision = location.principal_subdivision_code.trim();
    let region_code = if subdivision.is_empty() {
        None
    } else if subdivision.starts_with(&format!("{}-", country_code)) {
        Some(subdivision.to_string())
    } else {
        Some(region_code(country_code, subdivision))
    };

    let region_name = match region_code.as_deref().and_then(|code| catalog.region(code)) {
        Some(region) => non_empty(&region.name)?,
        None => non_empty(&location.principal_subdivision)?,
    };

    let country_name = non_empty(&location.country_name)
        .or_else(|| catalog.country(country_code).map(|c| c.name.clone()))
        .unwrap_or_else(|| country_code.to_string());

    Some(Selection {
        country_code: country_code.to_string(),
        country_name,
        region_code,
        region_name,
    })
}

/// Reverse geocode a point and resolve it against the catalog.
///
/// Upstream failures are returned to the caller, which should drop the
/// pending selection.
pub async fn locate(
    lookup: &dyn GeoLookup,
    catalog: &RegionCatalog,
    latitude: f64,
    longitude: f64,
) -> Result<Option<Selection>, GeoError> {
    let location = lookup.reverse_geocode(latitude, longitude).await?;
    Ok(resolve_selection(catalog, &location))
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}
