//! Static region catalog
//!
//! Loaded once at startup from packaged reference data. Each region code is
//! namespaced by its country's two-letter code (`"US"` + `"CA"` becomes
//! `"US-CA"`) so that subdivision codes reused across countries stay unique.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

pub const UNKNOWN_REGION: &str = "Unknown Region";
pub const UNKNOWN_COUNTRY: &str = "Unknown Country";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed catalog data: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("catalog contains no countries")]
    Empty,
    #[error("duplicate country code {0}")]
    DuplicateCountry(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    /// Namespaced code, e.g. `US-CA`
    pub code: String,
    pub name: String,
    pub country_code: String,
    pub country_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Country {
    pub code: String,
    pub name: String,
    pub regions: Vec<Region>,
}

// Raw packaged layout
#[derive(Deserialize)]
struct RawCountry {
    code2: String,
    name: String,
    #[serde(default)]
    states: Vec<RawState>,
}

#[derive(Deserialize)]
struct RawState {
    code: String,
    name: String,
}

/// Builds the globally unique code of a region from its country and subdivision codes.
pub fn region_code(country_code: &str, subdivision_code: &str) -> String {
    format!("{}-{}", country_code, subdivision_code)
}

/// Immutable country/region table, shared read-only after load.
#[derive(Debug, Clone)]
pub struct RegionCatalog {
    countries: Vec<Country>,
    country_index: HashMap<String, usize>,
    region_index: HashMap<String, (usize, usize)>,
}

impl RegionCatalog {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    pub fn from_json(data: &str) -> Result<Self, CatalogError> {
        let raw: Vec<RawCountry> = serde_json::from_str(data)?;

        let countries = raw
            .into_iter()
            .map(|c| Country {
                regions: c
                    .states
                    .into_iter()
                    .map(|s| Region {
                        code: region_code(&c.code2, &s.code),
                        name: s.name,
                        country_code: c.code2.clone(),
                        country_name: c.name.clone(),
                    })
                    .collect(),
                code: c.code2,
                name: c.name,
            })
            .collect();

        Self::new(countries)
    }

    pub fn new(countries: Vec<Country>) -> Result<Self, CatalogError> {
        if countries.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut country_index = HashMap::with_capacity(countries.len());
        let mut region_index = HashMap::new();

        for (ci, country) in countries.iter().enumerate() {
            if country_index.insert(country.code.clone(), ci).is_some() {
                return Err(CatalogError::DuplicateCountry(country.code.clone()));
            }
            for (ri, region) in country.regions.iter().enumerate() {
                region_index.insert(region.code.clone(), (ci, ri));
            }
        }

        Ok(Self {
            countries,
            country_index,
            region_index,
        })
    }

    /// Countries in catalog order
    pub fn countries(&self) -> &[Country] {
        &self.countries
    }

    pub fn total_countries(&self) -> usize {
        self.countries.len()
    }

    pub fn country(&self, code: &str) -> Option<&Country> {
        self.country_index.get(code).map(|&i| &self.countries[i])
    }

    pub fn region(&self, code: &str) -> Option<&Region> {
        self.region_index
            .get(code)
            .map(|&(ci, ri)| &self.countries[ci].regions[ri])
    }

    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        self.countries.iter().flat_map(|c| c.regions.iter())
    }

    /// Display name of a region, or the placeholder when the code is not catalogued.
    pub fn region_name(&self, code: &str) -> &str {
        self.region(code)
            .map(|r| r.name.as_str())
            .or_else(|| self.country(code).map(|c| c.name.as_str()))
            .unwrap_or(UNKNOWN_REGION)
    }

    pub fn country_name(&self, code: &str) -> &str {
        self.country(code)
            .map(|c| c.name.as_str())
            .unwrap_or(UNKNOWN_COUNTRY)
    }
}
