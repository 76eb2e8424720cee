use serde::{Deserialize, Deserializer, Serialize};

/// A single stay in a region (or, for country-level marks, a whole country).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visit {
    pub id: String,
    pub region_code: String,
    pub country_code: String,
    #[serde(default)]
    pub date_from: Option<String>,
    #[serde(default)]
    pub date_to: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVisit {
    pub region_code: String,
    pub country_code: String,
    #[serde(default)]
    pub date_from: Option<String>,
    #[serde(default)]
    pub date_to: Option<String>,
    /// Caller-chosen id; the store generates one when absent.
    #[serde(default)]
    pub id: Option<String>,
}

impl NewVisit {
    pub fn new(region_code: impl Into<String>, country_code: impl Into<String>) -> Self {
        Self {
            region_code: region_code.into(),
            country_code: country_code.into(),
            ..Default::default()
        }
    }

    pub fn dated(mut self, date_from: Option<&str>, date_to: Option<&str>) -> Self {
        self.date_from = date_from.map(str::to_string);
        self.date_to = date_to.map(str::to_string);
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Partial update of a visit's date range.
///
/// The outer `Option` tells whether the field was provided at all, the inner
/// one whether it is being set or cleared. Codes and id cannot be patched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitPatch {
    #[serde(default, deserialize_with = "provided")]
    pub date_from: Option<Option<String>>,
    #[serde(default, deserialize_with = "provided")]
    pub date_to: Option<Option<String>>,
}

impl VisitPatch {
    pub fn date_from(value: Option<&str>) -> Self {
        Self {
            date_from: Some(value.map(str::to_string)),
            ..Default::default()
        }
    }

    pub fn date_to(value: Option<&str>) -> Self {
        Self {
            date_to: Some(value.map(str::to_string)),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.date_from.is_none() && self.date_to.is_none()
    }

    pub(crate) fn apply_to(&self, visit: &mut Visit) -> bool {
        let mut changed = false;
        if let Some(date_from) = &self.date_from {
            changed |= visit.date_from != *date_from;
            visit.date_from = date_from.clone();
        }
        if let Some(date_to) = &self.date_to {
            changed |= visit.date_to != *date_to;
            visit.date_to = date_to.clone();
        }
        changed
    }
}

// A present JSON key (even `null`) becomes `Some(..)`; an absent key stays `None` via `default`.
fn provided<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}
