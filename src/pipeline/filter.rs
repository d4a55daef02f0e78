//! User filter state and the client-side predicate passes.
//!
//! Pricing and specification fields live inside union types the CMS cannot
//! filter on, so those predicates run here, over the page the gateway
//! returned. Every pass is conjunctive: the set only ever narrows.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::models::{Property, SpecValue};

/// Inclusive price bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if min < 0.0 || max < 0.0 || min > max {
            return Err(Error::Validation(format!(
                "invalid price range {min}..{max}"
            )));
        }
        Ok(Self { min, max })
    }

    pub fn contains(&self, price: f64) -> bool {
        price >= self.min && price <= self.max
    }
}

impl Default for PriceRange {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 10_000_000.0,
        }
    }
}

/// Snapshot of the user's query intent. Constructed fresh per interaction;
/// `None` means "all" throughout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    pub purpose: Option<String>,
    pub property_type: Option<String>,
    pub sub_category: Option<String>,
    pub location: Option<String>,
    pub price_range: Option<PriceRange>,
    pub currency: Option<String>,
    pub search_query: Option<String>,
    /// Specification-field name (e.g. `bedroom`, `documentAvailability`)
    /// to requested value. Only meaningful alongside a matching
    /// `property_type`.
    pub spec_filters: BTreeMap<String, String>,
}

impl FilterSpec {
    /// Apply the client-only predicates to a server page, in fixed order:
    /// specification fields, sub-category, price range, currency, free-text
    /// search.
    pub fn apply_client_side(&self, properties: Vec<Property>) -> Vec<Property> {
        properties
            .into_iter()
            .filter(|p| self.spec_fields_match(p))
            .filter(|p| self.sub_category_match(p))
            .filter(|p| self.price_match(p))
            .filter(|p| self.currency_match(p))
            .filter(|p| self.search_match(p))
            .collect()
    }

    /// Specification-field filters. Numeric fields are minimum-requirement
    /// thresholds (record value >= requested), booleans match the literal
    /// strings "true"/"false", `furnishing` is a case-insensitive exact
    /// match, and other strings match on case-insensitive substring. A
    /// record whose relevant field is absent is excluded.
    fn spec_fields_match(&self, property: &Property) -> bool {
        let active: Vec<(&str, &str)> = self
            .spec_filters
            .iter()
            .map(|(field, wanted)| (field.as_str(), wanted.as_str()))
            .filter(|(_, wanted)| !wanted.is_empty() && *wanted != "all")
            .collect();
        if active.is_empty() {
            return true;
        }

        let Some(spec) = &property.property_specification else {
            return false;
        };

        // Spec filters are declared against one property type; never apply
        // houses predicates to land records and vice versa.
        if let Some(wanted_type) = non_all(&self.property_type) {
            if spec.property_type().as_str() != wanted_type {
                return false;
            }
        }

        active.iter().all(|&(field, wanted)| {
            match spec.field(field) {
                None => false,
                Some(SpecValue::Number(value)) => wanted
                    .parse::<f64>()
                    .map(|threshold| value >= threshold)
                    .unwrap_or(false),
                Some(SpecValue::Bool(value)) => match wanted {
                    "true" => value,
                    "false" => !value,
                    _ => false,
                },
                Some(SpecValue::Text(value)) => {
                    if field == "furnishing" {
                        value.eq_ignore_ascii_case(wanted)
                    } else {
                        value.to_lowercase().contains(&wanted.to_lowercase())
                    }
                }
                Some(SpecValue::TextList(values)) => values
                    .iter()
                    .any(|v| v.to_lowercase().contains(&wanted.to_lowercase())),
            }
        })
    }

    /// Sub-category only applies when both the sub-category and the
    /// property type are set; the match is exact (office sub-categories
    /// are a list, tested by membership).
    fn sub_category_match(&self, property: &Property) -> bool {
        let (Some(sub_category), Some(property_type)) = (
            non_all(&self.sub_category),
            non_all(&self.property_type),
        ) else {
            return true;
        };

        let Some(spec) = &property.property_specification else {
            return false;
        };
        if spec.property_type().as_str() != property_type {
            return false;
        }

        spec.sub_category_matches(sub_category)
    }

    /// A record lacking pricing is excluded regardless of the bounds.
    fn price_match(&self, property: &Property) -> bool {
        let Some(range) = &self.price_range else {
            return true;
        };
        match &property.pricing {
            Some(pricing) => range.contains(pricing.price()),
            None => false,
        }
    }

    fn currency_match(&self, property: &Property) -> bool {
        let Some(currency) = non_all(&self.currency) else {
            return true;
        };
        match &property.pricing {
            Some(pricing) => pricing.currency().eq_ignore_ascii_case(currency),
            None => false,
        }
    }

    /// Free-text search over the title and the concatenated primary
    /// location fields.
    fn search_match(&self, property: &Property) -> bool {
        let Some(query) = self
            .search_query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
        else {
            return true;
        };
        let needle = query.to_lowercase();

        let title = property
            .title
            .as_deref()
            .unwrap_or_default()
            .to_lowercase();
        let location = property
            .location
            .as_ref()
            .map(|l| {
                format!(
                    "{} {} {}",
                    l.city.as_deref().unwrap_or_default(),
                    l.region_state.as_deref().unwrap_or_default(),
                    l.country.as_deref().unwrap_or_default()
                )
            })
            .unwrap_or_default()
            .to_lowercase();

        title.contains(&needle) || location.contains(&needle)
    }
}

fn non_all(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != "all")
}
