//! Property query pipeline over the GraphQL gateway.
//!
//! Combines the server-expressible filters (compiled into the `where`
//! clause by [`crate::gateway::query`]) with the client-side predicate
//! passes from [`FilterSpec`], and carries the remaining read paths of the
//! API surface: detail lookup, featured cards, enum catalog, location
//! suggestions, and the tracking counter relay.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::gateway::query;
use crate::gateway::GraphQlTransport;
use crate::models::{EnumCatalog, Property, PropertyCard};
use crate::pipeline::filter::FilterSpec;
use crate::tracker::queue::PendingBatch;

/// How many records the suggestion endpoint scans for location matches.
const SUGGESTION_SCAN_LIMIT: usize = 100;

/// One post-filtered page of results.
///
/// `has_more` and `total_count` are the server-reported values and reflect
/// only the server-expressible filters: client-side passes can shrink the
/// page below the advertised count. Callers must tolerate receiving fewer
/// than `page_size` records.
#[derive(Debug, Default)]
pub struct ListingPage {
    pub properties: Vec<Property>,
    pub has_more: bool,
    pub total_count: i64,
}

/// Per-entity update counts reported by the tracking relay.
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackOutcome {
    pub views_updated: i64,
    pub shares_updated: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PageInfo {
    has_next_page: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Aggregate {
    count: i64,
}

#[derive(Debug, Deserialize)]
struct Edge {
    node: Property,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Connection {
    page_info: PageInfo,
    aggregate: Aggregate,
    edges: Vec<Edge>,
}

/// Read/relay operations over a [`GraphQlTransport`].
pub struct ListingService {
    transport: Arc<dyn GraphQlTransport>,
}

impl ListingService {
    pub fn new(transport: Arc<dyn GraphQlTransport>) -> Self {
        Self { transport }
    }

    /// Forward an arbitrary query unchanged (the proxy endpoint).
    pub async fn send_raw(&self, query: &str, variables: Value) -> Result<Value> {
        self.transport.send(query, variables).await
    }

    /// Fetch one page of `page_size` records at `skip` and apply the
    /// client-only predicates to it.
    pub async fn search(
        &self,
        filters: &FilterSpec,
        page_size: usize,
        skip: usize,
    ) -> Result<ListingPage> {
        let query = query::listing_query(filters, page_size, skip);
        let data = self.transport.send(&query, json!({})).await?;

        let value = data
            .get("propertyListingsConnection")
            .cloned()
            .unwrap_or(Value::Null);
        if value.is_null() {
            warn!("listing response carried no connection");
            return Ok(ListingPage::default());
        }

        let connection: Connection = serde_json::from_value(value)?;
        let fetched: Vec<Property> = connection.edges.into_iter().map(|e| e.node).collect();
        let properties = filters.apply_client_side(fetched);

        debug!(
            kept = properties.len(),
            total = connection.aggregate.count,
            "Listing page filtered"
        );

        Ok(ListingPage {
            properties,
            has_more: connection.page_info.has_next_page,
            total_count: connection.aggregate.count,
        })
    }

    /// Full property record by slug.
    pub async fn by_slug(&self, slug: &str) -> Result<Property> {
        if slug.trim().is_empty() {
            return Err(Error::Validation("slug is required".to_string()));
        }

        let data = self
            .transport
            .send(query::PROPERTY_BY_SLUG_QUERY, json!({ "slug": slug }))
            .await?;

        let value = data.get("propertyListing").cloned().unwrap_or(Value::Null);
        if value.is_null() {
            return Err(Error::NotFound { entity: "property" });
        }

        Ok(serde_json::from_value(value)?)
    }

    /// Unfiltered first page, flattened into listing-card summaries.
    pub async fn featured(&self, limit: usize) -> Result<Vec<PropertyCard>> {
        let page = self.search(&FilterSpec::default(), limit, 0).await?;
        Ok(page.properties.iter().map(PropertyCard::from_property).collect())
    }

    /// Permissible enum values per category, from the CMS's introspection.
    pub async fn enums(&self) -> Result<EnumCatalog> {
        let data = self.transport.send(query::ENUMS_QUERY, json!({})).await?;

        Ok(EnumCatalog {
            currencies: enum_names(&data, "currency"),
            houses_sub_category: enum_names(&data, "housesSubCategory"),
            lands_sub_categories: enum_names(&data, "landsSubCategories"),
            offices_sub_category: enum_names(&data, "officesSubCategory"),
            property_purpose: enum_names(&data, "propertyPurpose"),
            property_types: enum_names(&data, "propertyTypes"),
        })
    }

    /// De-duplicated, alphabetically sorted "city, region, country"
    /// suggestions matching `q` against any location field. Queries
    /// shorter than two characters return nothing.
    ///
    /// Scans only the first [`SUGGESTION_SCAN_LIMIT`] records, so
    /// locations that appear exclusively beyond that window are missed.
    pub async fn location_suggestions(&self, q: &str) -> Result<Vec<String>> {
        let q = q.trim();
        if q.chars().count() < 2 {
            return Ok(Vec::new());
        }

        let page = self
            .search(&FilterSpec::default(), SUGGESTION_SCAN_LIMIT, 0)
            .await?;

        let needle = q.to_lowercase();
        let mut suggestions = BTreeSet::new();
        for property in &page.properties {
            let Some(location) = &property.location else {
                continue;
            };
            if location.matches(&needle) {
                let display = location.display();
                if display != "Location not specified" {
                    suggestions.insert(display);
                }
            }
        }

        Ok(suggestions.into_iter().collect())
    }

    /// Convert queued view/share events into counter writes.
    ///
    /// The CMS takes absolute values, so this reads the current counters,
    /// adds the per-entity occurrence counts from the batch, and writes
    /// the results back one entity at a time. A failed entity is logged
    /// and skipped; the rest of the batch still goes through.
    pub async fn apply_tracking(&self, batch: &PendingBatch) -> Result<TrackOutcome> {
        let mut outcome = TrackOutcome::default();

        let mut view_counts: BTreeMap<&str, i64> = BTreeMap::new();
        for event in &batch.views {
            *view_counts.entry(event.property_id.as_str()).or_default() += 1;
        }
        let mut share_counts: BTreeMap<&str, i64> = BTreeMap::new();
        for event in &batch.shares {
            *share_counts.entry(event.property_id.as_str()).or_default() += 1;
        }

        let ids: BTreeSet<&str> = view_counts
            .keys()
            .chain(share_counts.keys())
            .copied()
            .collect();
        if ids.is_empty() {
            return Ok(outcome);
        }

        // Missing baselines degrade to zero rather than failing the batch.
        let stats = match self
            .transport
            .send(query::STATS_QUERY, json!({ "ids": ids }))
            .await
        {
            Ok(data) => parse_stats(&data),
            Err(err) => {
                warn!(error = %err, "Failed to fetch current counters");
                HashMap::new()
            }
        };

        for (id, count) in &view_counts {
            let current = stats.get(*id).map(|s| s.0).unwrap_or(0);
            let result = self
                .transport
                .send(
                    query::UPDATE_VIEWS_MUTATION,
                    json!({ "id": id, "views": current + count }),
                )
                .await;
            match result {
                Ok(_) => outcome.views_updated += 1,
                Err(err) => warn!(property_id = id, error = %err, "View counter update failed"),
            }
        }

        for (id, count) in &share_counts {
            let current = stats.get(*id).map(|s| s.1).unwrap_or(0);
            let result = self
                .transport
                .send(
                    query::UPDATE_SHARES_MUTATION,
                    json!({ "id": id, "shares": current + count }),
                )
                .await;
            match result {
                Ok(_) => outcome.shares_updated += 1,
                Err(err) => warn!(property_id = id, error = %err, "Share counter update failed"),
            }
        }

        Ok(outcome)
    }
}

/// Extract `(views, shares)` per id from the stats query response.
fn parse_stats(data: &Value) -> HashMap<String, (i64, i64)> {
    let mut stats = HashMap::new();
    let edges = data
        .pointer("/propertyListingsConnection/edges")
        .and_then(Value::as_array);
    for edge in edges.into_iter().flatten() {
        let Some(node) = edge.get("node") else {
            continue;
        };
        let Some(id) = node.get("id").and_then(Value::as_str) else {
            continue;
        };
        let views = node.get("views").and_then(Value::as_i64).unwrap_or(0);
        let shares = node.get("shares").and_then(Value::as_i64).unwrap_or(0);
        stats.insert(id.to_string(), (views, shares));
    }
    stats
}

fn enum_names(data: &Value, key: &str) -> Vec<String> {
    data.get(key)
        .and_then(|v| v.get("enumValues"))
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(|v| v.get("name").and_then(Value::as_str))
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}
