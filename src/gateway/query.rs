//! GraphQL query-string builders.
//!
//! Only purpose, property type, and location are expressible in the CMS
//! `where` clause; pricing and specification fields live inside union types
//! the backend cannot filter on, so those predicates are applied
//! client-side by the pipeline.

use crate::pipeline::filter::FilterSpec;

/// Build the `where` clause for the listing connection query.
///
/// Location becomes an OR of substring-contains predicates across
/// city/country/regionState/town for each comma-separated token: a match on
/// any field for any token qualifies the record.
pub fn where_clause(filters: &FilterSpec) -> String {
    let mut conditions = Vec::new();

    if let Some(purpose) = non_all(&filters.purpose) {
        conditions.push(format!("purpose: {}", purpose.to_lowercase()));
    }

    if let Some(property_type) = non_all(&filters.property_type) {
        conditions.push(format!("propertyType: {property_type}"));
    }

    if let Some(location) = non_all(&filters.location) {
        let mut location_or = Vec::new();
        for part in location.split(',') {
            let part = part.trim().replace('"', "\\\"");
            if part.is_empty() {
                continue;
            }
            for field in ["city", "country", "regionState", "town"] {
                location_or.push(format!("{{ location: {{ {field}_contains: \"{part}\" }} }}"));
            }
        }
        if !location_or.is_empty() {
            conditions.push(format!("OR: [{}]", location_or.join(", ")));
        }
    }

    if conditions.is_empty() {
        String::new()
    } else {
        format!("where: {{ {} }}", conditions.join(", "))
    }
}

/// `None` and the UI sentinel `"all"` both mean "no filter".
fn non_all(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != "all")
}

/// Listing connection query with pagination, page info, and total count.
pub fn listing_query(filters: &FilterSpec, first: usize, skip: usize) -> String {
    let where_clause = where_clause(filters);
    let mut args = Vec::new();
    if !where_clause.is_empty() {
        args.push(where_clause);
    }
    args.push(format!("first: {first}, skip: {skip}"));
    let args = args.join(", ");

    format!(
        r#"query GetProperties {{
  propertyListingsConnection({args}) {{
    pageInfo {{
      hasNextPage
      hasPreviousPage
    }}
    aggregate {{
      count
    }}
    edges {{
      node {{
        id
        coverImage {{
          url
        }}
        location {{
          city
          country
          fullAddress
          regionState
          town
        }}
        pricing {{
          __typename
          ... on RentPricing {{
            price
            currency
            priceDuration
          }}
          ... on SalePricing {{
            price
            currency
          }}
        }}
        propertySpecification {{
          __typename
          ... on HousesAndApartment {{
            bedroom
            bathroom
            kitchen
            furnishing
            housesAndApartmentSubCategory
          }}
          ... on Land {{
            soilType
            stage
            topography
            documentAvailability
            landSubCategory
          }}
          ... on Office {{
            numberOfRooms
            washrooms
            totalFloorArea
            receptionArea
            furnishing
            officesSubCategory
          }}
        }}
        propertySize {{
          size
          sizeVariation
          unit
        }}
        propertyStatus
        propertyType
        purpose
        title
        slug
      }}
    }}
  }}
}}"#
    )
}

/// Full property record by slug, including detail-page fields the listing
/// query omits.
pub const PROPERTY_BY_SLUG_QUERY: &str = r#"query GetPropertyBySlug($slug: String!) {
  propertyListing(where: { slug: $slug }) {
    id
    coverImage {
      url
    }
    description {
      raw
    }
    disclaimer
    gallery {
      url
      mimeType
    }
    isFeatured
    location {
      city
      country
      fullAddress
      regionState
      town
    }
    pricing {
      __typename
      ... on RentPricing {
        minimumDuration
        negotiable
        price
        priceDuration
        currency
      }
      ... on SalePricing {
        price
        currency
      }
    }
    propertySize {
      size
      sizeVariation
      unit
    }
    propertySpecification {
      __typename
      ... on HousesAndApartment {
        furnishing
        bedroom
        bathroom
        kitchen
        housesAndApartmentSubCategory
      }
      ... on Land {
        soilType
        stage
        topography
        documentAvailability
        landSubCategory
      }
      ... on Office {
        numberOfRooms
        receptionArea
        furnishing
        totalFloorArea
        washrooms
        officesSubCategory
      }
    }
    propertyStatus
    propertyType
    purpose
    title
    slug
    views
    shares
  }
}"#;

/// Introspect the CMS's own enum types to populate filter dropdowns.
pub const ENUMS_QUERY: &str = r#"query GetEnums {
  currency: __type(name: "Currency") {
    enumValues {
      name
    }
  }
  housesSubCategory: __type(name: "HousesSubCategory") {
    enumValues {
      name
    }
  }
  landsSubCategories: __type(name: "LandsSubCategories") {
    enumValues {
      name
    }
  }
  officesSubCategory: __type(name: "OfficesSubCategory") {
    enumValues {
      name
    }
  }
  propertyPurpose: __type(name: "PropertyPurpose") {
    enumValues {
      name
    }
  }
  propertyTypes: __type(name: "PropertyTypes") {
    enumValues {
      name
    }
  }
}"#;

/// Current view/share counters for a batch of properties.
pub const STATS_QUERY: &str = r#"query GetPropertyStats($ids: [ID!]!) {
  propertyListingsConnection(where: { id_in: $ids }) {
    edges {
      node {
        id
        views
        shares
      }
    }
  }
}"#;

/// The CMS accepts absolute counter values, not deltas, so the caller
/// computes current + batch increment and writes the result.
pub const UPDATE_VIEWS_MUTATION: &str = r#"mutation UpdateViewCount($id: ID!, $views: Int!) {
  updatePropertyListing(where: { id: $id }, data: { views: $views }) {
    id
    views
  }
}"#;

pub const UPDATE_SHARES_MUTATION: &str = r#"mutation UpdateShareCount($id: ID!, $shares: Int!) {
  updatePropertyListing(where: { id: $id }, data: { shares: $shares }) {
    id
    shares
  }
}"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filters_produce_no_where_clause() {
        let filters = FilterSpec::default();
        assert_eq!(where_clause(&filters), "");

        let query = listing_query(&filters, 12, 24);
        assert!(query.contains("propertyListingsConnection(first: 12, skip: 24)"));
    }

    #[test]
    fn purpose_is_lowercased_and_all_is_ignored() {
        let filters = FilterSpec {
            purpose: Some("Rent".to_string()),
            property_type: Some("all".to_string()),
            ..Default::default()
        };
        assert_eq!(where_clause(&filters), "where: { purpose: rent }");
    }

    #[test]
    fn location_tokens_expand_to_or_of_contains() {
        let filters = FilterSpec {
            location: Some("Accra, Kumasi".to_string()),
            ..Default::default()
        };
        let clause = where_clause(&filters);

        // Two tokens across four fields.
        assert_eq!(clause.matches("_contains").count(), 8);
        assert!(clause.contains(r#"{ location: { city_contains: "Accra" } }"#));
        assert!(clause.contains(r#"{ location: { town_contains: "Kumasi" } }"#));
    }

    #[test]
    fn location_quotes_are_escaped() {
        let filters = FilterSpec {
            location: Some(r#"Ac"cra"#.to_string()),
            ..Default::default()
        };
        let clause = where_clause(&filters);
        assert!(clause.contains(r#"city_contains: "Ac\"cra""#));
    }

    #[test]
    fn listing_query_requests_union_discriminators() {
        let query = listing_query(&FilterSpec::default(), 10, 0);
        assert_eq!(query.matches("__typename").count(), 2);
        assert!(query.contains("hasNextPage"));
        assert!(query.contains("aggregate"));
    }
}
