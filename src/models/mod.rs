use serde::{Deserialize, Deserializer, Serialize};

/// Whether a property is offered for rent or for sale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Purpose {
    Rent,
    Sale,
}

impl Purpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Purpose::Rent => "rent",
            Purpose::Sale => "sale",
        }
    }
}

/// Closed set of property categories served by the CMS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyType {
    #[serde(rename = "housesAndApartments")]
    HousesAndApartments,
    #[serde(rename = "lands")]
    Lands,
    #[serde(rename = "offices")]
    Offices,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::HousesAndApartments => "housesAndApartments",
            PropertyType::Lands => "lands",
            PropertyType::Offices => "offices",
        }
    }
}

/// Location information for a property. All fields are optional in the CMS
/// schema; at least one is expected to be populated in practice.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Location {
    pub city: Option<String>,
    pub country: Option<String>,
    pub region_state: Option<String>,
    pub town: Option<String>,
    pub full_address: Option<String>,
}

impl Location {
    /// Human-readable "city, region, country" string, falling back to the
    /// full address when none of the three primary fields are set.
    pub fn display(&self) -> String {
        let parts: Vec<&str> = [&self.city, &self.region_state, &self.country]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .collect();

        if parts.is_empty() {
            self.full_address
                .clone()
                .unwrap_or_else(|| "Location not specified".to_string())
        } else {
            parts.join(", ")
        }
    }

    /// Case-insensitive substring match of `needle_lower` (already
    /// lowercased) against any of city/country/regionState/town.
    pub fn matches(&self, needle_lower: &str) -> bool {
        [&self.city, &self.country, &self.region_state, &self.town]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(needle_lower))
    }
}

/// Rental pricing terms.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RentPricing {
    pub price: f64,
    pub currency: String,
    #[serde(default)]
    pub price_duration: Option<String>,
    #[serde(default)]
    pub minimum_duration: Option<String>,
    #[serde(default)]
    pub negotiable: Option<bool>,
}

/// Sale pricing terms.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SalePricing {
    pub price: f64,
    pub currency: String,
}

/// Pricing is a union type in the CMS; the variant must be consistent with
/// the record's purpose (rent implies `RentPricing`). Decoded off the
/// `__typename` discriminator requested in every query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "__typename")]
pub enum Pricing {
    RentPricing(RentPricing),
    SalePricing(SalePricing),
}

impl Pricing {
    pub fn price(&self) -> f64 {
        match self {
            Pricing::RentPricing(p) => p.price,
            Pricing::SalePricing(p) => p.price,
        }
    }

    pub fn currency(&self) -> &str {
        match self {
            Pricing::RentPricing(p) => &p.currency,
            Pricing::SalePricing(p) => &p.currency,
        }
    }

    /// Formatted price string; rent prices carry a per-duration suffix.
    pub fn display(&self) -> String {
        match self {
            Pricing::RentPricing(p) => {
                let duration = p.price_duration.as_deref().unwrap_or("month");
                format!("{} {}/{duration}", p.currency.to_uppercase(), p.price)
            }
            Pricing::SalePricing(p) => format!("{} {}", p.currency.to_uppercase(), p.price),
        }
    }
}

/// A single specification field value, normalised across the three
/// property-type variants so filter predicates can dispatch on kind.
#[derive(Debug, Clone, PartialEq)]
pub enum SpecValue {
    Number(f64),
    Bool(bool),
    Text(String),
    TextList(Vec<String>),
}

/// Specification fields for houses and apartments.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct HouseSpec {
    pub bedroom: Option<f64>,
    pub bathroom: Option<f64>,
    pub kitchen: Option<f64>,
    pub furnishing: Option<String>,
    pub houses_and_apartment_sub_category: Option<String>,
}

impl HouseSpec {
    fn field(&self, name: &str) -> Option<SpecValue> {
        match name {
            "bedroom" => self.bedroom.map(SpecValue::Number),
            "bathroom" => self.bathroom.map(SpecValue::Number),
            "kitchen" => self.kitchen.map(SpecValue::Number),
            "furnishing" => self.furnishing.clone().map(SpecValue::Text),
            _ => None,
        }
    }
}

/// Specification fields for land parcels.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LandSpec {
    pub soil_type: Option<String>,
    pub stage: Option<String>,
    pub topography: Option<String>,
    pub document_availability: Option<bool>,
    pub land_sub_category: Option<String>,
}

impl LandSpec {
    fn field(&self, name: &str) -> Option<SpecValue> {
        match name {
            "soilType" => self.soil_type.clone().map(SpecValue::Text),
            "stage" => self.stage.clone().map(SpecValue::Text),
            "topography" => self.topography.clone().map(SpecValue::Text),
            "documentAvailability" => self.document_availability.map(SpecValue::Bool),
            _ => None,
        }
    }
}

/// Specification fields for office spaces.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct OfficeSpec {
    pub number_of_rooms: Option<f64>,
    pub washrooms: Option<f64>,
    pub total_floor_area: Option<f64>,
    pub reception_area: Option<bool>,
    pub furnishing: Option<String>,
    #[serde(deserialize_with = "one_or_many")]
    pub offices_sub_category: Vec<String>,
}

impl OfficeSpec {
    fn field(&self, name: &str) -> Option<SpecValue> {
        match name {
            "numberOfRooms" => self.number_of_rooms.map(SpecValue::Number),
            "washrooms" => self.washrooms.map(SpecValue::Number),
            "totalFloorArea" => self.total_floor_area.map(SpecValue::Number),
            "receptionArea" => self.reception_area.map(SpecValue::Bool),
            "furnishing" => self.furnishing.clone().map(SpecValue::Text),
            _ => None,
        }
    }
}

/// Property specifications are a union type keyed by the record's property
/// type. The variant tag must equal `propertyType`; filter predicates use
/// the per-variant `field` tables rather than branching ad hoc, so a new
/// property type extends by adding one table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "__typename")]
pub enum PropertySpecification {
    HousesAndApartment(HouseSpec),
    Land(LandSpec),
    Office(OfficeSpec),
}

impl PropertySpecification {
    /// The property type this specification variant belongs to.
    pub fn property_type(&self) -> PropertyType {
        match self {
            PropertySpecification::HousesAndApartment(_) => PropertyType::HousesAndApartments,
            PropertySpecification::Land(_) => PropertyType::Lands,
            PropertySpecification::Office(_) => PropertyType::Offices,
        }
    }

    /// Look up a specification field by its CMS name. Returns `None` when
    /// the field is unknown for this variant or unset on the record.
    pub fn field(&self, name: &str) -> Option<SpecValue> {
        match self {
            PropertySpecification::HousesAndApartment(s) => s.field(name),
            PropertySpecification::Land(s) => s.field(name),
            PropertySpecification::Office(s) => s.field(name),
        }
    }

    /// Exact sub-category match; office sub-categories are a list, so the
    /// test is set membership there.
    pub fn sub_category_matches(&self, wanted: &str) -> bool {
        match self {
            PropertySpecification::HousesAndApartment(s) => {
                s.houses_and_apartment_sub_category.as_deref() == Some(wanted)
            }
            PropertySpecification::Land(s) => s.land_sub_category.as_deref() == Some(wanted),
            PropertySpecification::Office(s) => {
                s.offices_sub_category.iter().any(|c| c == wanted)
            }
        }
    }
}

/// The CMS serialises office sub-categories as either a scalar or a list.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(value)) => vec![value],
        Some(OneOrMany::Many(values)) => values,
    })
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PropertySize {
    pub size: Option<f64>,
    pub size_variation: Option<String>,
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct MediaRef {
    pub url: Option<String>,
    pub mime_type: Option<String>,
}

/// Canonical property record as returned by the CMS. Owned and mutated by
/// the CMS; this system treats it as read-mostly (the only write path is
/// the view/share counter relay).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    pub property_type: PropertyType,
    pub purpose: Purpose,
    #[serde(default)]
    pub property_status: Option<String>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub pricing: Option<Pricing>,
    #[serde(default)]
    pub property_specification: Option<PropertySpecification>,
    #[serde(default)]
    pub property_size: Option<PropertySize>,
    #[serde(default)]
    pub cover_image: Option<MediaRef>,
    #[serde(default)]
    pub gallery: Vec<MediaRef>,
    #[serde(default)]
    pub views: Option<i64>,
    #[serde(default)]
    pub shares: Option<i64>,
    // Detail-page extras, absent from listing queries.
    #[serde(default)]
    pub is_featured: Option<bool>,
    #[serde(default)]
    pub disclaimer: Option<String>,
    #[serde(default)]
    pub description: Option<serde_json::Value>,
}

/// Flattened listing-card summary served by the featured endpoint.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PropertyCard {
    pub id: String,
    pub title: String,
    pub image: String,
    pub location: String,
    pub price: String,
    pub price_value: f64,
    #[serde(rename = "type")]
    pub kind: String,
    pub bedrooms: f64,
    pub bathrooms: f64,
    pub square_feet: f64,
    pub slug: String,
}

impl PropertyCard {
    pub fn from_property(property: &Property) -> Self {
        // Room counts depend on the specification variant; lands have none.
        let (bedrooms, bathrooms) = match &property.property_specification {
            Some(PropertySpecification::HousesAndApartment(s)) => {
                (s.bedroom.unwrap_or(0.0), s.bathroom.unwrap_or(0.0))
            }
            Some(PropertySpecification::Office(s)) => {
                (s.number_of_rooms.unwrap_or(0.0), s.washrooms.unwrap_or(0.0))
            }
            _ => (0.0, 0.0),
        };

        let price_value = property.pricing.as_ref().map(Pricing::price).unwrap_or(0.0);
        let price = property
            .pricing
            .as_ref()
            .map(Pricing::display)
            .unwrap_or_else(|| "Price not available".to_string());

        Self {
            id: property.id.clone(),
            title: property.title.clone().unwrap_or_default(),
            image: property
                .cover_image
                .as_ref()
                .and_then(|m| m.url.clone())
                .unwrap_or_default(),
            location: property
                .location
                .as_ref()
                .map(Location::display)
                .unwrap_or_else(|| "Location not specified".to_string()),
            price,
            price_value,
            kind: property.purpose.as_str().to_string(),
            bedrooms,
            bathrooms,
            square_feet: property
                .property_size
                .as_ref()
                .and_then(|s| s.size)
                .unwrap_or(0.0),
            slug: property.slug.clone().unwrap_or_default(),
        }
    }
}

/// Enum catalog returned by the CMS's introspection of its own enum types.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EnumCatalog {
    pub currencies: Vec<String>,
    pub houses_sub_category: Vec<String>,
    pub lands_sub_categories: Vec<String>,
    pub offices_sub_category: Vec<String>,
    pub property_purpose: Vec<String>,
    pub property_types: Vec<String>,
}
