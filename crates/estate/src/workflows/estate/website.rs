use serde::{Deserialize, Serialize};

use super::catalog::{ReferenceCatalog, ReferenceEntry, ReferenceKind};
use super::domain::{
    Property, PropertyAddress, PropertyFeatures, PropertyId, PropertyImage, PropertyState,
    ReferenceId,
};
use super::error::EstateServiceError;
use super::metrics::best_price;
use super::notify::Notifier;
use super::repository::EstateRepository;
use super::service::{clean, EstateService};

/// Query string of the public listing page. Blank values are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingFilter {
    #[serde(default)]
    pub type_id: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StateOption {
    pub key: PropertyState,
    pub label: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublicListing {
    pub id: PropertyId,
    pub name: String,
    pub url: String,
    pub city: Option<String>,
    pub expected_price: f64,
    /// Omitted until a bid exists.
    pub best_price: Option<f64>,
    pub state: PropertyState,
    pub state_label: &'static str,
    pub property_type: Option<String>,
    pub bedrooms: u32,
    pub living_area: u32,
    pub total_area: u64,
    pub cover_image: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListingPage {
    pub properties: Vec<PublicListing>,
    pub property_types: Vec<ReferenceEntry>,
    pub states: Vec<StateOption>,
    pub selected_type_id: Option<ReferenceId>,
    pub selected_state: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentCard {
    pub name: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublicPropertyDetail {
    #[serde(flatten)]
    pub listing: PublicListing,
    pub description: Option<String>,
    pub address: PropertyAddress,
    pub date_availability: Option<chrono::NaiveDate>,
    pub features: PropertyFeatures,
    pub tags: Vec<String>,
    pub utilities: Vec<String>,
    pub images: Vec<PropertyImage>,
    pub salesperson: Option<AgentCard>,
}

fn names(catalog: &ReferenceCatalog, ids: &[ReferenceId]) -> Vec<String> {
    ids.iter()
        .filter_map(|id| catalog.get(id))
        .map(|entry| entry.name.clone())
        .collect()
}

impl<R, N> EstateService<R, N>
where
    R: EstateRepository + 'static,
    N: Notifier + 'static,
{
    /// Published, active listings. An unrecognised state filter matches nothing.
    pub fn published_listings(
        &self,
        filter: ListingFilter,
    ) -> Result<ListingPage, EstateServiceError> {
        let selected_type_id = clean(filter.type_id).map(ReferenceId);
        let selected_state = clean(filter.state);
        let state_filter = selected_state.as_deref().map(PropertyState::parse);

        let mut properties = Vec::new();
        for property in self.repository.properties()? {
            if !property.is_public() {
                continue;
            }
            if let Some(type_id) = &selected_type_id {
                if property.property_type.as_ref() != Some(type_id) {
                    continue;
                }
            }
            if let Some(wanted) = state_filter {
                if wanted != Some(property.state()) {
                    continue;
                }
            }
            properties.push(self.public_listing(&property)?);
        }

        Ok(ListingPage {
            properties,
            property_types: self
                .catalog
                .entries(ReferenceKind::PropertyType)
                .into_iter()
                .cloned()
                .collect(),
            states: PropertyState::ordered()
                .into_iter()
                .map(|state| StateOption {
                    key: state,
                    label: state.label(),
                })
                .collect(),
            selected_type_id,
            selected_state,
        })
    }

    /// Public detail page. Unpublished or archived listings do not exist here.
    pub fn published_property(
        &self,
        id: &PropertyId,
    ) -> Result<PublicPropertyDetail, EstateServiceError> {
        let property = self.load_property(id)?;
        if !property.is_public() {
            return Err(EstateServiceError::not_found("property", id));
        }

        let salesperson = match &property.salesperson {
            Some(user) => self
                .repository
                .fetch_salesperson(user)?
                .map(|salesperson| AgentCard {
                    name: salesperson.name,
                    email: salesperson.email,
                }),
            None => None,
        };

        Ok(PublicPropertyDetail {
            listing: self.public_listing(&property)?,
            description: property.description,
            address: property.address,
            date_availability: property.date_availability,
            tags: names(&self.catalog, &property.tags),
            utilities: names(&self.catalog, &property.utilities),
            images: self.repository.images_for(id)?,
            features: property.features,
            salesperson,
        })
    }

    fn public_listing(&self, property: &Property) -> Result<PublicListing, EstateServiceError> {
        let offers = self.repository.offers_for(&property.id)?;
        let images = self.repository.images_for(&property.id)?;
        let best = best_price(&offers);

        Ok(PublicListing {
            url: format!("/properties/{}", property.id),
            name: property.name.clone(),
            city: property.address.city.clone(),
            expected_price: property.expected_price,
            best_price: (best > 0.0).then_some(best),
            state: property.state(),
            state_label: property.state().label(),
            property_type: property
                .property_type
                .as_ref()
                .and_then(|type_id| self.catalog.get(type_id))
                .map(|entry| entry.name.clone()),
            bedrooms: property.features.bedrooms,
            living_area: property.features.living_area,
            total_area: property.features.total_area(),
            cover_image: images.into_iter().next().map(|image| image.location),
            id: property.id.clone(),
        })
    }
}
