use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::info;

use super::catalog::{ReferenceCatalog, ReferenceKind};
use super::domain::{
    ImageId, NewImage, NewPartner, NewProperty, NewSalesperson, OfferId, Partner, PartnerId,
    Property, PropertyId, PropertyImage, PropertyState, PropertyUpdate, ReferenceId, Salesperson,
    UserId,
};
use super::error::{EstateServiceError, InvariantViolation};
use super::lifecycle::PropertyAction;
use super::metrics::best_price;
use super::notify::{
    dispatch, ActivityEntry, CrmGateway, DispatchReport, Notifier, RecordRef, SideEffect,
};
use super::repository::{ChangeSet, EstateRepository};
use super::stage::StageCatalog;
use super::views::{
    OfferView, PipelineColumn, PropertyCard, PropertyView, ReferenceView, StageView,
};

static PROPERTY_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static OFFER_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static IMAGE_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static PARTNER_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static USER_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_id(sequence: &AtomicU64, prefix: &str) -> String {
    let id = sequence.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{id:06}")
}

pub(super) fn next_offer_id() -> OfferId {
    OfferId(next_id(&OFFER_SEQUENCE, "offer"))
}

pub(super) fn next_partner_id() -> PartnerId {
    PartnerId(next_id(&PARTNER_SEQUENCE, "partner"))
}

pub(super) fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Trim and drop empty optional text.
pub(super) fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Service owning the listing and offer workflows.
pub struct EstateService<R, N> {
    pub(super) repository: Arc<R>,
    pub(super) notifier: Arc<N>,
    pub(super) crm: Option<Arc<dyn CrmGateway>>,
    pub(super) stages: StageCatalog,
    pub(super) catalog: ReferenceCatalog,
    pub(super) website_base_url: Option<String>,
    pub(super) mail_from: String,
}

impl<R, N> EstateService<R, N>
where
    R: EstateRepository + 'static,
    N: Notifier + 'static,
{
    pub fn new(repository: Arc<R>, notifier: Arc<N>) -> Self {
        Self {
            repository,
            notifier,
            crm: None,
            stages: StageCatalog::standard(),
            catalog: ReferenceCatalog::standard(),
            website_base_url: None,
            mail_from: "no-reply@estate.local".to_string(),
        }
    }

    pub fn with_crm(mut self, crm: Arc<dyn CrmGateway>) -> Self {
        self.crm = Some(crm);
        self
    }

    pub fn with_catalog(mut self, catalog: ReferenceCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_stages(mut self, stages: StageCatalog) -> Self {
        self.stages = stages;
        self
    }

    pub fn with_website_base_url(mut self, base_url: Option<String>) -> Self {
        self.website_base_url = base_url;
        self
    }

    pub fn with_mail_from(mut self, mail_from: impl Into<String>) -> Self {
        self.mail_from = mail_from.into();
        self
    }

    pub fn stages(&self) -> &StageCatalog {
        &self.stages
    }

    pub fn catalog(&self) -> &ReferenceCatalog {
        &self.catalog
    }

    /// List a new property. An explicit initial state is honoured, with its stage.
    pub fn create_property(&self, input: NewProperty) -> Result<PropertyView, EstateServiceError> {
        let id = PropertyId(next_id(&PROPERTY_SEQUENCE, "prop"));
        let mut property = Property::new(id, input.name.trim(), input.expected_price, today());
        property.description = clean(input.description);
        property.address = input.address;
        if input.date_availability.is_some() {
            property.date_availability = input.date_availability;
        }
        property.investment = input.investment;
        property.rental = input.rental;
        if let Some(features) = input.features {
            property.features = features;
        }
        property.website_published = input.website_published;
        property.property_type = input.property_type;
        property.salesperson = input.salesperson;
        property.tags = input.tags;
        property.utilities = input.utilities;
        if let Some(state) = input.state {
            property.set_state(state);
        }

        self.check_property(&property)?;
        self.repository
            .commit(ChangeSet::new().with_property(property.clone()))?;
        info!(property = %property.id, state = %property.state(), "property listed");

        self.property(&property.id)
    }

    /// Partial update. A `state` in the payload is a direct write: no guard, stage follows.
    pub fn update_property(
        &self,
        id: &PropertyId,
        update: PropertyUpdate,
    ) -> Result<PropertyView, EstateServiceError> {
        let mut property = self.load_property(id)?;
        let mut effects = Vec::new();

        if let Some(name) = update.name {
            property.name = name.trim().to_string();
        }
        if update.description.is_some() {
            property.description = clean(update.description);
        }
        if let Some(address) = update.address {
            property.address = address;
        }
        if update.date_availability.is_some() {
            property.date_availability = update.date_availability;
        }
        if let Some(expected_price) = update.expected_price {
            property.expected_price = expected_price;
        }
        if let Some(selling_price) = update.selling_price {
            property.selling_price = selling_price;
        }
        if let Some(investment) = update.investment {
            property.investment = investment;
        }
        if let Some(rental) = update.rental {
            property.rental = rental;
        }

        let features = &mut property.features;
        if let Some(bedrooms) = update.bedrooms {
            features.bedrooms = bedrooms;
        }
        if let Some(bathrooms) = update.bathrooms {
            features.bathrooms = bathrooms;
        }
        if let Some(living_area) = update.living_area {
            features.living_area = living_area;
        }
        if let Some(lot_size) = update.lot_size {
            features.lot_size = lot_size;
        }
        if let Some(facades) = update.facades {
            features.facades = facades;
        }
        if let Some(garage) = update.garage {
            features.garage = garage;
        }
        if let Some(garden) = update.garden {
            if garden != features.garden {
                features.set_garden(garden);
            }
        }
        if let Some(garden_area) = update.garden_area {
            features.garden_area = garden_area;
        }
        if update.garden_orientation.is_some() {
            features.garden_orientation = update.garden_orientation;
        }

        if let Some(active) = update.active {
            property.active = active;
        }
        if let Some(published) = update.website_published {
            property.website_published = published;
        }
        if update.property_type.is_some() {
            property.property_type = update.property_type;
        }
        if update.salesperson.is_some() {
            property.salesperson = update.salesperson;
        }
        if let Some(tags) = update.tags {
            property.tags = tags;
        }
        if let Some(utilities) = update.utilities {
            property.utilities = utilities;
        }
        if let Some(state) = update.state {
            if let Some(previous) = property.set_state(state) {
                effects.push(status_note(&property, previous));
            }
        }

        self.check_property(&property)?;
        self.repository
            .commit(ChangeSet::new().with_property(property.clone()))?;
        info!(property = %property.id, "property updated");
        self.dispatch(effects);

        self.property(&property.id)
    }

    /// Run a lifecycle action (offer received/accepted, sold, cancel, reset).
    pub fn apply_action(
        &self,
        id: &PropertyId,
        action: PropertyAction,
    ) -> Result<PropertyView, EstateServiceError> {
        let mut property = self.load_property(id)?;
        let previous = property.apply(action)?;
        property.validate()?;

        self.repository
            .commit(ChangeSet::new().with_property(property.clone()))?;
        info!(
            property = %property.id,
            action = ?action,
            state = %property.state(),
            "property transition applied"
        );
        if let Some(previous) = previous {
            self.dispatch(vec![status_note(&property, previous)]);
        }

        self.property(&property.id)
    }

    /// Delete a new or canceled property together with its offers and images.
    pub fn delete_property(&self, id: &PropertyId) -> Result<(), EstateServiceError> {
        let property = self.load_property(id)?;
        property.ensure_deletable()?;

        let mut changes = ChangeSet::new().removing_property(&property);
        changes.removed_offers = self
            .repository
            .offers_for(id)?
            .into_iter()
            .map(|offer| offer.id)
            .collect();
        changes.removed_images = self
            .repository
            .images_for(id)?
            .into_iter()
            .map(|image| image.id)
            .collect();

        let removed_offers = changes.removed_offers.len();
        self.repository.commit(changes)?;
        info!(property = %id, removed_offers, "property deleted");
        Ok(())
    }

    pub fn property(&self, id: &PropertyId) -> Result<PropertyView, EstateServiceError> {
        let property = self.load_property(id)?;
        self.view_of(property)
    }

    pub fn properties(&self) -> Result<Vec<PropertyView>, EstateServiceError> {
        self.repository
            .properties()?
            .into_iter()
            .map(|property| self.view_of(property))
            .collect()
    }

    /// Open listings (new, offer received, offer accepted) assigned to a salesperson.
    pub fn assigned_properties(
        &self,
        user: &UserId,
    ) -> Result<Vec<PropertyView>, EstateServiceError> {
        if self.repository.fetch_salesperson(user)?.is_none() {
            return Err(EstateServiceError::not_found("salesperson", user));
        }
        self.repository
            .properties()?
            .into_iter()
            .filter(|property| {
                property.salesperson.as_ref() == Some(user) && property.state().is_open()
            })
            .map(|property| self.view_of(property))
            .collect()
    }

    pub fn add_image(
        &self,
        id: &PropertyId,
        input: NewImage,
    ) -> Result<PropertyImage, EstateServiceError> {
        let property = self.load_property(id)?;
        let image = PropertyImage {
            id: ImageId(next_id(&IMAGE_SEQUENCE, "image")),
            property_id: property.id,
            name: clean(input.name),
            sequence: input.sequence.unwrap_or(10),
            location: input.location.trim().to_string(),
        };

        let mut changes = ChangeSet::new();
        changes.images.push(image.clone());
        self.repository.commit(changes)?;
        Ok(image)
    }

    pub fn remove_image(&self, id: &ImageId) -> Result<(), EstateServiceError> {
        if self.repository.fetch_image(id)?.is_none() {
            return Err(EstateServiceError::not_found("image", id));
        }
        let mut changes = ChangeSet::new();
        changes.removed_images.push(id.clone());
        self.repository.commit(changes)?;
        Ok(())
    }

    pub fn register_partner(&self, input: NewPartner) -> Result<Partner, EstateServiceError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(InvariantViolation::MissingName { kind: "partner" }.into());
        }
        let partner = Partner {
            id: next_partner_id(),
            name: name.to_string(),
            email: clean(input.email),
            phone: clean(input.phone),
        };

        let mut changes = ChangeSet::new();
        changes.partners.push(partner.clone());
        self.repository.commit(changes)?;
        Ok(partner)
    }

    pub fn register_salesperson(
        &self,
        input: NewSalesperson,
    ) -> Result<Salesperson, EstateServiceError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(InvariantViolation::MissingName {
                kind: "salesperson",
            }
            .into());
        }
        let salesperson = Salesperson {
            id: UserId(next_id(&USER_SEQUENCE, "user")),
            name: name.to_string(),
            email: clean(input.email),
        };

        let mut changes = ChangeSet::new();
        changes.salespeople.push(salesperson.clone());
        self.repository.commit(changes)?;
        Ok(salesperson)
    }

    /// Stage table with live property counts.
    pub fn stage_views(&self) -> Result<Vec<StageView>, EstateServiceError> {
        let properties = self.repository.properties()?;
        Ok(self
            .stages
            .ordered()
            .iter()
            .map(|stage| StageView {
                property_count: properties
                    .iter()
                    .filter(|property| property.stage() == stage.key)
                    .count(),
                stage: stage.clone(),
            })
            .collect())
    }

    /// Properties grouped by stage, every stage present.
    pub fn pipeline(&self) -> Result<Vec<PipelineColumn>, EstateServiceError> {
        let properties = self.repository.properties()?;
        let mut cards = Vec::with_capacity(properties.len());
        for property in properties {
            let offers = self.repository.offers_for(&property.id)?;
            cards.push((
                property.stage(),
                PropertyCard {
                    best_price: best_price(&offers),
                    state_label: property.state().label(),
                    expected_price: property.expected_price,
                    selling_price: property.selling_price,
                    name: property.name,
                    id: property.id,
                },
            ));
        }

        Ok(self
            .stages
            .ordered()
            .iter()
            .map(|stage| PipelineColumn {
                stage: stage.clone(),
                properties: cards
                    .iter()
                    .filter(|(key, _)| *key == stage.key)
                    .map(|(_, card)| card.clone())
                    .collect(),
            })
            .collect())
    }

    /// Reference entries of one kind with reverse counts.
    pub fn reference_views(
        &self,
        kind: ReferenceKind,
    ) -> Result<Vec<ReferenceView>, EstateServiceError> {
        let properties = self.repository.properties()?;
        let mut views = Vec::new();
        for entry in self.catalog.entries(kind) {
            let referencing: Vec<&Property> = properties
                .iter()
                .filter(|property| match kind {
                    ReferenceKind::PropertyType => property.property_type.as_ref() == Some(&entry.id),
                    ReferenceKind::Tag => property.tags.contains(&entry.id),
                    ReferenceKind::Utility => property.utilities.contains(&entry.id),
                })
                .collect();

            let mut offer_count = 0;
            if kind == ReferenceKind::PropertyType {
                for property in &referencing {
                    offer_count += self.repository.offers_for(&property.id)?.len();
                }
            }
            views.push(ReferenceView::new(
                entry.clone(),
                referencing.len(),
                offer_count,
            ));
        }
        Ok(views)
    }

    /// All offers made on properties of one type, highest price first.
    pub fn offers_for_type(
        &self,
        type_id: &ReferenceId,
    ) -> Result<Vec<OfferView>, EstateServiceError> {
        self.catalog
            .ensure_known(ReferenceKind::PropertyType, std::slice::from_ref(type_id))?;

        let mut offers = Vec::new();
        for property in self.repository.properties()? {
            if property.property_type.as_ref() != Some(type_id) {
                continue;
            }
            for offer in self.repository.offers_for(&property.id)? {
                offers.push(OfferView::new(offer, Some(type_id.clone())));
            }
        }
        offers.sort_by(|a, b| b.offer.price.total_cmp(&a.offer.price));
        Ok(offers)
    }

    pub(super) fn load_property(&self, id: &PropertyId) -> Result<Property, EstateServiceError> {
        self.repository
            .fetch_property(id)?
            .ok_or_else(|| EstateServiceError::not_found("property", id))
    }

    pub(super) fn view_of(&self, property: Property) -> Result<PropertyView, EstateServiceError> {
        let offers = self.repository.offers_for(&property.id)?;
        let images = self.repository.images_for(&property.id)?;
        Ok(PropertyView::build(property, offers, images, &self.stages))
    }

    /// Everything a property must satisfy before it is written.
    fn check_property(&self, property: &Property) -> Result<(), EstateServiceError> {
        property.validate()?;
        self.catalog.ensure_known(
            ReferenceKind::PropertyType,
            property.property_type.as_slice(),
        )?;
        self.catalog
            .ensure_known(ReferenceKind::Tag, &property.tags)?;
        self.catalog
            .ensure_known(ReferenceKind::Utility, &property.utilities)?;

        if let Some(user) = &property.salesperson {
            if self.repository.fetch_salesperson(user)?.is_none() {
                return Err(InvariantViolation::UnknownReference {
                    kind: "salesperson",
                    id: user.0.clone(),
                }
                .into());
            }
        }
        Ok(())
    }

    pub(super) fn dispatch(&self, effects: Vec<SideEffect>) -> DispatchReport {
        if effects.is_empty() {
            return DispatchReport::default();
        }
        dispatch(self.notifier.as_ref(), self.crm.as_deref(), effects)
    }
}

/// History entry recording a state change.
pub(super) fn status_note(property: &Property, previous: PropertyState) -> SideEffect {
    SideEffect::Activity(ActivityEntry {
        record: RecordRef::Property(property.id.clone()),
        body: format!(
            "<p>Status: {} → {}</p>",
            previous.label(),
            property.state().label()
        ),
        recipients: Vec::new(),
        email_from: None,
    })
}
