use super::domain::{
    ImageId, Offer, OfferId, Partner, PartnerId, Property, PropertyId, PropertyImage, Salesperson,
    UserId,
};

/// All writes of one unit of work. A repository applies a change set entirely
/// or not at all.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub properties: Vec<Property>,
    pub offers: Vec<Offer>,
    pub images: Vec<PropertyImage>,
    pub partners: Vec<Partner>,
    pub salespeople: Vec<Salesperson>,
    pub removed_offers: Vec<OfferId>,
    pub removed_images: Vec<ImageId>,
    /// Listings to delete, each with the revision it was read at.
    pub removed_properties: Vec<(PropertyId, u64)>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_offer(mut self, offer: Offer) -> Self {
        self.offers.push(offer);
        self
    }

    pub fn removing_property(mut self, property: &Property) -> Self {
        self.removed_properties
            .push((property.id.clone(), property.revision));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
            && self.offers.is_empty()
            && self.images.is_empty()
            && self.partners.is_empty()
            && self.salespeople.is_empty()
            && self.removed_offers.is_empty()
            && self.removed_images.is_empty()
            && self.removed_properties.is_empty()
    }
}

/// Storage abstraction so the service can be exercised in isolation.
///
/// Property writes and removals carry the revision they were read at; a
/// repository must reject the whole change set when a stored revision has
/// moved on, and bump the revision of every property it stores.
pub trait EstateRepository: Send + Sync {
    fn fetch_property(&self, id: &PropertyId) -> Result<Option<Property>, RepositoryError>;
    fn properties(&self) -> Result<Vec<Property>, RepositoryError>;
    fn fetch_offer(&self, id: &OfferId) -> Result<Option<Offer>, RepositoryError>;
    fn offers_for(&self, property: &PropertyId) -> Result<Vec<Offer>, RepositoryError>;
    fn fetch_image(&self, id: &ImageId) -> Result<Option<PropertyImage>, RepositoryError>;
    fn images_for(&self, property: &PropertyId) -> Result<Vec<PropertyImage>, RepositoryError>;
    fn fetch_partner(&self, id: &PartnerId) -> Result<Option<Partner>, RepositoryError>;
    fn partner_by_email(&self, email: &str) -> Result<Option<Partner>, RepositoryError>;
    fn fetch_salesperson(&self, id: &UserId) -> Result<Option<Salesperson>, RepositoryError>;
    fn commit(&self, changes: ChangeSet) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record was modified concurrently; reload and retry")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("constraint violated: {0}")]
    Constraint(&'static str),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
