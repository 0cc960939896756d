use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::workflows::estate::domain::{
    ImageId, NewOffer, NewPartner, NewProperty, NewSalesperson, Offer, OfferId, Partner,
    PartnerId, Property, PropertyId, PropertyImage, Salesperson, UserId,
};
use crate::workflows::estate::notify::{
    ActivityEntry, CrmGateway, LeadId, LeadRequest, NotificationError, Notifier, OutboundEmail,
};
use crate::workflows::estate::repository::{ChangeSet, EstateRepository, RepositoryError};
use crate::workflows::estate::{
    estate_router, EstateService, InMemoryEstateRepository, OfferView, PropertyView,
};

pub(super) type TestService = EstateService<InMemoryEstateRepository, MemoryNotifier>;

pub(super) fn build_service() -> (
    TestService,
    Arc<InMemoryEstateRepository>,
    Arc<MemoryNotifier>,
) {
    let repository = Arc::new(InMemoryEstateRepository::default());
    let notifier = Arc::new(MemoryNotifier::default());
    let service = EstateService::new(repository.clone(), notifier.clone());
    (service, repository, notifier)
}

pub(super) fn new_property(name: &str, expected_price: f64) -> NewProperty {
    NewProperty {
        name: name.to_string(),
        expected_price,
        ..NewProperty::default()
    }
}

pub(super) fn list_property(service: &TestService, name: &str, expected_price: f64) -> PropertyView {
    service
        .create_property(new_property(name, expected_price))
        .expect("property listed")
}

pub(super) fn buyer(service: &TestService, name: &str) -> Partner {
    service
        .register_partner(NewPartner {
            name: name.to_string(),
            email: Some(format!("{}@example.com", name.to_lowercase())),
            phone: None,
        })
        .expect("partner registered")
}

pub(super) fn salesperson(service: &TestService, name: &str, email: Option<&str>) -> Salesperson {
    service
        .register_salesperson(NewSalesperson {
            name: name.to_string(),
            email: email.map(str::to_string),
        })
        .expect("salesperson registered")
}

pub(super) fn bid(partner: &Partner, price: f64) -> NewOffer {
    NewOffer {
        partner_id: partner.id.clone(),
        price,
        validity: 7,
        date_deadline: None,
    }
}

pub(super) fn place_offer(
    service: &TestService,
    property: &PropertyId,
    partner: &Partner,
    price: f64,
) -> OfferView {
    service
        .create_offer(property, bid(partner, price))
        .expect("offer recorded")
}

#[derive(Default)]
pub(super) struct MemoryNotifier {
    activities: Mutex<Vec<ActivityEntry>>,
    emails: Mutex<Vec<OutboundEmail>>,
}

impl MemoryNotifier {
    pub(super) fn activities(&self) -> Vec<ActivityEntry> {
        self.activities.lock().expect("notifier mutex poisoned").clone()
    }

    pub(super) fn emails(&self) -> Vec<OutboundEmail> {
        self.emails.lock().expect("notifier mutex poisoned").clone()
    }
}

impl Notifier for MemoryNotifier {
    fn post_activity(&self, entry: ActivityEntry) -> Result<(), NotificationError> {
        self.activities
            .lock()
            .expect("notifier mutex poisoned")
            .push(entry);
        Ok(())
    }

    fn send_email(&self, email: OutboundEmail) -> Result<(), NotificationError> {
        self.emails
            .lock()
            .expect("notifier mutex poisoned")
            .push(email);
        Ok(())
    }
}

/// Transport that rejects everything.
pub(super) struct FailingNotifier;

impl Notifier for FailingNotifier {
    fn post_activity(&self, _entry: ActivityEntry) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("chatter offline".to_string()))
    }

    fn send_email(&self, _email: OutboundEmail) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("smtp offline".to_string()))
    }
}

#[derive(Default)]
pub(super) struct MemoryCrm {
    leads: Mutex<Vec<LeadRequest>>,
}

impl MemoryCrm {
    pub(super) fn leads(&self) -> Vec<LeadRequest> {
        self.leads.lock().expect("crm mutex poisoned").clone()
    }
}

impl CrmGateway for MemoryCrm {
    fn create_lead(&self, lead: LeadRequest) -> Result<LeadId, NotificationError> {
        let mut guard = self.leads.lock().expect("crm mutex poisoned");
        guard.push(lead);
        Ok(LeadId(format!("lead-{}", guard.len())))
    }
}

pub(super) struct UnavailableRepository;

impl EstateRepository for UnavailableRepository {
    fn fetch_property(&self, _id: &PropertyId) -> Result<Option<Property>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn properties(&self) -> Result<Vec<Property>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_offer(&self, _id: &OfferId) -> Result<Option<Offer>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn offers_for(&self, _property: &PropertyId) -> Result<Vec<Offer>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_image(&self, _id: &ImageId) -> Result<Option<PropertyImage>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn images_for(&self, _property: &PropertyId) -> Result<Vec<PropertyImage>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_partner(&self, _id: &PartnerId) -> Result<Option<Partner>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn partner_by_email(&self, _email: &str) -> Result<Option<Partner>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_salesperson(&self, _id: &UserId) -> Result<Option<Salesperson>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn commit(&self, _changes: ChangeSet) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Runs a write from elsewhere the first time a listing's offers are read,
/// between a service's load and its commit.
pub(super) struct InterleavingRepository {
    inner: Arc<InMemoryEstateRepository>,
    interleaved: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl InterleavingRepository {
    pub(super) fn new(
        inner: Arc<InMemoryEstateRepository>,
        write: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            inner,
            interleaved: Mutex::new(Some(Box::new(write))),
        }
    }
}

impl EstateRepository for InterleavingRepository {
    fn fetch_property(&self, id: &PropertyId) -> Result<Option<Property>, RepositoryError> {
        self.inner.fetch_property(id)
    }

    fn properties(&self) -> Result<Vec<Property>, RepositoryError> {
        self.inner.properties()
    }

    fn fetch_offer(&self, id: &OfferId) -> Result<Option<Offer>, RepositoryError> {
        self.inner.fetch_offer(id)
    }

    fn offers_for(&self, property: &PropertyId) -> Result<Vec<Offer>, RepositoryError> {
        let write = self
            .interleaved
            .lock()
            .expect("interleaved write lock")
            .take();
        if let Some(write) = write {
            write();
        }
        self.inner.offers_for(property)
    }

    fn fetch_image(&self, id: &ImageId) -> Result<Option<PropertyImage>, RepositoryError> {
        self.inner.fetch_image(id)
    }

    fn images_for(&self, property: &PropertyId) -> Result<Vec<PropertyImage>, RepositoryError> {
        self.inner.images_for(property)
    }

    fn fetch_partner(&self, id: &PartnerId) -> Result<Option<Partner>, RepositoryError> {
        self.inner.fetch_partner(id)
    }

    fn partner_by_email(&self, email: &str) -> Result<Option<Partner>, RepositoryError> {
        self.inner.partner_by_email(email)
    }

    fn fetch_salesperson(&self, id: &UserId) -> Result<Option<Salesperson>, RepositoryError> {
        self.inner.fetch_salesperson(id)
    }

    fn commit(&self, changes: ChangeSet) -> Result<(), RepositoryError> {
        self.inner.commit(changes)
    }
}

pub(super) fn router_with_service(service: TestService) -> axum::Router {
    estate_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
