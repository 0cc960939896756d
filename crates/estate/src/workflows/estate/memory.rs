use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{
    ImageId, Offer, OfferId, Partner, PartnerId, Property, PropertyId, PropertyImage, Salesperson,
    UserId,
};
use super::repository::{ChangeSet, EstateRepository, RepositoryError};

#[derive(Debug, Default, Clone)]
struct Tables {
    properties: HashMap<PropertyId, Property>,
    offers: HashMap<OfferId, Offer>,
    images: HashMap<ImageId, PropertyImage>,
    partners: HashMap<PartnerId, Partner>,
    salespeople: HashMap<UserId, Salesperson>,
}

/// Process-local repository. A change set is checked in full under one lock
/// before any table is touched.
#[derive(Default, Clone)]
pub struct InMemoryEstateRepository {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryEstateRepository {
    fn lock(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))
    }
}

fn check(changes: &ChangeSet, tables: &Tables) -> Result<(), RepositoryError> {
    for property in &changes.properties {
        if let Some(stored) = tables.properties.get(&property.id) {
            if stored.revision != property.revision {
                return Err(RepositoryError::Conflict);
            }
        }
        if property.expected_price <= 0.0 {
            return Err(RepositoryError::Constraint("expected_price > 0"));
        }
        if property.selling_price < 0.0 {
            return Err(RepositoryError::Constraint("selling_price >= 0"));
        }
    }

    let property_exists = |id: &PropertyId| {
        changes.properties.iter().any(|p| &p.id == id) || tables.properties.contains_key(id)
    };
    for offer in &changes.offers {
        if offer.price <= 0.0 {
            return Err(RepositoryError::Constraint("offer price > 0"));
        }
        if !property_exists(&offer.property_id) {
            return Err(RepositoryError::NotFound);
        }
        let partner_known = changes.partners.iter().any(|p| p.id == offer.partner_id)
            || tables.partners.contains_key(&offer.partner_id);
        if !partner_known {
            return Err(RepositoryError::NotFound);
        }
    }
    for image in &changes.images {
        if !property_exists(&image.property_id) {
            return Err(RepositoryError::NotFound);
        }
    }
    for (id, revision) in &changes.removed_properties {
        match tables.properties.get(id) {
            None => return Err(RepositoryError::NotFound),
            Some(stored) if stored.revision != *revision => {
                return Err(RepositoryError::Conflict)
            }
            Some(_) => {}
        }
    }
    Ok(())
}

impl EstateRepository for InMemoryEstateRepository {
    fn fetch_property(&self, id: &PropertyId) -> Result<Option<Property>, RepositoryError> {
        Ok(self.lock()?.properties.get(id).cloned())
    }

    fn properties(&self) -> Result<Vec<Property>, RepositoryError> {
        let guard = self.lock()?;
        let mut properties: Vec<_> = guard.properties.values().cloned().collect();
        properties.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(properties)
    }

    fn fetch_offer(&self, id: &OfferId) -> Result<Option<Offer>, RepositoryError> {
        Ok(self.lock()?.offers.get(id).cloned())
    }

    fn offers_for(&self, property: &PropertyId) -> Result<Vec<Offer>, RepositoryError> {
        let guard = self.lock()?;
        let mut offers: Vec<_> = guard
            .offers
            .values()
            .filter(|offer| &offer.property_id == property)
            .cloned()
            .collect();
        offers.sort_by(|a, b| b.price.total_cmp(&a.price).then(a.id.cmp(&b.id)));
        Ok(offers)
    }

    fn fetch_image(&self, id: &ImageId) -> Result<Option<PropertyImage>, RepositoryError> {
        Ok(self.lock()?.images.get(id).cloned())
    }

    fn images_for(&self, property: &PropertyId) -> Result<Vec<PropertyImage>, RepositoryError> {
        let guard = self.lock()?;
        let mut images: Vec<_> = guard
            .images
            .values()
            .filter(|image| &image.property_id == property)
            .cloned()
            .collect();
        images.sort_by(|a, b| a.sequence.cmp(&b.sequence).then(a.id.cmp(&b.id)));
        Ok(images)
    }

    fn fetch_partner(&self, id: &PartnerId) -> Result<Option<Partner>, RepositoryError> {
        Ok(self.lock()?.partners.get(id).cloned())
    }

    fn partner_by_email(&self, email: &str) -> Result<Option<Partner>, RepositoryError> {
        let guard = self.lock()?;
        let mut matches: Vec<_> = guard
            .partners
            .values()
            .filter(|partner| partner.has_email(email))
            .collect();
        matches.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matches.first().map(|partner| (*partner).clone()))
    }

    fn fetch_salesperson(&self, id: &UserId) -> Result<Option<Salesperson>, RepositoryError> {
        Ok(self.lock()?.salespeople.get(id).cloned())
    }

    fn commit(&self, changes: ChangeSet) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        check(&changes, &guard)?;

        let tables = &mut *guard;
        for id in changes.removed_offers {
            tables.offers.remove(&id);
        }
        for id in changes.removed_images {
            tables.images.remove(&id);
        }
        for (id, _) in changes.removed_properties {
            tables.properties.remove(&id);
            tables.offers.retain(|_, offer| offer.property_id != id);
            tables.images.retain(|_, image| image.property_id != id);
        }
        for partner in changes.partners {
            tables.partners.insert(partner.id.clone(), partner);
        }
        for salesperson in changes.salespeople {
            tables.salespeople.insert(salesperson.id.clone(), salesperson);
        }
        for mut property in changes.properties {
            if tables.properties.contains_key(&property.id) {
                property.revision += 1;
            }
            tables.properties.insert(property.id.clone(), property);
        }
        for offer in changes.offers {
            tables.offers.insert(offer.id.clone(), offer);
        }
        for image in changes.images {
            tables.images.insert(image.id.clone(), image);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::estate::domain::OfferState;
    use chrono::NaiveDate;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 1).expect("valid")
    }

    fn property(id: &str) -> Property {
        Property::new(PropertyId::from(id), "Lakeside Lot", 120_000.0, today())
    }

    fn partner() -> Partner {
        Partner {
            id: PartnerId::from("partner-1"),
            name: "Jordan Reyes".to_string(),
            email: Some("jordan@example.com".to_string()),
            phone: None,
        }
    }

    fn offer(id: &str, property: &str, price: f64) -> Offer {
        Offer {
            id: OfferId::from(id),
            property_id: PropertyId::from(property),
            partner_id: PartnerId::from("partner-1"),
            price,
            validity: 7,
            date_deadline: today(),
            created_at: None,
            state: OfferState::Pending,
        }
    }

    #[test]
    fn commit_bumps_revision_on_update() {
        let repository = InMemoryEstateRepository::default();
        repository
            .commit(ChangeSet::new().with_property(property("prop-1")))
            .expect("insert");
        let stored = repository
            .fetch_property(&PropertyId::from("prop-1"))
            .expect("fetch")
            .expect("present");
        assert_eq!(stored.revision, 0);

        repository
            .commit(ChangeSet::new().with_property(stored.clone()))
            .expect("update");
        let updated = repository
            .fetch_property(&PropertyId::from("prop-1"))
            .expect("fetch")
            .expect("present");
        assert_eq!(updated.revision, 1);

        match repository.commit(ChangeSet::new().with_property(stored)) {
            Err(RepositoryError::Conflict) => {}
            other => panic!("expected stale revision conflict, got {other:?}"),
        }
    }

    #[test]
    fn stale_removal_keeps_the_property() {
        let repository = InMemoryEstateRepository::default();
        repository
            .commit(ChangeSet::new().with_property(property("prop-1")))
            .expect("insert");
        let stale = repository
            .fetch_property(&PropertyId::from("prop-1"))
            .expect("fetch")
            .expect("present");
        repository
            .commit(ChangeSet::new().with_property(stale.clone()))
            .expect("update");

        match repository.commit(ChangeSet::new().removing_property(&stale)) {
            Err(RepositoryError::Conflict) => {}
            other => panic!("expected stale removal conflict, got {other:?}"),
        }
        assert!(repository
            .fetch_property(&PropertyId::from("prop-1"))
            .expect("fetch")
            .is_some());
    }

    #[test]
    fn failed_commit_applies_nothing() {
        let repository = InMemoryEstateRepository::default();
        let mut changes = ChangeSet::new()
            .with_property(property("prop-1"))
            .with_offer(offer("offer-1", "prop-1", 100_000.0));
        changes.partners.push(partner());
        changes.offers.push(offer("offer-2", "prop-1", 0.0));

        match repository.commit(changes) {
            Err(RepositoryError::Constraint(_)) => {}
            other => panic!("expected constraint failure, got {other:?}"),
        }
        assert!(repository.properties().expect("list").is_empty());
        assert!(repository
            .fetch_partner(&PartnerId::from("partner-1"))
            .expect("fetch")
            .is_none());
    }

    #[test]
    fn removing_a_property_cascades_to_children() {
        let repository = InMemoryEstateRepository::default();
        let mut changes = ChangeSet::new()
            .with_property(property("prop-1"))
            .with_offer(offer("offer-1", "prop-1", 100_000.0));
        changes.partners.push(partner());
        changes.images.push(PropertyImage {
            id: ImageId::from("image-1"),
            property_id: PropertyId::from("prop-1"),
            name: None,
            sequence: 10,
            location: "https://cdn.example.com/1.jpg".to_string(),
        });
        repository.commit(changes).expect("seed");

        let stored = repository
            .fetch_property(&PropertyId::from("prop-1"))
            .expect("fetch")
            .expect("present");
        repository
            .commit(ChangeSet::new().removing_property(&stored))
            .expect("remove");

        let id = PropertyId::from("prop-1");
        assert!(repository.offers_for(&id).expect("offers").is_empty());
        assert!(repository.images_for(&id).expect("images").is_empty());
    }

    #[test]
    fn offers_are_listed_highest_price_first() {
        let repository = InMemoryEstateRepository::default();
        let mut changes = ChangeSet::new()
            .with_property(property("prop-1"))
            .with_offer(offer("offer-1", "prop-1", 95_000.0))
            .with_offer(offer("offer-2", "prop-1", 98_000.0));
        changes.partners.push(partner());
        repository.commit(changes).expect("seed");

        let prices: Vec<_> = repository
            .offers_for(&PropertyId::from("prop-1"))
            .expect("offers")
            .iter()
            .map(|offer| offer.price)
            .collect();
        assert_eq!(prices, vec![98_000.0, 95_000.0]);
    }

    #[test]
    fn partner_lookup_by_email_ignores_case() {
        let repository = InMemoryEstateRepository::default();
        let mut changes = ChangeSet::new();
        changes.partners.push(partner());
        repository.commit(changes).expect("seed");

        let found = repository
            .partner_by_email("JORDAN@example.com")
            .expect("lookup")
            .expect("present");
        assert_eq!(found.id, PartnerId::from("partner-1"));
    }
}
