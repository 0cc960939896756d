//! Offer protocol. Every operation writes the owning property in the same
//! change set, so two concurrent decisions on one listing cannot both commit.

use std::cmp::Ordering;

use chrono::{NaiveDate, Utc};
use tracing::info;

use super::domain::{NewOffer, Offer, OfferId, OfferState, Property, PropertyId, PropertyState};
use super::error::{BlockedOperation, EstateServiceError, InvariantViolation};
use super::metrics::{compare_at_precision, live_offer_ceiling, PRICE_PRECISION_DIGITS};
use super::notify::{ActivityEntry, Notifier, RecordRef, SideEffect};
use super::repository::{ChangeSet, EstateRepository};
use super::service::{next_offer_id, status_note, today, EstateService};
use super::views::OfferView;

impl<R, N> EstateService<R, N>
where
    R: EstateRepository + 'static,
    N: Notifier + 'static,
{
    /// Record a bid. It must clear every pending or accepted bid, and moves a
    /// new listing to offer received.
    pub fn create_offer(
        &self,
        property_id: &PropertyId,
        input: NewOffer,
    ) -> Result<OfferView, EstateServiceError> {
        let mut property = self.load_property(property_id)?;
        if property.state().is_closed() {
            return Err(BlockedOperation::OfferOnClosedProperty {
                name: property.name.clone(),
                state: property.state(),
            }
            .into());
        }
        if input.price <= 0.0 {
            return Err(InvariantViolation::NonPositiveOfferPrice.into());
        }
        if self.repository.fetch_partner(&input.partner_id)?.is_none() {
            return Err(InvariantViolation::UnknownReference {
                kind: "partner",
                id: input.partner_id.0,
            }
            .into());
        }

        let existing = self.repository.offers_for(&property.id)?;
        if let Some(ceiling) = live_offer_ceiling(&existing) {
            if compare_at_precision(input.price, ceiling, PRICE_PRECISION_DIGITS)
                != Ordering::Greater
            {
                return Err(InvariantViolation::OfferNotAboveCeiling { ceiling }.into());
            }
        }

        let today = today();
        let mut offer = Offer {
            id: next_offer_id(),
            property_id: property.id.clone(),
            partner_id: input.partner_id,
            price: input.price,
            validity: input.validity,
            date_deadline: today,
            created_at: Some(Utc::now()),
            state: OfferState::Pending,
        };
        match input.date_deadline {
            Some(deadline) => offer.set_deadline(deadline, today),
            None => offer.set_validity(input.validity, today),
        }

        let mut effects = Vec::new();
        if property.state() == PropertyState::New {
            if let Some(previous) = property.set_state(PropertyState::OfferReceived) {
                effects.push(status_note(&property, previous));
            }
        }

        self.repository.commit(
            ChangeSet::new()
                .with_property(property.clone())
                .with_offer(offer.clone()),
        )?;
        info!(
            property = %property.id,
            offer = %offer.id,
            price = offer.price,
            "offer recorded"
        );
        self.dispatch(effects);

        Ok(OfferView::new(offer, property.property_type))
    }

    /// Accept one bid: refuse the other pending bids, close the price and buyer
    /// on the listing and move it to offer accepted, all in one commit.
    pub fn accept_offer(&self, offer_id: &OfferId) -> Result<OfferView, EstateServiceError> {
        let mut offer = self.load_offer(offer_id)?;
        let mut property = self.load_property(&offer.property_id)?;
        if property.state().is_closed() {
            return Err(BlockedOperation::AcceptOnClosedProperty(property.state()).into());
        }

        let siblings: Vec<Offer> = self
            .repository
            .offers_for(&property.id)?
            .into_iter()
            .filter(|sibling| sibling.id != offer.id)
            .collect();
        if let Some(accepted) = siblings
            .iter()
            .find(|sibling| sibling.state == OfferState::Accepted)
        {
            return Err(BlockedOperation::AnotherOfferAccepted(accepted.id.clone()).into());
        }

        let mut changes = ChangeSet::new();
        for mut sibling in siblings {
            if sibling.state == OfferState::Pending {
                sibling.state = sibling.state.refused()?;
                changes.offers.push(sibling);
            }
        }
        let refused = changes.offers.len();

        offer.state = OfferState::Accepted;
        property.selling_price = offer.price;
        property.buyer = Some(offer.partner_id.clone());
        let previous = property.set_state(PropertyState::OfferAccepted);
        property.validate()?;

        changes.offers.push(offer.clone());
        changes.properties.push(property.clone());
        self.repository.commit(changes)?;
        info!(
            property = %property.id,
            offer = %offer.id,
            refused,
            "offer accepted"
        );

        let mut effects = Vec::new();
        if let Some(previous) = previous {
            effects.push(status_note(&property, previous));
        }
        effects.push(acceptance_note(&property, &offer, refused));
        self.dispatch(effects);

        Ok(OfferView::new(offer, property.property_type))
    }

    /// Refuse a pending bid. Accepted bids must be reset first.
    pub fn refuse_offer(&self, offer_id: &OfferId) -> Result<OfferView, EstateServiceError> {
        self.rewrite_offer(offer_id, |offer, _| {
            offer.state = offer.state.refused()?;
            Ok(())
        })
    }

    /// Put a bid back to pending. The listing itself is left untouched.
    pub fn reset_offer(&self, offer_id: &OfferId) -> Result<OfferView, EstateServiceError> {
        self.rewrite_offer(offer_id, |offer, _| {
            offer.state = OfferState::Pending;
            Ok(())
        })
    }

    /// Move the deadline; validity is recomputed from the creation date.
    pub fn set_offer_deadline(
        &self,
        offer_id: &OfferId,
        deadline: NaiveDate,
    ) -> Result<OfferView, EstateServiceError> {
        self.rewrite_offer(offer_id, |offer, today| {
            offer.set_deadline(deadline, today);
            Ok(())
        })
    }

    /// Change validity in days; the deadline follows. Negative values are kept.
    pub fn set_offer_validity(
        &self,
        offer_id: &OfferId,
        validity: i64,
    ) -> Result<OfferView, EstateServiceError> {
        self.rewrite_offer(offer_id, |offer, today| {
            offer.set_validity(validity, today);
            Ok(())
        })
    }

    pub fn offer(&self, offer_id: &OfferId) -> Result<OfferView, EstateServiceError> {
        let offer = self.load_offer(offer_id)?;
        let property = self.load_property(&offer.property_id)?;
        Ok(OfferView::new(offer, property.property_type))
    }

    fn load_offer(&self, offer_id: &OfferId) -> Result<Offer, EstateServiceError> {
        self.repository
            .fetch_offer(offer_id)?
            .ok_or_else(|| EstateServiceError::not_found("offer", offer_id))
    }

    fn rewrite_offer<F>(&self, offer_id: &OfferId, edit: F) -> Result<OfferView, EstateServiceError>
    where
        F: FnOnce(&mut Offer, NaiveDate) -> Result<(), EstateServiceError>,
    {
        let mut offer = self.load_offer(offer_id)?;
        let property = self.load_property(&offer.property_id)?;
        edit(&mut offer, today())?;

        self.repository.commit(
            ChangeSet::new()
                .with_property(property.clone())
                .with_offer(offer.clone()),
        )?;
        info!(offer = %offer.id, state = offer.state.label(), "offer updated");
        Ok(OfferView::new(offer, property.property_type))
    }
}

fn acceptance_note(property: &Property, offer: &Offer, refused: usize) -> SideEffect {
    SideEffect::Activity(ActivityEntry {
        record: RecordRef::Property(property.id.clone()),
        body: format!(
            "<p>Offer {} accepted at {:.2}; {} other offer(s) refused.</p>",
            offer.id, offer.price, refused
        ),
        recipients: Vec::new(),
        email_from: None,
    })
}
