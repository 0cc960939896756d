//! Lifecycle rules for listings and offers, kept free of persistence so the
//! service can validate a whole unit of work before committing any of it.

use serde::{Deserialize, Serialize};

use super::domain::{OfferState, Property, PropertyState};
use super::error::{BlockedOperation, BlockedTransition, InvariantViolation};
use super::metrics::{minimum_selling_price, selling_price_meets_floor};

/// Explicit transitions an agent can trigger on a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyAction {
    OfferReceived,
    OfferAccepted,
    Sold,
    Cancel,
    Reset,
}

impl PropertyAction {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "offer_received" => Some(Self::OfferReceived),
            "offer_accepted" => Some(Self::OfferAccepted),
            "sold" => Some(Self::Sold),
            "cancel" => Some(Self::Cancel),
            "reset" => Some(Self::Reset),
            _ => None,
        }
    }
}

impl PropertyState {
    /// Target state of `action`, or the guard that blocks it.
    pub fn after(self, action: PropertyAction) -> Result<PropertyState, BlockedTransition> {
        match action {
            PropertyAction::OfferReceived if self.is_closed() => {
                Err(BlockedTransition::OfferReceivedWhileClosed(self))
            }
            PropertyAction::OfferReceived => Ok(PropertyState::OfferReceived),
            PropertyAction::OfferAccepted if self.is_closed() => {
                Err(BlockedTransition::OfferAcceptedWhileClosed(self))
            }
            PropertyAction::OfferAccepted => Ok(PropertyState::OfferAccepted),
            PropertyAction::Sold if self == PropertyState::Canceled => {
                Err(BlockedTransition::SellCanceled)
            }
            PropertyAction::Sold => Ok(PropertyState::Sold),
            PropertyAction::Cancel if self == PropertyState::Sold => {
                Err(BlockedTransition::CancelSold)
            }
            PropertyAction::Cancel => Ok(PropertyState::Canceled),
            PropertyAction::Reset => Ok(PropertyState::New),
        }
    }
}

impl Property {
    /// Apply an explicit transition. Returns the previous state when it changed.
    pub fn apply(
        &mut self,
        action: PropertyAction,
    ) -> Result<Option<PropertyState>, BlockedTransition> {
        let next = self.state().after(action)?;
        if action == PropertyAction::Reset {
            self.selling_price = 0.0;
            self.buyer = None;
        }
        Ok(self.set_state(next))
    }

    /// Field-level rules checked on every save.
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        if self.name.trim().is_empty() {
            return Err(InvariantViolation::MissingName { kind: "property" });
        }
        if self.expected_price <= 0.0 {
            return Err(InvariantViolation::NonPositiveExpectedPrice);
        }
        if self.selling_price < 0.0 {
            return Err(InvariantViolation::NegativeSellingPrice);
        }
        if !selling_price_meets_floor(self.selling_price, self.expected_price) {
            return Err(InvariantViolation::SellingPriceBelowFloor {
                expected_price: self.expected_price,
                minimum: minimum_selling_price(self.expected_price),
            });
        }
        Ok(())
    }

    pub fn ensure_deletable(&self) -> Result<(), BlockedOperation> {
        if self.state().is_deletable() {
            Ok(())
        } else {
            Err(BlockedOperation::DeleteActiveProperty(self.state()))
        }
    }
}

impl OfferState {
    /// Refusal target; accepted offers are final.
    pub fn refused(self) -> Result<OfferState, BlockedOperation> {
        match self {
            OfferState::Accepted => Err(BlockedOperation::RefuseAcceptedOffer),
            OfferState::Pending | OfferState::Refused => Ok(OfferState::Refused),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::estate::domain::{PartnerId, PropertyId};
    use crate::workflows::estate::stage::stage_for;
    use chrono::NaiveDate;

    fn property() -> Property {
        Property::new(
            PropertyId::from("prop-1"),
            "Maple Street Duplex",
            100_000.0,
            NaiveDate::from_ymd_opt(2025, 4, 1).expect("valid"),
        )
    }

    fn in_state(state: PropertyState) -> Property {
        let mut property = property();
        property.set_state(state);
        property
    }

    #[test]
    fn open_states_can_receive_and_accept_offers() {
        for state in [
            PropertyState::New,
            PropertyState::OfferReceived,
            PropertyState::OfferAccepted,
        ] {
            assert_eq!(
                state.after(PropertyAction::OfferReceived),
                Ok(PropertyState::OfferReceived)
            );
            assert_eq!(
                state.after(PropertyAction::OfferAccepted),
                Ok(PropertyState::OfferAccepted)
            );
        }
    }

    #[test]
    fn closed_states_block_offer_transitions() {
        for state in [PropertyState::Sold, PropertyState::Canceled] {
            assert_eq!(
                state.after(PropertyAction::OfferReceived),
                Err(BlockedTransition::OfferReceivedWhileClosed(state))
            );
            assert_eq!(
                state.after(PropertyAction::OfferAccepted),
                Err(BlockedTransition::OfferAcceptedWhileClosed(state))
            );
        }
    }

    #[test]
    fn sold_and_canceled_exclude_each_other() {
        assert_eq!(
            PropertyState::Canceled.after(PropertyAction::Sold),
            Err(BlockedTransition::SellCanceled)
        );
        assert_eq!(
            PropertyState::Sold.after(PropertyAction::Cancel),
            Err(BlockedTransition::CancelSold)
        );
        assert_eq!(
            BlockedTransition::SellCanceled.to_string(),
            "cannot sell a canceled property"
        );
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut property = in_state(PropertyState::Canceled);
        assert_eq!(property.apply(PropertyAction::Cancel), Ok(None));
        assert_eq!(property.state(), PropertyState::Canceled);
    }

    #[test]
    fn reset_clears_sale_and_restores_new_stage() {
        let mut property = in_state(PropertyState::Sold);
        property.selling_price = 98_000.0;
        property.buyer = Some(PartnerId::from("partner-7"));

        let previous = property.apply(PropertyAction::Reset).expect("reset has no guard");
        assert_eq!(previous, Some(PropertyState::Sold));
        assert_eq!(property.state(), PropertyState::New);
        assert_eq!(property.stage(), stage_for(PropertyState::New));
        assert_eq!(property.selling_price, 0.0);
        assert!(property.buyer.is_none());
    }

    #[test]
    fn every_transition_keeps_stage_synced() {
        let actions = [
            PropertyAction::OfferReceived,
            PropertyAction::OfferAccepted,
            PropertyAction::Sold,
            PropertyAction::Cancel,
            PropertyAction::Reset,
        ];
        for start in PropertyState::ordered() {
            for action in actions {
                let mut property = in_state(start);
                let _ = property.apply(action);
                assert_eq!(property.stage(), stage_for(property.state()));
            }
        }
    }

    #[test]
    fn validate_enforces_selling_price_floor() {
        let mut property = property();
        property.selling_price = 89_000.0;
        match property.validate() {
            Err(InvariantViolation::SellingPriceBelowFloor { minimum, .. }) => {
                assert!((minimum - 90_000.0).abs() < 1e-6)
            }
            other => panic!("expected floor violation, got {other:?}"),
        }

        property.selling_price = 90_000.0;
        property.validate().expect("floor met");
        property.selling_price = 0.0;
        property.validate().expect("unsold property passes");
    }

    #[test]
    fn validate_rejects_blank_title_and_non_positive_price() {
        let mut property = property();
        property.name = "   ".to_string();
        assert_eq!(
            property.validate(),
            Err(InvariantViolation::MissingName { kind: "property" })
        );

        let mut property = self::property();
        property.expected_price = 0.0;
        assert_eq!(
            property.validate(),
            Err(InvariantViolation::NonPositiveExpectedPrice)
        );
    }

    #[test]
    fn only_new_or_canceled_properties_are_deletable() {
        for state in PropertyState::ordered() {
            let result = in_state(state).ensure_deletable();
            match state {
                PropertyState::New | PropertyState::Canceled => assert!(result.is_ok()),
                _ => assert_eq!(result, Err(BlockedOperation::DeleteActiveProperty(state))),
            }
        }
    }

    #[test]
    fn accepted_offers_cannot_be_refused() {
        assert_eq!(
            OfferState::Accepted.refused(),
            Err(BlockedOperation::RefuseAcceptedOffer)
        );
        assert_eq!(OfferState::Pending.refused(), Ok(OfferState::Refused));
        assert_eq!(OfferState::Refused.refused(), Ok(OfferState::Refused));
    }

    #[test]
    fn parses_action_segments() {
        assert_eq!(PropertyAction::parse("cancel"), Some(PropertyAction::Cancel));
        assert_eq!(PropertyAction::parse("archive"), None);
    }
}
