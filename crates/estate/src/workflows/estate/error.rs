use super::domain::{OfferId, PropertyState};
use super::repository::RepositoryError;

/// A persisted-state rule would be broken; nothing is written.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("the {kind} name is required")]
    MissingName { kind: &'static str },
    #[error("the expected price must be strictly positive")]
    NonPositiveExpectedPrice,
    #[error("the selling price must be positive")]
    NegativeSellingPrice,
    #[error(
        "the selling price cannot be lower than 90% of the expected price \
         (expected price: {expected_price:.2}, minimum selling price: {minimum:.2})"
    )]
    SellingPriceBelowFloor { expected_price: f64, minimum: f64 },
    #[error("the offer price must be strictly positive")]
    NonPositiveOfferPrice,
    #[error("the offer must be higher than {ceiling:.2}")]
    OfferNotAboveCeiling { ceiling: f64 },
    #[error("unknown {kind} reference '{id}'")]
    UnknownReference { kind: &'static str, id: String },
    #[error("the {kind} name '{name}' must be unique")]
    DuplicateName { kind: &'static str, name: String },
}

/// A property lifecycle guard rejected the requested transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BlockedTransition {
    #[error("cannot receive offers on a {0} property")]
    OfferReceivedWhileClosed(PropertyState),
    #[error("cannot accept offers on a {0} property")]
    OfferAcceptedWhileClosed(PropertyState),
    #[error("cannot sell a canceled property")]
    SellCanceled,
    #[error("cannot cancel a sold property")]
    CancelSold,
}

/// An operation is not allowed in the current state of the record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlockedOperation {
    #[error("cannot delete a property in state '{0}'; only new or canceled properties can be deleted")]
    DeleteActiveProperty(PropertyState),
    #[error("cannot create offer: property '{name}' is {state}")]
    OfferOnClosedProperty { name: String, state: PropertyState },
    #[error("this property is {0} and no longer available for offer acceptance")]
    AcceptOnClosedProperty(PropertyState),
    #[error("offer {0} is already accepted on this property")]
    AnotherOfferAccepted(OfferId),
    #[error("cannot refuse an accepted offer")]
    RefuseAcceptedOffer,
}

/// Error raised by the estate service.
#[derive(Debug, thiserror::Error)]
pub enum EstateServiceError {
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
    #[error(transparent)]
    Transition(#[from] BlockedTransition),
    #[error(transparent)]
    Blocked(#[from] BlockedOperation),
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl EstateServiceError {
    pub(crate) fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}
