//! Property listing and offer management: lifecycle, offer protocol, derived
//! figures, stage pipeline and the public website surface.

pub mod catalog;
pub mod domain;
pub mod error;
pub mod inquiry;
pub mod lifecycle;
pub mod memory;
pub mod metrics;
pub mod notify;
mod offers;
pub mod repository;
pub mod router;
pub mod service;
pub mod stage;
pub mod views;
pub mod website;

#[cfg(test)]
mod tests;

pub use catalog::{ReferenceCatalog, ReferenceEntry, ReferenceKind};
pub use domain::{
    GardenOrientation, ImageId, NewImage, NewOffer, NewPartner, NewProperty, NewSalesperson,
    Offer, OfferId, OfferState, Partner, PartnerId, Property, PropertyAddress, PropertyFeatures,
    PropertyId, PropertyImage, PropertyState, PropertyUpdate, ReferenceId, Salesperson, UserId,
};
pub use error::{BlockedOperation, BlockedTransition, EstateServiceError, InvariantViolation};
pub use inquiry::{InquiryConfirmation, InquirySubmission};
pub use lifecycle::PropertyAction;
pub use memory::InMemoryEstateRepository;
pub use metrics::{InvestmentInputs, InvestmentMetrics, RentalInputs, RentalMetrics};
pub use notify::{
    ActivityEntry, CrmGateway, DispatchReport, LeadId, LeadRequest, NotificationError, Notifier,
    OutboundEmail, RecordRef, SideEffect,
};
pub use repository::{ChangeSet, EstateRepository, RepositoryError};
pub use router::estate_router;
pub use service::EstateService;
pub use stage::{stage_for, Stage, StageCatalog, StageKey};
pub use views::{OfferView, PipelineColumn, PropertyCard, PropertyView, ReferenceView, StageView};
pub use website::{ListingFilter, ListingPage, PublicListing, PublicPropertyDetail};
