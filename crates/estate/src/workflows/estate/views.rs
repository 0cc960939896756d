use serde::Serialize;

use super::catalog::{ReferenceEntry, ReferenceKind};
use super::domain::{Offer, Property, PropertyId, PropertyImage, ReferenceId};
use super::metrics::{best_price, InvestmentMetrics, RentalMetrics};
use super::stage::{Stage, StageCatalog, StageKey};

#[derive(Debug, Clone, Serialize)]
pub struct StageSummary {
    pub key: StageKey,
    pub name: String,
}

/// Offer as returned to agents; `property_type` follows the owning listing.
#[derive(Debug, Clone, Serialize)]
pub struct OfferView {
    #[serde(flatten)]
    pub offer: Offer,
    pub state_label: &'static str,
    pub property_type: Option<ReferenceId>,
}

impl OfferView {
    pub fn new(offer: Offer, property_type: Option<ReferenceId>) -> Self {
        Self {
            state_label: offer.state.label(),
            offer,
            property_type,
        }
    }
}

/// Listing with every derived figure evaluated against current inputs.
#[derive(Debug, Clone, Serialize)]
pub struct PropertyView {
    #[serde(flatten)]
    pub property: Property,
    pub state_label: &'static str,
    pub stage_summary: StageSummary,
    pub best_price: f64,
    pub total_area: u64,
    pub investment_metrics: InvestmentMetrics,
    pub rental_metrics: RentalMetrics,
    pub offers: Vec<OfferView>,
    pub images: Vec<PropertyImage>,
}

impl PropertyView {
    pub fn build(
        property: Property,
        offers: Vec<Offer>,
        images: Vec<PropertyImage>,
        stages: &StageCatalog,
    ) -> Self {
        let stage = property.stage();
        let investment_metrics = property.investment.metrics();
        let rental_metrics = property
            .rental
            .metrics(property.investment.purchase_price);
        let property_type = property.property_type.clone();

        Self {
            state_label: property.state().label(),
            stage_summary: StageSummary {
                key: stage,
                name: stages.name_of(stage).to_string(),
            },
            best_price: best_price(&offers),
            total_area: property.features.total_area(),
            investment_metrics,
            rental_metrics,
            offers: offers
                .into_iter()
                .map(|offer| OfferView::new(offer, property_type.clone()))
                .collect(),
            images,
            property,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StageView {
    #[serde(flatten)]
    pub stage: Stage,
    pub property_count: usize,
}

/// One kanban column; every stage is listed even when empty.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineColumn {
    pub stage: Stage,
    pub properties: Vec<PropertyCard>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PropertyCard {
    pub id: PropertyId,
    pub name: String,
    pub expected_price: f64,
    pub best_price: f64,
    pub selling_price: f64,
    pub state_label: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReferenceView {
    #[serde(flatten)]
    pub entry: ReferenceEntry,
    pub property_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer_count: Option<usize>,
}

impl ReferenceView {
    pub fn new(entry: ReferenceEntry, property_count: usize, offer_count: usize) -> Self {
        let offer_count = (entry.kind == ReferenceKind::PropertyType).then_some(offer_count);
        Self {
            entry,
            property_count,
            offer_count,
        }
    }
}
