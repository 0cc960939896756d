use std::sync::Arc;

use axum::{
    extract::{Form, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::catalog::ReferenceKind;
use super::domain::{
    ImageId, NewImage, NewOffer, NewPartner, NewProperty, NewSalesperson, OfferId, PropertyId,
    PropertyUpdate, ReferenceId, UserId,
};
use super::error::EstateServiceError;
use super::inquiry::InquirySubmission;
use super::lifecycle::PropertyAction;
use super::notify::Notifier;
use super::repository::{EstateRepository, RepositoryError};
use super::service::EstateService;
use super::website::ListingFilter;

type SharedService<R, N> = State<Arc<EstateService<R, N>>>;

#[derive(Debug, Deserialize)]
pub struct DeadlineChange {
    pub date_deadline: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct ValidityChange {
    pub validity: i64,
}

/// Agent API under `/api/v1` and the public website under `/properties`.
pub fn estate_router<R, N>(service: Arc<EstateService<R, N>>) -> Router
where
    R: EstateRepository + 'static,
    N: Notifier + 'static,
{
    Router::new()
        .route(
            "/api/v1/properties",
            get(list_properties::<R, N>).post(create_property::<R, N>),
        )
        .route(
            "/api/v1/properties/:property_id",
            get(get_property::<R, N>)
                .patch(update_property::<R, N>)
                .delete(delete_property::<R, N>),
        )
        .route(
            "/api/v1/properties/:property_id/actions/:action",
            post(apply_action::<R, N>),
        )
        .route(
            "/api/v1/properties/:property_id/offers",
            post(create_offer::<R, N>),
        )
        .route(
            "/api/v1/properties/:property_id/images",
            post(add_image::<R, N>),
        )
        .route("/api/v1/images/:image_id", delete(remove_image::<R, N>))
        .route("/api/v1/offers/:offer_id", get(get_offer::<R, N>))
        .route("/api/v1/offers/:offer_id/accept", post(accept_offer::<R, N>))
        .route("/api/v1/offers/:offer_id/refuse", post(refuse_offer::<R, N>))
        .route("/api/v1/offers/:offer_id/reset", post(reset_offer::<R, N>))
        .route(
            "/api/v1/offers/:offer_id/deadline",
            put(set_offer_deadline::<R, N>),
        )
        .route(
            "/api/v1/offers/:offer_id/validity",
            put(set_offer_validity::<R, N>),
        )
        .route("/api/v1/stages", get(list_stages::<R, N>))
        .route("/api/v1/pipeline", get(pipeline::<R, N>))
        .route("/api/v1/catalog/:kind", get(list_references::<R, N>))
        .route(
            "/api/v1/catalog/types/:type_id/offers",
            get(offers_for_type::<R, N>),
        )
        .route("/api/v1/partners", post(register_partner::<R, N>))
        .route("/api/v1/salespeople", post(register_salesperson::<R, N>))
        .route(
            "/api/v1/salespeople/:user_id/properties",
            get(assigned_properties::<R, N>),
        )
        .route("/properties", get(website_listing::<R, N>))
        .route("/properties/:property_id", get(website_detail::<R, N>))
        .route(
            "/properties/:property_id/inquiry",
            post(website_inquiry::<R, N>),
        )
        .with_state(service)
}

fn respond<T: Serialize>(status: StatusCode, result: Result<T, EstateServiceError>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(error) => error_response(error),
    }
}

/// Map a service error onto its HTTP status with a JSON `error` payload.
pub fn error_response(error: EstateServiceError) -> Response {
    let status = match &error {
        EstateServiceError::Invariant(_) => StatusCode::UNPROCESSABLE_ENTITY,
        EstateServiceError::Transition(_) | EstateServiceError::Blocked(_) => StatusCode::CONFLICT,
        EstateServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
        EstateServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        EstateServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        EstateServiceError::Repository(RepositoryError::Constraint(_)) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        EstateServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, Json(payload)).into_response()
}

fn unknown(kind: &str, value: &str) -> Response {
    let payload = json!({
        "error": format!("unknown {kind} '{value}'"),
    });
    (StatusCode::NOT_FOUND, Json(payload)).into_response()
}

pub(crate) async fn list_properties<R, N>(State(service): SharedService<R, N>) -> Response
where
    R: EstateRepository + 'static,
    N: Notifier + 'static,
{
    respond(StatusCode::OK, service.properties())
}

pub(crate) async fn create_property<R, N>(
    State(service): SharedService<R, N>,
    Json(input): Json<NewProperty>,
) -> Response
where
    R: EstateRepository + 'static,
    N: Notifier + 'static,
{
    respond(StatusCode::CREATED, service.create_property(input))
}

pub(crate) async fn get_property<R, N>(
    State(service): SharedService<R, N>,
    Path(property_id): Path<String>,
) -> Response
where
    R: EstateRepository + 'static,
    N: Notifier + 'static,
{
    respond(StatusCode::OK, service.property(&PropertyId(property_id)))
}

pub(crate) async fn update_property<R, N>(
    State(service): SharedService<R, N>,
    Path(property_id): Path<String>,
    Json(update): Json<PropertyUpdate>,
) -> Response
where
    R: EstateRepository + 'static,
    N: Notifier + 'static,
{
    respond(
        StatusCode::OK,
        service.update_property(&PropertyId(property_id), update),
    )
}

pub(crate) async fn delete_property<R, N>(
    State(service): SharedService<R, N>,
    Path(property_id): Path<String>,
) -> Response
where
    R: EstateRepository + 'static,
    N: Notifier + 'static,
{
    match service.delete_property(&PropertyId(property_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn apply_action<R, N>(
    State(service): SharedService<R, N>,
    Path((property_id, action)): Path<(String, String)>,
) -> Response
where
    R: EstateRepository + 'static,
    N: Notifier + 'static,
{
    let Some(action) = PropertyAction::parse(&action) else {
        return unknown("action", &action);
    };
    respond(
        StatusCode::OK,
        service.apply_action(&PropertyId(property_id), action),
    )
}

pub(crate) async fn create_offer<R, N>(
    State(service): SharedService<R, N>,
    Path(property_id): Path<String>,
    Json(input): Json<NewOffer>,
) -> Response
where
    R: EstateRepository + 'static,
    N: Notifier + 'static,
{
    respond(
        StatusCode::CREATED,
        service.create_offer(&PropertyId(property_id), input),
    )
}

pub(crate) async fn add_image<R, N>(
    State(service): SharedService<R, N>,
    Path(property_id): Path<String>,
    Json(input): Json<NewImage>,
) -> Response
where
    R: EstateRepository + 'static,
    N: Notifier + 'static,
{
    respond(
        StatusCode::CREATED,
        service.add_image(&PropertyId(property_id), input),
    )
}

pub(crate) async fn remove_image<R, N>(
    State(service): SharedService<R, N>,
    Path(image_id): Path<String>,
) -> Response
where
    R: EstateRepository + 'static,
    N: Notifier + 'static,
{
    match service.remove_image(&ImageId(image_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn get_offer<R, N>(
    State(service): SharedService<R, N>,
    Path(offer_id): Path<String>,
) -> Response
where
    R: EstateRepository + 'static,
    N: Notifier + 'static,
{
    respond(StatusCode::OK, service.offer(&OfferId(offer_id)))
}

pub(crate) async fn accept_offer<R, N>(
    State(service): SharedService<R, N>,
    Path(offer_id): Path<String>,
) -> Response
where
    R: EstateRepository + 'static,
    N: Notifier + 'static,
{
    respond(StatusCode::OK, service.accept_offer(&OfferId(offer_id)))
}

pub(crate) async fn refuse_offer<R, N>(
    State(service): SharedService<R, N>,
    Path(offer_id): Path<String>,
) -> Response
where
    R: EstateRepository + 'static,
    N: Notifier + 'static,
{
    respond(StatusCode::OK, service.refuse_offer(&OfferId(offer_id)))
}

pub(crate) async fn reset_offer<R, N>(
    State(service): SharedService<R, N>,
    Path(offer_id): Path<String>,
) -> Response
where
    R: EstateRepository + 'static,
    N: Notifier + 'static,
{
    respond(StatusCode::OK, service.reset_offer(&OfferId(offer_id)))
}

pub(crate) async fn set_offer_deadline<R, N>(
    State(service): SharedService<R, N>,
    Path(offer_id): Path<String>,
    Json(change): Json<DeadlineChange>,
) -> Response
where
    R: EstateRepository + 'static,
    N: Notifier + 'static,
{
    respond(
        StatusCode::OK,
        service.set_offer_deadline(&OfferId(offer_id), change.date_deadline),
    )
}

pub(crate) async fn set_offer_validity<R, N>(
    State(service): SharedService<R, N>,
    Path(offer_id): Path<String>,
    Json(change): Json<ValidityChange>,
) -> Response
where
    R: EstateRepository + 'static,
    N: Notifier + 'static,
{
    respond(
        StatusCode::OK,
        service.set_offer_validity(&OfferId(offer_id), change.validity),
    )
}

pub(crate) async fn list_stages<R, N>(State(service): SharedService<R, N>) -> Response
where
    R: EstateRepository + 'static,
    N: Notifier + 'static,
{
    respond(StatusCode::OK, service.stage_views())
}

pub(crate) async fn pipeline<R, N>(State(service): SharedService<R, N>) -> Response
where
    R: EstateRepository + 'static,
    N: Notifier + 'static,
{
    respond(StatusCode::OK, service.pipeline())
}

pub(crate) async fn list_references<R, N>(
    State(service): SharedService<R, N>,
    Path(kind): Path<String>,
) -> Response
where
    R: EstateRepository + 'static,
    N: Notifier + 'static,
{
    let Some(kind) = ReferenceKind::from_segment(&kind) else {
        return unknown("catalog", &kind);
    };
    respond(StatusCode::OK, service.reference_views(kind))
}

pub(crate) async fn offers_for_type<R, N>(
    State(service): SharedService<R, N>,
    Path(type_id): Path<String>,
) -> Response
where
    R: EstateRepository + 'static,
    N: Notifier + 'static,
{
    respond(
        StatusCode::OK,
        service.offers_for_type(&ReferenceId(type_id)),
    )
}

pub(crate) async fn register_partner<R, N>(
    State(service): SharedService<R, N>,
    Json(input): Json<NewPartner>,
) -> Response
where
    R: EstateRepository + 'static,
    N: Notifier + 'static,
{
    respond(StatusCode::CREATED, service.register_partner(input))
}

pub(crate) async fn register_salesperson<R, N>(
    State(service): SharedService<R, N>,
    Json(input): Json<NewSalesperson>,
) -> Response
where
    R: EstateRepository + 'static,
    N: Notifier + 'static,
{
    respond(StatusCode::CREATED, service.register_salesperson(input))
}

pub(crate) async fn assigned_properties<R, N>(
    State(service): SharedService<R, N>,
    Path(user_id): Path<String>,
) -> Response
where
    R: EstateRepository + 'static,
    N: Notifier + 'static,
{
    respond(
        StatusCode::OK,
        service.assigned_properties(&UserId(user_id)),
    )
}

pub(crate) async fn website_listing<R, N>(
    State(service): SharedService<R, N>,
    Query(filter): Query<ListingFilter>,
) -> Response
where
    R: EstateRepository + 'static,
    N: Notifier + 'static,
{
    respond(StatusCode::OK, service.published_listings(filter))
}

pub(crate) async fn website_detail<R, N>(
    State(service): SharedService<R, N>,
    Path(property_id): Path<String>,
) -> Response
where
    R: EstateRepository + 'static,
    N: Notifier + 'static,
{
    respond(
        StatusCode::OK,
        service.published_property(&PropertyId(property_id)),
    )
}

pub(crate) async fn website_inquiry<R, N>(
    State(service): SharedService<R, N>,
    Path(property_id): Path<String>,
    Form(submission): Form<InquirySubmission>,
) -> Response
where
    R: EstateRepository + 'static,
    N: Notifier + 'static,
{
    respond(
        StatusCode::OK,
        service.submit_inquiry(&PropertyId(property_id), submission),
    )
}
