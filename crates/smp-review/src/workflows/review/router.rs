use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::admin::{AdminService, AdminServiceError, UserListFilter};
use super::domain::{RatingSet, ReviewTexts, UserId};
use super::matching::PageParams;
use super::repository::{
    AuditSink, RepositoryError, ReviewRepository, SettingsRepository, UserRepository,
};
use super::service::{ReviewService, ReviewServiceError};

/// Shared handler state: the two services over one set of repositories.
pub struct ReviewPortal<U, R, S, A> {
    pub reviews: Arc<ReviewService<U, R, S, A>>,
    pub admin: Arc<AdminService<U, R, S, A>>,
}

impl<U, R, S, A> Clone for ReviewPortal<U, R, S, A> {
    fn clone(&self) -> Self {
        Self {
            reviews: Arc::clone(&self.reviews),
            admin: Arc::clone(&self.admin),
        }
    }
}

/// Router builder exposing the review workflow and admin endpoints.
///
/// Caller identity (`reviewer_id` / `actor_id`) is trusted input supplied
/// by the external session layer.
pub fn review_router<U, R, S, A>(portal: ReviewPortal<U, R, S, A>) -> Router
where
    U: UserRepository + 'static,
    R: ReviewRepository + 'static,
    S: SettingsRepository + 'static,
    A: AuditSink + 'static,
{
    Router::new()
        .route("/api/v1/reviews", post(submit_handler::<U, R, S, A>))
        .route(
            "/api/v1/reviews/finalize",
            post(finalize_handler::<U, R, S, A>),
        )
        .route(
            "/api/v1/recommendations",
            get(recommendations_handler::<U, R, S, A>),
        )
        .route(
            "/api/v1/candidates/search",
            get(search_handler::<U, R, S, A>),
        )
        .route(
            "/api/v1/settings/reviews-enabled",
            get(reviews_enabled_handler::<U, R, S, A>),
        )
        .route("/api/v1/admin/users", get(admin_list_handler::<U, R, S, A>))
        .route(
            "/api/v1/admin/users/:user_id",
            get(admin_detail_handler::<U, R, S, A>),
        )
        .route(
            "/api/v1/admin/reviews-enabled",
            post(admin_toggle_reviews_handler::<U, R, S, A>),
        )
        .route(
            "/api/v1/admin/users/:user_id/accepting-reviews",
            post(admin_toggle_user_handler::<U, R, S, A>),
        )
        .with_state(portal)
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitReviewRequest {
    reviewer_id: String,
    reviewee_id: String,
    ratings: RatingSet,
    texts: ReviewTexts,
}

async fn submit_handler<U, R, S, A>(
    State(portal): State<ReviewPortal<U, R, S, A>>,
    axum::Json(request): axum::Json<SubmitReviewRequest>,
) -> Response
where
    U: UserRepository + 'static,
    R: ReviewRepository + 'static,
    S: SettingsRepository + 'static,
    A: AuditSink + 'static,
{
    let result = portal.reviews.submit_review(
        &UserId(request.reviewer_id),
        &UserId(request.reviewee_id),
        request.ratings,
        request.texts,
    );
    match result {
        Ok(record) => (
            StatusCode::OK,
            axum::Json(json!({
                "reviewee_id": record.reviewee_id,
                "created_at": record.created_at,
                "updated_at": record.updated_at,
            })),
        )
            .into_response(),
        Err(err) => review_error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct FinalizeRequest {
    reviewer_id: String,
}

async fn finalize_handler<U, R, S, A>(
    State(portal): State<ReviewPortal<U, R, S, A>>,
    axum::Json(request): axum::Json<FinalizeRequest>,
) -> Response
where
    U: UserRepository + 'static,
    R: ReviewRepository + 'static,
    S: SettingsRepository + 'static,
    A: AuditSink + 'static,
{
    match portal.reviews.finalize(&UserId(request.reviewer_id)) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(err) => review_error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecommendationQuery {
    reviewer_id: String,
    #[serde(default)]
    skip: usize,
    #[serde(default = "default_take")]
    take: usize,
}

fn default_take() -> usize {
    20
}

async fn recommendations_handler<U, R, S, A>(
    State(portal): State<ReviewPortal<U, R, S, A>>,
    Query(query): Query<RecommendationQuery>,
) -> Response
where
    U: UserRepository + 'static,
    R: ReviewRepository + 'static,
    S: SettingsRepository + 'static,
    A: AuditSink + 'static,
{
    let page = PageParams {
        skip: query.skip,
        take: query.take,
    };
    match portal
        .reviews
        .recommendations(&UserId(query.reviewer_id), page)
    {
        Ok(page) => (StatusCode::OK, axum::Json(page)).into_response(),
        Err(err) => review_error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchQuery {
    reviewer_id: String,
    #[serde(default)]
    q: String,
}

async fn search_handler<U, R, S, A>(
    State(portal): State<ReviewPortal<U, R, S, A>>,
    Query(query): Query<SearchQuery>,
) -> Response
where
    U: UserRepository + 'static,
    R: ReviewRepository + 'static,
    S: SettingsRepository + 'static,
    A: AuditSink + 'static,
{
    match portal
        .reviews
        .search_users(&UserId(query.reviewer_id), &query.q)
    {
        Ok(hits) => (StatusCode::OK, axum::Json(hits)).into_response(),
        Err(err) => review_error_response(err),
    }
}

async fn reviews_enabled_handler<U, R, S, A>(
    State(portal): State<ReviewPortal<U, R, S, A>>,
) -> Response
where
    U: UserRepository + 'static,
    R: ReviewRepository + 'static,
    S: SettingsRepository + 'static,
    A: AuditSink + 'static,
{
    match portal.reviews.reviews_enabled() {
        Ok(enabled) => (
            StatusCode::OK,
            axum::Json(json!({ "reviews_enabled": enabled })),
        )
            .into_response(),
        Err(err) => review_error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AdminListQuery {
    actor_id: String,
    #[serde(default)]
    search: Option<String>,
    #[serde(default)]
    department: Option<String>,
    #[serde(default)]
    skip: usize,
    #[serde(default = "default_admin_take")]
    take: usize,
}

fn default_admin_take() -> usize {
    50
}

async fn admin_list_handler<U, R, S, A>(
    State(portal): State<ReviewPortal<U, R, S, A>>,
    Query(query): Query<AdminListQuery>,
) -> Response
where
    U: UserRepository + 'static,
    R: ReviewRepository + 'static,
    S: SettingsRepository + 'static,
    A: AuditSink + 'static,
{
    let filter = UserListFilter {
        search: query.search,
        department: query.department,
    };
    let page = PageParams {
        skip: query.skip,
        take: query.take,
    };
    match portal
        .admin
        .list_users(&UserId(query.actor_id), &filter, page)
    {
        Ok(page) => (StatusCode::OK, axum::Json(page)).into_response(),
        Err(err) => admin_error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AdminActorQuery {
    actor_id: String,
}

async fn admin_detail_handler<U, R, S, A>(
    State(portal): State<ReviewPortal<U, R, S, A>>,
    Path(user_id): Path<String>,
    Query(query): Query<AdminActorQuery>,
) -> Response
where
    U: UserRepository + 'static,
    R: ReviewRepository + 'static,
    S: SettingsRepository + 'static,
    A: AuditSink + 'static,
{
    match portal
        .admin
        .user_detail(&UserId(query.actor_id), &UserId(user_id))
    {
        Ok(detail) => (StatusCode::OK, axum::Json(detail)).into_response(),
        Err(err) => admin_error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ToggleReviewsRequest {
    actor_id: String,
    enabled: bool,
}

async fn admin_toggle_reviews_handler<U, R, S, A>(
    State(portal): State<ReviewPortal<U, R, S, A>>,
    axum::Json(request): axum::Json<ToggleReviewsRequest>,
) -> Response
where
    U: UserRepository + 'static,
    R: ReviewRepository + 'static,
    S: SettingsRepository + 'static,
    A: AuditSink + 'static,
{
    match portal
        .admin
        .set_reviews_enabled(&UserId(request.actor_id), request.enabled)
    {
        Ok(settings) => (StatusCode::OK, axum::Json(settings)).into_response(),
        Err(err) => admin_error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ToggleUserRequest {
    actor_id: String,
    accepting: bool,
}

async fn admin_toggle_user_handler<U, R, S, A>(
    State(portal): State<ReviewPortal<U, R, S, A>>,
    Path(user_id): Path<String>,
    axum::Json(request): axum::Json<ToggleUserRequest>,
) -> Response
where
    U: UserRepository + 'static,
    R: ReviewRepository + 'static,
    S: SettingsRepository + 'static,
    A: AuditSink + 'static,
{
    match portal.admin.set_accepting_reviews(
        &UserId(request.actor_id),
        &UserId(user_id),
        request.accepting,
    ) {
        Ok(user) => (
            StatusCode::OK,
            axum::Json(json!({
                "id": user.id,
                "name": user.name,
                "accepting_reviews": user.accepting_reviews,
            })),
        )
            .into_response(),
        Err(err) => admin_error_response(err),
    }
}

fn review_error_response(err: ReviewServiceError) -> Response {
    match err {
        ReviewServiceError::Validation(violation) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            axum::Json(json!({ "error": violation.to_string() })),
        )
            .into_response(),
        ReviewServiceError::Denied(denial) => (
            StatusCode::FORBIDDEN,
            axum::Json(json!({
                "error": denial.to_string(),
                "reason": denial,
            })),
        )
            .into_response(),
        ReviewServiceError::NotEnoughReviews { have, need } => (
            StatusCode::BAD_REQUEST,
            axum::Json(json!({
                "error": format!(
                    "at least {need} reviews are required before finalizing (have {have})"
                ),
                "have": have,
                "need": need,
            })),
        )
            .into_response(),
        ReviewServiceError::UserNotFound => (
            StatusCode::NOT_FOUND,
            axum::Json(json!({ "error": "user not found" })),
        )
            .into_response(),
        ReviewServiceError::Repository(repo) => repository_error_response(repo),
    }
}

fn admin_error_response(err: AdminServiceError) -> Response {
    match err {
        AdminServiceError::Authorization(denied) => (
            StatusCode::FORBIDDEN,
            axum::Json(json!({ "error": denied.to_string() })),
        )
            .into_response(),
        AdminServiceError::UserNotFound => (
            StatusCode::NOT_FOUND,
            axum::Json(json!({ "error": "user not found" })),
        )
            .into_response(),
        AdminServiceError::Repository(repo) => repository_error_response(repo),
    }
}

/// Store failures surface as generic responses; internal detail stays in
/// the logs.
fn repository_error_response(err: RepositoryError) -> Response {
    match err {
        RepositoryError::Conflict => (
            StatusCode::CONFLICT,
            axum::Json(json!({ "error": "record already exists" })),
        )
            .into_response(),
        RepositoryError::NotFound => (
            StatusCode::NOT_FOUND,
            axum::Json(json!({ "error": "record not found" })),
        )
            .into_response(),
        RepositoryError::Unavailable(detail) => {
            tracing::error!(%detail, "repository unavailable");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                axum::Json(json!({ "error": "internal error" })),
            )
                .into_response()
        }
    }
}
