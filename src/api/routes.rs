//! API Routes
//!
//! HTTP endpoint definitions.

use axum::{
    extract::{Extension, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::{eligible_destinations, AuthUser, ClassInfo, StudentFilter};
use crate::error::AppError;
use crate::handlers::{
    EligibilityHandler, EligibleStudent, PromoteCohortCommand, PromotionHandler, PromotionResult,
};
use crate::store::Store;

use super::AppState;

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidatesQuery {
    #[serde(default)]
    pub class_id: Option<Uuid>,
    #[serde(default)]
    pub with_balance: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetsQuery {
    pub class_id: Uuid,
    /// Comma-separated student ids; their current and past classes are
    /// excluded from the destinations.
    #[serde(default)]
    pub student_ids: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionRequest {
    pub student_ids: Vec<Uuid>,
    pub source_class_id: Uuid,
    pub destination_class_id: Uuid,
}

/// Parse a comma-separated id list, rejecting malformed entries.
fn parse_id_list(raw: &str) -> Result<Vec<Uuid>, AppError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            Uuid::parse_str(s)
                .map_err(|_| AppError::InvalidRequest(format!("Invalid student id: {}", s)))
        })
        .collect()
}

/// Promotion endpoints are admin-only.
fn require_admin(user: &AuthUser) -> Result<(), AppError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Unauthorized)
    }
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router<S: Store + 'static>() -> Router<AppState<S>> {
    Router::new()
        .route("/promotion-candidates", get(list_candidates))
        .route("/promotion-targets", get(list_targets))
        .route("/promotion", post(promote))
}

// =========================================================================
// GET /promotion-candidates
// =========================================================================

/// List students eligible for promotion, optionally with their outstanding
/// bill totals.
async fn list_candidates<S: Store>(
    State(state): State<AppState<S>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<CandidatesQuery>,
) -> Result<Json<Vec<EligibleStudent>>, AppError> {
    require_admin(&user)?;

    let handler = EligibilityHandler::new(state.store.clone());
    let filter = StudentFilter {
        class_id: query.class_id,
    };
    let candidates = handler.execute(filter, query.with_balance).await?;

    Ok(Json(candidates))
}

// =========================================================================
// GET /promotion-targets
// =========================================================================

/// List destination classes valid for a cohort leaving the given class.
async fn list_targets<S: Store>(
    State(state): State<AppState<S>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<TargetsQuery>,
) -> Result<Json<Vec<ClassInfo>>, AppError> {
    require_admin(&user)?;

    let student_ids = match query.student_ids.as_deref() {
        Some(raw) => parse_id_list(raw)?,
        None => Vec::new(),
    };

    let classes = state.store.list_classes().await?;
    let selected = if student_ids.is_empty() {
        Vec::new()
    } else {
        state.store.find_students(&student_ids).await?
    };

    let targets: Vec<ClassInfo> = eligible_destinations(&classes, Some(query.class_id), &selected)
        .into_iter()
        .cloned()
        .collect();

    Ok(Json(targets))
}

// =========================================================================
// POST /promotion
// =========================================================================

/// Promote a cohort of students to a new class.
async fn promote<S: Store>(
    State(state): State<AppState<S>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<PromotionRequest>,
) -> Result<Json<PromotionResult>, AppError> {
    require_admin(&user)?;

    let handler = PromotionHandler::new(state.store.clone(), state.batch);
    let command = PromoteCohortCommand::new(
        request.student_ids,
        request.source_class_id,
        request.destination_class_id,
    );

    let result = handler.execute(command).await?;

    Ok(Json(result))
}
