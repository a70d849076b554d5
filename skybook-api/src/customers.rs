use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use skybook_core::{BookingError, Customer, CustomerStatus, NewCustomer};
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct UpdateCustomerStatusRequest {
    pub status: CustomerStatus,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/customers", post(create_customer))
        .route("/v1/customers/{id}", get(get_customer))
        .route("/v1/customers/{id}/status", put(update_customer_status))
}

async fn create_customer(
    State(state): State<AppState>,
    Json(customer): Json<NewCustomer>,
) -> Result<(StatusCode, Json<Customer>), AppError> {
    if customer.email.trim().is_empty() {
        return Err(AppError::ValidationError("email is required".to_string()));
    }
    let customer = state.customer_repo.create_customer(customer).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

async fn get_customer(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Customer>, AppError> {
    let customer = state
        .customer_repo
        .get_customer(id)
        .await?
        .ok_or(BookingError::CustomerNotFound)?;
    Ok(Json(customer))
}

async fn update_customer_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCustomerStatusRequest>,
) -> Result<StatusCode, AppError> {
    state.customer_repo.set_customer_status(id, req.status).await?;
    Ok(StatusCode::NO_CONTENT)
}
