use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use skybook_core::{CreateOrderRequest, ListParams, Order, OrderStatus, Page, SortOrder};
use tokio::time::Instant;
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub flight_id: Uuid,
    pub customer_id: Uuid,
    pub ticket_amount: i32,
    pub total_amount: i64,
    pub status: OrderStatus,
    pub booking_time: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            order_number: order.order_number,
            flight_id: order.flight_id,
            customer_id: order.customer_id,
            ticket_amount: order.ticket_amount,
            total_amount: order.total_amount,
            status: order.status,
            booking_time: order.booking_time,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderListResponse {
    pub data: Vec<OrderResponse>,
    pub total_count: i64,
    pub page: u32,
    pub page_size: u32,
}

impl From<Page<Order>> for OrderListResponse {
    fn from(page: Page<Order>) -> Self {
        Self {
            data: page.data.into_iter().map(OrderResponse::from).collect(),
            total_count: page.total_count,
            page: page.page,
            page_size: page.page_size,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListOrdersQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
    pub status: Option<String>,
    pub order_number: Option<String>,
    pub customer_id: Option<String>,
    pub flight_id: Option<String>,
}

impl From<ListOrdersQuery> for ListParams {
    fn from(query: ListOrdersQuery) -> Self {
        let mut params = ListParams {
            page: query.page,
            page_size: query.page_size,
            sort_by: query.sort_by,
            sort_order: query.sort_order,
            ..Default::default()
        };
        let filters = [
            ("status", query.status),
            ("order_number", query.order_number),
            ("customer_id", query.customer_id),
            ("flight_id", query.flight_id),
        ];
        for (column, value) in filters {
            if let Some(value) = value {
                params.filters.insert(column.to_string(), value);
            }
        }
        params
    }
}

// ============================================================================
// Handlers
// ============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/orders", get(list_orders).post(create_order))
        .route("/v1/orders/{id}", get(get_order))
}

/// POST /v1/orders
/// Book seats on a flight
async fn create_order(
    State(state): State<AppState>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), AppError> {
    let order = match state.booking_timeout {
        Some(timeout) => {
            state
                .engine
                .create_order_with_deadline(req, Instant::now() + timeout)
                .await?
        }
        None => state.engine.create_order(req).await?,
    };
    Ok((StatusCode::CREATED, Json(order.into())))
}

/// GET /v1/orders
async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<OrderListResponse>, AppError> {
    let page = state.order_repo.list_orders(&query.into()).await?;
    Ok(Json(page.into()))
}

/// GET /v1/orders/{id}
async fn get_order(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<OrderResponse>, AppError> {
    let order = state
        .order_repo
        .get_order(id)
        .await?
        .ok_or_else(|| AppError::NotFoundError(format!("order {} not found", id)))?;
    Ok(Json(order.into()))
}
