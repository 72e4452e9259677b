//! HTTP surface exposing the storefront core to the page layer

use axum::{extract::{Path, State}, http::StatusCode, routing::{get, post}, Json, Router};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use crate::domain::aggregates::cart::CartLine;
use crate::domain::services::availability::{merchant_status, StoreStatus};
use crate::domain::services::order_message::{ComposeError, CustomerDetails, DeliveryAddress, OrderComposer, OrderMessage};
use crate::presence::{PresenceApproximator, PresenceError};

#[derive(Clone)]
pub struct AppState {
    pub presence: PresenceApproximator,
    pub composer: Arc<OrderComposer>,
    pub timezone: Tz,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "storefront-core"})) }))
        .route("/api/v1/availability", post(availability))
        .route("/api/v1/presence/:slug", get(online_count))
        .route("/api/v1/presence/:slug/heartbeat", post(heartbeat))
        .route("/api/v1/orders/compose", post(compose_order))
        .layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).with_state(state)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityRequest {
    /// Stored schedule JSON; absent when the merchant never set hours.
    #[serde(default)]
    pub schedule: Option<String>,
    /// Instant to evaluate; defaults to now.
    #[serde(default)]
    pub at: Option<DateTime<Utc>>,
    /// Merchant's manual open switch; on unless sent as false.
    #[serde(default)]
    pub accepting_orders: Option<bool>,
}

async fn availability(State(s): State<AppState>, Json(r): Json<AvailabilityRequest>) -> Json<StoreStatus> {
    let now = r.at.unwrap_or_else(Utc::now).with_timezone(&s.timezone);
    Json(merchant_status(r.accepting_orders.unwrap_or(true), r.schedule.as_deref(), &now))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatRequest { pub visitor_id: String }

#[derive(Debug, Serialize, Deserialize)]
pub struct OnlineResponse { pub slug: String, pub online: usize }

async fn heartbeat(State(s): State<AppState>, Path(slug): Path<String>, Json(r): Json<HeartbeatRequest>) -> Result<StatusCode, (StatusCode, String)> {
    s.presence.heartbeat(&slug, &r.visitor_id).await.map_err(presence_error)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn online_count(State(s): State<AppState>, Path(slug): Path<String>) -> Result<Json<OnlineResponse>, (StatusCode, String)> {
    let online = s.presence.online_count(&slug).await.map_err(presence_error)?;
    Ok(Json(OnlineResponse { slug, online }))
}

fn presence_error(e: PresenceError) -> (StatusCode, String) { (StatusCode::BAD_REQUEST, e.to_string()) }

/// Either a ready address line or the structured checkout form.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub delivery_address: Option<DeliveryAddress>,
}

impl CustomerRequest {
    fn into_details(self) -> CustomerDetails {
        match self.delivery_address {
            Some(structured) => CustomerDetails::with_address(self.name.as_deref(), &structured),
            None => CustomerDetails::new(self.name.as_deref(), self.address.unwrap_or_default()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ComposeRequest { pub lines: Vec<CartLine>, pub customer: CustomerRequest }

async fn compose_order(State(s): State<AppState>, Json(r): Json<ComposeRequest>) -> Result<Json<OrderMessage>, (StatusCode, String)> {
    let customer = r.customer.into_details();
    s.composer.compose(&r.lines, &customer).map(Json).map_err(|e: ComposeError| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))
}
