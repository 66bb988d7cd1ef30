// HTTP surface: booking, reconciliation, contact and internal endpoints.

use axum::{
    body::Bytes,
    extract::{ConnectInfo, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tracing::{error, warn};

use crate::booking::initiation::{self, BookingIntent, InitiatedBooking, InitiationError};
use crate::booking::reconcile::{self, BookingCheck, ReconcileError, VerificationReport};
use crate::booking::{availability, Room};
use crate::booking_counter_inc;
use crate::contact::{self, ContactRequest, SubmissionError};
use crate::paystack::{webhook, PaymentGateway};
use crate::ratelimit::{Decision, RateLimiter};
use crate::settings::Config;
use crate::store::{Store, StoreError};

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub gateway: Arc<dyn PaymentGateway>,
    pub limiter: Arc<RateLimiter>,
    pub http: reqwest::Client,
    pub cfg: Arc<Config>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/rooms", get(list_rooms))
        .route("/api/bookings", post(create_booking))
        .route("/api/check-booking", get(check_booking))
        .route("/api/contact", post(submit_contact))
        .route("/api/payments/webhook", post(gateway_webhook))
        .route("/internal/verify-payment/:reference", post(verify_payment))
        .route("/internal/reset-availability", post(reset_availability))
        .route("/internal/rooms", put(upsert_room))
        .with_state(state)
}

/// User-facing error surface. Upstream and store detail is logged here and
/// never shown; every failure leaves the caller an actionable next step.
#[derive(Debug)]
pub enum ApiError {
    Validation(String),
    RateLimited,
    NotFound(String),
    Conflict(String),
    Unauthorized,
    Gateway(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many requests, please wait a few minutes and try again".to_string(),
            ),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Conflict(m) => (StatusCode::CONFLICT, m),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
            ApiError::Gateway(detail) => {
                error!(detail = %detail, "payment gateway failure");
                (
                    StatusCode::BAD_GATEWAY,
                    "Payment service is temporarily unavailable, please try again or check your bookings page"
                        .to_string(),
                )
            }
            ApiError::Internal(detail) => {
                error!(detail = %detail, "internal failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<InitiationError> for ApiError {
    fn from(e: InitiationError) -> Self {
        match e {
            InitiationError::Validation(v) => ApiError::Validation(validation_detail(&v)),
            InitiationError::InvalidDates => {
                ApiError::Validation("check-out must be after check-in".to_string())
            }
            InitiationError::InvalidAmount(a) => ApiError::Validation(a.to_string()),
            InitiationError::RoomNotFound(id) => {
                ApiError::NotFound(format!("room {id} not found"))
            }
            InitiationError::RoomUnavailable(id) => {
                ApiError::Conflict(format!("room {id} is not available for booking"))
            }
            InitiationError::ReferenceGenerationFailed => {
                ApiError::Internal("could not allocate a unique booking reference".to_string())
            }
            InitiationError::PaymentInitializationFailed(g) => ApiError::Gateway(g.to_string()),
            InitiationError::Store(s) => ApiError::Internal(s.to_string()),
        }
    }
}

impl From<ReconcileError> for ApiError {
    fn from(e: ReconcileError) -> Self {
        match e {
            ReconcileError::UnknownReference(r) => {
                ApiError::NotFound(format!("no booking for reference {r}"))
            }
            ReconcileError::Gateway(g) => ApiError::Gateway(g.to_string()),
            ReconcileError::Store(s) => ApiError::Internal(s.to_string()),
        }
    }
}

fn validation_detail(errors: &validator::ValidationErrors) -> String {
    let mut parts = Vec::new();
    for errs in errors.field_errors().values() {
        for err in errs.iter() {
            match &err.message {
                Some(msg) => parts.push(msg.to_string()),
                None => parts.push(err.code.to_string()),
            }
        }
    }
    if parts.is_empty() {
        "invalid input".to_string()
    } else {
        parts.join("; ")
    }
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn list_rooms(State(state): State<AppState>) -> Result<Json<Vec<Room>>, ApiError> {
    Ok(Json(state.store.list_rooms()?))
}

/// Initiate a booking. The stay total is computed here from the room's rate,
/// never taken from the client.
async fn create_booking(
    State(state): State<AppState>,
    Json(intent): Json<BookingIntent>,
) -> Result<Json<InitiatedBooking>, ApiError> {
    let room = state
        .store
        .get_room(intent.room_id)?
        .ok_or_else(|| ApiError::NotFound(format!("room {} not found", intent.room_id)))?;
    let nights = (intent.check_out - intent.check_in).num_days();
    if nights <= 0 {
        return Err(ApiError::Validation(
            "check-out must be after check-in".to_string(),
        ));
    }
    let amount_major = (room.effective_rate_minor() * nights) as f64 / 100.0;

    let callback_url = &state.cfg.paystack.callback_url;
    let callback_url = (!callback_url.is_empty()).then_some(callback_url.as_str());

    let initiated = initiation::initiate(
        &state.store,
        state.gateway.as_ref(),
        &state.cfg.paystack.currency,
        callback_url,
        &intent,
        amount_major,
    )
    .await?;
    Ok(Json(initiated))
}

#[derive(Debug, Deserialize)]
struct CheckParams {
    #[serde(rename = "ref")]
    reference: Option<String>,
}

/// Browser-side status check after the checkout redirect. Read-only; the
/// client routes on the stored status and nothing else.
async fn check_booking(
    State(state): State<AppState>,
    Query(params): Query<CheckParams>,
) -> Result<Json<Value>, ApiError> {
    let reference = params
        .reference
        .filter(|r| !r.is_empty())
        .ok_or_else(|| ApiError::Validation("missing ref parameter".to_string()))?;

    let check = reconcile::check_booking_status(&state.store, &reference)?;
    let body = match check {
        BookingCheck::Unknown => json!({ "exists": false }),
        BookingCheck::Pending(summary) | BookingCheck::Confirmed(summary) => {
            json!({ "exists": true, "booking": summary })
        }
    };
    Ok(Json(body))
}

async fn submit_contact(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(req): Json<ContactRequest>,
) -> Result<Json<Value>, ApiError> {
    let ip = client_ip(&headers, connect_info.map(|ConnectInfo(addr)| addr));
    if state.limiter.check(ip) == Decision::Limited {
        warn!(ip = %ip, "contact submission rate limited");
        booking_counter_inc!("contact.rate_limited");
        return Err(ApiError::RateLimited);
    }

    let message = contact::record_submission(&state.store, &req).map_err(|e| match e {
        SubmissionError::Validation(v) => ApiError::Validation(validation_detail(&v)),
        SubmissionError::Store(s) => ApiError::from(s),
    })?;

    // Best-effort; the stored submission is the durable record of intent
    if !state.cfg.contact_notify_url.is_empty() {
        contact::relay_notification(&state.http, &state.cfg.contact_notify_url, &message).await;
    }

    Ok(Json(json!({
        "success": true,
        "data": { "id": message.id, "timestamp": message.received_at }
    })))
}

/// Gateway server-to-server notifications.
async fn gateway_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match webhook::handle_webhook(
        &body,
        &headers,
        &state.cfg.paystack.secret_key,
        &state.store,
    )
    .await
    {
        Ok(()) => (StatusCode::OK, "OK".to_string()).into_response(),
        Err(e) => {
            error!("webhook processing failed: {}", e);
            let status = StatusCode::from_u16(e.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, e.to_string()).into_response()
        }
    }
}

/// Operator-triggered verification against the gateway's ground truth.
async fn verify_payment(
    State(state): State<AppState>,
    Path(reference): Path<String>,
    headers: HeaderMap,
) -> Result<Json<VerificationReport>, ApiError> {
    require_admin(&headers, &state.cfg.admin_token)?;
    let report =
        reconcile::verify_payment(&state.store, state.gateway.as_ref(), &reference).await?;
    Ok(Json(report))
}

/// The hosting platform's scheduled-function trigger for the reset job.
async fn reset_availability(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    require_admin(&headers, &state.cfg.admin_token)?;
    let today = chrono::Utc::now().date_naive();
    let report = availability::run_reset(&state.store, today)?;
    Ok(Json(json!({
        "message": format!("released {} room(s)", report.updated_rooms.len()),
        "updated_rooms": report.updated_rooms,
    })))
}

/// Stand-in interface for the out-of-scope room administration tooling.
async fn upsert_room(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(room): Json<Room>,
) -> Result<Json<Room>, ApiError> {
    require_admin(&headers, &state.cfg.admin_token)?;
    state.store.upsert_room(&room)?;
    Ok(Json(room))
}

fn require_admin(headers: &HeaderMap, admin_token: &str) -> Result<(), ApiError> {
    if admin_token.is_empty() {
        warn!("internal endpoint called but no admin token is configured");
        return Err(ApiError::Unauthorized);
    }
    let provided = headers
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("");

    // Constant-time comparison, same as the webhook signature check
    let expected = admin_token.as_bytes();
    let matches = provided.len() == expected.len()
        && provided
            .as_bytes()
            .iter()
            .zip(expected)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0;
    if matches {
        Ok(())
    } else {
        Err(ApiError::Unauthorized)
    }
}

fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> IpAddr {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|v| v.trim().parse().ok())
        .or_else(|| peer.map(|p| p.ip()))
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}
