//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the dashboard endpoints and the master
//! definition for the OpenAPI specification.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Extension, Json,
};
use fleet_maintenance_core::domain::{
    Appointment, AuditAction, AuditLogEntry, AuthContext, ChatMessage, RiskAssessment, Role,
    SenderRole, Vehicle, VehicleFeatures, AVERAGE_SERVICE_COST,
};
use fleet_maintenance_core::ports::{PortError, PortResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

use crate::web::auth;
use crate::web::state::AppState;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::login_page_handler,
        auth::login_handler,
        auth::logout_handler,
        dashboard_handler,
        vehicle_health_handler,
        predictions_handler,
        reports_handler,
        schedule_form_handler,
        book_appointment_handler,
        chat_history_handler,
        post_chat_message_handler,
        notify_handler,
        audit_logs_handler,
        confirmation_handler,
    ),
    components(
        schemas(
            auth::LoginRequest,
            auth::LoginResponse,
            auth::LoginPageResponse,
            ScoredVehicleDto,
            DashboardResponse,
            VehicleHealthResponse,
            PredictionDto,
            PredictionsResponse,
            AppointmentDto,
            ReportsResponse,
            ScheduleFormResponse,
            BookAppointmentRequest,
            ChatMessageDto,
            ChatHistoryResponse,
            ChatRequest,
            ChatReplyResponse,
            NotifyResponse,
            AuditLogEntryDto,
            AuditLogsResponse,
            ConfirmationResponse,
        )
    ),
    tags(
        (name = "Fleet Maintenance API", description = "Role-gated endpoints for the fleet maintenance dashboard.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// A vehicle row annotated with its freshly computed risk assessment.
#[derive(Serialize, ToSchema)]
pub struct ScoredVehicleDto {
    pub vin: String,
    pub age: i32,
    pub mileage: i32,
    pub engine_temp: f64,
    pub error_count: i32,
    pub notified: bool,
    pub risk: String,
    pub risk_score: f64,
    pub alert: String,
}

impl ScoredVehicleDto {
    fn new(vehicle: Vehicle, assessment: RiskAssessment) -> Self {
        Self {
            vin: vehicle.vin,
            age: vehicle.age,
            mileage: vehicle.mileage,
            engine_temp: vehicle.engine_temp,
            error_count: vehicle.error_count,
            notified: vehicle.notified,
            risk: assessment.risk.to_string(),
            risk_score: assessment.risk_score,
            alert: assessment.alert().to_string(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct DashboardResponse {
    pub fleet_size: usize,
    pub high_risk_count: usize,
    pub vehicles: Vec<ScoredVehicleDto>,
}

#[derive(Serialize, ToSchema)]
pub struct VehicleHealthResponse {
    pub vehicles: Vec<ScoredVehicleDto>,
}

#[derive(Serialize, ToSchema)]
pub struct PredictionDto {
    pub vin: String,
    pub risk: String,
    pub risk_score: f64,
}

#[derive(Serialize, ToSchema)]
pub struct PredictionsResponse {
    pub predictions: Vec<PredictionDto>,
}

#[derive(Serialize, ToSchema)]
pub struct AppointmentDto {
    pub id: Uuid,
    pub vin: String,
    pub service_center: String,
    pub service_date: String,
    pub service_time: String,
    pub status: String,
    pub cost: f64,
}

impl From<Appointment> for AppointmentDto {
    fn from(a: Appointment) -> Self {
        Self {
            id: a.id,
            vin: a.vin,
            service_center: a.service_center,
            service_date: a.service_date,
            service_time: a.service_time,
            status: a.status.to_string(),
            cost: a.cost,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ReportsResponse {
    pub vehicles: Vec<ScoredVehicleDto>,
    pub appointments: Vec<AppointmentDto>,
}

#[derive(Serialize, ToSchema)]
pub struct ScheduleFormResponse {
    pub vin: String,
    pub average_cost: f64,
}

#[derive(Deserialize, ToSchema)]
pub struct BookAppointmentRequest {
    pub service_center: String,
    pub service_date: String,
    pub service_time: String,
    /// Falls back to the fixed average estimate when omitted.
    pub cost: Option<f64>,
}

#[derive(Serialize, ToSchema)]
pub struct ChatMessageDto {
    pub sender_role: String,
    pub message: String,
    pub timestamp: String,
}

impl From<ChatMessage> for ChatMessageDto {
    fn from(m: ChatMessage) -> Self {
        Self {
            sender_role: m.sender_role.as_str().to_string(),
            message: m.message,
            timestamp: m.timestamp.to_rfc3339(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ChatHistoryResponse {
    pub vin: String,
    pub messages: Vec<ChatMessageDto>,
}

#[derive(Deserialize, ToSchema)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct ChatReplyResponse {
    pub vin: String,
    pub reply: ChatMessageDto,
}

#[derive(Serialize, ToSchema)]
pub struct NotifyResponse {
    pub vin: String,
    pub notified: bool,
    /// False when the vehicle had already been notified (idempotent no-op).
    pub applied: bool,
}

#[derive(Serialize, ToSchema)]
pub struct AuditLogEntryDto {
    pub user_role: String,
    pub action: String,
    pub vin: Option<String>,
    pub timestamp: String,
}

impl From<AuditLogEntry> for AuditLogEntryDto {
    fn from(e: AuditLogEntry) -> Self {
        Self {
            user_role: e.user_role.to_string(),
            action: e.action,
            vin: e.vin,
            timestamp: e.timestamp.to_rfc3339(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AuditLogsResponse {
    pub entries: Vec<AuditLogEntryDto>,
}

#[derive(Serialize, ToSchema)]
pub struct ConfirmationResponse {
    pub message: String,
}

//=========================================================================================
// Shared Helpers
//=========================================================================================

/// Maps a port failure onto the HTTP surface: unknown rows are 404, scope
/// violations are 403, everything else is a generic 500 with details kept
/// in the logs.
fn port_error(e: PortError) -> (StatusCode, String) {
    match e {
        PortError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        PortError::Unauthorized => (StatusCode::FORBIDDEN, "Forbidden".to_string()),
        PortError::Unexpected(msg) => {
            error!("Request failed: {}", msg);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

fn require_admin(ctx: &AuthContext) -> Result<(), (StatusCode, String)> {
    if ctx.is_admin() {
        Ok(())
    } else {
        Err((StatusCode::FORBIDDEN, "Forbidden".to_string()))
    }
}

fn score(state: &AppState, vehicle: &Vehicle) -> RiskAssessment {
    state.risk_scorer.score(&VehicleFeatures::from(vehicle))
}

/// The vehicles this session may see: the whole fleet for admins, the
/// account's own vehicle for customers.
async fn visible_vehicles(state: &AppState, ctx: &AuthContext) -> PortResult<Vec<Vehicle>> {
    match ctx.role {
        Role::Admin => state.db.list_vehicles().await,
        Role::Customer => match &ctx.vin {
            Some(vin) => Ok(vec![state.db.get_vehicle(vin).await?]),
            None => Ok(Vec::new()),
        },
    }
}

fn scored_dtos(state: &AppState, vehicles: Vec<Vehicle>) -> Vec<ScoredVehicleDto> {
    vehicles
        .into_iter()
        .map(|v| {
            let assessment = score(state, &v);
            ScoredVehicleDto::new(v, assessment)
        })
        .collect()
}

//=========================================================================================
// Page Handlers
//=========================================================================================

/// GET / - Admin dashboard; customers are sent to their vehicle's chat.
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Dashboard data", body = DashboardResponse),
        (status = 303, description = "Customer redirect to own chat"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn dashboard_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Response, (StatusCode, String)> {
    if !ctx.is_admin() {
        // A customer's landing page is the chat for their own vehicle.
        return match &ctx.vin {
            Some(vin) => Ok(Redirect::to(&format!("/chat/{}", vin)).into_response()),
            None => Err((StatusCode::FORBIDDEN, "No vehicle on file".to_string())),
        };
    }

    let vehicles = state.db.list_vehicles().await.map_err(port_error)?;
    let scored = scored_dtos(&state, vehicles);
    let high_risk_count = scored.iter().filter(|v| v.risk == "High").count();

    Ok(Json(DashboardResponse {
        fleet_size: scored.len(),
        high_risk_count,
        vehicles: scored,
    })
    .into_response())
}

/// GET /vehicle-health - Scored vehicle listing with advisory alerts.
#[utoipa::path(
    get,
    path = "/vehicle-health",
    responses(
        (status = 200, description = "Scored vehicles", body = VehicleHealthResponse),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn vehicle_health_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let vehicles = visible_vehicles(&state, &ctx).await.map_err(port_error)?;
    Ok(Json(VehicleHealthResponse {
        vehicles: scored_dtos(&state, vehicles),
    }))
}

/// GET /predictions - The probability view of the same scored listing.
#[utoipa::path(
    get,
    path = "/predictions",
    responses(
        (status = 200, description = "Risk predictions", body = PredictionsResponse),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn predictions_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let vehicles = visible_vehicles(&state, &ctx).await.map_err(port_error)?;
    let predictions = vehicles
        .iter()
        .map(|v| {
            let assessment = score(&state, v);
            PredictionDto {
                vin: v.vin.clone(),
                risk: assessment.risk.to_string(),
                risk_score: assessment.risk_score,
            }
        })
        .collect();
    Ok(Json(PredictionsResponse { predictions }))
}

/// GET /reports - Scored vehicles joined with their appointment history.
#[utoipa::path(
    get,
    path = "/reports",
    responses(
        (status = 200, description = "Fleet report", body = ReportsResponse),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn reports_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let vehicles = visible_vehicles(&state, &ctx).await.map_err(port_error)?;

    let appointments = match (&ctx.role, &ctx.vin) {
        (Role::Admin, _) => state.db.list_all_appointments().await,
        (Role::Customer, Some(vin)) => state.db.list_appointments_for_vin(vin).await,
        (Role::Customer, None) => Ok(Vec::new()),
    }
    .map_err(port_error)?;

    Ok(Json(ReportsResponse {
        vehicles: scored_dtos(&state, vehicles),
        appointments: appointments.into_iter().map(AppointmentDto::from).collect(),
    }))
}

/// GET /schedule/{vin} - Booking form data with the fixed cost estimate.
#[utoipa::path(
    get,
    path = "/schedule/{vin}",
    params(("vin" = String, Path, description = "Vehicle identification number")),
    responses(
        (status = 200, description = "Booking form data", body = ScheduleFormResponse),
        (status = 403, description = "Vehicle belongs to another customer"),
        (status = 404, description = "Unknown vehicle")
    )
)]
pub async fn schedule_form_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Path(vin): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    ctx.authorize(&vin).map_err(port_error)?;
    let vehicle = state.db.get_vehicle(&vin).await.map_err(port_error)?;

    Ok(Json(ScheduleFormResponse {
        vin: vehicle.vin,
        average_cost: AVERAGE_SERVICE_COST,
    }))
}

/// POST /schedule/{vin} - Book an appointment; confirms by email.
#[utoipa::path(
    post,
    path = "/schedule/{vin}",
    params(("vin" = String, Path, description = "Vehicle identification number")),
    request_body = BookAppointmentRequest,
    responses(
        (status = 303, description = "Booked, redirected to confirmation"),
        (status = 403, description = "Vehicle belongs to another customer"),
        (status = 404, description = "Unknown vehicle"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn book_appointment_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Path(vin): Path<String>,
    Json(req): Json<BookAppointmentRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    ctx.authorize(&vin).map_err(port_error)?;
    let vehicle = state.db.get_vehicle(&vin).await.map_err(port_error)?;

    // 1. Persist the appointment; bookings always start out Scheduled.
    let appointment = state
        .db
        .create_appointment(
            &vehicle.vin,
            &req.service_center,
            &req.service_date,
            &req.service_time,
            req.cost.unwrap_or(AVERAGE_SERVICE_COST),
        )
        .await
        .map_err(port_error)?;

    // 2. Record the booking in the audit trail.
    state
        .db
        .append_audit_entry(ctx.role, AuditAction::ServiceBooked, Some(&vehicle.vin))
        .await
        .map_err(port_error)?;

    // 3. Confirm by email to the vehicle's owner. One attempt, no retry;
    //    an owner without an address on file just skips the send.
    match state.db.get_owner_of_vin(&vehicle.vin).await {
        Ok(owner) => match owner.email {
            Some(address) => {
                state
                    .mailer
                    .send_booking_confirmation(&address, &appointment)
                    .await
                    .map_err(port_error)?;
            }
            None => warn!(
                "Owner of {} has no email address; skipping confirmation",
                vehicle.vin
            ),
        },
        Err(PortError::NotFound(_)) => {
            warn!("No owner on file for {}; skipping confirmation", vehicle.vin)
        }
        Err(e) => return Err(port_error(e)),
    }

    Ok(Redirect::to("/confirmation"))
}

/// GET /chat/{vin} - The vehicle's chat history, oldest first.
#[utoipa::path(
    get,
    path = "/chat/{vin}",
    params(("vin" = String, Path, description = "Vehicle identification number")),
    responses(
        (status = 200, description = "Chat history", body = ChatHistoryResponse),
        (status = 403, description = "Vehicle belongs to another customer"),
        (status = 404, description = "Unknown vehicle")
    )
)]
pub async fn chat_history_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Path(vin): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    ctx.authorize(&vin).map_err(port_error)?;
    let vehicle = state.db.get_vehicle(&vin).await.map_err(port_error)?;
    let messages = state.db.chat_history(&vehicle.vin).await.map_err(port_error)?;

    Ok(Json(ChatHistoryResponse {
        vin: vehicle.vin,
        messages: messages.into_iter().map(ChatMessageDto::from).collect(),
    }))
}

/// POST /chat/{vin} - Append a customer message and the assistant's reply.
#[utoipa::path(
    post,
    path = "/chat/{vin}",
    params(("vin" = String, Path, description = "Vehicle identification number")),
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant reply", body = ChatReplyResponse),
        (status = 403, description = "Vehicle belongs to another customer"),
        (status = 404, description = "Unknown vehicle"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn post_chat_message_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Path(vin): Path<String>,
    Json(req): Json<ChatRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    ctx.authorize(&vin).map_err(port_error)?;
    let vehicle = state.db.get_vehicle(&vin).await.map_err(port_error)?;

    // 1. The reply is computed from the vehicle's current assessment.
    let assessment = score(&state, &vehicle);
    let reply_text = state.chat_responder.respond(&req.message, &assessment);

    // 2. Append both sides of the exchange, customer first.
    state
        .db
        .append_chat_message(&vehicle.vin, SenderRole::Customer, &req.message)
        .await
        .map_err(port_error)?;

    let reply = state
        .db
        .append_chat_message(&vehicle.vin, SenderRole::Ai, &reply_text)
        .await
        .map_err(port_error)?;

    // 3. Record the assistant response in the audit trail.
    state
        .db
        .append_audit_entry(ctx.role, AuditAction::AiChatResponse, Some(&vehicle.vin))
        .await
        .map_err(port_error)?;

    Ok(Json(ChatReplyResponse {
        vin: vehicle.vin,
        reply: ChatMessageDto::from(reply),
    }))
}

/// GET /notify/{vin} - Run the one-shot proactive alert workflow (admin only).
#[utoipa::path(
    get,
    path = "/notify/{vin}",
    params(("vin" = String, Path, description = "Vehicle identification number")),
    responses(
        (status = 200, description = "Notification state", body = NotifyResponse),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Unknown vehicle"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn notify_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Path(vin): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    require_admin(&ctx)?;
    let vehicle = state.db.get_vehicle(&vin).await.map_err(port_error)?;

    let assessment = score(&state, &vehicle);
    let alert_message = format!(
        "Proactive maintenance alert: vehicle {} is rated {} risk with a {:.2}% \
         failure probability. {}.",
        vehicle.vin,
        assessment.risk,
        assessment.risk_score,
        assessment.alert()
    );

    let applied = state
        .db
        .record_ai_notification(&vehicle.vin, &alert_message)
        .await
        .map_err(port_error)?;

    Ok(Json(NotifyResponse {
        vin: vehicle.vin,
        notified: true,
        applied,
    }))
}

/// GET /audit-logs - The audit trail, newest first (admin only).
#[utoipa::path(
    get,
    path = "/audit-logs",
    responses(
        (status = 200, description = "Audit entries", body = AuditLogsResponse),
        (status = 403, description = "Not an admin"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn audit_logs_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    require_admin(&ctx)?;
    let entries = state.db.list_audit_entries().await.map_err(port_error)?;

    Ok(Json(AuditLogsResponse {
        entries: entries.into_iter().map(AuditLogEntryDto::from).collect(),
    }))
}

/// GET /confirmation - Static booking confirmation page.
#[utoipa::path(
    get,
    path = "/confirmation",
    responses(
        (status = 200, description = "Confirmation page data", body = ConfirmationResponse)
    )
)]
pub async fn confirmation_handler() -> Json<ConfirmationResponse> {
    Json(ConfirmationResponse {
        message: "Your service appointment has been booked. A confirmation email is on its way."
            .to_string(),
    })
}
