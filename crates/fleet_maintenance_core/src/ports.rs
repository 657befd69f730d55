//! crates/fleet_maintenance_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or mail
//! relays.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    Appointment, AuditAction, AuditLogEntry, AuthContext, ChatMessage, RiskAssessment, Role,
    SenderRole, User, UserCredentials, Vehicle, VehicleFeatures,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Users ---
    async fn get_user_by_username(&self, username: &str) -> PortResult<UserCredentials>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    /// Looks up the customer account a vehicle belongs to, for booking
    /// confirmations.
    async fn get_owner_of_vin(&self, vin: &str) -> PortResult<User>;

    // --- Auth Sessions ---
    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Validates a session cookie and returns the owning user id.
    /// Expired or unknown sessions are `NotFound`.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Vehicles ---
    async fn list_vehicles(&self) -> PortResult<Vec<Vehicle>>;

    async fn get_vehicle(&self, vin: &str) -> PortResult<Vehicle>;

    // --- Appointments ---
    async fn create_appointment(
        &self,
        vin: &str,
        service_center: &str,
        service_date: &str,
        service_time: &str,
        cost: f64,
    ) -> PortResult<Appointment>;

    async fn list_appointments_for_vin(&self, vin: &str) -> PortResult<Vec<Appointment>>;

    async fn list_all_appointments(&self) -> PortResult<Vec<Appointment>>;

    // --- Chat ---
    async fn append_chat_message(
        &self,
        vin: &str,
        sender_role: SenderRole,
        message: &str,
    ) -> PortResult<ChatMessage>;

    /// The full chat log for one vehicle, oldest first.
    async fn chat_history(&self, vin: &str) -> PortResult<Vec<ChatMessage>>;

    // --- Audit Trail ---
    async fn append_audit_entry(
        &self,
        user_role: Role,
        action: AuditAction,
        vin: Option<&str>,
    ) -> PortResult<()>;

    /// Audit entries, newest first.
    async fn list_audit_entries(&self) -> PortResult<Vec<AuditLogEntry>>;

    // --- Notification Workflow ---
    /// Runs the one-shot proactive-alert sequence for a vehicle in a single
    /// transaction: insert the AI alert chat message, flip `notified` to
    /// true, and append the audit entry. Returns `false` without side
    /// effects when the vehicle was already notified.
    async fn record_ai_notification(&self, vin: &str, alert_message: &str) -> PortResult<bool>;
}

/// Turns a vehicle's sensor features into a risk classification.
///
/// Implementations wrap a model loaded once at startup and must be pure:
/// no I/O, deterministic for a given input.
pub trait RiskScoringService: Send + Sync {
    fn score(&self, features: &VehicleFeatures) -> RiskAssessment;
}

/// Produces the canned assistant reply for a chat message, parameterized
/// by the vehicle's current risk assessment. Stateless and deterministic.
pub trait ChatResponseService: Send + Sync {
    fn respond(&self, message: &str, assessment: &RiskAssessment) -> String;
}

#[async_trait]
pub trait EmailService: Send + Sync {
    /// Sends a booking confirmation. One attempt, no retry; failures map
    /// to `PortError::Unexpected`.
    async fn send_booking_confirmation(
        &self,
        recipient: &str,
        appointment: &Appointment,
    ) -> PortResult<()>;
}

impl AuthContext {
    /// Convenience guard used by handlers: `Ok` when the session may see
    /// the vehicle, `Unauthorized` otherwise.
    pub fn authorize(&self, vin: &str) -> PortResult<()> {
        if self.may_access(vin) {
            Ok(())
        } else {
            Err(PortError::Unauthorized)
        }
    }
}
