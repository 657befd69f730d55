//! crates/fleet_maintenance_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

/// The role attached to a user account and to every authenticated request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Customer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Customer => "customer",
        }
    }

    pub fn parse(value: &str) -> Option<Role> {
        match value {
            "admin" => Some(Role::Admin),
            "customer" => Some(Role::Customer),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A vehicle in the fleet, keyed by VIN.
///
/// The four sensor columns feed the risk model; `notified` is the one-way
/// flag preventing duplicate proactive alerts.
#[derive(Debug, Clone)]
pub struct Vehicle {
    pub vin: String,
    pub age: i32,
    pub mileage: i32,
    pub engine_temp: f64,
    pub error_count: i32,
    pub notified: bool,
}

/// The numeric feature row handed to the risk model.
///
/// Sensor values absent in storage default to 0, which is what
/// `Default` yields here.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VehicleFeatures {
    pub age: f64,
    pub mileage: f64,
    pub engine_temp: f64,
    pub error_count: f64,
}

impl From<&Vehicle> for VehicleFeatures {
    fn from(vehicle: &Vehicle) -> Self {
        Self {
            age: f64::from(vehicle.age),
            mileage: f64::from(vehicle.mileage),
            engine_temp: vehicle.engine_temp,
            error_count: f64::from(vehicle.error_count),
        }
    }
}

/// The binary risk classification produced by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    Low,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => f.write_str("Low"),
            RiskLevel::High => f.write_str("High"),
        }
    }
}

/// The transient scoring result attached to a vehicle at read time.
/// Never persisted; recomputed on every read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskAssessment {
    pub risk: RiskLevel,
    /// Failure probability in percent, rounded to two decimals.
    pub risk_score: f64,
}

impl RiskAssessment {
    /// The advisory string shown next to a scored vehicle.
    pub fn alert(&self) -> &'static str {
        match self.risk {
            RiskLevel::High => "Immediate service recommended",
            RiskLevel::Low => "Vehicle operating normally",
        }
    }
}

/// The fixed average-cost estimate quoted on the booking form and in
/// cost-related chat replies.
pub const AVERAGE_SERVICE_COST: f64 = 4500.0;

/// Lifecycle state of a service appointment. Bookings are always created
/// as `Scheduled`; the other states arrive through back-office updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "Scheduled",
            AppointmentStatus::Completed => "Completed",
            AppointmentStatus::Cancelled => "Cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<AppointmentStatus> {
        match value {
            "Scheduled" => Some(AppointmentStatus::Scheduled),
            "Completed" => Some(AppointmentStatus::Completed),
            "Cancelled" => Some(AppointmentStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A booked service appointment for one vehicle.
#[derive(Debug, Clone)]
pub struct Appointment {
    pub id: Uuid,
    pub vin: String,
    pub service_center: String,
    pub service_date: String,
    pub service_time: String,
    pub status: AppointmentStatus,
    pub cost: f64,
    pub created_at: DateTime<Utc>,
}

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderRole {
    Customer,
    Ai,
}

impl SenderRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SenderRole::Customer => "customer",
            SenderRole::Ai => "ai",
        }
    }

    pub fn parse(value: &str) -> Option<SenderRole> {
        match value {
            "customer" => Some(SenderRole::Customer),
            "ai" => Some(SenderRole::Ai),
            _ => None,
        }
    }
}

/// One entry in a vehicle's append-only chat log.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub id: Uuid,
    pub vin: String,
    pub sender_role: SenderRole,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// The closed set of actions the service writes to the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Login,
    Logout,
    ServiceBooked,
    AiChatResponse,
    AiNotificationSent,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Login => "LOGIN",
            AuditAction::Logout => "LOGOUT",
            AuditAction::ServiceBooked => "SERVICE_BOOKED",
            AuditAction::AiChatResponse => "AI_CHAT_RESPONSE",
            AuditAction::AiNotificationSent => "AI_NOTIFICATION_SENT",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the append-only audit trail. The action is kept as the
/// stored string on the read side so unknown historical actions survive
/// a round trip.
#[derive(Debug, Clone)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub user_role: Role,
    pub action: String,
    pub vin: Option<String>,
    pub timestamp: DateTime<Utc>,
}

// Represents a user account - used throughout the app. Accounts are
// provisioned out of band; there is no signup flow.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
    /// The vehicle a customer account is bound to. Admins have none.
    pub vin: Option<String>,
    pub email: Option<String>, // Optional because not every account has one
}

// Only used internally for login - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub vin: Option<String>,
}

// Represents a browser login session (auth cookie)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// The authorization context attached to every authenticated request.
///
/// Built by the session middleware and passed explicitly into handlers;
/// all vehicle scoping decisions go through it.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub role: Role,
    pub vin: Option<String>,
}

impl AuthContext {
    /// Whether this session may see the given vehicle. Admins see the
    /// whole fleet; customers only the VIN bound to their account.
    pub fn may_access(&self, vin: &str) -> bool {
        match self.role {
            Role::Admin => true,
            Role::Customer => self.vin.as_deref() == Some(vin),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
