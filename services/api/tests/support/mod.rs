//! services/api/tests/support/mod.rs
//!
//! In-memory fake implementations of the service ports, so the handler
//! tests can drive the real web layer without a database or mail relay.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fleet_maintenance_core::domain::{
    Appointment, AppointmentStatus, AuditAction, AuditLogEntry, AuthContext, ChatMessage, Role,
    SenderRole, User, UserCredentials, Vehicle,
};
use fleet_maintenance_core::ports::{DatabaseService, EmailService, PortError, PortResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use api_lib::adapters::{KeywordChatAdapter, LogisticRiskModel};
use api_lib::config::Config;
use api_lib::web::state::AppState;

//=========================================================================================
// Fake Database
//=========================================================================================

#[derive(Clone)]
pub struct FakeUser {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub vin: Option<String>,
    pub email: Option<String>,
}

#[derive(Default)]
struct Inner {
    users: Vec<FakeUser>,
    sessions: HashMap<String, (Uuid, DateTime<Utc>)>,
    vehicles: HashMap<String, Vehicle>,
    appointments: Vec<Appointment>,
    chat: Vec<ChatMessage>,
    audit: Vec<AuditLogEntry>,
}

/// A scripted, in-memory stand-in for the Postgres adapter.
#[derive(Default)]
pub struct FakeDb {
    inner: Mutex<Inner>,
}

impl FakeDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_user(&self, user: FakeUser) {
        self.inner.lock().unwrap().users.push(user);
    }

    pub fn seed_vehicle(&self, vehicle: Vehicle) {
        self.inner
            .lock()
            .unwrap()
            .vehicles
            .insert(vehicle.vin.clone(), vehicle);
    }

    pub fn audit_actions(&self) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .audit
            .iter()
            .map(|e| e.action.clone())
            .collect()
    }

    pub fn session_count(&self) -> usize {
        self.inner.lock().unwrap().sessions.len()
    }
}

fn user_to_domain(u: &FakeUser) -> User {
    User {
        id: u.id,
        username: u.username.clone(),
        role: u.role,
        vin: u.vin.clone(),
        email: u.email.clone(),
    }
}

#[async_trait]
impl DatabaseService for FakeDb {
    async fn get_user_by_username(&self, username: &str) -> PortResult<UserCredentials> {
        let inner = self.inner.lock().unwrap();
        inner
            .users
            .iter()
            .find(|u| u.username == username)
            .map(|u| UserCredentials {
                user_id: u.id,
                username: u.username.clone(),
                password_hash: u.password_hash.clone(),
                role: u.role,
                vin: u.vin.clone(),
            })
            .ok_or_else(|| PortError::NotFound(format!("User '{}' not found", username)))
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let inner = self.inner.lock().unwrap();
        inner
            .users
            .iter()
            .find(|u| u.id == user_id)
            .map(user_to_domain)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn get_owner_of_vin(&self, vin: &str) -> PortResult<User> {
        let inner = self.inner.lock().unwrap();
        inner
            .users
            .iter()
            .find(|u| u.role == Role::Customer && u.vin.as_deref() == Some(vin))
            .map(user_to_domain)
            .ok_or_else(|| PortError::NotFound(format!("No owner on file for {}", vin)))
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.inner
            .lock()
            .unwrap()
            .sessions
            .insert(session_id.to_string(), (user_id, expires_at));
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let inner = self.inner.lock().unwrap();
        inner
            .sessions
            .get(session_id)
            .filter(|(_, expires_at)| *expires_at > Utc::now())
            .map(|(user_id, _)| *user_id)
            .ok_or_else(|| PortError::NotFound("Auth session not found".to_string()))
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.inner.lock().unwrap().sessions.remove(session_id);
        Ok(())
    }

    async fn list_vehicles(&self) -> PortResult<Vec<Vehicle>> {
        let inner = self.inner.lock().unwrap();
        let mut vehicles: Vec<Vehicle> = inner.vehicles.values().cloned().collect();
        vehicles.sort_by(|a, b| a.vin.cmp(&b.vin));
        Ok(vehicles)
    }

    async fn get_vehicle(&self, vin: &str) -> PortResult<Vehicle> {
        let inner = self.inner.lock().unwrap();
        inner
            .vehicles
            .get(vin)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Vehicle {} not found", vin)))
    }

    async fn create_appointment(
        &self,
        vin: &str,
        service_center: &str,
        service_date: &str,
        service_time: &str,
        cost: f64,
    ) -> PortResult<Appointment> {
        let appointment = Appointment {
            id: Uuid::new_v4(),
            vin: vin.to_string(),
            service_center: service_center.to_string(),
            service_date: service_date.to_string(),
            service_time: service_time.to_string(),
            status: AppointmentStatus::Scheduled,
            cost,
            created_at: Utc::now(),
        };
        self.inner
            .lock()
            .unwrap()
            .appointments
            .push(appointment.clone());
        Ok(appointment)
    }

    async fn list_appointments_for_vin(&self, vin: &str) -> PortResult<Vec<Appointment>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .appointments
            .iter()
            .filter(|a| a.vin == vin)
            .cloned()
            .collect())
    }

    async fn list_all_appointments(&self) -> PortResult<Vec<Appointment>> {
        Ok(self.inner.lock().unwrap().appointments.clone())
    }

    async fn append_chat_message(
        &self,
        vin: &str,
        sender_role: SenderRole,
        message: &str,
    ) -> PortResult<ChatMessage> {
        let entry = ChatMessage {
            id: Uuid::new_v4(),
            vin: vin.to_string(),
            sender_role,
            message: message.to_string(),
            timestamp: Utc::now(),
        };
        self.inner.lock().unwrap().chat.push(entry.clone());
        Ok(entry)
    }

    async fn chat_history(&self, vin: &str) -> PortResult<Vec<ChatMessage>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .chat
            .iter()
            .filter(|m| m.vin == vin)
            .cloned()
            .collect())
    }

    async fn append_audit_entry(
        &self,
        user_role: Role,
        action: AuditAction,
        vin: Option<&str>,
    ) -> PortResult<()> {
        let entry = AuditLogEntry {
            id: Uuid::new_v4(),
            user_role,
            action: action.as_str().to_string(),
            vin: vin.map(str::to_string),
            timestamp: Utc::now(),
        };
        self.inner.lock().unwrap().audit.push(entry);
        Ok(())
    }

    async fn list_audit_entries(&self) -> PortResult<Vec<AuditLogEntry>> {
        let inner = self.inner.lock().unwrap();
        let mut entries = inner.audit.clone();
        entries.reverse();
        Ok(entries)
    }

    async fn record_ai_notification(&self, vin: &str, alert_message: &str) -> PortResult<bool> {
        let mut inner = self.inner.lock().unwrap();

        let vehicle = inner
            .vehicles
            .get(vin)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Vehicle {} not found", vin)))?;
        if vehicle.notified {
            return Ok(false);
        }

        inner.chat.push(ChatMessage {
            id: Uuid::new_v4(),
            vin: vin.to_string(),
            sender_role: SenderRole::Ai,
            message: alert_message.to_string(),
            timestamp: Utc::now(),
        });
        inner.vehicles.get_mut(vin).unwrap().notified = true;
        inner.audit.push(AuditLogEntry {
            id: Uuid::new_v4(),
            user_role: Role::Admin,
            action: AuditAction::AiNotificationSent.as_str().to_string(),
            vin: Some(vin.to_string()),
            timestamp: Utc::now(),
        });
        Ok(true)
    }
}

//=========================================================================================
// Spy Mailer
//=========================================================================================

/// Records every confirmation send instead of talking to a relay.
#[derive(Default)]
pub struct SpyMailer {
    sent: Mutex<Vec<(String, String)>>,
}

impl SpyMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The (recipient, vin) pairs of every send so far.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailService for SpyMailer {
    async fn send_booking_confirmation(
        &self,
        recipient: &str,
        appointment: &Appointment,
    ) -> PortResult<()> {
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), appointment.vin.clone()));
        Ok(())
    }
}

//=========================================================================================
// State and Fixture Builders
//=========================================================================================

fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: "postgres://unused".to_string(),
        log_level: tracing::Level::INFO,
        model_path: "./risk_model.json".into(),
        risk_threshold: 0.6,
        mail_relay_url: None,
        mail_from: "no-reply@fleet-maintenance.local".to_string(),
        cors_origin: "http://localhost:3000".to_string(),
    }
}

/// Builds an `AppState` over the fakes, with the real risk model and rule
/// table in place.
pub fn test_state(db: Arc<FakeDb>, mailer: Arc<SpyMailer>) -> Arc<AppState> {
    Arc::new(AppState {
        db,
        config: Arc::new(test_config()),
        risk_scorer: Arc::new(LogisticRiskModel::new(
            [0.12, 0.000021, 0.045, 0.68],
            -9.0,
            0.6,
        )),
        chat_responder: Arc::new(KeywordChatAdapter::new()),
        mailer,
    })
}

pub fn admin_ctx() -> AuthContext {
    AuthContext {
        user_id: Uuid::new_v4(),
        role: Role::Admin,
        vin: None,
    }
}

pub fn customer_ctx(vin: &str) -> AuthContext {
    AuthContext {
        user_id: Uuid::new_v4(),
        role: Role::Customer,
        vin: Some(vin.to_string()),
    }
}

/// A worn vehicle the sample model classifies High.
pub fn high_risk_vehicle(vin: &str) -> Vehicle {
    Vehicle {
        vin: vin.to_string(),
        age: 10,
        mileage: 150_000,
        engine_temp: 110.0,
        error_count: 8,
        notified: false,
    }
}

/// A healthy vehicle the sample model classifies Low.
pub fn low_risk_vehicle(vin: &str) -> Vehicle {
    Vehicle {
        vin: vin.to_string(),
        age: 2,
        mileage: 20_000,
        engine_temp: 85.0,
        error_count: 0,
        notified: false,
    }
}
