//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fleet_maintenance_core::domain::{
    Appointment, AppointmentStatus, AuditAction, AuditLogEntry, ChatMessage, Role, SenderRole,
    User, UserCredentials, Vehicle,
};
use fleet_maintenance_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct PgAdapter {
    pool: PgPool,
}

impl PgAdapter {
    /// Creates a new `PgAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    username: String,
    role: String,
    vin: Option<String>,
    email: Option<String>,
}
impl UserRecord {
    fn to_domain(self) -> PortResult<User> {
        let role = Role::parse(&self.role)
            .ok_or_else(|| PortError::Unexpected(format!("Unknown role '{}'", self.role)))?;
        Ok(User {
            id: self.id,
            username: self.username,
            role,
            vin: self.vin,
            email: self.email,
        })
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    id: Uuid,
    username: String,
    password_hash: String,
    role: String,
    vin: Option<String>,
}
impl CredentialsRecord {
    fn to_domain(self) -> PortResult<UserCredentials> {
        let role = Role::parse(&self.role)
            .ok_or_else(|| PortError::Unexpected(format!("Unknown role '{}'", self.role)))?;
        Ok(UserCredentials {
            user_id: self.id,
            username: self.username,
            password_hash: self.password_hash,
            role,
            vin: self.vin,
        })
    }
}

// Sensor columns are nullable in storage; a missing reading scores as 0.
#[derive(FromRow)]
struct VehicleRecord {
    vin: String,
    age: Option<i32>,
    mileage: Option<i32>,
    engine_temp: Option<f64>,
    error_count: Option<i32>,
    notified: bool,
}
impl VehicleRecord {
    fn to_domain(self) -> Vehicle {
        Vehicle {
            vin: self.vin,
            age: self.age.unwrap_or(0),
            mileage: self.mileage.unwrap_or(0),
            engine_temp: self.engine_temp.unwrap_or(0.0),
            error_count: self.error_count.unwrap_or(0),
            notified: self.notified,
        }
    }
}

#[derive(FromRow)]
struct AppointmentRecord {
    id: Uuid,
    vin: String,
    service_center: String,
    service_date: String,
    service_time: String,
    status: String,
    cost: f64,
    created_at: DateTime<Utc>,
}
impl AppointmentRecord {
    fn to_domain(self) -> PortResult<Appointment> {
        let status = AppointmentStatus::parse(&self.status).ok_or_else(|| {
            PortError::Unexpected(format!("Unknown appointment status '{}'", self.status))
        })?;
        Ok(Appointment {
            id: self.id,
            vin: self.vin,
            service_center: self.service_center,
            service_date: self.service_date,
            service_time: self.service_time,
            status,
            cost: self.cost,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct ChatMessageRecord {
    id: Uuid,
    vin: String,
    sender_role: String,
    message: String,
    timestamp: DateTime<Utc>,
}
impl ChatMessageRecord {
    fn to_domain(self) -> PortResult<ChatMessage> {
        let sender_role = SenderRole::parse(&self.sender_role).ok_or_else(|| {
            PortError::Unexpected(format!("Unknown sender role '{}'", self.sender_role))
        })?;
        Ok(ChatMessage {
            id: self.id,
            vin: self.vin,
            sender_role,
            message: self.message,
            timestamp: self.timestamp,
        })
    }
}

#[derive(FromRow)]
struct AuditLogRecord {
    id: Uuid,
    user_role: String,
    action: String,
    vin: Option<String>,
    timestamp: DateTime<Utc>,
}
impl AuditLogRecord {
    fn to_domain(self) -> PortResult<AuditLogEntry> {
        let user_role = Role::parse(&self.user_role)
            .ok_or_else(|| PortError::Unexpected(format!("Unknown role '{}'", self.user_role)))?;
        Ok(AuditLogEntry {
            id: self.id,
            user_role,
            action: self.action,
            vin: self.vin,
            timestamp: self.timestamp,
        })
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for PgAdapter {
    async fn get_user_by_username(&self, username: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, username, password_hash, role, vin FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("User '{}' not found", username)))?;

        record.to_domain()
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, username, role, vin, email FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;

        record.to_domain()
    }

    async fn get_owner_of_vin(&self, vin: &str) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, username, role, vin, email FROM users \
             WHERE vin = $1 AND role = 'customer'",
        )
        .bind(vin)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("No owner on file for {}", vin)))?;

        record.to_domain()
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let row = sqlx::query_as::<_, (Uuid,)>(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > now()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound("Auth session not found".to_string()))?;

        Ok(row.0)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn list_vehicles(&self) -> PortResult<Vec<Vehicle>> {
        let records = sqlx::query_as::<_, VehicleRecord>(
            "SELECT vin, age, mileage, engine_temp, error_count, notified \
             FROM vehicles ORDER BY vin ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_vehicle(&self, vin: &str) -> PortResult<Vehicle> {
        let record = sqlx::query_as::<_, VehicleRecord>(
            "SELECT vin, age, mileage, engine_temp, error_count, notified \
             FROM vehicles WHERE vin = $1",
        )
        .bind(vin)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Vehicle {} not found", vin)))?;

        Ok(record.to_domain())
    }

    async fn create_appointment(
        &self,
        vin: &str,
        service_center: &str,
        service_date: &str,
        service_time: &str,
        cost: f64,
    ) -> PortResult<Appointment> {
        let record = sqlx::query_as::<_, AppointmentRecord>(
            "INSERT INTO service_appointments \
               (id, vin, service_center, service_date, service_time, status, cost) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id, vin, service_center, service_date, service_time, status, cost, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(vin)
        .bind(service_center)
        .bind(service_date)
        .bind(service_time)
        .bind(AppointmentStatus::Scheduled.as_str())
        .bind(cost)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        record.to_domain()
    }

    async fn list_appointments_for_vin(&self, vin: &str) -> PortResult<Vec<Appointment>> {
        let records = sqlx::query_as::<_, AppointmentRecord>(
            "SELECT id, vin, service_center, service_date, service_time, status, cost, created_at \
             FROM service_appointments WHERE vin = $1 ORDER BY created_at ASC",
        )
        .bind(vin)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn list_all_appointments(&self) -> PortResult<Vec<Appointment>> {
        let records = sqlx::query_as::<_, AppointmentRecord>(
            "SELECT id, vin, service_center, service_date, service_time, status, cost, created_at \
             FROM service_appointments ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn append_chat_message(
        &self,
        vin: &str,
        sender_role: SenderRole,
        message: &str,
    ) -> PortResult<ChatMessage> {
        let record = sqlx::query_as::<_, ChatMessageRecord>(
            "INSERT INTO chat_messages (id, vin, sender_role, message) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, vin, sender_role, message, timestamp",
        )
        .bind(Uuid::new_v4())
        .bind(vin)
        .bind(sender_role.as_str())
        .bind(message)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        record.to_domain()
    }

    async fn chat_history(&self, vin: &str) -> PortResult<Vec<ChatMessage>> {
        let records = sqlx::query_as::<_, ChatMessageRecord>(
            "SELECT id, vin, sender_role, message, timestamp \
             FROM chat_messages WHERE vin = $1 ORDER BY timestamp ASC",
        )
        .bind(vin)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn append_audit_entry(
        &self,
        user_role: Role,
        action: AuditAction,
        vin: Option<&str>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO audit_logs (id, user_role, action, vin) VALUES ($1, $2, $3, $4)")
            .bind(Uuid::new_v4())
            .bind(user_role.as_str())
            .bind(action.as_str())
            .bind(vin)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn list_audit_entries(&self) -> PortResult<Vec<AuditLogEntry>> {
        let records = sqlx::query_as::<_, AuditLogRecord>(
            "SELECT id, user_role, action, vin, timestamp \
             FROM audit_logs ORDER BY timestamp DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn record_ai_notification(&self, vin: &str, alert_message: &str) -> PortResult<bool> {
        // The whole sequence is one transaction so a reader can never see
        // `notified` set without the alert message being visible.
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let row = sqlx::query_as::<_, (bool,)>(
            "SELECT notified FROM vehicles WHERE vin = $1 FOR UPDATE",
        )
        .bind(vin)
        .fetch_optional(&mut *tx)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Vehicle {} not found", vin)))?;

        if row.0 {
            // Already notified: idempotent no-op.
            tx.rollback().await.map_err(unexpected)?;
            return Ok(false);
        }

        sqlx::query(
            "INSERT INTO chat_messages (id, vin, sender_role, message) VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(vin)
        .bind(SenderRole::Ai.as_str())
        .bind(alert_message)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        sqlx::query("UPDATE vehicles SET notified = TRUE WHERE vin = $1")
            .bind(vin)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        sqlx::query("INSERT INTO audit_logs (id, user_role, action, vin) VALUES ($1, $2, $3, $4)")
            .bind(Uuid::new_v4())
            .bind(Role::Admin.as_str())
            .bind(AuditAction::AiNotificationSent.as_str())
            .bind(vin)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        Ok(true)
    }
}
