//! services/api/src/adapters/mailer.rs
//!
//! This module contains the adapter for the booking-confirmation mailer.
//! It implements the `EmailService` port from the `core` crate by handing the
//! message to an HTTP mail relay. Delivery is fire-and-forget: one request,
//! no retry or backoff.

use async_trait::async_trait;
use fleet_maintenance_core::domain::Appointment;
use fleet_maintenance_core::ports::{EmailService, PortError, PortResult};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `EmailService` port against an HTTP mail relay.
#[derive(Clone)]
pub struct HttpMailerAdapter {
    client: reqwest::Client,
    relay_url: String,
    from: String,
}

impl HttpMailerAdapter {
    /// Creates a new `HttpMailerAdapter`.
    pub fn new(relay_url: String, from: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            relay_url,
            from,
        }
    }
}

//=========================================================================================
// `EmailService` Trait Implementation
//=========================================================================================

#[async_trait]
impl EmailService for HttpMailerAdapter {
    async fn send_booking_confirmation(
        &self,
        recipient: &str,
        appointment: &Appointment,
    ) -> PortResult<()> {
        let body = format!(
            "Your service appointment for vehicle {} is confirmed.\n\n\
             Service center: {}\n\
             Date: {} at {}\n\
             Estimated cost: {:.2}\n\
             Status: {}\n",
            appointment.vin,
            appointment.service_center,
            appointment.service_date,
            appointment.service_time,
            appointment.cost,
            appointment.status
        );

        let payload = serde_json::json!({
            "from": self.from,
            "to": recipient,
            "subject": format!("Service appointment confirmed for {}", appointment.vin),
            "text": body,
        });

        let response = self
            .client
            .post(&self.relay_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("Mail relay unreachable: {}", e)))?;

        if !response.status().is_success() {
            return Err(PortError::Unexpected(format!(
                "Mail relay rejected the message with status {}",
                response.status()
            )));
        }

        Ok(())
    }
}
