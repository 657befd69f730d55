//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use fleet_maintenance_core::ports::{
    ChatResponseService, DatabaseService, EmailService, RiskScoringService,
};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
///
/// Everything in here is read-only after startup; the risk model and rule
/// table are therefore safe for concurrent reads without further locking.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub risk_scorer: Arc<dyn RiskScoringService>,
    pub chat_responder: Arc<dyn ChatResponseService>,
    pub mailer: Arc<dyn EmailService>,
}
