//! services/api/src/adapters/chat_rules.rs
//!
//! This module contains the adapter for the maintenance chat assistant.
//! It implements the `ChatResponseService` port from the `core` crate.
//!
//! The assistant is a keyword dispatcher over a fixed, ordered rule table.
//! Matching is case-insensitive substring containment and the first matching
//! rule wins; replies are parameterized by the vehicle's current assessment.

use fleet_maintenance_core::domain::{RiskAssessment, AVERAGE_SERVICE_COST};
use fleet_maintenance_core::ports::ChatResponseService;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ChatResponseService` with the canned rule table.
#[derive(Debug, Clone, Default)]
pub struct KeywordChatAdapter;

impl KeywordChatAdapter {
    /// Creates a new `KeywordChatAdapter`.
    pub fn new() -> Self {
        Self
    }
}

//=========================================================================================
// `ChatResponseService` Trait Implementation
//=========================================================================================

impl ChatResponseService for KeywordChatAdapter {
    fn respond(&self, message: &str, assessment: &RiskAssessment) -> String {
        let normalized = message.to_lowercase();

        // Ordered rule table; first match wins.
        if normalized.contains("risk") {
            format!(
                "Our latest diagnostics put this vehicle at a {:.2}% failure probability, \
                 which classifies it as {} risk.",
                assessment.risk_score, assessment.risk
            )
        } else if normalized.contains("why") {
            "Risk ratings are driven by the vehicle's mileage, engine temperature and \
             recorded error codes. Elevated readings on any of those push the failure \
             probability up."
                .to_string()
        } else if normalized.contains("service") || normalized.contains("book") {
            "You can reserve a slot from this vehicle's scheduling page: pick a service \
             center, a date and a time, and the appointment will be confirmed by email."
                .to_string()
        } else if normalized.contains("cost") {
            format!(
                "A standard maintenance visit averages around {:.0}. The final amount \
                 depends on the work the service center finds necessary.",
                AVERAGE_SERVICE_COST
            )
        } else {
            "I can report this vehicle's risk rating, explain what drives it, help with \
             booking a maintenance appointment, or estimate costs. What would you like \
             to know?"
                .to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_maintenance_core::domain::RiskLevel;

    fn high_assessment() -> RiskAssessment {
        RiskAssessment {
            risk: RiskLevel::High,
            risk_score: 82.5,
        }
    }

    fn respond(message: &str) -> String {
        KeywordChatAdapter::new().respond(message, &high_assessment())
    }

    #[test]
    fn risk_question_reports_score_and_classification() {
        let reply = respond("What's my risk?");
        assert!(reply.contains("82.5"));
        assert!(reply.contains("High"));
    }

    #[test]
    fn matching_is_case_insensitive() {
        let reply = respond("TELL ME ABOUT THE RISK");
        assert!(reply.contains("82.5"));
    }

    #[test]
    fn why_question_explains_the_inputs() {
        let reply = respond("Why is it rated like that?");
        assert!(reply.contains("mileage"));
        assert!(reply.contains("engine temperature"));
        assert!(reply.contains("error codes"));
    }

    #[test]
    fn service_and_book_both_suggest_scheduling() {
        assert!(respond("How do I book?").contains("scheduling page"));
        assert!(respond("I need a service").contains("scheduling page"));
    }

    #[test]
    fn cost_question_quotes_the_average_estimate() {
        let reply = respond("How much will it cost?");
        assert!(reply.contains("4500"));
    }

    #[test]
    fn unmatched_message_gets_the_fallback() {
        let reply = respond("hello");
        assert!(reply.contains("What would you like to know?"));
    }

    #[test]
    fn earlier_rules_win_over_later_ones() {
        // Contains both "risk" and "cost": the risk rule is first.
        let reply = respond("What does my risk cost me?");
        assert!(reply.contains("82.5"));
        assert!(!reply.contains("4500"));
    }

    #[test]
    fn reply_is_deterministic() {
        assert_eq!(respond("what's my risk?"), respond("what's my risk?"));
    }
}
