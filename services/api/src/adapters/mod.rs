pub mod chat_rules;
pub mod db;
pub mod mailer;
pub mod risk_model;

pub use chat_rules::KeywordChatAdapter;
pub use db::PgAdapter;
pub use mailer::HttpMailerAdapter;
pub use risk_model::{LogisticRiskModel, ModelError};
