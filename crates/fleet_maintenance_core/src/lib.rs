pub mod domain;
pub mod ports;

pub use domain::{
    Appointment, AppointmentStatus, AuditAction, AuditLogEntry, AuthContext, AuthSession,
    ChatMessage, RiskAssessment, RiskLevel, Role, SenderRole, User, UserCredentials, Vehicle,
    VehicleFeatures,
};
pub use ports::{
    ChatResponseService, DatabaseService, EmailService, PortError, PortResult, RiskScoringService,
};
