/// Moderation subsystem
///
/// Role gate, moderatable entities, the transition engine, and the audit
/// trail it writes.
pub mod audit;
pub mod engine;
pub mod entity;
pub mod roles;

pub use audit::{AuditEntry, AuditStore, ModerationStats};
pub use engine::{Actor, DuplicateWarning, ModerationEngine, StatsPeriod, TransitionOutcome};
pub use entity::{EntityKind, EntityState, EntityStore, ModeratedEntity, NewEntity};
pub use roles::{authorize, authorize_any, Access, Role};
