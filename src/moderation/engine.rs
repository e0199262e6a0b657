/// Moderation state machine
///
/// All transitions out of `pending` flow through here: the role gate, the
/// per-kind state vocabulary, the mandatory-reason rule, the atomic
/// state-change-plus-audit write, and the stateChanged emission. The engine
/// holds no in-memory state across requests; per-entity mutual exclusion
/// comes from the store's conditional update inside one transaction, so of
/// two concurrent attempts exactly one commits and the loser surfaces
/// `AlreadyFinalized`.
use crate::error::{DirectoryError, DirectoryResult};
use crate::geo::proximity::{NearbyEntity, ProximityIndex};
use crate::geo::GeoPoint;
use crate::metrics;
use crate::moderation::audit::{AuditEntry, AuditStore, ModerationStats};
use crate::moderation::entity::{EntityState, EntityStore, ModeratedEntity};
use crate::moderation::roles::{self, Role};
use crate::notify::{ChangeNotifier, StateChangedEvent};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{info, warn};

/// The authenticated caller attempting a transition
///
/// Always taken from the request's authentication context, never from the
/// request body.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: String,
    pub role: Option<Role>,
}

/// Non-blocking warning attached to an approval near existing entries
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateWarning {
    pub radius_km: f64,
    pub nearby: Vec<NearbyEntity>,
}

/// Result of a successful transition
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionOutcome {
    pub entity: ModeratedEntity,
    pub audit: AuditEntry,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_warning: Option<DuplicateWarning>,
}

/// Reporting window for moderation statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsPeriod {
    Day,
    Week,
    Month,
}

impl StatsPeriod {
    pub fn from_str(s: &str) -> DirectoryResult<Self> {
        match s.to_lowercase().as_str() {
            "day" => Ok(StatsPeriod::Day),
            "week" => Ok(StatsPeriod::Week),
            "month" => Ok(StatsPeriod::Month),
            _ => Err(DirectoryError::Validation(format!(
                "Invalid stats period: {}",
                s
            ))),
        }
    }

    fn duration(&self) -> Duration {
        match self {
            StatsPeriod::Day => Duration::days(1),
            StatsPeriod::Week => Duration::weeks(1),
            StatsPeriod::Month => Duration::days(30),
        }
    }
}

/// Moderation engine
#[derive(Clone)]
pub struct ModerationEngine {
    entities: EntityStore,
    audit: AuditStore,
    proximity: ProximityIndex,
    notifier: ChangeNotifier,
    min_reason_length: usize,
    duplicate_radius_km: f64,
}

impl ModerationEngine {
    pub fn new(
        entities: EntityStore,
        audit: AuditStore,
        proximity: ProximityIndex,
        notifier: ChangeNotifier,
        min_reason_length: usize,
        duplicate_radius_km: f64,
    ) -> Self {
        Self {
            entities,
            audit,
            proximity,
            notifier,
            min_reason_length,
            duplicate_radius_km,
        }
    }

    /// Transition an entity out of `pending`
    pub async fn transition(
        &self,
        entity_id: &str,
        target: EntityState,
        actor: &Actor,
        reason: Option<&str>,
    ) -> DirectoryResult<TransitionOutcome> {
        roles::authorize(actor.role, Role::Moderator).require("Moderation transitions")?;
        // The gate guarantees a role is present
        let actor_role = actor
            .role
            .ok_or_else(|| DirectoryError::Internal("role gate passed without a role".to_string()))?;

        let entity = self
            .entities
            .get(entity_id)
            .await?
            .ok_or_else(|| DirectoryError::NotFound(format!("Entity {} not found", entity_id)))?;

        if !entity.kind.allowed_targets().contains(&target) {
            return Err(DirectoryError::Validation(format!(
                "{} cannot transition to {}",
                entity.kind.as_str(),
                target.as_str()
            )));
        }

        if target == EntityState::Rejected {
            let trimmed = reason.map(str::trim).unwrap_or("");
            if trimmed.len() < self.min_reason_length {
                return Err(DirectoryError::InvalidReason(format!(
                    "Rejection reason must be at least {} characters",
                    self.min_reason_length
                )));
            }
        }

        if entity.state.is_terminal() {
            return Err(DirectoryError::AlreadyFinalized(format!(
                "Entity {} is already {}",
                entity_id,
                entity.state.as_str()
            )));
        }

        // Flag (never block) approvals landing next to already-approved
        // entries; computed against the pre-commit approved set so the
        // entity never flags itself
        let duplicate_warning = if target == EntityState::Approved {
            self.check_duplicates(&entity).await?
        } else {
            None
        };

        let previous_state = entity.state;
        let now = Utc::now();

        // The state change and its audit entry commit or roll back together
        let mut tx = self.entities.pool().begin().await?;

        let rows = self
            .entities
            .finalize_pending(&mut *tx, entity_id, target, &actor.id, now, reason)
            .await?;

        if rows == 0 {
            drop(tx);
            // Lost a race: re-read to report what actually happened
            let current = self.entities.get(entity_id).await?.ok_or_else(|| {
                DirectoryError::NotFound(format!("Entity {} not found", entity_id))
            })?;
            warn!(
                entity_id,
                state = current.state.as_str(),
                "Transition lost conditional update race"
            );
            return Err(DirectoryError::AlreadyFinalized(format!(
                "Entity {} is already {}",
                entity_id,
                current.state.as_str()
            )));
        }

        let audit_entry = self
            .audit
            .append(
                &mut *tx,
                entity_id,
                entity.kind,
                previous_state,
                target,
                &actor.id,
                actor_role,
                reason,
                now,
            )
            .await?;

        tx.commit().await?;

        let updated = ModeratedEntity {
            state: target,
            reviewed_by: Some(actor.id.clone()),
            reviewed_at: Some(now),
            review_comment: reason.map(String::from),
            ..entity
        };

        info!(
            entity_id,
            kind = updated.kind.as_str(),
            previous = previous_state.as_str(),
            new = target.as_str(),
            actor = %actor.id,
            "Moderation transition"
        );
        metrics::record_transition(updated.kind.as_str(), target.as_str());

        self.notifier.emit(StateChangedEvent {
            entity_kind: updated.kind,
            entity_id: updated.id.clone(),
            previous_state,
            new_state: target,
            actor_id: actor.id.clone(),
        });

        Ok(TransitionOutcome {
            entity: updated,
            audit: audit_entry,
            duplicate_warning,
        })
    }

    async fn check_duplicates(
        &self,
        entity: &ModeratedEntity,
    ) -> DirectoryResult<Option<DuplicateWarning>> {
        let (Some(lat), Some(lng)) = (entity.latitude, entity.longitude) else {
            return Ok(None);
        };

        let point = GeoPoint::new(lat, lng)?;
        let nearby = self
            .proximity
            .near_duplicates(&point, self.duplicate_radius_km)
            .await?;

        if nearby.is_empty() {
            return Ok(None);
        }

        warn!(
            entity_id = %entity.id,
            count = nearby.len(),
            "Approval near existing entries"
        );

        Ok(Some(DuplicateWarning {
            radius_km: self.duplicate_radius_km,
            nearby,
        }))
    }

    /// Audit trail for one entity, in append order
    pub async fn history(&self, entity_id: &str) -> DirectoryResult<Vec<AuditEntry>> {
        // 404 for unknown ids instead of an empty history
        if self.entities.get(entity_id).await?.is_none() {
            return Err(DirectoryError::NotFound(format!(
                "Entity {} not found",
                entity_id
            )));
        }

        self.audit.history(entity_id).await
    }

    /// Transition counts for a trailing window, projected from the audit log
    pub async fn stats(&self, period: StatsPeriod) -> DirectoryResult<ModerationStats> {
        let to = Utc::now();
        let from = to - period.duration();
        self.stats_between(from, to).await
    }

    pub async fn stats_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DirectoryResult<ModerationStats> {
        self.audit.stats_between(from, to).await
    }
}
