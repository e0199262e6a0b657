/// Moderation audit trail
///
/// Append-only: entries are written in the same transaction as the state
/// change they record and never touched again. Aggregate statistics are a
/// read-side projection over this log; there are no separate counters to
/// drift out of sync.
use crate::error::{DirectoryError, DirectoryResult};
use crate::moderation::entity::{EntityKind, EntityState};
use crate::moderation::roles::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

/// One immutable record of a state transition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: i64,
    pub entity_id: String,
    pub entity_kind: EntityKind,
    pub previous_state: EntityState,
    pub new_state: EntityState,
    pub actor_id: String,
    pub actor_role: Role,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Aggregate transition counts over a time window
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationStats {
    pub approved: i64,
    pub rejected: i64,
    pub reviewed: i64,
    pub dismissed: i64,
    pub total: i64,
}

/// Audit store
#[derive(Clone)]
pub struct AuditStore {
    db: SqlitePool,
}

impl AuditStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Append one entry inside a caller-owned transaction
    ///
    /// Runs on the same connection as the entity update so the state change
    /// and its audit record commit or roll back together.
    #[allow(clippy::too_many_arguments)]
    pub async fn append(
        &self,
        conn: &mut sqlx::SqliteConnection,
        entity_id: &str,
        entity_kind: EntityKind,
        previous_state: EntityState,
        new_state: EntityState,
        actor_id: &str,
        actor_role: Role,
        reason: Option<&str>,
        created_at: DateTime<Utc>,
    ) -> DirectoryResult<AuditEntry> {
        let result = sqlx::query(
            r#"
            INSERT INTO moderation_audit
            (entity_id, entity_kind, previous_state, new_state, actor_id, actor_role, reason, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entity_id)
        .bind(entity_kind.as_str())
        .bind(previous_state.as_str())
        .bind(new_state.as_str())
        .bind(actor_id)
        .bind(actor_role.as_str())
        .bind(reason)
        .bind(created_at.to_rfc3339())
        .execute(conn)
        .await?;

        Ok(AuditEntry {
            id: result.last_insert_rowid(),
            entity_id: entity_id.to_string(),
            entity_kind,
            previous_state,
            new_state,
            actor_id: actor_id.to_string(),
            actor_role,
            reason: reason.map(String::from),
            created_at,
        })
    }

    /// Ordered transition history for one entity
    pub async fn history(&self, entity_id: &str) -> DirectoryResult<Vec<AuditEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, entity_id, entity_kind, previous_state, new_state,
                   actor_id, actor_role, reason, created_at
            FROM moderation_audit
            WHERE entity_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(entity_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(parse_audit_entry).collect()
    }

    /// Transition counts between two instants, grouped by target state
    pub async fn stats_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DirectoryResult<ModerationStats> {
        let rows = sqlx::query(
            r#"
            SELECT new_state, COUNT(*) AS transitions
            FROM moderation_audit
            WHERE created_at >= ? AND created_at < ?
            GROUP BY new_state
            "#,
        )
        .bind(from.to_rfc3339())
        .bind(to.to_rfc3339())
        .fetch_all(&self.db)
        .await?;

        let mut stats = ModerationStats::default();
        for row in rows {
            let state_str: String = row.get("new_state");
            let count: i64 = row.get("transitions");

            match EntityState::from_str(&state_str)? {
                EntityState::Approved => stats.approved = count,
                EntityState::Rejected => stats.rejected = count,
                EntityState::Reviewed => stats.reviewed = count,
                EntityState::Dismissed => stats.dismissed = count,
                EntityState::Pending => {}
            }
            stats.total += count;
        }

        Ok(stats)
    }

}

fn parse_audit_entry(row: sqlx::sqlite::SqliteRow) -> DirectoryResult<AuditEntry> {
    let kind_str: String = row.get("entity_kind");
    let previous_str: String = row.get("previous_state");
    let new_str: String = row.get("new_state");
    let role_str: String = row.get("actor_role");

    let created_at_str: String = row.get("created_at");
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map_err(|e| DirectoryError::Internal(format!("Invalid timestamp: {}", e)))?
        .with_timezone(&Utc);

    Ok(AuditEntry {
        id: row.get("id"),
        entity_id: row.get("entity_id"),
        entity_kind: EntityKind::from_str(&kind_str)?,
        previous_state: EntityState::from_str(&previous_str)?,
        new_state: EntityState::from_str(&new_str)?,
        actor_id: row.get("actor_id"),
        actor_role: Role::from_str(&role_str)?,
        reason: row.get("reason"),
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moderation::entity::test_support::test_db;
    use chrono::Duration;

    async fn append_one(
        store: &AuditStore,
        db: &SqlitePool,
        entity_id: &str,
        new_state: EntityState,
        at: DateTime<Utc>,
    ) -> AuditEntry {
        let mut conn = db.acquire().await.unwrap();
        store
            .append(
                &mut conn,
                entity_id,
                EntityKind::PoiSubmission,
                EntityState::Pending,
                new_state,
                "mod-1",
                Role::Moderator,
                None,
                at,
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_history_in_append_order() {
        let db = test_db().await;
        let store = AuditStore::new(db.clone());
        let now = Utc::now();

        append_one(&store, &db, "e-1", EntityState::Approved, now).await;
        append_one(&store, &db, "e-2", EntityState::Rejected, now).await;

        let history = store.history("e-1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].entity_id, "e-1");
        assert_eq!(history[0].previous_state, EntityState::Pending);
        assert_eq!(history[0].new_state, EntityState::Approved);
        assert_eq!(history[0].actor_id, "mod-1");
        assert_eq!(history[0].actor_role, Role::Moderator);
    }

    #[tokio::test]
    async fn test_stats_projection_respects_window() {
        let db = test_db().await;
        let store = AuditStore::new(db.clone());
        let now = Utc::now();

        append_one(&store, &db, "e-1", EntityState::Approved, now).await;
        append_one(&store, &db, "e-2", EntityState::Approved, now).await;
        append_one(&store, &db, "e-3", EntityState::Rejected, now).await;
        append_one(&store, &db, "e-4", EntityState::Reviewed, now).await;
        // Outside the window
        append_one(
            &store,
            &db,
            "e-5",
            EntityState::Dismissed,
            now - Duration::days(40),
        )
        .await;

        let stats = store
            .stats_between(now - Duration::days(7), now + Duration::seconds(1))
            .await
            .unwrap();

        assert_eq!(stats.approved, 2);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.reviewed, 1);
        assert_eq!(stats.dismissed, 0);
        assert_eq!(stats.total, 4);

        let wide = store
            .stats_between(now - Duration::days(60), now + Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(wide.dismissed, 1);
        assert_eq!(wide.total, 5);
    }
}
