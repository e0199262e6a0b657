/// Moderatable entities and their store
///
/// POI submissions and comment reports share one moderation shape: a tagged
/// kind plus a per-kind vocabulary of terminal states. The state machine
/// itself lives in the engine; this module owns the rows.
use crate::error::{DirectoryError, DirectoryResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Kind of record subject to moderation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    PoiSubmission,
    CommentReport,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::PoiSubmission => "poi_submission",
            EntityKind::CommentReport => "comment_report",
        }
    }

    pub fn from_str(s: &str) -> DirectoryResult<Self> {
        match s.to_lowercase().as_str() {
            "poi_submission" => Ok(EntityKind::PoiSubmission),
            "comment_report" => Ok(EntityKind::CommentReport),
            _ => Err(DirectoryError::Validation(format!(
                "Invalid entity kind: {}",
                s
            ))),
        }
    }

    /// Terminal states this kind may transition into
    pub fn allowed_targets(&self) -> &'static [EntityState] {
        match self {
            EntityKind::PoiSubmission => &[EntityState::Approved, EntityState::Rejected],
            EntityKind::CommentReport => &[EntityState::Reviewed, EntityState::Dismissed],
        }
    }
}

/// Moderation state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityState {
    Pending,
    Approved,
    Rejected,
    Reviewed,
    Dismissed,
}

impl EntityState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityState::Pending => "pending",
            EntityState::Approved => "approved",
            EntityState::Rejected => "rejected",
            EntityState::Reviewed => "reviewed",
            EntityState::Dismissed => "dismissed",
        }
    }

    pub fn from_str(s: &str) -> DirectoryResult<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(EntityState::Pending),
            "approved" => Ok(EntityState::Approved),
            "rejected" => Ok(EntityState::Rejected),
            "reviewed" => Ok(EntityState::Reviewed),
            "dismissed" => Ok(EntityState::Dismissed),
            _ => Err(DirectoryError::Validation(format!(
                "Invalid entity state: {}",
                s
            ))),
        }
    }

    /// Every state except `pending` is terminal
    pub fn is_terminal(&self) -> bool {
        !matches!(self, EntityState::Pending)
    }
}

/// One moderatable record
///
/// POI rows carry coordinates; comment-report rows point at the offending
/// comment through `subject_ref` and leave the geo columns empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeratedEntity {
    pub id: String,
    pub kind: EntityKind,
    pub state: EntityState,
    pub name: String,
    pub description: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub category: Option<String>,
    pub subject_ref: Option<String>,
    pub submitted_by: String,
    pub created_at: DateTime<Utc>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_comment: Option<String>,
}

/// Fields for creating a new entity; everything starts out `pending`
#[derive(Debug, Clone)]
pub struct NewEntity {
    pub kind: EntityKind,
    pub name: String,
    pub description: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub category: Option<String>,
    pub subject_ref: Option<String>,
    pub submitted_by: String,
}

/// Entity store
#[derive(Clone)]
pub struct EntityStore {
    db: SqlitePool,
}

impl EntityStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db
    }

    /// Insert a new pending entity
    pub async fn create(&self, new: NewEntity) -> DirectoryResult<ModeratedEntity> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO moderated_entity
            (id, kind, state, name, description, address, latitude, longitude,
             category, subject_ref, submitted_by, created_at)
            VALUES (?, ?, 'pending', ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(new.kind.as_str())
        .bind(&new.name)
        .bind(&new.description)
        .bind(&new.address)
        .bind(new.latitude)
        .bind(new.longitude)
        .bind(&new.category)
        .bind(&new.subject_ref)
        .bind(&new.submitted_by)
        .bind(now.to_rfc3339())
        .execute(&self.db)
        .await?;

        Ok(ModeratedEntity {
            id,
            kind: new.kind,
            state: EntityState::Pending,
            name: new.name,
            description: new.description,
            address: new.address,
            latitude: new.latitude,
            longitude: new.longitude,
            category: new.category,
            subject_ref: new.subject_ref,
            submitted_by: new.submitted_by,
            created_at: now,
            reviewed_by: None,
            reviewed_at: None,
            review_comment: None,
        })
    }

    /// Get entity by id
    pub async fn get(&self, id: &str) -> DirectoryResult<Option<ModeratedEntity>> {
        let row = sqlx::query(
            r#"
            SELECT id, kind, state, name, description, address, latitude, longitude,
                   category, subject_ref, submitted_by, created_at,
                   reviewed_by, reviewed_at, review_comment
            FROM moderated_entity
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        row.map(parse_entity).transpose()
    }

    /// List pending entities, oldest first
    pub async fn list_pending(
        &self,
        page: i64,
        limit: i64,
    ) -> DirectoryResult<Vec<ModeratedEntity>> {
        let limit = limit.clamp(1, 100);
        let offset = (page.max(1) - 1) * limit;

        let rows = sqlx::query(
            r#"
            SELECT id, kind, state, name, description, address, latitude, longitude,
                   category, subject_ref, submitted_by, created_at,
                   reviewed_by, reviewed_at, review_comment
            FROM moderated_entity
            WHERE state = 'pending'
            ORDER BY created_at ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(parse_entity).collect()
    }

    /// Count pending entities
    pub async fn count_pending(&self) -> DirectoryResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM moderated_entity WHERE state = 'pending'")
                .fetch_one(&self.db)
                .await?;

        Ok(count)
    }

    /// Conditionally finalize an entity inside a caller-owned transaction
    ///
    /// Writes the terminal state only if the row is still `pending`. The
    /// returned row count is the concurrency arbiter: a competing
    /// transition that already committed leaves nothing to update here.
    pub async fn finalize_pending(
        &self,
        conn: &mut sqlx::SqliteConnection,
        id: &str,
        target: EntityState,
        reviewed_by: &str,
        reviewed_at: DateTime<Utc>,
        review_comment: Option<&str>,
    ) -> DirectoryResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE moderated_entity
            SET state = ?,
                reviewed_by = ?,
                reviewed_at = ?,
                review_comment = ?
            WHERE id = ? AND state = 'pending'
            "#,
        )
        .bind(target.as_str())
        .bind(reviewed_by)
        .bind(reviewed_at.to_rfc3339())
        .bind(review_comment)
        .bind(id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }
}

/// Parse a database row into a ModeratedEntity
pub(crate) fn parse_entity(row: sqlx::sqlite::SqliteRow) -> DirectoryResult<ModeratedEntity> {
    let kind_str: String = row.get("kind");
    let kind = EntityKind::from_str(&kind_str)?;

    let state_str: String = row.get("state");
    let state = EntityState::from_str(&state_str)?;

    let created_at_str: String = row.get("created_at");
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map_err(|e| DirectoryError::Internal(format!("Invalid timestamp: {}", e)))?
        .with_timezone(&Utc);

    let reviewed_at = row
        .try_get::<String, _>("reviewed_at")
        .ok()
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    Ok(ModeratedEntity {
        id: row.get("id"),
        kind,
        state,
        name: row.get("name"),
        description: row.get("description"),
        address: row.get("address"),
        latitude: row.get("latitude"),
        longitude: row.get("longitude"),
        category: row.get("category"),
        subject_ref: row.get("subject_ref"),
        submitted_by: row.get("submitted_by"),
        created_at,
        reviewed_by: row.get("reviewed_by"),
        reviewed_at,
        review_comment: row.get("review_comment"),
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use sqlx::SqlitePool;

    /// In-memory database with the directory schema
    pub async fn test_db() -> SqlitePool {
        let db = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap();

        sqlx::query(
            r#"
            CREATE TABLE moderated_entity (
                id TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                state TEXT NOT NULL DEFAULT 'pending',
                name TEXT NOT NULL,
                description TEXT,
                address TEXT,
                latitude REAL,
                longitude REAL,
                category TEXT,
                subject_ref TEXT,
                submitted_by TEXT NOT NULL,
                created_at TEXT NOT NULL,
                reviewed_by TEXT,
                reviewed_at TEXT,
                review_comment TEXT
            )
            "#,
        )
        .execute(&db)
        .await
        .unwrap();

        sqlx::query(
            r#"
            CREATE TABLE moderation_audit (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                entity_id TEXT NOT NULL,
                entity_kind TEXT NOT NULL,
                previous_state TEXT NOT NULL,
                new_state TEXT NOT NULL,
                actor_id TEXT NOT NULL,
                actor_role TEXT NOT NULL,
                reason TEXT,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&db)
        .await
        .unwrap();

        db
    }

    pub fn poi(name: &str, lat: f64, lon: f64, submitted_by: &str) -> super::NewEntity {
        super::NewEntity {
            kind: super::EntityKind::PoiSubmission,
            name: name.to_string(),
            description: None,
            address: Some(format!("{} street", name)),
            latitude: Some(lat),
            longitude: Some(lon),
            category: Some("restaurant".to_string()),
            subject_ref: None,
            submitted_by: submitted_by.to_string(),
        }
    }

    pub fn report(name: &str, subject_ref: &str, submitted_by: &str) -> super::NewEntity {
        super::NewEntity {
            kind: super::EntityKind::CommentReport,
            name: name.to_string(),
            description: Some("flagged as spam".to_string()),
            address: None,
            latitude: None,
            longitude: None,
            category: None,
            subject_ref: Some(subject_ref.to_string()),
            submitted_by: submitted_by.to_string(),
        }
    }
}
