/// Tests for the moderation storage contract
///
/// Note: The state machine itself is covered by unit tests next to the
/// engine. These tests pin down the database-level guarantees the engine
/// relies on: the conditional update that arbitrates concurrent
/// transitions, and the atomicity of the state change with its audit entry.
use anyhow::Result;
use sqlx::SqlitePool;

async fn directory_db() -> Result<SqlitePool> {
    let db = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE moderated_entity (
            id TEXT PRIMARY KEY,
            kind TEXT NOT NULL,
            state TEXT NOT NULL DEFAULT 'pending',
            name TEXT NOT NULL,
            submitted_by TEXT NOT NULL,
            created_at TEXT NOT NULL,
            reviewed_by TEXT,
            reviewed_at TEXT,
            review_comment TEXT
        )
        "#,
    )
    .execute(&db)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE moderation_audit (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            entity_id TEXT NOT NULL,
            previous_state TEXT NOT NULL,
            new_state TEXT NOT NULL,
            actor_id TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(&db)
    .await?;

    Ok(db)
}

async fn insert_pending(db: &SqlitePool, id: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO moderated_entity (id, kind, state, name, submitted_by, created_at)
         VALUES (?, 'poi_submission', 'pending', 'Chez Wou', 'user-1', ?)",
    )
    .bind(id)
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(db)
    .await?;

    Ok(())
}

/// Claim a pending entity for a terminal state; returns rows affected
async fn finalize(db: &SqlitePool, id: &str, target: &str, actor: &str) -> Result<u64> {
    let mut tx = db.begin().await?;

    let rows = sqlx::query(
        "UPDATE moderated_entity
         SET state = ?, reviewed_by = ?, reviewed_at = ?
         WHERE id = ? AND state = 'pending'",
    )
    .bind(target)
    .bind(actor)
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if rows == 0 {
        return Ok(0);
    }

    sqlx::query(
        "INSERT INTO moderation_audit (entity_id, previous_state, new_state, actor_id, created_at)
         VALUES (?, 'pending', ?, ?, ?)",
    )
    .bind(id)
    .bind(target)
    .bind(actor)
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(rows)
}

#[tokio::test]
async fn test_concurrent_transitions_exactly_one_wins() -> Result<()> {
    let db = directory_db().await?;
    insert_pending(&db, "entity-1").await?;

    // Competing approve and reject on the same pending entity
    let approve = finalize(&db, "entity-1", "approved", "mod-1");
    let reject = finalize(&db, "entity-1", "rejected", "mod-2");
    let (approve_rows, reject_rows) = tokio::join!(approve, reject);

    let winners = approve_rows? + reject_rows?;
    assert_eq!(winners, 1, "exactly one transition may claim the row");

    // Exactly one audit entry was committed
    let audit_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM moderation_audit")
        .fetch_one(&db)
        .await?;
    assert_eq!(audit_count, 1);

    // The stored state matches the single audit entry
    let state: String = sqlx::query_scalar("SELECT state FROM moderated_entity WHERE id = ?")
        .bind("entity-1")
        .fetch_one(&db)
        .await?;
    let audited: String = sqlx::query_scalar("SELECT new_state FROM moderation_audit")
        .fetch_one(&db)
        .await?;
    assert_eq!(state, audited);

    Ok(())
}

#[tokio::test]
async fn test_finalized_entity_cannot_be_reclaimed() -> Result<()> {
    let db = directory_db().await?;
    insert_pending(&db, "entity-1").await?;

    assert_eq!(finalize(&db, "entity-1", "approved", "mod-1").await?, 1);

    // Any later attempt, for either target, claims nothing
    assert_eq!(finalize(&db, "entity-1", "rejected", "mod-2").await?, 0);
    assert_eq!(finalize(&db, "entity-1", "approved", "mod-2").await?, 0);

    let reviewed_by: String =
        sqlx::query_scalar("SELECT reviewed_by FROM moderated_entity WHERE id = ?")
            .bind("entity-1")
            .fetch_one(&db)
            .await?;
    assert_eq!(reviewed_by, "mod-1");

    Ok(())
}

#[tokio::test]
async fn test_audit_failure_rolls_back_state_change() -> Result<()> {
    let db = directory_db().await?;
    insert_pending(&db, "entity-1").await?;

    // Simulate the audit insert failing mid-transaction
    let mut tx = db.begin().await?;
    sqlx::query(
        "UPDATE moderated_entity SET state = 'approved' WHERE id = ? AND state = 'pending'",
    )
    .bind("entity-1")
    .execute(&mut *tx)
    .await?;

    let bad_insert = sqlx::query("INSERT INTO moderation_audit (no_such_column) VALUES (1)")
        .execute(&mut *tx)
        .await;
    assert!(bad_insert.is_err());
    drop(tx); // roll back

    // No state change without its audit entry
    let state: String = sqlx::query_scalar("SELECT state FROM moderated_entity WHERE id = ?")
        .bind("entity-1")
        .fetch_one(&db)
        .await?;
    assert_eq!(state, "pending");

    let audit_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM moderation_audit")
        .fetch_one(&db)
        .await?;
    assert_eq!(audit_count, 0);

    Ok(())
}

#[tokio::test]
async fn test_pending_queue_is_oldest_first() -> Result<()> {
    let db = directory_db().await?;

    for (id, created_at) in [
        ("newer", "2026-03-02T10:00:00+00:00"),
        ("oldest", "2026-03-01T08:00:00+00:00"),
        ("middle", "2026-03-01T12:00:00+00:00"),
    ] {
        sqlx::query(
            "INSERT INTO moderated_entity (id, kind, state, name, submitted_by, created_at)
             VALUES (?, 'poi_submission', 'pending', 'x', 'user-1', ?)",
        )
        .bind(id)
        .bind(created_at)
        .execute(&db)
        .await?;
    }

    let ids: Vec<String> = sqlx::query_scalar(
        "SELECT id FROM moderated_entity WHERE state = 'pending'
         ORDER BY created_at ASC LIMIT 10 OFFSET 0",
    )
    .fetch_all(&db)
    .await?;

    assert_eq!(ids, vec!["oldest", "middle", "newer"]);

    Ok(())
}
