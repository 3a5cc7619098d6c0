// ABOUTME: Sequential capId allocation per capId prefix
// ABOUTME: Atomic counter rows in cap_sequences, seeded from existing capIds and record counts

use sqlx::SqliteConnection;
use tracing::debug;

use cap_storage::{StorageError, StorageResult};

/// Number of trailing user id characters embedded in a capId
pub const USER_SUFFIX_LEN: usize = 6;

/// Attempts before giving up on a unique capId
pub const MAX_CAP_ID_ATTEMPTS: u32 = 3;

/// Last `USER_SUFFIX_LEN` characters of the user id (all of it when shorter)
pub fn user_suffix(user_id: &str) -> &str {
    let skip = user_id.chars().count().saturating_sub(USER_SUFFIX_LEN);
    match user_id.char_indices().nth(skip) {
        Some((idx, _)) => &user_id[idx..],
        None => "",
    }
}

/// `CAP-<suffix>-`
pub fn cap_id_prefix(user_id: &str) -> String {
    format!("CAP-{}-", user_suffix(user_id))
}

/// `CAP-<suffix>-<n>` with `n` zero-padded to at least four digits
pub fn format_cap_id(user_id: &str, n: i64) -> String {
    format!("{}{:04}", cap_id_prefix(user_id), n)
}

/// Bump and return the counter behind the user's capId prefix.
///
/// Users whose ids end in the same characters share one counter. A new
/// counter starts after the highest capId already using the prefix, or after
/// the user's record count when that is larger, so data created before the
/// counter existed keeps its numbering.
pub async fn next_value(conn: &mut SqliteConnection, user_id: &str) -> StorageResult<i64> {
    let prefix = cap_id_prefix(user_id);

    let value: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO cap_sequences (prefix, last_value)
        VALUES (
            ?,
            MAX(
                COALESCE(
                    (SELECT MAX(CAST(substr(cap_id, length(?) + 1) AS INTEGER))
                     FROM caps
                     WHERE substr(cap_id, 1, length(?)) = ?),
                    0
                ),
                (SELECT COUNT(*) FROM caps WHERE user_id = ?)
            ) + 1
        )
        ON CONFLICT(prefix) DO UPDATE SET last_value = last_value + 1
        RETURNING last_value
        "#,
    )
    .bind(&prefix)
    .bind(&prefix)
    .bind(&prefix)
    .bind(&prefix)
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(StorageError::Sqlx)?;

    debug!("Allocated capId sequence {} for prefix: {}", value, prefix);
    Ok(value)
}

/// Move the prefix counter past every capId already using it.
///
/// Only needed when rows were written with capIds the counter never handed
/// out, e.g. imported data.
pub async fn skip_taken(conn: &mut SqliteConnection, user_id: &str) -> StorageResult<()> {
    let prefix = cap_id_prefix(user_id);

    let highest: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT MAX(CAST(substr(cap_id, length(?) + 1) AS INTEGER))
        FROM caps
        WHERE substr(cap_id, 1, length(?)) = ?
        "#,
    )
    .bind(&prefix)
    .bind(&prefix)
    .bind(&prefix)
    .fetch_one(&mut *conn)
    .await
    .map_err(StorageError::Sqlx)?;

    if let Some(highest) = highest {
        debug!("Advancing capId sequence for prefix {} past {}", prefix, highest);

        sqlx::query(
            r#"
            UPDATE cap_sequences
            SET last_value = MAX(last_value, ?)
            WHERE prefix = ?
            "#,
        )
        .bind(highest)
        .bind(&prefix)
        .execute(&mut *conn)
        .await
        .map_err(StorageError::Sqlx)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("64f1c2a9e8b7d6c5b4a39281", "a39281")]
    #[case("abc", "abc")]
    #[case("123456", "123456")]
    #[case("", "")]
    #[case("usér-ßüñé", "r-ßüñé")]
    fn test_user_suffix(#[case] user_id: &str, #[case] expected: &str) {
        assert_eq!(user_suffix(user_id), expected);
    }

    #[test]
    fn test_format_cap_id() {
        assert_eq!(
            format_cap_id("64f1c2a9e8b7d6c5b4a39281", 1),
            "CAP-a39281-0001"
        );
        assert_eq!(format_cap_id("64f1c2a9e8b7d6c5b4a39281", 42), "CAP-a39281-0042");
        assert_eq!(format_cap_id("u1", 12345), "CAP-u1-12345");
    }

    const EPOCH: &str = "2024-01-01T00:00:00.000000Z";

    async fn insert_row(
        conn: &mut SqliteConnection,
        id: &str,
        user_id: &str,
        cap_id: Option<&str>,
    ) {
        sqlx::query(
            "INSERT INTO caps (id, cap_id, user_id, title, created_at, updated_at)
             VALUES (?, ?, ?, 'legacy', ?, ?)",
        )
        .bind(id)
        .bind(cap_id)
        .bind(user_id)
        .bind(EPOCH)
        .bind(EPOCH)
        .execute(&mut *conn)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_first_value_seeds_from_record_count() {
        let pool = cap_storage::connect_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        insert_row(&mut conn, "legacy-0", "user-1", None).await;
        insert_row(&mut conn, "legacy-1", "user-1", None).await;

        assert_eq!(next_value(&mut conn, "user-1").await.unwrap(), 3);
        assert_eq!(next_value(&mut conn, "user-1").await.unwrap(), 4);
        assert_eq!(next_value(&mut conn, "user-2").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_first_value_seeds_past_existing_cap_ids() {
        let pool = cap_storage::connect_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        // Another user whose id ends with the same six characters
        insert_row(&mut conn, "other", "zz-123456", Some("CAP-123456-0007")).await;

        assert_eq!(next_value(&mut conn, "aa-123456").await.unwrap(), 8);
    }

    #[tokio::test]
    async fn test_shared_prefix_shares_counter() {
        let pool = cap_storage::connect_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        assert_eq!(next_value(&mut conn, "aa-123456").await.unwrap(), 1);
        assert_eq!(next_value(&mut conn, "bb-123456").await.unwrap(), 2);
        assert_eq!(next_value(&mut conn, "aa-123456").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_skip_taken_advances_past_imported_ids() {
        let pool = cap_storage::connect_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        assert_eq!(next_value(&mut conn, "aa-123456").await.unwrap(), 1);
        insert_row(&mut conn, "imported", "aa-123456", Some("CAP-123456-0009")).await;

        skip_taken(&mut conn, "aa-123456").await.unwrap();
        assert_eq!(next_value(&mut conn, "aa-123456").await.unwrap(), 10);
    }
}
