use sqlx::SqlitePool;
use time::OffsetDateTime;

use crate::auth::repo_types::User;

impl User {
    pub async fn find_by_username(db: &SqlitePool, username: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, created_at
            FROM users
            WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_email(db: &SqlitePool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, created_at
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &SqlitePool, id: i64) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, created_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Inserts a user whose password is already hashed. Unique violations
    /// come back as the raw `sqlx::Error` so the caller can tell which column
    /// collided.
    pub async fn create(
        db: &SqlitePool,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING id, username, email, password_hash, created_at
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(db)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;

    #[tokio::test]
    async fn create_and_find() {
        let db = connect_in_memory().await.unwrap();
        let before = OffsetDateTime::now_utc() - time::Duration::seconds(1);
        let created = User::create(&db, "ana", "ana@example.com", "$argon2id$fake")
            .await
            .unwrap();
        assert!(created.id > 0);

        let by_name = User::find_by_username(&db, "ana").await.unwrap().unwrap();
        let by_email = User::find_by_email(&db, "ana@example.com").await.unwrap().unwrap();
        let by_id = User::find_by_id(&db, created.id).await.unwrap().unwrap();
        assert_eq!(by_name.id, created.id);
        assert_eq!(by_email.id, created.id);
        assert_eq!(by_id.username, "ana");
        assert_eq!(by_id.password_hash, "$argon2id$fake");
        assert!(by_id.created_at >= before);
        assert!(by_id.created_at <= OffsetDateTime::now_utc() + time::Duration::seconds(1));
    }

    #[tokio::test]
    async fn missing_rows_are_none() {
        let db = connect_in_memory().await.unwrap();
        assert!(User::find_by_username(&db, "ghost").await.unwrap().is_none());
        assert!(User::find_by_id(&db, 999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn storage_enforces_unique_username() {
        let db = connect_in_memory().await.unwrap();
        User::create(&db, "ana", "a@example.com", "h").await.unwrap();
        let err = User::create(&db, "ana", "b@example.com", "h").await.unwrap_err();
        let db_err = err.as_database_error().expect("database error");
        assert!(db_err.message().contains("users.username"));
    }

    #[test]
    fn serialized_user_hides_hash() {
        let user = User {
            id: 1,
            username: "ana".into(),
            email: "ana@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            created_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("ana@example.com"));
        assert!(!json.contains("argon2"));
        assert!(!json.contains("password_hash"));
    }
}
