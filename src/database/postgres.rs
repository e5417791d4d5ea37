use async_trait::async_trait;
use serde_json::{json, Value};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use crate::config::DatabaseConfig;

use super::models::{Education, Experience, Post, Profile, ProfileUpdate, User};
use super::store::{PostStore, ProfileStore, StoreError, UserStore};

/// Postgres backend. Users live in a conventional table; profiles and posts
/// are kept as one JSONB document per row, which gives the keyed-document
/// semantics the service is written against.
///
/// Entry-list mutations run as single UPDATE statements scoped by owner, so
/// two concurrent adds to the same profile cannot lose one another the way a
/// read-modify-write over the full document could.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str, config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .connect(url)
            .await?;
        info!("connected to postgres");
        Ok(Self { pool })
    }

    /// Create the three collections when absent. No migration machinery:
    /// the schema is a handful of document tables.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL,
                date TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS profiles (
                owner UUID PRIMARY KEY,
                doc JSONB NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                id UUID PRIMARY KEY,
                owner UUID NOT NULL,
                doc JSONB NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn decode_profile(doc: Value) -> Result<Profile, StoreError> {
        serde_json::from_value(doc).map_err(|e| StoreError::Document(e.to_string()))
    }

    fn decode_profile_row(row: Option<(Value,)>) -> Result<Option<Profile>, StoreError> {
        row.map(|(doc,)| Self::decode_profile(doc)).transpose()
    }

    fn is_unique_violation(err: &sqlx::Error) -> bool {
        matches!(
            err.as_database_error().and_then(|db| db.code()),
            Some(code) if code == "23505"
        )
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert(&self, user: User) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO users (id, name, email, password, date) VALUES ($1, $2, $3, $4, $5)")
            .bind(user.id)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password)
            .bind(user.date)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if Self::is_unique_violation(&e) {
                    StoreError::DuplicateEmail
                } else {
                    StoreError::Sqlx(e)
                }
            })?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, password, date FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, password, date FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn set_name(&self, id: Uuid, name: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET name = $2 WHERE id = $1")
            .bind(id)
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for PgStore {
    async fn find_by_owner(&self, owner: Uuid) -> Result<Option<Profile>, StoreError> {
        let row = sqlx::query_as::<_, (Value,)>("SELECT doc FROM profiles WHERE owner = $1")
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?;
        Self::decode_profile_row(row)
    }

    async fn list(&self) -> Result<Vec<Profile>, StoreError> {
        let rows = sqlx::query_as::<_, (Value,)>("SELECT doc FROM profiles")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(|(doc,)| Self::decode_profile(doc)).collect()
    }

    async fn upsert(&self, owner: Uuid, update: ProfileUpdate) -> Result<Profile, StoreError> {
        // `||` replaces exactly the top-level keys the update names, which
        // matches set-style merge semantics on the document.
        let (doc,) = sqlx::query_as::<_, (Value,)>(
            r#"
            INSERT INTO profiles (owner, doc) VALUES ($1, $2)
            ON CONFLICT (owner) DO UPDATE SET doc = profiles.doc || EXCLUDED.doc
            RETURNING doc
            "#,
        )
        .bind(owner)
        .bind(update.into_document(owner))
        .fetch_one(&self.pool)
        .await?;
        Self::decode_profile(doc)
    }

    async fn set_image(&self, owner: Uuid, url: &str) -> Result<Option<Profile>, StoreError> {
        let row = sqlx::query_as::<_, (Value,)>(
            r#"
            UPDATE profiles
            SET doc = jsonb_set(doc, '{image}', to_jsonb($2::text))
            WHERE owner = $1
            RETURNING doc
            "#,
        )
        .bind(owner)
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;
        Self::decode_profile_row(row)
    }

    async fn push_experience(
        &self,
        owner: Uuid,
        entry: Experience,
    ) -> Result<Option<Profile>, StoreError> {
        self.push_entry(owner, "experience", json!(entry)).await
    }

    async fn remove_experience(
        &self,
        owner: Uuid,
        entry_id: Uuid,
    ) -> Result<Option<Profile>, StoreError> {
        self.remove_entry(owner, "experience", entry_id).await
    }

    async fn push_education(
        &self,
        owner: Uuid,
        entry: Education,
    ) -> Result<Option<Profile>, StoreError> {
        self.push_entry(owner, "education", json!(entry)).await
    }

    async fn remove_education(
        &self,
        owner: Uuid,
        entry_id: Uuid,
    ) -> Result<Option<Profile>, StoreError> {
        self.remove_entry(owner, "education", entry_id).await
    }

    async fn delete_by_owner(&self, owner: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM profiles WHERE owner = $1")
            .bind(owner)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

impl PgStore {
    /// Prepend one entry to the named list in a single owner-scoped UPDATE.
    async fn push_entry(
        &self,
        owner: Uuid,
        list: &str,
        entry: Value,
    ) -> Result<Option<Profile>, StoreError> {
        let sql = format!(
            r#"
            UPDATE profiles
            SET doc = jsonb_set(doc, '{{{list}}}', $2::jsonb || COALESCE(doc->'{list}', '[]'::jsonb))
            WHERE owner = $1
            RETURNING doc
            "#,
        );
        let row = sqlx::query_as::<_, (Value,)>(&sql)
            .bind(owner)
            .bind(Value::Array(vec![entry]))
            .fetch_optional(&self.pool)
            .await?;
        Self::decode_profile_row(row)
    }

    /// Rebuild the named list without the matching entry, preserving order.
    /// No-op when nothing matches.
    async fn remove_entry(
        &self,
        owner: Uuid,
        list: &str,
        entry_id: Uuid,
    ) -> Result<Option<Profile>, StoreError> {
        let sql = format!(
            r#"
            UPDATE profiles
            SET doc = jsonb_set(doc, '{{{list}}}', COALESCE(
                (SELECT jsonb_agg(entry.value ORDER BY entry.ord)
                   FROM jsonb_array_elements(COALESCE(doc->'{list}', '[]'::jsonb))
                        WITH ORDINALITY AS entry(value, ord)
                  WHERE entry.value->>'id' <> $2),
                '[]'::jsonb))
            WHERE owner = $1
            RETURNING doc
            "#,
        );
        let row = sqlx::query_as::<_, (Value,)>(&sql)
            .bind(owner)
            .bind(entry_id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        Self::decode_profile_row(row)
    }
}

#[async_trait]
impl PostStore for PgStore {
    async fn insert(&self, post: Post) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO posts (id, owner, doc) VALUES ($1, $2, $3)")
            .bind(post.id)
            .bind(post.user)
            .bind(json!(post))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn count_by_owner(&self, owner: Uuid) -> Result<u64, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posts WHERE owner = $1")
            .bind(owner)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn delete_by_owner(&self, owner: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM posts WHERE owner = $1")
            .bind(owner)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
