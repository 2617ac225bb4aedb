use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Reel record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Reel {
    pub id: Uuid,
    pub description: String,
    pub file_name: String, // name under the upload directory
    pub created_at: OffsetDateTime,
}

impl Reel {
    /// Insert a new reel.
    pub async fn create(db: &PgPool, description: &str, file_name: &str) -> anyhow::Result<Reel> {
        let reel = sqlx::query_as::<_, Reel>(
            r#"
            INSERT INTO reels (description, file_name)
            VALUES ($1, $2)
            RETURNING id, description, file_name, created_at
            "#,
        )
        .bind(description)
        .bind(file_name)
        .fetch_one(db)
        .await?;
        Ok(reel)
    }

    /// All reels, newest first.
    pub async fn list_newest_first(db: &PgPool) -> anyhow::Result<Vec<Reel>> {
        let reels = sqlx::query_as::<_, Reel>(
            r#"
            SELECT id, description, file_name, created_at
            FROM reels
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(db)
        .await?;
        Ok(reels)
    }
}
