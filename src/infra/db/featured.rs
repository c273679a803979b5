use async_trait::async_trait;

use crate::application::repos::{FeaturedRepo, RepoError};

use super::{PostgresRepositories, map_sqlx_error};

#[async_trait]
impl FeaturedRepo for PostgresRepositories {
    async fn featured_ids(&self) -> Result<Vec<i64>, RepoError> {
        sqlx::query_scalar(
            r#"
            SELECT f.listing_id
            FROM featured_listings f
            INNER JOIN listings l ON l.id = f.listing_id
            WHERE l.status = 'publish'::listing_status
            ORDER BY f.position ASC
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn replace_featured(&self, listing_ids: &[i64]) -> Result<(), RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        sqlx::query("DELETE FROM featured_listings")
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        if !listing_ids.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO featured_listings (listing_id, position)
                SELECT ids.listing_id, ids.position::INTEGER
                FROM UNNEST($1::BIGINT[]) WITH ORDINALITY AS ids (listing_id, position)
                ON CONFLICT (listing_id) DO NOTHING
                "#,
            )
            .bind(listing_ids)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)
    }
}
