use async_trait::async_trait;

use crate::application::repos::{EditorialRepo, RepoError};
use crate::domain::entities::IntroTarget;

use super::{PostgresRepositories, map_sqlx_error};

/// City overrides are stored with an empty tag slug.
fn tag_column(target: &IntroTarget) -> &str {
    target.tag.as_deref().unwrap_or_default()
}

#[async_trait]
impl EditorialRepo for PostgresRepositories {
    async fn find_intro(&self, target: &IntroTarget) -> Result<Option<String>, RepoError> {
        sqlx::query_scalar("SELECT body FROM explore_intros WHERE area_slug = $1 AND tag_slug = $2")
            .bind(&target.area)
            .bind(tag_column(target))
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)
    }

    async fn save_intro(&self, target: &IntroTarget, body: &str) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO explore_intros (area_slug, tag_slug, body)
            VALUES ($1, $2, $3)
            ON CONFLICT (area_slug, tag_slug) DO UPDATE
            SET body = EXCLUDED.body, updated_at = now()
            "#,
        )
        .bind(&target.area)
        .bind(tag_column(target))
        .bind(body)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn delete_intro(&self, target: &IntroTarget) -> Result<bool, RepoError> {
        let result =
            sqlx::query("DELETE FROM explore_intros WHERE area_slug = $1 AND tag_slug = $2")
                .bind(&target.area)
                .bind(tag_column(target))
                .execute(self.pool())
                .await
                .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }
}
