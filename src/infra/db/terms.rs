use async_trait::async_trait;

use crate::{
    application::repos::{CreateTermParams, RepoError, TermsRepo, TermsWriteRepo},
    domain::{
        entities::{ListingTermRecord, TermRecord},
        types::Taxonomy,
    },
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct TermRow {
    id: i64,
    taxonomy: Taxonomy,
    slug: String,
    name: String,
}

impl From<TermRow> for TermRecord {
    fn from(row: TermRow) -> Self {
        Self {
            id: row.id,
            taxonomy: row.taxonomy,
            slug: row.slug,
            name: row.name,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ListingTermRow {
    listing_id: i64,
    id: i64,
    taxonomy: Taxonomy,
    slug: String,
    name: String,
}

#[async_trait]
impl TermsRepo for PostgresRepositories {
    async fn find_term(
        &self,
        taxonomy: Taxonomy,
        slug: &str,
    ) -> Result<Option<TermRecord>, RepoError> {
        let row = sqlx::query_as::<_, TermRow>(
            "SELECT id, taxonomy, slug, name FROM terms WHERE taxonomy = $1 AND slug = $2",
        )
        .bind(taxonomy)
        .bind(slug)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(TermRecord::from))
    }

    async fn find_term_by_id(&self, id: i64) -> Result<Option<TermRecord>, RepoError> {
        let row = sqlx::query_as::<_, TermRow>(
            "SELECT id, taxonomy, slug, name FROM terms WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(TermRecord::from))
    }

    async fn list_term_slugs(&self, taxonomy: Taxonomy) -> Result<Vec<String>, RepoError> {
        sqlx::query_scalar("SELECT slug FROM terms WHERE taxonomy = $1 ORDER BY slug")
            .bind(taxonomy)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)
    }

    async fn terms_for_listing(
        &self,
        listing_id: i64,
        taxonomy: Taxonomy,
    ) -> Result<Vec<TermRecord>, RepoError> {
        let rows = sqlx::query_as::<_, TermRow>(
            r#"
            SELECT t.id, t.taxonomy, t.slug, t.name
            FROM terms t
            INNER JOIN listing_terms lt ON lt.term_id = t.id
            WHERE lt.listing_id = $1 AND t.taxonomy = $2
            ORDER BY t.name ASC
            "#,
        )
        .bind(listing_id)
        .bind(taxonomy)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(TermRecord::from).collect())
    }

    async fn terms_for_listings(
        &self,
        listing_ids: &[i64],
    ) -> Result<Vec<ListingTermRecord>, RepoError> {
        if listing_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, ListingTermRow>(
            r#"
            SELECT lt.listing_id, t.id, t.taxonomy, t.slug, t.name
            FROM listing_terms lt
            INNER JOIN terms t ON t.id = lt.term_id
            WHERE lt.listing_id = ANY($1::BIGINT[])
            ORDER BY lt.listing_id ASC, t.taxonomy ASC, t.name ASC
            "#,
        )
        .bind(listing_ids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|row| ListingTermRecord {
                listing_id: row.listing_id,
                term: TermRecord {
                    id: row.id,
                    taxonomy: row.taxonomy,
                    slug: row.slug,
                    name: row.name,
                },
            })
            .collect())
    }
}

#[async_trait]
impl TermsWriteRepo for PostgresRepositories {
    async fn create_term(&self, params: CreateTermParams) -> Result<TermRecord, RepoError> {
        let row = sqlx::query_as::<_, TermRow>(
            r#"
            INSERT INTO terms (taxonomy, slug, name)
            VALUES ($1, $2, $3)
            RETURNING id, taxonomy, slug, name
            "#,
        )
        .bind(params.taxonomy)
        .bind(params.slug)
        .bind(params.name)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn rename_term(&self, id: i64, name: &str) -> Result<TermRecord, RepoError> {
        let row = sqlx::query_as::<_, TermRow>(
            r#"
            UPDATE terms SET name = $2, updated_at = now()
            WHERE id = $1
            RETURNING id, taxonomy, slug, name
            "#,
        )
        .bind(id)
        .bind(name)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(TermRecord::from).ok_or(RepoError::NotFound)
    }

    async fn delete_term(&self, id: i64) -> Result<TermRecord, RepoError> {
        let row = sqlx::query_as::<_, TermRow>(
            "DELETE FROM terms WHERE id = $1 RETURNING id, taxonomy, slug, name",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(TermRecord::from).ok_or(RepoError::NotFound)
    }
}
