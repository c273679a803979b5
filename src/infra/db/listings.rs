use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    application::repos::{ListingsRepo, RepoError, UpsertListingParams},
    domain::{
        entities::{Contact, ListingRecord, Location},
        types::{ListingStatus, Taxonomy},
    },
};

use super::{PostgresRepositories, map_sqlx_error};

/// Column list for [`ListingRow`], qualified with the `l` alias.
pub(super) const LISTING_COLUMNS: &str = "l.id, l.slug, l.title, l.excerpt, l.body, l.status, \
    l.lat, l.lng, l.address, l.city, l.state, l.zip, l.phone, l.email, l.website, \
    l.opening_hours, l.avg_rating, l.review_count, l.price_level, l.featured_image, \
    l.published_at, l.created_at, l.modified_at";

#[derive(sqlx::FromRow)]
pub(super) struct ListingRow {
    id: i64,
    slug: String,
    title: String,
    excerpt: String,
    body: String,
    status: ListingStatus,
    lat: Option<f64>,
    lng: Option<f64>,
    address: Option<String>,
    city: Option<String>,
    state: Option<String>,
    zip: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    website: Option<String>,
    opening_hours: serde_json::Value,
    avg_rating: Option<f64>,
    review_count: Option<i32>,
    price_level: Option<String>,
    featured_image: Option<String>,
    published_at: Option<OffsetDateTime>,
    created_at: OffsetDateTime,
    modified_at: OffsetDateTime,
}

impl From<ListingRow> for ListingRecord {
    fn from(row: ListingRow) -> Self {
        let location = match (row.lat, row.lng) {
            (Some(lat), Some(lng)) => Some(Location {
                lat,
                lng,
                address: row.address.unwrap_or_default(),
                city: row.city.unwrap_or_default(),
                state: row.state.unwrap_or_default(),
                zip: row.zip.unwrap_or_default(),
            }),
            _ => None,
        };

        Self {
            id: row.id,
            slug: row.slug,
            title: row.title,
            excerpt: row.excerpt,
            body: row.body,
            status: row.status,
            location,
            contact: Contact {
                phone: row.phone,
                email: row.email,
                website: row.website,
            },
            opening_hours: row.opening_hours,
            avg_rating: row.avg_rating,
            review_count: row.review_count,
            price_level: row.price_level,
            featured_image: row.featured_image,
            published_at: row.published_at,
            created_at: row.created_at,
            modified_at: row.modified_at,
        }
    }
}

#[async_trait]
impl ListingsRepo for PostgresRepositories {
    async fn find_listing(&self, id: i64) -> Result<Option<ListingRecord>, RepoError> {
        let sql = format!("SELECT {LISTING_COLUMNS} FROM listings l WHERE l.id = $1");
        let row = sqlx::query_as::<_, ListingRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(ListingRecord::from))
    }

    async fn upsert_listing(
        &self,
        params: UpsertListingParams,
    ) -> Result<ListingRecord, RepoError> {
        let UpsertListingParams {
            id,
            slug,
            title,
            excerpt,
            body,
            status,
            location,
            contact,
            opening_hours,
            avg_rating,
            review_count,
            price_level,
            featured_image,
            published_at,
        } = params;

        let location = location.unwrap_or_default();
        let has_location = location.has_coordinates();
        let opening_hours = opening_hours.unwrap_or_else(|| serde_json::json!({}));

        let write = match id {
            Some(_) => format!(
                "UPDATE listings l SET slug = $2, title = $3, excerpt = $4, body = $5, \
                 status = $6, lat = $7, lng = $8, address = $9, city = $10, state = $11, \
                 zip = $12, phone = $13, email = $14, website = $15, opening_hours = $16, \
                 avg_rating = $17, review_count = $18, price_level = $19, featured_image = $20, \
                 published_at = COALESCE($21, l.published_at, \
                     CASE WHEN $6 = 'publish'::listing_status THEN now() END), \
                 modified_at = now() \
                 WHERE l.id = $1 \
                 RETURNING {LISTING_COLUMNS}"
            ),
            // `$1` is NULL on this branch; it is referenced so every bind has a type.
            None => format!(
                "INSERT INTO listings AS l (slug, title, excerpt, body, status, lat, lng, \
                 address, city, state, zip, phone, email, website, opening_hours, avg_rating, \
                 review_count, price_level, featured_image, published_at) \
                 SELECT $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
                     $17, $18, $19, $20, \
                     COALESCE($21, CASE WHEN $6 = 'publish'::listing_status THEN now() END) \
                 WHERE $1::BIGINT IS NULL \
                 RETURNING {LISTING_COLUMNS}"
            ),
        };

        let row = sqlx::query_as::<_, ListingRow>(&write)
            .bind(id)
            .bind(slug)
            .bind(title)
            .bind(excerpt)
            .bind(body)
            .bind(status)
            .bind(has_location.then_some(location.lat))
            .bind(has_location.then_some(location.lng))
            .bind(has_location.then_some(location.address))
            .bind(has_location.then_some(location.city))
            .bind(has_location.then_some(location.state))
            .bind(has_location.then_some(location.zip))
            .bind(contact.phone)
            .bind(contact.email)
            .bind(contact.website)
            .bind(opening_hours)
            .bind(avg_rating)
            .bind(review_count)
            .bind(price_level)
            .bind(featured_image)
            .bind(published_at)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.map(ListingRecord::from).ok_or(RepoError::NotFound)
    }

    async fn trash_listing(&self, id: i64) -> Result<ListingRecord, RepoError> {
        let sql = format!(
            "UPDATE listings l SET \
                 status_before_trash = CASE WHEN l.status = 'trash'::listing_status \
                     THEN l.status_before_trash ELSE l.status END, \
                 status = 'trash'::listing_status, \
                 modified_at = now() \
             WHERE l.id = $1 \
             RETURNING {LISTING_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ListingRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.map(ListingRecord::from).ok_or(RepoError::NotFound)
    }

    async fn untrash_listing(&self, id: i64) -> Result<ListingRecord, RepoError> {
        let sql = format!(
            "UPDATE listings l SET \
                 status = CASE WHEN l.status = 'trash'::listing_status \
                     THEN COALESCE(l.status_before_trash, 'draft'::listing_status) \
                     ELSE l.status END, \
                 status_before_trash = NULL, \
                 modified_at = now() \
             WHERE l.id = $1 \
             RETURNING {LISTING_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ListingRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.map(ListingRecord::from).ok_or(RepoError::NotFound)
    }

    async fn delete_listing(&self, id: i64) -> Result<ListingRecord, RepoError> {
        let sql = format!("DELETE FROM listings l WHERE l.id = $1 RETURNING {LISTING_COLUMNS}");
        let row = sqlx::query_as::<_, ListingRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.map(ListingRecord::from).ok_or(RepoError::NotFound)
    }

    async fn replace_listing_terms(
        &self,
        listing_id: i64,
        taxonomy: Taxonomy,
        term_ids: &[i64],
    ) -> Result<(), RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let touched = sqlx::query(
            "UPDATE listings SET modified_at = now() WHERE id = $1",
        )
        .bind(listing_id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        if touched.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }

        sqlx::query(
            "DELETE FROM listing_terms lt USING terms t \
             WHERE lt.term_id = t.id AND lt.listing_id = $1 AND t.taxonomy = $2",
        )
        .bind(listing_id)
        .bind(taxonomy)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        if !term_ids.is_empty() {
            sqlx::query(
                "INSERT INTO listing_terms (listing_id, term_id) \
                 SELECT $1, t.id FROM terms t \
                 WHERE t.id = ANY($2::BIGINT[]) AND t.taxonomy = $3 \
                 ON CONFLICT DO NOTHING",
            )
            .bind(listing_id)
            .bind(term_ids)
            .bind(taxonomy)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)
    }
}
