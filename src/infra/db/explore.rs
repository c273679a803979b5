use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::{
    application::repos::{
        ExploreRepo, GeoRow, IntersectionRow, ListingQuery, ListingSlice, RepoError, TermCount,
    },
    domain::{entities::ListingRecord, types::SortKey},
};

use super::{
    PostgresRepositories,
    listings::{LISTING_COLUMNS, ListingRow},
    map_sqlx_error,
};

/// Position given to listings absent from the featured list.
const NOT_FEATURED_POSITION: i32 = i32::MAX;

#[derive(sqlx::FromRow)]
struct TermCountRow {
    term_id: i64,
    slug: String,
    name: String,
    count: i64,
}

impl TryFrom<TermCountRow> for TermCount {
    type Error = RepoError;

    fn try_from(row: TermCountRow) -> Result<Self, Self::Error> {
        Ok(Self {
            term_id: row.term_id,
            slug: row.slug,
            name: row.name,
            count: PostgresRepositories::convert_count(row.count)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct IntersectionDbRow {
    area_slug: String,
    tag_slug: String,
    count: i64,
    lastmod: Option<OffsetDateTime>,
}

#[derive(sqlx::FromRow)]
struct GeoDbRow {
    id: i64,
    slug: String,
    lat: Option<f64>,
    lng: Option<f64>,
    modified_at: OffsetDateTime,
}

impl PostgresRepositories {
    fn push_listing_filter<'q>(qb: &mut QueryBuilder<'q, Postgres>, query: &'q ListingQuery) {
        qb.push(
            " FROM listings l WHERE l.status = 'publish'::listing_status \
             AND EXISTS (SELECT 1 FROM listing_terms la \
                 INNER JOIN terms a ON a.id = la.term_id \
                 WHERE la.listing_id = l.id AND a.taxonomy = 'area'::taxonomy AND a.slug = ",
        );
        qb.push_bind(query.area_slug.as_str());
        qb.push(")");

        if let Some(tag) = query.tag_slug.as_deref() {
            qb.push(
                " AND EXISTS (SELECT 1 FROM listing_terms lt \
                     INNER JOIN terms t ON t.id = lt.term_id \
                     WHERE lt.listing_id = l.id AND t.taxonomy = 'tag'::taxonomy AND t.slug = ",
            );
            qb.push_bind(tag);
            qb.push(")");
        }
    }

    /// ORDER BY for `query.sort`; every ordering ends on `l.id` so pages tile.
    fn push_listing_order<'q>(qb: &mut QueryBuilder<'q, Postgres>, query: &'q ListingQuery) {
        match query.sort {
            SortKey::Rating => {
                qb.push(" ORDER BY (l.avg_rating IS NULL) ASC, l.avg_rating DESC, l.title ASC");
            }
            SortKey::Reviews => {
                qb.push(
                    " ORDER BY (l.review_count IS NULL) ASC, l.review_count DESC, l.title ASC",
                );
            }
            SortKey::Newest => {
                qb.push(" ORDER BY l.published_at DESC NULLS LAST");
            }
            SortKey::Name => {
                qb.push(" ORDER BY l.title ASC");
            }
            SortKey::Featured => {
                qb.push(" ORDER BY COALESCE(array_position(");
                qb.push_bind(query.featured.as_slice());
                qb.push("::BIGINT[], l.id), ");
                qb.push(NOT_FEATURED_POSITION.to_string());
                qb.push(") ASC, l.title ASC");
            }
        }
        qb.push(", l.id ASC");
    }
}

#[async_trait]
impl ExploreRepo for PostgresRepositories {
    async fn tags_for_area(
        &self,
        area_slug: &str,
        min_count: u64,
    ) -> Result<Vec<TermCount>, RepoError> {
        let rows = sqlx::query_as::<_, TermCountRow>(
            r#"
            SELECT t.id AS term_id, t.slug, t.name, COUNT(DISTINCT l.id) AS count
            FROM terms a
            INNER JOIN listing_terms la ON la.term_id = a.id
            INNER JOIN listings l ON l.id = la.listing_id AND l.status = 'publish'::listing_status
            INNER JOIN listing_terms lt ON lt.listing_id = l.id
            INNER JOIN terms t ON t.id = lt.term_id AND t.taxonomy = 'tag'::taxonomy
            WHERE a.taxonomy = 'area'::taxonomy AND a.slug = $1
            GROUP BY t.id, t.slug, t.name
            HAVING COUNT(DISTINCT l.id) >= $2
            ORDER BY count DESC, t.name ASC
            "#,
        )
        .bind(area_slug)
        .bind(bind_count(min_count))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(TermCount::try_from).collect()
    }

    async fn areas_for_tag(
        &self,
        tag_slug: &str,
        min_count: u64,
    ) -> Result<Vec<TermCount>, RepoError> {
        let rows = sqlx::query_as::<_, TermCountRow>(
            r#"
            SELECT a.id AS term_id, a.slug, a.name, COUNT(DISTINCT l.id) AS count
            FROM terms t
            INNER JOIN listing_terms lt ON lt.term_id = t.id
            INNER JOIN listings l ON l.id = lt.listing_id AND l.status = 'publish'::listing_status
            INNER JOIN listing_terms la ON la.listing_id = l.id
            INNER JOIN terms a ON a.id = la.term_id AND a.taxonomy = 'area'::taxonomy
            WHERE t.taxonomy = 'tag'::taxonomy AND t.slug = $1
            GROUP BY a.id, a.slug, a.name
            HAVING COUNT(DISTINCT l.id) >= $2
            ORDER BY a.name ASC
            "#,
        )
        .bind(tag_slug)
        .bind(bind_count(min_count))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(TermCount::try_from).collect()
    }

    async fn count_intersection(&self, area_slug: &str, tag_slug: &str) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(DISTINCT l.id)
            FROM listings l
            INNER JOIN listing_terms la ON la.listing_id = l.id
            INNER JOIN terms a ON a.id = la.term_id AND a.taxonomy = 'area'::taxonomy
            INNER JOIN listing_terms lt ON lt.listing_id = l.id
            INNER JOIN terms t ON t.id = lt.term_id AND t.taxonomy = 'tag'::taxonomy
            WHERE l.status = 'publish'::listing_status AND a.slug = $1 AND t.slug = $2
            "#,
        )
        .bind(area_slug)
        .bind(tag_slug)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }

    async fn sum_area_reviews(&self, area_slug: &str) -> Result<u64, RepoError> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(COALESCE(l.review_count, 0)), 0)::BIGINT
            FROM listings l
            INNER JOIN listing_terms la ON la.listing_id = l.id
            INNER JOIN terms a ON a.id = la.term_id AND a.taxonomy = 'area'::taxonomy
            WHERE l.status = 'publish'::listing_status AND a.slug = $1
            "#,
        )
        .bind(area_slug)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Self::convert_count(total.max(0))
    }

    async fn list_populated_areas(&self) -> Result<Vec<TermCount>, RepoError> {
        let rows = sqlx::query_as::<_, TermCountRow>(
            r#"
            SELECT a.id AS term_id, a.slug, a.name, COUNT(DISTINCT l.id) AS count
            FROM terms a
            INNER JOIN listing_terms la ON la.term_id = a.id
            INNER JOIN listings l ON l.id = la.listing_id AND l.status = 'publish'::listing_status
            WHERE a.taxonomy = 'area'::taxonomy
            GROUP BY a.id, a.slug, a.name
            ORDER BY a.name ASC
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(TermCount::try_from).collect()
    }

    async fn list_listings(&self, query: &ListingQuery) -> Result<ListingSlice, RepoError> {
        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*)");
        Self::push_listing_filter(&mut count_qb, query);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {LISTING_COLUMNS}"));
        Self::push_listing_filter(&mut qb, query);
        Self::push_listing_order(&mut qb, query);
        qb.push(" LIMIT ");
        qb.push_bind(i64::from(query.limit));
        qb.push(" OFFSET ");
        qb.push_bind(bind_count(query.offset));

        let rows = qb
            .build_query_as::<ListingRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(ListingSlice {
            items: rows.into_iter().map(ListingRecord::from).collect(),
            total: Self::convert_count(total)?,
        })
    }

    async fn list_intersections(&self, min_count: u64) -> Result<Vec<IntersectionRow>, RepoError> {
        let rows = sqlx::query_as::<_, IntersectionDbRow>(
            r#"
            SELECT a.slug AS area_slug, t.slug AS tag_slug,
                   COUNT(DISTINCT l.id) AS count, MAX(l.modified_at) AS lastmod
            FROM listings l
            INNER JOIN listing_terms la ON la.listing_id = l.id
            INNER JOIN terms a ON a.id = la.term_id AND a.taxonomy = 'area'::taxonomy
            INNER JOIN listing_terms lt ON lt.listing_id = l.id
            INNER JOIN terms t ON t.id = lt.term_id AND t.taxonomy = 'tag'::taxonomy
            WHERE l.status = 'publish'::listing_status
            GROUP BY a.slug, t.slug
            HAVING COUNT(DISTINCT l.id) >= $1
            ORDER BY a.slug ASC, count DESC, t.slug ASC
            "#,
        )
        .bind(bind_count(min_count))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|row| {
                Ok(IntersectionRow {
                    area_slug: row.area_slug,
                    tag_slug: row.tag_slug,
                    count: Self::convert_count(row.count)?,
                    lastmod: row.lastmod,
                })
            })
            .collect()
    }

    async fn geo_batch(&self, offset: u64, limit: u32) -> Result<Vec<GeoRow>, RepoError> {
        let rows = sqlx::query_as::<_, GeoDbRow>(
            r#"
            SELECT id, slug, lat, lng, modified_at
            FROM listings
            WHERE status = 'publish'::listing_status AND lat IS NOT NULL AND lng IS NOT NULL
            ORDER BY id ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(i64::from(limit))
        .bind(bind_count(offset))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|row| GeoRow {
                listing_id: row.id,
                slug: row.slug,
                lat: row.lat,
                lng: row.lng,
                modified_at: row.modified_at,
            })
            .collect())
    }
}

fn bind_count(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
