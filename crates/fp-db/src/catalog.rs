//! Celebs, places and events.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use fp_schemas::{
    Celeb, CelebRef, Event, EventStatus, EventSummary, Place, PlaceRef,
};

use crate::{like_pattern, DbError};

/// Hard cap on list endpoints.
pub const EVENT_LIST_LIMIT: i64 = 50;
pub const PLACE_SITEMAP_LIMIT: i64 = 1000;

// ---------------------------------------------------------------------------
// Celebs
// ---------------------------------------------------------------------------

const CELEB_COLUMNS: &str =
    "id, name, name_en, name_ja, name_zh, image_url, group_name, birth_date";

#[derive(Debug, Clone, Default)]
pub struct NewCeleb {
    pub name: String,
    pub name_en: Option<String>,
    pub name_ja: Option<String>,
    pub name_zh: Option<String>,
    pub image_url: Option<String>,
    pub group_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
}

fn celeb_from_row(row: &PgRow) -> Result<Celeb> {
    Ok(Celeb {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        name_en: row.try_get("name_en")?,
        name_ja: row.try_get("name_ja")?,
        name_zh: row.try_get("name_zh")?,
        image_url: row.try_get("image_url")?,
        group_name: row.try_get("group_name")?,
        birth_date: row.try_get("birth_date")?,
    })
}

pub async fn list_celebs(pool: &PgPool) -> Result<Vec<Celeb>> {
    let rows = sqlx::query(&format!(
        "select {CELEB_COLUMNS} from celebs order by name asc"
    ))
    .fetch_all(pool)
    .await
    .context("list_celebs failed")?;
    rows.iter().map(celeb_from_row).collect()
}

pub async fn insert_celeb(pool: &PgPool, new: &NewCeleb) -> Result<Celeb> {
    insert_celeb_with_id(pool, Uuid::new_v4(), new).await
}

pub(crate) async fn insert_celeb_with_id(pool: &PgPool, id: Uuid, new: &NewCeleb) -> Result<Celeb> {
    let row = sqlx::query(&format!(
        r#"
        insert into celebs (id, name, name_en, name_ja, name_zh, image_url, group_name, birth_date)
        values ($1, $2, $3, $4, $5, $6, $7, $8)
        on conflict (id) do update set name = excluded.name
        returning {CELEB_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(&new.name)
    .bind(&new.name_en)
    .bind(&new.name_ja)
    .bind(&new.name_zh)
    .bind(&new.image_url)
    .bind(&new.group_name)
    .bind(new.birth_date)
    .fetch_one(pool)
    .await
    .context("insert_celeb failed")?;
    celeb_from_row(&row)
}

// ---------------------------------------------------------------------------
// Places
// ---------------------------------------------------------------------------

const PLACE_COLUMNS: &str = "id, name, name_en, address, region, description, image_urls, \
     latitude, longitude, rental_available, rental_rules, capacity, price_range, \
     created_at, updated_at";

#[derive(Debug, Clone, Default)]
pub struct NewPlace {
    pub name: String,
    pub name_en: Option<String>,
    pub address: Option<String>,
    pub region: Option<String>,
    pub description: Option<String>,
    pub image_urls: Vec<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub rental_available: bool,
    pub rental_rules: Option<String>,
    pub capacity: Option<i32>,
    pub price_range: Option<String>,
}

fn place_from_row(row: &PgRow) -> Result<Place> {
    Ok(Place {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        name_en: row.try_get("name_en")?,
        address: row.try_get("address")?,
        region: row.try_get("region")?,
        description: row.try_get("description")?,
        image_urls: row.try_get("image_urls")?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        rental_available: row.try_get("rental_available")?,
        rental_rules: row.try_get("rental_rules")?,
        capacity: row.try_get("capacity")?,
        price_range: row.try_get("price_range")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Rentable places, newest first, optionally narrowed to one region.
pub async fn list_places(pool: &PgPool, region: Option<&str>) -> Result<Vec<Place>> {
    let rows = sqlx::query(&format!(
        r#"
        select {PLACE_COLUMNS}
        from places
        where rental_available = true
          and ($1::text is null or region = $1)
        order by created_at desc
        "#
    ))
    .bind(region)
    .fetch_all(pool)
    .await
    .context("list_places failed")?;
    rows.iter().map(place_from_row).collect()
}

pub async fn fetch_place(pool: &PgPool, place_id: Uuid) -> Result<Place> {
    let row = sqlx::query(&format!("select {PLACE_COLUMNS} from places where id = $1"))
        .bind(place_id)
        .fetch_optional(pool)
        .await
        .context("fetch_place failed")?
        .ok_or(DbError::NotFound("place"))?;
    place_from_row(&row)
}

pub async fn insert_place(pool: &PgPool, new: &NewPlace) -> Result<Place> {
    insert_place_with_id(pool, Uuid::new_v4(), new).await
}

pub(crate) async fn insert_place_with_id(pool: &PgPool, id: Uuid, new: &NewPlace) -> Result<Place> {
    let row = sqlx::query(&format!(
        r#"
        insert into places (
          id, name, name_en, address, region, description, image_urls,
          latitude, longitude, rental_available, rental_rules, capacity, price_range
        ) values (
          $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13
        )
        on conflict (id) do update set name = excluded.name
        returning {PLACE_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(&new.name)
    .bind(&new.name_en)
    .bind(&new.address)
    .bind(&new.region)
    .bind(&new.description)
    .bind(&new.image_urls)
    .bind(new.latitude)
    .bind(new.longitude)
    .bind(new.rental_available)
    .bind(&new.rental_rules)
    .bind(new.capacity)
    .bind(&new.price_range)
    .fetch_one(pool)
    .await
    .context("insert_place failed")?;
    place_from_row(&row)
}

/// `(id, updated_at)` for the sitemap.
pub async fn list_place_sitemap(pool: &PgPool) -> Result<Vec<(Uuid, DateTime<Utc>)>> {
    let rows = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
        "select id, updated_at from places order by created_at desc limit $1",
    )
    .bind(PLACE_SITEMAP_LIMIT)
    .fetch_all(pool)
    .await
    .context("list_place_sitemap failed")?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Event columns prefixed `e.` plus the joined celeb/place refs.
const EVENT_SUMMARY_SELECT: &str = r#"
    select
      e.id, e.title, e.title_en, e.description, e.image_url, e.start_date, e.end_date,
      e.perks, e.status, e.celeb_id, e.place_id, e.user_id, e.created_at, e.updated_at,
      c.name as celeb_name,
      p.name as place_name
    from events e
    join celebs c on c.id = e.celeb_id
    left join places p on p.id = e.place_id
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventSort {
    /// Soonest first.
    #[default]
    StartDate,
    Newest,
    Popular,
}

impl EventSort {
    /// Unknown values fall back to the default ordering.
    pub fn parse_or_default(s: Option<&str>) -> Self {
        match s {
            Some("newest") => EventSort::Newest,
            Some("popular") => EventSort::Popular,
            _ => EventSort::StartDate,
        }
    }

    fn order_by(&self) -> &'static str {
        match self {
            EventSort::StartDate => "e.start_date asc",
            // No view counter exists; popularity ranks like recency.
            EventSort::Newest | EventSort::Popular => "e.created_at desc",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub search: Option<String>,
    pub region: Option<String>,
    pub celeb_id: Option<Uuid>,
    pub sort: EventSort,
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub title_en: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub perks: Vec<String>,
    pub celeb_id: Uuid,
    pub place_id: Option<Uuid>,
    pub user_id: Uuid,
}

fn event_from_row(row: &PgRow) -> Result<Event> {
    Ok(Event {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        title_en: row.try_get("title_en")?,
        description: row.try_get("description")?,
        image_url: row.try_get("image_url")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        perks: row.try_get("perks")?,
        status: EventStatus::parse(&row.try_get::<String, _>("status")?)?,
        celeb_id: row.try_get("celeb_id")?,
        place_id: row.try_get("place_id")?,
        user_id: row.try_get("user_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn event_summary_from_row(row: &PgRow) -> Result<EventSummary> {
    let event = event_from_row(row)?;
    let celeb = CelebRef {
        id: event.celeb_id,
        name: row.try_get("celeb_name")?,
    };
    let place_name: Option<String> = row.try_get("place_name")?;
    let place = match (event.place_id, place_name) {
        (Some(id), Some(name)) => Some(PlaceRef { id, name }),
        _ => None,
    };
    Ok(EventSummary { event, celeb, place })
}

/// Published events matching `filter`, at most [`EVENT_LIST_LIMIT`].
pub async fn list_events(pool: &PgPool, filter: &EventFilter) -> Result<Vec<EventSummary>> {
    let search = filter
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(like_pattern);
    let region = filter
        .region
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let rows = sqlx::query(&format!(
        r#"
        {EVENT_SUMMARY_SELECT}
        where e.status = 'PUBLISHED'
          and ($1::text is null
               or e.title ilike $1
               or c.name ilike $1
               or c.name_en ilike $1)
          and ($2::text is null or p.region = $2)
          and ($3::uuid is null or e.celeb_id = $3)
        order by {}
        limit $4
        "#,
        filter.sort.order_by()
    ))
    .bind(search)
    .bind(region)
    .bind(filter.celeb_id)
    .bind(EVENT_LIST_LIMIT)
    .fetch_all(pool)
    .await
    .context("list_events failed")?;

    rows.iter().map(event_summary_from_row).collect()
}

/// Any status; callers decide whether a draft is visible.
pub async fn fetch_event(pool: &PgPool, event_id: Uuid) -> Result<EventSummary> {
    let row = sqlx::query(&format!("{EVENT_SUMMARY_SELECT} where e.id = $1"))
        .bind(event_id)
        .fetch_optional(pool)
        .await
        .context("fetch_event failed")?
        .ok_or(DbError::NotFound("event"))?;
    event_summary_from_row(&row)
}

/// New events always start as DRAFT.
pub async fn insert_event(pool: &PgPool, new: &NewEvent) -> Result<Event> {
    insert_event_with(pool, Uuid::new_v4(), new, EventStatus::Draft).await
}

pub(crate) async fn insert_event_with(
    pool: &PgPool,
    id: Uuid,
    new: &NewEvent,
    status: EventStatus,
) -> Result<Event> {
    if new.end_date < new.start_date {
        return Err(DbError::Conflict("event ends before it starts".to_string()).into());
    }

    let row = sqlx::query(
        r#"
        insert into events (
          id, title, title_en, description, image_url, start_date, end_date,
          perks, status, celeb_id, place_id, user_id
        ) values (
          $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12
        )
        on conflict (id) do update set title = excluded.title
        returning *
        "#,
    )
    .bind(id)
    .bind(&new.title)
    .bind(&new.title_en)
    .bind(&new.description)
    .bind(&new.image_url)
    .bind(new.start_date)
    .bind(new.end_date)
    .bind(&new.perks)
    .bind(status.as_str())
    .bind(new.celeb_id)
    .bind(new.place_id)
    .bind(new.user_id)
    .fetch_one(pool)
    .await
    .context("insert_event failed")?;
    event_from_row(&row)
}

pub async fn set_event_status(pool: &PgPool, event_id: Uuid, status: EventStatus) -> Result<Event> {
    let row = sqlx::query(
        r#"
        update events
        set status = $2,
            updated_at = now()
        where id = $1
        returning *
        "#,
    )
    .bind(event_id)
    .bind(status.as_str())
    .fetch_optional(pool)
    .await
    .context("set_event_status failed")?
    .ok_or(DbError::NotFound("event"))?;
    event_from_row(&row)
}

/// Every event the user created, any status, newest first.
pub async fn list_events_by_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<EventSummary>> {
    let rows = sqlx::query(&format!(
        "{EVENT_SUMMARY_SELECT} where e.user_id = $1 order by e.created_at desc"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("list_events_by_user failed")?;
    rows.iter().map(event_summary_from_row).collect()
}

/// Published events at a place that have not ended yet, soonest first.
pub async fn list_upcoming_events_at_place(
    pool: &PgPool,
    place_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Vec<EventSummary>> {
    let rows = sqlx::query(&format!(
        r#"
        {EVENT_SUMMARY_SELECT}
        where e.place_id = $1
          and e.status = 'PUBLISHED'
          and e.end_date >= $2
        order by e.start_date asc
        limit 10
        "#
    ))
    .bind(place_id)
    .bind(now)
    .fetch_all(pool)
    .await
    .context("list_upcoming_events_at_place failed")?;
    rows.iter().map(event_summary_from_row).collect()
}

/// `(id, updated_at)` of every published event, for the sitemap.
pub async fn list_event_sitemap(pool: &PgPool) -> Result<Vec<(Uuid, DateTime<Utc>)>> {
    let rows = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
        "select id, updated_at from events where status = 'PUBLISHED' order by start_date asc",
    )
    .fetch_all(pool)
    .await
    .context("list_event_sitemap failed")?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_parsing_falls_back_to_start_date() {
        assert_eq!(EventSort::parse_or_default(None), EventSort::StartDate);
        assert_eq!(EventSort::parse_or_default(Some("newest")), EventSort::Newest);
        assert_eq!(EventSort::parse_or_default(Some("popular")), EventSort::Popular);
        assert_eq!(EventSort::parse_or_default(Some("random")), EventSort::StartDate);
    }

    #[test]
    fn order_by_clauses_are_static() {
        assert_eq!(EventSort::StartDate.order_by(), "e.start_date asc");
        assert_eq!(EventSort::Popular.order_by(), EventSort::Newest.order_by());
    }
}
