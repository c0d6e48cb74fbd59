use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use fp_schemas::{InquiryPlace, InquiryStatus, InquiryView, PlaceInquiry, UserRef};

use crate::DbError;

const INQUIRY_COLUMNS: &str = "id, place_id, user_id, message, event_date, status, created_at";

#[derive(Debug, Clone)]
pub struct NewInquiry {
    pub place_id: Uuid,
    pub user_id: Uuid,
    pub message: String,
    pub event_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct InquiryFilter {
    pub user_id: Option<Uuid>,
    pub place_id: Option<Uuid>,
    pub status: Option<InquiryStatus>,
}

fn inquiry_from_row(row: &PgRow) -> Result<PlaceInquiry> {
    Ok(PlaceInquiry {
        id: row.try_get("id")?,
        place_id: row.try_get("place_id")?,
        user_id: row.try_get("user_id")?,
        message: row.try_get("message")?,
        event_date: row.try_get("event_date")?,
        status: InquiryStatus::parse(&row.try_get::<String, _>("status")?)?,
        created_at: row.try_get("created_at")?,
    })
}

/// New inquiries start REQUESTED. An unknown place is `NotFound`.
pub async fn insert_inquiry(pool: &PgPool, new: &NewInquiry) -> Result<PlaceInquiry> {
    let row = sqlx::query(&format!(
        r#"
        insert into place_inquiries (id, place_id, user_id, message, event_date, status)
        select $1::uuid, p.id, $3::uuid, $4::text, $5::timestamptz, 'REQUESTED'
        from places p
        where p.id = $2
        returning {INQUIRY_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(new.place_id)
    .bind(new.user_id)
    .bind(&new.message)
    .bind(new.event_date)
    .fetch_optional(pool)
    .await
    .context("insert_inquiry failed")?
    .ok_or(DbError::NotFound("place"))?;
    inquiry_from_row(&row)
}

/// Newest first, joined with place and requesting user.
pub async fn list_inquiries(pool: &PgPool, filter: &InquiryFilter) -> Result<Vec<InquiryView>> {
    let rows = sqlx::query(
        r#"
        select
          i.id, i.place_id, i.user_id, i.message, i.event_date, i.status, i.created_at,
          p.name as place_name, p.image_urls as place_image_urls,
          u.name as user_name, u.email as user_email
        from place_inquiries i
        join places p on p.id = i.place_id
        join users u on u.id = i.user_id
        where ($1::uuid is null or i.user_id = $1)
          and ($2::uuid is null or i.place_id = $2)
          and ($3::text is null or i.status = $3)
        order by i.created_at desc
        "#,
    )
    .bind(filter.user_id)
    .bind(filter.place_id)
    .bind(filter.status.map(|s| s.as_str()))
    .fetch_all(pool)
    .await
    .context("list_inquiries failed")?;

    rows.iter()
        .map(|row| {
            let inquiry = inquiry_from_row(row)?;
            Ok(InquiryView {
                place: InquiryPlace {
                    id: inquiry.place_id,
                    name: row.try_get("place_name")?,
                    image_urls: row.try_get("place_image_urls")?,
                },
                user: UserRef {
                    id: inquiry.user_id,
                    name: row.try_get("user_name")?,
                    email: row.try_get("user_email")?,
                },
                inquiry,
            })
        })
        .collect()
}

/// REQUESTED -> CONNECTED | DECLINED.
pub async fn transition_inquiry(
    pool: &PgPool,
    inquiry_id: Uuid,
    next: InquiryStatus,
) -> Result<PlaceInquiry> {
    let mut tx = pool.begin().await.context("transition_inquiry begin failed")?;

    let row = sqlx::query(&format!(
        "select {INQUIRY_COLUMNS} from place_inquiries where id = $1 for update"
    ))
    .bind(inquiry_id)
    .fetch_optional(&mut *tx)
    .await
    .context("transition_inquiry select failed")?
    .ok_or(DbError::NotFound("inquiry"))?;
    let current = inquiry_from_row(&row)?;

    if !current.status.can_transition_to(next) {
        return Err(DbError::InvalidTransition {
            entity: "inquiry",
            from: current.status.as_str(),
            to: next.as_str(),
        }
        .into());
    }

    let row = sqlx::query(&format!(
        "update place_inquiries set status = $2 where id = $1 returning {INQUIRY_COLUMNS}"
    ))
    .bind(inquiry_id)
    .bind(next.as_str())
    .fetch_one(&mut *tx)
    .await
    .context("transition_inquiry update failed")?;
    let updated = inquiry_from_row(&row)?;

    tx.commit().await.context("transition_inquiry commit failed")?;
    Ok(updated)
}

pub async fn count_inquiries(pool: &PgPool, status: Option<InquiryStatus>) -> Result<i64> {
    let (n,): (i64,) = sqlx::query_as::<_, (i64,)>(
        "select count(*)::bigint from place_inquiries where ($1::text is null or status = $1)",
    )
    .bind(status.map(|s| s.as_str()))
    .fetch_one(pool)
    .await
    .context("count_inquiries failed")?;
    Ok(n)
}
