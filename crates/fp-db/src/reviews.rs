//! Ad reviews, postings and proofs.

use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use fp_schemas::{
    posting_window, AdPosting, AdProof, AdReview, OrderStatus, PostingView, ReviewQueueItem,
    ReviewStatus, UserRef,
};

use crate::DbError;

const REVIEW_COLUMNS: &str =
    "id, order_id, status, design_urls, copy_text, target_date, note, reviewed_at, created_at";
const POSTING_COLUMNS: &str = "id, order_id, start_date, end_date, locations, created_at";
const PROOF_COLUMNS: &str = "id, posting_id, image_url, location, taken_at";

#[derive(Debug, Clone)]
pub struct NewReview {
    pub design_urls: Vec<String>,
    pub copy_text: Option<String>,
    pub target_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewDecision {
    pub review: AdReview,
    /// Set when the review was approved.
    pub posting: Option<AdPosting>,
    pub order_user_id: Uuid,
    pub order_number: String,
}

#[derive(Debug, Clone)]
pub struct NewProof {
    pub image_url: String,
    pub location: String,
    pub taken_at: Option<DateTime<Utc>>,
}

fn review_from_row(row: &PgRow) -> Result<AdReview> {
    Ok(AdReview {
        id: row.try_get("id")?,
        order_id: row.try_get("order_id")?,
        status: ReviewStatus::parse(&row.try_get::<String, _>("status")?)?,
        design_urls: row.try_get("design_urls")?,
        copy_text: row.try_get("copy_text")?,
        target_date: row.try_get("target_date")?,
        note: row.try_get("note")?,
        reviewed_at: row.try_get("reviewed_at")?,
        created_at: row.try_get("created_at")?,
    })
}

fn posting_from_row(row: &PgRow) -> Result<AdPosting> {
    Ok(AdPosting {
        id: row.try_get("id")?,
        order_id: row.try_get("order_id")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        locations: row.try_get("locations")?,
        created_at: row.try_get("created_at")?,
    })
}

fn proof_from_row(row: &PgRow) -> Result<AdProof> {
    Ok(AdProof {
        id: row.try_get("id")?,
        posting_id: row.try_get("posting_id")?,
        image_url: row.try_get("image_url")?,
        location: row.try_get("location")?,
        taken_at: row.try_get("taken_at")?,
    })
}

// ---------------------------------------------------------------------------
// Reviews
// ---------------------------------------------------------------------------

/// Submit creative for a PAID order owned by `user_id`.
///
/// Someone else's order is reported as not found. A REJECTED review is
/// replaced and goes back to SUBMITTED; a SUBMITTED or APPROVED one is a
/// conflict.
pub async fn submit_review(
    pool: &PgPool,
    order_id: Uuid,
    user_id: Uuid,
    new: &NewReview,
) -> Result<AdReview> {
    let mut tx = pool.begin().await.context("submit_review begin failed")?;

    let order = sqlx::query("select status, user_id from orders where id = $1 for update")
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await
        .context("submit_review order select failed")?
        .ok_or(DbError::NotFound("order"))?;
    let owner: Uuid = order.try_get("user_id")?;
    if owner != user_id {
        return Err(DbError::NotFound("order").into());
    }
    let status = OrderStatus::parse(&order.try_get::<String, _>("status")?)?;
    if status != OrderStatus::Paid {
        return Err(DbError::Conflict(format!(
            "order is {}; creative can only be submitted for PAID orders",
            status.as_str()
        ))
        .into());
    }

    let existing = sqlx::query(&format!(
        "select {REVIEW_COLUMNS} from ad_reviews where order_id = $1"
    ))
    .bind(order_id)
    .fetch_optional(&mut *tx)
    .await
    .context("submit_review existing select failed")?;

    let row = match existing {
        None => sqlx::query(&format!(
            r#"
            insert into ad_reviews (id, order_id, status, design_urls, copy_text, target_date)
            values ($1, $2, 'SUBMITTED', $3, $4, $5)
            returning {REVIEW_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(order_id)
        .bind(&new.design_urls)
        .bind(&new.copy_text)
        .bind(new.target_date)
        .fetch_one(&mut *tx)
        .await
        .context("submit_review insert failed")?,
        Some(row) => {
            let prev = review_from_row(&row)?;
            if !prev.status.can_transition_to(ReviewStatus::Submitted) {
                return Err(DbError::Conflict(format!(
                    "review already {}",
                    prev.status.as_str()
                ))
                .into());
            }
            sqlx::query(&format!(
                r#"
                update ad_reviews
                set status = 'SUBMITTED',
                    design_urls = $2,
                    copy_text = $3,
                    target_date = $4,
                    note = null,
                    reviewed_at = null
                where id = $1
                returning {REVIEW_COLUMNS}
                "#
            ))
            .bind(prev.id)
            .bind(&new.design_urls)
            .bind(&new.copy_text)
            .bind(new.target_date)
            .fetch_one(&mut *tx)
            .await
            .context("submit_review resubmit failed")?
        }
    };
    let review = review_from_row(&row)?;

    tx.commit().await.context("submit_review commit failed")?;
    info!(order_id = %order_id, review_id = %review.id, "review submitted");
    Ok(review)
}

/// Approve or reject a SUBMITTED review.
///
/// Approval creates the posting in the same transaction: the window comes
/// from [`posting_window`] with the product's term, locations from the
/// product's placement.
pub async fn decide_review(
    pool: &PgPool,
    review_id: Uuid,
    next: ReviewStatus,
    note: Option<&str>,
    now: DateTime<Utc>,
) -> Result<ReviewDecision> {
    let mut tx = pool.begin().await.context("decide_review begin failed")?;

    // Order row first, then review row: same lock order as transition_order.
    let order_id: Uuid = sqlx::query_scalar("select order_id from ad_reviews where id = $1")
        .bind(review_id)
        .fetch_optional(&mut *tx)
        .await
        .context("decide_review order lookup failed")?
        .ok_or(DbError::NotFound("review"))?;
    let order_status: String =
        sqlx::query_scalar("select status from orders where id = $1 for update")
            .bind(order_id)
            .fetch_one(&mut *tx)
            .await
            .context("decide_review order lock failed")?;
    let order_status = OrderStatus::parse(&order_status)?;

    let row = sqlx::query(&format!(
        "select {REVIEW_COLUMNS} from ad_reviews where id = $1 for update"
    ))
    .bind(review_id)
    .fetch_optional(&mut *tx)
    .await
    .context("decide_review select failed")?
    .ok_or(DbError::NotFound("review"))?;
    let current = review_from_row(&row)?;

    if next == ReviewStatus::Submitted || !current.status.can_transition_to(next) {
        return Err(DbError::InvalidTransition {
            entity: "review",
            from: current.status.as_str(),
            to: next.as_str(),
        }
        .into());
    }
    if next == ReviewStatus::Approved && order_status != OrderStatus::Paid {
        return Err(DbError::Conflict(format!(
            "cannot approve creative for a {} order",
            order_status.as_str()
        ))
        .into());
    }

    let row = sqlx::query(&format!(
        r#"
        update ad_reviews
        set status = $2,
            note = coalesce($3, note),
            reviewed_at = $4
        where id = $1
        returning {REVIEW_COLUMNS}
        "#
    ))
    .bind(review_id)
    .bind(next.as_str())
    .bind(note)
    .bind(now)
    .fetch_one(&mut *tx)
    .await
    .context("decide_review update failed")?;
    let review = review_from_row(&row)?;

    let ctx = sqlx::query(
        r#"
        select o.user_id, o.order_number, p.term_months, p.placement
        from orders o
        join ad_products p on p.id = o.product_id
        where o.id = $1
        "#,
    )
    .bind(review.order_id)
    .fetch_one(&mut *tx)
    .await
    .context("decide_review order select failed")?;
    let order_user_id: Uuid = ctx.try_get("user_id")?;
    let order_number: String = ctx.try_get("order_number")?;

    let posting = if next == ReviewStatus::Approved {
        let term_months: i32 = ctx.try_get("term_months")?;
        let placement: Vec<String> = ctx.try_get("placement")?;
        let (start, end) = posting_window(review.target_date, now, term_months);

        // One posting per order; a re-approval after resubmission keeps the first.
        sqlx::query(
            r#"
            insert into ad_postings (id, order_id, start_date, end_date, locations)
            values ($1, $2, $3, $4, $5)
            on conflict (order_id) do nothing
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(review.order_id)
        .bind(start)
        .bind(end)
        .bind(&placement)
        .execute(&mut *tx)
        .await
        .context("decide_review posting insert failed")?;

        let row = sqlx::query(&format!(
            "select {POSTING_COLUMNS} from ad_postings where order_id = $1"
        ))
        .bind(review.order_id)
        .fetch_one(&mut *tx)
        .await
        .context("decide_review posting select failed")?;
        Some(posting_from_row(&row)?)
    } else {
        None
    };

    tx.commit().await.context("decide_review commit failed")?;
    info!(
        review_id = %review_id,
        order_id = %review.order_id,
        status = next.as_str(),
        posting = posting.is_some(),
        "review decided"
    );

    Ok(ReviewDecision {
        review,
        posting,
        order_user_id,
        order_number,
    })
}

pub async fn fetch_review_by_order(pool: &PgPool, order_id: Uuid) -> Result<Option<AdReview>> {
    let row = sqlx::query(&format!(
        "select {REVIEW_COLUMNS} from ad_reviews where order_id = $1"
    ))
    .bind(order_id)
    .fetch_optional(pool)
    .await
    .context("fetch_review_by_order failed")?;
    row.as_ref().map(review_from_row).transpose()
}

/// SUBMITTED and REJECTED reviews, oldest first.
pub async fn list_review_queue(pool: &PgPool) -> Result<Vec<ReviewQueueItem>> {
    let rows = sqlx::query(
        r#"
        select
          r.id, r.order_id, r.status, r.design_urls, r.copy_text, r.target_date,
          r.note, r.reviewed_at, r.created_at,
          o.order_number, o.amount,
          p.title as product_title,
          u.id as customer_id, u.name as customer_name, u.email as customer_email
        from ad_reviews r
        join orders o on o.id = r.order_id
        join ad_products p on p.id = o.product_id
        join users u on u.id = o.user_id
        where r.status in ('SUBMITTED', 'REJECTED')
        order by r.created_at asc
        "#,
    )
    .fetch_all(pool)
    .await
    .context("list_review_queue failed")?;

    rows.iter()
        .map(|row| {
            Ok(ReviewQueueItem {
                review: review_from_row(row)?,
                order_number: row.try_get("order_number")?,
                amount: row.try_get("amount")?,
                product_title: row.try_get("product_title")?,
                customer: UserRef {
                    id: row.try_get("customer_id")?,
                    name: row.try_get("customer_name")?,
                    email: row.try_get("customer_email")?,
                },
            })
        })
        .collect()
}

pub async fn count_reviews(pool: &PgPool, status: Option<ReviewStatus>) -> Result<i64> {
    let (n,): (i64,) = sqlx::query_as::<_, (i64,)>(
        "select count(*)::bigint from ad_reviews where ($1::text is null or status = $1)",
    )
    .bind(status.map(|s| s.as_str()))
    .fetch_one(pool)
    .await
    .context("count_reviews failed")?;
    Ok(n)
}

// ---------------------------------------------------------------------------
// Postings and proofs
// ---------------------------------------------------------------------------

/// Latest postings by start date with order context and proofs.
pub async fn list_postings(pool: &PgPool, limit: i64, now: DateTime<Utc>) -> Result<Vec<PostingView>> {
    let rows = sqlx::query(
        r#"
        select
          ps.id, ps.order_id, ps.start_date, ps.end_date, ps.locations, ps.created_at,
          o.order_number,
          p.title as product_title,
          u.name as customer_name
        from ad_postings ps
        join orders o on o.id = ps.order_id
        join ad_products p on p.id = o.product_id
        join users u on u.id = o.user_id
        order by ps.start_date desc
        limit $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("list_postings failed")?;

    let ids: Vec<Uuid> = rows
        .iter()
        .map(|r| r.try_get::<Uuid, _>("id"))
        .collect::<Result<_, _>>()?;

    let proof_rows = sqlx::query(&format!(
        "select {PROOF_COLUMNS} from ad_proofs where posting_id = any($1) order by taken_at desc"
    ))
    .bind(&ids)
    .fetch_all(pool)
    .await
    .context("list_postings proofs failed")?;

    let mut proofs: HashMap<Uuid, Vec<AdProof>> = HashMap::new();
    for row in &proof_rows {
        let proof = proof_from_row(row)?;
        proofs.entry(proof.posting_id).or_default().push(proof);
    }

    rows.iter()
        .map(|row| {
            let posting = posting_from_row(row)?;
            Ok(PostingView {
                active: posting.is_active(now),
                proofs: proofs.remove(&posting.id).unwrap_or_default(),
                order_number: row.try_get("order_number")?,
                product_title: row.try_get("product_title")?,
                customer_name: row.try_get("customer_name")?,
                posting,
            })
        })
        .collect()
}

/// Postings whose window contains `now`.
pub async fn count_active_postings(pool: &PgPool, now: DateTime<Utc>) -> Result<i64> {
    let (n,): (i64,) = sqlx::query_as::<_, (i64,)>(
        "select count(*)::bigint from ad_postings where start_date <= $1 and end_date >= $1",
    )
    .bind(now)
    .fetch_one(pool)
    .await
    .context("count_active_postings failed")?;
    Ok(n)
}

pub async fn add_proof(pool: &PgPool, posting_id: Uuid, new: &NewProof) -> Result<AdProof> {
    let (exists,): (bool,) =
        sqlx::query_as::<_, (bool,)>("select exists (select 1 from ad_postings where id = $1)")
            .bind(posting_id)
            .fetch_one(pool)
            .await
            .context("add_proof posting check failed")?;
    if !exists {
        return Err(DbError::NotFound("posting").into());
    }

    let row = sqlx::query(&format!(
        r#"
        insert into ad_proofs (id, posting_id, image_url, location, taken_at)
        values ($1, $2, $3, $4, coalesce($5, now()))
        returning {PROOF_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(posting_id)
    .bind(&new.image_url)
    .bind(&new.location)
    .bind(new.taken_at)
    .fetch_one(pool)
    .await
    .context("add_proof insert failed")?;
    proof_from_row(&row)
}
