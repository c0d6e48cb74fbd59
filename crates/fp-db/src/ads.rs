//! Ad products and orders.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use fp_schemas::{order_number, AdProduct, Order, OrderStatus, OrderView, ReviewStatus};

use crate::DbError;

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

const PRODUCT_COLUMNS: &str =
    "id, title, title_en, description, price_krw, term_months, features, placement, image_url, active";

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub title: String,
    pub title_en: Option<String>,
    pub description: Option<String>,
    pub price_krw: i64,
    pub term_months: i32,
    pub features: Vec<String>,
    pub placement: Vec<String>,
    pub image_url: Option<String>,
}

fn product_from_row(row: &PgRow) -> Result<AdProduct> {
    Ok(AdProduct {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        title_en: row.try_get("title_en")?,
        description: row.try_get("description")?,
        price_krw: row.try_get("price_krw")?,
        term_months: row.try_get("term_months")?,
        features: row.try_get("features")?,
        placement: row.try_get("placement")?,
        image_url: row.try_get("image_url")?,
        active: row.try_get("active")?,
    })
}

/// Active products, cheapest first.
pub async fn list_active_products(pool: &PgPool) -> Result<Vec<AdProduct>> {
    let rows = sqlx::query(&format!(
        "select {PRODUCT_COLUMNS} from ad_products where active = true order by price_krw asc"
    ))
    .fetch_all(pool)
    .await
    .context("list_active_products failed")?;
    rows.iter().map(product_from_row).collect()
}

/// Inactive products are reported as not found; they cannot be bought.
pub async fn fetch_active_product(pool: &PgPool, product_id: Uuid) -> Result<AdProduct> {
    let row = sqlx::query(&format!(
        "select {PRODUCT_COLUMNS} from ad_products where id = $1 and active = true"
    ))
    .bind(product_id)
    .fetch_optional(pool)
    .await
    .context("fetch_active_product failed")?
    .ok_or(DbError::NotFound("product"))?;
    product_from_row(&row)
}

pub async fn insert_product(pool: &PgPool, new: &NewProduct) -> Result<AdProduct> {
    insert_product_with_id(pool, Uuid::new_v4(), new).await
}

pub(crate) async fn insert_product_with_id(
    pool: &PgPool,
    id: Uuid,
    new: &NewProduct,
) -> Result<AdProduct> {
    let row = sqlx::query(&format!(
        r#"
        insert into ad_products (
          id, title, title_en, description, price_krw, term_months, features, placement, image_url
        ) values (
          $1, $2, $3, $4, $5, $6, $7, $8, $9
        )
        on conflict (id) do update set title = excluded.title
        returning {PRODUCT_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(&new.title)
    .bind(&new.title_en)
    .bind(&new.description)
    .bind(new.price_krw)
    .bind(new.term_months)
    .bind(&new.features)
    .bind(&new.placement)
    .bind(&new.image_url)
    .fetch_one(pool)
    .await
    .context("insert_product failed")?;
    product_from_row(&row)
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// Note left on a SUBMITTED review when its order is refunded.
pub const REFUND_NOTE: &str = "order refunded";

const ORDER_COLUMNS: &str = "id, order_number, status, amount, currency, addons, payment_provider, \
     session_id, payment_intent_id, product_id, user_id, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub amount: i64,
    pub currency: String,
    pub payment_provider: String,
    pub addons: Option<Value>,
}

/// Outcome of [`transition_order`].
#[derive(Debug, Clone, PartialEq)]
pub enum OrderTransition {
    Applied(Order),
    /// The order already held the requested status; nothing was written.
    Unchanged(Order),
}

impl OrderTransition {
    pub fn order(&self) -> &Order {
        match self {
            OrderTransition::Applied(o) | OrderTransition::Unchanged(o) => o,
        }
    }

    pub fn into_order(self) -> Order {
        match self {
            OrderTransition::Applied(o) | OrderTransition::Unchanged(o) => o,
        }
    }

    pub fn was_applied(&self) -> bool {
        matches!(self, OrderTransition::Applied(_))
    }
}

pub(crate) fn order_from_row(row: &PgRow) -> Result<Order> {
    Ok(Order {
        id: row.try_get("id")?,
        order_number: row.try_get("order_number")?,
        status: OrderStatus::parse(&row.try_get::<String, _>("status")?)?,
        amount: row.try_get("amount")?,
        currency: row.try_get("currency")?,
        addons: row.try_get("addons")?,
        payment_provider: row.try_get("payment_provider")?,
        session_id: row.try_get("session_id")?,
        payment_intent_id: row.try_get("payment_intent_id")?,
        product_id: row.try_get("product_id")?,
        user_id: row.try_get("user_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Create a PENDING order with a generated order number.
pub async fn insert_order(pool: &PgPool, new: &NewOrder) -> Result<Order> {
    insert_order_with(pool, Uuid::new_v4(), new, OrderStatus::Pending).await
}

pub(crate) async fn insert_order_with(
    pool: &PgPool,
    id: Uuid,
    new: &NewOrder,
    status: OrderStatus,
) -> Result<Order> {
    let row = sqlx::query(&format!(
        r#"
        insert into orders (
          id, order_number, status, amount, currency, addons, payment_provider, product_id, user_id
        ) values (
          $1, $2, $3, $4, $5, $6, $7, $8, $9
        )
        on conflict (id) do update set updated_at = orders.updated_at
        returning {ORDER_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(order_number(Utc::now(), id))
    .bind(status.as_str())
    .bind(new.amount)
    .bind(&new.currency)
    .bind(&new.addons)
    .bind(&new.payment_provider)
    .bind(new.product_id)
    .bind(new.user_id)
    .fetch_one(pool)
    .await
    .context("insert_order failed")?;
    order_from_row(&row)
}

/// Record the provider checkout session on a PENDING order.
pub async fn set_order_session(pool: &PgPool, order_id: Uuid, session_id: &str) -> Result<()> {
    let res = sqlx::query(
        r#"
        update orders
        set session_id = $2,
            updated_at = now()
        where id = $1
        "#,
    )
    .bind(order_id)
    .bind(session_id)
    .execute(pool)
    .await
    .context("set_order_session failed")?;

    if res.rows_affected() == 0 {
        return Err(DbError::NotFound("order").into());
    }
    Ok(())
}

pub async fn fetch_order(pool: &PgPool, order_id: Uuid) -> Result<Order> {
    let row = sqlx::query(&format!("select {ORDER_COLUMNS} from orders where id = $1"))
        .bind(order_id)
        .fetch_optional(pool)
        .await
        .context("fetch_order failed")?
        .ok_or(DbError::NotFound("order"))?;
    order_from_row(&row)
}

pub async fn fetch_order_by_session(pool: &PgPool, session_id: &str) -> Result<Order> {
    let row = sqlx::query(&format!(
        "select {ORDER_COLUMNS} from orders where session_id = $1"
    ))
    .bind(session_id)
    .fetch_optional(pool)
    .await
    .context("fetch_order_by_session failed")?
    .ok_or(DbError::NotFound("order"))?;
    order_from_row(&row)
}

/// Move an order to `next`.
///
/// The row is locked for the duration of the check so concurrent webhook
/// and confirm calls serialize. Requesting the status the order already has
/// is `Unchanged`; any other move outside the lifecycle is
/// `DbError::InvalidTransition`. `payment_intent_id`, when given, is stored
/// alongside the new status.
pub async fn transition_order(
    pool: &PgPool,
    order_id: Uuid,
    next: OrderStatus,
    payment_intent_id: Option<&str>,
) -> Result<OrderTransition> {
    let mut tx = pool.begin().await.context("transition_order begin failed")?;

    let row = sqlx::query(&format!(
        "select {ORDER_COLUMNS} from orders where id = $1 for update"
    ))
    .bind(order_id)
    .fetch_optional(&mut *tx)
    .await
    .context("transition_order select failed")?
    .ok_or(DbError::NotFound("order"))?;
    let current = order_from_row(&row)?;

    if current.status == next {
        tx.rollback().await.context("transition_order rollback failed")?;
        return Ok(OrderTransition::Unchanged(current));
    }
    if !current.status.can_transition_to(next) {
        return Err(DbError::InvalidTransition {
            entity: "order",
            from: current.status.as_str(),
            to: next.as_str(),
        }
        .into());
    }

    let row = sqlx::query(&format!(
        r#"
        update orders
        set status = $2,
            payment_intent_id = coalesce($3, payment_intent_id),
            updated_at = now()
        where id = $1
        returning {ORDER_COLUMNS}
        "#
    ))
    .bind(order_id)
    .bind(next.as_str())
    .bind(payment_intent_id)
    .fetch_one(&mut *tx)
    .await
    .context("transition_order update failed")?;
    let updated = order_from_row(&row)?;

    if next == OrderStatus::Refunded {
        // Creative still waiting for review can never be posted now.
        let closed = sqlx::query(
            r#"
            update ad_reviews
            set status = 'REJECTED',
                note = $2,
                reviewed_at = now()
            where order_id = $1 and status = 'SUBMITTED'
            "#,
        )
        .bind(order_id)
        .bind(REFUND_NOTE)
        .execute(&mut *tx)
        .await
        .context("transition_order review close failed")?;
        if closed.rows_affected() > 0 {
            info!(order_id = %order_id, "open review rejected on refund");
        }
    }

    tx.commit().await.context("transition_order commit failed")?;

    info!(
        order_id = %order_id,
        from = current.status.as_str(),
        to = next.as_str(),
        "order transitioned"
    );
    Ok(OrderTransition::Applied(updated))
}

/// A user's orders, newest first, with review and posting summaries.
pub async fn list_orders_by_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<OrderView>> {
    let rows = sqlx::query(
        r#"
        select
          o.id, o.order_number, o.status, o.amount, o.currency, o.addons, o.payment_provider,
          o.session_id, o.payment_intent_id, o.product_id, o.user_id, o.created_at, o.updated_at,
          p.title as product_title,
          p.term_months,
          r.status as review_status,
          ps.start_date as posting_start,
          ps.end_date as posting_end
        from orders o
        join ad_products p on p.id = o.product_id
        left join ad_reviews r on r.order_id = o.id
        left join ad_postings ps on ps.order_id = o.id
        where o.user_id = $1
        order by o.created_at desc
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("list_orders_by_user failed")?;

    rows.iter()
        .map(|row| {
            let review_status = row
                .try_get::<Option<String>, _>("review_status")?
                .map(|s| ReviewStatus::parse(&s))
                .transpose()?;
            Ok(OrderView {
                order: order_from_row(row)?,
                product_title: row.try_get("product_title")?,
                term_months: row.try_get("term_months")?,
                review_status,
                posting_start: row.try_get("posting_start")?,
                posting_end: row.try_get("posting_end")?,
            })
        })
        .collect()
}

/// Count orders, optionally by status.
pub async fn count_orders(pool: &PgPool, status: Option<OrderStatus>) -> Result<i64> {
    let (n,): (i64,) = sqlx::query_as::<_, (i64,)>(
        "select count(*)::bigint from orders where ($1::text is null or status = $1)",
    )
    .bind(status.map(|s| s.as_str()))
    .fetch_one(pool)
    .await
    .context("count_orders failed")?;
    Ok(n)
}

/// Reject PENDING orders created more than `ttl` ago. Returns the ids moved.
pub async fn expire_stale_pending_orders(pool: &PgPool, ttl: Duration) -> Result<Vec<Uuid>> {
    expire_pending_orders_before(pool, Utc::now() - ttl).await
}

pub async fn expire_pending_orders_before(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
) -> Result<Vec<Uuid>> {
    let ids = sqlx::query_as::<_, (Uuid,)>(
        r#"
        update orders
        set status = 'REJECTED',
            updated_at = now()
        where status = 'PENDING'
          and created_at < $1
        returning id
        "#,
    )
    .bind(cutoff)
    .fetch_all(pool)
    .await
    .context("expire_stale_pending_orders failed")?
    .into_iter()
    .map(|(id,)| id)
    .collect::<Vec<_>>();

    if !ids.is_empty() {
        info!(count = ids.len(), cutoff = %cutoff, "expired stale pending orders");
    }
    Ok(ids)
}
