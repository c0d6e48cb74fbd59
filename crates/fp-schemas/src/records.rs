//! Records as read from the database and returned by the HTTP API.
//!
//! Field names serialize in camelCase; the browser client consumes these
//! shapes directly.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::locale::{localized, Locale};
use crate::status::{EventStatus, InquiryStatus, OrderStatus, ReviewStatus, Role};

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Public view of a user. The password hash never leaves `fp-db`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
}

// ---------------------------------------------------------------------------
// Catalog: celebs, places, events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Celeb {
    pub id: Uuid,
    pub name: String,
    pub name_en: Option<String>,
    pub name_ja: Option<String>,
    pub name_zh: Option<String>,
    pub image_url: Option<String>,
    pub group_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
}

impl Celeb {
    pub fn display_name(&self, locale: Locale) -> &str {
        let other = match locale {
            Locale::Ko => None,
            Locale::En => self.name_en.as_deref(),
            Locale::Ja => self.name_ja.as_deref(),
            Locale::Zh => self.name_zh.as_deref(),
        };
        localized(&self.name, other)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CelebRef {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub id: Uuid,
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
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Place {
    pub fn display_name(&self, locale: Locale) -> &str {
        match locale {
            Locale::Ko => &self.name,
            _ => localized(&self.name, self.name_en.as_deref()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceRef {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub title_en: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub perks: Vec<String>,
    pub status: EventStatus,
    pub celeb_id: Uuid,
    pub place_id: Option<Uuid>,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn display_title(&self, locale: Locale) -> &str {
        match locale {
            Locale::Ko => &self.title,
            _ => localized(&self.title, self.title_en.as_deref()),
        }
    }
}

/// Event joined with its celeb and (optional) venue, as listed on the
/// events page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    #[serde(flatten)]
    pub event: Event,
    pub celeb: CelebRef,
    pub place: Option<PlaceRef>,
}

// ---------------------------------------------------------------------------
// Place inquiries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceInquiry {
    pub id: Uuid,
    pub place_id: Uuid,
    pub user_id: Uuid,
    pub message: String,
    pub event_date: Option<DateTime<Utc>>,
    pub status: InquiryStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InquiryPlace {
    pub id: Uuid,
    pub name: String,
    pub image_urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InquiryView {
    #[serde(flatten)]
    pub inquiry: PlaceInquiry,
    pub place: InquiryPlace,
    pub user: UserRef,
}

// ---------------------------------------------------------------------------
// Ads: products, orders, reviews, postings, proofs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdProduct {
    pub id: Uuid,
    pub title: String,
    pub title_en: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "priceKRW")]
    pub price_krw: i64,
    pub term_months: i32,
    pub features: Vec<String>,
    pub placement: Vec<String>,
    pub image_url: Option<String>,
    pub active: bool,
}

impl AdProduct {
    pub fn display_title(&self, locale: Locale) -> &str {
        match locale {
            Locale::Ko => &self.title,
            _ => localized(&self.title, self.title_en.as_deref()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub status: OrderStatus,
    pub amount: i64,
    pub currency: String,
    pub addons: Option<Value>,
    pub payment_provider: String,
    pub session_id: Option<String>,
    pub payment_intent_id: Option<String>,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdReview {
    pub id: Uuid,
    pub order_id: Uuid,
    pub status: ReviewStatus,
    pub design_urls: Vec<String>,
    pub copy_text: Option<String>,
    pub target_date: Option<DateTime<Utc>>,
    pub note: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdPosting {
    pub id: Uuid,
    pub order_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub locations: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl AdPosting {
    /// A posting is live while `start_date <= now <= end_date`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.start_date <= now && now <= self.end_date
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdProof {
    pub id: Uuid,
    pub posting_id: Uuid,
    pub image_url: String,
    pub location: String,
    pub taken_at: DateTime<Utc>,
}

/// Order row as shown on the account page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub product_title: String,
    pub term_months: i32,
    pub review_status: Option<ReviewStatus>,
    pub posting_start: Option<DateTime<Utc>>,
    pub posting_end: Option<DateTime<Utc>>,
}

/// Review joined with its order context for the admin queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewQueueItem {
    #[serde(flatten)]
    pub review: AdReview,
    pub order_number: String,
    pub amount: i64,
    pub product_title: String,
    pub customer: UserRef,
}

/// Posting joined with order context and its proofs for the admin screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostingView {
    #[serde(flatten)]
    pub posting: AdPosting,
    pub order_number: String,
    pub product_title: String,
    pub customer_name: Option<String>,
    pub proofs: Vec<AdProof>,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub pending_reviews: i64,
    pub active_postings: i64,
    pub pending_inquiries: i64,
    pub total_orders: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn posting(start: DateTime<Utc>, end: DateTime<Utc>) -> AdPosting {
        AdPosting {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            start_date: start,
            end_date: end,
            locations: vec!["subway".to_string()],
            created_at: start,
        }
    }

    #[test]
    fn posting_active_window_is_inclusive() {
        let now = Utc::now();
        let p = posting(now, now + Duration::days(30));
        assert!(p.is_active(now));
        assert!(p.is_active(now + Duration::days(30)));
        assert!(!p.is_active(now - Duration::seconds(1)));
        assert!(!p.is_active(now + Duration::days(31)));
    }

    #[test]
    fn celeb_display_name_per_locale() {
        let c = Celeb {
            id: Uuid::new_v4(),
            name: "지민".to_string(),
            name_en: Some("Jimin".to_string()),
            name_ja: Some("ジミン".to_string()),
            name_zh: None,
            image_url: None,
            group_name: Some("BTS".to_string()),
            birth_date: None,
        };
        assert_eq!(c.display_name(Locale::Ko), "지민");
        assert_eq!(c.display_name(Locale::En), "Jimin");
        assert_eq!(c.display_name(Locale::Ja), "ジミン");
        assert_eq!(c.display_name(Locale::Zh), "지민");
    }

    #[test]
    fn product_price_serializes_with_krw_suffix() {
        let p = AdProduct {
            id: Uuid::nil(),
            title: "버스 랩핑 광고 (3개월)".to_string(),
            title_en: None,
            description: None,
            price_krw: 5_000_000,
            term_months: 3,
            features: vec![],
            placement: vec!["bus".to_string()],
            image_url: None,
            active: true,
        };
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["priceKRW"], 5_000_000);
        assert_eq!(v["termMonths"], 3);
        assert_eq!(p.display_title(Locale::En), "버스 랩핑 광고 (3개월)");
    }
}
