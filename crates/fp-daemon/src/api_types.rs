//! Request and response types for all fp-daemon HTTP endpoints.
//!
//! These types are `Serialize + Deserialize` so they can be JSON-encoded
//! by Axum and decoded by tests. No business logic lives here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use fp_schemas::{
    AdPosting, AdProduct, AdProof, AdReview, Celeb, DashboardStats, Event, EventStatus,
    EventSummary, InquiryStatus, InquiryView, Locale, Order, OrderView, Place, PlaceInquiry,
    PostingView, ReviewQueueItem, ReviewStatus, Role, User,
};

// ---------------------------------------------------------------------------
// /v1/health  /v1/status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbStatusView {
    pub ok: bool,
    pub has_orders_table: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderNames {
    pub payments: String,
    pub storage: String,
    pub maps: String,
    pub mailer: String,
    pub rate_limiter: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub service: String,
    pub version: String,
    pub env: String,
    pub uptime_secs: u64,
    pub db: DbStatusView,
    pub providers: ProviderNames,
}

// ---------------------------------------------------------------------------
// /v1/auth
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    /// Defaults to FAN. ADMIN cannot be self-assigned.
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupResponse {
    pub user: User,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigninResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeResponse {
    pub user: User,
}

// ---------------------------------------------------------------------------
// Catalog: celebs, events, places
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocaleQuery {
    pub locale: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CelebView {
    #[serde(flatten)]
    pub celeb: Celeb,
    pub display_name: String,
}

impl CelebView {
    pub fn new(celeb: Celeb, locale: Locale) -> Self {
        let display_name = celeb.display_name(locale).to_string();
        Self {
            celeb,
            display_name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CelebsResponse {
    pub celebs: Vec<CelebView>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsQuery {
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub region: Option<String>,
    pub celeb_id: Option<Uuid>,
    pub locale: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventView {
    #[serde(flatten)]
    pub summary: EventSummary,
    pub display_title: String,
}

impl EventView {
    pub fn new(summary: EventSummary, locale: Locale) -> Self {
        let display_title = summary.event.display_title(locale).to_string();
        Self {
            summary,
            display_title,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsResponse {
    pub events: Vec<EventView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventResponse {
    pub event: EventView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub title: String,
    #[serde(default)]
    pub title_en: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub perks: Vec<String>,
    pub celeb_id: Uuid,
    #[serde(default)]
    pub place_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecordResponse {
    pub event: Event,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlacesQuery {
    pub region: Option<String>,
    pub locale: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceView {
    #[serde(flatten)]
    pub place: Place,
    pub display_name: String,
}

impl PlaceView {
    pub fn new(place: Place, locale: Locale) -> Self {
        let display_name = place.display_name(locale).to_string();
        Self {
            place,
            display_name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacesResponse {
    pub places: Vec<PlaceView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceDetailResponse {
    pub place: PlaceView,
    pub events: Vec<EventView>,
}

// ---------------------------------------------------------------------------
// /v1/place-inquiries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInquiryRequest {
    pub place_id: Uuid,
    pub message: String,
    #[serde(default)]
    pub event_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InquiryCreatedResponse {
    pub inquiry: PlaceInquiry,
    pub message: String,
}

/// `userId` is honoured for admins only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InquiriesQuery {
    pub user_id: Option<Uuid>,
    pub place_id: Option<Uuid>,
    pub status: Option<InquiryStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InquiriesResponse {
    pub inquiries: Vec<InquiryView>,
}

// ---------------------------------------------------------------------------
// Ads: products, checkout, reviews
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    #[serde(flatten)]
    pub product: AdProduct,
    pub display_title: String,
}

impl ProductView {
    pub fn new(product: AdProduct, locale: Locale) -> Self {
        let display_title = product.display_title(locale).to_string();
        Self {
            product,
            display_title,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductsResponse {
    pub products: Vec<ProductView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutBody {
    pub product_id: Uuid,
    #[serde(default)]
    pub addons: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub session_url: Option<String>,
    pub session_id: String,
    pub order_id: Uuid,
    pub order_number: String,
    /// Toss widget parameters; absent for hosted checkouts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_params: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmCheckoutRequest {
    pub order_id: Uuid,
    /// Required for Toss; Stripe confirms against the stored session.
    #[serde(default)]
    pub payment_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse {
    pub order: Order,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReviewRequest {
    pub design_urls: Vec<String>,
    #[serde(default)]
    pub copy_text: Option<String>,
    #[serde(default)]
    pub target_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewResponse {
    pub review: AdReview,
}

// ---------------------------------------------------------------------------
// /v1/webhooks/stripe
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAck {
    pub received: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub duplicate: bool,
}

// ---------------------------------------------------------------------------
// /v1/account
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountResponse {
    pub user: User,
    pub events: Vec<EventSummary>,
    pub orders: Vec<OrderView>,
    pub inquiries: Vec<InquiryView>,
}

// ---------------------------------------------------------------------------
// /v1/admin
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub stats: DashboardStats,
    pub review_queue: Vec<ReviewQueueItem>,
    pub postings: Vec<PostingView>,
    pub pending_inquiries: Vec<InquiryView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewDecisionRequest {
    pub status: ReviewStatus,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewDecisionResponse {
    pub review: AdReview,
    pub posting: Option<AdPosting>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InquiryDecisionRequest {
    pub status: InquiryStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InquiryResponse {
    pub inquiry: PlaceInquiry,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventStatusRequest {
    pub status: EventStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefundBody {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofRequest {
    pub image_url: String,
    pub location: String,
    #[serde(default)]
    pub taken_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofResponse {
    pub proof: AdProof,
}

// ---------------------------------------------------------------------------
// /v1/upload  /v1/maps
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadSignatureRequest {
    #[serde(default)]
    pub folder: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadQuery {
    pub folder: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub url: String,
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapConfigResponse {
    pub provider: String,
    pub token: Option<String>,
    pub is_mock: bool,
}
