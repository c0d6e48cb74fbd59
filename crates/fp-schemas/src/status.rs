//! Status enums and their lifecycle rules.
//!
//! Wire form is the upper-case string stored in the database (`"PAID"`,
//! `"SUBMITTED"`, ...). The CHECK constraints in `fp-db/migrations` list the
//! same values; keep them in sync.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[default]
    Fan,
    Promoter,
    CafeOwner,
    Advertiser,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Fan => "FAN",
            Role::Promoter => "PROMOTER",
            Role::CafeOwner => "CAFE_OWNER",
            Role::Advertiser => "ADVERTISER",
            Role::Admin => "ADMIN",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "FAN" => Ok(Role::Fan),
            "PROMOTER" => Ok(Role::Promoter),
            "CAFE_OWNER" => Ok(Role::CafeOwner),
            "ADVERTISER" => Ok(Role::Advertiser),
            "ADMIN" => Ok(Role::Admin),
            other => Err(anyhow!("invalid role: {}", other)),
        }
    }

    /// Roles a user may pick for themselves at signup.
    pub fn is_self_assignable(&self) -> bool {
        !matches!(self, Role::Admin)
    }
}

// ---------------------------------------------------------------------------
// EventStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    Draft,
    Published,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Draft => "DRAFT",
            EventStatus::Published => "PUBLISHED",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "DRAFT" => Ok(EventStatus::Draft),
            "PUBLISHED" => Ok(EventStatus::Published),
            other => Err(anyhow!("invalid event status: {}", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// InquiryStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InquiryStatus {
    Requested,
    Connected,
    Declined,
}

impl InquiryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InquiryStatus::Requested => "REQUESTED",
            InquiryStatus::Connected => "CONNECTED",
            InquiryStatus::Declined => "DECLINED",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "REQUESTED" => Ok(InquiryStatus::Requested),
            "CONNECTED" => Ok(InquiryStatus::Connected),
            "DECLINED" => Ok(InquiryStatus::Declined),
            other => Err(anyhow!("invalid inquiry status: {}", other)),
        }
    }

    /// REQUESTED -> CONNECTED | DECLINED. Decided inquiries are final.
    pub fn can_transition_to(&self, next: InquiryStatus) -> bool {
        matches!(
            (self, next),
            (InquiryStatus::Requested, InquiryStatus::Connected)
                | (InquiryStatus::Requested, InquiryStatus::Declined)
        )
    }
}

// ---------------------------------------------------------------------------
// OrderStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Paid,
    Rejected,
    Refunded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Paid => "PAID",
            OrderStatus::Rejected => "REJECTED",
            OrderStatus::Refunded => "REFUNDED",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "PENDING" => Ok(OrderStatus::Pending),
            "PAID" => Ok(OrderStatus::Paid),
            "REJECTED" => Ok(OrderStatus::Rejected),
            "REFUNDED" => Ok(OrderStatus::Refunded),
            other => Err(anyhow!("invalid order status: {}", other)),
        }
    }

    /// PENDING -> PAID | REJECTED, PAID -> REFUNDED.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Paid)
                | (OrderStatus::Pending, OrderStatus::Rejected)
                | (OrderStatus::Paid, OrderStatus::Refunded)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Rejected | OrderStatus::Refunded)
    }
}

// ---------------------------------------------------------------------------
// ReviewStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
    Submitted,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Submitted => "SUBMITTED",
            ReviewStatus::Approved => "APPROVED",
            ReviewStatus::Rejected => "REJECTED",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "SUBMITTED" => Ok(ReviewStatus::Submitted),
            "APPROVED" => Ok(ReviewStatus::Approved),
            "REJECTED" => Ok(ReviewStatus::Rejected),
            other => Err(anyhow!("invalid review status: {}", other)),
        }
    }

    /// SUBMITTED -> APPROVED | REJECTED; a rejected creative may be resubmitted.
    pub fn can_transition_to(&self, next: ReviewStatus) -> bool {
        matches!(
            (self, next),
            (ReviewStatus::Submitted, ReviewStatus::Approved)
                | (ReviewStatus::Submitted, ReviewStatus::Rejected)
                | (ReviewStatus::Rejected, ReviewStatus::Submitted)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_lifecycle_allows_only_listed_edges() {
        use OrderStatus::*;
        let all = [Pending, Paid, Rejected, Refunded];
        let allowed = [(Pending, Paid), (Pending, Rejected), (Paid, Refunded)];
        for from in all {
            for to in all {
                assert_eq!(
                    from.can_transition_to(to),
                    allowed.contains(&(from, to)),
                    "{} -> {}",
                    from.as_str(),
                    to.as_str()
                );
            }
        }
    }

    #[test]
    fn refunded_and_rejected_are_terminal() {
        assert!(OrderStatus::Refunded.is_terminal());
        assert!(OrderStatus::Rejected.is_terminal());
        assert!(!OrderStatus::Paid.is_terminal());
    }

    #[test]
    fn review_can_be_resubmitted_after_rejection_only() {
        assert!(ReviewStatus::Rejected.can_transition_to(ReviewStatus::Submitted));
        assert!(!ReviewStatus::Approved.can_transition_to(ReviewStatus::Submitted));
        assert!(!ReviewStatus::Approved.can_transition_to(ReviewStatus::Rejected));
    }

    #[test]
    fn decided_inquiry_is_final() {
        assert!(!InquiryStatus::Connected.can_transition_to(InquiryStatus::Declined));
        assert!(!InquiryStatus::Declined.can_transition_to(InquiryStatus::Requested));
    }

    #[test]
    fn wire_strings_round_trip_and_unknown_is_rejected() {
        for r in [Role::Fan, Role::Promoter, Role::CafeOwner, Role::Advertiser, Role::Admin] {
            assert_eq!(Role::parse(r.as_str()).unwrap(), r);
        }
        assert!(OrderStatus::parse("paid").is_err());
        assert!(Role::parse("SUPERUSER").is_err());
    }

    #[test]
    fn serde_uses_upper_snake_case() {
        let s = serde_json::to_string(&Role::CafeOwner).unwrap();
        assert_eq!(s, "\"CAFE_OWNER\"");
        let r: ReviewStatus = serde_json::from_str("\"APPROVED\"").unwrap();
        assert_eq!(r, ReviewStatus::Approved);
    }

    #[test]
    fn admin_is_not_self_assignable() {
        assert!(!Role::Admin.is_self_assignable());
        assert!(Role::Advertiser.is_self_assignable());
    }
}
