//! Domain types shared by every FanPlace crate.

pub mod locale;
pub mod records;
pub mod status;
pub mod workflow;

pub use locale::{localized, Locale, ALL_LOCALES};
pub use records::*;
pub use status::{EventStatus, InquiryStatus, OrderStatus, ReviewStatus, Role};
pub use workflow::{order_number, posting_window};
