//! Optional third-party integrations. Each has a real adapter and a no-op
//! stand-in used when credentials are absent.

pub mod email;
pub mod maps;
pub mod rate_limit;

pub use email::{build_mailer, DisabledMailer, Email, Mailer, ResendMailer, SendOutcome};
pub use maps::{build_map_provider, MapProvider, MapboxProvider, MockMapProvider};
pub use rate_limit::{build_rate_limiter, client_ip, NoopLimiter, RateDecision, RateLimiter, UpstashLimiter};
