//! Service layer for business logic
//!
//! This module contains the services that the login flow is assembled from:
//! failed-attempt lockout, login rate limiting and session management.

pub mod lockout;
pub mod rate_limit;
pub mod session;

pub use lockout::LockoutService;
pub use rate_limit::RateLimitService;
pub use session::SessionService;
