//! The `ratelimit` module decides whether a caller may publish.
//!
//! It keeps one fixed-window counter per caller identity (normally the
//! remote IP address) and answers `check_limit` with `true` when the caller
//! has used up its window. An optional sweeper evicts identities that have
//! gone quiet so the map does not grow for the whole process lifetime.

pub mod clock;
pub mod limiter;
pub mod sweeper;

pub use clock::{Clock, ManualClock, SystemClock};
pub use limiter::{LimitPolicy, RateLimitEntry, WindowRateLimiter};
pub use sweeper::EvictionSweeper;
