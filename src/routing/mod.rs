//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request target (path + query)
//!     → router.rs (site lookup, in order)
//!     → matcher.rs (prefix test, prefix → "/")
//!     → Return: SiteMatch { ApplicationContext, render URL } or None
//! ```
//!
//! # Design Decisions
//! - Contexts built once at startup, immutable at runtime
//! - Prefix matching only
//! - First match wins

pub mod context;
pub mod matcher;
pub mod router;

pub use context::{ApplicationContext, Resolved};
pub use matcher::PathPrefixMatcher;
pub use router::{SiteMatch, SiteRouter};
