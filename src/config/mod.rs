//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults (schema.rs)
//!     → optional TOML file (loader.rs)
//!     → environment: NODE_ENV, SSR_TEST_BUILD (loader.rs)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the mode never changes at runtime
//! - All fields have defaults so zero-configuration startup works
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::DevConfig;
pub use schema::ListenerConfig;
pub use schema::Mode;
pub use schema::ObservabilityConfig;
pub use schema::ProductionConfig;
pub use schema::RuntimeConfig;
pub use schema::ServerConfig;
pub use schema::SiteConfig;
