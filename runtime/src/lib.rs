//! # Fleet Allocation Runtime
//!
//! The service layer around the pure reconciler.
//!
//! ## Core Components
//!
//! - **[`AllocationService`]**: booking and vehicle operations with
//!   permission checks, auditing and atomic booking edits
//! - **[`NotificationDispatcher`]**: parallel, retried, fire-and-forget
//!   vendor notifications
//! - **[`ServiceConfig`]**: environment-driven configuration
//! - **[`metrics`]** / **[`telemetry`]**: Prometheus metrics and tracing setup
//!
//! ## Example
//!
//! ```no_run
//! use fleet_allocation_runtime::{ServiceConfig, telemetry};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServiceConfig::from_env()?;
//! telemetry::init_tracing(&config.log_filter)?;
//! # Ok(())
//! # }
//! ```

/// Service configuration from the environment
pub mod config;

/// Parallel notification delivery
pub mod dispatch;

/// Prometheus metrics for observability
pub mod metrics;

/// Retry logic with exponential backoff
pub mod retry;

/// Booking and vehicle-assignment operations
pub mod service;

/// Tracing subscriber setup
pub mod telemetry;

pub use config::{ConfigError, DatabaseConfig, ServiceConfig};
pub use dispatch::{DispatchReport, NotificationDispatcher};
pub use retry::RetryPolicy;
pub use service::{
    AllocationService, BookingChange, DEFAULT_ACTIVITY_LIMIT, RECENT_ACTIVITY_DAYS,
    VendorBookingSummary,
};
