//! Kernel utilities shared across slices.
//! Keep this crate lightweight; it re-exports the domain models and the layered config loader.
//!
//! ## Config loading
//! ```rust,no_run
//! use moe_kernel::config::load_config;
//! use moe_kernel::domain::config::Settings;
//!
//! let settings: Settings = load_config(Some("assets")).unwrap_or_default();
//! ```
pub mod config;

pub use moe_domain as domain;
