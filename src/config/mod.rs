//! Client settings.
//!
//! # Data Flow
//! ```text
//! ClientSettings::default()
//!     → loader.rs (optional --settings TOML file)
//!     → command-line flag overrides (cli/args.rs)
//!     → validation.rs (range checks)
//!     → ClientSettings (immutable for the rest of the run)
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal settings files
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_settings, validated, SettingsError};
pub use schema::{ClientSettings, TimeoutSettings};
