//! Unified configuration layer.
//!
//! Every environment variable read lives here; the rest of the workspace goes through
//! the structured configs instead of calling `std::env::var` directly.
//!
//! - `loader`: `env_or`, `env_optional`, `env_bool`, `env_parse` helpers
//! - `schema`: `ObservabilityConfig`, `ForkConfig`
//! - `env_keys`: key constants

pub mod env_keys;
pub mod loader;
pub mod schema;

pub use loader::{env_bool, env_optional, env_or, env_parse, load_dotenv, parse_bool};
pub use schema::{ForkConfig, ObservabilityConfig};
