//! Thin clients for the hosting platform.
//!
//! Two surfaces are covered:
//! - [`SqlApiClient`]: the SQL statements REST API (scalar `SELECT`s,
//!   `SHOW`/`DESC` metadata, `CORTEX.COMPLETE`).
//! - [`CortexSearchClient`]: discovery and querying of Cortex Search services.
//!
//! Authentication is token based; acquiring the token is left to the operator.

pub mod config;
pub mod cortex_search;
pub mod errors;
pub mod sql_api;

pub use config::{SnowflakeConfig, TokenType};
pub use cortex_search::{CortexSearchClient, CortexSearchService, SearchRecord};
pub use errors::{Result, SnowflakeError};
pub use sql_api::{Binding, ResultSet, SqlApiClient};
