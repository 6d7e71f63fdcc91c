//! # dimensions-client
//!
//! A Rust client for the Dimensions DSL API.
//!
//! Provides:
//! - **Library**: async client that logs in, runs DSL queries with
//!   retry/re-login handling, and runs "loop" queries that page through
//!   large result sets
//! - **CLI**: `dimcli` binary for terminal use (`cli` feature)
//!
//! ## Quick Start
//!
//! ```no_run
//! # async fn example() -> dimensions_client::error::Result<()> {
//! use dimensions_client::{Credentials, DslClient};
//!
//! // Log in with explicit credentials (or use DslClient::from_profile("live"))
//! let creds = Credentials::new("https://app.dimensions.ai", "user", "secret")?;
//! let dsl = DslClient::connect(creds).await?;
//!
//! // A single query
//! let res = dsl.query(r#"search publications for "malaria" return publications"#).await?;
//! if let Some(total) = res.total_count() {
//!     println!("{} publications match", total);
//! }
//!
//! // Every matching record, one page at a time
//! let all = dsl
//!     .query_iterative(r#"search publications for "malaria" where times_cited > 200 return publications"#)
//!     .await?;
//! println!("fetched {:?}", all.keys_and_count());
//! # Ok(())
//! # }
//! ```

pub mod chunks;
pub mod client;
pub mod config;
pub mod describe;
pub mod error;
pub mod iterate;
pub mod rate_limit;
pub mod result;
pub mod retry;
pub mod session;

#[cfg(feature = "cli")]
pub mod setup;

// Re-export key types at the crate root.
pub use chunks::chunks_of;
pub use client::DslClient;
pub use config::Credentials;
pub use error::DslError;
pub use iterate::LoopOptions;
pub use result::{DslResult, Lookup};
pub use retry::RetryPolicy;
