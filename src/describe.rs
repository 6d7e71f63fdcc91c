//! Schema description queries.

use crate::client::DslClient;
use crate::error::Result;
use crate::result::DslResult;

impl DslClient {
    /// Describe the whole DSL schema (sources and entities).
    pub async fn describe(&self) -> Result<DslResult> {
        self.query("describe").await
    }

    /// Describe a single source, e.g. `publications`.
    pub async fn describe_source(&self, source: &str) -> Result<DslResult> {
        self.query(&format!("describe source {}", source)).await
    }

    /// Describe a single entity, e.g. `journals`.
    pub async fn describe_entity(&self, entity: &str) -> Result<DslResult> {
        self.query(&format!("describe entity {}", entity)).await
    }
}
