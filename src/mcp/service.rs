//! MCP service implementation using rmcp.
//!
//! This module defines the DbService struct with all database tools
//! exposed via the MCP protocol using the rmcp framework's macros.

use crate::db::DatabaseProvider;
use crate::tools::diagnostics::DiagnosticsToolHandler;
use crate::tools::query::{QueryInput, QueryToolHandler};
use crate::tools::schema::{DescribeTableInput, SchemaInput, SchemaToolHandler};
use crate::tools::ToolReport;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct DbService {
    /// Shared connection provider for all database operations
    provider: Arc<DatabaseProvider>,
    /// Schema used when a tool call names none
    default_schema: String,
    /// Tool router for MCP tool dispatch (auto-generated)
    tool_router: ToolRouter<Self>,
}

impl DbService {
    /// Create a new DbService instance.
    ///
    /// # Arguments
    ///
    /// * `provider` - Shared connection provider, opened before the service is served
    /// * `default_schema` - Schema for calls that omit one
    pub fn new(provider: Arc<DatabaseProvider>, default_schema: impl Into<String>) -> Self {
        Self {
            provider,
            default_schema: default_schema.into(),
            tool_router: Self::tool_router(),
        }
    }

    pub fn default_schema(&self) -> &str {
        &self.default_schema
    }

    fn schema_handler(&self) -> SchemaToolHandler<DatabaseProvider> {
        SchemaToolHandler::new(self.provider.clone(), self.default_schema.clone())
    }

    fn diagnostics_handler(&self) -> DiagnosticsToolHandler<DatabaseProvider> {
        DiagnosticsToolHandler::new(self.provider.clone(), self.default_schema.clone())
    }
}

#[tool_router]
impl DbService {
    #[tool(
        description = "Execute a SQL statement against the configured database.\nSELECT returns a list of row objects keyed by column name.\nINSERT/UPDATE/DELETE/DDL return [{affected_rows, operation: \"completed\"}].\nOn failure returns {error, sql}."
    )]
    async fn query(
        &self,
        Parameters(input): Parameters<QueryInput>,
    ) -> Result<CallToolResult, McpError> {
        let handler = QueryToolHandler::new(self.provider.clone());
        handler.query(input).await?.into_call_result()
    }

    #[tool(
        description = "List tables and views in a schema.\nEach entry has table_name, table_type (table/view/other) and row_count (\"N/A\" for views or when counting fails).\nSchema defaults to the server's configured schema."
    )]
    async fn list_tables(
        &self,
        Parameters(input): Parameters<SchemaInput>,
    ) -> Result<CallToolResult, McpError> {
        self.schema_handler()
            .list_tables(input)
            .await?
            .into_call_result()
    }

    #[tool(
        description = "Describe a table: columns, constraints, row count, storage size and summary counts.\nOn Vertica also lists the table's projections.\nSchema defaults to the server's configured schema."
    )]
    async fn describe_table(
        &self,
        Parameters(input): Parameters<DescribeTableInput>,
    ) -> Result<CallToolResult, McpError> {
        self.schema_handler()
            .describe_table(input)
            .await?
            .into_call_result()
    }

    #[tool(
        description = "List foreign-key relationships in a schema with a ready-to-run JOIN query per relationship.\nSchema defaults to the server's configured schema."
    )]
    async fn list_relationships(
        &self,
        Parameters(input): Parameters<SchemaInput>,
    ) -> Result<CallToolResult, McpError> {
        self.schema_handler()
            .list_relationships(input)
            .await?
            .into_call_result()
    }

    #[tool(
        description = "Example queries for the connected backend (catalog lookups, sizes, sessions), parameterized by schema."
    )]
    async fn query_hints(
        &self,
        Parameters(input): Parameters<SchemaInput>,
    ) -> Result<CallToolResult, McpError> {
        let output = self.diagnostics_handler().query_hints(input.schema.as_deref());
        ToolReport::Success(output).into_call_result()
    }

    #[tool(
        description = "Test the database connection.\nReturns user, database, server version, table count in the default schema and the masked connection URL, or status \"failed\" with the error."
    )]
    async fn test_connection(&self) -> Result<CallToolResult, McpError> {
        let status = self.diagnostics_handler().test_connection().await;
        ToolReport::Success(status).into_call_result()
    }
}

#[tool_handler]
impl ServerHandler for DbService {
    fn get_info(&self) -> ServerInfo {
        let backend = self.provider.settings().backend;
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "catalog-mcp-server".to_owned(),
                title: Some("Catalog MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(format!(
                "SQL and schema tools for a {backend} database.\n\
                \n\
                ## Workflow\n\
                1. Call `test_connection` to confirm the database is reachable\n\
                2. Call `list_tables` and `describe_table` to learn the schema\n\
                3. Call `list_relationships` for join paths between tables\n\
                4. Run SQL with `query`; `query_hints` lists useful catalog queries\n\
                \n\
                ## Schemas\n\
                Tools that take `schema` default to `{schema}` when it is omitted.\n\
                \n\
                ## Errors\n\
                Failed statements and catalog lookups return an object with an `error` field\n\
                instead of failing the call.",
                schema = self.default_schema,
            )),
        }
    }
}
