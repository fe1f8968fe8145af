use std::sync::Arc;

use rmcp::{
    ServerHandler,
    ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult,
        Content,
        Implementation,
        ServerCapabilities,
        ServerInfo,
    },
    tool,
    tool_handler,
    tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    error::{self, Error},
    service::{DocsService, ReadOutcome, SearchResponse},
};

#[derive(Clone)]
pub struct KarpdocsMcpServer {
    service: Arc<DocsService>,
    tool_router: ToolRouter<Self>,
}

impl KarpdocsMcpServer {
    pub fn new(service: DocsService) -> Self {
        Self {
            service: Arc::new(service),
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router(router = tool_router)]
impl KarpdocsMcpServer {
    /// Keyword search over the indexed Karpenter documentation.
    #[tool(
        name = "search_documentation",
        description = "Search the Karpenter documentation. Returns ranked pages with highlighted snippets; optionally restrict to a top-level section such as \"docs\"."
    )]
    pub async fn search_documentation(
        &self,
        params: Parameters<SearchParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let params = params.0;
        let response = self
            .service
            .search_documentation(
                &params.query,
                params.section.as_deref(),
                params.limit,
            )
            .map_err(|e| mcp_error("search failed", e))?;

        let summary = format_search_summary(&response);
        let structured = serde_json::to_value(&response)
            .map_err(|e| internal("failed to serialize search results", e))?;

        let mut result = CallToolResult::success(vec![Content::text(summary)]);
        result.structured_content = Some(structured);
        result.is_error = Some(false);
        Ok(result)
    }

    /// Full content of one documentation page.
    #[tool(
        name = "read_documentation",
        description = "Read a Karpenter documentation page by the path returned from search_documentation, e.g. \"docs/concepts/nodepools.md\"."
    )]
    pub async fn read_documentation(
        &self,
        params: Parameters<ReadParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let outcome = self
            .service
            .read_documentation(&params.0.path)
            .map_err(|e| mcp_error("read failed", e))?;

        let structured = serde_json::to_value(&outcome)
            .map_err(|e| internal("failed to serialize document", e))?;

        let (text, is_error) = match &outcome {
            ReadOutcome::Found(view) => (
                format!(
                    "# {}\n\nURL: {}\n\n{}",
                    view.title, view.url, view.content
                ),
                false,
            ),
            ReadOutcome::NotFound { path } => {
                (format!("Document not found: {path}"), true)
            }
        };

        let mut result = CallToolResult::success(vec![Content::text(text)]);
        result.structured_content = Some(structured);
        result.is_error = Some(is_error);
        Ok(result)
    }
}

#[tool_handler(router = self.tool_router)]
impl ServerHandler for KarpdocsMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo::new(ServerCapabilities::builder().enable_tools().build())
            .with_server_info(
                Implementation::new("karpdocs", env!("CARGO_PKG_VERSION"))
                    .with_title("Karpenter documentation")
                    .with_website_url("https://karpenter.sh"),
            )
            .with_instructions(
                "Use search_documentation to find Karpenter documentation pages, then read_documentation with a result path to get the full page.",
            )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchParams {
    /// Search query, e.g. "nodepool disruption budgets".
    pub query: String,
    /// Only return pages from this top-level section (e.g. "docs").
    pub section: Option<String>,
    /// Maximum number of results, 1 to 50 (default: 10).
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReadParams {
    /// Page path relative to the documentation root.
    pub path: String,
}

fn format_search_summary(response: &SearchResponse) -> String {
    let query = &response.query;
    if response.results.is_empty() {
        return format!("No results found for \"{query}\"");
    }

    let mut lines = Vec::with_capacity(response.results.len() + 1);
    let suffix = if response.result_count == 1 { "" } else { "s" };
    lines.push(format!(
        "Found {} result{} for \"{query}\":",
        response.result_count, suffix
    ));

    for hit in &response.results {
        lines.push(format!(
            "{:.3} {} ({})\n  {}",
            hit.relevance_score, hit.title, hit.path, hit.url
        ));
    }

    lines.join("\n")
}

/// Caller mistakes become `invalid_params`; everything else is internal.
fn mcp_error(message: &str, error: Error) -> rmcp::ErrorData {
    match error {
        Error::Validation(e) => {
            rmcp::ErrorData::invalid_params(e.to_string(), None)
        }
        other => internal(message, other),
    }
}

fn internal(message: &str, error: impl std::fmt::Display) -> rmcp::ErrorData {
    rmcp::ErrorData::internal_error(
        message.to_string(),
        Some(json!({ "error": error.to_string() })),
    )
}

/// Serve the two documentation tools over stdio until the client leaves.
pub fn run_mcp(service: DocsService) -> error::Result<()> {
    let server = KarpdocsMcpServer::new(service);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| {
            Error::Config(format!("failed to start tokio runtime: {e}"))
        })?;

    runtime.block_on(async move {
        let transport = rmcp::transport::stdio();
        let running = server.serve(transport).await.map_err(|e| {
            Error::Config(format!("MCP server initialization failed: {e}"))
        })?;
        running
            .waiting()
            .await
            .map_err(|e| Error::Config(format!("MCP server error: {e}")))?;
        Ok(())
    })
}
