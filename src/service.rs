use std::future::Future;
use std::sync::Arc;

use rmcp::{
    handler::server::{router::tool::ToolRouter, tool::Parameters},
    model::{CallToolResult, Content, ErrorData, ServerCapabilities, ServerInfo},
    ServerHandler,
};
use rmcp_macros::{tool, tool_handler, tool_router};
use serde::Serialize;

use crate::config::ThinkingConfig;
use crate::error::Result as ThinkingResult;
use crate::handlers::ToolHandlers;
use crate::models::{
    CompleteThinkingParams, ListProcessesParams, ProcessIdParams, StartThinkingParams, ThinkParams,
};
use crate::thinking::ThinkingStore;
use crate::validation::InputValidator;

/// Main service struct for the sequential thinking MCP server
#[derive(Clone)]
pub struct SequentialThinkingService {
    tool_router: ToolRouter<Self>,
    handlers: Arc<ToolHandlers>,
    config: ThinkingConfig,
}

impl SequentialThinkingService {
    /// Create a service from configuration loaded out of files and the environment
    pub async fn new() -> ThinkingResult<Self> {
        let config = ThinkingConfig::load()?;
        Self::with_config(config)
    }

    /// Create a service from an explicit configuration
    pub fn with_config(config: ThinkingConfig) -> ThinkingResult<Self> {
        config.validate()?;
        tracing::info!(
            "Initializing {} v{} (max {} processes)",
            config.server.name,
            config.server.version,
            config.store.max_processes
        );

        let store = Arc::new(ThinkingStore::new(config.store.clone()));
        let validator = Arc::new(InputValidator::new(&config.validation));
        let handlers = Arc::new(ToolHandlers::new(store, validator));

        Ok(Self {
            tool_router: Self::tool_router(),
            handlers,
            config,
        })
    }

    pub fn handlers(&self) -> &ToolHandlers {
        &self.handlers
    }
}

/// Wrap a handler result as a JSON tool result, logging failures under `tool`
fn into_tool_result<T: Serialize>(tool: &str, result: ThinkingResult<T>) -> std::result::Result<CallToolResult, ErrorData> {
    match result {
        Ok(response) => {
            let content = Content::json(response)
                .map_err(|e| ErrorData::internal_error(format!("Failed to create JSON content: {}", e), None))?;
            Ok(CallToolResult::success(vec![content]))
        }
        Err(e) => {
            tracing::error!("{} error: {}", tool, e);
            Err(ErrorData::from(e))
        }
    }
}

#[tool_router]
impl SequentialThinkingService {
    #[tool(description = "Start a sequential thinking process for a problem and return its process_id")]
    pub async fn start_thinking(
        &self,
        params: Parameters<StartThinkingParams>,
    ) -> std::result::Result<CallToolResult, ErrorData> {
        into_tool_result("start_thinking", self.handlers.start_thinking(params.0))
    }

    #[tool(description = "Record a thought step. Set revision=true or branch_alternative=true with parent_thought_number to revise or branch an earlier step")]
    pub async fn think(
        &self,
        params: Parameters<ThinkParams>,
    ) -> std::result::Result<CallToolResult, ErrorData> {
        into_tool_result("think", self.handlers.think(params.0))
    }

    #[tool(description = "Complete a thinking process, returning the synthesized solution, confidence and full step history")]
    pub async fn complete_thinking(
        &self,
        params: Parameters<CompleteThinkingParams>,
    ) -> std::result::Result<CallToolResult, ErrorData> {
        into_tool_result("complete_thinking", self.handlers.complete_thinking(params.0))
    }

    #[tool(description = "Get the full state of a thinking process")]
    pub async fn get_thinking_process(
        &self,
        params: Parameters<ProcessIdParams>,
    ) -> std::result::Result<CallToolResult, ErrorData> {
        into_tool_result("get_thinking_process", self.handlers.get_process(params.0))
    }

    #[tool(description = "List thinking processes held by the server")]
    pub async fn list_thinking_processes(
        &self,
        params: Parameters<ListProcessesParams>,
    ) -> std::result::Result<CallToolResult, ErrorData> {
        into_tool_result("list_thinking_processes", self.handlers.list_processes(params.0))
    }

    #[tool(description = "Delete a thinking process")]
    pub async fn delete_thinking_process(
        &self,
        params: Parameters<ProcessIdParams>,
    ) -> std::result::Result<CallToolResult, ErrorData> {
        into_tool_result("delete_thinking_process", self.handlers.delete_process(params.0))
    }
}

#[tool_handler]
impl ServerHandler for SequentialThinkingService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: rmcp::model::ProtocolVersion::V_2024_11_05,
            server_info: rmcp::model::Implementation {
                name: self.config.server.name.clone(),
                version: self.config.server.version.clone(),
            },
            capabilities: ServerCapabilities {
                tools: Some(Default::default()),
                ..Default::default()
            },
            instructions: Some(
                "Sequential thinking server: start a process, add thoughts (with revisions and branches), then complete it for a synthesized solution".into(),
            ),
        }
    }
}
