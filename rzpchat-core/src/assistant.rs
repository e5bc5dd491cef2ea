// rzpchat-core/src/assistant.rs

//! The single entry point every chat surface talks to.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::catalog::catalog_help_text;
use crate::classifier::{self, ClassifiedRequest};
use crate::docs::DocsSearch;
use crate::format;
use crate::mcp::ToolTransport;

pub const DOCS_DISABLED_MESSAGE: &str =
    "Documentation search is not configured. Set `docs.endpoint` in Rzpchat.toml to enable it.";

/// Which backend a chat message is sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Tools,
    Docs,
    /// Docs for questions, tools for commands; unmatched text goes to docs.
    Auto,
}

pub struct Assistant {
    tools: Arc<dyn ToolTransport>,
    docs: Option<Arc<dyn DocsSearch>>,
}

impl Assistant {
    pub fn new(tools: Arc<dyn ToolTransport>, docs: Option<Arc<dyn DocsSearch>>) -> Self {
        Self { tools, docs }
    }

    pub fn has_docs(&self) -> bool {
        self.docs.is_some()
    }

    /// Resolves `Auto` to a concrete route for `text`.
    pub fn resolve_route(&self, text: &str, route: Route) -> Route {
        match route {
            Route::Auto => {
                if self.docs.is_none() || classifier::is_help_request(text) {
                    Route::Tools
                } else if classifier::is_question(text) {
                    Route::Docs
                } else if classifier::match_rule(text).is_some() {
                    Route::Tools
                } else {
                    Route::Docs
                }
            }
            concrete => concrete,
        }
    }

    /// Answers one chat message. Every failure is rendered into the returned text.
    pub async fn respond(&self, text: &str, route: Route) -> String {
        let resolved = self.resolve_route(text, route);
        debug!(requested = ?route, resolved = ?resolved, "Routing chat message.");
        match resolved {
            Route::Docs => self.ask_docs(text).await,
            _ => self.run_command(text).await,
        }
    }

    /// Classifies `text`, dispatches the resulting tool call and formats the reply.
    pub async fn run_command(&self, text: &str) -> String {
        match classifier::classify(text) {
            ClassifiedRequest::ListTools => self.list_tools().await,
            ClassifiedRequest::NeedInput {
                tool,
                missing,
                message,
            } => {
                info!(tool = %tool, missing = %missing, "Command needs more input.");
                format::format_need_input(&tool, &missing, message.as_deref())
            }
            ClassifiedRequest::CallTool { tool, params } => {
                info!(tool = %tool, "Calling tool.");
                match self.tools.call_tool(&tool, params).await {
                    Ok(response) => format::format_tool_response(&response),
                    Err(e) => {
                        warn!(tool = %tool, error = %e, "Tool call failed.");
                        format::format_dispatch_error(&e)
                    }
                }
            }
        }
    }

    /// Remote tool listing, or the built-in catalog when the server cannot provide one.
    pub async fn list_tools(&self) -> String {
        let outcome = match self.tools.list_tools().await {
            Ok(response) => response.into_result(),
            Err(e) => Err(e),
        };
        match outcome {
            Ok(result)
                if result
                    .get("tools")
                    .and_then(|t| t.as_array())
                    .map_or(false, |t| !t.is_empty()) =>
            {
                format::format_tool_list(&result)
            }
            Ok(_) => {
                debug!("Server returned no tools; using built-in catalog.");
                catalog_help_text()
            }
            Err(e) => {
                warn!(error = %e, "tools/list failed; using built-in catalog.");
                format!(
                    "_Live tool list unavailable ({})._\n\n{}",
                    e,
                    catalog_help_text()
                )
            }
        }
    }

    pub async fn ask_docs(&self, question: &str) -> String {
        let Some(docs) = &self.docs else {
            return DOCS_DISABLED_MESSAGE.to_string();
        };
        match docs.ask(question).await {
            Ok(answer) => format::format_docs_answer(&answer),
            Err(e) => {
                warn!(error = %e, "Docs search failed.");
                format::format_dispatch_error(&e)
            }
        }
    }

    pub async fn reset_docs(&self) {
        if let Some(docs) = &self.docs {
            docs.reset().await;
        }
    }
}
