// rzpchat-core/src/lib.rs

#![doc = include_str!("../../README.md")]

pub mod assistant;
pub mod catalog;
pub mod classifier;
pub mod config;
pub mod docs;
pub mod errors;
pub mod extract;
pub mod format;
pub mod mcp;

pub use assistant::{Assistant, Route};
pub use classifier::{classify, ClassifiedRequest};
pub use config::{AssistConfig, CredentialSource, Credentials};
pub use docs::{DocsAnswer, DocsClient, DocsSearch};
pub use errors::DispatchError;
pub use mcp::{JsonRpcResponse, McpClient, ToolTransport};

pub use async_trait::async_trait;
