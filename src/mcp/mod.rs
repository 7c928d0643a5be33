//! MCP (Model Context Protocol) Server Implementation
//!
//! JSON-RPC 2.0 over newline-delimited stdio, exposing the todo store as
//! five tools and three read-only resources (protocol version 2024-11-05).

pub mod errors;
pub mod protocol;
pub mod resources;
pub mod server;
pub mod tools;
pub mod validation;


pub use errors::{McpError, McpResult};
pub use server::{ConnectionState, McpServer};
