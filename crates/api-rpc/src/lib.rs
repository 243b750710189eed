//! JSON-RPC API Layer
//!
//! JSON-RPC 2.0 operator surface of the screening engine.

pub mod error;
pub mod handler;
pub mod rate_limiter;
pub mod server;
pub mod types;

pub use handler::{RpcHandler, RpcServices};
pub use rate_limiter::RateLimiter;
pub use server::{RpcServer, RpcServerConfig};
