//! JSON-RPC Server
//!
//! JSON-RPC 2.0 over HTTP on a localhost TCP port.

use crate::handler::RpcHandler;
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::RpcModule;
use std::net::SocketAddr;
use tracing::info;

pub const DEFAULT_RPC_HOST: &str = "127.0.0.1";
pub const DEFAULT_RPC_PORT: u16 = 9640;

#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    pub host: String,
    /// 0 picks a free port
    pub port: u16,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
        }
    }
}

pub struct RpcServer {
    config: RpcServerConfig,
    handler: RpcHandler,
}

/// Register `$method` so that its params parse into the handler's request type
macro_rules! route {
    ($module:expr, $name:literal, $method:ident) => {
        $module
            .register_async_method($name, |params, handler, _| async move {
                handler.$method(params.parse()?).await
            })
            .map_err(|e| e.to_string())?;
    };
    // Params may be omitted entirely
    ($module:expr, $name:literal, $method:ident, optional) => {
        $module
            .register_async_method($name, |params, handler, _| async move {
                let request = params.parse::<Option<_>>()?.unwrap_or_default();
                handler.$method(request).await
            })
            .map_err(|e| e.to_string())?;
    };
}

impl RpcServer {
    pub fn new(config: RpcServerConfig, handler: RpcHandler) -> Self {
        Self { config, handler }
    }

    fn into_module(self) -> Result<RpcModule<RpcHandler>, String> {
        let mut module = RpcModule::new(self.handler);

        route!(module, "screening.create.v1", create_screening);
        route!(module, "screening.get.v1", get_screening);
        route!(module, "screening.schedule.v1", schedule_screening);
        route!(module, "screening.history.v1", screening_history);
        route!(module, "ship.upsert.v1", upsert_ship);
        route!(module, "ship.get.v1", get_ship);
        route!(module, "bulk.create.v1", create_bulk);
        route!(module, "bulk.get.v1", get_bulk);
        route!(module, "admin.stats.v1", stats, optional);
        route!(module, "admin.maintenance.v1", maintenance, optional);

        Ok(module)
    }

    /// Bind and start serving. Only ever binds the configured (localhost) host.
    pub async fn start(self) -> Result<(SocketAddr, ServerHandle), String> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        let server = Server::builder()
            .build(&addr)
            .await
            .map_err(|e| format!("Failed to build server on {}: {}", addr, e))?;
        let local_addr = server
            .local_addr()
            .map_err(|e| format!("Failed to read bound address: {}", e))?;

        let module = self.into_module()?;
        let handle = server.start(module);

        info!(addr = %local_addr, "JSON-RPC server started");
        Ok((local_addr, handle))
    }
}
