use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use futures::future::{BoxFuture, FutureExt};
use http::header::CONTENT_TYPE;
use http::Method;
use jsonrpsee::server::middleware::rpc::{RpcServiceBuilder, RpcServiceT};
use jsonrpsee::server::{MethodResponse, ResponsePayload, RpcModule, Server, ServerHandle};
use jsonrpsee::types::{ErrorObjectOwned, Request};
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info};

use crate::artifact::{ArtifactProvider, ContractArtifact, FoundryArtifact, StaticArtifacts};
use crate::config::Config;
use crate::engine::Bridge;
use crate::methods::eth;
use crate::store::MemoryStore;
use crate::translator::to_hex;
use crate::tron::{TronClient, TronSigner};
use crate::upstream::HttpUpstream;

/// Largest response the server will emit, forwarded replies included.
const MAX_RESPONSE_SIZE: u32 = 10 * 1024 * 1024;

/// Start the JSON-RPC server and run until it is stopped.
pub async fn start_server(config: Config) -> Result<()> {
    let addr = SocketAddr::new(config.bind_addr, config.port);

    info!("Starting TRON Ethereum RPC bridge on {}", addr);
    info!("TRON node: {}", config.tron_base_endpoint);

    let signer = TronSigner::from_hex(&config.private_key).context("Invalid bridge private key")?;
    let signer_address = signer.eth_address();
    info!(
        "Bridge signer: {} (TRON {})",
        to_hex(signer_address.as_slice()),
        signer.tron_address()
    );

    let chain = TronClient::new(
        &config.tron_base_endpoint,
        signer,
        config.tron_pro_api_key.clone(),
        config.chain_timeout,
    )?;
    let upstream = HttpUpstream::new(
        &config.upstream_url(),
        config.tron_pro_api_key.clone(),
        config.upstream_timeout,
    )?;
    info!("Forwarding other methods to: {}", upstream.url());

    let artifacts: Arc<dyn ArtifactProvider> = match &config.artifact_path {
        Some(path) => {
            let provider = FoundryArtifact::new(path, config.contract_name.clone());
            info!("Watching ABI artifact: {}", provider.path().display());
            Arc::new(provider)
        }
        None => Arc::new(StaticArtifacts::new(
            ContractArtifact::default(),
            config.contract_name.clone(),
        )),
    };

    let bridge = Bridge::new(
        Arc::new(MemoryStore::new()),
        Arc::new(chain),
        Arc::new(upstream),
        artifacts,
        signer_address,
        config.execution,
    );

    let (local_addr, handle) = serve(bridge, addr).await?;
    info!("TRON Ethereum RPC bridge listening on http://{}", local_addr);

    handle.stopped().await;

    info!("TRON Ethereum RPC bridge stopped");
    Ok(())
}

/// Bind the server and start serving `bridge`. Returns the bound address.
pub async fn serve(bridge: Bridge, addr: SocketAddr) -> Result<(SocketAddr, ServerHandle)> {
    let module = build_module(bridge.clone())?;
    let owned: Arc<HashSet<&'static str>> = Arc::new(module.method_names().collect());

    let rpc_middleware = RpcServiceBuilder::new().layer_fn(move |service| ForwardUnowned {
        service,
        bridge: bridge.clone(),
        owned: owned.clone(),
    });

    // Browser wallets and dapps call the bridge cross-origin
    let cors = CorsLayer::new()
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers([CONTENT_TYPE]);
    let http_middleware = tower::ServiceBuilder::new().layer(cors);

    let server = Server::builder()
        .max_response_body_size(MAX_RESPONSE_SIZE)
        .set_http_middleware(http_middleware)
        .set_rpc_middleware(rpc_middleware)
        .build(addr)
        .await
        .map_err(|e| anyhow!("Failed to bind server to {}: {}", addr, e))?;
    let local_addr = server
        .local_addr()
        .context("Failed to read bound server address")?;

    Ok((local_addr, server.start(module)))
}

/// Build the module with every method the bridge answers itself.
pub fn build_module(bridge: Bridge) -> Result<RpcModule<Bridge>> {
    let mut module = RpcModule::new(bridge);
    register_methods(&mut module)?;
    Ok(module)
}

fn register_methods(module: &mut RpcModule<Bridge>) -> Result<()> {
    module.register_async_method("eth_getTransactionCount", |params, ctx, _| async move {
        let p: Vec<Value> = params.parse().unwrap_or_default();
        eth::get_transaction_count(&ctx, &p)
            .await
            .map_err(ErrorObjectOwned::from)
    })?;

    module.register_async_method("eth_estimateGas", |_params, _ctx, _| async move {
        eth::estimate_gas().await.map_err(ErrorObjectOwned::from)
    })?;

    module.register_async_method("eth_gasPrice", |_params, _ctx, _| async move {
        eth::gas_price().await.map_err(ErrorObjectOwned::from)
    })?;

    module.register_async_method("eth_sendRawTransaction", |params, ctx, _| async move {
        let p: Vec<Value> = params.parse().unwrap_or_default();
        eth::send_raw_transaction(&ctx, &p)
            .await
            .map_err(ErrorObjectOwned::from)
    })?;

    module.register_async_method("eth_getTransactionReceipt", |params, ctx, _| async move {
        let p: Vec<Value> = params.parse().unwrap_or_default();
        eth::get_transaction_receipt(&ctx, &p)
            .await
            .map_err(ErrorObjectOwned::from)
    })?;

    module.register_async_method("eth_getCode", |params, ctx, _| async move {
        let p: Vec<Value> = params.parse().unwrap_or_default();
        eth::get_code(&ctx, &p).await.map_err(ErrorObjectOwned::from)
    })?;

    module.register_async_method("eth_getTransactionByHash", |params, ctx, _| async move {
        let p: Vec<Value> = params.parse().unwrap_or_default();
        eth::get_transaction_by_hash(&ctx, &p)
            .await
            .map_err(ErrorObjectOwned::from)
    })?;

    info!("Registered {} bridge methods", module.method_names().count());
    Ok(())
}

/// RPC middleware relaying every method the module does not register to the
/// upstream node, keeping the caller's id and params.
#[derive(Clone)]
struct ForwardUnowned<S> {
    service: S,
    bridge: Bridge,
    owned: Arc<HashSet<&'static str>>,
}

impl<'a, S> RpcServiceT<'a> for ForwardUnowned<S>
where
    S: RpcServiceT<'a> + Send + Sync + Clone + 'static,
{
    type Future = BoxFuture<'a, MethodResponse>;

    fn call(&self, req: Request<'a>) -> Self::Future {
        if self.owned.contains(req.method_name()) {
            let service = self.service.clone();
            return async move { service.call(req).await }.boxed();
        }

        let bridge = self.bridge.clone();
        async move {
            let id = serde_json::to_value(&req.id).unwrap_or(Value::Null);
            let params = req
                .params()
                .as_str()
                .and_then(|raw| serde_json::from_str(raw).ok())
                .unwrap_or(Value::Null);
            debug!("Forwarding {} upstream", req.method_name());

            match bridge.forward(id, req.method_name(), params).await {
                Ok(response) => match response.error {
                    Some(err) => MethodResponse::error(
                        req.id,
                        ErrorObjectOwned::owned(err.code, err.message, err.data),
                    ),
                    None => MethodResponse::response(
                        req.id,
                        ResponsePayload::success(response.result.unwrap_or(Value::Null)),
                        MAX_RESPONSE_SIZE as usize,
                    ),
                },
                Err(e) => MethodResponse::error(req.id, ErrorObjectOwned::from(e)),
            }
        }
        .boxed()
    }
}
