use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::sync::Arc;

mod config;
mod handler;
mod http;
mod logger;
mod server;
mod storage;

use server::ServerContext;
use storage::SupabaseStore;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::Config::load()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = server::resolve_addr(&cfg.server.host, cfg.server.port)?;
    let listener = server::create_listener(addr)?;
    // Port 0 picks a random free port; read the real one back.
    let bound_addr = listener.local_addr()?;

    let store = Arc::new(SupabaseStore::new(&cfg.storage)?);
    let sctx = Arc::new(ServerContext::new(cfg, bound_addr, store)?);

    logger::log_server_start(&bound_addr, &sctx.config);

    loop {
        let (stream, _peer_addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                logger::log_error(&format!("Failed to accept connection: {e}"));
                continue;
            }
        };

        let sctx = Arc::clone(&sctx);
        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            let service = service_fn(move |req| {
                let sctx = Arc::clone(&sctx);
                async move { handler::handle_request(req, sctx).await }
            });

            // A dropped connection terminates the stream mid-flight; that is
            // surfaced here as a connection-level error.
            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                logger::log_connection_error(&e);
            }
        });
    }
}
