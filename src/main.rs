use tutter::config::{self, StoreInner};
use tutter::err::FatalErr;
use tutter::request::Handler;
use tutter::response::{Hub, Reconciler};
use tutter::store::{self, MemoryStore, PgPool, SharedStore};

use hashbrown::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use warp::Filter;

fn main() -> Result<(), FatalErr> {
    config::merge_dotenv()?;
    let env_vars: HashMap<String, String> = dotenv::vars().collect();
    config::init_logger(&env_vars)?;
    let (postgres_cfg, cfg) = config::from_env(env_vars)?;

    // The postgres client is synchronous; it must be opened before the runtime exists.
    let store: SharedStore = match *cfg.store {
        StoreInner::Postgres => Arc::new(PgPool::new(&postgres_cfg)?),
        StoreInner::Memory => {
            log::warn!("Using the in-memory store; posts are lost on restart");
            Arc::new(MemoryStore::new())
        }
    };
    let last_post = store::last_post_or_none(&*store)?;
    match &last_post {
        Some(post) => log::info!("Starting from post {}", post.id),
        None => log::info!("The store is empty"),
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let hub = Hub::new(last_post, *cfg.subscriber_queue, *cfg.debug);
        Reconciler::new(hub.clone(), store.clone(), *cfg.reconcile_interval).spawn();

        let handler = Handler::new(store, hub, *cfg.poll_timeout);
        let debug_pin = if *cfg.debug { cfg.debug_pin.0.clone() } else { None };
        let metrics_bearer = cfg.metrics_bearer.0.clone();

        let cors = warp::cors()
            .allow_any_origin()
            .allow_methods(cfg.cors.allowed_methods.clone())
            .allow_headers(cfg.cors.allowed_headers.clone());

        let server_addr = SocketAddr::new(*cfg.address, *cfg.port);
        log::info!("Listening on {}", server_addr);
        warp::serve(handler.api(debug_pin, metrics_bearer).recover(Handler::err).with(cors))
            .run(server_addr)
            .await;
    });
    Ok(())
}
