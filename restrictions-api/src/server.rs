use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use url::Url;

use restrictions_common::admin::MetaboxHandler;
use restrictions_common::gate::{ClientFilter, LoginFilter, SubnetFilter};
use restrictions_common::hooks::Restrictions;
use restrictions_common::memory::{MemoryHost, SiteSeed};
use restrictions_common::nonce::NonceService;
use restrictions_common::query::QueryTables;
use restrictions_common::settings::Settings;
use restrictions_common::time::SystemTime;

use crate::config::{Config, FilterMode};
use crate::router;

fn load_site(config: &Config) -> anyhow::Result<MemoryHost> {
    let Some(path) = &config.site_path else {
        tracing::warn!("no SITE_PATH configured, serving an empty site");
        return Ok(MemoryHost::new());
    };

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read site seed {}", path.display()))?;
    let seed = SiteSeed::from_json(&raw)
        .with_context(|| format!("failed to parse site seed {}", path.display()))?;

    tracing::info!(
        pages = seed.pages.len(),
        menus = seed.menus.len(),
        "loaded site seed"
    );
    Ok(MemoryHost::from_seed(seed))
}

fn client_filter(config: &Config) -> Box<dyn ClientFilter> {
    match config.filter_mode {
        FilterMode::Subnet => Box::new(SubnetFilter::new(
            config.filter_network,
            config.filter_netmask,
            config.trusted_proxies.0.clone(),
        )),
        FilterMode::Login => Box::new(LoginFilter),
    }
}

pub fn state(config: &Config) -> anyhow::Result<router::State> {
    let home_url = Url::parse(&config.home_url)
        .with_context(|| format!("invalid HOME_URL {}", config.home_url))?;
    let host = Arc::new(load_site(config)?);

    let settings = Settings::new(host.clone(), home_url);
    let restrictions = Restrictions::new(
        settings,
        host.clone(),
        host.clone(),
        client_filter(config),
    )
    .with_tables(QueryTables::with_prefix(&config.table_prefix));
    let nonces = NonceService::new(
        &config.nonce_secret,
        config.nonce_lifetime_secs,
        Arc::new(SystemTime {}),
    );
    let metabox = MetaboxHandler::new(host.clone(), nonces);

    Ok(router::State {
        host,
        restrictions: Arc::new(restrictions),
        metabox: Arc::new(metabox),
        admin_token: config.admin_token.clone(),
    })
}

pub async fn serve<F>(config: Config, listener: TcpListener, shutdown: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    let state = match state(&config) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("Failed to set up site: {:#}", e);
            return;
        }
    };

    let app = router::router(state);

    match listener.local_addr() {
        Ok(addr) => tracing::info!("listening on {:?}", addr),
        Err(e) => tracing::warn!("listening on unknown address: {}", e),
    }
    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    {
        tracing::error!("server error: {}", e);
    }
}
