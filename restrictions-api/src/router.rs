use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use restrictions_common::admin::MetaboxHandler;
use restrictions_common::hooks::Restrictions;
use restrictions_common::memory::MemoryHost;

use crate::{admin, site};

#[derive(Clone)]
pub struct State {
    pub host: Arc<MemoryHost>,
    pub restrictions: Arc<Restrictions>,
    pub metabox: Arc<MetaboxHandler>,
    pub admin_token: String,
}

async fn index() -> &'static str {
    "restrictions"
}

async fn liveness() -> &'static str {
    "ok"
}

pub fn router(state: State) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/_liveness", get(liveness))
        .route("/pages", get(site::list_pages))
        .route("/pages/:id", get(site::show_page))
        .route("/menus/:name", get(site::show_menu))
        .route("/sticky", get(site::sticky))
        .route("/comments/:id", get(site::show_comment))
        .route(
            "/admin/settings",
            get(admin::show_settings).post(admin::update_settings),
        )
        .route(
            "/admin/pages/:id/metabox",
            get(admin::show_metabox).post(admin::save_metabox),
        )
        .route("/admin/uninstall", post(admin::uninstall))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
