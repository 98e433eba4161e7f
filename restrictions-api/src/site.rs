use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Path, State};
use axum::http::header::LOCATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::instrument;

use restrictions_common::hooks::Dispatcher;
use restrictions_common::page::{Comment, CommentId, Comments, MenuItem, Page, PageId};
use restrictions_common::query::{PostQuery, SqlClauses};
use restrictions_common::store::PageResolver;

use crate::api::{ApiError, PageView};
use crate::context::visitor_context;
use crate::router;

fn activate(
    state: &router::State,
    peer: SocketAddr,
    headers: &HeaderMap,
) -> Result<Dispatcher, ApiError> {
    let context = visitor_context(peer, headers);
    let hooks = state.restrictions.activate(&context)?;
    tracing::Span::current().record("hooks", hooks.names().join(",").as_str());
    Ok(hooks)
}

#[instrument(skip_all, fields(hooks, listed))]
pub async fn list_pages(
    State(state): State<router::State>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<Json<Vec<Page>>, ApiError> {
    let hooks = activate(&state, peer, &headers)?;

    let query = hooks.query(PostQuery::listing());
    let clauses = hooks.query_clauses(SqlClauses::default(), &query);
    tracing::debug!(
        where_clause = %clauses.where_clause,
        join = %clauses.join,
        "listing clauses"
    );

    let mut pages = Vec::new();
    for page in state.host.pages() {
        let selected = match &query.meta_query {
            Some(filter) => filter.matches(state.host.as_ref(), page.id)?,
            None => true,
        };
        if selected {
            pages.push(page);
        }
    }

    let pages = hooks.pages(pages)?;
    tracing::Span::current().record("listed", pages.len());
    Ok(Json(pages))
}

#[instrument(skip_all, fields(page = id, hooks))]
pub async fn show_page(
    State(state): State<router::State>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Result<Response, ApiError> {
    let hooks = activate(&state, peer, &headers)?;
    let page = state.host.page(PageId(id));

    if let Some(redirect) = hooks.template_redirect(page.as_ref().map(|page| page.id))? {
        return Ok((StatusCode::FOUND, [(LOCATION, redirect.location)]).into_response());
    }

    let page = page.ok_or_else(|| ApiError::NotFound(format!("page {}", id)))?;
    let comments = hooks.comments(Comments::List(state.host.comments_for(page.id)))?;

    Ok(Json(PageView { page, comments }).into_response())
}

#[instrument(skip_all, fields(menu = %name, hooks))]
pub async fn show_menu(
    State(state): State<router::State>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Result<Json<Vec<MenuItem>>, ApiError> {
    let hooks = activate(&state, peer, &headers)?;
    let items = state
        .host
        .menu(&name)
        .ok_or_else(|| ApiError::NotFound(format!("menu {}", name)))?;

    Ok(Json(hooks.menu_items(items)?))
}

#[instrument(skip_all, fields(hooks))]
pub async fn sticky(
    State(state): State<router::State>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<Json<Vec<PageId>>, ApiError> {
    let hooks = activate(&state, peer, &headers)?;
    Ok(Json(hooks.sticky(state.host.sticky())?))
}

#[instrument(skip_all, fields(comment = id, hooks))]
pub async fn show_comment(
    State(state): State<router::State>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Result<Json<Comment>, ApiError> {
    let hooks = activate(&state, peer, &headers)?;
    let comment = state.host.comment(CommentId(id));

    match hooks.comments(Comments::Single(comment))? {
        Comments::Single(Some(comment)) => Ok(Json(comment)),
        _ => Err(ApiError::NotFound(format!("comment {}", id))),
    }
}
