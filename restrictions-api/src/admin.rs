use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use tracing::instrument;

use restrictions_common::admin::{marked_pages, MetaboxState, SaveContext};
use restrictions_common::error::SettingsError;
use restrictions_common::page::{Flag, PageId};
use restrictions_common::settings::SettingKey;
use restrictions_common::store::PageResolver;
use restrictions_common::uninstall::{self as cleanup, UninstallReport};

use crate::api::{
    ApiError, MetaboxSubmission, Notice, SaveResponse, SettingsResponse, SettingsUpdate,
};
use crate::context::{authorize_admin, ADMIN_USER};
use crate::router;

fn settings_response(
    state: &router::State,
    notices: Vec<Notice>,
) -> Result<SettingsResponse, ApiError> {
    let host = state.host.as_ref();
    Ok(SettingsResponse {
        settings: state.restrictions.settings().snapshot()?,
        hidden_pages: marked_pages(host, host, Flag::Hide)?,
        redirected_pages: marked_pages(host, host, Flag::Redirect)?,
        notices,
    })
}

fn known_page(state: &router::State, id: u64) -> Result<PageId, ApiError> {
    state
        .host
        .page(PageId(id))
        .map(|page| page.id)
        .ok_or_else(|| ApiError::NotFound(format!("page {}", id)))
}

#[instrument(skip_all)]
pub async fn show_settings(
    State(state): State<router::State>,
    headers: HeaderMap,
) -> Result<Json<SettingsResponse>, ApiError> {
    authorize_admin(&headers, &state.admin_token)?;
    Ok(Json(settings_response(&state, Vec::new())?))
}

#[instrument(skip_all)]
pub async fn update_settings(
    State(state): State<router::State>,
    headers: HeaderMap,
    payload: Result<Json<SettingsUpdate>, JsonRejection>,
) -> Result<Json<SettingsResponse>, ApiError> {
    authorize_admin(&headers, &state.admin_token)?;
    let Json(update) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let settings = state.restrictions.settings();
    let toggles = [
        (SettingKey::FilterEnabled, update.filter_enabled),
        (SettingKey::RedirectEnabled, update.redirect_enabled),
        (SettingKey::HidingEnabled, update.hiding_enabled),
    ];
    for (key, value) in toggles {
        if let Some(value) = value {
            settings.set_bool(key, value)?;
        }
    }

    let mut notices = Vec::new();
    if let Some(destination) = update.redirect_destination.as_deref() {
        match settings.update_redirect_destination(destination) {
            Ok(_) => {}
            Err(SettingsError::Store(e)) => return Err(e.into()),
            Err(e) => notices.push(Notice::for_setting(SettingKey::RedirectDestination, &e)),
        }
    }

    Ok(Json(settings_response(&state, notices)?))
}

#[instrument(skip_all, fields(page = id))]
pub async fn show_metabox(
    State(state): State<router::State>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Result<Json<MetaboxState>, ApiError> {
    authorize_admin(&headers, &state.admin_token)?;
    let page = known_page(&state, id)?;

    Ok(Json(state.metabox.state(page, ADMIN_USER)?))
}

#[instrument(skip_all, fields(page = id))]
pub async fn save_metabox(
    State(state): State<router::State>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    payload: Result<Json<MetaboxSubmission>, JsonRejection>,
) -> Result<Json<SaveResponse>, ApiError> {
    authorize_admin(&headers, &state.admin_token)?;
    let page = known_page(&state, id)?;
    let Json(submission) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let context = SaveContext {
        user: ADMIN_USER.to_string(),
        is_autosave: submission.autosave,
        is_revision: submission.revision,
    };
    let outcome = state.metabox.save(page, &context, &submission.form)?;
    Ok(Json(outcome.into()))
}

#[instrument(skip_all)]
pub async fn uninstall(
    State(state): State<router::State>,
    headers: HeaderMap,
) -> Result<Json<UninstallReport>, ApiError> {
    authorize_admin(&headers, &state.admin_token)?;
    let host = state.host.as_ref();

    Ok(Json(cleanup::uninstall(host, host)?))
}
