use std::net::SocketAddr;

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use subtle::ConstantTimeEq;

use restrictions_common::gate::RequestContext;

use crate::api::ApiError;

pub const FORWARDED_FOR: &str = "x-forwarded-for";
pub const LOGGED_IN: &str = "x-logged-in";

/// Nonces issued through the admin endpoints are bound to this user.
pub const ADMIN_USER: &str = "admin";

pub fn visitor_context(peer: SocketAddr, headers: &HeaderMap) -> RequestContext {
    let forwarded_for = headers
        .get(FORWARDED_FOR)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let logged_in = headers
        .get(LOGGED_IN)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.trim() == "1");

    RequestContext {
        is_admin: false,
        remote_addr: Some(peer.ip()),
        forwarded_for,
        logged_in,
    }
}

/// Checks the bearer token on admin routes.
pub fn authorize_admin(headers: &HeaderMap, admin_token: &str) -> Result<(), ApiError> {
    let provided = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim);

    match provided {
        Some(token)
            if !admin_token.is_empty()
                && bool::from(token.as_bytes().ct_eq(admin_token.as_bytes())) =>
        {
            Ok(())
        }
        _ => {
            tracing::debug!("rejected admin request");
            Err(ApiError::Unauthorized)
        }
    }
}
