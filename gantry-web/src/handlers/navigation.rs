//! Navigation endpoint

use super::types::NavigationResponse;
use crate::transport::{cookie_header, http::set_cookie};
use crate::{AppState, WebResult};
use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Json, Response},
};
use gantry_services::session::GUEST_USER_NAME;
use gantry_services::ServiceError;

/// Configured navigation pruned to what the caller may reach
///
/// With rights disabled the whole tree is returned and no session is touched.
pub async fn navigation(State(state): State<AppState>, headers: HeaderMap) -> WebResult<Response> {
    let tree = state.services.navigation.as_slice();

    if !state.rights().is_enabled() {
        let body = NavigationResponse {
            user: GUEST_USER_NAME.to_string(),
            items: tree.to_vec(),
        };
        return Ok(Json(body).into_response());
    }

    let cookie = cookie_header(&headers);
    let (session, issued) = state
        .dispatcher()
        .resolve_session(cookie.as_deref())
        .await?;

    let items = state
        .rights()
        .secure_navigation(tree, &session.user.id)
        .await
        .map_err(ServiceError::from)?;

    let mut response = Json(NavigationResponse {
        user: session.user.name,
        items,
    })
    .into_response();
    if let Some(issued) = &issued {
        set_cookie(&mut response, issued);
    }
    Ok(response)
}
