//! Login and logout
//!
//! Both regenerate the caller's session: login binds the authenticated user
//! to a fresh session id, logout swaps it back to the guest identity.

use crate::transport::{cookie_header, http::set_cookie};
use crate::{AppState, WebError, WebResult};
use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Json, Response},
};
use gantry_services::transport::IssuedCookie;
use gantry_services::{Session, SessionUser};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: SessionUser,
}

async fn current_session(state: &AppState, headers: &HeaderMap) -> WebResult<Session> {
    let cookie = cookie_header(headers);
    let (session, _) = state
        .dispatcher()
        .resolve_session(cookie.as_deref())
        .await?;
    Ok(session)
}

async fn switch_user(state: &AppState, headers: &HeaderMap, user: SessionUser) -> WebResult<Response> {
    let mut session = current_session(state, headers).await?;
    state.sessions().regenerate(&mut session, user).await?;

    let cookie = IssuedCookie::for_session(state.sessions(), &session);
    let mut response = Json(SessionResponse {
        user: session.user,
    })
    .into_response();
    set_cookie(&mut response, &cookie);
    Ok(response)
}

/// `POST /auth/login`
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> WebResult<Response> {
    let user = state
        .rights()
        .authenticate(&request.username, &request.password)
        .await
        .map_err(gantry_services::ServiceError::from)?
        .ok_or(WebError::Unauthorized)?;

    info!(user = %user.name, "User logged in");
    switch_user(&state, &headers, user).await
}

/// `POST /auth/logout`
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> WebResult<Response> {
    switch_user(&state, &headers, SessionUser::guest()).await
}
