//! Account endpoints

use api_types::{
    Message,
    user::{Credentials, PasswordChange, Token, UserView, UsernameChange, UsernameChanged},
};
use axum::{Extension, Json, extract::State, http::StatusCode};
use engine::UserRecord;

use crate::{
    ServerError,
    server::{BearerToken, ServerState},
};

const TOKEN_TYPE: &str = "bearer";

fn map_user(user: UserRecord) -> UserView {
    UserView {
        id: user.id,
        username: user.username,
        created_at: user.created_at,
    }
}

pub async fn register(
    State(state): State<ServerState>,
    Json(payload): Json<Credentials>,
) -> Result<(StatusCode, Json<UserView>), ServerError> {
    let user = state
        .auth
        .register(&payload.username, &payload.password)
        .await?;
    Ok((StatusCode::CREATED, Json(map_user(user))))
}

pub async fn login(
    State(state): State<ServerState>,
    Json(payload): Json<Credentials>,
) -> Result<Json<Token>, ServerError> {
    let issued = state.auth.login(&payload.username, &payload.password).await?;
    Ok(Json(Token {
        access_token: issued.access_token,
        token_type: TOKEN_TYPE.to_string(),
    }))
}

pub async fn me(Extension(user): Extension<UserRecord>) -> Json<UserView> {
    Json(map_user(user))
}

/// Rename the account. The response carries the only token valid afterwards.
pub async fn change_username(
    Extension(BearerToken(token)): Extension<BearerToken>,
    State(state): State<ServerState>,
    Json(payload): Json<UsernameChange>,
) -> Result<Json<UsernameChanged>, ServerError> {
    let (_, issued) = state
        .auth
        .change_username(&token, &payload.new_username)
        .await?;
    Ok(Json(UsernameChanged {
        message: "username-updated".to_string(),
        access_token: issued.access_token,
        token_type: TOKEN_TYPE.to_string(),
    }))
}

pub async fn change_password(
    Extension(BearerToken(token)): Extension<BearerToken>,
    State(state): State<ServerState>,
    Json(payload): Json<PasswordChange>,
) -> Result<Json<Message>, ServerError> {
    state
        .auth
        .change_password(&token, &payload.current_password, &payload.new_password)
        .await?;
    Ok(Json(Message {
        message: "password-updated".to_string(),
    }))
}
