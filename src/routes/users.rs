use crate::{
    auth::{AuthResponse, CurrentSession, LoginRequest},
    error::AppError,
    models::{parse_patch, RegisterRequest, UserPatch, USER_UPDATABLE_FIELDS},
    notify::Notification,
    state::AppState,
    upload::{read_upload, UploadPolicy},
};
use actix_multipart::Multipart;
use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use serde_json::Value;
use uuid::Uuid;

/// Register a new user
///
/// Creates the account, sends a welcome mail and logs the new user in.
///
/// ## Responses:
/// - `201 Created`: `{ "user": ..., "token": ... }`.
/// - `400 Bad Request`: invalid fields, or the email is already registered.
#[post("")]
pub async fn register(
    state: web::Data<AppState>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    let user = state.credentials.create(register_data.into_inner()).await?;
    state.notifier.send(Notification::welcome(&user));
    let token = state.sessions.issue_token(&user).await?;

    Ok(HttpResponse::Created().json(AuthResponse { user, token }))
}

/// Login user
///
/// Every login adds a new device session; existing sessions stay valid.
///
/// ## Responses:
/// - `200 OK`: `{ "user": ..., "token": ... }`.
/// - `400 Bad Request`: `{"error": "Unable to login"}` for an unknown email or a wrong password alike.
#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    let LoginRequest { email, password } = login_data.into_inner();
    let user = state.sessions.authenticate(&email, &password).await?;
    let token = state.sessions.issue_token(&user).await?;

    Ok(HttpResponse::Ok().json(AuthResponse { user, token }))
}

/// Ends the session of the token used for this request only.
#[post("/logout")]
pub async fn logout(
    state: web::Data<AppState>,
    session: CurrentSession,
) -> Result<impl Responder, AppError> {
    state
        .sessions
        .revoke_token(session.user.id, &session.token)
        .await?;
    Ok(HttpResponse::Ok().finish())
}

/// Ends every session of the requester, on all devices.
#[post("/logoutAll")]
pub async fn logout_all(
    state: web::Data<AppState>,
    session: CurrentSession,
) -> Result<impl Responder, AppError> {
    state.sessions.revoke_all_tokens(session.user.id).await?;
    Ok(HttpResponse::Ok().finish())
}

#[get("/me")]
pub async fn me(session: CurrentSession) -> impl Responder {
    HttpResponse::Ok().json(session.user)
}

/// Update the requester's profile
///
/// ## Request Body:
/// Any subset of `name`, `email`, `password`, `age`. Any other key rejects the whole update.
///
/// ## Responses:
/// - `200 OK`: the updated public profile.
/// - `400 Bad Request`: unknown keys, invalid values or an email already in use.
#[patch("/me")]
pub async fn update_me(
    state: web::Data<AppState>,
    session: CurrentSession,
    body: web::Json<Value>,
) -> Result<impl Responder, AppError> {
    let patch: UserPatch = parse_patch(body.into_inner(), USER_UPDATABLE_FIELDS)?;
    let user = state.credentials.update(session.user.id, patch).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// Delete the requester's account
///
/// All tasks owned by the account are removed with it, and a goodbye mail is sent.
#[delete("/me")]
pub async fn delete_me(
    state: web::Data<AppState>,
    session: CurrentSession,
) -> Result<impl Responder, AppError> {
    let user = state.credentials.delete(session.user.id).await?;
    state.notifier.send(Notification::cancellation(&user));
    Ok(HttpResponse::Ok().json(user))
}

/// Upload an avatar
///
/// Multipart field `avatar`: jpg, jpeg or png, at most 1 MB. Stored as a 250x250 PNG.
///
/// ## Responses:
/// - `200 OK`: empty body.
/// - `400 Bad Request`: wrong extension, too large, or not a readable image.
#[post("/me/avatar")]
pub async fn upload_avatar(
    state: web::Data<AppState>,
    session: CurrentSession,
    payload: Multipart,
) -> Result<impl Responder, AppError> {
    let file = read_upload(payload, "avatar", &UploadPolicy::avatar()).await?;

    let transcoder = state.transcoder.clone();
    let png = web::block(move || transcoder.to_avatar(&file.data)).await??;

    state.credentials.set_avatar(session.user.id, Some(png)).await?;
    Ok(HttpResponse::Ok().finish())
}

#[delete("/me/avatar")]
pub async fn delete_avatar(
    state: web::Data<AppState>,
    session: CurrentSession,
) -> Result<impl Responder, AppError> {
    state.credentials.set_avatar(session.user.id, None).await?;
    Ok(HttpResponse::Ok().finish())
}

/// Serves a user's avatar as `image/png`. Public.
///
/// ## Responses:
/// - `200 OK`: PNG bytes.
/// - `404 Not Found`: no such user, or the user has no avatar.
#[get("/{id}/avatar")]
pub async fn get_avatar(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let not_found = || AppError::NotFound("Avatar not found".into());

    let id = Uuid::parse_str(&path).map_err(|_| not_found())?;
    let avatar = state
        .credentials
        .find_by_id(id)
        .await?
        .and_then(|user| user.avatar)
        .ok_or_else(not_found)?;

    Ok(HttpResponse::Ok().content_type("image/png").body(avatar))
}
