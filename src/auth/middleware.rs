use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::{header, Method},
    web, Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use std::rc::Rc;

use super::extractors::CurrentSession;
use super::session::SessionManager;
use crate::error::AppError;
use crate::state::AppState;

/// Routes reachable without a bearer token.
pub fn is_public(method: &Method, path: &str) -> bool {
    let path = path.trim_end_matches('/');
    if method == Method::GET {
        path == "/health" || is_avatar_path(path)
    } else if method == Method::POST {
        path == "/users" || path == "/users/login" || path == "/upload"
    } else {
        false
    }
}

/// `/users/{id}/avatar`, except `/users/me/avatar`.
fn is_avatar_path(path: &str) -> bool {
    let segments: Vec<&str> = path.split('/').collect();
    matches!(segments.as_slice(), ["", "users", id, "avatar"] if *id != "me")
}

/// Turns an `Authorization` header value into the session it belongs to.
pub async fn resolve(
    header: Option<&str>,
    sessions: &SessionManager,
) -> Result<CurrentSession, AppError> {
    let token = header
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AppError::Unauthorized)?;

    let user = sessions.verify_token(token).await?;
    Ok(CurrentSession {
        user,
        token: token.to_string(),
    })
}

/// Authenticates every non-public request and stores a [`CurrentSession`]
/// in the request extensions.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if is_public(req.method(), req.path()) {
            let fut = self.service.call(req);
            return Box::pin(async move { Ok(fut.await?.map_into_left_body()) });
        }

        let service = Rc::clone(&self.service);
        Box::pin(async move {
            let auth_header = req
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);

            let resolved = match req.app_data::<web::Data<AppState>>() {
                Some(state) => resolve(auth_header.as_deref(), &state.sessions).await,
                None => Err(AppError::InternalServerError(
                    "AppState is not registered".into(),
                )),
            };

            match resolved {
                Ok(session) => {
                    req.extensions_mut().insert(session);
                    Ok(service.call(req).await?.map_into_left_body())
                }
                Err(app_err) => Ok(req.error_response(app_err).map_into_right_body()),
            }
        })
    }
}
