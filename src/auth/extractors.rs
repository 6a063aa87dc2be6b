use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};

use crate::error::AppError;
use crate::models::User;

/// The authenticated user and the exact token that authenticated the request.
///
/// Inserted by `AuthMiddleware`; handlers take it as an argument. If it is
/// missing the route was not behind the middleware, and the request is
/// rejected as unauthenticated.
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub user: User,
    pub token: String,
}

impl FromRequest for CurrentSession {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<CurrentSession>().cloned() {
            Some(session) => ready(Ok(session)),
            None => ready(Err(AppError::Unauthorized.into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::test;
    use chrono::Utc;
    use uuid::Uuid;

    fn session() -> CurrentSession {
        let now = Utc::now();
        CurrentSession {
            user: User {
                id: Uuid::new_v4(),
                name: "Kim".to_string(),
                email: "kim@example.com".to_string(),
                password_hash: String::new(),
                age: 0,
                session_tokens: vec!["abc".to_string()],
                avatar: None,
                created_at: now,
                updated_at: now,
            },
            token: "abc".to_string(),
        }
    }

    #[actix_rt::test]
    async fn test_current_session_extractor_success() {
        let req = test::TestRequest::default().to_http_request();
        let expected = session();
        req.extensions_mut().insert(expected.clone());

        let mut payload = Payload::None;
        let extracted = CurrentSession::from_request(&req, &mut payload).await.unwrap();
        assert_eq!(extracted.user.id, expected.user.id);
        assert_eq!(extracted.token, "abc");
    }

    #[actix_rt::test]
    async fn test_current_session_extractor_failure() {
        let req = test::TestRequest::default().to_http_request();

        let mut payload = Payload::None;
        let err = CurrentSession::from_request(&req, &mut payload)
            .await
            .unwrap_err();
        assert_eq!(err.error_response().status(), StatusCode::UNAUTHORIZED);
    }
}
