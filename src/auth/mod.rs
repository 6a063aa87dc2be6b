pub mod extractors;
pub mod middleware;
pub mod password;
pub mod session;
pub mod token;

use serde::{Deserialize, Serialize};

use crate::models::User;

pub use extractors::CurrentSession;
pub use middleware::AuthMiddleware;
pub use password::{hash_password, verify_password, BcryptHasher, PasswordHasher};
pub use session::SessionManager;
pub use token::{Claims, TokenKeys};

/// Represents the payload for a user login request.
///
/// Not validated beyond presence: any mismatch is reported as a failed login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response structure after a successful registration or login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    /// The public profile of the authenticated user.
    pub user: User,
    /// The session token for this device.
    pub token: String,
}
