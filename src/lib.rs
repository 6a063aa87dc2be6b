#![doc = "The `taskmanager` library crate."]
#![doc = ""]
#![doc = "Users, multi-device session tokens, owner-scoped tasks and avatar uploads,"]
#![doc = "behind an actix-web HTTP API. The binary (`main.rs`) wires configuration,"]
#![doc = "storage and mail delivery into [`state::AppState`] and serves [`routes::config`]."]

pub mod auth;
pub mod config;
pub mod credentials;
pub mod error;
pub mod models;
pub mod notify;
pub mod query;
pub mod routes;
pub mod state;
pub mod store;
pub mod tasks;
pub mod upload;

pub use crate::error::AppError;
pub use crate::state::AppState;
