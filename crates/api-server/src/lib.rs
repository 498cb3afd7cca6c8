#![warn(clippy::unwrap_used)]

pub mod admin_rest;
pub mod auth;
pub mod publicidade_rest;
pub mod rest;
pub mod server;
pub mod swagger;

pub use rest::AppState;
pub use server::{router, ApiServer};
pub use swagger::ApiDoc;
