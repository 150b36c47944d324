pub mod auth;
pub mod http;
pub mod ws;

pub use auth::{bearer_token, AuthBackend, AuthError, AuthResult};
pub use http::{router, AppState};
