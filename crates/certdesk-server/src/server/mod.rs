//! Service layer behind the HTTP routes.

pub mod auth_svc;


pub use auth_svc::AuthService;
