//! Admin authentication: JWT sessions, password hashing and the request
//! extractor guarding console routes.

pub mod claims;
pub mod extract;
pub mod jwt;
pub mod password;

pub use claims::Claims;
pub use extract::AdminAuth;
pub use jwt::JwtManager;
