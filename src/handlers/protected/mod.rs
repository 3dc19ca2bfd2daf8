// Protected handlers. Every route here runs behind `jwt_auth_middleware`,
// which puts an `AuthUser` into the request extensions.
pub mod auth;
pub mod baptism;
pub mod death;
pub mod marriage;
pub mod member;
pub mod parish;
pub mod wereda;
