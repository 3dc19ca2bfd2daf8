pub mod create_admin;
pub mod serve;
