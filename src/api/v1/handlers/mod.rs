pub mod admin;
pub mod authz;
pub mod health;
pub mod me;
