/*
 * Responsibility
 * - v1 の公開ポイント (routes(), operations() の re-export など)
 */
pub mod dto;
pub mod extractors;
pub mod handlers;
mod routes;

pub use routes::{operations, routes};
