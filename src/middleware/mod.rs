/*
 * Responsibility
 * - middleware の公開インターフェース
 * - auth: authentication filter, binding table
 * - http: transport-level layers
 */
pub mod auth;
pub mod http;
