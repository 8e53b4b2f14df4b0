/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - ex: authz: CachingAuthorizer (キャッシュ無効化用)
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use std::sync::Arc;

use crate::services::auth::{CachingAuthorizer, UserPrincipal};

#[derive(Clone, Default)]
pub struct AppState {
    /// `None` when authorization caching is turned off.
    pub authz: Option<Arc<CachingAuthorizer<UserPrincipal>>>,
}

impl AppState {
    pub fn new(authz: Option<Arc<CachingAuthorizer<UserPrincipal>>>) -> Self {
        Self { authz }
    }
}
