use async_trait::async_trait;
use axum::http::{header::AUTHORIZATION, HeaderMap};
use subtle::ConstantTimeEq;

use crate::domain::{
    config::TokenRegistry,
    session::{AuthenticatedUser, SessionResolver},
};

/// Resolves `Authorization: Bearer <token>` against configured session tokens
#[derive(Debug, Clone)]
pub struct BearerTokenResolver {
    registry: TokenRegistry,
}

impl BearerTokenResolver {
    pub fn new(registry: TokenRegistry) -> Self {
        Self { registry }
    }

    pub fn user_names(&self) -> impl Iterator<Item = &String> {
        self.registry.user_names()
    }
}

#[async_trait]
impl SessionResolver for BearerTokenResolver {
    async fn resolve(&self, headers: &HeaderMap) -> Option<AuthenticatedUser> {
        let token = headers
            .get(AUTHORIZATION)
            .and_then(|header| header.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))?;

        // Walk every entry so timing doesn't reveal which one matched
        let mut matched: Option<&String> = None;
        for (name, candidate) in self.registry.entries() {
            if bool::from(token.as_bytes().ct_eq(candidate.as_bytes())) {
                matched = Some(name);
            }
        }

        match matched {
            Some(name) => Some(AuthenticatedUser { name: name.clone() }),
            None => {
                tracing::warn!("Authentication failed: invalid session token");
                None
            }
        }
    }
}
