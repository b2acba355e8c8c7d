//! Caller authentication and authorization
//!
//! Bearer tokens are Azure AD access tokens. [`JwtVerifier`] checks the
//! signature against keys from a [`JwksCache`] and returns the verified
//! [`ClaimSet`]; an [`AccessPolicy`] then decides whether those claims may use
//! an endpoint. The document core never looks at claims.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::Result;

mod jwks;
mod token;

pub use jwks::JwksCache;
pub use token::JwtVerifier;

/// Claims of a verified access token that authorization looks at
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ClaimSet {
    /// Subject
    #[serde(default)]
    pub sub: Option<String>,
    /// Directory groups the caller belongs to
    #[serde(default)]
    pub groups: Vec<String>,
    /// Application roles assigned to the caller
    #[serde(default)]
    pub roles: Vec<String>,
    /// Delegated scopes, space separated
    #[serde(default)]
    pub scp: Option<String>,
}

impl ClaimSet {
    /// Delegated scopes as individual values
    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.scp.as_deref().unwrap_or_default().split_whitespace()
    }
}

/// Groups, roles and scopes allowed to use an endpoint
///
/// A caller passes when any one of its groups, roles or scopes appears in the
/// corresponding list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AccessPolicy {
    /// Accepted directory groups
    #[serde(default)]
    pub groups: Vec<String>,
    /// Accepted application roles
    #[serde(default)]
    pub roles: Vec<String>,
    /// Accepted delegated scopes
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl AccessPolicy {
    /// Build a policy from string lists
    pub fn new<G, R, S>(groups: G, roles: R, scopes: S) -> Self
    where
        G: IntoIterator,
        G::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
        S: IntoIterator,
        S::Item: Into<String>,
    {
        Self {
            groups: groups.into_iter().map(Into::into).collect(),
            roles: roles.into_iter().map(Into::into).collect(),
            scopes: scopes.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether the claims satisfy this policy
    pub fn allows(&self, claims: &ClaimSet) -> bool {
        claims.groups.iter().any(|g| self.groups.contains(g))
            || claims.roles.iter().any(|r| self.roles.contains(r))
            || claims.scopes().any(|s| self.scopes.iter().any(|p| p == s))
    }
}

/// Verifies bearer tokens
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Verify a raw token and return its claims
    ///
    /// # Errors
    ///
    /// Returns [`Error::Authentication`](crate::Error::Authentication) for any
    /// token that is malformed, expired or not signed by a trusted key.
    async fn verify(&self, token: &str) -> Result<ClaimSet>;
}
