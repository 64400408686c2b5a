//! Authorization context resolution.
//!
//! Every inbound call is reduced to an [`AuthContext`] exactly once. Missing,
//! malformed, expired or forged credentials all resolve to the anonymous
//! principal rather than an error; privilege comes from the identity store,
//! never from token claims.

use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::ports::IdentityStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Anonymous,
    User,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Anonymous => "anonymous",
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    /// Database role assumed for the lifetime of a scoped transaction.
    pub fn db_role(self) -> &'static str {
        match self {
            Role::Anonymous => "app_anonymous",
            Role::User => "app_user",
            Role::Admin => "app_admin",
        }
    }
}

/// The acting principal for a single call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    pub role: Role,
    pub user_id: Option<i64>,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self {
            role: Role::Anonymous,
            user_id: None,
        }
    }

    pub fn user(user_id: i64) -> Self {
        Self {
            role: Role::User,
            user_id: Some(user_id),
        }
    }

    pub fn admin(user_id: i64) -> Self {
        Self {
            role: Role::Admin,
            user_id: Some(user_id),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_user(&self) -> Result<i64, AppError> {
        match (self.role, self.user_id) {
            (Role::Anonymous, _) | (_, None) => Err(AppError::Unauthenticated),
            (_, Some(user_id)) => Ok(user_id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    pub exp: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Clone)]
pub struct AuthResolver {
    decoding_key: DecodingKey,
    validation: Validation,
    identity: Arc<dyn IdentityStore>,
}

impl AuthResolver {
    pub fn new(secret: &str, identity: Arc<dyn IdentityStore>) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            identity,
        }
    }

    /// Resolves the raw `Authorization` header value.
    pub async fn resolve(&self, authorization: Option<&str>) -> Result<AuthContext, AppError> {
        let Some(claims) = self.verify(authorization) else {
            return Ok(AuthContext::anonymous());
        };

        match self.identity.is_admin(claims.user_id).await? {
            Some(true) => Ok(AuthContext::admin(claims.user_id)),
            Some(false) => Ok(AuthContext::user(claims.user_id)),
            None => {
                tracing::debug!(user_id = claims.user_id, "credential names an unknown user");
                Ok(AuthContext::anonymous())
            }
        }
    }

    fn verify(&self, authorization: Option<&str>) -> Option<Claims> {
        let token = authorization?.strip_prefix("Bearer ")?.trim();
        if token.is_empty() {
            return None;
        }

        match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(data) if data.claims.user_id > 0 => Some(data.claims),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(error = %e, "ignoring invalid credential");
                None
            }
        }
    }
}

/// Mints a signed credential for `user_id`.
pub fn issue_token(
    secret: &str,
    user_id: i64,
    ttl: Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        user_id,
        exp: (Utc::now() + ttl).timestamp().max(0) as usize,
        role: None,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}
