//! Checks a candidate key before it is saved.
//!
//! Only a clear authentication failure blocks the save. Network trouble, rate
//! limits and provider outages leave the key `Unverified` and it is stored
//! anyway, so a flaky provider never locks a user out of onboarding.

use thiserror::Error;

use crate::provider::{ProviderClient, ProviderError};

pub const KEY_PREFIX: &str = "gsk_";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    /// Provider accepted the key
    Verified,
    /// Liveness check failed for a reason other than authentication
    Unverified { reason: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("key must start with gsk_")]
    InvalidFormat,
    #[error("provider rejected the key")]
    Rejected,
}

pub fn check_format(key: &str) -> Result<(), KeyError> {
    if key.starts_with(KEY_PREFIX) {
        Ok(())
    } else {
        Err(KeyError::InvalidFormat)
    }
}

/// Was this error the provider refusing the key itself?
fn is_rejection(err: &ProviderError) -> bool {
    match err {
        ProviderError::Http { status, body } => {
            status.as_u16() == 401 || body.to_lowercase().contains("invalid")
        }
        _ => false,
    }
}

pub async fn validate_key(client: &ProviderClient, key: &str) -> Result<Validation, KeyError> {
    check_format(key)?;

    match client.list_models(key).await {
        Ok(models) => {
            tracing::info!(models, "API key verified with provider");
            Ok(Validation::Verified)
        }
        Err(e) if is_rejection(&e) => {
            tracing::info!("API key rejected by provider: {e}");
            Err(KeyError::Rejected)
        }
        Err(e) => {
            tracing::warn!("Could not verify API key, accepting it unverified: {e}");
            Ok(Validation::Unverified { reason: e.to_string() })
        }
    }
}
