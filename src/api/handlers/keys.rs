use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::Error;
use crate::validator::{self, KeyError, Validation};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SaveKeyRequest {
    #[serde(default)]
    pub api_key: String,
}

#[derive(Debug, Serialize)]
pub struct HasKeyResponse {
    pub has_key: bool,
}

#[derive(Debug, Serialize)]
pub struct SaveKeyResponse {
    pub ok: bool,
}

pub async fn has_key(State(state): State<AppState>) -> Json<HasKeyResponse> {
    Json(HasKeyResponse {
        has_key: state.credentials.has_key().await,
    })
}

/// Validate the submitted key with the provider and persist it.
pub async fn save_key(
    State(state): State<AppState>,
    body: Result<Json<SaveKeyRequest>, JsonRejection>,
) -> Result<Json<SaveKeyResponse>, Error> {
    // An unreadable body is treated like an empty key
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::debug!("Unreadable save-key body: {rejection}");
            SaveKeyRequest::default()
        }
    };
    let key = request.api_key.trim();

    match validator::validate_key(&state.provider, key).await {
        Ok(Validation::Verified) => {}
        Ok(Validation::Unverified { reason }) => {
            tracing::warn!(%reason, "Saving API key without provider confirmation");
        }
        Err(KeyError::InvalidFormat) => return Err(Error::InvalidFormat),
        Err(KeyError::Rejected) => return Err(Error::Rejected),
    }

    state.credentials.save(key).await?;
    Ok(Json(SaveKeyResponse { ok: true }))
}
