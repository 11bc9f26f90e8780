use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    Json,
};

use crate::captions::{self, CaptionRequest, CaptionResult, UploadedImage, DEFAULT_MIME};
use crate::errors::Error;
use crate::AppState;

fn form_error(e: MultipartError) -> Error {
    Error::BadRequest {
        message: format!("Could not read upload: {}", e.body_text()),
    }
}

async fn read_form(mut multipart: Multipart) -> Result<CaptionRequest, Error> {
    let mut request = CaptionRequest::default();

    while let Some(field) = multipart.next_field().await.map_err(form_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let mime_type = field.content_type().unwrap_or(DEFAULT_MIME).to_string();
                let bytes = field.bytes().await.map_err(form_error)?;
                request.image = Some(UploadedImage {
                    file_name,
                    mime_type,
                    bytes: bytes.to_vec(),
                });
            }
            "tone" => request.tone = field.text().await.map_err(form_error)?,
            "count" => request.count = field.text().await.map_err(form_error)?,
            other => tracing::debug!(field = other, "Ignoring unknown form field"),
        }
    }

    Ok(request)
}

/// Generate captions and hashtags for an uploaded image.
pub async fn generate(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<CaptionResult>, Error> {
    let api_key = state.credentials.load().await;
    if api_key.is_empty() {
        return Err(Error::Unauthenticated { message: None });
    }

    let request = match multipart {
        Ok(multipart) => read_form(multipart).await?,
        Err(rejection) => {
            tracing::debug!("Generate called without a multipart body: {rejection}");
            return Err(Error::MissingImage { message: None });
        }
    };

    let result = captions::generate(&state.provider, &state.captions, &api_key, &request).await?;
    Ok(Json(result))
}
