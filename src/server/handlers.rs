use crate::domain::{
    generation::{GenerationRequest, ImageGenerationPayload, ReferenceImage},
    keys::{file_extension, reference_key},
    session::AuthenticatedUser,
    storage::ContentDisposition,
};
use crate::infra::storage_client::UploadOptions;
use crate::server::{error::ApiError, validation, AppState};
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Serialize;

pub const SUCCESS_CODE: u16 = 1000;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub code: u16,
    pub message: String,
    pub data: T,
}

/// `id` and `task_id` carry the same provider task id
#[derive(Debug, Serialize)]
pub struct TaskData {
    pub id: String,
    pub task_id: String,
}

#[derive(Default)]
struct ImageToImageForm {
    image: Option<ReferenceImage>,
    prompt: Option<String>,
    model: Option<String>,
    aspect_ratio: Option<String>,
}

async fn read_form(mut multipart: Multipart) -> Result<ImageToImageForm, ApiError> {
    let mut form = ImageToImageForm::default();

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "image" => {
                let filename = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await?;
                form.image = Some(ReferenceImage {
                    data,
                    content_type,
                    filename,
                });
            }
            "prompt" => form.prompt = Some(field.text().await?),
            "model" => form.model = Some(field.text().await?),
            "aspectRatio" => form.aspect_ratio = Some(field.text().await?),
            _ => {}
        }
    }

    Ok(form)
}

pub async fn image_to_image(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let form = read_form(multipart?).await?;

    tracing::info!(
        user = %user.name,
        has_image = form.image.is_some(),
        image_filename = ?form.image.as_ref().and_then(|i| i.filename.as_deref()),
        prompt = ?form.prompt,
        model = ?form.model,
        aspect_ratio = ?form.aspect_ratio,
        "Image-to-image request received"
    );

    let request = GenerationRequest {
        image: validation::require_image(form.image)?,
        prompt: validation::require_prompt(form.prompt)?,
        model: form.model,
        aspect_ratio: form.aspect_ratio,
    };

    let extension = file_extension(
        request.image.filename.as_deref(),
        request.image.content_type.as_deref(),
    );
    let key = reference_key(chrono::Utc::now(), &extension);

    tracing::info!(key = %key, "Uploading reference image");
    let stored = state
        .storage
        .upload_file(
            request.image.data.clone(),
            &key,
            UploadOptions {
                content_type: request.image.content_type.as_deref(),
                disposition: ContentDisposition::Inline,
                ..Default::default()
            },
        )
        .await?;
    tracing::info!(url = %stored.url, "Reference image uploaded");

    let payload = ImageGenerationPayload {
        model: state.generation.model().to_string(),
        prompt: request.prompt.clone(),
        size: request.size().to_string(),
        quality: state.generation.quality().to_string(),
        image_urls: vec![stored.url],
    };

    tracing::info!(
        model = %payload.model,
        size = %payload.size,
        image_urls = payload.image_urls.len(),
        "Dispatching generation request"
    );
    let handle = state.generation.submit(&payload).await?;
    tracing::info!(task_id = %handle.id, "Generation task accepted");

    Ok(Json(ApiResponse {
        code: SUCCESS_CODE,
        message: "success".to_string(),
        data: TaskData {
            id: handle.id.clone(),
            task_id: handle.id,
        },
    }))
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
