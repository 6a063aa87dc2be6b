use crate::{
    error::AppError,
    state::AppState,
    upload::{read_upload, UploadPolicy},
};
use actix_multipart::Multipart;
use actix_web::{post, web, HttpResponse, Responder};
use uuid::Uuid;

/// Accepts a Word document
///
/// Multipart field `upload`: doc or docx, at most 1 MB. The file is stored
/// under the configured upload directory with a generated name.
///
/// ## Responses:
/// - `200 OK`: empty body.
/// - `400 Bad Request`: wrong extension or too large.
#[post("/upload")]
pub async fn upload_document(
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<impl Responder, AppError> {
    let file = read_upload(payload, "upload", &UploadPolicy::document()).await?;

    tokio::fs::create_dir_all(&state.upload_dir).await?;
    let stored_as = state.upload_dir.join(Uuid::new_v4().simple().to_string());
    tokio::fs::write(&stored_as, &file.data).await?;

    log::info!(
        "stored upload {:?} ({} bytes) as {}",
        file.filename,
        file.data.len(),
        stored_as.display()
    );
    Ok(HttpResponse::Ok().finish())
}
