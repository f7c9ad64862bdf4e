//! Device-facing API handlers.

use super::ApiError;
use crate::error::RelayError;
use crate::server::ConnectRelay;
use crate::storage::{BlobStore, BlobWriter};
use axum::extract::{Multipart, Path};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::HeaderValue;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use connect_types::api::{
    BridgeRequest, BridgeResponse, InitResponse, ParticipantsResponse, StatusResponse,
};
use connect_types::{DeviceId, Entry, EntryBody};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// `GET /api/init/:node_id`
pub async fn init_handler(
    Extension(relay): Extension<Arc<ConnectRelay>>,
    Path(node_id): Path<String>,
) -> Json<InitResponse> {
    let room_id = relay.init(&DeviceId::new(node_id));
    Json(InitResponse { room_id })
}

/// Upload fields collected from a push request.
#[derive(Default)]
struct PushForm {
    node_id: Option<String>,
    text: Option<String>,
    file: Option<StagedFile>,
}

/// File part already streamed into the blob store but not yet committed.
struct StagedFile {
    filename: String,
    writer: Box<dyn BlobWriter>,
}

impl PushForm {
    async fn discard_file(&mut self) {
        if let Some(mut staged) = self.file.take() {
            staged.writer.discard().await;
        }
    }
}

/// Read the multipart form, streaming the file part into `blobs` chunk by
/// chunk.
///
/// On error the caller still owns `form` and must discard its staged file.
async fn read_push_form(
    multipart: &mut Multipart,
    blobs: &dyn BlobStore,
    form: &mut PushForm,
) -> Result<(), ApiError> {
    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("node_id") => form.node_id = Some(field.text().await?),
            Some("text") => form.text = Some(field.text().await?),
            Some("file") => {
                // A file part without a filename counts as no file.
                let filename = field.file_name().unwrap_or_default().to_owned();
                form.discard_file().await;
                if filename.is_empty() {
                    continue;
                }

                let writer = blobs.create(&filename).await.map_err(RelayError::from)?;
                let staged = form.file.insert(StagedFile { filename, writer });
                while let Some(chunk) = field.chunk().await? {
                    staged
                        .writer
                        .write_chunk(&chunk)
                        .await
                        .map_err(RelayError::from)?;
                }
            }
            _ => {}
        }
    }

    Ok(())
}

/// `POST /api/push` (multipart: `node_id`, `text`, `file`)
pub async fn push_handler(
    Extension(relay): Extension<Arc<ConnectRelay>>,
    Extension(blobs): Extension<Arc<dyn BlobStore>>,
    mut multipart: Multipart,
) -> Result<Json<StatusResponse>, ApiError> {
    let mut form = PushForm::default();
    if let Err(e) = read_push_form(&mut multipart, blobs.as_ref(), &mut form).await {
        form.discard_file().await;
        relay.metrics().errors_total.fetch_add(1, Ordering::Relaxed);
        return Err(e);
    }
    let device_id = DeviceId::new(form.node_id.take().unwrap_or_default());

    // Unknown devices leave no files behind.
    if relay.room_of(&device_id).is_none() {
        form.discard_file().await;
        relay.metrics().errors_total.fetch_add(1, Ordering::Relaxed);
        tracing::warn!("Push from unknown device {:?}", device_id);
        return Err(RelayError::DeviceNotFound { device_id }.into());
    }

    let body = match form.file.take() {
        Some(StagedFile {
            filename,
            mut writer,
        }) => {
            let size = writer.written();
            let reference = writer
                .commit()
                .await
                .map_err(RelayError::from)
                .inspect_err(|_| {
                    relay.metrics().errors_total.fetch_add(1, Ordering::Relaxed);
                })?;
            relay
                .metrics()
                .bytes_received
                .fetch_add(size, Ordering::Relaxed);
            EntryBody::file(reference, filename)
        }
        None => match form.text {
            Some(text) => EntryBody::text(text),
            None => EntryBody::empty_text(),
        },
    };

    relay.push(&device_id, body)?;
    Ok(Json(StatusResponse::ok()))
}

/// `GET /api/poll/:node_id`
pub async fn poll_handler(
    Extension(relay): Extension<Arc<ConnectRelay>>,
    Path(node_id): Path<String>,
) -> Json<Vec<Entry>> {
    Json(relay.poll(&DeviceId::new(node_id)))
}

/// `GET /api/participants/:node_id`
pub async fn participants_handler(
    Extension(relay): Extension<Arc<ConnectRelay>>,
    Path(node_id): Path<String>,
) -> Json<ParticipantsResponse> {
    Json(ParticipantsResponse {
        participants: relay.participants(&DeviceId::new(node_id)),
    })
}

/// `POST /api/bridge` (JSON: `{"ids": [...]}`)
pub async fn bridge_handler(
    Extension(relay): Extension<Arc<ConnectRelay>>,
    Json(request): Json<BridgeRequest>,
) -> Result<Json<BridgeResponse>, ApiError> {
    let room = relay.bridge(&request.ids)?;
    Ok(Json(BridgeResponse::linked(room)))
}

/// `GET /download/:reference`
pub async fn download_handler(
    Extension(blobs): Extension<Arc<dyn BlobStore>>,
    Path(reference): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let bytes = blobs.retrieve(&reference).await.map_err(RelayError::from)?;

    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        reference.replace('"', "")
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    Ok((
        [
            (CONTENT_TYPE, HeaderValue::from_static("application/octet-stream")),
            (CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}
