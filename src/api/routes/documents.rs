//! Document handlers: search, preview, download, e-mail.

use super::{DownloadEncoding, DownloadQuery, DownloadRequest, EmailRequest, MISSING_IDS_HEADER};
use crate::api::AppState;
use crate::api::extract::{ValidJson, ValidQuery, query_values};
use crate::documents::encode_download;
use crate::error::{Error, Result};
use crate::types::{DocumentId, DocumentIds, Packaged, PartNumbers};
use axum::{
    Json,
    extract::{Path, RawQuery, State},
    http::{HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;

/// GET /documents/search - Metadata for documents matching part numbers
#[utoipa::path(
    get,
    path = "/api/v1/documents/search",
    tag = "documents",
    params(
        ("part_numbers" = Vec<String>, Query, description = "Part numbers, 1 to 10; repeat the parameter or separate with commas (e.g. 10,20,30)")
    ),
    responses(
        (status = 200, description = "Matching documents and part numbers without matches", body = crate::types::SearchResult),
        (status = 401, description = "Missing or invalid token", body = crate::error::ApiError),
        (status = 403, description = "Caller lacks search permission", body = crate::error::ApiError),
        (status = 422, description = "Invalid part numbers", body = crate::error::ApiError),
        (status = 502, description = "Upstream failure", body = crate::error::ApiError),
        (status = 504, description = "Upstream timeout", body = crate::error::ApiError)
    ),
    security(("bearer" = []))
)]
pub async fn search_documents(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<impl IntoResponse> {
    let values = query_values(query.as_deref(), "part_numbers");
    let part_numbers = PartNumbers::from_values(values.iter().map(String::as_str))?;
    let result = state.service.search(&part_numbers).await?;
    Ok(Json(result))
}

/// GET /documents/:id/preview - Base64 content of one document
#[utoipa::path(
    get,
    path = "/api/v1/documents/{id}/preview",
    tag = "documents",
    params(
        ("id" = String, Path, description = "Document ID")
    ),
    responses(
        (status = 200, description = "Document content", body = crate::types::PreviewResponse),
        (status = 401, description = "Missing or invalid token", body = crate::error::ApiError),
        (status = 403, description = "Caller lacks preview permission", body = crate::error::ApiError),
        (status = 404, description = "Document not found", body = crate::error::ApiError),
        (status = 502, description = "Upstream failure", body = crate::error::ApiError),
        (status = 504, description = "Upstream timeout", body = crate::error::ApiError)
    ),
    security(("bearer" = []))
)]
pub async fn preview_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let preview = state.service.preview(&DocumentId::new(id)).await?;
    Ok(Json(preview))
}

/// POST /documents/download - One document as a file, several as a zip archive
#[utoipa::path(
    post,
    path = "/api/v1/documents/download",
    tag = "documents",
    params(
        ("encoding" = Option<DownloadEncoding>, Query, description = "base64 for a JSON body instead of a file attachment")
    ),
    request_body = DownloadRequest,
    responses(
        (status = 200, description = "The document (application/pdf) or an archive (application/zip); identifiers left out are listed in X-Missing-Document-Ids. With encoding=base64 a JSON body instead", body = crate::types::EncodedDownload),
        (status = 401, description = "Missing or invalid token", body = crate::error::ApiError),
        (status = 403, description = "Caller lacks download permission", body = crate::error::ApiError),
        (status = 404, description = "None of the documents could be retrieved", body = crate::error::ApiError),
        (status = 422, description = "Invalid document ID list", body = crate::error::ApiError)
    ),
    security(("bearer" = []))
)]
pub async fn download_documents(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<DownloadQuery>,
    ValidJson(request): ValidJson<DownloadRequest>,
) -> Result<Response> {
    let ids = DocumentIds::parse(request.document_ids)?;
    let packaged = state.service.download(&ids).await?;

    if !packaged.missing.is_empty() {
        tracing::info!(
            delivered = ids.len() - packaged.missing.len(),
            missing = packaged.missing.len(),
            "Download delivered with missing documents"
        );
    }

    Ok(match query.encoding {
        DownloadEncoding::Base64 => Json(encode_download(&packaged, Utc::now())).into_response(),
        DownloadEncoding::Binary => attachment_response(packaged)?,
    })
}

/// POST /documents/email - Send documents to an address in the allowed domain
#[utoipa::path(
    post,
    path = "/api/v1/documents/email",
    tag = "documents",
    request_body = EmailRequest,
    responses(
        (status = 200, description = "Mail sent; lists documents that could not be attached", body = crate::types::EmailReport),
        (status = 401, description = "Missing or invalid token", body = crate::error::ApiError),
        (status = 403, description = "Caller lacks e-mail permission", body = crate::error::ApiError),
        (status = 404, description = "None of the documents could be retrieved", body = crate::error::ApiError),
        (status = 413, description = "Attachment exceeds the mail size limit", body = crate::error::ApiError),
        (status = 422, description = "Invalid document IDs or recipient", body = crate::error::ApiError),
        (status = 502, description = "Mail delivery failed", body = crate::error::ApiError)
    ),
    security(("bearer" = []))
)]
pub async fn email_documents(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<EmailRequest>,
) -> Result<impl IntoResponse> {
    let ids = DocumentIds::parse(request.document_ids)?;
    let report = state.service.email(&ids, &request.email).await?;
    Ok(Json(report))
}

/// File attachment with the missing identifiers in a header
fn attachment_response(packaged: Packaged) -> Result<Response> {
    let Packaged { content, missing } = packaged;

    let mut response = (StatusCode::OK, content.bytes).into_response();
    let headers = response.headers_mut();

    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content.mime_type),
    );
    let disposition = HeaderValue::try_from(format!(
        "attachment; filename=\"{}\"",
        content.file_name
    ))
    .map_err(|e| Error::Other(format!("invalid file name '{}': {e}", content.file_name)))?;
    headers.insert(header::CONTENT_DISPOSITION, disposition);

    if !missing.is_empty() {
        let joined = missing
            .iter()
            .map(|id| urlencoding::encode(id.as_str()).into_owned())
            .collect::<Vec<_>>()
            .join(",");
        // Percent-encoding leaves only visible ASCII
        let value = HeaderValue::try_from(joined)
            .map_err(|e| Error::Other(format!("invalid missing-ids header: {e}")))?;
        headers.insert(HeaderName::from_static(MISSING_IDS_HEADER), value);
    }

    Ok(response)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PackagedContent;

    fn packaged(file_name: &str, missing: &[&str]) -> Packaged {
        Packaged {
            content: PackagedContent {
                file_name: file_name.to_string(),
                bytes: b"%PDF".to_vec(),
                mime_type: "application/pdf",
            },
            missing: missing.iter().map(|id| DocumentId::from(*id)).collect(),
        }
    }

    #[test]
    fn attachment_sets_disposition_and_missing_ids() {
        let response = attachment_response(packaged("document_A.pdf", &["B", "C D"])).unwrap();

        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"document_A.pdf\""
        );
        assert_eq!(response.headers()[MISSING_IDS_HEADER], "B,C%20D");
    }

    #[test]
    fn unrepresentable_file_name_is_an_error() {
        let result = attachment_response(packaged("bad\nname.pdf", &[]));

        assert!(matches!(result, Err(Error::Other(_))));
    }
}
