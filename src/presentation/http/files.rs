use axum::{
    Json, Router,
    extract::{Multipart, Path as AxumPath, Query, State},
    http::StatusCode,
    routing::{delete, get, patch, post, put},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::application::ports::document_store::is_not_found;
use crate::application::services::file_query::{DEFAULT_SORT, section_types};
use crate::application::services::space::{StorageUsage, usage};
use crate::application::use_cases::files::FileActionError;
use crate::application::use_cases::files::delete_file::DeleteFile;
use crate::application::use_cases::files::get_total_space_used::GetTotalSpaceUsed;
use crate::application::use_cases::files::list_files::{ListFiles, ListFilesParams};
use crate::application::use_cases::files::rename_file::RenameFile;
use crate::application::use_cases::files::update_file_users::UpdateFileUsers;
use crate::application::use_cases::files::upload_file::{UploadFile, UploadFileInput};
use crate::bootstrap::app_context::AppContext;
use crate::domain::files::file::FileRecord;
use crate::domain::files::file_type::FileType;
use crate::domain::files::space::{SpaceBucket, SpaceSummary};
use crate::presentation::http::auth::{Bearer, session_from_bearer};

pub fn routes(ctx: AppContext) -> Router {
    Router::new()
        .route("/files", post(upload_file).get(list_files))
        .route("/files/space", get(get_space))
        .route("/files/:id", delete(delete_file))
        .route("/files/:id/name", patch(rename_file))
        .route("/files/:id/users", put(update_file_users))
        .with_state(ctx)
}

fn status_for(err: &FileActionError) -> StatusCode {
    match err {
        FileActionError::Unauthenticated => StatusCode::UNAUTHORIZED,
        FileActionError::MissingField(_) => StatusCode::BAD_REQUEST,
        FileActionError::Backend(inner) if is_not_found(inner) => StatusCode::NOT_FOUND,
        FileActionError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FileResponse {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "type")]
    pub file_type: String,
    pub name: String,
    pub url: Option<String>,
    pub extension: String,
    pub size: u64,
    pub owner: String,
    #[serde(rename = "accountId")]
    pub account_id: String,
    pub users: Vec<String>,
    #[serde(rename = "bucketFileId")]
    pub bucket_file_id: String,
    #[serde(rename = "$createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "$updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl From<FileRecord> for FileResponse {
    fn from(r: FileRecord) -> Self {
        Self {
            id: r.id,
            file_type: r.file_type.as_str().to_string(),
            name: r.name,
            url: r.url,
            extension: r.extension,
            size: r.size,
            owner: r.owner,
            account_id: r.account_id,
            users: r.users,
            bucket_file_id: r.bucket_file_id,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FileListResponse {
    pub total: u64,
    pub documents: Vec<FileResponse>,
}

#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadFileMultipart {
    /// File to upload
    #[schema(value_type = String, format = Binary)]
    file: String,
    /// Owning user id; defaults to the caller
    #[schema(rename = "ownerId")]
    owner_id: Option<String>,
    /// Owning account id; defaults to the caller's account
    #[schema(rename = "accountId")]
    account_id: Option<String>,
    /// Page path to revalidate
    path: String,
}

/// POST /api/files (multipart/form-data)
#[utoipa::path(
    post,
    path = "/api/files",
    tag = "Files",
    request_body(content = UploadFileMultipart, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "File uploaded", body = FileResponse),
        (status = 400, description = "Missing file, path or account"),
        (status = 401, description = "Unauthenticated")
    )
)]
pub async fn upload_file(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<FileResponse>), StatusCode> {
    let session = session_from_bearer(&ctx.cfg, bearer)?;

    let mut file: Option<(String, Vec<u8>)> = None;
    let mut owner_id: Option<String> = None;
    let mut account_id: Option<String> = None;
    let mut path: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?
    {
        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some("file") => {
                let filename = field
                    .file_name()
                    .map(|s| s.to_string())
                    .filter(|s| !s.trim().is_empty())
                    .ok_or(StatusCode::BAD_REQUEST)?;
                let bytes = field.bytes().await.map_err(|err| {
                    tracing::warn!(error = ?err, "upload_body_read_failed");
                    StatusCode::BAD_REQUEST
                })?;
                file = Some((filename, bytes.to_vec()));
            }
            Some("ownerId") => {
                owner_id = Some(field.text().await.map_err(|_| StatusCode::BAD_REQUEST)?);
            }
            Some("accountId") => {
                account_id = Some(field.text().await.map_err(|_| StatusCode::BAD_REQUEST)?);
            }
            Some("path") => {
                path = Some(field.text().await.map_err(|_| StatusCode::BAD_REQUEST)?);
            }
            _ => {}
        }
    }

    let (filename, bytes) = file.ok_or(StatusCode::BAD_REQUEST)?;
    let path = path.ok_or(StatusCode::BAD_REQUEST)?;

    let store = ctx.document_store();
    let objects = ctx.object_store();
    let users = ctx.user_directory();
    let revalidator = ctx.revalidator();
    let uc = UploadFile {
        store: store.as_ref(),
        objects: objects.as_ref(),
        users: users.as_ref(),
        revalidator: revalidator.as_ref(),
    };
    let record = uc
        .execute(
            &session,
            UploadFileInput {
                bytes,
                filename,
                owner_id,
                account_id,
                path,
            },
        )
        .await
        .map_err(|err| status_for(&err))?;
    Ok((StatusCode::CREATED, Json(record.into())))
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListFilesQuery {
    /// Comma-separated file types; wins over `section`
    pub types: Option<String>,
    /// Navigation section: documents, images, media, others, dashboard
    pub section: Option<String>,
    #[serde(rename = "searchText")]
    pub search_text: Option<String>,
    /// `<field>-<asc|desc>`, default `$createdAt-desc`
    pub sort: Option<String>,
    pub limit: Option<u32>,
}

fn parse_types(raw: &str) -> Result<Vec<FileType>, StatusCode> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<FileType>().map_err(|_| StatusCode::BAD_REQUEST))
        .collect()
}

fn list_params(q: ListFilesQuery) -> Result<ListFilesParams, StatusCode> {
    let mut types = match q.types.as_deref() {
        Some(raw) => parse_types(raw)?,
        None => Vec::new(),
    };
    if types.is_empty() {
        if let Some(section) = q.section.as_deref() {
            types = section_types(section).ok_or(StatusCode::BAD_REQUEST)?;
        }
    }
    Ok(ListFilesParams {
        types,
        search_text: q.search_text.unwrap_or_default(),
        sort: q
            .sort
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SORT.to_string()),
        limit: q.limit,
    })
}

#[utoipa::path(
    get,
    path = "/api/files",
    tag = "Files",
    params(ListFilesQuery),
    responses(
        (status = 200, body = FileListResponse),
        (status = 400, description = "Unknown type or section"),
        (status = 401, description = "Unauthenticated")
    )
)]
pub async fn list_files(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Query(q): Query<ListFilesQuery>,
) -> Result<Json<FileListResponse>, StatusCode> {
    let session = session_from_bearer(&ctx.cfg, bearer)?;
    let params = list_params(q)?;
    let store = ctx.document_store();
    let users = ctx.user_directory();
    let uc = ListFiles {
        store: store.as_ref(),
        users: users.as_ref(),
        candidate_limit: ctx.cfg.shared_candidate_limit,
    };
    let list = uc
        .execute(&session, &params)
        .await
        .map_err(|err| status_for(&err))?;
    Ok(Json(FileListResponse {
        total: list.total,
        documents: list.documents.into_iter().map(Into::into).collect(),
    }))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RenameFileRequest {
    pub name: String,
    pub extension: String,
    pub path: String,
}

#[utoipa::path(
    patch,
    path = "/api/files/{id}/name",
    tag = "Files",
    request_body = RenameFileRequest,
    params(("id" = String, Path, description = "File document id")),
    responses(
        (status = 200, body = FileResponse),
        (status = 404, description = "Not found")
    )
)]
pub async fn rename_file(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<RenameFileRequest>,
) -> Result<Json<FileResponse>, StatusCode> {
    session_from_bearer(&ctx.cfg, bearer)?;
    let store = ctx.document_store();
    let revalidator = ctx.revalidator();
    let uc = RenameFile {
        store: store.as_ref(),
        revalidator: revalidator.as_ref(),
    };
    let record = uc
        .execute(&id, &req.name, &req.extension, &req.path)
        .await
        .map_err(|err| status_for(&err))?;
    Ok(Json(record.into()))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateFileUsersRequest {
    pub emails: Vec<String>,
    pub path: String,
}

#[utoipa::path(
    put,
    path = "/api/files/{id}/users",
    tag = "Files",
    request_body = UpdateFileUsersRequest,
    params(("id" = String, Path, description = "File document id")),
    responses(
        (status = 200, body = FileResponse),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_file_users(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<UpdateFileUsersRequest>,
) -> Result<Json<FileResponse>, StatusCode> {
    session_from_bearer(&ctx.cfg, bearer)?;
    let store = ctx.document_store();
    let revalidator = ctx.revalidator();
    let uc = UpdateFileUsers {
        store: store.as_ref(),
        revalidator: revalidator.as_ref(),
    };
    let record = uc
        .execute(&id, &req.emails, &req.path)
        .await
        .map_err(|err| status_for(&err))?;
    Ok(Json(record.into()))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DeleteFileRequest {
    #[serde(rename = "bucketFileId")]
    pub bucket_file_id: String,
    pub path: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteFileResponse {
    pub status: String,
}

#[utoipa::path(
    delete,
    path = "/api/files/{id}",
    tag = "Files",
    request_body = DeleteFileRequest,
    params(("id" = String, Path, description = "File document id")),
    responses(
        (status = 200, body = DeleteFileResponse),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_file(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<DeleteFileRequest>,
) -> Result<Json<DeleteFileResponse>, StatusCode> {
    session_from_bearer(&ctx.cfg, bearer)?;
    let store = ctx.document_store();
    let objects = ctx.object_store();
    let revalidator = ctx.revalidator();
    let uc = DeleteFile {
        store: store.as_ref(),
        objects: objects.as_ref(),
        revalidator: revalidator.as_ref(),
    };
    uc.execute(&id, &req.bucket_file_id, &req.path)
        .await
        .map_err(|err| status_for(&err))?;
    Ok(Json(DeleteFileResponse {
        status: "success".into(),
    }))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SpaceBucketResponse {
    pub size: u64,
    #[serde(rename = "latestDate")]
    pub latest_date: Option<DateTime<Utc>>,
}

impl From<&SpaceBucket> for SpaceBucketResponse {
    fn from(b: &SpaceBucket) -> Self {
        Self {
            size: b.size,
            latest_date: b.latest_date,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StorageUsageResponse {
    pub used: u64,
    pub total: u64,
    pub percent: f64,
    #[serde(rename = "usedLabel")]
    pub used_label: String,
    #[serde(rename = "totalLabel")]
    pub total_label: String,
}

impl From<StorageUsage> for StorageUsageResponse {
    fn from(u: StorageUsage) -> Self {
        Self {
            used: u.used,
            total: u.total,
            percent: u.percent,
            used_label: u.used_label,
            total_label: u.total_label,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SpaceResponse {
    pub document: SpaceBucketResponse,
    pub image: SpaceBucketResponse,
    pub video: SpaceBucketResponse,
    pub audio: SpaceBucketResponse,
    pub other: SpaceBucketResponse,
    pub used: u64,
    pub all: u64,
    pub usage: StorageUsageResponse,
}

impl SpaceResponse {
    fn new(summary: &SpaceSummary, display_quota_bytes: u64) -> Self {
        Self {
            document: summary.bucket(FileType::Document).into(),
            image: summary.bucket(FileType::Image).into(),
            video: summary.bucket(FileType::Video).into(),
            audio: summary.bucket(FileType::Audio).into(),
            other: summary.bucket(FileType::Other).into(),
            used: summary.used,
            all: summary.all,
            usage: usage(summary.used, display_quota_bytes).into(),
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/files/space",
    tag = "Files",
    responses(
        (status = 200, body = SpaceResponse),
        (status = 401, description = "Unauthenticated")
    )
)]
pub async fn get_space(
    State(ctx): State<AppContext>,
    bearer: Bearer,
) -> Result<Json<SpaceResponse>, StatusCode> {
    let session = session_from_bearer(&ctx.cfg, bearer)?;
    let store = ctx.document_store();
    let users = ctx.user_directory();
    let uc = GetTotalSpaceUsed {
        store: store.as_ref(),
        users: users.as_ref(),
        quota_bytes: ctx.cfg.storage_quota_bytes,
    };
    let summary = uc
        .execute(&session)
        .await
        .map_err(|err| status_for(&err))?;
    Ok(Json(SpaceResponse::new(
        &summary,
        ctx.cfg.display_quota_bytes,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::document_store::BackendError;

    #[test]
    fn explicit_types_win_over_section() {
        let params = list_params(ListFilesQuery {
            types: Some("image, audio".into()),
            section: Some("documents".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(params.types, vec![FileType::Image, FileType::Audio]);
        assert_eq!(params.sort, DEFAULT_SORT);
    }

    #[test]
    fn section_expands_to_types() {
        let params = list_params(ListFilesQuery {
            section: Some("media".into()),
            sort: Some("name-asc".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(params.types, vec![FileType::Video, FileType::Audio]);
        assert_eq!(params.sort, "name-asc");
    }

    #[test]
    fn rejects_unknown_type_or_section() {
        let bad_type = list_params(ListFilesQuery {
            types: Some("spreadsheet".into()),
            ..Default::default()
        });
        assert_eq!(bad_type.unwrap_err(), StatusCode::BAD_REQUEST);
        let bad_section = list_params(ListFilesQuery {
            section: Some("trash".into()),
            ..Default::default()
        });
        assert_eq!(bad_section.unwrap_err(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn maps_errors_to_statuses() {
        assert_eq!(
            status_for(&FileActionError::Unauthenticated),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_for(&FileActionError::MissingField("accountId")),
            StatusCode::BAD_REQUEST
        );
        let gone = FileActionError::Backend(BackendError::not_found("gone").into());
        assert_eq!(status_for(&gone), StatusCode::NOT_FOUND);
        let boom = FileActionError::Backend(anyhow::anyhow!("boom"));
        assert_eq!(status_for(&boom), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
