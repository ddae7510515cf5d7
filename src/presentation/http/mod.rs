pub mod auth;
pub mod files;
pub mod health;
pub mod revalidate;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::bootstrap::app_context::AppContext;

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::me,
        files::upload_file,
        files::list_files,
        files::rename_file,
        files::update_file_users,
        files::delete_file,
        files::get_space,
        revalidate::revalidation_stream,
        health::health,
    ),
    components(schemas(
        auth::UserResponse,
        files::FileResponse,
        files::FileListResponse,
        files::UploadFileMultipart,
        files::RenameFileRequest,
        files::UpdateFileUsersRequest,
        files::DeleteFileRequest,
        files::DeleteFileResponse,
        files::SpaceBucketResponse,
        files::StorageUsageResponse,
        files::SpaceResponse,
        health::HealthResp,
    )),
    tags(
        (name = "Auth", description = "Current user"),
        (name = "Files", description = "File storage and sharing"),
        (name = "Health", description = "System health checks")
    )
)]
pub struct ApiDoc;

/// Every `/api` route plus Swagger UI. CORS and tracing layers are added by the
/// binary.
pub fn api_router(ctx: AppContext) -> Router {
    let upload_max_bytes = ctx.cfg.upload_max_bytes;
    Router::new()
        .nest("/api", health::routes(ctx.clone()))
        .nest("/api", auth::routes(ctx.clone()))
        .nest("/api", files::routes(ctx.clone()))
        .nest("/api", revalidate::routes(ctx))
        .merge(SwaggerUi::new("/api/docs").url("/api/openapi.json", ApiDoc::openapi()))
        // Global body size limit for uploads (configurable)
        .layer(DefaultBodyLimit::max(upload_max_bytes))
}
