use utoipa::OpenApi;

use crate::routes::{health, query, session, upload};

#[derive(OpenApi)]
#[openapi(info(
    title = "csvchat-server",
    description = "Upload a CSV and chat with it",
    version = "0.1.0",
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(health::HealthApi::openapi());
    root.merge(upload::UploadApi::openapi());
    root.merge(query::QueryApi::openapi());
    root.merge(session::SessionApi::openapi());
    root
}
