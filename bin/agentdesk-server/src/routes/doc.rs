use crate::routes;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(info(
    title = "agentdesk-server",
    description = "In-memory development API for the agent console",
    version = "0.1.0"
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(routes::api_docs());
    root
}
