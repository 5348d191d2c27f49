use utoipa::OpenApi;

use crate::routes::{health, media};

#[derive(OpenApi)]
#[openapi(info(
    title = "vidgrab-server",
    description = "Metadata and media relay over yt-dlp",
    version = "0.1.0",
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(health::HealthApi::openapi());
    root.merge(media::MediaApi::openapi());
    root
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn documents_every_route() {
        let docs = get_docs();
        for path in ["/api/health", "/api/info", "/api/download"] {
            assert!(docs.paths.paths.contains_key(path), "{path} missing from OpenAPI");
        }
    }
}
