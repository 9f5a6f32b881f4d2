//! HTTP routes for the Cinder dev server.

use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State},
    http::{StatusCode, header},
    middleware,
    response::{IntoResponse, Json, Response},
    routing::get,
};
use cinder_core::BuildContext;
use cinder_core::artifacts::JAVASCRIPT_MIME;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::interceptor::artifact_interceptor;

/// Browser-safe stand-in for the `\0` marker of resolved virtual ids.
pub const NULL_BYTE_PLACEHOLDER: &str = "__x00__";

/// Create the router with all routes.
///
/// Artifact requests are intercepted before routing; unmatched paths are
/// served from the project's static directory.
pub fn create_router(ctx: Arc<BuildContext>) -> Router {
    let static_dir = ctx.config().resolve(&ctx.config().static_dir);

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/units", get(units_handler))
        .route("/@id/{*id}", get(virtual_module_handler))
        .fallback_service(ServeDir::new(static_dir))
        .layer(middleware::from_fn_with_state(ctx.clone(), artifact_interceptor))
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}

/// Health check handler.
async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Units of the current cycle and their last build outcome.
async fn units_handler(State(ctx): State<Arc<BuildContext>>) -> Json<serde_json::Value> {
    let units: Vec<_> = ctx
        .units()
        .iter()
        .map(|unit| {
            let built = ctx.report().unit(&unit.name).map(|r| r.succeeded());
            serde_json::json!({
                "unit": unit.info(),
                "built": built,
            })
        })
        .collect();

    Json(serde_json::json!({
        "mode": ctx.mode().to_string(),
        "units": units,
    }))
}

/// Load a virtual module by id, resolved or not.
async fn virtual_module_handler(
    State(ctx): State<Arc<BuildContext>>,
    Path(id): Path<String>,
) -> Response {
    let id = id.strip_prefix(NULL_BYTE_PLACEHOLDER).unwrap_or(&id);

    match ctx.virtual_modules().load(id) {
        Some(source) => (
            [
                (header::CONTENT_TYPE, JAVASCRIPT_MIME),
                (header::CACHE_CONTROL, "no-cache"),
            ],
            source.to_string(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, format!("Unknown module: {id}")).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use cinder_core::{CinderConfig, Mode};
    use std::fs;
    use std::path::Path as FsPath;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

    fn project(root: &FsPath) {
        let unit = root.join("crates/alpha");
        fs::create_dir_all(unit.join("src")).unwrap();
        fs::create_dir_all(unit.join("assets/img")).unwrap();
        fs::write(
            unit.join("Cargo.toml"),
            "[package]\nname = \"alpha\"\nversion = \"0.1.0\"\ndescription = \"Alpha\"\n",
        )
        .unwrap();
        fs::write(unit.join("assets/img/a.png"), PNG).unwrap();

        let out = root.join("src/wasm");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("alpha.js"), "export default function init() {}").unwrap();
        fs::write(out.join("alpha_bg.wasm"), b"\0asm").unwrap();

        fs::create_dir_all(root.join("public")).unwrap();
        fs::write(root.join("public/index.html"), "<html></html>").unwrap();
    }

    fn router(root: &FsPath, mode: Mode) -> Router {
        let config = CinderConfig::load(root).unwrap();
        let ctx = BuildContext::discover(config, mode).unwrap();
        create_router(Arc::new(ctx))
    }

    async fn get(app: Router, uri: &str) -> Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    fn content_type(res: &Response) -> &str {
        res.headers()[header::CONTENT_TYPE].to_str().unwrap()
    }

    async fn body(res: Response) -> Vec<u8> {
        to_bytes(res.into_body(), usize::MAX).await.unwrap().to_vec()
    }

    #[tokio::test]
    async fn test_serves_glue_and_wasm() {
        let temp = TempDir::new().unwrap();
        project(temp.path());

        let res = get(router(temp.path(), Mode::Development), "/wasm/alpha/index.js").await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(content_type(&res), "application/javascript");
        assert_eq!(res.headers()[header::CACHE_CONTROL], "no-cache");
        assert_eq!(body(res).await, b"export default function init() {}");

        let res = get(router(temp.path(), Mode::Development), "/wasm/alpha/index_bg.wasm").await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(content_type(&res), "application/wasm");

        let res = get(router(temp.path(), Mode::Development), "/wasm/alpha/alpha_bg.wasm?v=2").await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body(res).await, b"\0asm");
    }

    #[tokio::test]
    async fn test_serves_unit_asset() {
        let temp = TempDir::new().unwrap();
        project(temp.path());

        let res = get(router(temp.path(), Mode::Development), "/wasm/alpha/assets/img/a.png").await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(content_type(&res), "image/png");
        assert_eq!(body(res).await, PNG);
    }

    #[tokio::test]
    async fn test_asset_alias_in_development_only() {
        let temp = TempDir::new().unwrap();
        project(temp.path());

        let res = get(router(temp.path(), Mode::Development), "/assets/alpha/img/a.png").await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body(res).await, PNG);

        let res = get(router(temp.path(), Mode::Production), "/assets/alpha/img/a.png").await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unresolved_requests_fall_through() {
        let temp = TempDir::new().unwrap();
        project(temp.path());

        for uri in [
            "/wasm/ghost/index.js",
            "/wasm/alpha/other.js",
            "/wasm/alpha/assets/../Cargo.toml",
            "/wasm/alpha/assets/img/missing.png",
            "/wasmalpha/index.js",
        ] {
            let res = get(router(temp.path(), Mode::Development), uri).await;
            assert_eq!(res.status(), StatusCode::NOT_FOUND, "{uri}");
        }

        let res = get(router(temp.path(), Mode::Development), "/index.html").await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body(res).await, b"<html></html>");
    }

    #[tokio::test]
    async fn test_virtual_module_route() {
        let temp = TempDir::new().unwrap();
        project(temp.path());

        for uri in [
            "/@id/virtual:cinder/generated-wasms",
            "/@id/__x00__virtual:cinder/generated-wasms",
        ] {
            let res = get(router(temp.path(), Mode::Development), uri).await;
            assert_eq!(res.status(), StatusCode::OK, "{uri}");
            assert_eq!(content_type(&res), "application/javascript");
            let text = String::from_utf8(body(res).await).unwrap();
            assert_eq!(
                text,
                "export const wasm_crates = [{\"name\":\"alpha\",\"description\":\"Alpha\",\"version\":\"0.1.0\"}];\n"
            );
        }

        let res = get(router(temp.path(), Mode::Development), "/@id/virtual:cinder/other").await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health_and_units() {
        let temp = TempDir::new().unwrap();
        project(temp.path());

        let res = get(router(temp.path(), Mode::Development), "/health").await;
        assert_eq!(res.status(), StatusCode::OK);

        let res = get(router(temp.path(), Mode::Development), "/api/units").await;
        let json: serde_json::Value = serde_json::from_slice(&body(res).await).unwrap();
        assert_eq!(json["mode"], "development");
        assert_eq!(json["units"][0]["unit"]["name"], "alpha");
        assert!(json["units"][0]["built"].is_null());
    }
}
