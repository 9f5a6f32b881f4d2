//! Artifact interceptor middleware.
//!
//! Requests under the configured URL prefix (and, in development, the
//! `/assets/<unit>/` alias) are answered straight from the unit's build output
//! or asset directory. Anything that does not resolve to an existing file
//! falls through to the next handler untouched.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderValue, Method, header},
    middleware::Next,
    response::Response,
};
use cinder_core::{BuildContext, Mode, ResolvedArtifact};
use tower::ServiceExt;
use tower_http::services::ServeFile;

/// Serve resolved artifacts, or pass the request on.
pub async fn artifact_interceptor(
    State(ctx): State<Arc<BuildContext>>,
    req: Request,
    next: Next,
) -> Response {
    if req.method() != Method::GET && req.method() != Method::HEAD {
        return next.run(req).await;
    }

    let Some(artifact) = lookup(&ctx, req.uri().path()) else {
        return next.run(req).await;
    };

    let Ok(mime) = artifact.content_type.parse::<mime_guess::Mime>() else {
        return next.run(req).await;
    };

    tracing::debug!(unit = %artifact.unit, "Serving {}", artifact.file.display());

    let response = match ServeFile::new_with_mime(&artifact.file, &mime).oneshot(req).await {
        Ok(response) => response,
        Err(never) => match never {},
    };

    let mut response = response.map(Body::new);
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response
}

/// Resolve a request path to an existing file.
fn lookup(ctx: &BuildContext, path: &str) -> Option<ResolvedArtifact> {
    let resolver = ctx.resolver();
    let artifact = resolver.resolve(path).or_else(|| {
        (ctx.mode() == Mode::Development)
            .then(|| resolver.resolve_alias(path))
            .flatten()
    })?;

    if artifact.file.is_file() {
        Some(artifact)
    } else {
        tracing::debug!(unit = %artifact.unit, "Not built yet: {}", artifact.file.display());
        None
    }
}
