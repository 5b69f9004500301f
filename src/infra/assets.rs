//! Static front-end asset serving from the configured public directory.

use std::path::PathBuf;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use mime_guess::Mime;

use crate::application::error::ErrorReport;

const SOURCE: &str = "infra::assets::serve_public";
const INDEX_FILE: &str = "index.html";

#[derive(Debug, Clone)]
pub struct PublicAssets {
    root: PathBuf,
}

impl PublicAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a request path onto a file under the root, refusing traversal and
    /// directory paths.
    fn resolve(&self, path: Option<String>) -> Option<PathBuf> {
        let candidate = path.unwrap_or_default();
        let candidate = candidate.trim_start_matches('/');
        let candidate = if candidate.is_empty() {
            INDEX_FILE
        } else {
            candidate
        };

        if candidate.ends_with('/') || candidate.contains("..") || candidate.contains('\\') {
            return None;
        }
        Some(self.root.join(candidate))
    }

    async fn load(&self, path: Option<String>) -> Result<Option<(Bytes, Mime)>, std::io::Error> {
        let Some(file) = self.resolve(path) else {
            return Ok(None);
        };
        match tokio::fs::metadata(&file).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Ok(None),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err),
        }
        let contents = tokio::fs::read(&file).await?;
        let mime = mime_guess::from_path(&file).first_or_octet_stream();
        Ok(Some((Bytes::from(contents), mime)))
    }
}

pub async fn serve_index(State(assets): State<PublicAssets>) -> Response {
    serve(&assets, None).await
}

pub async fn serve_public(
    State(assets): State<PublicAssets>,
    Path(path): Path<String>,
) -> Response {
    serve(&assets, Some(path)).await
}

async fn serve(assets: &PublicAssets, path: Option<String>) -> Response {
    match assets.load(path).await {
        Ok(Some((bytes, mime))) => build_response(bytes, mime),
        Ok(None) => {
            let mut response = StatusCode::NOT_FOUND.into_response();
            ErrorReport::from_message(SOURCE, StatusCode::NOT_FOUND, "Static asset not found")
                .attach(&mut response);
            response
        }
        Err(err) => {
            let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
            ErrorReport::from_error(SOURCE, StatusCode::INTERNAL_SERVER_ERROR, &err)
                .attach(&mut response);
            response
        }
    }
}

fn build_response(bytes: Bytes, mime: Mime) -> Response {
    let len = bytes.len();
    let mut response = Response::new(Body::from(bytes));

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&len.to_string()) {
        headers.insert(header::CONTENT_LENGTH, value);
    }
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));

    response
}
