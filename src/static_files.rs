//! GET fallback: serves a file under the configured static root when no page
//! or REST handler claims the path (spec.md §4.1 step 3).

// ----------

use std::path::{Component, Path, PathBuf};

use http::{header::CONTENT_TYPE, HeaderValue, StatusCode};

use wgk_core::{body::Body, response::Response};

use crate::error::GatewayError;

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

/// Reads `request_path` relative to `base_dir` and returns its contents as a
/// response. `..`/root components in `request_path` are rejected outright
/// rather than normalized, so a crafted path can't escape `base_dir`.
pub async fn serve(request_path: &str, base_dir: &Path) -> Result<Response, GatewayError> {
	let relative = sanitize(request_path).ok_or(GatewayError::NotFound)?;
	let path = base_dir.join(&relative);

	let metadata = tokio::fs::metadata(&path).await.map_err(|_| GatewayError::NotFound)?;

	if !metadata.is_file() {
		return Err(GatewayError::NotFound);
	}

	let contents = tokio::fs::read(&path).await.map_err(GatewayError::internal)?;

	let content_type = guess_content_type(&path);

	let mut response = Response::builder()
		.status(StatusCode::OK)
		.body(Body::from(contents))
		.expect("status and body are always valid");

	response.headers_mut().insert(CONTENT_TYPE, content_type);

	Ok(response)
}

/// Strips the leading `/` and rejects any `..`/root/prefix component, leaving
/// only a relative path made of plain segments.
fn sanitize(request_path: &str) -> Option<PathBuf> {
	let mut sanitized = PathBuf::new();

	for component in Path::new(request_path).components() {
		match component {
			Component::Normal(segment) => sanitized.push(segment),
			Component::CurDir => {}
			_ => return None,
		}
	}

	Some(sanitized)
}

#[cfg(feature = "file-stream")]
fn guess_content_type(path: &Path) -> HeaderValue {
	let mime = mime_guess::from_path(path).first_or_octet_stream();

	HeaderValue::from_str(mime.as_ref()).unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"))
}

#[cfg(not(feature = "file-stream"))]
fn guess_content_type(_path: &Path) -> HeaderValue {
	HeaderValue::from_static("application/octet-stream")
}

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn sanitize_rejects_parent_traversal() {
		assert!(sanitize("../etc/passwd").is_none());
		assert!(sanitize("/../etc/passwd").is_none());
	}

	#[test]
	fn sanitize_keeps_plain_relative_path() {
		let sanitized = sanitize("/assets/logo.png").unwrap();
		assert_eq!(sanitized, PathBuf::from("assets/logo.png"));
	}

	#[tokio::test]
	async fn serve_returns_not_found_for_missing_file() {
		let error = serve("/does/not/exist.txt", Path::new("/tmp")).await.unwrap_err();
		assert!(matches!(error, GatewayError::NotFound));
	}
}
