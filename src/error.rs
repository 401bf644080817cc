//! The single status-code mapping table for both engines (spec.md §7).

// ----------

use http::{Method, StatusCode, Uri};

use wgk_core::response::{IntoResponse, Response};

use crate::{multipart::MultipartError, BoxedError};

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

/// Every failure mode the engines can raise, with its HTTP status baked in.
///
/// This is the only place spec.md §7's table is encoded; both the page
/// engine's error-page path and the REST engine's JSON envelope read
/// [`GatewayError::status_code`] rather than re-deriving it.
#[non_exhaustive]
#[derive(Debug, crate::ImplError)]
pub enum GatewayError {
	/// No page or method handler is bound to `(uri, method)`.
	#[error("no page bound to {method} {uri}")]
	UnboundPage { method: Method, uri: Uri },

	/// A query-string or header key carried more than one value (spec.md §4.1
	/// step 7, §8 property 4).
	#[error("Too many values for {name}")]
	TooManyValues { name: String },

	/// A field declared on the page or handler was required but absent.
	#[error("missing required field {name}")]
	MissingField { name: String },

	/// A field's validator rejected its value.
	#[error("invalid value for field {name}: {reason}")]
	InvalidFieldValue { name: String, reason: String },

	/// A page bound with role ERROR was dispatched directly (spec.md §4.1
	/// step 5: "record status 400").
	#[error("{reason}")]
	BadRequest { reason: String },

	/// Authorization check (`checkConnection` / `checkHandlerSessionCorrectness`)
	/// rejected the request outright.
	#[error("forbidden")]
	Forbidden,

	/// Authorization check rejected the request's credentials specifically.
	#[error("invalid authentication")]
	Unauthorized,

	/// A `DataModelHandler` found no entity for the given primary key.
	#[error("not found")]
	NotFound,

	/// The URI matched a registered base but not with a method/path-segment
	/// combination any rule in spec.md §4.4's table allows.
	#[error("method {method} not allowed")]
	MethodNotAllowed { method: Method, allowed: String },

	/// The multipart or urlencoded body decoder refused the body.
	#[error(transparent)]
	NotAcceptable(#[from] MultipartError),

	/// Anything else: a handler panic-equivalent, an I/O failure, ...
	#[error("internal error")]
	Internal(#[source] BoxedError),
}

impl GatewayError {
	pub fn internal<E: Into<BoxedError>>(error: E) -> Self {
		Self::Internal(error.into())
	}

	pub fn status_code(&self) -> StatusCode {
		use GatewayError::*;

		match self {
			UnboundPage { .. } => StatusCode::NOT_FOUND,
			TooManyValues { .. } | MissingField { .. } | InvalidFieldValue { .. } | BadRequest { .. } => {
				StatusCode::BAD_REQUEST
			}
			Forbidden => StatusCode::FORBIDDEN,
			Unauthorized => StatusCode::UNAUTHORIZED,
			NotFound => StatusCode::NOT_FOUND,
			MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
			NotAcceptable(_) => StatusCode::NOT_ACCEPTABLE,
			Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	/// The `Allow` header value for a [`GatewayError::MethodNotAllowed`], if any.
	pub fn allowed_methods(&self) -> Option<&str> {
		match self {
			GatewayError::MethodNotAllowed { allowed, .. } => Some(allowed),
			_ => None,
		}
	}
}

/// A minimal, dependency-free HTML error body. Used for the headless and
/// force-close paths of §4.5, where no page template can be resolved.
impl IntoResponse for GatewayError {
	fn into_response(self) -> Response {
		let status = self.status_code();
		let mut response = status.into_response();

		*response.body_mut() = wgk_core::body::Body::new(http_body_util::Full::from(format!(
			"<html><body>Error {self}</body></html>"
		)));

		response.headers_mut().insert(
			http::header::CONTENT_TYPE,
			http::HeaderValue::from_static("text/html; charset=utf-8"),
		);

		response
	}
}

impl GatewayError {
	/// The REST engine's `detail` value for this error (spec.md §3's
	/// `RestArgument.detail`, §7's "JSON error envelope with detail filled").
	pub fn detail_or_message(&self) -> serde_json::Value {
		serde_json::json!({ "message": self.to_string() })
	}
}

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn status_codes_match_table() {
		assert_eq!(
			GatewayError::TooManyValues { name: "x".into() }.status_code(),
			StatusCode::BAD_REQUEST
		);
		assert_eq!(GatewayError::Forbidden.status_code(), StatusCode::FORBIDDEN);
		assert_eq!(GatewayError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
		assert_eq!(GatewayError::NotFound.status_code(), StatusCode::NOT_FOUND);
		assert_eq!(
			GatewayError::MethodNotAllowed {
				method: Method::PATCH,
				allowed: "GET,POST".into()
			}
			.status_code(),
			StatusCode::METHOD_NOT_ALLOWED
		);
		assert_eq!(
			GatewayError::Internal(String::from("boom").into()).status_code(),
			StatusCode::INTERNAL_SERVER_ERROR
		);
	}

	#[test]
	fn too_many_values_message_matches_spec() {
		let error = GatewayError::TooManyValues { name: "x".into() };
		assert_eq!(error.to_string(), "Too many values for x");
	}
}
