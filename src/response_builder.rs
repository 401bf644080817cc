//! Assembles responses from a status and an optional body, handling
//! keep-alive, cookies, and `Referer` (spec.md §4.5).

// ----------

use http::{
	header::{CONNECTION, CONTENT_LENGTH, REFERER},
	HeaderValue, StatusCode, Version,
};

use wgk_core::{body::Body, response::Response};

use crate::{config::GatewayConfig, cookie::CookieJar, session::Session};

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

/// What the response depends on besides status/body: the request's HTTP
/// version and connection intent, the request context's prior `willClose`,
/// the cookies to echo/mint, and the `Referer` to echo back.
pub struct ResponseContext<'a> {
	pub request_version: Version,
	pub connection_close_requested: bool,
	pub keep_alive_requested: bool,
	pub prior_will_close: bool,
	pub referer: Option<HeaderValue>,
}

/// Result of [`ResponseBuilder::build`]: the response plus the connection's
/// updated `willClose` state, which the caller folds back into the request
/// context (spec.md §3: "`willClose` is monotonic").
pub struct BuiltResponse {
	pub response: Response,
	pub will_close: bool,
}

pub struct ResponseBuilder;

impl ResponseBuilder {
	/// The formula from spec.md §4.5:
	/// `willClose = prior_willClose ∨ status ≠ 200 ∨ Connection: close ∨ (HTTP/1.0 ∧ ¬keep-alive)`.
	pub fn build(
		ctx: ResponseContext,
		status: StatusCode,
		body: Option<Body>,
		cookies: &mut CookieJar,
		session: &Session,
		config: &GatewayConfig,
	) -> BuiltResponse {
		let is_http_1_0 = ctx.request_version == Version::HTTP_10;

		let will_close = ctx.prior_will_close
			|| status != StatusCode::OK
			|| ctx.connection_close_requested
			|| (is_http_1_0 && !ctx.keep_alive_requested);

		ensure_session_cookie(cookies, session, config);

		let body = body.unwrap_or_else(|| Body::from(()));
		let content_length = body_len(&body);

		let mut builder = Response::builder().status(status).version(ctx.request_version);

		if let Some(length) = content_length {
			builder = builder.header(CONTENT_LENGTH, length);
		}

		if !will_close {
			builder = builder.header(CONNECTION, HeaderValue::from_static("keep-alive"));
		}

		if let Some(referer) = ctx.referer {
			builder = builder.header(REFERER, referer);
		}

		let mut response = builder.body(body).expect("status/version/headers are always valid");

		cookies.write_set_cookie_headers(response.headers_mut());

		BuiltResponse { response, will_close }
	}

	/// The catastrophic-failure path (spec.md §4.5 "Force-close path", §9
	/// "Error-in-error guard"): a fixed minimal HTML body, HTTP/1.0, always
	/// closing. Must never itself fail.
	pub fn for_headless_failure(status: StatusCode, reason: &str) -> BuiltResponse {
		let body = Body::from(format!("<html><body>Error {reason}</body></html>"));

		let response = Response::builder()
			.status(status)
			.version(Version::HTTP_10)
			.header(CONTENT_LENGTH, reason.len() + 27)
			.header(CONNECTION, HeaderValue::from_static("close"))
			.header(http::header::CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"))
			.body(body)
			.expect("fixed headless-failure response is always valid");

		BuiltResponse { response, will_close: true }
	}
}

fn ensure_session_cookie(cookies: &mut CookieJar, session: &Session, config: &GatewayConfig) {
	if cookies.get(config.session_cookie_name()).is_none() {
		cookies.add(cookie::Cookie::new(
			config.session_cookie_name().to_owned(),
			session.cookie().as_str().to_owned(),
		));
	}
}

fn body_len(body: &Body) -> Option<u64> {
	use wgk_core::body::HttpBody;

	body.size_hint().exact()
}

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

#[cfg(test)]
mod test {
	use super::*;

	fn config() -> GatewayConfig {
		let dir = std::env::temp_dir().join(format!("wgk-response-builder-test-{}", std::process::id()));
		GatewayConfig::bootstrap("/var/www", dir).unwrap()
	}

	#[test]
	fn keep_alive_survives_for_ok_http11_without_close() {
		let session = Session::activate();
		let mut cookies = CookieJar::new();

		let built = ResponseBuilder::build(
			ResponseContext {
				request_version: Version::HTTP_11,
				connection_close_requested: false,
				keep_alive_requested: true,
				prior_will_close: false,
				referer: None,
			},
			StatusCode::OK,
			None,
			&mut cookies,
			&session,
			&config(),
		);

		assert!(!built.will_close);
		assert_eq!(built.response.headers().get(CONNECTION).unwrap(), "keep-alive");
	}

	#[test]
	fn non_ok_status_forces_close() {
		let session = Session::activate();
		let mut cookies = CookieJar::new();

		let built = ResponseBuilder::build(
			ResponseContext {
				request_version: Version::HTTP_11,
				connection_close_requested: false,
				keep_alive_requested: true,
				prior_will_close: false,
				referer: None,
			},
			StatusCode::BAD_REQUEST,
			None,
			&mut cookies,
			&session,
			&config(),
		);

		assert!(built.will_close);
		assert!(built.response.headers().get(CONNECTION).is_none());
	}

	#[test]
	fn session_cookie_is_always_set() {
		let session = Session::activate();
		let mut cookies = CookieJar::new();

		let built = ResponseBuilder::build(
			ResponseContext {
				request_version: Version::HTTP_11,
				connection_close_requested: false,
				keep_alive_requested: true,
				prior_will_close: false,
				referer: None,
			},
			StatusCode::OK,
			None,
			&mut cookies,
			&session,
			&config(),
		);

		let set_cookie = built.response.headers().get(http::header::SET_COOKIE).unwrap();
		assert!(set_cookie.to_str().unwrap().starts_with("cookieSession=Waarp"));
	}

	#[test]
	fn headless_failure_always_closes_on_http_1_0() {
		let built = ResponseBuilder::for_headless_failure(StatusCode::INTERNAL_SERVER_ERROR, "boom");

		assert!(built.will_close);
		assert_eq!(built.response.version(), Version::HTTP_10);
	}
}
