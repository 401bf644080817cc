//! HTTP cookies: lenient per-server parsing, session-cookie propagation
//! (spec.md §3 CookieCodec, §4.5, §6).

// ----------

use cookie::CookieJar as InnerCookieJar;
use http::{
	header::{COOKIE, SET_COOKIE},
	HeaderMap, HeaderValue,
};
use serde_json::{json, Value};

pub use cookie::Cookie;

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

/// Cookies read from a request and, by the time the response is built, the
/// ones to send back.
#[derive(Default)]
pub struct CookieJar {
	inner: InnerCookieJar,
}

impl CookieJar {
	pub fn new() -> Self {
		Self::default()
	}

	/// Parses the request's `Cookie` header leniently: unparsable pairs are
	/// skipped rather than rejecting the whole header (spec.md §6: "lenient
	/// per-server parsing").
	pub fn from_request_headers(headers: &HeaderMap) -> Self {
		let inner = headers
			.get(COOKIE)
			.and_then(|value| value.to_str().ok())
			.map(|raw| {
				Cookie::split_parse_encoded(raw.to_owned()).fold(InnerCookieJar::new(), |mut jar, parsed| {
					if let Ok(cookie) = parsed {
						jar.add_original(cookie.into_owned());
					}

					jar
				})
			})
			.unwrap_or_default();

		Self { inner }
	}

	pub fn get(&self, name: &str) -> Option<&Cookie<'static>> {
		self.inner.get(name)
	}

	pub fn add(&mut self, cookie: Cookie<'static>) {
		self.inner.add(cookie);
	}

	pub fn iter(&self) -> cookie::Iter<'_> {
		self.inner.iter()
	}

	/// Appends every cookie this jar still holds (incoming echoes and new
	/// additions) as `Set-Cookie` headers.
	pub fn write_set_cookie_headers(&self, headers: &mut HeaderMap) {
		for cookie in self.inner.delta() {
			if let Ok(value) = HeaderValue::try_from(cookie.encoded().to_string()) {
				headers.append(SET_COOKIE, value);
			}
		}
	}

	/// A `{name: value}` view used to populate `RestArgument.cookies`.
	pub fn to_json(&self) -> Value {
		let mut map = serde_json::Map::new();

		for cookie in self.inner.iter() {
			map.insert(cookie.name().to_owned(), json!(cookie.value()));
		}

		Value::Object(map)
	}
}

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

#[cfg(test)]
mod test {
	use super::*;
	use bytes::Bytes;
	use http::Request;
	use http_body_util::Empty;

	#[test]
	fn parses_cookie_header_leniently() {
		let request = Request::builder()
			.uri("/")
			.header("Cookie", "a=1; garbage; b=2")
			.body(Empty::<Bytes>::default())
			.unwrap();

		let jar = CookieJar::from_request_headers(request.headers());

		assert_eq!(jar.get("a").unwrap().value(), "1");
		assert_eq!(jar.get("b").unwrap().value(), "2");
	}

	#[test]
	fn to_json_reflects_every_cookie() {
		let mut jar = CookieJar::new();
		jar.add(Cookie::new("cookieSession", "Waarpdeadbeef"));

		let value = jar.to_json();
		assert_eq!(value["cookieSession"], "Waarpdeadbeef");
	}
}
