//! `ProtocolEngine`: the per-connection state machine (spec.md §4.1).

// ----------

use std::{collections::HashMap, net::SocketAddr, sync::Arc};

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Version};
use percent_encoding::percent_decode_str;

use wgk_core::response::Response;

use crate::{
	config::GatewayConfig,
	cookie::CookieJar,
	error::GatewayError,
	page::PageRegistry,
	rest::{MethodHandler, MethodRegistry, RestArgument},
	response_builder::{BuiltResponse, ResponseBuilder, ResponseContext},
	session::Session,
};

mod page_engine;
mod rest_engine;

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

/// spec.md §4.1: `IDLE → HEAD_RECEIVED → (FULL_BODY | STREAMING_BODY) →
/// DISPATCHED → RESPONDED → (IDLE | CLOSED)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
	Idle,
	HeadReceived,
	FullBody,
	StreamingBody,
	Dispatched,
	Responded,
	Closed,
}

/// What the engine found at the registry-lookup step (spec.md §4.1 step 3).
pub(crate) enum Binding<'a> {
	Page(&'a crate::page::Page),
	Rest {
		handler: Arc<dyn MethodHandler>,
		uri_args: Vec<String>,
	},
	/// `OPTIONS /`: the REST root discovery endpoint (spec.md §4.1 step 6,
	/// §4.4's "root OPTIONS handler").
	RootOptions,
	StaticFallback,
	NotFound,
}

/// Per-HTTP-message state, rebuilt in [`RequestContext::initialize`] and torn
/// down in [`RequestContext::clean`] (spec.md §3).
pub struct RequestContext {
	pub status: StatusCode,
	pub will_close: bool,
	pub cookies: CookieJar,
	pub rest_argument: Option<RestArgument>,
	/// Headers a dispatch path needs on the final response besides the usual
	/// ones `ResponseBuilder` already adds (spec.md §4.4's OPTIONS headers,
	/// `Allow`/`X-Allow-URIs`/`X-Detailed-Allow`).
	pub extra_headers: Vec<(HeaderName, HeaderValue)>,
}

impl RequestContext {
	pub fn initialize() -> Self {
		Self {
			status: StatusCode::OK,
			will_close: false,
			cookies: CookieJar::new(),
			rest_argument: None,
			extra_headers: Vec::new(),
		}
	}

	/// Must run exactly once per request context (spec.md §3's invariant).
	/// The multipart decoder and JSON buffer spec.md names here are scoped to
	/// a single dispatch call rather than the context (see `engine::handle`'s
	/// doc comment), so there is nothing left to release by this point.
	pub fn clean(&mut self) {
		self.rest_argument = None;
		self.extra_headers.clear();
	}

	pub fn mark_will_close(&mut self) {
		self.will_close = true;
	}
}

impl Drop for RequestContext {
	fn drop(&mut self) {
		self.clean();
	}
}

// --------------------------------------------------------------------------------
// ProtocolEngine

/// One value per connection (spec.md §5, §9 "Per-connection mutable state").
pub struct ProtocolEngine {
	config: Arc<GatewayConfig>,
	pages: Arc<PageRegistry>,
	rest: Option<Arc<MethodRegistry>>,
	session: Session,
	state: EngineState,
	peer_address: Option<SocketAddr>,
}

impl ProtocolEngine {
	/// spec.md §4.1 "On connection activation": fresh session, role HTML.
	/// `peer_address` is the connection's remote socket address, forwarded to
	/// every page's `newRequest(remoteAddress)` factory (spec.md §4.3).
	pub fn activate(
		config: Arc<GatewayConfig>,
		pages: Arc<PageRegistry>,
		rest: Option<Arc<MethodRegistry>>,
		peer_address: Option<SocketAddr>,
	) -> Self {
		Self {
			config,
			pages,
			rest,
			session: Session::activate(),
			state: EngineState::Idle,
			peer_address,
		}
	}

	pub fn state(&self) -> EngineState {
		self.state
	}

	/// Handles one full HTTP message: head, then its body fragments. Returns
	/// the response and whether the connection must now close.
	///
	/// This flattens spec.md's "on head received" / "on body chunk" split
	/// into one call because our body source (an `http_body` stream) is
	/// exhausted before we return control to the caller; the state machine
	/// above still walks through every state spec.md names on the way.
	pub async fn handle<B>(&mut self, head: http::request::Parts, mut body: B) -> Response
	where
		B: http_body_util::BodyExt<Data = Bytes> + Unpin,
		B::Error: std::fmt::Display,
	{
		self.state = EngineState::HeadReceived;
		let mut context = RequestContext::initialize();
		context.cookies = CookieJar::from_request_headers(&head.headers);

		let incoming_session_cookie = context
			.cookies
			.get(self.config.session_cookie_name())
			.map(|cookie| cookie.value().to_owned());

		if let Some(incoming) = incoming_session_cookie {
			self.session.adopt_incoming_cookie(&incoming);
		}

		let outcome = self.dispatch(&head, &mut body, &mut context).await;

		self.state = EngineState::Dispatched;

		let (status, rendered) = match outcome {
			Ok(rendered) => (context.status, rendered),
			Err(error) => {
				context.mark_will_close();
				let status = error.status_code();
				(status, self.render_error_page(status, &error))
			}
		};

		let built = self.build_response(&head, &context, status, rendered);

		self.state = EngineState::Responded;
		self.state = if built.will_close { EngineState::Closed } else { EngineState::Idle };

		context.clean();

		built.response
	}

	async fn dispatch<B>(
		&mut self,
		head: &http::request::Parts,
		body: &mut B,
		context: &mut RequestContext,
	) -> Result<RenderedBody, GatewayError>
	where
		B: http_body_util::BodyExt<Data = Bytes> + Unpin,
		B::Error: std::fmt::Display,
	{
		let path = head.uri.path().to_owned();
		let binding = resolve(&self.pages, self.rest.as_deref(), &path, &head.method);

		match binding {
			Binding::Page(page) => {
				page_engine::dispatch(page, head, body, context, &mut self.session, &self.config, self.peer_address).await
			}
			Binding::Rest { handler, uri_args } => {
				rest_engine::dispatch(handler, uri_args, head, body, context, &self.config).await
			}
			Binding::RootOptions => {
				let rest = self.rest.as_deref().expect("RootOptions only resolved when self.rest is Some");

				Ok(rest_engine::dispatch_root_options(rest, context))
			}
			Binding::StaticFallback => {
				let response = crate::static_files::serve(&path, self.config.base_static_path()).await?;

				Ok(RenderedBody::Html(response))
			}
			Binding::NotFound => Err(GatewayError::UnboundPage {
				method: head.method.clone(),
				uri: head.uri.clone(),
			}),
		}
	}

	fn build_response(
		&mut self,
		head: &http::request::Parts,
		context: &RequestContext,
		status: StatusCode,
		rendered: RenderedBody,
	) -> BuiltResponse {
		let keep_alive_requested = connection_header_contains(&head.headers, "keep-alive")
			|| (head.version != Version::HTTP_10 && !connection_header_contains(&head.headers, "close"));

		let ctx = ResponseContext {
			request_version: head.version,
			connection_close_requested: connection_header_contains(&head.headers, "close"),
			keep_alive_requested,
			prior_will_close: context.will_close,
			referer: head.headers.get(http::header::REFERER).cloned(),
		};

		let mut cookies = clone_cookie_jar_placeholder(context);

		let mut built = match rendered {
			RenderedBody::Html(response) => {
				let (_, body) = response.into_parts();
				ResponseBuilder::build(ctx, status, Some(body), &mut cookies, &self.session, &self.config)
			}
			RenderedBody::Json(value) => {
				let body = wgk_core::body::Body::from(value.to_string());
				ResponseBuilder::build(ctx, status, Some(body), &mut cookies, &self.session, &self.config)
			}
			RenderedBody::Error(message) => {
				let body = wgk_core::body::Body::from(format!("<html><body>Error {message}</body></html>"));
				ResponseBuilder::build(ctx, status, Some(body), &mut cookies, &self.session, &self.config)
			}
		};

		for (name, value) in &context.extra_headers {
			built.response.headers_mut().insert(name.clone(), value.clone());
		}

		built
	}

	/// Spec.md §9's "error-in-error guard": render the registered page for
	/// `status`, if any, but never let a broken error page mask the original
	/// failure — a panic or render error here falls back to the plain text.
	fn render_error_page(&self, status: StatusCode, error: &GatewayError) -> RenderedBody {
		let Some(page) = self.pages.error_page(status) else {
			return RenderedBody::from_error(error);
		};

		let request = page.new_business_request(self.peer_address);
		(page.capabilities.error)(error);

		match request.render() {
			Ok(response) => RenderedBody::Html(response),
			Err(_) => RenderedBody::from_error(error),
		}
	}
}

/// Free function rather than a `&self` method: the returned `Binding<'a>`
/// only needs to borrow `pages`/`rest`, and keeping that borrow off the rest
/// of `ProtocolEngine` leaves `session`/`config` free for `dispatch`'s match
/// arms to borrow independently.
fn resolve<'a>(pages: &'a PageRegistry, rest: Option<&'a MethodRegistry>, path: &str, method: &Method) -> Binding<'a> {
	if *method == Method::OPTIONS && path == "/" && rest.is_some() {
		return Binding::RootOptions;
	}

	if let Some(page) = pages.resolve(path, method) {
		return Binding::Page(page);
	}

	if let Some(rest) = rest {
		if let Some((handler, uri_args)) = rest.resolve(path) {
			return Binding::Rest {
				handler: Arc::clone(handler),
				uri_args,
			};
		}
	}

	if *method == Method::GET {
		return Binding::StaticFallback;
	}

	Binding::NotFound
}

/// `RequestContext` doesn't expose its `CookieJar` as an owned value (it's
/// torn down by `clean()` right after); `build_response` needs its own
/// mutable jar to add the session cookie into, seeded with what was read
/// from the request.
fn clone_cookie_jar_placeholder(context: &RequestContext) -> CookieJar {
	let mut jar = CookieJar::new();

	for cookie in context.cookies.iter() {
		jar.add(cookie.clone());
	}

	jar
}

fn connection_header_contains(headers: &HeaderMap, token: &str) -> bool {
	headers
		.get(http::header::CONNECTION)
		.and_then(|value| value.to_str().ok())
		.is_some_and(|value| value.split(',').any(|part| part.trim().eq_ignore_ascii_case(token)))
}

/// What a dispatch path produced, still needing [`ResponseBuilder`] to turn
/// it into wire bytes.
pub(crate) enum RenderedBody {
	Html(Response),
	Json(serde_json::Value),
	Error(String),
}

impl RenderedBody {
	fn from_error(error: &GatewayError) -> Self {
		RenderedBody::Error(error.to_string())
	}
}

// --------------------------------------------------------------------------------
// Field extraction (spec.md §4.1 step 7)

/// Parses a query string into `name -> value`, erroring on the multi-value
/// rule (spec.md §8 property 4: `"Too many values for <name>"`).
pub(crate) fn parse_query(query: Option<&str>) -> Result<HashMap<String, String>, GatewayError> {
	let mut map: HashMap<String, String> = HashMap::new();

	let Some(query) = query else { return Ok(map) };

	for pair in query.split('&').filter(|pair| !pair.is_empty()) {
		let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
		let name = percent_decode_str(name).decode_utf8_lossy().into_owned();
		let value = percent_decode_str(value).decode_utf8_lossy().into_owned();

		if map.insert(name.clone(), value).is_some() {
			return Err(GatewayError::TooManyValues { name });
		}
	}

	Ok(map)
}

/// Header names are case-insensitive; more than one value for the same name
/// is the same 400 as a duplicated query key (spec.md §4.1 step 7).
pub(crate) fn single_header_value(headers: &HeaderMap, name: &str) -> Result<Option<String>, GatewayError> {
	let mut values = headers.get_all(name).iter();

	let Some(first) = values.next() else { return Ok(None) };

	if values.next().is_some() {
		return Err(GatewayError::TooManyValues { name: name.to_owned() });
	}

	Ok(first.to_str().ok().map(str::to_owned))
}

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn parse_query_rejects_duplicate_keys() {
		let error = parse_query(Some("x=1&x=2")).unwrap_err();
		assert!(matches!(error, GatewayError::TooManyValues { name } if name == "x"));
	}

	#[test]
	fn parse_query_decodes_percent_escapes() {
		let map = parse_query(Some("name=a%20b")).unwrap();
		assert_eq!(map.get("name").unwrap(), "a b");
	}

	#[test]
	fn single_header_value_rejects_duplicates() {
		let mut headers = HeaderMap::new();
		headers.append("x-custom", http::HeaderValue::from_static("a"));
		headers.append("x-custom", http::HeaderValue::from_static("b"));

		let error = single_header_value(&headers, "x-custom").unwrap_err();
		assert!(matches!(error, GatewayError::TooManyValues { .. }));
	}
}
