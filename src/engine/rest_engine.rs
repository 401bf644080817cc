//! Body cumulation and dispatch for the REST engine (spec.md §4.4).

// ----------

use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderName, HeaderValue, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;

use crate::{
	config::GatewayConfig,
	error::GatewayError,
	multipart::{decode_urlencoded, DataItem, MultipartDecoder},
	rest::{Command, HandlerDescriptor, MethodHandler, MethodRegistry, RestArgument, RootOptionsDescriptor},
};

use super::{parse_query, RenderedBody, RequestContext};

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

pub(crate) async fn dispatch<B>(
	handler: Arc<dyn MethodHandler>,
	uri_args: Vec<String>,
	head: &http::request::Parts,
	body: &mut B,
	context: &mut RequestContext,
	config: &GatewayConfig,
) -> Result<RenderedBody, GatewayError>
where
	B: BodyExt<Data = Bytes> + Unpin,
	B::Error: std::fmt::Display,
{
	let query = parse_query(head.uri.query())?;
	let limit = query
		.get("limit")
		.and_then(|value| value.parse::<usize>().ok());

	let filter: serde_json::Map<String, Value> = query
		.iter()
		.filter(|(name, _)| name.as_str() != "limit")
		.map(|(name, value)| (name.clone(), Value::String(value.clone())))
		.collect();

	let mut argument = RestArgument::new(head.uri.path().to_owned(), head.method.clone(), uri_args)
		.with_headers(headers_to_json(&head.headers))
		.with_cookies(context.cookies.to_json())
		.with_limit(limit);

	argument.filter = Value::Object(filter);

	match read_body(handler.as_ref(), head, body, config).await {
		Ok(decoded) => argument.body = decoded,
		Err(error) => {
			context.status = error.status_code();
			return Ok(RenderedBody::Json(argument.fail(&error).to_json()));
		}
	}

	if let Err(error) = handler.check_authorization(&argument) {
		context.status = error.status_code();
		return Ok(RenderedBody::Json(argument.fail(&error).to_json()));
	}

	let before_dispatch = argument.clone();
	let is_options = before_dispatch.method.as_ref() == Some(&http::Method::OPTIONS);

	match handler.dispatch(argument).await {
		Ok(answered) => {
			context.status = StatusCode::OK;

			if is_options {
				apply_options_headers(context, &handler.describe());
			}

			Ok(RenderedBody::Json(answered.to_json()))
		}
		Err(error) => {
			context.status = error.status_code();
			Ok(RenderedBody::Json(before_dispatch.fail(&error).to_json()))
		}
	}
}

/// `OPTIONS /<base>`: aggregates one handler's own `Allow`/`X-Allow-URIs`/
/// `X-Detailed-Allow` (spec.md §6 "OPTIONS replies populate ... headers").
fn apply_options_headers(context: &mut RequestContext, descriptor: &HandlerDescriptor) {
	let allow = descriptor
		.allowed_methods()
		.map(http::Method::as_str)
		.collect::<Vec<_>>()
		.join(",");

	push_header(context, http::header::ALLOW, &allow);
	push_header(context, "x-allow-uris", &descriptor.base_uri);
	push_header(context, "x-detailed-allow", &descriptor.to_json().to_string());
}

/// `OPTIONS /`: the REST root discovery endpoint (spec.md §4.1 step 6,
/// §4.4's "root OPTIONS handler", §8 property 7, scenario S6).
pub(crate) fn dispatch_root_options(rest: &MethodRegistry, context: &mut RequestContext) -> RenderedBody {
	let descriptor: RootOptionsDescriptor = rest.root_options();

	push_header(context, http::header::ALLOW, &descriptor.allow);
	push_header(context, "x-allow-uris", &descriptor.allow_uris);
	push_header(context, "x-detailed-allow", &descriptor.detailed.to_string());

	context.status = StatusCode::OK;

	RenderedBody::Json(serde_json::json!({
		"command": Command::Options.as_str(),
		"result": "ok",
		"answer": Value::Null,
		"detail": Value::Null,
	}))
}

fn push_header(context: &mut RequestContext, name: impl TryIntoHeaderName, value: &str) {
	if let (Ok(name), Ok(value)) = (name.into_header_name(), HeaderValue::from_str(value)) {
		context.extra_headers.push((name, value));
	}
}

/// Lets [`push_header`] accept both `http::header::ALLOW` (a `HeaderName`)
/// and ad hoc string literals (`"x-allow-uris"`) without two call shapes.
trait TryIntoHeaderName {
	fn into_header_name(self) -> Result<HeaderName, http::header::InvalidHeaderName>;
}

impl TryIntoHeaderName for HeaderName {
	fn into_header_name(self) -> Result<HeaderName, http::header::InvalidHeaderName> {
		Ok(self)
	}
}

impl TryIntoHeaderName for &str {
	fn into_header_name(self) -> Result<HeaderName, http::header::InvalidHeaderName> {
		HeaderName::try_from(self)
	}
}

async fn read_body<B>(
	handler: &dyn MethodHandler,
	head: &http::request::Parts,
	body: &mut B,
	config: &GatewayConfig,
) -> Result<Value, GatewayError>
where
	B: BodyExt<Data = Bytes> + Unpin,
	B::Error: std::fmt::Display,
{
	let bytes = body
		.collect()
		.await
		.map(|collected| collected.to_bytes())
		.map_err(|error| GatewayError::internal(error.to_string()))?;

	if bytes.is_empty() {
		return Ok(Value::Null);
	}

	if handler.body_json_decoded() {
		return serde_json::from_slice(&bytes).map_err(|_| GatewayError::InvalidFieldValue {
			name: "body".into(),
			reason: "malformed JSON".into(),
		});
	}

	if let Some(boundary) = boundary_from_content_type(&head.headers) {
		let mut decoder = MultipartDecoder::new(&boundary, config.multipart_memory_threshold(), config.temp_files().clone());
		decoder.offer(&bytes)?;
		decoder.finish()?;

		let mut map = serde_json::Map::new();

		while let Some(item) = decoder.next() {
			match item {
				DataItem::Attribute { name, value } => {
					map.insert(name, Value::String(value));
				}
				DataItem::FileUpload { name, filename, data, .. } => {
					let path = match data {
						crate::multipart::PartData::Disk(path) => path.to_string_lossy().into_owned(),
						crate::multipart::PartData::Memory(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
					};

					map.insert(
						name,
						serde_json::json!({ "filename": filename, "content": path }),
					);
				}
			}
		}

		return Ok(Value::Object(map));
	}

	let pairs = decode_urlencoded(&bytes)?;
	let map: serde_json::Map<String, Value> = pairs.into_iter().map(|(name, value)| (name, Value::String(value))).collect();

	Ok(Value::Object(map))
}

fn headers_to_json(headers: &http::HeaderMap) -> Value {
	let mut map = serde_json::Map::new();

	for name in headers.keys() {
		if let Some(value) = headers.get(name).and_then(|value| value.to_str().ok()) {
			map.insert(name.as_str().to_owned(), Value::String(value.to_owned()));
		}
	}

	Value::Object(map)
}

fn boundary_from_content_type(headers: &http::HeaderMap) -> Option<String> {
	let value = headers.get(http::header::CONTENT_TYPE)?.to_str().ok()?;

	value
		.split(';')
		.map(str::trim)
		.find_map(|part| part.strip_prefix("boundary="))
		.map(|boundary| boundary.trim_matches('"').to_owned())
}

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn boundary_from_content_type_extracts_value() {
		let mut headers = http::HeaderMap::new();
		headers.insert(
			http::header::CONTENT_TYPE,
			http::HeaderValue::from_static("multipart/form-data; boundary=Y9"),
		);

		assert_eq!(boundary_from_content_type(&headers).as_deref(), Some("Y9"));
	}

	#[test]
	fn headers_to_json_lowercases_nothing_but_captures_values() {
		let mut headers = http::HeaderMap::new();
		headers.insert("x-custom", http::HeaderValue::from_static("v"));

		let value = headers_to_json(&headers);
		assert_eq!(value["x-custom"], "v");
	}
}
