//! The REST dispatch engine: base-URI-keyed method handlers over a JSON or
//! multipart body (spec.md §3, §4.4).

// ----------

use std::{collections::HashMap, sync::Arc};

use http::Method;
use serde::Serialize;
use serde_json::Value;

use crate::error::GatewayError;

pub mod data_model;
pub mod options;

pub use data_model::{DataModelHandler, DataModelMethodHandler};
pub use options::{describe_root, HandlerDescriptor, RootOptionsDescriptor};

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

/// The `command` tag every REST response carries (spec.md §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Command {
	#[default]
	MultiGet,
	Get,
	Create,
	Update,
	Delete,
	Options,
}

impl Command {
	pub fn as_str(&self) -> &'static str {
		match self {
			Command::MultiGet => "MULTIGET",
			Command::Get => "GET",
			Command::Create => "CREATE",
			Command::Update => "UPDATE",
			Command::Delete => "DELETE",
			Command::Options => "OPTIONS",
		}
	}
}

// --------------------------------------------------------------------------------
// RestArgument

/// The structured bag threaded through the REST engine: both the parsed
/// request and, by the time dispatch returns, the response description
/// (spec.md §3: "a structured bag of named sub-trees... used as both parsed
/// request and response description; serialized to JSON for REST replies").
#[derive(Debug, Clone)]
pub struct RestArgument {
	pub uri: String,
	pub uri_args: Vec<String>,
	pub method: Option<Method>,
	pub headers: Value,
	pub cookies: Value,
	pub body: Value,
	pub answer: Value,
	pub filter: Value,
	pub result: Value,
	pub detail: Value,
	pub limit: Option<usize>,
	pub command: Command,
}

impl RestArgument {
	pub fn new(uri: String, method: Method, uri_args: Vec<String>) -> Self {
		Self {
			uri,
			uri_args,
			method: Some(method),
			headers: Value::Null,
			cookies: Value::Null,
			body: Value::Null,
			answer: Value::Null,
			filter: Value::Null,
			result: Value::Null,
			detail: Value::Null,
			limit: None,
			command: Command::default(),
		}
	}

	pub fn with_body(mut self, body: Value) -> Self {
		self.body = body;

		self
	}

	pub fn with_headers(mut self, headers: Value) -> Self {
		self.headers = headers;

		self
	}

	pub fn with_cookies(mut self, cookies: Value) -> Self {
		self.cookies = cookies;

		self
	}

	pub fn with_limit(mut self, limit: Option<usize>) -> Self {
		self.limit = limit;

		self
	}

	pub fn fail(mut self, error: &GatewayError) -> Self {
		self.result = Value::String("error".into());
		self.detail = error.detail_or_message();

		self
	}

	/// The JSON document sent back to the client: `{command, result, answer, detail}`.
	pub fn to_json(&self) -> Value {
		serde_json::json!({
			"command": self.command.as_str(),
			"result": if self.result.is_null() { Value::String("ok".into()) } else { self.result.clone() },
			"answer": self.answer,
			"detail": self.detail,
		})
	}
}

// --------------------------------------------------------------------------------
// MethodHandler

/// The REST counterpart of a page: dispatches by method against a base URI
/// (spec.md §3).
pub trait MethodHandler: Send + Sync {
	fn base_uri(&self) -> &str;

	fn allowed_methods(&self) -> &[Method];

	/// Whether the body must be decoded as cumulative JSON rather than handed
	/// to the multipart decoder.
	fn body_json_decoded(&self) -> bool {
		true
	}

	fn need_auth(&self) -> bool {
		true
	}

	fn check_authorization(&self, argument: &RestArgument) -> Result<(), GatewayError>;

	fn dispatch(self: Arc<Self>, argument: RestArgument) -> wgk_core::BoxedFuture<Result<RestArgument, GatewayError>>;

	fn describe(&self) -> HandlerDescriptor;
}

// --------------------------------------------------------------------------------
// MethodRegistry

/// Immutable map from base URI to [`MethodHandler`] (spec.md §3). Built once
/// via [`MethodRegistryBuilder`] and never mutated afterwards.
pub struct MethodRegistry {
	handlers: HashMap<String, Arc<dyn MethodHandler>>,
}

impl MethodRegistry {
	pub fn builder() -> MethodRegistryBuilder {
		MethodRegistryBuilder::default()
	}

	/// Resolves `path` to its handler and the positional ID segments after
	/// the base URI (spec.md §4.4: "sub-URI segments after the base are
	/// treated as positional IDs"). Picks the longest registered base that
	/// prefixes `path`.
	pub fn resolve(&self, path: &str) -> Option<(&Arc<dyn MethodHandler>, Vec<String>)> {
		let path = path.trim_end_matches('/');

		self.handlers
			.keys()
			.filter(|base| path == base.as_str() || path.starts_with(&format!("{base}/")))
			.max_by_key(|base| base.len())
			.map(|base| {
				let handler = &self.handlers[base];
				let rest = path[base.len()..].trim_start_matches('/');
				let args = if rest.is_empty() {
					Vec::new()
				} else {
					rest.split('/').map(str::to_owned).collect()
				};

				(handler, args)
			})
	}

	pub fn root_options(&self) -> RootOptionsDescriptor {
		let descriptors: Vec<HandlerDescriptor> = self.handlers.values().map(|handler| handler.describe()).collect();

		describe_root(&descriptors)
	}
}

#[derive(Default)]
pub struct MethodRegistryBuilder {
	handlers: HashMap<String, Arc<dyn MethodHandler>>,
}

impl MethodRegistryBuilder {
	pub fn register(mut self, handler: impl MethodHandler + 'static) -> Self {
		self.handlers.insert(handler.base_uri().to_owned(), Arc::new(handler));

		self
	}

	pub fn build(self) -> MethodRegistry {
		MethodRegistry { handlers: self.handlers }
	}
}

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

#[cfg(test)]
mod test {
	use super::*;

	struct Stub {
		base: &'static str,
	}

	impl MethodHandler for Stub {
		fn base_uri(&self) -> &str {
			self.base
		}

		fn allowed_methods(&self) -> &[Method] {
			const METHODS: [Method; 1] = [Method::GET];
			&METHODS
		}

		fn check_authorization(&self, _argument: &RestArgument) -> Result<(), GatewayError> {
			Ok(())
		}

		fn dispatch(
			self: Arc<Self>,
			argument: RestArgument,
		) -> wgk_core::BoxedFuture<Result<RestArgument, GatewayError>> {
			Box::pin(async move { Ok(argument) })
		}

		fn describe(&self) -> HandlerDescriptor {
			HandlerDescriptor {
				base_uri: self.base.to_owned(),
				commands: vec![(Method::GET, Command::Get)],
			}
		}
	}

	#[test]
	fn resolve_splits_positional_ids_after_base() {
		let registry = MethodRegistry::builder().register(Stub { base: "/items" }).build();

		let (handler, ids) = registry.resolve("/items/42").unwrap();
		assert_eq!(handler.base_uri(), "/items");
		assert_eq!(ids, vec!["42"]);

		let (_, ids) = registry.resolve("/items").unwrap();
		assert!(ids.is_empty());

		assert!(registry.resolve("/other").is_none());
	}
}
