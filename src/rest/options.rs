//! Root OPTIONS discovery (spec.md §4.1 step 6, §4.4, §8 property 7).

// ----------

use http::Method;
use serde::Serialize;
use serde_json::{json, Value};

use super::Command;

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

/// One handler's contribution to the root OPTIONS description.
#[derive(Debug, Clone)]
pub struct HandlerDescriptor {
	pub base_uri: String,
	/// `(method, command)` pairs this handler answers, in the order spec.md
	/// §4.4's table lists them.
	pub commands: Vec<(Method, Command)>,
}

impl HandlerDescriptor {
	pub fn allowed_methods(&self) -> impl Iterator<Item = &Method> {
		self.commands.iter().map(|(method, _)| method)
	}

	pub fn to_json(&self) -> Value {
		json!({
			"uri": self.base_uri,
			"commands": self
				.commands
				.iter()
				.map(|(method, command)| json!({ "method": method.as_str(), "command": command.as_str() }))
				.collect::<Vec<_>>(),
		})
	}
}

// --------------------------------------------------------------------------------
// RootOptionsDescriptor

/// The aggregate answer to `OPTIONS /` (spec.md §4.4: "the root handler
/// enumerates every registered handler, aggregates the union of allowed
/// methods, the union of base paths, and a detailed per-path description").
#[derive(Debug, Clone, Default, Serialize)]
pub struct RootOptionsDescriptor {
	/// `Allow` header value: comma-joined union of every handler's methods.
	pub allow: String,
	/// `X-Allow-URIs` header value: comma-joined union of base paths.
	pub allow_uris: String,
	/// `X-Detailed-Allow` body: per-path method/command description.
	pub detailed: Value,
}

pub fn describe_root(handlers: &[HandlerDescriptor]) -> RootOptionsDescriptor {
	let mut methods: Vec<Method> = Vec::new();
	let mut uris: Vec<&str> = Vec::new();

	for handler in handlers {
		uris.push(&handler.base_uri);

		for method in handler.allowed_methods() {
			if !methods.contains(method) {
				methods.push(method.clone());
			}
		}
	}

	RootOptionsDescriptor {
		allow: methods.iter().map(Method::as_str).collect::<Vec<_>>().join(","),
		allow_uris: uris.join(","),
		detailed: Value::Array(handlers.iter().map(HandlerDescriptor::to_json).collect()),
	}
}

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn aggregates_union_of_methods_and_uris() {
		let handlers = vec![
			HandlerDescriptor {
				base_uri: "/items".into(),
				commands: vec![
					(Method::GET, Command::MultiGet),
					(Method::POST, Command::Create),
					(Method::OPTIONS, Command::Options),
				],
			},
			HandlerDescriptor {
				base_uri: "/users".into(),
				commands: vec![
					(Method::GET, Command::Get),
					(Method::PUT, Command::Update),
					(Method::DELETE, Command::Delete),
					(Method::OPTIONS, Command::Options),
				],
			},
		];

		let root = describe_root(&handlers);

		assert_eq!(root.allow, "GET,POST,OPTIONS,PUT,DELETE");
		assert_eq!(root.allow_uris, "/items,/users");
		assert!(root.detailed.as_array().is_some_and(|a| a.len() == 2));
	}
}
