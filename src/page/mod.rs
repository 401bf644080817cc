//! The page-oriented dispatch engine: declarative `(uri, method)` bindings
//! whose fields describe where each parameter is extracted from (spec.md §3,
//! §4.3).

// ----------

use std::{collections::HashMap, net::SocketAddr, sync::Arc};

use http::{Method, StatusCode};

use crate::error::GatewayError;

mod request;

pub use request::{BusinessRequest, PageCapabilities};

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

/// Drives the engine's control flow for a page (spec.md §3, §4.1 step 8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
	Html,
	Menu,
	GetDownload,
	Post,
	PostUpload,
	Put,
	Delete,
	Error,
}

/// Where a [`Field`]'s value is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRole {
	Url,
	Header,
	Cookie,
	Body,
	BusinessInputFile,
	CookieSet,
}

#[derive(Debug, crate::ImplError)]
#[error("{0}")]
pub struct FieldValidationError(pub String);

/// A validator closure for a [`Field`]'s extracted value.
pub type Validator = Arc<dyn Fn(&str) -> Result<(), FieldValidationError> + Send + Sync>;

/// One parameter a [`Page`] extracts: name, where it comes from, its position
/// among same-named values, an optional validator/default, and whether it's
/// exported back as a response cookie (spec.md §3).
#[derive(Clone)]
pub struct Field {
	pub name: String,
	pub role: FieldRole,
	pub position: usize,
	pub validator: Option<Validator>,
	pub default: Option<String>,
	pub export_as_cookie: bool,
}

impl Field {
	pub fn new(name: impl Into<String>, role: FieldRole, position: usize) -> Self {
		Self {
			name: name.into(),
			role,
			position,
			validator: None,
			default: None,
			export_as_cookie: false,
		}
	}

	pub fn with_validator(mut self, validator: Validator) -> Self {
		self.validator = Some(validator);

		self
	}

	pub fn with_default(mut self, default: impl Into<String>) -> Self {
		self.default = Some(default.into());

		self
	}

	pub fn exported_as_cookie(mut self) -> Self {
		self.export_as_cookie = true;

		self
	}

	pub fn validate(&self, value: &str) -> Result<(), GatewayError> {
		if let Some(validator) = &self.validator {
			validator(value).map_err(|error| GatewayError::InvalidFieldValue {
				name: self.name.clone(),
				reason: error.0,
			})?;
		}

		Ok(())
	}
}

// --------------------------------------------------------------------------------
// Page

/// A declarative binding of `(uri, method)` to a role, a field set, and a
/// [`BusinessRequest`] factory (spec.md §3, §4.3).
#[derive(Clone)]
pub struct Page {
	pub name: String,
	pub uri: String,
	pub method: Method,
	pub role: Role,
	pub fields: Vec<Field>,
	pub capabilities: PageCapabilities,
	new_request: Arc<dyn Fn(Option<SocketAddr>) -> Box<dyn BusinessRequest> + Send + Sync>,
}

impl Page {
	pub fn new(
		name: impl Into<String>,
		uri: impl Into<String>,
		method: Method,
		role: Role,
		new_request: impl Fn(Option<SocketAddr>) -> Box<dyn BusinessRequest> + Send + Sync + 'static,
	) -> Self {
		Self {
			name: name.into(),
			uri: uri.into(),
			method,
			role,
			fields: Vec::new(),
			capabilities: PageCapabilities::default(),
			new_request: Arc::new(new_request),
		}
	}

	pub fn with_fields(mut self, fields: Vec<Field>) -> Self {
		self.fields = fields;

		self
	}

	pub fn with_capabilities(mut self, capabilities: PageCapabilities) -> Self {
		self.capabilities = capabilities;

		self
	}

	/// Spec.md §4.3's `newRequest(remoteAddress)` factory: `peer_address` is
	/// the connection's remote socket address, `None` when the engine was
	/// activated without one (e.g. over a non-TCP transport in tests).
	pub fn new_business_request(&self, peer_address: Option<SocketAddr>) -> Box<dyn BusinessRequest> {
		(self.new_request)(peer_address)
	}
}

// --------------------------------------------------------------------------------
// PageRegistry

/// Immutable lookup from `(path, method)` to [`Page`], plus a status-code →
/// error-page map (spec.md §4.3).
pub struct PageRegistry {
	pages: HashMap<(String, Method), Page>,
	error_pages: HashMap<StatusCode, Page>,
}

impl PageRegistry {
	pub fn builder() -> PageRegistryBuilder {
		PageRegistryBuilder::default()
	}

	pub fn resolve(&self, path: &str, method: &Method) -> Option<&Page> {
		self.pages.get(&(path.to_owned(), method.clone()))
	}

	/// The canonical error page for `status`, if one is registered (spec.md
	/// §9 "Error-in-error guard": the caller must be ready for `None` here
	/// and fall back to the force-close minimal HTML path).
	pub fn error_page(&self, status: StatusCode) -> Option<&Page> {
		self.error_pages.get(&status)
	}
}

#[derive(Default)]
pub struct PageRegistryBuilder {
	pages: HashMap<(String, Method), Page>,
	error_pages: HashMap<StatusCode, Page>,
}

impl PageRegistryBuilder {
	pub fn register(mut self, page: Page) -> Self {
		self.pages.insert((page.uri.clone(), page.method.clone()), page);

		self
	}

	pub fn register_error_page(mut self, status: StatusCode, page: Page) -> Self {
		self.error_pages.insert(status, page);

		self
	}

	pub fn build(self) -> PageRegistry {
		PageRegistry {
			pages: self.pages,
			error_pages: self.error_pages,
		}
	}
}

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

#[cfg(test)]
mod test {
	use super::*;
	use wgk_core::response::Response;

	struct EmptyBusinessRequest;

	impl BusinessRequest for EmptyBusinessRequest {
		fn set_value(&mut self, _name: &str, _value: &str, _position: FieldRole) -> Result<(), GatewayError> {
			Ok(())
		}

		fn is_request_valid(&self) -> bool {
			true
		}

		fn render(&self) -> Result<Response, GatewayError> {
			Ok(Response::new(wgk_core::body::Body::from("ok")))
		}
	}

	#[test]
	fn resolve_finds_registered_page_by_uri_and_method() {
		let page = Page::new("home", "/", Method::GET, Role::Html, |_| Box::new(EmptyBusinessRequest));
		let registry = PageRegistry::builder().register(page).build();

		assert!(registry.resolve("/", &Method::GET).is_some());
		assert!(registry.resolve("/", &Method::POST).is_none());
	}

	#[test]
	fn field_validator_rejects_bad_values() {
		let field = Field::new("x", FieldRole::Url, 0)
			.with_validator(Arc::new(|value| {
				value
					.parse::<i32>()
					.map(|_| ())
					.map_err(|_| FieldValidationError("not an integer".into()))
			}));

		assert!(field.validate("42").is_ok());
		assert!(matches!(
			field.validate("nope").unwrap_err(),
			GatewayError::InvalidFieldValue { .. }
		));
	}
}
