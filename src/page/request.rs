//! The business-request contract and the page engine's capability hooks
//! (spec.md §4.3, §9 "Abstract-method hooks → capability set").

// ----------

use std::sync::Arc;

use wgk_core::response::Response;

use crate::error::GatewayError;

use super::{FieldRole, Role};

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

/// The per-request object a [`super::Page`] builds via its `new_request`
/// factory: fields mirror the page definition, filled in by the engine as it
/// extracts URL/header/cookie/body values (spec.md §4.3).
pub trait BusinessRequest: Send {
	/// Validates and stores one extracted value (spec.md §4.3 `setValue`).
	fn set_value(&mut self, name: &str, value: &str, position: FieldRole) -> Result<(), GatewayError>;

	/// Called once all data has been extracted (spec.md §4.3 `isRequestValid`).
	fn is_request_valid(&self) -> bool;

	/// Renders the page's HTML body (spec.md §4.3 `getHtmlPage`).
	fn render(&self) -> Result<Response, GatewayError>;
}

// --------------------------------------------------------------------------------
// PageCapabilities

/// The original's subclass-overridable hooks (`checkConnection`, `error`,
/// `getFilename`, `beforeSimplePage`, `finalDelete/Get/PostUpload/Post/Put`,
/// `businessValidRequestAfterAllDataReceived`, `isCookieValid`) modeled as one
/// stateless value of function pointers rather than inheritance (spec.md §9):
/// the engine owns all per-connection state, this struct owns none of it.
#[derive(Clone)]
pub struct PageCapabilities {
	pub check_connection: Arc<dyn Fn(&dyn BusinessRequest) -> Result<(), GatewayError> + Send + Sync>,
	pub error: Arc<dyn Fn(&GatewayError) + Send + Sync>,
	pub get_filename: Arc<dyn Fn(&dyn BusinessRequest) -> Option<String> + Send + Sync>,
	pub before_simple_page: Arc<dyn Fn(&dyn BusinessRequest) -> Result<(), GatewayError> + Send + Sync>,
	/// Covers `finalDelete`/`finalGet`/`finalPostUpload`/`finalPost`/`finalPut`:
	/// one hook parameterized by [`Role`] rather than five near-identical ones.
	pub final_data: Arc<dyn Fn(&dyn BusinessRequest, Role) -> Result<(), GatewayError> + Send + Sync>,
	pub business_valid_request_after_all_data_received:
		Arc<dyn Fn(&dyn BusinessRequest) -> Result<(), GatewayError> + Send + Sync>,
	pub is_cookie_valid: Arc<dyn Fn(&str) -> bool + Send + Sync>,
}

impl Default for PageCapabilities {
	/// A capability set that imposes no additional checks: connections and
	/// cookies are always accepted, hooks are no-ops. Pages that need real
	/// authorization or bookkeeping override the relevant fields.
	fn default() -> Self {
		Self {
			check_connection: Arc::new(|_| Ok(())),
			error: Arc::new(|_| {}),
			get_filename: Arc::new(|_| None),
			before_simple_page: Arc::new(|_| Ok(())),
			final_data: Arc::new(|_, _| Ok(())),
			business_valid_request_after_all_data_received: Arc::new(|_| Ok(())),
			is_cookie_valid: Arc::new(|_| true),
		}
	}
}
