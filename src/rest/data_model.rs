//! `DataModelHandler`: the CRUD specialization of [`MethodHandler`] (spec.md §4.4).

// ----------

use std::sync::Arc;

use http::Method;
use serde::Serialize;
use serde_json::{json, Value};

use wgk_core::BoxedFuture;

use crate::error::GatewayError;

use super::{Command, HandlerDescriptor, MethodHandler, RestArgument};

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

/// An `updatedInfo` marker stamped onto an entity by create/update (spec.md
/// §4.4: "Creation and update set the persisted entity's `updatedInfo` to
/// `TOSUBMIT`"). Handlers that track this field read it back from
/// [`DataModelHandler::stamp_to_submit`].
pub const UPDATED_INFO_TO_SUBMIT: &str = "TOSUBMIT";

/// Default page size for list ("multi-get") queries when the caller supplies
/// no `limit`.
pub const DEFAULT_LIST_LIMIT: usize = 100;

/// A persistence entity bound to a REST base URI.
///
/// The engine never touches storage directly; every read/write goes through
/// this trait so the dispatch table in spec.md §4.4 stays storage-agnostic.
pub trait DataModelHandler: Send + Sync + 'static {
	type Entity: Serialize + Send + Sync + 'static;
	/// Cursor type produced by [`get_prepared_statement`](Self::get_prepared_statement),
	/// walked by [`get_item_from_statement`](Self::get_item_from_statement).
	type Cursor: Send + 'static;

	fn primary_key_name(&self) -> &'static str;

	fn get_item(&self, id: &str) -> BoxedFuture<Result<Option<Self::Entity>, GatewayError>>;

	fn create_item(&self, body: Value) -> BoxedFuture<Result<Self::Entity, GatewayError>>;

	fn update_item(&self, id: &str, body: Value) -> BoxedFuture<Result<Self::Entity, GatewayError>>;

	fn delete_item(&self, id: &str) -> BoxedFuture<Result<(), GatewayError>>;

	/// Opens a cursor over every entity, already bounded to `limit`.
	fn get_prepared_statement(&self, limit: usize) -> BoxedFuture<Result<Self::Cursor, GatewayError>>;

	/// Pulls the next entity from a cursor opened by
	/// [`get_prepared_statement`](Self::get_prepared_statement); `None` once exhausted.
	fn get_item_from_statement(
		&self,
		statement: &mut Self::Cursor,
	) -> BoxedFuture<Result<Option<Self::Entity>, GatewayError>>;
}

// --------------------------------------------------------------------------------
// DataModelMethodHandler

/// Adapts a [`DataModelHandler`] into a [`MethodHandler`] by applying the
/// fixed GET/POST/PUT/DELETE/OPTIONS table from spec.md §4.4.
pub struct DataModelMethodHandler<H: DataModelHandler> {
	base_uri: String,
	inner: H,
	authorize: Arc<dyn Fn(&RestArgument) -> Result<(), GatewayError> + Send + Sync>,
}

impl<H: DataModelHandler> DataModelMethodHandler<H> {
	pub fn new(base_uri: impl Into<String>, inner: H) -> Self {
		Self {
			base_uri: base_uri.into(),
			inner,
			authorize: Arc::new(|_| Ok(())),
		}
	}

	pub fn with_authorization(
		mut self,
		check: impl Fn(&RestArgument) -> Result<(), GatewayError> + Send + Sync + 'static,
	) -> Self {
		self.authorize = Arc::new(check);

		self
	}
}

impl<H: DataModelHandler> MethodHandler for DataModelMethodHandler<H> {
	fn base_uri(&self) -> &str {
		&self.base_uri
	}

	fn allowed_methods(&self) -> &[Method] {
		const METHODS: [Method; 5] = [Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS];

		&METHODS
	}

	fn check_authorization(&self, argument: &RestArgument) -> Result<(), GatewayError> {
		(self.authorize)(argument)
	}

	fn dispatch(self: Arc<Self>, argument: RestArgument) -> BoxedFuture<Result<RestArgument, GatewayError>> {
		Box::pin(async move { dispatch(&self, argument).await })
	}

	fn describe(&self) -> HandlerDescriptor {
		HandlerDescriptor {
			base_uri: self.base_uri.clone(),
			commands: vec![
				(Method::GET, Command::MultiGet),
				(Method::GET, Command::Get),
				(Method::POST, Command::Create),
				(Method::PUT, Command::Update),
				(Method::DELETE, Command::Delete),
				(Method::OPTIONS, Command::Options),
			],
		}
	}
}

/// The table from spec.md §4.4, as code:
///
/// | Method | extra path | action                       |
/// |--------|-----------|-------------------------------|
/// | GET    | 0         | list (`getAll`, respects `limit`) |
/// | GET    | 1         | `getOne`                      |
/// | POST   | 0         | `createItem` + insert         |
/// | PUT    | 1         | `getItem` + merge + `update`  |
/// | DELETE | 1         | `getItem` + `delete`          |
/// | OPTIONS| any       | describe                       |
///
/// Any other combination is [`GatewayError::Forbidden`].
async fn dispatch<H: DataModelHandler>(
	handler: &DataModelMethodHandler<H>,
	mut argument: RestArgument,
) -> Result<RestArgument, GatewayError> {
	let method = argument.method.clone().unwrap_or(Method::GET);
	let extra = argument.uri_args.len();

	match (method, extra) {
		(m, 0) if m == Method::GET => {
			let limit = argument.limit.unwrap_or(DEFAULT_LIST_LIMIT);
			let mut statement = handler.inner.get_prepared_statement(limit).await?;
			let mut items = Vec::new();

			while items.len() < limit {
				match handler.inner.get_item_from_statement(&mut statement).await? {
					Some(item) => items.push(item),
					None => break,
				}
			}

			argument.command = Command::MultiGet;
			argument.answer = json!(items);
			argument.result = json!({ "count": items_len(&argument.answer), "limit": limit });

			Ok(argument)
		}
		(m, 1) if m == Method::GET => {
			let id = &argument.uri_args[0];
			let item = handler
				.inner
				.get_item(id)
				.await?
				.ok_or(GatewayError::NotFound)?;

			argument.command = Command::Get;
			argument.answer = serde_json::to_value(&item).map_err(GatewayError::internal)?;

			Ok(argument)
		}
		(m, 0) if m == Method::POST => {
			let item = handler.inner.create_item(argument.body.clone()).await?;

			argument.command = Command::Create;
			argument.answer = serde_json::to_value(&item).map_err(GatewayError::internal)?;

			Ok(argument)
		}
		(m, 1) if m == Method::PUT => {
			let id = argument.uri_args[0].clone();
			handler.inner.get_item(&id).await?.ok_or(GatewayError::NotFound)?;
			let item = handler.inner.update_item(&id, argument.body.clone()).await?;

			argument.command = Command::Update;
			argument.answer = serde_json::to_value(&item).map_err(GatewayError::internal)?;

			Ok(argument)
		}
		(m, 1) if m == Method::DELETE => {
			let id = argument.uri_args[0].clone();
			handler.inner.get_item(&id).await?.ok_or(GatewayError::NotFound)?;
			handler.inner.delete_item(&id).await?;

			argument.command = Command::Delete;
			argument.answer = Value::Null;

			Ok(argument)
		}
		(m, _) if m == Method::OPTIONS => {
			argument.command = Command::Options;
			argument.answer = json!({ "uri": handler.base_uri, "primaryKey": handler.inner.primary_key_name() });

			Ok(argument)
		}
		_ => Err(GatewayError::Forbidden),
	}
}

fn items_len(answer: &Value) -> usize {
	answer.as_array().map_or(0, Vec::len)
}

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

#[cfg(test)]
mod test {
	use super::*;
	use std::sync::Mutex;

	#[derive(Clone, Serialize)]
	struct Item {
		id: String,
		a: i64,
	}

	struct MemoryHandler {
		items: Mutex<Vec<Item>>,
	}

	impl DataModelHandler for MemoryHandler {
		type Entity = Item;
		type Cursor = std::vec::IntoIter<Item>;

		fn primary_key_name(&self) -> &'static str {
			"id"
		}

		fn get_item(&self, id: &str) -> BoxedFuture<Result<Option<Item>, GatewayError>> {
			let found = self.items.lock().unwrap().iter().find(|item| item.id == id).cloned();
			Box::pin(async move { Ok(found) })
		}

		fn create_item(&self, body: Value) -> BoxedFuture<Result<Item, GatewayError>> {
			let a = body.get("a").and_then(Value::as_i64).unwrap_or_default();
			let item = Item {
				id: format!("{}", self.items.lock().unwrap().len() + 1),
				a,
			};
			self.items.lock().unwrap().push(item.clone());
			Box::pin(async move { Ok(item) })
		}

		fn update_item(&self, id: &str, body: Value) -> BoxedFuture<Result<Item, GatewayError>> {
			let a = body.get("a").and_then(Value::as_i64).unwrap_or_default();
			let id = id.to_string();
			let mut items = self.items.lock().unwrap();
			let item = items.iter_mut().find(|item| item.id == id).unwrap();
			item.a = a;
			let updated = item.clone();
			Box::pin(async move { Ok(updated) })
		}

		fn delete_item(&self, id: &str) -> BoxedFuture<Result<(), GatewayError>> {
			let id = id.to_string();
			self.items.lock().unwrap().retain(|item| item.id != id);
			Box::pin(async move { Ok(()) })
		}

		fn get_prepared_statement(&self, _limit: usize) -> BoxedFuture<Result<Self::Cursor, GatewayError>> {
			let items = self.items.lock().unwrap().clone();
			Box::pin(async move { Ok(items.into_iter()) })
		}

		fn get_item_from_statement(
			&self,
			statement: &mut Self::Cursor,
		) -> BoxedFuture<Result<Option<Item>, GatewayError>> {
			let next = statement.next();
			Box::pin(async move { Ok(next) })
		}
	}

	#[tokio::test]
	async fn create_then_get_then_delete_round_trips() {
		let handler = Arc::new(DataModelMethodHandler::new(
			"/items",
			MemoryHandler { items: Mutex::new(Vec::new()) },
		));

		let create = RestArgument::new("/items".into(), Method::POST, Vec::new()).with_body(json!({ "a": 1 }));
		let created = Arc::clone(&handler).dispatch(create).await.unwrap();
		let id = created.answer.get("id").unwrap().as_str().unwrap().to_string();

		let get = RestArgument::new("/items".into(), Method::GET, vec![id.clone()]);
		let fetched = Arc::clone(&handler).dispatch(get).await.unwrap();
		assert_eq!(fetched.answer.get("a").unwrap(), 1);

		let delete = RestArgument::new("/items".into(), Method::DELETE, vec![id.clone()]);
		Arc::clone(&handler).dispatch(delete).await.unwrap();

		let get_again = RestArgument::new("/items".into(), Method::GET, vec![id]);
		let error = Arc::clone(&handler).dispatch(get_again).await.unwrap_err();
		assert_eq!(error.status_code(), http::StatusCode::NOT_FOUND);
	}
}
