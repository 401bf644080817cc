//! Engine-level scenarios (spec.md §8 S1-S6) and the property checks that
//! can only be exercised once both dispatch engines are wired together.

// ----------

use std::{
	collections::HashMap,
	sync::{Arc, Mutex},
};

use bytes::Bytes;
use http::{Method, StatusCode, Version};
use http_body_util::Full;
use serde_json::{json, Value};

use wgk_core::{body::Body, response::Response, BoxedFuture};

use wgk_http::{
	config::GatewayConfig,
	engine::ProtocolEngine,
	error::GatewayError,
	page::{BusinessRequest, Field, FieldRole, Page, PageRegistry, Role},
	rest::{
		data_model::{DataModelHandler, DataModelMethodHandler},
		MethodRegistry,
	},
};

// --------------------------------------------------------------------------------
// helpers

fn temp_config() -> (GatewayConfig, std::path::PathBuf) {
	let id = std::process::id();
	let nonce = std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.unwrap()
		.as_nanos();

	let root = std::env::temp_dir().join(format!("wgk-engine-test-{id}-{nonce}"));
	let static_dir = root.join("static");
	let temp_dir = root.join("tmp");

	std::fs::create_dir_all(&static_dir).unwrap();

	let config = GatewayConfig::bootstrap(&static_dir, &temp_dir).unwrap();

	(config, static_dir)
}

fn request_with_body(method: Method, uri: &str, content_type: Option<&str>, body: Vec<u8>) -> (http::request::Parts, Full<Bytes>) {
	let mut builder = http::Request::builder().method(method).uri(uri).version(Version::HTTP_11);

	if let Some(content_type) = content_type {
		builder = builder.header(http::header::CONTENT_TYPE, content_type);
	}

	let request = builder.body(Full::from(Bytes::from(body))).unwrap();

	request.into_parts()
}

fn request(method: Method, uri: &str) -> (http::request::Parts, Full<Bytes>) {
	request_with_body(method, uri, None, Vec::new())
}

async fn body_text(response: Response) -> String {
	use http_body_util::BodyExt;

	let collected = response
		.into_body()
		.collect()
		.await
		.unwrap_or_else(|error| panic!("failed to collect response body: {error}"));

	String::from_utf8_lossy(&collected.to_bytes()).into_owned()
}

struct FixedRequest {
	body: String,
}

impl BusinessRequest for FixedRequest {
	fn set_value(&mut self, _name: &str, _value: &str, _position: FieldRole) -> Result<(), GatewayError> {
		Ok(())
	}

	fn is_request_valid(&self) -> bool {
		true
	}

	fn render(&self) -> Result<Response, GatewayError> {
		Ok(Response::new(Body::from(self.body.clone())))
	}
}

// --------------------------------------------------------------------------------
// S1: static GET fallback, including the registered 404 error page

#[tokio::test]
async fn s1_static_fallback_serves_file_and_falls_back_to_error_page_when_missing() {
	let (config, static_dir) = temp_config();
	std::fs::write(static_dir.join("hello.txt"), b"hi there").unwrap();

	let error_page = Page::new("not-found", "/__error__", Method::GET, Role::Html, |_| {
		Box::new(FixedRequest { body: "gone".into() })
	});

	let pages = PageRegistry::builder().register_error_page(StatusCode::NOT_FOUND, error_page).build();

	let mut engine = ProtocolEngine::activate(Arc::new(config), Arc::new(pages), None, None);

	let (head, body) = request(Method::GET, "/hello.txt");
	let response = engine.handle(head, body).await;
	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(body_text(response).await, "hi there");

	let (head, body) = request(Method::GET, "/does-not-exist.txt");
	let response = engine.handle(head, body).await;

	assert_eq!(response.status(), StatusCode::NOT_FOUND);
	assert_eq!(body_text(response).await, "gone");
}

// --------------------------------------------------------------------------------
// S2: multi-value query rejection, end to end (spec.md §8 property 4)

#[tokio::test]
async fn s2_duplicate_query_key_is_rejected_with_400() {
	let (config, _static_dir) = temp_config();

	let page = Page::new("widget", "/widgets", Method::GET, Role::Html, |_| {
		Box::new(FixedRequest { body: "ok".into() })
	})
	.with_fields(vec![Field::new("id", FieldRole::Url, 0)]);

	let pages = PageRegistry::builder().register(page).build();
	let mut engine = ProtocolEngine::activate(Arc::new(config), Arc::new(pages), None, None);

	let (head, body) = request(Method::GET, "/widgets?id=1&id=2");
	let response = engine.handle(head, body).await;

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	assert!(body_text(response).await.contains("Too many values for id"));
}

// --------------------------------------------------------------------------------
// S3: multipart upload with disk spillover

struct CapturingRequest {
	values: Arc<Mutex<HashMap<String, String>>>,
}

impl BusinessRequest for CapturingRequest {
	fn set_value(&mut self, name: &str, value: &str, _position: FieldRole) -> Result<(), GatewayError> {
		self.values.lock().unwrap().insert(name.to_owned(), value.to_owned());

		Ok(())
	}

	fn is_request_valid(&self) -> bool {
		true
	}

	fn render(&self) -> Result<Response, GatewayError> {
		let payload = json!(*self.values.lock().unwrap());

		Ok(Response::new(Body::from(payload.to_string())))
	}
}

#[tokio::test]
async fn s3_multipart_upload_spills_large_part_to_disk() {
	let (config, _static_dir) = temp_config();
	let config = config.with_multipart_memory_threshold(4);

	let values = Arc::new(Mutex::new(HashMap::new()));
	let captured = values.clone();

	let page = Page::new("upload", "/upload", Method::POST, Role::PostUpload, move |_| {
		Box::new(CapturingRequest { values: captured.clone() })
	})
	.with_fields(vec![
		Field::new("note", FieldRole::Body, 0),
		Field::new("upload", FieldRole::BusinessInputFile, 1),
	]);

	let pages = PageRegistry::builder().register(page).build();
	let mut engine = ProtocolEngine::activate(Arc::new(config), Arc::new(pages), None, None);

	let body = b"--X\r\n\
Content-Disposition: form-data; name=\"note\"\r\n\r\n\
hello\r\n\
--X\r\n\
Content-Disposition: form-data; name=\"upload\"; filename=\"a.bin\"\r\n\
Content-Type: application/octet-stream\r\n\r\n\
this part is longer than the threshold\r\n\
--X--\r\n"
		.to_vec();

	let (head, body) = request_with_body(Method::POST, "/upload", Some("multipart/form-data; boundary=X"), body);
	let response = engine.handle(head, body).await;

	assert_eq!(response.status(), StatusCode::OK);

	let captured = values.lock().unwrap();
	assert_eq!(captured.get("note").map(String::as_str), Some("hello"));

	let path = captured.get("upload").expect("upload field recorded");
	let contents = std::fs::read_to_string(path).expect("spilled part should be readable from disk");
	assert_eq!(contents, "this part is longer than the threshold");
}

// --------------------------------------------------------------------------------
// S4: REST CRUD round trip

#[derive(Clone, serde::Serialize)]
struct Widget {
	id: String,
	name: String,
}

struct WidgetStore {
	items: Mutex<Vec<Widget>>,
}

impl DataModelHandler for WidgetStore {
	type Entity = Widget;
	type Cursor = std::vec::IntoIter<Widget>;

	fn primary_key_name(&self) -> &'static str {
		"id"
	}

	fn get_item(&self, id: &str) -> BoxedFuture<Result<Option<Widget>, GatewayError>> {
		let found = self.items.lock().unwrap().iter().find(|item| item.id == id).cloned();

		Box::pin(async move { Ok(found) })
	}

	fn create_item(&self, body: Value) -> BoxedFuture<Result<Widget, GatewayError>> {
		let name = body.get("name").and_then(Value::as_str).unwrap_or_default().to_owned();
		let item = Widget {
			id: format!("{}", self.items.lock().unwrap().len() + 1),
			name,
		};

		self.items.lock().unwrap().push(item.clone());

		Box::pin(async move { Ok(item) })
	}

	fn update_item(&self, id: &str, body: Value) -> BoxedFuture<Result<Widget, GatewayError>> {
		let name = body.get("name").and_then(Value::as_str).unwrap_or_default().to_owned();
		let id = id.to_owned();

		let mut items = self.items.lock().unwrap();
		let item = items.iter_mut().find(|item| item.id == id).unwrap();
		item.name = name;
		let updated = item.clone();

		Box::pin(async move { Ok(updated) })
	}

	fn delete_item(&self, id: &str) -> BoxedFuture<Result<(), GatewayError>> {
		let id = id.to_owned();
		self.items.lock().unwrap().retain(|item| item.id != id);

		Box::pin(async move { Ok(()) })
	}

	fn get_prepared_statement(&self, _limit: usize) -> BoxedFuture<Result<Self::Cursor, GatewayError>> {
		let items = self.items.lock().unwrap().clone();

		Box::pin(async move { Ok(items.into_iter()) })
	}

	fn get_item_from_statement(&self, statement: &mut Self::Cursor) -> BoxedFuture<Result<Option<Widget>, GatewayError>> {
		let next = statement.next();

		Box::pin(async move { Ok(next) })
	}
}

#[tokio::test]
async fn s4_rest_create_get_delete_round_trips() {
	let (config, _static_dir) = temp_config();

	let handler = DataModelMethodHandler::new("/widgets", WidgetStore { items: Mutex::new(Vec::new()) });
	let rest = MethodRegistry::builder().register(handler).build();

	let pages = PageRegistry::builder().build();
	let mut engine = ProtocolEngine::activate(Arc::new(config), Arc::new(pages), Some(Arc::new(rest)), None);

	let (head, body) = request_with_body(Method::POST, "/widgets", Some("application/json"), br#"{"name":"cog"}"#.to_vec());
	let response = engine.handle(head, body).await;
	assert_eq!(response.status(), StatusCode::OK);

	let created: Value = serde_json::from_str(&body_text(response).await).unwrap();
	let id = created["answer"]["id"].as_str().unwrap().to_owned();

	let (head, body) = request(Method::GET, &format!("/widgets/{id}"));
	let response = engine.handle(head, body).await;
	let fetched: Value = serde_json::from_str(&body_text(response).await).unwrap();
	assert_eq!(fetched["answer"]["name"], "cog");

	let (head, body) = request(Method::DELETE, &format!("/widgets/{id}"));
	let response = engine.handle(head, body).await;
	assert_eq!(response.status(), StatusCode::OK);

	let (head, body) = request(Method::GET, &format!("/widgets/{id}"));
	let response = engine.handle(head, body).await;
	assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// --------------------------------------------------------------------------------
// S5: keep-alive on success, close on error, over pipelined requests

#[tokio::test]
async fn s5_connection_closes_after_an_error_response() {
	let (config, static_dir) = temp_config();
	std::fs::write(static_dir.join("ok.txt"), b"ok").unwrap();

	let pages = PageRegistry::builder().build();
	let mut engine = ProtocolEngine::activate(Arc::new(config), Arc::new(pages), None, None);

	let (head, body) = request(Method::GET, "/ok.txt");
	let response = engine.handle(head, body).await;
	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(response.headers().get(http::header::CONNECTION).unwrap(), "keep-alive");

	let (head, body) = request(Method::GET, "/missing.txt");
	let response = engine.handle(head, body).await;
	assert_eq!(response.status(), StatusCode::NOT_FOUND);
	assert!(response.headers().get(http::header::CONNECTION).is_none());
}

// --------------------------------------------------------------------------------
// S6: root OPTIONS discovery (spec.md §8 property 7)

#[tokio::test]
async fn s6_root_options_aggregates_every_handler() {
	let (config, _static_dir) = temp_config();

	let widgets = DataModelMethodHandler::new("/widgets", WidgetStore { items: Mutex::new(Vec::new()) });
	let rest = MethodRegistry::builder().register(widgets).build();

	let pages = PageRegistry::builder().build();
	let mut engine = ProtocolEngine::activate(Arc::new(config), Arc::new(pages), Some(Arc::new(rest)), None);

	let (head, body) = request(Method::OPTIONS, "/");
	let response = engine.handle(head, body).await;

	assert_eq!(response.status(), StatusCode::OK);

	let allow = response.headers().get(http::header::ALLOW).unwrap().to_str().unwrap();
	assert!(allow.contains("GET"));
	assert!(allow.contains("OPTIONS"));

	let allow_uris = response.headers().get("x-allow-uris").unwrap().to_str().unwrap();
	assert_eq!(allow_uris, "/widgets");

	let detailed = response.headers().get("x-detailed-allow").unwrap().to_str().unwrap();
	assert!(detailed.contains("/widgets"));
}
