//! Field extraction and hook invocation for the page dispatch engine
//! (spec.md §4.1 step 8, §4.3).

// ----------

use std::{collections::HashMap, net::SocketAddr, path::PathBuf};

use bytes::Bytes;
use http_body_util::BodyExt;

use crate::{
	config::{GatewayConfig, TempFileFactory},
	error::GatewayError,
	multipart::{decode_urlencoded, DataItem, MultipartDecoder, PartData},
	page::{FieldRole, Page, Role},
	session::{CommandRole, Session},
};

use super::{parse_query, single_header_value, RenderedBody, RequestContext};

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

pub(crate) async fn dispatch<B>(
	page: &Page,
	head: &http::request::Parts,
	body: &mut B,
	context: &mut RequestContext,
	session: &mut Session,
	config: &GatewayConfig,
	peer_address: Option<SocketAddr>,
) -> Result<RenderedBody, GatewayError>
where
	B: BodyExt<Data = Bytes> + Unpin,
	B::Error: std::fmt::Display,
{
	session.set_role(role_to_command_role(page.role));

	let mut request = page.new_business_request(peer_address);

	(page.capabilities.check_connection)(&*request)?;

	let query = parse_query(head.uri.query())?;
	let mut extracted: HashMap<String, String> = HashMap::new();

	for field in &page.fields {
		let value = match field.role {
			FieldRole::Url => query.get(&field.name).cloned(),
			FieldRole::Header => single_header_value(&head.headers, &field.name)?,
			FieldRole::Cookie => context.cookies.get(&field.name).map(|cookie| cookie.value().to_owned()),
			FieldRole::Body | FieldRole::BusinessInputFile | FieldRole::CookieSet => None,
		};

		let value = value.or_else(|| field.default.clone());

		if let Some(value) = value {
			field.validate(&value)?;
			request.set_value(&field.name, &value, field.role)?;
			extracted.insert(field.name.clone(), value);
		} else if !matches!(field.role, FieldRole::Body | FieldRole::BusinessInputFile | FieldRole::CookieSet) {
			return Err(GatewayError::MissingField { name: field.name.clone() });
		}
	}

	match page.role {
		Role::Post | Role::Put => {
			let bytes = collect(body).await?;
			let pairs = decode_urlencoded(&bytes)?;
			let form: HashMap<String, String> = pairs.into_iter().collect();

			for field in page.fields.iter().filter(|field| field.role == FieldRole::Body) {
				let Some(value) = form.get(&field.name).cloned().or_else(|| field.default.clone()) else {
					return Err(GatewayError::MissingField { name: field.name.clone() });
				};

				field.validate(&value)?;
				request.set_value(&field.name, &value, FieldRole::Body)?;
				extracted.insert(field.name.clone(), value);
			}
		}
		Role::PostUpload => {
			let bytes = collect(body).await?;
			let boundary = boundary_from_content_type(&head.headers).ok_or(GatewayError::MissingField {
				name: "content-type".into(),
			})?;

			let mut decoder = MultipartDecoder::new(&boundary, config.multipart_memory_threshold(), config.temp_files().clone());
			decoder.offer(&bytes)?;
			decoder.finish()?;

			while let Some(item) = decoder_next(&mut decoder) {
				match item {
					DataItem::Attribute { name, value } => {
						if page.fields.iter().any(|field| field.name == name && field.role == FieldRole::Body) {
							request.set_value(&name, &value, FieldRole::Body)?;
							extracted.insert(name, value);
						}
					}
					DataItem::FileUpload { name, data, .. } => {
						if page.fields.iter().any(|field| field.name == name && field.role == FieldRole::BusinessInputFile) {
							let path = persist_upload(data, config.temp_files()).map_err(GatewayError::internal)?;
							let path = path.to_string_lossy().into_owned();
							request.set_value(&name, &path, FieldRole::BusinessInputFile)?;
							extracted.insert(name, path);
						}
					}
				}
			}
		}
		Role::GetDownload => {
			if (page.capabilities.get_filename)(&*request).is_none() {
				return Err(GatewayError::NotFound);
			}
		}
		Role::Error => {
			let error = GatewayError::BadRequest { reason: "error page".into() };
			(page.capabilities.error)(&error);
			context.status = error.status_code();
			context.mark_will_close();
		}
		Role::Html | Role::Menu | Role::Delete => {}
	}

	(page.capabilities.business_valid_request_after_all_data_received)(&*request)?;

	if !request.is_request_valid() {
		return Err(GatewayError::Forbidden);
	}

	(page.capabilities.before_simple_page)(&*request)?;
	(page.capabilities.final_data)(&*request, page.role)?;

	for field in page.fields.iter().filter(|field| field.export_as_cookie) {
		if let Some(value) = extracted.get(&field.name) {
			context.cookies.add(cookie::Cookie::new(field.name.clone(), value.clone()));
		}
	}

	let response = request.render()?;

	Ok(RenderedBody::Html(response))
}

fn role_to_command_role(role: Role) -> CommandRole {
	match role {
		Role::Html => CommandRole::Html,
		Role::Menu => CommandRole::Menu,
		Role::GetDownload => CommandRole::GetDownload,
		Role::Post => CommandRole::Post,
		Role::PostUpload => CommandRole::PostUpload,
		Role::Put => CommandRole::Put,
		Role::Delete => CommandRole::Delete,
		Role::Error => CommandRole::Error,
	}
}

async fn collect<B>(body: &mut B) -> Result<Bytes, GatewayError>
where
	B: BodyExt<Data = Bytes> + Unpin,
	B::Error: std::fmt::Display,
{
	body.collect()
		.await
		.map(|collected| collected.to_bytes())
		.map_err(|error| GatewayError::internal(error.to_string()))
}

fn decoder_next(decoder: &mut MultipartDecoder) -> Option<DataItem> {
	decoder.next()
}

fn boundary_from_content_type(headers: &http::HeaderMap) -> Option<String> {
	let value = headers.get(http::header::CONTENT_TYPE)?.to_str().ok()?;

	value
		.split(';')
		.map(str::trim)
		.find_map(|part| part.strip_prefix("boundary="))
		.map(|boundary| boundary.trim_matches('"').to_owned())
}

/// Spills an in-memory upload to a fresh temp file so every upload ends up at
/// a filesystem path business logic can read from, regardless of whether it
/// was small enough to stay in memory.
fn persist_upload(data: PartData, temp_files: &TempFileFactory) -> std::io::Result<PathBuf> {
	match data {
		PartData::Disk(path) => Ok(path),
		PartData::Memory(bytes) => {
			use std::io::Write;

			let mut file = temp_files.create()?;
			file.write_all(&bytes)?;
			let (_, path) = file.keep()?;

			Ok(path)
		}
	}
}

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------
