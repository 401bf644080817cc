//! Parses one part's `Content-Disposition`/`Content-Type` header block.

// ----------

use super::error::MultipartError;

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

pub struct PartHeader {
	pub name: String,
	pub filename: Option<String>,
	pub content_type: Option<String>,
}

/// `raw` must end with the blank line terminating the header block
/// (`"\r\n\r\n"`), the way [`httparse::parse_headers`] expects it.
pub fn parse_part_header(raw: &[u8]) -> Result<PartHeader, MultipartError> {
	let mut storage = [httparse::EMPTY_HEADER; 16];

	let headers = match httparse::parse_headers(raw, &mut storage).map_err(MultipartError::MalformedPartHeader)? {
		httparse::Status::Complete((_, headers)) => headers,
		httparse::Status::Partial => return Err(MultipartError::MalformedBoundary),
	};

	let mut name = None;
	let mut filename = None;
	let mut content_type = None;

	for header in headers {
		if header.name.eq_ignore_ascii_case("content-disposition") {
			let value = std::str::from_utf8(header.value).map_err(|_| MultipartError::MalformedBoundary)?;
			let (parsed_name, parsed_filename) = parse_content_disposition(value);
			name = parsed_name;
			filename = parsed_filename;
		} else if header.name.eq_ignore_ascii_case("content-type") {
			content_type = std::str::from_utf8(header.value).ok().map(str::to_owned);
		}
	}

	Ok(PartHeader {
		name: name.ok_or(MultipartError::MissingContentDisposition)?,
		filename,
		content_type,
	})
}

fn parse_content_disposition(value: &str) -> (Option<String>, Option<String>) {
	let mut name = None;
	let mut filename = None;

	for segment in value.split(';').skip(1) {
		let segment = segment.trim();

		if let Some(rest) = segment.strip_prefix("name=") {
			name = Some(unquote(rest));
		} else if let Some(rest) = segment.strip_prefix("filename=") {
			filename = Some(unquote(rest));
		}
	}

	(name, filename)
}

fn unquote(value: &str) -> String {
	value.trim_matches('"').to_owned()
}

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------
