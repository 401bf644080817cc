//! Incremental `application/x-www-form-urlencoded` and `multipart/form-data`
//! decoding with disk spillover (spec.md §4.2).

// ----------

use std::{collections::VecDeque, sync::Arc};

use bytes::{Bytes, BytesMut};

use crate::config::TempFileFactory;

mod boundary;
mod error;
mod part_header;
mod sink;

pub use error::MultipartError;
pub use sink::PartData;

use boundary::BoundaryScanner;
use part_header::{parse_part_header, PartHeader};
use sink::PartSink;

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

/// One decoded item: a plain form attribute, or a file upload that may still
/// be in progress.
#[derive(Debug)]
pub enum DataItem {
	Attribute { name: String, value: String },
	FileUpload {
		name: String,
		filename: Option<String>,
		content_type: Option<String>,
		data: PartData,
		completed: bool,
	},
}

struct PartInProgress {
	header: PartHeader,
	sink: PartSink,
}

enum State {
	AwaitingFirstBoundary,
	ReadingPartHeaders,
	ReadingPartBody(PartInProgress),
	Done,
}

// --------------------------------------------------------------------------------
// MultipartDecoder

/// Stateful decoder of one request body. Fed by [`MultipartDecoder::offer`],
/// drained by [`MultipartDecoder::next`]; spec.md §4.2's `offer`/`hasNext`/
/// `next` incremental contract.
pub struct MultipartDecoder {
	scanner: BoundaryScanner,
	buffer: BytesMut,
	state: State,
	queue: VecDeque<DataItem>,
	memory_threshold: usize,
	temp_files: Arc<TempFileFactory>,
}

impl MultipartDecoder {
	pub fn new(boundary: &str, memory_threshold: usize, temp_files: Arc<TempFileFactory>) -> Self {
		Self {
			scanner: BoundaryScanner::new(boundary),
			buffer: BytesMut::new(),
			state: State::AwaitingFirstBoundary,
			queue: VecDeque::new(),
			memory_threshold,
			temp_files,
		}
	}

	/// Accepts a new body fragment and advances decoding as far as the
	/// buffered bytes allow.
	pub fn offer(&mut self, fragment: &[u8]) -> Result<(), MultipartError> {
		self.buffer.extend_from_slice(fragment);
		self.drive()
	}

	pub fn has_next(&self) -> bool {
		!self.queue.is_empty()
	}

	/// Returns the next complete item, or `None` if more data is needed
	/// (spec.md §4.2: "not enough data" signals the caller defers).
	pub fn next(&mut self) -> Option<DataItem> {
		self.queue.pop_front()
	}

	/// Called on the terminator chunk. An incomplete file upload at this
	/// point is a hard error; its temp file is deleted (spec.md §4.2).
	/// Takes `&mut self`, not `self`, so callers can still drain queued
	/// items with [`MultipartDecoder::next`] afterwards.
	pub fn finish(&mut self) -> Result<(), MultipartError> {
		match std::mem::replace(&mut self.state, State::Done) {
			State::ReadingPartBody(part) => {
				let name = part.header.name.clone();
				part.sink.delete();

				Err(MultipartError::IncompleteAtEof { name })
			}
			State::ReadingPartHeaders => Err(MultipartError::MalformedBoundary),
			State::AwaitingFirstBoundary | State::Done => Ok(()),
		}
	}

	fn drive(&mut self) -> Result<(), MultipartError> {
		loop {
			match &mut self.state {
				State::AwaitingFirstBoundary => match self.scanner.find(&self.buffer) {
					Some(found) if found.is_final => {
						self.buffer.clear();
						self.state = State::Done;
					}
					Some(found) => {
						advance(&mut self.buffer, found.next_start);
						self.state = State::ReadingPartHeaders;
					}
					None => return Ok(()),
				},
				State::ReadingPartHeaders => match memchr::memmem::find(&self.buffer, b"\r\n\r\n") {
					Some(position) => {
						let header = parse_part_header(&self.buffer[..position + 4])?;
						advance(&mut self.buffer, position + 4);
						self.state = State::ReadingPartBody(PartInProgress {
							header,
							sink: PartSink::new(),
						});
					}
					None => return Ok(()),
				},
				State::ReadingPartBody(part) => match self.scanner.find(&self.buffer) {
					Some(found) => {
						part.sink.write(&self.buffer[..found.body_end], self.memory_threshold, &self.temp_files)?;

						let State::ReadingPartBody(part) = std::mem::replace(&mut self.state, State::Done) else {
							unreachable!()
						};

						self.queue.push_back(finalize(part, true)?);
						advance(&mut self.buffer, found.next_start);
						self.state = if found.is_final { State::Done } else { State::ReadingPartHeaders };
					}
					None => {
						let safe_len = self.buffer.len().saturating_sub(self.scanner.lookback_len());

						if safe_len > 0 {
							part.sink.write(&self.buffer[..safe_len], self.memory_threshold, &self.temp_files)?;
							advance(&mut self.buffer, safe_len);
						}

						return Ok(());
					}
				},
				State::Done => return Ok(()),
			}
		}
	}
}

fn advance(buffer: &mut BytesMut, by: usize) {
	let _ = buffer.split_to(by.min(buffer.len()));
}

fn finalize(part: PartInProgress, completed: bool) -> Result<DataItem, MultipartError> {
	let PartInProgress { header, sink } = part;
	let data = sink.finish()?;

	if header.filename.is_some() {
		Ok(DataItem::FileUpload {
			name: header.name,
			filename: header.filename,
			content_type: header.content_type,
			data,
			completed,
		})
	} else {
		let value = match data {
			PartData::Memory(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
			PartData::Disk(path) => std::fs::read_to_string(&path).unwrap_or_default(),
		};

		Ok(DataItem::Attribute { name: header.name, value })
	}
}

// --------------------------------------------------------------------------------
// application/x-www-form-urlencoded

/// Decodes a fully-buffered `application/x-www-form-urlencoded` body (spec.md
/// §6: bodies may also arrive this way, without a boundary to scan for).
pub fn decode_urlencoded(body: &Bytes) -> Result<Vec<(String, String)>, MultipartError> {
	serde_urlencoded::from_bytes(body).map_err(|_| MultipartError::MalformedUrlencoded)
}

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------
