//! In-memory/disk spillover sink for one multipart part (spec.md §4.2
//! "Threshold policy").

// ----------

use std::{
	io::{self, Write},
	path::PathBuf,
};

use bytes::{Bytes, BytesMut};
use tempfile::NamedTempFile;

use crate::config::TempFileFactory;

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

/// Where a finished part's content ended up.
#[derive(Debug)]
pub enum PartData {
	Memory(Bytes),
	Disk(PathBuf),
}

/// Accumulates one part's body, spilling to a temp file once it grows past
/// the configured threshold. The temp file is deleted on drop unless
/// [`PartSink::finish`] persists it first (spec.md §6 `deleteOnExit`).
pub enum PartSink {
	Memory(BytesMut),
	Disk(NamedTempFile),
}

impl PartSink {
	pub fn new() -> Self {
		PartSink::Memory(BytesMut::new())
	}

	pub fn write(&mut self, bytes: &[u8], threshold: usize, temp_files: &TempFileFactory) -> io::Result<()> {
		match self {
			PartSink::Memory(buffer) => {
				buffer.extend_from_slice(bytes);

				if buffer.len() > threshold {
					let mut named = temp_files.create()?;
					named.write_all(buffer)?;
					*self = PartSink::Disk(named);
				}

				Ok(())
			}
			PartSink::Disk(named) => named.write_all(bytes),
		}
	}

	/// Consumes the sink, persisting a spilled part's temp file so it
	/// survives past this call (the handler still needs to read it).
	pub fn finish(self) -> io::Result<PartData> {
		match self {
			PartSink::Memory(buffer) => Ok(PartData::Memory(buffer.freeze())),
			PartSink::Disk(named) => {
				let (_file, path) = named.keep().map_err(|error| error.error)?;

				Ok(PartData::Disk(path))
			}
		}
	}

	/// Drops the sink without persisting: a spilled part's temp file is
	/// deleted (spec.md §4.2: "pending files are deleted").
	pub fn delete(self) {}
}

impl Default for PartSink {
	fn default() -> Self {
		Self::new()
	}
}
