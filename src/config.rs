//! Configuration for the gateway's HTTP engines.

// ----------

use std::{
	io,
	path::{Path, PathBuf},
	sync::{atomic::AtomicU64, Arc},
};

use crate::rest::MethodRegistry;

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

const DEFAULT_SESSION_COOKIE_NAME: &str = "cookieSession";

/// In-memory threshold under which a multipart part is kept in memory before
/// spilling to disk. See [`crate::multipart`].
pub const DEFAULT_MULTIPART_MEMORY_THRESHOLD: usize = 16 * 1024;

// --------------------------------------------------
// GatewayConfig

/// Configuration shared by every connection the gateway serves.
///
/// Built once at startup and never mutated afterwards; cheap to clone since
/// it's a handful of `Arc`-backed fields (matches the teacher's "registries
/// are immutable after startup" design, spec.md §9).
#[derive(Clone)]
pub struct GatewayConfig {
	base_static_path: Arc<PathBuf>,
	session_cookie_name: Arc<str>,
	temp_files: Arc<TempFileFactory>,
	multipart_memory_threshold: usize,
}

impl GatewayConfig {
	/// Creates the configuration, eagerly creating `temp_dir` if it doesn't
	/// exist yet (spec.md §9, "temp-path bootstrap": the temp path must be
	/// set by configuration before the first request and the directory must
	/// exist before it's needed).
	pub fn bootstrap(base_static_path: impl Into<PathBuf>, temp_dir: impl Into<PathBuf>) -> io::Result<Self> {
		let temp_dir = temp_dir.into();
		std::fs::create_dir_all(&temp_dir)?;

		Ok(Self {
			base_static_path: Arc::new(base_static_path.into()),
			session_cookie_name: Arc::from(DEFAULT_SESSION_COOKIE_NAME),
			temp_files: Arc::new(TempFileFactory::new(temp_dir)),
			multipart_memory_threshold: DEFAULT_MULTIPART_MEMORY_THRESHOLD,
		})
	}

	/// Overrides the session cookie's name. Defaults to `"cookieSession"`.
	pub fn with_session_cookie_name(mut self, name: impl Into<Arc<str>>) -> Self {
		self.session_cookie_name = name.into();

		self
	}

	/// Overrides the in-memory/disk spillover threshold for multipart parts.
	pub fn with_multipart_memory_threshold(mut self, bytes: usize) -> Self {
		self.multipart_memory_threshold = bytes;

		self
	}

	pub fn base_static_path(&self) -> &Path {
		&self.base_static_path
	}

	pub fn session_cookie_name(&self) -> &str {
		&self.session_cookie_name
	}

	pub fn temp_files(&self) -> &Arc<TempFileFactory> {
		&self.temp_files
	}

	pub fn multipart_memory_threshold(&self) -> usize {
		self.multipart_memory_threshold
	}
}

// --------------------------------------------------
// TempFileFactory

/// Shared allocator of unique temp-file paths under a single directory.
///
/// Shared across connections (spec.md §5, "Shared-resource policy"); the
/// counter is the only mutable state and needs no lock.
pub struct TempFileFactory {
	dir: PathBuf,
	counter: AtomicU64,
}

impl TempFileFactory {
	pub(crate) fn new(dir: PathBuf) -> Self {
		Self {
			dir,
			counter: AtomicU64::new(0),
		}
	}

	pub fn dir(&self) -> &Path {
		&self.dir
	}

	/// Returns a path under `dir()` guaranteed not to have been returned by
	/// this factory before. Used for naming transient artifacts (e.g. a
	/// session's transient filename) that don't need a backing temp file yet.
	pub fn allocate(&self) -> PathBuf {
		let id = self.counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);

		self.dir.join(format!("wgk-upload-{id:016x}.part"))
	}

	/// Creates a spillover temp file with a name from this factory's counter.
	/// Deleted automatically on drop unless the caller persists it (spec.md
	/// §6: "`deleteOnExit` is set").
	pub fn create(&self) -> io::Result<tempfile::NamedTempFile> {
		let id = self.counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);

		tempfile::Builder::new()
			.prefix(&format!("wgk-upload-{id:016x}-"))
			.tempfile_in(&self.dir)
	}
}

// --------------------------------------------------------------------------------
// RestConfiguration

/// The REST engine's configuration: the set of registered method handlers.
#[derive(Clone)]
pub struct RestConfiguration {
	registry: Arc<MethodRegistry>,
}

impl RestConfiguration {
	pub fn new(registry: MethodRegistry) -> Self {
		Self {
			registry: Arc::new(registry),
		}
	}

	pub fn registry(&self) -> &Arc<MethodRegistry> {
		&self.registry
	}
}

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn temp_file_factory_allocates_unique_paths() {
		let factory = TempFileFactory::new(PathBuf::from("/tmp/wgk-test"));

		let a = factory.allocate();
		let b = factory.allocate();

		assert_ne!(a, b);
		assert!(a.starts_with("/tmp/wgk-test"));
	}

	#[test]
	fn bootstrap_creates_temp_dir() {
		let dir = std::env::temp_dir().join(format!("wgk-bootstrap-test-{}", std::process::id()));
		let _ = std::fs::remove_dir_all(&dir);

		let config = GatewayConfig::bootstrap("/var/www", &dir).expect("bootstrap should succeed");
		assert!(dir.is_dir());
		assert_eq!(config.session_cookie_name(), "cookieSession");

		let _ = std::fs::remove_dir_all(&dir);
	}
}
