//! Per-connection [`Session`] state (spec.md §3, §4.1 "On connection activation").

// ----------

use rand::{rngs::SmallRng, Rng, SeedableRng};
use std::sync::Mutex;

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

/// The session cookie's default prefix (spec.md §3: `"Waarp" + hex(random int64)`).
const TOKEN_PREFIX: &str = "Waarp";

/// The current command role driving a connection's control flow (spec.md §4.1
/// step 3's "HTML" default, and the page Role enum it's otherwise set from).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandRole {
	#[default]
	Html,
	Menu,
	GetDownload,
	Post,
	PostUpload,
	Put,
	Delete,
	Error,
}

/// An opaque session-cookie token, `"Waarp" + hex(random i64)` by default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookieToken(String);

impl SessionCookieToken {
	pub fn mint(rng: &mut impl Rng) -> Self {
		let value: i64 = rng.gen();

		Self(format!("{TOKEN_PREFIX}{value:x}"))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Whether `raw` is a token this engine would have minted itself: any
	/// value sharing the minted prefix is accepted (spec.md §4.5 "echo valid
	/// incoming cookies"; validity itself is otherwise delegated to the
	/// capability hook `isCookieValid`, spec.md §9).
	pub fn looks_valid(raw: &str) -> bool {
		raw.starts_with(TOKEN_PREFIX) && raw.len() > TOKEN_PREFIX.len()
	}
}

impl From<String> for SessionCookieToken {
	fn from(raw: String) -> Self {
		Self(raw)
	}
}

// --------------------------------------------------------------------------------
// Session

/// Lifecycle bound to one transport connection: created on connection
/// activation, destroyed on connection inactivation, mutated only by the
/// owning `ProtocolEngine` (spec.md §3's Session data model).
#[derive(Debug)]
pub struct Session {
	cookie: SessionCookieToken,
	auth_principal: Option<String>,
	role: CommandRole,
	transient_filename: Option<String>,
	transient_log_id: Option<u64>,
	rng: Mutex<SmallRng>,
}

impl Session {
	/// Creates a session with a fresh session-cookie token and role `Html`
	/// (spec.md §4.1 "On connection activation").
	pub fn activate() -> Self {
		let mut rng = SmallRng::from_entropy();
		let cookie = SessionCookieToken::mint(&mut rng);

		Self {
			cookie,
			auth_principal: None,
			role: CommandRole::default(),
			transient_filename: None,
			transient_log_id: None,
			rng: Mutex::new(rng),
		}
	}

	pub fn cookie(&self) -> &SessionCookieToken {
		&self.cookie
	}

	/// Adopts `incoming` as this session's cookie if it passes
	/// [`SessionCookieToken::looks_valid`], otherwise leaves the minted one
	/// in place (spec.md §4.5's echo-or-mint rule).
	pub fn adopt_incoming_cookie(&mut self, incoming: &str) {
		if SessionCookieToken::looks_valid(incoming) {
			self.cookie = SessionCookieToken::from(incoming.to_owned());
		}
	}

	pub fn role(&self) -> CommandRole {
		self.role
	}

	pub fn set_role(&mut self, role: CommandRole) {
		self.role = role;
	}

	pub fn auth_principal(&self) -> Option<&str> {
		self.auth_principal.as_deref()
	}

	pub fn set_auth_principal(&mut self, principal: Option<String>) {
		self.auth_principal = principal;
	}

	pub fn transient_filename(&self) -> Option<&str> {
		self.transient_filename.as_deref()
	}

	pub fn set_transient_filename(&mut self, filename: Option<String>) {
		self.transient_filename = filename;
	}

	pub fn transient_log_id(&self) -> Option<u64> {
		self.transient_log_id
	}

	pub fn set_transient_log_id(&mut self, id: Option<u64>) {
		self.transient_log_id = id;
	}
}

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn minted_token_carries_the_waarp_prefix() {
		let mut rng = SmallRng::seed_from_u64(1);
		let token = SessionCookieToken::mint(&mut rng);

		assert!(token.as_str().starts_with("Waarp"));
		assert!(SessionCookieToken::looks_valid(token.as_str()));
	}

	#[test]
	fn adopt_incoming_cookie_rejects_garbage() {
		let mut session = Session::activate();
		let minted = session.cookie().clone();

		session.adopt_incoming_cookie("not-a-session-token");
		assert_eq!(session.cookie(), &minted);

		session.adopt_incoming_cookie("WaarpDEADBEEF");
		assert_eq!(session.cookie().as_str(), "WaarpDEADBEEF");
	}

	#[test]
	fn activate_defaults_to_html_role() {
		let session = Session::activate();
		assert_eq!(session.role(), CommandRole::Html);
	}
}
