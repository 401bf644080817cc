#![allow(dead_code)]

// ----------

use std::{future::Future, pin::Pin};

// ----------

pub use std::error::Error as StdError;

pub(crate) use thiserror::Error as ImplError;

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

#[macro_use]
pub(crate) mod macros;

pub mod body;
pub mod http;
pub mod request;
pub mod response;

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

pub type BoxedError = Box<dyn StdError + Send + Sync>;
pub type BoxedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

// --------------------------------------------------------------------------------
// IntoArray trait
//
// Lets a handful of APIs accept either a bare value or an array of them, e.g.
// `jar.add(Plain.cookie(...))` as well as `jar.add([a, b, c])`.

pub trait IntoArray<T, const N: usize> {
	fn into_array(self) -> [T; N];
}

impl<T, const N: usize> IntoArray<T, N> for [T; N]
where
	T: IntoArray<T, 1>,
{
	fn into_array(self) -> [T; N] {
		self
	}
}

// --------------------------------------------------
// Marker

pub(crate) mod marker {
	pub struct Private;
}

// --------------------------------------------------------------------------------

// Used when expecting a valid value in Options or Results that an invariant
// elsewhere in the crate already guarantees.
pub(crate) const SCOPE_VALIDITY: &str = "scope validity";

// --------------------------------------------------------------------------------
