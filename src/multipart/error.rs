//! Multipart/urlencoded decoder failure modes (spec.md §4.2: "malformed
//! stream → NOT_ACCEPTABLE (406)").

// ----------

#[derive(Debug, crate::ImplError)]
#[non_exhaustive]
pub enum MultipartError {
	#[error("malformed multipart boundary")]
	MalformedBoundary,

	#[error("malformed part header")]
	MalformedPartHeader(#[source] httparse::Error),

	#[error("part is missing a Content-Disposition name")]
	MissingContentDisposition,

	#[error("file upload {name} was incomplete at end of stream")]
	IncompleteAtEof { name: String },

	#[error("malformed application/x-www-form-urlencoded body")]
	MalformedUrlencoded,

	#[error(transparent)]
	Io(#[from] std::io::Error),
}
