use hyper::{Method, StatusCode};
use std::fmt::{self, Display, Formatter};

/// Why a request could not be routed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
	/// No plain route, mount or trie path corresponds to the request path, or a
	/// captured parameter failed conversion.
	#[error("no route matches the requested path")]
	NotFound,
	/// The path exists, but nothing is bound for the requested method.
	#[error("method not allowed (allowed: {allowed})")]
	MethodNotAllowed { allowed: AllowedMethods },
}

impl RouteError {
	/// The HTTP status the dispatch layer should answer with.
	pub fn status(&self) -> StatusCode {
		match self {
			Self::NotFound => StatusCode::NOT_FOUND,
			Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
		}
	}
}

/// Errors raised while registering routes.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
	#[error("malformed route template {template:?}: {reason}")]
	MalformedTemplate { template: String, reason: &'static str },

	#[error("converter {name:?} is already registered")]
	DuplicateConverter { name: String },

	#[error("unknown converter {name:?} in route template {template:?}")]
	UnknownConverter { template: String, name: String },

	#[error("catch-all parameter must be the last segment of {template:?}")]
	CatchAllNotLast { template: String },

	#[error("route {template:?} conflicts with an existing dynamic segment of a different kind")]
	ConflictingDynamic { template: String },

	#[error("route {template:?} conflicts with an existing route of a different kind")]
	ConflictingDispatch { template: String },

	#[error("duplicate binding for {key} on {template:?}")]
	Duplicate { template: String, key: String },

	#[error("invalid mount prefix {prefix:?}: {reason}")]
	InvalidMount { prefix: String, reason: &'static str },

	#[error("failed to compile mount prefixes: {0}")]
	MountRegex(#[from] regex::Error),
}

/// A path parameter value could not be converted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("converter {converter:?} rejected {value:?}")]
pub struct ConvertError {
	pub converter: String,
	pub value: String,
}

impl ConvertError {
	pub fn new(converter: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			converter: converter.into(),
			value: value.into(),
		}
	}
}

/// Methods bound on a path, for the `Allow` header of a 405.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowedMethods {
	methods: Vec<Method>,
}

impl AllowedMethods {
	/// Create a normalized allow list.
	///
	/// `HEAD` is implied by `GET`; the list is sorted and de-duplicated so the
	/// header value is stable.
	pub fn new(mut methods: Vec<Method>) -> Self {
		if methods.contains(&Method::GET) && !methods.contains(&Method::HEAD) {
			methods.push(Method::HEAD);
		}
		methods.sort_by(|a, b| {
			method_order(a)
				.cmp(&method_order(b))
				.then_with(|| a.as_str().cmp(b.as_str()))
		});
		methods.dedup();
		Self { methods }
	}

	pub fn methods(&self) -> &[Method] {
		&self.methods
	}

	pub fn contains(&self, method: &Method) -> bool {
		self.methods.contains(method)
	}

	pub fn is_empty(&self) -> bool {
		self.methods.is_empty()
	}

	/// Format as an HTTP `Allow` header value.
	pub fn header_value(&self) -> String {
		self.methods
			.iter()
			.map(Method::as_str)
			.collect::<Vec<_>>()
			.join(", ")
	}
}

impl Display for AllowedMethods {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(&self.header_value())
	}
}

fn method_order(method: &Method) -> u8 {
	match *method {
		Method::GET => 0,
		Method::HEAD => 1,
		Method::POST => 2,
		Method::PUT => 3,
		Method::DELETE => 4,
		Method::PATCH => 5,
		Method::OPTIONS => 6,
		Method::TRACE => 7,
		Method::CONNECT => 8,
		_ => u8::MAX,
	}
}
