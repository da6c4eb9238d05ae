use crate::{route::ParamDefs, RouteError};
use lru::LruCache;
use parking_lot::Mutex;
use std::{
	fmt::{self, Debug, Formatter},
	num::NonZeroUsize,
	sync::Arc,
};
use uuid::Uuid;

/// A converted path parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
	Str(String),
	Int(i64),
	Float(f64),
	Uuid(Uuid),
}

impl ParamValue {
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::Str(value) => Some(value),
			_ => None,
		}
	}

	pub fn as_int(&self) -> Option<i64> {
		match self {
			Self::Int(value) => Some(*value),
			_ => None,
		}
	}
}

impl From<&str> for ParamValue {
	fn from(value: &str) -> Self {
		Self::Str(value.to_owned())
	}
}

impl From<i64> for ParamValue {
	fn from(value: i64) -> Self {
		Self::Int(value)
	}
}

/// Parameters extracted from a matched path, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
	entries: Vec<(Arc<str>, ParamValue)>,
}

impl Params {
	pub fn get(&self, name: &str) -> Option<&ParamValue> {
		self.entries
			.iter()
			.find(|(n, _)| &**n == name)
			.map(|(_, value)| value)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
		self.entries.iter().map(|(name, value)| (&**name, value))
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

impl<N: Into<Arc<str>>, V: Into<ParamValue>> FromIterator<(N, V)> for Params {
	fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
		Self {
			entries: iter
				.into_iter()
				.map(|(name, value)| (name.into(), value.into()))
				.collect(),
		}
	}
}

type CacheKey = (ParamDefs, Vec<String>);

/// Converts captured raw values into [`Params`], memoizing by the exact
/// definitions and raw values.
///
/// Cached results are pure functions of their keys, so two threads missing on
/// the same key both convert and the second insert overwrites the first with an
/// equal value.
pub struct ParamParser {
	cache: Mutex<LruCache<CacheKey, Params>>,
}

impl Debug for ParamParser {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let cache = self.cache.lock();
		f.debug_struct("ParamParser")
			.field("cached", &cache.len())
			.field("capacity", &cache.cap().get())
			.finish()
	}
}

impl ParamParser {
	pub fn new(capacity: NonZeroUsize) -> Self {
		Self {
			cache: Mutex::new(LruCache::new(capacity)),
		}
	}

	/// Zip `defs` with `raw` and convert each value.
	///
	/// A count mismatch or a failed conversion means the route does not match
	/// this concrete path, and yields [`RouteError::NotFound`].
	pub fn parse(&self, defs: &ParamDefs, raw: Vec<String>) -> Result<Params, RouteError> {
		if defs.len() != raw.len() {
			tracing::debug!(
				expected = defs.len(),
				captured = raw.len(),
				"parameter count mismatch"
			);
			return Err(RouteError::NotFound);
		}
		if defs.is_empty() {
			return Ok(Params::default());
		}

		let key = (Arc::clone(defs), raw);
		if let Some(hit) = self.cache.lock().get(&key) {
			tracing::trace!("parameter cache hit");
			return Ok(hit.clone());
		}

		let params = convert(defs, &key.1)?;
		self.cache.lock().put(key, params.clone());
		Ok(params)
	}

	pub fn cached(&self) -> usize {
		self.cache.lock().len()
	}

	pub fn capacity(&self) -> usize {
		self.cache.lock().cap().get()
	}
}

fn convert(defs: &ParamDefs, raw: &[String]) -> Result<Params, RouteError> {
	let mut entries = Vec::with_capacity(defs.len());
	for (def, value) in defs.iter().zip(raw) {
		let converted = match &def.converter {
			Some(converter) => converter.convert(value).map_err(|e| {
				tracing::debug!(param = %def.name, error = %e, "path parameter rejected");
				RouteError::NotFound
			})?,
			None => ParamValue::Str(value.clone()),
		};
		entries.push((Arc::clone(&def.name), converted));
	}
	Ok(Params { entries })
}
