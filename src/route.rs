use crate::{error::ConvertError, params::ParamValue, path::split_path, BuildError};
use std::{
	collections::HashMap,
	fmt::{self, Debug, Formatter},
	hash::{Hash, Hasher},
	sync::Arc,
};
use uuid::Uuid;

type ConvertFn = dyn Fn(&str) -> Result<ParamValue, ConvertError> + Send + Sync;

/// A named conversion from a raw path segment to a typed value.
///
/// Converters compare and hash by name, which is why [`Converters`] refuses to
/// bind a name twice.
#[derive(Clone)]
pub struct Converter {
	name: Arc<str>,
	convert: Arc<ConvertFn>,
	catch_all: bool,
}

impl Converter {
	pub fn new<F>(name: impl Into<Arc<str>>, convert: F) -> Self
	where
		F: Fn(&str) -> Result<ParamValue, ConvertError> + Send + Sync + 'static,
	{
		Self {
			name: name.into(),
			convert: Arc::new(convert),
			catch_all: false,
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn convert(&self, raw: &str) -> Result<ParamValue, ConvertError> {
		(self.convert)(raw)
	}

	/// Whether a parameter using this converter swallows the rest of the path.
	pub fn is_catch_all(&self) -> bool {
		self.catch_all
	}

	pub fn int() -> Self {
		Self::new("int", |raw| {
			if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
				return Err(ConvertError::new("int", raw));
			}
			raw.parse()
				.map(ParamValue::Int)
				.map_err(|_| ConvertError::new("int", raw))
		})
	}

	pub fn float() -> Self {
		Self::new("float", |raw| match raw.parse::<f64>() {
			Ok(value) if value.is_finite() => Ok(ParamValue::Float(value)),
			_ => Err(ConvertError::new("float", raw)),
		})
	}

	pub fn uuid() -> Self {
		Self::new("uuid", |raw| {
			Uuid::parse_str(raw)
				.map(ParamValue::Uuid)
				.map_err(|_| ConvertError::new("uuid", raw))
		})
	}

	pub fn path() -> Self {
		Self {
			catch_all: true,
			..Self::new("path", |raw| Ok(ParamValue::Str(raw.to_owned())))
		}
	}
}

impl PartialEq for Converter {
	fn eq(&self, other: &Self) -> bool {
		self.name == other.name && self.catch_all == other.catch_all
	}
}

impl Eq for Converter {}

impl Hash for Converter {
	fn hash<S: Hasher>(&self, state: &mut S) {
		self.name.hash(state);
		self.catch_all.hash(state);
	}
}

impl Debug for Converter {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "Converter({})", self.name)
	}
}

/// Converters available to route templates, by name.
///
/// A name is bound once. Parameter definitions are compared by converter name,
/// so a redefined name would let two different conversions share cached results.
#[derive(Debug, Clone)]
pub struct Converters(HashMap<String, Converter>);

impl Default for Converters {
	fn default() -> Self {
		let builtins = [
			Converter::int(),
			Converter::float(),
			Converter::uuid(),
			Converter::path(),
		];
		Self(
			builtins
				.into_iter()
				.map(|converter| (converter.name().to_owned(), converter))
				.collect(),
		)
	}
}

impl Converters {
	/// Register `converter`, refusing names that are already taken (including
	/// the built-ins and `str`).
	pub fn insert(&mut self, converter: Converter) -> Result<(), BuildError> {
		let name = converter.name();
		if name == "str" || self.0.contains_key(name) {
			return Err(BuildError::DuplicateConverter {
				name: name.to_owned(),
			});
		}
		self.0.insert(name.to_owned(), converter);
		Ok(())
	}

	/// `str` means "no conversion" and resolves to `None`.
	fn lookup(&self, name: &str) -> Option<Option<Converter>> {
		if name == "str" {
			return Some(None);
		}
		self.0.get(name).cloned().map(Some)
	}
}

/// One declared path parameter: its bind name and optional converter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathParam {
	pub name: Arc<str>,
	pub converter: Option<Converter>,
}

impl PathParam {
	pub fn new(name: impl Into<Arc<str>>, converter: Option<Converter>) -> Self {
		Self {
			name: name.into(),
			converter,
		}
	}
}

/// Ordered parameter definitions of a route, root first.
pub type ParamDefs = Arc<[PathParam]>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
	Static(String),
	Param(PathParam),
	CatchAll(PathParam),
}

/// A parsed route template such as `/users/{id:int}/files/{rest:path}`.
#[derive(Debug, Clone)]
pub struct Template {
	raw: String,
	segments: Vec<PathSegment>,
}

impl Template {
	pub fn parse(raw: &str, converters: &Converters) -> Result<Self, BuildError> {
		let malformed = |reason| BuildError::MalformedTemplate {
			template: raw.to_owned(),
			reason,
		};

		if !raw.starts_with('/') {
			return Err(malformed("must start with '/'"));
		}

		let mut segments: Vec<PathSegment> = Vec::new();
		for component in split_path(raw) {
			if let Some(PathSegment::CatchAll(_)) = segments.last() {
				return Err(BuildError::CatchAllNotLast {
					template: raw.to_owned(),
				});
			}

			let inner = match component.strip_prefix('{').and_then(|c| c.strip_suffix('}')) {
				Some(inner) => inner,
				None if component.contains(['{', '}']) => {
					return Err(malformed("parameters must span a whole segment"))
				}
				None => {
					segments.push(PathSegment::Static(component.to_owned()));
					continue;
				}
			};

			let (name, converter_name) = match inner.split_once(':') {
				Some((name, converter)) => (name, Some(converter)),
				None => (inner, None),
			};
			if !is_identifier(name) {
				return Err(malformed("parameter names must be identifiers"));
			}
			let duplicate = segments.iter().any(|segment| match segment {
				PathSegment::Param(p) | PathSegment::CatchAll(p) => &*p.name == name,
				PathSegment::Static(_) => false,
			});
			if duplicate {
				return Err(malformed("parameter names must be unique"));
			}

			let converter = match converter_name {
				None => None,
				Some(converter_name) => converters.lookup(converter_name).ok_or_else(|| {
					BuildError::UnknownConverter {
						template: raw.to_owned(),
						name: converter_name.to_owned(),
					}
				})?,
			};

			let catch_all = converter.as_ref().map_or(false, Converter::is_catch_all);
			let param = PathParam::new(name, converter);
			segments.push(if catch_all {
				PathSegment::CatchAll(param)
			} else {
				PathSegment::Param(param)
			});
		}

		Ok(Self {
			raw: raw.to_owned(),
			segments,
		})
	}

	pub fn as_str(&self) -> &str {
		&self.raw
	}

	pub fn segments(&self) -> &[PathSegment] {
		&self.segments
	}

	/// A template without parameters can be matched by exact lookup.
	pub fn is_plain(&self) -> bool {
		self.segments
			.iter()
			.all(|segment| matches!(segment, PathSegment::Static(_)))
	}

	pub fn params(&self) -> ParamDefs {
		self.segments
			.iter()
			.filter_map(|segment| match segment {
				PathSegment::Param(param) | PathSegment::CatchAll(param) => Some(param.clone()),
				PathSegment::Static(_) => None,
			})
			.collect()
	}
}

fn is_identifier(name: &str) -> bool {
	let mut chars = name.chars();
	match chars.next() {
		Some(first) if first == '_' || first.is_ascii_alphabetic() => {
			chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
		}
		_ => false,
	}
}
