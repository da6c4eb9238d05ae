/// Split a request path into its non-empty components.
///
/// Leading, trailing and repeated slashes produce no components, so `//a///b/`
/// yields `["a", "b"]` and `/` yields nothing.
pub fn split_path(path: &str) -> impl Iterator<Item = &str> + Clone {
	path.split('/').filter(|segment| !segment.is_empty())
}

/// Rebuild a canonical path from the components of `path`.
pub fn normalize(path: &str) -> String {
	join_components(split_path(path))
}

pub(crate) fn join_components<'a>(components: impl IntoIterator<Item = &'a str>) -> String {
	let mut out = String::new();
	for component in components {
		out.push('/');
		out.push_str(component);
	}

	if out.is_empty() {
		out.push('/');
	}
	out
}
