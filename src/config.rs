use std::num::NonZeroUsize;

/// Default number of parsed parameter sets kept by the resolver.
pub const DEFAULT_PARAM_CACHE_CAPACITY: usize = 1024;

/// Tunables for a [`Router`](crate::Router).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterConfig {
	/// Maximum entries in the parameter cache. Zero is treated as one.
	pub param_cache_capacity: usize,
}

impl RouterConfig {
	pub fn new() -> Self {
		Self {
			param_cache_capacity: DEFAULT_PARAM_CACHE_CAPACITY,
		}
	}

	#[must_use = "This method returns a new RouterConfig and does not modify self"]
	pub fn with_param_cache_capacity(mut self, capacity: usize) -> Self {
		self.param_cache_capacity = capacity;
		self
	}

	pub(crate) fn cache_capacity(&self) -> NonZeroUsize {
		NonZeroUsize::new(self.param_cache_capacity).unwrap_or(NonZeroUsize::MIN)
	}
}

impl Default for RouterConfig {
	fn default() -> Self {
		Self::new()
	}
}
