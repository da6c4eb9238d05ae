use crate::{error::AllowedMethods, route::ParamDefs, RouteError};
use hyper::Method;
use std::{
	collections::HashMap,
	fmt::{self, Display, Formatter},
};

/// Index of a node in a [`RouteTable`](crate::RouteTable) arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
	pub(crate) fn index(self) -> usize {
		self.0 as usize
	}
}

/// The dynamic edge out of a node, taken when no static child matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dynamic {
	/// Captures exactly one path component.
	Segment(NodeId),
	/// Captures every remaining component as a single value and ends the walk.
	Rest(NodeId),
}

impl Dynamic {
	pub fn node(self) -> NodeId {
		match self {
			Self::Segment(id) | Self::Rest(id) => id,
		}
	}
}

/// How a node chooses between its bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
	/// Bindings are keyed by HTTP method, plus [`HandlerKey::Websocket`].
	Methods,
	/// A single protocol-level binding serves every method.
	Protocol,
	/// A mounted sub-application; `files` mounts serve a fixed directory and
	/// keep the remaining path as-is.
	Mount { files: bool },
}

/// Key under which a handler is bound on a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HandlerKey {
	Method(Method),
	Protocol,
	Websocket,
}

impl Display for HandlerKey {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Self::Method(method) => f.write_str(method.as_str()),
			Self::Protocol => f.write_str("protocol"),
			Self::Websocket => f.write_str("websocket"),
		}
	}
}

/// The application and route handler a binding dispatches to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint<A, H> {
	pub app: A,
	pub handler: H,
}

#[derive(Debug)]
pub struct TrieNode<A, H> {
	pub(crate) static_children: HashMap<Box<str>, NodeId>,
	pub(crate) dynamic: Option<Dynamic>,
	pub(crate) dispatch: Dispatch,
	pub(crate) handlers: HashMap<HandlerKey, Endpoint<A, H>>,
	pub(crate) params: HashMap<HandlerKey, ParamDefs>,
}

impl<A, H> Default for TrieNode<A, H> {
	fn default() -> Self {
		Self {
			static_children: HashMap::new(),
			dynamic: None,
			dispatch: Dispatch::Methods,
			handlers: HashMap::new(),
			params: HashMap::new(),
		}
	}
}

impl<A, H> TrieNode<A, H> {
	pub fn static_child(&self, component: &str) -> Option<NodeId> {
		self.static_children.get(component).copied()
	}

	pub fn dynamic(&self) -> Option<Dynamic> {
		self.dynamic
	}

	pub fn dispatch(&self) -> Dispatch {
		self.dispatch
	}

	/// Whether anything at all is bound on this node.
	pub fn is_endpoint(&self) -> bool {
		!self.handlers.is_empty()
	}

	/// Parameter definitions collected on the way to this node for `key`.
	pub fn params(&self, key: &HandlerKey) -> Option<&ParamDefs> {
		self.params.get(key)
	}

	/// Methods bound on this node.
	pub fn allowed_methods(&self) -> AllowedMethods {
		AllowedMethods::new(
			self.handlers
				.keys()
				.filter_map(|key| match key {
					HandlerKey::Method(method) => Some(method.clone()),
					HandlerKey::Protocol | HandlerKey::Websocket => None,
				})
				.collect(),
		)
	}

	/// Select the binding for `method`, or for the websocket marker when no
	/// method is given. Protocol-level nodes ignore the method entirely.
	///
	/// `HEAD` falls back to the `GET` binding when it has none of its own, which
	/// is what [`AllowedMethods`] advertises.
	pub fn select(&self, method: Option<&Method>) -> Result<(HandlerKey, &Endpoint<A, H>), RouteError> {
		let key = match (self.dispatch, method) {
			(Dispatch::Protocol, _) | (Dispatch::Mount { .. }, _) => HandlerKey::Protocol,
			(Dispatch::Methods, Some(method)) if *method == Method::HEAD => {
				let head = HandlerKey::Method(Method::HEAD);
				if self.handlers.contains_key(&head) {
					head
				} else {
					HandlerKey::Method(Method::GET)
				}
			}
			(Dispatch::Methods, Some(method)) => HandlerKey::Method(method.clone()),
			(Dispatch::Methods, None) => HandlerKey::Websocket,
		};

		match self.handlers.get(&key) {
			Some(endpoint) => Ok((key, endpoint)),
			None => Err(RouteError::MethodNotAllowed {
				allowed: self.allowed_methods(),
			}),
		}
	}
}
