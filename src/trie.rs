use crate::{
	node::{Dynamic, NodeId, TrieNode},
	path::{join_components, split_path},
	route::{PathSegment, Template},
	BuildError, RouteError,
};
use regex::Regex;
use std::collections::HashMap;

const ROOT: NodeId = NodeId(0);

/// Result of walking the trie for one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Traversal {
	pub node: NodeId,
	/// Raw captured values, one per parameter on the way down.
	pub raw: Vec<String>,
	/// The request path rebuilt from its components.
	pub path: String,
}

/// The immutable routing structures: the node arena, the exact-match map of
/// parameter-free routes, and the mount prefixes with their alternation regex.
#[derive(Debug)]
pub struct RouteTable<A, H> {
	nodes: Vec<TrieNode<A, H>>,
	plain: HashMap<Box<str>, NodeId>,
	mounts: HashMap<Box<str>, NodeId>,
	mount_regex: Option<Regex>,
}

impl<A, H> Default for RouteTable<A, H> {
	fn default() -> Self {
		Self {
			nodes: vec![TrieNode::default()],
			plain: HashMap::new(),
			mounts: HashMap::new(),
			mount_regex: None,
		}
	}
}

impl<A, H> RouteTable<A, H> {
	pub fn root(&self) -> NodeId {
		ROOT
	}

	pub fn node(&self, id: NodeId) -> &TrieNode<A, H> {
		&self.nodes[id.index()]
	}

	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.len() == 1 && !self.nodes[0].is_endpoint()
	}

	pub fn plain_route(&self, path: &str) -> Option<NodeId> {
		self.plain.get(path).copied()
	}

	pub fn plain_routes(&self) -> impl Iterator<Item = &str> {
		self.plain.keys().map(|path| &**path)
	}

	pub fn mount_route(&self, prefix: &str) -> Option<NodeId> {
		self.mounts.get(prefix).copied()
	}

	pub fn mount_routes(&self) -> impl Iterator<Item = &str> {
		self.mounts.keys().map(|prefix| &**prefix)
	}

	pub fn mount_regex(&self) -> Option<&Regex> {
		self.mount_regex.as_ref()
	}

	/// Find the mount whose prefix starts `path`, returning the prefix, the
	/// remaining suffix and the mount node.
	pub fn match_mount<'p>(&self, path: &'p str) -> Option<(&'p str, &'p str, NodeId)> {
		let regex = self.mount_regex.as_ref()?;
		let prefix = regex.captures(path)?.get(1)?.as_str();
		let node = self.mount_route(prefix)?;
		Some((prefix, &path[prefix.len()..], node))
	}

	/// Walk the trie component by component.
	///
	/// Static children always win over the dynamic child and there is no
	/// backtracking. A catch-all child folds every remaining component into one
	/// captured value and ends the walk.
	pub fn traverse(&self, path: &str) -> Result<Traversal, RouteError> {
		let components: Vec<&str> = split_path(path).collect();
		let mut current = ROOT;
		let mut raw = Vec::new();

		for (i, component) in components.iter().enumerate() {
			let node = self.node(current);
			if let Some(child) = node.static_child(component) {
				current = child;
				continue;
			}

			match node.dynamic() {
				Some(Dynamic::Segment(child)) => {
					raw.push((*component).to_owned());
					current = child;
				}
				Some(Dynamic::Rest(child)) => {
					raw.push(components[i..].join("/"));
					current = child;
					break;
				}
				None => return Err(RouteError::NotFound),
			}
		}

		if !self.node(current).is_endpoint() {
			return Err(RouteError::NotFound);
		}

		Ok(Traversal {
			node: current,
			raw,
			path: join_components(components),
		})
	}

	pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut TrieNode<A, H> {
		&mut self.nodes[id.index()]
	}

	/// Create (or reuse) the nodes spelled by `template`, returning the last one.
	pub(crate) fn insert(&mut self, template: &Template) -> Result<NodeId, BuildError> {
		let mut current = ROOT;
		for segment in template.segments() {
			current = match segment {
				PathSegment::Static(name) => match self.node(current).static_child(name) {
					Some(child) => child,
					None => {
						let child = self.push();
						self.node_mut(current)
							.static_children
							.insert(name.as_str().into(), child);
						child
					}
				},
				PathSegment::Param(_) => match self.node(current).dynamic() {
					Some(Dynamic::Segment(child)) => child,
					Some(Dynamic::Rest(_)) => return Err(conflict(template)),
					None => {
						let child = self.push();
						self.node_mut(current).dynamic = Some(Dynamic::Segment(child));
						child
					}
				},
				PathSegment::CatchAll(_) => match self.node(current).dynamic() {
					Some(Dynamic::Rest(child)) => child,
					Some(Dynamic::Segment(_)) => return Err(conflict(template)),
					None => {
						let child = self.push();
						self.node_mut(current).dynamic = Some(Dynamic::Rest(child));
						child
					}
				},
			};
		}
		Ok(current)
	}

	pub(crate) fn add_plain(&mut self, path: String, node: NodeId) {
		self.plain.insert(path.into_boxed_str(), node);
	}

	pub(crate) fn add_mount(&mut self, prefix: String, node: NodeId) {
		self.mounts.insert(prefix.into_boxed_str(), node);
	}

	/// Compile every mount prefix into a single anchored alternation. Longer
	/// prefixes come first so the most specific mount wins.
	pub(crate) fn compile_mounts(&mut self) -> Result<(), BuildError> {
		if self.mounts.is_empty() {
			self.mount_regex = None;
			return Ok(());
		}

		let mut prefixes: Vec<&str> = self.mount_routes().collect();
		prefixes.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
		let alternation = prefixes
			.iter()
			.map(|prefix| regex::escape(prefix))
			.collect::<Vec<_>>()
			.join("|");

		self.mount_regex = Some(Regex::new(&format!("^({})(?:/|$)", alternation))?);
		Ok(())
	}

	fn push(&mut self) -> NodeId {
		let id = NodeId(self.nodes.len() as u32);
		self.nodes.push(TrieNode::default());
		id
	}
}

fn conflict(template: &Template) -> BuildError {
	BuildError::ConflictingDynamic {
		template: template.as_str().to_owned(),
	}
}
