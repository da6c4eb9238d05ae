use crate::{
	config::RouterConfig,
	node::{Dispatch, Endpoint, HandlerKey, NodeId, TrieNode},
	params::{ParamParser, Params},
	path::{normalize, split_path},
	route::{Converter, Converters, Template},
	trie::RouteTable,
	BuildError, RouteError,
};
use hyper::Method;
use std::{
	fmt::{self, Debug, Formatter},
	mem,
	sync::Arc,
};

/// What a mount serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountKind {
	/// A sub-application; the path it receives always ends in `/`.
	App,
	/// Files from a fixed directory; the remaining path is passed through.
	Files,
}

/// Which resolution strategy produced a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteKind {
	Plain,
	Mount { prefix: String },
	Trie,
}

/// A successful resolution.
#[derive(Debug)]
pub struct Resolved<'r, A, H> {
	pub app: &'r A,
	pub handler: &'r H,
	/// The path to dispatch with: the request path for plain routes, the
	/// remainder after the prefix for mounts, the normalized path otherwise.
	pub path: String,
	pub params: Params,
	pub kind: RouteKind,
}

impl<'r, A, H> Resolved<'r, A, H> {
	fn new(endpoint: &'r Endpoint<A, H>, path: String, params: Params, kind: RouteKind) -> Self {
		Self {
			app: &endpoint.app,
			handler: &endpoint.handler,
			path,
			params,
			kind,
		}
	}
}

/// Collects routes and builds an immutable [`Router`].
///
/// Registration errors are held until [`build`](Self::build) so calls can be
/// chained; the first error wins.
#[derive(Debug)]
pub struct RouterBuilder<A, H> {
	table: RouteTable<A, H>,
	converters: Converters,
	config: RouterConfig,
	error: Option<BuildError>,
}

impl<A, H> Default for RouterBuilder<A, H> {
	fn default() -> Self {
		Self {
			table: RouteTable::default(),
			converters: Converters::default(),
			config: RouterConfig::default(),
			error: None,
		}
	}
}

impl<A: Clone, H: Clone> RouterBuilder<A, H> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Make a custom converter available to templates registered afterwards.
	///
	/// Each name can be registered once; a second registration fails the build.
	pub fn converter(&mut self, converter: Converter) -> &mut Self {
		if self.error.is_some() {
			return self;
		}
		if let Err(e) = self.converters.insert(converter) {
			self.error = Some(e);
		}
		self
	}

	pub fn config(&mut self, config: RouterConfig) -> &mut Self {
		self.config = config;
		self
	}

	/// Bind `handler` for each of `methods` on `template`.
	pub fn route<M>(&mut self, methods: M, template: &str, app: A, handler: H) -> &mut Self
	where
		M: IntoIterator<Item = Method>,
	{
		let endpoint = Endpoint { app, handler };
		let bindings = methods
			.into_iter()
			.map(|method| (HandlerKey::Method(method), endpoint.clone()))
			.collect();
		self.bind(template, Dispatch::Methods, bindings);
		self
	}

	/// Bind `handler` for websocket connections on `template`.
	pub fn websocket(&mut self, template: &str, app: A, handler: H) -> &mut Self {
		self.bind(
			template,
			Dispatch::Methods,
			vec![(HandlerKey::Websocket, Endpoint { app, handler })],
		);
		self
	}

	/// Bind a protocol-level `handler` that serves `template` for every method.
	pub fn protocol(&mut self, template: &str, app: A, handler: H) -> &mut Self {
		self.bind(
			template,
			Dispatch::Protocol,
			vec![(HandlerKey::Protocol, Endpoint { app, handler })],
		);
		self
	}

	/// Mount a sub-application or file server under a static `prefix`.
	pub fn mount(&mut self, prefix: &str, kind: MountKind, app: A, handler: H) -> &mut Self {
		if self.error.is_some() {
			return self;
		}
		if let Err(e) = self.try_mount(prefix, kind, Endpoint { app, handler }) {
			self.error = Some(e);
		}
		self
	}

	pub fn build(&mut self) -> Result<Router<A, H>, BuildError> {
		if let Some(e) = self.error.take() {
			return Err(e);
		}

		let mut table = mem::take(&mut self.table);
		table.compile_mounts()?;
		tracing::debug!(
			nodes = table.len(),
			plain = table.plain_routes().count(),
			mounts = table.mount_routes().count(),
			"built route table"
		);

		Ok(Router {
			table: Arc::new(table),
			params: Arc::new(ParamParser::new(self.config.cache_capacity())),
		})
	}

	fn bind(&mut self, template: &str, dispatch: Dispatch, bindings: Vec<(HandlerKey, Endpoint<A, H>)>) {
		if self.error.is_some() {
			return;
		}
		if let Err(e) = self.try_bind(template, dispatch, bindings) {
			self.error = Some(e);
		}
	}

	fn try_bind(
		&mut self,
		raw: &str,
		dispatch: Dispatch,
		bindings: Vec<(HandlerKey, Endpoint<A, H>)>,
	) -> Result<(NodeId, Template), BuildError> {
		let template = Template::parse(raw, &self.converters)?;
		let id = self.table.insert(&template)?;
		let params = template.params();
		let node = self.table.node_mut(id);

		if node.is_endpoint() && node.dispatch != dispatch {
			return Err(BuildError::ConflictingDispatch {
				template: raw.to_owned(),
			});
		}
		if let Some((key, _)) = bindings.iter().find(|(key, _)| node.handlers.contains_key(key)) {
			return Err(BuildError::Duplicate {
				template: raw.to_owned(),
				key: key.to_string(),
			});
		}

		node.dispatch = dispatch;
		for (key, endpoint) in bindings {
			node.params.insert(key.clone(), Arc::clone(&params));
			node.handlers.insert(key, endpoint);
		}

		if template.is_plain() && !matches!(dispatch, Dispatch::Mount { .. }) {
			self.table.add_plain(normalize(raw), id);
		}
		Ok((id, template))
	}

	fn try_mount(&mut self, prefix: &str, kind: MountKind, endpoint: Endpoint<A, H>) -> Result<(), BuildError> {
		let invalid = |reason| BuildError::InvalidMount {
			prefix: prefix.to_owned(),
			reason,
		};

		let prefix_path = normalize(prefix);
		if prefix_path == "/" {
			return Err(invalid("cannot mount at the root"));
		}

		let dispatch = Dispatch::Mount {
			files: kind == MountKind::Files,
		};
		let (id, template) = self.try_bind(prefix, dispatch, vec![(HandlerKey::Protocol, endpoint)])?;
		if !template.is_plain() {
			return Err(invalid("mount prefixes must be static"));
		}

		self.table.add_mount(prefix_path, id);
		Ok(())
	}
}

/// Resolves requests against an immutable route table.
///
/// Cloning is cheap: the table and the parameter cache are shared.
pub struct Router<A, H> {
	table: Arc<RouteTable<A, H>>,
	params: Arc<ParamParser>,
}

impl<A: Debug, H: Debug> Debug for Router<A, H> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Router")
			.field("table", &self.table)
			.field("params", &self.params)
			.finish()
	}
}

impl<A, H> Clone for Router<A, H> {
	fn clone(&self) -> Self {
		Self {
			table: Arc::clone(&self.table),
			params: Arc::clone(&self.params),
		}
	}
}

impl<A: Clone, H: Clone> Router<A, H> {
	pub fn builder() -> RouterBuilder<A, H> {
		RouterBuilder::new()
	}
}

impl<A, H> Router<A, H> {
	pub fn table(&self) -> &RouteTable<A, H> {
		&self.table
	}

	pub fn param_parser(&self) -> &ParamParser {
		&self.params
	}

	/// Resolve `path` for `method`, or for a websocket connection when `method`
	/// is `None`.
	///
	/// Plain routes are tried first, then mounts, then the trie. The first
	/// strategy that matches decides the outcome.
	pub fn resolve(&self, method: Option<&Method>, path: &str) -> Result<Resolved<'_, A, H>, RouteError> {
		let table = &*self.table;

		if let Some(id) = table.plain_route(path) {
			tracing::trace!(path, "resolved plain route");
			let (_, endpoint) = table.node(id).select(method)?;
			return Ok(Resolved::new(
				endpoint,
				path.to_owned(),
				Params::default(),
				RouteKind::Plain,
			));
		}

		if let Some((prefix, remaining, id)) = table.match_mount(path) {
			let node = table.node(id);
			if shadowed(node, remaining) {
				tracing::trace!(path, prefix, "mount shadowed by a nested route");
			} else {
				tracing::trace!(path, prefix, "resolved mount");
				let (_, endpoint) = node.select(method)?;
				let mut remaining = if remaining.is_empty() {
					"/".to_owned()
				} else {
					remaining.to_owned()
				};
				if node.dispatch() == (Dispatch::Mount { files: false }) && !remaining.ends_with('/') {
					remaining.push('/');
				}
				return Ok(Resolved::new(
					endpoint,
					remaining,
					Params::default(),
					RouteKind::Mount {
						prefix: prefix.to_owned(),
					},
				));
			}
		}

		let traversal = table.traverse(path)?;
		tracing::trace!(path, captured = traversal.raw.len(), "resolved trie route");
		let node = table.node(traversal.node);
		let (key, endpoint) = node.select(method)?;
		let params = match node.params(&key) {
			Some(defs) => self.params.parse(defs, traversal.raw)?,
			None if traversal.raw.is_empty() => Params::default(),
			None => return Err(RouteError::NotFound),
		};

		Ok(Resolved::new(endpoint, traversal.path, params, RouteKind::Trie))
	}

	pub fn resolve_websocket(&self, path: &str) -> Result<Resolved<'_, A, H>, RouteError> {
		self.resolve(None, path)
	}
}

/// A route declared directly inside the mount's namespace takes precedence
/// over the mount itself. Static children only exist for registered routes.
fn shadowed<A, H>(mount: &TrieNode<A, H>, remaining: &str) -> bool {
	split_path(remaining)
		.next()
		.map_or(false, |first| mount.static_child(first).is_some())
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::params::ParamValue;

	type TestRouter = Router<&'static str, &'static str>;
	type TestBuilder = RouterBuilder<&'static str, &'static str>;

	fn get(router: &TestRouter, path: &str) -> Result<(&'static str, String, Params), RouteError> {
		router
			.resolve(Some(&Method::GET), path)
			.map(|resolved| (*resolved.handler, resolved.path, resolved.params))
	}

	fn params(pairs: &[(&str, ParamValue)]) -> Params {
		pairs.iter().cloned().collect()
	}

	#[test]
	fn plain_route() {
		let router = TestBuilder::new()
			.route([Method::GET], "/health", "app", "H1")
			.build()
			.unwrap();
		let resolved = router.resolve(Some(&Method::GET), "/health").unwrap();
		assert_eq!(*resolved.handler, "H1");
		assert_eq!(*resolved.app, "app");
		assert_eq!(resolved.kind, RouteKind::Plain);
		assert!(resolved.params.is_empty());
		assert_eq!(resolved.path, "/health");
	}

	#[test]
	fn plain_route_with_trailing_slash_walks_the_trie() {
		let router = TestBuilder::new()
			.route([Method::GET], "/health", "app", "H1")
			.build()
			.unwrap();
		let resolved = router.resolve(Some(&Method::GET), "/health/").unwrap();
		assert_eq!(resolved.kind, RouteKind::Trie);
		assert_eq!(resolved.path, "/health");
	}

	#[test]
	fn dynamic_route_keeps_raw_strings() {
		let router = TestBuilder::new()
			.route([Method::GET], "/users/{user_id}", "app", "H2")
			.build()
			.unwrap();
		assert_eq!(
			get(&router, "/users/77"),
			Ok(("H2", "/users/77".into(), params(&[("user_id", ParamValue::from("77"))])))
		);
	}

	#[test]
	fn catch_all_route() {
		let router = TestBuilder::new()
			.route([Method::GET], "/files/{path:path}", "app", "H3")
			.build()
			.unwrap();
		let (handler, _, found) = get(&router, "/files/a/b/c.txt").unwrap();
		assert_eq!(handler, "H3");
		assert_eq!(found, params(&[("path", ParamValue::from("a/b/c.txt"))]));
	}

	#[test]
	fn converters_apply_or_miss() {
		let router = TestBuilder::new()
			.route([Method::GET], "/items/{id:int}", "app", "item")
			.build()
			.unwrap();
		let (_, _, found) = get(&router, "/items/42").unwrap();
		assert_eq!(found.get("id"), Some(&ParamValue::Int(42)));
		assert_eq!(get(&router, "/items/abc"), Err(RouteError::NotFound));
	}

	#[test]
	fn method_mismatch_versus_missing_path() {
		let router = TestBuilder::new()
			.route([Method::GET, Method::POST], "/items/{id}", "app", "item")
			.route([Method::POST], "/orders/{id}", "app", "order")
			.build()
			.unwrap();

		match router.resolve(Some(&Method::PATCH), "/items/1") {
			Err(RouteError::MethodNotAllowed { allowed }) => {
				assert_eq!(allowed.header_value(), "GET, HEAD, POST")
			}
			other => panic!("unexpected resolution: {:?}", other.map(|r| r.path)),
		}
		assert!(matches!(
			get(&router, "/orders/5"),
			Err(RouteError::MethodNotAllowed { .. })
		));
		assert_eq!(get(&router, "/nope/at/all"), Err(RouteError::NotFound));
		assert_eq!(get(&router, "/unknown"), Err(RouteError::NotFound));
	}

	#[test]
	fn head_is_served_by_get() {
		let router = TestBuilder::new()
			.route([Method::GET], "/items/{id}", "app", "item")
			.route([Method::POST], "/orders/{id}", "app", "order")
			.build()
			.unwrap();

		let head = router.resolve(Some(&Method::HEAD), "/items/1").unwrap();
		assert_eq!(*head.handler, "item");
		assert_eq!(head.params, params(&[("id", ParamValue::from("1"))]));

		match router.resolve(Some(&Method::HEAD), "/orders/1") {
			Err(RouteError::MethodNotAllowed { allowed }) => {
				assert!(!allowed.contains(&Method::HEAD));
				assert_eq!(allowed.header_value(), "POST");
			}
			other => panic!("unexpected resolution: {:?}", other.map(|r| r.path)),
		}
	}

	#[test]
	fn plain_routes_take_priority_over_dynamic() {
		let router = TestBuilder::new()
			.route([Method::GET], "/users/{id}", "app", "dynamic")
			.route([Method::GET], "/users/me", "app", "me")
			.build()
			.unwrap();
		let resolved = router.resolve(Some(&Method::GET), "/users/me").unwrap();
		assert_eq!(*resolved.handler, "me");
		assert_eq!(resolved.kind, RouteKind::Plain);
	}

	#[test]
	fn static_mount_receives_remaining_path() {
		let router = TestBuilder::new()
			.mount("/assets", MountKind::Files, "files", "static")
			.build()
			.unwrap();
		let resolved = router.resolve(Some(&Method::GET), "/assets/app.js").unwrap();
		assert_eq!(*resolved.handler, "static");
		assert_eq!(resolved.path, "/app.js");
		assert_eq!(
			resolved.kind,
			RouteKind::Mount {
				prefix: "/assets".into()
			}
		);
		assert_eq!(get(&router, "/assets").unwrap().1, "/");
		assert_eq!(get(&router, "/assetsx"), Err(RouteError::NotFound));
	}

	#[test]
	fn app_mount_paths_end_in_slash() {
		let router = TestBuilder::new()
			.mount("/api", MountKind::App, "api", "sub")
			.build()
			.unwrap();
		assert_eq!(get(&router, "/api/users").unwrap().1, "/users/");
		assert_eq!(get(&router, "/api/users/").unwrap().1, "/users/");
		// Mounts are protocol-level: no method, no problem.
		assert_eq!(router.resolve(None, "/api").unwrap().path, "/");
	}

	#[test]
	fn nested_routes_shadow_mounts() {
		let router = TestBuilder::new()
			.mount("/static", MountKind::Files, "files", "static")
			.route([Method::GET], "/static/special", "app", "special")
			.route([Method::GET], "/static/docs/{page}", "app", "docs")
			.build()
			.unwrap();

		assert_eq!(get(&router, "/static/special").unwrap().0, "special");
		let (handler, _, found) = get(&router, "/static/docs/intro").unwrap();
		assert_eq!(handler, "docs");
		assert_eq!(found, params(&[("page", ParamValue::from("intro"))]));
		assert_eq!(get(&router, "/static/docs").unwrap_err(), RouteError::NotFound);
		assert_eq!(
			get(&router, "/static/logo.png").unwrap(),
			("static", "/logo.png".to_owned(), Params::default())
		);
	}

	#[test]
	fn websocket_and_protocol_routes() {
		let router = TestBuilder::new()
			.route([Method::GET], "/chat/{room}", "app", "page")
			.websocket("/chat/{room}", "app", "socket")
			.protocol("/raw", "app", "raw")
			.build()
			.unwrap();

		let socket = router.resolve_websocket("/chat/rust").unwrap();
		assert_eq!(*socket.handler, "socket");
		assert_eq!(socket.params, params(&[("room", ParamValue::from("rust"))]));
		assert_eq!(get(&router, "/chat/rust").unwrap().0, "page");
		assert_eq!(get(&router, "/raw").unwrap().0, "raw");
		assert_eq!(router.resolve(Some(&Method::DELETE), "/raw").unwrap().path, "/raw");
	}

	#[test]
	fn parameter_names_follow_the_selected_binding() {
		let router = TestBuilder::new()
			.route([Method::GET], "/posts/{slug}", "app", "read")
			.route([Method::PUT], "/posts/{id:int}", "app", "write")
			.build()
			.unwrap();

		let read = router.resolve(Some(&Method::GET), "/posts/7").unwrap();
		assert_eq!(read.params, params(&[("slug", ParamValue::from("7"))]));
		let write = router.resolve(Some(&Method::PUT), "/posts/7").unwrap();
		assert_eq!(write.params, params(&[("id", ParamValue::Int(7))]));
		assert!(router.resolve(Some(&Method::PUT), "/posts/seven").is_err());
	}

	#[test]
	fn custom_converters() {
		let router = TestBuilder::new()
			.converter(Converter::new("upper", |raw| {
				Ok(ParamValue::Str(raw.to_uppercase()))
			}))
			.route([Method::GET], "/tags/{tag:upper}", "app", "tag")
			.build()
			.unwrap();
		let (_, _, found) = get(&router, "/tags/rust").unwrap();
		assert_eq!(found, params(&[("tag", ParamValue::from("RUST"))]));
	}

	#[test]
	fn redefined_converters_fail_the_build() {
		let result = TestBuilder::new()
			.converter(Converter::new("tag", |raw| Ok(ParamValue::Str(raw.to_uppercase()))))
			.route([Method::GET], "/a/{t:tag}", "app", "a")
			.converter(Converter::new("tag", |raw| Ok(ParamValue::Str(raw.to_lowercase()))))
			.route([Method::GET], "/b/{t:tag}", "app", "b")
			.build();
		assert!(matches!(result, Err(BuildError::DuplicateConverter { .. })));
	}

	#[test]
	fn distinct_converters_do_not_share_cached_values() {
		let router = TestBuilder::new()
			.converter(Converter::new("upper", |raw| Ok(ParamValue::Str(raw.to_uppercase()))))
			.converter(Converter::new("lower", |raw| Ok(ParamValue::Str(raw.to_lowercase()))))
			.route([Method::GET], "/a/{t:upper}", "app", "a")
			.route([Method::GET], "/b/{t:lower}", "app", "b")
			.build()
			.unwrap();
		assert_eq!(get(&router, "/a/MiX").unwrap().2, params(&[("t", ParamValue::from("MIX"))]));
		assert_eq!(get(&router, "/b/MiX").unwrap().2, params(&[("t", ParamValue::from("mix"))]));
	}

	#[test]
	fn router_debug_shows_table_and_cache() {
		let router = TestBuilder::new()
			.route([Method::GET], "/items/{id}", "app", "item")
			.build()
			.unwrap();
		get(&router, "/items/1").unwrap();
		let debug = format!("{:?}", router);
		assert!(debug.starts_with("Router"));
		assert!(debug.contains("ParamParser { cached: 1, capacity: 1024 }"));
	}

	#[test]
	fn parsed_params_are_cached() {
		let router = TestBuilder::new()
			.config(RouterConfig::new().with_param_cache_capacity(1))
			.route([Method::GET], "/items/{id:int}", "app", "item")
			.build()
			.unwrap();
		let first = get(&router, "/items/1").unwrap();
		assert_eq!(router.param_parser().cached(), 1);
		get(&router, "/items/2").unwrap();
		assert_eq!(router.param_parser().cached(), 1);
		assert_eq!(get(&router, "/items/1").unwrap(), first);
	}

	#[test]
	fn clones_share_state() {
		let router = TestBuilder::new()
			.route([Method::GET], "/items/{id}", "app", "item")
			.build()
			.unwrap();
		let clone = router.clone();
		std::thread::spawn(move || get(&clone, "/items/9").unwrap())
			.join()
			.unwrap();
		assert_eq!(router.param_parser().cached(), 1);
	}

	#[test]
	fn registration_errors_surface_at_build() {
		let duplicate = TestBuilder::new()
			.route([Method::GET], "/a", "app", "one")
			.route([Method::GET], "/a/", "app", "two")
			.build();
		assert!(matches!(duplicate, Err(BuildError::Duplicate { .. })));

		let conflicting = TestBuilder::new()
			.route([Method::GET], "/a", "app", "one")
			.protocol("/a", "app", "two")
			.build();
		assert!(matches!(conflicting, Err(BuildError::ConflictingDispatch { .. })));

		let root_mount = TestBuilder::new()
			.mount("/", MountKind::App, "app", "sub")
			.build();
		assert!(matches!(root_mount, Err(BuildError::InvalidMount { .. })));

		let dynamic_mount = TestBuilder::new()
			.mount("/t/{tenant}", MountKind::App, "app", "sub")
			.build();
		assert!(matches!(dynamic_mount, Err(BuildError::InvalidMount { .. })));

		let first_error_wins = TestBuilder::new()
			.route([Method::GET], "nope", "app", "one")
			.route([Method::GET], "/{x:hex}", "app", "two")
			.build();
		assert!(matches!(first_error_wins, Err(BuildError::MalformedTemplate { .. })));
	}
}
