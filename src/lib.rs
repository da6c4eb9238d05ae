//! A trie-based HTTP path resolver built on hyper.
//!
//! ```
//! use trellis::{Method, MountKind, ParamValue, RouterBuilder};
//!
//! let router = RouterBuilder::new()
//! 	.route([Method::GET], "/health", "main", "health")
//! 	.route([Method::GET, Method::PUT], "/users/{id:int}", "main", "user")
//! 	.route([Method::GET], "/files/{path:path}", "main", "file")
//! 	.mount("/assets", MountKind::Files, "assets", "static")
//! 	.build()
//! 	.unwrap();
//!
//! let resolved = router.resolve(Some(&Method::GET), "/users/7").unwrap();
//! assert_eq!(*resolved.handler, "user");
//! assert_eq!(resolved.params.get("id"), Some(&ParamValue::Int(7)));
//!
//! let resolved = router.resolve(Some(&Method::GET), "/assets/app.js").unwrap();
//! assert_eq!(resolved.path, "/app.js");
//! ```
//!
//! Resolution tries three strategies in order and the first match wins:
//!
//! 1. parameter-free routes by exact path,
//! 2. mount prefixes, unless a route declared directly inside the mount's
//!    namespace shadows it,
//! 3. a walk of the trie, where static segments beat `{param}` segments and a
//!    `{name:path}` segment swallows the rest of the path.
//!
//! A path that matches nothing, or whose parameters fail conversion, is
//! [`RouteError::NotFound`]. A path that exists for other methods is
//! [`RouteError::MethodNotAllowed`].
//!
//! With the `http` feature, [`HttpRouter`] serves a router over hyper and
//! answers those errors with 404 and 405.

mod config;
mod error;
#[cfg(feature = "http")]
mod http;
mod node;
mod params;
mod path;
mod route;
mod router;
mod trie;

#[cfg(feature = "http")]
pub use http::*;

pub use ::hyper::Method;

pub use config::{RouterConfig, DEFAULT_PARAM_CACHE_CAPACITY};
pub use error::{AllowedMethods, BuildError, ConvertError, RouteError};
pub use node::{Dispatch, Dynamic, Endpoint, HandlerKey, NodeId, TrieNode};
pub use params::{ParamParser, ParamValue, Params};
pub use path::{normalize, split_path};
pub use route::{Converter, Converters, ParamDefs, PathParam, PathSegment, Template};
pub use router::{MountKind, Resolved, RouteKind, Router, RouterBuilder};
pub use trie::{RouteTable, Traversal};
