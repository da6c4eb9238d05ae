use crate::{AllowedMethods, Params, RouteError, Router};
use anyhow::{Error, Result};
use hyper::{
	body::Body,
	header::{HeaderValue, ALLOW, UPGRADE},
	service::Service,
	StatusCode,
};
use std::{
	convert::Infallible,
	future::{ready, Future, Ready},
	pin::Pin,
	task::{Context, Poll},
};

pub use hyper;

pub use hyper::http::response::Builder as ResponseBuilder;
pub type Request = hyper::Request<Body>;
pub type Response = Pin<Box<dyn Future<Output = Result<hyper::Response<Body>>> + Send>>;

/// What a route handler is told about the route that matched.
#[derive(Debug, Clone)]
pub struct RouteMatch {
	/// Name of the application the route was registered for.
	pub app: &'static str,
	/// Normalized path, or the remaining path for mounts.
	pub path: String,
	pub params: Params,
}

/// A function handling a routed request.
pub type Route = fn(RouteMatch, Request) -> Response;

/// A function that can convert an error into a response.
pub type ErrorHandler = fn(e: Error) -> hyper::Response<Body>;

/// A function that handles unroutable requests and creates a response.
pub type NotFoundHandler = fn(req: Request) -> hyper::Response<Body>;

/// A function that answers requests whose path exists for other methods.
pub type MethodNotAllowedHandler = fn(allowed: AllowedMethods, req: Request) -> hyper::Response<Body>;

fn status(status: StatusCode, body: Body) -> hyper::Response<Body> {
	let mut response = hyper::Response::new(body);
	*response.status_mut() = status;
	response
}

fn default_error_handler(e: Error) -> hyper::Response<Body> {
	status(StatusCode::INTERNAL_SERVER_ERROR, e.to_string().into())
}

fn default_not_found_handler(_req: Request) -> hyper::Response<Body> {
	status(StatusCode::NOT_FOUND, Body::empty())
}

fn default_method_not_allowed_handler(allowed: AllowedMethods, _req: Request) -> hyper::Response<Body> {
	let mut response = status(StatusCode::METHOD_NOT_ALLOWED, Body::empty());
	if let Ok(value) = HeaderValue::from_str(&allowed.header_value()) {
		response.headers_mut().insert(ALLOW, value);
	}
	response
}

fn is_websocket(req: &Request) -> bool {
	req.headers()
		.get(UPGRADE)
		.and_then(|value| value.to_str().ok())
		.map_or(false, |value| value.eq_ignore_ascii_case("websocket"))
}

type InnerHttpRouter = Router<&'static str, Route>;

/// Serves a [`Router`] over hyper: pass it to `Server::serve`.
pub struct HttpRouter {
	router: InnerHttpRouter,
	internal_error: ErrorHandler,
	not_found: NotFoundHandler,
	method_not_allowed: MethodNotAllowedHandler,
}

impl From<InnerHttpRouter> for HttpRouter {
	fn from(router: InnerHttpRouter) -> Self {
		Self {
			router,
			internal_error: default_error_handler,
			not_found: default_not_found_handler,
			method_not_allowed: default_method_not_allowed_handler,
		}
	}
}

impl HttpRouter {
	pub fn internal_error_handler(mut self, handler: ErrorHandler) -> Self {
		self.internal_error = handler;
		self
	}

	pub fn not_found_handler(mut self, handler: NotFoundHandler) -> Self {
		self.not_found = handler;
		self
	}

	pub fn method_not_allowed_handler(mut self, handler: MethodNotAllowedHandler) -> Self {
		self.method_not_allowed = handler;
		self
	}

	fn handler(&self) -> RouteHandler {
		RouteHandler {
			router: self.router.clone(),
			internal_error: self.internal_error,
			not_found: self.not_found,
			method_not_allowed: self.method_not_allowed,
		}
	}
}

impl<T> Service<T> for HttpRouter {
	type Response = RouteHandler;
	type Error = Infallible;
	type Future = Ready<Result<Self::Response, Self::Error>>;

	fn poll_ready(&mut self, _: &mut Context) -> Poll<Result<(), Self::Error>> {
		Poll::Ready(Ok(()))
	}

	fn call(&mut self, _: T) -> Self::Future {
		ready(Ok(self.handler()))
	}
}

/// Responsible for handling the actual HTTP requests from hyper.
pub struct RouteHandler {
	router: InnerHttpRouter,
	internal_error: ErrorHandler,
	not_found: NotFoundHandler,
	method_not_allowed: MethodNotAllowedHandler,
}

impl Service<Request> for RouteHandler {
	type Response = hyper::Response<Body>;
	type Error = Infallible;
	type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

	fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
		Poll::Ready(Ok(()))
	}

	fn call(&mut self, req: Request) -> Self::Future {
		// Upgrade requests resolve against websocket bindings, which carry no method.
		let method = if is_websocket(&req) {
			None
		} else {
			Some(req.method().clone())
		};
		let path = req.uri().path().to_owned();

		match self.router.resolve(method.as_ref(), &path) {
			Ok(resolved) => {
				let route = *resolved.handler;
				let app = *resolved.app;
				let fut = route(
					RouteMatch {
						app,
						path: resolved.path,
						params: resolved.params,
					},
					req,
				);
				let err = self.internal_error;
				Box::pin(async move {
					Ok(fut.await.unwrap_or_else(|e| {
						tracing::warn!(app, error = %e, "route handler failed");
						err(e)
					}))
				})
			}
			Err(RouteError::NotFound) => {
				tracing::debug!(%path, "no route");
				let response = (self.not_found)(req);
				Box::pin(async { Ok(response) })
			}
			Err(RouteError::MethodNotAllowed { allowed }) => {
				tracing::debug!(%path, allowed = %allowed, "method not allowed");
				let response = (self.method_not_allowed)(allowed, req);
				Box::pin(async { Ok(response) })
			}
		}
	}
}
