use trellis::{
	hyper::{Body, Method, Server},
	HttpRouter, MountKind, Request, Response, ResponseBuilder, Route, RouteMatch, RouterBuilder,
};
use tracing_subscriber::EnvFilter;

fn handler(matched: RouteMatch, _req: Request) -> Response {
	Box::pin(async move {
		let res = ResponseBuilder::default();
		tracing::info!(app = matched.app, path = %matched.path, params = ?matched.params, "handled");
		Ok(res.body(Body::empty())?)
	})
}

fn other_handler(matched: RouteMatch, _req: Request) -> Response {
	Box::pin(async move {
		let res = ResponseBuilder::default();
		Ok(res.body(format!("serving {}", matched.path).into())?)
	})
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::from_default_env())
		.init();

	let addr = ([127, 0, 0, 1], 3000).into();

	let router = RouterBuilder::new()
		.route([Method::GET], "/", "main", handler as Route)
		.route([Method::POST], "/foo/{a}/bar/{b:int}/baz", "main", handler as Route)
		.route([Method::GET], "/files/{path:path}", "main", handler as Route)
		.mount("/assets", MountKind::Files, "assets", other_handler as Route)
		.build()?;

	let server = Server::bind(&addr).serve(HttpRouter::from(router));
	tracing::info!("listening on http://{}", addr);

	server.await?;
	Ok(())
}
