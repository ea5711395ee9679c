//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router and wire middleware (trace, request ID,
//!   timeout, body limit, route lookup, rate limiting)
//! - Own the shared rate limiter for the process lifetime
//! - Forward admitted requests to the matched route's upstream

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{
        uri::{PathAndQuery, Scheme},
        Request, Uri, Version,
    },
    middleware,
    response::Response,
    routing::any,
    Extension,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::admin::AdminState;
use crate::config::GatewayConfig;
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::http::response::GatewayError;
use crate::lifecycle::shutdown;
use crate::observability::metrics;
use crate::routing::{route_middleware, MatchedRoute, Router as RouteTable};
use crate::security::client_ip::peer_addr;
use crate::security::headers::{append_forwarded_for, strip_hop_by_hop};
use crate::security::middleware::{rate_limit_middleware, RateLimitState};
use crate::security::rate_limit::RateLimiter;

/// State injected into the forwarding handler.
#[derive(Clone)]
pub struct AppState {
    pub client: Client<HttpConnector, Body>,
}

/// The gateway's public HTTP server.
pub struct HttpServer {
    router: axum::Router,
    config: GatewayConfig,
    routes: Arc<RouteTable>,
    limiter: Arc<RateLimiter>,
}

impl HttpServer {
    /// Create a server with a limiter on the system clock.
    pub fn new(config: GatewayConfig) -> Self {
        let limiter = Arc::new(RateLimiter::new(&config.rate_limit));
        Self::with_limiter(config, limiter)
    }

    /// Create a server around an existing limiter.
    pub fn with_limiter(config: GatewayConfig, limiter: Arc<RateLimiter>) -> Self {
        let routes = Arc::new(RouteTable::from_config(config.routes.clone()));

        for route in routes.routes() {
            tracing::info!(
                route = %route.name,
                upstream = %route.upstream,
                priority = route.priority,
                rate_limit = ?route.rate_limit,
                "Route registered"
            );
        }

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        let state = AppState { client };

        let router = Self::build_router(&config, state, routes.clone(), limiter.clone());
        Self {
            router,
            config,
            routes,
            limiter,
        }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// The request ID is set before anything else; rate limiting runs just
    /// before the handler.
    #[allow(deprecated)]
    fn build_router(
        config: &GatewayConfig,
        state: AppState,
        routes: Arc<RouteTable>,
        limiter: Arc<RateLimiter>,
    ) -> axum::Router {
        let rate_limit_state = RateLimitState {
            limiter,
            enabled: config.rate_limit.enabled,
            trust_forwarded_for: config.rate_limit.trust_forwarded_for,
        };

        axum::Router::new()
            .route("/", any(forward_handler))
            .route("/{*path}", any(forward_handler))
            .with_state(state)
            .layer(middleware::from_fn_with_state(
                rate_limit_state,
                rate_limit_middleware,
            ))
            .layer(middleware::from_fn_with_state(routes, route_middleware))
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http())
                    .layer(propagate_request_id_layer())
                    .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
            )
    }

    /// A clone of the fully layered router.
    pub fn router(&self) -> axum::Router {
        self.router.clone()
    }

    pub fn limiter(&self) -> Arc<RateLimiter> {
        self.limiter.clone()
    }

    pub fn routes(&self) -> Arc<RouteTable> {
        self.routes.clone()
    }

    /// State for the admin API, sharing this server's limiter and routes.
    pub fn admin_state(&self) -> AdminState {
        AdminState {
            limiter: self.limiter.clone(),
            routes: self.routes.clone(),
            api_key: Arc::from(self.config.admin.api_key.as_str()),
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Serve until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown::wait(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Forward an admitted request to its route's upstream.
async fn forward_handler(
    State(state): State<AppState>,
    Extension(MatchedRoute(route)): Extension<MatchedRoute>,
    request: Request<Body>,
) -> Result<Response, GatewayError> {
    let start_time = Instant::now();
    let request_id = request_id(&request).to_owned();
    let method = request.method().clone();
    let peer = peer_addr(&request);

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %request.uri().path(),
        route = %route.name,
        "Forwarding request"
    );

    let (mut parts, body) = request.into_parts();

    let path_and_query = parts
        .uri
        .path_and_query()
        .cloned()
        .unwrap_or_else(|| PathAndQuery::from_static("/"));
    parts.uri = Uri::builder()
        .scheme(Scheme::HTTP)
        .authority(route.upstream.clone())
        .path_and_query(path_and_query)
        .build()?;
    parts.version = Version::HTTP_11;
    strip_hop_by_hop(&mut parts.headers);
    append_forwarded_for(&mut parts.headers, peer);

    match state.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => {
            metrics::record_request(
                method.as_str(),
                response.status().as_u16(),
                &route.name,
                start_time,
            );
            let (mut parts, body) = response.into_parts();
            strip_hop_by_hop(&mut parts.headers);
            Ok(Response::from_parts(parts, Body::new(body)))
        }
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                route = %route.name,
                upstream = %route.upstream,
                error = %e,
                "Upstream error"
            );
            metrics::record_request(method.as_str(), 502, &route.name, start_time);
            Err(GatewayError::Upstream(e.to_string()))
        }
    }
}
