use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::{
    routing::{delete, get, post, put},
    serve, Json, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use storefront_types::ports::payment_gateway::PaymentGateway;
use storefront_types::ports::Store;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use super::{cart, checkout, orders, products, users};
use crate::application::cart_service::CartService;
use crate::application::checkout_service::CheckoutService;
use crate::application::order_service::OrderService;
use crate::application::product_service::ProductService;
use crate::application::user_service::UserService;
use crate::auth::TokenService;
use crate::config::Config;

#[derive(Clone)]
pub struct HttpServerConfig {
    pub port: String,
}

/// Shared handler state: one instance of each service over the same store.
pub struct AppState<R: Store, G: PaymentGateway> {
    pub carts: Arc<CartService<R>>,
    pub checkouts: Arc<CheckoutService<R, G>>,
    pub orders: Arc<OrderService<R>>,
    pub products: Arc<ProductService<R>>,
    pub users: Arc<UserService<R>>,
    pub tokens: Arc<TokenService>,
    pub config: Arc<Config>,
}

impl<R: Store, G: PaymentGateway> Clone for AppState<R, G> {
    fn clone(&self) -> Self {
        Self {
            carts: self.carts.clone(),
            checkouts: self.checkouts.clone(),
            orders: self.orders.clone(),
            products: self.products.clone(),
            users: self.users.clone(),
            tokens: self.tokens.clone(),
            config: self.config.clone(),
        }
    }
}

impl<R: Store, G: PaymentGateway> AppState<R, G> {
    pub fn new(repo: R, gateway: G, config: Config) -> Self {
        let repo = Arc::new(repo);
        let tokens = Arc::new(TokenService::new(&config.jwt));
        Self {
            carts: Arc::new(CartService::new(repo.clone())),
            checkouts: Arc::new(CheckoutService::new(repo.clone(), Arc::new(gateway))),
            orders: Arc::new(OrderService::new(repo.clone())),
            products: Arc::new(ProductService::new(repo.clone())),
            users: Arc::new(UserService::new(
                repo,
                tokens.clone(),
                config.admin_secret.clone(),
            )),
            tokens,
            config: Arc::new(config),
        }
    }
}

#[derive(Clone)]
pub struct HttpServer<R: Store, G: PaymentGateway> {
    pub state: AppState<R, G>,
    pub config: HttpServerConfig,
}

impl<R: Store, G: PaymentGateway> HttpServer<R, G> {
    pub async fn new(state: AppState<R, G>, config: HttpServerConfig) -> anyhow::Result<Self> {
        Ok(Self { state, config })
    }

    pub fn router(&self) -> anyhow::Result<Router> {
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &axum::extract::Request<_>| {
                let uri = request.uri().path().to_string();
                let request_id = Uuid::new_v4();
                tracing::info_span!(
                    "http_request",
                    %request_id,
                    method = %request.method(),
                    uri
                )
            })
            .on_request(
                |request: &axum::extract::Request<_>, span: &tracing::Span| {
                    tracing::info!(
                        parent: span,
                        method = %request.method(),
                        uri = %request.uri().path(),
                        "request"
                    );
                },
            )
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &tracing::Span| {
                    tracing::info!(
                        parent: span,
                        status = %response.status(),
                        latency_ms = %latency.as_millis(),
                        "response"
                    );
                },
            );

        let origin: HeaderValue = self
            .state
            .config
            .site_url
            .parse()
            .map_err(|e| anyhow::anyhow!("SITE_URL is not a valid origin: {e}"))?;
        let cors = CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

        let app = Router::new()
            .route("/health", get(health))
            .route("/users/register", post(users::register::<R, G>))
            .route("/users/login", post(users::login::<R, G>))
            .route("/users/profile", get(users::profile::<R, G>))
            .route("/products", get(products::list::<R, G>))
            .route("/products/{id}", get(products::get::<R, G>))
            .route("/admin/products", post(products::create::<R, G>))
            .route(
                "/admin/products/{id}",
                put(products::update::<R, G>).delete(products::remove::<R, G>),
            )
            .route(
                "/cart",
                post(cart::add::<R, G>)
                    .get(cart::get::<R, G>)
                    .put(cart::update::<R, G>),
            )
            .route("/cart/merge", post(cart::merge::<R, G>))
            .route("/cart/{product_id}", delete(cart::remove::<R, G>))
            .route("/checkout", post(checkout::create::<R, G>))
            .route("/checkout/verify-payment", post(checkout::verify_payment::<R, G>))
            .route("/checkout/khalti/callback", get(checkout::khalti_callback::<R, G>))
            .route("/checkout/{id}", get(checkout::get::<R, G>))
            .route(
                "/checkout/{id}/initiateKhalti",
                post(checkout::initiate_khalti::<R, G>),
            )
            .route("/checkout/{id}/finalize", post(checkout::finalize::<R, G>))
            .route("/orders/my-orders", get(orders::my_orders::<R, G>))
            .route("/orders/{id}", get(orders::get::<R, G>))
            .route("/admin/orders", get(orders::list_all::<R, G>))
            .route("/admin/orders/{id}", put(orders::update_status::<R, G>))
            .layer(trace_layer)
            .layer(cors)
            .with_state(self.state.clone());
        Ok(app)
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let app = self.router()?;
        let addr: SocketAddr = format!("0.0.0.0:{}", self.config.port).parse()?;
        tracing::info!("starting server on {}", addr);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        serve(listener, app.into_make_service()).await?;
        Ok(())
    }
}

async fn health() -> (axum::http::StatusCode, Json<serde_json::Value>) {
    (
        axum::http::StatusCode::OK,
        Json(serde_json::json!({ "status": "ok" })),
    )
}
