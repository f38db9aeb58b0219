use std::time::Duration;

use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, RequestBuilder, Url};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use storefront_types::domain::cart::{Cart, CartLine};
use storefront_types::domain::checkout::{Checkout, ShippingAddress};
use storefront_types::domain::order::{Order, OrderStatus};
use storefront_types::domain::product::{Product, ProductInput};
use storefront_types::domain::user::User;
use uuid::Uuid;

#[derive(Clone)]
pub struct StoreClientBuilder {
    base: Url,
    headers: HeaderMap,
    timeout: Option<Duration>,
    token: Option<String>,
    client: Option<reqwest::Client>,
}

/// Typed client for the storefront HTTP API. Carries an optional bearer
/// token that is attached to every request.
#[derive(Clone)]
pub struct StoreClient {
    base: Url,
    client: reqwest::Client,
    token: Option<String>,
}

impl StoreClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        Self::builder(base_url)?.build()
    }

    pub fn builder(base_url: &str) -> anyhow::Result<StoreClientBuilder> {
        let base = Url::parse(base_url).context("invalid base url")?;
        Ok(StoreClientBuilder {
            base,
            headers: HeaderMap::new(),
            timeout: None,
            token: None,
            client: None,
        })
    }

    /// Same connection pool, different identity.
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            base: self.base.clone(),
            client: self.client.clone(),
            token: Some(token.into()),
        }
    }

    fn url(&self, path: &str) -> anyhow::Result<Url> {
        self.base.join(path).context("failed to join url")
    }

    fn request(&self, method: Method, path: &str) -> anyhow::Result<RequestBuilder> {
        let req = self.client.request(method, self.url(path)?);
        Ok(match &self.token {
            Some(t) => req.bearer_auth(t),
            None => req,
        })
    }

    async fn send<T: DeserializeOwned>(req: RequestBuilder) -> anyhow::Result<T> {
        let res = req.send().await?;
        tracing::debug!(status = %res.status(), url = %res.url(), "storefront response");
        Ok(res.error_for_status()?.json().await?)
    }

    async fn send_empty(req: RequestBuilder) -> anyhow::Result<()> {
        let res = req.send().await?;
        tracing::debug!(status = %res.status(), url = %res.url(), "storefront response");
        res.error_for_status()?;
        Ok(())
    }

    pub async fn register(&self, req: &RegisterRequest) -> anyhow::Result<AuthResponse> {
        Self::send(self.request(Method::POST, "users/register")?.json(req)).await
    }

    pub async fn login(&self, email: &str, password: &str) -> anyhow::Result<AuthResponse> {
        let body = LoginRequest { email, password };
        Self::send(self.request(Method::POST, "users/login")?.json(&body)).await
    }

    pub async fn profile(&self) -> anyhow::Result<User> {
        Self::send(self.request(Method::GET, "users/profile")?).await
    }

    pub async fn list_products(&self) -> anyhow::Result<Vec<Product>> {
        Self::send(self.request(Method::GET, "products")?).await
    }

    pub async fn get_product(&self, id: Uuid) -> anyhow::Result<Product> {
        Self::send(self.request(Method::GET, &format!("products/{id}"))?).await
    }

    pub async fn create_product(&self, input: &ProductInput) -> anyhow::Result<Product> {
        Self::send(self.request(Method::POST, "admin/products")?.json(input)).await
    }

    pub async fn update_product(&self, id: Uuid, input: &ProductInput) -> anyhow::Result<Product> {
        let path = format!("admin/products/{id}");
        Self::send(self.request(Method::PUT, &path)?.json(input)).await
    }

    pub async fn delete_product(&self, id: Uuid) -> anyhow::Result<()> {
        let path = format!("admin/products/{id}");
        Self::send_empty(self.request(Method::DELETE, &path)?).await
    }

    pub async fn add_to_cart(&self, req: &AddToCartRequest) -> anyhow::Result<Cart> {
        Self::send(self.request(Method::POST, "cart")?.json(req)).await
    }

    pub async fn get_cart(&self, guest_id: Option<&str>) -> anyhow::Result<Cart> {
        let mut req = self.request(Method::GET, "cart")?;
        if let Some(g) = guest_id {
            req = req.query(&[("guest_id", g)]);
        }
        Self::send(req).await
    }

    /// A quantity of zero or less drops the line.
    pub async fn update_cart(&self, req: &UpdateCartRequest) -> anyhow::Result<Cart> {
        Self::send(self.request(Method::PUT, "cart")?.json(req)).await
    }

    pub async fn remove_from_cart(
        &self,
        product_id: Uuid,
        line: &RemoveLineRequest,
    ) -> anyhow::Result<Cart> {
        let path = format!("cart/{product_id}");
        Self::send(self.request(Method::DELETE, &path)?.query(line)).await
    }

    pub async fn merge_cart(&self, guest_id: &str) -> anyhow::Result<Cart> {
        let body = MergeRequest { guest_id };
        Self::send(self.request(Method::POST, "cart/merge")?.json(&body)).await
    }

    pub async fn create_checkout(&self, req: &CreateCheckoutRequest) -> anyhow::Result<Checkout> {
        Self::send(self.request(Method::POST, "checkout")?.json(req)).await
    }

    pub async fn get_checkout(&self, id: Uuid) -> anyhow::Result<Checkout> {
        Self::send(self.request(Method::GET, &format!("checkout/{id}"))?).await
    }

    pub async fn initiate_khalti(&self, checkout_id: Uuid) -> anyhow::Result<PaymentSession> {
        let path = format!("checkout/{checkout_id}/initiateKhalti");
        Self::send(self.request(Method::POST, &path)?).await
    }

    pub async fn verify_payment(&self, pidx: &str) -> anyhow::Result<PaymentConfirmation> {
        let body = VerifyPaymentRequest { pidx };
        Self::send(self.request(Method::POST, "checkout/verify-payment")?.json(&body)).await
    }

    pub async fn finalize_checkout(&self, checkout_id: Uuid) -> anyhow::Result<Order> {
        let path = format!("checkout/{checkout_id}/finalize");
        Self::send(self.request(Method::POST, &path)?).await
    }

    pub async fn my_orders(&self) -> anyhow::Result<Vec<Order>> {
        Self::send(self.request(Method::GET, "orders/my-orders")?).await
    }

    pub async fn get_order(&self, id: Uuid) -> anyhow::Result<Order> {
        Self::send(self.request(Method::GET, &format!("orders/{id}"))?).await
    }

    pub async fn list_orders(&self) -> anyhow::Result<Vec<Order>> {
        Self::send(self.request(Method::GET, "admin/orders")?).await
    }

    pub async fn update_order_status(&self, id: Uuid, status: OrderStatus) -> anyhow::Result<Order> {
        let path = format!("admin/orders/{id}");
        Self::send(
            self.request(Method::PUT, &path)?
                .json(&UpdateStatusRequest { status }),
        )
        .await
    }
}

impl StoreClientBuilder {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_header(
        mut self,
        key: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> anyhow::Result<Self> {
        let header_name =
            HeaderName::from_bytes(key.as_ref().as_bytes()).context("invalid header name")?;
        let header_value = HeaderValue::from_str(value.as_ref()).context("invalid header value")?;
        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    pub fn with_reqwest_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> anyhow::Result<StoreClient> {
        let client = match self.client {
            Some(client) => client,
            None => {
                let mut builder = reqwest::Client::builder();
                if !self.headers.is_empty() {
                    builder = builder.default_headers(self.headers);
                }
                if let Some(t) = self.timeout {
                    builder = builder.timeout(t);
                }
                builder.build()?
            }
        };
        Ok(StoreClient {
            base: self.base,
            client,
            token: self.token,
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_secret: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    pub quantity: u32,
    pub size: Option<String>,
    pub color: Option<String>,
    pub guest_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UpdateCartRequest {
    pub product_id: Uuid,
    pub quantity: i64,
    pub size: Option<String>,
    pub color: Option<String>,
    pub guest_id: Option<String>,
}

/// Identifies the line to drop; sent as query parameters.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct RemoveLineRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CreateCheckoutRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_items: Option<Vec<CartLine>>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_price: Option<Decimal>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PaymentSession {
    pub pidx: String,
    pub payment_url: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PaymentConfirmation {
    pub checkout: Checkout,
    pub paid: bool,
    pub gateway_status: String,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct MergeRequest<'a> {
    guest_id: &'a str,
}

#[derive(Serialize)]
struct VerifyPaymentRequest<'a> {
    pidx: &'a str,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct UpdateStatusRequest {
    status: OrderStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;
    use storefront_types::domain::cart::CartOwner;
    use storefront_types::domain::user::Role;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Client".into(),
            email: "client@example.com".into(),
            password_hash: String::new(),
            role: Role::Customer,
            created_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn login_then_authorized_calls_carry_bearer() {
        let server = MockServer::start_async().await;
        let user = sample_user();

        let login_mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/users/login")
                    .json_body(json!({ "email": "client@example.com", "password": "secret1" }));
                then.status(200).json_body_obj(&AuthResponse {
                    user: user.clone(),
                    token: "tok-123".into(),
                });
            })
            .await;
        let profile_mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/users/profile")
                    .header("Authorization", "Bearer tok-123");
                then.status(200).json_body_obj(&user);
            })
            .await;

        let anon = StoreClient::new(&server.base_url()).unwrap();
        let auth = anon.login("client@example.com", "secret1").await.unwrap();
        let client = anon.with_token(auth.token);
        let me = client.profile().await.unwrap();
        assert_eq!(me.id, user.id);

        login_mock.assert_async().await;
        profile_mock.assert_async().await;
    }

    #[tokio::test]
    async fn guest_cart_query_and_payment_calls() {
        let server = MockServer::start_async().await;
        let checkout_id = Uuid::new_v4();
        let cart = Cart::new(CartOwner::Guest("guest_1".into()));

        let cart_mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/cart").query_param("guest_id", "guest_1");
                then.status(200).json_body_obj(&cart);
            })
            .await;
        let initiate_mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(format!("/checkout/{checkout_id}/initiateKhalti"))
                    .header("Authorization", "Bearer t");
                then.status(200).json_body(json!({
                    "pidx": "p-1",
                    "payment_url": "https://test-pay.khalti.com/?pidx=p-1"
                }));
            })
            .await;

        let client = StoreClient::new(&server.base_url()).unwrap();
        let fetched = client.get_cart(Some("guest_1")).await.unwrap();
        assert!(fetched.is_empty());
        assert_eq!(fetched.owner, CartOwner::Guest("guest_1".into()));

        let session = client.with_token("t").initiate_khalti(checkout_id).await.unwrap();
        assert_eq!(session.pidx, "p-1");

        cart_mock.assert_async().await;
        initiate_mock.assert_async().await;
    }

    #[tokio::test]
    async fn cart_line_edits_target_the_right_line() {
        let server = MockServer::start_async().await;
        let product_id = Uuid::new_v4();
        let cart = Cart::new(CartOwner::Guest("guest_2".into()));

        let update_mock = server
            .mock_async(|when, then| {
                when.method(PUT).path("/cart").json_body(json!({
                    "product_id": product_id,
                    "quantity": 0,
                    "size": "M",
                    "color": null,
                    "guest_id": "guest_2"
                }));
                then.status(200).json_body_obj(&cart);
            })
            .await;
        let remove_mock = server
            .mock_async(|when, then| {
                when.method(DELETE)
                    .path(format!("/cart/{product_id}"))
                    .query_param("size", "M")
                    .query_param("guest_id", "guest_2");
                then.status(200).json_body_obj(&cart);
            })
            .await;

        let client = StoreClient::new(&server.base_url()).unwrap();
        let updated = client
            .update_cart(&UpdateCartRequest {
                product_id,
                quantity: 0,
                size: Some("M".into()),
                color: None,
                guest_id: Some("guest_2".into()),
            })
            .await
            .unwrap();
        assert!(updated.is_empty());
        let removed = client
            .remove_from_cart(
                product_id,
                &RemoveLineRequest {
                    size: Some("M".into()),
                    guest_id: Some("guest_2".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(removed.owner, CartOwner::Guest("guest_2".into()));

        update_mock.assert_async().await;
        remove_mock.assert_async().await;
    }

    #[tokio::test]
    async fn admin_catalog_and_order_calls() {
        let server = MockServer::start_async().await;
        let product_id = Uuid::new_v4();

        let list_mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/admin/orders")
                    .header("Authorization", "Bearer admin");
                then.status(200).json_body(json!([]));
            })
            .await;
        let delete_mock = server
            .mock_async(|when, then| {
                when.method(DELETE)
                    .path(format!("/admin/products/{product_id}"))
                    .header("Authorization", "Bearer admin");
                then.status(204);
            })
            .await;

        let admin = StoreClient::new(&server.base_url()).unwrap().with_token("admin");
        assert!(admin.list_orders().await.unwrap().is_empty());
        admin.delete_product(product_id).await.unwrap();

        list_mock.assert_async().await;
        delete_mock.assert_async().await;
    }

    #[tokio::test]
    async fn error_statuses_surface_as_errors() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/orders/my-orders");
                then.status(401).json_body(json!({ "error": "not authorized, no token" }));
            })
            .await;

        let client = StoreClient::new(&server.base_url()).unwrap();
        assert!(client.my_orders().await.is_err());
    }
}
