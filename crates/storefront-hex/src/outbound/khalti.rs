//! Khalti ePayment v2 adapter.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use storefront_types::ports::payment_gateway::{
    CustomerInfo, GatewayError, GatewayStatus, PaymentGateway, PaymentLookup, PaymentRequest,
    PaymentSession,
};

use crate::config::Config;

#[derive(Debug, Clone)]
pub struct KhaltiSettings {
    pub secret_key: Option<String>,
    /// Must end with `/`.
    pub base_url: String,
    pub return_url: Option<String>,
    pub website_url: Option<String>,
    pub timeout: Duration,
}

impl KhaltiSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            secret_key: config.khalti.secret_key.clone(),
            base_url: config.khalti.base_url(),
            return_url: config.khalti_return_url(),
            website_url: Some(config.site_url.clone()),
            timeout: config.khalti.timeout(),
        }
    }
}

#[derive(Clone)]
pub struct KhaltiGateway {
    client: reqwest::Client,
    base: Url,
    secret_key: Option<String>,
    return_url: Option<String>,
    website_url: Option<String>,
}

#[derive(Serialize)]
struct InitiatePayload<'a> {
    return_url: &'a str,
    website_url: &'a str,
    amount: i64,
    purchase_order_id: &'a str,
    purchase_order_name: &'a str,
    customer_info: &'a CustomerInfo,
}

#[derive(Deserialize)]
struct InitiateResponse {
    pidx: String,
    payment_url: String,
}

#[derive(Serialize)]
struct LookupPayload<'a> {
    pidx: &'a str,
}

#[derive(Deserialize)]
struct LookupResponse {
    pidx: String,
    status: String,
    total_amount: i64,
    #[serde(default)]
    transaction_id: Option<String>,
}

impl KhaltiGateway {
    pub fn new(settings: KhaltiSettings) -> anyhow::Result<Self> {
        let base = Url::parse(&settings.base_url)
            .map_err(|e| anyhow::anyhow!("invalid Khalti base url {}: {e}", settings.base_url))?;
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;
        Ok(Self {
            client,
            base,
            secret_key: settings.secret_key,
            return_url: settings.return_url,
            website_url: settings.website_url,
        })
    }

    fn secret(&self) -> Result<&str, GatewayError> {
        self.secret_key
            .as_deref()
            .ok_or_else(|| GatewayError::Misconfigured("KHALTI_SECRET_KEY is not set".into()))
    }

    fn url(&self, path: &str) -> Result<Url, GatewayError> {
        self.base
            .join(path)
            .map_err(|e| GatewayError::Misconfigured(format!("bad gateway url: {e}")))
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        secret: &str,
        body: &B,
    ) -> Result<T, GatewayError> {
        let res = self
            .client
            .post(self.url(path)?)
            .header(AUTHORIZATION, format!("Key {secret}"))
            .json(body)
            .send()
            .await
            .map_err(transport)?;
        let status = res.status();
        let text = res.text().await.map_err(transport)?;
        if !status.is_success() {
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                body: text,
            });
        }
        serde_json::from_str(&text).map_err(|e| GatewayError::InvalidResponse(e.to_string()))
    }
}

fn transport(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::Transport(e.to_string())
    }
}

#[async_trait]
impl PaymentGateway for KhaltiGateway {
    async fn initiate(&self, request: PaymentRequest) -> Result<PaymentSession, GatewayError> {
        let secret = self.secret()?;
        let (Some(return_url), Some(website_url)) =
            (self.return_url.as_deref(), self.website_url.as_deref())
        else {
            return Err(GatewayError::Misconfigured(
                "PUBLIC_API_URL and SITE_URL are required for payment callbacks".into(),
            ));
        };
        let payload = InitiatePayload {
            return_url,
            website_url,
            amount: request.amount,
            purchase_order_id: &request.purchase_order_id,
            purchase_order_name: &request.purchase_order_name,
            customer_info: &request.customer_info,
        };
        tracing::debug!(
            purchase_order_id = %request.purchase_order_id,
            amount = request.amount,
            "initiating khalti payment"
        );
        let res: InitiateResponse = self.post("epayment/initiate/", secret, &payload).await?;
        Ok(PaymentSession {
            pidx: res.pidx,
            payment_url: res.payment_url,
        })
    }

    async fn lookup(&self, pidx: &str) -> Result<PaymentLookup, GatewayError> {
        let secret = self.secret()?;
        let res: LookupResponse = self
            .post("epayment/lookup/", secret, &LookupPayload { pidx })
            .await?;
        Ok(PaymentLookup {
            pidx: res.pidx,
            status: GatewayStatus::parse(&res.status),
            total_amount: res.total_amount,
            transaction_id: res.transaction_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn settings(base_url: String, secret: Option<&str>) -> KhaltiSettings {
        KhaltiSettings {
            secret_key: secret.map(String::from),
            base_url,
            return_url: Some("http://api.test/checkout/khalti/callback".into()),
            website_url: Some("http://shop.test".into()),
            timeout: Duration::from_secs(2),
        }
    }

    fn request() -> PaymentRequest {
        PaymentRequest {
            amount: 200_000,
            purchase_order_id: "co-1".into(),
            purchase_order_name: "Order co-1".into(),
            customer_info: CustomerInfo {
                name: "Gita Rai".into(),
                email: "gita@example.com".into(),
                phone: "+9779841234567".into(),
            },
        }
    }

    #[tokio::test]
    async fn initiate_posts_payload_with_key_header() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/v2/epayment/initiate/")
                    .header("Authorization", "Key test_secret")
                    .json_body(json!({
                        "return_url": "http://api.test/checkout/khalti/callback",
                        "website_url": "http://shop.test",
                        "amount": 200000,
                        "purchase_order_id": "co-1",
                        "purchase_order_name": "Order co-1",
                        "customer_info": {
                            "name": "Gita Rai",
                            "email": "gita@example.com",
                            "phone": "+9779841234567"
                        }
                    }));
                then.status(200).json_body(json!({
                    "pidx": "bZQLD9wRVWo4CdESSfuSsB",
                    "payment_url": "https://test-pay.khalti.com/?pidx=bZQLD9wRVWo4CdESSfuSsB",
                    "expires_at": "2026-10-19T12:00:00+05:45",
                    "expires_in": 1800
                }));
            })
            .await;

        let gateway =
            KhaltiGateway::new(settings(server.url("/api/v2/"), Some("test_secret"))).unwrap();
        let session = gateway.initiate(request()).await.unwrap();
        assert_eq!(session.pidx, "bZQLD9wRVWo4CdESSfuSsB");
        assert!(session.payment_url.contains("pidx="));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn lookup_parses_status() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/epayment/lookup/")
                    .json_body(json!({ "pidx": "abc" }));
                then.status(200).json_body(json!({
                    "pidx": "abc",
                    "total_amount": 200000,
                    "status": "User canceled",
                    "transaction_id": null,
                    "fee": 0,
                    "refunded": false
                }));
            })
            .await;

        let gateway = KhaltiGateway::new(settings(server.url("/"), Some("k"))).unwrap();
        let lookup = gateway.lookup("abc").await.unwrap();
        assert_eq!(lookup.status, GatewayStatus::UserCanceled);
        assert_eq!(lookup.total_amount, 200_000);
        assert!(lookup.transaction_id.is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn missing_configuration_fails_before_any_request() {
        let unreachable = "http://127.0.0.1:9/".to_string();
        let no_key = KhaltiGateway::new(settings(unreachable.clone(), None)).unwrap();
        assert!(matches!(
            no_key.initiate(request()).await,
            Err(GatewayError::Misconfigured(_))
        ));

        let mut no_callback = settings(unreachable, Some("k"));
        no_callback.return_url = None;
        let gateway = KhaltiGateway::new(no_callback).unwrap();
        assert!(matches!(
            gateway.initiate(request()).await,
            Err(GatewayError::Misconfigured(_))
        ));
    }

    #[tokio::test]
    async fn non_success_status_is_rejected_with_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/epayment/initiate/");
                then.status(401).body(r#"{"detail":"Invalid token."}"#);
            })
            .await;

        let gateway = KhaltiGateway::new(settings(server.url("/"), Some("bad"))).unwrap();
        match gateway.initiate(request()).await {
            Err(GatewayError::Rejected { status, body }) => {
                assert_eq!(status, 401);
                assert!(body.contains("Invalid token"));
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_gateway_times_out() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/epayment/initiate/");
                then.status(200)
                    .delay(Duration::from_millis(1500))
                    .json_body(json!({ "pidx": "late", "payment_url": "x" }));
            })
            .await;

        let mut cfg = settings(server.url("/"), Some("k"));
        cfg.timeout = Duration::from_millis(200);
        let gateway = KhaltiGateway::new(cfg).unwrap();
        assert!(matches!(
            gateway.initiate(request()).await,
            Err(GatewayError::Timeout)
        ));
    }
}
