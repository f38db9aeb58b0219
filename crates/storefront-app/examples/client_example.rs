///  To run :
///  cargo r --example client_example
use rust_decimal::Decimal;
use storefront_client::{AddToCartRequest, CreateCheckoutRequest, RegisterRequest, StoreClient};
use storefront_hex::config::{Config, JwtConfig, KhaltiConfig, KhaltiMode};
use storefront_hex::inbound::http::{AppState, HttpServer, HttpServerConfig};
use storefront_hex::outbound::khalti::{KhaltiGateway, KhaltiSettings};
use storefront_repo::build_repo;
use storefront_types::domain::checkout::ShippingAddress;
use storefront_types::domain::product::ProductInput;
use tempfile::tempdir;

fn find_free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let port = find_free_port();
    let addr = format!("http://127.0.0.1:{port}/");

    // Use a temp file-backed SQLite DB so multiple connections see the same data.
    let tmp = tempdir()?;
    let db_path = tmp.path().join("storefront.db");
    let db_url = format!("sqlite://{}", db_path.display());

    // No merchant key: everything up to payment initiation works.
    let config = Config {
        server_port: port.to_string(),
        database_url: Some(db_url.clone()),
        jwt: JwtConfig {
            secret: "example-secret".into(),
            ttl_hours: 40,
        },
        admin_secret: Some("example-admin".into()),
        site_url: "http://localhost:5173".into(),
        public_api_url: None,
        khalti: KhaltiConfig {
            secret_key: None,
            mode: KhaltiMode::Sandbox,
            base_url_override: None,
            timeout_secs: 15,
        },
    };
    let repo = build_repo(Some(&db_url)).await?;
    let gateway = KhaltiGateway::new(KhaltiSettings::from_config(&config))?;
    let server = HttpServer::new(
        AppState::new(repo, gateway, config),
        HttpServerConfig {
            port: port.to_string(),
        },
    )
    .await?;

    let handle = tokio::spawn(async move {
        server.run().await.expect("server run");
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let anon = StoreClient::new(&addr)?;
    let admin = anon
        .register(&RegisterRequest {
            name: "Admin".into(),
            email: "admin@example.com".into(),
            password: "admin-pass".into(),
            admin_secret: Some("example-admin".into()),
        })
        .await?;
    println!("Registered admin id={} role={:?}", admin.user.id, admin.user.role);
    let admin = anon.with_token(admin.token);

    let tee = admin
        .create_product(&ProductInput {
            name: "Graphic Tee".into(),
            description: "Soft cotton".into(),
            price: Decimal::new(1599, 0),
            images: vec!["https://picsum.photos/500".into()],
            sizes: vec!["S".into(), "M".into()],
            colors: vec!["White".into()],
            category: "Top Wear".into(),
            brand: "Example".into(),
            count_in_stock: 10,
        })
        .await?;
    println!("Created product id={} price={}", tee.id, tee.price);

    // Guest shops first, then signs up and merges.
    let guest_cart = anon
        .add_to_cart(&AddToCartRequest {
            product_id: tee.id,
            quantity: 2,
            size: Some("M".into()),
            color: Some("White".into()),
            guest_id: Some("guest_example".into()),
        })
        .await?;
    println!("Guest cart total={}", guest_cart.total_price());

    let buyer = anon
        .register(&RegisterRequest {
            name: "Buyer".into(),
            email: "buyer@example.com".into(),
            password: "buyer-pass".into(),
            admin_secret: None,
        })
        .await?;
    let buyer = anon.with_token(buyer.token);
    let merged = buyer.merge_cart("guest_example").await?;
    println!("Merged cart owner={} items={}", merged.owner, merged.item_count());

    let checkout = buyer
        .create_checkout(&CreateCheckoutRequest {
            checkout_items: None,
            shipping_address: ShippingAddress {
                address: "Thamel".into(),
                city: "Kathmandu".into(),
                postal_code: "44600".into(),
                country: "Nepal".into(),
                first_name: "Example".into(),
                last_name: "Buyer".into(),
                phone: "9841234567".into(),
            },
            payment_method: "Khalti".into(),
            total_price: None,
        })
        .await?;
    println!("Checkout id={} total={}", checkout.id, checkout.total_price);

    match buyer.initiate_khalti(checkout.id).await {
        Ok(session) => println!("Pay at {}", session.payment_url),
        Err(err) => println!("Payment initiation unavailable without KHALTI_SECRET_KEY: {err}"),
    }

    handle.abort();
    Ok(())
}
