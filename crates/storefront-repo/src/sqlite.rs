use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{Sqlite, SqliteConnectOptions};
use sqlx::{FromRow, SqlitePool};
use std::str::FromStr;
use storefront_types::domain::cart::{Cart, CartLine, CartOwner};
use storefront_types::domain::checkout::{Checkout, PaymentDetails, PaymentStatus};
use storefront_types::domain::order::{Order, OrderStatus};
use storefront_types::domain::product::Product;
use storefront_types::domain::user::{normalize_email, Role, User};
use storefront_types::ports::cart_repository::CartRepository;
use storefront_types::ports::checkout_repository::{CheckoutRepository, FinalizeOutcome};
use storefront_types::ports::order_repository::OrderRepository;
use storefront_types::ports::product_repository::ProductRepository;
use storefront_types::ports::user_repository::UserRepository;
use storefront_types::ports::RepoError;
use uuid::Uuid;

pub struct SqliteRepo {
    pool: SqlitePool,
}

fn db_err(e: impl std::fmt::Display) -> RepoError {
    RepoError::DbError(e.to_string())
}

fn write_err(e: sqlx::Error) -> RepoError {
    match &e {
        sqlx::Error::Database(d) if d.is_unique_violation() => {
            RepoError::Conflict(d.message().to_string())
        }
        _ => db_err(e),
    }
}

// Fixed-width timestamps so ORDER BY on the text column is chronological.
fn ts(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>, RepoError> {
    Ok(DateTime::parse_from_rfc3339(s)
        .map_err(db_err)?
        .with_timezone(&Utc))
}

fn parse_opt_ts(s: Option<String>) -> Result<Option<DateTime<Utc>>, RepoError> {
    s.as_deref().map(parse_ts).transpose()
}

fn parse_uuid(s: &str) -> Result<Uuid, RepoError> {
    Uuid::parse_str(s).map_err(db_err)
}

fn parse_decimal(s: &str) -> Result<Decimal, RepoError> {
    Decimal::from_str(s).map_err(db_err)
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, RepoError> {
    serde_json::to_string(value).map_err(db_err)
}

fn from_json<T: serde::de::DeserializeOwned>(s: &str) -> Result<T, RepoError> {
    serde_json::from_str(s).map_err(db_err)
}

#[derive(FromRow)]
struct DbCart {
    id: String,
    owner_kind: String,
    owner_id: String,
    lines_json: String,
    version: i64,
    created_at: String,
    updated_at: String,
}

impl DbCart {
    fn into_cart(self) -> Result<Cart, RepoError> {
        let owner = CartOwner::from_parts(&self.owner_kind, &self.owner_id).map_err(db_err)?;
        let lines: Vec<CartLine> = from_json(&self.lines_json)?;
        Ok(Cart::restore(
            parse_uuid(&self.id)?,
            owner,
            lines,
            self.version,
            parse_ts(&self.created_at)?,
            parse_ts(&self.updated_at)?,
        ))
    }
}

#[derive(FromRow)]
struct DbCheckout {
    id: String,
    user_id: String,
    items_json: String,
    shipping_json: String,
    payment_method: String,
    total_price: String,
    is_paid: bool,
    paid_at: Option<String>,
    payment_status: String,
    payment_details_json: Option<String>,
    pidx: Option<String>,
    is_finalized: bool,
    finalized_at: Option<String>,
    created_at: String,
    updated_at: String,
}

impl DbCheckout {
    fn into_checkout(self) -> Result<Checkout, RepoError> {
        let payment_status = PaymentStatus::parse(&self.payment_status)
            .ok_or_else(|| db_err(format!("unknown payment status {}", self.payment_status)))?;
        Ok(Checkout {
            id: parse_uuid(&self.id)?,
            user_id: parse_uuid(&self.user_id)?,
            checkout_items: from_json(&self.items_json)?,
            shipping_address: from_json(&self.shipping_json)?,
            payment_method: self.payment_method,
            total_price: parse_decimal(&self.total_price)?,
            is_paid: self.is_paid,
            paid_at: parse_opt_ts(self.paid_at)?,
            payment_status,
            payment_details: self
                .payment_details_json
                .as_deref()
                .map(from_json::<PaymentDetails>)
                .transpose()?,
            pidx: self.pidx,
            is_finalized: self.is_finalized,
            finalized_at: parse_opt_ts(self.finalized_at)?,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

#[derive(FromRow)]
struct DbOrder {
    id: String,
    user_id: String,
    checkout_id: String,
    items_json: String,
    shipping_json: String,
    payment_method: String,
    total_price: String,
    is_paid: bool,
    paid_at: Option<String>,
    is_delivered: bool,
    delivered_at: Option<String>,
    status: String,
    payment_status: String,
    payment_details_json: Option<String>,
    created_at: String,
    updated_at: String,
}

impl DbOrder {
    fn into_order(self) -> Result<Order, RepoError> {
        let status = OrderStatus::parse(&self.status).unwrap_or(OrderStatus::Processing);
        let payment_status = PaymentStatus::parse(&self.payment_status)
            .ok_or_else(|| db_err(format!("unknown payment status {}", self.payment_status)))?;
        Ok(Order {
            id: parse_uuid(&self.id)?,
            user_id: parse_uuid(&self.user_id)?,
            checkout_id: parse_uuid(&self.checkout_id)?,
            order_items: from_json(&self.items_json)?,
            shipping_address: from_json(&self.shipping_json)?,
            payment_method: self.payment_method,
            total_price: parse_decimal(&self.total_price)?,
            is_paid: self.is_paid,
            paid_at: parse_opt_ts(self.paid_at)?,
            is_delivered: self.is_delivered,
            delivered_at: parse_opt_ts(self.delivered_at)?,
            status,
            payment_status,
            payment_details: self
                .payment_details_json
                .as_deref()
                .map(from_json::<PaymentDetails>)
                .transpose()?,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

#[derive(FromRow)]
struct DbProduct {
    id: String,
    name: String,
    description: String,
    price: String,
    images_json: String,
    sizes_json: String,
    colors_json: String,
    category: String,
    brand: String,
    count_in_stock: i64,
    created_at: String,
    updated_at: String,
}

impl DbProduct {
    fn into_product(self) -> Result<Product, RepoError> {
        Ok(Product {
            id: parse_uuid(&self.id)?,
            name: self.name,
            description: self.description,
            price: parse_decimal(&self.price)?,
            images: from_json(&self.images_json)?,
            sizes: from_json(&self.sizes_json)?,
            colors: from_json(&self.colors_json)?,
            category: self.category,
            brand: self.brand,
            count_in_stock: u32::try_from(self.count_in_stock).map_err(db_err)?,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

#[derive(FromRow)]
struct DbUser {
    id: String,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    created_at: String,
}

impl DbUser {
    fn into_user(self) -> Result<User, RepoError> {
        let role = Role::parse(&self.role)
            .ok_or_else(|| db_err(format!("unknown role {}", self.role)))?;
        Ok(User {
            id: parse_uuid(&self.id)?,
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            role,
            created_at: parse_ts(&self.created_at)?,
        })
    }
}

const CART_COLUMNS: &str = "id, owner_kind, owner_id, lines_json, version, created_at, updated_at";
const CHECKOUT_COLUMNS: &str = "id, user_id, items_json, shipping_json, payment_method, total_price, is_paid, paid_at, payment_status, payment_details_json, pidx, is_finalized, finalized_at, created_at, updated_at";
const ORDER_COLUMNS: &str = "id, user_id, checkout_id, items_json, shipping_json, payment_method, total_price, is_paid, paid_at, is_delivered, delivered_at, status, payment_status, payment_details_json, created_at, updated_at";
const PRODUCT_COLUMNS: &str = "id, name, description, price, images_json, sizes_json, colors_json, category, brand, count_in_stock, created_at, updated_at";
const USER_COLUMNS: &str = "id, name, email, password_hash, role, created_at";

/// Compare-and-set on `version`; true when the row was written.
async fn update_cart_row<'e, E>(exec: E, cart: &Cart) -> Result<bool, RepoError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let res = sqlx::query(
        "UPDATE carts SET lines_json = ?, version = version + 1, updated_at = ?
         WHERE id = ? AND owner_kind = ? AND owner_id = ? AND version = ?",
    )
    .bind(to_json(&cart.lines())?)
    .bind(ts(&cart.updated_at))
    .bind(cart.id.to_string())
    .bind(cart.owner.kind())
    .bind(cart.owner.key())
    .bind(cart.version)
    .execute(exec)
    .await
    .map_err(db_err)?;
    Ok(res.rows_affected() == 1)
}

async fn insert_order_row<'e, E>(exec: E, order: &Order) -> Result<(), RepoError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT INTO orders (id, user_id, checkout_id, items_json, shipping_json, payment_method, total_price, is_paid, paid_at, is_delivered, delivered_at, status, payment_status, payment_details_json, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(order.id.to_string())
    .bind(order.user_id.to_string())
    .bind(order.checkout_id.to_string())
    .bind(to_json(&order.order_items)?)
    .bind(to_json(&order.shipping_address)?)
    .bind(&order.payment_method)
    .bind(order.total_price.to_string())
    .bind(order.is_paid)
    .bind(order.paid_at.as_ref().map(ts))
    .bind(order.is_delivered)
    .bind(order.delivered_at.as_ref().map(ts))
    .bind(format!("{:?}", order.status))
    .bind(order.payment_status.as_str())
    .bind(order.payment_details.as_ref().map(to_json).transpose()?)
    .bind(ts(&order.created_at))
    .bind(ts(&order.updated_at))
    .execute(exec)
    .await
    .map_err(write_err)?;
    Ok(())
}

impl SqliteRepo {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;

        let ddl = include_str!("../migrations/0001_create_storefront.sql");
        for statement in ddl.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement).execute(&pool).await?;
        }

        Ok(Self { pool })
    }

    async fn fetch_cart(&self, owner: &CartOwner) -> Result<Option<Cart>, RepoError> {
        let row: Option<DbCart> = sqlx::query_as(&format!(
            "SELECT {CART_COLUMNS} FROM carts WHERE owner_kind = ? AND owner_id = ?"
        ))
        .bind(owner.kind())
        .bind(owner.key())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(DbCart::into_cart).transpose()
    }
}

#[async_trait]
impl CartRepository for SqliteRepo {
    async fn find_cart(&self, owner: &CartOwner) -> Result<Option<Cart>, RepoError> {
        self.fetch_cart(owner).await
    }

    async fn insert_cart(&self, cart: Cart) -> Result<Cart, RepoError> {
        sqlx::query(
            "INSERT INTO carts (id, owner_kind, owner_id, lines_json, version, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(cart.id.to_string())
        .bind(cart.owner.kind())
        .bind(cart.owner.key())
        .bind(to_json(&cart.lines())?)
        .bind(cart.version)
        .bind(ts(&cart.created_at))
        .bind(ts(&cart.updated_at))
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        Ok(cart)
    }

    async fn save_cart(&self, mut cart: Cart) -> Result<Cart, RepoError> {
        if !update_cart_row(&self.pool, &cart).await? {
            return Err(RepoError::Conflict(format!(
                "cart {} changed concurrently",
                cart.id
            )));
        }
        cart.version += 1;
        Ok(cart)
    }

    async fn save_merged_cart(&self, mut cart: Cart, absorbed: &Cart) -> Result<Cart, RepoError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        if !update_cart_row(&mut *tx, &cart).await? {
            return Err(RepoError::Conflict(format!(
                "cart {} changed concurrently",
                cart.id
            )));
        }
        let removed = sqlx::query(
            "DELETE FROM carts WHERE id = ? AND owner_kind = ? AND owner_id = ? AND version = ?",
        )
        .bind(absorbed.id.to_string())
        .bind(absorbed.owner.kind())
        .bind(absorbed.owner.key())
        .bind(absorbed.version)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        if removed.rows_affected() != 1 {
            // Dropping `tx` rolls back the user cart update.
            return Err(RepoError::Conflict(format!(
                "cart {} changed concurrently",
                absorbed.id
            )));
        }
        tx.commit().await.map_err(db_err)?;
        cart.version += 1;
        Ok(cart)
    }

    async fn reassign_cart(
        &self,
        from: &CartOwner,
        to: CartOwner,
    ) -> Result<Option<Cart>, RepoError> {
        let res = sqlx::query(
            "UPDATE carts SET owner_kind = ?, owner_id = ?, version = version + 1, updated_at = ?
             WHERE owner_kind = ? AND owner_id = ?",
        )
        .bind(to.kind())
        .bind(to.key())
        .bind(ts(&Utc::now()))
        .bind(from.kind())
        .bind(from.key())
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        if res.rows_affected() == 0 {
            return Ok(None);
        }
        self.fetch_cart(&to).await
    }

    async fn delete_cart(&self, owner: &CartOwner) -> Result<bool, RepoError> {
        let res = sqlx::query("DELETE FROM carts WHERE owner_kind = ? AND owner_id = ?")
            .bind(owner.kind())
            .bind(owner.key())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(res.rows_affected() > 0)
    }
}

#[async_trait]
impl CheckoutRepository for SqliteRepo {
    async fn create_checkout(&self, checkout: Checkout) -> Result<Checkout, RepoError> {
        sqlx::query(
            "INSERT INTO checkouts (id, user_id, items_json, shipping_json, payment_method, total_price, is_paid, paid_at, payment_status, payment_details_json, pidx, is_finalized, finalized_at, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(checkout.id.to_string())
        .bind(checkout.user_id.to_string())
        .bind(to_json(&checkout.checkout_items)?)
        .bind(to_json(&checkout.shipping_address)?)
        .bind(&checkout.payment_method)
        .bind(checkout.total_price.to_string())
        .bind(checkout.is_paid)
        .bind(checkout.paid_at.as_ref().map(ts))
        .bind(checkout.payment_status.as_str())
        .bind(checkout.payment_details.as_ref().map(to_json).transpose()?)
        .bind(&checkout.pidx)
        .bind(checkout.is_finalized)
        .bind(checkout.finalized_at.as_ref().map(ts))
        .bind(ts(&checkout.created_at))
        .bind(ts(&checkout.updated_at))
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        Ok(checkout)
    }

    async fn get_checkout(&self, id: Uuid) -> Result<Option<Checkout>, RepoError> {
        let row: Option<DbCheckout> =
            sqlx::query_as(&format!("SELECT {CHECKOUT_COLUMNS} FROM checkouts WHERE id = ?"))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        row.map(DbCheckout::into_checkout).transpose()
    }

    async fn find_checkout_by_pidx(&self, pidx: &str) -> Result<Option<Checkout>, RepoError> {
        let row: Option<DbCheckout> =
            sqlx::query_as(&format!("SELECT {CHECKOUT_COLUMNS} FROM checkouts WHERE pidx = ?"))
                .bind(pidx)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        row.map(DbCheckout::into_checkout).transpose()
    }

    async fn record_payment_initiated(
        &self,
        id: Uuid,
        pidx: &str,
    ) -> Result<Option<Checkout>, RepoError> {
        sqlx::query(
            "UPDATE checkouts SET pidx = ?, payment_status = ?, updated_at = ?
             WHERE id = ? AND is_paid = 0",
        )
        .bind(pidx)
        .bind(PaymentStatus::Initiated.as_str())
        .bind(ts(&Utc::now()))
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        self.get_checkout(id).await
    }

    async fn record_payment_completed(
        &self,
        id: Uuid,
        details: PaymentDetails,
        paid_at: DateTime<Utc>,
    ) -> Result<Option<Checkout>, RepoError> {
        sqlx::query(
            "UPDATE checkouts SET is_paid = 1, paid_at = ?, payment_status = ?, payment_details_json = ?, updated_at = ?
             WHERE id = ? AND is_paid = 0",
        )
        .bind(ts(&paid_at))
        .bind(PaymentStatus::Paid.as_str())
        .bind(to_json(&details)?)
        .bind(ts(&paid_at))
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        self.get_checkout(id).await
    }

    async fn record_payment_failed(
        &self,
        id: Uuid,
        details: PaymentDetails,
    ) -> Result<Option<Checkout>, RepoError> {
        sqlx::query(
            "UPDATE checkouts SET payment_status = ?, payment_details_json = ?, updated_at = ?
             WHERE id = ? AND is_paid = 0",
        )
        .bind(PaymentStatus::Failed.as_str())
        .bind(to_json(&details)?)
        .bind(ts(&Utc::now()))
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        self.get_checkout(id).await
    }

    async fn finalize_checkout(
        &self,
        id: Uuid,
        order: Order,
        finalized_at: DateTime<Utc>,
    ) -> Result<FinalizeOutcome, RepoError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // The conditional update is the guard: only one caller can flip the flag.
        let flipped = sqlx::query(
            "UPDATE checkouts SET is_finalized = 1, finalized_at = ?, updated_at = ?
             WHERE id = ? AND is_paid = 1 AND is_finalized = 0",
        )
        .bind(ts(&finalized_at))
        .bind(ts(&finalized_at))
        .bind(id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        if flipped.rows_affected() == 0 {
            let flags: Option<(bool, bool)> =
                sqlx::query_as("SELECT is_paid, is_finalized FROM checkouts WHERE id = ?")
                    .bind(id.to_string())
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(db_err)?;
            tx.rollback().await.map_err(db_err)?;
            return Ok(match flags {
                None => FinalizeOutcome::NotFound,
                Some((_, true)) => FinalizeOutcome::AlreadyFinalized,
                Some(_) => FinalizeOutcome::NotPaid,
            });
        }

        insert_order_row(&mut *tx, &order).await?;
        sqlx::query("DELETE FROM carts WHERE owner_kind = 'user' AND owner_id = ?")
            .bind(order.user_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;
        Ok(FinalizeOutcome::Finalized(order))
    }
}

#[async_trait]
impl OrderRepository for SqliteRepo {
    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, RepoError> {
        let row: Option<DbOrder> =
            sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?"))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        row.map(DbOrder::into_order).transpose()
    }

    async fn find_order_by_checkout(&self, checkout_id: Uuid) -> Result<Option<Order>, RepoError> {
        let row: Option<DbOrder> =
            sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE checkout_id = ?"))
                .bind(checkout_id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        row.map(DbOrder::into_order).transpose()
    }

    async fn list_orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, RepoError> {
        let rows: Vec<DbOrder> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = ? ORDER BY created_at DESC"
        ))
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter()
            .map(DbOrder::into_order)
            .collect::<Result<Vec<_>, _>>()
    }

    async fn list_orders(&self) -> Result<Vec<Order>, RepoError> {
        let rows: Vec<DbOrder> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter()
            .map(DbOrder::into_order)
            .collect::<Result<Vec<_>, _>>()
    }

    async fn update_order_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Option<Order>, RepoError> {
        let Some(mut order) = self.get_order(id).await? else {
            return Ok(None);
        };
        order.update_status(status);
        sqlx::query(
            "UPDATE orders SET status = ?, is_delivered = ?, delivered_at = ?, updated_at = ? WHERE id = ?",
        )
        .bind(format!("{:?}", order.status))
        .bind(order.is_delivered)
        .bind(order.delivered_at.as_ref().map(ts))
        .bind(ts(&order.updated_at))
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(Some(order))
    }
}

#[async_trait]
impl ProductRepository for SqliteRepo {
    async fn create_product(&self, product: Product) -> Result<Product, RepoError> {
        sqlx::query(
            "INSERT INTO products (id, name, description, price, images_json, sizes_json, colors_json, category, brand, count_in_stock, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(product.id.to_string())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.to_string())
        .bind(to_json(&product.images)?)
        .bind(to_json(&product.sizes)?)
        .bind(to_json(&product.colors)?)
        .bind(&product.category)
        .bind(&product.brand)
        .bind(i64::from(product.count_in_stock))
        .bind(ts(&product.created_at))
        .bind(ts(&product.updated_at))
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        Ok(product)
    }

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, RepoError> {
        let row: Option<DbProduct> =
            sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?"))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        row.map(DbProduct::into_product).transpose()
    }

    async fn list_products(&self) -> Result<Vec<Product>, RepoError> {
        let rows: Vec<DbProduct> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter()
            .map(DbProduct::into_product)
            .collect::<Result<Vec<_>, _>>()
    }

    async fn update_product(&self, product: Product) -> Result<Option<Product>, RepoError> {
        let res = sqlx::query(
            "UPDATE products SET name = ?, description = ?, price = ?, images_json = ?, sizes_json = ?, colors_json = ?, category = ?, brand = ?, count_in_stock = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.to_string())
        .bind(to_json(&product.images)?)
        .bind(to_json(&product.sizes)?)
        .bind(to_json(&product.colors)?)
        .bind(&product.category)
        .bind(&product.brand)
        .bind(i64::from(product.count_in_stock))
        .bind(ts(&product.updated_at))
        .bind(product.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        if res.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some(product))
    }

    async fn delete_product(&self, id: Uuid) -> Result<bool, RepoError> {
        let res = sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(res.rows_affected() > 0)
    }
}

#[async_trait]
impl UserRepository for SqliteRepo {
    async fn create_user(&self, user: User) -> Result<User, RepoError> {
        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, role, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(user.id.to_string())
        .bind(&user.name)
        .bind(normalize_email(&user.email))
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(ts(&user.created_at))
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        let row: Option<DbUser> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        row.map(DbUser::into_user).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let row: Option<DbUser> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
                .bind(normalize_email(email))
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        row.map(DbUser::into_user).transpose()
    }
}
