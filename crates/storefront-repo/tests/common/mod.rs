#![allow(dead_code)]

use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use storefront_types::domain::cart::{Cart, CartLine, CartOwner};
use storefront_types::domain::checkout::{Checkout, PaymentDetails, PaymentStatus, ShippingAddress};
use storefront_types::domain::order::{Order, OrderStatus};
use storefront_types::domain::product::{Product, ProductInput};
use storefront_types::domain::user::{Role, User};
use storefront_types::ports::checkout_repository::FinalizeOutcome;
use storefront_types::ports::{RepoError, Store};
use uuid::Uuid;

pub fn line(product_id: Uuid, price: i64, qty: u32) -> CartLine {
    CartLine {
        product_id,
        name: "Widget".into(),
        image_ref: "widget.png".into(),
        unit_price: Decimal::from(price),
        quantity: qty,
        size: Some("M".into()),
        color: None,
    }
}

pub fn address() -> ShippingAddress {
    ShippingAddress {
        address: "New Road".into(),
        city: "Kathmandu".into(),
        postal_code: "44600".into(),
        country: "Nepal".into(),
        first_name: "Test".into(),
        last_name: "User".into(),
        phone: "9841234567".into(),
    }
}

pub fn checkout_for(user_id: Uuid) -> Checkout {
    Checkout::new(
        user_id,
        vec![line(Uuid::new_v4(), 500, 2), line(Uuid::new_v4(), 1000, 1)],
        address(),
        "khalti".into(),
        None,
    )
    .unwrap()
}

pub fn completed(pidx: &str) -> PaymentDetails {
    PaymentDetails {
        pidx: pidx.into(),
        transaction_id: Some("txn-1".into()),
        gateway_status: "Completed".into(),
        amount_minor: 200_000,
    }
}

pub async fn cart_versioning<R: Store>(repo: &R) {
    let owner = CartOwner::User(Uuid::new_v4());
    let mut cart = Cart::new(owner.clone());
    cart.add_line(line(Uuid::new_v4(), 100, 1)).unwrap();
    let inserted = repo.insert_cart(cart.clone()).await.unwrap();
    assert_eq!(inserted.version, 0);

    let dup = repo.insert_cart(Cart::new(owner.clone())).await;
    assert!(matches!(dup, Err(RepoError::Conflict(_))));

    let mut first = repo.find_cart(&owner).await.unwrap().unwrap();
    let stale = first.clone();
    first.add_line(line(Uuid::new_v4(), 50, 2)).unwrap();
    let saved = repo.save_cart(first).await.unwrap();
    assert_eq!(saved.version, 1);

    let lost = repo.save_cart(stale).await;
    assert!(matches!(lost, Err(RepoError::Conflict(_))));

    let fetched = repo.find_cart(&owner).await.unwrap().unwrap();
    assert_eq!(fetched.version, 1);
    assert_eq!(fetched.lines().len(), 2);
    assert_eq!(fetched.total_price(), Decimal::from(200));

    assert!(repo.delete_cart(&owner).await.unwrap());
    assert!(repo.find_cart(&owner).await.unwrap().is_none());
    assert!(!repo.delete_cart(&owner).await.unwrap());
}

pub async fn cart_merge_and_reassign<R: Store>(repo: &R) {
    let guest = CartOwner::Guest(format!("guest_{}", Uuid::new_v4()));
    let user = CartOwner::User(Uuid::new_v4());

    let mut guest_cart = Cart::new(guest.clone());
    guest_cart.add_line(line(Uuid::new_v4(), 10, 3)).unwrap();
    repo.insert_cart(guest_cart).await.unwrap();

    let moved = repo.reassign_cart(&guest, user.clone()).await.unwrap().unwrap();
    assert_eq!(moved.owner, user);
    assert_eq!(moved.total_price(), Decimal::from(30));
    assert!(repo.find_cart(&guest).await.unwrap().is_none());
    assert!(repo
        .reassign_cart(&guest, user.clone())
        .await
        .unwrap()
        .is_none());

    let second_guest = CartOwner::Guest(format!("guest_{}", Uuid::new_v4()));
    let mut other = Cart::new(second_guest.clone());
    other.add_line(line(Uuid::new_v4(), 5, 1)).unwrap();
    repo.insert_cart(other.clone()).await.unwrap();
    let clash = repo.reassign_cart(&second_guest, user.clone()).await;
    assert!(matches!(clash, Err(RepoError::Conflict(_))));
    assert!(repo.find_cart(&second_guest).await.unwrap().is_some());

    let mut user_cart = repo.find_cart(&user).await.unwrap().unwrap();
    user_cart.absorb(other.lines().to_vec());
    let merged = repo.save_merged_cart(user_cart, &other).await.unwrap();
    assert_eq!(merged.total_price(), Decimal::from(35));
    assert!(repo.find_cart(&second_guest).await.unwrap().is_none());
}

pub async fn merge_rejects_changed_guest_cart<R: Store>(repo: &R) {
    let guest = CartOwner::Guest(format!("guest_{}", Uuid::new_v4()));
    let user = CartOwner::User(Uuid::new_v4());

    let mut user_cart = Cart::new(user.clone());
    user_cart.add_line(line(Uuid::new_v4(), 100, 1)).unwrap();
    repo.insert_cart(user_cart).await.unwrap();
    let mut guest_cart = Cart::new(guest.clone());
    guest_cart.add_line(line(Uuid::new_v4(), 10, 2)).unwrap();
    let seen_guest = repo.insert_cart(guest_cart).await.unwrap();

    // The guest keeps shopping after the merge read its cart.
    let mut live = repo.find_cart(&guest).await.unwrap().unwrap();
    live.add_line(line(Uuid::new_v4(), 50, 3)).unwrap();
    repo.save_cart(live).await.unwrap();

    let seen_user = repo.find_cart(&user).await.unwrap().unwrap();
    let mut merged = seen_user.clone();
    merged.absorb(seen_guest.lines().to_vec());
    let stale = repo.save_merged_cart(merged, &seen_guest).await;
    assert!(matches!(stale, Err(RepoError::Conflict(_))));

    let user_after = repo.find_cart(&user).await.unwrap().unwrap();
    assert_eq!(user_after.version, seen_user.version);
    assert_eq!(user_after.total_price(), Decimal::from(100));
    let guest_after = repo.find_cart(&guest).await.unwrap().unwrap();
    assert_eq!(guest_after.lines().len(), 2);

    let mut merged = user_after;
    merged.absorb(guest_after.lines().to_vec());
    let merged = repo.save_merged_cart(merged, &guest_after).await.unwrap();
    assert_eq!(merged.total_price(), Decimal::from(270));
    assert!(repo.find_cart(&guest).await.unwrap().is_none());
}

pub async fn checkout_payment_transitions<R: Store>(repo: &R) {
    let checkout = repo.create_checkout(checkout_for(Uuid::new_v4())).await.unwrap();

    let initiated = repo
        .record_payment_initiated(checkout.id, "pidx-a")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(initiated.pidx.as_deref(), Some("pidx-a"));
    assert_eq!(initiated.payment_status, PaymentStatus::Initiated);

    let by_pidx = repo.find_checkout_by_pidx("pidx-a").await.unwrap().unwrap();
    assert_eq!(by_pidx.id, checkout.id);

    let failed = repo
        .record_payment_failed(
            checkout.id,
            PaymentDetails {
                gateway_status: "Expired".into(),
                ..completed("pidx-a")
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(failed.payment_status, PaymentStatus::Failed);
    assert!(!failed.is_paid);

    repo.record_payment_initiated(checkout.id, "pidx-b")
        .await
        .unwrap();
    let paid_at = Utc::now();
    let paid = repo
        .record_payment_completed(checkout.id, completed("pidx-b"), paid_at)
        .await
        .unwrap()
        .unwrap();
    assert!(paid.is_paid);
    assert_eq!(paid.payment_status, PaymentStatus::Paid);
    assert_eq!(paid.payment_details.unwrap().pidx, "pidx-b");

    // Paid checkouts ignore later payment writes.
    let again = repo
        .record_payment_initiated(checkout.id, "pidx-c")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(again.pidx.as_deref(), Some("pidx-b"));
    assert!(again.is_paid);

    let missing = repo
        .record_payment_completed(Uuid::new_v4(), completed("x"), Utc::now())
        .await
        .unwrap();
    assert!(missing.is_none());
}

pub async fn finalize_flow<R: Store>(repo: &R) {
    let user_id = Uuid::new_v4();
    let mut cart = Cart::new(CartOwner::User(user_id));
    cart.add_line(line(Uuid::new_v4(), 500, 2)).unwrap();
    repo.insert_cart(cart).await.unwrap();

    let checkout = repo.create_checkout(checkout_for(user_id)).await.unwrap();

    let mut unpaid = checkout.clone();
    unpaid.is_paid = true;
    let premature = repo
        .finalize_checkout(checkout.id, Order::from_checkout(&unpaid).unwrap(), Utc::now())
        .await
        .unwrap();
    assert!(matches!(premature, FinalizeOutcome::NotPaid));
    assert!(repo.find_order_by_checkout(checkout.id).await.unwrap().is_none());

    let paid = repo
        .record_payment_completed(checkout.id, completed("p"), Utc::now())
        .await
        .unwrap()
        .unwrap();
    let order = Order::from_checkout(&paid).unwrap();
    let outcome = repo
        .finalize_checkout(checkout.id, order.clone(), Utc::now())
        .await
        .unwrap();
    let FinalizeOutcome::Finalized(created) = outcome else {
        panic!("expected finalized outcome");
    };
    assert_eq!(created.id, order.id);
    assert!(repo.find_cart(&CartOwner::User(user_id)).await.unwrap().is_none());

    let stored = repo.get_checkout(checkout.id).await.unwrap().unwrap();
    assert!(stored.is_finalized);
    assert!(stored.finalized_at.is_some());

    let twice = repo
        .finalize_checkout(checkout.id, Order::from_checkout(&paid).unwrap(), Utc::now())
        .await
        .unwrap();
    assert!(matches!(twice, FinalizeOutcome::AlreadyFinalized));

    let missing = repo
        .finalize_checkout(Uuid::new_v4(), order, Utc::now())
        .await
        .unwrap();
    assert!(matches!(missing, FinalizeOutcome::NotFound));

    let mine = repo.list_orders_for_user(user_id).await.unwrap();
    assert_eq!(mine.len(), 1);
    let found = repo.find_order_by_checkout(checkout.id).await.unwrap().unwrap();
    assert_eq!(found.id, created.id);
}

pub async fn concurrent_finalize_creates_one_order<R: Store>(repo: Arc<R>) {
    let user_id = Uuid::new_v4();
    let checkout = repo.create_checkout(checkout_for(user_id)).await.unwrap();
    let paid = repo
        .record_payment_completed(checkout.id, completed("race"), Utc::now())
        .await
        .unwrap()
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let repo = repo.clone();
        let order = Order::from_checkout(&paid).unwrap();
        handles.push(tokio::spawn(async move {
            repo.finalize_checkout(checkout.id, order, Utc::now()).await
        }));
    }
    let mut finalized = 0;
    for h in handles {
        if let FinalizeOutcome::Finalized(_) = h.await.unwrap().unwrap() {
            finalized += 1;
        }
    }
    assert_eq!(finalized, 1);
    assert_eq!(repo.list_orders_for_user(user_id).await.unwrap().len(), 1);
}

pub async fn order_status_updates<R: Store>(repo: &R) {
    let user_id = Uuid::new_v4();
    let checkout = repo.create_checkout(checkout_for(user_id)).await.unwrap();
    let paid = repo
        .record_payment_completed(checkout.id, completed("s"), Utc::now())
        .await
        .unwrap()
        .unwrap();
    let order = Order::from_checkout(&paid).unwrap();
    repo.finalize_checkout(checkout.id, order.clone(), Utc::now())
        .await
        .unwrap();

    let delivered = repo
        .update_order_status(order.id, OrderStatus::Delivered)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(delivered.status, OrderStatus::Delivered);
    assert!(delivered.is_delivered);

    let fetched = repo.get_order(order.id).await.unwrap().unwrap();
    assert!(fetched.delivered_at.is_some());
    assert_eq!(fetched.total_price, Decimal::from(2000));

    let all = repo.list_orders().await.unwrap();
    assert!(all.iter().any(|o| o.id == order.id));

    assert!(repo
        .update_order_status(Uuid::new_v4(), OrderStatus::Shipped)
        .await
        .unwrap()
        .is_none());
}

pub async fn products_and_users<R: Store>(repo: &R) {
    let product = Product::new(ProductInput {
        name: "Jacket".into(),
        description: "Down jacket".into(),
        price: Decimal::new(499_950, 2),
        images: vec!["jacket.png".into()],
        sizes: vec!["L".into()],
        colors: vec!["red".into()],
        category: "Outerwear".into(),
        brand: "Yeti".into(),
        count_in_stock: 3,
    })
    .unwrap();
    repo.create_product(product.clone()).await.unwrap();
    let fetched = repo.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(fetched.price, Decimal::new(499_950, 2));
    assert_eq!(fetched.images, vec!["jacket.png".to_string()]);

    let mut changed = fetched.clone();
    changed.count_in_stock = 0;
    assert!(repo.update_product(changed).await.unwrap().is_some());
    assert_eq!(repo.get_product(product.id).await.unwrap().unwrap().count_in_stock, 0);
    assert_eq!(repo.list_products().await.unwrap().len(), 1);
    assert!(repo.delete_product(product.id).await.unwrap());
    assert!(repo.get_product(product.id).await.unwrap().is_none());

    let user = User::new("Asha".into(), "asha@example.com", "hash".into(), Role::Customer).unwrap();
    repo.create_user(user.clone()).await.unwrap();
    let dup = User::new("Other".into(), "ASHA@example.com", "hash".into(), Role::Customer).unwrap();
    assert!(matches!(repo.create_user(dup).await, Err(RepoError::Conflict(_))));
    let by_email = repo.find_user_by_email("Asha@Example.com").await.unwrap().unwrap();
    assert_eq!(by_email.id, user.id);
    assert_eq!(by_email.password_hash, "hash");
    assert!(repo.get_user(Uuid::new_v4()).await.unwrap().is_none());
}
