#![cfg(feature = "memory")]

mod common;

use std::sync::Arc;
use storefront_repo::memory::InMemoryRepo;

#[tokio::test]
async fn memory_repo_cart_versioning() {
    common::cart_versioning(&InMemoryRepo::new()).await;
}

#[tokio::test]
async fn memory_repo_cart_merge_and_reassign() {
    common::cart_merge_and_reassign(&InMemoryRepo::new()).await;
}

#[tokio::test]
async fn memory_repo_merge_rejects_changed_guest_cart() {
    common::merge_rejects_changed_guest_cart(&InMemoryRepo::new()).await;
}

#[tokio::test]
async fn memory_repo_checkout_payment_transitions() {
    common::checkout_payment_transitions(&InMemoryRepo::new()).await;
}

#[tokio::test]
async fn memory_repo_finalize_flow() {
    common::finalize_flow(&InMemoryRepo::new()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn memory_repo_concurrent_finalize() {
    common::concurrent_finalize_creates_one_order(Arc::new(InMemoryRepo::new())).await;
}

#[tokio::test]
async fn memory_repo_order_status_updates() {
    common::order_status_updates(&InMemoryRepo::new()).await;
}

#[tokio::test]
async fn memory_repo_products_and_users() {
    common::products_and_users(&InMemoryRepo::new()).await;
}
