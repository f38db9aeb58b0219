pub mod cart;
pub mod checkout;
pub mod money;
pub mod order;
pub mod phone;
pub mod product;
pub mod user;
