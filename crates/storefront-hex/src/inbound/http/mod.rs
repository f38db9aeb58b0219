mod cart;
mod checkout;
pub mod extract;
mod orders;
mod products;
mod server;
mod users;

pub use server::{AppState, HttpServer, HttpServerConfig};

use crate::errors::AppError;
use uuid::Uuid;

fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|e| AppError::BadRequest(e.to_string()))
}
