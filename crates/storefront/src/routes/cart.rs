//! Cart route handlers.
//!
//! Every handler goes through [`CartSession`], so it only ever sees the cart
//! of the account behind the session. Reads share the cart's lock; writes
//! take it exclusively.

use std::str::FromStr;

use axum::{
    Json,
    extract::Path,
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, instrument};

use adak_core::{CartItem, CartProduct, CartSnapshot, ProductId};

use crate::error::{AppError, Result};
use crate::middleware::CartSession;

/// Cart size response.
#[derive(Debug, Serialize)]
pub struct SizeResponse {
    pub size: usize,
}

fn parse_path<T: FromStr>(what: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("invalid {what}: {raw}")))
}

/// The whole cart.
///
/// GET /cart
#[instrument(skip_all, fields(user_id = %session.user.id))]
pub async fn show(session: CartSession) -> Json<CartSnapshot> {
    Json(session.cart.read().checkout())
}

/// Items only.
///
/// GET /cart/items
#[instrument(skip_all, fields(user_id = %session.user.id))]
pub async fn items(session: CartSession) -> Json<Vec<CartItem>> {
    Json(session.cart.read().items())
}

/// Number of distinct products.
///
/// GET /cart/size
#[instrument(skip_all, fields(user_id = %session.user.id))]
pub async fn size(session: CartSession) -> Json<SizeResponse> {
    Json(SizeResponse {
        size: session.cart.read().size(),
    })
}

/// Checkout snapshot. The cart is left as it is.
///
/// GET /cart/checkout
#[instrument(skip_all, fields(user_id = %session.user.id))]
pub async fn checkout(session: CartSession) -> Json<CartSnapshot> {
    let snapshot = session.cart.read().checkout();
    info!(
        size = snapshot.size,
        total = %snapshot.totals.total,
        "cart checked out"
    );
    Json(snapshot)
}

/// Add `quantity` of a product. The body carries the product's unit values.
///
/// POST /cart/add/{quantity}
///
/// # Errors
///
/// Returns 400 for a non-numeric or non-positive quantity.
#[instrument(skip(session, product), fields(user_id = %session.user.id, product_id = %product.id))]
pub async fn add(
    session: CartSession,
    Path(quantity): Path<String>,
    Json(product): Json<CartProduct>,
) -> Result<Json<CartItem>> {
    let quantity: Decimal = parse_path("quantity", &quantity)?;
    let mut cart = session.cart.write();
    let item = cart.add(product, quantity)?;
    Ok(Json(item.clone()))
}

/// Remove a product.
///
/// DELETE /cart/items/{product_id}
///
/// # Errors
///
/// Returns 404 if the product is not in the cart.
#[instrument(skip(session), fields(user_id = %session.user.id))]
pub async fn remove(session: CartSession, Path(product_id): Path<String>) -> Result<StatusCode> {
    let product_id: ProductId = parse_path("product id", &product_id)?;
    session.cart.write().remove(product_id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Empty the cart.
///
/// POST /cart/reset
#[instrument(skip_all, fields(user_id = %session.user.id))]
pub async fn reset(session: CartSession) -> StatusCode {
    session.cart.write().reset();
    StatusCode::NO_CONTENT
}

/// GET /cart/brand/{brand}
#[instrument(skip(session), fields(user_id = %session.user.id))]
pub async fn by_brand(session: CartSession, Path(brand): Path<String>) -> Json<Vec<CartItem>> {
    Json(session.cart.read().filter_by_brand(&brand))
}

/// GET /cart/category/{category}
#[instrument(skip(session), fields(user_id = %session.user.id))]
pub async fn by_category(
    session: CartSession,
    Path(category): Path<String>,
) -> Json<Vec<CartItem>> {
    Json(session.cart.read().filter_by_category(&category))
}

/// GET /cart/type/{type}
#[instrument(skip(session), fields(user_id = %session.user.id))]
pub async fn by_type(
    session: CartSession,
    Path(product_type): Path<String>,
) -> Json<Vec<CartItem>> {
    Json(session.cart.read().filter_by_type(&product_type))
}

/// Items whose line total lies in `[min, max]`.
///
/// GET /cart/total/{min}/{max}
///
/// # Errors
///
/// Returns 400 for non-numeric bounds or `min > max`.
#[instrument(skip(session), fields(user_id = %session.user.id))]
pub async fn by_total(
    session: CartSession,
    Path((min, max)): Path<(String, String)>,
) -> Result<Json<Vec<CartItem>>> {
    let min: Decimal = parse_path("min", &min)?;
    let max: Decimal = parse_path("max", &max)?;
    Ok(Json(session.cart.read().filter_by_total_range(min, max)?))
}

/// Items whose line weight lies in `[min, max]`.
///
/// GET /cart/weight/{min}/{max}
///
/// # Errors
///
/// Returns 400 for non-numeric bounds or `min > max`.
#[instrument(skip(session), fields(user_id = %session.user.id))]
pub async fn by_weight(
    session: CartSession,
    Path((min, max)): Path<(String, String)>,
) -> Result<Json<Vec<CartItem>>> {
    let min: Decimal = parse_path("min", &min)?;
    let max: Decimal = parse_path("max", &max)?;
    Ok(Json(session.cart.read().filter_by_weight_range(min, max)?))
}
