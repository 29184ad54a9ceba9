use axum::Router;

use crate::{services::lookup_service::LookupKind, state::AppState};

pub mod addresses;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod doc;
pub mod favorites;
pub mod health;
pub mod lookups;
pub mod orders;
pub mod params;
pub mod product_details;
pub mod products;
pub mod users;
pub mod vouchers;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/roles", lookups::router(LookupKind::Role))
        .nest("/brands", lookups::router(LookupKind::Brand))
        .nest("/product-categories", lookups::router(LookupKind::Category))
        .nest("/product-colors", lookups::router(LookupKind::Color))
        .nest("/product-sizes", lookups::router(LookupKind::Size))
        .nest("/product-weights", lookups::router(LookupKind::Weight))
        .nest("/products", products::router())
        .nest("/product-details", product_details::router())
        .nest("/cart", cart::router())
        .nest("/checkout", orders::checkout_router())
        .nest("/orders", orders::router())
        .nest("/vouchers", vouchers::router())
        .nest("/addresses", addresses::router())
        .nest("/favorites", favorites::router())
        .nest("/admin", admin::router())
}
