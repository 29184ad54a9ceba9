pub mod address_service;
pub mod admin_service;
pub mod auth_service;
pub mod cart_service;
pub mod favorite_service;
pub mod lookup_service;
pub mod order_service;
pub mod product_detail_service;
pub mod product_service;
pub mod user_service;
pub mod voucher_service;
