pub mod addresses;
pub mod cart_items;
pub mod email_outbox;
pub mod favorites;
pub mod order_details;
pub mod orders;
pub mod password_reset_tokens;
pub mod pending_registrations;
pub mod product_details;
pub mod products;
pub mod status_orders;
pub mod users;
pub mod vouchers;

pub use addresses::Entity as Addresses;
pub use cart_items::Entity as CartItems;
pub use email_outbox::Entity as EmailOutbox;
pub use favorites::Entity as Favorites;
pub use order_details::Entity as OrderDetails;
pub use orders::Entity as Orders;
pub use password_reset_tokens::Entity as PasswordResetTokens;
pub use pending_registrations::Entity as PendingRegistrations;
pub use product_details::Entity as ProductDetails;
pub use products::Entity as Products;
pub use status_orders::Entity as StatusOrders;
pub use users::Entity as Users;
pub use vouchers::Entity as Vouchers;
