use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        addresses::{AddressList, AddressRequest},
        auth::{
            FacebookLoginRequest, ForgotPasswordRequest, GoogleLoginRequest, LoginRequest,
            LoginResponse, PendingRegistration, RegisterRequest, ResendOtpRequest,
            ResetPasswordRequest, VerifyOtpRequest,
        },
        cart::{AddToCartRequest, CartList, StockUpdate, StockUpdateList, UpdateCartRequest},
        catalog::{
            CreateProductDetailRequest, CreateProductRequest, InventoryAdjustRequest, LookupList,
            LookupRequest, ProductDetailList, ProductList, SetStatusRequest,
            UpdateProductDetailRequest, UpdateProductRequest,
        },
        favorites::{AddFavoriteRequest, FavoriteProductList},
        orders::{
            CheckoutLine, CheckoutRequest, MonthlyRevenueList, OrderDto, OrderList,
            OrderWithDetails, RevenueTotal, StatusOrderList,
        },
        users::{ChangePasswordRequest, CreateUserRequest, UpdateUserRequest, UserList, UserRole},
        vouchers::{CreateVoucherRequest, UpdateVoucherRequest, VoucherList},
    },
    models::{
        Address, CartItem, CartLine, Favorite, LookupItem, MonthlyRevenue, OrderDetail, Product,
        ProductDetail, StatusOrder, User, Voucher,
    },
    response::{ApiResponse, Meta},
    routes::{
        addresses, admin, auth, cart, favorites, health, lookups, orders, params,
        product_details, products, users, vouchers,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        health::readiness,
        auth::register,
        auth::verify_otp,
        auth::resend_otp,
        auth::login,
        auth::google_login,
        auth::facebook_login,
        auth::forgot_password,
        auth::reset_password,
        users::list_users,
        users::create_user,
        users::get_role,
        users::update_user,
        users::delete_user,
        users::change_password,
        lookups::list_lookups,
        lookups::get_lookup,
        lookups::create_lookup,
        lookups::update_lookup,
        lookups::delete_lookup,
        products::list_products,
        products::list_by_category,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        product_details::list_details,
        product_details::list_by_product,
        product_details::get_detail,
        product_details::create_detail,
        product_details::update_detail,
        product_details::set_status,
        product_details::delete_detail,
        cart::cart_list,
        cart::add_to_cart,
        cart::update_cart_item,
        cart::remove_from_cart,
        cart::update_quantity,
        cart::clear_cart,
        orders::checkout,
        orders::list_my_orders,
        orders::list_all_orders,
        orders::list_statuses,
        orders::list_user_orders,
        orders::get_order,
        orders::update_order_status,
        orders::cancel_order,
        orders::revenue_between,
        orders::revenue_last_12_months,
        vouchers::list_vouchers,
        vouchers::create_voucher,
        vouchers::update_voucher,
        vouchers::delete_voucher,
        vouchers::decrement_voucher,
        addresses::list_addresses,
        addresses::first_address,
        addresses::add_address,
        addresses::update_address,
        favorites::list_favorites,
        favorites::add_favorite,
        favorites::remove_favorite,
        admin::list_low_stock,
        admin::adjust_inventory
    ),
    components(
        schemas(
            User,
            LookupItem,
            Product,
            ProductDetail,
            CartItem,
            CartLine,
            Favorite,
            OrderDetail,
            StatusOrder,
            Voucher,
            Address,
            MonthlyRevenue,
            RegisterRequest,
            PendingRegistration,
            VerifyOtpRequest,
            ResendOtpRequest,
            LoginRequest,
            LoginResponse,
            GoogleLoginRequest,
            FacebookLoginRequest,
            ForgotPasswordRequest,
            ResetPasswordRequest,
            CreateUserRequest,
            UpdateUserRequest,
            ChangePasswordRequest,
            UserList,
            UserRole,
            LookupRequest,
            LookupList,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            CreateProductDetailRequest,
            UpdateProductDetailRequest,
            SetStatusRequest,
            ProductDetailList,
            InventoryAdjustRequest,
            AddToCartRequest,
            UpdateCartRequest,
            CartList,
            StockUpdate,
            StockUpdateList,
            CheckoutLine,
            CheckoutRequest,
            OrderDto,
            OrderWithDetails,
            OrderList,
            StatusOrderList,
            RevenueTotal,
            MonthlyRevenueList,
            CreateVoucherRequest,
            UpdateVoucherRequest,
            VoucherList,
            AddressRequest,
            AddressList,
            AddFavoriteRequest,
            FavoriteProductList,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            params::LowStockQuery,
            params::RevenueQuery,
            params::SortOrder,
            params::ProductSortBy,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<OrderWithDetails>,
            ApiResponse<OrderList>,
            ApiResponse<LoginResponse>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Auth", description = "Registration, login and password recovery"),
        (name = "Users", description = "User management"),
        (name = "Lookups", description = "Roles, brands, categories, colors, sizes and weights"),
        (name = "Products", description = "Product endpoints"),
        (name = "Product Details", description = "Product variant endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Orders", description = "Checkout, order and revenue endpoints"),
        (name = "Vouchers", description = "Voucher endpoints"),
        (name = "Addresses", description = "Shipping address endpoints"),
        (name = "Favorites", description = "Favorite endpoints"),
        (name = "Admin", description = "Inventory endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
