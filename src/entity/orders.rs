use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,
    pub user_id: Uuid,
    #[sea_orm(unique)]
    pub invoice_number: String,
    pub order_date: DateTimeWithTimeZone,
    pub payment_method: String,
    pub payment_status: String,
    pub shipping_address: String,
    pub shipping_cost: i64,
    pub total_amount: i64,
    pub point_earned: i32,
    pub point_used: i32,
    pub status_id: i32,
    pub voucher_id: Option<Uuid>,
    pub address_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    Users,
    #[sea_orm(
        belongs_to = "super::status_orders::Entity",
        from = "Column::StatusId",
        to = "super::status_orders::Column::Id"
    )]
    StatusOrders,
    #[sea_orm(has_many = "super::order_details::Entity")]
    OrderDetails,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::status_orders::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StatusOrders.def()
    }
}

impl Related<super::order_details::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderDetails.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
