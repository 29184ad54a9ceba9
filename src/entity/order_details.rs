use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "order_details")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_detail_id: Uuid,
    pub quantity: i32,
    /// Unit price copied from the product detail when the order was placed.
    pub price: i64,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::orders::Entity",
        from = "Column::OrderId",
        to = "super::orders::Column::Id"
    )]
    Orders,
    #[sea_orm(
        belongs_to = "super::product_details::Entity",
        from = "Column::ProductDetailId",
        to = "super::product_details::Column::Id"
    )]
    ProductDetails,
}

impl Related<super::orders::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl Related<super::product_details::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductDetails.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
