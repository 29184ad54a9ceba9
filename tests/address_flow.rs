mod common;

use petcare_api::{
    dto::addresses::AddressRequest, error::AppError, services::address_service,
};

fn address(street: &str, is_default: bool) -> AddressRequest {
    AddressRequest {
        street: street.into(),
        ward: "Phường Bến Nghé".into(),
        district: "Quận 1".into(),
        province: "TP. Hồ Chí Minh".into(),
        is_default,
    }
}

#[tokio::test]
async fn only_one_default_address_survives() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let (user, _) = common::create_user(&state, "user").await?;

    let home = address_service::add_address(&state, &user, address("12 Lê Lợi", true))
        .await?
        .data
        .expect("address");
    let work = address_service::add_address(&state, &user, address("5 Nguyễn Huệ", true))
        .await?
        .data
        .expect("address");

    let defaults = |items: &[petcare_api::models::Address]| {
        items.iter().filter(|a| a.is_default).map(|a| a.id).collect::<Vec<_>>()
    };

    let listed = address_service::list_addresses(&state, &user).await?;
    let items = listed.data.map(|list| list.items).unwrap_or_default();
    assert_eq!(defaults(&items), vec![work.id]);

    address_service::update_address(&state, &user, home.id, address("12 Lê Lợi", true)).await?;
    let listed = address_service::list_addresses(&state, &user).await?;
    let items = listed.data.map(|list| list.items).unwrap_or_default();
    assert_eq!(defaults(&items), vec![home.id]);

    let first = address_service::first_address(&state, &user)
        .await?
        .data
        .expect("address");
    assert_eq!(first.id, home.id);
    assert!(first.full_address.contains("Quận 1"));
    Ok(())
}

#[tokio::test]
async fn foreign_address_is_not_found() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let (owner, _) = common::create_user(&state, "user").await?;
    let (other, _) = common::create_user(&state, "user").await?;

    let home = address_service::add_address(&state, &owner, address("7 Hai Bà Trưng", false))
        .await?
        .data
        .expect("address");

    let result =
        address_service::update_address(&state, &other, home.id, address("hijack", true)).await;
    assert!(matches!(result, Err(AppError::NotFoundResource(_))));
    Ok(())
}
