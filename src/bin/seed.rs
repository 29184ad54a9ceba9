use petcare_api::{
    config::AppConfig,
    db::{DbPool, create_pool, run_migrations},
    utils::password::hash_password,
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;

    let admin_id = ensure_user_with_role(&pool, "admin@petcare.local", "admin123", "Quản trị viên", "admin").await?;
    let user_id = ensure_user_with_role(&pool, "user@petcare.local", "user123", "Khách hàng", "user").await?;
    seed_catalog(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user_with_role(
    pool: &DbPool,
    email: &str,
    password: &str,
    full_name: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, full_name)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE SET full_name = EXCLUDED.full_name
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(full_name)
    .fetch_one(pool)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO user_roles (user_id, role_id)
        SELECT $1, id FROM roles WHERE name = $2
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(role)
    .execute(pool)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn ensure_lookup(pool: &DbPool, table: &str, name: &str) -> anyhow::Result<Uuid> {
    let (id,): (Uuid,) = sqlx::query_as(&format!(
        r#"
        INSERT INTO {table} (id, name) VALUES ($1, $2)
        ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(name)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

async fn seed_catalog(pool: &DbPool) -> anyhow::Result<()> {
    // (product, description, brand, category, [(size, weight, price, quantity)])
    let products = [
        (
            "Hạt Royal Canin Mini Adult",
            "Thức ăn khô cho chó trưởng thành giống nhỏ",
            "Royal Canin",
            "Thức ăn cho chó",
            vec![("Nhỏ", "800g", 185_000_i64, 40), ("Nhỏ", "2kg", 420_000, 25)],
        ),
        (
            "Pate Whiskas vị cá ngừ",
            "Pate cho mèo trưởng thành",
            "Whiskas",
            "Thức ăn cho mèo",
            vec![("Nhỏ", "85g", 15_000, 200)],
        ),
        (
            "Cát vệ sinh Me-O",
            "Cát đậu nành khử mùi",
            "Me-O",
            "Vệ sinh",
            vec![("Lớn", "5kg", 120_000, 60), ("Lớn", "10kg", 210_000, 4)],
        ),
        (
            "Vòng cổ da có chuông",
            "Vòng cổ điều chỉnh được cho chó mèo",
            "PetCare",
            "Phụ kiện",
            vec![("Nhỏ", "50g", 65_000, 30), ("Vừa", "80g", 85_000, 3)],
        ),
    ];

    for (name, description, brand, category, variants) in products {
        let brand_id = ensure_lookup(pool, "brands", brand).await?;
        let category_id = ensure_lookup(pool, "product_categories", category).await?;

        let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM products WHERE name = $1")
            .bind(name)
            .fetch_optional(pool)
            .await?;
        let product_id = match existing {
            Some((id,)) => id,
            None => {
                let (id,): (Uuid,) = sqlx::query_as(
                    r#"
                    INSERT INTO products (id, name, description, brand_id, category_id)
                    VALUES ($1, $2, $3, $4, $5)
                    RETURNING id
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(name)
                .bind(description)
                .bind(brand_id)
                .bind(category_id)
                .fetch_one(pool)
                .await?;
                id
            }
        };

        for (size, weight, price, quantity) in variants {
            let size_id = ensure_lookup(pool, "product_sizes", size).await?;
            let weight_id = ensure_lookup(pool, "product_weights", weight).await?;
            sqlx::query(
                r#"
                INSERT INTO product_details (id, product_id, size_id, weight_id, price, quantity)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(product_id)
            .bind(size_id)
            .bind(weight_id)
            .bind(price)
            .bind(quantity)
            .execute(pool)
            .await?;
        }
    }

    println!("Seeded catalog");
    Ok(())
}
