use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use quick_delivery_api::{
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;

    let admin_id = ensure_user(&pool, "admin@quickdelivery.dev", "admin", "admin123", "Admin").await?;
    let customer_user_id =
        ensure_user(&pool, "customer@quickdelivery.dev", "customer", "customer123", "Customer")
            .await?;
    let partner_user_id =
        ensure_user(&pool, "partner@quickdelivery.dev", "partner", "partner123", "Partner").await?;

    let customer_id = ensure_customer(&pool, customer_user_id, "Sample Customer").await?;
    let partner_id = ensure_partner(&pool, partner_user_id, "Corner Kitchen").await?;
    ensure_address(&pool, customer_user_id).await?;
    seed_catalog(&pool, partner_id).await?;

    println!(
        "Seed completed. Admin ID: {admin_id}, Customer ID: {customer_id}, Partner ID: {partner_id}"
    );
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    email: &str,
    username: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<i32> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let row: Option<(i32,)> = sqlx::query_as(
        r#"
        INSERT INTO users (email, username, password_hash, role, is_active, is_email_verified)
        VALUES ($1, $2, $3, $4, TRUE, TRUE)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING user_id
        "#,
    )
    .bind(email)
    .bind(username)
    .bind(password_hash)
    .bind(role)
    .fetch_optional(pool)
    .await?;

    let user_id = match row {
        Some((id,)) => id,
        None => {
            let existing: (i32,) = sqlx::query_as("SELECT user_id FROM users WHERE email = $1")
                .bind(email)
                .fetch_one(pool)
                .await?;
            existing.0
        }
    };

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn ensure_customer(pool: &sqlx::PgPool, user_id: i32, name: &str) -> anyhow::Result<i32> {
    if let Some((id,)) =
        sqlx::query_as::<_, (i32,)>("SELECT customer_id FROM customers WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?
    {
        return Ok(id);
    }

    let (id,): (i32,) = sqlx::query_as(
        r#"
        INSERT INTO customers (name, address, city, country, user_id)
        VALUES ($1, '12 Canal Street', 'Rotterdam', 'NL', $2)
        RETURNING customer_id
        "#,
    )
    .bind(name)
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    println!("Created customer profile {id}");
    Ok(id)
}

async fn ensure_partner(pool: &sqlx::PgPool, user_id: i32, business_name: &str) -> anyhow::Result<i32> {
    if let Some((id,)) =
        sqlx::query_as::<_, (i32,)>("SELECT partner_id FROM partners WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?
    {
        return Ok(id);
    }

    let (id,): (i32,) = sqlx::query_as(
        r#"
        INSERT INTO partners (business_name, operating_hours, rating, user_id)
        VALUES ($1, '09:00-22:00', 4.6, $2)
        RETURNING partner_id
        "#,
    )
    .bind(business_name)
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    println!("Created partner profile {id}");
    Ok(id)
}

async fn ensure_address(pool: &sqlx::PgPool, user_id: i32) -> anyhow::Result<()> {
    let existing: Option<(i32,)> =
        sqlx::query_as("SELECT address_id FROM addresses WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
    if existing.is_some() {
        return Ok(());
    }

    sqlx::query(
        r#"
        INSERT INTO addresses (user_id, full_address, city, postal_code)
        VALUES ($1, '12 Canal Street', 'Rotterdam', '3011AB')
        "#,
    )
    .bind(user_id)
    .execute(pool)
    .await?;

    println!("Created delivery address");
    Ok(())
}

async fn seed_catalog(pool: &sqlx::PgPool, partner_id: i32) -> anyhow::Result<()> {
    let categories = ["Mains", "Sides", "Drinks"];
    for name in categories {
        sqlx::query(
            r#"
            INSERT INTO categories (name, description)
            VALUES ($1, NULL)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(name)
        .execute(pool)
        .await?;
    }

    // Prices in minor units.
    let products = vec![
        ("Margherita Pizza", "Wood-fired, 30cm", 1150_i64, 40, "Mains"),
        ("Garlic Bread", "Six pieces", 450_i64, 80, "Sides"),
        ("Lemonade", "Fresh squeezed, 0.5l", 350_i64, 120, "Drinks"),
        ("Pad Thai", "Medium spicy", 1250_i64, 35, "Mains"),
    ];

    for (name, desc, price, stock, category) in products {
        let existing: Option<(i32,)> = sqlx::query_as(
            "SELECT product_id FROM products WHERE partner_id = $1 AND name = $2",
        )
        .bind(partner_id)
        .bind(name)
        .fetch_optional(pool)
        .await?;
        if existing.is_some() {
            continue;
        }

        let (product_id,): (i32,) = sqlx::query_as(
            r#"
            INSERT INTO products (partner_id, name, description, price, is_available, stock_quantity)
            VALUES ($1, $2, $3, $4, TRUE, $5)
            RETURNING product_id
            "#,
        )
        .bind(partner_id)
        .bind(name)
        .bind(desc)
        .bind(price)
        .bind(stock)
        .fetch_one(pool)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO product_categories (product_id, category_id)
            SELECT $1, category_id FROM categories WHERE name = $2
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(product_id)
        .bind(category)
        .execute(pool)
        .await?;
    }

    println!("Seeded catalog");
    Ok(())
}
