use quick_delivery_api::{
    authz::Principal,
    db::{create_orm_conn, create_pool, run_migrations},
    dto::users::UpdateUserRequest,
    entity::users::ActiveModel as UserActive,
    error::AppError,
    models::Role,
    services::user_service,
    state::AppState,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set, Statement};

// Integration flow: reads come back in the caller's projection, updates and
// deletes are gated by ownership and role.
#[tokio::test]
async fn user_access_flow() -> anyhow::Result<()> {
    let database_url =
        match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
            Ok(url) => url,
            Err(_) => {
                eprintln!(
                    "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
                );
                return Ok(());
            }
        };

    let state = setup_state(&database_url).await?;

    let admin_id = create_user(&state, Role::Admin, "admin@test.dev", "admin-u").await?;
    let manager_id = create_user(&state, Role::Manager, "manager@test.dev", "manager-u").await?;
    let alice_id = create_user(&state, Role::Customer, "alice@test.dev", "alice-u").await?;
    let bob_id = create_user(&state, Role::Customer, "bob@test.dev", "bob-u").await?;

    let admin = Principal::new(admin_id, Role::Admin);
    let manager = Principal::new(manager_id, Role::Manager);
    let alice = Principal::new(alice_id, Role::Customer);
    let bob = Principal::new(bob_id, Role::Customer);

    // Admin sees the full record
    let full = user_service::get_user(&state, &admin, alice_id).await?;
    let full = full.data.unwrap();
    assert_eq!(full.email.as_deref(), Some("alice@test.dev"));
    assert_eq!(full.phone_number.as_deref(), Some("555-0100"));

    // Manager sees contact and activity fields but not the phone number
    let view = user_service::get_user(&state, &manager, alice_id).await?;
    let view = view.data.unwrap();
    assert_eq!(view.email.as_deref(), Some("alice@test.dev"));
    assert!(view.created_at.is_some());
    assert!(view.phone_number.is_none());

    // An unrelated customer gets the minimal projection, not an error
    let minimal = user_service::get_user(&state, &bob, alice_id).await?;
    let minimal = minimal.data.unwrap();
    assert!(minimal.email.is_none());
    assert!(minimal.phone_number.is_none());
    assert_eq!(minimal.user_id, alice_id);

    // Only the owner or an admin may update
    let denied = user_service::update_user(
        &state,
        &bob,
        alice_id,
        UpdateUserRequest {
            first_name: Some("Mallory".into()),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(denied, Err(AppError::Forbidden)));

    // Self-update succeeds, but a smuggled role change is dropped
    let updated = user_service::update_user(
        &state,
        &alice,
        alice_id,
        UpdateUserRequest {
            first_name: Some("Alice".into()),
            role: Some(Role::Admin),
            ..Default::default()
        },
    )
    .await?;
    let updated = updated.data.unwrap();
    assert_eq!(updated.first_name.as_deref(), Some("Alice"));
    assert_eq!(updated.role, Role::Customer);

    // Deletes are admin-only, and never the admin's own account
    let denied = user_service::delete_user(&state, &manager, bob_id).await;
    assert!(matches!(denied, Err(AppError::Forbidden)));

    let denied = user_service::delete_user(&state, &admin, admin_id).await;
    assert!(matches!(denied, Err(AppError::BadRequest(_))));

    user_service::delete_user(&state, &admin, bob_id).await?;
    let gone = user_service::get_user(&state, &admin, bob_id).await;
    assert!(matches!(gone, Err(AppError::NotFound(_))));

    Ok(())
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url).await?;
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;

    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE payments, deliveries, order_items, orders, product_categories, products, categories, addresses, partners, customers, audit_logs, users RESTART IDENTITY CASCADE",
    ))
    .await?;

    Ok(AppState { pool, orm })
}

async fn create_user(
    state: &AppState,
    role: Role,
    email: &str,
    username: &str,
) -> anyhow::Result<i32> {
    let user = UserActive {
        user_id: NotSet,
        email: Set(email.to_string()),
        username: Set(username.to_string()),
        password_hash: Set("dummy".into()),
        first_name: Set(None),
        last_name: Set(None),
        phone_number: Set(Some("555-0100".into())),
        is_active: Set(true),
        is_email_verified: Set(false),
        role: Set(role.as_str().to_string()),
        profile_image_url: Set(None),
        created_at: NotSet,
        updated_at: Set(None),
        last_login_at: Set(None),
    }
    .insert(&state.orm)
    .await?;

    Ok(user.user_id)
}
