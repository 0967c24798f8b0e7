use log::*;
use sqlx::{migrate, migrate::MigrateDatabase, Sqlite};
use storefront_common::Money;
use storefront_engine::{
    db_types::{NewAddress, NewProduct, NewUser, Product},
    traits::{AccountManagement, CatalogManagement},
    SqliteDatabase,
};

/// Creates a throwaway SQLite database with the full schema applied. Every test gets its own file, so tests can run
/// concurrently without stepping on each other.
pub async fn prepare_test_db() -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let url = random_db_path();
    create_database(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 1).await.expect("Error creating connection to database");
    migrate!("./migrations").run(db.pool()).await.expect("Error running DB migrations");
    debug!("🚀️ Test database ready at {url}");
    db
}

pub fn random_db_path() -> String {
    let dir = std::env::temp_dir();
    format!("sqlite://{}/storefront_test_{}.db", dir.display(), rand::random::<u64>())
}

pub async fn create_database(url: &str) {
    if let Err(e) = Sqlite::drop_database(url).await {
        warn!("Error dropping database {url}: {e:?}");
    }
    Sqlite::create_database(url).await.expect("Error creating database");
    info!("Created Sqlite database {url}");
}

/// Seeds a customer record and a delivery address, returning (user_id, address_id).
pub async fn seed_customer(db: &SqliteDatabase, user_id: &str) -> (String, i64) {
    let user = db
        .upsert_user(NewUser {
            id: user_id.to_string(),
            name: "Asha Rai".to_string(),
            email: format!("{user_id}@example.com"),
            avatar_url: String::new(),
        })
        .await
        .expect("Error seeding user");
    let address = db
        .insert_address(
            &user.id,
            NewAddress {
                full_name: "Asha Rai".to_string(),
                phone_number: "+977-1-5551234".to_string(),
                street_address: "12 Hill Road".to_string(),
                city: "Kathmandu".to_string(),
                state: "Bagmati".to_string(),
                postal_code: "44600".to_string(),
                is_default: true,
            },
        )
        .await
        .expect("Error seeding address");
    (user.id, address.id)
}

/// Seeds a phone listing with the given prices (in cents) and stock.
pub async fn seed_phone(
    db: &SqliteDatabase,
    name: &str,
    price: i64,
    offer_price: Option<i64>,
    stock: i64,
) -> Product {
    db.insert_product(NewProduct {
        user_id: "user_admin".to_string(),
        name: name.to_string(),
        description: format!("{name}, 128GB"),
        brand: "Google".to_string(),
        price: Money::from_cents(price),
        offer_price: offer_price.map(Money::from_cents),
        stock,
        images: vec![format!("https://media.example.com/{}.jpg", name.to_lowercase().replace(' ', "-"))],
    })
    .await
    .expect("Error seeding product")
}
