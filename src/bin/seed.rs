use std::sync::Arc;

use portfolio_cms::config::AppConfig;
use portfolio_cms::db::{PgStore, Store};
use portfolio_cms::{logging, seed};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let _log_guards = logging::init(&logging::LogSettings::from_env());

    let destroy = std::env::args().nth(1).as_deref() == Some("-d");

    let config = AppConfig::from_env();
    let Some(db) = config.database.as_ref() else {
        eprintln!("DATABASE_URL must be set to seed the database");
        std::process::exit(1);
    };

    let store: Arc<dyn Store> = match PgStore::connect(db).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            eprintln!("Error connecting to the database: {e}");
            std::process::exit(1);
        }
    };

    let outcome = if destroy {
        seed::destroy(&store).await.map(|()| println!("Data Destroyed!"))
    } else {
        seed::import(&store, config.auth.bcrypt_cost).await.map(|summary| {
            println!("Data Imported! {summary:?}");
            println!(
                "Admin User created: {} / {}",
                seed::ADMIN_EMAIL,
                seed::ADMIN_PASSWORD
            );
        })
    };

    if let Err(e) = outcome {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
