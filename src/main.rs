use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;

use taskmanager::{
    auth::{AuthMiddleware, BcryptHasher, PasswordHasher, TokenKeys},
    config::Config,
    notify::{LogNotifier, Notifier, SendGridNotifier},
    routes,
    state::AppState,
    store::{postgres::run_migrations, PgTaskStore, PgUserStore},
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    let hasher: Arc<dyn PasswordHasher> = Arc::new(BcryptHasher::new(config.bcrypt_cost));
    let keys = TokenKeys::new(&config.jwt_secret);

    let notifier: Arc<dyn Notifier> = match &config.sendgrid_api_key {
        Some(api_key) => Arc::new(SendGridNotifier::new(api_key.clone(), config.mail_from.clone())),
        None => {
            log::warn!("SENDGRID_API_KEY not set, mail will only be logged");
            Arc::new(LogNotifier)
        }
    };

    let state = match &config.database_url {
        Some(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(database_url)
                .await
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
            run_migrations(&pool)
                .await
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

            AppState::new(
                Arc::new(PgUserStore::new(pool.clone())),
                Arc::new(PgTaskStore::new(pool)),
                hasher,
                keys,
                notifier,
                config.upload_dir.clone(),
            )
        }
        None => {
            log::warn!("DATABASE_URL not set, using the in-memory store; data is lost on restart");
            AppState::in_memory(hasher, keys, notifier, config.upload_dir.clone())
        }
    };
    let state = web::Data::new(state);

    log::info!("Starting task manager server at {}", config.server_url());
    HttpServer::new(move || {
        App::new()
            .wrap(AuthMiddleware)
            .wrap(Cors::permissive())
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(routes::config)
            .default_service(web::route().to(routes::not_found))
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
