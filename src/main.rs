use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use log::{error, info, warn};
use volunteer_hub::{
    config::Config,
    db::init_db_pool,
    service::{
        log::{init_logger, LoggerMiddleware},
        media::{HttpMediaStore, MediaStore, NoopMediaStore},
    },
    AppState,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    init_logger();

    let config = Config::from_env().map_err(|e| {
        error!("{}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    let media: Arc<dyn MediaStore> = match &config.media_store_url {
        Some(url) => Arc::new(HttpMediaStore::new(url, config.media_store_key.clone()).map_err(|e| {
            error!("Failed to build the media store client: {}", e);
            std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
        })?),
        None => {
            warn!("MEDIA_STORE_URL not set, media assets will not be destroyed");
            Arc::new(NoopMediaStore)
        }
    };

    let state = match &config.database_url {
        Some(url) => {
            let pool = init_db_pool(url, config.db_max_connections).await.map_err(|e| {
                error!("Failed to connect to the database: {}", e);
                std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
            })?;
            AppState::postgres(pool, media, &config.secret)
        }
        None => {
            warn!("DATABASE_URL not set, using in-memory stores; data is lost on restart");
            AppState::in_memory(media, &config.secret)
        }
    };
    let state = web::Data::new(state);

    let cors_origins = config.cors_origins.clone();
    info!("listening on {}:{}", config.bind_addr, config.port);
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(volunteer_hub::security_headers())
            .wrap(volunteer_hub::cors(&cors_origins))
            .wrap(LoggerMiddleware)
            .configure(volunteer_hub::configure)
            .default_service(web::to(volunteer_hub::unknown_endpoint))
    })
    .bind((config.bind_addr.as_str(), config.port))?
    .run()
    .await
}
