// src/main.rs
use actix_web::{App, HttpServer, middleware, web};
use log::{info, warn};

use skin_advisor::config::Config;
use skin_advisor::{AppState, configure};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting skin advisor service...");

    let config = Config::from_env()?;
    if config.openai_api_key.is_none() {
        warn!("OPENAI_API_KEY is not set; every operation will answer server_misconfigured");
    }
    info!(
        "Upstream {} (vision {}, image {}, timeout {:?})",
        config.api_base, config.vision_model, config.image_model, config.upstream_timeout
    );

    let app_state = AppState::from_config(&config)?;

    info!("Starting HTTP server on {}", config.bind_address);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(middleware::Logger::default())
            .configure(configure)
    })
    .bind(config.bind_address)?
    .run()
    .await?;

    Ok(())
}
