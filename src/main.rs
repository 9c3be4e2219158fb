use actix_identity::IdentityMiddleware;
use actix_web::{middleware, web, App, HttpServer};
use log::{error, info};

use nodewatch_server::AppData;
use nodewatch_server::config::Config;
use nodewatch_server::web::api_service;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = match Config::from_env() {
        Ok(x) => x,
        Err(err) => {
            error!("Invalid configuration: {}", err);
            std::process::exit(1);
        },
    };

    let data = AppData::from_config(&config)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err.to_string()))?;

    if let Some(admin) = config.admin.as_ref() {
        data.setup_admin(&admin.email, admin.password.clone(), admin.replace)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err.to_string()))?;
    }

    let cookie_secret_key = config.cookie_secret_key.clone();
    let domain = config.domain.clone();

    info!("Listening on {}", config.bind_address);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(data.clone()))
            .wrap(IdentityMiddleware::default())
            .wrap(api_service::session_middleware(cookie_secret_key.as_bytes(), Some(domain.clone())))
            // enable logger
            .wrap(middleware::Logger::default())
            // limit the maximum amount of data that server will accept
            .app_data(web::JsonConfig::default().limit(4096))
            .configure(api_service::config)
    })
        .bind(config.bind_address.as_str())?
        .run()
        .await
}
