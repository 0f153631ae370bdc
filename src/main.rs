use actix_web::{
    self,
    middleware::{from_fn, Logger},
    web, App, HttpServer,
};
use std::sync::LazyLock;

use crate::{
    api::error,
    middlewares::request_id,
    modules::convert::{model::UploadConfig, service::ConvertService},
};

mod api;
mod configs;
mod constants;
mod middlewares;
mod modules;
#[cfg(test)]
mod test;
mod utils;

pub static ENV: LazyLock<constants::Env> = LazyLock::new(|| {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Environment variables loaded from .env file");
    constants::Env::default()
});

async fn not_found() -> Result<actix_web::HttpResponse, error::Error> {
    Err(error::Error::not_found("Route not found"))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    LazyLock::force(&modules::health::handle::STARTED_AT);

    let upload_config = UploadConfig::from(&*ENV);
    let convert_service = ConvertService::new();

    log::info!(
        "Starting server at http://{}:{} (max {} files of {} each)",
        ENV.ip.as_str(),
        ENV.port,
        upload_config.max_files,
        utils::format_size(upload_config.max_file_size)
    );
    HttpServer::new(move || {
        App::new()
            .wrap(from_fn(request_id))
            .wrap(Logger::default())
            .wrap(configs::cors(&ENV.frontend_url))
            .app_data(web::Data::new(upload_config.clone()))
            .app_data(web::Data::new(convert_service.clone()))
            .configure(modules::health::route::configure)
            .configure(modules::convert::route::configure)
            .default_service(web::to(not_found))
    })
    .bind((ENV.ip.as_str(), ENV.port))?
    .workers(ENV.workers)
    .max_connections(ENV.max_connections)
    .run()
    .await
}
