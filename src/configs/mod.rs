use actix_cors::Cors;
use actix_web::http::{header, Method};

use crate::middlewares::REQUEST_ID_HEADER;

/// CORS policy for the upload UI. `*` allows any origin.
pub fn cors(frontend_url: &str) -> Cors {
    let cors = match frontend_url {
        "*" => Cors::default().allow_any_origin(),
        origin => Cors::default().allowed_origin(origin),
    };

    cors.allowed_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allowed_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([
            header::CONTENT_DISPOSITION,
            header::HeaderName::from_static(REQUEST_ID_HEADER),
        ])
        .max_age(3600)
}
