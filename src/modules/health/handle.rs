use actix_web::{get, HttpResponse};
use std::sync::LazyLock;
use std::time::Instant;

use crate::modules::health::schema::HealthResponse;

pub static STARTED_AT: LazyLock<Instant> = LazyLock::new(Instant::now);

#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        timestamp: chrono::Utc::now(),
        uptime: STARTED_AT.elapsed().as_secs_f64(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};

    #[actix_web::test]
    async fn test_health_reports_ok() {
        let app = test::init_service(App::new().service(health)).await;
        let req = test::TestRequest::get().uri("/health").to_request();
        let json: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(json["status"], "ok");
        assert!(json["uptime"].as_f64().unwrap() >= 0.0);
        let ts = json["timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok());
    }
}
