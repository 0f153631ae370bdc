use actix_web::web::ServiceConfig;

use crate::modules::health::handle::health;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(health);
}
