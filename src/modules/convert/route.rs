use actix_web::web::ServiceConfig;

use crate::modules::convert::handle::convert;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(convert);
}
