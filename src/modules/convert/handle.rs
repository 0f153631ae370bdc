use actix_web::{post, web, HttpRequest};

use crate::api::{error, success::PdfAttachment};
use crate::middlewares::get_request_id;
use crate::modules::convert::{model::ConversionRequest, service::ConvertService};

#[post("/convert")]
pub async fn convert(
    service: web::Data<ConvertService>,
    req: HttpRequest,
    request: ConversionRequest,
) -> Result<PdfAttachment, error::Error> {
    let request_id = get_request_id(&req);
    log::debug!("[{}] VALIDATED: {} file(s)", request_id, request.files.len());

    let filename = request.filename.clone();
    let body = service.convert(request_id, request).await?;
    Ok(PdfAttachment::new(filename, body))
}
