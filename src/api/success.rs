use actix_web::{
    http::header::{ContentDisposition, DispositionParam, DispositionType},
    web::Bytes,
    HttpResponse,
};
use futures_util::stream::LocalBoxStream;

use crate::api::error::SystemError;

pub type PdfBody = LocalBoxStream<'static, Result<Bytes, SystemError>>;

/// Streamed PDF download. Headers are committed when this is turned into a response.
pub struct PdfAttachment {
    pub filename: String,
    pub body: PdfBody,
}

impl PdfAttachment {
    pub fn new(filename: impl Into<String>, body: PdfBody) -> Self {
        Self { filename: filename.into(), body }
    }

    fn disposition(&self) -> ContentDisposition {
        ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(format!("{}.pdf", self.filename))],
        }
    }
}

impl actix_web::Responder for PdfAttachment {
    type Body = actix_web::body::BoxBody;

    fn respond_to(self, _req: &actix_web::HttpRequest) -> HttpResponse<Self::Body> {
        let disposition = self.disposition();
        HttpResponse::Ok()
            .content_type("application/pdf")
            .insert_header(disposition)
            .streaming(self.body)
    }
}
