use actix_web::{
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    http::header::{HeaderName, HeaderValue},
    middleware::Next,
    Error, HttpMessage, HttpRequest,
};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Clone, Copy)]
pub struct RequestId(pub Uuid);

/// Tags every request with an id, stored in the extensions and echoed back as `x-request-id`.
pub async fn request_id<B>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<B>, Error>
where
    B: MessageBody + 'static,
{
    let id = Uuid::now_v7();
    req.extensions_mut().insert(RequestId(id));

    let mut res = next.call(req).await?;
    if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
        res.headers_mut().insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    Ok(res)
}

/// Id assigned by [`request_id`], or a fresh one when the middleware is not mounted.
pub fn get_request_id(req: &HttpRequest) -> Uuid {
    req.extensions().get::<RequestId>().map(|r| r.0).unwrap_or_else(Uuid::now_v7)
}
