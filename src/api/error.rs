use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use std::borrow::Cow;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Bad Request: {0}")]
    BadRequest(Cow<'static, str>),
    #[error("Not Found: {0}")]
    NotFound(Cow<'static, str>),
    #[error("Internal Server Error: {0}")]
    InternalServer(Cow<'static, str>),
}

#[derive(serde::Serialize)]
pub struct ErrorBody {
    pub error: Cow<'static, str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Cow<'static, str>>,
}

impl Error {
    pub fn bad_request(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::NotFound(msg.into())
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match *self {
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::InternalServer(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut res = HttpResponse::build(self.status_code());

        match self {
            Error::BadRequest(msg) | Error::NotFound(msg) => {
                res.json(ErrorBody { error: msg.clone(), message: None })
            }
            Error::InternalServer(msg) => res.json(ErrorBody {
                error: "Failed to convert images to PDF".into(),
                message: Some(msg.clone()),
            }),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SystemError {
    // intake validation
    #[error("No images provided")]
    NoFiles,
    #[error("File '{filename}' is too large. Maximum size is {limit} bytes")]
    FileTooLarge { filename: String, limit: usize },
    #[error("Too many files. Maximum is {limit} files")]
    TooManyFiles { limit: usize },
    #[error("Only image files are allowed, '{filename}' is {mime_type}")]
    UnsupportedType { filename: String, mime_type: String },
    #[error("{0}")]
    BadRequest(Cow<'static, str>),
    #[error("Malformed multipart body: {0}")]
    Multipart(String),
    // pipeline
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image Error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Failed to open image #{index} ('{filename}'): {source}")]
    Assembly {
        index: usize,
        filename: String,
        #[source]
        source: image::ImageError,
    },
    #[error("Conversion pipeline stopped before producing any output")]
    PipelineAborted,
    #[error("Internal System Error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

impl SystemError {
    pub fn bad_request(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::BadRequest(msg.into())
    }

    /// True when the error comes from the client going away mid-stream.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, SystemError::Io(e) if e.kind() == std::io::ErrorKind::BrokenPipe)
    }
}

impl From<SystemError> for Error {
    fn from(value: SystemError) -> Self {
        match value {
            SystemError::NoFiles
            | SystemError::FileTooLarge { .. }
            | SystemError::TooManyFiles { .. }
            | SystemError::UnsupportedType { .. }
            | SystemError::BadRequest(_) => Error::BadRequest(value.to_string().into()),
            SystemError::Multipart(msg) => {
                log::warn!("Rejected multipart body: {}", msg);
                Error::bad_request("Malformed multipart body")
            }
            _ => {
                log::error!("Internal Server Error: {:?}", value);
                Error::InternalServer(value.to_string().into())
            }
        }
    }
}
