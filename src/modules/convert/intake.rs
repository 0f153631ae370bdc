use actix_multipart::{Field, Multipart};
use actix_web::{web, FromRequest, HttpRequest};
use futures_util::{future::LocalBoxFuture, TryStreamExt};

use crate::api::error;
use crate::constants::{FIELD_COMPRESSION_LEVEL, FIELD_FILENAME, FIELD_IMAGES, MAX_TEXT_FIELD_SIZE};
use crate::modules::convert::model::{
    default_filename, CompressionLevel, ConversionRequest, UploadConfig, UploadedFile,
};
use crate::utils::sanitize_filename;

fn multipart_error(e: impl std::fmt::Display) -> error::SystemError {
    error::SystemError::Multipart(e.to_string())
}

/// Reads a file part into memory, bailing out as soon as it grows past `limit`.
async fn read_file(
    field: &mut Field,
    filename: &str,
    limit: usize,
) -> Result<Vec<u8>, error::SystemError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.try_next().await.map_err(multipart_error)? {
        if bytes.len() + chunk.len() > limit {
            return Err(error::SystemError::FileTooLarge { filename: filename.to_string(), limit });
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

async fn read_text(field: &mut Field, name: &str) -> Result<String, error::SystemError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.try_next().await.map_err(multipart_error)? {
        if bytes.len() + chunk.len() > MAX_TEXT_FIELD_SIZE {
            return Err(error::SystemError::bad_request(format!("Field '{name}' is too long")));
        }
        bytes.extend_from_slice(&chunk);
    }
    String::from_utf8(bytes)
        .map_err(|_| error::SystemError::bad_request(format!("Field '{name}' must be UTF-8")))
}

/// Declared type of the part, or a guess from the filename when none was sent.
fn declared_mime(field: &Field, filename: &str) -> String {
    field
        .content_type()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| mime_guess::from_path(filename).first_or_octet_stream().to_string())
}

/// Drains the multipart body into a validated [`ConversionRequest`].
///
/// Any rejected part fails the whole batch; nothing read so far is kept.
pub async fn read_conversion_request(
    mut payload: Multipart,
    config: &UploadConfig,
) -> Result<ConversionRequest, error::SystemError> {
    let mut files = Vec::new();
    let mut level = CompressionLevel::default();
    let mut filename = default_filename();

    while let Some(mut field) = payload.try_next().await.map_err(multipart_error)? {
        let (name, original_filename) = match field.content_disposition() {
            Some(cd) => (
                cd.get_name().unwrap_or_default().to_string(),
                cd.get_filename().map(str::to_string),
            ),
            None => (String::new(), None),
        };

        match name.as_str() {
            FIELD_IMAGES => {
                if files.len() >= config.max_files {
                    return Err(error::SystemError::TooManyFiles { limit: config.max_files });
                }

                let original_filename =
                    original_filename.unwrap_or_else(|| format!("image-{}", files.len() + 1));
                let mime_type = declared_mime(&field, &original_filename);
                if !mime_type.starts_with("image/") {
                    return Err(error::SystemError::UnsupportedType {
                        filename: original_filename,
                        mime_type,
                    });
                }

                let data = read_file(&mut field, &original_filename, config.max_file_size).await?;
                files.push(UploadedFile { filename: original_filename, mime_type, data });
            }
            FIELD_COMPRESSION_LEVEL => {
                level = CompressionLevel::from_form(&read_text(&mut field, &name).await?);
            }
            FIELD_FILENAME => {
                filename = read_text(&mut field, &name).await?;
            }
            _ => {
                log::debug!("Ignoring unexpected form field '{}'", name);
                while field.try_next().await.map_err(multipart_error)?.is_some() {}
            }
        }
    }

    if files.is_empty() {
        return Err(error::SystemError::NoFiles);
    }

    Ok(ConversionRequest { files, level, filename: sanitize_filename(&filename) })
}

impl FromRequest for ConversionRequest {
    type Error = error::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut actix_web::dev::Payload) -> Self::Future {
        let multipart = Multipart::from_request(req, payload);
        let config = req
            .app_data::<web::Data<UploadConfig>>()
            .map(|c| c.get_ref().clone())
            .unwrap_or_default();

        Box::pin(async move {
            let multipart = multipart.await.map_err(|e| error::Error::from(multipart_error(e)))?;
            let request = read_conversion_request(multipart, &config).await?;
            Ok(request)
        })
    }
}
