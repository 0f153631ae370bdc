use std::io::Write;

use actix_web::web::Bytes;
use futures_util::{stream, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use uuid::Uuid;

use crate::api::{error, success::PdfBody};
use crate::modules::convert::{
    assembler::{check_openable, open_for_page, PdfAssembler},
    compression,
    model::{CompressionLevel, ConversionRequest, UploadedFile},
    sink::{ChannelSink, Chunk},
};
use crate::utils::format_size;

/// Chunks buffered between the pipeline thread and the socket.
const CHANNEL_CAPACITY: usize = 4;

/// Compresses and places every file in order, writing the document into `sink`.
///
/// Every upload is sized from its header before the first byte is written, so an unreadable
/// file fails the request while a JSON error can still be returned. Buffers are then consumed
/// one by one so each upload is freed once its page is written.
pub fn render_pdf<W: Write>(
    files: Vec<UploadedFile>,
    level: CompressionLevel,
    sink: W,
) -> Result<W, error::SystemError> {
    for (index, file) in files.iter().enumerate() {
        check_openable(index, &file.filename, &file.data)?;
    }

    let mut assembler = PdfAssembler::new(sink)?;

    for (index, file) in files.into_iter().enumerate() {
        let UploadedFile { filename, mime_type, data } = file;
        let buffer = compression::compress(data, level);
        let image = open_for_page(index, &filename, buffer)?;
        let (width, height) = (image.width, image.height);
        assembler.add_page(image)?;
        log::debug!(
            "Page {} added ({}x{}) from '{}' ({})",
            index + 1,
            width,
            height,
            filename,
            mime_type
        );
    }

    log::debug!("Finalizing document with {} page(s)", assembler.page_count());
    Ok(assembler.finish()?)
}

/// How the blocking pipeline ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineOutcome {
    Complete { pages: usize },
    Disconnected,
    Failed,
}

/// Runs [`render_pdf`] on the blocking pool, feeding the returned receiver.
fn spawn_pipeline(
    request_id: Uuid,
    files: Vec<UploadedFile>,
    level: CompressionLevel,
) -> (mpsc::Receiver<Chunk>, JoinHandle<PipelineOutcome>) {
    let (tx, rx) = mpsc::channel::<Chunk>(CHANNEL_CAPACITY);
    let pipeline = tokio::task::spawn_blocking(move || {
        let mut sink = ChannelSink::new(tx);
        let pages = files.len();
        let result = render_pdf(files, level, &mut sink).map(|_| ());
        match result {
            Ok(_) => {
                log::debug!("[{}] COMPLETE: {} page(s) written", request_id, pages);
                PipelineOutcome::Complete { pages }
            }
            Err(e) if e.is_disconnect() => {
                log::info!("[{}] Client disconnected, conversion abandoned", request_id);
                PipelineOutcome::Disconnected
            }
            Err(e) => {
                log::error!("[{}] FAILED: {}", request_id, e);
                sink.fail(e);
                PipelineOutcome::Failed
            }
        }
    });
    (rx, pipeline)
}

/// Response body: `first`, then whatever the pipeline sends until the channel closes.
///
/// A channel closed by a panicking pipeline ends the body with an error instead of a clean EOF.
fn body_stream(
    first: Bytes,
    rx: mpsc::Receiver<Chunk>,
    pipeline: JoinHandle<PipelineOutcome>,
) -> PdfBody {
    let rest = stream::unfold(Some((rx, pipeline)), |state| async move {
        let Some((mut rx, pipeline)) = state else {
            return None;
        };
        match rx.recv().await {
            Some(chunk) => Some((chunk, Some((rx, pipeline)))),
            None => match pipeline.await {
                Ok(PipelineOutcome::Complete { pages }) => {
                    log::debug!("Body complete after {} page(s)", pages);
                    None
                }
                Ok(_) => None,
                Err(e) => {
                    log::error!("Conversion pipeline died: {}", e);
                    Some((Err(error::SystemError::PipelineAborted), None))
                }
            },
        }
    });
    stream::once(async move { Ok::<_, error::SystemError>(first) }).chain(rest).boxed_local()
}

#[derive(Clone, Default)]
pub struct ConvertService;

impl ConvertService {
    pub fn new() -> Self {
        Self
    }

    /// Starts the pipeline and waits for the first page.
    ///
    /// Errors raised before the first chunk come back as `Err`, so no response headers have
    /// been sent yet. Later errors surface as an `Err` item that cuts the body short.
    pub async fn convert(
        &self,
        request_id: Uuid,
        request: ConversionRequest,
    ) -> Result<PdfBody, error::SystemError> {
        log::info!(
            "[{}] Converting {} image(s), {} total, level={}, filename={}.pdf",
            request_id,
            request.files.len(),
            format_size(request.total_size()),
            request.level.as_str(),
            request.filename
        );
        let ConversionRequest { files, level, .. } = request;

        let (mut rx, pipeline) = spawn_pipeline(request_id, files, level);
        match rx.recv().await {
            Some(Ok(first)) => {
                log::debug!("[{}] STREAMING: first chunk ready, committing headers", request_id);
                Ok(body_stream(first, rx, pipeline))
            }
            Some(Err(e)) => Err(e),
            None => Err(error::SystemError::PipelineAborted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{jpeg_fixture, png_fixture, truncated_png_fixture};

    fn upload(filename: &str, data: Vec<u8>) -> UploadedFile {
        UploadedFile { filename: filename.into(), mime_type: "image/jpeg".into(), data }
    }

    fn request(files: Vec<UploadedFile>) -> ConversionRequest {
        ConversionRequest { files, level: CompressionLevel::Ultra, filename: "out".into() }
    }

    async fn collect(mut body: PdfBody) -> Result<Vec<u8>, error::SystemError> {
        let mut out = Vec::new();
        while let Some(chunk) = body.next().await {
            out.extend_from_slice(&chunk?);
        }
        Ok(out)
    }

    #[test]
    fn test_render_pdf_page_count_matches_input() {
        let files = vec![
            upload("a.jpg", jpeg_fixture(30, 20)),
            upload("b.png", png_fixture(10, 40)),
            upload("c.jpg", jpeg_fixture(5, 5)),
        ];
        let pdf = render_pdf(files, CompressionLevel::Compressed, Vec::new()).unwrap();
        let doc = lopdf::Document::load_mem(&pdf).unwrap();
        assert_eq!(doc.get_pages().len(), 3);
    }

    #[test]
    fn test_render_pdf_fails_on_unopenable_image() {
        let files = vec![upload("a.jpg", jpeg_fixture(8, 8)), upload("b.jpg", b"junk".to_vec())];
        let err = render_pdf(files, CompressionLevel::Normal, Vec::new()).unwrap_err();
        assert!(matches!(
            err,
            error::SystemError::Assembly { index: 1, ref filename, .. } if filename == "b.jpg"
        ));
    }

    #[actix_web::test]
    async fn test_convert_streams_complete_document() {
        let service = ConvertService::new();
        let files = (0..5).map(|i| upload("p.jpg", jpeg_fixture(100 + i, 50))).collect();
        let body = service.convert(Uuid::now_v7(), request(files)).await.unwrap();
        let pdf = collect(body).await.unwrap();
        assert!(pdf.ends_with(b"%%EOF\n"));
        assert_eq!(lopdf::Document::load_mem(&pdf).unwrap().get_pages().len(), 5);
    }

    #[actix_web::test]
    async fn test_convert_fails_before_first_chunk() {
        let service = ConvertService::new();
        let files = vec![upload("bad.png", b"\x89PNG broken".to_vec())];
        let result = service.convert(Uuid::now_v7(), request(files)).await;
        assert!(matches!(result, Err(error::SystemError::Assembly { index: 0, .. })));
    }

    #[actix_web::test]
    async fn test_convert_rejects_unreadable_later_image_before_commit() {
        let service = ConvertService::new();
        let files = vec![upload("ok.jpg", jpeg_fixture(16, 16)), upload("bad.jpg", b"junk".to_vec())];
        let result = service.convert(Uuid::now_v7(), request(files)).await;
        assert!(matches!(
            result,
            Err(error::SystemError::Assembly { index: 1, ref filename, .. }) if filename == "bad.jpg"
        ));
    }

    #[actix_web::test]
    async fn test_convert_truncates_when_later_image_fails_to_decode() {
        let service = ConvertService::new();
        let files = vec![
            upload("ok.jpg", jpeg_fixture(16, 16)),
            upload("cut.png", truncated_png_fixture(64, 48)),
        ];
        let body = service.convert(Uuid::now_v7(), request(files)).await.unwrap();
        let err = collect(body).await.unwrap_err();
        assert!(matches!(err, error::SystemError::Assembly { index: 1, .. }));
    }

    #[actix_web::test]
    async fn test_dropped_response_stops_pipeline() {
        let files = (0..20).map(|_| upload("p.jpg", jpeg_fixture(64, 64))).collect();
        let (mut rx, pipeline) = spawn_pipeline(Uuid::now_v7(), files, CompressionLevel::Ultra);
        assert!(rx.recv().await.unwrap().is_ok());
        drop(rx);
        assert_eq!(pipeline.await.unwrap(), PipelineOutcome::Disconnected);
    }

    #[actix_web::test]
    async fn test_completed_pipeline_reports_page_count() {
        let files = (0..3).map(|_| upload("p.jpg", jpeg_fixture(8, 8))).collect();
        let (mut rx, pipeline) = spawn_pipeline(Uuid::now_v7(), files, CompressionLevel::Normal);
        while rx.recv().await.is_some() {}
        assert_eq!(pipeline.await.unwrap(), PipelineOutcome::Complete { pages: 3 });
    }

    #[actix_web::test]
    async fn test_pipeline_panic_after_commit_errors_the_body() {
        let (tx, mut rx) = mpsc::channel::<Chunk>(CHANNEL_CAPACITY);
        let pipeline: JoinHandle<PipelineOutcome> = tokio::task::spawn_blocking(move || {
            tx.blocking_send(Ok(Bytes::from_static(b"%PDF-1.7\n"))).unwrap();
            panic!("encoder crashed");
        });
        let first = rx.recv().await.unwrap().unwrap();
        let err = collect(body_stream(first, rx, pipeline)).await.unwrap_err();
        assert!(matches!(err, error::SystemError::PipelineAborted));
    }
}
