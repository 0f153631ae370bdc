use crate::api::error;
use crate::modules::convert::model::CompressionLevel;

/// Re-encode `buffer` as a progressive JPEG at the tier's quality.
///
/// Never fails: when the image cannot be decoded or encoded the original bytes are
/// handed back untouched and the failure is only logged.
pub fn compress(buffer: Vec<u8>, level: CompressionLevel) -> Vec<u8> {
    match try_compress(&buffer, level.quality()) {
        Ok(encoded) => {
            log::debug!(
                "Recompressed image at quality {}: {} -> {} bytes",
                level.quality(),
                buffer.len(),
                encoded.len()
            );
            encoded
        }
        Err(e) => {
            log::warn!("Compression failed, keeping original {} bytes: {}", buffer.len(), e);
            buffer
        }
    }
}

pub fn try_compress(buffer: &[u8], quality: u8) -> Result<Vec<u8>, error::SystemError> {
    let img = image::load_from_memory(buffer)?;
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();

    // mozjpeg reports libjpeg failures by unwinding
    let encoded = std::panic::catch_unwind(|| -> std::io::Result<Vec<u8>> {
        let mut comp = mozjpeg::Compress::new(mozjpeg::ColorSpace::JCS_RGB);
        comp.set_size(width as usize, height as usize);
        comp.set_quality(quality as f32);
        comp.set_progressive_mode();
        comp.set_optimize_coding(true);

        let mut comp = comp.start_compress(Vec::new())?;
        comp.write_scanlines(rgb.as_raw())?;
        comp.finish()
    })
    .map_err(|_| error::SystemError::InternalError("mozjpeg aborted while encoding".into()))??;

    Ok(encoded)
}
