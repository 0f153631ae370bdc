//! Fixtures shared by the in-module tests.
#![allow(dead_code)]

use std::io::Cursor;

fn encode(img: image::DynamicImage, format: image::ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

fn gradient(width: u32, height: u32) -> image::RgbImage {
    image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    })
}

pub fn jpeg_fixture(width: u32, height: u32) -> Vec<u8> {
    encode(image::DynamicImage::ImageRgb8(gradient(width, height)), image::ImageFormat::Jpeg)
}

pub fn png_fixture(width: u32, height: u32) -> Vec<u8> {
    encode(image::DynamicImage::ImageRgb8(gradient(width, height)), image::ImageFormat::Png)
}

/// High-entropy content, so quality differences show up in the encoded size.
pub fn noisy_png_fixture(width: u32, height: u32) -> Vec<u8> {
    let mut state: u32 = 0x9E37_79B9;
    let img = image::RgbImage::from_fn(width, height, |_, _| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let [r, g, b, _] = state.to_le_bytes();
        image::Rgb([r, g, b])
    });
    encode(image::DynamicImage::ImageRgb8(img), image::ImageFormat::Png)
}

/// PNG whose header is intact but whose pixel data is cut in half.
pub fn truncated_png_fixture(width: u32, height: u32) -> Vec<u8> {
    let mut png = noisy_png_fixture(width, height);
    png.truncate(png.len() / 2);
    png
}

pub enum Part<'a> {
    File { name: &'a str, filename: &'a str, content_type: Option<&'a str>, data: &'a [u8] },
    Text { name: &'a str, value: &'a str },
}

pub const BOUNDARY: &str = "----img2pdfTestBoundary7MA4YWxk";

/// Builds a `multipart/form-data` body, returning the content type header and the bytes.
pub fn multipart_body(parts: &[Part<'_>]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::File { name, filename, content_type, data } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n"
                    )
                    .as_bytes(),
                );
                if let Some(ct) = content_type {
                    body.extend_from_slice(format!("Content-Type: {ct}\r\n").as_bytes());
                }
                body.extend_from_slice(b"\r\n");
                body.extend_from_slice(data);
                body.extend_from_slice(b"\r\n");
            }
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

pub fn image_part<'a>(filename: &'a str, data: &'a [u8]) -> Part<'a> {
    Part::File { name: "images", filename, content_type: Some("image/jpeg"), data }
}
