//! Streaming PDF writer: one full-bleed image per page.
//!
//! Objects are built as lopdf values and serialized as soon as a page is known, so the sink
//! never needs to seek. The page tree and catalog ids are reserved up front and written by
//! [`PdfAssembler::finish`], followed by the cross-reference table and trailer.

use std::io::{self, Write};

use flate2::{write::ZlibEncoder, Compression};
use image::{ImageDecoder, ImageFormat, ImageReader};
use lopdf::content::{Content, Operation};
use lopdf::xref::{Xref, XrefEntry, XrefType};
use lopdf::{dictionary, Object, ObjectId, Stream};

use crate::api::error;

const PDF_HEADER: &[u8] = b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n";
const PAGES_ID: ObjectId = (1, 0);
const CATALOG_ID: ObjectId = (2, 0);
const IMAGE_NAME: &str = "Im0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfColorSpace {
    DeviceGray,
    DeviceRgb,
}

impl PdfColorSpace {
    fn name(self) -> &'static str {
        match self {
            PdfColorSpace::DeviceGray => "DeviceGray",
            PdfColorSpace::DeviceRgb => "DeviceRGB",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfFilter {
    /// JPEG bytes embedded as-is.
    DctDecode,
    /// zlib-compressed 8-bit samples.
    FlateDecode,
}

impl PdfFilter {
    fn name(self) -> &'static str {
        match self {
            PdfFilter::DctDecode => "DCTDecode",
            PdfFilter::FlateDecode => "FlateDecode",
        }
    }
}

/// An opened image ready to be placed on a page.
#[derive(Debug)]
pub struct CompressedImage {
    pub width: u32,
    pub height: u32,
    pub color_space: PdfColorSpace,
    pub filter: PdfFilter,
    pub data: Vec<u8>,
}

impl CompressedImage {
    /// Reads the intrinsic dimensions of `buffer`.
    ///
    /// Gray or RGB JPEGs are passed through untouched. Anything else is decoded to RGB
    /// and deflated.
    pub fn open(buffer: Vec<u8>) -> Result<Self, image::ImageError> {
        let format = image::guess_format(&buffer)?;

        if format == ImageFormat::Jpeg {
            let (width, height, color_space) = {
                let decoder =
                    ImageReader::with_format(io::Cursor::new(&buffer), format).into_decoder()?;
                let (width, height) = decoder.dimensions();
                let color_space = match decoder.color_type() {
                    image::ColorType::L8 => Some(PdfColorSpace::DeviceGray),
                    image::ColorType::Rgb8 => Some(PdfColorSpace::DeviceRgb),
                    _ => None,
                };
                (width, height, color_space)
            };
            if let Some(color_space) = color_space {
                return Ok(Self {
                    width,
                    height,
                    color_space,
                    filter: PdfFilter::DctDecode,
                    data: buffer,
                });
            }
        }

        let rgb = image::load_from_memory_with_format(&buffer, format)?.to_rgb8();
        let (width, height) = rgb.dimensions();
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(rgb.as_raw()).map_err(image::ImageError::IoError)?;
        let data = encoder.finish().map_err(image::ImageError::IoError)?;

        Ok(Self {
            width,
            height,
            color_space: PdfColorSpace::DeviceRgb,
            filter: PdfFilter::FlateDecode,
            data,
        })
    }
}

/// Tracks how many bytes went through so xref offsets can be computed without `Seek`.
pub struct CountingWriter<W: Write> {
    inner: W,
    written: u64,
}

impl<W: Write> CountingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    pub fn position(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

pub struct PdfAssembler<W: Write> {
    out: CountingWriter<W>,
    xref: Xref,
    max_id: u32,
    pages_id: ObjectId,
    catalog_id: ObjectId,
    page_ids: Vec<ObjectId>,
}

impl<W: Write> PdfAssembler<W> {
    /// Writes the file header only. Pages are added once their geometry is known.
    pub fn new(sink: W) -> io::Result<Self> {
        let mut out = CountingWriter::new(sink);
        out.write_all(PDF_HEADER)?;
        Ok(Self {
            out,
            xref: Xref::new(0, XrefType::CrossReferenceTable),
            max_id: CATALOG_ID.0,
            pages_id: PAGES_ID,
            catalog_id: CATALOG_ID,
            page_ids: Vec::new(),
        })
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn new_object_id(&mut self) -> ObjectId {
        self.max_id += 1;
        (self.max_id, 0)
    }

    fn write_indirect_object(&mut self, id: ObjectId, object: &Object) -> io::Result<()> {
        let offset = u32::try_from(self.out.position())
            .map_err(|_| io::Error::other("PDF grew past the xref offset range"))?;
        self.xref.insert(id.0, XrefEntry::Normal { offset, generation: id.1 });
        write!(self.out, "{} {} obj\n", id.0, id.1)?;
        serialize::write_object(&mut self.out, object)?;
        self.out.write_all(b"\nendobj\n")
    }

    /// Appends a page of exactly `image.width` x `image.height` points showing the image.
    pub fn add_page(&mut self, image: CompressedImage) -> io::Result<()> {
        let CompressedImage { width, height, color_space, filter, data } = image;
        let image_id = self.new_object_id();
        let content_id = self.new_object_id();
        let page_id = self.new_object_id();

        let xobject = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(width),
                "Height" => i64::from(height),
                "ColorSpace" => color_space.name(),
                "BitsPerComponent" => 8_i64,
                "Filter" => filter.name(),
            },
            data,
        );
        self.write_indirect_object(image_id, &Object::Stream(xobject))?;

        let content = full_bleed_content(width, height)
            .encode()
            .map_err(|e| io::Error::other(e.to_string()))?;
        self.write_indirect_object(content_id, &Object::Stream(Stream::new(dictionary! {}, content)))?;

        let page = dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(i64::from(width)),
                Object::Integer(i64::from(height)),
            ],
            "Resources" => dictionary! {
                "XObject" => dictionary! { IMAGE_NAME => image_id },
            },
            "Contents" => content_id,
        };
        self.write_indirect_object(page_id, &Object::Dictionary(page))?;

        self.page_ids.push(page_id);
        // page boundary: hand the finished page to the consumer
        self.out.flush()
    }

    /// Writes the page tree, catalog, xref table and trailer, and returns the sink.
    pub fn finish(mut self) -> io::Result<W> {
        let (pages_id, catalog_id) = (self.pages_id, self.catalog_id);
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => self.page_ids.iter().map(|&id| Object::Reference(id)).collect::<Vec<_>>(),
            "Count" => self.page_ids.len() as i64,
        };
        self.write_indirect_object(pages_id, &Object::Dictionary(pages))?;
        let catalog = dictionary! { "Type" => "Catalog", "Pages" => pages_id };
        self.write_indirect_object(catalog_id, &Object::Dictionary(catalog))?;

        let xref_start = self.out.position();
        self.xref.size = self.max_id + 1;
        serialize::write_xref(&mut self.out, &self.xref)?;

        let trailer = dictionary! { "Size" => i64::from(self.xref.size), "Root" => catalog_id };
        self.out.write_all(b"trailer\n")?;
        serialize::write_dictionary(&mut self.out, &trailer)?;
        write!(self.out, "\nstartxref\n{xref_start}\n%%EOF\n")?;

        self.out.flush()?;
        Ok(self.out.into_inner())
    }
}

/// Draws the page's only image stretched over the whole page.
fn full_bleed_content(width: u32, height: u32) -> Content {
    let (w, h) = (i64::from(width), i64::from(height));
    Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Integer(w),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(h),
                    Object::Integer(0),
                    Object::Integer(0),
                ],
            ),
            Operation::new("Do", vec![Object::Name(IMAGE_NAME.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ],
    }
}

/// Plain-text serialization of lopdf objects onto a forward-only writer.
mod serialize {
    use std::io::{self, Write};

    use lopdf::xref::{Xref, XrefEntry};
    use lopdf::{Dictionary, Object};

    pub fn write_object(out: &mut dyn Write, object: &Object) -> io::Result<()> {
        match object {
            Object::Null => out.write_all(b"null"),
            Object::Boolean(b) => out.write_all(if *b { b"true" } else { b"false" }),
            Object::Integer(i) => write!(out, "{i}"),
            Object::Real(r) => write!(out, "{r:.3}"),
            Object::Name(name) => {
                out.write_all(b"/")?;
                out.write_all(name)
            }
            Object::String(bytes, _) => {
                out.write_all(b"<")?;
                for byte in bytes {
                    write!(out, "{byte:02X}")?;
                }
                out.write_all(b">")
            }
            Object::Array(items) => {
                out.write_all(b"[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.write_all(b" ")?;
                    }
                    write_object(out, item)?;
                }
                out.write_all(b"]")
            }
            Object::Dictionary(dict) => write_dictionary(out, dict),
            Object::Stream(stream) => {
                let mut dict = stream.dict.clone();
                dict.set("Length", stream.content.len() as i64);
                write_dictionary(out, &dict)?;
                out.write_all(b"\nstream\n")?;
                out.write_all(&stream.content)?;
                out.write_all(b"\nendstream")
            }
            Object::Reference((id, generation)) => write!(out, "{id} {generation} R"),
        }
    }

    pub fn write_dictionary(out: &mut dyn Write, dict: &Dictionary) -> io::Result<()> {
        out.write_all(b"<<")?;
        for (key, value) in dict.iter() {
            out.write_all(b"/")?;
            out.write_all(key)?;
            out.write_all(b" ")?;
            write_object(out, value)?;
            out.write_all(b" ")?;
        }
        out.write_all(b">>")
    }

    /// Single-section table. Every id below `xref.size` must have been written.
    pub fn write_xref(out: &mut dyn Write, xref: &Xref) -> io::Result<()> {
        write!(out, "xref\n0 {}\n0000000000 65535 f \n", xref.size)?;
        for id in 1..xref.size {
            match xref.entries.get(&id) {
                Some(XrefEntry::Normal { offset, generation }) => {
                    write!(out, "{offset:010} {generation:05} n \n")?
                }
                _ => return Err(io::Error::other(format!("PDF object {id} was never written"))),
            }
        }
        Ok(())
    }
}

/// Reads only the header of `buffer`, enough to size a page without decoding pixels.
pub fn read_dimensions(buffer: &[u8]) -> Result<(u32, u32), image::ImageError> {
    ImageReader::new(io::Cursor::new(buffer)).with_guessed_format()?.into_dimensions()
}

/// Fails with the same error as [`open_for_page`] when `buffer` cannot even be sized.
pub fn check_openable(
    index: usize,
    filename: &str,
    buffer: &[u8],
) -> Result<(), error::SystemError> {
    read_dimensions(buffer).map(|_| ()).map_err(|source| error::SystemError::Assembly {
        index,
        filename: filename.to_string(),
        source,
    })
}

/// Opens an image for the page at `index`, turning decode failures into a fatal request error.
pub fn open_for_page(
    index: usize,
    filename: &str,
    buffer: Vec<u8>,
) -> Result<CompressedImage, error::SystemError> {
    CompressedImage::open(buffer).map_err(|source| error::SystemError::Assembly {
        index,
        filename: filename.to_string(),
        source,
    })
}
