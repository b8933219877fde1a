//! Raster payloads wrapped as single-page documents

use crate::error::Result;
use image::codecs::jpeg::JpegEncoder;
use image::ImageEncoder;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream};
use std::path::Path;

const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;
const MARGIN: f32 = 36.0;
const JPEG_QUALITY: u8 = 85;

/// Wrap raster bytes as a one-page document, scaled to fit the page while
/// preserving aspect ratio. Any format the `image` crate decodes is
/// accepted; the page embeds a re-encoded JPEG (`DCTDecode`), which keeps
/// the output small and sidesteps per-format stream filters.
///
/// # Errors
///
/// Returns [`AssembleError::Image`] when the bytes cannot be decoded.
pub fn image_document(bytes: &[u8]) -> Result<Document> {
    let decoded = image::load_from_memory(bytes)?;
    let rgb = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut jpeg = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY);
    encoder.write_image(
        rgb.as_raw(),
        width,
        height,
        image::ExtendedColorType::Rgb8,
    )?;

    let mut xobject = Dictionary::new();
    xobject.set("Type", Object::Name(b"XObject".to_vec()));
    xobject.set("Subtype", Object::Name(b"Image".to_vec()));
    xobject.set("Width", Object::Integer(i64::from(width)));
    xobject.set("Height", Object::Integer(i64::from(height)));
    xobject.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
    xobject.set("BitsPerComponent", Object::Integer(8));
    xobject.set("Filter", Object::Name(b"DCTDecode".to_vec()));

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let image_id = doc.add_object(Stream::new(xobject, jpeg).with_compression(false));

    let resources_id = doc.add_object(Dictionary::from_iter([(
        "XObject",
        Object::Dictionary(Dictionary::from_iter([(
            "Im0",
            Object::Reference(image_id),
        )])),
    )]));

    // Fit within the page box, never upscale past 1:1 point-per-pixel.
    let avail_w = PAGE_WIDTH - 2.0 * MARGIN;
    let avail_h = PAGE_HEIGHT - 2.0 * MARGIN;
    let scale = (avail_w / width as f32)
        .min(avail_h / height as f32)
        .min(1.0);
    let draw_w = width as f32 * scale;
    let draw_h = height as f32 * scale;
    let x = (PAGE_WIDTH - draw_w) / 2.0;
    let y = PAGE_HEIGHT - MARGIN - draw_h;

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    draw_w.into(),
                    0.into(),
                    0.into(),
                    draw_h.into(),
                    x.into(),
                    y.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(
        Dictionary::new(),
        content.encode().unwrap_or_default(),
    ));

    let page_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Page".to_vec())),
        ("Parent", Object::Reference(pages_id)),
        ("Contents", Object::Reference(content_id)),
        ("Resources", Object::Reference(resources_id)),
        (
            "MediaBox",
            Object::Array(vec![
                0.into(),
                0.into(),
                PAGE_WIDTH.into(),
                PAGE_HEIGHT.into(),
            ]),
        ),
    ]));

    doc.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(vec![Object::Reference(page_id)])),
            ("Count", Object::Integer(1)),
        ])),
    );
    let catalog_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));
    Ok(doc)
}

/// Decode an image file and write it as a one-page PDF next to the caller's
/// other fragments.
///
/// # Errors
///
/// Propagates decode and save failures.
pub fn wrap_image_as_pdf(input: &Path, output: &Path) -> Result<()> {
    let bytes = std::fs::read(input)?;
    let mut doc = image_document(&bytes)?;
    doc.save(output)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AssembleError;
    use tempfile::tempdir;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 40, 40]));
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_wrap_png() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("pic.png");
        let output = dir.path().join("pic.pdf");
        std::fs::write(&input, png_bytes(64, 48)).unwrap();
        wrap_image_as_pdf(&input, &output).unwrap();
        let doc = Document::load(&output).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_oversized_image_fits_page() {
        let doc = image_document(&png_bytes(2000, 100)).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_garbage_is_image_error() {
        let err = image_document(b"definitely not pixels").unwrap_err();
        assert!(matches!(err, AssembleError::Image(_)));
    }
}
