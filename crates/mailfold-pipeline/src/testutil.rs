//! Shared test fixtures

use crate::walker::Capabilities;
use mailfold_core::{HtmlToPdf, NoAnchors, NullConversion};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Capabilities that refuse everything.
pub(crate) fn null_caps() -> Capabilities<'static> {
    Capabilities {
        office: &NullConversion,
        html: &NullConversion,
        layout: &NoAnchors,
    }
}

/// HTML renderer that writes a real one-page PDF.
pub(crate) struct StubHtml;

impl HtmlToPdf for StubHtml {
    fn convert(&self, _html: &Path, output: &Path) -> bool {
        mailfold_assemble::text_document("body", &[])
            .save(output)
            .is_ok()
    }
}

/// Capabilities with working HTML rendering and nothing else.
pub(crate) fn html_caps() -> Capabilities<'static> {
    Capabilities {
        office: &NullConversion,
        html: &StubHtml,
        layout: &NoAnchors,
    }
}

/// Minimal MAPI container with a subject, optional HTML body and byte
/// attachments (filename, content-id, data).
pub(crate) fn build_msg(
    subject: &str,
    html_body: Option<&str>,
    attachments: &[(&str, Option<&str>, &[u8])],
) -> Vec<u8> {
    let mut comp = cfb::CompoundFile::create(std::io::Cursor::new(Vec::new())).unwrap();
    write_unicode(&mut comp, "/__substg1.0_0037001F", subject);
    if let Some(html) = html_body {
        let mut s = comp.create_stream("/__substg1.0_10130102").unwrap();
        s.write_all(html.as_bytes()).unwrap();
    }
    for (i, (filename, cid, data)) in attachments.iter().enumerate() {
        let storage = format!("/__attach_version1.0_#{i:08X}");
        comp.create_storage(&storage).unwrap();
        write_unicode(&mut comp, &format!("{storage}/__substg1.0_3707001F"), filename);
        if let Some(cid) = cid {
            write_unicode(&mut comp, &format!("{storage}/__substg1.0_3712001F"), cid);
        }
        let mut s = comp
            .create_stream(format!("{storage}/__substg1.0_37010102"))
            .unwrap();
        s.write_all(data).unwrap();
    }
    comp.into_inner().into_inner()
}

fn write_unicode<W: std::io::Read + Write + std::io::Seek>(
    comp: &mut cfb::CompoundFile<W>,
    name: &str,
    value: &str,
) {
    let mut s = comp.create_stream(name).unwrap();
    for unit in value.encode_utf16() {
        s.write_all(&unit.to_le_bytes()).unwrap();
    }
}

/// Write root bytes to a named file under `dir`.
pub(crate) fn write_root(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

/// A real parsable one-page PDF, distinct per seed.
pub(crate) fn pdf_bytes(n: u8) -> Vec<u8> {
    let mut doc = mailfold_assemble::text_document(&format!("doc {n}"), &[]);
    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

/// A tiny valid PNG.
pub(crate) fn png_bytes() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(4, 4, image::Rgb([1, 2, 3]));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

/// Zip the given (name, contents) entries in order.
pub(crate) fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options: zip::write::FileOptions<()> = zip::write::FileOptions::default();
    for (name, data) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}
