//! Office markup scan for embedded objects
//!
//! Two host shapes are scanned:
//!
//! - OOXML hosts (zip containers): `word/document.xml` is walked in document
//!   order via `quick-xml`, every OLE-object reference is resolved through
//!   the part relationships to its embedding part, and the recovered payload
//!   is materialized with its markup position (paragraph, run, character
//!   offset). Embedding parts never referenced from the markup (and all
//!   spreadsheet/presentation embeddings, which carry no flowed markup) come
//!   back as orphaned records.
//! - Legacy compound-binary hosts: the `ObjectPool` storage is enumerated
//!   and each embedded object recovered; the legacy markup carries no
//!   scannable anchors, so all records are orphaned.
//!
//! Records are numbered by a single strictly increasing `document_order`
//! counter in discovery order; orphans always follow in-flow records.

use crate::error::{OleError, Result};
use crate::{extract_payload, OLE10_NATIVE_STREAM, PACKAGE_STREAM};
use log::{debug, warn};
use mailfold_core::{ExtractedObjectRecord, FileClass};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

/// One OLE reference found in flowed markup.
struct MarkupRef {
    prog_id: String,
    rel_id: String,
    paragraph: i32,
    run: i32,
    char_position: i32,
}

/// Scan an office host document for embedded objects.
///
/// Recovered payloads are materialized under `out_dir`; the returned records
/// are in document order with orphans last. Hosts that are neither zip-like
/// nor compound-binary yield an empty list.
///
/// # Errors
///
/// Returns [`OleError`] when the host cannot be read at all; individual
/// malformed embeddings are skipped with a warning.
pub fn scan_office_objects(
    host: &Path,
    out_dir: &Path,
    min_stream_len: usize,
) -> Result<Vec<ExtractedObjectRecord>> {
    let bytes = std::fs::read(host)?;
    match FileClass::sniff(&bytes) {
        Some(FileClass::ZipArchive) => scan_ooxml(&bytes, out_dir, min_stream_len),
        Some(FileClass::Office) if bytes.starts_with(&mailfold_core::format::CFB_MAGIC) => {
            scan_object_pool(&bytes, out_dir, min_stream_len)
        }
        _ => Ok(Vec::new()),
    }
}

fn scan_ooxml(bytes: &[u8], out_dir: &Path, min_stream_len: usize) -> Result<Vec<ExtractedObjectRecord>> {
    let mut zip = zip::ZipArchive::new(Cursor::new(bytes))?;

    let rels = read_part(&mut zip, "word/_rels/document.xml.rels")
        .map(|xml| parse_relationships(&xml))
        .unwrap_or_default();
    let markup = read_part(&mut zip, "word/document.xml");
    let refs = markup.map(|xml| collect_markup_refs(&xml)).unwrap_or_default();

    let mut records = Vec::new();
    let mut order = 0usize;
    let mut used_parts: Vec<String> = Vec::new();

    // Phase one: in-flow references in markup order.
    for r in refs {
        let Some(target) = rels.get(&r.rel_id) else {
            debug!("OLE reference {} has no relationship target", r.rel_id);
            continue;
        };
        let part_name = resolve_part_name(target);
        let Some(part) = read_part(&mut zip, &part_name) else {
            warn!("Embedding part {part_name} missing from container");
            continue;
        };
        used_parts.push(part_name.clone());
        if let Some(path) = materialize_embedding(&part, &part_name, out_dir, order, min_stream_len)
        {
            records.push(ExtractedObjectRecord::in_flow(
                path,
                order,
                r.prog_id,
                r.paragraph,
                r.run,
                r.char_position,
            ));
            order += 1;
        }
    }

    // Phase two: embedding parts never referenced from flowed markup.
    let all_names: Vec<String> = (0..zip.len())
        .filter_map(|i| zip.by_index(i).ok().map(|f| f.name().to_string()))
        .collect();
    for name in all_names {
        if !name.contains("/embeddings/") || used_parts.contains(&name) {
            continue;
        }
        let Some(part) = read_part(&mut zip, &name) else {
            continue;
        };
        if let Some(path) = materialize_embedding(&part, &name, out_dir, order, min_stream_len) {
            records.push(ExtractedObjectRecord::orphaned(path, order, "Package"));
            order += 1;
        }
    }

    Ok(records)
}

fn scan_object_pool(
    bytes: &[u8],
    out_dir: &Path,
    min_stream_len: usize,
) -> Result<Vec<ExtractedObjectRecord>> {
    let mut comp = cfb::CompoundFile::open(Cursor::new(bytes))
        .map_err(|e| OleError::InvalidHost(format!("compound host: {e}")))?;

    if !comp.is_storage("/ObjectPool") {
        return Ok(Vec::new());
    }
    let pool: Vec<String> = comp
        .read_storage("/ObjectPool")?
        .filter(|e| e.is_storage())
        .map(|e| e.name().to_string())
        .collect();

    let mut records = Vec::new();
    let mut order = 0usize;
    for name in pool {
        // Rebuild the object's container as standalone bytes so the shared
        // extraction path applies unchanged.
        let mut object = cfb::CompoundFile::create(Cursor::new(Vec::new()))
            .map_err(|e| OleError::InvalidHost(format!("rebuild container: {e}")))?;
        let mut copied = false;
        for stream_name in [OLE10_NATIVE_STREAM, PACKAGE_STREAM, "CONTENTS"] {
            let src = format!("/ObjectPool/{name}/{stream_name}");
            if let Ok(mut stream) = comp.open_stream(&src) {
                let mut data = Vec::new();
                if stream.read_to_end(&mut data).is_ok() {
                    use std::io::Write;
                    if let Ok(mut dst) = object.create_stream(format!("/{stream_name}")) {
                        if dst.write_all(&data).is_ok() {
                            copied = true;
                        }
                    }
                }
            }
        }
        if !copied {
            debug!("ObjectPool entry {name} carries no recognized stream");
            continue;
        }
        let container = object.into_inner().into_inner();
        let Some(payload) = extract_payload(&container, min_stream_len) else {
            continue;
        };
        if payload.is_noise() {
            debug!("Dropping noise payload from ObjectPool entry {name}");
            continue;
        }
        match write_payload(out_dir, order, &payload.name, &payload.data) {
            Ok(path) => {
                records.push(ExtractedObjectRecord::orphaned(
                    path,
                    order,
                    payload.declared_class,
                ));
                order += 1;
            }
            Err(e) => warn!("Failed to materialize ObjectPool payload {name}: {e}"),
        }
    }
    Ok(records)
}

/// Recover and materialize one embedding part; `None` drops it as noise.
fn materialize_embedding(
    part: &[u8],
    part_name: &str,
    out_dir: &Path,
    order: usize,
    min_stream_len: usize,
) -> Option<PathBuf> {
    let (name, data) = if part_name.to_ascii_lowercase().ends_with(".bin") {
        let payload = extract_payload(part, min_stream_len)?;
        if payload.is_noise() {
            debug!("Dropping noise payload from {part_name}");
            return None;
        }
        (payload.name, payload.data)
    } else {
        // Non-compound embedding parts (e.g. a directly stored spreadsheet)
        // are the payload themselves.
        let base = part_name.rsplit('/').next().unwrap_or(part_name);
        (base.to_string(), part.to_vec())
    };
    match write_payload(out_dir, order, &name, &data) {
        Ok(path) => Some(path),
        Err(e) => {
            warn!("Failed to materialize embedding {part_name}: {e}");
            None
        }
    }
}

fn write_payload(out_dir: &Path, order: usize, name: &str, data: &[u8]) -> std::io::Result<PathBuf> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("object.bin");
    let path = out_dir.join(format!("embedded_{order:03}_{base}"));
    std::fs::write(&path, data)?;
    Ok(path)
}

/// Resolve a relationship target to a zip part name: absolute targets
/// (`/word/...`) drop the leading slash, relative targets are resolved
/// against the `word/` base part.
fn resolve_part_name(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("word/{target}"),
    }
}

fn read_part(zip: &mut zip::ZipArchive<Cursor<&[u8]>>, name: &str) -> Option<Vec<u8>> {
    let mut file = zip.by_name(name).ok()?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf).ok()?;
    Some(buf)
}

/// Parse a `.rels` part into an id → target map.
fn parse_relationships(xml: &[u8]) -> HashMap<String, String> {
    let mut map = HashMap::new();
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e) | Event::Empty(e)) if e.name().as_ref() == b"Relationship" => {
                let mut id = None;
                let mut target = None;
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"Id" => id = Some(String::from_utf8_lossy(&attr.value).into_owned()),
                        b"Target" => {
                            target = Some(String::from_utf8_lossy(&attr.value).into_owned());
                        }
                        _ => {}
                    }
                }
                if let (Some(id), Some(target)) = (id, target) {
                    map.insert(id, target);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!("Malformed relationships part: {e}");
                break;
            }
            _ => {}
        }
        buf.clear();
    }
    map
}

/// Walk flowed markup, emitting OLE references with their positions.
fn collect_markup_refs(xml: &[u8]) -> Vec<MarkupRef> {
    let mut refs = Vec::new();
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();

    let mut paragraph = -1i32;
    let mut run = -1i32;
    let mut char_position = 0i32;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e) | Event::Empty(e)) => match e.name().as_ref() {
                b"w:p" => {
                    paragraph += 1;
                    run = -1;
                }
                b"w:r" => run += 1,
                b"o:OLEObject" => {
                    let mut prog_id = String::new();
                    let mut rel_id = String::new();
                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"ProgID" => {
                                prog_id = String::from_utf8_lossy(&attr.value).into_owned();
                            }
                            b"r:id" => {
                                rel_id = String::from_utf8_lossy(&attr.value).into_owned();
                            }
                            _ => {}
                        }
                    }
                    if !rel_id.is_empty() {
                        refs.push(MarkupRef {
                            prog_id,
                            rel_id,
                            paragraph: paragraph.max(0),
                            run: run.max(0),
                            char_position,
                        });
                    }
                }
                _ => {}
            },
            Ok(Event::Text(t)) => {
                char_position += i32::try_from(t.len()).unwrap_or(0);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!("Malformed document markup: {e}");
                break;
            }
            _ => {}
        }
        buf.clear();
    }
    refs
}
