//! Compound mail-message container reader
//!
//! Mail messages in the compound binary format are a mini filesystem of
//! named streams (`[MS-OXMSG]` over `[MS-CFB]`): property streams named
//! `__substg1.0_<PROPID><TYPE>` at the root, one storage per attachment
//! named `__attach_version1.0_#NNNNNNNN`, and nested messages as a
//! sub-storage of their carrying attachment.
//!
//! The reader exposes exactly what the decomposition walker needs: subject,
//! plain/HTML body, and the ordered attachment list with filename,
//! content-id, hidden hint and raw bytes, with nested messages parsed
//! recursively instead of re-serialized.
//!
//! Parsing is deliberately forgiving: a missing stream yields an empty or
//! absent field, never an error, because real-world producers omit streams
//! freely. Only a container that carries no message streams at all is
//! rejected.

pub mod error;

use log::debug;
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read, Seek};
use std::path::{Path, PathBuf};

pub use error::{MsgError, Result};

/// Property id + type suffixes of the streams the reader consumes.
const PROP_SUBJECT: u16 = 0x0037;
const PROP_BODY_PLAIN: u16 = 0x1000;
const PROP_BODY_HTML: u16 = 0x1013;
const PROP_ATTACH_FILENAME_SHORT: u16 = 0x3704;
const PROP_ATTACH_FILENAME_LONG: u16 = 0x3707;
const PROP_ATTACH_DISPLAY_NAME: u16 = 0x3001;
const PROP_ATTACH_CONTENT_ID: u16 = 0x3712;
const PROP_ATTACH_DATA: u16 = 0x3701;

const ATTACH_STORAGE_PREFIX: &str = "__attach_version1.0_#";
const PROPERTIES_STREAM: &str = "__properties_version1.0";
const SUBSTG_PREFIX: &str = "__substg1.0_";

/// A parsed mail message: the unit the walker recurses over.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailMessage {
    /// Subject line (empty when absent).
    pub subject: String,
    /// Plain-text body, when present.
    pub body_plain: Option<String>,
    /// HTML body, when present.
    pub body_html: Option<String>,
    /// Attachments in container storage order.
    pub attachments: Vec<MailAttachment>,
}

/// One attachment of a [`MailMessage`], in storage order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailAttachment {
    /// Best available filename (long name, short name, then display name).
    pub filename: String,
    /// Content-id for `cid:` references from the HTML body.
    pub content_id: Option<String>,
    /// Hidden/inline hint from the container's property stream.
    pub hidden: bool,
    /// Payload: raw bytes, or a recursively parsed nested message.
    pub payload: AttachmentPayload,
}

/// Attachment payload variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttachmentPayload {
    /// Ordinary file attachment bytes.
    Bytes(Vec<u8>),
    /// Nested message, already parsed.
    Message(MailMessage),
}

impl MailAttachment {
    /// Size in bytes of a file payload; 0 for nested messages.
    #[must_use]
    pub fn size(&self) -> usize {
        match &self.payload {
            AttachmentPayload::Bytes(b) => b.len(),
            AttachmentPayload::Message(_) => 0,
        }
    }
}

/// Quick check whether a compound-binary blob is a mail message.
///
/// Shares the CFB magic with legacy office files; the discriminator is the
/// presence of MAPI streams at the root.
#[must_use]
pub fn is_msg(bytes: &[u8]) -> bool {
    let Ok(comp) = cfb::CompoundFile::open(Cursor::new(bytes)) else {
        return false;
    };
    comp.read_root_storage()
        .any(|e| e.name() == PROPERTIES_STREAM || e.name().starts_with(SUBSTG_PREFIX))
}

/// Parse a mail message from a file path.
///
/// # Errors
///
/// Returns [`MsgError`] if the file cannot be opened, is not a compound
/// binary container, or carries no message streams.
///
/// # Examples
/// ```no_run
/// use mailfold_msg::parse_msg_from_path;
/// let msg = parse_msg_from_path("message.msg").unwrap();
/// println!("Subject: {}", msg.subject);
/// ```
pub fn parse_msg_from_path<P: AsRef<Path>>(path: P) -> Result<MailMessage> {
    let file = std::fs::File::open(path.as_ref())?;
    let mut comp = cfb::CompoundFile::open(std::io::BufReader::new(file))?;
    parse_message_storage(&mut comp, Path::new("/"), 0)
}

/// Parse a mail message from raw bytes.
///
/// # Errors
///
/// Returns [`MsgError`] if the bytes are not a compound binary container or
/// carry no message streams.
pub fn parse_msg(bytes: &[u8]) -> Result<MailMessage> {
    let mut comp = cfb::CompoundFile::open(Cursor::new(bytes))?;
    parse_message_storage(&mut comp, Path::new("/"), 0)
}

/// Hard bound on nested-message parsing inside one container file.
///
/// The walker applies its own depth bound across container boundaries; this
/// one only stops runaway nesting within a single compound file.
const MAX_EMBED_DEPTH: usize = 16;

fn parse_message_storage<R: Read + Seek>(
    comp: &mut cfb::CompoundFile<R>,
    storage: &Path,
    depth: usize,
) -> Result<MailMessage> {
    // Collect entry names first; opening streams needs &mut.
    let mut stream_names: Vec<String> = Vec::new();
    let mut attach_storages: Vec<String> = Vec::new();
    for entry in comp.read_storage(storage)? {
        if entry.is_stream() {
            stream_names.push(entry.name().to_string());
        } else if entry.name().starts_with(ATTACH_STORAGE_PREFIX) {
            attach_storages.push(entry.name().to_string());
        }
    }

    let is_message = stream_names
        .iter()
        .any(|n| n == PROPERTIES_STREAM || n.starts_with(SUBSTG_PREFIX));
    if !is_message && attach_storages.is_empty() {
        return Err(MsgError::NotAMessage(format!(
            "storage {} has no message streams",
            storage.display()
        )));
    }

    let subject =
        read_string_prop(comp, storage, &stream_names, PROP_SUBJECT).unwrap_or_default();
    let body_plain = read_string_prop(comp, storage, &stream_names, PROP_BODY_PLAIN);
    // The HTML body is stored as a binary property; decode leniently.
    let body_html = read_binary_prop(comp, storage, &stream_names, PROP_BODY_HTML)
        .map(|b| String::from_utf8_lossy(&b).into_owned());

    // Attachment storages enumerate by their hex suffix, which is the
    // container's document order.
    attach_storages.sort_by_key(|name| attachment_index(name));

    let mut attachments = Vec::with_capacity(attach_storages.len());
    for name in attach_storages {
        let attach_path = storage.join(&name);
        match parse_attachment(comp, &attach_path, depth) {
            Ok(att) => attachments.push(att),
            Err(e) => {
                // A broken attachment storage must not lose the message.
                debug!("Skipping unreadable attachment storage {name}: {e}");
            }
        }
    }

    Ok(MailMessage {
        subject,
        body_plain,
        body_html,
        attachments,
    })
}

fn parse_attachment<R: Read + Seek>(
    comp: &mut cfb::CompoundFile<R>,
    storage: &Path,
    depth: usize,
) -> Result<MailAttachment> {
    let mut stream_names: Vec<String> = Vec::new();
    let mut has_embedded_message = false;
    for entry in comp.read_storage(storage)? {
        if entry.is_stream() {
            stream_names.push(entry.name().to_string());
        } else if entry.name() == format!("{SUBSTG_PREFIX}{:04X}000D", PROP_ATTACH_DATA) {
            has_embedded_message = true;
        }
    }

    let filename = read_string_prop(comp, storage, &stream_names, PROP_ATTACH_FILENAME_LONG)
        .or_else(|| read_string_prop(comp, storage, &stream_names, PROP_ATTACH_FILENAME_SHORT))
        .or_else(|| read_string_prop(comp, storage, &stream_names, PROP_ATTACH_DISPLAY_NAME))
        .unwrap_or_else(|| "attachment".to_string());
    let content_id = read_string_prop(comp, storage, &stream_names, PROP_ATTACH_CONTENT_ID);
    let hidden = read_hidden_flag(comp, storage, &stream_names);

    let payload = if has_embedded_message {
        if depth >= MAX_EMBED_DEPTH {
            return Err(MsgError::ParseError(format!(
                "embedded message nesting exceeds {MAX_EMBED_DEPTH}"
            )));
        }
        let embedded = storage.join(format!("{SUBSTG_PREFIX}{:04X}000D", PROP_ATTACH_DATA));
        AttachmentPayload::Message(parse_message_storage(comp, &embedded, depth + 1)?)
    } else {
        let data = read_binary_prop(comp, storage, &stream_names, PROP_ATTACH_DATA)
            .ok_or_else(|| {
                MsgError::ParseError(format!(
                    "attachment storage {} has no data stream",
                    storage.display()
                ))
            })?;
        AttachmentPayload::Bytes(data)
    };

    Ok(MailAttachment {
        filename,
        content_id,
        hidden,
        payload,
    })
}

/// Numeric suffix of `__attach_version1.0_#NNNNNNNN`.
fn attachment_index(name: &str) -> u32 {
    name.strip_prefix(ATTACH_STORAGE_PREFIX)
        .and_then(|hex| u32::from_str_radix(hex, 16).ok())
        .unwrap_or(u32::MAX)
}

/// Read a string property, preferring the Unicode variant (`001F`, UTF-16 LE)
/// over the legacy 8-bit variant (`001E`).
fn read_string_prop<R: Read + Seek>(
    comp: &mut cfb::CompoundFile<R>,
    storage: &Path,
    stream_names: &[String],
    prop: u16,
) -> Option<String> {
    let unicode = format!("{SUBSTG_PREFIX}{prop:04X}001F");
    let ansi = format!("{SUBSTG_PREFIX}{prop:04X}001E");

    if stream_names.iter().any(|n| n == &unicode) {
        let bytes = read_stream(comp, &storage.join(&unicode))?;
        let utf16: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        let s = String::from_utf16_lossy(&utf16);
        return Some(s.trim_end_matches('\0').to_string());
    }
    if stream_names.iter().any(|n| n == &ansi) {
        let bytes = read_stream(comp, &storage.join(&ansi))?;
        let s = String::from_utf8_lossy(&bytes).into_owned();
        return Some(s.trim_end_matches('\0').to_string());
    }
    None
}

/// Read a binary property (`0102` type suffix).
fn read_binary_prop<R: Read + Seek>(
    comp: &mut cfb::CompoundFile<R>,
    storage: &Path,
    stream_names: &[String],
    prop: u16,
) -> Option<Vec<u8>> {
    let name = format!("{SUBSTG_PREFIX}{prop:04X}0102");
    if stream_names.iter().any(|n| n == &name) {
        read_stream(comp, &storage.join(&name))
    } else {
        None
    }
}

fn read_stream<R: Read + Seek>(comp: &mut cfb::CompoundFile<R>, path: &Path) -> Option<Vec<u8>> {
    let mut stream = comp.open_stream(path).ok()?;
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).ok()?;
    Some(buf)
}

/// Best-effort hidden/inline hint from the fixed-width property stream.
///
/// Attachment property streams carry an 8-byte header followed by 16-byte
/// entries `[type:u16][id:u16][flags:u32][value:8]`. `PR_ATTACHMENT_HIDDEN`
/// (`0x7FFE`, boolean) set, or `PR_ATTACH_FLAGS` (`0x3714`) carrying the
/// rendered-in-body bit, marks the attachment as inline material.
fn read_hidden_flag<R: Read + Seek>(
    comp: &mut cfb::CompoundFile<R>,
    storage: &Path,
    stream_names: &[String],
) -> bool {
    if !stream_names.iter().any(|n| n == PROPERTIES_STREAM) {
        return false;
    }
    let Some(bytes) = read_stream(comp, &storage.join(PROPERTIES_STREAM)) else {
        return false;
    };
    if bytes.len() < 8 {
        return false;
    }
    for entry in bytes[8..].chunks_exact(16) {
        let prop_type = u16::from_le_bytes([entry[0], entry[1]]);
        let prop_id = u16::from_le_bytes([entry[2], entry[3]]);
        match (prop_id, prop_type) {
            // PR_ATTACHMENT_HIDDEN, PT_BOOLEAN
            (0x7FFE, 0x000B) if entry[8] != 0 => return true,
            // PR_ATTACH_FLAGS, PT_LONG: bit 2 = rendered in the HTML body
            (0x3714, 0x0003) => {
                let value = u32::from_le_bytes([entry[8], entry[9], entry[10], entry[11]]);
                if value & 0x4 != 0 {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}

/// Render a parsed message to a minimal standalone HTML file.
///
/// Used to hand the body to the HTML-to-PDF worker: the stored HTML body is
/// written as-is, the plain-text body is escaped and wrapped, and an empty
/// body becomes a subject-only page.
pub fn write_body_html(msg: &MailMessage, dir: &Path, stem: &str) -> std::io::Result<PathBuf> {
    let path = dir.join(format!("{stem}.html"));
    let html = match (&msg.body_html, &msg.body_plain) {
        (Some(html), _) => html.clone(),
        (None, Some(plain)) => format!(
            "<html><body><pre>{}</pre></body></html>",
            escape_html(plain)
        ),
        (None, None) => format!(
            "<html><body><h3>{}</h3></body></html>",
            escape_html(&msg.subject)
        ),
    };
    std::fs::write(&path, html)?;
    Ok(path)
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
