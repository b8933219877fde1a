//! Decomposition walker
//!
//! Depth-first traversal of one root message: the body becomes the first
//! fragment, every surviving attachment becomes one or more fragments after
//! it, and containers (archives, nested messages, office documents with
//! embedded objects) recurse in their natural listing order. The fragment
//! sequence is exactly the depth-first discovery sequence; nothing is
//! reordered afterwards.
//!
//! Failure policy: a node that cannot be converted degrades to a
//! self-describing placeholder page in its position. The walk itself only
//! errors when the root cannot be read at all.

use crate::context::WalkContext;
use crate::error::Result;
use crate::filter::{dedup_entries, surviving_attachments};
use crate::mapper::map_records;
use log::{debug, warn};
use mailfold_assemble::plan::SubDocument;
use mailfold_core::{
    ContainerNode, ExtractedObjectRecord, FileClass, Fragment, HtmlToPdf, LayoutOracle,
    NodeContent, NodeKind, OfficeToPdf,
};
use mailfold_msg::{AttachmentPayload, MailMessage};
use std::path::Path;

/// External collaborators the walker converts through.
pub struct Capabilities<'a> {
    /// Office-to-PDF conversion.
    pub office: &'a dyn OfficeToPdf,
    /// HTML rendering.
    pub html: &'a dyn HtmlToPdf,
    /// Page-layout measurement for embedded-object placement.
    pub layout: &'a dyn LayoutOracle,
}

/// Decompose one root message file into its ordered fragment list.
///
/// # Errors
///
/// Fails only when the root file cannot be read or parsed; everything
/// below the root degrades to placeholders instead.
pub fn decompose_message(
    root: &Path,
    ctx: &mut WalkContext,
    caps: &Capabilities<'_>,
) -> Result<Vec<Fragment>> {
    let label = root
        .file_name()
        .map_or_else(|| "message.msg".to_string(), |n| n.to_string_lossy().into_owned());
    let node = ContainerNode::new(
        label,
        NodeKind::RootMessage,
        NodeContent::File(root.to_path_buf()),
        Vec::new(),
        0,
    );
    debug!("Walking {:?} '{}'", node.kind, node.label);
    let msg = match &node.content {
        NodeContent::File(path) => mailfold_msg::parse_msg_from_path(path)?,
        NodeContent::Bytes(bytes) => mailfold_msg::parse_msg(bytes)?,
    };
    Ok(message_fragments(&msg, &node.label, node.parent_chain.clone(), node.depth, ctx, caps))
}

/// Fragments for one message: body first, surviving attachments after, in
/// storage order.
fn message_fragments(
    msg: &MailMessage,
    label: &str,
    parent_chain: Vec<String>,
    depth: usize,
    ctx: &mut WalkContext,
    caps: &Capabilities<'_>,
) -> Vec<Fragment> {
    let breadcrumb = if parent_chain.is_empty() {
        label.to_string()
    } else {
        format!("{} > {label}", parent_chain.join(" > "))
    };
    let mut fragments = Vec::new();

    fragments.extend(body_fragment(msg, &breadcrumb, ctx, caps));

    let mut child_chain = parent_chain;
    child_chain.push(label.to_string());
    let survivors: Vec<MailAttachmentRef> = surviving_attachments(msg, &ctx.options.inline_filter)
        .into_iter()
        .map(|att| MailAttachmentRef {
            filename: att.filename.clone(),
            payload: att.payload.clone(),
        })
        .collect();

    for att in survivors {
        match att.payload {
            AttachmentPayload::Message(nested) => {
                let nested_label = if att.filename.is_empty() {
                    format!("{}.msg", nested.subject)
                } else {
                    att.filename.clone()
                };
                if depth + 1 >= ctx.options.max_depth {
                    let crumb = format!("{} > {nested_label}", child_chain.join(" > "));
                    fragments.extend(degrade(&crumb, "nesting too deep", ctx));
                } else {
                    fragments.extend(message_fragments(
                        &nested,
                        &nested_label,
                        child_chain.clone(),
                        depth + 1,
                        ctx,
                        caps,
                    ));
                }
            }
            AttachmentPayload::Bytes(bytes) => {
                let kind = if classify(&att.filename, &bytes) == FileClass::Message {
                    NodeKind::NestedMessage
                } else {
                    NodeKind::Attachment
                };
                let node = ContainerNode::new(
                    att.filename.clone(),
                    kind,
                    NodeContent::Bytes(bytes),
                    child_chain.clone(),
                    depth + 1,
                );
                fragments.extend(process_node(node, ctx, caps));
            }
        }
    }
    fragments
}

/// Owned snapshot of a surviving attachment; recursion needs the message
/// borrow released before converting children.
struct MailAttachmentRef {
    filename: String,
    payload: AttachmentPayload,
}

/// Render the message body as the message's own unit.
fn body_fragment(
    msg: &MailMessage,
    breadcrumb: &str,
    ctx: &mut WalkContext,
    caps: &Capabilities<'_>,
) -> Vec<Fragment> {
    let label = format!("{breadcrumb} (body)");
    let reserved = ctx.artifact_path("body", "html");
    let stem = reserved
        .file_stem()
        .map_or_else(|| "body".to_string(), |s| s.to_string_lossy().into_owned());

    let html_path = match mailfold_msg::write_body_html(msg, ctx.workdir(), &stem) {
        Ok(path) => path,
        Err(e) => {
            warn!("Could not write body HTML for '{breadcrumb}': {e}");
            return degrade(&label, "body could not be rendered", ctx);
        }
    };
    let pdf_path = ctx.artifact_path(&stem, "pdf");
    if caps.html.convert(&html_path, &pdf_path) {
        ctx.tick(false);
        vec![Fragment::content(pdf_path, label)]
    } else {
        degrade(&label, "body could not be rendered", ctx)
    }
}

/// Convert one node into fragments, recursing into containers.
fn process_node(node: ContainerNode, ctx: &mut WalkContext, caps: &Capabilities<'_>) -> Vec<Fragment> {
    let breadcrumb = node.breadcrumb();
    let Some(bytes) = node.bytes() else {
        return degrade(&breadcrumb, "payload not materialized", ctx);
    };
    let class = classify(&node.label, bytes);
    debug!("Node '{breadcrumb}' ({:?}) classified as {class:?}", node.kind);

    match class {
        FileClass::Pdf => match ctx.materialize(&node.label, "pdf", bytes) {
            Ok(path) => {
                ctx.tick(false);
                vec![Fragment::content(path, breadcrumb)]
            }
            Err(e) => {
                warn!("Could not materialize '{breadcrumb}': {e}");
                degrade(&breadcrumb, "payload could not be written", ctx)
            }
        },
        FileClass::Image => match mailfold_assemble::image_document(bytes) {
            Ok(mut doc) => {
                let path = ctx.artifact_path(&node.label, "pdf");
                match doc.save(&path) {
                    Ok(_) => {
                        ctx.tick(false);
                        vec![Fragment::content(path, breadcrumb)]
                    }
                    Err(e) => {
                        warn!("Could not save wrapped image '{breadcrumb}': {e}");
                        degrade(&breadcrumb, "image could not be wrapped", ctx)
                    }
                }
            }
            Err(e) => {
                debug!("Image decode failed for '{breadcrumb}': {e}");
                degrade(&breadcrumb, "image could not be decoded", ctx)
            }
        },
        FileClass::Html => {
            let Ok(html_path) = ctx.materialize(&node.label, "html", bytes) else {
                return degrade(&breadcrumb, "payload could not be written", ctx);
            };
            let pdf_path = ctx.artifact_path(&node.label, "pdf");
            if caps.html.convert(&html_path, &pdf_path) {
                ctx.tick(false);
                vec![Fragment::content(pdf_path, breadcrumb)]
            } else {
                degrade(&breadcrumb, "HTML could not be rendered", ctx)
            }
        }
        FileClass::ZipArchive | FileClass::SevenZArchive => {
            process_archive(&node, class, ctx, caps)
        }
        FileClass::Message => {
            if node.depth >= ctx.options.max_depth {
                return degrade(&breadcrumb, "nesting too deep", ctx);
            }
            match mailfold_msg::parse_msg(bytes) {
                Ok(msg) => message_fragments(
                    &msg,
                    &node.label,
                    node.parent_chain.clone(),
                    node.depth,
                    ctx,
                    caps,
                ),
                Err(e) => {
                    warn!("Nested message '{breadcrumb}' unparsable: {e}");
                    degrade(&breadcrumb, "message could not be parsed", ctx)
                }
            }
        }
        FileClass::Office => process_office(&node, ctx, caps),
        FileClass::Unsupported => degrade(&breadcrumb, "unsupported format", ctx),
    }
}

/// Classification with the compound-container tiebreak: legacy office and
/// mail messages share the same magic, so CFB payloads are checked for MAPI
/// streams before being handed to the office path.
pub(crate) fn classify(label: &str, bytes: &[u8]) -> FileClass {
    let class = FileClass::detect(label, bytes);
    if class == FileClass::Office
        && bytes.starts_with(&mailfold_core::format::CFB_MAGIC)
        && mailfold_msg::is_msg(bytes)
    {
        FileClass::Message
    } else {
        class
    }
}

fn process_archive(
    node: &ContainerNode,
    class: FileClass,
    ctx: &mut WalkContext,
    caps: &Capabilities<'_>,
) -> Vec<Fragment> {
    let breadcrumb = node.breadcrumb();
    if node.depth >= ctx.options.max_depth {
        return degrade(&breadcrumb, "nesting too deep", ctx);
    }
    let bytes = node.bytes().unwrap_or_default();
    let entries = match class {
        FileClass::ZipArchive => mailfold_archive::read_zip_entries_from_bytes(bytes),
        _ => mailfold_archive::read_7z_entries_from_bytes(bytes),
    };
    let entries = match entries {
        Ok(entries) => dedup_entries(entries),
        Err(mailfold_archive::ArchiveError::PasswordProtected) => {
            return degrade(&breadcrumb, "archive is password-protected", ctx);
        }
        Err(e) => {
            warn!("Archive '{breadcrumb}' unreadable: {e}");
            return degrade(&breadcrumb, "archive could not be opened", ctx);
        }
    };
    if entries.is_empty() {
        return degrade(&breadcrumb, "archive is empty", ctx);
    }

    let mut fragments = Vec::new();
    for entry in entries {
        let kind = if classify(&entry.name, &entry.contents) == FileClass::Message {
            NodeKind::NestedMessage
        } else {
            NodeKind::ArchiveEntry
        };
        let child = ContainerNode::new(
            entry.name,
            kind,
            NodeContent::Bytes(entry.contents),
            node.child_chain(),
            node.depth + 1,
        );
        fragments.extend(process_node(child, ctx, caps));
    }
    fragments
}

/// Office documents: convert the host, recover its embedded objects, map
/// them to pages, and reassemble into one fragment. When the host
/// conversion fails the embedded objects still survive, appended after the
/// host's placeholder.
fn process_office(
    node: &ContainerNode,
    ctx: &mut WalkContext,
    caps: &Capabilities<'_>,
) -> Vec<Fragment> {
    let breadcrumb = node.breadcrumb();
    let bytes = node.bytes().unwrap_or_default();
    let (stem, ext) = split_office_name(&node.label, bytes);

    let host_path = match ctx.materialize(&stem, &ext, bytes) {
        Ok(path) => path,
        Err(e) => {
            warn!("Could not materialize '{breadcrumb}': {e}");
            return degrade(&breadcrumb, "payload could not be written", ctx);
        }
    };

    let mut records = extract_office_objects(&host_path, ctx);
    let anchors = caps.layout.anchors(&host_path);
    map_records(&mut records, &anchors);

    let converted = ctx.artifact_path(&stem, "pdf");
    let host_ok = caps.office.convert(&host_path, &converted);
    ctx.tick(!host_ok);

    let mut subs = Vec::new();
    for record in &records {
        let (pdf_path, degraded) = convert_embedded(record, node, ctx, caps);
        ctx.tick(degraded);
        if let Some(pdf_path) = pdf_path {
            subs.push(SubDocument {
                pdf_path,
                host_page: record.host_page,
                document_order: record.document_order,
            });
        }
    }

    if host_ok {
        let output = ctx.artifact_path(&stem, "pdf");
        match mailfold_assemble::reassemble(&converted, &subs, &output) {
            Ok(_) => vec![Fragment::content(output, breadcrumb)],
            Err(e) => {
                warn!("Reassembly failed for '{breadcrumb}': {e}");
                vec![Fragment::content(converted, breadcrumb)]
            }
        }
    } else {
        // Placeholder for the host, embedded objects appended after it.
        let mut fragments = placeholder_only(&breadcrumb, "office document could not be converted", ctx);
        for (i, sub) in subs.iter().enumerate() {
            fragments.push(Fragment::content(
                sub.pdf_path.clone(),
                format!("{breadcrumb} > embedded object {}", i + 1),
            ));
        }
        fragments
    }
}

/// Markup scan, never fatal.
pub(crate) fn extract_office_objects(
    host_path: &Path,
    ctx: &mut WalkContext,
) -> Vec<ExtractedObjectRecord> {
    let Ok(obj_dir) = ctx.object_dir() else {
        return Vec::new();
    };
    match mailfold_ole::scan_office_objects(
        host_path,
        &obj_dir,
        ctx.options.min_package_stream_len,
    ) {
        Ok(records) => records,
        Err(e) => {
            warn!("Embedded-object scan failed for {}: {e}", host_path.display());
            Vec::new()
        }
    }
}

/// Convert one recovered embedded object to a standalone PDF. Embedded
/// containers are not recursed into; they degrade to placeholders in their
/// mapped position.
fn convert_embedded(
    record: &ExtractedObjectRecord,
    host: &ContainerNode,
    ctx: &mut WalkContext,
    caps: &Capabilities<'_>,
) -> (Option<std::path::PathBuf>, bool) {
    let name = record
        .file_path
        .file_name()
        .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
    let child = ContainerNode::new(
        name.clone(),
        NodeKind::EmbeddedObject,
        NodeContent::File(record.file_path.clone()),
        host.child_chain(),
        host.depth + 1,
    );
    let label = child.breadcrumb();
    debug!("Converting {:?} '{label}'", child.kind);
    let bytes = match std::fs::read(&record.file_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Embedded payload unreadable '{label}': {e}");
            return (placeholder_pdf(&label, "payload unreadable", ctx), true);
        }
    };

    match FileClass::detect(&name, &bytes) {
        FileClass::Pdf => (Some(record.file_path.clone()), false),
        FileClass::Image => {
            let path = ctx.artifact_path(&name, "pdf");
            match mailfold_assemble::wrap_image_as_pdf(&record.file_path, &path) {
                Ok(()) => (Some(path), false),
                Err(e) => {
                    debug!("Embedded image '{label}' not wrappable: {e}");
                    (placeholder_pdf(&label, "image could not be wrapped", ctx), true)
                }
            }
        }
        FileClass::Office => {
            let path = ctx.artifact_path(&name, "pdf");
            if caps.office.convert(&record.file_path, &path) {
                (Some(path), false)
            } else {
                (placeholder_pdf(&label, "embedded document could not be converted", ctx), true)
            }
        }
        FileClass::Html => {
            let path = ctx.artifact_path(&name, "pdf");
            if caps.html.convert(&record.file_path, &path) {
                (Some(path), false)
            } else {
                (placeholder_pdf(&label, "embedded HTML could not be rendered", ctx), true)
            }
        }
        _ => (placeholder_pdf(&label, "embedded object not convertible", ctx), true),
    }
}

/// Office host name split into stem and a usable extension, sniffing when
/// the label carries none.
fn split_office_name(label: &str, bytes: &[u8]) -> (String, String) {
    let path = Path::new(label);
    if let (Some(stem), Some(ext)) = (
        path.file_stem().and_then(|s| s.to_str()),
        path.extension().and_then(|e| e.to_str()),
    ) {
        return (stem.to_string(), ext.to_ascii_lowercase());
    }
    let ext = if bytes.starts_with(b"PK\x03\x04") {
        "docx"
    } else if bytes.starts_with(b"{\\rtf") {
        "rtf"
    } else {
        "doc"
    };
    (label.to_string(), ext.to_string())
}

/// Write a placeholder PDF, returning its path when it could be written.
fn placeholder_pdf(label: &str, reason: &str, ctx: &mut WalkContext) -> Option<std::path::PathBuf> {
    let path = ctx.artifact_path("placeholder", "pdf");
    match mailfold_assemble::write_placeholder_pdf(&path, label, reason) {
        Ok(_) => Some(path),
        Err(e) => {
            warn!("Could not write placeholder for '{label}': {e}");
            None
        }
    }
}

/// Degrade a node to a placeholder fragment, counting its unit as degraded.
fn degrade(label: &str, reason: &str, ctx: &mut WalkContext) -> Vec<Fragment> {
    ctx.tick(true);
    placeholder_only(label, reason, ctx)
}

/// Placeholder fragment without a progress tick.
fn placeholder_only(label: &str, reason: &str, ctx: &mut WalkContext) -> Vec<Fragment> {
    match placeholder_pdf(label, reason, ctx) {
        Some(path) => vec![Fragment::placeholder(path, label, reason)],
        None => Vec::new(),
    }
}
