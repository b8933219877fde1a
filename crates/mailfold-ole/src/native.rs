//! Legacy native-object stream parser
//!
//! The legacy embedding convention stores the payload in a stream whose
//! layout real-world producers never quite agreed on: a declared total size,
//! a type tag, two NUL-terminated strings (display label, then source path),
//! then some producer-specific padding before a 4-byte data length and the
//! payload itself. Because the padding varies, the parser works through an
//! ordered allow-list of recovery strategies instead of trusting any single
//! declared offset; each candidate length must be plausible *and* the bytes
//! it points at must match a known signature for the declared extension.

use log::debug;
use mailfold_core::format;

/// Payload recovered from a legacy native stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativePayload {
    /// Display label stored by the producer.
    pub label: String,
    /// Original source path stored by the producer.
    pub source_path: String,
    /// Recovered payload bytes.
    pub data: Vec<u8>,
    /// Whether the payload boundary was validated by a signature; raw
    /// remainders rescued by the last-resort strategy are unvalidated.
    pub validated: bool,
}

/// Look-ahead window for the byte-by-byte signature scan.
const SIGNATURE_SCAN_WINDOW: usize = 512;

/// Parse a legacy native-object stream.
///
/// Returns `None` only when not even the raw-remainder fallback has bytes to
/// offer; malformed input never panics or errors.
pub fn parse_native_stream(bytes: &[u8]) -> Option<NativePayload> {
    // u32 declared total size + u16 type tag.
    if bytes.len() < 6 {
        return None;
    }
    let declared_total = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    let mut cursor = 6;

    let label = read_cstr(bytes, &mut cursor)?;
    let source_path = read_cstr(bytes, &mut cursor)?;

    // Declared extension used to validate candidate payload boundaries.
    let ext = extension_of(&source_path)
        .or_else(|| extension_of(&label))
        .unwrap_or_default();

    debug!(
        "native stream: label={label:?} path={source_path:?} declared_total={declared_total} \
         cursor={cursor} len={}",
        bytes.len()
    );

    // Strategy allow-list, attempted in order. The fixed skips correspond to
    // producer variants observed in the wild; this is a documented list, not
    // an inferred format.
    let strategies: [fn(&[u8], usize, &str) -> Option<(usize, usize)>; 4] = [
        length_at_offset::<0>,
        length_at_offset::<4>,
        length_at_offset::<8>,
        temp_path_layout,
    ];
    for strategy in strategies {
        if let Some((start, len)) = strategy(bytes, cursor, &ext) {
            return Some(NativePayload {
                label,
                source_path,
                data: bytes[start..start + len].to_vec(),
                validated: true,
            });
        }
    }

    // No declared-length candidate validated: scan for any recognized
    // signature within a bounded window.
    if let Some(offset) = format::find_signature(&bytes[cursor..], SIGNATURE_SCAN_WINDOW) {
        let start = cursor + offset;
        // A plausible length field directly before the signature wins over
        // taking the whole remainder.
        let len = length_just_before(bytes, start).unwrap_or(bytes.len() - start);
        return Some(NativePayload {
            label,
            source_path,
            data: bytes[start..start + len].to_vec(),
            validated: true,
        });
    }

    // Last resort: hand back the raw remainder tagged unvalidated rather
    // than discarding it.
    if cursor < bytes.len() {
        return Some(NativePayload {
            label,
            source_path,
            data: bytes[cursor..].to_vec(),
            validated: false,
        });
    }
    None
}

/// Candidate: a u32 length field `SKIP` bytes past the cursor.
fn length_at_offset<const SKIP: usize>(
    bytes: &[u8],
    cursor: usize,
    ext: &str,
) -> Option<(usize, usize)> {
    let at = cursor + SKIP;
    let len = read_u32(bytes, at)? as usize;
    let start = at + 4;
    validate_candidate(bytes, start, len, ext)
}

/// Candidate: the temp-path variant: u32 flags, u32 path length, the path
/// bytes, then the u32 data length.
fn temp_path_layout(bytes: &[u8], cursor: usize, ext: &str) -> Option<(usize, usize)> {
    let path_len = read_u32(bytes, cursor + 4)? as usize;
    if path_len > 1024 {
        return None;
    }
    let len_at = cursor + 8 + path_len;
    let len = read_u32(bytes, len_at)? as usize;
    validate_candidate(bytes, len_at + 4, len, ext)
}

fn validate_candidate(
    bytes: &[u8],
    start: usize,
    len: usize,
    ext: &str,
) -> Option<(usize, usize)> {
    if start >= bytes.len() {
        return None;
    }
    let remaining = bytes.len() - start;
    if len == 0 || len > remaining {
        return None;
    }
    if !format::matches_extension(ext, &bytes[start..]) {
        return None;
    }
    // Extensions without a registered signature validate trivially; require
    // at least that a sniffable payload actually sniffs, so arbitrary
    // padding does not pass as data.
    if format::FileClass::sniff(&bytes[start..]).is_none() && !ext.is_empty() {
        return None;
    }
    Some((start, len))
}

fn length_just_before(bytes: &[u8], sig_start: usize) -> Option<usize> {
    if sig_start < 4 {
        return None;
    }
    let len = read_u32(bytes, sig_start - 4)? as usize;
    let remaining = bytes.len() - sig_start;
    (len > 0 && len <= remaining).then_some(len)
}

fn read_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let slice = bytes.get(at..at + 4)?;
    Some(u32::from_le_bytes([slice[0], slice[1], slice[2], slice[3]]))
}

/// Read a NUL-terminated byte string, advancing the cursor past the NUL.
fn read_cstr(bytes: &[u8], cursor: &mut usize) -> Option<String> {
    let rest = bytes.get(*cursor..)?;
    let nul = rest.iter().position(|&b| b == 0)?;
    let s = String::from_utf8_lossy(&rest[..nul]).into_owned();
    *cursor += nul + 1;
    Some(s)
}

fn extension_of(name: &str) -> Option<String> {
    let ext = std::path::Path::new(name)
        .extension()
        .and_then(|e| e.to_str())?;
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Assemble a native stream: header, label, path, then `tail`.
    fn native_stream(label: &str, path: &str, tail: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&0u32.to_le_bytes()); // declared total, often junk
        buf.extend_from_slice(&2u16.to_le_bytes()); // type tag
        buf.extend_from_slice(label.as_bytes());
        buf.push(0);
        buf.extend_from_slice(path.as_bytes());
        buf.push(0);
        buf.extend_from_slice(tail);
        buf
    }

    #[test]
    fn test_standard_layout_recovers() {
        let payload = b"%PDF-1.4 tiny".to_vec();
        let mut tail = (payload.len() as u32).to_le_bytes().to_vec();
        tail.extend_from_slice(&payload);
        let stream = native_stream("invoice.pdf", "C:\\docs\\invoice.pdf", &tail);

        let out = parse_native_stream(&stream).expect("recover");
        assert!(out.validated);
        assert_eq!(out.data, payload);
        assert_eq!(out.label, "invoice.pdf");
    }

    #[test]
    fn test_padded_layout_recovers_via_skip() {
        // Producer inserts 4 junk bytes before the length field.
        let payload = b"%PDF-1.7 payload".to_vec();
        let mut tail = vec![0xAA, 0xBB, 0xCC, 0xDD];
        tail.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        tail.extend_from_slice(&payload);
        let stream = native_stream("a.pdf", "a.pdf", &tail);

        let out = parse_native_stream(&stream).expect("recover");
        assert!(out.validated);
        assert_eq!(out.data, payload);
    }

    #[test]
    fn test_wrong_declared_length_recovers_at_signature() {
        // Declared length field lies; payload signature is further in.
        let payload = b"%PDF-1.5 real payload".to_vec();
        let mut tail = (0xFFFF_FF00u32).to_le_bytes().to_vec(); // implausible
        tail.extend_from_slice(&[0u8; 13]); // producer junk
        tail.extend_from_slice(&payload);
        let stream = native_stream("x.pdf", "x.pdf", &tail);

        let out = parse_native_stream(&stream).expect("recover");
        assert!(out.validated);
        assert_eq!(out.data, payload, "must start at the signature, not the declared offset");
    }

    #[test]
    fn test_temp_path_layout() {
        let payload = b"%PDF-1.4 via temp path".to_vec();
        let temp_path = b"C:\\tmp\\ole1.tmp\0";
        let mut tail = Vec::new();
        tail.extend_from_slice(&3u32.to_le_bytes()); // flags
        tail.extend_from_slice(&(temp_path.len() as u32).to_le_bytes());
        tail.extend_from_slice(temp_path);
        tail.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        tail.extend_from_slice(&payload);
        // Poison the direct-length strategies: first u32 is the flags word,
        // which is small but points at non-signature bytes.
        let stream = native_stream("t.pdf", "t.pdf", &tail);

        let out = parse_native_stream(&stream).expect("recover");
        assert!(out.validated);
        assert_eq!(out.data, payload);
    }

    #[test]
    fn test_unrecognized_tail_returned_unvalidated() {
        let stream = native_stream("data.xyz", "data.xyz", &[7u8; 40]);
        let out = parse_native_stream(&stream).expect("raw remainder");
        assert!(!out.validated);
        assert_eq!(out.data.len(), 40);
    }

    #[test]
    fn test_truncated_stream_is_none() {
        assert!(parse_native_stream(&[0, 1, 2]).is_none());
        // Strings never terminate.
        let mut buf = vec![0u8; 6];
        buf.extend_from_slice(b"no nul here");
        assert!(parse_native_stream(&buf).is_none());
    }
}
