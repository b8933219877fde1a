//! Standard package stream parser
//!
//! The modern embedding convention is much tamer than the legacy native one:
//! four size-prefixed fields (version tag, display name, source path, temp
//! path) followed by one final size-prefixed payload.

/// Payload parsed from a standard package stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagePayload {
    /// Display name stored by the producer.
    pub name: String,
    /// Original source path stored by the producer.
    pub source_path: String,
    /// Payload bytes.
    pub data: Vec<u8>,
}

/// Parse a standard package stream. `None` on any structural implausibility;
/// the caller then falls back to treating the stream as raw payload.
pub fn parse_package_stream(bytes: &[u8]) -> Option<PackagePayload> {
    let mut cursor = 0usize;

    let _version = read_field(bytes, &mut cursor)?;
    let name = read_field(bytes, &mut cursor)?;
    let source_path = read_field(bytes, &mut cursor)?;
    let _temp_path = read_field(bytes, &mut cursor)?;
    let data = read_field(bytes, &mut cursor)?;

    if data.is_empty() {
        return None;
    }

    Some(PackagePayload {
        name: lossy_cstr(&name),
        source_path: lossy_cstr(&source_path),
        data,
    })
}

/// One size-prefixed field: u32 little-endian length, then that many bytes.
fn read_field(bytes: &[u8], cursor: &mut usize) -> Option<Vec<u8>> {
    let len_bytes = bytes.get(*cursor..*cursor + 4)?;
    let len = u32::from_le_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]) as usize;
    let start = *cursor + 4;
    let field = bytes.get(start..start + len)?;
    *cursor = start + len;
    Some(field.to_vec())
}

fn lossy_cstr(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches('\0')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(data: &[u8]) -> Vec<u8> {
        let mut out = (data.len() as u32).to_le_bytes().to_vec();
        out.extend_from_slice(data);
        out
    }

    #[test]
    fn test_parse_package() {
        let mut stream = Vec::new();
        stream.extend(field(&2u16.to_le_bytes()));
        stream.extend(field(b"report.xlsx\0"));
        stream.extend(field(b"C:\\docs\\report.xlsx\0"));
        stream.extend(field(b"C:\\tmp\\ole2.tmp\0"));
        stream.extend(field(b"PK\x03\x04fake-xlsx-bytes"));

        let out = parse_package_stream(&stream).expect("parse");
        assert_eq!(out.name, "report.xlsx");
        assert_eq!(out.source_path, "C:\\docs\\report.xlsx");
        assert!(out.data.starts_with(b"PK\x03\x04"));
    }

    #[test]
    fn test_truncated_package_is_none() {
        let mut stream = Vec::new();
        stream.extend(field(b"v"));
        stream.extend(field(b"name\0"));
        // Length prefix pointing past the end.
        stream.extend(9999u32.to_le_bytes());
        stream.extend_from_slice(b"short");
        assert!(parse_package_stream(&stream).is_none());
    }

    #[test]
    fn test_empty_payload_is_none() {
        let mut stream = Vec::new();
        for _ in 0..4 {
            stream.extend(field(b"x\0"));
        }
        stream.extend(field(b""));
        assert!(parse_package_stream(&stream).is_none());
    }
}
