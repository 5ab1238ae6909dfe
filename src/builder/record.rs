//! lstat record parsing
//!
//! One record per line of the decompressed stream, tab-separated. The path
//! field is base64 so that arbitrary bytes (tabs and newlines included)
//! survive the walker's text format:
//!
//! ```text
//! <base64 path> \t size \t uid \t gid \t atime \t mtime \t ctime \t type ...
//! ```
//!
//! Trailing fields beyond the eight we consume are tolerated; some walker
//! versions append device and inode columns.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::RecordError;

/// Fields a record must carry.
pub const RECORD_FIELDS: usize = 8;

/// A parsed lstat record.
#[derive(Debug, Clone, PartialEq)]
pub struct LstatRecord {
    /// Decoded absolute path.
    pub path: String,
    /// Size in bytes.
    pub size: u64,
    /// Numeric owner id.
    pub uid: u64,
    /// Numeric group id.
    pub gid: u64,
    /// Access time, epoch seconds.
    pub atime: i64,
    /// Modification time, epoch seconds.
    pub mtime: i64,
    /// Change time, epoch seconds.
    pub ctime: i64,
    /// Single-character file type (`d`, `f`, `l`, ...).
    pub file_type: char,
}

impl LstatRecord {
    /// Parse one line of a dump.
    pub fn parse(line: &str) -> Result<Self, RecordError> {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < RECORD_FIELDS {
            return Err(RecordError::FieldCount {
                expected: RECORD_FIELDS,
                found: fields.len(),
            });
        }

        let path = String::from_utf8(STANDARD.decode(fields[0])?)?;

        Ok(Self {
            path,
            size: parse_unsigned("size", fields[1])?,
            uid: parse_unsigned("uid", fields[2])?,
            gid: parse_unsigned("gid", fields[3])?,
            atime: parse_unsigned("atime", fields[4])? as i64,
            mtime: parse_unsigned("mtime", fields[5])? as i64,
            ctime: parse_unsigned("ctime", fields[6])? as i64,
            file_type: parse_file_type(fields[7])?,
        })
    }
}

fn parse_unsigned(field: &'static str, value: &str) -> Result<u64, RecordError> {
    value.parse().map_err(|_| RecordError::NumericField {
        field,
        value: value.to_string(),
    })
}

fn parse_file_type(value: &str) -> Result<char, RecordError> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(RecordError::FileType(value.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_line(path: &str, rest: &str) -> String {
        format!("{}\t{}", STANDARD.encode(path), rest)
    }

    #[test]
    fn test_parse_valid_record() {
        let line = encode_line("/a/b/x.bam", "1024\t1000\t100\t1500000000\t1500000001\t1500000002\tf");
        let record = LstatRecord::parse(&line).unwrap();

        assert_eq!(record.path, "/a/b/x.bam");
        assert_eq!(record.size, 1024);
        assert_eq!(record.uid, 1000);
        assert_eq!(record.gid, 100);
        assert_eq!(record.atime, 1_500_000_000);
        assert_eq!(record.mtime, 1_500_000_001);
        assert_eq!(record.ctime, 1_500_000_002);
        assert_eq!(record.file_type, 'f');
    }

    #[test]
    fn test_extra_fields_tolerated() {
        let line = encode_line("/a", "1\t2\t3\t4\t5\t6\td\t123\t456");
        let record = LstatRecord::parse(&line).unwrap();
        assert_eq!(record.file_type, 'd');
    }

    #[test]
    fn test_short_line_rejected() {
        let line = encode_line("/a", "1\t2\t3");
        assert!(matches!(
            LstatRecord::parse(&line),
            Err(RecordError::FieldCount { found: 4, .. })
        ));
    }

    #[test]
    fn test_bad_base64_rejected() {
        let line = "!!notbase64!!\t1\t2\t3\t4\t5\t6\tf";
        assert!(matches!(
            LstatRecord::parse(line),
            Err(RecordError::PathEncoding(_))
        ));
    }

    #[test]
    fn test_bad_number_rejected() {
        let line = encode_line("/a", "xyz\t2\t3\t4\t5\t6\tf");
        assert!(matches!(
            LstatRecord::parse(&line),
            Err(RecordError::NumericField { field: "size", .. })
        ));
    }

    #[test]
    fn test_bad_file_type_rejected() {
        let line = encode_line("/a", "1\t2\t3\t4\t5\t6\tfd");
        assert!(matches!(
            LstatRecord::parse(&line),
            Err(RecordError::FileType(_))
        ));

        let line = encode_line("/a", "1\t2\t3\t4\t5\t6\t");
        assert!(matches!(
            LstatRecord::parse(&line),
            Err(RecordError::FileType(_))
        ));
    }

    #[test]
    fn test_path_with_awkward_bytes() {
        // Tabs and newlines in names are exactly why the path is base64.
        let path = "/p/odd\tname\nhere";
        let line = encode_line(path, "1\t2\t3\t4\t5\t6\tf");
        assert_eq!(LstatRecord::parse(&line).unwrap().path, path);
    }
}
