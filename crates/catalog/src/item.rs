use serde::Serialize;
use time::OffsetDateTime;

/// One catalogued file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileItem {
    /// Path relative to the effective root, `/`-separated.
    pub path: String,
    /// Size in bytes, as reported by the backend.
    pub size: u64,
    /// Last modification. For git locations this is the author time of the
    /// latest non-merge commit touching the file, not a filesystem mtime.
    #[serde(with = "time::serde::rfc3339")]
    pub modified_at: OffsetDateTime,
    /// Location joined with `path`. Unique within a run and stable across
    /// runs, so it serves as the record's primary key.
    pub file_url: String,
    /// Raw file content, only when extraction was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<u8>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(content: Option<Vec<u8>>) -> FileItem {
        FileItem {
            path: "csv/a.csv".to_string(),
            size: 3,
            modified_at: OffsetDateTime::from_unix_timestamp(1703550235).unwrap(),
            file_url: "s3://bucket/data/csv/a.csv".to_string(),
            content,
        }
    }

    #[test]
    fn test_serialize_metadata_only() {
        let json = serde_json::to_value(item(None)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "path": "csv/a.csv",
                "size": 3,
                "modified_at": "2023-12-26T00:23:55Z",
                "file_url": "s3://bucket/data/csv/a.csv",
            })
        );
    }

    #[test]
    fn test_serialize_with_content() {
        let json = serde_json::to_value(item(Some(b"a,b".to_vec()))).unwrap();
        assert_eq!(json["content"], serde_json::json!([97, 44, 98]));
    }
}
