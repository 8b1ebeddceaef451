//! Directory listing documents returned by `/.cbfs/list/`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Summary of a subdirectory.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DirInfo {
    pub descendants: u64,
    pub size: f64,
    pub largest: f64,
    pub smallest: f64,
}

/// Metadata of a stored file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FileMeta {
    pub oid: String,
    pub length: u64,
    pub modified: Option<String>,
    pub revno: i64,
}

/// One listing. Names in `files` are relative to `path` and, for deep
/// listings, may contain `/`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ListResult {
    pub path: String,
    pub dirs: BTreeMap<String, DirInfo>,
    pub files: BTreeMap<String, FileMeta>,
}

impl ListResult {
    pub fn empty(path: &str) -> Self {
        Self {
            path: path.to_string(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty() && self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_listing() {
        let body = r#"{
            "path": "/docs",
            "dirs": {"img": {"descendants": 3, "size": 1024, "largest": 512, "smallest": 10}},
            "files": {
                "b.txt": {"oid": "abc", "length": 12, "revno": 2, "headers": {"X": ["y"]}},
                "a.txt": {"oid": "def", "length": 5}
            }
        }"#;
        let list: ListResult = serde_json::from_str(body).unwrap();
        assert_eq!(list.path, "/docs");
        assert_eq!(list.dirs["img"].descendants, 3);
        let names: Vec<_> = list.files.keys().cloned().collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
        assert_eq!(list.files["b.txt"].revno, 2);
        assert!(!list.is_empty());
    }

    #[test]
    fn test_missing_sections_default() {
        let list: ListResult = serde_json::from_str("{}").unwrap();
        assert!(list.is_empty());
    }
}
