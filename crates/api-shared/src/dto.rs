//! JSON request and response bodies.

use chrono::{DateTime, Utc};
use filebox_core::{FileRecord, SyncPlan};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
}

impl ErrorRes {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// File metadata as exposed over the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FileRecordRes {
    pub id: u64,
    pub name: String,
    /// Lower-cased extension, e.g. `png`.
    pub file_type: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub owner_id: i64,
    pub owner_name: String,
    pub editor_id: i64,
    pub editor_name: String,
    pub revision: u64,
}

impl From<FileRecord> for FileRecordRes {
    fn from(record: FileRecord) -> Self {
        Self {
            id: record.id.get(),
            name: record.name,
            file_type: record.file_type,
            size: record.size,
            created_at: record.created_at,
            modified_at: record.modified_at,
            owner_id: record.owner_id.get(),
            owner_name: record.owner_name,
            editor_id: record.editor_id.get(),
            editor_name: record.editor_name,
            revision: record.revision,
        }
    }
}

/// Listing options: `?ascending=true&types=png&types=js`.
///
/// `types` may be repeated, comma separated, or both.
#[derive(Debug, Clone, Default, PartialEq, Eq, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListFilesQuery {
    /// Sort by file type; omitted keeps upload order.
    pub ascending: Option<bool>,
    /// File types to keep.
    pub types: Vec<String>,
}

impl ListFilesQuery {
    /// Builds the options from raw query pairs. Unknown keys are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut query = Self::default();
        for (key, value) in pairs {
            match key.as_ref() {
                "ascending" => {
                    let value = value.into();
                    let ascending = value
                        .parse::<bool>()
                        .map_err(|_| format!("invalid ascending value '{value}'"))?;
                    query.ascending = Some(ascending);
                }
                "types" => query.types.push(value.into()),
                _ => {}
            }
        }
        Ok(query)
    }

    pub fn type_list(&self) -> Vec<&str> {
        self.types.iter().flat_map(|t| t.split(',')).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SyncCompareReq {
    pub local_files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SyncCompareRes {
    pub to_upload: Vec<String>,
    pub to_download: Vec<String>,
}

impl From<SyncPlan> for SyncCompareRes {
    fn from(plan: SyncPlan) -> Self {
        Self {
            to_upload: plan.to_upload.into_iter().collect(),
            to_download: plan.to_download.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filebox_core::reconcile;

    #[test]
    fn test_sync_compare_res_json_shape() {
        let res = SyncCompareRes::from(reconcile(["a.kt", "b.js"], ["b.js", "c.png"]));

        let json = serde_json::to_value(&res).unwrap();

        assert_eq!(
            json,
            serde_json::json!({ "to_upload": ["a.kt"], "to_download": ["c.png"] })
        );
    }

    #[test]
    fn test_list_query_type_list() {
        let query = ListFilesQuery {
            ascending: None,
            types: vec!["png, js".into(), "kt".into()],
        };
        assert_eq!(query.type_list(), vec!["png", " js", "kt"]);
        assert!(ListFilesQuery::default().type_list().is_empty());
    }

    #[test]
    fn test_list_query_from_repeated_pairs() {
        let query = ListFilesQuery::from_pairs([
            ("types", "png"),
            ("ascending", "false"),
            ("types", "js"),
            ("other", "ignored"),
        ])
        .unwrap();

        assert_eq!(query.ascending, Some(false));
        assert_eq!(query.type_list(), vec!["png", "js"]);
    }

    #[test]
    fn test_list_query_rejects_bad_ascending() {
        let err = ListFilesQuery::from_pairs([("ascending", "maybe")]).unwrap_err();
        assert!(err.contains("maybe"));
    }

    #[test]
    fn test_error_res_json_shape() {
        let json = serde_json::to_value(ErrorRes::new("boom")).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "boom" }));
    }
}
