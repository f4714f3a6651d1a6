use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use cloudy_core::CloudyError;
use cloudy_core::naming;
use serde::Deserialize;

use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct FileQuery {
    /// Any non-empty value forces a download.
    #[serde(default)]
    pub dl: Option<String>,
    /// Download filename. The object's extension is appended when missing.
    #[serde(default)]
    pub name: Option<String>,
}

pub(crate) enum FileError {
    NotFound,
    Internal(String),
}

impl IntoResponse for FileError {
    fn into_response(self) -> Response {
        match self {
            FileError::NotFound => StatusCode::NOT_FOUND.into_response(),
            FileError::Internal(msg) => {
                let body = serde_json::json!({ "error": msg });
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}

impl From<CloudyError> for FileError {
    fn from(err: CloudyError) -> Self {
        match err {
            // Names that would leave the container cannot exist.
            CloudyError::InvalidObjectName(_) => FileError::NotFound,
            e if e.is_not_found() => FileError::NotFound,
            e => FileError::Internal(e.to_string()),
        }
    }
}

/// Filename offered to the browser: `requested` (or the object's base name),
/// with the object's extension appended when it differs.
pub fn download_filename(object_name: &str, requested: Option<&str>) -> String {
    let extension = naming::file_extension(object_name);
    let mut name = requested
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| naming::file_name(object_name))
        .to_string();
    if !extension.is_empty() && naming::file_extension(&name) != extension {
        name = format!("{name}.{extension}");
    }
    name.chars()
        .filter(|c| !c.is_control() && *c != '"' && *c != '\\')
        .collect()
}

/// GET /{serve_files_url}/{*name}
pub(crate) async fn serve_file(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(query): Query<FileQuery>,
) -> Result<Response, FileError> {
    let object = state.storage.get(&name).await?.ok_or(FileError::NotFound)?;
    let data = object.read_bytes().await?;

    let mime = mime_guess::from_path(&object.name).first_or_octet_stream();
    let mut response = ([(header::CONTENT_TYPE, mime.as_ref().to_string())], data).into_response();

    if query.dl.as_deref().is_some_and(|v| !v.is_empty()) {
        let filename = download_filename(&object.name, query.name.as_deref());
        if let Ok(value) = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\"")) {
            response
                .headers_mut()
                .insert(header::CONTENT_DISPOSITION, value);
        }
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_defaults_to_base_name() {
        assert_eq!(download_filename("a/b/report.pdf", None), "report.pdf");
    }

    #[test]
    fn requested_name_gets_extension() {
        assert_eq!(download_filename("a/report.txt", Some("summary")), "summary.txt");
        assert_eq!(download_filename("a/report.txt", Some("summary.txt")), "summary.txt");
        assert_eq!(download_filename("a/report.txt", Some("data.csv")), "data.csv.txt");
    }

    #[test]
    fn escaping_names_map_to_not_found() {
        let err = FileError::from(CloudyError::InvalidObjectName("../x".to_string()));
        assert!(matches!(err, FileError::NotFound));
        let err = FileError::from(CloudyError::Unsupported("x".to_string()));
        assert!(matches!(err, FileError::Internal(_)));
    }

    #[test]
    fn quotes_are_stripped() {
        assert_eq!(download_filename("x.txt", Some("a\"b")), "ab.txt");
    }
}
