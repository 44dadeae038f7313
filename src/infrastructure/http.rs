//! Blocking HTTP implementation of the backend collaborator.

use std::path::Path;
use std::time::Duration;

use reqwest::blocking::{multipart, Client, RequestBuilder, Response};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::domain::{EquipmentRecord, EquipmentSummary, EquipmentUpsert, PersistedModel};
use crate::infrastructure::traits::{Backend, BackendError, UploadedAsset};

/// Upload responses differ per endpoint: `/upload/asset` returns `url`,
/// `/upload/model` returns `model_file_url`.
#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    model_file_url: Option<String>,
}

/// Backend reached over HTTP at a configured base URL.
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    /// Create a client for `base_url` (e.g. `http://localhost:8000`).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| BackendError::Transport(format!("invalid base URL {base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(BackendError::Transport(format!(
                "invalid base URL {base_url}: not a hierarchical URL"
            )));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client, base_url })
    }

    /// Join path segments onto the base URL, percent-encoding each one.
    /// A trailing `""` segment produces a trailing slash.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn send(&self, request: RequestBuilder) -> Result<Response, BackendError> {
        let response = request
            .send()
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        warn!(status = status.as_u16(), "backend rejected request");
        Err(BackendError::Status {
            status: status.as_u16(),
            detail: error_detail(&body),
        })
    }

    fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BackendError> {
        self.send(request)?
            .json()
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    fn file_form(file: &Path) -> Result<multipart::Form, BackendError> {
        multipart::Form::new()
            .file("file", file)
            .map_err(|source| BackendError::File {
                path: file.to_path_buf(),
                source,
            })
    }

    fn upload(&self, url: Url, file: &Path) -> Result<UploadedAsset, BackendError> {
        debug!(url = %url, file = %file.display(), "POST upload");
        let form = Self::file_form(file)?;
        let response: UploadResponse = self.json(self.client.post(url).multipart(form))?;
        let fallback_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(UploadedAsset {
            filename: response.filename.unwrap_or(fallback_name),
            url: response.url.or(response.model_file_url).unwrap_or_default(),
        })
    }
}

/// FastAPI puts its message in `detail`, either a string or a list of
/// validation entries.
fn error_detail(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => match value.get("detail") {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => body.to_string(),
        },
        Err(_) => body.to_string(),
    }
}

impl Backend for HttpBackend {
    fn list_equipments(&self) -> Result<Vec<EquipmentSummary>, BackendError> {
        let url = self.endpoint(&["ar", "equipments", ""]);
        debug!(url = %url, "GET equipments");
        self.json(self.client.get(url))
    }

    fn get_equipment(&self, tag: &str) -> Result<EquipmentRecord, BackendError> {
        let url = self.endpoint(&["ar", "equipments", tag]);
        debug!(url = %url, "GET equipment");
        self.json(self.client.get(url))
    }

    fn create_model(&self, model: &PersistedModel) -> Result<(), BackendError> {
        let url = self.endpoint(&["models", ""]);
        debug!(url = %url, id = %model.id, "POST model hierarchy");
        self.send(self.client.post(url).json(model)).map(|_| ())
    }

    fn update_model(&self, identity: &str, model: &PersistedModel) -> Result<(), BackendError> {
        let url = self.endpoint(&["models", identity]);
        debug!(url = %url, id = %model.id, "PUT model hierarchy");
        self.send(self.client.put(url).json(model)).map(|_| ())
    }

    fn create_equipment(&self, equipment: &EquipmentUpsert) -> Result<(), BackendError> {
        let url = self.endpoint(&["ar", "equipments", ""]);
        debug!(url = %url, tag = %equipment.tag, "POST equipment");
        self.send(self.client.post(url).json(equipment)).map(|_| ())
    }

    fn update_equipment(&self, tag: &str, equipment: &EquipmentUpsert) -> Result<(), BackendError> {
        let url = self.endpoint(&["ar", "equipments", tag]);
        debug!(url = %url, tag = %equipment.tag, "PUT equipment");
        self.send(self.client.put(url).json(equipment)).map(|_| ())
    }

    fn upload_model(&self, name: &str, file: &Path) -> Result<UploadedAsset, BackendError> {
        let mut url = self.endpoint(&["upload", "model"]);
        url.query_pairs_mut().append_pair("name", name);
        self.upload(url, file)
    }

    fn upload_asset(&self, file: &Path) -> Result<UploadedAsset, BackendError> {
        self.upload(self.endpoint(&["upload", "asset"]), file)
    }

    fn upload_qr_image(&self, tag: &str, file: &Path) -> Result<EquipmentSummary, BackendError> {
        let url = self.endpoint(&["ar", "equipments", tag, "qr-image"]);
        debug!(url = %url, file = %file.display(), "POST QR image");
        let form = Self::file_form(file)?;
        self.json(self.client.post(url).multipart(form))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(base: &str) -> HttpBackend {
        HttpBackend::new(base, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn given_trailing_slash_base_when_joining_then_no_double_slash() {
        let b = backend("http://localhost:8000/");
        assert_eq!(
            b.endpoint(&["ar", "equipments", ""]).as_str(),
            "http://localhost:8000/ar/equipments/"
        );
    }

    #[test]
    fn given_tag_with_space_when_joining_then_segment_encoded() {
        let b = backend("http://localhost:8000/api");
        assert_eq!(
            b.endpoint(&["ar", "equipments", "POMP 1", "qr-image"]).as_str(),
            "http://localhost:8000/api/ar/equipments/POMP%201/qr-image"
        );
    }

    #[test]
    fn given_invalid_base_when_creating_then_transport_error() {
        assert!(matches!(
            HttpBackend::new("not a url", Duration::from_secs(1)),
            Err(BackendError::Transport(_))
        ));
    }

    #[test]
    fn given_fastapi_error_body_when_extracting_then_returns_detail() {
        assert_eq!(
            error_detail(r#"{"detail": "AR equipment not found"}"#),
            "AR equipment not found"
        );
        assert_eq!(error_detail("plain failure"), "plain failure");
    }
}
