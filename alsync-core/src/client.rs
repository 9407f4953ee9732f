use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("service returned http {status}: {body}")]
    Http { status: StatusCode, body: String },
    #[error("api returned code {code}: {message}")]
    Api { code: i64, message: String },
    #[error("api response missing data payload")]
    MissingData,
}

/// Client for the AList-style file management API. Every response is the
/// `{code, message, data}` envelope; the service reports most failures with
/// HTTP 200 and a non-200 envelope code.
#[derive(Clone)]
pub struct AlistClient {
    http: Client,
    base_url: Url,
    token: String,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct ListRequest<'a> {
    path: &'a str,
}

#[derive(Debug, Serialize)]
struct StatRequest<'a> {
    path: &'a str,
}

#[derive(Debug, Serialize)]
struct MkdirRequest<'a> {
    path: &'a str,
}

#[derive(Debug, Serialize)]
struct CopyRequest<'a> {
    src_dir: &'a str,
    dst_dir: &'a str,
    names: [&'a str; 1],
}

#[derive(Debug, Serialize)]
struct MoveRequest<'a> {
    src_dir: &'a str,
    dst_dir: &'a str,
    names: [&'a str; 1],
}

#[derive(Debug, Serialize)]
struct RemoveRequest<'a> {
    dir: &'a str,
    names: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i64,
    message: String,
    // An Option field absent from the payload deserializes as None, so
    // both a missing and a null `data` land in the same place.
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FsEntry {
    pub name: String,
    #[serde(default)]
    pub is_dir: bool,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub modified: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FsInfo {
    #[serde(default)]
    pub is_dir: bool,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub modified: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListData {
    #[serde(default)]
    content: Option<Vec<FsEntry>>,
}

#[derive(Debug, Deserialize)]
struct StorageRecord {
    mount_path: String,
}

#[derive(Debug, Deserialize)]
struct StorageData {
    #[serde(default)]
    content: Option<Vec<StorageRecord>>,
}

#[derive(Debug, Deserialize)]
struct TaskRecord {
    name: String,
}

impl AlistClient {
    pub fn with_base_url(base_url: &str, token: impl Into<String>) -> Result<Self, ApiError> {
        Ok(Self {
            http: Client::new(),
            base_url: Url::parse(base_url)?,
            token: token.into(),
        })
    }

    /// Exchanges credentials for a session token.
    pub async fn login(
        base_url: &str,
        username: &str,
        password: &str,
    ) -> Result<String, ApiError> {
        let url = Url::parse(base_url)?.join("/api/auth/login")?;
        let response = Client::new()
            .post(url)
            .json(&LoginRequest { username, password })
            .send()
            .await?;
        let data: LoginData = Self::handle_response(response).await?;
        Ok(data.token)
    }

    /// Probes the settings endpoint to check whether the held token is
    /// accepted. `Ok(false)` means the service answered but rejected it.
    pub async fn validate_token(&self) -> Result<bool, ApiError> {
        let response = self.get_authed("/api/admin/setting/list").await?;
        let envelope = Self::read_envelope::<serde::de::IgnoredAny>(response).await?;
        Ok(envelope.code == 200)
    }

    pub async fn list(&self, path: &str) -> Result<Vec<FsEntry>, ApiError> {
        let response = self.post_fs("list", &ListRequest { path }).await?;
        let data: ListData = Self::handle_response(response).await?;
        // `content` is null for an empty directory.
        Ok(data.content.unwrap_or_default())
    }

    /// Stats a path. An API-level error envelope means the path does not
    /// exist; only transport and HTTP failures surface as errors.
    pub async fn stat(&self, path: &str) -> Result<Option<FsInfo>, ApiError> {
        let response = self.post_fs("get", &StatRequest { path }).await?;
        let envelope = Self::read_envelope::<FsInfo>(response).await?;
        if envelope.code != 200 {
            return Ok(None);
        }
        envelope.data.map(Some).ok_or(ApiError::MissingData)
    }

    pub async fn mkdir(&self, path: &str) -> Result<(), ApiError> {
        let response = self.post_fs("mkdir", &MkdirRequest { path }).await?;
        Self::handle_ack(response).await
    }

    pub async fn copy_entry(
        &self,
        src_dir: &str,
        dst_dir: &str,
        name: &str,
    ) -> Result<(), ApiError> {
        let request = CopyRequest {
            src_dir,
            dst_dir,
            names: [name],
        };
        let response = self.post_fs("copy", &request).await?;
        Self::handle_ack(response).await
    }

    pub async fn move_entry(
        &self,
        src_dir: &str,
        dst_dir: &str,
        name: &str,
    ) -> Result<(), ApiError> {
        let request = MoveRequest {
            src_dir,
            dst_dir,
            names: [name],
        };
        let response = self.post_fs("move", &request).await?;
        Self::handle_ack(response).await
    }

    pub async fn remove(&self, dir: &str, names: &[&str]) -> Result<(), ApiError> {
        let response = self.post_fs("remove", &RemoveRequest { dir, names }).await?;
        Self::handle_ack(response).await
    }

    pub async fn storage_mounts(&self) -> Result<Vec<String>, ApiError> {
        let response = self.get_authed("/api/admin/storage/list").await?;
        let data: StorageData = Self::handle_response(response).await?;
        Ok(data
            .content
            .unwrap_or_default()
            .into_iter()
            .map(|record| record.mount_path)
            .collect())
    }

    /// Raw descriptor names of copy tasks the service has not finished yet.
    pub async fn undone_copy_tasks(&self) -> Result<Vec<String>, ApiError> {
        let response = self.get_authed("/api/admin/task/copy/undone").await?;
        let envelope = Self::read_envelope::<Vec<TaskRecord>>(response).await?;
        if envelope.code != 200 {
            return Err(ApiError::Api {
                code: envelope.code,
                message: envelope.message,
            });
        }
        Ok(envelope
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|record| record.name)
            .collect())
    }

    pub async fn retry_failed_copy_tasks(&self) -> Result<(), ApiError> {
        let url = self.endpoint("/api/admin/task/copy/retry_failed")?;
        let response = self
            .http
            .post(url)
            .header("Authorization", &self.token)
            .send()
            .await?;
        Self::handle_ack(response).await
    }

    async fn post_fs<B: Serialize>(
        &self,
        operation: &str,
        body: &B,
    ) -> Result<reqwest::Response, ApiError> {
        let url = self.endpoint(&format!("/api/fs/{operation}"))?;
        Ok(self
            .http
            .post(url)
            .header("Authorization", &self.token)
            .json(body)
            .send()
            .await?)
    }

    async fn get_authed(&self, path: &str) -> Result<reqwest::Response, ApiError> {
        let url = self.endpoint(path)?;
        Ok(self
            .http
            .get(url)
            .header("Authorization", &self.token)
            .send()
            .await?)
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_url.join(path)?)
    }

    async fn read_envelope<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<Envelope<T>, ApiError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Http { status, body });
        }
        Ok(response.json::<Envelope<T>>().await?)
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let envelope = Self::read_envelope::<T>(response).await?;
        if envelope.code != 200 {
            return Err(ApiError::Api {
                code: envelope.code,
                message: envelope.message,
            });
        }
        envelope.data.ok_or(ApiError::MissingData)
    }

    async fn handle_ack(response: reqwest::Response) -> Result<(), ApiError> {
        let envelope = Self::read_envelope::<serde::de::IgnoredAny>(response).await?;
        if envelope.code != 200 {
            return Err(ApiError::Api {
                code: envelope.code,
                message: envelope.message,
            });
        }
        Ok(())
    }
}
