//! HTTP VFS backend.
//!
//! Speaks to the filesystem service: every operation is a POST with a
//! JSON body, failures carry `{error, code}` with a POSIX-style code.

use async_trait::async_trait;
use ck_protocol::{FileStat, ReadDirOptions, ReadDirReply};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::vfs::{VfsBackend, VfsCode, VfsError, VfsResult};

/// Failure body of the service. Both fields are optional on the wire;
/// absent ones fall back to `EIO` / `VFS Error`.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    code: Option<String>,
}

impl ErrorBody {
    fn into_error(self) -> VfsError {
        VfsError::new(
            VfsCode::parse(self.code.as_deref().unwrap_or("EIO")),
            self.error.unwrap_or_else(|| "VFS Error".to_string()),
        )
    }
}

#[derive(Debug, Deserialize)]
struct ContentBody {
    content: String,
}

pub struct HttpVfs {
    base_url: String,
    http: reqwest::Client,
}

impl HttpVfs {
    /// # Arguments
    ///
    /// * `base_url` - Root of the filesystem service, e.g.
    ///   `http://localhost:3000/api/fs`. A trailing slash is tolerated.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        HttpVfs {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    async fn request<B, T>(&self, endpoint: &str, body: &B) -> VfsResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, endpoint);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| VfsError::eio(format!("VFS request to {url} failed: {e}")))?;

        if !response.status().is_success() {
            let body = response.json::<ErrorBody>().await.unwrap_or_default();
            return Err(body.into_error());
        }
        response
            .json::<T>()
            .await
            .map_err(|e| VfsError::eio(format!("VFS reply from {url} unreadable: {e}")))
    }

    async fn ack<B>(&self, endpoint: &str, body: &B) -> VfsResult<()>
    where
        B: Serialize + ?Sized,
    {
        self.request::<B, serde_json::Value>(endpoint, body)
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl VfsBackend for HttpVfs {
    async fn read_dir(&self, path: &str, options: ReadDirOptions) -> VfsResult<ReadDirReply> {
        self.request("files", &json!({ "path": path, "options": options }))
            .await
    }

    async fn read_file(&self, path: &str) -> VfsResult<String> {
        let body: ContentBody = self.request("cat", &json!({ "path": path })).await?;
        Ok(body.content)
    }

    async fn write_file(&self, path: &str, content: &str, append: bool) -> VfsResult<()> {
        self.ack(
            "touch",
            &json!({ "path": path, "content": content, "append": append }),
        )
        .await
    }

    async fn make_dir(&self, path: &str, create_parents: bool) -> VfsResult<()> {
        self.ack("mkdir", &json!({ "path": path, "createParents": create_parents }))
            .await
    }

    async fn remove(&self, path: &str, force: bool, recursive: bool) -> VfsResult<()> {
        self.ack(
            "rm",
            &json!({ "path": path, "force": force, "recursive": recursive }),
        )
        .await
    }

    async fn rename(&self, source: &str, destination: &str) -> VfsResult<()> {
        self.ack("mv", &json!({ "source": source, "destination": destination }))
            .await
    }

    async fn copy(&self, source: &str, destination: &str, recursive: bool) -> VfsResult<()> {
        self.ack(
            "copy",
            &json!({ "source": source, "destination": destination, "recursive": recursive }),
        )
        .await
    }

    async fn stat(&self, path: &str) -> VfsResult<FileStat> {
        self.request("stat", &json!({ "path": path })).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let vfs = HttpVfs::new("http://localhost:3000/api/fs/");
        assert_eq!(vfs.base_url, "http://localhost:3000/api/fs");
    }

    #[test]
    fn error_body_defaults_match_the_wire_contract() {
        let parsed: ErrorBody = serde_json::from_str("{}").unwrap();
        let err = parsed.into_error();
        assert_eq!(err.code, VfsCode::Eio);
        assert_eq!(err.message, "VFS Error");

        let parsed: ErrorBody =
            serde_json::from_str(r#"{"error":"Is a directory","code":"EISDIR"}"#).unwrap();
        let err = parsed.into_error();
        assert_eq!(err.code, VfsCode::Eisdir);
        assert_eq!(err.message, "Is a directory");
    }
}
