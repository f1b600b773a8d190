//! reqwest-backed implementations of the remote collaborators.

use crate::{
    client::{
        file::{FileSource, UploadFile},
        identity::IdentityProvider,
        remote::{GrantClient, MetadataClient, RemoteError, TransferClient},
    },
    models::{
        grant::{GrantRequest, UploadGrant},
        video::{NewVideoRecord, VideoQuery, VideoRecord},
    },
};
use async_trait::async_trait;
use reqwest::{Body, Client, RequestBuilder, Response, header};
use serde::de::DeserializeOwned;
use std::{sync::Arc, time::Duration};
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::debug;

/// One client for the grant, object and metadata endpoints.
///
/// Calls to the API carry `Authorization: Bearer <token>` when the identity
/// provider holds a token. The pre-signed PUT never does; the URL is the
/// credential.
#[derive(Clone)]
pub struct HttpApi {
    client: Client,
    base_url: String,
    identity: Arc<dyn IdentityProvider>,
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>, identity: Arc<dyn IdentityProvider>) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            identity,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.identity.current_token().await {
            Some(token) => builder.header(header::AUTHORIZATION, token.bearer()),
            None => builder,
        }
    }
}

#[async_trait]
impl GrantClient for HttpApi {
    async fn request_grant(&self, req: &GrantRequest) -> Result<UploadGrant, RemoteError> {
        let builder = self
            .client
            .get(self.endpoint("generatePreSignedURL"))
            .query(req);
        let response = send(self.authorized(builder).await).await?;
        decode_grant(&read_json::<serde_json::Value>(response).await?)
    }
}

#[async_trait]
impl TransferClient for HttpApi {
    async fn put_object(&self, grant: &UploadGrant, file: &UploadFile) -> Result<(), RemoteError> {
        let body = match &file.source {
            FileSource::Memory(bytes) => Body::from(bytes.clone()),
            FileSource::Path(path) => {
                let handle = File::open(path)
                    .await
                    .map_err(|e| RemoteError::Network(format!("opening {}: {}", path.display(), e)))?;
                Body::wrap_stream(ReaderStream::new(handle))
            }
        };

        let builder = self
            .client
            .put(&grant.upload_url)
            .header(header::CONTENT_TYPE, &file.content_type)
            .header(header::CONTENT_LENGTH, file.size_bytes)
            .body(body);
        let response = send(builder).await?;
        debug!(
            video_id = %grant.video_id,
            status = response.status().as_u16(),
            "transfer answered"
        );
        Ok(())
    }
}

#[async_trait]
impl MetadataClient for HttpApi {
    async fn create_record(&self, new: &NewVideoRecord) -> Result<VideoRecord, RemoteError> {
        let builder = self
            .client
            .post(self.endpoint("saveVideoMetadata"))
            .json(new);
        let response = send(self.authorized(builder).await).await?;
        read_json(response).await
    }

    async fn list_records(&self, query: &VideoQuery) -> Result<Vec<VideoRecord>, RemoteError> {
        let builder = self.client.get(self.endpoint("fetchVideos")).query(query);
        let response = send(self.authorized(builder).await).await?;
        read_json(response).await
    }

    async fn list_categories(&self) -> Result<Vec<String>, RemoteError> {
        let builder = self.client.get(self.endpoint("categories"));
        let response = send(self.authorized(builder).await).await?;
        read_json(response).await
    }
}

/// Send and turn every non-2xx answer into [`RemoteError::Status`].
async fn send(builder: RequestBuilder) -> Result<Response, RemoteError> {
    let response = builder.send().await.map_err(map_reqwest)?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or(text);
    Err(RemoteError::Status {
        status: status.as_u16(),
        message,
    })
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, RemoteError> {
    response
        .json::<T>()
        .await
        .map_err(|e| RemoteError::Decode(e.to_string()))
}

fn map_reqwest(err: reqwest::Error) -> RemoteError {
    if err.is_timeout() {
        RemoteError::Timeout
    } else {
        RemoteError::Network(err.to_string())
    }
}

/// Accept both a bare grant and an API-gateway proxy envelope whose `body`
/// field holds the grant as a JSON string.
fn decode_grant(value: &serde_json::Value) -> Result<UploadGrant, RemoteError> {
    let decode = |v: serde_json::Value| {
        serde_json::from_value::<UploadGrant>(v).map_err(|e| RemoteError::Decode(e.to_string()))
    };
    match value.get("body").and_then(|b| b.as_str()) {
        Some(inner) => {
            let parsed = serde_json::from_str::<serde_json::Value>(inner)
                .map_err(|e| RemoteError::Decode(e.to_string()))?;
            decode(parsed)
        }
        None => decode(value.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn grant_json() -> serde_json::Value {
        json!({
            "videoId": "v1",
            "uploadUrl": "http://h/objects/videos/v1.mp4?exp=1&sig=00",
            "videoUrl": "http://h/objects/videos/v1.mp4",
            "objectKey": "videos/v1.mp4",
            "expiresInSeconds": 3600,
            "expiresAt": "2030-01-01T00:00:00Z"
        })
    }

    #[test]
    fn bare_grants_decode() {
        let grant = decode_grant(&grant_json()).unwrap();
        assert_eq!(grant.video_id, "v1");
    }

    #[test]
    fn proxy_envelopes_decode() {
        let envelope = json!({ "statusCode": 200, "body": grant_json().to_string() });
        let grant = decode_grant(&envelope).unwrap();
        assert_eq!(grant.object_key, "videos/v1.mp4");
    }

    #[test]
    fn malformed_grants_are_decode_errors() {
        assert!(matches!(
            decode_grant(&json!({ "uploadUrl": 5 })),
            Err(RemoteError::Decode(_))
        ));
    }
}
