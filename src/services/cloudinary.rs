//! `MediaStore` backed by the Cloudinary REST API. Listing goes through the
//! Admin API (HTTP Basic auth), uploads through the signed Upload API. Audio
//! is stored under the `video` resource type, which is how Cloudinary files
//! audio.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha1::{Digest, Sha1};
use tracing::{debug, error};

use crate::{
    config::CloudinaryCredentials,
    models::resource::{AssetUpload, ListQuery, RemoteResource, ResourceList, UploadedAsset},
    services::media_store::{MediaStore, StoreError, StoreResult},
};

const RESOURCE_TYPE: &str = "video";
const DELIVERY_TYPE: &str = "upload";

#[derive(Clone)]
pub struct CloudinaryClient {
    http: reqwest::Client,
    credentials: CloudinaryCredentials,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetails,
}

#[derive(Debug, Deserialize)]
struct ErrorDetails {
    message: String,
}

impl CloudinaryClient {
    pub fn new(credentials: CloudinaryCredentials) -> StoreResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("song-library/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, credentials })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/v1_1/{}/{}",
            self.credentials.api_base.trim_end_matches('/'),
            self.credentials.cloud_name,
            path
        )
    }

    /// Turn a non-2xx reply into `StoreError::Api`, keeping Cloudinary's own message.
    async fn ensure_success(
        resp: reqwest::Response,
        context: &str,
    ) -> StoreResult<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        let message = match serde_json::from_str::<ErrorEnvelope>(&body) {
            Ok(envelope) => envelope.error.message,
            Err(_) => format!("{} returned {}", context, status),
        };

        error!(
            status = %status,
            response_body = %body,
            context = %context,
            "cloudinary request failed"
        );

        Err(StoreError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl MediaStore for CloudinaryClient {
    async fn list_resources(&self, query: ListQuery) -> StoreResult<Vec<RemoteResource>> {
        let url = self.endpoint(&format!("resources/{}/{}", RESOURCE_TYPE, DELIVERY_TYPE));
        debug!(%url, prefix = %query.prefix, "listing resources");

        let resp = self
            .http
            .get(&url)
            .basic_auth(&self.credentials.api_key, Some(&self.credentials.api_secret))
            .query(&[
                ("prefix", query.prefix.clone()),
                ("max_results", query.max_results.to_string()),
                ("context", "true".to_string()),
            ])
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "list resources").await?;

        let body = resp.text().await?;
        let parsed: ResourceList =
            serde_json::from_str(&body).map_err(|err| StoreError::Malformed(err.to_string()))?;
        Ok(parsed.resources)
    }

    async fn upload(&self, asset: AssetUpload) -> StoreResult<UploadedAsset> {
        let url = self.endpoint(&format!("{}/{}", RESOURCE_TYPE, DELIVERY_TYPE));
        let timestamp = Utc::now().timestamp().to_string();

        let params = vec![
            ("context", encode_context(&[("metadata", asset.metadata.as_str())])),
            ("overwrite", asset.overwrite.to_string()),
            ("public_id", asset.public_id.clone()),
            ("timestamp", timestamp),
        ];
        let signature = sign_params(&params, &self.credentials.api_secret);

        let mut form = Form::new()
            .text("api_key", self.credentials.api_key.clone())
            .text("signature", signature);
        for (key, value) in params {
            form = form.text(key, value);
        }
        let size = asset.data.len() as u64;
        form = form.part(
            "file",
            Part::stream_with_length(asset.data, size).file_name(asset.filename),
        );

        debug!(%url, public_id = %asset.public_id, size, "uploading asset");
        let resp = self.http.post(&url).multipart(form).send().await?;
        let resp = Self::ensure_success(resp, "upload").await?;

        let body = resp.text().await?;
        serde_json::from_str::<UploadedAsset>(&body)
            .map_err(|err| StoreError::Malformed(err.to_string()))
    }
}

/// Cloudinary request signature: SHA-1 over the `key=value` pairs sorted by
/// key and joined with `&`, with the API secret appended. Empty values are
/// left out.
pub fn sign_params(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha1::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Encode context entries as `key=value|key=value`, escaping `=` and `|` in values.
pub fn encode_context(entries: &[(&str, &str)]) -> String {
    entries
        .iter()
        .map(|(k, v)| format!("{}={}", k, v.replace('=', "\\=").replace('|', "\\|")))
        .collect::<Vec<_>>()
        .join("|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Json, Router,
        extract::{Multipart, Query},
        http::{HeaderMap, StatusCode, header},
        routing::{get, post},
    };
    use bytes::Bytes;
    use serde_json::json;
    use std::collections::HashMap;
    use tokio::net::TcpListener;

    async fn spawn_fake(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client(api_base: String) -> CloudinaryClient {
        CloudinaryClient::new(CloudinaryCredentials {
            api_base,
            cloud_name: "demo".into(),
            api_key: "1234".into(),
            api_secret: "shh".into(),
        })
        .unwrap()
    }

    #[test]
    fn signature_matches_documented_example() {
        let params = vec![
            ("timestamp", "1315060510".to_string()),
            ("public_id", "sample_image".to_string()),
        ];
        assert_eq!(
            sign_params(&params, "abcd"),
            "b4ad47fb4e25c7bf5f92a20089f9db59bc302313"
        );
    }

    #[test]
    fn signature_sorts_keys_and_skips_empty_values() {
        let params = vec![
            ("timestamp", "1700000000".to_string()),
            ("public_id", "song-library/songA/Track_One".to_string()),
            ("eager", String::new()),
            ("overwrite", "true".to_string()),
            ("context", r#"metadata={"bpm":120}"#.to_string()),
        ];
        assert_eq!(
            sign_params(&params, "shh"),
            "c54a8d3ee49f5a151231070d805b7a0f6de07362"
        );
    }

    #[test]
    fn context_values_are_escaped() {
        assert_eq!(
            encode_context(&[("metadata", r#"{"a":"x=y|z"}"#)]),
            r#"metadata={"a":"x\=y\|z"}"#
        );
    }

    #[tokio::test]
    async fn list_resources_sends_auth_and_query() {
        let app = Router::new().route(
            "/v1_1/demo/resources/video/upload",
            get(
                |headers: HeaderMap, Query(q): Query<HashMap<String, String>>| async move {
                    // "1234:shh" in base64
                    let auth = headers
                        .get(header::AUTHORIZATION)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    if auth != "Basic MTIzNDpzaGg=" {
                        return (StatusCode::UNAUTHORIZED, Json(json!({"error": {"message": "bad auth"}})));
                    }
                    assert_eq!(q.get("prefix").map(String::as_str), Some("song-library"));
                    assert_eq!(q.get("max_results").map(String::as_str), Some("500"));
                    assert_eq!(q.get("context").map(String::as_str), Some("true"));
                    (
                        StatusCode::OK,
                        Json(json!({
                            "resources": [{
                                "public_id": "song-library/songA/Track_One",
                                "secure_url": "https://res.example.com/demo/video/upload/v1/song-library/songA/Track_One.mp3",
                                "context": { "custom": { "metadata": "{\"bpm\":120}" } }
                            }]
                        })),
                    )
                },
            ),
        );
        let base = spawn_fake(app).await;

        let resources = client(base)
            .list_resources(ListQuery {
                prefix: "song-library".into(),
                max_results: 500,
            })
            .await
            .unwrap();

        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].public_id, "song-library/songA/Track_One");
        assert_eq!(resources[0].metadata(), Some("{\"bpm\":120}"));
    }

    #[tokio::test]
    async fn upload_posts_signed_multipart_form() {
        let app = Router::new().route(
            "/v1_1/demo/video/upload",
            post(|mut multipart: Multipart| async move {
                let mut fields = HashMap::new();
                let mut file_name = None;
                let mut file_len = 0;
                while let Some(field) = multipart.next_field().await.unwrap() {
                    let name = field.name().unwrap_or_default().to_string();
                    if name == "file" {
                        file_name = field.file_name().map(str::to_string);
                        file_len = field.bytes().await.unwrap().len();
                    } else {
                        fields.insert(name, field.text().await.unwrap());
                    }
                }

                let params: Vec<(&str, String)> = ["context", "overwrite", "public_id", "timestamp"]
                    .iter()
                    .map(|k| (*k, fields.get(*k).cloned().unwrap_or_default()))
                    .collect();
                assert_eq!(fields["signature"], sign_params(&params, "shh"));
                assert_eq!(fields["api_key"], "1234");
                assert_eq!(fields["overwrite"], "true");
                assert_eq!(fields["context"], r#"metadata={"bpm":120}"#);
                assert_eq!(file_name.as_deref(), Some("Track One.mp3"));
                assert_eq!(file_len, 4);

                Json(json!({
                    "public_id": fields["public_id"],
                    "secure_url": format!("https://res.example.com/demo/video/upload/v2/{}.mp3", fields["public_id"]),
                }))
            }),
        );
        let base = spawn_fake(app).await;

        let uploaded = client(base)
            .upload(AssetUpload {
                public_id: "song-library/songA/Track_One".into(),
                filename: "Track One.mp3".into(),
                data: Bytes::from_static(b"ID3\x04"),
                metadata: r#"{"bpm":120}"#.into(),
                overwrite: true,
            })
            .await
            .unwrap();

        assert_eq!(uploaded.public_id, "song-library/songA/Track_One");
        assert_eq!(
            uploaded.secure_url,
            "https://res.example.com/demo/video/upload/v2/song-library/songA/Track_One.mp3"
        );
    }

    #[tokio::test]
    async fn api_error_message_is_passed_through() {
        let app = Router::new().route(
            "/v1_1/demo/video/upload",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": { "message": "Invalid Signature abc" } })),
                )
            }),
        );
        let base = spawn_fake(app).await;

        let err = client(base)
            .upload(AssetUpload {
                public_id: "song-library/songA/x".into(),
                filename: "x.mp3".into(),
                data: Bytes::from_static(b"x"),
                metadata: "{}".into(),
                overwrite: true,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Api { status: 400, .. }));
        assert_eq!(err.to_string(), "Invalid Signature abc");
    }
}
