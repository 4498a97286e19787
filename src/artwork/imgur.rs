use crate::artwork::types::{ArtworkError, ImageHost};
use crate::http::http_client;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

const UPLOAD_URL: &str = "https://api.imgur.com/3/image";

#[derive(Deserialize)]
struct UploadResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    status: u16,
    data: Option<UploadData>,
}

#[derive(Deserialize)]
struct UploadData {
    link: Option<String>,
    error: Option<serde_json::Value>,
}

/// Anonymous Imgur uploads under an application client id.
#[derive(Debug, Clone)]
pub struct ImgurUploader {
    client_id: String,
}

impl ImgurUploader {
    pub fn new(client_id: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
        }
    }
}

fn link_from_response(response: UploadResponse) -> Result<String, ArtworkError> {
    let data = response.data;
    match data {
        Some(UploadData { link: Some(link), .. }) if response.success && !link.is_empty() => Ok(link),
        Some(UploadData { error: Some(err), .. }) => Err(ArtworkError::Upload(format!(
            "imgur: HTTP {}: {}",
            response.status, err
        ))),
        _ => Err(ArtworkError::Upload(format!(
            "imgur: HTTP {}: no link in response",
            response.status
        ))),
    }
}

#[async_trait]
impl ImageHost for ImgurUploader {
    async fn upload(&self, bytes: Vec<u8>, title: &str) -> Result<String, ArtworkError> {
        let form = Form::new()
            .part("image", Part::bytes(bytes).file_name("thumb"))
            .text("type", "file")
            .text("title", title.to_string());

        let resp = http_client()?
            .post(UPLOAD_URL)
            .header("Authorization", format!("Client-ID {}", self.client_id))
            .multipart(form)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        match serde_json::from_str::<UploadResponse>(&body) {
            Ok(parsed) => link_from_response(parsed),
            Err(_) => Err(ArtworkError::Upload(format!("imgur: HTTP {status}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> Result<String, ArtworkError> {
        link_from_response(serde_json::from_str(body).unwrap())
    }

    #[test]
    fn extracts_link() {
        let body = r#"{"data":{"id":"abc","link":"https://i.imgur.com/abc.png"},"success":true,"status":200}"#;
        assert_eq!(parse(body).unwrap(), "https://i.imgur.com/abc.png");
    }

    #[test]
    fn reports_api_error() {
        let body = r#"{"data":{"error":"Too Many Requests","request":"/3/image"},"success":false,"status":429}"#;
        let err = parse(body).unwrap_err();
        assert!(err.to_string().contains("429"));
    }

    #[test]
    fn unsuccessful_response_with_link_is_rejected() {
        let body = r#"{"data":{"link":"https://i.imgur.com/x.png"},"success":false,"status":400}"#;
        assert!(matches!(parse(body), Err(ArtworkError::Upload(_))));
    }
}
