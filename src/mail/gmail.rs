// src/mail/gmail.rs
//
// Narrow message-source contract plus the Gmail REST implementation behind
// it. The pipeline only ever needs unread ids, a subject, on-demand body
// text, and an idempotent mark-read.

use crate::config::{MAIL_PAGE_SIZE, MAIL_QUERY};
use crate::retry::RemoteError;
use base64::Engine;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const GMAIL_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

pub trait MessageSource {
    /// All unread message ids matching the fixed sender filter.
    fn list_unread(&self) -> Result<Vec<String>, RemoteError>;
    fn fetch_subject(&self, id: &str) -> Result<String, RemoteError>;
    /// Full plaintext body; only fetched when a sold amount is needed.
    fn fetch_body_text(&self, id: &str) -> Result<String, RemoteError>;
    /// Marking twice is a no-op on the server side.
    fn mark_read(&self, id: &str) -> Result<(), RemoteError>;
}

pub struct GmailSource {
    client: Client,
    token: String,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    payload: Option<Payload>,
}

#[derive(Debug, Default, Deserialize)]
struct Payload {
    #[serde(default)]
    headers: Vec<Header>,
    #[serde(rename = "mimeType", default)]
    mime_type: String,
    #[serde(default)]
    body: Option<Body>,
    #[serde(default)]
    parts: Vec<Payload>,
}

#[derive(Debug, Deserialize)]
struct Header {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct Body {
    data: Option<String>,
}

impl GmailSource {
    pub fn new(token: impl Into<String>) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(RemoteError::from_reqwest)?;
        Ok(Self {
            client,
            token: token.into(),
        })
    }

    fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, RemoteError> {
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .map_err(RemoteError::from_reqwest)?;
        let status = resp.status();
        let text = resp.text().map_err(RemoteError::from_reqwest)?;
        if !status.is_success() {
            return Err(RemoteError::from_status(status.as_u16(), &text));
        }
        serde_json::from_str(&text)
            .map_err(|e| RemoteError::fatal(format!("mail response shape: {e}")))
    }

    /// Walk the MIME tree for the first text/plain part. Gmail sends the
    /// data urlsafe-base64 encoded, sometimes without padding.
    fn extract_plaintext(payload: &Payload) -> String {
        if payload.mime_type == "text/plain" {
            if let Some(data) = payload.body.as_ref().and_then(|b| b.data.as_deref()) {
                let stripped = data.trim_end_matches('=');
                if let Ok(bytes) =
                    base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(stripped)
                {
                    return String::from_utf8_lossy(&bytes).into_owned();
                }
            }
        }
        for part in &payload.parts {
            let text = Self::extract_plaintext(part);
            if !text.is_empty() {
                return text;
            }
        }
        String::new()
    }
}

impl MessageSource for GmailSource {
    fn list_unread(&self) -> Result<Vec<String>, RemoteError> {
        let mut ids = Vec::new();
        let mut token: Option<String> = None;
        let page_size = MAIL_PAGE_SIZE.to_string();

        loop {
            let url = format!("{GMAIL_BASE}/messages");
            let mut query: Vec<(&str, &str)> = vec![
                ("q", MAIL_QUERY),
                ("maxResults", &page_size),
                ("fields", "nextPageToken,messages/id"),
            ];
            if let Some(t) = token.as_deref() {
                query.push(("pageToken", t));
            }
            let page: ListResponse = self.get_json(&url, &query)?;
            ids.extend(page.messages.into_iter().map(|m| m.id));
            match page.next_page_token {
                Some(t) => token = Some(t),
                None => break,
            }
        }
        Ok(ids)
    }

    fn fetch_subject(&self, id: &str) -> Result<String, RemoteError> {
        let url = format!("{GMAIL_BASE}/messages/{id}");
        let msg: MessageResponse = self.get_json(
            &url,
            &[
                ("format", "metadata"),
                ("metadataHeaders", "Subject"),
                ("fields", "payload/headers"),
            ],
        )?;
        Ok(msg
            .payload
            .unwrap_or_default()
            .headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case("Subject"))
            .map(|h| h.value.trim().to_string())
            .unwrap_or_default())
    }

    fn fetch_body_text(&self, id: &str) -> Result<String, RemoteError> {
        let url = format!("{GMAIL_BASE}/messages/{id}");
        let msg: MessageResponse =
            self.get_json(&url, &[("format", "full"), ("fields", "payload")])?;
        Ok(msg
            .payload
            .as_ref()
            .map(Self::extract_plaintext)
            .unwrap_or_default())
    }

    fn mark_read(&self, id: &str) -> Result<(), RemoteError> {
        let url = format!("{GMAIL_BASE}/messages/{id}/modify");
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&json!({ "removeLabelIds": ["UNREAD"] }))
            .send()
            .map_err(RemoteError::from_reqwest)?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            return Err(RemoteError::from_status(status.as_u16(), &text));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plaintext_extraction_walks_nested_parts() {
        let encoded = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode("sold for $5");
        let payload = Payload {
            mime_type: "multipart/alternative".into(),
            parts: vec![
                Payload {
                    mime_type: "text/html".into(),
                    body: Some(Body {
                        data: Some("PGI+aHRtbDwvYj4".into()),
                    }),
                    ..Default::default()
                },
                Payload {
                    mime_type: "text/plain".into(),
                    body: Some(Body {
                        data: Some(encoded),
                    }),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        assert_eq!(GmailSource::extract_plaintext(&payload), "sold for $5");
    }

    #[test]
    fn plaintext_extraction_tolerates_padding() {
        let padded = format!(
            "{}==",
            base64::engine::general_purpose::URL_SAFE_NO_PAD.encode("body")
        );
        let payload = Payload {
            mime_type: "text/plain".into(),
            body: Some(Body { data: Some(padded) }),
            ..Default::default()
        };
        assert_eq!(GmailSource::extract_plaintext(&payload), "body");
    }

    #[test]
    fn missing_plaintext_part_yields_empty() {
        let payload = Payload {
            mime_type: "text/html".into(),
            body: Some(Body { data: None }),
            ..Default::default()
        };
        assert_eq!(GmailSource::extract_plaintext(&payload), "");
    }
}
