use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::config::Config;
use crate::error::StoreError;
use crate::event::Event;
use crate::participant::{Participant, ParticipantType};
use crate::store::{EventStore, ParticipantStore, SearchField};

/// Error body the registration API attaches to non-success responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// One page of participant search results.
#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    content: Vec<Participant>,
}

fn build_client(timeout: Duration) -> reqwest::Client {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::CONTENT_TYPE,
        reqwest::header::HeaderValue::from_static("application/json"),
    );

    reqwest::Client::builder()
        .default_headers(headers)
        .user_agent("Registration Client")
        .timeout(timeout)
        .build()
        .expect("failed to construct reqwest client for registration stores")
}

/// A base without a trailing slash would lose its last path segment on join.
fn parse_base_url(raw: &str) -> Result<Url, url::ParseError> {
    if raw.ends_with('/') {
        Url::parse(raw)
    } else {
        Url::parse(&format!("{raw}/"))
    }
}

fn message_from_body(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.message)
        .unwrap_or_else(|| body.to_owned())
}

async fn error_from_response(response: reqwest::Response) -> StoreError {
    let status = response.status();
    let message = match response.text().await {
        Ok(body) => message_from_body(&body),
        Err(_) => String::new(),
    };
    StoreError::Response { status, message }
}

async fn expect_success(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(error_from_response(response).await)
    }
}

/// `ParticipantStore` speaking the registration REST API.
pub struct HttpParticipantStore {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpParticipantStore {
    pub fn new(config: &Config) -> Result<Self, url::ParseError> {
        Ok(HttpParticipantStore {
            client: build_client(config.request_timeout.0),
            base_url: parse_base_url(&config.api_base_url)?,
        })
    }

    fn url(&self, path: &str) -> Url {
        self.base_url
            .join(path)
            .expect("registration api paths are valid url segments")
    }
}

#[async_trait]
impl ParticipantStore for HttpParticipantStore {
    async fn create(&self, participant: &Participant) -> Result<Participant, StoreError> {
        let response = self
            .client
            .post(self.url("participants"))
            .json(participant)
            .send()
            .await?;
        let response = expect_success(response).await?;

        Ok(response.json::<Participant>().await?)
    }

    async fn search(
        &self,
        query: &str,
        participant_type: Option<ParticipantType>,
        field: Option<SearchField>,
    ) -> Vec<Participant> {
        let mut request = self
            .client
            .get(self.url("participants"))
            .query(&[("query", query)]);
        if let Some(participant_type) = participant_type {
            request = request.query(&[("type", participant_type.to_string())]);
        }
        if let Some(field) = field {
            request = request.query(&[("field", field.as_str())]);
        }

        let page = async {
            let response = expect_success(request.send().await?).await?;
            Ok::<SearchPage, StoreError>(response.json::<SearchPage>().await?)
        }
        .await;

        match page {
            Ok(page) => page.content,
            Err(error) => {
                // Lookups degrade to an empty result set instead of failing.
                tracing::warn!("participant search failed: {}", error);
                Vec::new()
            }
        }
    }

    async fn delete_by_id(&self, id: i64) -> Result<(), StoreError> {
        let response = self
            .client
            .delete(self.url(&format!("participants/{id}")))
            .send()
            .await?;
        expect_success(response).await?;

        Ok(())
    }
}

/// `EventStore` speaking the registration REST API.
pub struct HttpEventStore {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpEventStore {
    pub fn new(config: &Config) -> Result<Self, url::ParseError> {
        Ok(HttpEventStore {
            client: build_client(config.request_timeout.0),
            base_url: parse_base_url(&config.api_base_url)?,
        })
    }

    fn url(&self, path: &str) -> Url {
        self.base_url
            .join(path)
            .expect("registration api paths are valid url segments")
    }
}

#[async_trait]
impl EventStore for HttpEventStore {
    async fn event(&self, event_id: i64) -> Result<Event, StoreError> {
        let response = self
            .client
            .get(self.url(&format!("events/{event_id}")))
            .send()
            .await?;
        let response = expect_success(response).await?;

        Ok(response.json::<Event>().await?)
    }

    async fn participants(&self, event_id: i64) -> Result<Vec<Participant>, StoreError> {
        let response = self
            .client
            .get(self.url(&format!("events/{event_id}/participants")))
            .send()
            .await?;
        let response = expect_success(response).await?;

        Ok(response.json::<Vec<Participant>>().await?)
    }

    async fn associate(
        &self,
        event_id: i64,
        participant_id: i64,
        participant_type: ParticipantType,
    ) -> Result<(), StoreError> {
        let response = self
            .client
            .post(self.url(&format!("events/{event_id}/participants")))
            .json(&json!({ "id": participant_id, "type": participant_type }))
            .send()
            .await?;
        expect_success(response).await?;

        Ok(())
    }

    async fn disassociate(&self, event_id: i64, participant_id: i64) -> Result<(), StoreError> {
        let response = self
            .client
            .delete(self.url(&format!("events/{event_id}/participants/{participant_id}")))
            .send()
            .await?;
        expect_success(response).await?;

        Ok(())
    }
}
