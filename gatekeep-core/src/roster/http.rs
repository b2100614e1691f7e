use std::{fmt, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};
use url::Url;

use gatekeep_model::{
    AttendeeId, AttendeeRecord, CheckOutStatusId, EventId, Gate, GateId,
    GateScope, Page, PageRequest, QueueKind, SessionArea, SessionAreaId,
};

use crate::api::routes::{utils::resolve, v1};
use crate::api::{
    BulkCheckInRequest, CheckOutRequest, CreateGateRequest, DataEnvelope,
    ErrorBody,
};
use crate::config::StationConfig;
use crate::error::{RosterError, RosterResult};
use crate::gates::GateDirectory;

use super::RosterSource;

/// reqwest-backed client for the roster service.
#[derive(Clone)]
pub struct HttpRosterClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl fmt::Debug for HttpRosterClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRosterClient")
            .field("base_url", &self.base_url.as_str())
            .field("has_token", &self.token.is_some())
            .finish()
    }
}

impl HttpRosterClient {
    pub fn new(base_url: &str, timeout: Duration) -> RosterResult<Self> {
        let base_url = normalize_base_url(base_url)?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| RosterError::Network(err.to_string()))?;

        debug!(target: "gate::roster", base_url = %base_url, "created roster client");

        Ok(Self {
            client,
            base_url,
            token: None,
        })
    }

    pub fn from_config(config: &StationConfig) -> RosterResult<Self> {
        let client = Self::new(&config.server_url, config.request_timeout())?;
        Ok(match config.api_token.clone() {
            Some(token) => client.with_token(token),
            None => client,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, route: &str, params: &[(&str, &str)]) -> Url {
        resolve(&self.base_url, route, params)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request and turn transport failures and non-2xx statuses into
    /// [`RosterError`]s, keeping the server's message when it sent one.
    async fn send(&self, builder: RequestBuilder) -> RosterResult<Response> {
        let response = self.authorize(builder).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(ErrorBody::into_message)
            .or_else(|| {
                let trimmed = body.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
            .unwrap_or_else(|| {
                status.canonical_reason().unwrap_or("request failed").to_string()
            });

        warn!(
            target: "gate::roster",
            status = status.as_u16(),
            message = %message,
            "roster request rejected"
        );
        Err(RosterError::Server {
            status: status.as_u16(),
            message,
        })
    }

    async fn get_envelope<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
    ) -> RosterResult<DataEnvelope<T>> {
        let response = self.send(self.client.get(url).query(query)).await?;
        let envelope = response.json::<DataEnvelope<T>>().await?;
        Ok(envelope)
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        url: Url,
        body: Option<&B>,
    ) -> RosterResult<Response> {
        let builder = self.client.post(url);
        let builder = match body {
            Some(body) => builder.json(body),
            None => builder,
        };
        self.send(builder).await
    }
}

#[async_trait]
impl RosterSource for HttpRosterClient {
    async fn fetch_page(
        &self,
        scope: &GateScope,
        kind: QueueKind,
        request: PageRequest,
    ) -> RosterResult<Page<AttendeeRecord>> {
        let url = match kind {
            QueueKind::NeedsCheckIn => self.url(
                v1::roster::NEED_CHECK_IN,
                &[("event_id", scope.event_id.as_str())],
            ),
            QueueKind::NeedsCheckOut => {
                let area = scope
                    .session_area_id
                    .as_ref()
                    .ok_or(RosterError::MissingSessionArea)?;
                self.url(
                    v1::roster::NEED_CHECK_OUT,
                    &[
                        ("event_id", scope.event_id.as_str()),
                        ("area_id", area.as_str()),
                    ],
                )
            }
        };

        let query = [
            ("page", request.page.to_string()),
            ("per_page", request.page_size.to_string()),
        ];
        let envelope =
            self.get_envelope::<Vec<AttendeeRecord>>(url, &query).await?;

        // The queue endpoints may ignore pagination and return the whole
        // list; cut the requested window locally in that case.
        let page = match envelope.pagination().copied() {
            Some(meta) => Page {
                records: envelope.data,
                current_page: meta.current_page,
                total_pages: meta.total_pages,
                total_count: meta.total_count,
            },
            None => Page::slice(envelope.data, request),
        };

        debug!(
            target: "gate::roster",
            event = %scope.event_id,
            queue = %kind,
            page = page.current_page,
            total_pages = page.total_pages,
            records = page.records.len(),
            "fetched roster page"
        );
        Ok(page)
    }

    async fn check_in(
        &self,
        event: &EventId,
        attendee: &AttendeeId,
    ) -> RosterResult<()> {
        let url = self.url(
            v1::roster::CHECK_IN,
            &[("event_id", event.as_str()), ("user_id", attendee.as_str())],
        );
        self.post_json::<()>(url, None).await?;
        Ok(())
    }

    async fn check_out(
        &self,
        event: &EventId,
        area: &SessionAreaId,
        attendee: &AttendeeId,
        status: &CheckOutStatusId,
    ) -> RosterResult<()> {
        let url = self.url(
            v1::roster::CHECK_OUT,
            &[
                ("event_id", event.as_str()),
                ("area_id", area.as_str()),
                ("user_id", attendee.as_str()),
            ],
        );
        let body = CheckOutRequest {
            status_id: status.clone(),
        };
        self.post_json(url, Some(&body)).await?;
        Ok(())
    }

    async fn bulk_check_in(
        &self,
        event: &EventId,
        attendees: &[AttendeeId],
    ) -> RosterResult<()> {
        let url = self.url(
            v1::roster::BULK_CHECK_IN,
            &[("event_id", event.as_str())],
        );
        let body = BulkCheckInRequest {
            event_user_ids: attendees.to_vec(),
        };
        self.post_json(url, Some(&body)).await?;
        Ok(())
    }
}

#[async_trait]
impl GateDirectory for HttpRosterClient {
    async fn list_gates(&self, event: &EventId) -> RosterResult<Vec<Gate>> {
        let url = self.url(v1::gates::FOR_EVENT, &[("event_id", event.as_str())]);
        Ok(self.get_envelope::<Vec<Gate>>(url, &[]).await?.data)
    }

    async fn create_gate(
        &self,
        request: &CreateGateRequest,
    ) -> RosterResult<Gate> {
        let url = self.url(v1::gates::COLLECTION, &[]);
        let response = self.post_json(url, Some(request)).await?;
        Ok(response.json::<DataEnvelope<Gate>>().await?.data)
    }

    async fn delete_gate(&self, gate: &GateId) -> RosterResult<()> {
        let url = self.url(v1::gates::ITEM, &[("gate_id", gate.as_str())]);
        self.send(self.client.delete(url)).await?;
        Ok(())
    }

    async fn list_session_areas(
        &self,
        event: &EventId,
    ) -> RosterResult<Vec<SessionArea>> {
        let url = self.url(
            v1::gates::SESSION_AREAS,
            &[("event_id", event.as_str())],
        );
        Ok(self.get_envelope::<Vec<SessionArea>>(url, &[]).await?.data)
    }
}

/// Many operators type "host:port"; reqwest rejects urls without a scheme.
fn normalize_base_url(raw: &str) -> RosterResult<Url> {
    let trimmed = raw.trim().trim_end_matches('/');
    let with_scheme =
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            trimmed.to_string()
        } else {
            format!("http://{trimmed}")
        };

    if with_scheme != raw {
        debug!(
            target: "gate::roster",
            from = raw,
            to = %with_scheme,
            "normalized roster base url"
        );
    }

    Url::parse(&with_scheme).map_err(|err| {
        RosterError::Network(format!("invalid server url {raw:?}: {err}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_scheme_and_loses_trailing_slash() {
        let url = normalize_base_url("localhost:3000/api/").unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/api");
    }

    #[test]
    fn garbage_base_url_is_rejected() {
        assert!(matches!(
            normalize_base_url("http://exa mple.test"),
            Err(RosterError::Network(_))
        ));
    }

    #[tokio::test]
    async fn check_out_queue_without_area_fails_before_any_request() {
        let client = HttpRosterClient::new(
            "http://127.0.0.1:9",
            Duration::from_millis(50),
        )
        .unwrap();
        let err = client
            .fetch_page(
                &GateScope::event("ev"),
                QueueKind::NeedsCheckOut,
                PageRequest::first(10),
            )
            .await
            .unwrap_err();
        assert_eq!(err, RosterError::MissingSessionArea);
    }
}
