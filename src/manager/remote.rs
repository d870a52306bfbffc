//! Rental store backed by the marketplace HTTP API.

use std::time::Instant;

use async_trait::async_trait;
use metrics::counter;
use serde::de::DeserializeOwned;

use crate::aggregate::DateRange;
use crate::config::{ClientConfig, Session};
use crate::error::{Result, ToolhireError};
use crate::http::{ApiRequest, HttpClient};
use crate::rental::{
    AdminFilter, AdminListing, AdminListingRecord, AnyRental, EarningsReport, Envelope, NewRentalRequest,
    RentalId, RentalRecord, RentalStatus, SellerDecision, StatusAdvance, StatusUpdate, decode_records,
    earnings_query,
};

#[cfg(feature = "prometheus")]
use crate::metrics::ToolhireMetrics;
#[cfg(feature = "prometheus")]
use std::sync::Arc;

use super::RentalStore;

/// [`RentalStore`] over the marketplace API, acting as one session.
#[derive(Clone)]
pub struct RemoteRentalStore<H: HttpClient> {
    http: H,
    config: ClientConfig,
    session: Session,
    #[cfg(feature = "prometheus")]
    metrics: Option<Arc<ToolhireMetrics>>,
}

impl<H: HttpClient> RemoteRentalStore<H> {
    pub fn new(http: H, config: ClientConfig, session: Session) -> Self {
        Self {
            http,
            config,
            session,
            #[cfg(feature = "prometheus")]
            metrics: None,
        }
    }

    /// Also record API latency in a Prometheus registry.
    #[cfg(feature = "prometheus")]
    pub fn with_metrics(mut self, metrics: Arc<ToolhireMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send one request and return the body of a successful response.
    ///
    /// `rental` names the rental a per-rental call addresses, so a 404 can be
    /// reported as [`ToolhireError::NotFound`].
    async fn call(&self, endpoint: &'static str, request: ApiRequest, rental: Option<&RentalId>) -> Result<String> {
        let started = Instant::now();
        let result = self
            .http
            .execute(&request, &self.session.token, self.config.timeout_ms)
            .await;

        #[cfg(feature = "prometheus")]
        if let Some(metrics) = &self.metrics {
            metrics.observe_api_request(endpoint, started.elapsed());
        }

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(endpoint, error = %e, "API call failed before a response");
                counter!("toolhire_api_requests_total", "endpoint" => endpoint, "status" => "error").increment(1);
                return Err(e);
            }
        };

        counter!(
            "toolhire_api_requests_total",
            "endpoint" => endpoint,
            "status" => response.status.to_string()
        )
        .increment(1);
        tracing::debug!(
            endpoint,
            status = response.status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "API call completed"
        );

        if response.is_success() {
            Ok(response.body)
        } else {
            let error = error_for_status(response.status, &response.body, rental);
            tracing::warn!(endpoint, status = response.status, error = %error, "API call refused");
            Err(error)
        }
    }

    /// Decode a status update; an empty body means the store did what was asked.
    fn decode_status(body: &str, expected: RentalStatus) -> Result<RentalStatus> {
        if body.trim().is_empty() {
            return Ok(expected);
        }
        let update: Envelope<StatusUpdate> = decode(body)?;
        Ok(update.into_inner().status)
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| {
        tracing::error!(error = %e, body_len = body.len(), "Failed to decode API response");
        ToolhireError::Serialization(e)
    })
}

/// Map a non-success response onto the error taxonomy.
pub fn error_for_status(status: u16, body: &str, rental: Option<&RentalId>) -> ToolhireError {
    let message = error_message(body);
    match (status, rental) {
        (400 | 422, _) => ToolhireError::Validation(if message.is_empty() {
            "The request was rejected.".to_string()
        } else {
            message
        }),
        (401 | 403, _) => ToolhireError::Unauthorized,
        (404, Some(id)) => ToolhireError::NotFound(id.clone()),
        _ => ToolhireError::Remote { status, message },
    }
}

/// Pull `message` (or `error`) out of a JSON error body, else use the raw text.
fn error_message(body: &str) -> String {
    if let Ok(serde_json::Value::Object(fields)) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "error"] {
            if let Some(serde_json::Value::String(message)) = fields.get(key) {
                return message.trim().to_string();
            }
        }
    }
    body.trim().chars().take(200).collect()
}

#[async_trait]
impl<H: HttpClient> RentalStore for RemoteRentalStore<H> {
    #[tracing::instrument(skip(self), fields(user_id = %self.session.user_id))]
    async fn list_buyer_rentals(&self) -> Result<Vec<AnyRental>> {
        let request = ApiRequest::get(&self.config.base_url, self.config.buyer_rentals_path.clone());
        let body = self.call("buyer_rentals", request, None).await?;
        let records: Envelope<Vec<RentalRecord>> = decode(&body)?;
        decode_records(records.into_inner())
    }

    #[tracing::instrument(skip(self), fields(user_id = %self.session.user_id))]
    async fn list_seller_rentals(&self) -> Result<Vec<AnyRental>> {
        let request = ApiRequest::get(&self.config.base_url, self.config.seller_rentals_path.clone());
        let body = self.call("seller_rentals", request, None).await?;
        let records: Envelope<Vec<RentalRecord>> = decode(&body)?;
        decode_records(records.into_inner())
    }

    #[tracing::instrument(skip(self, filter))]
    async fn list_admin_rentals(&self, filter: &AdminFilter) -> Result<AdminListing> {
        let request = ApiRequest::post(&self.config.base_url, self.config.admin_rentals_path.clone(), filter)?;
        let body = self.call("admin_rentals", request, None).await?;
        let listing: AdminListingRecord = decode(&body)?;
        AdminListing::try_from(listing)
    }

    #[tracing::instrument(skip(self), fields(user_id = %self.session.user_id))]
    async fn earnings(&self, range: Option<DateRange>) -> Result<EarningsReport> {
        let request = ApiRequest::get(&self.config.base_url, self.config.seller_earnings_path.clone())
            .with_query(earnings_query(range.as_ref()));
        let body = self.call("seller_earnings", request, None).await?;
        let report: Envelope<EarningsReport> = decode(&body)?;
        Ok(report.into_inner())
    }

    #[tracing::instrument(skip(self, request), fields(product_id = %request.product_id))]
    async fn create_rental(&self, request: &NewRentalRequest) -> Result<AnyRental> {
        let api_request = ApiRequest::post(&self.config.base_url, self.config.create_rental_path.clone(), request)?;
        let body = self.call("create_rental", api_request, None).await?;
        let record: Envelope<RentalRecord> = decode(&body)?;
        AnyRental::try_from(record.into_inner())
    }

    #[tracing::instrument(skip(self, decision), fields(rental_id = %id, decision = ?decision.action))]
    async fn submit_decision(&self, id: &RentalId, decision: &SellerDecision) -> Result<RentalStatus> {
        decision.validate()?;
        let path = ClientConfig::rental_path(&self.config.seller_action_path, id);
        let request = ApiRequest::put(&self.config.base_url, path, decision)?;
        let body = self.call("seller_action", request, Some(id)).await?;
        let expected = decision.to_command()?.action().target_status();
        Self::decode_status(&body, expected)
    }

    #[tracing::instrument(skip(self), fields(rental_id = %id))]
    async fn advance_status(&self, id: &RentalId, advance: StatusAdvance) -> Result<RentalStatus> {
        let path = ClientConfig::rental_path(&self.config.seller_status_path, id);
        let request = ApiRequest::put(&self.config.base_url, path, &advance)?;
        let body = self.call("seller_status", request, Some(id)).await?;
        Self::decode_status(&body, advance.action().target_status())
    }
}
