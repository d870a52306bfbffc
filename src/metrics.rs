//! Prometheus metrics for rental monitoring.
//!
//! The `metrics` crate counters emitted throughout the crate work with any
//! recorder. This module adds an optional Prometheus registry wrapper for
//! deployments that scrape one directly:
//! - **Gauges**: rentals per status in the last admin listing
//! - **Counters**: transitions by action and outcome
//! - **Histograms**: API call latency by endpoint

#[cfg(feature = "prometheus")]
use prometheus::{CounterVec, GaugeVec, HistogramVec, Opts, Registry};
#[cfg(feature = "prometheus")]
use std::time::Duration;

#[cfg(feature = "prometheus")]
use crate::error::Result;
#[cfg(feature = "prometheus")]
use crate::rental::{Action, AnyRental, RentalStatus};

/// Prometheus metrics registry for the rental lifecycle.
#[cfg(feature = "prometheus")]
#[derive(Clone)]
pub struct ToolhireMetrics {
    registry: Registry,
    rentals_by_status: GaugeVec,
    transitions_total: CounterVec,
    api_request_duration_seconds: HistogramVec,
}

#[cfg(feature = "prometheus")]
impl ToolhireMetrics {
    /// Create the metrics and register them with `registry`.
    ///
    /// # Errors
    ///
    /// Returns an error if a metric fails to register (e.g., duplicate registration).
    pub fn new(registry: Registry) -> Result<Self> {
        let rentals_by_status = GaugeVec::new(
            Opts::new("toolhire_rentals", "Rentals in the last listing, by status"),
            &["status"],
        )
        .map_err(|e| anyhow::anyhow!("Failed to create rentals gauge: {}", e))?;

        let transitions_total = CounterVec::new(
            Opts::new(
                "toolhire_manager_transitions_total",
                "Transitions attempted through the manager, by action and outcome",
            ),
            &["action", "outcome"],
        )
        .map_err(|e| anyhow::anyhow!("Failed to create transitions counter: {}", e))?;

        let api_request_duration_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "toolhire_api_request_duration_seconds",
                "Marketplace API call duration in seconds",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
            &["endpoint"],
        )
        .map_err(|e| anyhow::anyhow!("Failed to create API duration histogram: {}", e))?;

        registry
            .register(Box::new(rentals_by_status.clone()))
            .map_err(|e| anyhow::anyhow!("Failed to register rentals gauge: {}", e))?;
        registry
            .register(Box::new(transitions_total.clone()))
            .map_err(|e| anyhow::anyhow!("Failed to register transitions counter: {}", e))?;
        registry
            .register(Box::new(api_request_duration_seconds.clone()))
            .map_err(|e| anyhow::anyhow!("Failed to register API duration histogram: {}", e))?;

        Ok(Self {
            registry,
            rentals_by_status,
            transitions_total,
            api_request_duration_seconds,
        })
    }

    /// Get the underlying Prometheus registry, e.g. to expose it over HTTP.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Set the per-status gauges from a listing. Statuses absent from it read zero.
    pub fn record_rentals<'a, I>(&self, rentals: I)
    where
        I: IntoIterator<Item = &'a AnyRental>,
    {
        let mut counts = [0usize; RentalStatus::ALL.len()];
        for rental in rentals {
            if let Some(slot) = RentalStatus::ALL.iter().position(|s| *s == rental.status()) {
                counts[slot] += 1;
            }
        }
        for (status, count) in RentalStatus::ALL.iter().zip(counts) {
            self.rentals_by_status
                .with_label_values(&[status.as_str()])
                .set(count as f64);
        }
    }

    /// The outcome should be a low-cardinality value like "applied" or "failed".
    pub fn record_transition(&self, action: Action, outcome: &str) {
        self.transitions_total
            .with_label_values(&[action.as_str(), outcome])
            .inc();
    }

    pub fn observe_api_request(&self, endpoint: &str, duration: Duration) {
        self.api_request_duration_seconds
            .with_label_values(&[endpoint])
            .observe(duration.as_secs_f64());
    }
}
