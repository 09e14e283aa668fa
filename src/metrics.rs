//! Metrics helpers for account, session, and token outcomes.
//!
//! Everything goes through the `metrics` facade; without an installed recorder the calls are
//! no-ops. Enable the `prometheus` feature to install the bundled exporter.

// std
#[cfg(feature = "prometheus")] use std::sync::OnceLock;
// crates.io
use metrics::Label;
#[cfg(feature = "prometheus")]
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use smallvec::SmallVec;
// self
use crate::_prelude::*;

type LabelSet = SmallVec<[Label; 2]>;

const METRIC_SIGNUPS_TOTAL: &str = "accounts_signups_total";
const METRIC_ROLLBACKS_TOTAL: &str = "accounts_rollbacks_total";
const METRIC_SIGNINS_TOTAL: &str = "accounts_signins_total";
const METRIC_SESSION_REFRESH_TOTAL: &str = "session_refresh_total";
const METRIC_TOKEN_VERIFICATIONS_TOTAL: &str = "token_verifications_total";
const METRIC_PROVIDER_CALL_DURATION: &str = "provider_call_duration_seconds";

/// Shared Prometheus handle installed by [`install_default_exporter`].
#[cfg(feature = "prometheus")]
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the default Prometheus recorder backed by `metrics`.
///
/// Multiple invocations are safe; subsequent calls become no-ops once the recorder is installed.
#[cfg(feature = "prometheus")]
pub fn install_default_exporter() -> Result<()> {
	if PROMETHEUS_HANDLE.get().is_some() {
		return Ok(());
	}

	let handle = PrometheusBuilder::new()
		.install_recorder()
		.map_err(|err| Error::Metrics(err.to_string()))?;
	let _ = PROMETHEUS_HANDLE.set(handle);

	Ok(())
}

/// Access the global Prometheus exporter handle when installed.
#[cfg(feature = "prometheus")]
pub fn prometheus_handle() -> Option<&'static PrometheusHandle> {
	PROMETHEUS_HANDLE.get()
}

/// Count a sign-up attempt by outcome.
pub fn record_signup(status: &'static str) {
	metrics::counter!(METRIC_SIGNUPS_TOTAL, status_labels(status).iter()).increment(1);
}

/// Count a provider-side rollback by outcome.
pub fn record_rollback(status: &'static str) {
	metrics::counter!(METRIC_ROLLBACKS_TOTAL, status_labels(status).iter()).increment(1);
}

/// Count a sign-in attempt by outcome.
pub fn record_signin(status: &'static str) {
	metrics::counter!(METRIC_SIGNINS_TOTAL, status_labels(status).iter()).increment(1);
}

/// Count a session-refresh decision by outcome.
pub fn record_session_refresh(status: &'static str) {
	metrics::counter!(METRIC_SESSION_REFRESH_TOTAL, status_labels(status).iter()).increment(1);
}

/// Count a token verification by outcome.
pub fn record_token_verification(status: &'static str) {
	metrics::counter!(METRIC_TOKEN_VERIFICATIONS_TOTAL, status_labels(status).iter())
		.increment(1);
}

/// Record the latency of one provider call.
pub fn record_provider_call(operation: &str, success: bool, duration: Duration) {
	let mut labels = LabelSet::with_capacity(2);

	labels.push(Label::new("operation", operation.to_owned()));
	labels.push(Label::new("status", if success { "success" } else { "error" }));

	metrics::histogram!(METRIC_PROVIDER_CALL_DURATION, labels.iter())
		.record(duration.as_secs_f64());
}

fn status_labels(status: &'static str) -> LabelSet {
	let mut labels = LabelSet::new();

	labels.push(Label::new("status", status));

	labels
}
