use actix_web::http::header::HeaderMap;
use actix_web::http::Method;
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::donation::{self, DonationNotice, PLATFORM};
use crate::error::WebhookError;
use crate::metrics;
use crate::state::AppState;
use crate::token::{self, TokenStatus};

/// Path the webhook is registered under in the BagiBagi dashboard.
pub const WEBHOOK_PATH: &str = "/api/bagibagi-webhook";

const REDACTED_HEADERS: &[&str] = &["authorization", token::TOKEN_HEADER, "cookie"];
const REDACTED_FIELDS: &[&str] = &["token", "webhook_token"];

/// Response to a relayed donation.
#[derive(Debug, Serialize)]
pub struct RelaySummary {
    pub success: bool,
    pub platform: &'static str,
    pub donor: String,
    pub amount: i64,
    pub message: String,
    pub token_verified: bool,
    pub token_status: &'static str,
    pub timestamp: String,
}

impl RelaySummary {
    fn new(notice: DonationNotice, token: TokenStatus, received_at: DateTime<Utc>) -> Self {
        let message = if notice.message.is_empty() {
            "(no message)".to_string()
        } else {
            notice.message
        };
        Self {
            success: true,
            platform: PLATFORM,
            donor: notice.donor_name,
            amount: notice.amount,
            message,
            token_verified: token.is_verified(),
            token_status: token.as_str(),
            timestamp: received_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Webhook entry point for every method.
///
/// OPTIONS is answered empty, POST runs the relay pipeline, anything else
/// gets the readiness payload.
pub async fn webhook(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse, WebhookError> {
    match *req.method() {
        Method::OPTIONS => Ok(HttpResponse::Ok().finish()),
        Method::POST => {
            let outcome = relay_donation(&state, req.headers(), &body).await;
            let label = match &outcome {
                Ok(_) => "relayed",
                Err(e) => e.kind(),
            };
            metrics::WEBHOOK_REQUESTS.with_label_values(&[label]).inc();
            outcome.map(|summary| HttpResponse::Ok().json(summary))
        }
        _ => Ok(readiness(&state)),
    }
}

fn readiness(state: &AppState) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "OK",
        "message": "BagiBagi webhook ready!",
        "version": env!("CARGO_PKG_VERSION"),
        "token_check": state.config.token_check_mode(),
    }))
}

/// Token check, extraction, credential guard and a single publish.
pub async fn relay_donation(
    state: &AppState,
    headers: &HeaderMap,
    raw_body: &[u8],
) -> Result<RelaySummary, WebhookError> {
    let received_at = Utc::now();
    let body = donation::parse_body(raw_body);

    tracing::info!(
        received_at = %received_at.to_rfc3339(),
        headers = ?loggable_headers(headers),
        body = %loggable_body(&body),
        "BagiBagi webhook received"
    );

    let supplied = token::extract_token(headers, &body);
    let status = token::check_token(state.config.webhook_token.as_deref(), supplied);
    metrics::TOKEN_CHECKS
        .with_label_values(&[status.as_str()])
        .inc();
    let status = token::enforce(state.config.token_policy, status)?;

    let notice = DonationNotice::from_body(&body, received_at.timestamp_millis());
    tracing::debug!(notice = ?notice, "donation normalized");

    let credentials = state.config.credentials()?;

    let start = std::time::Instant::now();
    let result = state.messaging.publish(credentials, &notice).await;
    metrics::RELAY_LATENCY
        .with_label_values(&[if result.is_ok() { "success" } else { "error" }])
        .observe(start.elapsed().as_secs_f64());

    if let Err(e) = result {
        tracing::error!(error = %e, "donation relay failed");
        return Err(e.into());
    }

    tracing::info!(
        donor = %notice.donor_name,
        amount = notice.amount,
        token = status.as_str(),
        "donation relayed"
    );
    Ok(RelaySummary::new(notice, status, received_at))
}

fn loggable_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let value = if REDACTED_HEADERS.contains(&name.as_str()) {
                "[REDACTED]".to_string()
            } else {
                value.to_str().unwrap_or("<binary>").to_string()
            };
            (name.as_str().to_string(), value)
        })
        .collect()
}

fn loggable_body(body: &Map<String, Value>) -> Value {
    let mut body = body.clone();
    for field in REDACTED_FIELDS {
        if let Some(value) = body.get_mut(*field) {
            *value = Value::String("[REDACTED]".to_string());
        }
    }
    Value::Object(body)
}

/// GET /metrics - Prometheus metrics, bearer-gated when METRICS_TOKEN is set
pub async fn metrics_endpoint(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    if let Some(ref expected) = state.config.metrics_token {
        let authorized = req
            .headers()
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|t| token::constant_time_eq(t.as_bytes(), expected.as_bytes()))
            .unwrap_or(false);

        if !authorized {
            return HttpResponse::Unauthorized().json(serde_json::json!({
                "error": "unauthorized",
                "message": "Valid Bearer token required for /metrics"
            }));
        }
    }

    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(metrics::metrics_output())
}

/// Register the metrics endpoint and the webhook paths. The binary also
/// mounts [`webhook`] as the default service so any other path behaves the
/// same way.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/metrics", web::get().to(metrics_endpoint))
        .route(WEBHOOK_PATH, web::route().to(webhook))
        .route("/", web::route().to(webhook));
}
