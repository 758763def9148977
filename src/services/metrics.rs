use anyhow::Result;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::time::{Duration, Instant};

use crate::models::Tier;

pub struct MetricsService {
    registry: Registry,
    reservations: IntCounterVec,
    settlements: IntCounterVec,
    tokens: IntCounterVec,
    request_duration: HistogramVec,
}

impl MetricsService {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let reservations = IntCounterVec::new(
            Opts::new("ai_reservations_total", "AI usage reservation attempts by outcome"),
            &["tier", "outcome"],
        )?;
        let settlements = IntCounterVec::new(
            Opts::new("ai_settlements_total", "Finalize and release calls by outcome"),
            &["phase", "outcome"],
        )?;
        let tokens = IntCounterVec::new(
            Opts::new("ai_tokens_total", "Provider-reported tokens billed"),
            &["direction"],
        )?;
        let request_duration = HistogramVec::new(
            HistogramOpts::new("http_request_duration_seconds", "HTTP request latency"),
            &["method", "status"],
        )?;

        registry.register(Box::new(reservations.clone()))?;
        registry.register(Box::new(settlements.clone()))?;
        registry.register(Box::new(tokens.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;

        Ok(Self {
            registry,
            reservations,
            settlements,
            tokens,
            request_duration,
        })
    }

    pub fn record_reservation(&self, tier: &Tier, outcome: &str) {
        self.reservations
            .with_label_values(&[tier.metric_label(), outcome])
            .inc();
    }

    pub fn record_settlement(&self, phase: &str, ok: bool) {
        let outcome = if ok { "ok" } else { "error" };
        self.settlements.with_label_values(&[phase, outcome]).inc();
    }

    pub fn record_tokens(&self, input_tokens: i64, output_tokens: i64) {
        self.tokens
            .with_label_values(&["input"])
            .inc_by(input_tokens.max(0) as u64);
        self.tokens
            .with_label_values(&["output"])
            .inc_by(output_tokens.max(0) as u64);
    }

    pub fn record_request(&self, method: &str, status: u16, duration: Duration) {
        self.request_duration
            .with_label_values(&[method, &status.to_string()])
            .observe(duration.as_secs_f64());
    }

    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

pub struct RequestTimer {
    start: Instant,
}

impl RequestTimer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
