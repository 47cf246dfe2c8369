use lazy_static::lazy_static;
use prometheus::exponential_buckets;
use prometheus::register_histogram_vec;
use prometheus::HistogramVec;
use prometheus::IntCounter;
use prometheus::IntCounterVec;
use prometheus::Opts;
use prometheus::Registry;

#[cfg(test)]
mod metrics_test;

lazy_static! {
    pub static ref STORE_LATENCY_METRIC: HistogramVec = register_histogram_vec!(
        "range_store_latency_us",
        "Histogram of storage engine call latency in microseconds",
        &["op"],
        exponential_buckets(1.0, 2.0, 20).unwrap()
    )
    .expect("metric can not be created");

    pub static ref APPLIED_COMMANDS: IntCounterVec = IntCounterVec::new(
        Opts::new("range_applied_commands", "Commands applied, by type and outcome"),
        &["cmd_type", "outcome"]
    )
    .expect("Should succeed to create metric");

    pub static ref REJECTED_REQUESTS: IntCounterVec = IntCounterVec::new(
        Opts::new("range_rejected_requests", "Requests rejected before reaching storage"),
        &["reason"]
    )
    .expect("Should succeed to create metric");

    pub static ref NOTIFY_DELIVERED: IntCounter =
        IntCounter::new("watch_notify_delivered", "Watch events delivered")
            .expect("metric can not be created");

    pub static ref NOTIFY_FAILED: IntCounter =
        IntCounter::new("watch_notify_failed", "Watch events that could not be pushed")
            .expect("metric can not be created");

    pub static ref WATCHERS_REGISTERED: IntCounter =
        IntCounter::new("watchers_registered", "Watchers added to the registry")
            .expect("metric can not be created");

    pub static ref WATCHERS_EVICTED: IntCounter =
        IntCounter::new("watchers_evicted", "Watchers dropped by TTL or closed sessions")
            .expect("metric can not be created");

    pub static ref PENDING_ON_STEP_DOWN: IntCounter = IntCounter::new(
        "range_pending_on_step_down",
        "Proposals still waiting for apply when the replica lost leadership"
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry = Registry::new();
}

/// Registers the range collectors into `registry`, usually [`REGISTRY`].
/// Exposition is left to the hosting process.
pub fn register_custom_metrics(registry: &Registry) {
    registry
        .register(Box::new(STORE_LATENCY_METRIC.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(APPLIED_COMMANDS.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(REJECTED_REQUESTS.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(NOTIFY_DELIVERED.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(NOTIFY_FAILED.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(WATCHERS_REGISTERED.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(WATCHERS_EVICTED.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(PENDING_ON_STEP_DOWN.clone()))
        .expect("collector can be registered");
}

/// Records the elapsed time of a storage call since `start`.
pub(crate) fn observe_store_latency(
    op: &str,
    start: std::time::Instant,
) {
    STORE_LATENCY_METRIC
        .with_label_values(&[op])
        .observe(start.elapsed().as_micros() as f64);
}
