use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};

// ============================================================================
// Metrics Module - Prometheus metrics for the fulfillment core
// ============================================================================
//
// Covers:
// - Order placement (successes, failures by error kind)
// - Shipment status transitions
// - Driver scan attempts and their outcome
// - Route links
// - Per-operation latency
//
// Scraped via GET /metrics on the API server.
// ============================================================================

pub struct Metrics {
    registry: Registry,

    // Orders
    pub orders_created: IntCounter,
    pub order_failures: IntCounterVec,

    // Shipments
    pub shipment_transitions: IntCounterVec,
    pub scan_attempts: IntCounterVec,

    // Routes
    pub route_links: IntCounter,

    // Latency
    pub operation_duration: HistogramVec,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let orders_created = IntCounter::new("orders_created_total", "Total orders placed")?;
        registry.register(Box::new(orders_created.clone()))?;

        let order_failures = IntCounterVec::new(
            Opts::new("order_failures_total", "Order placements rejected or failed"),
            &["kind"],
        )?;
        registry.register(Box::new(order_failures.clone()))?;

        let shipment_transitions = IntCounterVec::new(
            Opts::new("shipment_transitions_total", "Applied shipment status transitions"),
            &["from", "to"],
        )?;
        registry.register(Box::new(shipment_transitions.clone()))?;

        let scan_attempts = IntCounterVec::new(
            Opts::new("scan_attempts_total", "Driver scan attempts by outcome"),
            &["action", "outcome"],
        )?;
        registry.register(Box::new(scan_attempts.clone()))?;

        let route_links = IntCounter::new("route_links_total", "Shipments linked to routes")?;
        registry.register(Box::new(route_links.clone()))?;

        let operation_duration = HistogramVec::new(
            HistogramOpts::new("operation_duration_seconds", "Fulfillment operation latency")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["operation"],
        )?;
        registry.register(Box::new(operation_duration.clone()))?;

        Ok(Self {
            registry,
            orders_created,
            order_failures,
            shipment_transitions,
            scan_attempts,
            route_links,
            operation_duration,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Prometheus text exposition of everything registered.
    pub fn render(&self) -> prometheus::Result<Vec<u8>> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(buffer)
    }

    pub fn record_order(&self, failure_kind: Option<&str>) {
        match failure_kind {
            None => self.orders_created.inc(),
            Some(kind) => self.order_failures.with_label_values(&[kind]).inc(),
        }
    }

    pub fn record_transition(&self, from: &str, to: &str) {
        self.shipment_transitions.with_label_values(&[from, to]).inc();
    }

    pub fn record_scan(&self, action: &str, outcome: &str) {
        self.scan_attempts.with_label_values(&[action, outcome]).inc();
    }

    pub fn record_route_link(&self) {
        self.route_links.inc();
    }

    pub fn observe_duration(&self, operation: &str, duration_secs: f64) {
        self.operation_duration
            .with_label_values(&[operation])
            .observe(duration_secs);
    }
}
