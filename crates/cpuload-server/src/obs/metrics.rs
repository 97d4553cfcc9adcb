//! Process-wide metrics registry for the load generator.
//!
//! Counter/gauge types with dynamic labels backed by `DashMap`. Labels are
//! flattened into sorted key vectors to keep deterministic ordering. Every
//! update is a single atomic op on the entry, so concurrent requests never
//! lose increments and gauge reads never observe a torn value.

use std::fmt::Write;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;

type LabelKey = Vec<(String, String)>;

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn label_key(labels: &[(&str, &str)]) -> LabelKey {
    let mut key: LabelKey = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    key.sort();
    key
}

fn render_labels(key: &LabelKey) -> String {
    if key.is_empty() {
        return String::new();
    }
    let inner = key
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
        .collect::<Vec<_>>()
        .join(",");
    format!("{{{inner}}}")
}

fn render_header(out: &mut String, name: &str, help: &str, kind: &str) {
    let _ = writeln!(out, "# HELP {name} {help}");
    let _ = writeln!(out, "# TYPE {name} {kind}");
}

/// Monotonic counter family.
#[derive(Default)]
pub struct CounterVec {
    map: DashMap<LabelKey, AtomicU64>,
}

impl CounterVec {
    /// Increment by 1.
    pub fn inc(&self, labels: &[(&str, &str)]) {
        self.add(labels, 1);
    }

    /// Increment by an arbitrary value.
    pub fn add(&self, labels: &[(&str, &str)], v: u64) {
        let counter = self
            .map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicU64::new(0));
        counter.fetch_add(v, Ordering::Relaxed);
    }

    /// Current value for one label set (0 if never touched).
    pub fn get(&self, labels: &[(&str, &str)]) -> u64 {
        self.map
            .get(&label_key(labels))
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Sum across every label combination.
    pub fn total(&self) -> u64 {
        self.map.iter().map(|r| r.value().load(Ordering::Relaxed)).sum()
    }

    fn render(&self, name: &str, help: &str, out: &mut String) {
        render_header(out, name, help, "counter");
        for r in self.map.iter() {
            let val = r.value().load(Ordering::Relaxed);
            let _ = writeln!(out, "{}{} {}", name, render_labels(r.key()), val);
        }
    }
}

/// Integer gauge family (inc/dec).
#[derive(Default)]
pub struct GaugeVec {
    map: DashMap<LabelKey, AtomicI64>,
}

impl GaugeVec {
    /// Increment by 1.
    pub fn inc(&self, labels: &[(&str, &str)]) { self.add(labels, 1); }
    /// Decrement by 1.
    pub fn dec(&self, labels: &[(&str, &str)]) { self.add(labels, -1); }

    /// Add an arbitrary signed delta.
    pub fn add(&self, labels: &[(&str, &str)], v: i64) {
        let gauge = self
            .map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicI64::new(0));
        gauge.fetch_add(v, Ordering::Relaxed);
    }

    /// Overwrite the value for one label set.
    pub fn set(&self, labels: &[(&str, &str)], v: i64) {
        let gauge = self
            .map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicI64::new(0));
        gauge.store(v, Ordering::Relaxed);
    }

    pub fn get(&self, labels: &[(&str, &str)]) -> i64 {
        self.map
            .get(&label_key(labels))
            .map(|g| g.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    fn render(&self, name: &str, help: &str, out: &mut String) {
        render_header(out, name, help, "gauge");
        for r in self.map.iter() {
            let val = r.value().load(Ordering::Relaxed);
            let _ = writeln!(out, "{}{} {}", name, render_labels(r.key()), val);
        }
    }
}

/// Float gauge family holding the last observed value (f64 bits in an `AtomicU64`).
#[derive(Default)]
pub struct FloatGaugeVec {
    map: DashMap<LabelKey, AtomicU64>,
}

impl FloatGaugeVec {
    /// Overwrite the value for one label set.
    pub fn set(&self, labels: &[(&str, &str)], v: f64) {
        let gauge = self
            .map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicU64::new(0));
        gauge.store(v.to_bits(), Ordering::Relaxed);
    }

    /// Last value for one label set, `None` if never set.
    pub fn get(&self, labels: &[(&str, &str)]) -> Option<f64> {
        self.map
            .get(&label_key(labels))
            .map(|g| f64::from_bits(g.load(Ordering::Relaxed)))
    }

    fn render(&self, name: &str, help: &str, out: &mut String) {
        render_header(out, name, help, "gauge");
        for r in self.map.iter() {
            let val = f64::from_bits(r.value().load(Ordering::Relaxed));
            let _ = writeln!(out, "{}{} {}", name, render_labels(r.key()), val);
        }
    }
}

/// Label set of the in-flight gauge, released by [`InFlightGuard`].
pub struct InFlightGuard<'a> {
    gauge: &'a GaugeVec,
    function: String,
    instance_id: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.gauge.dec(&[
            ("function", self.function.as_str()),
            ("instance_id", self.instance_id.as_str()),
        ]);
    }
}

/// Registry owned by `AppState` and read by the `/metrics` handler.
pub struct LoadMetrics {
    prefix: String,
    pub requests_total: CounterVec,
    pub run_duration_seconds: FloatGaugeVec,
    pub in_flight_threads: GaugeVec,
    pub build_info: GaugeVec,
    draining: AtomicBool,
}

impl LoadMetrics {
    /// `namespace` and `subsystem` form the metric name prefix (`ns_sub_`).
    pub fn new(namespace: &str, subsystem: &str) -> Self {
        let prefix = [namespace, subsystem]
            .iter()
            .filter(|p| !p.is_empty())
            .map(|p| format!("{p}_"))
            .collect::<String>();

        let build_info = GaugeVec::default();
        build_info.set(&[("version", env!("CARGO_PKG_VERSION"))], 1);

        Self {
            prefix,
            requests_total: CounterVec::default(),
            run_duration_seconds: FloatGaugeVec::default(),
            in_flight_threads: GaugeVec::default(),
            build_info,
            draining: AtomicBool::new(false),
        }
    }

    /// Record one finished run request. Must be called exactly once per request.
    pub fn observe_run(&self, function: &str, status_code: u16, elapsed: Duration) {
        let code = status_code.to_string();
        let labels = [("function", function), ("status_code", code.as_str())];
        self.run_duration_seconds.set(&labels, elapsed.as_secs_f64());
        self.requests_total.inc(&labels);
    }

    /// Bump the in-flight gauge; the returned guard undoes it on drop.
    pub fn in_flight(&self, function: &str, instance_id: &str) -> InFlightGuard<'_> {
        self.in_flight_threads
            .inc(&[("function", function), ("instance_id", instance_id)]);
        InFlightGuard {
            gauge: &self.in_flight_threads,
            function: function.to_string(),
            instance_id: instance_id.to_string(),
        }
    }

    /// Mark draining state.
    pub fn set_draining(&self) { self.draining.store(true, Ordering::Relaxed); }
    /// Return whether draining is active.
    pub fn is_draining(&self) -> bool { self.draining.load(Ordering::Relaxed) }

    /// Render all registered metrics in Prometheus text exposition format.
    pub fn render(&self) -> String {
        let p = &self.prefix;
        let mut out = String::new();
        self.requests_total.render(
            &format!("{p}requests_total"),
            "The total number of run HTTP requests.",
            &mut out,
        );
        self.run_duration_seconds.render(
            &format!("{p}run_duration_seconds"),
            "The duration of the most recent run.",
            &mut out,
        );
        self.in_flight_threads.render(
            &format!("{p}in_flight_threads"),
            "The number of run requests currently executing.",
            &mut out,
        );
        self.build_info.render(
            &format!("{p}build_info"),
            "Build information about the running binary.",
            &mut out,
        );
        render_header(&mut out, &format!("{p}draining"), "1 while shutting down.", "gauge");
        let _ = writeln!(out, "{p}draining {}", u8::from(self.is_draining()));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_order_independent() {
        let c = CounterVec::default();
        c.inc(&[("a", "1"), ("b", "2")]);
        c.inc(&[("b", "2"), ("a", "1")]);
        assert_eq!(c.get(&[("a", "1"), ("b", "2")]), 2);
        assert_eq!(c.total(), 2);
    }

    #[test]
    fn float_gauge_keeps_last_value() {
        let g = FloatGaugeVec::default();
        assert_eq!(g.get(&[("k", "v")]), None);
        g.set(&[("k", "v")], 2.5);
        g.set(&[("k", "v")], 0.25);
        assert_eq!(g.get(&[("k", "v")]), Some(0.25));
    }

    #[test]
    fn guard_decrements_on_drop() {
        let m = LoadMetrics::new("t", "s");
        {
            let _g = m.in_flight("run", "pod");
            assert_eq!(m.in_flight_threads.get(&[("function", "run"), ("instance_id", "pod")]), 1);
        }
        assert_eq!(m.in_flight_threads.get(&[("function", "run"), ("instance_id", "pod")]), 0);
    }

    #[test]
    fn render_uses_prefix_and_escapes_labels() {
        let m = LoadMetrics::new("load_test", "stress_tester");
        m.observe_run("eu\"ler", 200, Duration::from_millis(500));
        let out = m.render();
        assert!(out.contains("# TYPE load_test_stress_tester_requests_total counter"));
        assert!(out.contains(
            "load_test_stress_tester_requests_total{function=\"eu\\\"ler\",status_code=\"200\"} 1"
        ));
        assert!(out.contains(
            "load_test_stress_tester_run_duration_seconds{function=\"eu\\\"ler\",status_code=\"200\"} 0.5"
        ));
        assert!(out.contains("load_test_stress_tester_build_info{version="));
        assert!(out.contains("load_test_stress_tester_draining 0"));
    }

    #[test]
    fn empty_namespace_is_skipped() {
        let m = LoadMetrics::new("", "svc");
        assert!(m.render().contains("# TYPE svc_requests_total counter"));
    }
}
