use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct MetricsRegistry {
    started_total: AtomicU64,
    fast_path_total: AtomicU64,
    full_path_total: AtomicU64,
    completed_total: AtomicU64,
    failed_total: AtomicU64,
    timed_out_total: AtomicU64,
    in_flight: AtomicU64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts a new execution and claims its slot in the in-flight gauge.
    /// The slot is held until the returned guard drops.
    pub fn started(&self) -> InFlightGuard<'_> {
        self.started_total.fetch_add(1, Ordering::Relaxed);
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        InFlightGuard { registry: self }
    }

    pub fn fast_path(&self) {
        self.fast_path_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn full_path(&self) {
        self.full_path_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn completed(&self) {
        self.completed_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failed(&self) {
        self.failed_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn timed_out(&self) {
        self.timed_out_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn render_prometheus(&self) -> String {
        format!(
            concat!(
                "# TYPE execution_started_total counter\n",
                "execution_started_total {}\n",
                "# TYPE execution_fast_path_total counter\n",
                "execution_fast_path_total {}\n",
                "# TYPE execution_full_path_total counter\n",
                "execution_full_path_total {}\n",
                "# TYPE execution_completed_total counter\n",
                "execution_completed_total {}\n",
                "# TYPE execution_failed_total counter\n",
                "execution_failed_total {}\n",
                "# TYPE execution_timed_out_total counter\n",
                "execution_timed_out_total {}\n",
                "# TYPE execution_in_flight gauge\n",
                "execution_in_flight {}\n"
            ),
            self.started_total.load(Ordering::Relaxed),
            self.fast_path_total.load(Ordering::Relaxed),
            self.full_path_total.load(Ordering::Relaxed),
            self.completed_total.load(Ordering::Relaxed),
            self.failed_total.load(Ordering::Relaxed),
            self.timed_out_total.load(Ordering::Relaxed),
            self.in_flight.load(Ordering::Relaxed),
        )
    }

    fn decrement_in_flight(&self) {
        let mut current = self.in_flight.load(Ordering::Relaxed);
        while current > 0 {
            match self.in_flight.compare_exchange_weak(
                current,
                current - 1,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }
}

/// Borrowed slot in the `execution_in_flight` gauge, released on drop so
/// executions whose future is dropped mid-run return it too.
#[must_use]
pub struct InFlightGuard<'a> {
    registry: &'a MetricsRegistry,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.registry.decrement_in_flight();
    }
}
