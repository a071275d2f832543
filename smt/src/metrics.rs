use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

/// Metrics collector, if active, it provides Counters and Timers
#[derive(Clone)]
pub struct Metrics {
    metrics: Option<Arc<ActiveMetrics>>,
}

/// Metrics that can be collected during execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    /// Counter of nodes loaded from the store
    NodeReads,
    /// Counter of nodes written to the store
    NodeWrites,
    /// Counter of superseded nodes removed from the store
    NodesPruned,
    /// Counter of proofs generated, single or multi
    ProofsGenerated,
    /// Timer used to record average update and remove time
    UpdateTime,
    /// Timer used to record average proof generation time
    ProofTime,
}

struct ActiveMetrics {
    node_reads: AtomicU64,
    node_writes: AtomicU64,
    nodes_pruned: AtomicU64,
    proofs_generated: AtomicU64,
    update_time: Timer,
    proof_time: Timer,
}

impl ActiveMetrics {
    fn counter(&self, metric: Metric) -> &AtomicU64 {
        match metric {
            Metric::NodeReads => &self.node_reads,
            Metric::NodeWrites => &self.node_writes,
            Metric::NodesPruned => &self.nodes_pruned,
            Metric::ProofsGenerated => &self.proofs_generated,
            _ => panic!("Specified metric is not a Counter"),
        }
    }
}

impl Metrics {
    /// Returns the Metrics object, active or not based on the specified input
    pub fn new(active: bool) -> Self {
        Self {
            metrics: if active {
                Some(Arc::new(ActiveMetrics {
                    node_reads: AtomicU64::new(0),
                    node_writes: AtomicU64::new(0),
                    nodes_pruned: AtomicU64::new(0),
                    proofs_generated: AtomicU64::new(0),
                    update_time: Timer::new(),
                    proof_time: Timer::new(),
                }))
            } else {
                None
            },
        }
    }

    /// Increase the Counter specified by the input
    ///
    /// panics if the specified [`Metric`] is not a Counter
    pub fn count(&self, metric: Metric) {
        self.count_n(metric, 1);
    }

    /// Increase the Counter specified by the input by `n`
    ///
    /// panics if the specified [`Metric`] is not a Counter
    pub fn count_n(&self, metric: Metric, n: u64) {
        if let Some(ref metrics) = self.metrics {
            metrics.counter(metric).fetch_add(n, Ordering::Relaxed);
        }
    }

    /// The current value of a Counter, or `None` if collection is off.
    ///
    /// panics if the specified [`Metric`] is not a Counter
    pub fn get(&self, metric: Metric) -> Option<u64> {
        self.metrics
            .as_ref()
            .map(|metrics| metrics.counter(metric).load(Ordering::Relaxed))
    }

    /// Returns a guard that, when dropped, will record the time passed since creation
    ///
    /// panics if the specified [`Metric`] is not a Timer
    pub fn record<'a>(&'a self, metric: Metric) -> Option<impl Drop + 'a> {
        self.metrics.as_ref().map(|metrics| {
            let timer = match metric {
                Metric::UpdateTime => &metrics.update_time,
                Metric::ProofTime => &metrics.proof_time,
                _ => panic!("Specified metric is not a Timer"),
            };

            timer.record()
        })
    }

    /// Print collected metrics to stdout
    pub fn print(&self) {
        if let Some(ref metrics) = self.metrics {
            println!("metrics");

            let node_reads = metrics.node_reads.load(Ordering::Relaxed);
            println!("  node reads            {}", node_reads);

            let node_writes = metrics.node_writes.load(Ordering::Relaxed);
            println!("  node writes           {}", node_writes);

            let nodes_pruned = metrics.nodes_pruned.load(Ordering::Relaxed);
            if node_writes != 0 {
                let percentage_pruned = (nodes_pruned as f64 / node_writes as f64) * 100.0;
                println!(
                    "  nodes pruned          {} - {:.2}% of node writes",
                    nodes_pruned, percentage_pruned
                );
            } else {
                println!("  nodes pruned          {}", nodes_pruned);
            }

            let proofs = metrics.proofs_generated.load(Ordering::Relaxed);
            println!("  proofs generated      {}", proofs);

            if let Some(mean) = metrics.update_time.mean() {
                println!("  update mean           {}", pretty_display_ns(mean));
            }

            if let Some(mean) = metrics.proof_time.mean() {
                println!("  proof mean            {}", pretty_display_ns(mean));
            }
        } else {
            println!("Metrics collection was not activated")
        }
    }
}

fn pretty_display_ns(ns: u64) -> String {
    // preserve 3 sig figs at minimum.
    let (val, unit) = if ns > 100 * 1_000_000_000 {
        (ns / 1_000_000_000, "s")
    } else if ns > 100 * 1_000_000 {
        (ns / 1_000_000, "ms")
    } else if ns > 100 * 1_000 {
        (ns / 1_000, "us")
    } else {
        (ns, "ns")
    };

    format!("{val} {unit}")
}

struct Timer {
    number_of_records: AtomicU64,
    sum: AtomicU64,
}

impl Timer {
    fn new() -> Self {
        Timer {
            number_of_records: AtomicU64::new(0),
            sum: AtomicU64::new(0),
        }
    }

    fn mean(&self) -> Option<u64> {
        let n = self.number_of_records.load(Ordering::Relaxed);
        let sum = self.sum.load(Ordering::Relaxed);
        sum.checked_div(n)
    }

    fn record<'a>(&'a self) -> impl Drop + 'a {
        struct TimerGuard<'a> {
            start: std::time::Instant,
            n: &'a AtomicU64,
            sum: &'a AtomicU64,
        }

        impl Drop for TimerGuard<'_> {
            fn drop(&mut self) {
                let elapsed = self.start.elapsed().as_nanos() as u64;
                self.n.fetch_add(1, Ordering::Relaxed);
                self.sum.fetch_add(elapsed, Ordering::Relaxed);
            }
        }

        TimerGuard {
            start: std::time::Instant::now(),
            n: &self.number_of_records,
            sum: &self.sum,
        }
    }
}
