//! Per-page render timings
//!
//! The host keeps a group of named timers. Compile and render timers for a
//! template are named after its input path; paginated templates get a single
//! render timer that also counts the pages it produced.

use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;

/// Accumulated timings of one named timer
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Benchmark {
    /// Total time spent, in milliseconds
    pub total_ms: f64,
    pub times_called: u64,
}

/// The host's named timers, in registration order
#[derive(Debug, Clone, Default)]
pub struct BenchmarkGroup {
    benchmarks: IndexMap<String, Benchmark>,
}

impl BenchmarkGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, benchmark: Benchmark) {
        self.benchmarks.insert(name.into(), benchmark);
    }

    /// Add one measurement to the named timer
    pub fn record(&mut self, name: &str, ms: f64) {
        let benchmark = self.benchmarks.entry(name.to_string()).or_default();
        benchmark.total_ms += ms;
        benchmark.times_called += 1;
    }

    pub fn get(&self, name: &str) -> Option<&Benchmark> {
        self.benchmarks.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Benchmark)> {
        self.benchmarks.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.benchmarks.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Benchmark)> for BenchmarkGroup {
    fn from_iter<I: IntoIterator<Item = (K, Benchmark)>>(iter: I) -> Self {
        Self {
            benchmarks: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Timings recorded in the snapshot for one page
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Benchmarks {
    pub compile: f64,
    pub render: f64,
    /// Number of pages a paginated template produced
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paginated: Option<u64>,
    /// Average render time per paginated page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub render_each: Option<f64>,
}

fn compile_key(input_path: &str) -> String {
    format!("> Compile > {input_path}")
}

fn render_key(input_path: &str) -> String {
    format!("> Render > {input_path}")
}

fn paginated_pattern(input_path: &str) -> Option<Regex> {
    let pattern = format!(r"^> Render > {} \(\d+ pages\)$", regex::escape(input_path));
    match Regex::new(&pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::warn!("Cannot match paginated timers for {input_path}: {e}");
            None
        }
    }
}

/// Look up the timings of the template at `input_path`.
///
/// Missing timers count as zero. Without a group every timing is zero.
pub fn get_benchmarks(input_path: &str, group: Option<&BenchmarkGroup>) -> Benchmarks {
    let Some(group) = group else {
        return Benchmarks::default();
    };

    let total = |key: &str| group.get(key).map_or(0.0, |b| b.total_ms);
    let mut benchmarks = Benchmarks {
        compile: total(&compile_key(input_path)),
        render: total(&render_key(input_path)),
        ..Benchmarks::default()
    };

    let paginated = paginated_pattern(input_path).and_then(|re| {
        group
            .iter()
            .find(|(name, _)| re.is_match(name))
            .map(|(_, b)| *b)
    });
    if let Some(timer) = paginated {
        benchmarks.paginated = Some(timer.times_called);
        benchmarks.render = timer.total_ms;
        if timer.times_called > 0 {
            benchmarks.render_each = Some(timer.total_ms / timer.times_called as f64);
        }
    }

    benchmarks
}
