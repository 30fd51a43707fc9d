//! Latency breakdown of a correlated timeline.
//!
//! Every metric of a direction is computed by one `MetricRule`. Rules never
//! fail: when the events they look for are missing the metric is 0, so each
//! transfer always yields a full row.

use serde::Serialize;

use crate::direction::{DirectionSpec, MetricRule};
use crate::event::TransferId;
use crate::timeline::Timeline;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metric {
    pub name: String,
    pub value: i64,
}

/// Metrics of one transfer, in the direction's output order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisResult {
    pub transfer: TransferId,
    pub metrics: Vec<Metric>,
}

impl AnalysisResult {
    pub fn get(&self, name: &str) -> Option<i64> {
        self.metrics.iter().find(|m| m.name == name).map(|m| m.value)
    }

    pub fn values(&self) -> Vec<i64> {
        self.metrics.iter().map(|m| m.value).collect()
    }
}

fn request_latency(timeline: &Timeline, send: &str, receive: &str) -> i64 {
    let Some(start) = timeline.events.iter().position(|e| e.kind() == send) else {
        return 0;
    };
    timeline.events[start + 1..]
        .iter()
        .find(|e| e.kind() == receive)
        .map_or(0, |e| e.ts - timeline.events[start].ts)
}

fn span(timeline: &Timeline, first: &str, last: &str) -> i64 {
    let start = timeline.events_of_kind(first).next().map(|e| e.ts);
    let stop = timeline.events_of_kind(last).last().map(|e| e.ts);
    match (start, stop) {
        (Some(start), Some(stop)) => stop - start,
        _ => 0,
    }
}

/// Evaluate a single rule against a correlated timeline.
pub fn evaluate(rule: &MetricRule, timeline: &Timeline) -> i64 {
    match rule {
        MetricRule::Total => timeline.duration(),
        MetricRule::Request { send, receive } => request_latency(timeline, send, receive),
        MetricRule::PairSum { receive } => timeline
            .events_of_kind(receive)
            .filter_map(|e| e.interval())
            .sum(),
        // A receive paired without its detail sample counts as 0.
        MetricRule::DetailSum { receive } => timeline
            .events_of_kind(receive)
            .map(|e| e.detail().unwrap_or(0))
            .sum(),
        MetricRule::Span { first, last } => span(timeline, first, last),
    }
}

pub fn analyze(timeline: &Timeline, spec: &DirectionSpec) -> AnalysisResult {
    AnalysisResult {
        transfer: timeline.transfer.clone(),
        metrics: spec
            .metrics
            .iter()
            .map(|m| Metric {
                name: m.name.clone(),
                value: evaluate(&m.rule, timeline),
            })
            .collect(),
    }
}
