use serde_json::Value;

/// Which entities of a metrics payload contribute to a counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricScope {
    /// Per-node value: the tablet sum when tablets carry the metric, else the server entity.
    Node,
    /// Sum over every tablet hosted by the node.
    AllTablets,
    /// Only the entity of the given tablet id.
    Tablet(String),
    /// Only the tablet server's own entity.
    Server,
}

impl MetricScope {
    fn matches(&self, entity: &Value) -> bool {
        let entity_type = entity.get("type").and_then(Value::as_str);
        match self {
            Self::Node => false,
            Self::Server => entity_type == Some("server"),
            Self::AllTablets => entity_type == Some("tablet"),
            Self::Tablet(id) => {
                entity_type == Some("tablet")
                    && entity.get("id").and_then(Value::as_str) == Some(id.as_str())
            }
        }
    }
}

/// Extracts `metric` from a diagnostics payload, summing across matching entities.
///
/// Counters may be published as `total_count` (histograms), `value` (gauges/counters)
/// or `calls` (statement stats). Returns `None` when no matching entity carries the
/// metric at all; a metric present with zero ops is `Some(0)`.
pub fn extract_metric(payload: &Value, metric: &str, scope: &MetricScope) -> Option<u64> {
    if *scope == MetricScope::Node {
        return extract_metric(payload, metric, &MetricScope::AllTablets)
            .or_else(|| extract_metric(payload, metric, &MetricScope::Server));
    }
    let entities = payload.as_array()?;
    let mut found = false;
    let mut total = 0u64;
    for entity in entities.iter().filter(|entity| scope.matches(entity)) {
        let Some(metrics) = entity.get("metrics").and_then(Value::as_array) else {
            continue;
        };
        for sample in metrics {
            if sample.get("name").and_then(Value::as_str) != Some(metric) {
                continue;
            }
            let count = ["total_count", "value", "calls"]
                .iter()
                .find_map(|key| sample.get(*key).and_then(Value::as_u64));
            if let Some(count) = count {
                found = true;
                total = total.saturating_add(count);
            }
        }
    }
    found.then_some(total)
}
