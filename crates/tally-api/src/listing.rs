//! GET / — every stored metric as an HTML table.

use askama::Template;
use axum::extract::State;
use axum::response::Html;
use tally_core::{MetricKind, MetricValue};

use crate::ApiState;

struct MetricRow {
    kind: MetricKind,
    name: String,
    value: String,
}

#[derive(Template)]
#[template(path = "metrics.html")]
struct MetricsTemplate {
    rows: Vec<MetricRow>,
}

fn render<T: Template>(tmpl: T) -> Html<String> {
    Html(tmpl.render().unwrap_or_else(|e| {
        format!("<pre>Template error: {e}</pre>")
    }))
}

/// GET /
pub async fn list_metrics(State(state): State<ApiState>) -> Html<String> {
    let snapshot = state.store.snapshot();
    let gauges = snapshot.gauges.into_iter().map(|(name, v)| MetricRow {
        kind: MetricKind::Gauge,
        name,
        value: MetricValue::Gauge(v).to_string(),
    });
    let counters = snapshot.counters.into_iter().map(|(name, v)| MetricRow {
        kind: MetricKind::Counter,
        name,
        value: MetricValue::Counter(v).to_string(),
    });

    render(MetricsTemplate {
        rows: gauges.chain(counters).collect(),
    })
}
