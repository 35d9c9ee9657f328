//! Derived valuation metrics
//!
//! Pure functions over the gathered dossier. Missing or unusable inputs are
//! data, not errors: every metric key is always present in the output and a
//! metric that cannot be derived carries `value: None` with its inputs
//! recorded, so the consumer can show exactly what was unavailable.

use crate::gather::Dossier;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Every metric the calculator produces, in output order.
pub const METRIC_KEYS: [&str; 4] = ["debt_to_equity", "pb_ratio", "pe_ratio", "return_on_equity"];

/// One derived metric with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatedMetric {
    pub value: Option<f64>,
    /// How the value was (or would have been) derived
    pub formula: String,
    /// Raw inputs by name; `null` marks an input the sources did not report
    pub inputs: BTreeMap<String, serde_json::Value>,
    /// The arithmetic, spelled out, when the value was computed
    pub proof: Option<String>,
}

fn num(value: Option<f64>) -> serde_json::Value {
    value.map_or(serde_json::Value::Null, |v| serde_json::json!(v))
}

fn direct(input_name: &str, value: f64) -> CalculatedMetric {
    let mut inputs = BTreeMap::new();
    inputs.insert(input_name.to_string(), num(Some(value)));
    CalculatedMetric {
        value: Some(value),
        formula: "Direct from source".to_string(),
        inputs,
        proof: None,
    }
}

fn ratio(
    formula: &str,
    numerator_name: &str,
    numerator: Option<f64>,
    denominator_name: &str,
    denominator: Option<f64>,
) -> CalculatedMetric {
    let mut inputs = BTreeMap::new();
    inputs.insert(numerator_name.to_string(), num(numerator));
    inputs.insert(denominator_name.to_string(), num(denominator));

    let (value, proof) = match (numerator, denominator) {
        (Some(n), Some(d)) if d.abs() > f64::EPSILON => {
            let v = n / d;
            (Some(v), Some(format!("{n:.2} / {d:.2} = {v:.4}")))
        }
        _ => (None, None),
    };

    CalculatedMetric {
        value,
        formula: formula.to_string(),
        inputs,
        proof,
    }
}

/// Derive every metric from the dossier. Never panics, never omits a key.
///
/// A ratio the source already reports is taken as-is with the formula
/// `"Direct from source"`; otherwise it is computed from components.
pub fn calculate_all_metrics(dossier: &Dossier) -> BTreeMap<String, CalculatedMetric> {
    let quote = dossier.quote();
    let financials = dossier.financials();
    let price = quote.map(|q| q.price);

    let pe = match quote.and_then(|q| q.pe_ratio) {
        Some(v) => direct("pe_ratio", v),
        None => ratio(
            "price / eps",
            "price",
            price,
            "eps",
            quote.and_then(|q| q.eps),
        ),
    };

    let pb = match financials.and_then(|f| f.pb_ratio) {
        Some(v) => direct("pb_ratio", v),
        None => ratio(
            "price / book_value_per_share",
            "price",
            price,
            "book_value_per_share",
            financials.and_then(|f| f.book_value_per_share),
        ),
    };

    let debt_to_equity = ratio(
        "total_debt / total_equity",
        "total_debt",
        financials.and_then(|f| f.total_debt),
        "total_equity",
        financials.and_then(|f| f.total_equity),
    );

    let roe = match financials.and_then(|f| f.return_on_equity) {
        Some(v) => direct("return_on_equity", v),
        None => ratio(
            "net_income / total_equity",
            "net_income",
            financials.and_then(|f| f.net_income),
            "total_equity",
            financials.and_then(|f| f.total_equity),
        ),
    };

    let mut metrics = BTreeMap::new();
    metrics.insert("pe_ratio".to_string(), pe);
    metrics.insert("pb_ratio".to_string(), pb);
    metrics.insert("debt_to_equity".to_string(), debt_to_equity);
    metrics.insert("return_on_equity".to_string(), roe);
    metrics
}

/// Advisory pass over the derived metrics.
///
/// Backs the Verifying phase: synchronous, never fails, returns notes for
/// anything a reader should double-check.
pub fn cross_check(metrics: &BTreeMap<String, CalculatedMetric>) -> Vec<String> {
    let mut notes = Vec::new();
    for key in METRIC_KEYS {
        let Some(metric) = metrics.get(key) else {
            notes.push(format!("{key}: absent"));
            continue;
        };
        match metric.value {
            None => {
                let missing: Vec<&str> = metric
                    .inputs
                    .iter()
                    .filter(|(_, v)| v.is_null())
                    .map(|(name, _)| name.as_str())
                    .collect();
                if missing.is_empty() {
                    notes.push(format!("{key}: not derivable (zero denominator)"));
                } else {
                    notes.push(format!("{key}: not derivable (missing {})", missing.join(", ")));
                }
            }
            Some(v) if v < 0.0 => {
                notes.push(format!("{key}: negative value {v:.2}, check source figures"));
            }
            Some(_) => {}
        }
    }
    notes
}
