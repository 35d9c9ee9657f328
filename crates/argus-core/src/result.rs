//! Typed agent result payloads
//!
//! Every agent produces one variant of [`AgentResult`]. Code that only needs
//! the narrative form goes through the capability accessors (`summary`,
//! `sources`, `confidence`); the metric calculator and the synthesis loop
//! narrow to concrete payloads with the `as_*` accessors.

use crate::agent::AgentKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current-state market data for the subject.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuoteData {
    pub symbol: String,
    pub price: f64,
    pub currency: Option<String>,
    pub change_percent: Option<f64>,
    pub market_cap: Option<f64>,
    pub volume: Option<u64>,
    pub pe_ratio: Option<f64>,
    pub eps: Option<f64>,
    pub as_of: Option<DateTime<Utc>>,
    pub sources: Vec<String>,
}

impl QuoteData {
    pub fn summary(&self) -> String {
        let mut out = format!("{} {:.2}", self.symbol, self.price);
        if let Some(currency) = &self.currency {
            out.push_str(&format!(" {currency}"));
        }
        if let Some(pct) = self.change_percent {
            out.push_str(&format!(" ({pct:+.2}%)"));
        }
        if let Some(cap) = self.market_cap {
            out.push_str(&format!(", market cap {}", fmt_amount(cap)));
        }
        out
    }
}

/// Reported fundamentals for the subject.
///
/// Every figure is optional; sources differ in what they report and the
/// metric calculator treats absence as data, not as an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialStatements {
    pub symbol: String,
    pub fiscal_year: Option<i32>,
    pub revenue: Option<f64>,
    pub net_income: Option<f64>,
    pub total_debt: Option<f64>,
    pub total_equity: Option<f64>,
    pub book_value_per_share: Option<f64>,
    pub free_cash_flow: Option<f64>,
    /// Price-to-book as reported by the source, when it reports one.
    pub pb_ratio: Option<f64>,
    /// Return on equity as reported by the source, when it reports one.
    pub return_on_equity: Option<f64>,
    pub sources: Vec<String>,
}

impl FinancialStatements {
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if let Some(v) = self.revenue {
            parts.push(format!("revenue {}", fmt_amount(v)));
        }
        if let Some(v) = self.net_income {
            parts.push(format!("net income {}", fmt_amount(v)));
        }
        if let Some(v) = self.total_equity {
            parts.push(format!("equity {}", fmt_amount(v)));
        }
        if let Some(v) = self.total_debt {
            parts.push(format!("debt {}", fmt_amount(v)));
        }
        if parts.is_empty() {
            format!("{}: no reported figures", self.symbol)
        } else {
            format!("{}: {}", self.symbol, parts.join(", "))
        }
    }
}

/// Environmental, social, and governance profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EsgProfile {
    pub environmental: Option<f64>,
    pub social: Option<f64>,
    pub governance: Option<f64>,
    pub overall: Option<f64>,
    pub controversies: Vec<String>,
    pub summary: String,
    pub sources: Vec<String>,
}

/// Macro-economic backdrop relevant to the subject.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroContext {
    pub rates_outlook: Option<String>,
    pub inflation_outlook: Option<String>,
    pub key_risks: Vec<String>,
    pub summary: String,
    pub sources: Vec<String>,
}

/// Competitive position of the subject within its sector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompetitiveLandscape {
    pub peers: Vec<String>,
    pub market_position: String,
    pub moat: Option<String>,
    pub sources: Vec<String>,
}

impl CompetitiveLandscape {
    pub fn summary(&self) -> String {
        if self.peers.is_empty() {
            self.market_position.clone()
        } else {
            format!("{} (peers: {})", self.market_position, self.peers.join(", "))
        }
    }
}

/// Aggregated market sentiment, scored in `[-1.0, 1.0]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentReading {
    pub score: f64,
    pub drivers: Vec<String>,
    pub confidence: Option<f64>,
    pub sources: Vec<String>,
}

impl SentimentReading {
    /// Human label for the score band.
    pub fn label(&self) -> &'static str {
        if self.score >= 0.5 {
            "strongly positive"
        } else if self.score >= 0.15 {
            "positive"
        } else if self.score > -0.15 {
            "neutral"
        } else if self.score > -0.5 {
            "negative"
        } else {
            "strongly negative"
        }
    }

    pub fn summary(&self) -> String {
        let mut out = format!("Sentiment {:.2} ({})", self.score, self.label());
        if !self.drivers.is_empty() {
            out.push_str(&format!("; drivers: {}", self.drivers.join(", ")));
        }
        out
    }
}

/// Quantitative price-action signals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuantSignals {
    pub momentum_1m: Option<f64>,
    pub momentum_3m: Option<f64>,
    pub volatility_30d: Option<f64>,
    pub signal: String,
    pub confidence: Option<f64>,
    pub sources: Vec<String>,
}

impl QuantSignals {
    pub fn summary(&self) -> String {
        let mut out = format!("Signal: {}", self.signal);
        if let Some(m) = self.momentum_1m {
            out.push_str(&format!(", 1m momentum {m:+.1}%"));
        }
        if let Some(v) = self.volatility_30d {
            out.push_str(&format!(", 30d volatility {v:.1}%"));
        }
        out
    }
}

/// Draft or final recommendation from the synthesizer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SynthesisReport {
    pub recommendation: String,
    pub rationale: String,
    pub key_risks: Vec<String>,
    pub confidence: Option<f64>,
    pub sources: Vec<String>,
}

/// Bear-case counterargument produced by the challenger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChallengeReport {
    pub bear_case: String,
    pub counterpoints: Vec<String>,
    pub sources: Vec<String>,
}

/// The critic's verdict: one conflict plus one remediation question.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CritiqueReport {
    pub conflict: String,
    pub remediation_question: String,
    pub target_agent: Option<AgentKind>,
    pub sources: Vec<String>,
}

/// Result of one agent invocation, tagged by producing agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AgentResult {
    Quote(QuoteData),
    Financials(FinancialStatements),
    Esg(EsgProfile),
    Macro(MacroContext),
    Competitive(CompetitiveLandscape),
    Sentiment(SentimentReading),
    Quant(QuantSignals),
    Synthesis(SynthesisReport),
    Challenge(ChallengeReport),
    Critique(CritiqueReport),
}

impl AgentResult {
    /// The agent key this result belongs to.
    pub fn kind(&self) -> AgentKind {
        match self {
            AgentResult::Quote(_) => AgentKind::Quote,
            AgentResult::Financials(_) => AgentKind::Financials,
            AgentResult::Esg(_) => AgentKind::Esg,
            AgentResult::Macro(_) => AgentKind::Macro,
            AgentResult::Competitive(_) => AgentKind::Competitive,
            AgentResult::Sentiment(_) => AgentKind::Sentiment,
            AgentResult::Quant(_) => AgentKind::Quantitative,
            AgentResult::Synthesis(_) => AgentKind::Synthesizer,
            AgentResult::Challenge(_) => AgentKind::Challenger,
            AgentResult::Critique(_) => AgentKind::Critic,
        }
    }

    /// One-paragraph narrative form, regardless of variant.
    pub fn summary(&self) -> String {
        match self {
            AgentResult::Quote(q) => q.summary(),
            AgentResult::Financials(f) => f.summary(),
            AgentResult::Esg(e) => e.summary.clone(),
            AgentResult::Macro(m) => m.summary.clone(),
            AgentResult::Competitive(c) => c.summary(),
            AgentResult::Sentiment(s) => s.summary(),
            AgentResult::Quant(q) => q.summary(),
            AgentResult::Synthesis(s) => s.recommendation.clone(),
            AgentResult::Challenge(c) => c.bear_case.clone(),
            AgentResult::Critique(c) => c.conflict.clone(),
        }
    }

    pub fn sources(&self) -> &[String] {
        match self {
            AgentResult::Quote(q) => &q.sources,
            AgentResult::Financials(f) => &f.sources,
            AgentResult::Esg(e) => &e.sources,
            AgentResult::Macro(m) => &m.sources,
            AgentResult::Competitive(c) => &c.sources,
            AgentResult::Sentiment(s) => &s.sources,
            AgentResult::Quant(q) => &q.sources,
            AgentResult::Synthesis(s) => &s.sources,
            AgentResult::Challenge(c) => &c.sources,
            AgentResult::Critique(c) => &c.sources,
        }
    }

    pub fn confidence(&self) -> Option<f64> {
        match self {
            AgentResult::Sentiment(s) => s.confidence,
            AgentResult::Quant(q) => q.confidence,
            AgentResult::Synthesis(s) => s.confidence,
            _ => None,
        }
    }

    pub fn as_quote(&self) -> Option<&QuoteData> {
        match self {
            AgentResult::Quote(q) => Some(q),
            _ => None,
        }
    }

    pub fn as_financials(&self) -> Option<&FinancialStatements> {
        match self {
            AgentResult::Financials(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_synthesis(&self) -> Option<&SynthesisReport> {
        match self {
            AgentResult::Synthesis(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_challenge(&self) -> Option<&ChallengeReport> {
        match self {
            AgentResult::Challenge(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_critique(&self) -> Option<&CritiqueReport> {
        match self {
            AgentResult::Critique(c) => Some(c),
            _ => None,
        }
    }
}

/// Compact human form for large currency amounts.
fn fmt_amount(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1e12 {
        format!("{:.2}T", value / 1e12)
    } else if abs >= 1e9 {
        format!("{:.2}B", value / 1e9)
    } else if abs >= 1e6 {
        format!("{:.1}M", value / 1e6)
    } else {
        format!("{value:.0}")
    }
}
