//! Full analysis run against a scripted provider
//!
//! Drives every phase of the workflow end to end with canned agent results,
//! then prints the phase path, the execution log, the calculated metrics,
//! and the final recommendation.
//!
//! To run this example:
//! ```bash
//! cargo run --example full_run -p argus-engine
//! cargo run --example full_run -p argus-engine MSFT
//! ```

use argus_core::result::{
    ChallengeReport, CompetitiveLandscape, CritiqueReport, EsgProfile, FinancialStatements,
    MacroContext, QuantSignals, QuoteData, SentimentReading, SynthesisReport,
};
use argus_core::{AgentKind, AgentResult, AgentSelection, MarketContext, Subject};
use argus_engine::{AnalysisEngine, EngineConfig};
use argus_providers::ScriptedProvider;
use argus_utils::init_tracing;
use std::env;
use std::sync::Arc;

fn scripted_provider(symbol: &str) -> ScriptedProvider {
    let conflict = "Sentiment is strongly positive while momentum has rolled over";

    ScriptedProvider::new()
        .with_repeating(
            AgentKind::Quote,
            AgentResult::Quote(QuoteData {
                symbol: symbol.to_string(),
                price: 189.45,
                currency: Some("USD".to_string()),
                change_percent: Some(1.25),
                market_cap: Some(2.95e12),
                pe_ratio: Some(31.2),
                eps: Some(6.07),
                sources: vec!["https://finance.example.com/quote".to_string()],
                ..Default::default()
            }),
        )
        .with_repeating(
            AgentKind::Financials,
            AgentResult::Financials(FinancialStatements {
                symbol: symbol.to_string(),
                fiscal_year: Some(2025),
                revenue: Some(383.3e9),
                net_income: Some(97.0e9),
                total_debt: Some(111.0e9),
                total_equity: Some(62.1e9),
                book_value_per_share: Some(4.38),
                sources: vec!["https://filings.example.com/10-K".to_string()],
                ..Default::default()
            }),
        )
        .with_repeating(
            AgentKind::Esg,
            AgentResult::Esg(EsgProfile {
                environmental: Some(72.0),
                social: Some(68.0),
                governance: Some(81.0),
                overall: Some(74.0),
                summary: "Strong governance, supply-chain exposure remains the open issue"
                    .to_string(),
                ..Default::default()
            }),
        )
        .with_repeating(
            AgentKind::Macro,
            AgentResult::Macro(MacroContext {
                rates_outlook: Some("Two cuts priced in over the next year".to_string()),
                inflation_outlook: Some("Cooling toward target".to_string()),
                key_risks: vec!["Consumer spending slowdown".to_string()],
                summary: "Supportive backdrop with a soft-landing consensus".to_string(),
                ..Default::default()
            }),
        )
        .with_repeating(
            AgentKind::Competitive,
            AgentResult::Competitive(CompetitiveLandscape {
                peers: vec!["MSFT".to_string(), "GOOGL".to_string()],
                market_position: "Category leader in premium devices".to_string(),
                moat: Some("Ecosystem lock-in".to_string()),
                ..Default::default()
            }),
        )
        .with_repeating(
            AgentKind::Sentiment,
            AgentResult::Sentiment(SentimentReading {
                score: 0.55,
                drivers: vec!["Upgrade cycle chatter".to_string()],
                confidence: Some(0.7),
                ..Default::default()
            }),
        )
        .with_repeating(
            AgentKind::Quantitative,
            AgentResult::Quant(QuantSignals {
                momentum_1m: Some(-2.1),
                momentum_3m: Some(4.8),
                volatility_30d: Some(18.5),
                signal: "neutral".to_string(),
                ..Default::default()
            }),
        )
        .with_repeating(
            AgentKind::Challenger,
            AgentResult::Challenge(ChallengeReport {
                bear_case: "Valuation leaves no room for a slower upgrade cycle".to_string(),
                counterpoints: vec!["Services growth offsets hardware softness".to_string()],
                ..Default::default()
            }),
        )
        .with_repeating(
            AgentKind::Critic,
            AgentResult::Critique(CritiqueReport {
                conflict: conflict.to_string(),
                remediation_question: "Which signal should set the position size?".to_string(),
                target_agent: Some(AgentKind::Sentiment),
                ..Default::default()
            }),
        )
        .with_result(
            AgentKind::Synthesizer,
            AgentResult::Synthesis(SynthesisReport {
                recommendation: "Hold".to_string(),
                rationale: "Quality franchise at a full valuation".to_string(),
                key_risks: vec!["Multiple compression".to_string()],
                confidence: Some(0.66),
                ..Default::default()
            }),
        )
        .with_result(
            AgentKind::Synthesizer,
            AgentResult::Synthesis(SynthesisReport {
                recommendation: format!(
                    "Hold. The flagged conflict ({conflict}) resolves toward sentiment on a \
                     six-month horizon"
                ),
                rationale: "Momentum weakness is short-dated against the upgrade cycle"
                    .to_string(),
                key_risks: vec!["Multiple compression".to_string()],
                confidence: Some(0.71),
                ..Default::default()
            }),
        )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let ticker = if args.len() > 1 { &args[1] } else { "AAPL" };
    let subject = Subject::new(ticker)?;

    println!("=== Argus Analysis ===\n");
    println!("Analyzing: {subject}\n");

    let engine = AnalysisEngine::builder()
        .provider(Arc::new(scripted_provider(subject.as_str())))
        .config(EngineConfig::default())
        .subject_context(
            subject.clone(),
            MarketContext::default()
                .with_exchange("NASDAQ")
                .with_currency("USD"),
        )
        .build()
        .await?;

    engine.start(subject, AgentSelection::all()).await;
    let snapshot = engine.snapshot().await;

    let path: Vec<String> = snapshot.phases.iter().map(ToString::to_string).collect();
    println!("=== Phase Path ===");
    println!("{}\n", path.join(" -> "));

    println!("=== Execution Log ===");
    for step in &snapshot.log {
        let confidence = step
            .confidence
            .map_or_else(String::new, |c| format!(" (confidence {c:.2})"));
        println!(
            "{:>3}  {:<12} {:<28} {}{}",
            step.id, step.agent, step.step_name, step.status, confidence
        );
    }
    println!();

    if let Some(metrics) = &snapshot.metrics {
        println!("=== Calculated Metrics ===");
        for (key, metric) in metrics {
            match metric.value {
                Some(value) => {
                    let proof = metric.proof.as_deref().unwrap_or(&metric.formula);
                    println!("{key:<18} {value:>10.4}  [{proof}]");
                }
                None => println!("{key:<18} {:>10}  [{}]", "n/a", metric.formula),
            }
        }
        println!();
    }

    if let Some(report) = &snapshot.report {
        println!("=== Recommendation ===");
        println!("{}", report.recommendation);
        println!("\nRationale: {}", report.rationale);
        if !report.key_risks.is_empty() {
            println!("Key risks: {}", report.key_risks.join(", "));
        }
        if let Some(confidence) = report.confidence {
            println!("Confidence: {confidence:.2}");
        }
    }

    println!("\n=== Analysis Complete ===");

    Ok(())
}
