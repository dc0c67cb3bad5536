//! Behavior-driven tests for insight generation
//!
//! These tests verify HOW computed index values turn into stored insights,
//! focusing on user-visible outcomes: fire-and-forget dispatch, tolerant
//! reply parsing, and the prompt contract sent to the model.

use std::sync::Arc;

use aurindex_ai::{
    build_prompt, parse_insight_response, InsightDispatcher, InsightError, MockInsightModel,
};
use aurindex_core::{
    IndexStore, InsightRecord, InsightRequest, InsightResponse, MemoryStore, PricePoint,
    Sentiment, Symbol, UtcDateTime, MAX_SUMMARY_LEN,
};
use indexmap::IndexMap;

fn symbol(name: &str) -> Symbol {
    Symbol::parse(name).expect("symbol")
}

/// A finished two-symbol computation, ready to hand to the dispatcher.
fn computed_request(delta_24h_pct: Option<f64>) -> InsightRequest {
    let observed_at = UtcDateTime::parse("2026-02-20T10:00:00Z").expect("timestamp");
    let prices = IndexMap::from([
        (
            symbol("GOLD"),
            PricePoint {
                price: 1900.12,
                source: "lbma".to_string(),
                observed_at,
            },
        ),
        (
            symbol("BTC"),
            PricePoint {
                price: 27450.0,
                source: "coinbase".to_string(),
                observed_at,
            },
        ),
    ]);
    let weights = IndexMap::from([(symbol("GOLD"), 0.6), (symbol("BTC"), 0.4)]);

    InsightRequest {
        index_name: "GSOC".to_string(),
        index_value: 1220.72,
        delta_24h_pct,
        timestamp: observed_at,
        prices,
        weights,
        base_level: 1000.0,
        base_date: "2024-01-01".to_string(),
    }
}

fn seeded_insight(summary: &str, generated_at: &str) -> InsightRecord {
    let response = InsightResponse::new(
        summary,
        Vec::new(),
        IndexMap::from([(symbol("GOLD"), Sentiment::Positive)]),
    )
    .expect("response");
    InsightRecord::new(
        "GSOC",
        UtcDateTime::parse(generated_at).expect("timestamp"),
        response,
    )
}

// =============================================================================
// Insights: Fire-and-Forget Dispatch
// =============================================================================

#[tokio::test]
async fn when_a_computed_value_is_submitted_an_insight_lands_in_the_store() {
    // Given: A dispatcher backed by the deterministic model
    let store = Arc::new(MemoryStore::new());
    let dispatcher = InsightDispatcher::new(
        Arc::new(MockInsightModel::new()),
        Arc::clone(&store) as Arc<dyn IndexStore>,
        2,
        8,
    );

    // When: One computed value is handed over and the dispatcher drains
    assert!(dispatcher.submit(computed_request(Some(22.07))));
    let stats = dispatcher.shutdown().await;

    // Then: Exactly one insight was generated and persisted
    assert_eq!(stats.generated, 1);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.dropped, 0);

    let record = store
        .get_latest_insights("GSOC")
        .await
        .expect("read")
        .expect("insight stored");
    assert_eq!(record.response.summary, "GSOC at 1220.72 (+22.07% over 24h).");
    assert_eq!(
        record.response.notable_events,
        vec!["GSOC moved 22.07% over 24h".to_string()]
    );

    // And: Every basket symbol carries a sentiment, stamped at computation time
    assert_eq!(
        record.response.sentiment.get(&symbol("GOLD")),
        Some(&Sentiment::Positive)
    );
    assert_eq!(
        record.response.sentiment.get(&symbol("BTC")),
        Some(&Sentiment::Positive)
    );
    assert_eq!(
        record.generated_at,
        UtcDateTime::parse("2026-02-20T10:00:00Z").expect("timestamp")
    );
}

#[tokio::test]
async fn when_the_queue_is_full_excess_values_are_dropped_on_the_spot() {
    // Given: A one-slot queue on the single-threaded test runtime, so the
    // worker cannot drain between submits
    let store = Arc::new(MemoryStore::new());
    let dispatcher = InsightDispatcher::new(
        Arc::new(MockInsightModel::new()),
        Arc::clone(&store) as Arc<dyn IndexStore>,
        1,
        1,
    );

    // When: Three values arrive back to back
    let outcomes = [
        dispatcher.submit(computed_request(Some(22.07))),
        dispatcher.submit(computed_request(Some(22.07))),
        dispatcher.submit(computed_request(Some(22.07))),
    ];
    let stats = dispatcher.shutdown().await;

    // Then: The first is accepted and the rest are refused without blocking
    assert_eq!(outcomes, [true, false, false]);
    assert_eq!(stats.generated, 1);
    assert_eq!(stats.dropped, 2);
}

#[tokio::test]
async fn when_the_model_fails_the_previous_insight_stays_current() {
    // Given: A store already holding this morning's insight
    let store = Arc::new(MemoryStore::new());
    store
        .store_insights(seeded_insight(
            "Metals did the morning work.",
            "2026-02-20T09:00:00Z",
        ))
        .await
        .expect("seed insight");

    // And: A model that is down
    let dispatcher = InsightDispatcher::new(
        Arc::new(MockInsightModel::new().failing_with(InsightError::upstream("model offline"))),
        Arc::clone(&store) as Arc<dyn IndexStore>,
        1,
        4,
    );

    // When: The next computed value is submitted
    assert!(dispatcher.submit(computed_request(Some(22.07))));
    let stats = dispatcher.shutdown().await;

    // Then: The failure is counted and readers still see the morning insight
    assert_eq!(stats.generated, 0);
    assert_eq!(stats.failed, 1);
    let record = store
        .get_latest_insights("GSOC")
        .await
        .expect("read")
        .expect("previous insight");
    assert_eq!(record.response.summary, "Metals did the morning work.");
}

#[tokio::test]
async fn when_the_store_rejects_the_write_the_previous_insight_stays_current() {
    // Given: A seeded insight, after which the store starts failing writes
    let store = Arc::new(MemoryStore::new());
    store
        .store_insights(seeded_insight(
            "Crypto drove the open.",
            "2026-02-20T09:00:00Z",
        ))
        .await
        .expect("seed insight");
    store.fail_writes_for("GSOC").await;

    let dispatcher = InsightDispatcher::new(
        Arc::new(MockInsightModel::new()),
        Arc::clone(&store) as Arc<dyn IndexStore>,
        1,
        4,
    );

    // When: A fresh value is submitted and generation succeeds
    assert!(dispatcher.submit(computed_request(Some(22.07))));
    let stats = dispatcher.shutdown().await;

    // Then: The persist failure is counted, not surfaced, and the old
    // insight remains readable
    assert_eq!(stats.generated, 0);
    assert_eq!(stats.failed, 1);
    let record = store
        .get_latest_insights("GSOC")
        .await
        .expect("read")
        .expect("previous insight");
    assert_eq!(record.response.summary, "Crypto drove the open.");
}

// =============================================================================
// Insights: Reply Parsing
// =============================================================================

#[test]
fn fenced_model_replies_still_parse() {
    // Given: A reply wrapped in a markdown fence
    let reply = "```json\n{\"summary\": \"Crypto legs lifted the basket.\", \
                 \"notable_events\": [\"ETH +6% on upgrade news\"], \
                 \"sentiment\": {\"ETH\": \"positive\", \"GOLD\": \"neutral\"}}\n```";

    // When: It is parsed
    let response = parse_insight_response(reply).expect("fenced reply parses");

    // Then: The fence is stripped and the content survives
    assert_eq!(response.summary, "Crypto legs lifted the basket.");
    assert_eq!(
        response.notable_events,
        vec!["ETH +6% on upgrade news".to_string()]
    );
    assert_eq!(
        response.sentiment.get(&symbol("GOLD")),
        Some(&Sentiment::Neutral)
    );
}

#[test]
fn prose_wrapped_replies_still_parse() {
    // Given: A chatty reply with the JSON buried mid-sentence
    let reply = "Sure! Here is the analysis: {\"summary\": \"Quiet session across the basket.\", \
                 \"notable_events\": [], \"sentiment\": {}} Let me know if you need more detail.";

    // When/Then: The brace window is extracted and parsed
    let response = parse_insight_response(reply).expect("embedded reply parses");
    assert_eq!(response.summary, "Quiet session across the basket.");
}

#[test]
fn when_a_reply_invents_a_sentiment_word_it_is_rejected_by_name() {
    // Given: A reply using a word outside the three-value scale
    let reply =
        r#"{"summary": "Strong day.", "notable_events": [], "sentiment": {"BTC": "bullish"}}"#;

    // When: It is parsed
    let error = parse_insight_response(reply).expect_err("must be rejected");

    // Then: The offending word is named in the error
    assert!(error.to_string().contains("bullish"));
}

#[test]
fn summary_length_is_enforced_at_the_reply_boundary() {
    // Given: Replies at and just past the summary length cap
    let at_limit = "g".repeat(MAX_SUMMARY_LEN);
    let over_limit = "g".repeat(MAX_SUMMARY_LEN + 1);

    // When/Then: The boundary length parses and one past it does not
    let accepted = parse_insight_response(&format!(
        r#"{{"summary": "{at_limit}", "notable_events": [], "sentiment": {{}}}}"#
    ))
    .expect("summary at the limit parses");
    assert_eq!(accepted.summary.chars().count(), MAX_SUMMARY_LEN);

    let error = parse_insight_response(&format!(
        r#"{{"summary": "{over_limit}", "notable_events": [], "sentiment": {{}}}}"#
    ))
    .expect_err("summary past the limit is rejected");
    assert!(matches!(error, InsightError::InvalidResponseSchema { .. }));
}

#[test]
fn when_a_reply_carries_no_json_the_error_says_so() {
    // Given: A refusal with no object anywhere
    let error = parse_insight_response("I cannot analyze this market right now.")
        .expect_err("must be rejected");

    // Then: The error states what was missing
    assert!(error.to_string().contains("no JSON object"));
}

// =============================================================================
// Insights: Prompt Contract
// =============================================================================

#[test]
fn prompt_pins_the_contract_before_the_data() {
    // Given/When: A prompt built from a finished computation
    let prompt = build_prompt(&computed_request(Some(22.07)));

    // Then: The output contract leads and closes the message
    assert!(prompt.contains("EXACTLY one JSON object"));
    assert!(prompt.contains("Do not add any text outside the JSON object."));
    assert!(prompt.ends_with("Return JSON only."));
}

#[test]
fn prompt_lists_the_inputs_behind_the_value() {
    // Given/When: A prompt built from a finished computation
    let prompt = build_prompt(&computed_request(Some(22.07)));

    // Then: Every price line names its source and observation time
    assert!(prompt.contains("- GOLD: 1900.12 (source lbma, 2026-02-20T10:00:00Z)"));
    assert!(prompt.contains("- BTC: 27450 (source coinbase, 2026-02-20T10:00:00Z)"));

    // And: Weights, base and the fresh value are all present
    assert!(prompt.contains("Index weights: GOLD 60%, BTC 40%"));
    assert!(prompt.contains("Base index level: 1000 (base date: 2024-01-01)"));
    assert!(prompt.contains("Current index value: 1220.72"));
    assert!(prompt.contains("24h change: 22.07%"));
}

#[test]
fn when_no_baseline_exists_the_prompt_says_na() {
    // Given/When: A computation with no day-old value behind it
    let prompt = build_prompt(&computed_request(None));

    // Then: The model is told the change is unavailable, not zero
    assert!(prompt.contains("24h change: n/a"));
}
