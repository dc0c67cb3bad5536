//! Prompt construction for insight generation.
//!
//! The prompt pins the output contract in the first lines (one JSON object,
//! fixed keys, bounded summary) and then lists the inputs: per-symbol prices
//! with their sources, the basket weights, the base level and the freshly
//! computed value. Models drift less when the contract precedes the data.

use std::fmt::Write;

use aurindex_core::domain::InsightRequest;

/// Render the user message sent to the insight model.
pub fn build_prompt(request: &InsightRequest) -> String {
    let symbols = request
        .weights
        .keys()
        .map(|symbol| symbol.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let mut prompt = String::new();
    writeln!(
        prompt,
        "You are a financial analyst. The input contains the latest prices and sources for a composite index."
    )
    .ok();
    writeln!(
        prompt,
        "Return EXACTLY one JSON object with keys: index, index_delta_24h_pct, summary (max 2 sentences, at most 200 characters), notable_events (list of strings), sentiment (object mapping each of {symbols} to \"positive\", \"negative\" or \"neutral\")."
    )
    .ok();
    writeln!(prompt, "Do not add any text outside the JSON object.").ok();
    writeln!(prompt).ok();

    writeln!(prompt, "Index: {}", request.index_name).ok();
    writeln!(prompt, "Latest prices:").ok();
    for (symbol, point) in &request.prices {
        writeln!(
            prompt,
            "- {symbol}: {} (source {}, {})",
            point.price,
            point.source,
            point.observed_at.format_rfc3339()
        )
        .ok();
    }

    let weights = request
        .weights
        .iter()
        .map(|(symbol, weight)| format!("{symbol} {}%", (weight * 100.0).round() as i64))
        .collect::<Vec<_>>()
        .join(", ");
    writeln!(prompt, "Index weights: {weights}").ok();
    writeln!(
        prompt,
        "Base index level: {} (base date: {})",
        request.base_level, request.base_date
    )
    .ok();
    writeln!(prompt, "Current index value: {}", request.index_value).ok();
    match request.delta_24h_pct {
        Some(delta) => writeln!(prompt, "24h change: {delta}%").ok(),
        None => writeln!(prompt, "24h change: n/a").ok(),
    };
    writeln!(prompt).ok();
    write!(prompt, "Return JSON only.").ok();

    prompt
}
