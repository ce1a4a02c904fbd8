//! Coin cost computation for generation requests.
//!
//! Costs come from a fixed per-provider base table plus a surcharge that
//! scales with prompt length. An unrecognized provider tag falls back to the
//! cheapest base — the dispatcher, not the cost table, is responsible for
//! rejecting unknown providers.

/// Base cost charged when the provider tag is not in the table.
pub const FALLBACK_BASE_COST: u64 = 15;

/// Flat cost of a code-optimization request, independent of input length.
pub const OPTIMIZE_COST: u64 = 25;

/// Per-provider base cost.
pub fn base_cost(provider: &str) -> u64 {
    match provider {
        "claude" => 20,
        "gemini" => 15,
        "gpt" => 18,
        _ => FALLBACK_BASE_COST,
    }
}

/// Total coin cost of a generation: base plus a length surcharge of
/// `5 * max(1, prompt_chars / 100)`.
///
/// The surcharge multiplier never drops below 1, so even an empty prompt
/// costs `base + 5`.
pub fn generation_cost(provider: &str, prompt_chars: usize) -> u64 {
    let length_multiplier = std::cmp::max(1, prompt_chars / 100) as u64;
    base_cost(provider) + 5 * length_multiplier
}
