//! Prompt construction for chat-completions oracles.

use std::fmt::Write as _;

use crate::application::ports::OracleRequest;

const INDICATORS: &[(&str, &str)] = &[
    ("ema9", "exponential moving average of closes, period 9"),
    ("ema21", "exponential moving average of closes, period 21"),
    ("rsi14", "relative strength index, period 14, Wilder smoothing"),
    ("atr14", "average true range, period 14, Wilder smoothing"),
    ("vwap", "volume-weighted average price over the candle window"),
    ("rangeCompressionPct", "high-low range of the last 30 candles as % of last close"),
];

/// System message: role, indicator glossary, universe and risk caps.
#[must_use]
pub fn system_prompt(request: &OracleRequest) -> String {
    let constraints = &request.constraints;
    let universe = constraints
        .universe
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");

    let mut prompt = String::from(
        "You are a disciplined perpetual futures trader. Propose at most one position per reply.\n\n",
    );

    prompt.push_str("Indicators per symbol (null means not enough data):\n");
    for (name, meaning) in INDICATORS {
        let _ = writeln!(prompt, "- {name}: {meaning}");
    }

    let _ = write!(
        prompt,
        "\nTradeable symbols: {universe}\n\
         Risk caps (USD): maxRiskPerTrade={}, maxExposure={}, maxDailyLoss={}, maxLossPerTrade={}; leverageCap={}x\n\n",
        constraints.max_risk_per_trade_usd,
        constraints.max_exposure_usd,
        constraints.max_daily_loss_usd,
        constraints.max_loss_per_trade_usd,
        constraints.leverage_cap,
    );

    prompt.push_str(
        "Reply with a single JSON object and nothing else:\n\
         {\"action\": \"LONG\" | \"SHORT\" | \"FLAT\", \"symbol\": string, \"sizeUsd\": number, \
         \"thesis\": string, \"stopLossPrice\": number, \"takeProfitPrice\": number, \
         \"minHoldMinutes\": number}\n\
         For FLAT only \"action\" and \"thesis\" are required. \
         A LONG needs stopLossPrice < price < takeProfitPrice; a SHORT the reverse.",
    );

    prompt
}

/// User message: the snapshot as JSON.
pub fn user_prompt(request: &OracleRequest) -> Result<String, serde_json::Error> {
    let snapshot = serde_json::to_string(&request.snapshot)?;
    Ok(format!("Market snapshot:\n{snapshot}"))
}
