//! Futures REST API response types.
//!
//! Numeric fields arrive as JSON strings; `Decimal` accepts both forms.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;
use serde_json::Value;

use crate::application::ports::{AccountSnapshot, LivePosition, OrderAck};
use crate::domain::market::Candle;
use crate::domain::order_execution::LotSizeRules;
use crate::domain::shared::{Symbol, Timestamp};

use super::error::BinanceError;

/// Error body: `{"code": -2019, "msg": "..."}`.
#[derive(Debug, Clone, Deserialize)]
pub struct BinanceErrorResponse {
    /// Exchange error code.
    pub code: i64,
    /// Human-readable message.
    pub msg: String,
}

/// `GET /fapi/v2/account`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    /// Wallet balance without unrealized P&L.
    pub total_wallet_balance: Decimal,
    /// Unrealized P&L across positions.
    pub total_unrealized_profit: Decimal,
    /// Wallet balance plus unrealized P&L.
    pub total_margin_balance: Decimal,
    /// Balance free for new margin.
    pub available_balance: Decimal,
}

impl From<AccountResponse> for AccountSnapshot {
    fn from(account: AccountResponse) -> Self {
        Self {
            equity: account.total_margin_balance,
            available_balance: account.available_balance,
            unrealized_pnl: account.total_unrealized_profit,
        }
    }
}

/// One entry of `GET /fapi/v2/positionRisk`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionRiskResponse {
    /// Contract symbol.
    pub symbol: String,
    /// Signed position amount.
    pub position_amt: Decimal,
    /// Average entry price.
    pub entry_price: Decimal,
    /// Mark price.
    #[serde(default)]
    pub mark_price: Option<Decimal>,
}

impl From<PositionRiskResponse> for LivePosition {
    fn from(position: PositionRiskResponse) -> Self {
        Self {
            symbol: Symbol::new(position.symbol),
            position_amt: position.position_amt,
            entry_price: position.entry_price,
            mark_price: position.mark_price,
        }
    }
}

/// `GET /fapi/v1/ticker/price`.
#[derive(Debug, Clone, Deserialize)]
pub struct TickerPriceResponse {
    /// Contract symbol.
    pub symbol: String,
    /// Last price.
    pub price: Decimal,
}

/// `GET /fapi/v1/ticker/24hr`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker24hResponse {
    /// Contract symbol.
    pub symbol: String,
    /// Percent change over 24h.
    pub price_change_percent: Decimal,
}

/// Parse `GET /fapi/v1/klines` rows into candles.
///
/// Each row is `[openTime, open, high, low, close, volume, ...]`.
pub fn parse_klines(rows: &[Vec<Value>]) -> Result<Vec<Candle>, BinanceError> {
    rows.iter().map(|row| parse_kline(row)).collect()
}

fn parse_kline(row: &[Value]) -> Result<Candle, BinanceError> {
    if row.len() < 6 {
        return Err(BinanceError::JsonParse(format!(
            "kline row has {} fields, expected at least 6",
            row.len()
        )));
    }
    let open_time = row[0]
        .as_i64()
        .and_then(Timestamp::from_unix_millis)
        .ok_or_else(|| BinanceError::JsonParse("kline open time is not a timestamp".to_string()))?;

    Ok(Candle {
        open_time,
        open: kline_number(&row[1], "open")?,
        high: kline_number(&row[2], "high")?,
        low: kline_number(&row[3], "low")?,
        close: kline_number(&row[4], "close")?,
        volume: kline_number(&row[5], "volume")?,
    })
}

fn kline_number(value: &Value, field: &str) -> Result<f64, BinanceError> {
    let parsed = match value {
        Value::String(s) => s.parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| BinanceError::JsonParse(format!("kline {field} is not a number")))
}

/// `GET /fapi/v1/exchangeInfo`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeInfoResponse {
    /// Listed contracts.
    pub symbols: Vec<SymbolInfo>,
}

/// One contract from exchange info.
#[derive(Debug, Clone, Deserialize)]
pub struct SymbolInfo {
    /// Contract symbol.
    pub symbol: String,
    /// Trading filters.
    #[serde(default)]
    pub filters: Vec<SymbolFilter>,
}

/// Trading filter, tagged by `filterType`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "filterType")]
pub enum SymbolFilter {
    /// Limit order lot size.
    #[serde(rename = "LOT_SIZE", rename_all = "camelCase")]
    LotSize {
        /// Quantity increment.
        step_size: Decimal,
        /// Minimum quantity.
        min_qty: Decimal,
    },
    /// Market order lot size.
    #[serde(rename = "MARKET_LOT_SIZE", rename_all = "camelCase")]
    MarketLotSize {
        /// Quantity increment.
        step_size: Decimal,
        /// Minimum quantity.
        min_qty: Decimal,
    },
    /// Minimum order notional.
    #[serde(rename = "MIN_NOTIONAL")]
    MinNotional {
        /// Minimum notional in quote currency.
        notional: Decimal,
    },
    /// Filters the engine does not use.
    #[serde(other)]
    Other,
}

impl SymbolInfo {
    /// Lot-size rules for market orders.
    ///
    /// `MARKET_LOT_SIZE` wins over `LOT_SIZE` when both carry a positive step.
    pub fn lot_size_rules(&self) -> Result<LotSizeRules, BinanceError> {
        let mut lot = None;
        let mut market_lot = None;
        let mut min_notional = Decimal::ZERO;

        for filter in &self.filters {
            match filter {
                SymbolFilter::LotSize { step_size, min_qty } => lot = Some((*step_size, *min_qty)),
                SymbolFilter::MarketLotSize { step_size, min_qty } if *step_size > Decimal::ZERO => {
                    market_lot = Some((*step_size, *min_qty));
                }
                SymbolFilter::MinNotional { notional } => min_notional = *notional,
                SymbolFilter::MarketLotSize { .. } | SymbolFilter::Other => {}
            }
        }

        let (step_size, min_qty) = market_lot.or(lot).ok_or_else(|| {
            BinanceError::JsonParse(format!("{} has no lot size filter", self.symbol))
        })?;

        LotSizeRules::new(step_size, min_qty, min_notional)
            .map_err(|e| BinanceError::JsonParse(format!("{}: {e}", self.symbol)))
    }
}

/// `POST /fapi/v1/order` with `newOrderRespType=RESULT`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    /// Exchange order ID.
    pub order_id: i64,
    /// Client order ID.
    pub client_order_id: String,
    /// Order status.
    pub status: String,
    /// Executed base quantity.
    #[serde(default)]
    pub executed_qty: Decimal,
    /// Average fill price; zero when nothing filled.
    #[serde(default)]
    pub avg_price: Decimal,
}

impl From<OrderResponse> for OrderAck {
    fn from(order: OrderResponse) -> Self {
        Self {
            order_id: order.order_id.to_string(),
            client_order_id: order.client_order_id,
            status: order.status,
            executed_qty: order.executed_qty,
            avg_price: (order.avg_price > Decimal::ZERO).then_some(order.avg_price),
        }
    }
}

/// Percent change as the float the indicator pipeline consumes.
#[must_use]
pub fn change_pct(ticker: &Ticker24hResponse) -> f64 {
    ticker.price_change_percent.to_f64().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn account_maps_margin_balance_to_equity() {
        let account: AccountResponse = serde_json::from_value(json!({
            "totalWalletBalance": "1000.00",
            "totalUnrealizedProfit": "-12.5",
            "totalMarginBalance": "987.50",
            "availableBalance": "900.00",
            "assets": []
        }))
        .unwrap();

        let snapshot = AccountSnapshot::from(account);

        assert_eq!(snapshot.equity, dec!(987.50));
        assert_eq!(snapshot.unrealized_pnl, dec!(-12.5));
        assert_eq!(snapshot.available_balance, dec!(900));
    }

    #[test]
    fn klines_parse_string_prices() {
        let rows: Vec<Vec<Value>> = serde_json::from_value(json!([
            [1_700_000_000_000_i64, "100.0", "101.5", "99.0", "100.5", "12.3", 1_700_000_299_999_i64, "0", 10, "0", "0", "0"]
        ]))
        .unwrap();

        let candles = parse_klines(&rows).unwrap();

        assert_eq!(candles.len(), 1);
        assert!((candles[0].high - 101.5).abs() < f64::EPSILON);
        assert!((candles[0].volume - 12.3).abs() < 1e-9);
    }

    #[test]
    fn short_kline_row_is_rejected() {
        let rows = vec![vec![json!(1_700_000_000_000_i64), json!("1")]];
        assert!(parse_klines(&rows).is_err());
    }

    #[test]
    fn lot_size_prefers_market_filter() {
        let info: SymbolInfo = serde_json::from_value(json!({
            "symbol": "BTCUSDT",
            "filters": [
                {"filterType": "PRICE_FILTER", "tickSize": "0.10"},
                {"filterType": "LOT_SIZE", "stepSize": "0.001", "minQty": "0.001", "maxQty": "1000"},
                {"filterType": "MARKET_LOT_SIZE", "stepSize": "0.01", "minQty": "0.01", "maxQty": "120"},
                {"filterType": "MIN_NOTIONAL", "notional": "100"}
            ]
        }))
        .unwrap();

        let rules = info.lot_size_rules().unwrap();

        assert_eq!(rules.step_size, dec!(0.01));
        assert_eq!(rules.min_qty, dec!(0.01));
        assert_eq!(rules.min_notional, dec!(100));
    }

    #[test]
    fn missing_lot_filter_is_an_error() {
        let info: SymbolInfo = serde_json::from_value(json!({
            "symbol": "BTCUSDT",
            "filters": [{"filterType": "MIN_NOTIONAL", "notional": "5"}]
        }))
        .unwrap();
        assert!(info.lot_size_rules().is_err());
    }

    #[test]
    fn order_response_without_fill_has_no_price() {
        let order: OrderResponse = serde_json::from_value(json!({
            "orderId": 42,
            "clientOrderId": "abc",
            "status": "NEW",
            "executedQty": "0",
            "avgPrice": "0.00000"
        }))
        .unwrap();

        let ack = OrderAck::from(order);

        assert_eq!(ack.order_id, "42");
        assert!(ack.avg_price.is_none());
    }
}
