//! Binance USDⓈ-M futures adapter implementing `ExchangePort`.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Method;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::application::ports::{
    AccountSnapshot, ExchangeError, ExchangePort, LivePosition, OrderAck,
};
use crate::domain::market::{Candle, CandleInterval};
use crate::domain::order_execution::{LotSizeRules, OrderRequest};
use crate::domain::risk_management::MarginMode;
use crate::domain::shared::Symbol;

use super::api_types::{
    AccountResponse, ExchangeInfoResponse, OrderResponse, PositionRiskResponse, Ticker24hResponse,
    TickerPriceResponse, change_pct, parse_klines,
};
use super::config::{BinanceConfig, BinanceEnvironment};
use super::error::{BinanceError, MARGIN_TYPE_UNCHANGED};
use super::http_client::BinanceHttpClient;

/// Futures exchange adapter.
///
/// Market data calls are public. Account, position and order calls are
/// signed and fail closed when no credentials are configured.
#[derive(Debug)]
pub struct BinanceExchangeAdapter {
    client: BinanceHttpClient,
    environment: BinanceEnvironment,
    rules: RwLock<HashMap<Symbol, LotSizeRules>>,
}

fn params<const N: usize>(pairs: [(&str, String); N]) -> BTreeMap<String, String> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

impl BinanceExchangeAdapter {
    /// Create a new adapter.
    pub fn new(config: &BinanceConfig) -> Result<Self, BinanceError> {
        let client = BinanceHttpClient::new(config)?;
        if !client.has_credentials() {
            tracing::warn!(
                environment = %config.environment,
                "No exchange credentials configured; signed calls will be refused"
            );
        }
        Ok(Self {
            client,
            environment: config.environment,
            rules: RwLock::new(HashMap::new()),
        })
    }

    /// Check if we're in live trading mode.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        self.environment.is_live()
    }

    async fn refresh_rules(&self) -> Result<(), BinanceError> {
        let info: ExchangeInfoResponse = self
            .client
            .public_get("/fapi/v1/exchangeInfo", BTreeMap::new())
            .await?;

        let mut parsed = HashMap::with_capacity(info.symbols.len());
        for symbol in &info.symbols {
            match symbol.lot_size_rules() {
                Ok(rules) => {
                    parsed.insert(Symbol::new(symbol.symbol.as_str()), rules);
                }
                Err(e) => tracing::debug!(symbol = %symbol.symbol, error = %e, "Skipping symbol rules"),
            }
        }

        tracing::debug!(symbols = parsed.len(), "Loaded exchange trading rules");
        *self.rules.write() = parsed;
        Ok(())
    }

    fn cached_rules(&self, symbol: &Symbol) -> Option<LotSizeRules> {
        self.rules.read().get(symbol).copied()
    }
}

#[async_trait]
impl ExchangePort for BinanceExchangeAdapter {
    async fn account_snapshot(&self) -> Result<AccountSnapshot, ExchangeError> {
        let account: AccountResponse = self
            .client
            .signed(Method::GET, "/fapi/v2/account", BTreeMap::new())
            .await?;
        Ok(account.into())
    }

    async fn live_positions(&self) -> Result<Vec<LivePosition>, ExchangeError> {
        let positions: Vec<PositionRiskResponse> = self
            .client
            .signed(Method::GET, "/fapi/v2/positionRisk", BTreeMap::new())
            .await?;
        Ok(positions
            .into_iter()
            .map(LivePosition::from)
            .filter(|p| !p.is_flat())
            .collect())
    }

    async fn live_position(&self, symbol: &Symbol) -> Result<Option<LivePosition>, ExchangeError> {
        let positions: Vec<PositionRiskResponse> = self
            .client
            .signed(
                Method::GET,
                "/fapi/v2/positionRisk",
                params([("symbol", symbol.as_str().to_string())]),
            )
            .await?;
        Ok(positions
            .into_iter()
            .map(LivePosition::from)
            .find(|p| &p.symbol == symbol && !p.is_flat()))
    }

    async fn last_price(&self, symbol: &Symbol) -> Result<Decimal, ExchangeError> {
        let ticker: TickerPriceResponse = self
            .client
            .public_get(
                "/fapi/v1/ticker/price",
                params([("symbol", symbol.as_str().to_string())]),
            )
            .await?;
        if ticker.price <= Decimal::ZERO {
            return Err(ExchangeError::InvalidResponse {
                message: format!("non-positive price for {}", ticker.symbol),
            });
        }
        Ok(ticker.price)
    }

    async fn change_24h_pct(&self, symbol: &Symbol) -> Result<f64, ExchangeError> {
        let ticker: Ticker24hResponse = self
            .client
            .public_get(
                "/fapi/v1/ticker/24hr",
                params([("symbol", symbol.as_str().to_string())]),
            )
            .await?;
        Ok(change_pct(&ticker))
    }

    async fn candles(
        &self,
        symbol: &Symbol,
        interval: CandleInterval,
        limit: usize,
    ) -> Result<Vec<Candle>, ExchangeError> {
        let rows: Vec<Vec<Value>> = self
            .client
            .public_get(
                "/fapi/v1/klines",
                params([
                    ("symbol", symbol.as_str().to_string()),
                    ("interval", interval.as_str().to_string()),
                    ("limit", limit.to_string()),
                ]),
            )
            .await?;
        Ok(parse_klines(&rows)?)
    }

    async fn trading_rules(&self, symbol: &Symbol) -> Result<LotSizeRules, ExchangeError> {
        if let Some(rules) = self.cached_rules(symbol) {
            return Ok(rules);
        }
        self.refresh_rules().await?;
        self.cached_rules(symbol)
            .ok_or_else(|| ExchangeError::UnknownSymbol {
                symbol: symbol.to_string(),
            })
    }

    async fn set_leverage(&self, symbol: &Symbol, leverage: u32) -> Result<(), ExchangeError> {
        let _: Value = self
            .client
            .signed(
                Method::POST,
                "/fapi/v1/leverage",
                params([
                    ("symbol", symbol.as_str().to_string()),
                    ("leverage", leverage.to_string()),
                ]),
            )
            .await?;
        tracing::debug!(symbol = %symbol, leverage, "Leverage set");
        Ok(())
    }

    async fn set_margin_mode(
        &self,
        symbol: &Symbol,
        mode: MarginMode,
    ) -> Result<(), ExchangeError> {
        let result: Result<Value, BinanceError> = self
            .client
            .signed(
                Method::POST,
                "/fapi/v1/marginType",
                params([
                    ("symbol", symbol.as_str().to_string()),
                    ("marginType", mode.as_str().to_string()),
                ]),
            )
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if e.code() == Some(MARGIN_TYPE_UNCHANGED) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn submit_market_order(&self, order: &OrderRequest) -> Result<OrderAck, ExchangeError> {
        if self.is_live() {
            tracing::warn!(
                client_order_id = %order.client_order_id,
                symbol = %order.symbol,
                "Submitting LIVE order - this will execute real trades"
            );
        }

        tracing::info!(
            client_order_id = %order.client_order_id,
            symbol = %order.symbol,
            side = order.side.as_str(),
            quantity = %order.quantity,
            reduce_only = order.reduce_only(),
            "Submitting market order"
        );

        let mut request = params([
            ("symbol", order.symbol.as_str().to_string()),
            ("side", order.side.as_str().to_string()),
            ("type", "MARKET".to_string()),
            ("quantity", order.quantity.normalize().to_string()),
            ("newClientOrderId", order.client_order_id.clone()),
            ("newOrderRespType", "RESULT".to_string()),
        ]);
        if order.reduce_only() {
            request.insert("reduceOnly".to_string(), "true".to_string());
        }

        let response: OrderResponse = self
            .client
            .signed_once(Method::POST, "/fapi/v1/order", request)
            .await
            .map_err(|e| match e {
                BinanceError::Api {
                    status: 400,
                    message,
                    ..
                } => ExchangeError::OrderRejected { reason: message },
                other => other.into(),
            })?;

        tracing::info!(
            client_order_id = %order.client_order_id,
            order_id = response.order_id,
            status = %response.status,
            executed_qty = %response.executed_qty,
            "Order submitted"
        );

        Ok(response.into())
    }
}
