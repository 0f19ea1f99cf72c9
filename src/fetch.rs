//! Trade fetching: parameterizes the trades query for an accounting period
//! and maps every raw result record into a `Trade`.

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::api::{DuneRecord, QueryEngine};
use crate::models::{AccountingPeriod, Token, TokenTradeInfo, Trade, TradeRequest, VolumeInfo};
use crate::queries::{Query, QueryCatalog, QueryData, QueryParameter};

const PING_FREQUENCY_SECS: u64 = 15;
const TRADES_QUERY: &str = "TRADES";

/// Fetches trades for a token pair over one accounting period.
///
/// Holds the execution backend handle, the period, and the query catalog.
/// Each fetch is an independent blocking round-trip; nothing is cached.
pub struct TradesFetcher {
    engine: Box<dyn QueryEngine>,
    period: AccountingPeriod,
    catalog: QueryCatalog,
}

impl TradesFetcher {
    pub fn new(
        engine: Box<dyn QueryEngine>,
        period: AccountingPeriod,
        catalog: QueryCatalog,
    ) -> Self {
        Self {
            engine,
            period,
            catalog,
        }
    }

    fn period_params(&self) -> Vec<QueryParameter> {
        vec![
            QueryParameter::date("StartDate", self.period.start),
            QueryParameter::date("EndDate", self.period.end),
        ]
    }

    fn parameterized_query(query_data: &QueryData, params: Vec<QueryParameter>) -> Query {
        query_data.with_params(params)
    }

    /// Execute `query` (or, given a job id, fetch that job's result without
    /// resubmitting) and return the raw rows in backend order. An execution
    /// without a result payload yields zero rows, not an error.
    async fn get_query_results(
        &self,
        query: Query,
        job_id: Option<&str>,
    ) -> Result<Vec<DuneRecord>> {
        info!(query = %query.name, query_id = query.query_id, "Fetching query results");

        let exec_result = match job_id {
            None => self.engine.refresh(&query, PING_FREQUENCY_SECS).await?,
            Some(job_id) => self.engine.get_result(job_id).await?,
        };

        info!(execution_id = %exec_result.execution_id, "Fetch completed");

        match &exec_result.result {
            Some(payload) => debug!(metadata = %payload.metadata, "Execution result metadata"),
            None => warn!(
                execution_id = %exec_result.execution_id,
                "No execution results found"
            ),
        }

        Ok(exec_result.into_rows())
    }

    /// Fetch trades for the given token pair over the bound period.
    ///
    /// Row order is the backend's; duplicate `tx_hash` rows come back as
    /// duplicate (equal) trades. Any missing or malformed column fails the
    /// whole call.
    pub async fn get_trades(
        &self,
        buy_token_address: &str,
        sell_token_address: &str,
    ) -> Result<Vec<Trade>> {
        self.fetch_trades(buy_token_address, sell_token_address, None)
            .await
    }

    /// Resume path: map the rows of an already-submitted execution without
    /// triggering a new billable submission.
    pub async fn get_trades_for_job(
        &self,
        job_id: &str,
        buy_token_address: &str,
        sell_token_address: &str,
    ) -> Result<Vec<Trade>> {
        self.fetch_trades(buy_token_address, sell_token_address, Some(job_id))
            .await
    }

    async fn fetch_trades(
        &self,
        buy_token_address: &str,
        sell_token_address: &str,
        job_id: Option<&str>,
    ) -> Result<Vec<Trade>> {
        let mut params = self.period_params();
        params.push(QueryParameter::text("BuyTokenAddress", buy_token_address));
        params.push(QueryParameter::text("SellTokenAddress", sell_token_address));

        let query = Self::parameterized_query(self.catalog.get(TRADES_QUERY)?, params);
        let results = self.get_query_results(query, job_id).await?;

        results.iter().map(create_trade).collect()
    }
}

/// Build a `Trade` from one raw result record.
fn create_trade(record: &DuneRecord) -> Result<Trade> {
    let request = TradeRequest {
        block_time: timestamp_field(record, "block_time")?,
        tx_hash: string_field(record, "tx_hash")?,
        sell_info: TokenTradeInfo {
            token: token_field(record, "sell_token_address")?,
            price: float_field(record, "sell_price")?,
            value_usd: float_field(record, "sell_value_usd")?,
        },
        buy_info: TokenTradeInfo {
            token: token_field(record, "buy_token_address")?,
            price: float_field(record, "buy_price")?,
            value_usd: float_field(record, "buy_value_usd")?,
        },
        volume: VolumeInfo {
            units_sold: float_field(record, "units_sold")?,
            atoms_sold: atoms_field(record, "atoms_sold")?,
        },
        usd_value: float_field(record, "usd_value")?,
        token_pair: string_field(record, "token_pair")?,
    };
    Ok(Trade::from_request(request))
}

fn field<'a>(record: &'a DuneRecord, column: &str) -> Result<&'a Value> {
    record
        .get(column)
        .ok_or_else(|| anyhow!("record is missing column {column}"))
}

fn string_field(record: &DuneRecord, column: &str) -> Result<String> {
    match field(record, column)? {
        Value::String(s) => Ok(s.clone()),
        other => bail!("column {column} is not a string: {other}"),
    }
}

fn token_field(record: &DuneRecord, column: &str) -> Result<Token> {
    Token::parse(&string_field(record, column)?)
        .with_context(|| format!("column {column} does not hold a token address"))
}

// Numeric columns come back as native numbers or as decimal strings,
// depending on the column type upstream.
fn float_field(record: &DuneRecord, column: &str) -> Result<f64> {
    match field(record, column)? {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| anyhow!("column {column} is out of f64 range: {n}")),
        Value::String(s) => s
            .parse()
            .with_context(|| format!("column {column} is not a float: {s}")),
        other => bail!("column {column} is not a float: {other}"),
    }
}

fn atoms_field(record: &DuneRecord, column: &str) -> Result<u128> {
    match field(record, column)? {
        Value::Number(n) => n
            .as_u64()
            .map(u128::from)
            .ok_or_else(|| anyhow!("column {column} is not a non-negative integer: {n}")),
        Value::String(s) => s
            .parse()
            .with_context(|| format!("column {column} is not an integer: {s}")),
        other => bail!("column {column} is not an integer: {other}"),
    }
}

fn timestamp_field(record: &DuneRecord, column: &str) -> Result<DateTime<Utc>> {
    let raw = string_field(record, column)?;
    parse_block_time(&raw).with_context(|| format!("column {column} is not a timestamp: {raw}"))
}

// The backend emits RFC 3339 or `YYYY-MM-DD HH:MM:SS[.fff] UTC`.
fn parse_block_time(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    let trimmed = raw.trim_end_matches(" UTC");
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    bail!("unrecognized timestamp {raw}")
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::NaiveDate;
    use serde_json::json;

    use crate::api::ExecutionResult;

    use super::*;

    const WETH: &str = "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2";
    const USDC: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";

    /// Canned backend that counts which path was taken.
    struct StubEngine {
        result: ExecutionResult,
        refresh_calls: Arc<AtomicUsize>,
        get_result_calls: Arc<AtomicUsize>,
    }

    impl StubEngine {
        fn returning(result: ExecutionResult) -> Self {
            Self {
                result,
                refresh_calls: Arc::new(AtomicUsize::new(0)),
                get_result_calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn counters(&self) -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
            (self.refresh_calls.clone(), self.get_result_calls.clone())
        }
    }

    #[async_trait]
    impl QueryEngine for StubEngine {
        async fn refresh(&self, _query: &Query, _ping_secs: u64) -> Result<ExecutionResult> {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.result.clone())
        }

        async fn get_result(&self, _job_id: &str) -> Result<ExecutionResult> {
            self.get_result_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.result.clone())
        }
    }

    fn january_2023() -> AccountingPeriod {
        AccountingPeriod::new(
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2023, 1, 31).unwrap(),
        )
        .unwrap()
    }

    fn sample_row() -> Value {
        json!({
            "block_time": "2023-01-15 12:00:00.000 UTC",
            "tx_hash": "0xabc",
            "sell_token_address": WETH,
            "sell_price": "1600.0",
            "sell_value_usd": "2500.0",
            "buy_token_address": USDC,
            "buy_price": 1.0,
            "buy_value_usd": 2500.0,
            "units_sold": "1.5",
            "atoms_sold": "1500000000000000000",
            "usd_value": "2500.0",
            "token_pair": "WETH-USDC"
        })
    }

    fn realized_result(rows: Vec<Value>) -> ExecutionResult {
        serde_json::from_value(json!({
            "execution_id": "01GXEXEC",
            "state": "QUERY_STATE_COMPLETED",
            "result": { "rows": rows, "metadata": { "row_count": 1 } }
        }))
        .unwrap()
    }

    fn fetcher_over(engine: StubEngine) -> TradesFetcher {
        TradesFetcher::new(Box::new(engine), january_2023(), QueryCatalog::default())
    }

    #[tokio::test]
    async fn test_get_trades_maps_row_fields() {
        let fetcher = fetcher_over(StubEngine::returning(realized_result(vec![sample_row()])));

        let trades = fetcher.get_trades(USDC, WETH).await.unwrap();

        assert_eq!(trades.len(), 1);
        let trade = &trades[0];
        assert_eq!(trade.tx_hash, "0xabc");
        assert_eq!(trade.block_time, "2023-01-15T12:00:00Z".parse::<DateTime<Utc>>().unwrap());
        assert_eq!(trade.sell_info.token, Token::parse(WETH).unwrap());
        assert_eq!(trade.sell_info.price, 1600.0);
        assert_eq!(trade.sell_info.value_usd, 2500.0);
        assert_eq!(trade.buy_info.token, Token::parse(USDC).unwrap());
        assert_eq!(trade.trade_info.volume.units_sold, 1.5);
        assert_eq!(trade.trade_info.volume.atoms_sold, 1_500_000_000_000_000_000);
        assert_eq!(trade.trade_info.usd_value, 2500.0);
        assert_eq!(trade.trade_info.token_pair, "WETH-USDC");

        // Tokens built from records carry no decimals yet.
        assert_eq!(trade.sell_info.token.decimals, None);
        assert_eq!(trade.buy_info.token.decimals, None);
    }

    #[tokio::test]
    async fn test_fresh_fetch_submits_exactly_once() {
        let engine = StubEngine::returning(realized_result(vec![sample_row()]));
        let (refresh_calls, get_result_calls) = engine.counters();
        let fetcher = TradesFetcher::new(Box::new(engine), january_2023(), QueryCatalog::default());

        let trades = fetcher.get_trades(USDC, WETH).await.unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(refresh_calls.load(Ordering::SeqCst), 1);
        assert_eq!(get_result_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_job_id_path_never_submits() {
        let engine = StubEngine::returning(realized_result(vec![sample_row()]));
        let (refresh_calls, get_result_calls) = engine.counters();
        let fetcher = TradesFetcher::new(Box::new(engine), january_2023(), QueryCatalog::default());

        let trades = fetcher.get_trades_for_job("01GXJOB", USDC, WETH).await.unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(refresh_calls.load(Ordering::SeqCst), 0);
        assert_eq!(get_result_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_result_payload_yields_no_trades() {
        let no_payload: ExecutionResult =
            serde_json::from_value(json!({ "execution_id": "01GXEMPTY" })).unwrap();
        let fetcher = fetcher_over(StubEngine::returning(no_payload));

        let trades = fetcher.get_trades(USDC, WETH).await.unwrap();
        assert!(trades.is_empty());
    }

    #[tokio::test]
    async fn test_row_order_and_duplicates_preserved() {
        let mut duplicate = sample_row();
        duplicate["usd_value"] = json!("9999.0");
        let fetcher = fetcher_over(StubEngine::returning(realized_result(vec![
            sample_row(),
            duplicate,
        ])));

        let trades = fetcher.get_trades(USDC, WETH).await.unwrap();
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0], trades[1]);
        assert_ne!(trades[0].trade_info.usd_value, trades[1].trade_info.usd_value);
    }

    #[tokio::test]
    async fn test_malformed_column_fails_whole_fetch() {
        let mut bad = sample_row();
        bad["sell_price"] = json!("not-a-number");
        let fetcher = fetcher_over(StubEngine::returning(realized_result(vec![
            sample_row(),
            bad,
        ])));

        let err = fetcher.get_trades(USDC, WETH).await.unwrap_err();
        assert!(err.to_string().contains("sell_price"));
    }

    #[tokio::test]
    async fn test_missing_column_fails_whole_fetch() {
        let mut bad = sample_row();
        bad.as_object_mut().unwrap().remove("tx_hash");
        let fetcher = fetcher_over(StubEngine::returning(realized_result(vec![bad])));

        let err = fetcher.get_trades(USDC, WETH).await.unwrap_err();
        assert!(err.to_string().contains("tx_hash"));
    }

    #[test]
    fn test_period_params_bound_to_period() {
        let fetcher = fetcher_over(StubEngine::returning(realized_result(vec![])));
        let params = fetcher.period_params();

        assert_eq!(params.len(), 2);
        assert_eq!(params[0].name(), "StartDate");
        assert_eq!(params[0].to_value(), "2023-01-01 00:00:00");
        assert_eq!(params[1].name(), "EndDate");
        assert_eq!(params[1].to_value(), "2023-01-31 00:00:00");
    }

    #[test]
    fn test_block_time_formats() {
        let expected = "2023-01-15T12:00:00Z".parse::<DateTime<Utc>>().unwrap();
        assert_eq!(parse_block_time("2023-01-15T12:00:00Z").unwrap(), expected);
        assert_eq!(parse_block_time("2023-01-15 12:00:00").unwrap(), expected);
        assert_eq!(parse_block_time("2023-01-15 12:00:00.000 UTC").unwrap(), expected);
        assert!(parse_block_time("January 15th").is_err());
    }
}
