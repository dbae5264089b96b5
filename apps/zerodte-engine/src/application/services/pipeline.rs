//! Signal -> strike search -> trade construction, shared by backtest and live.
//!
//! The only suspension points are bar and quote fetches. Quotes for every
//! contract the search can touch are fetched in one bounded batch into a
//! [`QuoteBoard`], so signal evaluation and the strike search run
//! synchronously.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::application::ports::{MarketDataError, MarketDataPort};
use crate::config::{StrategyConfig, UnderlyingConfig};
use crate::domain::market_data::{Bar, Quote, atm_strike};
use crate::domain::signal::SignalFrame;
use crate::domain::strike_selection::{QuoteBoard, find_strikes, narrow_wings, search_distances};
use crate::domain::trade::{TradeBuilder, TradeDescriptor, validate_liquidity};

/// One day of underlying bars with the aligned proxy volume.
#[derive(Debug, Clone)]
pub struct SessionData {
    /// Trading date, also the expiry of traded contracts.
    pub date: NaiveDate,
    /// Underlying bars, oldest first.
    pub bars: Vec<Bar>,
    /// Proxy volume per bar.
    pub proxy_volume: Vec<f64>,
    frame: SignalFrame,
}

impl SessionData {
    /// Build from underlying bars and proxy bars for the same day.
    #[must_use]
    pub fn new(date: NaiveDate, bars: Vec<Bar>, proxy_bars: &[Bar]) -> Self {
        let proxy_volume: Vec<f64> = proxy_bars.iter().map(|b| b.volume as f64).collect();
        let frame = SignalFrame::new(&bars, &proxy_volume);
        Self {
            date,
            bars,
            proxy_volume,
            frame,
        }
    }

    /// Columnar view for signal evaluation.
    #[must_use]
    pub const fn frame(&self) -> &SignalFrame {
        &self.frame
    }

    /// Number of bars.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Whether the day has no bars.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Keep only bars stamped at or before `at`.
    #[must_use]
    pub fn until(mut self, at: NaiveDateTime) -> Self {
        let n = self.bars.partition_point(|b| b.timestamp <= at);
        self.bars.truncate(n);
        self.proxy_volume.truncate(n);
        self.frame = SignalFrame::new(&self.bars, &self.proxy_volume);
        self
    }

    /// Last bar, if any.
    #[must_use]
    pub fn last_bar(&self) -> Option<&Bar> {
        self.bars.last()
    }
}

/// A constructed trade ready for guardrails (live) or the ledger (backtest).
#[derive(Debug, Clone)]
pub struct TradeIntent {
    /// Sequence step name.
    pub step: String,
    /// Bar index that produced the signal.
    pub index: usize,
    /// The trade.
    pub descriptor: TradeDescriptor,
}

/// Runs the decision pipeline for one step at one bar.
#[derive(Clone)]
pub struct TradePipeline {
    market: Arc<dyn MarketDataPort>,
    underlying: UnderlyingConfig,
    quote_timeout: Duration,
    narrow_wings: bool,
}

impl std::fmt::Debug for TradePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TradePipeline")
            .field("underlying", &self.underlying.symbol)
            .field("quote_timeout", &self.quote_timeout)
            .field("narrow_wings", &self.narrow_wings)
            .finish_non_exhaustive()
    }
}

impl TradePipeline {
    /// Pipeline over `market` for the configured underlying.
    #[must_use]
    pub fn new(market: Arc<dyn MarketDataPort>, underlying: UnderlyingConfig, quote_timeout: Duration) -> Self {
        Self {
            market,
            underlying,
            quote_timeout,
            narrow_wings: false,
        }
    }

    /// Enable wing narrowing for steps with a `wing_floor`.
    #[must_use]
    pub const fn with_wing_narrowing(mut self, enabled: bool) -> Self {
        self.narrow_wings = enabled;
        self
    }

    /// Underlying configuration.
    #[must_use]
    pub const fn underlying(&self) -> &UnderlyingConfig {
        &self.underlying
    }

    /// Fetch underlying and proxy bars for `date`.
    pub async fn load_session(&self, date: NaiveDate) -> Result<SessionData, MarketDataError> {
        let bars = self.market.get_bars(&self.underlying.symbol, date).await?;
        if bars.is_empty() {
            return Err(MarketDataError::DataUnavailable {
                message: format!("no {} bars on {date}", self.underlying.symbol),
            });
        }
        let proxy = self.market.get_bars(&self.underlying.volume_proxy, date).await?;
        Ok(SessionData::new(date, bars, &proxy))
    }

    /// Evaluate `step` at bar `index`.
    ///
    /// Returns `None` when there is no signal, the search finds nothing, or a
    /// leg fails the liquidity check. Missing quotes behave like an empty
    /// board.
    pub async fn evaluate_tick(&self, step: &StrategyConfig, session: &SessionData, index: usize) -> Option<TradeIntent> {
        let bar = session.bars.get(index)?;
        if !session.frame().has_entry_signal(index, &step.signal) {
            return None;
        }

        let kind = step.kind;
        let prefix = self.underlying.option_prefix.as_str();
        let expiry = session.date;
        let at = bar.timestamp;
        let center = atm_strike(bar.close, self.underlying.strike_increment);
        let offset = step.short_offset;
        let distances = if kind.is_credit() {
            let floor = step.wing_floor.filter(|_| self.narrow_wings);
            search_distances(step.min_distance, step.max_distance, step.distance_step, floor)
        } else {
            vec![step.min_distance]
        };

        let symbols = QuoteBoard::symbols_for_search(kind, prefix, expiry, center, &distances, offset);
        let board = self.fetch_board(&symbols, at).await;
        let builder = TradeBuilder::new(kind, self.underlying.multiplier, bar.close, at);

        let descriptor = if kind.is_credit() {
            let oracle = |d: Decimal| board.price_structure(kind, prefix, expiry, center, d, offset);
            let Some(mut result) = find_strikes(
                center,
                step.min_distance,
                step.max_distance,
                step.distance_step,
                step.target_ratio,
                step.ratio_tolerance,
                oracle,
            ) else {
                tracing::debug!(step = %step.name, center = %center, at = %at, "Strike search exhausted");
                return None;
            };
            if self.narrow_wings
                && let Some(floor) = step.wing_floor
            {
                result = narrow_wings(result, floor, step.distance_step, oracle);
            }
            builder.build(&result, step.quantity)
        } else {
            let Some(legs) = board.price_legs(kind, prefix, expiry, center, step.min_distance, offset) else {
                tracing::debug!(step = %step.name, center = %center, at = %at, "Debit legs not quoted");
                return None;
            };
            builder.build_debit(&legs, step.min_distance, step.quantity)
        };

        if let Some(max_spread) = step.max_spread_pct
            && let Err(reason) = validate_liquidity(&descriptor, max_spread)
        {
            tracing::info!(step = %step.name, reason = %reason, "Trade failed liquidity check");
            return None;
        }

        tracing::info!(
            step = %step.name,
            structure = %kind,
            strikes = %descriptor.strikes_repr(),
            premium = %descriptor.net_premium(),
            ratio = ?descriptor.win_loss_ratio(),
            at = %at,
            "Trade constructed"
        );

        Some(TradeIntent {
            step: step.name.clone(),
            index,
            descriptor,
        })
    }

    /// Fetch a quote board with a bounded wait.
    ///
    /// A timeout or provider error yields empty quotes for every symbol.
    pub async fn fetch_board(&self, symbols: &[String], at: NaiveDateTime) -> QuoteBoard {
        if symbols.is_empty() {
            return QuoteBoard::new();
        }
        let batch = match tokio::time::timeout(self.quote_timeout, self.market.get_quotes(symbols, at)).await {
            Ok(Ok(batch)) => batch,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, symbols = symbols.len(), "Quote batch failed");
                empty_batch(symbols, at)
            }
            Err(_) => {
                let err = MarketDataError::Timeout {
                    millis: self.quote_timeout.as_millis() as u64,
                };
                tracing::warn!(error = %err, symbols = symbols.len(), "Quote batch timed out");
                empty_batch(symbols, at)
            }
        };
        QuoteBoard::from_batch(batch)
    }

    /// Volatility index level, `None` when unconfigured or unquoted.
    pub async fn vix(&self, at: NaiveDateTime) -> Option<f64> {
        let symbol = self.underlying.vix_symbol.as_deref()?;
        match tokio::time::timeout(self.quote_timeout, self.market.get_quote(symbol, at)).await {
            Ok(Ok(Some(quote))) => quote.last.to_f64(),
            Ok(Ok(None)) => None,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, symbol, "VIX quote failed");
                None
            }
            Err(_) => {
                tracing::warn!(symbol, "VIX quote timed out");
                None
            }
        }
    }
}

fn empty_batch(symbols: &[String], at: NaiveDateTime) -> HashMap<String, Option<Quote>> {
    symbols.iter().map(|s| (s.clone(), Some(Quote::empty(at)))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::MockMarketDataPort;
    use crate::domain::market_data::{OptionContract, OptionRight};
    use crate::domain::signal::SignalParams;
    use crate::domain::trade::StructureKind;
    use rust_decimal_macros::dec;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 17).unwrap()
    }

    fn bar(minute: u32, open: Decimal, close: Decimal, range: Decimal, volume: u64) -> Bar {
        let ts = date().and_hms_opt(9, 30 + minute, 0).unwrap();
        let high = open.max(close) + range / dec!(2);
        let low = open.min(close) - range / dec!(2);
        Bar::new(ts, open, high, low, close, volume)
    }

    /// Wide first bars, then tight alternating bars on falling volume.
    fn session() -> SessionData {
        let bars = vec![
            bar(0, dec!(6000), dec!(6004), dec!(10), 0),
            bar(1, dec!(6004), dec!(5998), dec!(10), 0),
            bar(2, dec!(5998), dec!(6001), dec!(2), 0),
            bar(3, dec!(6001), dec!(5999), dec!(1), 0),
            bar(4, dec!(5999), dec!(6001), dec!(1), 0),
        ];
        let proxy: Vec<Bar> = [1000, 800, 400, 300, 200]
            .iter()
            .enumerate()
            .map(|(i, v)| bar(i as u32, dec!(600), dec!(600), dec!(1), *v))
            .collect();
        SessionData::new(date(), bars, &proxy)
    }

    fn fly_step() -> StrategyConfig {
        StrategyConfig {
            name: "fly".to_string(),
            kind: StructureKind::IronButterfly,
            quantity: 1,
            signal: SignalParams {
                consecutive_candles: 3,
                volume_threshold_fraction: 0.5,
                lookback_candles: 4,
                avg_range_candles: 3,
                range_threshold_fraction: 0.8,
                ..SignalParams::default()
            },
            min_distance: dec!(10),
            max_distance: dec!(50),
            distance_step: dec!(10),
            target_ratio: dec!(1),
            ratio_tolerance: dec!(0.05),
            short_offset: Decimal::ZERO,
            wing_floor: None,
            max_spread_pct: None,
            hedge_exit: None,
        }
    }

    /// Fly quotes centred at 6000. Ratio falls from 2.2 at distance 20 to 0.65 at 50
/// and 0.56 at 55.
    fn quotes(at: NaiveDateTime) -> HashMap<String, Option<Quote>> {
        let mut out = HashMap::new();
        let q = |bid: Decimal| Some(Quote::new(bid, bid + dec!(0.10), bid, 0, at));
        for right in [OptionRight::Put, OptionRight::Call] {
            out.insert(OptionContract::new("SPXW", date(), right, dec!(6000)).symbol().to_string(), q(dec!(10)));
        }
        for d in [10, 20, 25, 30, 35, 40, 45, 50, 55] {
            let d = Decimal::from(d);
            let bid = (dec!(5) - d / dec!(10)).max(dec!(0.05));
            out.insert(
                OptionContract::new("SPXW", date(), OptionRight::Put, dec!(6000) - d).symbol().to_string(),
                q(bid),
            );
            out.insert(
                OptionContract::new("SPXW", date(), OptionRight::Call, dec!(6000) + d).symbol().to_string(),
                q(bid),
            );
        }
        out
    }

    fn pipeline(mock: MockMarketDataPort) -> TradePipeline {
        TradePipeline::new(Arc::new(mock), UnderlyingConfig::default(), Duration::from_millis(200))
    }

    #[tokio::test]
    async fn builds_fly_on_signal() {
        let mut mock = MockMarketDataPort::new();
        mock.expect_get_quotes().returning(|_, at| Ok(quotes(at)));

        let session = session();
        assert!(session.frame().has_entry_signal(4, &fly_step().signal));

        let intent = pipeline(mock).evaluate_tick(&fly_step(), &session, 4).await.unwrap();
        let desc = &intent.descriptor;
        assert_eq!(intent.step, "fly");
        assert_eq!(desc.kind(), StructureKind::IronButterfly);
        assert_eq!(desc.legs().len(), 4);
        assert!(desc.net_premium() > Decimal::ZERO);
        assert_eq!(desc.underlying_price(), dec!(6001));
    }

    fn wing_put(distance: Decimal) -> String {
        OptionContract::new("SPXW", date(), OptionRight::Put, dec!(6000) - distance)
            .symbol()
            .to_string()
    }

    #[tokio::test]
    async fn off_grid_max_distance_is_quoted_and_searched() {
        let wanted = wing_put(dec!(55));
        let mut mock = MockMarketDataPort::new();
        mock.expect_get_quotes()
            .withf(move |symbols, _| symbols.contains(&wanted))
            .times(1)
            .returning(|_, at| Ok(quotes(at)));

        // 10 is invalid, 30 is far off, 55 hits the target on the first pass.
        let mut step = fly_step();
        step.max_distance = dec!(55);
        step.target_ratio = dec!(0.558);
        step.ratio_tolerance = dec!(0.01);

        let intent = pipeline(mock).evaluate_tick(&step, &session(), 4).await.unwrap();
        assert_eq!(intent.descriptor.distance(), dec!(55));
        assert!(intent.descriptor.legs().iter().any(|leg| leg.strike() == dec!(5945)));
    }

    #[tokio::test]
    async fn off_grid_wing_floor_narrows_live() {
        let mut mock = MockMarketDataPort::new();
        mock.expect_get_quotes().returning(|_, at| Ok(quotes(at)));

        // Search settles on 50 (credit 19.70). Floor 25 walks 25, 35, 45 and
        // 45 keeps 18.80, above 95% of the chosen credit.
        let mut step = fly_step();
        step.target_ratio = dec!(0.65);
        step.ratio_tolerance = dec!(0.01);
        step.wing_floor = Some(dec!(25));

        let narrowed = pipeline(mock)
            .with_wing_narrowing(true)
            .evaluate_tick(&step, &session(), 4)
            .await
            .unwrap();
        assert_eq!(narrowed.descriptor.distance(), dec!(45));
        assert_eq!(narrowed.descriptor.net_premium(), dec!(18.80));
    }

    #[tokio::test]
    async fn no_signal_skips_quote_fetch() {
        let mut mock = MockMarketDataPort::new();
        mock.expect_get_quotes().never();

        // index 1 is inside the warm-up window
        assert!(pipeline(mock).evaluate_tick(&fly_step(), &session(), 1).await.is_none());
    }

    #[tokio::test]
    async fn quote_failure_declines_entry() {
        let mut mock = MockMarketDataPort::new();
        mock.expect_get_quotes().returning(|_, _| {
            Err(MarketDataError::ConnectionError {
                message: "down".to_string(),
            })
        });

        assert!(pipeline(mock).evaluate_tick(&fly_step(), &session(), 4).await.is_none());
    }

    #[tokio::test]
    async fn liquidity_filter_declines_wide_markets() {
        let mut mock = MockMarketDataPort::new();
        mock.expect_get_quotes().returning(|_, at| Ok(quotes(at)));

        let mut step = fly_step();
        step.max_spread_pct = Some(dec!(0.001));
        assert!(pipeline(mock).evaluate_tick(&step, &session(), 4).await.is_none());
    }

    #[tokio::test]
    async fn vix_reads_last_price() {
        let mut mock = MockMarketDataPort::new();
        mock.expect_get_quote()
            .returning(|_, at| Ok(Some(Quote::new(dec!(18.4), dec!(18.6), dec!(18.5), 0, at))));

        let at = date().and_hms_opt(10, 0, 0).unwrap();
        assert_eq!(pipeline(mock).vix(at).await, Some(18.5));
    }
}
