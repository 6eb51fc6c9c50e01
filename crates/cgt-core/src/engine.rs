//! The calculation driver: ingestion (spec §4.9–§4.10) plus the day walk
//! that applies matching and corporate-action rules in date order (spec §4.11).

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

use crate::audit::{AuditEntry, RuleTag, interest_category, symbol_category};
use crate::calendar::{engine_epoch, in_tax_year, tax_year_end};
use crate::corporate_actions::{self, SpinOffEvent};
use crate::decimal::{ReconciliationKind, approx_equal_price_rounding, round_half_up};
use crate::error::CgtError;
use crate::exemption::get_exemption;
use crate::matcher::match_disposal;
use crate::models::{CurrencyAmount, RawAction, RawTransaction};
use crate::position::{PositionStore, ShortLot};
use crate::report::{DividendLine, InterestLine, Portfolio, Report};
use crate::txlog::TransactionLog;
use crate::warnings::Warning;

/// One buy covering an open short, recorded at ingest time (spec §4.10) and
/// turned into a `SHORT_COVER` audit entry when the day-driver visits the
/// cover date.
struct ShortCoverEvent {
    date: NaiveDate,
    symbol: String,
    open_date: NaiveDate,
    proceeds_gbp: Decimal,
    cost_gbp: Decimal,
    quantity: Decimal,
}

/// A non-matched action recorded at ingest time: surfaced in the
/// calculation log under its own category rather than silently dropped.
struct OtherEvent {
    date: NaiveDate,
    symbol: String,
    category: String,
    amount_gbp: Decimal,
}

/// Accumulates every transaction fed to it and produces a [`Report`] for a
/// single UK tax year via [`Engine::calculate`].
///
/// Ingestion (`add_*`) only ever mutates the short FIFO queue directly
/// (needed to decide, transaction by transaction, how much of a disposal
/// opens a new short and how much a buy covers); the Section 104 pool itself
/// is mutated exclusively by `calculate`'s day walk applying §4.5–§4.8 in
/// date order, so a disposal's chargeable gain never depends on the order
/// `add_*` calls arrive in within the same day (spec §5 "Ordering
/// guarantees").
pub struct Engine<'fx> {
    fx: &'fx dyn cgt_money::fx::FxOracle,
    positions: PositionStore,
    holding_qty: HashMap<String, Decimal>,
    acquisitions: TransactionLog,
    disposals: TransactionLog,
    bnb_consumed: TransactionLog,
    eris: HashMap<(NaiveDate, String), Decimal>,
    spinoffs: Vec<SpinOffEvent>,
    splits: HashMap<(String, NaiveDate), Decimal>,
    dividends: BTreeMap<(NaiveDate, String), Decimal>,
    interest: BTreeMap<(String, String, NaiveDate), Decimal>,
    short_covers: Vec<ShortCoverEvent>,
    other_events: Vec<OtherEvent>,
    active_days: BTreeSet<NaiveDate>,
    warnings: Vec<Warning>,
}

impl<'fx> Engine<'fx> {
    pub fn new(fx: &'fx dyn cgt_money::fx::FxOracle) -> Self {
        Self {
            fx,
            positions: PositionStore::new(),
            holding_qty: HashMap::new(),
            acquisitions: TransactionLog::new(),
            disposals: TransactionLog::new(),
            bnb_consumed: TransactionLog::new(),
            eris: HashMap::new(),
            spinoffs: Vec::new(),
            splits: HashMap::new(),
            dividends: BTreeMap::new(),
            interest: BTreeMap::new(),
            short_covers: Vec::new(),
            other_events: Vec::new(),
            active_days: BTreeSet::new(),
            warnings: Vec::new(),
        }
    }

    fn holding(&self, symbol: &str) -> Decimal {
        self.holding_qty.get(symbol).copied().unwrap_or(Decimal::ZERO)
    }

    fn convert(&mut self, amount: Decimal, currency: cgt_money::Currency, date: NaiveDate) -> Result<Decimal, CgtError> {
        Ok(self.fx.convert(&CurrencyAmount::new(amount, currency), date)?)
    }

    /// Ingest a single broker-native transaction, dispatching it by action
    /// (spec §4.9–§4.10). Actions the matching rules don't consume directly
    /// (fees, transfers, cash events, re-investments) are still logged under
    /// their own category so nothing silently vanishes from the audit trail.
    pub fn add_transaction(&mut self, tx: &RawTransaction) -> Result<(), CgtError> {
        match tx.action {
            RawAction::Buy | RawAction::StockActivity => self.add_acquisition(tx),
            RawAction::StockSplit => self.add_split(tx),
            RawAction::Sell => self.add_disposal(tx),
            RawAction::Dividend | RawAction::DividendTax => self.add_dividend(tx),
            RawAction::Interest => self.add_interest(tx),
            RawAction::ExcessReportedIncome => self.add_eri(tx),
            RawAction::SpinOff => self.add_spinoff_transaction(tx),
            RawAction::Fee
            | RawAction::Transfer
            | RawAction::CashMerger
            | RawAction::FullRedemption
            | RawAction::Adjustment
            | RawAction::CapitalGain
            | RawAction::ReinvestShares
            | RawAction::ReinvestDividends
            | RawAction::WireFundsReceived => self.add_uncategorized(tx),
        }
    }

    /// Buy / StockActivity ingestion: validate, convert to GBP, cover any
    /// open shorts FIFO, and log whatever remains as a new acquisition
    /// (spec §4.10).
    fn add_acquisition(&mut self, tx: &RawTransaction) -> Result<(), CgtError> {
        let symbol = tx.required_symbol()?;
        let qty = tx.required_quantity()?;
        if qty <= Decimal::ZERO {
            return Err(CgtError::NonPositiveQuantity {
                action: format!("{:?}", tx.action),
                symbol,
                quantity: qty,
            });
        }
        let amount = tx.required_amount()?;
        if let Some(price) = tx.price
            && !approx_equal_price_rounding(amount, qty, price, tx.fees, ReconciliationKind::Acquisition)
        {
            return Err(CgtError::AmountPriceMismatch {
                symbol,
                amount,
                price,
                quantity: qty,
            });
        }

        let gbp_amount = self.convert(amount, tx.currency, tx.date)?.abs();
        let gbp_fees = self.convert(tx.fees, tx.currency, tx.date)?.abs();

        let mut remaining_qty = qty;
        while remaining_qty > Decimal::ZERO && self.positions.open_short_quantity(&symbol) > Decimal::ZERO {
            let Some(lot) = self.positions.pop_short_cover(&symbol, remaining_qty) else {
                break;
            };
            let cover_qty = lot.quantity;
            // Unified on GBP throughout (spec §9 Open Question 1, option a):
            // cover_cost slices the already-converted gbp_amount here, and
            // add_disposal's regular-portion slice below does the same,
            // rather than carrying the broker-native pre-conversion amount
            // through the mixed long/short disposal case.
            let cover_cost = gbp_amount * cover_qty / qty;
            let cover_fees = gbp_fees * cover_qty / qty;
            self.short_covers.push(ShortCoverEvent {
                date: tx.date,
                symbol: symbol.clone(),
                open_date: lot.open_date,
                proceeds_gbp: lot.net_proceeds_gbp,
                cost_gbp: cover_cost + cover_fees,
                quantity: cover_qty,
            });
            self.active_days.insert(tx.date);
            remaining_qty -= cover_qty;
        }

        if remaining_qty > Decimal::ZERO {
            let residual_cost = gbp_amount * remaining_qty / qty;
            let residual_fees = gbp_fees * remaining_qty / qty;
            self.acquisitions.append(tx.date, &symbol, remaining_qty, residual_cost, residual_fees, &[]);
            *self.holding_qty.entry(symbol).or_insert(Decimal::ZERO) += remaining_qty;
            self.active_days.insert(tx.date);
        }

        Ok(())
    }

    /// StockSplit ingestion: register the day's multiplier for the B&B walk
    /// (spec §4.6 step 1) and, if new shares were issued, log them as a
    /// zero-cost acquisition (spec §4.10).
    fn add_split(&mut self, tx: &RawTransaction) -> Result<(), CgtError> {
        let symbol = tx.required_symbol()?;
        let ratio = tx.split_ratio.ok_or_else(|| CgtError::MissingField {
            action: format!("{:?}", tx.action),
            field: "split_ratio",
        })?;
        *self.splits.entry((symbol.clone(), tx.date)).or_insert(Decimal::ONE) *= ratio;

        if let Some(qty) = tx.quantity {
            if qty <= Decimal::ZERO {
                return Err(CgtError::NonPositiveQuantity {
                    action: format!("{:?}", tx.action),
                    symbol,
                    quantity: qty,
                });
            }
            self.acquisitions.append(tx.date, &symbol, qty, Decimal::ZERO, Decimal::ZERO, &[]);
            *self.holding_qty.entry(symbol).or_insert(Decimal::ZERO) += qty;
            self.active_days.insert(tx.date);
        }
        Ok(())
    }

    /// Sell ingestion: validate, convert to GBP, split into a regular
    /// portion (covered by the current holding) and a short-opening portion
    /// (spec §4.9).
    fn add_disposal(&mut self, tx: &RawTransaction) -> Result<(), CgtError> {
        let symbol = tx.required_symbol()?;
        let qty = tx.required_quantity()?;
        if qty <= Decimal::ZERO {
            return Err(CgtError::NonPositiveQuantity {
                action: format!("{:?}", tx.action),
                symbol,
                quantity: qty,
            });
        }
        let amount = tx.required_amount()?;
        if let Some(price) = tx.price
            && !approx_equal_price_rounding(amount, qty, price, tx.fees, ReconciliationKind::Disposal)
        {
            return Err(CgtError::AmountPriceMismatch {
                symbol,
                amount,
                price,
                quantity: qty,
            });
        }

        let gbp_amount = self.convert(amount, tx.currency, tx.date)?.abs();
        let gbp_fees = self.convert(tx.fees, tx.currency, tx.date)?.abs();

        let current_qty = self.holding(&symbol);
        let regular_qty = qty.min(current_qty.max(Decimal::ZERO));
        let short_qty = qty - regular_qty;

        if regular_qty > Decimal::ZERO {
            let regular_amount = gbp_amount * regular_qty / qty;
            let regular_fees = gbp_fees * regular_qty / qty;
            self.disposals.append(tx.date, &symbol, regular_qty, regular_amount, regular_fees, &[]);
            *self.holding_qty.entry(symbol.clone()).or_insert(Decimal::ZERO) -= regular_qty;
            self.active_days.insert(tx.date);
        }

        if short_qty > Decimal::ZERO {
            let short_amount = gbp_amount * short_qty / qty;
            let short_fees = gbp_fees * short_qty / qty;
            self.positions.push_short(
                &symbol,
                ShortLot {
                    quantity: short_qty,
                    net_proceeds_gbp: short_amount - short_fees,
                    open_date: tx.date,
                    sell_fees_gbp: short_fees,
                },
            );
        }

        Ok(())
    }

    fn add_dividend(&mut self, tx: &RawTransaction) -> Result<(), CgtError> {
        let symbol = tx.required_symbol()?;
        let amount = tx.required_amount()?;
        let gbp_amount = self.convert(amount, tx.currency, tx.date)?;
        let signed = if tx.action == RawAction::DividendTax { -gbp_amount.abs() } else { gbp_amount };
        *self.dividends.entry((tx.date, symbol)).or_insert(Decimal::ZERO) += signed;
        Ok(())
    }

    fn add_interest(&mut self, tx: &RawTransaction) -> Result<(), CgtError> {
        let amount = tx.required_amount()?;
        let gbp_amount = self.convert(amount, tx.currency, tx.date)?;
        let month = tx.date.with_day(1).unwrap_or(tx.date);
        let currency_code = tx.currency.code().to_string();
        *self
            .interest
            .entry((tx.broker.clone(), currency_code, month))
            .or_insert(Decimal::ZERO) += gbp_amount;
        Ok(())
    }

    fn add_eri(&mut self, tx: &RawTransaction) -> Result<(), CgtError> {
        let symbol = tx.required_symbol()?;
        let amount_per_share = tx.required_amount()?;
        let gbp_amount_per_share = self.convert(amount_per_share, tx.currency, tx.date)?;
        self.eris.insert((tx.date, symbol), gbp_amount_per_share);
        self.active_days.insert(tx.date);
        Ok(())
    }

    fn add_spinoff_transaction(&mut self, tx: &RawTransaction) -> Result<(), CgtError> {
        let dest_symbol = tx.required_symbol()?;
        let source_symbol = tx
            .description
            .clone()
            .ok_or_else(|| CgtError::MissingField {
                action: format!("{:?}", tx.action),
                field: "description",
            })?
            .to_uppercase();
        let cost_proportion = tx.required_amount()?;
        self.spinoffs.push(SpinOffEvent {
            date: tx.date,
            source_symbol,
            dest_symbol,
            cost_proportion,
        });
        self.active_days.insert(tx.date);
        Ok(())
    }

    /// Fee, Transfer, CashMerger, FullRedemption, Adjustment, CapitalGain,
    /// ReinvestShares, ReinvestDividends, WireFundsReceived: not matched by
    /// any CGT rule, but still surfaced under their own category with an
    /// informational warning rather than silently dropped.
    fn add_uncategorized(&mut self, tx: &RawTransaction) -> Result<(), CgtError> {
        let amount = tx.amount.unwrap_or(Decimal::ZERO);
        let gbp_amount = self.convert(amount, tx.currency, tx.date)?;
        let symbol = tx.symbol.clone().unwrap_or_else(|| tx.broker.clone());
        self.other_events.push(OtherEvent {
            date: tx.date,
            symbol: symbol.clone(),
            category: symbol_category(tx.action.category_key(), &symbol),
            amount_gbp: gbp_amount,
        });
        self.active_days.insert(tx.date);
        self.warnings.push(Warning::missing_data_info(
            &symbol,
            tx.date,
            format!("{:?} is recorded but not matched by any CGT rule", tx.action),
        ));
        Ok(())
    }

    /// Run the day walk for `tax_year` (its start year) and assemble the report
    /// (spec §4.11). `self` is left with whatever positions remain open.
    pub fn calculate(mut self, tax_year_start: i32) -> Result<Report, CgtError> {
        let end_date = tax_year_end(tax_year_start);
        let mut eris_distribution: HashMap<(NaiveDate, String), Decimal> = HashMap::new();
        let mut log: Vec<AuditEntry> = Vec::new();
        let mut total_gain = Decimal::ZERO;
        let mut total_loss = Decimal::ZERO;

        let mut days: BTreeSet<NaiveDate> = self.active_days.clone();
        days.insert(engine_epoch());
        for d in &days {
            debug_assert!(*d >= engine_epoch(), "active day predates the engine epoch");
        }

        for &day in &days {
            if day > end_date {
                break;
            }

            let symbols_today: BTreeSet<String> = self
                .acquisitions
                .keys()
                .chain(self.disposals.keys())
                .chain(self.eris.keys())
                .filter(|(d, _)| *d == day)
                .map(|(_, s)| s.clone())
                .collect();

            for event in self.spinoffs.iter().filter(|e| e.date == day) {
                let (parent, dest) = corporate_actions::apply_spinoff(&mut self.positions, event);
                Self::accumulate(&parent, tax_year_start, &mut total_gain, &mut total_loss);
                Self::accumulate(&dest, tax_year_start, &mut total_gain, &mut total_loss);
                log.push(parent);
                log.push(dest);
            }

            for symbol in &symbols_today {
                if let Some(amount_per_share) = self.eris.get(&(day, symbol.clone())).copied()
                    && let Some(entry) = corporate_actions::apply_eri(&mut self.positions, symbol, day, amount_per_share)
                {
                    Self::accumulate(&entry, tax_year_start, &mut total_gain, &mut total_loss);
                    log.push(entry);
                }

                if self.acquisitions.has(day, symbol) {
                    let a = self.acquisitions.get(day, symbol);
                    let b = self.bnb_consumed.get(day, symbol);
                    self.positions.adjust_pool(symbol, a.quantity, a.amount_gbp);

                    let unmatched_qty = a.quantity - b.quantity;
                    if unmatched_qty > Decimal::ZERO || b.quantity <= Decimal::ZERO {
                        let post = self.positions.pool(symbol);
                        log.push(AuditEntry {
                            date: day,
                            category: symbol_category("buy", symbol),
                            rule: RuleTag::Acquisition,
                            symbol: symbol.clone(),
                            quantity: unmatched_qty,
                            gross_amount: Decimal::ZERO,
                            fees: a.fees_gbp - b.fees_gbp,
                            allowable_cost: b.amount_gbp - a.amount_gbp,
                            gain_or_loss: Decimal::ZERO,
                            post_quantity: post.quantity,
                            post_cost: post.pooled_cost_gbp,
                            acquisition_date: None,
                        });
                    }
                }

                if self.disposals.has(day, symbol) {
                    let d = self.disposals.get(day, symbol);
                    let entries = match_disposal(
                        &mut self.acquisitions,
                        &mut self.bnb_consumed,
                        &self.disposals,
                        &mut self.positions,
                        &self.eris,
                        &self.splits,
                        symbol,
                        day,
                        d.quantity,
                        d.amount_gbp,
                        d.fees_gbp,
                        tax_year_start,
                        &mut eris_distribution,
                        &mut self.warnings,
                    )?;
                    for entry in &entries {
                        Self::accumulate(entry, tax_year_start, &mut total_gain, &mut total_loss);
                    }
                    log.extend(entries);
                }
            }

            for other in self.other_events.iter().filter(|e| e.date == day) {
                log.push(AuditEntry {
                    date: other.date,
                    category: other.category.clone(),
                    rule: RuleTag::Other,
                    symbol: other.symbol.clone(),
                    quantity: Decimal::ZERO,
                    gross_amount: other.amount_gbp,
                    fees: Decimal::ZERO,
                    allowable_cost: Decimal::ZERO,
                    gain_or_loss: Decimal::ZERO,
                    post_quantity: self.positions.pool(&other.symbol).quantity,
                    post_cost: self.positions.pool(&other.symbol).pooled_cost_gbp,
                    acquisition_date: None,
                });
            }

            for cover in self.short_covers.iter().filter(|c| c.date == day) {
                let gain = cover.proceeds_gbp - cover.cost_gbp;
                let entry = AuditEntry {
                    date: cover.date,
                    category: symbol_category("short_cover", &cover.symbol),
                    rule: RuleTag::ShortCover,
                    symbol: cover.symbol.clone(),
                    quantity: cover.quantity,
                    gross_amount: cover.proceeds_gbp,
                    fees: Decimal::ZERO,
                    allowable_cost: cover.cost_gbp,
                    gain_or_loss: gain,
                    post_quantity: self.positions.pool(&cover.symbol).quantity,
                    post_cost: self.positions.pool(&cover.symbol).pooled_cost_gbp,
                    acquisition_date: Some(cover.open_date),
                };
                Self::accumulate(&entry, tax_year_start, &mut total_gain, &mut total_loss);
                log.push(entry);
            }
        }

        for symbol in self.positions.short_symbols() {
            let qty = self.positions.open_short_quantity(symbol);
            if qty > Decimal::ZERO {
                self.warnings.push(Warning::open_position(symbol, qty));
            }
        }
        for symbol in self.positions.pool_symbols() {
            let pool = self.positions.pool(symbol);
            if pool.pooled_cost_gbp < Decimal::ZERO {
                self.warnings.push(Warning::position(
                    symbol,
                    end_date,
                    "pool cost is negative at year end, likely from an ERI reduction exceeding the pool",
                ));
            }
        }

        let dividends: Vec<DividendLine> = self
            .dividends
            .iter()
            .filter(|((date, _), _)| in_tax_year(*date, tax_year_start))
            .map(|((date, symbol), amount)| DividendLine {
                date: *date,
                symbol: symbol.clone(),
                net_amount_gbp: round_half_up(*amount, 2),
            })
            .collect();
        for line in &dividends {
            log.push(AuditEntry {
                date: line.date,
                category: symbol_category("dividend", &line.symbol),
                rule: RuleTag::Dividend,
                symbol: line.symbol.clone(),
                quantity: Decimal::ZERO,
                gross_amount: line.net_amount_gbp,
                fees: Decimal::ZERO,
                allowable_cost: Decimal::ZERO,
                gain_or_loss: Decimal::ZERO,
                post_quantity: self.positions.pool(&line.symbol).quantity,
                post_cost: self.positions.pool(&line.symbol).pooled_cost_gbp,
                acquisition_date: None,
            });
        }

        let interest: Vec<InterestLine> = self
            .interest
            .iter()
            .filter(|((_, _, month), _)| in_tax_year(*month, tax_year_start))
            .map(|((broker, currency, month), amount)| InterestLine {
                broker: broker.clone(),
                currency: currency.clone(),
                month: *month,
                amount_gbp: round_half_up(*amount, 2),
            })
            .collect();
        for line in &interest {
            log.push(AuditEntry {
                date: line.month,
                category: interest_category(&line.broker, &line.currency),
                rule: RuleTag::Interest,
                symbol: line.broker.clone(),
                quantity: Decimal::ZERO,
                gross_amount: line.amount_gbp,
                fees: Decimal::ZERO,
                allowable_cost: Decimal::ZERO,
                gain_or_loss: Decimal::ZERO,
                post_quantity: Decimal::ZERO,
                post_cost: Decimal::ZERO,
                acquisition_date: None,
            });
        }

        log.retain(|e| in_tax_year(e.date, tax_year_start));
        log.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.symbol.cmp(&b.symbol)));

        let mut eris_distribution: Vec<crate::report::EriDistributionLine> = eris_distribution
            .into_iter()
            .map(|((date, symbol), amount_gbp)| crate::report::EriDistributionLine { date, symbol, amount_gbp })
            .collect();
        eris_distribution.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.symbol.cmp(&b.symbol)));
        let allowance = get_exemption(tax_year_start as u16)?;
        let portfolio = Portfolio::from_positions(
            self.positions.pool_symbols().map(|s| (s.clone(), self.positions.pool(s))),
            self.positions
                .short_symbols()
                .map(|s| (s.clone(), self.positions.shorts(s).copied().collect())),
        );

        Ok(Report {
            tax_year: crate::models::TaxPeriod::new(tax_year_start as u16)?,
            capital_gain: round_half_up(total_gain, 2),
            capital_loss: round_half_up(total_loss, 2),
            allowance,
            calculation_log: log,
            dividends,
            interest,
            eris_distribution,
            portfolio,
            warnings: self.warnings,
        })
    }

    fn accumulate(entry: &AuditEntry, tax_year: i32, gain: &mut Decimal, loss: &mut Decimal) {
        if !in_tax_year(entry.date, tax_year) {
            return;
        }
        if entry.gain_or_loss > Decimal::ZERO {
            *gain += entry.gain_or_loss;
        } else {
            *loss += entry.gain_or_loss;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgt_money::Currency as IsoCurrency;
    use cgt_money::CurrencyAmount as MoneyAmount;
    use cgt_money::fx::FxOracle;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    struct GbpOnly;
    impl FxOracle for GbpOnly {
        fn rate_to_gbp(&self, _currency: IsoCurrency, _date: NaiveDate) -> Result<Decimal, cgt_money::FxConversionError> {
            Ok(Decimal::ONE)
        }
        fn convert(&self, amount: &MoneyAmount, _date: NaiveDate) -> Result<Decimal, cgt_money::FxConversionError> {
            Ok(amount.amount)
        }
    }

    fn buy(date: NaiveDate, symbol: &str, qty: Decimal, amount: Decimal, fees: Decimal) -> RawTransaction {
        RawTransaction {
            date,
            action: RawAction::Buy,
            symbol: Some(symbol.to_string()),
            quantity: Some(qty),
            price: None,
            amount: Some(-amount),
            fees,
            currency: IsoCurrency::GBP,
            broker: "test".to_string(),
            isin: None,
            description: None,
            split_ratio: None,
        }
    }

    fn sell(date: NaiveDate, symbol: &str, qty: Decimal, amount: Decimal, fees: Decimal) -> RawTransaction {
        RawTransaction {
            date,
            action: RawAction::Sell,
            symbol: Some(symbol.to_string()),
            quantity: Some(qty),
            price: None,
            amount: Some(amount),
            fees,
            currency: IsoCurrency::GBP,
            broker: "test".to_string(),
            isin: None,
            description: None,
            split_ratio: None,
        }
    }

    #[test]
    fn section104_averaging_across_two_acquisitions_then_a_disposal() {
        let fx = GbpOnly;
        let mut engine = Engine::new(&fx);
        let d1 = NaiveDate::from_ymd_opt(2023, 5, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2023, 5, 2).unwrap();
        let d3 = NaiveDate::from_ymd_opt(2023, 5, 3).unwrap();

        engine.add_transaction(&buy(d1, "AAPL", dec!(100), dec!(15000), dec!(0))).unwrap();
        engine.add_transaction(&buy(d2, "AAPL", dec!(100), dec!(13000), dec!(0))).unwrap();
        engine.add_transaction(&sell(d3, "AAPL", dec!(100), dec!(12000), dec!(0))).unwrap();

        let report = engine.calculate(2023).unwrap();
        assert_eq!(report.capital_loss, dec!(-2000));
        assert_eq!(report.portfolio.pools.get("AAPL").unwrap().quantity, dec!(100));
        assert_eq!(report.portfolio.pools.get("AAPL").unwrap().pooled_cost_gbp, dec!(14000));
    }

    #[test]
    fn same_day_buy_and_sell_match_before_the_pool() {
        let fx = GbpOnly;
        let mut engine = Engine::new(&fx);
        let date = NaiveDate::from_ymd_opt(2023, 5, 1).unwrap();
        engine.add_transaction(&buy(date, "AAPL", dec!(100), dec!(15010), dec!(10))).unwrap();
        engine.add_transaction(&sell(date, "AAPL", dec!(100), dec!(16000), dec!(12))).unwrap();

        let report = engine.calculate(2023).unwrap();
        assert_eq!(report.capital_gain, dec!(978));
        assert!(report.portfolio.pools.get("AAPL").is_none());
    }

    #[test]
    fn a_disposal_exceeding_the_holding_opens_a_short_then_covers_it() {
        let fx = GbpOnly;
        let mut engine = Engine::new(&fx);
        let d1 = NaiveDate::from_ymd_opt(2023, 5, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();

        engine.add_transaction(&sell(d1, "GME", dec!(100), dec!(15000), dec!(0))).unwrap();
        engine.add_transaction(&buy(d2, "GME", dec!(100), dec!(12000), dec!(0))).unwrap();

        let report = engine.calculate(2023).unwrap();
        assert_eq!(report.capital_gain, dec!(3000));
        assert!(report.portfolio.shorts.get("GME").is_none());
    }
}
