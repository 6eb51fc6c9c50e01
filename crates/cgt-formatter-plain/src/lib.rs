//! Plain text formatter for CGT tax reports (spec §6 "Report consumer").
//!
//! Walks a [`Report`]'s flattened `calculation_log`, grouping entries back
//! into per-disposal lines by `(date, category)` the way the audit log's own
//! grouping key (spec §3 "Audit entry") intends, rather than re-deriving
//! disposal shape from scratch.

use std::collections::BTreeMap;
use std::fmt::Write;

use cgt_core::audit::RuleTag;
use cgt_core::warnings::Warning;
use cgt_core::{CgtError, Report};
use cgt_format::{CurrencyFormatter, format_currency, format_date, format_decimal, format_tax_year};
use rust_decimal::Decimal;

fn formatter() -> CurrencyFormatter {
    CurrencyFormatter::uk()
}

/// Format a tax report as plain text.
pub fn format(report: &Report) -> Result<String, CgtError> {
    let mut out = String::new();

    write_summary(&mut out, report);
    write_disposals(&mut out, report);
    write_corporate_actions(&mut out, report);
    write_income(&mut out, report);
    write_holdings(&mut out, report);
    write_warnings(&mut out, report);

    Ok(out.trim_end().to_string() + "\n")
}

fn write_summary(out: &mut String, report: &Report) {
    let _ = writeln!(out, "# SUMMARY\n");
    let _ = writeln!(
        out,
        "{:<12}{:<12}{:<12}{:<14}Taxable gain",
        "Tax year", "Gain", "Loss", "Exemption"
    );
    let _ = writeln!(out, "==============================================================");
    let _ = writeln!(
        out,
        "{:<12}{:<12}{:<12}{:<14}{}",
        format_tax_year(report.tax_year.start_year()),
        format_currency(report.capital_gain),
        format_currency(report.capital_loss),
        format_currency(report.allowance),
        format_currency(report.taxable_gain())
    );
}

fn write_disposals(out: &mut String, report: &Report) {
    let _ = writeln!(out, "\n# DISPOSALS\n");

    let disposal_rules = |rule: RuleTag| {
        matches!(
            rule,
            RuleTag::SameDay | RuleTag::BedAndBreakfast | RuleTag::Section104 | RuleTag::ShortCover
        )
    };

    let mut groups: BTreeMap<(chrono::NaiveDate, String), Vec<&cgt_core::audit::AuditEntry>> = BTreeMap::new();
    for entry in &report.calculation_log {
        if disposal_rules(entry.rule) {
            groups
                .entry((entry.date, entry.category.clone()))
                .or_default()
                .push(entry);
        }
    }

    if groups.is_empty() {
        let _ = writeln!(out, "NONE");
        return;
    }

    for (index, ((date, _category), entries)) in groups.iter().enumerate() {
        let symbol = &entries[0].symbol;
        let quantity: Decimal = entries.iter().map(|e| e.quantity).sum();
        let total_gain: Decimal = entries.iter().map(|e| e.gain_or_loss).sum();
        let gain_type = if total_gain >= Decimal::ZERO { "GAIN" } else { "LOSS" };

        let _ = writeln!(
            out,
            "{}) {} {} {} on {} - {} {}",
            index + 1,
            if entries[0].rule == RuleTag::ShortCover { "COVER" } else { "SELL" },
            format_decimal(quantity),
            symbol,
            format_date(*date),
            gain_type,
            format_currency(total_gain.abs())
        );

        for e in entries {
            match e.rule {
                RuleTag::SameDay => {
                    let _ = writeln!(out, "   Same Day: {} shares", format_decimal(e.quantity));
                }
                RuleTag::BedAndBreakfast => {
                    if let Some(acq_date) = e.acquisition_date {
                        let _ = writeln!(
                            out,
                            "   B&B: {} shares from {}",
                            format_decimal(e.quantity),
                            format_date(acq_date)
                        );
                    }
                }
                RuleTag::Section104 => {
                    let cost_per_share = if e.quantity != Decimal::ZERO {
                        e.allowable_cost / e.quantity
                    } else {
                        Decimal::ZERO
                    };
                    let _ = writeln!(
                        out,
                        "   Section 104: {} shares @ {}",
                        format_decimal(e.quantity),
                        formatter().format_decimal(cost_per_share.round_dp(2))
                    );
                }
                RuleTag::ShortCover => {
                    if let Some(open_date) = e.acquisition_date {
                        let _ = writeln!(
                            out,
                            "   Short cover: {} shares opened {}",
                            format_decimal(e.quantity),
                            format_date(open_date)
                        );
                    }
                }
                _ => {}
            }
            let _ = writeln!(
                out,
                "   Proceeds: {}  Cost: {}  Result: {}",
                format_currency(e.gross_amount),
                format_currency(e.allowable_cost),
                format_currency(e.gain_or_loss)
            );
        }
        let _ = writeln!(out);
    }
}

fn write_corporate_actions(out: &mut String, report: &Report) {
    let actions: Vec<_> = report
        .calculation_log
        .iter()
        .filter(|e| matches!(e.rule, RuleTag::Eri | RuleTag::SpinOff))
        .collect();

    if actions.is_empty() {
        return;
    }

    let _ = writeln!(out, "\n# CORPORATE ACTIONS\n");
    for e in actions {
        match e.rule {
            RuleTag::Eri => {
                let _ = writeln!(
                    out,
                    "{} ERI {} uplift {}",
                    format_date(e.date),
                    e.symbol,
                    format_currency(e.allowable_cost)
                );
            }
            RuleTag::SpinOff => {
                let direction = if e.allowable_cost >= Decimal::ZERO { "received" } else { "transferred" };
                let _ = writeln!(
                    out,
                    "{} SPIN_OFF {} cost {direction} {}",
                    format_date(e.date),
                    e.symbol,
                    format_currency(e.allowable_cost.abs())
                );
            }
            _ => {}
        }
    }
}

fn write_income(out: &mut String, report: &Report) {
    if !report.dividends.is_empty() {
        let _ = writeln!(out, "\n# DIVIDENDS\n");
        for line in &report.dividends {
            let _ = writeln!(
                out,
                "{} {} {}",
                format_date(line.date),
                line.symbol,
                format_currency(line.net_amount_gbp)
            );
        }
    }

    if !report.interest.is_empty() {
        let _ = writeln!(out, "\n# INTEREST\n");
        for line in &report.interest {
            let _ = writeln!(
                out,
                "{} {} ({}) {}",
                format_date(line.month),
                line.broker,
                line.currency,
                format_currency(line.amount_gbp)
            );
        }
    }
}

fn write_holdings(out: &mut String, report: &Report) {
    let _ = writeln!(out, "\n# HOLDINGS\n");

    let mut pools: Vec<_> = report.portfolio.pools.iter().filter(|(_, p)| p.quantity > Decimal::ZERO).collect();
    pools.sort_by(|a, b| a.0.cmp(b.0));

    let mut shorts: Vec<_> = report.portfolio.shorts.iter().filter(|(_, lots)| !lots.is_empty()).collect();
    shorts.sort_by(|a, b| a.0.cmp(b.0));

    if pools.is_empty() && shorts.is_empty() {
        let _ = writeln!(out, "NONE");
        return;
    }

    for (symbol, pool) in pools {
        let cost_basis = if pool.quantity != Decimal::ZERO {
            pool.pooled_cost_gbp / pool.quantity
        } else {
            Decimal::ZERO
        };
        let _ = writeln!(
            out,
            "{}: {} units at {} avg cost",
            symbol,
            format_decimal(pool.quantity),
            formatter().format_decimal(cost_basis.round_dp(2))
        );
    }

    for (symbol, lots) in shorts {
        let total: Decimal = lots.iter().map(|l| l.quantity).sum();
        let _ = writeln!(out, "{symbol}: SHORT {} units open", format_decimal(total));
    }
}

fn write_warnings(out: &mut String, report: &Report) {
    if report.warnings.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n# WARNINGS\n");
    for w in &report.warnings {
        let _ = writeln!(out, "{}", format_warning(w));
    }
}

fn format_warning(w: &Warning) -> String {
    match (w.symbol.as_deref(), w.date) {
        (Some(symbol), Some(date)) => {
            format!("[{:?}/{:?}] {} ({}): {}", w.severity, w.category, symbol, format_date(date), w.detail)
        }
        (Some(symbol), None) => format!("[{:?}/{:?}] {}: {}", w.severity, w.category, symbol, w.detail),
        _ => format!("[{:?}/{:?}] {}", w.severity, w.category, w.detail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgt_core::Engine;
    use cgt_core::models::{Currency as CoreCurrency, RawAction, RawTransaction};
    use cgt_money::fx::FxOracle;
    use cgt_money::FxConversionError;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    struct GbpOnly;
    impl FxOracle for GbpOnly {
        fn rate_to_gbp(&self, _currency: CoreCurrency, _date: NaiveDate) -> Result<Decimal, FxConversionError> {
            Ok(Decimal::ONE)
        }
        fn convert(&self, amount: &cgt_core::CurrencyAmount, _date: NaiveDate) -> Result<Decimal, FxConversionError> {
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
            currency: CoreCurrency::GBP,
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
            currency: CoreCurrency::GBP,
            broker: "test".to_string(),
            isin: None,
            description: None,
            split_ratio: None,
        }
    }

    #[test]
    fn formats_a_same_day_disposal_with_a_gain() {
        let fx = GbpOnly;
        let mut engine = Engine::new(&fx);
        let date = NaiveDate::from_ymd_opt(2023, 5, 1).unwrap();
        engine.add_transaction(&buy(date, "AAPL", dec!(100), dec!(15010), dec!(10))).unwrap();
        engine.add_transaction(&sell(date, "AAPL", dec!(100), dec!(16000), dec!(12))).unwrap();
        let report = engine.calculate(2023).unwrap();

        let output = format(&report).unwrap();
        assert!(output.contains("# SUMMARY"));
        assert!(output.contains("# DISPOSALS"));
        assert!(output.contains("Same Day: 100 shares"));
        assert!(output.contains("GAIN"));
        assert!(output.contains("£978.00"));
    }

    #[test]
    fn reports_no_disposals_when_there_are_none() {
        let fx = GbpOnly;
        let engine = Engine::new(&fx);
        let report = engine.calculate(2023).unwrap();
        let output = format(&report).unwrap();
        assert!(output.contains("# DISPOSALS\n\nNONE"));
        assert!(output.contains("# HOLDINGS\n\nNONE"));
    }

    #[test]
    fn surfaces_an_open_short_warning() {
        let fx = GbpOnly;
        let mut engine = Engine::new(&fx);
        engine
            .add_transaction(&sell(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), "GME", dec!(50), dec!(7500), dec!(0)))
            .unwrap();
        let report = engine.calculate(2023).unwrap();

        let output = format(&report).unwrap();
        assert!(output.contains("# WARNINGS"));
        assert!(output.contains("GME"));
        assert!(output.contains("# HOLDINGS"));
        assert!(output.contains("SHORT 50 units open"));
    }
}
