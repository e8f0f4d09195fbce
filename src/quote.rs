//! Quote computation.
//!
//! Pure derivation of the payable total from the entered amount, the flow's
//! fee rule and an optional conversion rate. Recomputed on every relevant
//! input change and replaced wholesale, never mutated in place.

use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Fee rule attached to a flow. Mirrors the tiers the platform charges:
/// nothing, a flat charge, or a percentage with an optional cap.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeRule {
    None,
    Flat(BigDecimal),
    Percent {
        percent: BigDecimal,
        cap: Option<BigDecimal>,
    },
}

impl FeeRule {
    fn fee_for(&self, gross: &BigDecimal) -> BigDecimal {
        match self {
            FeeRule::None => BigDecimal::zero(),
            FeeRule::Flat(flat) => flat.clone(),
            FeeRule::Percent { percent, cap } => {
                let mut fee = gross * percent / BigDecimal::from(100);
                if let Some(cap) = cap {
                    if &fee > cap {
                        fee = cap.clone();
                    }
                }
                fee
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub base_amount: BigDecimal,
    pub fee: BigDecimal,
    pub total: BigDecimal,
    pub currency: String,
    pub rate: Option<BigDecimal>,
}

/// Compute a quote from a raw amount string.
///
/// `total = base * rate + fee` (rate defaults to 1). Unparseable or negative
/// input is treated as zero; the function is total and never produces a
/// non-finite value. Currency totals carry 2 decimal places, rounded half-up.
pub fn compute_quote(
    raw_amount: &str,
    fee_rule: &FeeRule,
    rate: Option<&BigDecimal>,
    currency: &str,
) -> Quote {
    let base = parse_amount(raw_amount);
    let gross = match rate {
        Some(rate) if *rate > BigDecimal::zero() => &base * rate,
        Some(_) => BigDecimal::zero(),
        None => base.clone(),
    };
    let fee = fee_rule.fee_for(&gross);
    let total = &gross + &fee;

    Quote {
        base_amount: money_scale(&base),
        fee: money_scale(&fee),
        total: money_scale(&total),
        currency: currency.to_string(),
        rate: rate.cloned(),
    }
}

fn parse_amount(raw: &str) -> BigDecimal {
    match BigDecimal::from_str(raw.trim()) {
        Ok(amount) if amount > BigDecimal::zero() => amount,
        _ => BigDecimal::zero(),
    }
}

fn money_scale(amount: &BigDecimal) -> BigDecimal {
    amount.with_scale_round(2, bigdecimal::RoundingMode::HalfUp)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn simple_bill_total_is_base_plus_fee() {
        let quote = compute_quote("500", &FeeRule::Flat(dec("25")), None, "NGN");
        assert_eq!(quote.base_amount, dec("500.00"));
        assert_eq!(quote.fee, dec("25.00"));
        assert_eq!(quote.total, dec("525.00"));
        assert_eq!(quote.currency, "NGN");
    }

    #[test]
    fn conversion_total_is_base_times_rate() {
        let rate = dec("1500");
        let quote = compute_quote("100", &FeeRule::None, Some(&rate), "NGN");
        assert_eq!(quote.total, dec("150000.00"));
        assert_eq!(quote.rate, Some(rate));
    }

    #[test]
    fn percent_fee_is_capped() {
        let rule = FeeRule::Percent {
            percent: dec("1.4"),
            cap: Some(dec("2000")),
        };
        let small = compute_quote("100000", &rule, None, "NGN");
        assert_eq!(small.fee, dec("1400.00"));

        let large = compute_quote("1000000", &rule, None, "NGN");
        assert_eq!(large.fee, dec("2000.00"));
        assert_eq!(large.total, dec("1002000.00"));
    }

    #[test]
    fn garbage_and_negative_amounts_become_zero() {
        for raw in ["", "abc", "-50", "NaN", "12.3.4"] {
            let quote = compute_quote(raw, &FeeRule::Flat(dec("25")), None, "NGN");
            assert_eq!(quote.base_amount, dec("0.00"), "raw input {:?}", raw);
            assert_eq!(quote.total, dec("25.00"));
        }
    }

    #[test]
    fn currency_totals_round_to_two_places() {
        let rule = FeeRule::Percent {
            percent: dec("1.5"),
            cap: None,
        };
        let quote = compute_quote("333.33", &rule, None, "NGN");
        // 333.33 * 1.5% = 4.99995 -> 5.00
        assert_eq!(quote.fee, dec("5.00"));
        assert_eq!(quote.total, dec("338.33"));
    }
}
