//! # Money/Tax Calculator
//!
//! Pure functions computing line and document totals (HT / TVA / TTC).
//!
//! ## Rounding Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  LINE                                                                   │
//! │    HT  = round(quantity × unit_price × (1 - discount))                  │
//! │    TVA = round(HT × rate)            ← from the ROUNDED HT              │
//! │    TTC = HT + TVA                                                       │
//! │                                                                         │
//! │  DOCUMENT                                                               │
//! │    gross HT      = Σ line HT                                            │
//! │    HT            = round(gross HT × (1 - global discount))              │
//! │    global disc.  = gross HT - HT                                        │
//! │    TVA           = Σ line TVA        ← NOT reduced by global discount   │
//! │    TTC           = HT + TVA                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every `round` is half-up to the franc, computed in i128.

use crate::document::{DocumentLine, DocumentTotals, LineAmounts};
use crate::error::{CoreResult, ValidationError};
use crate::money::{round_div, Money, BPS_SCALE};
use crate::types::{Percentage, TaxRate};
use crate::validation::{validate_discount, validate_quantity, validate_tax_rate, validate_unit_price};

fn to_money(value: i128, field: &str) -> CoreResult<Money> {
    i64::try_from(value)
        .map(Money::from_minor)
        .map_err(|_| {
            ValidationError::OutOfRange {
                field: field.to_string(),
                min: 0,
                max: i64::MAX,
            }
            .into()
        })
}

/// Computes HT, TVA and TTC for one line.
///
/// Rejects a quantity ≤ 0, a negative unit price, a discount outside
/// [0, 100] % and any rate other than 0 % or 18 %.
///
/// ```rust
/// use teranga_core::calculator::compute_line;
/// use teranga_core::money::Money;
/// use teranga_core::types::{Percentage, TaxRate};
///
/// let amounts = compute_line(3, Money::from_minor(1_500), Percentage::from_percent(10), TaxRate::STANDARD).unwrap();
/// assert_eq!(amounts.ht.minor(), 4_050);
/// assert_eq!(amounts.tax.minor(), 729);
/// assert_eq!(amounts.ttc.minor(), 4_779);
/// ```
pub fn compute_line(
    quantity: i64,
    unit_price: Money,
    discount: Percentage,
    tax_rate: TaxRate,
) -> CoreResult<LineAmounts> {
    validate_quantity(quantity)?;
    validate_unit_price(unit_price)?;
    validate_discount(discount)?;
    validate_tax_rate(tax_rate)?;

    let gross = quantity as i128 * unit_price.minor() as i128;
    let ht = to_money(
        round_div(gross * (BPS_SCALE - discount.bps() as i128), BPS_SCALE),
        "amount_ht",
    )?;
    let tax = ht.calculate_tax(tax_rate);

    Ok(LineAmounts {
        ht,
        tax,
        ttc: ht + tax,
    })
}

/// Aggregates already-computed line amounts into document totals.
pub fn compute_document_totals(
    lines: &[DocumentLine],
    global_discount: Percentage,
) -> CoreResult<DocumentTotals> {
    validate_discount(global_discount)?;

    let gross_ht: i128 = lines.iter().map(|l| l.amounts.ht.minor() as i128).sum();
    let total_tax: i128 = lines.iter().map(|l| l.amounts.tax.minor() as i128).sum();

    let gross_ht = to_money(gross_ht, "total_ht")?;
    let total_tax = to_money(total_tax, "total_tax")?;
    let total_ht = gross_ht.apply_discount(global_discount);

    Ok(DocumentTotals {
        total_ht,
        total_tax,
        total_ttc: total_ht + total_tax,
        global_discount_amount: gross_ht - total_ht,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentLine, LineInput};
    use crate::error::CoreError;
    use proptest::prelude::*;

    fn line(quantity: i64, price: i64, discount_bps: u32, rate: TaxRate) -> DocumentLine {
        DocumentLine::from_input(LineInput {
            product_id: "P1".to_string(),
            designation: "Article".to_string(),
            quantity,
            unit_price: Money::from_minor(price),
            discount: Percentage::from_bps(discount_bps),
            tax_rate: rate,
            source_line_id: None,
        })
        .unwrap()
    }

    #[test]
    fn test_line_without_discount() {
        let amounts = compute_line(10, Money::from_minor(1_000), Percentage::zero(), TaxRate::STANDARD).unwrap();
        assert_eq!(amounts.ht.minor(), 10_000);
        assert_eq!(amounts.tax.minor(), 1_800);
        assert_eq!(amounts.ttc.minor(), 11_800);
    }

    #[test]
    fn test_tax_is_computed_from_rounded_ht() {
        // 7 × 333 × 97.5 % = 2 272.725 → 2 273 ; 18 % of 2 273 = 409.14 → 409
        let amounts = compute_line(7, Money::from_minor(333), Percentage::from_bps(250), TaxRate::STANDARD).unwrap();
        assert_eq!(amounts.ht.minor(), 2_273);
        assert_eq!(amounts.tax.minor(), 409);
        assert_eq!(amounts.ttc.minor(), 2_682);
    }

    #[test]
    fn test_exempt_line_has_no_tax() {
        let amounts = compute_line(2, Money::from_minor(5_000), Percentage::zero(), TaxRate::EXEMPT).unwrap();
        assert!(amounts.tax.is_zero());
        assert_eq!(amounts.ttc, amounts.ht);
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        let zero_qty = compute_line(0, Money::from_minor(100), Percentage::zero(), TaxRate::STANDARD);
        assert!(matches!(zero_qty, Err(CoreError::Validation(_))));

        let negative_price = compute_line(1, Money::from_minor(-1), Percentage::zero(), TaxRate::STANDARD);
        assert!(negative_price.is_err());

        let big_discount = compute_line(1, Money::from_minor(100), Percentage::from_bps(10_001), TaxRate::STANDARD);
        assert!(big_discount.is_err());

        let odd_rate = compute_line(1, Money::from_minor(100), Percentage::zero(), TaxRate::from_bps(1_000));
        assert!(odd_rate.is_err());
    }

    #[test]
    fn test_global_discount_applies_to_sum_and_keeps_tax() {
        let lines = vec![
            line(1, 10_000, 0, TaxRate::STANDARD),
            line(3, 1_001, 0, TaxRate::EXEMPT),
        ];
        let totals = compute_document_totals(&lines, Percentage::from_percent(10)).unwrap();

        // gross 13 003 → 11 702.7 → 11 703
        assert_eq!(totals.total_ht.minor(), 11_703);
        assert_eq!(totals.global_discount_amount.minor(), 1_300);
        assert_eq!(totals.total_tax.minor(), 1_800);
        assert_eq!(totals.total_ttc.minor(), 13_503);
    }

    #[test]
    fn test_totals_without_global_discount() {
        let lines = vec![line(1, 10_000, 0, TaxRate::STANDARD)];
        let totals = compute_document_totals(&lines, Percentage::zero()).unwrap();
        assert_eq!(totals.total_ht.minor(), 10_000);
        assert_eq!(totals.total_tax.minor(), 1_800);
        assert_eq!(totals.total_ttc.minor(), 11_800);
        assert!(totals.global_discount_amount.is_zero());
    }

    proptest! {
        #[test]
        fn prop_line_totals_are_consistent(
            quantity in 1i64..10_000,
            price in 0i64..50_000_000,
            discount in 0u32..=10_000,
            exempt in any::<bool>(),
        ) {
            let rate = if exempt { TaxRate::EXEMPT } else { TaxRate::STANDARD };
            let amounts = compute_line(quantity, Money::from_minor(price), Percentage::from_bps(discount), rate).unwrap();
            prop_assert_eq!(amounts.ht + amounts.tax, amounts.ttc);
            prop_assert!(!amounts.ht.is_negative());
            prop_assert!(!amounts.tax.is_negative());
            prop_assert!(amounts.ht.minor() <= quantity * price);
        }

        #[test]
        fn prop_document_totals_are_consistent(
            specs in prop::collection::vec((1i64..100, 0i64..1_000_000, 0u32..=10_000), 1..8),
            global in 0u32..=10_000,
        ) {
            let lines: Vec<DocumentLine> = specs
                .iter()
                .map(|(q, p, d)| line(*q, *p, *d, TaxRate::STANDARD))
                .collect();
            let totals = compute_document_totals(&lines, Percentage::from_bps(global)).unwrap();
            prop_assert_eq!(totals.total_ht + totals.total_tax, totals.total_ttc);
            prop_assert!(!totals.total_ht.is_negative());
            prop_assert!(!totals.global_discount_amount.is_negative());

            let again = compute_document_totals(&lines, Percentage::from_bps(global)).unwrap();
            prop_assert_eq!(totals, again);
        }
    }
}
