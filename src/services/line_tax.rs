//! Pro-rata allocation of a voucher's tax across its item lines.

use rust_decimal::{Decimal, RoundingStrategy};

/// Spread `voucher_tax` over lines in proportion to their basic amounts.
///
/// Each share is rounded to 2 places; the rounding residual lands on the
/// last line so the shares always sum exactly to `voucher_tax`. A zero
/// basic sum allocates nothing.
pub fn allocate_line_tax(line_basics: &[Decimal], voucher_tax: Decimal) -> Vec<Decimal> {
    if line_basics.is_empty() {
        return Vec::new();
    }

    let basic_sum: Decimal = line_basics.iter().copied().sum();
    if basic_sum.is_zero() || voucher_tax.is_zero() {
        return vec![Decimal::ZERO; line_basics.len()];
    }

    let mut shares = Vec::with_capacity(line_basics.len());
    let mut allocated = Decimal::ZERO;

    for (i, basic) in line_basics.iter().enumerate() {
        let share = if i + 1 == line_basics.len() {
            voucher_tax - allocated
        } else {
            (basic / basic_sum * voucher_tax)
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        };
        allocated += share;
        shares.push(share);
    }

    shares
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn proportional_allocation() {
        let shares = allocate_line_tax(&[dec!(100), dec!(300)], dec!(72.00));
        assert_eq!(shares, vec![dec!(18.00), dec!(54.00)]);
    }

    #[test]
    fn residual_lands_on_last_line() {
        // Three equal thirds of 100.00 cannot round evenly.
        let shares = allocate_line_tax(&[dec!(1), dec!(1), dec!(1)], dec!(100.00));
        assert_eq!(shares[0], dec!(33.33));
        assert_eq!(shares[1], dec!(33.33));
        assert_eq!(shares[2], dec!(33.34));
        let total: Decimal = shares.iter().copied().sum();
        assert_eq!(total, dec!(100.00));
    }

    #[test]
    fn zero_basic_sum_allocates_nothing() {
        let shares = allocate_line_tax(&[dec!(0), dec!(0)], dec!(18.00));
        assert_eq!(shares, vec![Decimal::ZERO, Decimal::ZERO]);
    }

    #[test]
    fn negative_tax_for_credit_notes() {
        let shares = allocate_line_tax(&[dec!(-100), dec!(-100)], dec!(-36.00));
        assert_eq!(shares, vec![dec!(-18.00), dec!(-18.00)]);
        assert!(shares.iter().all(|s| *s <= Decimal::ZERO));
    }

    #[test]
    fn empty_lines() {
        assert!(allocate_line_tax(&[], dec!(18.00)).is_empty());
    }
}
