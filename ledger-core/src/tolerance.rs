//! Rounding tolerance shared by the ledger and the minimizer
//!
//! Balances and amounts whose magnitude is below [`EPSILON`] count as zero.

use rust_decimal::{Decimal, RoundingStrategy};

/// Tolerance (0.01, same unit as amounts)
pub const EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Amount is owed to the holder (strictly above tolerance)
pub fn is_positive(amount: Decimal) -> bool {
    amount > EPSILON
}

/// Amount is owed by the holder (strictly below minus tolerance)
pub fn is_negative(amount: Decimal) -> bool {
    amount < -EPSILON
}

/// Magnitude is below tolerance
pub fn is_negligible(amount: Decimal) -> bool {
    amount.abs() < EPSILON
}

/// Σ of amounts, or `None` if the total leaves the `Decimal` range
pub fn checked_sum(amounts: impl IntoIterator<Item = Decimal>) -> Option<Decimal> {
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |total, amount| total.checked_add(amount))
}

/// Round to cents for display.
pub fn round_amount(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epsilon_value() {
        assert_eq!(EPSILON, Decimal::new(1, 2));
    }

    #[test]
    fn test_thresholds() {
        // Exactly epsilon is neither creditor nor debtor
        assert!(!is_positive(EPSILON));
        assert!(!is_negative(-EPSILON));
        assert!(!is_negligible(EPSILON));

        assert!(is_positive(Decimal::new(2, 2)));
        assert!(is_negative(Decimal::new(-2, 2)));
        assert!(is_negligible(Decimal::new(5, 3)));
        assert!(is_negligible(Decimal::new(-5, 3)));
    }

    #[test]
    fn test_checked_sum() {
        assert_eq!(
            checked_sum([Decimal::new(1050, 2), Decimal::new(-50, 2)]),
            Some(Decimal::new(10, 0))
        );
        assert_eq!(checked_sum([]), Some(Decimal::ZERO));
        assert_eq!(checked_sum([Decimal::MAX, Decimal::ONE]), None);
    }

    #[test]
    fn test_round_amount() {
        assert_eq!(round_amount(Decimal::new(33335, 3)), Decimal::new(3334, 2));
        assert_eq!(round_amount(Decimal::new(-33335, 3)), Decimal::new(-3334, 2));
        assert_eq!(round_amount(Decimal::new(10, 0)), Decimal::new(10, 0));
    }
}
