//! Warning flags for a single expense.

use rust_decimal::Decimal;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpenseFlag {
    /// The expense alone is larger than the balance it is compared with.
    ExceedsBalance,
    /// The expense is at or above the large-expense threshold.
    LargeExpense,
}

impl ExpenseFlag {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExceedsBalance => "exceeds_balance",
            Self::LargeExpense => "large_expense",
        }
    }
}

/// Flags an expense against a balance (when known) and a threshold.
pub fn classify_expense(
    amount: Decimal,
    balance: Option<Decimal>,
    large_threshold: Decimal,
) -> Vec<ExpenseFlag> {
    let mut flags = Vec::new();
    if balance.is_some_and(|balance| amount > balance) {
        flags.push(ExpenseFlag::ExceedsBalance);
    }
    if amount >= large_threshold {
        flags.push(ExpenseFlag::LargeExpense);
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(value: i64) -> Decimal {
        Decimal::new(value, 0)
    }

    #[test]
    fn normal_expense_has_no_flags() {
        assert!(classify_expense(dec(50), Some(dec(1000)), dec(500)).is_empty());
    }

    #[test]
    fn large_within_balance() {
        assert_eq!(
            classify_expense(dec(600), Some(dec(2000)), dec(500)),
            [ExpenseFlag::LargeExpense]
        );
    }

    #[test]
    fn exceeds_balance_without_being_large() {
        assert_eq!(
            classify_expense(dec(900), Some(dec(800)), dec(1000)),
            [ExpenseFlag::ExceedsBalance]
        );
    }

    #[test]
    fn both_flags() {
        assert_eq!(
            classify_expense(dec(1500), Some(dec(1000)), dec(500)),
            [ExpenseFlag::ExceedsBalance, ExpenseFlag::LargeExpense]
        );
    }

    #[test]
    fn unknown_balance_only_checks_threshold() {
        assert_eq!(
            classify_expense(dec(600), None, dec(500)),
            [ExpenseFlag::LargeExpense]
        );
    }

    #[test]
    fn threshold_is_inclusive() {
        assert!(classify_expense(dec(500), Some(dec(1000)), dec(500))
            .contains(&ExpenseFlag::LargeExpense));
    }
}
