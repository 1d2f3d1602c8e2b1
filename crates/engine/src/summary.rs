//! Income/expense totals and balance.
//!
//! Sums are exact decimals. Rounding happens once, on the final figures,
//! using round-half-even to 2 places.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::{MoneyCents, Transaction};

const MONEY_SCALE: u32 = 2;

/// Anything that carries a monetary amount the summary can add up.
///
/// Callers validate amounts before they get here (positive, numeric).
pub trait Amount {
    fn amount(&self) -> Decimal;
}

impl Amount for Decimal {
    fn amount(&self) -> Decimal {
        *self
    }
}

impl Amount for MoneyCents {
    fn amount(&self) -> Decimal {
        self.to_decimal()
    }
}

impl Amount for Transaction {
    fn amount(&self) -> Decimal {
        self.amount.to_decimal()
    }
}

impl<T: Amount + ?Sized> Amount for &T {
    fn amount(&self) -> Decimal {
        (**self).amount()
    }
}

/// Aggregate totals for a set of incomes and expenses.
///
/// `total_income` and `total_expenses` mirror `income_total` and
/// `expense_total` for clients that read the older key names.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub income_total: Decimal,
    pub expense_total: Decimal,
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub balance: Decimal,
}

/// Computes the totals and the balance (`income - expenses`).
///
/// ```rust
/// use engine::compute_summary;
/// use rust_decimal::Decimal;
///
/// let incomes = [Decimal::new(1000, 0)];
/// let expenses = [Decimal::new(250, 0), Decimal::new(905, 1)];
/// let summary = compute_summary(&incomes, &expenses);
/// assert_eq!(summary.income_total, Decimal::new(100000, 2));
/// assert_eq!(summary.expense_total, Decimal::new(34050, 2));
/// assert_eq!(summary.balance, Decimal::new(65950, 2));
/// ```
pub fn compute_summary<I, E>(incomes: &[I], expenses: &[E]) -> Summary
where
    I: Amount,
    E: Amount,
{
    let income_sum: Decimal = incomes.iter().map(Amount::amount).sum();
    let expense_sum: Decimal = expenses.iter().map(Amount::amount).sum();
    let balance = income_sum - expense_sum;

    let income_total = round_money(income_sum);
    let expense_total = round_money(expense_sum);

    Summary {
        income_total,
        expense_total,
        total_income: income_total,
        total_expenses: expense_total,
        balance: round_money(balance),
    }
}

fn round_money(value: Decimal) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointNearestEven);
    rounded.rescale(MONEY_SCALE);
    rounded
}
