// 10.1 curve.rs: the sampled power table behind convex bonding curves.
//
// T(a, s) = (s / 1000)^(a / 1000), rounded to 18 fractional digits. rows are
// generated on first use and shared for the life of the process, so every
// node computes the exact same decimals.

use rust_decimal::prelude::*;
use std::sync::OnceLock;

/// Samples per unit of supply ratio.
pub const SUPPLY_RATIO_SAMPLES: i64 = 1000;

/// Samples per unit of exponent.
pub const AR_SAMPLES: i64 = 1000;

/// Largest AR a pool may declare.
pub const MAX_AR: i64 = 5000;

/// Exponent rows in the table. Convex pools read rows `ar` and `ar + 1000`.
pub const TABLE_ROWS: usize = (MAX_AR + AR_SAMPLES + 1) as usize;

const ROW_LEN: usize = SUPPLY_RATIO_SAMPLES as usize + 1;

fn table() -> &'static [OnceLock<Box<[Decimal]>>] {
    static TABLE: OnceLock<Vec<OnceLock<Box<[Decimal]>>>> = OnceLock::new();
    TABLE.get_or_init(|| (0..TABLE_ROWS).map(|_| OnceLock::new()).collect())
}

fn compute(a: i64, s: i64) -> Decimal {
    if a == 0 || s == SUPPLY_RATIO_SAMPLES {
        return Decimal::ONE;
    }
    if s == 0 {
        return Decimal::ZERO;
    }
    let base = Decimal::new(s, 3);
    let value = if a % AR_SAMPLES == 0 {
        base.checked_powi(a / AR_SAMPLES)
    } else {
        base.checked_powd(Decimal::new(a, 3))
    };
    // values this small vanish at 18 digits anyway
    value
        .unwrap_or(Decimal::ZERO)
        .round_dp_with_strategy(18, RoundingStrategy::MidpointAwayFromZero)
}

fn row(a: usize) -> &'static [Decimal] {
    table()[a].get_or_init(|| {
        let a = a as i64;
        (0..ROW_LEN as i64).map(|s| compute(a, s)).collect()
    })
}

/// `T(a, s)`. None outside `0..TABLE_ROWS` x `0..=1000`.
pub fn lookup(a: i64, s: i64) -> Option<Decimal> {
    let a = usize::try_from(a).ok().filter(|a| *a < TABLE_ROWS)?;
    let s = usize::try_from(s).ok().filter(|s| *s < ROW_LEN)?;
    Some(row(a)[s])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn edges() {
        assert_eq!(lookup(0, 0), Some(Decimal::ONE));
        assert_eq!(lookup(0, 537), Some(Decimal::ONE));
        assert_eq!(lookup(1, 0), Some(Decimal::ZERO));
        assert_eq!(lookup(4321, 1000), Some(Decimal::ONE));
        assert_eq!(lookup(-1, 10), None);
        assert_eq!(lookup(0, 1001), None);
        assert_eq!(lookup(TABLE_ROWS as i64, 10), None);
        assert!(lookup(MAX_AR + AR_SAMPLES, 999).is_some());
    }

    #[test]
    fn integer_exponents_are_exact() {
        assert_eq!(lookup(1000, 500), Some(dec!(0.5)));
        assert_eq!(lookup(2000, 500), Some(dec!(0.25)));
        assert_eq!(lookup(3000, 100), Some(dec!(0.001)));
    }

    #[test]
    fn fractional_exponent() {
        let half = lookup(500, 250).unwrap();
        assert!((half - dec!(0.5)).abs() < dec!(0.000000001));
    }

    #[test]
    fn monotone_in_supply() {
        for a in [1, 999, 1500, 6000] {
            let mut prev = Decimal::ZERO;
            for s in 1..=1000 {
                let v = lookup(a, s).unwrap();
                assert!(v >= prev, "T({a}, {s}) decreased");
                prev = v;
            }
        }
    }

    #[test]
    fn rows_are_stable() {
        assert_eq!(lookup(1234, 567), lookup(1234, 567));
        assert!(lookup(1234, 567).unwrap().scale() <= 18);
    }
}
