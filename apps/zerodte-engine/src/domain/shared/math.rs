//! Decimal statistics helpers.

use rust_decimal::Decimal;

const TWO: Decimal = Decimal::from_parts(2, 0, 0, false, 0);
const TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 10);

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    let sum: Decimal = values.iter().sum();
    Some(sum / Decimal::from(values.len() as u64))
}

/// Sample standard deviation, `None` with fewer than two values.
pub fn std_dev(values: &[Decimal]) -> Option<Decimal> {
    if values.len() < 2 {
        return None;
    }

    let avg = mean(values)?;
    let variance_sum: Decimal = values.iter().map(|v| (*v - avg) * (*v - avg)).sum();
    let variance = variance_sum / Decimal::from((values.len() - 1) as u64);

    sqrt_decimal(variance)
}

/// Square root by Newton iteration.
pub fn sqrt_decimal(value: Decimal) -> Option<Decimal> {
    if value < Decimal::ZERO {
        return None;
    }
    if value == Decimal::ZERO {
        return Some(Decimal::ZERO);
    }

    let mut guess = if value > Decimal::ONE { value / TWO } else { Decimal::ONE };

    for _ in 0..100 {
        let next = (guess + value / guess) / TWO;
        if (next - guess).abs() < TOLERANCE {
            return Some(next);
        }
        guess = next;
    }

    Some(guess)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[dec!(10), dec!(20), dec!(30)]), Some(dec!(20)));
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn test_std_dev() {
        let sd = std_dev(&[dec!(2), dec!(4), dec!(4), dec!(4), dec!(5), dec!(5), dec!(7), dec!(9)])
            .unwrap();
        // Sample std dev = sqrt(32/7)
        assert!((sd - dec!(2.138089935)).abs() < dec!(0.000001));
        assert_eq!(std_dev(&[dec!(1)]), None);
    }

    #[test]
    fn test_sqrt_decimal() {
        assert!((sqrt_decimal(dec!(252)).unwrap() - dec!(15.874507866)).abs() < dec!(0.000001));
        assert!((sqrt_decimal(dec!(0.25)).unwrap() - dec!(0.5)).abs() < dec!(0.000001));
        assert_eq!(sqrt_decimal(Decimal::ZERO), Some(Decimal::ZERO));
        assert_eq!(sqrt_decimal(dec!(-1)), None);
    }
}
