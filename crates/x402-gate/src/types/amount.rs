/// Errors raised when converting a decimal price string to base units.
#[derive(Debug, thiserror::Error)]
pub enum PriceError {
    #[error("Malformed price: '{0}'")]
    Malformed(String),

    #[error("Negative price: '{0}'")]
    Negative(String),

    #[error("Price out of range: '{0}'")]
    Overflow(String),
}

/// Convert a decimal price string to integer base units.
///
/// Splits on `.`, right-pads the fractional part to `decimals` digits and
/// truncates anything beyond, then combines with integer arithmetic only.
/// Binary floating point never enters the computation.
pub fn price_to_base_units(price: &str, decimals: u8) -> Result<u64, PriceError> {
    let s = price.trim();
    if s.is_empty() {
        return Err(PriceError::Malformed(price.to_string()));
    }
    if s.starts_with('-') {
        return Err(PriceError::Negative(price.to_string()));
    }

    let (whole, frac) = match s.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (s, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(PriceError::Malformed(price.to_string()));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(PriceError::Malformed(price.to_string()));
    }

    let mut padded: String = frac.chars().take(decimals as usize).collect();
    while padded.len() < decimals as usize {
        padded.push('0');
    }

    let whole: u128 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .map_err(|_| PriceError::Overflow(price.to_string()))?
    };
    let frac: u128 = if padded.is_empty() {
        0
    } else {
        padded
            .parse()
            .map_err(|_| PriceError::Overflow(price.to_string()))?
    };

    let scale = 10u128.pow(decimals as u32);
    let units = whole
        .checked_mul(scale)
        .and_then(|w| w.checked_add(frac))
        .ok_or_else(|| PriceError::Overflow(price.to_string()))?;

    u64::try_from(units).map_err(|_| PriceError::Overflow(price.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usdc_prices() {
        assert_eq!(price_to_base_units("1.5", 6).unwrap(), 1_500_000);
        assert_eq!(price_to_base_units("0.001", 6).unwrap(), 1_000);
        assert_eq!(price_to_base_units("0", 6).unwrap(), 0);
        assert_eq!(price_to_base_units("10", 6).unwrap(), 10_000_000);
        assert_eq!(price_to_base_units(".5", 6).unwrap(), 500_000);
        assert_eq!(price_to_base_units("2.", 6).unwrap(), 2_000_000);
    }

    #[test]
    fn test_excess_fraction_truncates() {
        assert_eq!(price_to_base_units("0.1234567", 6).unwrap(), 123_456);
    }

    #[test]
    fn test_malformed() {
        for bad in ["", " ", "1.2.3", "abc", "1,5", "1e3", "0x10"] {
            assert!(
                price_to_base_units(bad, 6).is_err(),
                "expected error for {bad:?}"
            );
        }
    }

    #[test]
    fn test_negative() {
        assert!(matches!(
            price_to_base_units("-1", 6),
            Err(PriceError::Negative(_))
        ));
    }

    #[test]
    fn test_overflow() {
        assert!(matches!(
            price_to_base_units("99999999999999999999", 6),
            Err(PriceError::Overflow(_))
        ));
    }
}
