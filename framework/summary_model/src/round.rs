/// Round `value` to `decimals` places, resolving ties toward positive infinity.
///
/// The rounding works on the shortest decimal representation of the value rather than on its
/// binary expansion, so `2.345` is treated as the decimal `2.345` (and rounds to `2.35`) even
/// though the nearest `f64` is slightly below it. Ties on negative values round toward zero, so
/// `-2.345` becomes `-2.34`.
///
/// Non-finite values are returned unchanged, as are values too large to carry `decimals` places.
pub fn round_half_up(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    if value == 0.0 {
        return 0.0;
    }

    let repr = value.abs().to_string();
    let (int_part, frac_part) = repr.split_once('.').unwrap_or((repr.as_str(), ""));
    let places = decimals as usize;
    if int_part.len() + places > 30 {
        return value;
    }

    let kept = frac_part
        .chars()
        .chain(std::iter::repeat('0'))
        .take(places)
        .collect::<String>();
    let dropped = frac_part.get(places..).unwrap_or("").as_bytes();

    let mut scaled = match format!("{int_part}{kept}").parse::<i128>() {
        Ok(scaled) => scaled,
        Err(_) => return value,
    };

    let first_dropped = dropped.first().map(|b| b - b'0').unwrap_or(0);
    let beyond_half = dropped.iter().skip(1).any(|b| *b != b'0');
    let round_up = if value.is_sign_positive() {
        first_dropped >= 5
    } else {
        first_dropped > 5 || (first_dropped == 5 && beyond_half)
    };
    if round_up {
        scaled += 1;
    }

    let magnitude = scaled as f64 / 10f64.powi(decimals as i32);
    if magnitude == 0.0 {
        0.0
    } else if value.is_sign_negative() {
        -magnitude
    } else {
        magnitude
    }
}
