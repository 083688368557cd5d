//! Age-based brightness falloff.
//!
//! The newest point has age 0 and full brightness; age grows linearly toward the
//! oldest point. Brightness is `(1 - age) ^ exponent`, so a larger exponent gives a
//! shorter visible trail.

/// Below this a primitive would round to a black pixel and is not drawn.
pub const VISIBILITY_THRESHOLD: f64 = 1.0 / 255.0;

/// Age of the point at `index` in a snapshot of `count` points ordered oldest first.
///
/// The newest point (`count - 1`) has age 0, the oldest has age `(count - 1) / count`.
pub fn age(index: usize, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    let from_newest = count.saturating_sub(1).saturating_sub(index);
    from_newest as f64 / count as f64
}

/// Brightness in `[0, 1]` for a point of the given age.
pub fn brightness(age: f64, exponent: f64) -> f64 {
    let exponent = exponent.max(0.0);
    let base = (1.0 - age).clamp(0.0, 1.0);
    // powf(0.0) is 1 for every base, including 0
    base.powf(exponent).clamp(0.0, 1.0)
}

/// Extra attenuation for a segment spanning `distance` pixels.
///
/// Long jumps between consecutive points are slew lines joining unrelated
/// transients; they fade as `exp(-distance / damping)`. A non-positive damping
/// disables the effect.
pub fn slew_attenuation(distance: f64, damping: f64) -> f64 {
    if damping <= 0.0 {
        return 1.0;
    }
    (-distance / damping).exp()
}

pub fn is_visible(brightness: f64) -> bool {
    brightness >= VISIBILITY_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_age_zero_is_full_brightness() {
        for exponent in [0.0, 0.5, 1.0, 6.0, 50.0] {
            assert_eq!(brightness(0.0, exponent), 1.0);
        }
    }

    #[test]
    fn test_exponent_six_at_half_age() {
        assert_eq!(brightness(0.5, 6.0), 0.015625);
    }

    #[test]
    fn test_exponent_zero_is_constant() {
        for age in [0.0, 0.25, 0.5, 0.999, 1.0] {
            assert_eq!(brightness(age, 0.0), 1.0);
        }
    }

    #[test]
    fn test_brightness_is_non_increasing_in_age() {
        for exponent in [0.1, 1.0, 3.0, 6.0, 50.0] {
            let mut previous = f64::INFINITY;
            for step in 0..=1000 {
                let b = brightness(step as f64 / 1000.0, exponent);
                assert!((0.0..=1.0).contains(&b));
                assert!(b <= previous, "exponent {exponent} step {step}");
                previous = b;
            }
        }
    }

    #[test]
    fn test_out_of_range_inputs_stay_finite() {
        assert_eq!(brightness(1.5, 3.0), 0.0);
        assert_eq!(brightness(-1.0, 3.0), 1.0);
        assert_eq!(brightness(0.5, -2.0), 1.0);
    }

    #[test]
    fn test_age_runs_from_newest() {
        assert_eq!(age(3, 4), 0.0);
        assert_eq!(age(0, 4), 0.75);
        assert_eq!(age(1, 4), 0.5);
        assert_eq!(age(0, 1), 0.0);
        assert_eq!(age(0, 0), 0.0);
    }

    #[test]
    fn test_slew_attenuation() {
        assert_eq!(slew_attenuation(0.0, 24.0), 1.0);
        assert_eq!(slew_attenuation(100.0, 0.0), 1.0);
        assert!(slew_attenuation(48.0, 24.0) < slew_attenuation(24.0, 24.0));
        assert!((slew_attenuation(24.0, 24.0) - (-1.0f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn test_visibility_threshold() {
        assert!(is_visible(1.0));
        assert!(is_visible(VISIBILITY_THRESHOLD));
        assert!(!is_visible(0.001));
    }
}
