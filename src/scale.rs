/// Light-to-dark red ramp (ColorBrewer Reds, 9 classes), interpolated
/// piecewise-linearly in RGB.
const REDS: [&str; 9] = [
    "#fff5f0", "#fee0d2", "#fcbba1", "#fc9272", "#fb6a4a", "#ef3b2c",
    "#cb181d", "#a50f15", "#67000d",
];

/// Maps case counts to ramp colors on a logarithmic axis.
///
/// Case counts are heavy-tailed, so the domain is log-transformed; a linear
/// scale would saturate almost every region to the same shade. The domain
/// minimum is pinned at 1 (log is undefined at 0); a count of exactly 0
/// means "no data" and bypasses the scale entirely.
pub struct CaseScale {
    min: f64,
    max: f64,
}

impl CaseScale {
    pub fn from_max(max_cases: u32) -> Self {
        Self {
            min: 1.0,
            max: (max_cases as f64).max(1.0),
        }
    }

    /// Domain endpoints (min is always exactly 1).
    pub fn domain(&self) -> (f64, f64) {
        (self.min, self.max)
    }

    /// Ramp color for a case count; None for 0, which the caller renders
    /// with the designated no-data fill.
    pub fn color(&self, cases: u32) -> Option<String> {
        if cases == 0 {
            return None;
        }
        Some(self.color_at(cases as f64))
    }

    /// Ramp color at an arbitrary domain position, clamped into the domain.
    /// Used by the legend, whose generated cell values are fractional.
    pub fn color_at(&self, value: f64) -> String {
        let value = value.clamp(self.min, self.max);
        let span = self.max.ln() - self.min.ln();
        let t = if span > 0.0 {
            (value.ln() - self.min.ln()) / span
        } else {
            1.0
        };
        ramp(t)
    }
}

/// Interpolate the ramp at t in [0, 1].
fn ramp(t: f64) -> String {
    let t = t.clamp(0.0, 1.0);
    let scaled = t * (REDS.len() - 1) as f64;
    let lo = scaled.floor() as usize;
    let hi = (lo + 1).min(REDS.len() - 1);
    let frac = scaled - lo as f64;

    let (r0, g0, b0) = hex_to_rgb(REDS[lo]);
    let (r1, g1, b1) = hex_to_rgb(REDS[hi]);

    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
    format!("#{:02x}{:02x}{:02x}", lerp(r0, r1), lerp(g0, g1), lerp(b0, b1))
}

fn hex_to_rgb(hex: &str) -> (u8, u8, u8) {
    let hex = hex.trim_start_matches('#');
    let r = u8::from_str_radix(&hex[0..2], 16).unwrap_or(0);
    let g = u8::from_str_radix(&hex[2..4], 16).unwrap_or(0);
    let b = u8::from_str_radix(&hex[4..6], 16).unwrap_or(0);
    (r, g, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_minimum_is_pinned_at_one() {
        assert_eq!(CaseScale::from_max(150_000).domain().0, 1.0);
        assert_eq!(CaseScale::from_max(0).domain(), (1.0, 1.0));
    }

    #[test]
    fn zero_bypasses_the_scale() {
        let scale = CaseScale::from_max(1000);
        assert_eq!(scale.color(0), None);
        assert!(scale.color(1).is_some());
    }

    #[test]
    fn endpoints_hit_the_ramp_ends() {
        let scale = CaseScale::from_max(1000);
        assert_eq!(scale.color(1).unwrap(), "#fff5f0");
        assert_eq!(scale.color(1000).unwrap(), "#67000d");
    }

    #[test]
    fn darkness_is_monotone_in_cases() {
        let scale = CaseScale::from_max(100_000);
        // The red channel of the ramp decreases toward the dark end.
        let red = |c: &str| u8::from_str_radix(&c[1..3], 16).unwrap();
        let mut previous = u8::MAX;
        for cases in [1u32, 10, 100, 1_000, 10_000, 100_000] {
            let r = red(&scale.color(cases).unwrap());
            assert!(r <= previous, "red channel rose at {} cases", cases);
            previous = r;
        }
    }

    #[test]
    fn values_above_the_domain_clamp_to_the_dark_end() {
        let scale = CaseScale::from_max(100);
        assert_eq!(scale.color(5000).unwrap(), "#67000d");
    }

    #[test]
    fn degenerate_domain_maps_everything_dark() {
        let scale = CaseScale::from_max(1);
        assert_eq!(scale.color(1).unwrap(), "#67000d");
    }

    #[test]
    fn hex_parsing_round_trips() {
        assert_eq!(hex_to_rgb("#fb6a4a"), (0xfb, 0x6a, 0x4a));
    }
}
