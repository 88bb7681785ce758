use serde::Serialize;

use crate::config::SizeScaleKind;

/// Continuous linear mapping from a data domain onto a pixel range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearScale {
    pub domain: [f32; 2],
    pub range: [f32; 2],
}

impl LinearScale {
    pub fn new(domain: [f32; 2], range: [f32; 2]) -> Self {
        Self { domain, range }
    }

    pub fn apply(&self, value: f32) -> f32 {
        let span = self.domain[1] - self.domain[0];
        if span == 0.0 {
            return (self.range[0] + self.range[1]) / 2.0;
        }
        let t = (value - self.domain[0]) / span;
        self.range[0] + t * (self.range[1] - self.range[0])
    }

    pub fn invert(&self, pixel: f32) -> f32 {
        let span = self.range[1] - self.range[0];
        if span == 0.0 {
            return (self.domain[0] + self.domain[1]) / 2.0;
        }
        let t = (pixel - self.range[0]) / span;
        self.domain[0] + t * (self.domain[1] - self.domain[0])
    }

    /// Pixels per data unit.
    pub fn factor(&self) -> f32 {
        let span = self.domain[1] - self.domain[0];
        if span == 0.0 {
            0.0
        } else {
            (self.range[1] - self.range[0]) / span
        }
    }

    pub fn apply_round(&self, value: f32) -> f32 {
        self.apply(value).round()
    }
}

/// Maps node size values onto radii.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SizeScale {
    pub kind: SizeScaleKind,
    pub domain: [f32; 2],
    pub range: [f32; 2],
}

impl SizeScale {
    pub fn new(kind: SizeScaleKind, domain: [f32; 2], range: [f32; 2]) -> Self {
        Self {
            kind,
            domain,
            range,
        }
    }

    fn exponent(&self) -> f32 {
        match self.kind {
            SizeScaleKind::Linear => 1.0,
            SizeScaleKind::Sqrt => 0.5,
            SizeScaleKind::Pow { exponent } => exponent,
        }
    }

    fn transform(&self, value: f32) -> f32 {
        let exponent = self.exponent();
        if exponent == 1.0 {
            value
        } else {
            value.signum() * value.abs().powf(exponent)
        }
    }

    pub fn apply(&self, value: f32) -> f32 {
        let lo = self.transform(self.domain[0]);
        let hi = self.transform(self.domain[1]);
        let span = hi - lo;
        if span == 0.0 || !span.is_finite() {
            return self.range[0];
        }
        let t = (self.transform(value) - lo) / span;
        self.range[0] + t * (self.range[1] - self.range[0])
    }
}

/// Smallest and largest finite value, `None` when there is none.
pub fn extent<I>(values: I) -> Option<[f32; 2]>
where
    I: IntoIterator<Item = f32>,
{
    values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some([v, v]),
            Some([lo, hi]) => Some([lo.min(v), hi.max(v)]),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_scale_round_trips_through_invert() {
        let scale = LinearScale::new([0.0, 10.0], [20.0, 120.0]);
        assert_eq!(scale.apply(5.0), 70.0);
        assert_eq!(scale.invert(70.0), 5.0);
        assert_eq!(scale.factor(), 10.0);
    }

    #[test]
    fn flat_domain_maps_to_range_midpoint() {
        let scale = LinearScale::new([3.0, 3.0], [0.0, 100.0]);
        assert_eq!(scale.apply(3.0), 50.0);
        assert_eq!(scale.factor(), 0.0);
    }

    #[test]
    fn sqrt_scale_compresses_large_values() {
        let scale = SizeScale::new(SizeScaleKind::Sqrt, [0.0, 100.0], [0.0, 10.0]);
        assert!((scale.apply(25.0) - 5.0).abs() < 1e-5);
        let linear = SizeScale::new(SizeScaleKind::Linear, [0.0, 100.0], [0.0, 10.0]);
        assert!((linear.apply(25.0) - 2.5).abs() < 1e-5);
    }

    #[test]
    fn flat_size_domain_uses_lower_range() {
        let scale = SizeScale::new(SizeScaleKind::Sqrt, [1.0, 1.0], [8.0, 4.0]);
        assert_eq!(scale.apply(1.0), 8.0);
        assert_eq!(scale.apply(50.0), 8.0);
    }

    #[test]
    fn extent_skips_non_finite_values() {
        assert_eq!(extent([3.0, f32::NAN, -1.0, 7.0]), Some([-1.0, 7.0]));
        assert_eq!(extent(std::iter::empty()), None);
    }
}
