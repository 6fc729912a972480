use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;

pub const MAX_CANDIDATES: usize = 10_000;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CandidateSpaceError {
    #[error("discount step must be positive, got {0}")]
    NonPositiveStep(Decimal),
    #[error("discount stop {stop} must be greater than start {start}")]
    EmptyRange { start: Decimal, stop: Decimal },
    #[error("discount range [{start}, {stop}) by {step} yields more than {MAX_CANDIDATES} candidates")]
    TooManyCandidates { start: Decimal, stop: Decimal, step: Decimal },
    #[error("discount range [{start}, {stop}) is wider than a decimal can hold")]
    RangeOverflow { start: Decimal, stop: Decimal },
    #[error("discount {0} cannot be represented as a model input")]
    Unrepresentable(Decimal),
}

/// One discount under evaluation. Negative values raise the price.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    discount_pct: Decimal,
    model_value: f64,
}

impl Candidate {
    pub fn discount_pct(&self) -> Decimal {
        self.discount_pct
    }

    /// The discount as fed to the models, converted once when the grid is built.
    pub fn model_value(&self) -> f64 {
        self.model_value
    }
}

/// Ordered, strictly increasing discount grid over `[start, stop)`.
///
/// Values are computed as `start + i * step` in decimal arithmetic, so the grid is exact
/// regardless of its length. The default bounds give 128 candidates, `-5.0` to `20.4`.
#[derive(Clone, Debug, PartialEq)]
pub struct CandidateSpace {
    start: Decimal,
    stop: Decimal,
    step: Decimal,
    candidates: Vec<Candidate>,
}

impl CandidateSpace {
    pub const DEFAULT_START: Decimal = Decimal::from_parts(5, 0, 0, true, 0);
    pub const DEFAULT_STOP: Decimal = Decimal::from_parts(205, 0, 0, false, 1);
    pub const DEFAULT_STEP: Decimal = Decimal::from_parts(2, 0, 0, false, 1);

    pub fn new(start: Decimal, stop: Decimal, step: Decimal) -> Result<Self, CandidateSpaceError> {
        if step <= Decimal::ZERO {
            return Err(CandidateSpaceError::NonPositiveStep(step));
        }
        if stop <= start {
            return Err(CandidateSpaceError::EmptyRange { start, stop });
        }

        let span = stop
            .checked_sub(start)
            .ok_or(CandidateSpaceError::RangeOverflow { start, stop })?;
        let too_many = CandidateSpaceError::TooManyCandidates { start, stop, step };
        let count = span
            .checked_div(step)
            .and_then(|steps| steps.ceil().to_usize())
            .ok_or_else(|| too_many.clone())?;
        if count > MAX_CANDIDATES {
            return Err(too_many);
        }

        let candidates = (0..count)
            .map(|index| {
                let discount_pct = start + step * Decimal::from(index);
                discount_pct
                    .to_f64()
                    .map(|model_value| Candidate { discount_pct, model_value })
                    .ok_or(CandidateSpaceError::Unrepresentable(discount_pct))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { start, stop, step, candidates })
    }

    pub fn start(&self) -> Decimal {
        self.start
    }

    pub fn stop(&self) -> Decimal {
        self.stop
    }

    pub fn step(&self) -> Decimal {
        self.step
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{CandidateSpace, CandidateSpaceError};

    fn default_space() -> CandidateSpace {
        CandidateSpace::new(
            CandidateSpace::DEFAULT_START,
            CandidateSpace::DEFAULT_STOP,
            CandidateSpace::DEFAULT_STEP,
        )
        .expect("default bounds are valid")
    }

    #[test]
    fn default_grid_has_128_values_from_minus_five_to_twenty_point_four() {
        let space = default_space();

        assert_eq!(space.len(), 128);
        assert_eq!(space.candidates()[0].discount_pct(), Decimal::new(-5, 0));
        let last = space.candidates()[127].discount_pct();
        assert_eq!(last, Decimal::new(204, 1));
        assert!(last < space.stop());
        assert!(last >= space.stop() - space.step());
    }

    #[test]
    fn default_constants_spell_the_documented_bounds() {
        assert_eq!(CandidateSpace::DEFAULT_START, Decimal::new(-5, 0));
        assert_eq!(CandidateSpace::DEFAULT_STOP, Decimal::new(205, 1));
        assert_eq!(CandidateSpace::DEFAULT_STEP, Decimal::new(2, 1));
    }

    #[test]
    fn grid_is_strictly_increasing_without_drift() {
        let space = default_space();

        for (index, pair) in space.candidates().windows(2).enumerate() {
            assert!(pair[0].discount_pct() < pair[1].discount_pct());
            assert_eq!(pair[1].discount_pct() - pair[0].discount_pct(), space.step(), "gap at {index}");
        }

        // in f64, -5.0 + 28.0 * 0.2 is 0.6000000000000005
        assert_eq!(space.candidates()[28].discount_pct(), Decimal::new(6, 1));
        assert_eq!(space.candidates()[25].discount_pct(), Decimal::ZERO);
        assert_eq!(space.candidates()[28].model_value(), 0.6);
    }

    #[test]
    fn exact_multiple_excludes_stop() {
        let space = CandidateSpace::new(Decimal::ZERO, Decimal::ONE, Decimal::new(2, 1))
            .expect("valid range");

        assert_eq!(space.len(), 5);
        assert_eq!(space.candidates()[4].discount_pct(), Decimal::new(8, 1));
    }

    #[test]
    fn rejects_degenerate_ranges() {
        assert_eq!(
            CandidateSpace::new(Decimal::ZERO, Decimal::ONE, Decimal::ZERO),
            Err(CandidateSpaceError::NonPositiveStep(Decimal::ZERO))
        );
        assert!(matches!(
            CandidateSpace::new(Decimal::ONE, Decimal::ONE, Decimal::ONE),
            Err(CandidateSpaceError::EmptyRange { .. })
        ));
        assert!(matches!(
            CandidateSpace::new(Decimal::ZERO, Decimal::new(100, 0), Decimal::new(1, 3)),
            Err(CandidateSpaceError::TooManyCandidates { .. })
        ));
    }

    #[test]
    fn unrepresentable_ranges_are_errors_not_panics() {
        // (20.5 - -5.0) / 1e-28 exceeds the decimal range
        assert_eq!(
            CandidateSpace::new(
                CandidateSpace::DEFAULT_START,
                CandidateSpace::DEFAULT_STOP,
                Decimal::new(1, 28)
            ),
            Err(CandidateSpaceError::TooManyCandidates {
                start: CandidateSpace::DEFAULT_START,
                stop: CandidateSpace::DEFAULT_STOP,
                step: Decimal::new(1, 28),
            })
        );
        assert_eq!(
            CandidateSpace::new(Decimal::MIN, Decimal::MAX, Decimal::ONE),
            Err(CandidateSpaceError::RangeOverflow { start: Decimal::MIN, stop: Decimal::MAX })
        );
    }
}
