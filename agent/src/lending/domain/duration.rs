use super::policy::DurationThreshold;
use crate::error::LendingError;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Loan duration used when no thresholds are configured
pub const DEFAULT_DURATION_DAYS: u32 = 2;
/// Lending stops once this few days are left before the end date
pub const END_OF_SERVICE_MARGIN_DAYS: i64 = 2;

/// Picks loan durations from rate thresholds and an optional end date
#[derive(Debug, Clone, Copy, Default)]
pub struct DurationPlanner {
    end_date: Option<NaiveDate>,
}

impl DurationPlanner {
    pub fn new(end_date: Option<NaiveDate>) -> Self {
        DurationPlanner { end_date }
    }

    /// Linear interpolation over `thresholds` (sorted by ascending rate),
    /// truncated to whole days
    pub fn days_for_rate(thresholds: &[DurationThreshold], rate: Decimal) -> u32 {
        let (Some(first), Some(last)) = (thresholds.first(), thresholds.last()) else {
            return DEFAULT_DURATION_DAYS;
        };
        if rate <= first.rate {
            return first.days;
        }
        if rate >= last.rate {
            return last.days;
        }

        for pair in thresholds.windows(2) {
            let (low, high) = (pair[0], pair[1]);
            if rate > high.rate || high.rate == low.rate {
                continue;
            }
            let span = Decimal::from(high.days) - Decimal::from(low.days);
            let offset = span * (rate - low.rate) / (high.rate - low.rate);
            let days = Decimal::from(low.days) + offset.trunc();
            return days.to_u32().unwrap_or(low.days);
        }
        last.days
    }

    /// Clamp `days` to what is left before the end date.
    ///
    /// Fails with [`LendingError::EndOfService`] once the end date is
    /// [`END_OF_SERVICE_MARGIN_DAYS`] or fewer days away.
    pub fn clamp(&self, days: u32, today: NaiveDate) -> Result<u32, LendingError> {
        let Some(end_date) = self.end_date else {
            return Ok(days);
        };
        let days_left = (end_date - today).num_days();
        if days_left <= END_OF_SERVICE_MARGIN_DAYS {
            return Err(LendingError::EndOfService {
                end_date,
                days_left,
            });
        }
        Ok(days.min(u32::try_from(days_left).unwrap_or(u32::MAX)))
    }

    pub fn plan(
        &self,
        thresholds: &[DurationThreshold],
        rate: Decimal,
        today: NaiveDate,
    ) -> Result<u32, LendingError> {
        self.clamp(Self::days_for_rate(thresholds, rate), today)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn thresholds() -> Vec<DurationThreshold> {
        vec![
            DurationThreshold {
                rate: dec!(0.0005),
                days: 25,
            },
            DurationThreshold {
                rate: dec!(0.0010),
                days: 60,
            },
        ]
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_interpolation() {
        let t = thresholds();
        assert_eq!(DurationPlanner::days_for_rate(&t, dec!(0.0004)), 25);
        assert_eq!(DurationPlanner::days_for_rate(&t, dec!(0.0005)), 25);
        assert_eq!(DurationPlanner::days_for_rate(&t, dec!(0.00075)), 42);
        assert_eq!(DurationPlanner::days_for_rate(&t, dec!(0.0010)), 60);
        assert_eq!(DurationPlanner::days_for_rate(&t, dec!(0.5)), 60);
    }

    #[test]
    fn test_interpolation_across_three_thresholds() {
        let mut t = thresholds();
        t.push(DurationThreshold {
            rate: dec!(0.0020),
            days: 120,
        });
        assert_eq!(DurationPlanner::days_for_rate(&t, dec!(0.0015)), 90);
    }

    #[test]
    fn test_no_thresholds() {
        assert_eq!(
            DurationPlanner::days_for_rate(&[], dec!(0.001)),
            DEFAULT_DURATION_DAYS
        );
    }

    #[test]
    fn test_end_date_clamps_duration() {
        let planner = DurationPlanner::new(Some(date(2026, 3, 20)));
        assert_eq!(planner.clamp(60, date(2026, 3, 1)).unwrap(), 19);
        assert_eq!(planner.clamp(5, date(2026, 3, 1)).unwrap(), 5);
    }

    #[test]
    fn test_end_of_service() {
        let planner = DurationPlanner::new(Some(date(2026, 3, 20)));
        let err = planner.clamp(2, date(2026, 3, 18)).unwrap_err();
        assert!(matches!(err, LendingError::EndOfService { days_left: 2, .. }));
        assert!(planner.clamp(2, date(2026, 3, 17)).is_ok());
    }

    #[test]
    fn test_without_end_date() {
        let planner = DurationPlanner::default();
        assert_eq!(planner.plan(&thresholds(), dec!(0.002), date(2030, 1, 1)).unwrap(), 60);
    }
}
