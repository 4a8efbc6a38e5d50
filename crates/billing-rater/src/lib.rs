//! Pure fee-calculation kernel: duration/fee from a rated transaction, and
//! its inverse, the maximum number of billable units a balance can afford.

pub mod clock;

use std::sync::Arc;

use billing_types::{rate::DestinationRate, transaction::RatedTransaction};
use chrono_tz::Tz;
pub use clock::{Clock, FixedClock, SystemClock};

/// The absolute cap on `max_available_units`: four hours.
pub const MAX_UNITS: i64 = 3600 * 4;

#[derive(Clone)]
pub struct Rater {
    timezone: Tz,
    clock: Arc<dyn Clock>
}

impl Rater {
    pub fn new(timezone: Tz, clock: Arc<dyn Clock>) -> Self {
        Self { timezone, clock }
    }

    pub fn utc(clock: Arc<dyn Clock>) -> Self {
        Self::new(chrono_tz::UTC, clock)
    }

    /// `(fee, duration)` for a rated transaction. `duration` is whole
    /// seconds, rounded up if there is a sub-second remainder. Returns
    /// `(0, 0)` whenever the call ends at or before it began.
    pub fn fee_and_duration(&self, transaction: &RatedTransaction) -> (i64, i64) {
        let begin = transaction.timestamp_begin.with_timezone(&self.timezone);
        let end = transaction
            .timestamp_end
            .unwrap_or_else(|| self.clock.now())
            .with_timezone(&self.timezone);

        if end <= begin {
            return (0, 0)
        }

        let delta = end - begin;
        let duration = delta.num_seconds() + if delta.subsec_nanos() > 0 { 1 } else { 0 };

        let (connect_fee, rate, rate_increment, interval_start) = transaction
            .destination_rate
            .as_ref()
            .map(|dr| (dr.connect_fee, dr.rate, dr.rate_increment() as i64, dr.interval_start))
            .unwrap_or((0, 0, 1, 0));

        let billable_units =
            (ceil_div(duration, rate_increment) - interval_start).max(0);
        let fee = connect_fee + billable_units * rate;

        (fee, duration)
    }

    pub fn fee(&self, transaction: &RatedTransaction) -> i64 {
        self.fee_and_duration(transaction).0
    }

    /// `(authorized, units)`: whether a call can be authorized at all given
    /// `balance`, and the maximum number of seconds it may run for.
    pub fn max_allowed_units(
        &self,
        balance: i64,
        destination_rate: Option<&DestinationRate>
    ) -> (bool, i64) {
        let Some(dr) = destination_rate else {
            return (false, 0)
        };

        let ri = dr.rate_increment() as i64;
        let mut allowed = if dr.rate == 0 {
            MAX_UNITS
        } else {
            ((balance - dr.connect_fee) as f64 / dr.rate as f64).floor() as i64 * ri
        };

        allowed = if allowed > 0 { (allowed + dr.interval_start).min(MAX_UNITS) } else { 0 };

        let authorized = balance > 0 || (dr.connect_fee == 0 && dr.rate == 0);
        (authorized, allowed.max(0))
    }
}

fn ceil_div(numerator: i64, denominator: i64) -> i64 {
    if denominator <= 0 {
        return numerator
    }
    (numerator + denominator - 1) / denominator
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use billing_types::rate::DestinationRate;
    use chrono::{TimeZone, Utc};

    use super::*;

    fn rate(connect_fee: i64, rate: i64, rate_increment: u32, interval_start: i64) -> DestinationRate {
        DestinationRate {
            carrier_tag: "carrier1".into(),
            pricelist_tag: "pl1".into(),
            prefix: "39".into(),
            description: None,
            connect_fee,
            rate,
            rate_increment,
            interval_start
        }
    }

    fn tx(seconds: i64, destination_rate: Option<DestinationRate>) -> RatedTransaction {
        let begin = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let end = begin + chrono::Duration::seconds(seconds);
        RatedTransaction {
            transaction_tag: "100".into(),
            destination_rate,
            source: None,
            source_ip: None,
            destination: None,
            carrier_ip: None,
            tags: vec![],
            inbound: false,
            primary: true,
            timestamp_begin: begin,
            timestamp_end: Some(end)
        }
    }

    fn rater() -> Rater {
        Rater::utc(Arc::new(FixedClock(Utc::now())))
    }

    #[test]
    fn simple_rate_of_one_per_second() {
        let (fee, duration) = rater().fee_and_duration(&tx(90, Some(rate(0, 1, 1, 0))));
        assert_eq!((fee, duration), (90, 90));
    }

    #[test]
    fn interval_start_is_subtracted_from_billable_units() {
        let (fee, _) = rater().fee_and_duration(&tx(90, Some(rate(0, 1, 1, 30))));
        assert_eq!(fee, 60);
    }

    #[test]
    fn rate_increment_rounds_up_to_the_next_block() {
        let (fee, _) = rater().fee_and_duration(&tx(90, Some(rate(0, 100, 60, 0))));
        assert_eq!(fee, 200);
    }

    #[test]
    fn rate_increment_with_interval_start_in_blocks() {
        let (fee, _) = rater().fee_and_duration(&tx(90, Some(rate(0, 100, 60, 1))));
        assert_eq!(fee, 100);
    }

    #[test]
    fn connect_fee_is_added_unconditionally() {
        let (fee, _) = rater().fee_and_duration(&tx(90, Some(rate(100, 100, 60, 1))));
        assert_eq!(fee, 300);
    }

    #[test]
    fn two_free_minutes_absorb_a_short_call() {
        let (fee, _) = rater().fee_and_duration(&tx(30, Some(rate(0, 1, 60, 2))));
        assert_eq!(fee, 0);
    }

    #[test]
    fn end_before_or_at_begin_is_zero_fee_and_duration() {
        let mut t = tx(90, Some(rate(0, 1, 1, 0)));
        t.timestamp_end = Some(t.timestamp_begin);
        assert_eq!(rater().fee_and_duration(&t), (0, 0));

        let mut t2 = tx(90, Some(rate(0, 1, 1, 0)));
        t2.timestamp_end = Some(t2.timestamp_begin - chrono::Duration::seconds(1));
        assert_eq!(rater().fee_and_duration(&t2), (0, 0));
    }

    #[test]
    fn max_allowed_units_with_balance_and_interval_start() {
        let dr = rate(0, 1, 1, 60);
        assert_eq!(rater().max_allowed_units(50, Some(&dr)), (true, 110));
    }

    #[test]
    fn max_allowed_units_without_destination_rate_is_unauthorized() {
        assert_eq!(rater().max_allowed_units(50, None), (false, 0));
    }

    #[test]
    fn max_allowed_units_zero_balance_nonzero_rate_is_unauthorized() {
        let dr = rate(0, 1, 1, 60);
        assert_eq!(rater().max_allowed_units(0, Some(&dr)), (false, 0));
    }

    #[test]
    fn max_allowed_units_subtracts_connect_fee() {
        let dr = rate(10, 1, 1, 0);
        assert_eq!(rater().max_allowed_units(60, Some(&dr)), (true, 50));
    }

    #[test]
    fn max_allowed_units_zero_rate_and_fee_is_unlimited() {
        let dr = rate(0, 0, 1, 0);
        assert_eq!(rater().max_allowed_units(0, Some(&dr)), (true, MAX_UNITS));
    }
}
