use chrono::{Duration, NaiveTime, Timelike};

use crate::models::{AvailabilityError, AvailabilityWindow, BookableSlot, Session};

/// Length of one bookable slot, and the granularity window bounds must respect.
pub const SLOT_MINUTES: i64 = 30;

/// Start times from `start` (inclusive) to `end` (exclusive) in
/// `SLOT_MINUTES` steps. Never wraps past midnight.
pub fn generate_slots(start: NaiveTime, end: NaiveTime) -> Vec<NaiveTime> {
    let step = Duration::minutes(SLOT_MINUTES);
    let mut slots = Vec::new();
    let mut current = start;

    while current < end {
        slots.push(current);

        let (next, wrapped_secs) = current.overflowing_add_signed(step);
        if wrapped_secs != 0 {
            break;
        }
        current = next;
    }

    slots
}

/// Bookable slots of one window; empty unless the window is enabled.
pub fn expand_window(window: &AvailabilityWindow) -> Vec<BookableSlot> {
    match window.enabled_bounds() {
        Some((start, end)) => generate_slots(start, end)
            .into_iter()
            .map(|start_time| BookableSlot {
                date: window.date,
                start_time,
            })
            .collect(),
        None => Vec::new(),
    }
}

fn on_slot_boundary(time: &NaiveTime) -> bool {
    time.second() == 0 && time.nanosecond() == 0 && (time.minute() as i64) % SLOT_MINUTES == 0
}

fn minutes_from_midnight(time: &NaiveTime) -> u32 {
    time.num_seconds_from_midnight() / 60
}

/// Write policy for an enabled window: both bounds on a slot boundary,
/// start before end, and both inside the session's clock band (inclusive).
pub fn validate_window(
    session: Session,
    start: NaiveTime,
    end: NaiveTime,
) -> Result<(), AvailabilityError> {
    if !on_slot_boundary(&start) || !on_slot_boundary(&end) {
        return Err(AvailabilityError::Validation(format!(
            "Time must be in {}-minute intervals",
            SLOT_MINUTES
        )));
    }

    if start >= end {
        return Err(AvailabilityError::Validation(
            "start_time must be before end_time".to_string(),
        ));
    }

    let (band_start, band_end) = session.band_minutes();
    let within = |minutes: u32| minutes >= band_start && minutes <= band_end;

    if !within(minutes_from_midnight(&start)) || !within(minutes_from_midnight(&end)) {
        return Err(AvailabilityError::Validation(format!(
            "{} window must lie within {:02}:{:02}-{:02}:{:02}",
            session,
            band_start / 60,
            band_start % 60,
            band_end / 60,
            band_end % 60
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::NaiveDate;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn one_hour_window_yields_two_slots() {
        assert_eq!(generate_slots(t(9, 0), t(10, 0)), vec![t(9, 0), t(9, 30)]);
    }

    #[test]
    fn partial_step_is_half_open() {
        assert_eq!(generate_slots(t(9, 0), t(9, 15)), vec![t(9, 0)]);
    }

    #[test]
    fn empty_when_start_not_before_end() {
        assert!(generate_slots(t(10, 0), t(10, 0)).is_empty());
        assert!(generate_slots(t(11, 0), t(10, 0)).is_empty());
    }

    #[test]
    fn does_not_wrap_past_midnight() {
        let slots = generate_slots(t(23, 0), NaiveTime::from_hms_opt(23, 59, 59).unwrap());
        assert_eq!(slots, vec![t(23, 0), t(23, 30)]);
    }

    #[test]
    fn full_evening_session_has_twelve_slots() {
        let slots = generate_slots(t(14, 0), t(20, 0));
        assert_eq!(slots.len(), 12);
        assert_eq!(slots.last(), Some(&t(19, 30)));
    }

    #[test]
    fn expand_window_skips_disabled_windows() {
        let mut window = AvailabilityWindow {
            id: 1,
            doctor_id: 7,
            date: NaiveDate::from_ymd_opt(2026, 10, 20).unwrap(),
            session: Session::Morning,
            is_available: true,
            start_time: Some(t(9, 0)),
            end_time: Some(t(10, 0)),
        };
        let slots = expand_window(&window);
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[1].start_time, t(9, 30));
        assert_eq!(slots[1].date, window.date);

        window.is_available = false;
        assert!(expand_window(&window).is_empty());
    }

    #[test]
    fn rejects_start_outside_morning_band() {
        assert_matches!(
            validate_window(Session::Morning, t(7, 30), t(9, 0)),
            Err(AvailabilityError::Validation(_))
        );
    }

    #[test]
    fn band_edges_are_inclusive() {
        assert!(validate_window(Session::Morning, t(8, 0), t(12, 0)).is_ok());
        assert!(validate_window(Session::Evening, t(14, 0), t(20, 0)).is_ok());
        assert!(validate_window(Session::Evening, t(19, 30), t(20, 30)).is_err());
        assert!(validate_window(Session::Morning, t(14, 0), t(15, 0)).is_err());
    }

    #[test]
    fn rejects_off_grid_and_inverted_bounds() {
        assert!(validate_window(Session::Morning, t(9, 15), t(10, 0)).is_err());
        assert!(validate_window(Session::Morning, t(9, 0), t(9, 45)).is_err());
        assert!(validate_window(Session::Morning, t(10, 0), t(9, 0)).is_err());
        assert!(validate_window(Session::Morning, t(9, 0), t(9, 0)).is_err());
    }
}
