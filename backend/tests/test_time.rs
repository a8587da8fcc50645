//! Tests for PeriodClock

use macro_abm_core_rs::PeriodClock;

#[test]
fn test_clock_new() {
    let clock = PeriodClock::new(40, 4);
    assert_eq!(clock.current_period(), 0);
    assert_eq!(clock.next_period(), 1);
    assert_eq!(clock.total_periods(), 40);
    assert_eq!(clock.periods_per_year(), 4);
}

#[test]
fn test_advance_until_finished() {
    let mut clock = PeriodClock::new(3, 4);

    for expected in 1..=3 {
        assert!(!clock.is_finished());
        clock.advance();
        assert_eq!(clock.current_period(), expected);
    }

    assert!(clock.is_finished());
    assert_eq!(clock.remaining(), 0);
}

#[test]
fn test_zero_length_run_is_finished_immediately() {
    let clock = PeriodClock::new(0, 4);
    assert!(clock.is_finished());
}

#[test]
fn test_year_boundaries() {
    let clock = PeriodClock::new(12, 4);
    assert_eq!(clock.year_of(1), 0);
    assert_eq!(clock.year_of(4), 0);
    assert_eq!(clock.year_of(5), 1);
    assert_eq!(clock.year_of(12), 2);
}

#[test]
fn test_stepping_past_end_keeps_counting() {
    let mut clock = PeriodClock::new(1, 1);
    clock.advance();
    clock.advance();
    assert_eq!(clock.current_period(), 2);
    assert!(clock.is_finished());
}
