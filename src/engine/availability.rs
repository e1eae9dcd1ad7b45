use chrono::TimeDelta;

use crate::model::*;

// ── Slot Finding ──────────────────────────────────────────────────

/// Earliest-fit: return the lowest-start `[t, t + duration)` inside `window`
/// that overlaps none of `busy`.
///
/// `busy` may be unsorted and may overlap itself. The cursor only ever moves
/// forward, so an event nested inside an earlier longer one cannot pull it back.
/// Events starting at or after `window.end` cannot open a gap and end the scan.
pub fn find_free_slot(busy: &[Span], window: &Span, duration: TimeDelta) -> Option<TimeSlot> {
    if duration <= TimeDelta::zero() || duration > window.duration() {
        return None;
    }

    let mut sorted = busy.to_vec();
    // Stable: equal starts keep the caller's order.
    sorted.sort_by_key(|s| s.start);

    let mut cursor = window.start;
    for span in &sorted {
        if span.start >= window.end {
            break;
        }
        if span.start - cursor >= duration {
            return slot_at(cursor, duration);
        }
        cursor = cursor.max(span.end);
    }

    if window.end - cursor >= duration {
        slot_at(cursor, duration)
    } else {
        None
    }
}

fn slot_at(start: Ts, duration: TimeDelta) -> Option<TimeSlot> {
    start
        .checked_add_signed(duration)
        .map(|end| Span::new(start, end))
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};
    use proptest::prelude::*;

    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 22).unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        day().and_hms_opt(h, m, 0).unwrap()
    }

    fn span(h1: u32, m1: u32, h2: u32, m2: u32) -> Span {
        Span::new(at(h1, m1), at(h2, m2))
    }

    fn window() -> Span {
        WorkingHours::default().window(day())
    }

    fn mins(m: i64) -> TimeDelta {
        TimeDelta::minutes(m)
    }

    // ── find_free_slot ────────────────────────────────────

    #[test]
    fn empty_day_returns_work_start() {
        let slot = find_free_slot(&[], &window(), mins(60));
        assert_eq!(slot, Some(span(9, 0, 10, 0)));
    }

    #[test]
    fn empty_day_full_window_fits_exactly() {
        let slot = find_free_slot(&[], &window(), mins(8 * 60));
        assert_eq!(slot, Some(span(9, 0, 17, 0)));
    }

    #[test]
    fn empty_day_longer_than_window() {
        assert_eq!(find_free_slot(&[], &window(), mins(8 * 60 + 1)), None);
    }

    #[test]
    fn reference_day_gap_before_first_event_is_exact() {
        // 09:00–10:00 is exactly 60 minutes, so it wins over 10:30–11:30.
        let busy = [span(10, 0, 10, 30), span(15, 0, 16, 0)];
        let slot = find_free_slot(&busy, &window(), mins(60));
        assert_eq!(slot, Some(span(9, 0, 10, 0)));
    }

    #[test]
    fn reference_day_longer_request_skips_to_next_gap() {
        let busy = [span(10, 0, 10, 30), span(15, 0, 16, 0)];
        let slot = find_free_slot(&busy, &window(), mins(90));
        assert_eq!(slot, Some(span(10, 30, 12, 0)));
    }

    #[test]
    fn earliest_fit_not_best_fit() {
        // 14:00–16:00 is a tighter fit for 2h, but 10:00–13:00 comes first.
        let busy = [span(9, 0, 10, 0), span(13, 0, 14, 0), span(16, 0, 17, 0)];
        let slot = find_free_slot(&busy, &window(), mins(120));
        assert_eq!(slot, Some(span(10, 0, 12, 0)));
    }

    #[test]
    fn unsorted_input_is_sorted() {
        let busy = [span(15, 0, 16, 0), span(9, 0, 12, 0), span(12, 0, 14, 30)];
        let slot = find_free_slot(&busy, &window(), mins(30));
        assert_eq!(slot, Some(span(14, 30, 15, 0)));
    }

    #[test]
    fn overlapping_events_never_move_cursor_backward() {
        // The short meeting nested inside the long one must not reopen 10:30.
        let busy = [span(9, 0, 12, 0), span(10, 0, 10, 30)];
        let slot = find_free_slot(&busy, &window(), mins(60));
        assert_eq!(slot, Some(span(12, 0, 13, 0)));
    }

    #[test]
    fn double_booked_identical_events() {
        let busy = [span(9, 0, 10, 0), span(9, 0, 10, 0)];
        let slot = find_free_slot(&busy, &window(), mins(60));
        assert_eq!(slot, Some(span(10, 0, 11, 0)));
    }

    #[test]
    fn event_before_work_start_does_not_pull_cursor_back() {
        let busy = [span(7, 0, 8, 30)];
        let slot = find_free_slot(&busy, &window(), mins(60));
        assert_eq!(slot, Some(span(9, 0, 10, 0)));
    }

    #[test]
    fn event_straddling_work_start_pushes_cursor() {
        let busy = [span(8, 0, 9, 45)];
        let slot = find_free_slot(&busy, &window(), mins(60));
        assert_eq!(slot, Some(span(9, 45, 10, 45)));
    }

    #[test]
    fn slot_never_crosses_work_end() {
        // Free until 16:30, then nothing inside the window; the evening event
        // must not make 16:30–17:30 look available.
        let busy = [span(9, 0, 16, 30), span(18, 0, 19, 0)];
        assert_eq!(find_free_slot(&busy, &window(), mins(60)), None);
        assert_eq!(
            find_free_slot(&busy, &window(), mins(30)),
            Some(span(16, 30, 17, 0))
        );
    }

    #[test]
    fn event_running_past_work_end_blocks_tail() {
        let busy = [span(9, 0, 16, 0), span(16, 30, 18, 0)];
        assert_eq!(find_free_slot(&busy, &window(), mins(45)), None);
        assert_eq!(
            find_free_slot(&busy, &window(), mins(30)),
            Some(span(16, 0, 16, 30))
        );
    }

    #[test]
    fn fully_booked_day() {
        let busy = [span(9, 0, 13, 0), span(13, 0, 17, 0)];
        assert_eq!(find_free_slot(&busy, &window(), mins(1)), None);
    }

    #[test]
    fn adjacent_events_leave_no_gap() {
        let busy = [span(9, 0, 10, 0), span(10, 0, 11, 0)];
        let slot = find_free_slot(&busy, &window(), mins(15));
        assert_eq!(slot, Some(span(11, 0, 11, 15)));
    }

    #[test]
    fn non_positive_duration_finds_nothing() {
        assert_eq!(find_free_slot(&[], &window(), mins(0)), None);
        assert_eq!(find_free_slot(&[], &window(), mins(-30)), None);
    }

    // ── properties ───────────────────────────────────────

    /// Minute-granular reference: scan every candidate start in the window.
    fn brute_force(busy: &[Span], window: &Span, duration: TimeDelta) -> Option<TimeSlot> {
        let mut t = window.start;
        while t + duration <= window.end {
            let candidate = Span::new(t, t + duration);
            if !busy.iter().any(|b| b.overlaps(&candidate)) {
                return Some(candidate);
            }
            t += TimeDelta::minutes(1);
        }
        None
    }

    fn arb_busy() -> impl Strategy<Value = Vec<Span>> {
        // Start anywhere in the day, including outside working hours.
        prop::collection::vec((0i64..24 * 60, 1i64..240), 0..12).prop_map(|raw| {
            let midnight = day().and_hms_opt(0, 0, 0).unwrap();
            raw.into_iter()
                .map(|(start, len)| {
                    let s = midnight + TimeDelta::minutes(start);
                    Span::new(s, s + TimeDelta::minutes(len))
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn empty_day_slot_is_work_start(d in 1i64..=600) {
            let w = window();
            let slot = find_free_slot(&[], &w, mins(d));
            if d <= 8 * 60 {
                prop_assert_eq!(slot, Some(Span::new(w.start, w.start + mins(d))));
            } else {
                prop_assert_eq!(slot, None);
            }
        }

        #[test]
        fn slot_is_free_inside_window_and_earliest(busy in arb_busy(), d in 1i64..=300) {
            let w = window();
            let found = find_free_slot(&busy, &w, mins(d));
            if let Some(slot) = found {
                prop_assert_eq!(slot.duration(), mins(d));
                prop_assert!(w.contains_span(&slot));
                for b in &busy {
                    prop_assert!(!b.overlaps(&slot), "{:?} overlaps {:?}", slot, b);
                }
            }
            prop_assert_eq!(found, brute_force(&busy, &w, mins(d)));
        }

        #[test]
        fn input_order_does_not_change_result(busy in arb_busy(), d in 1i64..=300) {
            let w = window();
            let mut reversed = busy.clone();
            reversed.reverse();
            prop_assert_eq!(
                find_free_slot(&busy, &w, mins(d)),
                find_free_slot(&reversed, &w, mins(d))
            );
        }
    }
}
