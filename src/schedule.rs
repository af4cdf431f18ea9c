//! Date/duration reconciliation for task scheduling fields.
//!
//! A task schedule is the triple (start, end, duration). When the user
//! finishes editing one of the three fields, exactly one of the other two is
//! under-determined and gets recomputed, chosen by which field was edited and
//! which endpoints are pinned as milestones. The engine is a pure function
//! over the field texts: it never errors, never touches more than the one
//! decided field, and leaves everything as-is when there are fewer than two
//! usable values.

use chrono::{NaiveDate, NaiveDateTime};

use crate::calendar::{
    day_end, day_start, end_from_start_and_duration, end_of_day, format_duration_days,
    inclusive_day_span, parse_date_input, parse_duration_days, start_from_end_and_duration,
    start_of_day,
};

/// Which schedule field the user just finished editing.
///
/// The milestone variants cover toggling an endpoint's pinned flag; those
/// edits never recompute values, they only decide whether the duration field
/// becomes display-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditedField {
    Start,
    Duration,
    End,
    StartMilestone,
    EndMilestone,
}

/// The single action the engine takes for one edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecomputeTarget {
    /// Recompute start from end and duration.
    ChangeStart,
    /// Recompute end from start and duration.
    ChangeEnd,
    /// Recompute duration from start and end.
    ChangeDuration,
    /// Both endpoints are pinned and filled: duration is derived, lock it.
    Lock,
    /// Nothing to do; pass the fields through.
    Noop,
}

/// Parse/format pair for the schedule field texts.
///
/// The engine owns no formatting state of its own; whatever the surrounding
/// form uses to render dates and durations is injected here, and the engine
/// only promises to round-trip through it. The default speaks ISO dates
/// (accepting the natural-language shortcuts of [`parse_date_input`]) and
/// bare integer day counts.
#[derive(Debug, Clone)]
pub struct ScheduleCodec {
    pub date_format: String,
}

impl Default for ScheduleCodec {
    fn default() -> Self {
        ScheduleCodec { date_format: "%Y-%m-%d".to_string() }
    }
}

impl ScheduleCodec {
    /// Parse date field text. Empty or unparseable text is `None`.
    pub fn parse_date(&self, s: &str) -> Option<NaiveDate> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }
        NaiveDate::parse_from_str(s, &self.date_format)
            .ok()
            .or_else(|| parse_date_input(s))
    }

    /// Render a date back to field text.
    pub fn format_date(&self, d: NaiveDate) -> String {
        d.format(&self.date_format).to_string()
    }

    /// Parse duration field text to a positive inclusive day count.
    /// Unparseable or non-positive text clamps to 1.
    pub fn parse_duration(&self, s: &str) -> u32 {
        parse_duration_days(s)
    }

    /// Render a day count back to field text.
    pub fn format_duration(&self, n: u32) -> String {
        format_duration_days(n)
    }
}

/// Snapshot of the schedule form at edit-completion time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileInput {
    pub start_text: String,
    pub duration_text: String,
    pub end_text: String,
    pub start_is_milestone: bool,
    pub end_is_milestone: bool,
    pub edited: EditedField,
}

/// The reconciled triple to write back to the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutput {
    pub start_text: String,
    pub duration_text: String,
    pub end_text: String,
    /// True only when both endpoints are milestone-pinned and filled:
    /// duration is then derived and the field should render read-only.
    pub duration_locked: bool,
}

/// Decide which field to recompute for one edit.
///
/// `start_pinned` / `end_pinned` mean milestone-flagged AND filled;
/// `*_filled` reflect the sufficiency state of each field.
pub fn decide_target(
    edited: EditedField,
    start_filled: bool,
    duration_filled: bool,
    end_filled: bool,
    start_pinned: bool,
    end_pinned: bool,
) -> RecomputeTarget {
    match edited {
        EditedField::StartMilestone | EditedField::EndMilestone => {
            if start_pinned && end_pinned {
                RecomputeTarget::Lock
            } else {
                RecomputeTarget::Noop
            }
        }
        _ if count_filled(start_filled, duration_filled, end_filled) < 2 => RecomputeTarget::Noop,
        EditedField::Start if start_filled => {
            if end_pinned && duration_filled {
                RecomputeTarget::ChangeDuration
            } else if duration_filled {
                RecomputeTarget::ChangeEnd
            } else {
                RecomputeTarget::Noop
            }
        }
        EditedField::Duration if duration_filled && !(start_pinned && end_pinned) => {
            if end_pinned && !start_pinned {
                RecomputeTarget::ChangeStart
            } else if !end_pinned {
                RecomputeTarget::ChangeEnd
            } else {
                RecomputeTarget::Noop
            }
        }
        EditedField::End if end_filled => RecomputeTarget::ChangeDuration,
        _ => RecomputeTarget::Noop,
    }
}

fn count_filled(a: bool, b: bool, c: bool) -> u8 {
    a as u8 + b as u8 + c as u8
}

/// Reconcile a schedule after one field edit.
///
/// Exactly one field is recomputed (or none); the untouched fields pass
/// through, re-rendered by the codec where they parsed. Malformed dates count
/// as absent, malformed durations clamp to 1. Nothing here ever errors, and a
/// broken field never blocks the form.
pub fn reconcile(input: &ReconcileInput, codec: &ScheduleCodec) -> ReconcileOutput {
    let start = input.start_text.trim();
    let end = input.end_text.trim();
    let duration_filled = !input.duration_text.trim().is_empty();

    // Field values, normalised to the canonical instants: starts live at
    // 00:00:00.000, ends at 23:59:59.999 of their day.
    let mut start_val: Option<NaiveDateTime> =
        codec.parse_date(start).map(|d| start_of_day(day_start(d)));
    let mut end_val: Option<NaiveDateTime> =
        codec.parse_date(end).map(|d| end_of_day(day_end(d)));
    let mut duration_val: u32 = codec.parse_duration(&input.duration_text);

    let start_pinned = input.start_is_milestone && start_val.is_some();
    let end_pinned = input.end_is_milestone && end_val.is_some();

    let target = decide_target(
        input.edited,
        start_val.is_some(),
        duration_filled,
        end_val.is_some(),
        start_pinned,
        end_pinned,
    );

    let mut recomputed = false;
    match target {
        RecomputeTarget::ChangeEnd => {
            // A span running off the calendar degrades to a no-op.
            if let Some(e) = start_val.and_then(|s| end_from_start_and_duration(s, duration_val as i64)) {
                end_val = Some(e);
                recomputed = true;
            }
        }
        RecomputeTarget::ChangeStart => {
            if let Some(s) = end_val.and_then(|e| start_from_end_and_duration(e, duration_val as i64)) {
                start_val = Some(s);
                recomputed = true;
            }
        }
        RecomputeTarget::ChangeDuration => {
            if let (Some(s), Some(e)) = (start_val, end_val) {
                duration_val = inclusive_day_span(s, e) as u32;
                recomputed = true;
            }
        }
        RecomputeTarget::Lock | RecomputeTarget::Noop => {}
    }

    // Duration text is re-rendered normalised whenever it was filled, even on
    // the no-op paths; dates only when a recomputation actually ran.
    let duration_text = if recomputed || duration_filled {
        codec.format_duration(duration_val)
    } else {
        input.duration_text.clone()
    };
    let (start_text, end_text) = if recomputed {
        (
            start_val.map(|t| codec.format_date(t.date())).unwrap_or_else(|| input.start_text.clone()),
            end_val.map(|t| codec.format_date(t.date())).unwrap_or_else(|| input.end_text.clone()),
        )
    } else {
        (input.start_text.clone(), input.end_text.clone())
    };

    ReconcileOutput {
        start_text,
        duration_text,
        end_text,
        duration_locked: target == RecomputeTarget::Lock,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(
        start: &str,
        duration: &str,
        end: &str,
        start_ms: bool,
        end_ms: bool,
        edited: EditedField,
    ) -> ReconcileInput {
        ReconcileInput {
            start_text: start.to_string(),
            duration_text: duration.to_string(),
            end_text: end.to_string(),
            start_is_milestone: start_ms,
            end_is_milestone: end_ms,
            edited,
        }
    }

    fn run(i: &ReconcileInput) -> ReconcileOutput {
        reconcile(i, &ScheduleCodec::default())
    }

    #[test]
    fn test_edit_start_recomputes_end() {
        let out = run(&input("2024-01-10", "5", "", false, false, EditedField::Start));
        assert_eq!(out.start_text, "2024-01-10");
        assert_eq!(out.duration_text, "5");
        assert_eq!(out.end_text, "2024-01-14");
        assert!(!out.duration_locked);
    }

    #[test]
    fn test_edit_end_recomputes_duration() {
        let out = run(&input("2024-01-10", "", "2024-01-14", false, false, EditedField::End));
        assert_eq!(out.duration_text, "5");
        assert_eq!(out.start_text, "2024-01-10");
        assert_eq!(out.end_text, "2024-01-14");
    }

    #[test]
    fn test_edit_duration_with_pinned_end_recomputes_start() {
        let out = run(&input("", "5", "2024-01-14", false, true, EditedField::Duration));
        assert_eq!(out.start_text, "2024-01-10");
        assert_eq!(out.end_text, "2024-01-14");
        assert_eq!(out.duration_text, "5");
    }

    #[test]
    fn test_edit_duration_without_pins_recomputes_end() {
        let out = run(&input("2024-01-10", "3", "2024-01-20", false, false, EditedField::Duration));
        assert_eq!(out.end_text, "2024-01-12");
        assert_eq!(out.start_text, "2024-01-10");
    }

    #[test]
    fn test_edit_start_with_pinned_end_recomputes_duration() {
        let out = run(&input("2024-01-10", "2", "2024-01-14", false, true, EditedField::Start));
        assert_eq!(out.duration_text, "5");
        assert_eq!(out.end_text, "2024-01-14");
    }

    #[test]
    fn test_same_day_task_has_duration_one() {
        let out = run(&input("2024-03-01", "", "2024-03-01", false, false, EditedField::End));
        assert_eq!(out.duration_text, "1");
    }

    #[test]
    fn test_duration_one_round_trips_through_both_directions() {
        // CHANGE_END with duration 1 keeps end on the start day.
        let out = run(&input("2024-03-01", "1", "", false, false, EditedField::Start));
        assert_eq!(out.end_text, "2024-03-01");
        // CHANGE_START with duration 1 keeps start on the end day.
        let out = run(&input("", "1", "2024-03-01", false, true, EditedField::Duration));
        assert_eq!(out.start_text, "2024-03-01");
    }

    #[test]
    fn test_round_trip_change_end_then_change_duration() {
        let first = run(&input("2024-01-10", "5", "", false, false, EditedField::Start));
        assert_eq!(first.end_text, "2024-01-14");
        let second = run(&input(
            &first.start_text, "", &first.end_text, false, false, EditedField::End,
        ));
        assert_eq!(second.duration_text, "5");
    }

    #[test]
    fn test_round_trip_change_start_then_change_duration() {
        let first = run(&input("", "5", "2024-01-14", false, true, EditedField::Duration));
        assert_eq!(first.start_text, "2024-01-10");
        let second = run(&input(
            &first.start_text, "", &first.end_text, false, false, EditedField::End,
        ));
        assert_eq!(second.duration_text, "5");
    }

    #[test]
    fn test_duration_clamp_on_bad_text() {
        let out = run(&input("2024-01-10", "-3", "", false, false, EditedField::Start));
        assert_eq!(out.duration_text, "1");
        assert_eq!(out.end_text, "2024-01-10");

        let out = run(&input("2024-01-10", "abc", "", false, false, EditedField::Start));
        assert_eq!(out.duration_text, "1");
    }

    #[test]
    fn test_huge_duration_degrades_to_noop() {
        // u32::MAX days overflows the representable date range; the edit
        // leaves the dates alone instead of failing.
        let out = run(&input("2024-01-10", "4294967295", "", false, false, EditedField::Start));
        assert_eq!(out.start_text, "2024-01-10");
        assert_eq!(out.end_text, "");
        assert_eq!(out.duration_text, "4294967295");
        assert!(!out.duration_locked);

        let out = run(&input("", "4294967295", "2024-01-14", false, true, EditedField::Duration));
        assert_eq!(out.start_text, "");
        assert_eq!(out.end_text, "2024-01-14");
    }

    #[test]
    fn test_milestone_lock_when_both_pinned_and_filled() {
        let out = run(&input(
            "2024-01-10", "5", "2024-01-14", true, true, EditedField::StartMilestone,
        ));
        assert!(out.duration_locked);
        assert_eq!(out.start_text, "2024-01-10");
        assert_eq!(out.end_text, "2024-01-14");
        assert_eq!(out.duration_text, "5");
    }

    #[test]
    fn test_milestone_edit_with_one_pin_unlocks() {
        let out = run(&input(
            "2024-01-10", "5", "2024-01-14", true, false, EditedField::StartMilestone,
        ));
        assert!(!out.duration_locked);
        assert_eq!(out.start_text, "2024-01-10");
        assert_eq!(out.end_text, "2024-01-14");
    }

    #[test]
    fn test_both_pins_block_duration_edit() {
        let out = run(&input(
            "2024-01-10", "9", "2024-01-14", true, true, EditedField::Duration,
        ));
        // Neither endpoint may move, so nothing is recomputed.
        assert_eq!(out.start_text, "2024-01-10");
        assert_eq!(out.end_text, "2024-01-14");
    }

    #[test]
    fn test_insufficient_constraints_is_a_noop() {
        let i = input("", "3", "", false, false, EditedField::Duration);
        let out = run(&i);
        assert_eq!(out.start_text, "");
        assert_eq!(out.end_text, "");
        assert_eq!(out.duration_text, "3");
        assert!(!out.duration_locked);
    }

    #[test]
    fn test_unparseable_date_degrades_to_absent() {
        // Garbage start drops the filled count to 1: no recomputation.
        let out = run(&input("soonish", "5", "", false, false, EditedField::Start));
        assert_eq!(out.start_text, "soonish");
        assert_eq!(out.end_text, "");
        // Garbage start with enough other fields: the decided target would
        // need start, so it degrades to a no-op instead of erroring.
        let out = run(&input("soonish", "5", "2024-01-14", false, false, EditedField::Duration));
        assert_eq!(out.start_text, "soonish");
        assert_eq!(out.end_text, "2024-01-14");
    }

    #[test]
    fn test_edit_start_without_duration_leaves_fields_alone() {
        let out = run(&input("2024-01-10", "", "2024-01-20", false, false, EditedField::Start));
        assert_eq!(out.start_text, "2024-01-10");
        assert_eq!(out.duration_text, "");
        assert_eq!(out.end_text, "2024-01-20");
    }

    #[test]
    fn test_idempotence_for_fully_determined_input() {
        let cases = [
            input("2024-01-10", "5", "2024-01-20", false, false, EditedField::Start),
            input("2024-01-10", "5", "2024-01-20", false, false, EditedField::Duration),
            input("2024-01-10", "5", "2024-01-20", false, false, EditedField::End),
            input("2024-01-10", "5", "2024-01-20", false, true, EditedField::Duration),
        ];
        for case in cases {
            let once = run(&case);
            let again = run(&ReconcileInput {
                start_text: once.start_text.clone(),
                duration_text: once.duration_text.clone(),
                end_text: once.end_text.clone(),
                start_is_milestone: case.start_is_milestone,
                end_is_milestone: case.end_is_milestone,
                edited: case.edited,
            });
            assert_eq!(once, again);
        }
    }

    #[test]
    fn test_output_invariant_holds_when_all_present() {
        let codec = ScheduleCodec::default();
        let out = run(&input("2024-01-10", "7", "2024-01-12", false, false, EditedField::Duration));
        let start = codec.parse_date(&out.start_text).unwrap();
        let end = codec.parse_date(&out.end_text).unwrap();
        let span = crate::calendar::inclusive_day_span(
            crate::calendar::day_start(start),
            crate::calendar::day_end(end),
        );
        assert_eq!(out.duration_text, span.to_string());
    }

    #[test]
    fn test_decide_target_priority_table() {
        use EditedField::*;
        use RecomputeTarget::*;
        // (edited, start, dur, end, s_pin, e_pin) -> target
        let rows = [
            (Start, true, true, false, false, false, ChangeEnd),
            (Start, true, true, true, false, true, ChangeDuration),
            (Start, true, false, true, false, false, Noop),
            (Duration, true, true, false, false, false, ChangeEnd),
            (Duration, false, true, true, false, true, ChangeStart),
            (Duration, true, true, true, true, true, Noop),
            (End, true, false, true, false, false, ChangeDuration),
            (End, true, false, true, true, false, ChangeDuration),
            (StartMilestone, true, true, true, true, true, Lock),
            (EndMilestone, true, true, true, true, false, Noop),
        ];
        for (edited, s, d, e, sp, ep, want) in rows {
            assert_eq!(
                decide_target(edited, s, d, e, sp, ep),
                want,
                "edited={:?} s={} d={} e={} sp={} ep={}",
                edited, s, d, e, sp, ep
            );
        }
    }
}
