//! Appointment progress timeline.
//!
//! Turns an appointment's bay slot and its ordered service stages into labeled
//! checkpoints with actual or projected times. Each stage is projected from the
//! resolved time of the stage before it, so one early or late completion shifts
//! every later estimate. The current time is always passed in; nothing here
//! reads the clock.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::models::{Appointment, AppointmentSlot, ServiceLineItem};

/// Label of the first checkpoint, when the vehicle is taken in
pub const RECEIVED: &str = "received";
/// Label of the synthetic final checkpoint
pub const COMPLETED: &str = "completed";

/// A labeled point on the timeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Checkpoint {
    pub label: String,
    pub time: DateTime<Utc>,
    pub reached: bool,
}

impl Checkpoint {
    fn new(label: impl Into<String>, time: DateTime<Utc>, reached: bool) -> Self {
        Self {
            label: label.into(),
            time,
            reached,
        }
    }
}

/// Project the checkpoints for a slot and its service stages.
///
/// Returns an empty list when there is no slot. Otherwise the result holds
/// `services.len() + 2` checkpoints: `received` at the slot start, one per
/// stage in input order, and `completed` at the last resolved time.
///
/// A stage that is done and carries a completion time uses that time; any
/// other stage is projected as the previous checkpoint plus `time_required`
/// minutes. Negative durations are treated as zero.
pub fn project(
    slot: Option<&AppointmentSlot>,
    services: &[ServiceLineItem],
    now: DateTime<Utc>,
) -> Vec<Checkpoint> {
    let Some(slot) = slot else {
        return Vec::new();
    };

    let start = slot.slot_datetime;
    let mut checkpoints = Vec::with_capacity(services.len() + 2);
    checkpoints.push(Checkpoint::new(RECEIVED, start, true));

    let mut cursor = start;
    for item in services {
        let time = match (item.is_done, item.time_completed) {
            (true, Some(completed)) => completed,
            _ => advance(cursor, item),
        };
        checkpoints.push(Checkpoint::new(
            item.name.clone(),
            time,
            item.is_done || now >= time,
        ));
        cursor = time;
    }

    checkpoints.push(Checkpoint::new(COMPLETED, cursor, now >= cursor));
    checkpoints
}

fn advance(cursor: DateTime<Utc>, item: &ServiceLineItem) -> DateTime<Utc> {
    let minutes = if item.time_required < 0 {
        tracing::warn!(
            stage = %item.name,
            minutes = item.time_required,
            "negative stage duration treated as zero"
        );
        0
    } else {
        item.time_required
    };

    match Duration::try_minutes(minutes).and_then(|d| cursor.checked_add_signed(d)) {
        Some(time) => time,
        None => {
            tracing::warn!(stage = %item.name, minutes, "stage duration out of range, ignored");
            cursor
        }
    }
}

/// Projected timeline of one appointment
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Timeline {
    checkpoints: Vec<Checkpoint>,
}

impl Timeline {
    pub fn new(
        slot: Option<&AppointmentSlot>,
        services: &[ServiceLineItem],
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            checkpoints: project(slot, services, now),
        }
    }

    /// Timeline for an appointment; empty until a slot is assigned
    pub fn of(appointment: &Appointment, now: DateTime<Utc>) -> Self {
        Self::new(appointment.slot_id.as_ref(), &appointment.services, now)
    }

    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }

    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    /// First checkpoint not reached yet
    pub fn current_stage(&self) -> Option<&Checkpoint> {
        self.checkpoints.iter().find(|c| !c.reached)
    }

    /// Time of the `completed` checkpoint
    pub fn estimated_completion(&self) -> Option<DateTime<Utc>> {
        self.checkpoints.last().map(|c| c.time)
    }

    pub fn is_finished(&self) -> bool {
        self.checkpoints.last().is_some_and(|c| c.reached)
    }

    /// (reached, total)
    pub fn progress(&self) -> (usize, usize) {
        let reached = self.checkpoints.iter().filter(|c| c.reached).count();
        (reached, self.checkpoints.len())
    }
}

impl<'a> IntoIterator for &'a Timeline {
    type Item = &'a Checkpoint;
    type IntoIter = std::slice::Iter<'a, Checkpoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.checkpoints.iter()
    }
}

/// Remaining time until `until`, e.g. `"1h 05m"` or `"12m"`. Partial minutes
/// round up. Returns `"due"` once `now` has passed `until`.
pub fn format_countdown(now: DateTime<Utc>, until: DateTime<Utc>) -> String {
    if now >= until {
        return "due".to_string();
    }
    let remaining = until - now;
    let mut minutes = remaining.num_minutes();
    if Duration::try_minutes(minutes).is_some_and(|whole| remaining > whole) {
        minutes += 1;
    }
    let (hours, minutes) = (minutes / 60, minutes % 60);
    if hours > 0 {
        format!("{}h {:02}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 10, hour, minute, 0).unwrap()
    }

    fn slot(hour: u32, minute: u32) -> AppointmentSlot {
        AppointmentSlot::starting_at(at(hour, minute))
    }

    #[test]
    fn test_no_slot_yields_nothing() {
        let services = vec![ServiceLineItem::pending("Wash", 30)];
        assert!(project(None, &services, at(9, 0)).is_empty());
        assert!(project(None, &[], at(23, 0)).is_empty());
    }

    #[test]
    fn test_pending_stage_is_projected() {
        let services = vec![ServiceLineItem::pending("Wash", 30)];
        let checkpoints = project(Some(&slot(9, 0)), &services, at(9, 15));

        assert_eq!(
            checkpoints,
            vec![
                Checkpoint::new(RECEIVED, at(9, 0), true),
                Checkpoint::new("Wash", at(9, 30), false),
                Checkpoint::new(COMPLETED, at(9, 30), false),
            ]
        );
    }

    #[test]
    fn test_actual_completion_overrides_projection() {
        let services = vec![ServiceLineItem::done_at("Wash", 30, at(9, 10))];
        let checkpoints = project(Some(&slot(9, 0)), &services, at(9, 15));

        assert_eq!(
            checkpoints,
            vec![
                Checkpoint::new(RECEIVED, at(9, 0), true),
                Checkpoint::new("Wash", at(9, 10), true),
                Checkpoint::new(COMPLETED, at(9, 10), true),
            ]
        );
    }

    #[test]
    fn test_done_without_timestamp_is_projected_but_reached() {
        let mut wash = ServiceLineItem::pending("Wash", 30);
        wash.is_done = true;
        let checkpoints = project(Some(&slot(9, 0)), &[wash], at(9, 5));

        assert_eq!(checkpoints[1].time, at(9, 30));
        assert!(checkpoints[1].reached);
        assert!(!checkpoints[2].reached);
    }

    #[test]
    fn test_completion_time_ignored_until_done() {
        let mut wash = ServiceLineItem::pending("Wash", 30);
        wash.time_completed = Some(at(9, 10));
        let checkpoints = project(Some(&slot(9, 0)), &[wash], at(9, 15));

        assert_eq!(checkpoints[1].label, "Wash");
        assert_eq!(checkpoints[1].time, at(9, 30));
        assert!(!checkpoints[1].reached);
        assert_eq!(checkpoints[2].time, at(9, 30));
        assert!(!checkpoints[2].reached);
    }

    #[test]
    fn test_early_completion_shifts_later_estimates() {
        let services = vec![
            ServiceLineItem::done_at("Wash", 30, at(9, 10)),
            ServiceLineItem::pending("Wax", 20),
            ServiceLineItem::pending("Vacuum", 15),
        ];
        let checkpoints = project(Some(&slot(9, 0)), &services, at(9, 12));

        let times: Vec<_> = checkpoints.iter().map(|c| c.time).collect();
        assert_eq!(times, vec![at(9, 0), at(9, 10), at(9, 30), at(9, 45), at(9, 45)]);
        let reached: Vec<_> = checkpoints.iter().map(|c| c.reached).collect();
        assert_eq!(reached, vec![true, true, false, false, false]);
    }

    #[test]
    fn test_empty_services() {
        let checkpoints = project(Some(&slot(9, 0)), &[], at(8, 0));
        assert_eq!(
            checkpoints,
            vec![
                Checkpoint::new(RECEIVED, at(9, 0), true),
                Checkpoint::new(COMPLETED, at(9, 0), false),
            ]
        );

        let checkpoints = project(Some(&slot(9, 0)), &[], at(9, 0));
        assert!(checkpoints[1].reached);
    }

    #[test]
    fn test_received_is_reached_before_start() {
        let services = vec![ServiceLineItem::pending("Wash", 30)];
        let checkpoints = project(Some(&slot(9, 0)), &services, at(7, 0));
        assert!(checkpoints[0].reached);
        assert!(!checkpoints[1].reached);
    }

    #[test]
    fn test_zero_duration_coincides_with_predecessor() {
        let services = vec![
            ServiceLineItem::pending("Inspect", 0),
            ServiceLineItem::pending("Wash", 30),
        ];
        let checkpoints = project(Some(&slot(9, 0)), &services, at(9, 0));

        assert_eq!(checkpoints[1].time, at(9, 0));
        assert!(checkpoints[1].reached);
        assert_eq!(checkpoints[2].time, at(9, 30));
    }

    #[test]
    fn test_negative_duration_is_clamped() {
        let services = vec![
            ServiceLineItem::pending("Wash", 30),
            ServiceLineItem::pending("Refund", -45),
            ServiceLineItem::pending("Wax", 10),
        ];
        let checkpoints = project(Some(&slot(9, 0)), &services, at(9, 0));

        let times: Vec<_> = checkpoints.iter().map(|c| c.time).collect();
        assert_eq!(times, vec![at(9, 0), at(9, 30), at(9, 30), at(9, 40), at(9, 40)]);
        assert!(times.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_reached_whenever_now_has_passed() {
        let services = vec![
            ServiceLineItem::pending("Wash", 30),
            ServiceLineItem::pending("Wax", 20),
            ServiceLineItem::pending("Polish", 40),
        ];
        for minute in (0..=120).step_by(5) {
            let now = at(9, 0) + Duration::minutes(minute);
            let checkpoints = project(Some(&slot(9, 0)), &services, now);
            assert_eq!(checkpoints.len(), services.len() + 2);
            for checkpoint in &checkpoints {
                if now >= checkpoint.time {
                    assert!(checkpoint.reached, "{} at {}", checkpoint.label, now);
                }
            }
        }
    }

    #[test]
    fn test_projection_is_repeatable() {
        let services = vec![
            ServiceLineItem::done_at("Wash", 30, at(9, 40)),
            ServiceLineItem::pending("Wax", 20),
        ];
        let first = project(Some(&slot(9, 0)), &services, at(9, 50));
        let second = project(Some(&slot(9, 0)), &services, at(9, 50));
        assert_eq!(first, second);
    }

    #[test]
    fn test_timeline_helpers() {
        let services = vec![
            ServiceLineItem::done_at("Wash", 30, at(9, 25)),
            ServiceLineItem::pending("Wax", 20),
        ];
        let timeline = Timeline::new(Some(&slot(9, 0)), &services, at(9, 30));

        assert_eq!(timeline.len(), 4);
        assert_eq!(timeline.current_stage().map(|c| c.label.as_str()), Some("Wax"));
        assert_eq!(timeline.estimated_completion(), Some(at(9, 45)));
        assert_eq!(timeline.progress(), (2, 4));
        assert!(!timeline.is_finished());

        let done = Timeline::new(Some(&slot(9, 0)), &services, at(10, 0));
        assert!(done.is_finished());
        assert!(done.current_stage().is_none());

        let empty = Timeline::new(None, &services, at(10, 0));
        assert!(empty.is_empty());
        assert_eq!(empty.estimated_completion(), None);
        assert!(!empty.is_finished());
    }

    #[test]
    fn test_format_countdown() {
        assert_eq!(format_countdown(at(9, 0), at(9, 12)), "12m");
        assert_eq!(format_countdown(at(9, 0), at(10, 5)), "1h 05m");
        assert_eq!(format_countdown(at(9, 0), at(9, 0)), "due");
        assert_eq!(format_countdown(at(9, 30), at(9, 0)), "due");

        let almost = at(9, 0) + Duration::seconds(30);
        assert_eq!(format_countdown(at(9, 0), almost), "1m");

        let until = at(9, 0);
        assert_eq!(format_countdown(until - Duration::milliseconds(400), until), "1m");
        assert_eq!(format_countdown(until - Duration::milliseconds(60_400), until), "2m");
        assert_eq!(format_countdown(until - Duration::nanoseconds(1), until), "1m");
        assert_eq!(format_countdown(until - Duration::minutes(60), until), "1h 00m");
    }
}
