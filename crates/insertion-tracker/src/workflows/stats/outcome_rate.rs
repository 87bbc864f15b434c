use chrono::{DateTime, Duration, Utc};

use super::views::StatusCount;
use crate::workflows::engagement::domain::ContextStatus;
use crate::workflows::engagement::tracker::EngagementSnapshot;

/// Percentage of contexts seen within `days` of their creation.
///
/// Contexts created less than `days` before `now` are too young to judge and
/// are left out of both sides of the ratio. Returns `None` when nothing is
/// old enough, including windows longer than the representable calendar.
pub fn rate_of_seen_within_window(
    snapshots: &[EngagementSnapshot],
    days: u32,
    now: DateTime<Utc>,
) -> Option<f64> {
    let window = Duration::days(i64::from(days));
    // A window reaching past the calendar range leaves nothing old enough.
    let cutoff = now.checked_sub_signed(window)?;

    let eligible: Vec<&EngagementSnapshot> = snapshots
        .iter()
        .filter(|snapshot| snapshot.created_at <= cutoff)
        .collect();
    if eligible.is_empty() {
        return None;
    }

    let seen_in_time = eligible
        .iter()
        .filter(|snapshot| {
            snapshot
                .seen_delay()
                .map_or(false, |delay| delay <= window)
        })
        .count();

    Some(seen_in_time as f64 / eligible.len() as f64 * 100.0)
}

/// Mean number of days between creation and the appointment a context was
/// seen at.
pub fn average_seen_delay_days(snapshots: &[EngagementSnapshot]) -> Option<f64> {
    let delays: Vec<f64> = snapshots
        .iter()
        .filter_map(EngagementSnapshot::seen_delay)
        .map(|delay| delay.num_seconds() as f64 / 86_400.0)
        .collect();
    if delays.is_empty() {
        return None;
    }
    Some(delays.iter().sum::<f64>() / delays.len() as f64)
}

pub fn status_breakdown(snapshots: &[EngagementSnapshot]) -> Vec<StatusCount> {
    ContextStatus::ordered()
        .into_iter()
        .filter_map(|status| {
            let count = snapshots
                .iter()
                .filter(|snapshot| snapshot.status == status)
                .count();
            (count > 0).then(|| StatusCount {
                status,
                status_label: status.label(),
                human_label: status.human_label(),
                count,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::engagement::domain::{
        ApplicantId, AppointmentId, AppointmentStatus, ContextId, ProgramTrack,
    };
    use crate::workflows::engagement::tracker::ResolvingAppointment;
    use chrono::TimeZone;

    fn snapshot(
        id: &str,
        created_at: DateTime<Utc>,
        seen_at: Option<DateTime<Utc>>,
    ) -> EngagementSnapshot {
        EngagementSnapshot {
            context_id: ContextId(id.to_string()),
            applicant_id: ApplicantId(format!("applicant-{id}")),
            track: ProgramTrack("rsa_orientation".to_string()),
            created_at,
            status: if seen_at.is_some() {
                ContextStatus::RdvSeen
            } else {
                ContextStatus::InvitationPending
            },
            last_invitation_sent_at: None,
            resolving: seen_at.map(|starts_at| ResolvingAppointment {
                appointment_id: AppointmentId(format!("rdv-{id}")),
                status: AppointmentStatus::Seen,
                starts_at,
            }),
        }
    }

    fn created_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 3, 17, 12, 0, 0).unwrap()
    }

    fn scenario(days: i64, late_by: i64, now: DateTime<Utc>) -> Vec<EngagementSnapshot> {
        vec![
            snapshot("1", created_at(), Some(created_at() + Duration::days(2))),
            snapshot("2", created_at(), Some(created_at() + Duration::days(days + late_by))),
            snapshot("3", created_at(), None),
            snapshot(
                "4",
                now - Duration::days(days / 2 + 5),
                Some(now - Duration::days(days / 2)),
            ),
        ]
    }

    #[test]
    fn thirty_day_window_excludes_young_contexts() {
        let now = Utc.with_ymd_and_hms(2022, 4, 25, 12, 0, 0).unwrap();
        let rate = rate_of_seen_within_window(&scenario(30, 3, now), 30, now);
        assert_eq!(rate, Some(33.33333333333333));
    }

    #[test]
    fn fifteen_day_window_excludes_young_contexts() {
        let now = Utc.with_ymd_and_hms(2022, 4, 10, 12, 0, 0).unwrap();
        let rate = rate_of_seen_within_window(&scenario(15, 1, now), 15, now);
        assert_eq!(rate, Some(33.33333333333333));
    }

    #[test]
    fn empty_eligible_set_has_no_rate() {
        let now = Utc.with_ymd_and_hms(2022, 4, 25, 12, 0, 0).unwrap();
        let young = vec![snapshot("1", now - Duration::days(3), None)];
        assert_eq!(rate_of_seen_within_window(&young, 30, now), None);
        assert_eq!(rate_of_seen_within_window(&[], 30, now), None);
    }

    #[test]
    fn delay_equal_to_window_counts() {
        let now = Utc.with_ymd_and_hms(2022, 4, 25, 12, 0, 0).unwrap();
        let snapshots = vec![snapshot(
            "1",
            created_at(),
            Some(created_at() + Duration::days(30)),
        )];
        assert_eq!(rate_of_seen_within_window(&snapshots, 30, now), Some(100.0));
    }

    #[test]
    fn window_beyond_calendar_range_has_no_rate() {
        let now = Utc.with_ymd_and_hms(2022, 4, 25, 12, 0, 0).unwrap();
        let snapshots = scenario(30, 3, now);
        assert_eq!(rate_of_seen_within_window(&snapshots, 200_000_000, now), None);
        assert_eq!(rate_of_seen_within_window(&[], u32::MAX, Utc::now()), None);
    }

    #[test]
    fn cancelled_resolution_is_not_a_seen_delay() {
        let now = Utc.with_ymd_and_hms(2022, 4, 25, 12, 0, 0).unwrap();
        let mut noshow = snapshot("1", created_at(), Some(created_at() + Duration::days(1)));
        noshow.status = ContextStatus::RdvNoshow;
        if let Some(resolving) = noshow.resolving.as_mut() {
            resolving.status = AppointmentStatus::Noshow;
        }
        assert_eq!(rate_of_seen_within_window(&[noshow.clone()], 30, now), Some(0.0));
        assert_eq!(average_seen_delay_days(&[noshow]), None);
    }

    #[test]
    fn average_delay_counts_seen_contexts_only() {
        let snapshots = vec![
            snapshot("1", created_at(), Some(created_at() + Duration::days(2))),
            snapshot("2", created_at(), Some(created_at() + Duration::days(5))),
            snapshot("3", created_at(), None),
        ];
        assert_eq!(average_seen_delay_days(&snapshots), Some(3.5));
    }

    #[test]
    fn breakdown_follows_status_order() {
        let snapshots = vec![
            snapshot("1", created_at(), None),
            snapshot("2", created_at(), Some(created_at() + Duration::days(2))),
            snapshot("3", created_at(), None),
        ];
        let breakdown = status_breakdown(&snapshots);
        let labels: Vec<_> = breakdown
            .iter()
            .map(|entry| (entry.status_label, entry.count))
            .collect();
        assert_eq!(labels, vec![("invitation_pending", 2), ("rdv_seen", 1)]);
    }
}
