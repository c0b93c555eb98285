use std::collections::HashMap;

use chrono::Duration;
use uuid::Uuid;

use crate::store::entities::{Activity, Session};

pub const REMOVED_ACTIVITY: &str = "(removed)";

#[derive(Debug)]
pub struct ActivityUsage {
    pub activity_id: Uuid,
    pub name: String,
    pub duration: Duration,
    pub sessions: usize,
}

impl ActivityUsage {
    fn new(activity_id: Uuid, name: String) -> Self {
        Self {
            activity_id,
            name,
            duration: Duration::zero(),
            sessions: 0,
        }
    }
}

/// Name to show for a session, falling back to [REMOVED_ACTIVITY] once the activity is gone.
pub fn activity_name(activities: &[Activity], id: Uuid) -> &str {
    activities
        .iter()
        .find(|v| v.id == id)
        .map_or(REMOVED_ACTIVITY, |v| v.name.as_str())
}

/// Returns time spent per activity, longest first, together with the total.
pub fn analyze_sessions(
    sessions: &[Session],
    activities: &[Activity],
) -> (Vec<ActivityUsage>, Duration) {
    let mut map = HashMap::<Uuid, ActivityUsage>::new();

    let mut total = Duration::zero();

    for session in sessions {
        let Some(duration) = session.duration() else {
            continue;
        };
        total += duration;
        let usage = map.entry(session.activity_id).or_insert_with(|| {
            ActivityUsage::new(
                session.activity_id,
                activity_name(activities, session.activity_id).to_string(),
            )
        });
        usage.duration += duration;
        usage.sessions += 1;
    }

    let mut usages = map.into_values().collect::<Vec<_>>();
    usages.sort_by(|a, b| b.duration.cmp(&a.duration).then_with(|| a.name.cmp(&b.name)));
    (usages, total)
}
