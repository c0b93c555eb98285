use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named countdown the user can start and stop. Timer state lives on the activity itself:
/// while running, `end_time` is the moment the countdown would reach zero, and `time_left` is only
/// brought up to date when the activity is stopped.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: Uuid,
    pub name: String,
    /// Class-like colour tag, for example `bg-blue-500`.
    pub color: String,
    #[serde(default)]
    pub description: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end_time: DateTime<Utc>,
    #[serde(with = "duration_ms")]
    pub time_left: Duration,
    pub is_active: bool,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_milliseconds_option"
    )]
    pub stop_time: Option<DateTime<Utc>>,
}

impl Activity {
    pub fn new(
        name: String,
        color: String,
        duration: Duration,
        description: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            color,
            description: description.unwrap_or_default(),
            start_time: now,
            end_time: DateTime::<Utc>::UNIX_EPOCH,
            time_left: duration,
            is_active: false,
            stop_time: None,
        }
    }

    /// Time left on the countdown as of `now`. Never negative.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Duration {
        if self.is_active {
            (self.end_time - now).max(Duration::zero())
        } else {
            self.time_left
        }
    }

    /// How long the current run has lasted. `None` while stopped.
    pub fn elapsed_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.is_active
            .then(|| (now - self.start_time).max(Duration::zero()))
    }

    /// Nothing fires when a countdown runs out, this is only ever asked at render time.
    pub fn is_exhausted_at(&self, now: DateTime<Utc>) -> bool {
        self.remaining_at(now).is_zero()
    }

    pub(crate) fn start_at(&mut self, now: DateTime<Utc>) {
        self.start_time = now;
        // Countdowns too long to fit a date never reach zero.
        self.end_time = now
            .checked_add_signed(self.time_left)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.is_active = true;
        self.stop_time = None;
    }

    /// Stops the run and returns it as a finished [Session].
    pub(crate) fn stop_at(&mut self, now: DateTime<Utc>) -> Session {
        self.time_left = (self.end_time - now).max(Duration::zero());
        self.is_active = false;
        self.stop_time = Some(now);
        Session::completed(self.id, self.start_time, now)
    }

    pub(crate) fn apply(&mut self, patch: &ActivityPatch) {
        let ActivityPatch {
            name,
            color,
            description,
            start_time,
            end_time,
            time_left,
            stop_time,
        } = patch;
        if let Some(v) = name {
            self.name = v.clone();
        }
        if let Some(v) = color {
            self.color = v.clone();
        }
        if let Some(v) = description {
            self.description = v.clone();
        }
        if let Some(v) = start_time {
            self.start_time = *v;
        }
        if let Some(v) = end_time {
            self.end_time = *v;
        }
        if let Some(v) = time_left {
            self.time_left = *v;
        }
        if let Some(v) = stop_time {
            self.stop_time = *v;
        }
    }
}

/// Fields to overwrite on an [Activity]. `None` leaves a field untouched. The id can't be patched
/// and neither can the active flag, which only changes through starting and stopping.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ActivityPatch {
    pub name: Option<String>,
    pub color: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub time_left: Option<Duration>,
    pub stop_time: Option<Option<DateTime<Utc>>>,
}

impl ActivityPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// One run of an activity. Sessions reference their activity and outlive it, so history keeps
/// entries for activities that were removed since.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Uuid,
    pub activity_id: Uuid,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_milliseconds_option"
    )]
    pub end_time: Option<DateTime<Utc>>,
}

impl Session {
    pub fn completed(activity_id: Uuid, start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            activity_id,
            start_time,
            end_time: Some(end_time),
        }
    }

    pub fn is_running(&self) -> bool {
        self.end_time.is_none()
    }

    pub fn duration(&self) -> Option<Duration> {
        self.end_time.map(|end| (end - self.start_time).max(Duration::zero()))
    }

    /// Returns the part of a completed session that falls inside `[from, to)`. Because the
    /// session might lie outside of the range the result is optional.
    pub fn clamp(&self, from: Option<DateTime<Utc>>, to: DateTime<Utc>) -> Option<Session> {
        let end = self.end_time?;
        // Sessions stopped right after starting have no length but still count as inside.
        let overlaps = self.start_time < to
            && from.map_or(true, |from| end > from || (end == self.start_time && end >= from));
        if !overlaps {
            return None;
        }
        let start = from.map_or(self.start_time, |from| self.start_time.max(from));
        let end = end.min(to);
        Some(Session {
            id: self.id,
            activity_id: self.activity_id,
            start_time: start,
            end_time: Some(end),
        })
    }
}

/// Everything the store owns. This is also what gets persisted.
#[derive(PartialEq, Eq, Debug, Default, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StoreState {
    pub activities: Vec<Activity>,
    pub active_activities: Vec<Activity>,
    #[serde(default)]
    pub history: Vec<Session>,
}

mod duration_ms {
    use chrono::Duration;
    use serde::{self, de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(duration.num_milliseconds())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = i64::deserialize(deserializer)?;
        if ms < 0 {
            return Err(D::Error::custom(format!("duration of {ms}ms is negative")));
        }
        Duration::try_milliseconds(ms)
            .ok_or_else(|| D::Error::custom(format!("duration of {ms}ms is out of range")))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
    use uuid::Uuid;

    use super::{Activity, ActivityPatch, Session};

    const TEST_START_DATE: NaiveDateTime =
        NaiveDateTime::new(NaiveDate::from_ymd_opt(2024, 4, 5).unwrap(), NaiveTime::MIN);

    fn start() -> DateTime<Utc> {
        Utc.from_utc_datetime(&TEST_START_DATE)
    }

    fn read() -> Activity {
        Activity::new(
            "Read".into(),
            "bg-blue-500".into(),
            Duration::minutes(30),
            None,
            start(),
        )
    }

    #[test]
    fn remaining_is_derived_from_end_time_while_running() {
        let mut activity = read();
        assert_eq!(activity.remaining_at(start()), Duration::minutes(30));

        activity.start_at(start());
        let later = start() + Duration::minutes(10);
        assert_eq!(activity.remaining_at(later), Duration::minutes(20));
        assert_eq!(activity.elapsed_at(later), Some(Duration::minutes(10)));
        // Stored value is untouched until the activity stops.
        assert_eq!(activity.time_left, Duration::minutes(30));
    }

    #[test]
    fn overshooting_run_is_clamped_to_zero() {
        let mut activity = read();
        activity.start_at(start());
        let way_later = start() + Duration::hours(2);
        assert!(activity.is_exhausted_at(way_later));

        let session = activity.stop_at(way_later);
        assert_eq!(activity.time_left, Duration::zero());
        assert_eq!(session.duration(), Some(Duration::hours(2)));
    }

    #[test]
    fn patch_leaves_missing_fields_alone() {
        let mut activity = read();
        activity.apply(&ActivityPatch {
            name: Some("Write".into()),
            time_left: Some(Duration::minutes(5)),
            ..Default::default()
        });
        assert_eq!(activity.name, "Write");
        assert_eq!(activity.color, "bg-blue-500");
        assert_eq!(activity.time_left, Duration::minutes(5));
        assert!(ActivityPatch::default().is_empty());
    }

    #[test]
    fn serializes_with_camel_case_millisecond_fields() {
        let activity = read();
        let value = serde_json::to_value(&activity).unwrap();
        assert_eq!(value["timeLeft"], 30 * 60 * 1000);
        assert_eq!(value["startTime"], start().timestamp_millis());
        assert_eq!(value["endTime"], 0);
        assert_eq!(value["isActive"], false);
        assert!(value.get("stopTime").is_none());
    }

    #[test]
    fn huge_countdown_starts_without_overflowing() {
        let mut activity = read();
        activity.time_left = Duration::MAX;

        activity.start_at(start());
        assert_eq!(activity.end_time, DateTime::<Utc>::MAX_UTC);
        assert!(!activity.is_exhausted_at(start() + Duration::days(365)));

        let session = activity.stop_at(start() + Duration::hours(1));
        assert_eq!(session.duration(), Some(Duration::hours(1)));
    }

    #[test]
    fn out_of_range_time_left_is_rejected() {
        let mut value = serde_json::to_value(read()).unwrap();
        for ms in [i64::MIN, -1] {
            value["timeLeft"] = ms.into();
            assert!(serde_json::from_value::<Activity>(value.clone()).is_err());
        }

        value["timeLeft"] = i64::MAX.into();
        let activity = serde_json::from_value::<Activity>(value).unwrap();
        assert_eq!(activity.time_left, Duration::MAX);
    }

    #[test]
    fn clamp_trims_session_to_range() {
        let session = Session::completed(Uuid::new_v4(), start(), start() + Duration::hours(2));

        let clamped = session
            .clamp(Some(start() + Duration::hours(1)), start() + Duration::hours(3))
            .unwrap();
        assert_eq!(clamped.duration(), Some(Duration::hours(1)));

        assert!(session
            .clamp(Some(start() + Duration::hours(3)), start() + Duration::hours(4))
            .is_none());
        assert_eq!(
            session.clamp(None, start() + Duration::hours(4)).unwrap(),
            session
        );
    }

    #[test]
    fn running_session_has_no_duration() {
        let session = Session {
            id: Uuid::new_v4(),
            activity_id: Uuid::new_v4(),
            start_time: start(),
            end_time: None,
        };
        assert!(session.is_running());
        assert_eq!(session.duration(), None);
        assert!(session.clamp(None, start() + Duration::hours(1)).is_none());
    }
}
