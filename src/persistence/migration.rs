//! Decoding of stored documents. Three shapes are understood:
//!  - version 2, the current one: `{ version, activities, activeActivities, history }`.
//!  - unversioned activities with embedded timers: `{ activities, activeActivities }`. The
//!    browser app kept them wrapped as `{ "state": { ... }, "version": 0 }`, which is unwrapped
//!    first.
//!  - unversioned session lists: `{ activities, sessions, activeSession }`, where activities only
//!    had a name and a colour and runs were kept as separate sessions.

use std::collections::HashSet;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::store::{
    entities::{Activity, Session, StoreState},
    DEFAULT_COLOR,
};

pub const CURRENT_VERSION: u64 = 2;

/// Version the browser app stamped on its wrapped state.
const BROWSER_VERSION: u64 = 0;

#[derive(Serialize)]
struct VersionedDocument<'a> {
    version: u64,
    #[serde(flatten)]
    state: &'a StoreState,
}

/// Serializes state into the current document shape.
pub fn encode(state: &StoreState) -> Result<Vec<u8>> {
    let document = VersionedDocument {
        version: CURRENT_VERSION,
        state,
    };
    Ok(serde_json::to_vec_pretty(&document)?)
}

/// Parses any known document shape into the current state. `now` and `default_duration` fill in
/// timer fields that older shapes didn't have.
pub fn decode(content: &str, now: DateTime<Utc>, default_duration: Duration) -> Result<StoreState> {
    let document: Value = serde_json::from_str(content).context("State is not valid json")?;
    let document = unwrap_browser_state(document);
    let Some(object) = document.as_object() else {
        bail!("State document must be a json object");
    };

    let version = object
        .get("version")
        .map(|v| v.as_u64().ok_or_else(|| anyhow!("Invalid state version {v}")))
        .transpose()?;
    let has_timers = object.contains_key("activeActivities");
    let has_sessions = object.contains_key("sessions") || object.contains_key("activeSession");

    let state = match version {
        Some(CURRENT_VERSION) => {
            serde_json::from_value::<StoreState>(document).context("Malformed state document")?
        }
        Some(version) => bail!("Unsupported state version {version}"),
        None if has_timers => {
            info!("Upgrading unversioned timer state");
            serde_json::from_value::<StoreState>(document)
                .context("Malformed unversioned timer state")?
        }
        None if has_sessions => {
            info!("Upgrading session based state");
            let document = serde_json::from_value::<SessionDocument>(document)
                .context("Malformed session based state")?;
            migrate_sessions(document, now, default_duration)
        }
        None => bail!("Unrecognized state document"),
    };

    Ok(repair_active_set(state))
}

fn unwrap_browser_state(document: Value) -> Value {
    match document {
        Value::Object(mut object)
            if object.get("version").and_then(Value::as_u64) == Some(BROWSER_VERSION)
                && object.get("state").is_some_and(Value::is_object) =>
        {
            info!("Unwrapping browser state");
            object.remove("state").unwrap_or(Value::Null)
        }
        other => other,
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyActivity {
    id: Uuid,
    name: String,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionDocument {
    #[serde(default)]
    activities: Vec<LegacyActivity>,
    #[serde(default)]
    sessions: Vec<Session>,
    #[serde(default)]
    active_session: Option<Session>,
}

fn migrate_sessions(
    document: SessionDocument,
    now: DateTime<Utc>,
    default_duration: Duration,
) -> StoreState {
    let mut activities = document
        .activities
        .into_iter()
        .map(|v| {
            let mut activity = Activity::new(
                v.name,
                v.color.unwrap_or_else(|| DEFAULT_COLOR.into()),
                default_duration,
                v.description,
                now,
            );
            activity.id = v.id;
            activity
        })
        .collect::<Vec<_>>();

    let mut history = vec![];
    let mut running = None;
    let mut seen = HashSet::new();
    for session in document.sessions.into_iter().chain(document.active_session) {
        if !seen.insert(session.id) {
            continue;
        }
        if session.is_running() {
            if let Some(previous) = running.replace(session) {
                // Only one session could run at a time. Keep the latest one.
                warn!("Dropping extra running session {:?}", previous);
            }
        } else {
            history.push(session);
        }
    }

    let mut active_activities = vec![];
    if let Some(session) = running {
        match activities.iter_mut().find(|v| v.id == session.activity_id) {
            Some(activity) => {
                activity.start_at(session.start_time);
                active_activities.push(activity.clone());
            }
            None => warn!(
                "Running session {} points at missing activity {}",
                session.id, session.activity_id
            ),
        }
    }

    StoreState {
        activities,
        active_activities,
        history,
    }
}

/// The activity list decides what is running. The active set is rebuilt to agree with it, keeping
/// its order where possible.
fn repair_active_set(mut state: StoreState) -> StoreState {
    let running = state
        .activities
        .iter()
        .filter(|v| v.is_active)
        .collect::<Vec<_>>();

    let mut repaired = Vec::with_capacity(running.len());
    for entry in &state.active_activities {
        if let Some(activity) = running.iter().find(|v| v.id == entry.id) {
            if !repaired.iter().any(|v: &Activity| v.id == entry.id) {
                repaired.push((*activity).clone());
            }
        }
    }
    for activity in running {
        if !repaired.iter().any(|v| v.id == activity.id) {
            repaired.push(activity.clone());
        }
    }

    if repaired != state.active_activities {
        warn!(
            "Active set disagreed with activities, repaired {} entries into {}",
            state.active_activities.len(),
            repaired.len()
        );
    } else {
        debug!("Active set is consistent");
    }
    state.active_activities = repaired;
    state
}
