//! The activity store owns every activity, the set of running ones and the history of finished
//! runs. The basic idea is:
//!  - Timers never tick. Remaining time is derived from `end_time - now` whenever it is needed.
//!  - Lookups of unknown ids do nothing, and report that back through the return value.
//!  - The store never persists itself, callers save through [crate::persistence] when they are
//!    done mutating.

pub mod entities;

use std::{collections::HashSet, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use entities::{Activity, ActivityPatch, Session, StoreState};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::utils::clock::Clock;

pub const DEFAULT_DURATION: Duration = Duration::minutes(30);
pub const DEFAULT_COLOR: &str = "bg-blue-500";

pub struct ActivityStore {
    state: StoreState,
    clock: Arc<dyn Clock>,
}

impl ActivityStore {
    pub fn new(state: StoreState, clock: Arc<dyn Clock>) -> Self {
        Self { state, clock }
    }

    pub fn empty(clock: Arc<dyn Clock>) -> Self {
        Self::new(StoreState::default(), clock)
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.time()
    }

    pub fn state(&self) -> &StoreState {
        &self.state
    }

    pub fn into_state(self) -> StoreState {
        self.state
    }

    pub fn activities(&self) -> &[Activity] {
        &self.state.activities
    }

    pub fn active_activities(&self) -> &[Activity] {
        &self.state.active_activities
    }

    pub fn history(&self) -> &[Session] {
        &self.state.history
    }

    pub fn find(&self, id: Uuid) -> Option<&Activity> {
        self.state.activities.iter().find(|v| v.id == id)
    }

    pub fn is_active(&self, id: Uuid) -> bool {
        self.state.active_activities.iter().any(|v| v.id == id)
    }

    fn find_mut(&mut self, id: Uuid) -> Option<&mut Activity> {
        self.state.activities.iter_mut().find(|v| v.id == id)
    }

    /// Appends a new stopped activity holding `duration` on its countdown. Names don't have to be
    /// unique.
    pub fn add_activity(
        &mut self,
        name: impl Into<String>,
        color: impl Into<String>,
        duration: Duration,
        description: Option<String>,
    ) -> Uuid {
        let activity = Activity::new(
            name.into(),
            color.into(),
            duration,
            description,
            self.clock.time(),
        );
        let id = activity.id;
        info!("Added activity {:?} ({id})", activity.name);
        self.state.activities.push(activity);
        id
    }

    /// Removes an activity together with its active entry. Its history stays.
    pub fn remove_activity(&mut self, id: Uuid) -> bool {
        let before = self.state.activities.len();
        self.state.activities.retain(|v| v.id != id);
        self.state.active_activities.retain(|v| v.id != id);
        let removed = self.state.activities.len() != before;
        if removed {
            info!("Removed activity {id}");
        } else {
            warn!("Tried to remove unknown activity {id}");
        }
        removed
    }

    /// Starts the countdown from whatever time is left. Starting a running activity restarts it
    /// and replaces its active entry.
    pub fn start_activity(&mut self, id: Uuid) -> bool {
        let now = self.clock.time();
        let Some(activity) = self.find_mut(id) else {
            warn!("Tried to start unknown activity {id}");
            return false;
        };
        activity.start_at(now);
        let started = activity.clone();

        info!(
            "Started activity {:?}, ends at {}",
            started.name, started.end_time
        );
        self.state.active_activities.retain(|v| v.id != id);
        self.state.active_activities.push(started);
        true
    }

    /// Stops a running activity, keeping whatever is left on its countdown and recording the run
    /// in history. Stopping an activity that isn't running does nothing.
    pub fn stop_activity(&mut self, id: Uuid) -> bool {
        let now = self.clock.time();
        let Some(activity) = self.find_mut(id) else {
            warn!("Tried to stop unknown activity {id}");
            return false;
        };
        if !activity.is_active {
            debug!("Activity {id} is not running");
            return false;
        }
        let session = activity.stop_at(now);
        info!(
            "Stopped activity {:?} with {} left",
            activity.name, activity.time_left
        );

        self.state.active_activities.retain(|v| v.id != id);
        self.state.history.push(session);
        true
    }

    /// Starts a stopped activity or stops a running one. Returns whether it is running afterwards,
    /// or `None` for an unknown id.
    pub fn toggle_activity(&mut self, id: Uuid) -> Option<bool> {
        let is_active = self.find(id)?.is_active;
        if is_active {
            self.stop_activity(id);
        } else {
            self.start_activity(id);
        }
        Some(!is_active)
    }

    /// Stops everything in a single update. All runs end at the same instant.
    pub fn clear_active_activities(&mut self) -> usize {
        let now = self.clock.time();
        let active_ids = self
            .state
            .active_activities
            .iter()
            .map(|v| v.id)
            .collect::<HashSet<_>>();

        let mut sessions = Vec::with_capacity(active_ids.len());
        for activity in self
            .state
            .activities
            .iter_mut()
            .filter(|v| active_ids.contains(&v.id))
        {
            sessions.push(activity.stop_at(now));
        }

        let stopped = sessions.len();
        self.state.history.extend(sessions);
        self.state.active_activities.clear();
        info!("Stopped {stopped} activities");
        stopped
    }

    /// Merges `patch` into the activity and into its active entry if it has one.
    pub fn update_activity(&mut self, id: Uuid, patch: &ActivityPatch) -> bool {
        let mut found = false;
        for activity in self
            .state
            .activities
            .iter_mut()
            .chain(self.state.active_activities.iter_mut())
            .filter(|v| v.id == id)
        {
            activity.apply(patch);
            found = true;
        }
        if found {
            info!("Updated activity {id} with {patch:?}");
        } else {
            warn!("Tried to update unknown activity {id}");
        }
        found
    }

    pub fn remove_history_entry(&mut self, id: Uuid) -> bool {
        let before = self.state.history.len();
        self.state.history.retain(|v| v.id != id);
        let removed = self.state.history.len() != before;
        if !removed {
            warn!("Tried to remove unknown history entry {id}");
        }
        removed
    }

    pub fn reset_store(&mut self) {
        info!("Resetting store");
        self.state = StoreState::default();
    }
}
