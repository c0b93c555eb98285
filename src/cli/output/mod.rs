pub mod analysis;

use std::fmt::Write;

use ansi_term::{Colour, Style};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    store::{
        entities::{Activity, Session},
        ActivityStore,
    },
    utils::time::format_duration,
};

/// Bounds of a history listing. `start: None` means since the beginning.
pub struct ExtractConfig {
    pub start: Option<DateTime<Utc>>,
    pub end: DateTime<Utc>,
}

/// Returns finished sessions trimmed to the range, ordered by start.
pub fn extract_between(history: &[Session], config: &ExtractConfig) -> Vec<Session> {
    let mut sessions = history
        .iter()
        .filter_map(|v| v.clamp(config.start, config.end))
        .collect::<Vec<_>>();
    sessions.sort_by_key(|v| v.start_time);
    sessions
}

/// First block of an id, enough to tell entries apart in a listing.
pub fn short_id(id: Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}

/// Picks a terminal colour from a tag like `bg-blue-500` by looking at its words. Unknown tags
/// get no colour.
pub fn tag_colour(tag: &str) -> Option<Colour> {
    tag.split(&['-', ' ', '_'][..]).find_map(|word| {
        Some(match word.to_ascii_lowercase().as_str() {
            "red" | "rose" => Colour::Red,
            "green" | "emerald" | "lime" => Colour::Green,
            "yellow" | "amber" => Colour::Yellow,
            "blue" | "sky" => Colour::Blue,
            "purple" | "violet" | "fuchsia" => Colour::Purple,
            "cyan" | "teal" => Colour::Cyan,
            "white" => Colour::White,
            "black" => Colour::Black,
            "gray" | "grey" | "slate" | "zinc" | "neutral" | "stone" => Colour::Fixed(245),
            "orange" => Colour::Fixed(208),
            "pink" => Colour::Fixed(205),
            "indigo" => Colour::Fixed(63),
            _ => return None,
        })
    })
}

fn paint(activity: &Activity, coloured: bool) -> String {
    match tag_colour(&activity.color).filter(|_| coloured) {
        Some(colour) => Style::new().bold().fg(colour).paint(activity.name.as_str()).to_string(),
        None => activity.name.clone(),
    }
}

/// Renders every activity as one tile line: a running marker, the id, the name and what is left
/// on the countdown as of the store's current time.
pub fn render_tiles(store: &ActivityStore, coloured: bool) -> String {
    let now = store.now();
    let mut out = String::new();

    if store.activities().is_empty() {
        out.push_str("No activities yet. Create one with `crono add <name>`.\n");
        return out;
    }

    for activity in store.activities() {
        let running = store.is_active(activity.id);
        let marker = if running { '>' } else { ' ' };
        let remaining = activity.remaining_at(now);
        let _ = write!(
            out,
            "{marker} {}  {}  {} left",
            short_id(activity.id),
            paint(activity, coloured),
            format_duration(remaining)
        );
        if let Some(elapsed) = activity.elapsed_at(now) {
            let _ = write!(out, "  running for {}", format_duration(elapsed));
        }
        if activity.is_exhausted_at(now) {
            out.push_str("  (time is up)");
        }
        out.push('\n');
    }

    let running = store.active_activities().len();
    if running > 0 {
        let _ = writeln!(
            out,
            "\n{running} running. Stop them all with `crono stop-all`."
        );
    }
    out
}
