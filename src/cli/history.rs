use std::fmt::Display;

use anyhow::Result;
use chrono::{DateTime, Duration, Local, Utc};
use chrono_english::parse_date_string;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};

use crate::{
    store::ActivityStore,
    utils::time::{day_start, format_duration, next_day_start},
};

use super::{
    output::{
        analysis::{activity_name, analyze_sessions},
        extract_between, short_id, ExtractConfig,
    },
    Args,
};

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum HistoryAction {
    #[command(about = "Delete one history entry by id or id prefix")]
    Delete { entry: String },
}

#[derive(Debug, Parser)]
pub struct HistoryCommand {
    #[arg(
        long = "start",
        short,
        help = "Start of the range. Examples are \"yesterday\", \"1 hour ago\", \"15/03/2025\", \"12:00 16/03/2025\". By default the whole history is shown"
    )]
    start_date: Option<String>,
    #[arg(
        long = "end",
        short,
        help = "End of the range. Same format as --start. Defaults to now"
    )]
    end_date: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
    #[arg(
        long = "days",
        default_value_t = false,
        help = "Take inputs as whole days. For example if start and end are both 15/03/2025 this option covers the whole day"
    )]
    treat_as_days: bool,
    #[arg(long, short = 'S', help = "Show total time per activity instead of every session")]
    summary: bool,
}

/// Prints finished sessions between `start_date` and `end_date`, either one per line or summed up
/// per activity.
pub fn process_history_command(command: HistoryCommand, store: &ActivityStore) -> Result<()> {
    let config = parse_range(
        command.start_date,
        command.end_date,
        command.date_style,
        command.treat_as_days,
        store.now().with_timezone(&Local),
    )?;
    let sessions = extract_between(store.history(), &config);

    if sessions.is_empty() {
        println!("No finished sessions in this range.");
        return Ok(());
    }

    if command.summary {
        let (usages, total) = analyze_sessions(&sessions, store.activities());
        for usage in usages {
            println!(
                "{}\t{}\t{} sessions",
                format_duration(usage.duration),
                usage.name,
                usage.sessions
            );
        }
        println!("\n{}\ttotal", format_duration(total));
        return Ok(());
    }

    for session in sessions {
        let start = session.start_time.with_timezone(&Local);
        println!(
            "{}\t{}\t{}\t{}",
            short_id(session.id),
            start.format("%x %H:%M:%S"),
            format_duration(session.duration().unwrap_or_else(Duration::zero)),
            activity_name(store.activities(), session.activity_id)
        );
    }
    Ok(())
}

fn parse_range(
    start_date: Option<String>,
    end_date: Option<String>,
    date_style: DateStyle,
    treat_as_days: bool,
    now: DateTime<Local>,
) -> Result<ExtractConfig> {
    let dialect: chrono_english::Dialect = date_style.into();
    let parse = |value: String, which: &str| -> Result<DateTime<Local>> {
        parse_date_string(&value, now, dialect)
            .map(|v| v.with_timezone(&Local))
            .map_err(|e| {
                Args::command()
                    .error(
                        clap::error::ErrorKind::ValueValidation,
                        format!("Failed to validate {which} date {e}"),
                    )
                    .into()
            })
    };

    let mut start = start_date.map(|v| parse(v, "start")).transpose()?;
    let mut end = end_date.map(|v| parse(v, "end")).transpose()?.unwrap_or(now);

    if treat_as_days {
        start = start.map(|v| day_start(&v));
        end = next_day_start(end);
    }

    if start.is_some_and(|start| start > end) {
        return Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                "Start of the range is after its end",
            )
            .into());
    }

    Ok(ExtractConfig {
        start: start.map(|v| v.with_timezone(&Utc)),
        end: end.with_timezone(&Utc),
    })
}
