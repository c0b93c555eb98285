//! Countdown timers for named activities, driven from the terminal.
//! Activities keep their own timer state and remaining time is only ever derived from the clock
//! when something is rendered or changed, so nothing needs to run in the background.
//!

pub mod cli;
pub mod fs;
pub mod persistence;
pub mod store;
pub mod utils;
