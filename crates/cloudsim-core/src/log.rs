//! Logging facilities.
//!
//! Component messages are written through the `log` facade as `[<time> <LEVEL> <component>] <message>`,
//! where time and component name come from the [`SimulationContext`](crate::SimulationContext).

use atty::Stream;
use colored::{Color, ColoredString, Colorize};
use log::Level;
use serde_json::json;
use serde_type_name::type_name;

use crate::event::Event;

/// Applies the color to the string if stderr (log) goes to console.
pub fn get_colored(s: &str, color: Color) -> ColoredString {
    if atty::is(Stream::Stderr) {
        s.color(color)
    } else {
        s.normal()
    }
}

/// Returns the level name padded to a fixed width and colored by level.
pub fn level_tag(level: Level) -> ColoredString {
    let color = match level {
        Level::Error => Color::Red,
        Level::Warn => Color::Yellow,
        Level::Info => Color::Green,
        Level::Debug => Color::Blue,
        Level::Trace => Color::Cyan,
    };
    get_colored(&format!("{:<5}", level.as_str()), color)
}

/// Shared implementation of the `log_*!` macros.
#[doc(hidden)]
#[macro_export]
macro_rules! log_with_context {
    ($level:expr, $ctx:expr, $msg:expr) => (
        log::log!(
            target: $ctx.name(),
            $level,
            "[{:.3} {} {}] {}",
            $ctx.time(), $crate::log::level_tag($level), $ctx.name(), $msg
        )
    );
    ($level:expr, $ctx:expr, $format:expr, $($arg:tt)+) => (
        log::log!(
            target: $ctx.name(),
            $level,
            concat!("[{:.3} {} {}] ", $format),
            $ctx.time(), $crate::log::level_tag($level), $ctx.name(), $($arg)+
        )
    );
}

/// Logs a message at the info level.
///
/// The message is prefixed with the current simulation time and the component name taken from the context.
///
/// # Examples
///
/// ```rust
/// use std::io::Write;
/// use env_logger::Builder;
/// use cloudsim_core::{log_info, Simulation, SimulationContext};
///
/// struct Datacenter {
///     ctx: SimulationContext,
/// }
///
/// impl Datacenter {
///     fn add_host(&self, host_id: u32) {
///         log_info!(self.ctx, "host #{} added", host_id);
///     }
/// }
///
/// Builder::from_default_env()
///     .format(|buf, record| writeln!(buf, "{}", record.args()))
///     .init();
///
/// let mut sim = Simulation::new(123);
/// let datacenter = Datacenter { ctx: sim.create_context("datacenter") };
/// datacenter.add_host(0);
/// ```
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)+) => ($crate::log_with_context!(log::Level::Info, $($arg)+));
}

/// Logs a message at the debug level. See [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)+) => ($crate::log_with_context!(log::Level::Debug, $($arg)+));
}

/// Logs a message at the trace level. See [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_trace {
    ($($arg:tt)+) => ($crate::log_with_context!(log::Level::Trace, $($arg)+));
}

/// Logs a message at the warn level. See [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)+) => ($crate::log_with_context!(log::Level::Warn, $($arg)+));
}

/// Logs a message at the error level. See [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)+) => ($crate::log_with_context!(log::Level::Error, $($arg)+));
}

/// Reports an event which the engine or a handler could not process.
fn log_event_problem(problem: &str, event: &Event) {
    log::error!(
        target: "simulation",
        "[{:.3} {} simulation] {}: {}",
        event.time,
        level_tag(Level::Error),
        problem,
        json!({
            "type": type_name(&event.data).unwrap_or("?"),
            "data": event.data,
            "src": event.src,
            "dst": event.dst,
            "priority": event.priority,
        })
    );
}

/// Logs an unhandled event.
///
/// This method is used internally in [`cast!`](crate::cast!) macro.
pub fn log_unhandled_event(event: Event) {
    log_event_problem("Unhandled event", &event);
}

pub(crate) fn log_undelivered_event(event: Event) {
    log_event_problem("Undelivered event", &event);
}

pub(crate) fn log_incorrect_event(event: Event, msg: &str) {
    log_event_problem(&format!("Incorrect event ({})", msg), &event);
}
