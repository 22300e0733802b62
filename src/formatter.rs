//! Log line format with a move counter and the emitting thread.
//!
//! Every line reads `time moves thread level target: fields`. Actors move on timer
//! threads while commands arrive from elsewhere, so the thread name tells whose move a
//! line belongs to, and the counter orders lines against the moves around them.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, FormattedFields};
use tracing_subscriber::registry::LookupSpan;

/// Moves completed across all levels since the process started
static MOVE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// The counter is shown as 16-bit hex
const MOVE_DISPLAY_MASK: u64 = 0xFFFF;

const TIMESTAMP_FORMAT: &[FormatItem<'static>] = format_description!("[hour]:[minute]:[second].[subsecond digits:4]");

/// Thread names are padded (or cut) to this width so columns line up
const THREAD_WIDTH: usize = 18;

/// Formats events as `time moves thread level target: fields`.
pub struct MoveFormatter;

impl<S, N> FormatEvent<S, N> for MoveFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(&self, ctx: &FmtContext<'_, S, N>, mut writer: Writer<'_>, event: &Event<'_>) -> fmt::Result {
        let meta = event.metadata();

        let now = OffsetDateTime::now_utc().format(&TIMESTAMP_FORMAT).map_err(|_| fmt::Error)?;
        write_dimmed(&mut writer, now)?;
        writer.write_char(' ')?;

        write_dimmed(&mut writer, format_args!("0x{:04X}", move_count() & MOVE_DISPLAY_MASK))?;
        writer.write_char(' ')?;

        let current = thread::current();
        let name = current.name().unwrap_or("<unnamed>");
        let name: String = name.chars().take(THREAD_WIDTH).collect();
        write!(writer, "{:<width$} ", name, width = THREAD_WIDTH)?;

        write_level(&mut writer, meta.level())?;
        writer.write_char(' ')?;

        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                write_bold(&mut writer, span.metadata().name())?;
                if let Some(fields) = span.extensions().get::<FormattedFields<N>>() {
                    if !fields.is_empty() {
                        write!(writer, "{{{fields}}}")?;
                    }
                }
                writer.write_char(':')?;
            }
            writer.write_char(' ')?;
        }

        write_dimmed(&mut writer, format_args!("{}:", meta.target()))?;
        writer.write_char(' ')?;

        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

fn write_level(writer: &mut Writer<'_>, level: &Level) -> fmt::Result {
    let (color, text) = match *level {
        Level::TRACE => ("\x1b[35m", "TRACE"),
        Level::DEBUG => ("\x1b[34m", "DEBUG"),
        Level::INFO => ("\x1b[32m", " INFO"),
        Level::WARN => ("\x1b[33m", " WARN"),
        Level::ERROR => ("\x1b[31m", "ERROR"),
    };
    if writer.has_ansi_escapes() {
        write!(writer, "{color}{text}\x1b[0m")
    } else {
        writer.write_str(text)
    }
}

fn write_dimmed(writer: &mut Writer<'_>, s: impl fmt::Display) -> fmt::Result {
    if writer.has_ansi_escapes() {
        write!(writer, "\x1b[2m{s}\x1b[0m")
    } else {
        write!(writer, "{s}")
    }
}

fn write_bold(writer: &mut Writer<'_>, s: impl fmt::Display) -> fmt::Result {
    if writer.has_ansi_escapes() {
        write!(writer, "\x1b[1m{s}\x1b[0m")
    } else {
        write!(writer, "{s}")
    }
}

/// Counts one completed move. Called by the level for every move it resolves.
pub fn increment_move() {
    MOVE_COUNTER.fetch_add(1, Ordering::Relaxed);
}

/// The number of moves resolved so far, across all levels.
pub fn move_count() -> u64 {
    MOVE_COUNTER.load(Ordering::Relaxed)
}
