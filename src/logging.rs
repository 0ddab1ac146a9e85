use owo_colors::OwoColorize;
use std::fmt;
use time::{format_description::FormatItem, macros::format_description, OffsetDateTime};
use tracing::{Level, Subscriber};
use tracing_subscriber::{
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields},
    registry::LookupSpan,
};

const TARGET_GUTTER_WIDTH: usize = 22;
const TIMESTAMP_FORMAT: &[FormatItem<'_>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Compact single-line console formatter: timestamp, level, target gutter, message.
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConsoleFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, N> FormatEvent<S, N> for ConsoleFormatter
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
    N: for<'writer> FormatFields<'writer> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        let use_color = writer.has_ansi_escapes();

        write_prefix(&mut writer, metadata, use_color)?;
        ctx.format_fields(writer.by_ref(), event)?;
        writer.write_char('\n')
    }
}

fn write_prefix(
    writer: &mut Writer<'_>,
    metadata: &tracing::Metadata<'_>,
    use_color: bool,
) -> fmt::Result {
    let timestamp_plain = format_timestamp();
    let timestamp_display = if use_color {
        timestamp_plain.as_str().dimmed().to_string()
    } else {
        timestamp_plain
    };
    writer.write_str(&timestamp_display)?;

    let level_plain = format!("{:>5}", metadata.level());
    let level_display = if use_color {
        color_level(&level_plain, *metadata.level())
    } else {
        level_plain
    };
    writer.write_char(' ')?;
    writer.write_str(&level_display)?;
    writer.write_char(' ')?;

    let target_text = format!("{:<width$}", metadata.target(), width = TARGET_GUTTER_WIDTH);
    let target_text = if use_color {
        target_text.blue().dimmed().to_string()
    } else {
        target_text
    };
    writer.write_str(&target_text)?;
    writer.write_str(": ")
}

fn color_level(text: &str, level: Level) -> String {
    match level {
        Level::ERROR => text.red().bold().to_string(),
        Level::WARN => text.yellow().bold().to_string(),
        Level::INFO => text.green().to_string(),
        Level::DEBUG => text.cyan().to_string(),
        Level::TRACE => text.dimmed().to_string(),
    }
}

fn format_timestamp() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.format(&TIMESTAMP_FORMAT)
        .unwrap_or_else(|_| "0000-00-00 00:00:00".to_string())
}
