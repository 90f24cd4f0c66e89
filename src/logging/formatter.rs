use std::fmt;
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::{format::Writer, FmtContext, FormatEvent, FormatFields, FormattedFields};
use tracing_subscriber::registry::LookupSpan;

/// Wraps each part of a log line in brackets.
/// Format: [TIMESTAMP] [LEVEL] [SPAN CHAIN] [TARGET: FILE:LINE]: MESSAGE
///
/// The span chain lists every open span from the root, joined by `:`, each
/// with its recorded fields, e.g. `[run_training:stage{source=data/train}]`.
/// Outside any span the last path segment of the target is used instead.
pub struct BracketedFormatter;

impl<S, N> FormatEvent<S, N> for BracketedFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();

        let now = chrono::Local::now();
        write!(writer, "[{}]  ", now.format("%Y-%m-%dT%H:%M:%S%.6f"))?;
        write!(writer, "[{:5}] ", metadata.level())?;

        match ctx.event_scope() {
            Some(scope) => {
                write!(writer, "[")?;
                for (i, span) in scope.from_root().enumerate() {
                    if i > 0 {
                        write!(writer, ":")?;
                    }
                    write!(writer, "{}", span.name())?;
                    let extensions = span.extensions();
                    if let Some(fields) = extensions.get::<FormattedFields<N>>() {
                        if !fields.is_empty() {
                            write!(writer, "{{{}}}", fields)?;
                        }
                    }
                }
                write!(writer, "] ")?;
            }
            None => {
                let name = metadata.target().rsplit("::").next().unwrap_or("unknown");
                write!(writer, "[{}] ", name)?;
            }
        }

        if let (Some(file), Some(line)) = (metadata.file(), metadata.line()) {
            write!(writer, "[{}: {}:{}]: ", metadata.target(), file, line)?;
        } else {
            write!(writer, "[{}]: ", metadata.target())?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}
