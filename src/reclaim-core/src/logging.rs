//! Log formatting for the `reclaim` binary
//!
//! Lines look like `12:04:31 [SWEEP] INFO  deleting 2 old video(s)`. Colors
//! are only emitted when the writer accepts ANSI escapes, so redirected
//! output from a cron job stays plain.

use owo_colors::{OwoColorize, Style};
use std::fmt;
use std::io::{self, IsTerminal};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::registry::LookupSpan;

/// Which mode of the binary wrote a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Main,
    Sweep,
    Watch,
}

impl Component {
    fn tag(self) -> (&'static str, Style) {
        match self {
            Component::Main => ("MAIN", Style::new().cyan().bold()),
            Component::Sweep => ("SWEEP", Style::new().green().bold()),
            Component::Watch => ("WATCH", Style::new().yellow().bold()),
        }
    }
}

fn level_label(level: Level) -> (&'static str, Style) {
    match level {
        Level::ERROR => ("ERROR", Style::new().red().bold()),
        Level::WARN => ("WARN ", Style::new().yellow().bold()),
        Level::INFO => ("INFO ", Style::new().green()),
        Level::DEBUG => ("DEBUG", Style::new().blue()),
        Level::TRACE => ("TRACE", Style::new().dimmed()),
    }
}

pub struct ReclaimFormatter {
    component: Component,
    timestamps: bool,
}

impl ReclaimFormatter {
    pub fn new(component: Component) -> Self {
        Self {
            component,
            timestamps: true,
        }
    }

    /// Formatter without the wall-clock prefix
    pub fn plain(component: Component) -> Self {
        Self {
            component,
            timestamps: false,
        }
    }
}

impl<S, N> FormatEvent<S, N> for ReclaimFormatter
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
        let ansi = writer.has_ansi_escapes();
        let paint = |text: &str, style: Style| {
            if ansi {
                text.style(style).to_string()
            } else {
                text.to_string()
            }
        };

        if self.timestamps {
            let now = chrono::Local::now().format("%H:%M:%S").to_string();
            write!(writer, "{} ", paint(&now, Style::new().dimmed()))?;
        }

        let (tag, tag_style) = self.component.tag();
        write!(writer, "{} ", paint(&format!("[{}]", tag), tag_style))?;

        let (label, label_style) = level_label(*event.metadata().level());
        write!(writer, "{} ", paint(label, label_style))?;

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Install the global subscriber, writing to stderr.
///
/// `RUST_LOG` directives are honored; `level` is the floor when it is unset.
pub fn init_logger(component: Component, level: Level) -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_ansi(io::stderr().is_terminal())
        .event_format(ReclaimFormatter::new(component))
        .with_writer(io::stderr);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tracing::{info, warn};

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Capture {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn capture(component: Component, emit: impl FnOnce()) -> String {
        let sink = Capture::default();
        let writer = sink.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .event_format(ReclaimFormatter::plain(component))
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, emit);
        sink.text()
    }

    #[test]
    fn test_line_has_tag_and_level() {
        let out = capture(Component::Sweep, || info!("deleting 2 old video(s)"));
        assert_eq!(out, "[SWEEP] INFO  deleting 2 old video(s)\n");
    }

    #[test]
    fn test_fields_follow_message() {
        let out = capture(Component::Watch, || {
            warn!(deleted = 3, "sweep cancelled");
        });
        assert_eq!(out, "[WATCH] WARN  sweep cancelled deleted=3\n");
    }

    #[test]
    fn test_no_escapes_without_ansi() {
        let out = capture(Component::Main, || info!("status"));
        assert!(!out.contains('\u{1b}'));
    }
}
