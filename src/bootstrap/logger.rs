use anstyle::{AnsiColor, Color, Style};
use env_logger::{Builder, WriteStyle};
use indicatif::ProgressBar;
use log::kv::Key;
use std::{
    io::{IsTerminal, Write},
    sync::RwLock,
};

static PROGRESS_BAR: RwLock<Option<ProgressBar>> = RwLock::new(None);

const DIM: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightBlack)));
const CYAN: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Cyan)));

/// Route log lines around the given bar until [`detach_progress_bar`].
pub fn attach_progress_bar(bar: ProgressBar) {
    if let Ok(mut slot) = PROGRESS_BAR.write() {
        *slot = Some(bar);
    }
}

pub fn detach_progress_bar() {
    if let Ok(mut slot) = PROGRESS_BAR.write() {
        *slot = None;
    }
}

/// A `Write` adapter that hides the progress bar while a log line is printed.
pub struct ProgressPipe;

impl Write for ProgressPipe {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let bar = PROGRESS_BAR.read().ok().and_then(|slot| slot.clone());
        match bar {
            Some(bar) => bar.suspend(|| std::io::stderr().write_all(buf))?,
            None => std::io::stderr().write_all(buf)?,
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        std::io::stderr().flush()
    }
}

/// Right-align the `duration` key-value to width 10 with two decimals.
fn format_duration(raw: &str) -> String {
    if let Some(idx) = raw.find(|c: char| c.is_alphabetic() || c == 'µ') {
        let (num, unit) = (&raw[..idx], &raw[idx..]);
        if let Ok(val) = num.parse::<f32>() {
            return format!("{:>10}", format!("{:.2} {}", val, unit));
        }
    }
    format!("{:>10}", raw)
}

/// Initialize the logger. `RUST_LOG` overrides the default INFO filter.
pub fn initialize_logger() {
    let colored = std::io::stderr().is_terminal();
    let (dim, cyan) = if colored {
        (DIM, CYAN)
    } else {
        (Style::new(), Style::new())
    };

    Builder::new()
        .write_style(if colored {
            WriteStyle::Always
        } else {
            WriteStyle::Never
        })
        .format(move |buf, record| {
            let ts = buf.timestamp();
            let level_style = if colored {
                buf.default_level_style(record.level())
            } else {
                Style::new()
            };

            let dur = record
                .key_values()
                .get(Key::from("duration"))
                .map(|v| format_duration(&v.to_string()))
                .unwrap_or_else(|| " ".repeat(10));

            writeln!(
                buf,
                "{dim}{ts}{dim:#} {level_style}{}{level_style:#} {dim}{}{dim:#}",
                record.level(),
                record.target()
            )?;

            let message = format!("{}", record.args());
            let subsequent_indent = " ".repeat(11);
            let mut lines = message.lines();

            if let Some(first_line) = lines.next() {
                writeln!(buf, "{cyan}{dur}{cyan:#} {first_line}")?;
            }
            for line in lines {
                writeln!(buf, "{subsequent_indent}{line}")?;
            }
            Ok(())
        })
        .target(env_logger::Target::Pipe(Box::new(ProgressPipe)))
        .filter(None, log::LevelFilter::Info)
        .filter(Some("reqwest"), log::LevelFilter::Warn)
        .parse_default_env()
        .init();
}
