//! Line-oriented diagnostic sink used by every bootstrap stage.
//!
//! A [`Logger`] is an explicit value owned by whoever drives the bootstrap. Lines have the
//! shape `[HH:MM:SS][SEVERITY][file:line]message` and go to stdout (stderr for
//! [`Severity::Error`]), optionally mirrored to an append-only file.
//!
//! Misuse of the lifecycle (logging before [`Logger::init`], initialising twice, calling
//! [`Logger::deinit`] on an uninitialised logger, an unopenable mirror file) panics.

use std::fmt::{self, Write as _};
use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::{Path, PathBuf};

/// Upper bound in bytes of one composed line, newline included.
pub const MAX_LINE_LEN: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn tag(self) -> &'static str {
        match self {
            Severity::Debug => "[DEBUG]",
            Severity::Info => "[INFO]",
            Severity::Warning => "[WARNING]",
            Severity::Error => "[ERROR]",
        }
    }
}

#[derive(Debug)]
struct LoggerState {
    threshold: Severity,
    mirror: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct Logger {
    state: Option<LoggerState>,
}

impl Logger {
    /// Creates an uninitialised logger.
    pub fn new() -> Self {
        Self { state: None }
    }

    pub fn init(&mut self, threshold: Severity, mirror: Option<impl Into<PathBuf>>) {
        assert!(
            self.state.is_none(),
            "logger can only be initialized once"
        );
        self.state = Some(LoggerState {
            threshold,
            mirror: mirror.map(Into::into),
        });
    }

    pub fn deinit(&mut self) {
        assert!(self.state.is_some(), "no logger initialized");
        self.log(
            Severity::Warning,
            file!(),
            line!(),
            format_args!("logger deinitialized"),
        );
        self.state = None;
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    pub fn mirror_path(&self) -> Option<&Path> {
        self.state.as_ref().and_then(|state| state.mirror.as_deref())
    }

    /// Whether a line at `severity` would be emitted. `false` while uninitialised.
    pub fn enabled(&self, severity: Severity) -> bool {
        self.state
            .as_ref()
            .is_some_and(|state| severity >= state.threshold)
    }

    pub fn log(&self, severity: Severity, origin: &str, line: u32, args: fmt::Arguments<'_>) {
        let Some(state) = self.state.as_ref() else {
            panic!("{origin}:{line}: logger not initialized");
        };
        if severity < state.threshold {
            return;
        }

        let composed = compose_line(
            &chrono::Local::now().format("%H:%M:%S").to_string(),
            severity,
            origin,
            line,
            args,
        );

        // Terminal write failures (closed pipe) are not worth aborting the bootstrap over.
        if severity == Severity::Error {
            let _ = std::io::stderr().lock().write_all(composed.as_bytes());
        } else {
            let _ = std::io::stdout().lock().write_all(composed.as_bytes());
        }

        if let Some(path) = &state.mirror {
            let mut file = match OpenOptions::new().create(true).append(true).open(path) {
                Ok(file) => file,
                Err(err) => panic!("couldn't open log file {}: {err}", path.display()),
            };
            if let Err(err) = file.write_all(composed.as_bytes()) {
                panic!("couldn't write log file {}: {err}", path.display());
            }
        }

        #[cfg(feature = "enable_tracing")]
        crate::tracing::forward(severity, origin, line, &composed);
    }
}

/// Builds one newline-terminated line of at most [`MAX_LINE_LEN`] bytes.
fn compose_line(
    time: &str,
    severity: Severity,
    origin: &str,
    line: u32,
    args: fmt::Arguments<'_>,
) -> String {
    let mut out = BoundedLine::new(MAX_LINE_LEN - 1);
    // BoundedLine never returns an error; it drops what does not fit.
    let _ = write!(out, "[{time}]{}[{origin}:{line}]", severity.tag());
    let _ = out.write_fmt(args);
    let mut composed = out.into_inner();
    if !composed.ends_with('\n') {
        composed.push('\n');
    }
    composed
}

struct BoundedLine {
    buf: String,
    limit: usize,
}

impl BoundedLine {
    fn new(limit: usize) -> Self {
        Self {
            buf: String::with_capacity(limit + 1),
            limit,
        }
    }

    fn into_inner(self) -> String {
        self.buf
    }
}

impl fmt::Write for BoundedLine {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = self.limit - self.buf.len();
        if s.len() <= room {
            self.buf.push_str(s);
        } else {
            let mut end = room;
            while !s.is_char_boundary(end) {
                end -= 1;
            }
            self.buf.push_str(&s[..end]);
        }
        Ok(())
    }
}

#[macro_export]
macro_rules! vk_debug {
    ($logger:expr, $($arg:tt)+) => {
        if let Some(logger) = $logger {
            logger.log($crate::Severity::Debug, file!(), line!(), format_args!($($arg)+));
        }
    };
}

#[macro_export]
macro_rules! vk_info {
    ($logger:expr, $($arg:tt)+) => {
        if let Some(logger) = $logger {
            logger.log($crate::Severity::Info, file!(), line!(), format_args!($($arg)+));
        }
    };
}

#[macro_export]
macro_rules! vk_warn {
    ($logger:expr, $($arg:tt)+) => {
        if let Some(logger) = $logger {
            logger.log($crate::Severity::Warning, file!(), line!(), format_args!($($arg)+));
        }
    };
}

#[macro_export]
macro_rules! vk_error {
    ($logger:expr, $($arg:tt)+) => {
        if let Some(logger) = $logger {
            logger.log($crate::Severity::Error, file!(), line!(), format_args!($($arg)+));
        }
    };
}
