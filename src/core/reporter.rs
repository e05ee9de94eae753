//! Build event reporting
//!
//! Every artifact action reports through an [`EventSink`] owned by the
//! project. Six independent channels exist; what a sink does with an event
//! never influences control flow.

use std::cell::RefCell;
use std::fmt;
use std::io::Write;
use std::rc::Rc;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::identity::Identity;

/// The six reporting channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Command,
    Progress,
    Error,
    Info,
    Warning,
    Note,
}

/// Receiver for build events
///
/// `origin` attributes the event to an artifact when there is one.
pub trait EventSink {
    /// Echo of an external command line
    fn command(&self, origin: Option<&Identity>, message: &str);
    fn progress(&self, origin: Option<&Identity>, message: &str);
    fn error(&self, origin: Option<&Identity>, message: &str);
    fn info(&self, origin: Option<&Identity>, message: &str);
    fn warning(&self, origin: Option<&Identity>, message: &str);
    fn note(&self, origin: Option<&Identity>, message: &str);

    /// Dispatch on `channel`
    fn emit(&self, channel: Channel, origin: Option<&Identity>, message: &str) {
        match channel {
            Channel::Command => self.command(origin, message),
            Channel::Progress => self.progress(origin, message),
            Channel::Error => self.error(origin, message),
            Channel::Info => self.info(origin, message),
            Channel::Warning => self.warning(origin, message),
            Channel::Note => self.note(origin, message),
        }
    }
}

/// Which channels a [`Reporter`] prints
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    /// Every channel
    Verbose,
    /// Command lines and errors
    #[default]
    CommandsAndErrors,
    /// Compact `name:message` progress lines and errors
    ProgressAndErrors,
    /// Errors only
    Quiet,
}

impl Preset {
    /// Whether this preset prints `channel`
    pub fn enables(self, channel: Channel) -> bool {
        match self {
            Self::Verbose => true,
            Self::CommandsAndErrors => matches!(channel, Channel::Command | Channel::Error),
            Self::ProgressAndErrors => matches!(channel, Channel::Progress | Channel::Error),
            Self::Quiet => channel == Channel::Error,
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Verbose => "verbose",
            Self::CommandsAndErrors => "commands-and-errors",
            Self::ProgressAndErrors => "progress-and-errors",
            Self::Quiet => "quiet",
        })
    }
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "verbose" => Ok(Self::Verbose),
            "commands-and-errors" => Ok(Self::CommandsAndErrors),
            "progress-and-errors" => Ok(Self::ProgressAndErrors),
            "quiet" => Ok(Self::Quiet),
            other => Err(format!(
                "unknown reporter '{other}' (expected verbose, commands-and-errors, progress-and-errors or quiet)"
            )),
        }
    }
}

/// Line-oriented reporter writing to stdout (errors to stderr)
pub struct Reporter {
    preset: Preset,
    out: RefCell<Box<dyn Write>>,
    err: RefCell<Box<dyn Write>>,
}

impl Reporter {
    /// Reporter on the process's stdout/stderr
    pub fn new(preset: Preset) -> Self {
        Self::with_writers(
            preset,
            Box::new(std::io::stdout()),
            Box::new(std::io::stderr()),
        )
    }

    /// Reporter on arbitrary writers
    pub fn with_writers(preset: Preset, out: Box<dyn Write>, err: Box<dyn Write>) -> Self {
        Self {
            preset,
            out: RefCell::new(out),
            err: RefCell::new(err),
        }
    }

    pub fn preset(&self) -> Preset {
        self.preset
    }

    fn lines(&self, channel: Channel, origin: Option<&Identity>, message: &str) -> Vec<String> {
        let name = origin.map(Identity::relative_name);
        match (channel, name) {
            (Channel::Command, Some(name)) => {
                vec![format!("# {name} command line "), message.to_string()]
            }
            (Channel::Error, Some(name)) => vec![format!("# {name} error "), message.to_string()],
            (Channel::Progress, Some(name)) if self.preset == Preset::ProgressAndErrors => {
                vec![format!("{name}:{message}")]
            }
            (Channel::Progress, Some(name)) => vec![format!("# {name} {message}")],
            // Unattributed progress carries no useful context.
            (Channel::Progress, None) => Vec::new(),
            _ => vec![message.to_string()],
        }
    }

    fn write(&self, channel: Channel, origin: Option<&Identity>, message: &str) {
        tracing::debug!(
            channel = ?channel,
            artifact = origin.map(Identity::relative_name),
            "{message}"
        );
        if !self.preset.enables(channel) {
            return;
        }
        let target = if channel == Channel::Error {
            &self.err
        } else {
            &self.out
        };
        let mut target = target.borrow_mut();
        for line in self.lines(channel, origin, message) {
            // A closed stdout must not abort a build.
            let _ = writeln!(target, "{line}");
        }
        let _ = target.flush();
    }
}

impl fmt::Debug for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reporter")
            .field("preset", &self.preset)
            .finish_non_exhaustive()
    }
}

impl EventSink for Reporter {
    fn command(&self, origin: Option<&Identity>, message: &str) {
        self.write(Channel::Command, origin, message);
    }

    fn progress(&self, origin: Option<&Identity>, message: &str) {
        self.write(Channel::Progress, origin, message);
    }

    fn error(&self, origin: Option<&Identity>, message: &str) {
        self.write(Channel::Error, origin, message);
    }

    fn info(&self, origin: Option<&Identity>, message: &str) {
        self.write(Channel::Info, origin, message);
    }

    fn warning(&self, origin: Option<&Identity>, message: &str) {
        self.write(Channel::Warning, origin, message);
    }

    fn note(&self, origin: Option<&Identity>, message: &str) {
        self.write(Channel::Note, origin, message);
    }
}

/// One captured event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub channel: Channel,
    /// Relative name of the originating artifact
    pub origin: Option<String>,
    pub message: String,
}

/// Sink that records every event; clones share the same log
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Rc<RefCell<Vec<Event>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far
    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    /// Messages recorded on `channel`
    pub fn messages(&self, channel: Channel) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter(|e| e.channel == channel)
            .map(|e| e.message.clone())
            .collect()
    }

    fn record(&self, channel: Channel, origin: Option<&Identity>, message: &str) {
        self.events.borrow_mut().push(Event {
            channel,
            origin: origin.map(|id| id.relative_name().to_string()),
            message: message.to_string(),
        });
    }
}

impl EventSink for RecordingSink {
    fn command(&self, origin: Option<&Identity>, message: &str) {
        self.record(Channel::Command, origin, message);
    }

    fn progress(&self, origin: Option<&Identity>, message: &str) {
        self.record(Channel::Progress, origin, message);
    }

    fn error(&self, origin: Option<&Identity>, message: &str) {
        self.record(Channel::Error, origin, message);
    }

    fn info(&self, origin: Option<&Identity>, message: &str) {
        self.record(Channel::Info, origin, message);
    }

    fn warning(&self, origin: Option<&Identity>, message: &str) {
        self.record(Channel::Warning, origin, message);
    }

    fn note(&self, origin: Option<&Identity>, message: &str) {
        self.record(Channel::Note, origin, message);
    }
}
