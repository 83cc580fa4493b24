use once_cell::sync::Lazy;
use std::collections::VecDeque;
use std::sync::Mutex;

const MAX_STAGE_LINES: usize = 32;

/// Which step of the remote workflow produced a stage line.
#[derive(Debug, Clone, Copy)]
pub enum Kind {
    Info,
    Thread,
    Message,
    Run,
    Poll,
    Fetch,
}

impl Kind {
    pub fn label(&self) -> &'static str {
        match self {
            Kind::Info => "info",
            Kind::Thread => "thread",
            Kind::Message => "message",
            Kind::Run => "run",
            Kind::Poll => "poll",
            Kind::Fetch => "fetch",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Entry {
    pub text: String,
    pub kind: Kind,
}

static STAGE_LOG: Lazy<Mutex<VecDeque<Entry>>> =
    Lazy::new(|| Mutex::new(VecDeque::with_capacity(MAX_STAGE_LINES)));

pub fn log<T: Into<String>>(line: T) {
    log_with(Kind::Info, line);
}

pub fn log_with<T: Into<String>>(kind: Kind, line: T) {
    if let Ok(mut buf) = STAGE_LOG.lock() {
        if buf.len() >= MAX_STAGE_LINES {
            buf.pop_front();
        }
        buf.push_back(Entry {
            text: line.into(),
            kind,
        });
    }
}

/// Most recent stage line, if any. The loading view reads this on each tick.
pub fn latest() -> Option<Entry> {
    STAGE_LOG.lock().ok().and_then(|buf| buf.back().cloned())
}

pub fn clear() {
    if let Ok(mut buf) = STAGE_LOG.lock() {
        buf.clear();
    }
}
