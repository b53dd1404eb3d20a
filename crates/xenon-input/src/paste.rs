use tracing::trace;
use xenon_common::event::InputEvent;

pub const PASTE_START: &str = "\x1b[200~";
pub const PASTE_END: &str = "\x1b[201~";

/// What the paste machine did with a chunk.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum PasteOutcome {
    /// The chunk is not paste input; try the other matchers.
    NotPaste,
    /// The chunk was swallowed, possibly completing a paste.
    Consumed(Option<InputEvent>),
}

/// Bracketed-paste accumulator.
///
/// Once entered, the in-paste state survives a terminating `201~`: only the
/// driver's timeout returns the machine to idle. Content arriving between a
/// completed paste and the timeout keeps accumulating and is flushed as its
/// own paste event.
#[derive(Debug, Default)]
pub(crate) struct PasteBuffer {
    in_paste: bool,
    accumulator: String,
    timer_armed: bool,
}

impl PasteBuffer {
    pub fn feed(&mut self, text: &str) -> PasteOutcome {
        if !self.in_paste {
            let Some(body) = text.strip_prefix(PASTE_START) else {
                return PasteOutcome::NotPaste;
            };
            trace!("entering bracketed paste");
            self.in_paste = true;
            self.accumulator.clear();
            return PasteOutcome::Consumed(self.append(body));
        }
        PasteOutcome::Consumed(self.append(text))
    }

    /// Accumulate one in-paste chunk; a `201~` suffix completes the paste.
    fn append(&mut self, text: &str) -> Option<InputEvent> {
        // A new chunk always cancels the pending timer; it is re-armed
        // below unless the terminator closed the paste.
        self.timer_armed = false;
        if let Some(body) = text.strip_suffix(PASTE_END) {
            self.accumulator.push_str(body);
            let event = InputEvent::paste(std::mem::take(&mut self.accumulator), true);
            trace!("bracketed paste terminated");
            return Some(event);
        }
        self.accumulator.push_str(text);
        self.timer_armed = true;
        None
    }

    /// Whether the driver should hold a live timeout.
    pub fn timer_armed(&self) -> bool {
        self.timer_armed
    }

    /// Timer expiry: emit whatever accumulated and return to idle.
    pub fn flush(&mut self) -> Option<InputEvent> {
        if !self.in_paste {
            return None;
        }
        trace!("bracketed paste timed out");
        self.in_paste = false;
        self.timer_armed = false;
        Some(InputEvent::paste(std::mem::take(&mut self.accumulator), true))
    }
}
