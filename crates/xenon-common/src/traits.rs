use async_trait::async_trait;

use crate::error::Result;
use crate::event::{KeyboardInput, MouseEvent, Signal};
use crate::geometry::Size;

/// Callback surface for decoded terminal input.
///
/// All methods default to no-ops so listeners implement only what they
/// care about. Callbacks must not reenter the decoder for the chunk that
/// produced them; reentry across chunks is fine.
pub trait TerminalListener: Send {
    fn on_keyboard_input(&mut self, _input: KeyboardInput) {}

    /// Raw chunk notification. `fully_processed` is true when a structured
    /// matcher consumed the chunk whole, false for escape-shaped input the
    /// decoder could not classify.
    fn on_raw_input(&mut self, _input: &str, _fully_processed: bool) {}

    fn on_mouse_event(&mut self, _event: MouseEvent) {}

    fn on_focus_change(&mut self, _gained: bool) {}

    fn on_screen_resize(&mut self, _size: Size) {}

    fn on_signal(&mut self, _signal: Signal) {}
}

/// Platform raw-mode switch.
#[async_trait]
pub trait RawMode: Send + Sync {
    async fn set_raw(&mut self, enabled: bool) -> Result<()>;
}

/// Platform window operations the core delegates.
#[async_trait]
pub trait WindowOps: Send + Sync {
    /// Ask the platform to resize the window. Returns false when the
    /// platform cannot honour the request.
    async fn try_set_size(&mut self, size: Size) -> Result<bool>;

    /// Current window size.
    fn size(&self) -> Size;
}

/// Terminal features an application can ask about before using them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    AlternateScreen,
    MouseReporting,
    FocusTracking,
    BracketedPaste,
    CursorShape,
    TrueColor,
}

/// Capability lookup, supplied by the platform layer.
pub trait CapabilityProbe: Send + Sync {
    fn supports(&self, capability: Capability) -> bool;
}

/// Permissive probe that claims support for everything; useful default for
/// modern xterm-compatible emulators and for tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeAllCapabilities;

impl CapabilityProbe for AssumeAllCapabilities {
    fn supports(&self, _capability: Capability) -> bool {
        true
    }
}
