use bitflags::bitflags;

use crate::geometry::{Offset, Position};

bitflags! {
    /// Keyboard/mouse modifier keys.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Modifiers: u8 {
        const SHIFT = 1 << 0;
        const CTRL = 1 << 1;
        const META = 1 << 2;
    }
}

/// A named key.
///
/// Printable ASCII lives in `Char` (always lowercase; shift is carried in
/// the stroke's modifiers). Space, enter and carriage return are kept apart
/// because the wire distinguishes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    F(u8),
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,
    Clear,
    Enter,
    CarriageReturn,
    Tab,
    BackTab,
    Escape,
    Backspace,
    Space,
}

/// One decoded key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyStroke {
    pub key: Key,
    pub mods: Modifiers,
}

impl KeyStroke {
    pub fn new(key: Key, mods: Modifiers) -> Self {
        Self { key, mods }
    }

    pub fn plain(key: Key) -> Self {
        Self {
            key,
            mods: Modifiers::empty(),
        }
    }
}

/// Input that reaches the application as typed content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyboardInput {
    Key(KeyStroke),
    /// A printable non-ASCII grapheme cluster.
    Unicode(String),
    Paste {
        text: String,
        bracketed: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    /// Extra buttons 8..=11 from the second extension group.
    Extra(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    Pressed,
    Released,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseEvent {
    Press {
        position: Position,
        button: MouseButton,
        state: ButtonState,
        mods: Modifiers,
    },
    Motion {
        position: Position,
        button: Option<MouseButton>,
        mods: Modifiers,
    },
    Scroll {
        position: Position,
        delta: Offset,
        mods: Modifiers,
    },
}

/// Which device-attributes request a reply answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaKind {
    /// `CSI ? … c`, primary.
    Primary,
    /// `CSI > … c`, secondary.
    Secondary,
}

/// Everything the input decoder can produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Keyboard(KeyboardInput),
    Mouse(MouseEvent),
    FocusChange {
        gained: bool,
    },
    CursorPositionReply {
        position: Position,
    },
    DeviceAttributes {
        kind: DaKind,
        device_type: u32,
        version: u32,
        extra: Vec<u32>,
    },
    /// Escape-shaped input nothing recognized.
    Unhandled(String),
    /// A chunk that was consumed whole by one of the structured matchers.
    RawProcessed(String),
}

impl InputEvent {
    pub fn key(key: Key, mods: Modifiers) -> Self {
        InputEvent::Keyboard(KeyboardInput::Key(KeyStroke::new(key, mods)))
    }

    pub fn plain_key(key: Key) -> Self {
        Self::key(key, Modifiers::empty())
    }

    pub fn paste(text: impl Into<String>, bracketed: bool) -> Self {
        InputEvent::Keyboard(KeyboardInput::Paste {
            text: text.into(),
            bracketed,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorShape {
    #[default]
    Block,
    Underline,
    VerticalBar,
}

/// Visible cursor position and appearance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorState {
    pub position: Position,
    pub shape: CursorShape,
    pub blinking: bool,
}

impl Default for CursorState {
    fn default() -> Self {
        Self {
            position: Position::ORIGIN,
            shape: CursorShape::Block,
            blinking: true,
        }
    }
}

/// Process signals the platform collaborator may deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Interrupt,
    Terminate,
    WindowChange,
}
