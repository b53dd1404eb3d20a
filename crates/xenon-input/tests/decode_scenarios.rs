//! End-to-end decoder scenarios over raw byte chunks.

use proptest::prelude::*;
use xenon_common::event::{
    ButtonState, InputEvent, Key, Modifiers, MouseButton, MouseEvent,
};
use xenon_common::geometry::Position;
use xenon_input::InputDecoder;

/// Decoded events minus the raw-processed bookkeeping.
fn semantic(events: Vec<InputEvent>) -> Vec<InputEvent> {
    events
        .into_iter()
        .filter(|e| !matches!(e, InputEvent::RawProcessed(_)))
        .collect()
}

#[test]
fn paste_split_across_chunks_within_timeout() {
    let mut dec = InputDecoder::new();
    assert!(semantic(dec.decode(b"\x1b[200~start")).is_empty());
    assert!(semantic(dec.decode(b"second")).is_empty());
    let events = semantic(dec.decode(b"end\x1b[201~"));
    assert_eq!(events, vec![InputEvent::paste("startsecondend", true)]);
}

#[test]
fn paste_timeout_flushes_and_tail_degrades() {
    let mut dec = InputDecoder::new();
    dec.decode(b"\x1b[200~start");
    dec.decode(b"second");
    // The driver's timer fires before the rest arrives.
    assert_eq!(
        dec.flush_paste(),
        Some(InputEvent::paste("startsecond", true))
    );
    let events = semantic(dec.decode(b"end\x1b[201~"));
    assert_eq!(
        events,
        vec![
            InputEvent::Unhandled("\x1b[201~".into()),
            InputEvent::plain_key(Key::Char('e')),
            InputEvent::plain_key(Key::Char('n')),
            InputEvent::plain_key(Key::Char('d')),
        ]
    );
}

#[test]
fn focus_and_mouse_in_one_chunk_dispatches_focus() {
    let mut dec = InputDecoder::new();
    let events = semantic(dec.decode(b"\x1b[I\x1b[O\x1b[M\x23\x21\x21\x1b[O\x1b[M\x23\x21\x21"));
    assert_eq!(
        events,
        vec![
            InputEvent::FocusChange { gained: true },
            InputEvent::FocusChange { gained: false },
            InputEvent::FocusChange { gained: false },
        ]
    );
}

#[test]
fn sgr_mouse_press_then_release() {
    let mut dec = InputDecoder::new();
    let press = semantic(dec.decode(b"\x1b[<0;1;1M"));
    assert_eq!(
        press,
        vec![InputEvent::Mouse(MouseEvent::Press {
            position: Position::new(0, 0),
            button: MouseButton::Left,
            state: ButtonState::Pressed,
            mods: Modifiers::empty(),
        })]
    );
    let release = semantic(dec.decode(b"\x1b[<0;1;1m"));
    assert_eq!(
        release,
        vec![InputEvent::Mouse(MouseEvent::Press {
            position: Position::new(0, 0),
            button: MouseButton::Left,
            state: ButtonState::Released,
            mods: Modifiers::empty(),
        })]
    );
}

#[test]
fn x10_wide_coordinates() {
    let mut dec = InputDecoder::new();
    let events = semantic(dec.decode(b"\x1b[M\x20\xff\xff"));
    assert_eq!(
        events,
        vec![InputEvent::Mouse(MouseEvent::Press {
            position: Position::new(222, 222),
            button: MouseButton::Left,
            state: ButtonState::Pressed,
            mods: Modifiers::empty(),
        })]
    );
}

#[test]
fn keystroke_battery() {
    let mut dec = InputDecoder::new();
    assert_eq!(
        semantic(dec.decode(b"\x1b[1;5A")),
        vec![InputEvent::key(Key::Up, Modifiers::CTRL)]
    );
    assert_eq!(
        semantic(dec.decode(b"\x1b[1;8D")),
        vec![InputEvent::key(
            Key::Left,
            Modifiers::SHIFT | Modifiers::CTRL | Modifiers::META
        )]
    );
    assert_eq!(
        semantic(dec.decode(b"\x1ba")),
        vec![InputEvent::key(Key::Char('a'), Modifiers::META)]
    );
    assert_eq!(
        semantic(dec.decode(b"\x01")),
        vec![InputEvent::key(Key::Char('a'), Modifiers::CTRL)]
    );
    assert_eq!(
        semantic(dec.decode(b"\x1b\x0d")),
        vec![InputEvent::key(Key::Enter, Modifiers::META)]
    );
}

#[test]
fn paste_state_survives_terminator_until_timeout() {
    let mut dec = InputDecoder::new();
    let events = semantic(dec.decode(b"\x1b[200~body\x1b[201~"));
    assert_eq!(events, vec![InputEvent::paste("body", true)]);
    // Still in paste: typed characters accumulate instead of decoding.
    assert!(semantic(dec.decode(b"typed")).is_empty());
    assert_eq!(dec.flush_paste(), Some(InputEvent::paste("typed", true)));
    // Back to idle.
    assert_eq!(
        semantic(dec.decode(b"x")),
        vec![InputEvent::plain_key(Key::Char('x'))]
    );
}

fn sgr_button_bits(button: MouseButton) -> u32 {
    match button {
        MouseButton::Left => 0,
        MouseButton::Middle => 1,
        MouseButton::Right => 2,
        MouseButton::Extra(n) => 128 + (n as u32 - 8),
    }
}

fn button_strategy() -> impl Strategy<Value = MouseButton> {
    prop_oneof![
        Just(MouseButton::Left),
        Just(MouseButton::Middle),
        Just(MouseButton::Right),
        (8u8..=11).prop_map(MouseButton::Extra),
    ]
}

proptest! {
    /// Canonical SGR encodings decode back to the tuple they encode.
    #[test]
    fn sgr_mouse_round_trip(
        button in button_strategy(),
        released in any::<bool>(),
        x in 1i32..=2000,
        y in 1i32..=2000,
        shift in any::<bool>(),
        meta in any::<bool>(),
        ctrl in any::<bool>(),
    ) {
        let mut bits = sgr_button_bits(button);
        if shift { bits |= 4; }
        if meta { bits |= 8; }
        if ctrl { bits |= 16; }
        let chunk = format!(
            "\x1b[<{bits};{x};{y}{}",
            if released { 'm' } else { 'M' }
        );

        let mut mods = Modifiers::empty();
        if shift { mods |= Modifiers::SHIFT; }
        if meta { mods |= Modifiers::META; }
        if ctrl { mods |= Modifiers::CTRL; }

        let mut dec = InputDecoder::new();
        let events = semantic(dec.decode(chunk.as_bytes()));
        prop_assert_eq!(
            events,
            vec![InputEvent::Mouse(MouseEvent::Press {
                position: Position::new(x - 1, y - 1),
                button,
                state: if released { ButtonState::Released } else { ButtonState::Pressed },
                mods,
            })]
        );
    }
}
