use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;
use unicode_segmentation::UnicodeSegmentation;
use xenon_common::event::{InputEvent, Key, Modifiers};

use crate::paste::PASTE_END;

/// CSI/SS3 function-key shapes: SS3 letters, Cygwin/Putty `[[` forms,
/// numbered forms with `~`/`$`/`^` finals, and letter finals with an
/// optional `1;m` modifier prefix.
static KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\x1b(?:O(?P<ss3>[A-Za-z])|\[(?:\[(?P<cyg>[A-E]|5~|6~)|(?P<num>\d+)(?:;(?P<mod1>\d+))?(?P<tfin>[~$^])|(?:1;(?P<mod2>\d+))?(?P<lfin>[A-Za-z])))",
    )
    .expect("key sequence regex")
});

/// Anything still shaped like a CSI sequence: parameter bytes,
/// intermediate bytes, one final byte.
static GENERIC_CSI_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\x1b\[[\x30-\x3f]*[\x20-\x2f]*[\x40-\x7e]").expect("generic csi regex")
});

/// Classify everything the structured matchers left behind.
///
/// Stray paste terminators are stripped and reported first; the remaining
/// text is walked grapheme by grapheme.
pub(crate) fn process_rest(text: &str) -> Vec<InputEvent> {
    let mut events = Vec::new();
    let mut text = text.to_string();
    while let Some(idx) = text.find(PASTE_END) {
        events.push(InputEvent::Unhandled(PASTE_END.to_string()));
        text.replace_range(idx..idx + PASTE_END.len(), "");
    }

    let mut i = 0;
    while i < text.len() {
        let rest = &text[i..];

        if rest.starts_with('\x1b') {
            if let Some((len, event)) = try_key_sequence(rest) {
                events.push(event);
                i += len;
                continue;
            }
            if let Some(m) = GENERIC_CSI_RE.find(rest) {
                trace!(sequence = m.as_str(), "unrecognized csi sequence");
                events.push(InputEvent::Unhandled(m.as_str().to_string()));
                i += m.end();
                continue;
            }
            match rest[1..].chars().next() {
                // Lone trailing escape.
                None => {
                    events.push(InputEvent::plain_key(Key::Escape));
                    i += 1;
                }
                Some(next) if next.is_ascii() => {
                    events.push(meta_key(next));
                    i += 1 + next.len_utf8();
                }
                // ESC before a non-ASCII grapheme: surface the escape and
                // let the next round classify the grapheme.
                Some(_) => {
                    events.push(InputEvent::plain_key(Key::Escape));
                    i += 1;
                }
            }
            continue;
        }

        // One grapheme cluster at a time. All-ASCII clusters (including
        // the CRLF cluster) are key strokes per scalar; anything else
        // passes through as text.
        let grapheme = rest.graphemes(true).next().unwrap_or(rest);
        let first = grapheme.chars().next().unwrap_or('\u{0}');
        if grapheme.is_ascii() {
            for c in grapheme.chars() {
                events.push(ascii_key(c, Modifiers::empty()));
            }
        } else if ('\u{80}'..='\u{9f}').contains(&first) {
            events.push(InputEvent::Unhandled(grapheme.to_string()));
        } else {
            events.push(InputEvent::Keyboard(
                xenon_common::event::KeyboardInput::Unicode(grapheme.to_string()),
            ));
        }
        i += grapheme.len();
    }
    events
}

/// A single ASCII scalar as a key stroke.
fn ascii_key(c: char, extra: Modifiers) -> InputEvent {
    if let Some((key, mods)) = control_key(c) {
        return InputEvent::key(key, mods | extra);
    }
    let (key, mods) = printable_key(c);
    InputEvent::key(key, mods | extra)
}

/// ESC-prefixed ASCII scalar: the control/printable rules plus META, with
/// the `ESC CR` rewrite (which would otherwise surface as ctrl+meta+m)
/// landing on meta+enter.
fn meta_key(c: char) -> InputEvent {
    if c == '\x0d' {
        return InputEvent::key(Key::Enter, Modifiers::META);
    }
    ascii_key(c, Modifiers::META)
}

/// The named control keys and the ctrl-letter block.
fn control_key(c: char) -> Option<(Key, Modifiers)> {
    let none = Modifiers::empty();
    let ctrl = Modifiers::CTRL;
    Some(match c {
        '\r' => (Key::CarriageReturn, none),
        '\n' => (Key::Enter, none),
        '\t' => (Key::Tab, none),
        '\x1b' => (Key::Escape, none),
        '\x08' | '\x7f' => (Key::Backspace, none),
        ' ' => (Key::Space, none),
        '\x00' => (Key::Space, ctrl),
        '\x01'..='\x1a' => (Key::Char((b'a' + c as u8 - 1) as char), ctrl),
        '\x1c' => (Key::Char('\\'), ctrl),
        '\x1d' => (Key::Char(']'), ctrl),
        '\x1e' => (Key::Char('^'), ctrl),
        '\x1f' => (Key::Char('_'), ctrl),
        _ => return None,
    })
}

/// Printable ASCII; uppercase normalizes to the lowercase key plus SHIFT.
fn printable_key(c: char) -> (Key, Modifiers) {
    if c.is_ascii_uppercase() {
        (Key::Char(c.to_ascii_lowercase()), Modifiers::SHIFT)
    } else {
        (Key::Char(c), Modifiers::empty())
    }
}

/// Match one CSI/SS3 key sequence at the start of `rest`, reassembling the
/// lookup code and the xterm modifier parameter.
fn try_key_sequence(rest: &str) -> Option<(usize, InputEvent)> {
    let caps = KEY_RE.captures(rest)?;
    let whole = caps.get(0)?;

    let (code, modifier) = if let Some(m) = caps.name("ss3") {
        (format!("O{}", m.as_str()), 1)
    } else if let Some(m) = caps.name("cyg") {
        (format!("[[{}", m.as_str()), 1)
    } else if let Some(fin) = caps.name("tfin") {
        let num = caps.name("num")?.as_str();
        let modifier = caps
            .name("mod1")
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(1);
        (format!("[{}{}", num, fin.as_str()), modifier)
    } else {
        let fin = caps.name("lfin")?.as_str();
        let modifier = caps
            .name("mod2")
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(1);
        (format!("[{fin}"), modifier)
    };

    let event = match lookup_code(&code) {
        Some((key, implied)) => InputEvent::key(key, implied | decode_modifier(modifier)),
        None => InputEvent::Unhandled(whole.as_str().to_string()),
    };
    Some((whole.end(), event))
}

/// xterm modifier parameter: after subtracting one, bit 0 is shift, bit 2
/// is ctrl, and bits 1 and 3 both mean meta (alt and meta proper).
fn decode_modifier(m: u32) -> Modifiers {
    let m = m.saturating_sub(1);
    let mut mods = Modifiers::empty();
    if m & 1 != 0 {
        mods |= Modifiers::SHIFT;
    }
    if m & 4 != 0 {
        mods |= Modifiers::CTRL;
    }
    if m & 10 != 0 {
        mods |= Modifiers::META;
    }
    mods
}

/// Reassembled escape code to key, with the modifiers some rxvt forms
/// imply.
fn lookup_code(code: &str) -> Option<(Key, Modifiers)> {
    use Key::*;
    let none = Modifiers::empty();
    let shift = Modifiers::SHIFT;
    let ctrl = Modifiers::CTRL;
    Some(match code {
        "OP" | "[P" | "[11~" | "[[A" => (F(1), none),
        "OQ" | "[Q" | "[12~" | "[[B" => (F(2), none),
        "OR" | "[R" | "[13~" | "[[C" => (F(3), none),
        "OS" | "[S" | "[14~" | "[[D" => (F(4), none),
        "[15~" | "[[E" => (F(5), none),
        "[17~" => (F(6), none),
        "[18~" => (F(7), none),
        "[19~" => (F(8), none),
        "[20~" => (F(9), none),
        "[21~" => (F(10), none),
        "[23~" => (F(11), none),
        "[24~" => (F(12), none),
        "[A" | "OA" => (Up, none),
        "[B" | "OB" => (Down, none),
        "[C" | "OC" => (Right, none),
        "[D" | "OD" => (Left, none),
        "[E" | "OE" => (Clear, none),
        "[F" | "OF" => (End, none),
        "[H" | "OH" => (Home, none),
        "[1~" | "[7~" => (Home, none),
        "[2~" => (Insert, none),
        "[3~" => (Delete, none),
        "[4~" | "[8~" => (End, none),
        "[5~" | "[[5~" => (PageUp, none),
        "[6~" | "[[6~" => (PageDown, none),
        "[a" => (Up, shift),
        "[b" => (Down, shift),
        "[c" => (Right, shift),
        "[d" => (Left, shift),
        "[e" => (Clear, shift),
        "[2$" => (Insert, shift),
        "[3$" => (Delete, shift),
        "[4$" => (End, shift),
        "[5$" => (PageUp, shift),
        "[6$" => (PageDown, shift),
        "[7$" => (Home, shift),
        "[8$" => (End, shift),
        "Oa" => (Up, ctrl),
        "Ob" => (Down, ctrl),
        "Oc" => (Right, ctrl),
        "Od" => (Left, ctrl),
        "Oe" => (Clear, ctrl),
        "[2^" => (Insert, ctrl),
        "[3^" => (Delete, ctrl),
        "[4^" => (End, ctrl),
        "[5^" => (PageUp, ctrl),
        "[6^" => (PageDown, ctrl),
        "[7^" => (Home, ctrl),
        "[8^" => (End, ctrl),
        "[Z" => (Tab, shift),
        _ => return None,
    })
}
