//! Translation of console key events into the bytes a terminal would send.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Returns the string to send for `event`, or `None` for keys with no
/// terminal encoding (and for key releases).
pub fn key_input(event: &KeyEvent) -> Option<String> {
    if event.kind == KeyEventKind::Release {
        return None;
    }
    let input = match event.code {
        KeyCode::Char(ch) => map_char(ch, event.modifiers),
        KeyCode::Enter => "\r".to_string(),
        KeyCode::Backspace => "\x7f".to_string(),
        KeyCode::Tab => "\t".to_string(),
        KeyCode::BackTab => "\x1b[Z".to_string(),
        KeyCode::Esc => "\x1b".to_string(),
        KeyCode::Up => "\x1b[A".to_string(),
        KeyCode::Down => "\x1b[B".to_string(),
        KeyCode::Right => "\x1b[C".to_string(),
        KeyCode::Left => "\x1b[D".to_string(),
        KeyCode::Home => "\x1b[H".to_string(),
        KeyCode::End => "\x1b[F".to_string(),
        KeyCode::Insert => "\x1b[2~".to_string(),
        KeyCode::Delete => "\x1b[3~".to_string(),
        KeyCode::PageUp => "\x1b[5~".to_string(),
        KeyCode::PageDown => "\x1b[6~".to_string(),
        _ => return None,
    };
    Some(input)
}

/// Ctrl+] leaves shell mode, as in telnet.
pub fn is_exit_key(event: &KeyEvent) -> bool {
    event.kind != KeyEventKind::Release
        && event.code == KeyCode::Char(']')
        && event.modifiers.contains(KeyModifiers::CONTROL)
}

fn map_char(ch: char, mods: KeyModifiers) -> String {
    if mods.contains(KeyModifiers::CONTROL) {
        // Ctrl + letter = control character
        if ch.is_ascii_alphabetic() {
            let code = (ch.to_ascii_lowercase() as u8) - b'a' + 1;
            return char::from(code).to_string();
        }
        match ch {
            '@' | ' ' => return "\x00".to_string(),
            '[' => return "\x1b".to_string(),
            '\\' => return "\x1c".to_string(),
            '^' => return "\x1e".to_string(),
            '_' => return "\x1f".to_string(),
            _ => {}
        }
    }
    if mods.contains(KeyModifiers::ALT) {
        return format!("\x1b{ch}");
    }
    ch.to_string()
}
