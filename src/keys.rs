// src/keys.rs

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Modifier keys currently held down.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct KeyModifiers: u16 {
        const SHIFT = 1 << 0;
        const CONTROL = 1 << 1;
        const ALT = 1 << 2; // Also known as Option on macOS
        const COMMAND = 1 << 3; // macOS Command key
        const SPACE = 1 << 4; // Space held as a modifier (e.g. hand tool)
        const WIN = 1 << 5; // Windows/Super key
        const CAPS_LOCK = 1 << 6;
        const NUM_LOCK = 1 << 7;
    }
}

/// Physical key position, independent of the active keyboard layout.
///
/// The character a scancode produces is decided by the layout, which the
/// platform backend reports through `DriverRequest::KeyMapping`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum KeyScancode {
    #[default]
    Nil,

    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,

    Digit0,
    Digit1,
    Digit2,
    Digit3,
    Digit4,
    Digit5,
    Digit6,
    Digit7,
    Digit8,
    Digit9,

    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,

    // Punctuation positions (US layout names)
    Tilde,
    Minus,
    Equals,
    OpenBrace,
    CloseBrace,
    Semicolon,
    Quote,
    Backslash,
    Comma,
    Period,
    Slash,

    // Navigation
    Left,
    Right,
    Up,
    Down,
    PageUp,
    PageDown,
    Home,
    End,
    Insert,
    Delete,

    // Editing and control
    Enter,
    Backspace,
    Tab,
    Escape,
    Space,
    PrintScreen,
    ScrollLock,
    Pause,
    Menu,

    // Keypad
    Keypad0,
    Keypad1,
    Keypad2,
    Keypad3,
    Keypad4,
    Keypad5,
    Keypad6,
    Keypad7,
    Keypad8,
    Keypad9,
    KeypadEnter,
    KeypadPlus,
    KeypadMinus,
    KeypadMultiply,
    KeypadDivide,
    KeypadDecimal,

    // Modifier positions
    LShift,
    RShift,
    LControl,
    RControl,
    Alt,
    AltGr,
    LWin,
    RWin,
    Command,
    CapsLock,
    NumLock,
}

impl KeyScancode {
    /// Returns true if the scancode is a modifier key position.
    pub fn is_modifier(&self) -> bool {
        matches!(
            self,
            KeyScancode::LShift
                | KeyScancode::RShift
                | KeyScancode::LControl
                | KeyScancode::RControl
                | KeyScancode::Alt
                | KeyScancode::AltGr
                | KeyScancode::LWin
                | KeyScancode::RWin
                | KeyScancode::Command
                | KeyScancode::CapsLock
                | KeyScancode::NumLock
        )
    }

    /// The modifier flag this key position contributes, if any.
    pub fn modifier(&self) -> KeyModifiers {
        match self {
            KeyScancode::LShift | KeyScancode::RShift => KeyModifiers::SHIFT,
            KeyScancode::LControl | KeyScancode::RControl => KeyModifiers::CONTROL,
            KeyScancode::Alt | KeyScancode::AltGr => KeyModifiers::ALT,
            KeyScancode::LWin | KeyScancode::RWin => KeyModifiers::WIN,
            KeyScancode::Command => KeyModifiers::COMMAND,
            KeyScancode::CapsLock => KeyModifiers::CAPS_LOCK,
            KeyScancode::NumLock => KeyModifiers::NUM_LOCK,
            _ => KeyModifiers::empty(),
        }
    }
}

/// Accent produced by a dead key in the active layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeadKey {
    Acute,
    Grave,
    Circumflex,
    Diaeresis,
    Tilde,
    Cedilla,
}

impl DeadKey {
    /// The character the key produces when composition is off (or when the
    /// accent is followed by a space).
    pub fn spacing_char(self) -> char {
        match self {
            DeadKey::Acute => '\u{B4}',
            DeadKey::Grave => '`',
            DeadKey::Circumflex => '^',
            DeadKey::Diaeresis => '\u{A8}',
            DeadKey::Tilde => '~',
            DeadKey::Cedilla => '\u{B8}',
        }
    }

    /// Combines the accent with a base letter. `None` when the pair has no
    /// precomposed form.
    pub fn compose(self, base: char) -> Option<char> {
        if base == ' ' {
            return Some(self.spacing_char());
        }
        let composed = match (self, base) {
            (DeadKey::Acute, 'a') => 'á',
            (DeadKey::Acute, 'e') => 'é',
            (DeadKey::Acute, 'i') => 'í',
            (DeadKey::Acute, 'o') => 'ó',
            (DeadKey::Acute, 'u') => 'ú',
            (DeadKey::Acute, 'y') => 'ý',
            (DeadKey::Acute, 'A') => 'Á',
            (DeadKey::Acute, 'E') => 'É',
            (DeadKey::Acute, 'I') => 'Í',
            (DeadKey::Acute, 'O') => 'Ó',
            (DeadKey::Acute, 'U') => 'Ú',
            (DeadKey::Acute, 'Y') => 'Ý',
            (DeadKey::Grave, 'a') => 'à',
            (DeadKey::Grave, 'e') => 'è',
            (DeadKey::Grave, 'i') => 'ì',
            (DeadKey::Grave, 'o') => 'ò',
            (DeadKey::Grave, 'u') => 'ù',
            (DeadKey::Grave, 'A') => 'À',
            (DeadKey::Grave, 'E') => 'È',
            (DeadKey::Grave, 'I') => 'Ì',
            (DeadKey::Grave, 'O') => 'Ò',
            (DeadKey::Grave, 'U') => 'Ù',
            (DeadKey::Circumflex, 'a') => 'â',
            (DeadKey::Circumflex, 'e') => 'ê',
            (DeadKey::Circumflex, 'i') => 'î',
            (DeadKey::Circumflex, 'o') => 'ô',
            (DeadKey::Circumflex, 'u') => 'û',
            (DeadKey::Circumflex, 'A') => 'Â',
            (DeadKey::Circumflex, 'E') => 'Ê',
            (DeadKey::Circumflex, 'I') => 'Î',
            (DeadKey::Circumflex, 'O') => 'Ô',
            (DeadKey::Circumflex, 'U') => 'Û',
            (DeadKey::Diaeresis, 'a') => 'ä',
            (DeadKey::Diaeresis, 'e') => 'ë',
            (DeadKey::Diaeresis, 'i') => 'ï',
            (DeadKey::Diaeresis, 'o') => 'ö',
            (DeadKey::Diaeresis, 'u') => 'ü',
            (DeadKey::Diaeresis, 'y') => 'ÿ',
            (DeadKey::Diaeresis, 'A') => 'Ä',
            (DeadKey::Diaeresis, 'E') => 'Ë',
            (DeadKey::Diaeresis, 'I') => 'Ï',
            (DeadKey::Diaeresis, 'O') => 'Ö',
            (DeadKey::Diaeresis, 'U') => 'Ü',
            (DeadKey::Tilde, 'a') => 'ã',
            (DeadKey::Tilde, 'n') => 'ñ',
            (DeadKey::Tilde, 'o') => 'õ',
            (DeadKey::Tilde, 'A') => 'Ã',
            (DeadKey::Tilde, 'N') => 'Ñ',
            (DeadKey::Tilde, 'O') => 'Õ',
            (DeadKey::Cedilla, 'c') => 'ç',
            (DeadKey::Cedilla, 'C') => 'Ç',
            _ => return None,
        };
        Some(composed)
    }
}

/// What the active layout produces for a scancode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyMapping {
    /// Latest character the key produced (the spacing accent for dead keys).
    pub unicode: Option<char>,
    /// Set when the key is a dead key in the active layout.
    pub dead: Option<DeadKey>,
}

impl KeyMapping {
    pub fn plain(ch: char) -> Self {
        Self {
            unicode: Some(ch),
            dead: None,
        }
    }

    pub fn dead(key: DeadKey) -> Self {
        Self {
            unicode: Some(key.spacing_char()),
            dead: Some(key),
        }
    }

    pub fn none() -> Self {
        Self {
            unicode: None,
            dead: None,
        }
    }
}

/// Applies dead-key composition to a stream of key mappings.
///
/// Holds at most one pending accent between calls.
#[derive(Debug, Default, Clone)]
pub struct DeadKeyComposer {
    pending: Option<DeadKey>,
}

impl DeadKeyComposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Option<DeadKey> {
        self.pending
    }

    pub fn reset(&mut self) {
        self.pending = None;
    }

    /// Feeds one mapping. Dead keys are held and yield `None`; the next
    /// mapping is composed with the held accent when a precomposed form
    /// exists, otherwise the base character comes through unchanged.
    pub fn feed(&mut self, mapping: KeyMapping) -> Option<char> {
        if let Some(dead) = mapping.dead {
            if let Some(previous) = self.pending.take() {
                // Two accents in a row: emit the first one and hold the second.
                self.pending = Some(dead);
                return Some(previous.spacing_char());
            }
            self.pending = Some(dead);
            return None;
        }

        let base = mapping.unicode?;
        match self.pending.take() {
            Some(dead) => Some(dead.compose(base).unwrap_or(base)),
            None => Some(base),
        }
    }
}
