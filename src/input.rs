use crate::error::BoundsError;
use crossterm::event::{poll, read, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::time::{Duration, Instant};
use tracing::debug;

pub const CHIP8_KEY_COUNT: usize = 16;

/// map of keys on the left-hand side of a qwerty keyboard to the COSMAC hex
/// keypad:
///
/// ```text
///   1 2 3 4        1 2 3 C
///   q w e r   ->   4 5 6 D
///   a s d f        7 8 9 E
///   z x c v        A 0 B F
/// ```
const CHIP8_CONVENTIONAL_KEYMAP: [(char, u8); 16] = [
    ('x', 0x00), // x
    ('1', 0x01), // 1
    ('2', 0x02), // 2
    ('3', 0x03), // 3
    ('q', 0x04), // q
    ('w', 0x05), // w
    ('e', 0x06), // e
    ('a', 0x07), // a
    ('s', 0x08), // s
    ('d', 0x09), // d
    ('z', 0x0a), // z
    ('c', 0x0b), // c
    ('4', 0x0c), // 4
    ('r', 0x0d), // r
    ('f', 0x0e), // f
    ('v', 0x0f), // v
];

/// terminals only report presses, so a key counts as held for this long
/// after its last press (or auto-repeat) event
const KEY_HOLD: Duration = Duration::from_millis(100);

/// pressed/released state of the 16 hex keys
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Keypad {
    keys: [bool; CHIP8_KEY_COUNT],
}

impl Keypad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pressed(pressed: &[u8]) -> Self {
        let mut k = Keypad::new();
        for key in pressed {
            if let Some(slot) = k.keys.get_mut(*key as usize) {
                *slot = true;
            }
        }
        k
    }

    pub fn is_pressed(&self, key: u8) -> Result<bool, BoundsError> {
        self.keys
            .get(key as usize)
            .copied()
            .ok_or(BoundsError::Key { key })
    }

    /// lowest-numbered key that is down, if any
    pub fn first_pressed(&self) -> Option<u8> {
        self.keys.iter().position(|k| *k).map(|k| k as u8)
    }
}

/// source of key state and of the request to stop
pub trait Input {
    /// pull the latest pressed/released state of every key into `keys`
    fn refresh(&mut self, keys: &mut Keypad) -> Result<(), io::Error>;

    /// sticky: once true, stays true
    fn quit_requested(&self) -> bool;
}

/// keyboard input from the terminal, using crossterm
pub struct TermInput {
    keymap: HashMap<char, u8>,
    held_until: [Option<Instant>; CHIP8_KEY_COUNT],
    quit: bool,
}

impl TermInput {
    pub fn new() -> Result<Self, io::Error> {
        terminal::enable_raw_mode()?;
        Ok(TermInput {
            keymap: HashMap::from(CHIP8_CONVENTIONAL_KEYMAP),
            held_until: [None; CHIP8_KEY_COUNT],
            quit: false,
        })
    }

    fn handle_key(&mut self, evt: KeyEvent, now: Instant) {
        match evt.code {
            KeyCode::Esc => self.quit = true,
            KeyCode::Char('c') if evt.modifiers.contains(KeyModifiers::CONTROL) => {
                self.quit = true
            }
            KeyCode::Char(key) => match self.keymap.get(&key.to_ascii_lowercase()) {
                Some(mapped_key) => self.held_until[*mapped_key as usize] = Some(now + KEY_HOLD),
                None => {
                    debug!("can't map {:?} to a COSMAC key", key);
                }
            },
            other => {
                debug!(?other, "ignoring key");
            }
        }
    }

    fn read_terminal(&mut self, now: Instant) -> Result<(), io::Error> {
        while poll(Duration::from_millis(0))? {
            match read()? {
                Event::Key(evt) => self.handle_key(evt, now),
                Event::Resize(..) => {}
                other => {
                    debug!(?other, "unknown event received");
                }
            }
        }
        Ok(())
    }

    /// a key is down while its hold window is still open at `now`
    fn update_keys(&mut self, keys: &mut Keypad, now: Instant) {
        for (key, until) in self.held_until.iter_mut().enumerate() {
            let held = matches!(until, Some(t) if *t > now);
            if !held {
                *until = None;
            }
            keys.keys[key] = held;
        }
    }
}

impl Drop for TermInput {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

impl Input for TermInput {
    fn refresh(&mut self, keys: &mut Keypad) -> Result<(), io::Error> {
        let now = Instant::now();
        self.read_terminal(now)?;
        self.update_keys(keys, now);
        Ok(())
    }

    fn quit_requested(&self) -> bool {
        self.quit
    }
}

/// scripted Input implementation for testing: each refresh takes the next
/// keypad state from the script, and the last one repeats forever
pub struct DummyInput {
    script: VecDeque<Keypad>,
    current: Keypad,
    quit_after: Option<usize>,
    refreshes: usize,
}

impl DummyInput {
    /// a keypad that stays in one state
    pub fn new(keys: &[u8]) -> Self {
        DummyInput::scripted(vec![Keypad::from_pressed(keys)])
    }

    pub fn scripted(states: Vec<Keypad>) -> Self {
        DummyInput {
            script: states.into(),
            current: Keypad::new(),
            quit_after: None,
            refreshes: 0,
        }
    }

    /// raise quit once `refreshes` refreshes have happened
    pub fn quit_after(mut self, refreshes: usize) -> Self {
        self.quit_after = Some(refreshes);
        self
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes
    }
}

impl Input for DummyInput {
    fn refresh(&mut self, keys: &mut Keypad) -> Result<(), io::Error> {
        if let Some(next) = self.script.pop_front() {
            self.current = next;
        }
        *keys = self.current;
        self.refreshes += 1;
        Ok(())
    }

    fn quit_requested(&self) -> bool {
        matches!(self.quit_after, Some(n) if self.refreshes >= n)
    }
}
