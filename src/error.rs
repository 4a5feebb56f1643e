use std::io;
use thiserror::Error;

/// What overflowed when an instruction reached past a fixed-size resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BoundsError {
    #[error("memory access of {len} byte(s) at {addr:#05x} is out of range")]
    Memory { addr: usize, len: usize },

    #[error("call stack overflow")]
    StackOverflow,

    #[error("return with an empty call stack")]
    StackUnderflow,

    #[error("register block V0..=V{last:X} exceeds the register file")]
    Register { last: usize },

    #[error("key {key:#04x} does not exist")]
    Key { key: u8 },

    #[error("no font glyph for digit {digit:#04x}")]
    Glyph { digit: u8 },
}

/// Fatal interpreter errors. Nothing here is recoverable: the run loop stops
/// on the first one.
#[derive(Debug, Error)]
pub enum Chip8Error {
    #[error("unknown instruction {word:#06x} at {pc:#05x}")]
    Decode { pc: u16, word: u16 },

    #[error("bounds violation at {pc:#05x}: {source}")]
    Bounds {
        pc: u16,
        #[source]
        source: BoundsError,
    },

    #[error("program is {size} bytes but only {capacity} bytes are available")]
    ProgramTooLarge { size: usize, capacity: usize },

    #[error("sound device failure: {0}")]
    Sound(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}
