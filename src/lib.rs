//! # chip8
//!
//! An interpreter for the CHIP-8 virtual machine: 4K of memory with the hex
//! font at 0x000 and programs loaded at 0x200, sixteen 8-bit registers (VF
//! doubling as the flag register), a 16-deep call stack, delay and sound
//! timers, a 64x32 monochrome display and a 16-key hex keypad.
//!
//! ## Design
//!
//! * the interpreter owns all of the machine state in one `Machine`
//! * timers tick once per completed instruction, not on a wall clock
//! * abstract display so can plug alternatives; starting with TUI in-console
//! * any encoding or bounds violation halts with an error; nothing wraps or
//!   is skipped silently
//!
//! Model
//!
//! ```text
//! Environment (main.rs)
//!  |-- display, input, sound, config
//!  |-- interpreter(display, input, sound)
//!  |    |-- machine: memory, registers, stack, timers, keypad, frame
//!  |    `-- instruction set
//!  `-- main loop
//!       |-- input.refresh(); quit?
//!       |-- execute one instruction (or keep waiting for a key)
//!       |-- tick timers; beep on sound timer 1 -> 0
//!       |-- draw frame if dirty
//!       `-- sleep out the rest of the cycle
//! ```

pub mod display;
pub mod error;
pub mod input;
pub mod instruction;
pub mod interpreter;
pub mod memory;
pub mod sound;
pub mod stack;
pub mod timer;

pub use error::{BoundsError, Chip8Error};
