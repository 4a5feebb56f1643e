use crate::error::BoundsError;

pub const CHIP8_STACK_DEPTH: usize = 16;

/// Return addresses for CALL/RET. Fixed depth; running off either end is a
/// bounds error rather than a wrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallStack {
    entries: [u16; CHIP8_STACK_DEPTH],
    sp: usize,
}

impl CallStack {
    pub fn new() -> Self {
        CallStack {
            entries: [0; CHIP8_STACK_DEPTH],
            sp: 0,
        }
    }

    pub fn push(&mut self, addr: u16) -> Result<(), BoundsError> {
        let slot = self
            .entries
            .get_mut(self.sp)
            .ok_or(BoundsError::StackOverflow)?;
        *slot = addr;
        self.sp += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Result<u16, BoundsError> {
        if self.sp == 0 {
            return Err(BoundsError::StackUnderflow);
        }
        self.sp -= 1;
        Ok(self.entries[self.sp])
    }

    /// number of live entries
    pub fn pointer(&self) -> usize {
        self.sp
    }
}

impl Default for CallStack {
    fn default() -> Self {
        Self::new()
    }
}
