//! # interpreter
//!
//! One outer cycle, driven by [`Chip8Interpreter::cycle`], always runs in
//! this order:
//!
//!  1. refresh key state from the input device (and check for quit)
//!  2. execute exactly one instruction
//!  3. tick the delay and sound timers
//!  4. hand the frame to the display if it changed
//!
//! `Fx0A` (wait for a key) parks the interpreter in
//! [`ExecState::AwaitingKey`]. While parked, a cycle only refreshes input and
//! looks for a pressed key: PC, registers and timers stay put, and the cycle
//! reports [`CycleOutcome::Waiting`]. The cycle that finds a key completes
//! the `Fx0A` and goes on to tick timers as usual.
//!
//! Register VF doubles as the carry/borrow/shift/collision output of several
//! instructions. Those handlers compute the flag from the operands before
//! writing the result, then write VF last.
use crate::display::{Display, FrameBuffer};
use crate::error::{BoundsError, Chip8Error};
use crate::input::{Input, Keypad};
use crate::instruction::Instruction;
use crate::memory::{Chip8MemoryMap, MemoryMap};
use crate::sound::Sound;
use crate::stack::CallStack;
use crate::timer::Timers;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

pub const CHIP8_REGISTER_COUNT: usize = 16;
const VF: usize = 0xf;

/// whether the interpreter is executing or parked on `Fx0A`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecState {
    Running,
    /// waiting for any key; it goes into Vx
    AwaitingKey { x: usize },
}

/// what a call to `cycle()` achieved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// one instruction boundary passed and the timers ticked
    Completed,
    /// still waiting for a key; nothing else moved
    Waiting,
    /// the input device asked us to stop; nothing was executed
    Quit,
}

/// All of the machine state. Created once per loaded program.
pub struct Machine {
    pub memory: Chip8MemoryMap,
    pub v: [u8; CHIP8_REGISTER_COUNT],
    pub i: u16,
    pub pc: u16,
    pub stack: CallStack,
    pub timers: Timers,
    pub keys: Keypad,
    pub frame: FrameBuffer,
    pub state: ExecState,
}

impl Machine {
    pub fn new() -> Self {
        let memory = Chip8MemoryMap::new();
        let pc = memory.program_addr;
        Machine {
            memory,
            v: [0; CHIP8_REGISTER_COUNT],
            i: 0,
            pc,
            stack: CallStack::new(),
            timers: Timers::new(),
            keys: Keypad::new(),
            frame: FrameBuffer::new(),
            state: ExecState::Running,
        }
    }

    fn advance(&mut self) {
        self.pc = self.pc.wrapping_add(2);
    }

    fn skip_if(&mut self, cond: bool) {
        self.pc = self.pc.wrapping_add(if cond { 4 } else { 2 });
    }

    fn set_flag(&mut self, flag: bool) {
        self.v[VF] = flag as u8;
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Chip8Interpreter<'a> {
    machine: Machine,
    rng: StdRng,
    display: &'a mut dyn Display,
    input: &'a mut dyn Input,
    sound: &'a mut dyn Sound,
}

impl<'a> Chip8Interpreter<'a> {
    pub fn new(
        display: &'a mut dyn Display,
        input: &'a mut dyn Input,
        sound: &'a mut dyn Sound,
    ) -> Chip8Interpreter<'a> {
        Chip8Interpreter {
            machine: Machine::new(),
            rng: StdRng::from_entropy(),
            display,
            input,
            sound,
        }
    }

    /// make `Cxkk` repeatable
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// load a chip8 program
    pub fn load_program(&mut self, reader: &mut impl io::Read) -> Result<usize, Chip8Error> {
        self.machine.memory.load_program(reader)
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    /// run one outer cycle
    pub fn cycle(&mut self) -> Result<CycleOutcome, Chip8Error> {
        self.input.refresh(&mut self.machine.keys)?;
        if self.input.quit_requested() {
            return Ok(CycleOutcome::Quit);
        }

        match self.machine.state {
            ExecState::Running => self.step()?,
            ExecState::AwaitingKey { x } => self.resolve_key_wait(x),
        }
        if let ExecState::AwaitingKey { .. } = self.machine.state {
            return Ok(CycleOutcome::Waiting);
        }

        if self.machine.timers.tick() {
            debug!("sound timer expired");
            self.sound
                .alert()
                .map_err(|e| Chip8Error::Sound(e.to_string()))?;
        }

        if self.machine.frame.is_dirty() {
            self.display.draw(&self.machine.frame)?;
            self.machine.frame.clear_dirty();
        }
        Ok(CycleOutcome::Completed)
    }

    /// cycle until quit is requested, sleeping out the rest of each
    /// `cycle_time`; returns how many cycles completed
    pub fn main_loop(&mut self, cycle_time: Duration) -> Result<u64, Chip8Error> {
        info!(?cycle_time, "starting main loop");
        let mut completed = 0;
        loop {
            let started = Instant::now();
            match self.cycle()? {
                CycleOutcome::Quit => break,
                CycleOutcome::Completed => completed += 1,
                CycleOutcome::Waiting => {}
            }
            if let Some(rest) = cycle_time.checked_sub(started.elapsed()) {
                spin_sleep::sleep(rest);
            }
        }
        info!(completed, "quit requested, stopping");
        Ok(completed)
    }

    /// fetch, decode and execute the instruction at PC
    fn step(&mut self) -> Result<(), Chip8Error> {
        let pc = self.machine.pc;
        let word = self
            .machine
            .memory
            .get_word(pc)
            .map_err(|source| Chip8Error::Bounds { pc, source })?;
        let inst = Instruction::decode(word).ok_or(Chip8Error::Decode { pc, word })?;
        trace!(pc, word, ?inst, "execute");
        self.execute(inst)
            .map_err(|source| Chip8Error::Bounds { pc, source })
    }

    /// Each arm is responsible for moving PC on.
    fn execute(&mut self, inst: Instruction) -> Result<(), BoundsError> {
        use Instruction::*;

        let m = &mut self.machine;
        match inst {
            Cls => {
                m.frame.clear();
                m.advance();
            }
            Ret => {
                // the saved PC points at the CALL itself
                m.pc = m.stack.pop()?;
                m.advance();
            }
            Jp(nnn) => m.pc = nnn,
            Call(nnn) => {
                m.stack.push(m.pc)?;
                m.pc = nnn;
            }
            SeByte(x, kk) => m.skip_if(m.v[x] == kk),
            SneByte(x, kk) => m.skip_if(m.v[x] != kk),
            SeReg(x, y) => m.skip_if(m.v[x] == m.v[y]),
            SneReg(x, y) => m.skip_if(m.v[x] != m.v[y]),
            LdByte(x, kk) => {
                m.v[x] = kk;
                m.advance();
            }
            AddByte(x, kk) => {
                m.v[x] = m.v[x].wrapping_add(kk);
                m.advance();
            }
            LdReg(x, y) => {
                m.v[x] = m.v[y];
                m.advance();
            }
            Or(x, y) => {
                m.v[x] |= m.v[y];
                m.advance();
            }
            And(x, y) => {
                m.v[x] &= m.v[y];
                m.advance();
            }
            Xor(x, y) => {
                m.v[x] ^= m.v[y];
                m.advance();
            }
            AddReg(x, y) => {
                let (sum, carry) = m.v[x].overflowing_add(m.v[y]);
                m.v[x] = sum;
                m.set_flag(carry);
                m.advance();
            }
            Sub(x, y) => {
                let (a, b) = (m.v[x], m.v[y]);
                m.v[x] = a.wrapping_sub(b);
                m.set_flag(a >= b);
                m.advance();
            }
            Subn(x, y) => {
                let (a, b) = (m.v[x], m.v[y]);
                m.v[x] = b.wrapping_sub(a);
                m.set_flag(b >= a);
                m.advance();
            }
            Shr(x) => {
                let a = m.v[x];
                m.v[x] = a >> 1;
                m.set_flag(a & 0x01 != 0);
                m.advance();
            }
            Shl(x) => {
                let a = m.v[x];
                m.v[x] = a << 1;
                m.set_flag(a & 0x80 != 0);
                m.advance();
            }
            LdI(nnn) => {
                m.i = nnn;
                m.advance();
            }
            JpV0(nnn) => m.pc = nnn + m.v[0] as u16,
            Rnd(x, kk) => {
                m.v[x] = self.rng.gen::<u8>() & kk;
                m.advance();
            }
            Drw(x, y, n) => {
                let sprite = m.memory.get_ro_slice(m.i, n as usize)?;
                let collision = m.frame.draw_sprite(sprite, m.v[x], m.v[y]);
                m.set_flag(collision);
                m.advance();
            }
            Skp(x) => {
                let pressed = m.keys.is_pressed(m.v[x])?;
                m.skip_if(pressed);
            }
            Sknp(x) => {
                let pressed = m.keys.is_pressed(m.v[x])?;
                m.skip_if(!pressed);
            }
            LdRegDt(x) => {
                m.v[x] = m.timers.delay;
                m.advance();
            }
            LdKey(x) => {
                debug!(x, "waiting for a key");
                m.state = ExecState::AwaitingKey { x };
                self.resolve_key_wait(x);
            }
            LdDtReg(x) => {
                m.timers.delay = m.v[x];
                m.advance();
            }
            LdSt(x) => {
                m.timers.sound = m.v[x];
                m.advance();
            }
            AddI(x) => {
                let overflow = m.i as u32 + m.v[x] as u32 > 0xff;
                m.i = m.i.wrapping_add(m.v[x] as u16);
                m.set_flag(overflow);
                m.advance();
            }
            LdF(x) => {
                m.i = m.memory.glyph_addr(m.v[x])?;
                m.advance();
            }
            LdB(x) => {
                let n = m.v[x];
                m.memory.write(&[n / 100, (n / 10) % 10, n % 10], m.i)?;
                m.advance();
            }
            StoreRegs(x) => {
                let regs = m.v.get(..=x).ok_or(BoundsError::Register { last: x })?;
                m.memory.write(regs, m.i)?;
                m.advance();
            }
            LoadRegs(x) => {
                let regs = m
                    .v
                    .get_mut(..=x)
                    .ok_or(BoundsError::Register { last: x })?;
                regs.copy_from_slice(m.memory.get_ro_slice(m.i, x + 1)?);
                m.advance();
            }
        }
        Ok(())
    }

    /// finish an `Fx0A` if a key is down; the lowest key wins
    fn resolve_key_wait(&mut self, x: usize) {
        let m = &mut self.machine;
        if let Some(key) = m.keys.first_pressed() {
            debug!(key, x, "key pressed, resuming");
            m.v[x] = key;
            m.state = ExecState::Running;
            m.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::DummyDisplay;
    use crate::input::DummyInput;
    use crate::sound::Mute;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::error::Error;

    type TestResult = Result<(), Box<dyn Error>>;

    /// the collaborators an interpreter borrows
    struct Rig {
        display: DummyDisplay,
        input: DummyInput,
        sound: Mute,
    }

    impl Rig {
        fn new() -> Self {
            Rig::with_input(DummyInput::new(&[]))
        }

        fn with_input(input: DummyInput) -> Self {
            Rig {
                display: DummyDisplay::new(),
                input,
                sound: Mute::new(),
            }
        }

        fn interpreter(&mut self, mut prog: &[u8]) -> Chip8Interpreter<'_> {
            let mut i = Chip8Interpreter::new(&mut self.display, &mut self.input, &mut self.sound)
                .with_seed(0x5eed);
            i.load_program(&mut prog).unwrap();
            i
        }
    }

    fn run(i: &mut Chip8Interpreter, cycles: usize) -> Result<(), Chip8Error> {
        for _ in 0..cycles {
            assert_eq!(i.cycle()?, CycleOutcome::Completed);
        }
        Ok(())
    }

    #[test]
    fn test_initial_state() {
        let mut rig = Rig::new();
        let i = rig.interpreter(&[]);
        let m = i.machine();
        assert_eq!(m.pc, 0x200);
        assert_eq!(m.i, 0);
        assert_eq!(m.v, [0; 16]);
        assert_eq!(m.stack.pointer(), 0);
        assert_eq!(m.timers, Timers::new());
        assert_eq!(m.state, ExecState::Running);
        assert_eq!(m.memory.get_byte(0x4f), Ok(0x80)); // last row of 'F'
    }

    #[test]
    fn test_program_load_ok() -> TestResult {
        let mut rig = Rig::new();
        let mut i = rig.interpreter(&[]);
        let mut prog: &[u8] = &[0x00, 0xe0]; // clear screen
        assert_eq!(i.load_program(&mut prog)?, 2);
        Ok(())
    }

    #[test]
    fn test_load_immediate_and_add_immediate_wraps() -> TestResult {
        let mut rig = Rig::new();
        // V1 = 0xff; VF = 0x42; V1 += 2
        let mut i = rig.interpreter(&[0x61, 0xff, 0x6f, 0x42, 0x71, 0x02]);
        run(&mut i, 3)?;
        assert_eq!(i.machine().v[1], 0x01);
        // no carry from the immediate add
        assert_eq!(i.machine().v[VF], 0x42);
        assert_eq!(i.machine().pc, 0x206);
        Ok(())
    }

    #[test]
    fn test_bitwise_ops() -> TestResult {
        let mut rig = Rig::new();
        let mut i = rig.interpreter(&[
            0x60, 0b1100, // V0 = 1100
            0x61, 0b1010, // V1 = 1010
            0x82, 0x00, // V2 = V0
            0x82, 0x11, // V2 |= V1
            0x83, 0x00, // V3 = V0
            0x83, 0x12, // V3 &= V1
            0x84, 0x00, // V4 = V0
            0x84, 0x13, // V4 ^= V1
        ]);
        run(&mut i, 8)?;
        assert_eq!(&i.machine().v[2..5], &[0b1110, 0b1000, 0b0110]);
        Ok(())
    }

    #[test]
    fn test_flag_wins_when_vf_is_the_target() -> TestResult {
        let mut rig = Rig::new();
        let mut i = rig.interpreter(&[]);
        i.machine.v[VF] = 200;
        i.machine.v[0xe] = 100;
        i.execute(Instruction::AddReg(VF, 0xe))?;
        assert_eq!(i.machine().v[VF], 1);

        i.machine.v[VF] = 1;
        i.machine.v[0xe] = 2;
        i.execute(Instruction::Sub(VF, 0xe))?;
        assert_eq!(i.machine().v[VF], 0);
        Ok(())
    }

    #[test]
    fn test_sub_equal_operands_sets_flag() -> TestResult {
        let mut rig = Rig::new();
        let mut i = rig.interpreter(&[]);
        i.machine.v[3] = 9;
        i.machine.v[4] = 9;
        i.execute(Instruction::Sub(3, 4))?;
        assert_eq!(i.machine().v[3], 0);
        assert_eq!(i.machine().v[VF], 1);
        Ok(())
    }

    #[test]
    fn test_call_return_round_trip() -> TestResult {
        let mut rig = Rig::new();
        // 0x200: CALL 0x206; 0x202: JP 0x202; 0x206: RET
        let mut i = rig.interpreter(&[0x22, 0x06, 0x12, 0x02, 0x00, 0x00, 0x00, 0xee]);
        run(&mut i, 1)?;
        assert_eq!(i.machine().pc, 0x206);
        assert_eq!(i.machine().stack.pointer(), 1);
        run(&mut i, 1)?;
        assert_eq!(i.machine().pc, 0x202);
        assert_eq!(i.machine().stack.pointer(), 0);
        Ok(())
    }

    #[test]
    fn test_call_on_full_stack_fails() -> TestResult {
        let mut rig = Rig::new();
        // 0x200: CALL 0x200, forever
        let mut i = rig.interpreter(&[0x22, 0x00]);
        run(&mut i, 16)?;
        assert_eq!(i.machine().stack.pointer(), 16);
        let err = i.cycle().unwrap_err();
        assert!(matches!(
            err,
            Chip8Error::Bounds {
                pc: 0x200,
                source: BoundsError::StackOverflow
            }
        ));
        assert_eq!(i.machine().stack.pointer(), 16);
        Ok(())
    }

    #[test]
    fn test_return_on_empty_stack_fails() {
        let mut rig = Rig::new();
        let mut i = rig.interpreter(&[0x00, 0xee]);
        assert!(matches!(
            i.cycle(),
            Err(Chip8Error::Bounds {
                pc: 0x200,
                source: BoundsError::StackUnderflow
            })
        ));
    }

    #[test]
    fn test_jumps() -> TestResult {
        let mut rig = Rig::new();
        // JP 0x300
        let mut i = rig.interpreter(&[0x13, 0x00]);
        run(&mut i, 1)?;
        assert_eq!(i.machine().pc, 0x300);

        i.machine.v[0] = 0x10;
        i.execute(Instruction::JpV0(0x400))?;
        assert_eq!(i.machine().pc, 0x410);
        Ok(())
    }

    #[test]
    fn test_skips() -> TestResult {
        let mut rig = Rig::new();
        let mut i = rig.interpreter(&[]);
        i.machine.v[1] = 0x42;
        i.machine.v[2] = 0x42;
        i.machine.v[3] = 0x07;

        let cases = [
            (Instruction::SeByte(1, 0x42), 4),
            (Instruction::SeByte(1, 0x43), 2),
            (Instruction::SneByte(1, 0x43), 4),
            (Instruction::SneByte(1, 0x42), 2),
            (Instruction::SeReg(1, 2), 4),
            (Instruction::SeReg(1, 3), 2),
            (Instruction::SneReg(1, 3), 4),
            (Instruction::SneReg(1, 2), 2),
        ];
        for (inst, step) in cases {
            let before = i.machine().pc;
            i.execute(inst)?;
            assert_eq!(i.machine().pc - before, step, "{:?}", inst);
        }
        Ok(())
    }

    #[test]
    fn test_key_skips_see_this_cycles_keys() -> TestResult {
        let mut rig = Rig::with_input(DummyInput::new(&[0x5]));
        // V0 = 5; SKP V0; (skipped); SKNP V0
        let mut i = rig.interpreter(&[0x60, 0x05, 0xe0, 0x9e, 0x00, 0x00, 0xe0, 0xa1]);
        run(&mut i, 2)?;
        assert_eq!(i.machine().pc, 0x206);
        run(&mut i, 1)?;
        assert_eq!(i.machine().pc, 0x208);
        Ok(())
    }

    #[test]
    fn test_key_skip_with_bad_key() {
        let mut rig = Rig::new();
        // V0 = 0x10; SKP V0
        let mut i = rig.interpreter(&[0x60, 0x10, 0xe0, 0x9e]);
        i.cycle().unwrap();
        assert!(matches!(
            i.cycle(),
            Err(Chip8Error::Bounds {
                pc: 0x202,
                source: BoundsError::Key { key: 0x10 }
            })
        ));
    }

    #[test]
    fn test_bcd() -> TestResult {
        let mut rig = Rig::new();
        // V5 = 157; I = 0x300; LD B, V5
        let mut i = rig.interpreter(&[0x65, 157, 0xa3, 0x00, 0xf5, 0x33]);
        run(&mut i, 3)?;
        assert_eq!(i.machine().memory.get_ro_slice(0x300, 3)?, &[1, 5, 7]);
        assert_eq!(i.machine().i, 0x300);
        Ok(())
    }

    #[test]
    fn test_bcd_past_end_of_memory() {
        let mut rig = Rig::new();
        let mut i = rig.interpreter(&[]);
        i.machine.i = 0xffe;
        assert_eq!(
            i.execute(Instruction::LdB(0)),
            Err(BoundsError::Memory { addr: 0xffe, len: 3 })
        );
    }

    #[test]
    fn test_store_and_load_registers() -> TestResult {
        let mut rig = Rig::new();
        let mut i = rig.interpreter(&[]);
        i.machine.v[..4].copy_from_slice(&[1, 2, 3, 4]);
        i.machine.i = 0x400;
        i.execute(Instruction::StoreRegs(2))?;
        assert_eq!(i.machine().memory.get_ro_slice(0x400, 4)?, &[1, 2, 3, 0]);
        assert_eq!(i.machine().i, 0x400);

        i.machine.v = [0; 16];
        i.execute(Instruction::LoadRegs(3))?;
        assert_eq!(&i.machine().v[..5], &[1, 2, 3, 0, 0]);
        Ok(())
    }

    #[test]
    fn test_register_block_past_end_of_memory() {
        let mut rig = Rig::new();
        let mut i = rig.interpreter(&[]);
        i.machine.i = 0xff8;
        assert_eq!(
            i.execute(Instruction::StoreRegs(0xf)),
            Err(BoundsError::Memory { addr: 0xff8, len: 16 })
        );
        assert_eq!(
            i.execute(Instruction::LoadRegs(0xf)),
            Err(BoundsError::Memory { addr: 0xff8, len: 16 })
        );
    }

    #[test]
    fn test_font_lookup() -> TestResult {
        let mut rig = Rig::new();
        let mut i = rig.interpreter(&[]);
        i.machine.v[7] = 0xa;
        i.execute(Instruction::LdF(7))?;
        assert_eq!(i.machine().i, 50);

        i.machine.v[7] = 0x10;
        assert_eq!(
            i.execute(Instruction::LdF(7)),
            Err(BoundsError::Glyph { digit: 0x10 })
        );
        Ok(())
    }

    #[test]
    fn test_add_to_index() -> TestResult {
        let mut rig = Rig::new();
        let mut i = rig.interpreter(&[]);
        i.machine.i = 0xf0;
        i.machine.v[1] = 0x0f;
        i.execute(Instruction::AddI(1))?;
        assert_eq!(i.machine().i, 0xff);
        assert_eq!(i.machine().v[VF], 0);

        i.execute(Instruction::AddI(1))?;
        assert_eq!(i.machine().i, 0x10e);
        assert_eq!(i.machine().v[VF], 1);
        Ok(())
    }

    #[test]
    fn test_random_is_masked() -> TestResult {
        let mut rig = Rig::new();
        let mut i = rig.interpreter(&[]);
        for _ in 0..64 {
            i.execute(Instruction::Rnd(2, 0x0f))?;
            assert!(i.machine().v[2] <= 0x0f);
        }
        i.execute(Instruction::Rnd(2, 0x00))?;
        assert_eq!(i.machine().v[2], 0);
        Ok(())
    }

    #[test]
    fn test_draw_presents_and_reports_collision() -> TestResult {
        let mut rig = Rig::new();
        {
            // I = glyph 0; DRW V0, V1, 5; DRW V0, V1, 5
            let mut i = rig.interpreter(&[0xa0, 0x00, 0xd0, 0x15, 0xd0, 0x15]);
            run(&mut i, 2)?;
            assert_eq!(i.machine().v[VF], 0);
            assert!(i.machine().frame.get(0, 0));
            assert!(!i.machine().frame.is_dirty());
            run(&mut i, 1)?;
            assert_eq!(i.machine().v[VF], 1);
            assert!(i.machine().frame.pixels().iter().all(|p| !p));
        }
        // one presentation per draw, none for the LD I
        assert_eq!(rig.display.draws, 2);
        Ok(())
    }

    #[test]
    fn test_clear_screen_presents() -> TestResult {
        let mut rig = Rig::new();
        {
            let mut i = rig.interpreter(&[0x00, 0xe0]);
            i.machine.frame.draw_sprite(&[0xff], 0, 0);
            run(&mut i, 1)?;
            assert!(i.machine().frame.pixels().iter().all(|p| !p));
        }
        assert_eq!(rig.display.draws, 1);
        Ok(())
    }

    #[test]
    fn test_draw_past_end_of_memory() {
        let mut rig = Rig::new();
        let mut i = rig.interpreter(&[]);
        i.machine.i = 0xffc;
        assert_eq!(
            i.execute(Instruction::Drw(0, 0, 5)),
            Err(BoundsError::Memory { addr: 0xffc, len: 5 })
        );
    }

    #[test]
    fn test_timers() -> TestResult {
        let mut rig = Rig::new();
        {
            let mut i = rig.interpreter(&[
                0x60, 0x03, // V0 = 3
                0xf0, 0x15, // DT = V0
                0xf0, 0x18, // ST = V0
                0xf1, 0x07, // V1 = DT
                0x12, 0x08, // JP 0x208
            ]);
            run(&mut i, 3)?;
            // DT was set during cycle 2 and ticked at the end of cycles 2 and 3
            assert_eq!(i.machine().timers.delay, 1);
            run(&mut i, 1)?;
            assert_eq!(i.machine().v[1], 1);
            run(&mut i, 10)?;
            assert_eq!(i.machine().timers, Timers::new());
        }
        assert_eq!(rig.sound.alerts, 1);
        Ok(())
    }

    #[test]
    fn test_key_wait() -> TestResult {
        let input = DummyInput::scripted(vec![
            Keypad::new(),
            Keypad::new(),
            Keypad::new(),
            Keypad::new(),
            Keypad::from_pressed(&[0xa]),
        ]);
        let mut rig = Rig::with_input(input);
        // LD V3, K
        let mut i = rig.interpreter(&[0xf3, 0x0a]);
        i.machine.timers = Timers { delay: 5, sound: 5 };

        for _ in 0..4 {
            assert_eq!(i.cycle()?, CycleOutcome::Waiting);
            assert_eq!(i.machine().pc, 0x200);
            assert_eq!(i.machine().timers, Timers { delay: 5, sound: 5 });
            assert_eq!(i.machine().state, ExecState::AwaitingKey { x: 3 });
        }

        assert_eq!(i.cycle()?, CycleOutcome::Completed);
        assert_eq!(i.machine().v[3], 10);
        assert_eq!(i.machine().pc, 0x202);
        assert_eq!(i.machine().timers, Timers { delay: 4, sound: 4 });
        assert_eq!(i.machine().state, ExecState::Running);
        Ok(())
    }

    #[test]
    fn test_key_wait_with_key_already_down() -> TestResult {
        let mut rig = Rig::with_input(DummyInput::new(&[0xf, 0x3]));
        let mut i = rig.interpreter(&[0xf0, 0x0a]);
        assert_eq!(i.cycle()?, CycleOutcome::Completed);
        // lowest key wins
        assert_eq!(i.machine().v[0], 3);
        assert_eq!(i.machine().pc, 0x202);
        Ok(())
    }

    #[test]
    fn test_quit_while_waiting_for_key() -> TestResult {
        let mut rig = Rig::with_input(DummyInput::new(&[]).quit_after(3));
        {
            let mut i = rig.interpreter(&[0xf0, 0x0a]);
            i.machine.v[0] = 0x99;
            assert_eq!(i.cycle()?, CycleOutcome::Waiting);
            assert_eq!(i.cycle()?, CycleOutcome::Waiting);
            assert_eq!(i.cycle()?, CycleOutcome::Quit);
            assert_eq!(i.machine().v[0], 0x99);
            assert_eq!(i.machine().pc, 0x200);
        }
        assert_eq!(rig.input.refreshes(), 3);
        Ok(())
    }

    #[test]
    fn test_quit_stops_before_executing() -> TestResult {
        let mut rig = Rig::with_input(DummyInput::new(&[]).quit_after(1));
        let mut i = rig.interpreter(&[0x60, 0x01]);
        assert_eq!(i.cycle()?, CycleOutcome::Quit);
        assert_eq!(i.machine().pc, 0x200);
        assert_eq!(i.machine().v[0], 0);
        Ok(())
    }

    #[test]
    fn test_main_loop_runs_until_quit() -> TestResult {
        let mut rig = Rig::with_input(DummyInput::new(&[]).quit_after(6));
        // JP 0x200
        let mut i = rig.interpreter(&[0x12, 0x00]);
        assert_eq!(i.main_loop(Duration::ZERO)?, 5);
        Ok(())
    }

    #[test]
    fn test_unknown_instruction() {
        let mut rig = Rig::new();
        let mut i = rig.interpreter(&[0x60, 0x01, 0x80, 0x0f]);
        i.cycle().unwrap();
        assert!(matches!(
            i.cycle(),
            Err(Chip8Error::Decode {
                pc: 0x202,
                word: 0x800f
            })
        ));
    }

    #[test]
    fn test_fetch_past_end_of_memory() -> TestResult {
        let mut rig = Rig::new();
        // JP 0xfff
        let mut i = rig.interpreter(&[0x1f, 0xff]);
        run(&mut i, 1)?;
        assert!(matches!(
            i.cycle(),
            Err(Chip8Error::Bounds {
                pc: 0xfff,
                source: BoundsError::Memory { addr: 0xfff, len: 2 }
            })
        ));
        Ok(())
    }

    fn exec_on(a: u8, b: u8, inst: Instruction) -> [u8; 16] {
        let mut rig = Rig::new();
        let mut i = rig.interpreter(&[]);
        i.machine.v[1] = a;
        i.machine.v[2] = b;
        i.execute(inst).unwrap();
        assert_eq!(i.machine().pc, 0x202);
        i.machine().v
    }

    proptest! {
        #[test]
        fn test_add_with_carry(a in any::<u8>(), b in any::<u8>()) {
            let v = exec_on(a, b, Instruction::AddReg(1, 2));
            prop_assert_eq!(v[1], ((a as u16 + b as u16) % 256) as u8);
            prop_assert_eq!(v[VF], (a as u16 + b as u16 > 255) as u8);
        }

        #[test]
        fn test_sub_with_borrow(a in any::<u8>(), b in any::<u8>()) {
            let v = exec_on(a, b, Instruction::Sub(1, 2));
            prop_assert_eq!(v[1], a.wrapping_sub(b));
            prop_assert_eq!(v[VF], (a >= b) as u8);
        }

        #[test]
        fn test_reverse_sub_with_borrow(a in any::<u8>(), b in any::<u8>()) {
            let v = exec_on(a, b, Instruction::Subn(1, 2));
            prop_assert_eq!(v[1], b.wrapping_sub(a));
            prop_assert_eq!(v[VF], (b >= a) as u8);
        }

        #[test]
        fn test_shifts(a in any::<u8>()) {
            let v = exec_on(a, 0, Instruction::Shr(1));
            prop_assert_eq!(v[1], a >> 1);
            prop_assert_eq!(v[VF], a & 1);

            let v = exec_on(a, 0, Instruction::Shl(1));
            prop_assert_eq!(v[1], a.wrapping_shl(1));
            prop_assert_eq!(v[VF], a >> 7);
        }

        #[test]
        fn test_add_immediate_leaves_flag(a in any::<u8>(), kk in any::<u8>()) {
            let v = exec_on(a, 0, Instruction::AddByte(1, kk));
            prop_assert_eq!(v[1], a.wrapping_add(kk));
            prop_assert_eq!(v[VF], 0);
        }
    }
}
