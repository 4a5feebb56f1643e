//! # instruction set
//!
//! Every instruction is a big-endian 16-bit word. The top nibble picks the
//! family; families 0x0, 0x8, 0xE and 0xF need a second look at `kk` or `n`.
//!
//! ```text
//!   word:  F E D C | B A 9 8 | 7 6 5 4 | 3 2 1 0
//!          family  |    x    |    y    |    n
//!                  |         |        kk
//!                  |            nnn
//! ```
//!
//! Register operands are kept as `usize` so they index the register file
//! without casting.

/// Raw operand fields of an instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fields {
    pub family: u8,
    pub nnn: u16,
    pub n: u8,
    pub kk: u8,
    pub x: usize,
    pub y: usize,
}

impl From<u16> for Fields {
    fn from(word: u16) -> Self {
        Fields {
            family: ((word & 0xf000) >> 12) as u8,
            nnn: word & 0x0fff,
            n: (word & 0x000f) as u8,
            kk: (word & 0x00ff) as u8,
            x: ((word & 0x0f00) >> 8) as usize,
            y: ((word & 0x00f0) >> 4) as usize,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// 00E0
    Cls,
    /// 00EE
    Ret,
    /// 1nnn
    Jp(u16),
    /// 2nnn
    Call(u16),
    /// 3xkk
    SeByte(usize, u8),
    /// 4xkk
    SneByte(usize, u8),
    /// 5xy0
    SeReg(usize, usize),
    /// 6xkk
    LdByte(usize, u8),
    /// 7xkk, never touches VF
    AddByte(usize, u8),
    /// 8xy0
    LdReg(usize, usize),
    /// 8xy1
    Or(usize, usize),
    /// 8xy2
    And(usize, usize),
    /// 8xy3
    Xor(usize, usize),
    /// 8xy4, VF = carry
    AddReg(usize, usize),
    /// 8xy5, VF = not borrow
    Sub(usize, usize),
    /// 8xy6, VF = bit shifted out
    Shr(usize),
    /// 8xy7, VF = not borrow
    Subn(usize, usize),
    /// 8xyE, VF = bit shifted out
    Shl(usize),
    /// 9xy0
    SneReg(usize, usize),
    /// Annn
    LdI(u16),
    /// Bnnn
    JpV0(u16),
    /// Cxkk
    Rnd(usize, u8),
    /// Dxyn, VF = collision
    Drw(usize, usize, u8),
    /// Ex9E
    Skp(usize),
    /// ExA1
    Sknp(usize),
    /// Fx07
    LdRegDt(usize),
    /// Fx0A
    LdKey(usize),
    /// Fx15
    LdDtReg(usize),
    /// Fx18
    LdSt(usize),
    /// Fx1E
    AddI(usize),
    /// Fx29
    LdF(usize),
    /// Fx33
    LdB(usize),
    /// Fx55
    StoreRegs(usize),
    /// Fx65
    LoadRegs(usize),
}

impl Instruction {
    /// decode a word, or None if nothing is defined for it
    pub fn decode(word: u16) -> Option<Instruction> {
        use Instruction::*;

        let Fields {
            family,
            nnn,
            n,
            kk,
            x,
            y,
        } = Fields::from(word);

        let inst = match family {
            0x0 => match kk {
                0xe0 => Cls,
                0xee => Ret,
                _ => return None,
            },
            0x1 => Jp(nnn),
            0x2 => Call(nnn),
            0x3 => SeByte(x, kk),
            0x4 => SneByte(x, kk),
            0x5 => SeReg(x, y),
            0x6 => LdByte(x, kk),
            0x7 => AddByte(x, kk),
            0x8 => match n {
                0x0 => LdReg(x, y),
                0x1 => Or(x, y),
                0x2 => And(x, y),
                0x3 => Xor(x, y),
                0x4 => AddReg(x, y),
                0x5 => Sub(x, y),
                0x6 => Shr(x),
                0x7 => Subn(x, y),
                0xe => Shl(x),
                _ => return None,
            },
            0x9 => SneReg(x, y),
            0xa => LdI(nnn),
            0xb => JpV0(nnn),
            0xc => Rnd(x, kk),
            0xd => Drw(x, y, n),
            0xe => match kk {
                0x9e => Skp(x),
                0xa1 => Sknp(x),
                _ => return None,
            },
            0xf => match kk {
                0x07 => LdRegDt(x),
                0x0a => LdKey(x),
                0x15 => LdDtReg(x),
                0x18 => LdSt(x),
                0x1e => AddI(x),
                0x29 => LdF(x),
                0x33 => LdB(x),
                0x55 => StoreRegs(x),
                0x65 => LoadRegs(x),
                _ => return None,
            },
            _ => return None,
        };
        Some(inst)
    }
}
