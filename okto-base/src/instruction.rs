use crate::{
    machine::Register,
    nibble_ints::{U12, U4, U8Nibble},
};

/// A CHIP-8 instruction.
///
/// Every instruction is two bytes wide, big endian, and is decoded by its
/// nibble pattern. References used are
/// <https://github.com/mattmikolay/chip-8/wiki/CHIP%E2%80%908-Instruction-Set>
/// and <https://en.wikipedia.org/wiki/CHIP-8#Opcode_table>.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Instruction {
    /// Clear the display. `00E0`
    ClearDisplay,
    /// Return from a subroutine. `00EE`
    Return,
    /// Jump to `target_address`. `1nnn`
    Jump { target_address: U12 },
    /// Call the subroutine at `target_address`. `2nnn`
    CallSubroutine { target_address: U12 },
    /// Skip the next instruction if the value in `register`
    /// is equal to `constant`. `3xnn`
    SkipIfEqConst { register: Register, constant: u8 },
    /// Skip the next instruction if the value in `register`
    /// is not equal to `constant`. `4xnn`
    SkipIfNeqConst { register: Register, constant: u8 },
    /// Skip the next instruction if the values in `register1`
    /// and `register2` are equal. `5xy0`
    SkipIfEq {
        register1: Register,
        register2: Register,
    },
    /// Assign `constant` to `target_register`. `6xnn`
    AssignConst {
        target_register: Register,
        constant: u8,
    },
    /// Add `constant` to the value in `target_register`, modulo 256.
    /// [`Register::VF`] is not altered. `7xnn`
    AddAssignConst {
        target_register: Register,
        constant: u8,
    },
    /// Assign the value in `source_register` to `target_register`. `8xy0`
    Assign {
        target_register: Register,
        source_register: Register,
    },
    /// Bitwise-OR the two register values into `target_register`. `8xy1`
    OrAssign {
        target_register: Register,
        source_register: Register,
    },
    /// Bitwise-AND the two register values into `target_register`. `8xy2`
    AndAssign {
        target_register: Register,
        source_register: Register,
    },
    /// Bitwise-XOR the two register values into `target_register`. `8xy3`
    XorAssign {
        target_register: Register,
        source_register: Register,
    },
    /// Add the value in `source_register` to the value in `target_register`.
    /// [`Register::VF`] is set to `1` on carry, `0` otherwise. `8xy4`
    AddAssign {
        target_register: Register,
        source_register: Register,
    },
    /// Subtract the value in `source_register` from the value in
    /// `target_register`. [`Register::VF`] is set to `1` if no borrow
    /// occurred, `0` if one did. `8xy5`
    SubAssign {
        target_register: Register,
        source_register: Register,
    },
    /// Shift the value in `target_register` one bit to the right.
    /// [`Register::VF`] is set to the bit that was shifted out. `8xy6`
    ShrAssign { target_register: Register },
    /// Subtract the value in `target_register` from the value in
    /// `source_register`, storing into `target_register`. Same
    /// [`Register::VF`] convention as [`Instruction::SubAssign`]. `8xy7`
    RevSubAssign {
        target_register: Register,
        source_register: Register,
    },
    /// Shift the value in `target_register` one bit to the left.
    /// [`Register::VF`] is set to the bit that was shifted out. `8xyE`
    ShlAssign { target_register: Register },
    /// Skip the next instruction if the values in `register1`
    /// and `register2` are not equal. `9xy0`
    SkipIfNeq {
        register1: Register,
        register2: Register,
    },
    /// Assign `address` to the address register `I`. `Annn`
    AssignAddrToI { address: U12 },
    /// Jump to `address`; under the jump-offset quirk the value in
    /// [`Register::V0`] is added first. `Bnnn`
    JumpOffset { address: U12 },
    /// Assign a fresh random byte ANDed with `mask` to `target_register`. `Cxnn`
    AssignRandomMasked {
        target_register: Register,
        mask: u8,
    },
    /// XOR-draw the `sprite_rows`-byte sprite at `I` at the position given by
    /// the values in `position_x_register` and `position_y_register`.
    /// [`Register::VF`] is set to `1` if any set pixel was unset. `Dxyn`
    DrawSprite {
        position_x_register: Register,
        position_y_register: Register,
        sprite_rows: U4,
    },
    /// Skip the next instruction if the key selected by the value in
    /// `key_register` is pressed. `Ex9E`
    SkipIfKeyPressed { key_register: Register },
    /// Skip the next instruction if the key selected by the value in
    /// `key_register` is not pressed. `ExA1`
    SkipIfKeyNotPressed { key_register: Register },
    /// Assign the current delay timer value to `target_register`. `Fx07`
    AssignDelayTimerVal { target_register: Register },
    /// Wait until a key is pressed and store that key's index in
    /// `target_register`. Realized as a busy-wait: the program counter is
    /// rolled back so the instruction repeats until a key is down. `Fx0A`
    WaitForKeyPress { target_register: Register },
    /// Set the delay timer to the value in `source_register`. `Fx15`
    SetDelayTimer { source_register: Register },
    /// Set the sound timer to the value in `source_register`. `Fx18`
    SetSoundTimer { source_register: Register },
    /// Add the value in `source_register` to `I`, wrapping to 12 bits.
    /// [`Register::VF`] is set to the carry out of the 12-bit range. `Fx1E`
    AddAssignI { source_register: Register },
    /// Assign the address of the built-in glyph for the hex digit in
    /// `digit_register` (low nibble) to `I`. `Fx29`
    AssignGlyphAddrToI { digit_register: Register },
    /// Store the three decimal digits of the value in `source_register` at
    /// `I`, `I+1`, `I+2`, most significant first. `Fx33`
    StoreBcd { source_register: Register },
    /// Copy registers [`Register::V0`] through `last_register` to memory
    /// starting at `I`. `I` itself is left unmodified unless the
    /// block-transfer quirk is enabled. `Fx55`
    StoreRegisterValues { last_register: Register },
    /// Load registers [`Register::V0`] through `last_register` from memory
    /// starting at `I`. `I` itself is left unmodified unless the
    /// block-transfer quirk is enabled. `Fx65`
    LoadRegisterValues { last_register: Register },
}

impl Instruction {
    /// Decode a big-endian instruction word.
    ///
    /// Returns `None` for unassigned nibble patterns; the machine executes
    /// those as no-ops that still consume the fetch-advance, matching
    /// permissive reference interpreters.
    pub fn decode(bytes: [u8; 2]) -> Option<Self> {
        use Instruction::*;

        let n0 = bytes[0] >> 4;
        let n1 = bytes[0] & 0b1111;
        let n2 = bytes[1] >> 4;
        let n3 = bytes[1] & 0b1111;

        let x = Register::from(U4::from_u8(bytes[0], U8Nibble::Lo));
        let y = Register::from(U4::from_u8(bytes[1], U8Nibble::Hi));
        let n = U4::from_u8(bytes[1], U8Nibble::Lo);
        let nn = bytes[1];
        let nnn = U12::from_u16_masked(u16::from_be_bytes(bytes));

        Some(match (n0, n1, n2, n3) {
            (0x0, 0x0, 0xE, 0x0) => ClearDisplay,
            (0x0, 0x0, 0xE, 0xE) => Return,
            (0x1, ..) => Jump {
                target_address: nnn,
            },
            (0x2, ..) => CallSubroutine {
                target_address: nnn,
            },
            (0x3, ..) => SkipIfEqConst {
                register: x,
                constant: nn,
            },
            (0x4, ..) => SkipIfNeqConst {
                register: x,
                constant: nn,
            },
            (0x5, _, _, 0x0) => SkipIfEq {
                register1: x,
                register2: y,
            },
            (0x6, ..) => AssignConst {
                target_register: x,
                constant: nn,
            },
            (0x7, ..) => AddAssignConst {
                target_register: x,
                constant: nn,
            },
            (0x8, _, _, 0x0) => Assign {
                target_register: x,
                source_register: y,
            },
            (0x8, _, _, 0x1) => OrAssign {
                target_register: x,
                source_register: y,
            },
            (0x8, _, _, 0x2) => AndAssign {
                target_register: x,
                source_register: y,
            },
            (0x8, _, _, 0x3) => XorAssign {
                target_register: x,
                source_register: y,
            },
            (0x8, _, _, 0x4) => AddAssign {
                target_register: x,
                source_register: y,
            },
            (0x8, _, _, 0x5) => SubAssign {
                target_register: x,
                source_register: y,
            },
            (0x8, _, _, 0x6) => ShrAssign { target_register: x },
            (0x8, _, _, 0x7) => RevSubAssign {
                target_register: x,
                source_register: y,
            },
            (0x8, _, _, 0xE) => ShlAssign { target_register: x },
            (0x9, _, _, 0x0) => SkipIfNeq {
                register1: x,
                register2: y,
            },
            (0xA, ..) => AssignAddrToI { address: nnn },
            (0xB, ..) => JumpOffset { address: nnn },
            (0xC, ..) => AssignRandomMasked {
                target_register: x,
                mask: nn,
            },
            (0xD, ..) => DrawSprite {
                position_x_register: x,
                position_y_register: y,
                sprite_rows: n,
            },
            (0xE, _, 0x9, 0xE) => SkipIfKeyPressed { key_register: x },
            (0xE, _, 0xA, 0x1) => SkipIfKeyNotPressed { key_register: x },
            (0xF, _, 0x0, 0x7) => AssignDelayTimerVal { target_register: x },
            (0xF, _, 0x0, 0xA) => WaitForKeyPress { target_register: x },
            (0xF, _, 0x1, 0x5) => SetDelayTimer { source_register: x },
            (0xF, _, 0x1, 0x8) => SetSoundTimer { source_register: x },
            (0xF, _, 0x1, 0xE) => AddAssignI { source_register: x },
            (0xF, _, 0x2, 0x9) => AssignGlyphAddrToI { digit_register: x },
            (0xF, _, 0x3, 0x3) => StoreBcd { source_register: x },
            (0xF, _, 0x5, 0x5) => StoreRegisterValues { last_register: x },
            (0xF, _, 0x6, 0x5) => LoadRegisterValues { last_register: x },
            _ => return None,
        })
    }
}

/// Encoding back to instruction bytes. The tests use this to assemble
/// programs from [`Instruction`] values instead of raw opcode literals.
impl From<Instruction> for [u8; 2] {
    fn from(instruction: Instruction) -> Self {
        use Instruction::*;

        fn word(n0: u8, n1: u8, n2: u8, n3: u8) -> [u8; 2] {
            [n0 << 4 | n1, n2 << 4 | n3]
        }

        fn with_byte(n0: u8, x: Register, nn: u8) -> [u8; 2] {
            [n0 << 4 | x as u8, nn]
        }

        fn with_address(n0: u8, address: U12) -> [u8; 2] {
            let address = address.into_u16();
            [n0 << 4 | (address >> 8) as u8, address as u8]
        }

        match instruction {
            ClearDisplay => [0x00, 0xE0],
            Return => [0x00, 0xEE],
            Jump { target_address } => with_address(0x1, target_address),
            CallSubroutine { target_address } => with_address(0x2, target_address),
            SkipIfEqConst { register, constant } => with_byte(0x3, register, constant),
            SkipIfNeqConst { register, constant } => with_byte(0x4, register, constant),
            SkipIfEq {
                register1,
                register2,
            } => word(0x5, register1 as u8, register2 as u8, 0x0),
            AssignConst {
                target_register,
                constant,
            } => with_byte(0x6, target_register, constant),
            AddAssignConst {
                target_register,
                constant,
            } => with_byte(0x7, target_register, constant),
            Assign {
                target_register,
                source_register,
            } => word(0x8, target_register as u8, source_register as u8, 0x0),
            OrAssign {
                target_register,
                source_register,
            } => word(0x8, target_register as u8, source_register as u8, 0x1),
            AndAssign {
                target_register,
                source_register,
            } => word(0x8, target_register as u8, source_register as u8, 0x2),
            XorAssign {
                target_register,
                source_register,
            } => word(0x8, target_register as u8, source_register as u8, 0x3),
            AddAssign {
                target_register,
                source_register,
            } => word(0x8, target_register as u8, source_register as u8, 0x4),
            SubAssign {
                target_register,
                source_register,
            } => word(0x8, target_register as u8, source_register as u8, 0x5),
            ShrAssign { target_register } => word(0x8, target_register as u8, 0x0, 0x6),
            RevSubAssign {
                target_register,
                source_register,
            } => word(0x8, target_register as u8, source_register as u8, 0x7),
            ShlAssign { target_register } => word(0x8, target_register as u8, 0x0, 0xE),
            SkipIfNeq {
                register1,
                register2,
            } => word(0x9, register1 as u8, register2 as u8, 0x0),
            AssignAddrToI { address } => with_address(0xA, address),
            JumpOffset { address } => with_address(0xB, address),
            AssignRandomMasked {
                target_register,
                mask,
            } => with_byte(0xC, target_register, mask),
            DrawSprite {
                position_x_register,
                position_y_register,
                sprite_rows,
            } => word(
                0xD,
                position_x_register as u8,
                position_y_register as u8,
                sprite_rows.into_u8(),
            ),
            SkipIfKeyPressed { key_register } => word(0xE, key_register as u8, 0x9, 0xE),
            SkipIfKeyNotPressed { key_register } => word(0xE, key_register as u8, 0xA, 0x1),
            AssignDelayTimerVal { target_register } => word(0xF, target_register as u8, 0x0, 0x7),
            WaitForKeyPress { target_register } => word(0xF, target_register as u8, 0x0, 0xA),
            SetDelayTimer { source_register } => word(0xF, source_register as u8, 0x1, 0x5),
            SetSoundTimer { source_register } => word(0xF, source_register as u8, 0x1, 0x8),
            AddAssignI { source_register } => word(0xF, source_register as u8, 0x1, 0xE),
            AssignGlyphAddrToI { digit_register } => word(0xF, digit_register as u8, 0x2, 0x9),
            StoreBcd { source_register } => word(0xF, source_register as u8, 0x3, 0x3),
            StoreRegisterValues { last_register } => word(0xF, last_register as u8, 0x5, 0x5),
            LoadRegisterValues { last_register } => word(0xF, last_register as u8, 0x6, 0x5),
        }
    }
}
