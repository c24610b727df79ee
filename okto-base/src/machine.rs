use rand::random;
use thiserror::Error;

use crate::{
    font::{FONT_4X5, FONT_BASE_ADDRESS, FONT_LEN, GLYPH_LEN},
    instruction::Instruction,
    nibble_ints::{U4, U8Nibble},
    screen::Screen,
};

mod call_stack;
mod key;
mod register;
#[cfg(test)]
mod test;

pub use call_stack::CallStack;
pub use key::{Key, KeyState};
pub use register::Register;

/// Fatal machine-state errors surfaced by [`Machine::step`].
///
/// Both indicate a malformed ROM (or an interpreter bug); the machine state
/// before the faulting instruction is preserved, but stepping on after one of
/// these is not meaningful.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MachineError {
    #[error("the call at {program_counter:#05X} exceeds the call stack depth")]
    StackOverflow { program_counter: u16 },
    #[error("return at {program_counter:#05X} with an empty call stack")]
    StackUnderflow { program_counter: u16 },
}

/// Load-time errors surfaced by [`Machine::load`]. Recoverable: the caller
/// may reject the ROM and retry with another file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error(
        "ROM of {rom_len} bytes exceeds the {} byte program area",
        Machine::MAX_PROGRAM_LEN
    )]
    RomTooLarge { rom_len: usize },
}

/// Behavior switches for the documented CHIP-8 ambiguities.
///
/// Two incompatible interpreter lineages exist for each of these, and ROM
/// conformance suites probe exactly these corners. The defaults match the
/// behavior documented in the instruction table: `Bnnn` does not add `V0`,
/// block transfers leave `I` untouched, and clearing the screen does not
/// raise the dirty flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Quirks {
    /// `Bnnn` jumps to `nnn + V0` instead of `nnn`.
    pub jump_offset_adds_v0: bool,
    /// `Fx55`/`Fx65` set `I = I + x + 1` after the transfer.
    pub block_transfer_increments_i: bool,
    /// `00E0` raises the dirty flag.
    pub clear_marks_dirty: bool,
}

/// The CHIP-8 virtual machine.
///
/// Owns all virtual machine state. The surrounding driver calls [`step`] at
/// the instruction rate and [`tick_timers`] at 60 Hz, feeds key events in
/// through [`set_key_state`] and reads the framebuffer out through
/// [`screen`] whenever its dirty flag is up.
///
/// Single-threaded and non-reentrant; the machine is the sole mutator of the
/// framebuffer, the input side is the sole mutator of the key states.
///
/// [`step`]: Machine::step
/// [`tick_timers`]: Machine::tick_timers
/// [`set_key_state`]: Machine::set_key_state
/// [`screen`]: Machine::screen
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Machine {
    data_registers: [u8; 16],
    /// The address register `I`, masked to 12 bits after any computation.
    address_register: u16,
    memory: [u8; Self::MEMORY_LEN],
    program_counter: u16,
    call_stack: CallStack,
    delay_timer: u8,
    sound_timer: u8,
    screen: Screen,
    key_states: [KeyState; 16],
    quirks: Quirks,
}

impl Machine {
    /// Addressable memory in bytes.
    pub const MEMORY_LEN: usize = 0x1000;

    /// Mask applied to every computed address; the address space is 12 bits.
    pub const ADDRESS_MASK: u16 = Self::MEMORY_LEN as u16 - 1;

    /// Address program load begins at. Everything below is reserved;
    /// the font occupies 0x050-0x09F.
    pub const PROGRAM_START: u16 = 0x200;

    /// Largest loadable ROM in bytes.
    pub const MAX_PROGRAM_LEN: usize = Self::MEMORY_LEN - Self::PROGRAM_START as usize;

    pub fn new() -> Self {
        Self::with_quirks(Quirks::default())
    }

    pub fn with_quirks(quirks: Quirks) -> Self {
        let mut memory = [0; Self::MEMORY_LEN];
        memory[FONT_BASE_ADDRESS as usize..FONT_BASE_ADDRESS as usize + FONT_LEN]
            .copy_from_slice(&FONT_4X5);

        Self {
            data_registers: [0; 16],
            address_register: 0,
            memory,
            program_counter: Self::PROGRAM_START,
            call_stack: CallStack::default(),
            delay_timer: 0,
            sound_timer: 0,
            screen: Screen::default(),
            key_states: [KeyState::default(); 16],
            quirks,
        }
    }

    /// Copy a ROM verbatim into memory starting at [`Self::PROGRAM_START`].
    ///
    /// On error memory is left unchanged. Load exactly once, before the
    /// first [`Machine::step`]; loading into a machine that has already run
    /// leaves the rest of the state untouched and is not supported.
    pub fn load(&mut self, rom: &[u8]) -> Result<(), LoadError> {
        if rom.len() > Self::MAX_PROGRAM_LEN {
            return Err(LoadError::RomTooLarge { rom_len: rom.len() });
        }

        let start = Self::PROGRAM_START as usize;
        self.memory[start..start + rom.len()].copy_from_slice(rom);

        Ok(())
    }

    /// Get the value of a data register.
    const fn get_register(&self, register: Register) -> u8 {
        self.data_registers[register as u8 as usize]
    }

    /// Set the value of a data register.
    fn set_register(&mut self, register: Register, val: u8) {
        self.data_registers[register as u8 as usize] = val;
    }

    pub const fn get_key_state(&self, key: Key) -> KeyState {
        self.key_states[key as u8 as usize]
    }

    pub fn set_key_state(&mut self, key: Key, state: KeyState) {
        self.key_states[key as u8 as usize] = state;
    }

    pub const fn screen(&self) -> &Screen {
        &self.screen
    }

    /// Lower the framebuffer dirty flag after the current frame has been
    /// consumed by the rendering side.
    pub fn acknowledge_frame(&mut self) {
        self.screen.clear_dirty();
    }

    pub const fn delay_timer(&self) -> u8 {
        self.delay_timer
    }

    /// Nonzero while the beep should sound.
    pub const fn sound_timer(&self) -> u8 {
        self.sound_timer
    }

    /// Decrement both timers by one, floored at zero.
    ///
    /// Not driven by [`Machine::step`]: the driver invokes this on its own
    /// 60 Hz schedule, decoupled from the instruction rate.
    pub fn tick_timers(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
        self.sound_timer = self.sound_timer.saturating_sub(1);
    }

    /// Read a byte at a computed address, wrapped into the address space.
    const fn read_byte(&self, address: u16) -> u8 {
        self.memory[(address & Self::ADDRESS_MASK) as usize]
    }

    /// Write a byte at a computed address, wrapped into the address space.
    fn write_byte(&mut self, address: u16, val: u8) {
        self.memory[(address & Self::ADDRESS_MASK) as usize] = val;
    }

    /// Skip the next instruction, on top of the default fetch-advance.
    fn skip_next_instruction(&mut self) {
        self.program_counter = self.program_counter.wrapping_add(2) & Self::ADDRESS_MASK;
    }

    /// The lowest-numbered currently pressed key, if any.
    fn first_pressed_key(&self) -> Option<Key> {
        self.key_states
            .iter()
            .position(|&state| state == KeyState::Pressed)
            // SAFETY: the key state array has exactly one slot per Key variant.
            .map(|index| unsafe { Key::from_unchecked(index as u8) })
    }

    /// Return the decimal digits of a u8 value, hundreds digit first.
    /// 3 digits are always enough, since the maximum value of a u8 is 255.
    const fn decimal_digits_of_u8(num: u8) -> [u8; 3] {
        [num / 100, num / 10 % 10, num % 10]
    }

    /// Fetch, decode and execute exactly one instruction.
    ///
    /// The program counter is advanced past the fetched instruction *before*
    /// the body executes, so control flow instructions overwrite the default
    /// advance. Unassigned opcode patterns are no-ops that keep the
    /// fetch-advance. The only fallible instructions are call and return,
    /// which report call stack misuse; everything else is total because all
    /// arithmetic and addressing is masked to its bit width.
    pub fn step(&mut self) -> Result<(), MachineError> {
        let instruction_address = self.program_counter & Self::ADDRESS_MASK;
        let instruction_bytes = [
            self.read_byte(instruction_address),
            self.read_byte(instruction_address.wrapping_add(1)),
        ];
        self.program_counter = instruction_address.wrapping_add(2) & Self::ADDRESS_MASK;

        let instruction = match Instruction::decode(instruction_bytes) {
            Some(instruction) => instruction,
            None => return Ok(()),
        };

        match instruction {
            Instruction::ClearDisplay => {
                self.screen.clear();
                if self.quirks.clear_marks_dirty {
                    self.screen.mark_dirty();
                }
            }
            Instruction::Return => {
                self.program_counter =
                    self.call_stack
                        .pop()
                        .ok_or(MachineError::StackUnderflow {
                            program_counter: instruction_address,
                        })?;
            }
            Instruction::Jump { target_address } => {
                self.program_counter = target_address.into_u16();
            }
            Instruction::CallSubroutine { target_address } => {
                if !self.call_stack.push(self.program_counter) {
                    return Err(MachineError::StackOverflow {
                        program_counter: instruction_address,
                    });
                }
                self.program_counter = target_address.into_u16();
            }
            Instruction::SkipIfEqConst { register, constant } => {
                if self.get_register(register) == constant {
                    self.skip_next_instruction();
                }
            }
            Instruction::SkipIfNeqConst { register, constant } => {
                if self.get_register(register) != constant {
                    self.skip_next_instruction();
                }
            }
            Instruction::SkipIfEq {
                register1,
                register2,
            } => {
                if self.get_register(register1) == self.get_register(register2) {
                    self.skip_next_instruction();
                }
            }
            Instruction::SkipIfNeq {
                register1,
                register2,
            } => {
                if self.get_register(register1) != self.get_register(register2) {
                    self.skip_next_instruction();
                }
            }
            Instruction::AssignConst {
                target_register,
                constant,
            } => self.set_register(target_register, constant),
            Instruction::AddAssignConst {
                target_register,
                constant,
            } => self.set_register(
                target_register,
                self.get_register(target_register).wrapping_add(constant),
            ),
            Instruction::Assign {
                target_register,
                source_register,
            } => self.set_register(target_register, self.get_register(source_register)),
            Instruction::OrAssign {
                target_register,
                source_register,
            } => self.set_register(
                target_register,
                self.get_register(target_register) | self.get_register(source_register),
            ),
            Instruction::AndAssign {
                target_register,
                source_register,
            } => self.set_register(
                target_register,
                self.get_register(target_register) & self.get_register(source_register),
            ),
            Instruction::XorAssign {
                target_register,
                source_register,
            } => self.set_register(
                target_register,
                self.get_register(target_register) ^ self.get_register(source_register),
            ),
            Instruction::AddAssign {
                target_register,
                source_register,
            } => {
                let (res, carry) = self
                    .get_register(target_register)
                    .overflowing_add(self.get_register(source_register));
                // The flag write comes second so it wins when Vx is VF.
                self.set_register(target_register, res);
                self.set_register(Register::VF, carry as u8);
            }
            Instruction::SubAssign {
                target_register,
                source_register,
            } => {
                let (res, borrow) = self
                    .get_register(target_register)
                    .overflowing_sub(self.get_register(source_register));
                self.set_register(target_register, res);
                self.set_register(Register::VF, 1 - borrow as u8);
            }
            Instruction::RevSubAssign {
                target_register,
                source_register,
            } => {
                let (res, borrow) = self
                    .get_register(source_register)
                    .overflowing_sub(self.get_register(target_register));
                self.set_register(target_register, res);
                self.set_register(Register::VF, 1 - borrow as u8);
            }
            Instruction::ShrAssign { target_register } => {
                let val = self.get_register(target_register);
                self.set_register(target_register, val >> 1);
                self.set_register(Register::VF, val & 0b1);
            }
            Instruction::ShlAssign { target_register } => {
                let val = self.get_register(target_register);
                self.set_register(target_register, val << 1);
                self.set_register(Register::VF, val >> 7);
            }
            Instruction::AssignAddrToI { address } => {
                self.address_register = address.into_u16();
            }
            Instruction::JumpOffset { address } => {
                let mut target = address.into_u16();
                if self.quirks.jump_offset_adds_v0 {
                    target = target.wrapping_add(self.get_register(Register::V0) as u16)
                        & Self::ADDRESS_MASK;
                }
                self.program_counter = target;
            }
            Instruction::AssignRandomMasked {
                target_register,
                mask,
            } => self.set_register(target_register, random::<u8>() & mask),
            Instruction::DrawSprite {
                position_x_register,
                position_y_register,
                sprite_rows,
            } => {
                let rows_len = sprite_rows.into_u8() as usize;
                let mut rows = [0; U4::MAX.into_u8() as usize];
                for (i, row) in rows[..rows_len].iter_mut().enumerate() {
                    *row = self.read_byte(self.address_register.wrapping_add(i as u16));
                }

                let collision = self.screen.draw_sprite(
                    self.get_register(position_x_register),
                    self.get_register(position_y_register),
                    &rows[..rows_len],
                );
                self.set_register(Register::VF, collision as u8);
            }
            Instruction::SkipIfKeyPressed { key_register } => {
                let key = Key::from(U4::from_u8(self.get_register(key_register), U8Nibble::Lo));
                if self.get_key_state(key) == KeyState::Pressed {
                    self.skip_next_instruction();
                }
            }
            Instruction::SkipIfKeyNotPressed { key_register } => {
                let key = Key::from(U4::from_u8(self.get_register(key_register), U8Nibble::Lo));
                if self.get_key_state(key) == KeyState::NotPressed {
                    self.skip_next_instruction();
                }
            }
            Instruction::AssignDelayTimerVal { target_register } => {
                self.set_register(target_register, self.delay_timer);
            }
            Instruction::WaitForKeyPress { target_register } => match self.first_pressed_key() {
                Some(key) => self.set_register(target_register, key as u8),
                None => {
                    // Roll the fetch-advance back so the instruction repeats
                    // next step. Blocking semantics emerge across repeated
                    // non-blocking steps; control returns to the driver.
                    self.program_counter = instruction_address;
                }
            },
            Instruction::SetDelayTimer { source_register } => {
                self.delay_timer = self.get_register(source_register);
            }
            Instruction::SetSoundTimer { source_register } => {
                self.sound_timer = self.get_register(source_register);
            }
            Instruction::AddAssignI { source_register } => {
                let sum = self.address_register + self.get_register(source_register) as u16;
                self.address_register = sum & Self::ADDRESS_MASK;
                self.set_register(Register::VF, (sum > Self::ADDRESS_MASK) as u8);
            }
            Instruction::AssignGlyphAddrToI { digit_register } => {
                let digit = U4::from_u8(self.get_register(digit_register), U8Nibble::Lo);
                self.address_register = FONT_BASE_ADDRESS + digit.into_u8() as u16 * GLYPH_LEN;
            }
            Instruction::StoreBcd { source_register } => {
                let digits = Self::decimal_digits_of_u8(self.get_register(source_register));
                for (offset, digit) in digits.iter().copied().enumerate() {
                    self.write_byte(self.address_register.wrapping_add(offset as u16), digit);
                }
            }
            Instruction::StoreRegisterValues { last_register } => {
                for register in Register::through(last_register) {
                    self.write_byte(
                        self.address_register.wrapping_add(register as u8 as u16),
                        self.get_register(register),
                    );
                }
                if self.quirks.block_transfer_increments_i {
                    self.address_register = self
                        .address_register
                        .wrapping_add(last_register as u8 as u16 + 1)
                        & Self::ADDRESS_MASK;
                }
            }
            Instruction::LoadRegisterValues { last_register } => {
                for register in Register::through(last_register) {
                    let val =
                        self.read_byte(self.address_register.wrapping_add(register as u8 as u16));
                    self.set_register(register, val);
                }
                if self.quirks.block_transfer_increments_i {
                    self.address_register = self
                        .address_register
                        .wrapping_add(last_register as u8 as u16 + 1)
                        & Self::ADDRESS_MASK;
                }
            }
        }

        Ok(())
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}
