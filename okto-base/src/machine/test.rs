use std::convert::TryFrom;

use super::*;
use crate::nibble_ints::U12;

/// A fresh machine with the given instructions assembled at 0x200.
fn machine_with_program(instructions: &[Instruction]) -> Machine {
    let rom: Vec<u8> = instructions
        .iter()
        .copied()
        .flat_map(<[u8; 2]>::from)
        .collect();

    let mut machine = Machine::new();
    machine.load(&rom).unwrap();
    machine
}

mod load {
    use super::*;

    #[test]
    fn copies_rom_verbatim_at_0x200() {
        let rom = [0x12, 0x34, 0x56, 0x78, 0x9A];
        let mut machine = Machine::new();

        machine.load(&rom).unwrap();

        assert_eq!(&machine.memory[0x200..0x200 + rom.len()], &rom);
    }

    #[test]
    fn rejects_oversized_rom_and_leaves_memory_unchanged() {
        let rom = vec![0xAB; Machine::MAX_PROGRAM_LEN + 1];
        let mut machine = Machine::new();

        assert_eq!(
            machine.load(&rom),
            Err(LoadError::RomTooLarge {
                rom_len: Machine::MAX_PROGRAM_LEN + 1
            })
        );
        assert_eq!(machine, Machine::new());
    }

    #[test]
    fn accepts_maximum_size_rom() {
        let rom = vec![0xAB; Machine::MAX_PROGRAM_LEN];
        let mut machine = Machine::new();

        machine.load(&rom).unwrap();

        assert_eq!(machine.memory[Machine::MEMORY_LEN - 1], 0xAB);
    }

    #[test]
    fn fresh_machine_has_font_and_reset_state() {
        let machine = Machine::new();

        assert_eq!(&machine.memory[0x050..0x0A0], &FONT_4X5[..]);
        assert!(machine.memory[..0x050].iter().all(|&byte| byte == 0));
        assert!(machine.memory[0x0A0..].iter().all(|&byte| byte == 0));
        assert_eq!(machine.program_counter, 0x200);
        assert_eq!(machine.address_register, 0);
        assert_eq!(machine.call_stack.len(), 0);
        assert!(!machine.screen.is_dirty());
    }
}

mod step {
    use super::*;

    #[test]
    fn unknown_opcode_is_a_noop_that_advances() {
        // 0nnn machine-subroutine call: unassigned in this design.
        let mut machine = Machine::new();
        machine.load(&[0x03, 0x45]).unwrap();
        let mut expected = machine.clone();

        machine.step().unwrap();

        expected.program_counter = 0x202;
        assert_eq!(machine, expected);
    }

    #[test]
    fn fetch_wraps_at_the_top_of_memory() {
        let mut machine = Machine::new();
        machine.program_counter = 0xFFE;

        machine.step().unwrap();

        assert_eq!(machine.program_counter, 0x000);
    }

    mod call_and_return {
        use super::*;

        #[test]
        fn round_trip_restores_pc_past_the_call() {
            let mut machine = machine_with_program(&[Instruction::CallSubroutine {
                target_address: U12::try_from(0x208).unwrap(),
            }]);
            let return_instruction = <[u8; 2]>::from(Instruction::Return);
            machine.memory[0x208..=0x209].copy_from_slice(&return_instruction);

            machine.step().unwrap();
            assert_eq!(machine.program_counter, 0x208);
            assert_eq!(machine.call_stack.len(), 1);

            machine.step().unwrap();
            assert_eq!(machine.program_counter, 0x202);
            assert_eq!(machine.call_stack.len(), 0);
        }

        #[test]
        fn overflow_on_the_seventeenth_nested_call() {
            // A subroutine at 0x200 that calls itself.
            let mut machine = machine_with_program(&[Instruction::CallSubroutine {
                target_address: U12::try_from(0x200).unwrap(),
            }]);

            for _ in 0..CallStack::DEPTH {
                machine.step().unwrap();
            }

            assert_eq!(
                machine.step(),
                Err(MachineError::StackOverflow {
                    program_counter: 0x200
                })
            );
        }

        #[test]
        fn underflow_on_return_with_empty_stack() {
            let mut machine = machine_with_program(&[Instruction::Return]);

            assert_eq!(
                machine.step(),
                Err(MachineError::StackUnderflow {
                    program_counter: 0x200
                })
            );
        }
    }

    mod jumps {
        use super::*;

        #[test]
        fn jump_sets_pc() {
            let mut machine = machine_with_program(&[Instruction::Jump {
                target_address: U12::try_from(0x420).unwrap(),
            }]);

            machine.step().unwrap();

            assert_eq!(machine.program_counter, 0x420);
        }

        #[test]
        fn jump_offset_ignores_v0_by_default() {
            let mut machine = machine_with_program(&[Instruction::JumpOffset {
                address: U12::try_from(0x300).unwrap(),
            }]);
            machine.set_register(Register::V0, 0x42);

            machine.step().unwrap();

            assert_eq!(machine.program_counter, 0x300);
        }

        #[test]
        fn jump_offset_adds_v0_under_quirk() {
            let mut machine = Machine::with_quirks(Quirks {
                jump_offset_adds_v0: true,
                ..Quirks::default()
            });
            machine
                .load(&<[u8; 2]>::from(Instruction::JumpOffset {
                    address: U12::try_from(0x300).unwrap(),
                }))
                .unwrap();
            machine.set_register(Register::V0, 0x42);

            machine.step().unwrap();

            assert_eq!(machine.program_counter, 0x342);
        }
    }

    mod skips {
        use super::*;

        #[test]
        fn skip_if_eq_const_taken_and_not_taken() {
            let instruction = Instruction::SkipIfEqConst {
                register: Register::V3,
                constant: 0x2A,
            };

            let mut machine = machine_with_program(&[instruction]);
            machine.set_register(Register::V3, 0x2A);
            machine.step().unwrap();
            assert_eq!(machine.program_counter, 0x204);

            let mut machine = machine_with_program(&[instruction]);
            machine.step().unwrap();
            assert_eq!(machine.program_counter, 0x202);
        }

        #[test]
        fn skip_if_neq_const() {
            let instruction = Instruction::SkipIfNeqConst {
                register: Register::V3,
                constant: 0x2A,
            };

            let mut machine = machine_with_program(&[instruction]);
            machine.step().unwrap();
            assert_eq!(machine.program_counter, 0x204);
        }

        #[test]
        fn skip_if_eq_registers() {
            let instruction = Instruction::SkipIfEq {
                register1: Register::V3,
                register2: Register::V5,
            };

            let mut machine = machine_with_program(&[instruction]);
            machine.set_register(Register::V3, 7);
            machine.set_register(Register::V5, 7);
            machine.step().unwrap();
            assert_eq!(machine.program_counter, 0x204);
        }

        #[test]
        fn skip_if_neq_registers() {
            let instruction = Instruction::SkipIfNeq {
                register1: Register::V3,
                register2: Register::V5,
            };

            let mut machine = machine_with_program(&[instruction]);
            machine.set_register(Register::V3, 7);
            machine.step().unwrap();
            assert_eq!(machine.program_counter, 0x204);
        }
    }

    mod alu {
        use super::*;

        #[test]
        fn add_const_wraps_without_touching_vf() {
            let mut machine = machine_with_program(&[Instruction::AddAssignConst {
                target_register: Register::V4,
                constant: 10,
            }]);
            machine.set_register(Register::V4, 250);
            machine.set_register(Register::VF, 0x77);

            machine.step().unwrap();

            assert_eq!(machine.get_register(Register::V4), 4);
            assert_eq!(machine.get_register(Register::VF), 0x77);
        }

        #[test]
        fn add_sets_carry() {
            let mut machine = machine_with_program(&[Instruction::AddAssign {
                target_register: Register::V4,
                source_register: Register::V5,
            }]);
            machine.set_register(Register::V4, 200);
            machine.set_register(Register::V5, 100);

            machine.step().unwrap();

            assert_eq!(machine.get_register(Register::V4), 44);
            assert_eq!(machine.get_register(Register::VF), 1);
        }

        #[test]
        fn add_clears_carry_when_none() {
            let mut machine = machine_with_program(&[Instruction::AddAssign {
                target_register: Register::V4,
                source_register: Register::V5,
            }]);
            machine.set_register(Register::V4, 3);
            machine.set_register(Register::V5, 4);
            machine.set_register(Register::VF, 1);

            machine.step().unwrap();

            assert_eq!(machine.get_register(Register::V4), 7);
            assert_eq!(machine.get_register(Register::VF), 0);
        }

        #[test]
        fn sub_borrow_means_vf_zero() {
            let mut machine = machine_with_program(&[Instruction::SubAssign {
                target_register: Register::V4,
                source_register: Register::V5,
            }]);
            machine.set_register(Register::V4, 3);
            machine.set_register(Register::V5, 5);

            machine.step().unwrap();

            assert_eq!(machine.get_register(Register::V4), 254);
            assert_eq!(machine.get_register(Register::VF), 0);
        }

        #[test]
        fn sub_no_borrow_means_vf_one() {
            let mut machine = machine_with_program(&[Instruction::SubAssign {
                target_register: Register::V4,
                source_register: Register::V5,
            }]);
            machine.set_register(Register::V4, 7);
            machine.set_register(Register::V5, 3);

            machine.step().unwrap();

            assert_eq!(machine.get_register(Register::V4), 4);
            assert_eq!(machine.get_register(Register::VF), 1);
        }

        #[test]
        fn rev_sub_uses_same_vf_convention() {
            let mut machine = machine_with_program(&[Instruction::RevSubAssign {
                target_register: Register::V4,
                source_register: Register::V5,
            }]);
            machine.set_register(Register::V4, 3);
            machine.set_register(Register::V5, 7);

            machine.step().unwrap();

            assert_eq!(machine.get_register(Register::V4), 4);
            assert_eq!(machine.get_register(Register::VF), 1);
        }

        #[test]
        fn shr_shifts_out_the_lsb() {
            let mut machine = machine_with_program(&[Instruction::ShrAssign {
                target_register: Register::V4,
            }]);
            machine.set_register(Register::V4, 0b0000_0011);

            machine.step().unwrap();

            assert_eq!(machine.get_register(Register::V4), 1);
            assert_eq!(machine.get_register(Register::VF), 1);
        }

        #[test]
        fn shl_shifts_out_the_msb() {
            let mut machine = machine_with_program(&[Instruction::ShlAssign {
                target_register: Register::V4,
            }]);
            machine.set_register(Register::V4, 0b1000_0001);

            machine.step().unwrap();

            assert_eq!(machine.get_register(Register::V4), 2);
            assert_eq!(machine.get_register(Register::VF), 1);
        }

        #[test]
        fn bitwise_ops() {
            for (instruction, result) in [
                (
                    Instruction::OrAssign {
                        target_register: Register::V4,
                        source_register: Register::V5,
                    },
                    0b1110_1010,
                ),
                (
                    Instruction::AndAssign {
                        target_register: Register::V4,
                        source_register: Register::V5,
                    },
                    0b1000_1010,
                ),
                (
                    Instruction::XorAssign {
                        target_register: Register::V4,
                        source_register: Register::V5,
                    },
                    0b0110_0000,
                ),
            ] {
                let mut machine = machine_with_program(&[instruction]);
                machine.set_register(Register::V4, 0b1010_1010);
                machine.set_register(Register::V5, 0b1100_1010);

                machine.step().unwrap();

                assert_eq!(machine.get_register(Register::V4), result);
            }
        }
    }

    mod index_register {
        use super::*;

        #[test]
        fn assign_addr_to_i() {
            let mut machine = machine_with_program(&[Instruction::AssignAddrToI {
                address: U12::try_from(0x539).unwrap(),
            }]);

            machine.step().unwrap();

            assert_eq!(machine.address_register, 0x539);
        }

        #[test]
        fn add_to_i_without_carry() {
            let mut machine = machine_with_program(&[Instruction::AddAssignI {
                source_register: Register::V2,
            }]);
            machine.address_register = 0x31;
            machine.set_register(Register::V2, 0x2A);

            machine.step().unwrap();

            assert_eq!(machine.address_register, 0x5B);
            assert_eq!(machine.get_register(Register::VF), 0);
        }

        #[test]
        fn add_to_i_carries_out_of_twelve_bits() {
            let mut machine = machine_with_program(&[Instruction::AddAssignI {
                source_register: Register::V2,
            }]);
            machine.address_register = 0xFFE;
            machine.set_register(Register::V2, 0x04);

            machine.step().unwrap();

            assert_eq!(machine.address_register, 0x002);
            assert_eq!(machine.get_register(Register::VF), 1);
        }

        #[test]
        fn glyph_address_uses_the_low_nibble() {
            let mut machine = machine_with_program(&[Instruction::AssignGlyphAddrToI {
                digit_register: Register::V3,
            }]);
            machine.set_register(Register::V3, 0xAB);

            machine.step().unwrap();

            assert_eq!(machine.address_register, 0x050 + 0xB * 5);
        }
    }

    mod memory_transfer {
        use super::*;

        #[test]
        fn store_bcd() {
            let mut machine = machine_with_program(&[Instruction::StoreBcd {
                source_register: Register::V0,
            }]);
            machine.set_register(Register::V0, 123);
            machine.address_register = 0x32A;

            machine.step().unwrap();

            assert_eq!(&machine.memory[0x32A..=0x32C], &[1, 2, 3]);
        }

        #[test]
        fn store_registers_leaves_i_unmodified() {
            let mut machine = machine_with_program(&[Instruction::StoreRegisterValues {
                last_register: Register::V8,
            }]);
            for i in 0..16 {
                machine.data_registers[i] = i as u8;
            }
            machine.address_register = 0x350;

            machine.step().unwrap();

            assert_eq!(
                &machine.memory[0x350..=0x358],
                &[0, 1, 2, 3, 4, 5, 6, 7, 8]
            );
            assert_eq!(machine.memory[0x359], 0);
            assert_eq!(machine.address_register, 0x350);
        }

        #[test]
        fn load_registers_leaves_i_unmodified() {
            let mut machine = machine_with_program(&[Instruction::LoadRegisterValues {
                last_register: Register::V8,
            }]);
            for i in 0..16 {
                machine.memory[0x350 + i] = i as u8;
            }
            machine.address_register = 0x350;

            machine.step().unwrap();

            assert_eq!(
                &machine.data_registers[..=8],
                &[0, 1, 2, 3, 4, 5, 6, 7, 8]
            );
            assert_eq!(&machine.data_registers[9..], &[0; 7]);
            assert_eq!(machine.address_register, 0x350);
        }

        #[test]
        fn block_transfer_increments_i_under_quirk() {
            let mut machine = Machine::with_quirks(Quirks {
                block_transfer_increments_i: true,
                ..Quirks::default()
            });
            machine
                .load(&<[u8; 2]>::from(Instruction::StoreRegisterValues {
                    last_register: Register::V8,
                }))
                .unwrap();
            machine.address_register = 0x350;

            machine.step().unwrap();

            assert_eq!(machine.address_register, 0x359);
        }
    }

    mod display {
        use super::*;

        #[test]
        fn draw_twice_collides_and_clears() {
            // One 8x1 sprite row of 0xFF at 0x300, drawn twice at (4, 9).
            let mut machine = machine_with_program(&[
                Instruction::DrawSprite {
                    position_x_register: Register::V1,
                    position_y_register: Register::V2,
                    sprite_rows: U4::try_from(1).unwrap(),
                },
                Instruction::DrawSprite {
                    position_x_register: Register::V1,
                    position_y_register: Register::V2,
                    sprite_rows: U4::try_from(1).unwrap(),
                },
            ]);
            machine.memory[0x300] = 0xFF;
            machine.address_register = 0x300;
            machine.set_register(Register::V1, 4);
            machine.set_register(Register::V2, 9);

            machine.step().unwrap();
            assert_eq!(machine.get_register(Register::VF), 0);
            assert!(machine.screen.is_dirty());
            assert_eq!(&machine.screen.pixels()[4 + 9 * 64..12 + 9 * 64], &[1; 8]);

            machine.acknowledge_frame();
            machine.step().unwrap();
            assert_eq!(machine.get_register(Register::VF), 1);
            assert!(machine.screen.is_dirty());
            assert!(machine.screen.pixels().iter().all(|&pixel| pixel == 0));
        }

        #[test]
        fn clear_screen_does_not_mark_dirty_by_default() {
            let mut machine = machine_with_program(&[
                Instruction::DrawSprite {
                    position_x_register: Register::V1,
                    position_y_register: Register::V2,
                    sprite_rows: U4::try_from(1).unwrap(),
                },
                Instruction::ClearDisplay,
            ]);
            machine.memory[0x300] = 0xFF;
            machine.address_register = 0x300;

            machine.step().unwrap();
            machine.acknowledge_frame();
            machine.step().unwrap();

            assert!(!machine.screen.is_dirty());
            assert!(machine.screen.pixels().iter().all(|&pixel| pixel == 0));
        }

        #[test]
        fn clear_screen_marks_dirty_under_quirk() {
            let mut machine = Machine::with_quirks(Quirks {
                clear_marks_dirty: true,
                ..Quirks::default()
            });
            machine
                .load(&<[u8; 2]>::from(Instruction::ClearDisplay))
                .unwrap();

            machine.step().unwrap();

            assert!(machine.screen.is_dirty());
        }
    }

    mod keypad {
        use super::*;

        #[test]
        fn skip_if_key_pressed() {
            let mut machine = machine_with_program(&[Instruction::SkipIfKeyPressed {
                key_register: Register::V3,
            }]);
            machine.set_register(Register::V3, 5);
            machine.set_key_state(Key::K5, KeyState::Pressed);

            machine.step().unwrap();

            assert_eq!(machine.program_counter, 0x204);
        }

        #[test]
        fn skip_if_key_pressed_not_taken() {
            let mut machine = machine_with_program(&[Instruction::SkipIfKeyPressed {
                key_register: Register::V3,
            }]);
            machine.set_register(Register::V3, 5);

            machine.step().unwrap();

            assert_eq!(machine.program_counter, 0x202);
        }

        #[test]
        fn skip_if_key_not_pressed() {
            let mut machine = machine_with_program(&[Instruction::SkipIfKeyNotPressed {
                key_register: Register::V3,
            }]);
            machine.set_register(Register::V3, 5);

            machine.step().unwrap();

            assert_eq!(machine.program_counter, 0x204);
        }

        #[test]
        fn key_wait_repeats_until_a_key_is_down() {
            let mut machine = machine_with_program(&[Instruction::WaitForKeyPress {
                target_register: Register::V6,
            }]);

            for _ in 0..3 {
                machine.step().unwrap();
                assert_eq!(machine.program_counter, 0x200);
            }

            machine.set_key_state(Key::K9, KeyState::Pressed);
            machine.step().unwrap();

            assert_eq!(machine.program_counter, 0x202);
            assert_eq!(machine.get_register(Register::V6), 9);
        }
    }

    mod timers {
        use super::*;

        #[test]
        fn get_and_set() {
            let mut machine = machine_with_program(&[
                Instruction::SetDelayTimer {
                    source_register: Register::V1,
                },
                Instruction::SetSoundTimer {
                    source_register: Register::V1,
                },
                Instruction::AssignDelayTimerVal {
                    target_register: Register::V2,
                },
            ]);
            machine.set_register(Register::V1, 42);

            machine.step().unwrap();
            machine.step().unwrap();
            machine.step().unwrap();

            assert_eq!(machine.delay_timer(), 42);
            assert_eq!(machine.sound_timer(), 42);
            assert_eq!(machine.get_register(Register::V2), 42);
        }

        #[test]
        fn tick_floors_at_zero() {
            let mut machine = Machine::new();
            machine.delay_timer = 1;

            machine.tick_timers();
            machine.tick_timers();

            assert_eq!(machine.delay_timer(), 0);
            assert_eq!(machine.sound_timer(), 0);
        }
    }

    #[test]
    fn random_never_sets_bits_outside_the_mask() {
        for _ in 0..32 {
            let mut machine = machine_with_program(&[Instruction::AssignRandomMasked {
                target_register: Register::V7,
                mask: 0x0F,
            }]);

            machine.step().unwrap();

            assert_eq!(machine.get_register(Register::V7) & !0x0F, 0);
        }
    }

    #[test]
    fn assign_const_leaves_the_rest_of_the_machine_alone() {
        let mut machine = machine_with_program(&[Instruction::AssignConst {
            target_register: Register::V4,
            constant: 0x2A,
        }]);
        let mut expected = machine.clone();

        machine.step().unwrap();

        expected.program_counter = 0x202;
        expected.data_registers[Register::V4 as usize] = 0x2A;
        assert_eq!(machine, expected);
    }
}
