//! Runs a [`Machine`] on its own thread at a fixed instruction rate.
//!
//! The machine itself is synchronous and non-reentrant; this module gives it
//! exclusive ownership on a dedicated thread and exposes channel endpoints
//! for the input and rendering collaborators. Key events flow in as
//! [`ControlEvent`]s, frames and sound transitions flow out as
//! [`MachineEvent`]s. Dropping the control sender stops the thread.

use std::{thread, time::Duration};

use tracing::{debug, trace};

use crate::{
    machine::{Key, KeyState, Machine, MachineError},
    screen::Screen,
};

/// Timer tick rate mandated by the platform, in Hz.
pub const TIMER_RATE: u32 = 60;

/// Default instruction rate, in Hz.
pub const DEFAULT_CYCLE_RATE: u32 = 720;

/// Events sent from the frontend to the machine thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    KeyStateChange { key: Key, new_state: KeyState },
}

/// Events sent from the machine thread to the frontend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MachineEvent {
    /// The framebuffer changed since the last published frame.
    ScreenUpdate { screen: Screen },
    /// The sound timer went from zero to nonzero.
    StartPlayingSound,
    /// The sound timer ran down to zero.
    StopPlayingSound,
    /// A fatal machine-state error; the thread stops after sending this.
    ErrorEncountered { error: MachineError },
}

impl Machine {
    /// Consume the machine and run it on a new thread at `cycle_rate`
    /// instructions per second, with timers ticked at [`TIMER_RATE`].
    ///
    /// Returns the control event sender, the machine event receiver and the
    /// thread's join handle. The thread stops when the control sender is
    /// dropped or a fatal error occurs; the join handle yields the error in
    /// the latter case.
    pub fn start(
        self,
        cycle_rate: u32,
    ) -> (
        flume::Sender<ControlEvent>,
        flume::Receiver<MachineEvent>,
        thread::JoinHandle<Result<(), MachineError>>,
    ) {
        let (control_sender, control_receiver) = flume::unbounded();
        let (event_sender, event_receiver) = flume::unbounded();

        let join_handle = thread::Builder::new()
            .name("okto machine".to_owned())
            .spawn(move || run(self, cycle_rate, control_receiver, event_sender))
            .expect("could not spawn the machine thread");

        (control_sender, event_receiver, join_handle)
    }
}

#[tracing::instrument(skip(machine, control_receiver, event_sender))]
fn run(
    mut machine: Machine,
    cycle_rate: u32,
    control_receiver: flume::Receiver<ControlEvent>,
    event_sender: flume::Sender<MachineEvent>,
) -> Result<(), MachineError> {
    let cycle_rate = cycle_rate.max(TIMER_RATE);
    let cycle_period = Duration::from_secs(1) / cycle_rate;
    let cycles_per_timer_tick = cycle_rate / TIMER_RATE;

    let sleeper = spin_sleep::SpinSleeper::default();
    let mut cycles_since_timer_tick = 0;
    let mut sound_playing = false;

    debug!(cycle_rate, "machine thread started");

    loop {
        loop {
            match control_receiver.try_recv() {
                Ok(ControlEvent::KeyStateChange { key, new_state }) => {
                    trace!(?key, ?new_state, "key state change");
                    machine.set_key_state(key, new_state);
                }
                Err(flume::TryRecvError::Empty) => break,
                Err(flume::TryRecvError::Disconnected) => {
                    debug!("control sender dropped, machine thread stopping");
                    return Ok(());
                }
            }
        }

        if let Err(error) = machine.step() {
            // The frontend may already be gone; the join handle still
            // carries the error either way.
            let _ = event_sender.send(MachineEvent::ErrorEncountered {
                error: error.clone(),
            });
            return Err(error);
        }

        cycles_since_timer_tick += 1;
        if cycles_since_timer_tick >= cycles_per_timer_tick {
            cycles_since_timer_tick = 0;
            machine.tick_timers();

            let sound_should_play = machine.sound_timer() > 0;
            if sound_should_play != sound_playing {
                sound_playing = sound_should_play;
                let event = if sound_playing {
                    MachineEvent::StartPlayingSound
                } else {
                    MachineEvent::StopPlayingSound
                };
                if event_sender.send(event).is_err() {
                    return Ok(());
                }
            }

            if machine.screen().is_dirty() {
                let screen = machine.screen().clone();
                machine.acknowledge_frame();
                if event_sender
                    .send(MachineEvent::ScreenUpdate { screen })
                    .is_err()
                {
                    return Ok(());
                }
            }
        }

        sleeper.sleep(cycle_period);
    }
}

#[cfg(test)]
mod test {
    use std::convert::TryFrom;

    use super::*;
    use crate::{instruction::Instruction, nibble_ints::U12};

    #[test]
    fn stops_when_the_control_sender_is_dropped() {
        // An endless loop: jump-to-self.
        let mut machine = Machine::new();
        machine
            .load(&<[u8; 2]>::from(Instruction::Jump {
                target_address: U12::try_from(0x200).unwrap(),
            }))
            .unwrap();

        let (control_sender, _event_receiver, join_handle) = machine.start(DEFAULT_CYCLE_RATE);
        drop(control_sender);

        assert_eq!(join_handle.join().unwrap(), Ok(()));
    }

    #[test]
    fn fatal_errors_reach_both_channel_and_join_handle() {
        let mut machine = Machine::new();
        machine
            .load(&<[u8; 2]>::from(Instruction::Return))
            .unwrap();

        let (_control_sender, event_receiver, join_handle) = machine.start(DEFAULT_CYCLE_RATE);

        assert_eq!(
            event_receiver.recv().unwrap(),
            MachineEvent::ErrorEncountered {
                error: MachineError::StackUnderflow {
                    program_counter: 0x200
                }
            }
        );
        assert_eq!(
            join_handle.join().unwrap(),
            Err(MachineError::StackUnderflow {
                program_counter: 0x200
            })
        );
    }
}
