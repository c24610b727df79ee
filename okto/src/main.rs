use std::{path::PathBuf, thread};

use clap::Parser;
use okto_base::{
    machine::{Key, KeyState, Machine, Quirks},
    runner::{ControlEvent, MachineEvent, DEFAULT_CYCLE_RATE},
    screen::Screen,
};
use pixels::{Pixels, SurfaceTexture};
use rodio::{OutputStream, Sink};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{self, EnvFilter};
use winit::{
    dpi::{LogicalPosition, LogicalSize, PhysicalSize},
    event::{ElementState, Event, VirtualKeyCode, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
};

use crate::tone::BeepTone;

mod tone;

/// RGBA color for the pixel on-state.
const COLOR_PIXEL_ON: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFF];
/// RGBA color for the pixel off-state.
const COLOR_PIXEL_OFF: [u8; 4] = [0x00, 0x00, 0x00, 0xFF];

/// Frequency of the beep tone in Hz.
const BEEP_FREQUENCY: f32 = 440.0;

/// Map a physical key to the 4x4 CHIP-8 pad:
/// 1234/QWER/ASDF/ZXCV become 123C/456D/789E/A0BF.
fn key_for(virtual_keycode: VirtualKeyCode) -> Option<Key> {
    use VirtualKeyCode::*;

    match virtual_keycode {
        // row 1
        Key1 => Some(Key::K1),
        Key2 => Some(Key::K2),
        Key3 => Some(Key::K3),
        Key4 => Some(Key::KC),
        // row 2
        Q => Some(Key::K4),
        W => Some(Key::K5),
        E => Some(Key::K6),
        R => Some(Key::KD),
        // row 3
        A => Some(Key::K7),
        S => Some(Key::K8),
        D => Some(Key::K9),
        F => Some(Key::KE),
        // row 4
        Z => Some(Key::KA),
        X => Some(Key::K0),
        C => Some(Key::KB),
        V => Some(Key::KF),
        _ => None,
    }
}

fn key_state_for(state: ElementState) -> KeyState {
    match state {
        ElementState::Pressed => KeyState::Pressed,
        ElementState::Released => KeyState::NotPressed,
    }
}

#[derive(Debug, Parser)]
#[clap(version, about)]
struct CliOpts {
    /// The path to the file containing the ROM.
    /// Its contents are loaded into the machine's memory at address 0x200.
    rom_file: PathBuf,
    /// Instructions executed per second.
    #[clap(long, default_value_t = DEFAULT_CYCLE_RATE)]
    cycle_rate: u32,
    /// Bnnn jumps to nnn + V0 instead of nnn.
    #[clap(long)]
    jump_offset_adds_v0: bool,
    /// Fx55/Fx65 increment I past the transferred block.
    #[clap(long)]
    increment_i_on_transfer: bool,
    /// 00E0 marks the frame dirty.
    #[clap(long)]
    clear_marks_dirty: bool,
}

fn main() -> Result<(), pixels::Error> {
    let cli_opts = CliOpts::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let rom = std::fs::read(&cli_opts.rom_file).unwrap_or_else(|io_error| {
        error!(%io_error, rom_file = %cli_opts.rom_file.display(), "could not read ROM file");
        std::process::exit(1);
    });

    let mut machine = Machine::with_quirks(Quirks {
        jump_offset_adds_v0: cli_opts.jump_offset_adds_v0,
        block_transfer_increments_i: cli_opts.increment_i_on_transfer,
        clear_marks_dirty: cli_opts.clear_marks_dirty,
    });
    if let Err(load_error) = machine.load(&rom) {
        error!(%load_error, "could not load ROM");
        std::process::exit(1);
    }

    let event_loop = EventLoop::<MachineEvent>::with_user_event();

    let (window, size) = create_window(
        &event_loop,
        "okto",
        PhysicalSize::new(Screen::WIDTH as u32, Screen::HEIGHT as u32),
    );
    let surface_texture = SurfaceTexture::new(size.width, size.height, &window);
    let mut pixels = Pixels::new(Screen::WIDTH as u32, Screen::HEIGHT as u32, surface_texture)?;

    let (_stream, stream_handle) =
        OutputStream::try_default().expect("could not open an audio output stream");
    let sink = Sink::try_new(&stream_handle).expect("could not create an audio sink");
    sink.set_volume(0.5);
    sink.pause();
    sink.append(BeepTone::new(BEEP_FREQUENCY));

    let mut screen = machine.screen().clone();
    let (control_sender, machine_event_receiver, machine_join_handle) =
        machine.start(cli_opts.cycle_rate);

    let mut control_sender = Some(control_sender);
    let mut machine_join_handle = Some(machine_join_handle);

    let event_loop_proxy = event_loop.create_proxy();
    thread::Builder::new()
        .name("machine event forwarder".to_owned())
        .spawn(move || loop {
            let event = match machine_event_receiver.recv() {
                Ok(event) => event,
                Err(_) => break, // machine thread stopped
            };
            if event_loop_proxy.send_event(event).is_err() {
                break; // event loop closed
            }
        })
        .expect("could not spawn the machine event forwarder thread");

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Wait;
        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::Resized(size) => pixels.resize_surface(size.width, size.height),
                WindowEvent::CloseRequested => {
                    // Dropping the control sender makes the machine stop.
                    drop(control_sender.take());
                    sink.stop();
                    let machine_result = machine_join_handle
                        .take()
                        .expect("close requested twice")
                        .join()
                        .expect("machine thread panicked");
                    if let Err(error) = machine_result {
                        warn!(%error, "the CHIP-8 ROM stopped with an error");
                    }

                    *control_flow = ControlFlow::Exit;
                }
                WindowEvent::KeyboardInput {
                    input:
                        winit::event::KeyboardInput {
                            state,
                            virtual_keycode: Some(virtual_keycode),
                            ..
                        },
                    ..
                } => {
                    debug!(?virtual_keycode, ?state, "key state changed");
                    if virtual_keycode == VirtualKeyCode::Escape && state == ElementState::Pressed {
                        info!("escape pressed, exiting");
                        *control_flow = ControlFlow::Exit;
                    } else if let (Some(key), Some(sender)) =
                        (key_for(virtual_keycode), control_sender.as_ref())
                    {
                        // A send failure means the machine stopped with an
                        // error; the ErrorEncountered event closes the loop.
                        let _ = sender.send(ControlEvent::KeyStateChange {
                            key,
                            new_state: key_state_for(state),
                        });
                    }
                }
                _ => (),
            },
            Event::UserEvent(MachineEvent::ScreenUpdate { screen: new_screen }) => {
                screen = new_screen;
                window.request_redraw();
            }
            Event::UserEvent(MachineEvent::StartPlayingSound) => sink.play(),
            Event::UserEvent(MachineEvent::StopPlayingSound) => sink.pause(),
            Event::UserEvent(MachineEvent::ErrorEncountered { error }) => {
                error!(%error, "machine stopped");
                *control_flow = ControlFlow::Exit;
            }
            Event::RedrawRequested(_) => {
                pixels
                    .get_frame()
                    .chunks_exact_mut(4)
                    .zip(screen.pixels().iter().copied())
                    .for_each(|(frame_pixel, cell)| {
                        frame_pixel.copy_from_slice(if cell > 0 {
                            &COLOR_PIXEL_ON
                        } else {
                            &COLOR_PIXEL_OFF
                        });
                    });
                if let Err(render_error) = pixels.render() {
                    error!(%render_error, "could not draw the pixel buffer");
                    *control_flow = ControlFlow::Exit;
                }
            }
            _ => (),
        }
    });
}

/// Create a visible, centered window scaled up from the framebuffer size.
fn create_window<T>(
    event_loop: &EventLoop<T>,
    title: &str,
    pixel_buffer_size: PhysicalSize<u32>,
) -> (winit::window::Window, PhysicalSize<u32>) {
    let pixel_buffer_size: PhysicalSize<f64> = pixel_buffer_size.cast();

    let window = winit::window::WindowBuilder::new()
        .with_visible(false)
        .with_title(title)
        .build(event_loop)
        .expect("could not create a window");

    let hidpi_factor = window.scale_factor();
    let (monitor_width, monitor_height) = match window.current_monitor() {
        Some(monitor) => {
            let size = monitor.size().to_logical(hidpi_factor);
            (size.width, size.height)
        }
        None => (pixel_buffer_size.width, pixel_buffer_size.height),
    };

    // Scale to roughly two thirds of the smaller monitor dimension,
    // relative to the size of the pixel buffer.
    let scale = ((monitor_width / pixel_buffer_size.width)
        .min(monitor_height / pixel_buffer_size.height)
        * 2.0
        / 3.0)
        .round()
        .max(1.0);

    // Smaller than the pixel buffer in logical pixels makes no sense.
    let min_size = pixel_buffer_size.to_logical::<f64>(hidpi_factor);
    let default_size = LogicalSize::new(
        pixel_buffer_size.width * scale,
        pixel_buffer_size.height * scale,
    );
    let centered = LogicalPosition::new(
        (monitor_width - default_size.width) / 2.0,
        (monitor_height - default_size.height) / 2.0,
    );

    window.set_min_inner_size(Some(min_size));
    window.set_inner_size(default_size);
    window.set_outer_position(centered);
    window.set_visible(true);

    let physical_default_size = default_size.to_physical::<f64>(hidpi_factor);

    (
        window,
        PhysicalSize::new(
            physical_default_size.width.round() as u32,
            physical_default_size.height.round() as u32,
        ),
    )
}
