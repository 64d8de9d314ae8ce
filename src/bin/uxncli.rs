use clap::Parser;
use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Scale, Window, WindowOptions};
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;
use termion::color;
use uxn::devices::{self, Audio, Console, DateTime, FileDevice, Screen, System};
use uxn::Uxn;

/// Runs a uxn ROM against a presentation window, feeding keyboard and
/// mouse events into the controller and mouse devices.
#[derive(Parser, Debug)]
#[command(name = "uxncli")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// ROM to run
    rom: PathBuf,
    /// Arguments made available to the program (unused by most ROMs)
    program_args: Vec<String>,
    /// Window scale factor
    #[arg(long, default_value_t = 1)]
    scale: usize,
    #[arg(short, long)]
    verbose: bool,
}

fn banner(msg: &str) {
    eprintln!("{}{}{}", color::Fg(color::Yellow), msg, color::Fg(color::Reset));
}

fn main() -> ExitCode {
    let args = Args::parse();
    env_logger::Builder::new()
        .filter_level(if args.verbose { log::LevelFilter::Debug } else { log::LevelFilter::Warn })
        .init();

    let rom = match std::fs::read(&args.rom) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("uxncli: {}", uxn::HostError::Read { path: args.rom.clone(), source: e });
            return ExitCode::FAILURE;
        }
    };

    let mut uxn = Uxn::new();
    uxn.devices.attach(devices::SYSTEM, System::new());
    uxn.devices.attach(devices::CONSOLE, Console::new());
    uxn.devices.attach(devices::SCREEN, Screen::new(0x100, 0x100));
    uxn.devices.attach(devices::AUDIO0, Audio::new());
    uxn.devices.attach(devices::FILE0, FileDevice::new());
    uxn.devices.attach(devices::FILE1, FileDevice::new());
    uxn.devices.attach(devices::DATETIME, DateTime::new());

    uxn.boot(&rom);
    banner(&format!("booted {:?}, {} program args", args.rom, args.program_args.len()));
    uxn.eval(0x0100);

    let (width, height) = uxn
        .devices
        .get_mut::<Screen>(devices::SCREEN)
        .map(|s| (s.width, s.height))
        .unwrap_or((0x100, 0x100));

    let scale = match args.scale {
        2 => Scale::X2,
        4 => Scale::X4,
        8 => Scale::X8,
        16 => Scale::X16,
        _ => Scale::X1,
    };
    let mut window = match Window::new(
        "uxncli",
        width as usize,
        height as usize,
        WindowOptions { scale, ..WindowOptions::default() },
    ) {
        Ok(w) => w,
        Err(e) => {
            eprintln!("uxncli: {}", uxn::HostError::Window(e.to_string()));
            return ExitCode::FAILURE;
        }
    };
    window.limit_update_rate(Some(Duration::from_micros(16_600)));

    // The timer crate drives the screen vector at a fixed cadence
    // independent of how fast the window happens to refresh.
    let tick = Arc::new(AtomicBool::new(false));
    let tick_writer = Arc::clone(&tick);
    let frame_timer = timer::Timer::new();
    let _guard = frame_timer.schedule_repeating(chrono::Duration::milliseconds(16), move || {
        tick_writer.store(true, Ordering::SeqCst);
    });

    // Stdin is read on its own thread since there's no way to poll it
    // without blocking; bytes trickle into the console device one at a
    // time as the main loop drains the channel.
    let (stdin_tx, stdin_rx) = mpsc::channel::<u8>();
    std::thread::spawn(move || {
        let mut byte = [0u8; 1];
        let mut stdin = std::io::stdin();
        while stdin.read_exact(&mut byte).is_ok() {
            if stdin_tx.send(byte[0]).is_err() {
                break;
            }
        }
    });

    let mut buffer = vec![0u32; width as usize * height as usize];
    let mut last_buttons = 0u8;

    while window.is_open() && !window.is_key_down(Key::Escape) {
        while let Ok(byte) = stdin_rx.try_recv() {
            uxn.devices.dat[0x12] = byte;
            let vector = uxn.devices.vector(devices::CONSOLE);
            uxn.eval(vector);
        }
        if let Some(keys) = window.get_keys_pressed(KeyRepeat::No) {
            for key in keys {
                if let Some(ascii) = key_to_ascii(key) {
                    uxn.devices.dat[0x83] = ascii;
                    let vector = uxn.devices.vector(devices::CONTROLLER);
                    uxn.eval(vector);
                }
            }
        }
        let buttons = controller_buttons(&window);
        if buttons != last_buttons {
            uxn.devices.dat[0x82] = buttons;
            last_buttons = buttons;
            let vector = uxn.devices.vector(devices::CONTROLLER);
            uxn.eval(vector);
        }

        if let Some((mx, my)) = window.get_mouse_pos(MouseMode::Clamp) {
            let (mx, my) = (mx as u16, my as u16);
            uxn.devices.dat[0x92] = (mx >> 8) as u8;
            uxn.devices.dat[0x93] = mx as u8;
            uxn.devices.dat[0x94] = (my >> 8) as u8;
            uxn.devices.dat[0x95] = my as u8;
            uxn.devices.dat[0x96] = mouse_buttons(&window);
            if let Some((sx, sy)) = window.get_scroll_wheel() {
                let sx = sx as i16;
                let sy = (-sy) as i16;
                uxn.devices.dat[0x9a] = (sx >> 8) as u8;
                uxn.devices.dat[0x9b] = sx as u8;
                uxn.devices.dat[0x9c] = (sy >> 8) as u8;
                uxn.devices.dat[0x9d] = sy as u8;
            }
            let vector = uxn.devices.vector(devices::MOUSE);
            uxn.eval(vector);
        }

        if tick.swap(false, Ordering::SeqCst) {
            let vector = uxn.devices.vector(devices::SCREEN);
            uxn.eval(vector);
        }

        if let Some(screen) = uxn.devices.get_mut::<Screen>(devices::SCREEN) {
            if let Some((x1, y1, x2, y2)) = screen.take_dirty() {
                for y in y1..y2 {
                    for x in x1..x2 {
                        buffer[y as usize * width as usize + x as usize] = screen.rgb_at(x, y);
                    }
                }
            }
        }

        if window.update_with_buffer(&buffer, width as usize, height as usize).is_err() {
            break;
        }

        if let Some(halt) = uxn.halt {
            return ExitCode::from(halt);
        }
    }
    ExitCode::SUCCESS
}

/// Low four bits: ctrl/alt/shift/home; high four: up/down/left/right.
fn controller_buttons(window: &Window) -> u8 {
    let mut mask = 0u8;
    if window.is_key_down(Key::LeftCtrl) || window.is_key_down(Key::RightCtrl) {
        mask |= 0x01;
    }
    if window.is_key_down(Key::LeftAlt) || window.is_key_down(Key::RightAlt) {
        mask |= 0x02;
    }
    if window.is_key_down(Key::LeftShift) || window.is_key_down(Key::RightShift) {
        mask |= 0x04;
    }
    if window.is_key_down(Key::Home) {
        mask |= 0x08;
    }
    if window.is_key_down(Key::Up) {
        mask |= 0x10;
    }
    if window.is_key_down(Key::Down) {
        mask |= 0x20;
    }
    if window.is_key_down(Key::Left) {
        mask |= 0x40;
    }
    if window.is_key_down(Key::Right) {
        mask |= 0x80;
    }
    mask
}

fn mouse_buttons(window: &Window) -> u8 {
    let mut mask = 0u8;
    if window.get_mouse_down(MouseButton::Left) {
        mask |= 0x01;
    }
    if window.get_mouse_down(MouseButton::Middle) {
        mask |= 0x02;
    }
    if window.get_mouse_down(MouseButton::Right) {
        mask |= 0x04;
    }
    mask
}

fn key_to_ascii(key: Key) -> Option<u8> {
    match key {
        Key::A => Some(b'a'),
        Key::B => Some(b'b'),
        Key::C => Some(b'c'),
        Key::D => Some(b'd'),
        Key::E => Some(b'e'),
        Key::F => Some(b'f'),
        Key::G => Some(b'g'),
        Key::H => Some(b'h'),
        Key::I => Some(b'i'),
        Key::J => Some(b'j'),
        Key::K => Some(b'k'),
        Key::L => Some(b'l'),
        Key::M => Some(b'm'),
        Key::N => Some(b'n'),
        Key::O => Some(b'o'),
        Key::P => Some(b'p'),
        Key::Q => Some(b'q'),
        Key::R => Some(b'r'),
        Key::S => Some(b's'),
        Key::T => Some(b't'),
        Key::U => Some(b'u'),
        Key::V => Some(b'v'),
        Key::W => Some(b'w'),
        Key::X => Some(b'x'),
        Key::Y => Some(b'y'),
        Key::Z => Some(b'z'),
        Key::Key0 => Some(b'0'),
        Key::Key1 => Some(b'1'),
        Key::Key2 => Some(b'2'),
        Key::Key3 => Some(b'3'),
        Key::Key4 => Some(b'4'),
        Key::Key5 => Some(b'5'),
        Key::Key6 => Some(b'6'),
        Key::Key7 => Some(b'7'),
        Key::Key8 => Some(b'8'),
        Key::Key9 => Some(b'9'),
        Key::Space => Some(b' '),
        Key::Enter => Some(b'\r'),
        Key::Backspace => Some(0x08),
        Key::Tab => Some(b'\t'),
        _ => None,
    }
}
