//! PiGo board demo
//!
//! Exercises one module at a time from a background poller.
//!
//! ```bash
//! # Sweep nothing, just watch both ADC channels of the module in socket A
//! pigo-demo analog --socket A
//!
//! # Drive the DAC of socket B and read it back for 30 seconds
//! pigo-demo analog --socket B --da0 512 --da1 1023 --seconds 30
//!
//! # Motor on the hardware PWM channel, half power in reverse
//! pigo-demo motor --socket A --mode pwm --power -0.5
//!
//! # Buffered pins 0-3 as outputs, pins 0 and 2 high, log edges on 4-7
//! pigo-demo io --outputs 0x0f --levels 0x05
//!
//! # Without a board attached
//! pigo-demo --detached scan
//! ```

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use embedded_hal::i2c::I2c;
use embedded_hal::pwm::SetDutyCycle;
use embedded_hal::spi::SpiBus;

use pigo::dev::analog::to_volts;
use pigo::{
    AnalogModule, Board, BoardConfig, BoardMutex, BufferedIo, Detached, DetachedBoard, Direction,
    LocalGpio, Motor, Poller, Revision, Socket, BUFFERED_PINS,
};

/// PiGo board demo
#[derive(Parser)]
#[command(name = "pigo-demo")]
#[command(version)]
#[command(about = "Exercise the modules of a PiGo expansion board")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Raspberry Pi board revision (1 or 2)
    #[arg(long, global = true, default_value = "2")]
    rev: Revision,

    /// Run without hardware: writes are dropped, reads return zero
    #[arg(long, global = true)]
    detached: bool,

    /// Sleep between two polling cycles, in milliseconds
    #[arg(long, global = true, default_value_t = 50)]
    interval_ms: u64,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum MotorMode {
    /// H-bridge on the socket's extended pins
    Digital,
    /// Hardware PWM on buffered pin 0, direction on buffered pin 1
    Pwm,
}

#[derive(Subcommand)]
enum Command {
    /// Poll the ADC of an analog module and drive its DAC
    Analog {
        #[arg(short, long)]
        socket: Socket,

        /// DAC channel 0 value (0-1023)
        #[arg(long)]
        da0: Option<u16>,

        /// DAC channel 1 value (0-1023)
        #[arg(long)]
        da1: Option<u16>,

        #[arg(long, default_value_t = 10.0)]
        seconds: f64,
    },

    /// Run a motor module at a fixed power
    Motor {
        #[arg(short, long)]
        socket: Socket,

        #[arg(short, long, value_enum, default_value_t = MotorMode::Digital)]
        mode: MotorMode,

        /// Power between -1.0 (full reverse) and 1.0 (full forward)
        #[arg(short, long, allow_hyphen_values = true)]
        power: f32,

        #[arg(long, default_value_t = 10.0)]
        seconds: f64,
    },

    /// Drive and watch the buffered I/O pins
    Io {
        /// Pins to use as outputs, bit n for pin n
        #[arg(long, value_parser = parse_mask, default_value = "0")]
        outputs: u8,

        /// Levels of the output pins, bit n for pin n
        #[arg(long, value_parser = parse_mask, default_value = "0")]
        levels: u8,

        #[arg(long, default_value_t = 10.0)]
        seconds: f64,
    },

    /// List the devices answering on the I2C bus
    Scan,
}

fn parse_mask(s: &str) -> Result<u8, std::num::ParseIntError> {
    match s.strip_prefix("0x") {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse(),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    let config = BoardConfig {
        revision: cli.rev,
        poll_interval: Duration::from_millis(cli.interval_ms),
        ..BoardConfig::default()
    };

    if cli.detached {
        log::info!("running detached, no hardware is touched");
        let board = DetachedBoard::new(Detached, Detached, Detached, &config)?;
        return run(board, || Detached, cli.command, &config);
    }

    #[cfg(feature = "rpi")]
    return run(
        or_exit(pigo::rpi::open(&config)),
        || or_exit(pigo::rpi::open_pwm(&config)),
        cli.command,
        &config,
    );

    #[cfg(not(feature = "rpi"))]
    anyhow::bail!("built without the `rpi` feature, only --detached is available");
}

/// Start-up failures end the process with a status naming the peripheral.
#[cfg(feature = "rpi")]
fn or_exit<T>(res: Result<T, pigo::rpi::InitError>) -> T {
    res.unwrap_or_else(|e| {
        log::error!("{}", e);
        std::process::exit(e.exit_code())
    })
}

fn run<I2C, SPI, GPIO, P>(
    board: Board<I2C, SPI, GPIO>,
    open_pwm: impl FnOnce() -> P,
    command: Command,
    config: &BoardConfig,
) -> Result<()>
where
    I2C: I2c + Send + 'static,
    SPI: SpiBus + Send + 'static,
    GPIO: LocalGpio + Send + 'static,
    P: SetDutyCycle + Send + 'static,
{
    if let Command::Scan = command {
        return scan(board);
    }

    let board: Arc<Mutex<Board<I2C, SPI, GPIO>>> = Arc::new(BoardMutex::create(board));
    let shared = board.clone();

    let (poller, seconds) = match command {
        Command::Analog {
            socket,
            da0,
            da1,
            seconds,
        } => {
            let adda = BoardMutex::lock(&*board, |b| AnalogModule::new(b, socket))?;
            let targets = [da0, da1];
            let mut read = [None; 2];
            let mut written = [None; 2];

            let poller = Poller::spawn("analog", config.poll_interval, move || {
                BoardMutex::lock(&*shared, |b| {
                    for ch in 0..2 {
                        let value = adda.read_channel(b, ch as u8)?;
                        if read[ch] != Some(value) {
                            log::info!("{} AD{}: {:.3} V", socket, ch, to_volts(value));
                            read[ch] = Some(value);
                        }
                        if let Some(target) = targets[ch] {
                            if written[ch] != Some(target) {
                                adda.write_channel(b, ch as u8, target)?;
                                log::info!("{} DA{}: {:.3} V", socket, ch, to_volts(target));
                                written[ch] = Some(target);
                            }
                        }
                    }
                    Ok(())
                })
            })?;
            (poller, seconds)
        }

        Command::Motor {
            socket,
            mode,
            power,
            seconds,
        } => {
            let mut motor = match mode {
                MotorMode::Digital => {
                    BoardMutex::lock(&*board, |b| Motor::<P>::h_bridge(b, socket))?
                }
                MotorMode::Pwm => {
                    let pwm = open_pwm();
                    BoardMutex::lock(&*board, |b| Motor::pwm(b, pwm))?
                }
            };

            let poller = Poller::spawn("motor", config.poll_interval, move || {
                BoardMutex::lock(&*shared, |b| motor.set_output(b, power))
            })?;
            (poller, seconds)
        }

        Command::Io {
            outputs,
            levels,
            seconds,
        } => {
            let mut io = BufferedIo::new();
            for pin in 0..BUFFERED_PINS {
                if outputs & (1 << pin) != 0 {
                    io.set_direction(pin, Direction::Output)?;
                    io.set_level(pin, levels & (1 << pin) != 0)?;
                }
            }

            let poller = Poller::spawn("io", config.poll_interval, move || {
                let changed = BoardMutex::lock(&*shared, |b| io.poll(b))?;
                for pin in (0..BUFFERED_PINS).filter(|p| changed & (1 << p) != 0) {
                    let level = if io.level(pin)? { "high" } else { "low" };
                    log::info!("io{} went {}", pin, level);
                }
                Ok(())
            })?;
            (poller, seconds)
        }

        Command::Scan => unreachable!("handled above"),
    };

    thread::sleep(Duration::from_secs_f64(seconds.max(0.0)));
    poller.terminate();
    poller.join();

    // Leave the expanders in a consistent state, even if the last cycle failed.
    BoardMutex::lock(&*board, |b| b.flush())?;
    Ok(())
}

fn scan<I2C: I2c, SPI, GPIO>(board: Board<I2C, SPI, GPIO>) -> Result<()> {
    let (mut i2c, _, _) = board.release();
    let found = pigo::scan(&mut i2c);
    for addr in (0..128u8).filter(|a| found & (1 << a) != 0) {
        println!("{:#04x}", addr);
    }
    if found == 0 {
        println!("no devices found");
    }
    Ok(())
}
