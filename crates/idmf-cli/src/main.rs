//! Interactive test harness for IDMF boards.
//!
//! Opens a board and offers a small menu to blink the LED, drive or sample a
//! GPIO line, and run one ADC acquisition.
//!
//! # Usage
//!
//! ```bash
//! idmf-cli                      # /dev/idmf0
//! idmf-cli idmf1 --config board.toml
//! idmf-cli --mock               # no hardware required
//! ```
//!
//! Logging follows `RUST_LOG` (default `info`).

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use idmf::{Board, BoardConfig, MockTransport, ReferenceCounts, RegisterTransport};
use tracing::info;

const BLINK_CYCLES: usize = 10;
const BLINK_PERIOD: Duration = Duration::from_millis(200);

const REFERENCE_ADC_VOLTS: f64 = 3.2768;
const REFERENCE_INA_VOLTS: f64 = 4.0100;

#[derive(Parser)]
#[command(name = "idmf-cli")]
#[command(about = "Interactive test harness for IDMF boards", long_about = None)]
struct Cli {
    /// Device name (`idmf0`) or path of the board's node
    device: Option<String>,

    /// Board configuration file (TOML format)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run against an emulated register file instead of hardware
    #[arg(long)]
    mock: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => BoardConfig::load_from(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => BoardConfig::load()?,
    };
    if let Some(device) = cli.device {
        config.device = device;
    }
    config.validate()?;

    println!("Init {}", config.device);

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut prompt = Prompt::new(stdin.lock(), stdout.lock());

    if cli.mock {
        let mut board = Board::with_transport(&config.device, MockTransport::new())?;
        config.apply(&mut board);
        info!("Using emulated board");
        run(board, &mut prompt)
    } else {
        let board = Board::open_with_config(&config)
            .with_context(|| format!("Error while opening device {}", config.device))?;
        run(board, &mut prompt)
    }
}

/// Drive the menu until exit or end of input, then close the board.
fn run<T, R, W>(board: Board<T>, prompt: &mut Prompt<R, W>) -> Result<()>
where
    T: RegisterTransport,
    R: BufRead,
    W: Write,
{
    let outcome = menu(&board, prompt);

    if let Err(e) = board.close() {
        prompt.say(&format!("Error while closing device: {}", e))?;
    }
    outcome
}

fn menu<T, R, W>(board: &Board<T>, prompt: &mut Prompt<R, W>) -> Result<()>
where
    T: RegisterTransport,
    R: BufRead,
    W: Write,
{
    loop {
        let Some(choice) =
            prompt.ask("Select:\n0 - LED test\n1 - GPIO\n2 - ADC\n5 - exit\nYour choice: ")?
        else {
            return Ok(());
        };

        let keep_going = match choice {
            0 => led_test(board, prompt)?,
            1 => gpio_test(board, prompt)?,
            2 => adc_test(board, prompt)?,
            5 => return Ok(()),
            _ => {
                prompt.say("Unknown option")?;
                true
            }
        };
        if !keep_going {
            return Ok(());
        }
    }
}

fn led_test<T, R, W>(board: &Board<T>, prompt: &mut Prompt<R, W>) -> Result<bool>
where
    T: RegisterTransport,
    R: BufRead,
    W: Write,
{
    let led = board.led();
    prompt.say(&format!("initial value: {}\n", led.read()))?;

    for _ in 0..BLINK_CYCLES {
        for value in [1, 0] {
            thread::sleep(BLINK_PERIOD);
            led.write(value);
            prompt.say(&format!("LED {} -> {}", value, led.read()))?;
        }
    }

    let Some(value) = prompt.ask("final value: ")? else {
        return Ok(false);
    };
    led.write(value as u32);
    Ok(true)
}

fn gpio_test<T, R, W>(board: &Board<T>, prompt: &mut Prompt<R, W>) -> Result<bool>
where
    T: RegisterTransport,
    R: BufRead,
    W: Write,
{
    let Some(mode) = prompt.ask("Select:\n0 - read\n1 - write\n\nYour choice: ")? else {
        return Ok(false);
    };
    let Some(channel) = prompt.ask("Channel: ")? else {
        return Ok(false);
    };

    let gpio = board.gpio();
    if mode == 1 {
        let Some(value) = prompt.ask("Value (0 or 1): ")? else {
            return Ok(false);
        };
        gpio.configure(line_mask(channel));
        gpio.write(channel, value as u32);
    } else {
        gpio.configure(0);
        prompt.say(&format!("Value : {}", gpio.read(channel)))?;
    }
    Ok(true)
}

fn adc_test<T, R, W>(board: &Board<T>, prompt: &mut Prompt<R, W>) -> Result<bool>
where
    T: RegisterTransport,
    R: BufRead,
    W: Write,
{
    let Some(channel) = prompt.ask("Channel: ")? else {
        return Ok(false);
    };

    let reference = ReferenceCounts::from_volts(REFERENCE_ADC_VOLTS, REFERENCE_INA_VOLTS);
    let timing = board.adc_timing();
    let adc = board.adc();

    adc.configure(reference.adc, reference.ina);
    adc.request();
    thread::sleep(timing.settle);
    adc.run();
    thread::sleep(timing.convert);
    adc.acquire();

    prompt.say(&format!("Value : {}", adc.read(channel)))?;
    Ok(true)
}

/// Direction mask with only `channel` as output; empty when out of range.
fn line_mask(channel: i32) -> u32 {
    u32::try_from(channel)
        .ok()
        .and_then(|bit| 1u32.checked_shl(bit))
        .unwrap_or(0)
}

/// Line-oriented integer prompt.
struct Prompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn say(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.output, "{}", line)
    }

    /// Print `question` and read an integer. `None` at end of input; lines
    /// that do not parse are asked again.
    fn ask(&mut self, question: &str) -> io::Result<Option<i32>> {
        loop {
            write!(self.output, "{}", question)?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            match line.trim().parse() {
                Ok(value) => return Ok(Some(value)),
                Err(_) => writeln!(self.output, "Not a number: {:?}", line.trim())?,
            }
        }
    }
}
