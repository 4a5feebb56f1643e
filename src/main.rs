use anyhow::Context;
use clap::{ArgAction, Parser};
use std::fs::{self, File};
use std::io;
use std::path::PathBuf;
use std::process::exit;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::prelude::*;

use chip8::display::MonoTermDisplay;
use chip8::input::TermInput;
use chip8::interpreter::Chip8Interpreter;
use chip8::sound::{Mute, SimpleBeep, Sound};

#[derive(Parser, Debug)]
#[command(version, about = "CHIP-8 interpreter in the terminal")]
struct Opt {
    /// ROM file to run
    rom: PathBuf,

    /// Wall-clock length of one interpreter cycle, in microseconds
    #[arg(long, default_value_t = 3000)]
    cycle_us: u64,

    /// Don't beep
    #[arg(long, action = ArgAction::SetTrue)]
    mute: bool,

    /// Increase the level of verbosity. Can be used multiple times.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Write log messages here instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Opt {
    const fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "chip8=info,warn",
            2 => "chip8=debug,info",
            3..=u8::MAX => "chip8=trace,debug",
        }
    }

    fn filter_layer(&self) -> EnvFilter {
        // Parse log level from env, or infer from args
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.log_filter()))
    }

    fn init_logging(&self) -> anyhow::Result<()> {
        // the terminal display owns stdout, so logs go to a file or stderr
        let file_layer = match &self.log_file {
            Some(path) => {
                let f = File::create(path)
                    .with_context(|| format!("can't create log file {}", path.display()))?;
                Some(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(f)),
                )
            }
            None => None,
        };
        let stderr_layer = match self.log_file {
            Some(_) => None,
            None => Some(
                tracing_subscriber::fmt::layer()
                    .without_time()
                    .with_writer(io::stderr),
            ),
        };
        tracing_subscriber::registry()
            .with(self.filter_layer())
            .with(file_layer)
            .with(stderr_layer)
            .init();
        Ok(())
    }
}

fn run(opt: &Opt) -> anyhow::Result<u64> {
    // read the ROM before touching the terminal so load errors print cleanly
    let rom = fs::read(&opt.rom).with_context(|| format!("can't read {}", opt.rom.display()))?;
    info!(path = %opt.rom.display(), size = rom.len(), "loading");
    let name = opt
        .rom
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    // initialise
    let mut display = MonoTermDisplay::new(&name)?;
    let mut input = TermInput::new()?;
    let mut beeper = SimpleBeep::new();
    let mut mute = Mute::new();
    let sound: &mut dyn Sound = if opt.mute { &mut mute } else { &mut beeper };
    let mut interpreter = Chip8Interpreter::new(&mut display, &mut input, sound);

    interpreter.load_program(&mut rom.as_slice())?;
    let cycles = interpreter.main_loop(Duration::from_micros(opt.cycle_us))?;
    Ok(cycles)
}

fn main() {
    let opt = Opt::parse();
    if let Err(e) = opt.init_logging() {
        eprintln!("{:#}", e);
        exit(1);
    }

    // display and input are dropped inside run(), so the terminal is back to
    // normal before anything is reported
    match run(&opt) {
        Ok(cycles) => info!(cycles, "done"),
        Err(e) => {
            error!("{:#}", e);
            if opt.log_file.is_some() {
                eprintln!("{:#}", e);
            }
            exit(1);
        }
    }
}
