//! # App Module
//!
//! Wires the serial session manager and the mode controller to the console:
//! command-line flags, persisted settings and the two input loops.

use clap::Parser;
use crossterm::event::{self, Event};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use log::{LevelFilter, error, info, warn};
use std::io::Stdout;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::config::TerminalConfig;
use crate::error::{Result, SessionError};
use crate::serial::listeners::lock;
use crate::serial::options::parse_optional;
use crate::serial::{
    ActiveSession, COMMON_BAUD_RATES, SerialOptions, SessionManager, TokioSerial, Transport,
    available_ports, port_choices,
};
use crate::terminal::keys::{is_exit_key, key_input};
use crate::terminal::{
    CommandCallback, ConsoleDisplay, DisplaySink, Mode, ModeController, SessionWriter,
};

type Controller = Arc<Mutex<ModeController<ConsoleDisplay<Stdout>, ActiveSession>>>;

/// Command-line flags. Anything given here overrides the config file.
#[derive(Debug, Parser)]
#[command(name = "serial_terminal", version, about)]
pub struct Cli {
    /// Port to connect to at start-up, if it is present.
    #[arg(long = "comPort", value_name = "PATH")]
    pub com_port: Option<String>,

    #[arg(long)]
    pub baud_rate: Option<u32>,

    /// 5, 6, 7, 8 or Auto
    #[arg(long)]
    pub data_bits: Option<String>,

    /// 1, 2 or Auto
    #[arg(long)]
    pub stop_bits: Option<String>,

    /// none, even, mark, odd, space or Auto
    #[arg(long)]
    pub parity: Option<String>,

    #[arg(long)]
    pub rtscts: bool,

    #[arg(long)]
    pub xon: bool,

    #[arg(long)]
    pub xoff: bool,

    #[arg(long)]
    pub xany: bool,

    /// Send every keystroke to a remote shell instead of whole lines.
    #[arg(long)]
    pub shell: bool,

    /// Keep the command line after sending it.
    #[arg(long)]
    pub keep_input: bool,

    /// List available ports and exit.
    #[arg(long)]
    pub list: bool,

    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl Cli {
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(TerminalConfig::default_path)
    }

    /// Overlays the flags onto `config`.
    pub fn apply_to(&self, config: &mut TerminalConfig) -> Result<()> {
        if let Some(baud_rate) = self.baud_rate {
            if baud_rate == 0 {
                return Err(SessionError::invalid_config("baud rate must be positive"));
            }
            if !COMMON_BAUD_RATES.contains(&baud_rate) {
                warn!("Baud rate {baud_rate} is not a common rate");
            }
            config.options.baud_rate = baud_rate;
        }
        if let Some(bits) = &self.data_bits {
            config.options.data_bits = parse_optional(bits)?;
        }
        if let Some(bits) = &self.stop_bits {
            config.options.stop_bits = parse_optional(bits)?;
        }
        if let Some(parity) = &self.parity {
            config.options.parity = parse_optional(parity)?;
        }
        config.options.rtscts |= self.rtscts;
        config.options.xon |= self.xon;
        config.options.xoff |= self.xoff;
        config.options.xany |= self.xany;
        if self.shell {
            config.mode = Mode::Shell;
        }
        if self.keep_input {
            config.clear_on_send = false;
        }
        Ok(())
    }
}

/// Line-mode commands handled locally instead of being sent.
#[derive(Debug, PartialEq, Eq)]
pub enum LocalCommand<'a> {
    Quit,
    Clear,
    Disconnect,
    Port(&'a str),
    Baud(&'a str),
}

impl<'a> LocalCommand<'a> {
    pub fn parse(line: &'a str) -> Option<Self> {
        let rest = line.trim().strip_prefix('/')?;
        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };
        match (name, arg) {
            ("quit", _) => Some(Self::Quit),
            ("clear", _) => Some(Self::Clear),
            ("disconnect", _) => Some(Self::Disconnect),
            ("port", port) if !port.is_empty() => Some(Self::Port(port)),
            ("baud", rate) if !rate.is_empty() => Some(Self::Baud(rate)),
            _ => None,
        }
    }
}

/// Builds the callback that forwards user input to the active session.
pub fn forward_to(writer: ActiveSession, mode: Mode, line_ending: String) -> CommandCallback {
    match mode {
        Mode::Line => Box::new(move |input| {
            writer.write(&format!("{input}{line_ending}"));
            None
        }),
        Mode::Shell => Box::new(move |key| {
            writer.write(key);
            None
        }),
    }
}

/// Runs the terminal until the user quits.
pub async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config_path();
    let mut config = TerminalConfig::load_or_default(&config_path);
    cli.apply_to(&mut config)?;

    let available = available_ports();
    if cli.list {
        for port in port_choices(&available) {
            println!("{port}");
        }
        return Ok(());
    }

    let mut manager = SessionManager::new(TokioSerial, config.options.clone());
    let callback = forward_to(manager.active(), config.mode, config.line_ending.clone());
    let controller: Controller = Arc::new(Mutex::new(
        ModeController::new(ConsoleDisplay::stdout(), manager.active(), callback, config.mode)
            .with_clear_on_send(config.clear_on_send),
    ));
    let _listeners = ModeController::attach(&controller, &manager);

    lock(&controller).reset();
    if !manager.auto_connect(cli.com_port.as_deref(), &available).await? {
        if let Some(port) = config.port.clone() {
            manager.select_port(Some(port.as_str())).await?;
        }
    }

    let result = match config.mode {
        Mode::Line => line_loop(&controller, &mut manager).await,
        Mode::Shell => shell_loop(&controller).await,
    };

    config.port = manager.selected_port().map(str::to_string);
    config.options = manager.options().clone();
    if let Err(e) = config.save(&config_path) {
        error!("Failed to save configuration: {e}");
    }
    manager.dispose().await;
    info!("Bye");
    result
}

/// Resets the terminal, then switches the manager to `port`. The new
/// session's `opened` event primes it.
async fn reconnect<T, D, W>(
    controller: &Arc<Mutex<ModeController<D, W>>>,
    manager: &mut SessionManager<T>,
    port: Option<&str>,
    options: SerialOptions,
) -> Result<()>
where
    T: Transport,
    D: DisplaySink,
    W: SessionWriter,
{
    lock(controller).reset();
    manager.apply(port, options).await
}

async fn line_loop<T: Transport>(
    controller: &Controller,
    manager: &mut SessionManager<T>,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            return Ok(());
        };

        match LocalCommand::parse(&line) {
            Some(LocalCommand::Quit) => return Ok(()),
            Some(LocalCommand::Clear) => lock(controller).clear(),
            Some(LocalCommand::Disconnect) => {
                let options = manager.options().clone();
                reconnect(controller, manager, None, options).await?;
            }
            Some(LocalCommand::Port(port)) => {
                let options = manager.options().clone();
                reconnect(controller, manager, Some(port), options).await?;
            }
            Some(LocalCommand::Baud(rate)) => match rate.parse::<u32>() {
                Ok(rate) if rate > 0 => {
                    let port = manager.selected_port().map(str::to_string);
                    let options = manager.options().clone().with_baud_rate(rate);
                    reconnect(controller, manager, port.as_deref(), options).await?;
                }
                _ => warn!("Invalid baud rate '{rate}'"),
            },
            None => {
                let mut controller = lock(controller);
                controller.set_command_line(line.as_str());
                controller.submit_command_line();
            }
        }
    }
}

/// Forwards keystrokes until Ctrl-] is pressed.
///
/// crossterm reads block, so they run on their own thread. That thread stays
/// blocked in `read` after the loop returns, while `run` saves the config and
/// closes the session, and goes away when the process exits. Logging is held
/// at warnings while raw mode is on so log lines do not tear the remote
/// shell's output.
async fn shell_loop(controller: &Controller) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        loop {
            match event::read() {
                Ok(Event::Key(key)) => {
                    if tx.send(key).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    error!("Failed to read console input: {e}");
                    break;
                }
            }
        }
    });

    enable_raw_mode()?;
    let level = log::max_level();
    log::set_max_level(level.min(LevelFilter::Warn));
    while let Some(key) = rx.recv().await {
        if is_exit_key(&key) {
            break;
        }
        if let Some(input) = key_input(&key) {
            lock(controller).handle_key(&input);
        }
    }
    let restored = disable_raw_mode();
    log::set_max_level(level);
    restored?;
    Ok(())
}
