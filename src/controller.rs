//! Interactive console front end.
//!
//! The controller owns both sessions for the whole run. Console input,
//! output and the error stream are injected so the full dialogue can be
//! driven from tests. Port failures the loop survives go to the error
//! stream; prompts and received lines go to the output.

use crate::channel::{MessageChannel, ReceiveOutcome};
use crate::config::Config;
use crate::discovery::{discover_pairs, find_pair, PortPair};
use crate::error::{AppError, AppResult};
use crate::port::{BaudRate, PortId, PortOpener, TimeoutPolicy};
use crate::session::SessionPair;
use std::io::{self, BufRead, Write};
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// One entry of the main menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Send,
    Receive,
    ChangeBaud,
    Exit,
}

impl MenuAction {
    /// Parse a menu answer: `1`, `2`, `3` or `0`.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(Self::Send),
            "2" => Some(Self::Receive),
            "3" => Some(Self::ChangeBaud),
            "0" => Some(Self::Exit),
            _ => None,
        }
    }
}

/// Why a write-port answer was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortChoiceError {
    NotANumber,
    NotInAnyPair(PortId),
}

/// Resolve a write-port answer against the discovered pairs. Returns the
/// write port and its partner, which becomes the read port.
pub fn parse_port_choice(
    input: &str,
    pairs: &[PortPair],
) -> Result<(PortId, PortId), PortChoiceError> {
    let id: PortId = input.parse().map_err(|_| PortChoiceError::NotANumber)?;
    find_pair(pairs, id)
        .and_then(|pair| pair.partner_of(id))
        .map(|partner| (id, partner))
        .ok_or(PortChoiceError::NotInAnyPair(id))
}

/// Everything the dialogue needs besides the console and the opener.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub max_port: u16,
    /// Used when the baud menu answer is invalid.
    pub default_baud: BaudRate,
    pub timeouts: TimeoutPolicy,
    pub channel: MessageChannel,
    /// Pause after a receive that found nothing.
    pub no_data_pause: Duration,
    /// Emit ANSI clear-screen sequences, as after a "no data" pause.
    pub clear_screen: bool,
}

impl ControllerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_port: config.discovery.max_port,
            default_baud: config.line.default_baud,
            timeouts: config.timeouts.policy(),
            channel: MessageChannel::new(
                config.session.write_mode,
                config.session.receive_deadline(),
            ),
            no_data_pause: config.session.no_data_pause(),
            clear_screen: false,
        }
    }
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Drives discovery, pair selection, configuration and the menu loop.
pub struct SessionController<'a, R, W, E> {
    opener: &'a dyn PortOpener,
    settings: ControllerSettings,
    input: R,
    output: W,
    errors: E,
}

impl<'a, R: BufRead, W: Write, E: Write> SessionController<'a, R, W, E> {
    pub fn new(
        opener: &'a dyn PortOpener,
        settings: ControllerSettings,
        input: R,
        output: W,
        errors: E,
    ) -> Self {
        Self {
            opener,
            settings,
            input,
            output,
            errors,
        }
    }

    /// Hand back the console, mostly so tests can inspect both streams.
    pub fn into_parts(self) -> (R, W, E) {
        (self.input, self.output, self.errors)
    }

    /// Run the whole dialogue. Returns `Ok` on a normal exit, including end
    /// of input.
    pub fn run(&mut self) -> AppResult<()> {
        let pairs = discover_pairs(self.opener, self.settings.max_port);
        if pairs.is_empty() {
            return Err(AppError::DiscoveryEmpty);
        }
        self.print_pairs(&pairs)?;

        let Some((write_id, read_id)) = self.prompt_write_port(&pairs)? else {
            return Ok(());
        };

        let mut sessions = SessionPair::open(self.opener, write_id, read_id)?;
        writeln!(self.output, "{write_id} opened.")?;
        writeln!(self.output, "{read_id} opened.")?;

        let Some(mut baud) = self.prompt_baud()? else {
            sessions.close();
            return Ok(());
        };
        self.configure(&mut sessions, baud)?;
        if let Err(e) = sessions.activate() {
            warn!(error = %e, "failed to activate sessions");
        }

        self.clear_screen()?;
        writeln!(
            self.output,
            "Sending via {write_id}, reading from {read_id} at {baud} baud."
        )?;

        loop {
            let Some(action) = self.prompt_action(write_id, read_id)? else {
                break;
            };
            match action {
                MenuAction::Send => {
                    write!(self.output, "Enter the message to send: ")?;
                    let Some(text) = self.read_line()? else {
                        break;
                    };
                    self.send(&mut sessions, &text)?;
                }
                MenuAction::Receive => self.receive(&mut sessions)?,
                MenuAction::ChangeBaud => {
                    let Some(new_baud) = self.prompt_baud()? else {
                        break;
                    };
                    baud = new_baud;
                    self.configure(&mut sessions, baud)?;
                    writeln!(self.output, "Baud rate changed to {baud}.")?;
                }
                MenuAction::Exit => {
                    writeln!(self.output, "Exiting.")?;
                    break;
                }
            }
        }

        sessions.close();
        info!("session finished");
        Ok(())
    }

    fn print_pairs(&mut self, pairs: &[PortPair]) -> io::Result<()> {
        writeln!(self.output, "Available COM port pairs:")?;
        for pair in pairs {
            writeln!(self.output, "  {pair}")?;
        }
        Ok(())
    }

    /// `None` at end of input.
    fn read_line(&mut self) -> io::Result<Option<String>> {
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }

    fn prompt_write_port(&mut self, pairs: &[PortPair]) -> io::Result<Option<(PortId, PortId)>> {
        loop {
            write!(
                self.output,
                "Enter the COM port number to send from (for example 2 for COM2): "
            )?;
            let Some(line) = self.read_line()? else {
                return Ok(None);
            };
            match parse_port_choice(&line, pairs) {
                Ok(choice) => return Ok(Some(choice)),
                Err(PortChoiceError::NotANumber) => {
                    writeln!(self.output, "Invalid input. Enter a number.")?;
                }
                Err(PortChoiceError::NotInAnyPair(id)) => {
                    writeln!(self.output, "{id} is not available. Choose a port from the list of pairs.")?;
                }
            }
        }
    }

    fn prompt_baud(&mut self) -> io::Result<Option<BaudRate>> {
        writeln!(self.output, "Available baud rates:")?;
        for (i, rate) in BaudRate::ALL.iter().enumerate() {
            writeln!(self.output, "{} - {}", i + 1, rate)?;
        }
        write!(self.output, "Enter a number: ")?;
        let Some(line) = self.read_line()? else {
            return Ok(None);
        };

        let (rate, fallback) = BaudRate::from_menu_input(&line);
        if fallback {
            let rate = self.settings.default_baud;
            writeln!(self.output, "Invalid choice. Using the default rate: {rate}.")?;
            Ok(Some(rate))
        } else {
            writeln!(self.output, "Selected rate: {rate}")?;
            Ok(Some(rate))
        }
    }

    fn prompt_action(&mut self, write_id: PortId, read_id: PortId) -> io::Result<Option<MenuAction>> {
        loop {
            writeln!(self.output)?;
            writeln!(self.output, "Choose an action:")?;
            writeln!(self.output, "1 - Send a message from {write_id} to {read_id}")?;
            writeln!(self.output, "2 - Read a message from {read_id}")?;
            writeln!(self.output, "3 - Change the baud rate")?;
            writeln!(self.output, "0 - Exit")?;
            write!(self.output, "Your choice: ")?;
            let Some(line) = self.read_line()? else {
                return Ok(None);
            };
            match MenuAction::parse(&line) {
                Some(action) => return Ok(Some(action)),
                None => writeln!(self.output, "Invalid choice. Try again.")?,
            }
        }
    }

    fn configure(&mut self, sessions: &mut SessionPair, baud: BaudRate) -> io::Result<()> {
        for (port, e) in sessions.configure(baud, self.settings.timeouts) {
            self.output.flush()?;
            writeln!(self.errors, "Failed to configure {port}: {e}")?;
        }
        writeln!(self.output, "Ports configured. Rate: {baud}")
    }

    fn send(&mut self, sessions: &mut SessionPair, text: &str) -> io::Result<()> {
        // Only the read side is purged.
        if let Err(e) = sessions.read.purge() {
            warn!(port = %sessions.read.id(), os_code = ?e.os_code(), error = %e, "failed to purge buffers");
        }

        match self.settings.channel.send(&mut sessions.write, text) {
            Ok(written) => {
                info!(port = %sessions.write.id(), bytes = written, "message sent");
                Ok(())
            }
            Err(e) => {
                error!(
                    port = %sessions.write.id(),
                    os_code = ?e.port_error().and_then(|p| p.os_code()),
                    error = %e,
                    "send failed"
                );
                self.output.flush()?;
                writeln!(self.errors, "Failed to send message: {e}")
            }
        }
    }

    fn receive(&mut self, sessions: &mut SessionPair) -> io::Result<()> {
        match self.settings.channel.receive(&mut sessions.read) {
            Ok(ReceiveOutcome::Frame(frame)) => writeln!(self.output, "{}", frame.text()),
            Ok(ReceiveOutcome::Empty) => {
                writeln!(self.output, "No data to read")?;
                self.output.flush()?;
                if !self.settings.no_data_pause.is_zero() {
                    thread::sleep(self.settings.no_data_pause);
                }
                self.clear_screen()
            }
            Err(e) => {
                error!(port = %sessions.read.id(), error = %e, "receive failed");
                self.output.flush()?;
                writeln!(self.errors, "Failed to read message: {e}")
            }
        }
    }

    fn clear_screen(&mut self) -> io::Result<()> {
        if self.settings.clear_screen {
            write!(self.output, "{CLEAR_SCREEN}")?;
        }
        Ok(())
    }
}

/// Print the discovered pairs, one per line. Used by `--list`.
pub fn list_pairs(opener: &dyn PortOpener, max_port: u16, output: &mut impl Write) -> AppResult<()> {
    let pairs = discover_pairs(opener, max_port);
    if pairs.is_empty() {
        return Err(AppError::DiscoveryEmpty);
    }
    for pair in &pairs {
        writeln!(output, "{pair}")?;
    }
    Ok(())
}
