//! Line mode and shell mode input handling.

use log::debug;
use std::sync::{Arc, Mutex};

use super::{DisplaySink, Mode, SessionWriter};
use crate::serial::listeners::lock;
use crate::serial::{ListenerHandle, SessionManager, Transport};

/// Form-feed sent to a remote shell so it redraws its prompt without leaving
/// an empty line above it.
pub const PRIME_SHELL: &str = "\x0c";

/// Consumer hook for user input. A non-empty return value is displayed.
pub type CommandCallback = Box<dyn FnMut(&str) -> Option<String> + Send>;

/// Turns user input into callback invocations and serial data into display
/// output, according to the current [`Mode`].
pub struct ModeController<D, W> {
    display: D,
    writer: W,
    callback: CommandCallback,
    mode: Mode,
    clear_on_send: bool,
    command_line: String,
}

impl<D: DisplaySink, W: SessionWriter> ModeController<D, W> {
    pub fn new(display: D, writer: W, callback: CommandCallback, mode: Mode) -> Self {
        Self {
            display,
            writer,
            callback,
            mode,
            clear_on_send: true,
            command_line: String::new(),
        }
    }

    pub fn with_clear_on_send(mut self, clear_on_send: bool) -> Self {
        self.clear_on_send = clear_on_send;
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Changing the mode re-activates the terminal. Setting the same mode
    /// again does nothing.
    pub fn set_mode(&mut self, mode: Mode) {
        if self.mode != mode {
            self.mode = mode;
            self.activate();
        }
    }

    /// Pending line-mode input.
    pub fn command_line(&self) -> &str {
        &self.command_line
    }

    pub fn set_command_line(&mut self, line: impl Into<String>) {
        self.command_line = line.into();
    }

    /// Clears the display and pending input. Run it before a new session is
    /// opened; the session's `opened` event does the priming.
    pub fn reset(&mut self) {
        self.clear();
        self.command_line.clear();
    }

    /// Resets the terminal for a new mode and primes the device if the
    /// session is already open.
    pub fn activate(&mut self) {
        self.reset();
        self.prime();
    }

    /// Re-primes the device after the session reports it is open.
    pub fn handle_opened(&mut self) {
        self.prime();
    }

    fn prime(&mut self) {
        if self.mode == Mode::Shell && self.writer.is_open() {
            self.writer.write(PRIME_SHELL);
        }
    }

    /// Submits the pending command line. Returns `false` if it was empty.
    pub fn submit_command_line(&mut self) -> bool {
        if self.command_line.is_empty() {
            return false;
        }
        let input = self.command_line.clone();
        self.submit_line(&input);
        true
    }

    /// Line mode: echoes `(<input>)> `, runs the callback with the trimmed
    /// input and ends the output line.
    pub fn submit_line(&mut self, input: &str) {
        if self.mode != Mode::Line {
            debug!("Ignoring line submission in {} mode", self.mode);
            return;
        }
        self.display.write(&format!("({input})> "));
        if self.clear_on_send {
            self.command_line.clear();
        }
        if let Some(reply) = (self.callback)(input.trim()).filter(|r| !r.is_empty()) {
            self.display.write(&reply);
        }
        self.display.write("\r\n");
    }

    /// Shell mode: passes the raw keystroke to the callback. The remote end
    /// echoes, so nothing is displayed locally.
    pub fn handle_key(&mut self, key: &str) {
        if self.mode != Mode::Shell {
            return;
        }
        if let Some(reply) = (self.callback)(key).filter(|r| !r.is_empty()) {
            self.display.write(&reply);
        }
    }

    pub fn handle_data(&mut self, data: &str) {
        self.display.write(data);
    }

    /// Erases the visible output and homes the cursor.
    pub fn clear(&mut self) {
        self.display.erase_current_line_and_home_cursor();
        self.display.clear();
    }
}

impl<D, W> ModeController<D, W>
where
    D: DisplaySink + Send + 'static,
    W: SessionWriter + Send + 'static,
{
    /// Routes the manager's `opened` and data events into `controller`.
    pub fn attach<T: Transport>(
        controller: &Arc<Mutex<Self>>,
        manager: &SessionManager<T>,
    ) -> [ListenerHandle; 2] {
        let opened = Arc::clone(controller);
        let data = Arc::clone(controller);
        [
            manager.on_opened(move || lock(&opened).handle_opened()),
            manager.on_data(move |text| lock(&data).handle_data(text)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial::SerialOptions;
    use crate::serial::testing::Loopback;
    use crate::terminal::{MockDisplaySink, MockSessionWriter};
    use mockall::Sequence;
    use mockall::predicate::eq;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn echo() -> CommandCallback {
        Box::new(|input| Some(input.to_string()))
    }

    fn silent() -> CommandCallback {
        Box::new(|_| None)
    }

    fn open_writer() -> MockSessionWriter {
        let mut writer = MockSessionWriter::new();
        writer.expect_is_open().return_const(true);
        writer
    }

    fn quiet_display() -> MockDisplaySink {
        let mut display = MockDisplaySink::new();
        display.expect_clear().return_const(());
        display.expect_erase_current_line_and_home_cursor().return_const(());
        display
    }

    #[test]
    fn test_line_mode_echo_sequence() {
        let mut display = MockDisplaySink::new();
        let mut seq = Sequence::new();
        for text in ["(AT)> ", "AT", "\r\n"] {
            display
                .expect_write()
                .with(eq(text))
                .times(1)
                .in_sequence(&mut seq)
                .return_const(());
        }
        let mut controller = ModeController::new(display, open_writer(), echo(), Mode::Line);
        controller.set_command_line("AT");

        assert!(controller.submit_command_line());
        assert_eq!(controller.command_line(), "");
    }

    #[test]
    fn test_line_mode_keeps_input_without_clear_on_send() {
        let mut display = MockDisplaySink::new();
        display.expect_write().return_const(());
        let mut controller = ModeController::new(display, open_writer(), silent(), Mode::Line)
            .with_clear_on_send(false);
        controller.set_command_line("AT+CGMI");

        controller.submit_command_line();
        assert_eq!(controller.command_line(), "AT+CGMI");
    }

    #[test]
    fn test_line_mode_trims_callback_input() {
        let mut display = MockDisplaySink::new();
        display.expect_write().with(eq("(  ATI \t)> ")).times(1).return_const(());
        display.expect_write().with(eq("\r\n")).times(1).return_const(());
        let seen = Arc::new(Mutex::new(String::new()));
        let record = seen.clone();
        let callback: CommandCallback = Box::new(move |input| {
            *record.lock().unwrap() = input.to_string();
            None
        });
        let mut controller = ModeController::new(display, open_writer(), callback, Mode::Line);

        controller.submit_line("  ATI \t");
        assert_eq!(*seen.lock().unwrap(), "ATI");
    }

    #[test]
    fn test_empty_command_line_is_not_submitted() {
        let mut display = MockDisplaySink::new();
        display.expect_write().never();
        let mut controller = ModeController::new(display, open_writer(), echo(), Mode::Line);
        assert!(!controller.submit_command_line());
    }

    #[test]
    fn test_empty_reply_is_not_displayed() {
        let mut display = MockDisplaySink::new();
        display.expect_write().with(eq("(x)> ")).times(1).return_const(());
        display.expect_write().with(eq("\r\n")).times(1).return_const(());
        let callback: CommandCallback = Box::new(|_| Some(String::new()));
        let mut controller = ModeController::new(display, open_writer(), callback, Mode::Line);
        controller.submit_line("x");
    }

    #[test]
    fn test_shell_key_without_reply_writes_nothing() {
        let mut display = MockDisplaySink::new();
        display.expect_write().never();
        let mut controller = ModeController::new(display, open_writer(), silent(), Mode::Shell);
        controller.handle_key("a");
    }

    #[test]
    fn test_shell_key_reply_is_displayed() {
        let mut display = MockDisplaySink::new();
        display.expect_write().with(eq("!")).times(1).return_const(());
        let callback: CommandCallback = Box::new(|_| Some("!".to_string()));
        let mut controller = ModeController::new(display, open_writer(), callback, Mode::Shell);
        controller.handle_key("a");
    }

    #[test]
    fn test_keys_ignored_in_line_mode() {
        let mut display = MockDisplaySink::new();
        display.expect_write().never();
        let callback: CommandCallback = Box::new(|_| panic!("callback must not run"));
        let mut controller = ModeController::new(display, open_writer(), callback, Mode::Line);
        controller.handle_key("a");
    }

    #[test]
    fn test_switch_to_shell_primes_once() {
        let mut writer = open_writer();
        writer.expect_write().with(eq(PRIME_SHELL)).times(1).return_const(true);
        let mut controller = ModeController::new(quiet_display(), writer, silent(), Mode::Line);

        controller.set_mode(Mode::Shell);
        controller.set_mode(Mode::Shell);
    }

    #[test]
    fn test_switch_to_line_sends_nothing() {
        let mut writer = open_writer();
        writer.expect_write().never();
        let mut controller = ModeController::new(quiet_display(), writer, silent(), Mode::Shell);
        controller.set_command_line("pending");

        controller.set_mode(Mode::Line);
        assert_eq!(controller.command_line(), "");
    }

    #[test]
    fn test_no_priming_while_closed() {
        let mut writer = MockSessionWriter::new();
        writer.expect_is_open().return_const(false);
        writer.expect_write().never();
        let mut controller = ModeController::new(quiet_display(), writer, silent(), Mode::Shell);
        controller.activate();
    }

    #[test]
    fn test_opened_reprimes_shell() {
        let mut writer = open_writer();
        writer.expect_write().with(eq(PRIME_SHELL)).times(2).return_const(true);
        let mut controller = ModeController::new(quiet_display(), writer, silent(), Mode::Shell);
        controller.handle_opened();
        controller.handle_opened();
    }

    #[test]
    fn test_data_displayed_verbatim() {
        let mut display = MockDisplaySink::new();
        display
            .expect_write()
            .with(eq("\x1b[1mOK\r\n"))
            .times(1)
            .return_const(());
        let mut controller = ModeController::new(display, open_writer(), silent(), Mode::Line);
        controller.handle_data("\x1b[1mOK\r\n");
    }

    #[test]
    fn test_clear_erases_then_clears() {
        let mut display = MockDisplaySink::new();
        let mut seq = Sequence::new();
        display
            .expect_erase_current_line_and_home_cursor()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        display
            .expect_clear()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        let mut controller = ModeController::new(display, open_writer(), silent(), Mode::Line);
        controller.clear();
    }

    #[test]
    fn test_reset_never_primes() {
        let mut writer = open_writer();
        writer.expect_write().never();
        let mut controller = ModeController::new(quiet_display(), writer, silent(), Mode::Shell);
        controller.set_command_line("pending");
        controller.reset();
        assert_eq!(controller.command_line(), "");
    }

    /// Clearing wipes everything recorded so far.
    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<String>>);

    impl DisplaySink for Recorder {
        fn write(&mut self, text: &str) {
            self.0.lock().unwrap().push_str(text);
        }
        fn clear(&mut self) {
            self.0.lock().unwrap().clear();
        }
        fn erase_current_line_and_home_cursor(&mut self) {}
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_new_session_primes_once_and_keeps_early_output() {
        let mut manager = SessionManager::new(Loopback::new(), SerialOptions::default());
        let transport = manager.transport();
        let output = Recorder::default();
        output.0.lock().unwrap().push_str("old session output");
        let controller = Arc::new(Mutex::new(ModeController::new(
            output.clone(),
            manager.active(),
            silent(),
            Mode::Shell,
        )));
        let _handles = ModeController::attach(&controller, &manager);

        lock(&controller).reset();
        manager.select_port(Some("/dev/ttyACM0")).await.unwrap();
        let mut device = transport.device("/dev/ttyACM0").await;

        let mut prime = [0u8; 1];
        device.read_exact(&mut prime).await.unwrap();
        assert_eq!(prime[0], 0x0c);

        device.write_all(b"uart:~$ ").await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), async {
            while !output.0.lock().unwrap().contains("uart:~$ ") {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(*output.0.lock().unwrap(), "uart:~$ ");

        let mut extra = [0u8; 1];
        assert!(
            tokio::time::timeout(Duration::from_millis(100), device.read(&mut extra))
                .await
                .is_err()
        );
    }
}
