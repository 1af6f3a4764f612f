//! One-shot connection to a port named on the command line.

/// Launch argument naming the port to connect to at start-up.
pub const COM_PORT_ARG: &str = "--comPort";

/// Returns the value following `--comPort` in `args`, if any.
pub fn launch_port<I, S>(args: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut args = args.into_iter();
    args.by_ref().find(|arg| arg.as_ref() == COM_PORT_ARG)?;
    args.next().map(|port| port.as_ref().to_string())
}

/// Remembers whether the launch port has already been handled.
#[derive(Debug, Default)]
pub struct AutoConnect {
    performed: bool,
}

impl AutoConnect {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn performed(&self) -> bool {
        self.performed
    }

    /// Decides whether to connect to `launch_port`.
    ///
    /// The first evaluation with a launch port consumes the one-shot flag,
    /// whether or not the port is present in `available`.
    pub fn evaluate(&mut self, launch_port: Option<&str>, available: &[String]) -> Option<String> {
        if self.performed {
            return None;
        }
        let port = launch_port?;
        self.performed = true;
        available
            .iter()
            .any(|candidate| candidate == port)
            .then(|| port.to_string())
    }
}
