//! Command building and representation.

/// A command to be executed on a remote host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Command {
    /// The command line to execute.
    pub command_line: String,
    /// Prefix the command with `sudo`.
    pub sudo: bool,
    /// Environment assignments, in the order they are prefixed.
    pub env: Vec<(String, String)>,
}

impl Command {
    /// Create a new command with the given command line.
    pub fn new(command_line: impl Into<String>) -> Self {
        Self {
            command_line: command_line.into(),
            sudo: false,
            env: Vec::new(),
        }
    }

    /// Run through `sudo`.
    pub fn sudo(mut self, sudo: bool) -> Self {
        self.sudo = sudo;
        self
    }

    /// Add an environment variable. A repeated key replaces the earlier value
    /// in place.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.env.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.env.push((key, value)),
        }
        self
    }

    /// Add multiple environment variables.
    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in vars {
            self = self.env(k, v);
        }
        self
    }

    /// The exact line sent to the remote shell.
    ///
    /// `sudo` goes directly before the command and the environment
    /// assignments before that: `A=1 B=2 sudo cmd`.
    pub fn render(&self) -> String {
        let mut line = String::new();
        for (key, value) in &self.env {
            line.push_str(key);
            line.push('=');
            line.push_str(value);
            line.push(' ');
        }
        if self.sudo {
            line.push_str("sudo ");
        }
        line.push_str(&self.command_line);
        line
    }
}

impl From<&str> for Command {
    fn from(command_line: &str) -> Self {
        Self::new(command_line)
    }
}
