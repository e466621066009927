//! Static command descriptors and command line formatting.

use std::fmt::Write;

/// One protocol command.
///
/// The command name doubles as the sync token: the device echoes it in
/// front of every value line it returns for this command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub name: &'static str,
    /// Number of integer parameters the device echoes back on a query.
    pub params: usize,
    /// Whether the setter accepts the trailing "copy to other banks" flag.
    pub copyable: bool,
}

impl Command {
    pub const fn new(name: &'static str, params: usize) -> Self {
        Self {
            name,
            params,
            copyable: false,
        }
    }

    pub const fn copyable(mut self) -> Self {
        self.copyable = true;
        self
    }

    /// Render `<name> [args...]\n`.
    ///
    /// With `copy` set and a copyable command, a trailing `1` asks the
    /// device to apply the value to the other user banks as well.
    pub fn format(&self, args: &[i64], copy: bool) -> String {
        let mut line = String::with_capacity(self.name.len() + 8 * args.len() + 3);
        line.push_str(self.name);
        for arg in args {
            // writing into a String cannot fail
            let _ = write!(line, " {arg}");
        }
        if copy && self.copyable {
            line.push_str(" 1");
        }
        line.push('\n');
        line
    }

    /// Render a command whose single argument is free text.
    pub fn format_text(&self, text: &str) -> String {
        format!("{} {}\n", self.name, text)
    }
}
