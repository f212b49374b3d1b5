//! Commands understood by the control channel.

use strum::{Display, EnumString};

/// Operation an operator can request from a running supervisor.
///
/// The wire spelling is the lowercase variant name followed by a newline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ControlCommand {
    /// Terminate the worker, release the endpoint and exit.
    Stop,
    /// Terminate the worker and start a fresh one.
    Restart,
}

impl ControlCommand {
    /// Encodes the command as a single protocol line.
    #[must_use]
    pub fn to_line(self) -> String {
        format!("{self}\n")
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("stop", ControlCommand::Stop)]
    #[case("restart", ControlCommand::Restart)]
    fn parses_wire_spelling(#[case] text: &str, #[case] expected: ControlCommand) {
        assert_eq!(ControlCommand::from_str(text).expect("known command"), expected);
        assert_eq!(expected.to_line(), format!("{text}\n"));
    }

    #[rstest]
    #[case("")]
    #[case("STOP")]
    #[case("reload")]
    #[case(" stop")]
    fn rejects_everything_else(#[case] text: &str) {
        assert!(ControlCommand::from_str(text).is_err());
    }
}
