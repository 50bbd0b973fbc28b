//! Command implementations.

pub mod db;
pub mod migrate;

use console::style;

/// Two-column progress line on stderr, ` * <name> <target> <extra>`.
pub(crate) fn print_command(indicator: &str, name: &str, target: &str, extra: &str) {
    eprintln!(
        "{} {} {} {}",
        style(indicator).dim(),
        style(name).cyan(),
        target,
        style(extra).dim()
    );
}
