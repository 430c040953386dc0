//! Shell completion generation.

use clap::CommandFactory;
use clap_complete::Shell;

/// Print shell completions for the given shell to stdout
pub fn cmd_completions<C: CommandFactory>(shell: Shell) {
    let mut command = C::command();
    let name = command.get_name().to_string();
    clap_complete::generate(shell, &mut command, name, &mut std::io::stdout());
}
