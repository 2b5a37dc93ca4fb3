use anyhow::{Result, anyhow};

use crate::cli::handlers;

// --- Command Definition and Registry ---

/// A command, its aliases, and its handler. Handlers parse their own arguments.
struct CommandDefinition {
    name: &'static str,
    aliases: &'static [&'static str],
    handler: fn(Vec<String>) -> Result<()>,
}

static COMMAND_REGISTRY: &[CommandDefinition] = &[
    CommandDefinition {
        name: "chain",
        aliases: &[],
        handler: handlers::chain::handle,
    },
    CommandDefinition {
        name: "compile",
        aliases: &["c"],
        handler: handlers::compile::handle,
    },
    CommandDefinition {
        name: "resolve",
        aliases: &["config"],
        handler: handlers::resolve::handle,
    },
];

fn find_command(name: &str) -> Option<&'static CommandDefinition> {
    COMMAND_REGISTRY
        .iter()
        .find(|cmd| cmd.name == name || cmd.aliases.contains(&name))
}

/// Names of every registered command, for help and error output.
pub fn command_names() -> Vec<&'static str> {
    COMMAND_REGISTRY.iter().map(|cmd| cmd.name).collect()
}

/// Routes `command` to its handler.
pub fn dispatch(command: &str, args: Vec<String>) -> Result<()> {
    log::debug!("Dispatching '{}' with {:?}", command, args);
    match find_command(command) {
        Some(definition) => (definition.handler)(args),
        None => Err(anyhow!(
            "Unknown command '{}'. Available commands: {}.",
            command,
            command_names().join(", ")
        )),
    }
}
