//! Built-in command implementations.
//!
//! Commands are the logic pipeline stages run. Each implements
//! [`Command`]: a name, a one-line summary for `help`, and `run`, which
//! receives the stage's [`Invocation`] and produces the stage's output.
//! `run` executes within a single scheduler slice; commands that need to
//! span slices (`sleep`) override [`Command::launch`] and hand back a
//! resumable task instead.
//!
//! Commands never print. Output and error messages travel back through
//! the pipeline, which routes them to the display callback or a redirect
//! target.

mod cat;
mod cp;
mod date;
mod dmesg;
mod echo;
mod grep;
mod help;
mod kill;
mod ls;
mod mkdir;
mod mv;
mod ps;
mod pwd;
mod rm;
mod sleep;
mod touch;

pub use cat::Cat;
pub use cp::Cp;
pub use date::Date;
pub use dmesg::Dmesg;
pub use echo::Echo;
pub use grep::Grep;
pub use help::Help;
pub use kill::Kill;
pub use ls::Ls;
pub use mkdir::Mkdir;
pub use mv::Mv;
pub use ps::Ps;
pub use pwd::Pwd;
pub use rm::Rm;
pub use sleep::Sleep;
pub use touch::Touch;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::dmesg::DmesgRing;
use crate::errors::KernelResult;
use crate::process::ProcessContext;
use crate::task::Task;

/// Everything a command sees when its stage runs.
#[derive(Clone)]
pub struct Invocation {
    /// Arguments after the command name.
    pub args: Vec<String>,
    /// Output of the previous stage, or the pipeline's input file.
    pub stdin: Option<String>,
    /// Working directory relative paths resolve against.
    pub cwd: String,
    /// The owning process's kernel handle.
    pub context: ProcessContext,
}

/// How a command wants its stage executed.
pub enum Launch {
    /// Run [`Command::run`] to completion within one slice. The returned
    /// string is the stage's output.
    OneShot(Invocation),
    /// Advance this task one step per slice until it completes. A task
    /// has no output channel: its completion code is the stage's whole
    /// result, so anything it wants seen must go through a syscall or
    /// the display.
    Task(Box<dyn Task>),
}

#[async_trait]
pub trait Command: Send + Sync {
    fn name(&self) -> &'static str;

    fn summary(&self) -> &'static str;

    /// Produces the stage output for one invocation.
    ///
    /// # Errors
    ///
    /// The returned error's message is the user-facing diagnostic, already
    /// prefixed with the command name where convention demands it.
    async fn run(&self, invocation: Invocation) -> KernelResult<String>;

    /// One slice by default; multi-slice commands return a task here.
    fn launch(&self, invocation: Invocation) -> Launch {
        Launch::OneShot(invocation)
    }
}

/// Name-keyed command lookup, populated once at kernel construction.
pub struct CommandRegistry {
    commands: HashMap<&'static str, Arc<dyn Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        CommandRegistry {
            commands: HashMap::new(),
        }
    }

    /// The full built-in set. `help` is registered last so its listing
    /// covers every other command.
    pub fn with_defaults(dmesg: Arc<DmesgRing>) -> Self {
        let mut registry = CommandRegistry::new();
        registry.register(Arc::new(Echo));
        registry.register(Arc::new(Cat));
        registry.register(Arc::new(Ls));
        registry.register(Arc::new(Mkdir));
        registry.register(Arc::new(Touch));
        registry.register(Arc::new(Rm));
        registry.register(Arc::new(Cp));
        registry.register(Arc::new(Mv));
        registry.register(Arc::new(Pwd));
        registry.register(Arc::new(Ps));
        registry.register(Arc::new(Kill));
        registry.register(Arc::new(Sleep));
        registry.register(Arc::new(Grep));
        registry.register(Arc::new(Date));
        registry.register(Arc::new(Dmesg::new(dmesg)));

        let mut entries: Vec<(String, String)> = registry
            .commands
            .values()
            .map(|command| (command.name().to_string(), command.summary().to_string()))
            .collect();
        entries.push((
            Help::COMMAND_NAME.to_string(),
            Help::COMMAND_SUMMARY.to_string(),
        ));
        entries.sort();
        registry.register(Arc::new(Help::new(entries)));
        registry
    }

    pub fn register(&mut self, command: Arc<dyn Command>) {
        self.commands.insert(command.name(), command);
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.commands.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        CommandRegistry::new()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_resolves_every_builtin() {
        let registry = CommandRegistry::with_defaults(Arc::new(DmesgRing::new(16)));
        for name in [
            "echo", "cat", "ls", "mkdir", "touch", "rm", "cp", "mv", "pwd", "ps", "kill",
            "sleep", "grep", "date", "help", "dmesg",
        ] {
            assert!(registry.contains(name), "missing builtin {name}");
        }
        assert!(!registry.contains("vim"));
    }
}
