use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use ci_auto::errors::Result;
use ci_auto::exec::{CommandOutput, CommandRunner, CommandSpec};

type Handler = Box<dyn Fn(&CommandSpec) -> CommandOutput + Send + Sync>;

/// A fake command runner that:
/// - records every command it is asked to run
/// - runs the side effect registered for the command's program (typically
///   writing the files a real build would leave behind)
/// - reports success for programs without a handler.
#[derive(Clone, Default)]
pub struct FakeCommandRunner {
    executed: Arc<Mutex<Vec<CommandSpec>>>,
    handlers: Arc<Mutex<Vec<(String, Handler)>>>,
}

impl FakeCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for commands whose program is `program`.
    pub fn on<F>(self, program: &str, handler: F) -> Self
    where
        F: Fn(&CommandSpec) -> CommandOutput + Send + Sync + 'static,
    {
        self.handlers
            .lock()
            .unwrap()
            .push((program.to_string(), Box::new(handler)));
        self
    }

    pub fn executed(&self) -> Vec<CommandSpec> {
        self.executed.lock().unwrap().clone()
    }

    /// Displayed form of every executed command.
    pub fn command_lines(&self) -> Vec<String> {
        self.executed().iter().map(ToString::to_string).collect()
    }

    /// First executed command with this program.
    pub fn find(&self, program: &str) -> Option<CommandSpec> {
        self.executed().into_iter().find(|c| c.program == program)
    }
}

impl std::fmt::Debug for FakeCommandRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeCommandRunner")
            .field("executed", &self.executed.lock().unwrap().len())
            .finish()
    }
}

/// Output of a command that exited with `code`.
pub fn exit(code: i32) -> CommandOutput {
    CommandOutput {
        exit_code: Some(code),
        ..CommandOutput::default()
    }
}

impl CommandRunner for FakeCommandRunner {
    fn run<'a>(
        &'a self,
        spec: &'a CommandSpec,
    ) -> Pin<Box<dyn Future<Output = Result<CommandOutput>> + Send + 'a>> {
        Box::pin(async move {
            self.executed.lock().unwrap().push(spec.clone());

            let handlers = self.handlers.lock().unwrap();
            let output = handlers
                .iter()
                .find(|(program, _)| *program == spec.program)
                .map(|(_, handler)| handler(spec))
                .unwrap_or_else(|| exit(0));
            Ok(output)
        })
    }
}
