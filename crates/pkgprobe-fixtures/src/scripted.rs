//! In-memory executor for deterministic engine tests.
//!
//! Understands the handful of commands the provisioner and validator issue
//! (`mkdir -p`, the `sh -c` file writer, `test -e`, `cat`) against an in-memory
//! filesystem. Everything else is answered from scripted responses, or exits 127.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use pkgprobe::exec::{ExecRequest, ExecResult, ExecutionError, Executor};
use pkgprobe::model::{EnvironmentRef, ExecOutput};

/// Build an [`ExecOutput`].
#[must_use]
pub fn output(exit_code: i32, stdout: &str, stderr: &str) -> ExecOutput {
    ExecOutput {
        exit_code,
        stdout: stdout.trim().to_string(),
        stderr: stderr.trim().to_string(),
    }
}

/// Scripted reply for a command, optionally creating files as a side effect.
#[derive(Clone, Debug)]
pub enum Response {
    Output {
        output: ExecOutput,
        creates: Vec<(String, String)>,
    },
    Error(String),
}

impl Response {
    #[must_use]
    pub fn output(output: ExecOutput) -> Self {
        Self::Output {
            output,
            creates: Vec::new(),
        }
    }

    /// Also write `content` to the absolute `path` when the command runs.
    #[must_use]
    pub fn creating(self, path: &str, content: &str) -> Self {
        match self {
            Self::Output {
                output,
                mut creates,
            } => {
                creates.push((path.to_string(), content.to_string()));
                Self::Output { output, creates }
            }
            Self::Error(message) => Self::Error(message),
        }
    }
}

#[derive(Debug, Default)]
struct State {
    dirs: BTreeSet<String>,
    files: BTreeMap<String, String>,
    calls: Vec<ExecRequest>,
}

impl State {
    fn mkdir_all(&mut self, path: &str) {
        let mut current = String::new();
        for part in path.split('/').filter(|part| !part.is_empty()) {
            current.push('/');
            current.push_str(part);
            self.dirs.insert(current.clone());
        }
    }

    fn parent_exists(&self, path: &str) -> bool {
        match path.rsplit_once('/') {
            Some(("", _)) | None => true,
            Some((parent, _)) => self.dirs.contains(parent),
        }
    }

    fn exists(&self, path: &str) -> bool {
        self.files.contains_key(path) || self.dirs.contains(path)
    }
}

/// Executor backed by an in-memory filesystem and scripted responses.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    state: Mutex<State>,
    by_argv: Vec<(Vec<String>, Response)>,
    by_program: Vec<(String, Response)>,
    only_env: Option<EnvironmentRef>,
}

impl ScriptedExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply to any invocation of `program`.
    #[must_use]
    pub fn respond(self, program: &str, output: ExecOutput) -> Self {
        self.respond_with(program, Response::output(output))
    }

    #[must_use]
    pub fn respond_with(mut self, program: &str, response: Response) -> Self {
        self.by_program.push((program.to_string(), response));
        self
    }

    /// Reply to one exact argv; takes precedence over program-level replies.
    #[must_use]
    pub fn respond_argv(mut self, argv: &[&str], response: Response) -> Self {
        self.by_argv.push((
            argv.iter().map(|arg| (*arg).to_string()).collect(),
            response,
        ));
        self
    }

    /// Make every invocation of `program` fail at the transport level.
    #[must_use]
    pub fn fail(self, program: &str, message: &str) -> Self {
        self.respond_with(program, Response::Error(message.to_string()))
    }

    /// Reject every environment other than `env`.
    #[must_use]
    pub fn only_env(mut self, env: EnvironmentRef) -> Self {
        self.only_env = Some(env);
        self
    }

    /// Seed a file (parents are created).
    #[must_use]
    pub fn with_file(self, path: &str, content: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            if let Some((parent, _)) = path.rsplit_once('/') {
                state.mkdir_all(parent);
            }
            state.files.insert(path.to_string(), content.to_string());
        }
        self
    }

    /// Every request received, in order.
    pub fn calls(&self) -> Vec<ExecRequest> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Number of requests whose program is `program`.
    pub fn calls_to(&self, program: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.argv.first().map(String::as_str) == Some(program))
            .count()
    }

    pub fn file(&self, path: &str) -> Option<String> {
        self.state.lock().unwrap().files.get(path).cloned()
    }

    pub fn has_dir(&self, path: &str) -> bool {
        self.state.lock().unwrap().dirs.contains(path)
    }

    fn scripted(&self, argv: &[String]) -> Option<&Response> {
        self.by_argv
            .iter()
            .find(|(expected, _)| expected.as_slice() == argv)
            .map(|(_, response)| response)
            .or_else(|| {
                let program = argv.first()?;
                self.by_program
                    .iter()
                    .find(|(name, _)| name == program)
                    .map(|(_, response)| response)
            })
    }

    fn builtin(state: &mut State, argv: &[String]) -> ExecOutput {
        let args: Vec<&str> = argv.iter().map(String::as_str).collect();
        match args.as_slice() {
            ["mkdir", "-p", path] => {
                state.mkdir_all(path);
                output(0, "", "")
            }
            ["sh", "-c", _script, _name, content, path] => {
                if state.parent_exists(path) {
                    state.files.insert((*path).to_string(), (*content).to_string());
                    output(0, "", "")
                } else {
                    output(1, "", &format!("sh: can't create {path}: nonexistent directory"))
                }
            }
            ["test", "-e", path] => output(i32::from(!state.exists(path)), "", ""),
            ["cat", path] => match state.files.get(*path) {
                Some(content) => output(0, content, ""),
                None => output(1, "", &format!("cat: {path}: No such file or directory")),
            },
            [program, ..] => output(127, "", &format!("{program}: command not found")),
            [] => output(127, "", ""),
        }
    }
}

impl Executor for ScriptedExecutor {
    fn execute(&self, env: &EnvironmentRef, request: &ExecRequest) -> ExecResult<ExecOutput> {
        if self.only_env.as_ref().is_some_and(|only| only != env) {
            return Err(ExecutionError::InvalidEnvironment {
                id: env.id().to_string(),
            });
        }
        request.split_program()?;
        let mut state = self.state.lock().unwrap();
        state.calls.push(request.clone());

        match self.scripted(&request.argv) {
            Some(Response::Error(message)) => Err(ExecutionError::Protocol(message.clone())),
            Some(Response::Output { output, creates }) => {
                for (path, content) in creates {
                    if let Some((parent, _)) = path.rsplit_once('/') {
                        state.mkdir_all(parent);
                    }
                    state.files.insert(path.clone(), content.clone());
                }
                Ok(output.clone())
            }
            None => Ok(Self::builtin(&mut state, &request.argv)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(executor: &ScriptedExecutor, argv: &[&str]) -> ExecOutput {
        executor
            .execute(&EnvironmentRef::new("c"), &ExecRequest::new(argv.iter().copied()))
            .unwrap()
    }

    #[test]
    fn exact_argv_reply_wins_over_program_reply() {
        let executor = ScriptedExecutor::new()
            .respond("tool", output(0, "generic", ""))
            .respond_argv(&["tool", "--version"], Response::output(output(0, "1.0", "")));

        assert_eq!(run(&executor, &["tool", "--version"]).stdout, "1.0");
        assert_eq!(run(&executor, &["tool", "build"]).stdout, "generic");
        assert_eq!(run(&executor, &["other"]).exit_code, 127);
    }
}
