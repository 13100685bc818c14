use std::io::{Read, Write};

use thiserror::Error;

#[cfg(feature = "tracing_debug")]
use tracing::debug;

use crate::api::{CmdDesc, Commands, Flag, Parameters};
use crate::context::Context;
use crate::params::{DeclGuard, FlagRegistry, ParamError, PositionalRegistry};
use crate::parser::suggest::suggestions_for;
use crate::parser::usage;
use crate::tokens::{DynamicResolver, EnvLookup, TokenStore};

/// A user-facing problem found while dispatching, reported together with
/// usage output.
#[derive(Debug, Error)]
pub(crate) enum DispatchError {
    #[error("argument error: {0}")]
    Argument(ParamError),

    #[error("argument error: unknown arguments: {0:?}")]
    UnknownArguments(Vec<String>),

    #[error("unknown command: {0}")]
    UnknownCommand(String),
}

/// Everything one dispatch owns: the token store, the three parameter
/// registries with their declaration guards, the matched-name path, and the
/// accumulated error list.  Created per `run`, discarded at its end.
pub(crate) struct RunState<'e> {
    pub(crate) tokens: TokenStore<'e>,
    pub(crate) pos: PositionalRegistry,
    pub(crate) pos_guard: DeclGuard,
    pub(crate) flags: FlagRegistry,
    pub(crate) gflags: FlagRegistry,
    pub(crate) flag_guard: DeclGuard,
    pub(crate) names: Vec<String>,
    pub(crate) errors: Vec<DispatchError>,
    pub(crate) help: bool,
    pub(crate) summary: bool,
    pub(crate) advanced: bool,
}

impl<'e> RunState<'e> {
    fn new(
        name: String,
        args: Vec<String>,
        dynamic: Option<DynamicResolver<'e>>,
        lookup_env: EnvLookup<'e>,
    ) -> Self {
        Self {
            tokens: TokenStore::new(args, dynamic, lookup_env),
            pos: PositionalRegistry::default(),
            pos_guard: DeclGuard::default(),
            flags: FlagRegistry::default(),
            gflags: FlagRegistry::default(),
            // Command flags and global flags share one guard: a command may
            // not redeclare a global flag's name or short letter.
            flag_guard: DeclGuard::default(),
            names: vec![name],
            errors: Vec::new(),
            help: false,
            summary: false,
            advanced: false,
        }
    }

    /// Declare the built-in global flags, resolving them before any
    /// command matching happens.
    fn setup_flags(&mut self) {
        self.help = self.declare_global(
            Flag::new("help", "prints help for the command")
                .short('h')
                .boolean()
                .parse::<bool>(),
        );
        self.summary = self.declare_global(
            Flag::new("summary", "prints a summary of what commands are available")
                .advanced()
                .boolean()
                .parse::<bool>(),
        );
        self.advanced = self.declare_global(
            Flag::new("advanced", "when used with -h, prints advanced flags help")
                .boolean()
                .parse::<bool>(),
        );
    }

    fn declare_global<T: Default + 'static>(&mut self, flag: Flag<T>) -> T {
        let (info, pipeline, default) = flag.into_parts();
        self.gflags
            .declare(&mut self.flag_guard, &mut self.tokens, info, pipeline, default)
    }

    pub(crate) fn name(&self) -> String {
        self.names.join(" ")
    }

    fn consume_name(&mut self) {
        // Must have been peeked.
        if let Ok(Some(name)) = self.tokens.consume_positional() {
            self.names.push(name);
        }
    }

    fn has_param_errors(&self) -> bool {
        self.pos.has_errors() || self.flags.has_errors() || self.gflags.has_errors()
    }

    /// Collect every parameter's error, in declaration order: positionals,
    /// then command flags, then global flags.
    fn collect_param_errors(&mut self) {
        let mut errors = Vec::new();
        for p in self
            .pos
            .params()
            .chain(self.flags.params())
            .chain(self.gflags.params())
        {
            if let Some(error) = &p.error {
                errors.push(DispatchError::Argument(error.clone()));
            }
        }
        self.errors.extend(errors);
    }
}

/// Controls which command runs, the flags and arguments it receives, and
/// the I/O it has access to.  Every part has a process-level default and
/// can be overridden, so whole invocations are testable in memory.
///
/// ### Example
/// ```
/// use std::io::Write;
///
/// use cmdtree::{Arg, Command, Context, Environment, Parameters};
///
/// #[derive(Default)]
/// struct Greet {
///     name: String,
/// }
///
/// impl Command for Greet {
///     fn setup(&mut self, params: &mut Parameters<'_, '_>) {
///         self.name = params.arg(Arg::new("name", "Who to greet."));
///     }
///
///     fn execute(&mut self, ctx: &mut Context<'_>) -> Result<(), Box<dyn std::error::Error>> {
///         writeln!(ctx.stdout(), "hello, {}", self.name)?;
///         Ok(())
///     }
/// }
///
/// let mut stdout: Vec<u8> = Vec::new();
/// let executed = Environment::new()
///     .name("greeter")
///     .args(vec!["greet", "world"])
///     .stdout(&mut stdout)
///     .run(|cmds| {
///         cmds.command("greet", "Print a greeting.", Greet::default());
///     })
///     .unwrap();
///
/// assert!(executed);
/// assert_eq!(String::from_utf8(stdout).unwrap(), "hello, world\n");
/// ```
pub struct Environment<'e> {
    name: Option<String>,
    args: Option<Vec<String>>,
    dynamic: Option<DynamicResolver<'e>>,
    lookup_env: Option<EnvLookup<'e>>,
    suggestion_distance: i32,
    stdin: Option<Box<dyn Read + 'e>>,
    stdout: Option<Box<dyn Write + 'e>>,
    stderr: Option<Box<dyn Write + 'e>>,
}

impl Default for Environment<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'e> Environment<'e> {
    /// An environment with every default in place: the process's name,
    /// arguments, environment variables, and stdio.
    pub fn new() -> Self {
        Self {
            name: None,
            args: None,
            dynamic: None,
            lookup_env: None,
            suggestion_distance: 0,
            stdin: None,
            stdout: None,
            stderr: None,
        }
    }

    /// Override the program name shown in usage output.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Override the raw argument list (the default is the process's
    /// arguments, program name excluded).
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = Some(args.into_iter().map(Into::into).collect());
        self
    }

    /// A fallback resolver consulted for flags with no command-line
    /// occurrence and no environment value.  If it errors, the error
    /// becomes that flag's parameter error and the resolver is not
    /// consulted again for the remainder of the dispatch.
    pub fn dynamic(
        mut self,
        resolver: impl FnMut(&str) -> Result<Vec<String>, Box<dyn std::error::Error>> + 'e,
    ) -> Self {
        self.dynamic = Some(Box::new(resolver));
        self
    }

    /// Override the environment variable lookup used for flags declared
    /// with [`Flag::env`].
    pub fn lookup_env(mut self, lookup: impl Fn(&str) -> Option<String> + 'e) -> Self {
        self.lookup_env = Some(Box::new(lookup));
        self
    }

    /// The maximum edit distance for command-name suggestions.  Zero means
    /// the default of 2; a negative distance disables suggestions.
    pub fn suggestion_distance(mut self, distance: i32) -> Self {
        self.suggestion_distance = distance;
        self
    }

    /// Override the input stream handed to executing commands.
    pub fn stdin(mut self, stdin: impl Read + 'e) -> Self {
        self.stdin = Some(Box::new(stdin));
        self
    }

    /// Override the output stream.  Usage and error reporting are written
    /// here as well.
    pub fn stdout(mut self, stdout: impl Write + 'e) -> Self {
        self.stdout = Some(Box::new(stdout));
        self
    }

    /// Override the error stream handed to executing commands.
    pub fn stderr(mut self, stderr: impl Write + 'e) -> Self {
        self.stderr = Some(Box::new(stderr));
        self
    }

    /// Build the command tree and dispatch it against the argument list.
    ///
    /// The closure is invoked afresh to declare the tree; the matched
    /// command's [`setup`](crate::Command::setup) then declares its
    /// parameters, and, when the whole invocation parses cleanly, its
    /// [`execute`](crate::Command::execute) runs.
    ///
    /// Returns:
    /// * `Ok(true)`: a command executed successfully, or help/summary
    ///   output was requested and printed;
    /// * `Ok(false)`: the invocation had a user-facing problem (unknown
    ///   command, bad arguments); usage and every collected error were
    ///   already written to the configured stdout;
    /// * `Err(error)`: the matched command's body ran and failed; the
    ///   error is passed through verbatim.
    pub fn run(
        self,
        build: impl FnOnce(&mut Commands<'_, 'e>),
    ) -> Result<bool, Box<dyn std::error::Error>> {
        let Environment {
            name,
            args,
            dynamic,
            lookup_env,
            suggestion_distance,
            stdin,
            stdout,
            stderr,
        } = self;

        let name = name.unwrap_or_else(default_name);
        let args = args.unwrap_or_else(|| std::env::args().skip(1).collect());
        let lookup_env =
            lookup_env.unwrap_or_else(|| Box::new(|var: &str| std::env::var(var).ok()));

        let mut st = RunState::new(name, args, dynamic, lookup_env);

        let mut commands = Commands::new(&mut st.gflags, &mut st.flag_guard, &mut st.tokens);
        build(&mut commands);
        let (children, root) = commands.finish();
        st.setup_flags();

        let mut stdin = stdin.unwrap_or_else(|| Box::new(std::io::stdin()));
        let mut stdout = stdout.unwrap_or_else(|| Box::new(std::io::stdout()));
        let mut stderr = stderr.unwrap_or_else(|| Box::new(std::io::stderr()));

        let mut dispatcher = Dispatcher {
            suggestion_distance,
            stdin: &mut *stdin,
            stdout: &mut *stdout,
            stderr: &mut *stderr,
        };

        dispatcher.dispatch_desc(
            &mut st,
            CmdDesc {
                name: String::new(),
                short: String::new(),
                long: String::new(),
                cmd: root,
                children,
            },
        )
    }
}

struct Dispatcher<'d, 'e> {
    suggestion_distance: i32,
    stdin: &'d mut (dyn Read + 'e),
    stdout: &'d mut (dyn Write + 'e),
    stderr: &'d mut (dyn Write + 'e),
}

impl<'d, 'e> Dispatcher<'d, 'e> {
    fn dispatch_desc(
        &mut self,
        st: &mut RunState<'e>,
        mut desc: CmdDesc<'e>,
    ) -> Result<bool, Box<dyn std::error::Error>> {
        // Match the next positional name token against the children.  A
        // peek error means a flag-shaped token is in front: not a name, so
        // matching stops and the current node resolves it during setup.
        let next = match st.tokens.peek_positional() {
            Ok(Some(token)) => Some(token.to_string()),
            _ => None,
        };
        if let Some(token) = next {
            if let Some(at) = desc.children.iter().position(|child| child.name == token) {
                #[cfg(feature = "tracing_debug")]
                {
                    debug!("matched command '{token}'.");
                }

                st.consume_name();
                let child = desc.children.remove(at);
                return self.dispatch_desc(st, child);
            }
        }

        if let Some(cmd) = desc.cmd.as_mut() {
            let mut params = Parameters::new(
                &mut st.tokens,
                &mut st.pos,
                &mut st.pos_guard,
                &mut st.flags,
                &mut st.flag_guard,
            );
            cmd.setup(&mut params);
        }

        if st.help {
            usage::print_usage(&mut *self.stdout, st, &desc);
            return Ok(true);
        }

        if st.summary {
            usage::print_summary(&mut *self.stdout, st, &desc);
            return Ok(true);
        }

        if st.has_param_errors() {
            st.collect_param_errors();
            usage::print_usage(&mut *self.stdout, st, &desc);
            return Ok(false);
        }

        // No command to execute: if a name token remains, the user named a
        // sub-command that does not exist.
        if desc.cmd.is_none() {
            if !desc.children.is_empty() {
                self.append_unknown_command(st, &desc.children);
            }
            usage::print_usage(&mut *self.stdout, st, &desc);
            return Ok(false);
        }

        match st.tokens.consume_remaining() {
            Err(error) => {
                st.errors
                    .push(DispatchError::Argument(ParamError::Resolve(error)));
                usage::print_usage(&mut *self.stdout, st, &desc);
                return Ok(false);
            }
            Ok(remaining) if !remaining.is_empty() => {
                st.errors.push(DispatchError::UnknownArguments(remaining));
                usage::print_usage(&mut *self.stdout, st, &desc);
                return Ok(false);
            }
            Ok(_) => {}
        }

        let mut ctx = Context::new(&mut *self.stdin, &mut *self.stdout, &mut *self.stderr);
        match desc.cmd.as_mut() {
            Some(cmd) => {
                cmd.execute(&mut ctx)?;
                Ok(true)
            }
            None => unreachable!("internal error - command presence checked above"),
        }
    }

    fn append_unknown_command(&mut self, st: &mut RunState<'e>, children: &[CmdDesc<'e>]) {
        let peeked = match st.tokens.peek_positional() {
            Ok(token) => Ok(token.map(str::to_string)),
            Err(error) => Err(error),
        };

        match peeked {
            Ok(Some(token)) => {
                let mut message = format!("'{token}'");
                if self.suggestion_distance >= 0 {
                    let distance = if self.suggestion_distance == 0 {
                        2
                    } else {
                        self.suggestion_distance as usize
                    };
                    let suggestions =
                        suggestions_for(&token, children.iter().map(|c| c.name.as_str()), distance);
                    if !suggestions.is_empty() {
                        message.push_str(". did you mean:");
                        for suggestion in &suggestions {
                            message.push_str("\n\t\t");
                            message.push_str(suggestion);
                        }
                    }
                }
                st.errors.push(DispatchError::UnknownCommand(message));
            }
            Ok(None) => {}
            Err(error) => st
                .errors
                .push(DispatchError::Argument(ParamError::Resolve(error))),
        }
    }
}

fn default_name() -> String {
    std::env::args()
        .next()
        .and_then(|arg0| {
            std::path::Path::new(&arg0)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "program".to_string())
}
