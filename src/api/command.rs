use crate::api::builder::Flag;
use crate::api::parameters::Parameters;
use crate::context::Context;
use crate::params::{DeclGuard, FlagRegistry};
use crate::tokens::TokenStore;

/// An executable command in the tree.
///
/// [`Command::setup`] runs once the command has been matched, and is where
/// the command declares its flags and arguments; store the returned values
/// for the upcoming [`Command::execute`] call.  `execute` runs only when the
/// whole invocation parsed cleanly, and its error is handed back from
/// [`Environment::run`](crate::Environment::run) verbatim.
pub trait Command {
    /// Declare the command's parameters and capture their values.
    fn setup(&mut self, params: &mut Parameters<'_, '_>);

    /// Run the command.
    fn execute(&mut self, ctx: &mut Context<'_>) -> Result<(), Box<dyn std::error::Error>>;
}

pub(crate) struct CmdDesc<'e> {
    pub(crate) name: String,
    pub(crate) short: String,
    pub(crate) long: String,
    pub(crate) cmd: Option<Box<dyn Command + 'e>>,
    pub(crate) children: Vec<CmdDesc<'e>>,
}

/// The command tree under construction.
///
/// The tree-building closure passed to
/// [`Environment::run`](crate::Environment::run) receives a `Commands` and
/// declares the whole tree in one place:
///
/// ```no_run
/// # use cmdtree::{Commands, Command, Context, Parameters};
/// # struct Copy;
/// # impl Command for Copy {
/// #     fn setup(&mut self, _: &mut Parameters<'_, '_>) {}
/// #     fn execute(&mut self, _: &mut Context<'_>) -> Result<(), Box<dyn std::error::Error>> { Ok(()) }
/// # }
/// # fn build(cmds: &mut Commands<'_, '_>) {
/// cmds.group("files", "Commands related to files", |cmds| {
///     cmds.command("copy", "Copy a file", Copy);
/// });
/// # }
/// ```
///
/// `Commands` also declares global flags (visible at every level of the
/// dispatch) and the optional root command executed when no sub-command is
/// named.  The closure is invoked afresh on every `run`.
pub struct Commands<'s, 'e> {
    cur: Vec<CmdDesc<'e>>,
    root: Option<Box<dyn Command + 'e>>,
    gflags: &'s mut FlagRegistry,
    guard: &'s mut DeclGuard,
    tokens: &'s mut TokenStore<'e>,
}

impl<'s, 'e> Commands<'s, 'e> {
    pub(crate) fn new(
        gflags: &'s mut FlagRegistry,
        guard: &'s mut DeclGuard,
        tokens: &'s mut TokenStore<'e>,
    ) -> Self {
        Self {
            cur: Vec::new(),
            root: None,
            gflags,
            guard,
            tokens,
        }
    }

    /// Add a command under the current group.
    ///
    /// The description's first line is the short help shown in listings; any
    /// further lines (dedented) become the long help shown on the command's
    /// own usage page.
    pub fn command(
        &mut self,
        name: impl Into<String>,
        desc: impl Into<String>,
        cmd: impl Command + 'e,
    ) {
        let (short, long) = parse_desc(&desc.into());
        self.cur.push(CmdDesc {
            name: name.into(),
            short,
            long,
            cmd: Some(Box::new(cmd)),
            children: Vec::new(),
        });
    }

    /// Add a group of commands.  Commands declared inside the closure nest
    /// under the group's name.  A group with no command of its own cannot be
    /// executed; invoking it prints its usage.
    pub fn group(
        &mut self,
        name: impl Into<String>,
        desc: impl Into<String>,
        children: impl FnOnce(&mut Self),
    ) {
        let saved = std::mem::take(&mut self.cur);
        children(self);
        let collected = std::mem::replace(&mut self.cur, saved);
        self.cur.push(CmdDesc {
            name: name.into(),
            short: desc.into(),
            long: String::new(),
            cmd: None,
            children: collected,
        });
    }

    /// Set the command executed when the invocation names no sub-command.
    pub fn root(&mut self, cmd: impl Command + 'e) {
        self.root = Some(Box::new(cmd));
    }

    /// Declare a global flag binding exactly one value.  Global flags are
    /// resolved while the tree is built and stay visible to every level of
    /// the dispatch.
    pub fn flag<T: Default + 'static>(&mut self, flag: Flag<T>) -> T {
        let (info, pipeline, default) = flag.into_parts();
        self.gflags
            .declare(self.guard, self.tokens, info, pipeline, default)
    }

    /// Declare a global flag whose absence is meaningful.
    pub fn flag_optional<T: 'static>(&mut self, flag: Flag<T>) -> Option<T> {
        let (info, pipeline, default) = flag.into_parts();
        self.gflags
            .declare_optional(self.guard, self.tokens, info, pipeline, default)
    }

    /// Declare a global flag that may repeat.
    pub fn flag_repeated<T: 'static>(&mut self, flag: Flag<T>) -> Vec<T> {
        let (info, pipeline, default) = flag.into_parts();
        self.gflags
            .declare_repeated(self.guard, self.tokens, info, pipeline, default)
    }

    /// Insert a blank line between global flags in the usage listing.
    pub fn separator(&mut self) {
        self.gflags.separator();
    }

    pub(crate) fn finish(self) -> (Vec<CmdDesc<'e>>, Option<Box<dyn Command + 'e>>) {
        (self.cur, self.root)
    }
}

/// Split a command description into its short and long help: the first line
/// is the short help, the dedented remainder the long help.
fn parse_desc(desc: &str) -> (String, String) {
    let desc = desc.trim();
    match desc.split_once('\n') {
        None => (desc.to_string(), String::new()),
        Some((first, rest)) => {
            let short = first.trim().to_string();
            let lines: Vec<&str> = rest.split('\n').collect();

            let mut min_indent: Option<usize> = None;
            for line in &lines {
                if line.trim().is_empty() {
                    continue;
                }
                let indent = line.len()
                    - line
                        .trim_start_matches(|c| c == ' ' || c == '\t')
                        .len();
                min_indent = Some(min_indent.map_or(indent, |m| m.min(indent)));
            }

            let min_indent = min_indent.unwrap_or(0);
            let long = lines
                .iter()
                .map(|line| {
                    if line.trim().is_empty() {
                        ""
                    } else {
                        &line[min_indent..]
                    }
                })
                .collect::<Vec<&str>>()
                .join("\n");

            (short, long.trim().to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    impl Command for Noop {
        fn setup(&mut self, _params: &mut Parameters<'_, '_>) {}

        fn execute(&mut self, _ctx: &mut Context<'_>) -> Result<(), Box<dyn std::error::Error>> {
            Ok(())
        }
    }

    fn fixture() -> (FlagRegistry, DeclGuard, TokenStore<'static>) {
        (
            FlagRegistry::default(),
            DeclGuard::default(),
            TokenStore::new(Vec::new(), None, Box::new(|_| None)),
        )
    }

    fn shape(descs: &[CmdDesc<'_>]) -> Vec<(String, Vec<String>)> {
        descs
            .iter()
            .map(|d| {
                (
                    d.name.clone(),
                    d.children.iter().map(|c| c.name.clone()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn collect_nested_groups() {
        // Setup
        let (mut gflags, mut guard, mut tokens) = fixture();
        let mut cmds = Commands::new(&mut gflags, &mut guard, &mut tokens);

        // Execute
        cmds.command("foo0", "foo0", Noop);
        cmds.group("bar", "bar", |cmds| {
            cmds.command("bar0", "bar0", Noop);
            cmds.command("bar1", "bar1", Noop);
            cmds.group("baz", "baz", |cmds| {
                cmds.command("baz0", "baz0", Noop);
            });
            cmds.command("bar2", "bar2", Noop);
        });
        cmds.command("foo1", "foo1", Noop);
        let (descs, root) = cmds.finish();

        // Verify
        assert!(root.is_none());
        assert_eq!(
            shape(&descs),
            vec![
                ("foo0".to_string(), vec![]),
                (
                    "bar".to_string(),
                    vec![
                        "bar0".to_string(),
                        "bar1".to_string(),
                        "baz".to_string(),
                        "bar2".to_string(),
                    ]
                ),
                ("foo1".to_string(), vec![]),
            ]
        );
        assert!(descs[1].cmd.is_none());
        assert!(descs[0].cmd.is_some());
    }

    #[test]
    fn global_flags_resolve_during_build() {
        let mut gflags = FlagRegistry::default();
        let mut guard = DeclGuard::default();
        let mut tokens = TokenStore::new(
            vec!["--verbose".to_string(), "cmd".to_string()],
            None,
            Box::new(|_| None),
        );
        let mut cmds = Commands::new(&mut gflags, &mut guard, &mut tokens);

        let verbose: bool =
            cmds.flag(Flag::new("verbose", "").boolean().parse::<bool>());

        assert!(verbose);
    }

    #[test]
    fn parse_desc_single_line() {
        assert_eq!(
            parse_desc("Copy a file"),
            ("Copy a file".to_string(), String::new())
        );
    }

    #[test]
    fn parse_desc_dedents_long_help() {
        let (short, long) = parse_desc(
            "Copy a file

            The copy is performed remotely.
              Indented detail survives relative to the margin.",
        );
        assert_eq!(short, "Copy a file");
        assert_eq!(
            long,
            "The copy is performed remotely.\n  Indented detail survives relative to the margin."
        );
    }
}
