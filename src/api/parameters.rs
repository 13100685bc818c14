use crate::api::builder::{Arg, Flag};
use crate::params::{DeclGuard, FlagRegistry, PositionalRegistry};
use crate::tokens::TokenStore;

/// The declaration surface handed to [`Command::setup`](crate::Command::setup).
///
/// Each call declares one parameter and immediately returns its typed value;
/// the arity is picked by the method: `flag`/`arg` return `T`,
/// `flag_optional`/`arg_optional` return `Option<T>`, and
/// `flag_repeated`/`arg_repeated` return `Vec<T>`.
///
/// Problems with the user's input (a missing required flag, a failed
/// conversion) are not raised here: they are recorded against the parameter
/// and reported together once the whole command has been configured.  The
/// value returned in the meantime is the type's `Default`.
///
/// Problems with the declarations themselves (duplicate names, a required
/// argument after an optional one, a flag declared after an argument) are
/// bugs in command-definition code and panic immediately.
pub struct Parameters<'s, 'e> {
    tokens: &'s mut TokenStore<'e>,
    pos: &'s mut PositionalRegistry,
    pos_guard: &'s mut DeclGuard,
    flags: &'s mut FlagRegistry,
    flag_guard: &'s mut DeclGuard,
    saw_arg: bool,
}

impl<'s, 'e> Parameters<'s, 'e> {
    pub(crate) fn new(
        tokens: &'s mut TokenStore<'e>,
        pos: &'s mut PositionalRegistry,
        pos_guard: &'s mut DeclGuard,
        flags: &'s mut FlagRegistry,
        flag_guard: &'s mut DeclGuard,
    ) -> Self {
        Self {
            tokens,
            pos,
            pos_guard,
            flags,
            flag_guard,
            saw_arg: false,
        }
    }

    fn flags_precede_args(&self, name: &str) {
        if self.saw_arg {
            panic!("all flags must be declared before any arguments: '{name}'");
        }
    }

    /// Declare a flag binding exactly one value.
    ///
    /// Absent on the command line, the flag yields its declared default,
    /// `T::default()` when no default was declared, or, if declared
    /// [`required`](Flag::required), a reported error.
    pub fn flag<T: Default + 'static>(&mut self, flag: Flag<T>) -> T {
        self.flags_precede_args(&flag.info.name);
        let (info, pipeline, default) = flag.into_parts();
        self.flags
            .declare(self.flag_guard, self.tokens, info, pipeline, default)
    }

    /// Declare a flag whose absence is meaningful: `None` when never
    /// supplied, `Some(value)` otherwise.
    pub fn flag_optional<T: 'static>(&mut self, flag: Flag<T>) -> Option<T> {
        self.flags_precede_args(&flag.info.name);
        let (info, pipeline, default) = flag.into_parts();
        self.flags
            .declare_optional(self.flag_guard, self.tokens, info, pipeline, default)
    }

    /// Declare a flag that may repeat; every occurrence's value is returned
    /// in occurrence order.
    pub fn flag_repeated<T: 'static>(&mut self, flag: Flag<T>) -> Vec<T> {
        self.flags_precede_args(&flag.info.name);
        let (info, pipeline, default) = flag.into_parts();
        self.flags
            .declare_repeated(self.flag_guard, self.tokens, info, pipeline, default)
    }

    /// Insert a blank line between flags in the usage listing.
    pub fn separator(&mut self) {
        self.flags_precede_args("separator");
        self.flags.separator();
    }

    /// Declare a required positional argument.
    pub fn arg<T: Default + 'static>(&mut self, arg: Arg<T>) -> T {
        self.saw_arg = true;
        let (info, pipeline) = arg.into_parts();
        self.pos.declare(self.pos_guard, self.tokens, info, pipeline)
    }

    /// Declare an optional positional argument.  Must come after every
    /// required argument.
    pub fn arg_optional<T: 'static>(&mut self, arg: Arg<T>) -> Option<T> {
        self.saw_arg = true;
        let (info, pipeline) = arg.into_parts();
        self.pos
            .declare_optional(self.pos_guard, self.tokens, info, pipeline)
    }

    /// Declare a repeated positional argument consuming every remaining
    /// positional token.  Must come last.
    pub fn arg_repeated<T: 'static>(&mut self, arg: Arg<T>) -> Vec<T> {
        self.saw_arg = true;
        let (info, pipeline) = arg.into_parts();
        self.pos
            .declare_repeated(self.pos_guard, self.tokens, info, pipeline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        tokens: TokenStore<'static>,
        pos: PositionalRegistry,
        pos_guard: DeclGuard,
        flags: FlagRegistry,
        flag_guard: DeclGuard,
    }

    impl Fixture {
        fn new(args: Vec<&str>) -> Self {
            Self {
                tokens: TokenStore::new(
                    args.into_iter().map(String::from).collect(),
                    None,
                    Box::new(|_| None),
                ),
                pos: PositionalRegistry::default(),
                pos_guard: DeclGuard::default(),
                flags: FlagRegistry::default(),
                flag_guard: DeclGuard::default(),
            }
        }

        fn params(&mut self) -> Parameters<'_, 'static> {
            Parameters::new(
                &mut self.tokens,
                &mut self.pos,
                &mut self.pos_guard,
                &mut self.flags,
                &mut self.flag_guard,
            )
        }
    }

    #[test]
    fn typed_declarations() {
        // Setup
        let mut fixture = Fixture::new(vec!["input.txt", "--jobs", "8", "-v", "10", "20"]);
        let mut params = fixture.params();

        // Execute
        let jobs: u32 = params.flag(Flag::new("jobs", "").short('j').parse::<u32>().default(1));
        let verbose: bool = params.flag(Flag::new("verbose", "").short('v').boolean().parse::<bool>());
        let missing: Option<String> = params.flag_optional(Flag::new("label", ""));
        let path: String = params.arg(Arg::new("path", ""));
        let sizes: Vec<u32> = params.arg_repeated(Arg::new("size", "").parse::<u32>());

        // Verify
        assert_eq!(jobs, 8);
        assert!(verbose);
        assert_eq!(missing, None);
        assert_eq!(path, "input.txt");
        assert_eq!(sizes, vec![10, 20]);
        assert!(!fixture.pos.has_errors());
        assert!(!fixture.flags.has_errors());
    }

    #[test]
    #[should_panic(expected = "all flags must be declared before any arguments: 'late'")]
    fn flag_after_arg_aborts() {
        let mut fixture = Fixture::new(vec!["value"]);
        let mut params = fixture.params();

        let _: String = params.arg(Arg::new("first", ""));
        let _: String = params.flag(Flag::new("late", ""));
    }
}
