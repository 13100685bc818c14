//! `cmdtree` is a library for building tree-structured command line
//! interfaces in Rust.
//!
//! Although other crates provide command line parser functionality, we have
//! found they prioritize different concerns than those we are interested in.
//! `cmdtree` attempts to prioritize the following design concerns:
//! * *Discoverable command definitions*:
//! The whole command tree is declared in the same call that dispatches it,
//! in one place.  There is no grammar registered up front, no state mutated
//! across files.
//! * *Declare-at-invocation parameters*:
//! A command declares its flags and arguments in its own
//! [`Command::setup`], at the moment it is matched, and each declaration
//! immediately returns the typed value.  The state a command inspects lives
//! on the command itself.
//! * *Typed, composable conversions*:
//! Declarations move from the raw token string to their final type through
//! [`Flag::parse`]/[`Flag::map`] chains checked by the compiler.
//! * *Every problem at once*:
//! All of an invocation's input errors are collected and reported together
//! with the usage text, rather than one at a time.  A mistyped sub-command
//! name is answered with edit-distance suggestions.
//! * *Testable from the outside*:
//! The [`Environment`] owns every process default (name, arguments,
//! environment lookup, stdio), and each can be replaced with an in-memory
//! stand-in.
//!
//! # Usage
//!
//! ```
//! use std::io::Write;
//!
//! use cmdtree::{Arg, Command, Context, Environment, Flag, Parameters};
//!
//! #[derive(Default)]
//! struct Sum {
//!     items: Vec<u32>,
//!     verbose: bool,
//! }
//!
//! impl Command for Sum {
//!     fn setup(&mut self, params: &mut Parameters<'_, '_>) {
//!         self.verbose = params.flag(
//!             Flag::new("verbose", "Print detail.").short('v').boolean().parse::<bool>(),
//!         );
//!         self.items = params.arg_repeated(Arg::new("item", "The items to sum.").parse::<u32>());
//!     }
//!
//!     fn execute(&mut self, ctx: &mut Context<'_>) -> Result<(), Box<dyn std::error::Error>> {
//!         let total: u32 = self.items.iter().sum();
//!         if self.verbose {
//!             writeln!(ctx.stdout(), "{} items", self.items.len())?;
//!         }
//!         writeln!(ctx.stdout(), "Sum: {total}")?;
//!         Ok(())
//!     }
//! }
//!
//! let mut stdout: Vec<u8> = Vec::new();
//! let executed = Environment::new()
//!     .name("summer")
//!     .args(vec!["sum", "1", "2", "3"])
//!     .stdout(&mut stdout)
//!     .run(|cmds| {
//!         cmds.command("sum", "Sum the given items.", Sum::default());
//!     })
//!     .unwrap();
//!
//! assert!(executed);
//! assert_eq!(String::from_utf8(stdout).unwrap(), "Sum: 6\n");
//! ```
//!
//! # Sub-commands
//!
//! Nest commands with [`Commands::group`]; groups match by exact name, level
//! by level.  A mistyped name prints the group's usage along with
//! suggestions.  The built-in global flags `--help`/`-h`, `--summary`, and
//! `--advanced` are available at every level, and [`Commands`] lets the
//! tree-building closure declare its own global flags alongside them.
//!
//! # Results
//!
//! [`Environment::run`] returns `Ok(true)` when a command executed (or help
//! was printed), `Ok(false)` when the invocation had a user-facing problem
//! that was already reported, and `Err` only when the executed command body
//! itself failed.
#![deny(missing_docs)]
mod api;
mod context;
mod model;
mod params;
mod parser;
mod tokens;
mod transform;

pub use api::{Arg, Command, Commands, Flag, Parameters};
pub use context::Context;
pub use parser::Environment;

#[cfg(test)]
#[macro_use]
extern crate assert_matches;
