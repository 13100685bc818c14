mod builder;
mod command;
mod parameters;

pub use builder::{Arg, Flag};
pub use command::{Command, Commands};
pub use parameters::Parameters;

pub(crate) use command::CmdDesc;
