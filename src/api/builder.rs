use std::any::TypeId;

use crate::params::{FlagDefault, ParamInfo};
use crate::transform::{short_type_name, Pipeline};

/// The declaration of one flag: a named parameter supplied as
/// `--name [value]`, `-short [value]`, or `--name=value`.
///
/// A `Flag` starts at the raw token string; conversion steps appended with
/// [`Flag::parse`] and [`Flag::map`] move it to its final type `T`.  Hand
/// the finished declaration to one of the [`Parameters`](crate::Parameters)
/// flag methods, which picks the arity and returns the typed value.
///
/// ### Example
/// ```
/// use cmdtree::Flag;
///
/// let declaration = Flag::new("jobs", "Number of parallel jobs.")
///     .short('j')
///     .env("APP_JOBS")
///     .parse::<u32>()
///     .default(4);
/// ```
pub struct Flag<T> {
    pub(crate) info: ParamInfo,
    pub(crate) pipeline: Pipeline<T>,
    pub(crate) default: FlagDefault<T>,
}

impl Flag<String> {
    /// Declare a flag.  Without conversion steps its value type is `String`.
    pub fn new(name: impl Into<String>, desc: impl Into<String>) -> Self {
        Self {
            info: ParamInfo::new(name, desc),
            pipeline: Pipeline::identity(),
            default: FlagDefault::Unset,
        }
    }

    /// Append a `FromStr` conversion, moving the flag to type `U`.
    /// Only available before any other conversion step.
    pub fn parse<U>(self) -> Flag<U>
    where
        U: std::str::FromStr + 'static,
    {
        let Flag {
            info,
            pipeline,
            default,
        } = self;
        let default = carry_default(default, &info.name);
        Flag {
            info,
            pipeline: pipeline.parsed(),
            default,
        }
    }
}

impl<T: 'static> Flag<T> {
    /// Allow the flag to be supplied by a single character, e.g. `-j`.
    pub fn short(mut self, short: char) -> Self {
        self.info.short = Some(short);
        self
    }

    /// Consult this environment variable when the flag has no command-line
    /// occurrence.
    pub fn env(mut self, var: impl Into<String>) -> Self {
        self.info.env_var = Some(var.into());
        self
    }

    /// Hide the flag from usage output unless `--advanced` is given.
    pub fn advanced(mut self) -> Self {
        self.info.advanced = true;
        self
    }

    /// Parse the flag but never show it in usage output.
    pub fn hidden(mut self) -> Self {
        self.info.hidden = true;
        self
    }

    /// Mark the flag boolean-style: its presence alone yields the literal
    /// `"true"`, never claiming the following token as a value.
    pub fn boolean(mut self) -> Self {
        self.info.boolean = true;
        self
    }

    /// Override the type name shown in usage output.
    pub fn type_name(mut self, label: impl Into<String>) -> Self {
        self.info.type_label = Some(label.into());
        self
    }

    /// Make absence of the flag a reported user error.
    pub fn required(mut self) -> Self {
        self.default = FlagDefault::Required;
        self
    }

    /// The value to use when the flag is absent, bypassing the conversion
    /// steps.  Must be set after all conversion steps.
    pub fn default(mut self, value: T) -> Self
    where
        T: std::fmt::Display,
    {
        self.info.default_display = Some(value.to_string());
        self.default = FlagDefault::Value(value);
        self
    }

    /// Append an arbitrary conversion step, moving the flag to type `U`.
    pub fn map<U, F, E>(self, step: F) -> Flag<U>
    where
        U: 'static,
        F: Fn(T) -> Result<U, E> + 'static,
        E: std::fmt::Display,
    {
        let Flag {
            info,
            pipeline,
            default,
        } = self;
        let default = carry_default(default, &info.name);
        Flag {
            info,
            pipeline: pipeline.then(step),
            default,
        }
    }

    pub(crate) fn into_parts(mut self) -> (ParamInfo, Pipeline<T>, FlagDefault<T>) {
        if self.info.type_label.is_none() && TypeId::of::<T>() != TypeId::of::<bool>() {
            self.info.type_label = Some(short_type_name::<T>().to_string());
        }
        (self.info, self.pipeline, self.default)
    }
}

/// The declaration of one positional argument, supplied by position among
/// the non-flag tokens.
///
/// ### Example
/// ```
/// use cmdtree::Arg;
///
/// let declaration = Arg::new("count", "How many times to run.").parse::<u32>();
/// ```
pub struct Arg<T> {
    pub(crate) info: ParamInfo,
    pub(crate) pipeline: Pipeline<T>,
}

impl Arg<String> {
    /// Declare a positional argument.  Without conversion steps its value
    /// type is `String`.
    pub fn new(name: impl Into<String>, desc: impl Into<String>) -> Self {
        Self {
            info: ParamInfo::new(name, desc),
            pipeline: Pipeline::identity(),
        }
    }

    /// Append a `FromStr` conversion, moving the argument to type `U`.
    /// Only available before any other conversion step.
    pub fn parse<U>(self) -> Arg<U>
    where
        U: std::str::FromStr + 'static,
    {
        let Arg { info, pipeline } = self;
        Arg {
            info,
            pipeline: pipeline.parsed(),
        }
    }
}

impl<T: 'static> Arg<T> {
    /// Override the type name shown in usage output.
    pub fn type_name(mut self, label: impl Into<String>) -> Self {
        self.info.type_label = Some(label.into());
        self
    }

    /// Append an arbitrary conversion step, moving the argument to type `U`.
    pub fn map<U, F, E>(self, step: F) -> Arg<U>
    where
        U: 'static,
        F: Fn(T) -> Result<U, E> + 'static,
        E: std::fmt::Display,
    {
        let Arg { info, pipeline } = self;
        Arg {
            info,
            pipeline: pipeline.then(step),
        }
    }

    pub(crate) fn into_parts(mut self) -> (ParamInfo, Pipeline<T>) {
        if self.info.type_label.is_none() && TypeId::of::<T>() != TypeId::of::<bool>() {
            self.info.type_label = Some(short_type_name::<T>().to_string());
        }
        (self.info, self.pipeline)
    }
}

fn carry_default<T, U>(default: FlagDefault<T>, name: &str) -> FlagDefault<U> {
    match default {
        FlagDefault::Unset => FlagDefault::Unset,
        FlagDefault::Required => FlagDefault::Required,
        FlagDefault::Value(_) => {
            panic!("default for '{name}' must be set after all conversion steps")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Arity;

    #[test]
    fn flag_declaration_shape() {
        let (info, pipeline, default) = Flag::new("jobs", "Number of parallel jobs.")
            .short('j')
            .env("APP_JOBS")
            .parse::<u32>()
            .default(4)
            .into_parts();

        assert_eq!(info.name, "jobs");
        assert_eq!(info.desc, "Number of parallel jobs.");
        assert_eq!(info.short, Some('j'));
        assert_eq!(info.env_var.as_deref(), Some("APP_JOBS"));
        assert_eq!(info.type_label.as_deref(), Some("u32"));
        assert_eq!(info.default_display.as_deref(), Some("4"));
        assert_eq!(info.arity, Arity::Single);
        assert_eq!(pipeline.apply("7").unwrap(), 7);
        assert_matches!(default, FlagDefault::Value(4));
    }

    #[test]
    fn boolean_flags_hide_their_type() {
        let (info, _, _) = Flag::new("verbose", "").boolean().parse::<bool>().into_parts();
        assert!(info.boolean);
        assert_eq!(info.type_label, None);
    }

    #[test]
    fn explicit_type_name_wins() {
        let (info, _, _) = Flag::new("count", "")
            .parse::<u32>()
            .type_name("threads")
            .into_parts();
        assert_eq!(info.type_label.as_deref(), Some("threads"));
    }

    #[test]
    fn mapped_arg() {
        let (info, pipeline) = Arg::new("size", "")
            .parse::<u32>()
            .map(|n| -> Result<u64, std::num::TryFromIntError> { Ok(u64::from(n) * 2) })
            .into_parts();

        assert_eq!(info.type_label.as_deref(), Some("u64"));
        assert_eq!(pipeline.apply("21").unwrap(), 42);
    }

    #[test]
    #[should_panic(expected = "default for 'jobs' must be set after all conversion steps")]
    fn default_before_conversion_aborts() {
        let _ = Flag::new("jobs", "").default("4".to_string()).parse::<u32>();
    }
}
