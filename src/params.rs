use std::collections::HashSet;

use thiserror::Error;

use crate::model::Arity;
use crate::tokens::{ArgError, TokenStore};
use crate::transform::{Pipeline, StepError};

/// A user-input problem resolving or converting one declared parameter.
/// Accumulated on the parameter, never thrown: all of an invocation's
/// problems are reported together.
#[derive(Debug, Clone, Error)]
pub(crate) enum ParamError {
    #[error("{name}: required flag missing")]
    RequiredFlag { name: String },

    #[error("{name}: required argument missing")]
    RequiredArg { name: String },

    #[error("{name}: {source}")]
    Convert { name: String, source: StepError },

    #[error(transparent)]
    Resolve(#[from] ArgError),
}

/// What a flag yields when it never occurs.
#[derive(Debug)]
pub(crate) enum FlagDefault<T> {
    /// No default: the type's zero value, without error.
    Unset,
    /// An explicit fallback, returned without running the transform chain.
    Value(T),
    /// Absence is a user-input error.
    Required,
}

/// The type-erased descriptor of one declared parameter, kept for usage
/// rendering and error collection after the typed value has been returned
/// to the caller.
#[derive(Debug)]
pub(crate) struct ParamInfo {
    pub(crate) name: String,
    pub(crate) desc: String,
    pub(crate) short: Option<char>,
    pub(crate) arity: Arity,
    pub(crate) boolean: bool,
    pub(crate) advanced: bool,
    pub(crate) hidden: bool,
    pub(crate) env_var: Option<String>,
    pub(crate) type_label: Option<String>,
    pub(crate) required: bool,
    pub(crate) default_display: Option<String>,
    pub(crate) error: Option<ParamError>,
}

impl ParamInfo {
    pub(crate) fn new(name: impl Into<String>, desc: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            desc: desc.into(),
            short: None,
            arity: Arity::Single,
            boolean: false,
            advanced: false,
            hidden: false,
            env_var: None,
            type_label: None,
            required: false,
            default_display: None,
            error: None,
        }
    }
}

/// Declaration-time uniqueness guard for parameter names and short letters.
/// Violations are bugs in command-definition code, so they abort loudly.
#[derive(Default)]
pub(crate) struct DeclGuard {
    names: HashSet<String>,
    shorts: HashSet<char>,
}

impl DeclGuard {
    pub(crate) fn claim(&mut self, name: &str, short: Option<char>) {
        if !self.names.insert(name.to_string()) {
            panic!("parameter already declared with name: '{name}'");
        }
        if let Some(short) = short {
            if !self.shorts.insert(short) {
                panic!("parameter already declared with short name: '{short}'");
            }
        }
    }
}

/// Ordered flag descriptors for one registry (per-command or global).
/// A `None` entry is a separator line in the usage listing.
#[derive(Default)]
pub(crate) struct FlagRegistry {
    list: Vec<Option<ParamInfo>>,
}

impl FlagRegistry {
    pub(crate) fn separator(&mut self) {
        self.list.push(None);
    }

    pub(crate) fn has_errors(&self) -> bool {
        self.params().any(|p| p.error.is_some())
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = &Option<ParamInfo>> {
        self.list.iter()
    }

    pub(crate) fn params(&self) -> impl Iterator<Item = &ParamInfo> {
        self.list.iter().flatten()
    }

    pub(crate) fn count(&self) -> usize {
        self.params().count()
    }

    pub(crate) fn declare<T: Default + 'static>(
        &mut self,
        guard: &mut DeclGuard,
        tokens: &mut TokenStore<'_>,
        mut info: ParamInfo,
        pipeline: Pipeline<T>,
        default: FlagDefault<T>,
    ) -> T {
        guard.claim(&info.name, info.short);
        info.arity = Arity::Single;
        info.required = matches!(default, FlagDefault::Required);

        let value = match resolve_values(tokens, &info) {
            Err(error) => {
                info.error = Some(error);
                T::default()
            }
            Ok(None) => match default {
                FlagDefault::Required => {
                    info.error = Some(ParamError::RequiredFlag {
                        name: info.name.clone(),
                    });
                    T::default()
                }
                FlagDefault::Value(value) => value,
                FlagDefault::Unset => T::default(),
            },
            Ok(Some(values)) => match pipeline.apply(&values[0]) {
                Ok(value) => value,
                Err(source) => {
                    info.error = Some(ParamError::Convert {
                        name: info.name.clone(),
                        source,
                    });
                    T::default()
                }
            },
        };

        self.list.push(Some(info));
        value
    }

    pub(crate) fn declare_optional<T: 'static>(
        &mut self,
        guard: &mut DeclGuard,
        tokens: &mut TokenStore<'_>,
        mut info: ParamInfo,
        pipeline: Pipeline<T>,
        default: FlagDefault<T>,
    ) -> Option<T> {
        guard.claim(&info.name, info.short);
        info.arity = Arity::Optional;
        match default {
            FlagDefault::Unset => {}
            FlagDefault::Required => panic!("optional flag cannot be required: '{}'", info.name),
            FlagDefault::Value(_) => panic!("optional flag cannot have a default: '{}'", info.name),
        }

        let value = match resolve_values(tokens, &info) {
            Err(error) => {
                info.error = Some(error);
                None
            }
            Ok(None) => None,
            Ok(Some(values)) => match pipeline.apply(&values[0]) {
                Ok(value) => Some(value),
                Err(source) => {
                    info.error = Some(ParamError::Convert {
                        name: info.name.clone(),
                        source,
                    });
                    None
                }
            },
        };

        self.list.push(Some(info));
        value
    }

    pub(crate) fn declare_repeated<T: 'static>(
        &mut self,
        guard: &mut DeclGuard,
        tokens: &mut TokenStore<'_>,
        mut info: ParamInfo,
        pipeline: Pipeline<T>,
        default: FlagDefault<T>,
    ) -> Vec<T> {
        guard.claim(&info.name, info.short);
        info.arity = Arity::Repeated;
        if matches!(default, FlagDefault::Value(_)) {
            panic!("repeated flag cannot have a default: '{}'", info.name);
        }
        info.required = matches!(default, FlagDefault::Required);

        let value = match resolve_values(tokens, &info) {
            Err(error) => {
                info.error = Some(error);
                Vec::new()
            }
            Ok(None) => {
                if info.required {
                    info.error = Some(ParamError::RequiredFlag {
                        name: info.name.clone(),
                    });
                }
                Vec::new()
            }
            Ok(Some(values)) => match apply_each(&pipeline, &values) {
                Ok(values) => values,
                Err(source) => {
                    info.error = Some(ParamError::Convert {
                        name: info.name.clone(),
                        source,
                    });
                    Vec::new()
                }
            },
        };

        self.list.push(Some(info));
        value
    }
}

/// Ordered positional descriptors, with the declaration-order invariants:
/// no required argument after an optional one, nothing after a repeated one.
#[derive(Default)]
pub(crate) struct PositionalRegistry {
    list: Vec<ParamInfo>,
    saw_optional: bool,
    saw_repeated: bool,
}

impl PositionalRegistry {
    pub(crate) fn has_errors(&self) -> bool {
        self.params().any(|p| p.error.is_some())
    }

    pub(crate) fn params(&self) -> impl Iterator<Item = &ParamInfo> {
        self.list.iter()
    }

    fn order_check(&mut self, name: &str, arity: Arity) {
        if self.saw_repeated {
            panic!("argument after repeated argument: '{name}'");
        }
        if self.saw_optional && arity == Arity::Single {
            panic!("required argument after optional arguments: '{name}'");
        }
        match arity {
            Arity::Optional => self.saw_optional = true,
            Arity::Repeated => self.saw_repeated = true,
            Arity::Single => {}
        }
    }

    pub(crate) fn declare<T: Default + 'static>(
        &mut self,
        guard: &mut DeclGuard,
        tokens: &mut TokenStore<'_>,
        mut info: ParamInfo,
        pipeline: Pipeline<T>,
    ) -> T {
        guard.claim(&info.name, None);
        info.arity = Arity::Single;
        info.required = true;
        self.order_check(&info.name, Arity::Single);

        let value = match tokens.consume_positional() {
            Err(error) => {
                info.error = Some(ParamError::from(error));
                T::default()
            }
            Ok(None) => {
                info.error = Some(ParamError::RequiredArg {
                    name: info.name.clone(),
                });
                T::default()
            }
            Ok(Some(token)) => match pipeline.apply(&token) {
                Ok(value) => value,
                Err(source) => {
                    info.error = Some(ParamError::Convert {
                        name: info.name.clone(),
                        source,
                    });
                    T::default()
                }
            },
        };

        self.list.push(info);
        value
    }

    pub(crate) fn declare_optional<T: 'static>(
        &mut self,
        guard: &mut DeclGuard,
        tokens: &mut TokenStore<'_>,
        mut info: ParamInfo,
        pipeline: Pipeline<T>,
    ) -> Option<T> {
        guard.claim(&info.name, None);
        info.arity = Arity::Optional;
        self.order_check(&info.name, Arity::Optional);

        let value = match tokens.consume_positional() {
            Err(error) => {
                info.error = Some(ParamError::from(error));
                None
            }
            Ok(None) => None,
            Ok(Some(token)) => match pipeline.apply(&token) {
                Ok(value) => Some(value),
                Err(source) => {
                    info.error = Some(ParamError::Convert {
                        name: info.name.clone(),
                        source,
                    });
                    None
                }
            },
        };

        self.list.push(info);
        value
    }

    pub(crate) fn declare_repeated<T: 'static>(
        &mut self,
        guard: &mut DeclGuard,
        tokens: &mut TokenStore<'_>,
        mut info: ParamInfo,
        pipeline: Pipeline<T>,
    ) -> Vec<T> {
        guard.claim(&info.name, None);
        info.arity = Arity::Repeated;
        self.order_check(&info.name, Arity::Repeated);

        let value = match tokens.consume_remaining() {
            Err(error) => {
                info.error = Some(ParamError::from(error));
                Vec::new()
            }
            Ok(values) => match apply_each(&pipeline, &values) {
                Ok(values) => values,
                Err(source) => {
                    info.error = Some(ParamError::Convert {
                        name: info.name.clone(),
                        source,
                    });
                    Vec::new()
                }
            },
        };

        self.list.push(info);
        value
    }
}

/// Resolve a flag's raw occurrences: long name first, then the short letter,
/// both consulting the same environment variable.  An empty occurrence list
/// counts as absent.
fn resolve_values(
    tokens: &mut TokenStore<'_>,
    info: &ParamInfo,
) -> Result<Option<Vec<String>>, ParamError> {
    let mut values = tokens.resolve_flag(&info.name, info.boolean, info.env_var.as_deref())?;
    if values.is_none() {
        if let Some(short) = info.short {
            values =
                tokens.resolve_flag(&short.to_string(), info.boolean, info.env_var.as_deref())?;
        }
    }
    Ok(values.filter(|v| !v.is_empty()))
}

/// Map the chain element-wise over a repeated parameter's values.
/// The first failing step aborts the whole conversion.
fn apply_each<T: 'static>(pipeline: &Pipeline<T>, values: &[String]) -> Result<Vec<T>, StepError> {
    values.iter().map(|value| pipeline.apply(value)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(args: Vec<&str>) -> TokenStore<'static> {
        TokenStore::new(
            args.into_iter().map(String::from).collect(),
            None,
            Box::new(|_| None),
        )
    }

    fn parsed<T: std::str::FromStr + 'static>() -> Pipeline<T> {
        Pipeline::identity().parsed()
    }

    #[test]
    fn declare_mixed() {
        // Setup
        let mut tokens = store(vec!["foo", "--int", "100", "true", "10", "20", "30"]);
        let mut flag_guard = DeclGuard::default();
        let mut pos_guard = DeclGuard::default();
        let mut flags = FlagRegistry::default();
        let mut pos = PositionalRegistry::default();

        // Execute & Verify
        let value: i64 = flags.declare(
            &mut flag_guard,
            &mut tokens,
            ParamInfo::new("int", ""),
            parsed(),
            FlagDefault::Value(5),
        );
        assert_eq!(value, 100);

        let value: i64 = flags.declare(
            &mut flag_guard,
            &mut tokens,
            ParamInfo::new("def", ""),
            parsed(),
            FlagDefault::Value(5),
        );
        assert_eq!(value, 5);

        let value: String = pos.declare(
            &mut pos_guard,
            &mut tokens,
            ParamInfo::new("string", ""),
            Pipeline::identity(),
        );
        assert_eq!(value, "foo");

        let value: Option<bool> = pos.declare_optional(
            &mut pos_guard,
            &mut tokens,
            ParamInfo::new("bool", ""),
            parsed(),
        );
        assert_eq!(value, Some(true));

        let value: Vec<i64> = pos.declare_repeated(
            &mut pos_guard,
            &mut tokens,
            ParamInfo::new("rep-int", ""),
            parsed(),
        );
        assert_eq!(value, vec![10, 20, 30]);

        assert!(!flags.has_errors());
        assert!(!pos.has_errors());
    }

    #[test]
    fn required_flag_missing() {
        let mut tokens = store(vec![]);
        let mut guard = DeclGuard::default();
        let mut flags = FlagRegistry::default();

        let value: u32 = flags.declare(
            &mut guard,
            &mut tokens,
            ParamInfo::new("count", ""),
            parsed(),
            FlagDefault::Required,
        );

        assert_eq!(value, 0);
        assert!(flags.has_errors());
        let errors: Vec<String> = flags
            .params()
            .filter_map(|p| p.error.as_ref().map(|e| e.to_string()))
            .collect();
        assert_eq!(errors, vec!["count: required flag missing".to_string()]);
    }

    #[test]
    fn unset_flag_yields_zero_without_error() {
        let mut tokens = store(vec![]);
        let mut guard = DeclGuard::default();
        let mut flags = FlagRegistry::default();

        let value: u32 = flags.declare(
            &mut guard,
            &mut tokens,
            ParamInfo::new("count", ""),
            parsed(),
            FlagDefault::Unset,
        );

        assert_eq!(value, 0);
        assert!(!flags.has_errors());
    }

    #[test]
    fn single_flag_takes_first_occurrence() {
        let mut tokens = store(vec!["--x", "1", "--x", "2"]);
        let mut guard = DeclGuard::default();
        let mut flags = FlagRegistry::default();

        let value: u32 = flags.declare(
            &mut guard,
            &mut tokens,
            ParamInfo::new("x", ""),
            parsed(),
            FlagDefault::Unset,
        );

        assert_eq!(value, 1);
    }

    #[test]
    fn flag_resolves_by_short_letter() {
        let mut tokens = store(vec!["-c", "3"]);
        let mut guard = DeclGuard::default();
        let mut flags = FlagRegistry::default();
        let mut info = ParamInfo::new("count", "");
        info.short = Some('c');

        let value: u32 = flags.declare(&mut guard, &mut tokens, info, parsed(), FlagDefault::Unset);

        assert_eq!(value, 3);
    }

    #[test]
    fn repeated_boolean_flag_collects_occurrences() {
        let mut tokens = store(vec!["--zap=true", "--zap=false", "--zap"]);
        let mut guard = DeclGuard::default();
        let mut flags = FlagRegistry::default();
        let mut info = ParamInfo::new("zap", "");
        info.boolean = true;

        let values: Vec<bool> = flags.declare_repeated(
            &mut guard,
            &mut tokens,
            info,
            parsed(),
            FlagDefault::Unset,
        );

        assert_eq!(values, vec![true, false, true]);
    }

    #[test]
    fn conversion_failure_becomes_the_parameter_error() {
        let mut tokens = store(vec!["--count", "banana"]);
        let mut guard = DeclGuard::default();
        let mut flags = FlagRegistry::default();

        let value: u32 = flags.declare(
            &mut guard,
            &mut tokens,
            ParamInfo::new("count", ""),
            parsed(),
            FlagDefault::Unset,
        );

        assert_eq!(value, 0);
        let errors: Vec<String> = flags
            .params()
            .filter_map(|p| p.error.as_ref().map(|e| e.to_string()))
            .collect();
        assert_eq!(
            errors,
            vec!["count: cannot convert 'banana' to u32".to_string()]
        );
    }

    #[test]
    fn repeated_conversion_failure_aborts_element_wise() {
        let mut tokens = store(vec!["1", "two", "3"]);
        let mut guard = DeclGuard::default();
        let mut pos = PositionalRegistry::default();

        let values: Vec<u32> = pos.declare_repeated(
            &mut guard,
            &mut tokens,
            ParamInfo::new("items", ""),
            parsed(),
        );

        assert_eq!(values, Vec::<u32>::new());
        assert!(pos.has_errors());
    }

    #[test]
    fn missing_required_argument() {
        let mut tokens = store(vec![]);
        let mut guard = DeclGuard::default();
        let mut pos = PositionalRegistry::default();

        let value: String = pos.declare(
            &mut guard,
            &mut tokens,
            ParamInfo::new("path", ""),
            Pipeline::identity(),
        );

        assert_eq!(value, String::new());
        let errors: Vec<String> = pos
            .params()
            .filter_map(|p| p.error.as_ref().map(|e| e.to_string()))
            .collect();
        assert_eq!(errors, vec!["path: required argument missing".to_string()]);
    }

    #[test]
    fn missing_optional_argument_is_absent() {
        let mut tokens = store(vec![]);
        let mut guard = DeclGuard::default();
        let mut pos = PositionalRegistry::default();

        let value: Option<String> = pos.declare_optional(
            &mut guard,
            &mut tokens,
            ParamInfo::new("path", ""),
            Pipeline::identity(),
        );

        assert_eq!(value, None);
        assert!(!pos.has_errors());
    }

    #[test]
    #[should_panic(expected = "parameter already declared with name: 'count'")]
    fn duplicate_name_aborts() {
        let mut guard = DeclGuard::default();
        guard.claim("count", None);
        guard.claim("count", None);
    }

    #[test]
    #[should_panic(expected = "parameter already declared with short name: 'c'")]
    fn duplicate_short_aborts() {
        let mut guard = DeclGuard::default();
        guard.claim("count", Some('c'));
        guard.claim("total", Some('c'));
    }

    #[test]
    #[should_panic(expected = "required argument after optional arguments: 'b'")]
    fn required_after_optional_aborts() {
        let mut tokens = store(vec![]);
        let mut guard = DeclGuard::default();
        let mut pos = PositionalRegistry::default();

        let _: Option<String> = pos.declare_optional(
            &mut guard,
            &mut tokens,
            ParamInfo::new("a", ""),
            Pipeline::identity(),
        );
        let _: String = pos.declare(
            &mut guard,
            &mut tokens,
            ParamInfo::new("b", ""),
            Pipeline::identity(),
        );
    }

    #[test]
    #[should_panic(expected = "argument after repeated argument: 'b'")]
    fn argument_after_repeated_aborts() {
        let mut tokens = store(vec![]);
        let mut guard = DeclGuard::default();
        let mut pos = PositionalRegistry::default();

        let _: Vec<String> = pos.declare_repeated(
            &mut guard,
            &mut tokens,
            ParamInfo::new("a", ""),
            Pipeline::identity(),
        );
        let _: String = pos.declare(
            &mut guard,
            &mut tokens,
            ParamInfo::new("b", ""),
            Pipeline::identity(),
        );
    }

    #[test]
    #[should_panic(expected = "optional flag cannot have a default: 'x'")]
    fn optional_flag_with_default_aborts() {
        let mut tokens = store(vec![]);
        let mut guard = DeclGuard::default();
        let mut flags = FlagRegistry::default();

        let _: Option<u32> = flags.declare_optional(
            &mut guard,
            &mut tokens,
            ParamInfo::new("x", ""),
            parsed(),
            FlagDefault::Value(1),
        );
    }

    #[test]
    fn optional_after_optional_is_allowed() {
        let mut tokens = store(vec!["first"]);
        let mut guard = DeclGuard::default();
        let mut pos = PositionalRegistry::default();

        let a: Option<String> = pos.declare_optional(
            &mut guard,
            &mut tokens,
            ParamInfo::new("a", ""),
            Pipeline::identity(),
        );
        let b: Option<String> = pos.declare_optional(
            &mut guard,
            &mut tokens,
            ParamInfo::new("b", ""),
            Pipeline::identity(),
        );
        let rest: Vec<String> = pos.declare_repeated(
            &mut guard,
            &mut tokens,
            ParamInfo::new("rest", ""),
            Pipeline::identity(),
        );

        assert_eq!(a, Some("first".to_string()));
        assert_eq!(b, None);
        assert_eq!(rest, Vec::<String>::new());
    }
}
