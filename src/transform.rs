use thiserror::Error;

/// The error raised by a conversion step in a parameter's transform chain.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub(crate) struct StepError(pub(crate) String);

/// An ordered chain of conversion steps, collapsed by function composition.
///
/// The chain starts at the raw token string; each step maps the previous
/// step's output type to its own.  Composing at the type level makes a
/// step-to-step type mismatch a compile error rather than a declaration-time
/// failure.
pub(crate) struct Pipeline<T> {
    convert: Box<dyn Fn(String) -> Result<T, StepError>>,
}

impl Pipeline<String> {
    pub(crate) fn identity() -> Self {
        Pipeline {
            convert: Box::new(|token: String| Ok(token)),
        }
    }

    /// Append a `FromStr` conversion.  Only available at the string stage.
    pub(crate) fn parsed<U>(self) -> Pipeline<U>
    where
        U: std::str::FromStr + 'static,
    {
        self.then(|token: String| {
            U::from_str(&token).map_err(|_| {
                StepError(format!(
                    "cannot convert '{token}' to {type_name}",
                    type_name = short_type_name::<U>()
                ))
            })
        })
    }
}

impl<T: 'static> Pipeline<T> {
    /// Append an arbitrary conversion step.
    pub(crate) fn then<U, F, E>(self, step: F) -> Pipeline<U>
    where
        F: Fn(T) -> Result<U, E> + 'static,
        E: std::fmt::Display,
    {
        let Pipeline { convert } = self;
        Pipeline {
            convert: Box::new(move |token| {
                let value = convert(token)?;
                step(value).map_err(|e| StepError(e.to_string()))
            }),
        }
    }

    /// Run the full chain over one raw token.
    pub(crate) fn apply(&self, token: &str) -> Result<T, StepError> {
        (self.convert)(token.to_string())
    }
}

/// The trailing segment of a type path, for display purposes.
pub(crate) fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity() {
        let pipeline = Pipeline::identity();
        assert_eq!(pipeline.apply("abc").unwrap(), "abc".to_string());
    }

    #[test]
    fn parsed() {
        let pipeline = Pipeline::identity().parsed::<u32>();
        assert_eq!(pipeline.apply("17").unwrap(), 17);
        assert_matches!(pipeline.apply("not-u32"), Err(StepError(message)) => {
            assert_eq!(message, "cannot convert 'not-u32' to u32");
        });
    }

    #[test]
    fn chained_steps() {
        let pipeline = Pipeline::identity()
            .parsed::<u32>()
            .then(|n: u32| -> Result<u32, StepError> { Ok(n * 2) })
            .then(|n: u32| {
                if n < 100 {
                    Ok(format!("small-{n}"))
                } else {
                    Err(StepError("too large".to_string()))
                }
            });

        assert_eq!(pipeline.apply("21").unwrap(), "small-42".to_string());
        assert_matches!(pipeline.apply("200"), Err(StepError(message)) => {
            assert_eq!(message, "too large");
        });
    }

    #[test]
    fn first_failure_aborts_the_chain() {
        let pipeline = Pipeline::identity()
            .parsed::<u32>()
            .then(|_: u32| -> Result<u32, StepError> {
                panic!("step after a failed conversion must not run");
            });

        assert_matches!(pipeline.apply("not-u32"), Err(StepError(_)));
    }

    #[test]
    fn short_type_names() {
        assert_eq!(short_type_name::<u32>(), "u32");
        assert_eq!(short_type_name::<String>(), "String");
        assert_eq!(short_type_name::<bool>(), "bool");
    }
}
