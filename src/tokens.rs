use thiserror::Error;

#[cfg(feature = "tracing_debug")]
use tracing::debug;

/// Fallback resolver consulted for flags that never occur on the command line.
pub(crate) type DynamicResolver<'e> =
    Box<dyn FnMut(&str) -> Result<Vec<String>, Box<dyn std::error::Error>> + 'e>;

/// Environment variable lookup, injectable for testing.
pub(crate) type EnvLookup<'e> = Box<dyn Fn(&str) -> Option<String> + 'e>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub(crate) enum ArgError {
    #[error("unknown flag: '{0}'")]
    UnknownFlag(String),

    #[error("no value for flag '{0}'")]
    NoValue(String),

    #[error("{0}")]
    Dynamic(String),
}

/// A token is flag-shaped when it could be a `--name`/`-n` occurrence.
/// A lone `-` is not flag-shaped; it reads as an ordinary positional.
fn flag_shaped(token: &str) -> bool {
    token.len() > 1 && token.starts_with('-')
}

/// The raw argument list with a per-token consumed marker.
///
/// Every query skips consumed tokens.  The first `--` is never itself
/// returned, and disables flag-syntax recognition for everything after it.
pub(crate) struct TokenStore<'e> {
    args: Vec<String>,
    used: Vec<bool>,
    dynamic: Option<DynamicResolver<'e>>,
    lookup_env: EnvLookup<'e>,
}

impl<'e> TokenStore<'e> {
    pub(crate) fn new(
        args: Vec<String>,
        dynamic: Option<DynamicResolver<'e>>,
        lookup_env: EnvLookup<'e>,
    ) -> Self {
        let used = vec![false; args.len()];
        Self {
            args,
            used,
            dynamic,
            lookup_env,
        }
    }

    /// Every unconsumed token that could still become a positional, in order.
    /// Flag-shaped tokens before the `--` separator are skipped silently;
    /// after the separator everything is positional.
    pub(crate) fn peek_positionals(&self) -> Vec<&str> {
        let mut out = Vec::with_capacity(self.args.len());
        let mut past_separator = false;

        for (i, arg) in self.args.iter().enumerate() {
            if !past_separator && arg == "--" {
                past_separator = true;
                continue;
            }
            if self.used[i] {
                continue;
            }
            if !past_separator && flag_shaped(arg) {
                continue;
            }
            out.push(arg.as_str());
        }

        out
    }

    /// The next positional token, without consuming it.
    ///
    /// Unlike [`TokenStore::peek_positionals`], the singular form does not
    /// skip over flag-shaped tokens: an unclaimed flag in front of the next
    /// positional is an `unknown flag` error.  The dispatcher relies on this
    /// to stop name-matching at the first flag-shaped token.
    pub(crate) fn peek_positional(&self) -> Result<Option<&str>, ArgError> {
        let mut past_separator = false;

        for (i, arg) in self.args.iter().enumerate() {
            if !past_separator && arg == "--" {
                past_separator = true;
                continue;
            }
            if self.used[i] {
                continue;
            }
            if !past_separator && flag_shaped(arg) {
                return Err(ArgError::UnknownFlag(arg.clone()));
            }
            return Ok(Some(arg.as_str()));
        }

        Ok(None)
    }

    /// Consume and return the next positional token.
    /// Exhaustion is `Ok(None)`, not an error.
    pub(crate) fn consume_positional(&mut self) -> Result<Option<String>, ArgError> {
        let mut past_separator = false;

        for i in 0..self.args.len() {
            if !past_separator && self.args[i] == "--" {
                past_separator = true;
                continue;
            }
            if self.used[i] {
                continue;
            }
            if !past_separator && flag_shaped(&self.args[i]) {
                return Err(ArgError::UnknownFlag(self.args[i].clone()));
            }
            self.used[i] = true;
            return Ok(Some(self.args[i].clone()));
        }

        Ok(None)
    }

    /// Consume every remaining positional token, in order.
    ///
    /// Errors if any unconsumed flag-shaped token remains before the `--`
    /// separator: an always-unknown flag must not be silently swallowed as a
    /// positional value.
    pub(crate) fn consume_remaining(&mut self) -> Result<Vec<String>, ArgError> {
        let mut past_separator = false;

        for (i, arg) in self.args.iter().enumerate() {
            if !past_separator && arg == "--" {
                past_separator = true;
                continue;
            }
            if self.used[i] {
                continue;
            }
            if !past_separator && flag_shaped(arg) {
                return Err(ArgError::UnknownFlag(arg.clone()));
            }
        }

        let out: Vec<String> = self
            .peek_positionals()
            .into_iter()
            .map(String::from)
            .collect();
        for used in self.used.iter_mut() {
            *used = true;
        }

        Ok(out)
    }

    /// Collect every occurrence of the flag `name`, in scan order.
    ///
    /// Matches `--name`, `-name`, and the `name=value`/`--name=value` forms.
    /// A boolean-style match without `=` yields the literal `"true"`; any
    /// other match without `=` claims the following token as its value,
    /// failing if that token is missing, already consumed, or `--`.
    ///
    /// Returns `Ok(None)` when the flag never occurred and no fallback
    /// produced a value.  Fallback order: the environment variable (when
    /// declared, non-empty values only), then the dynamic resolver.  A
    /// dynamic resolver error latches the resolver off for the remainder of
    /// the dispatch.
    pub(crate) fn resolve_flag(
        &mut self,
        name: &str,
        boolean_style: bool,
        env_var: Option<&str>,
    ) -> Result<Option<Vec<String>>, ArgError> {
        let mut values: Vec<String> = Vec::new();
        let mut matched = false;
        let mut claimed: Vec<usize> = Vec::new();
        let mut i = 0;

        while i < self.args.len() {
            let arg = self.args[i].as_str();

            if arg == "--" {
                break;
            }
            if !flag_shaped(arg) {
                i += 1;
                continue;
            }

            let stripped = arg.strip_prefix("--").unwrap_or(&arg[1..]);

            // name=value form: the whole token carries the value.
            if let Some(eq) = stripped.find('=') {
                if &stripped[..eq] == name {
                    values.push(stripped[eq + 1..].to_string());
                    claimed.push(i);
                    matched = true;
                    i += 1;
                    continue;
                }
            }

            if stripped != name {
                i += 1;
                continue;
            }
            matched = true;

            if boolean_style {
                values.push("true".to_string());
                claimed.push(i);
                i += 1;
                continue;
            }

            if i + 1 >= self.args.len() || self.used[i + 1] || self.args[i + 1] == "--" {
                return Err(ArgError::NoValue(name.to_string()));
            }
            values.push(self.args[i + 1].clone());
            claimed.push(i);
            claimed.push(i + 1);
            i += 2;
        }

        if !matched {
            if let Some(var) = env_var {
                if let Some(value) = (self.lookup_env)(var) {
                    if !value.is_empty() {
                        return Ok(Some(vec![value]));
                    }
                }
            }
            if let Some(mut dynamic) = self.dynamic.take() {
                return match dynamic(name) {
                    Ok(values) => {
                        self.dynamic = Some(dynamic);
                        Ok(Some(values))
                    }
                    // Fail-once: the resolver is not restored.
                    Err(e) => Err(ArgError::Dynamic(e.to_string())),
                };
            }
            return Ok(None);
        }

        #[cfg(feature = "tracing_debug")]
        {
            debug!("resolved flag '{name}' to {values:?}.");
        }

        for index in claimed {
            self.used[index] = true;
        }

        Ok(Some(values))
    }
}
