//! Rendering an [`OptionStore`] into command-line tokens.

use crate::core::grammar::{ArgKind, ArgSpec, FlagStyle, Grammar, Position};
use crate::core::options::{OptionStore, OptionValue};
use crate::error::ConfigError;

/// Pure renderer bound to one tool grammar.
///
/// Token order is fixed by the grammar, never by the order in which the caller
/// set options:
///
/// 1. verb tokens
/// 2. leading positionals
/// 3. flags, switches and properties in table order
/// 4. trailing positionals
///
/// Options the grammar does not mention (e.g. the program path) are ignored.
#[derive(Debug, Clone, Copy)]
pub struct ParamBuilder {
    grammar: &'static Grammar,
}

impl ParamBuilder {
    pub const fn new(grammar: &'static Grammar) -> Self {
        Self { grammar }
    }

    pub fn build(&self, store: &OptionStore) -> Result<Vec<String>, ConfigError> {
        let mut tokens: Vec<String> = self.grammar.verb.iter().map(|v| v.to_string()).collect();

        let positional = |wanted: Position| {
            move |spec: &&ArgSpec| matches!(spec.kind, ArgKind::Positional(p) if p == wanted)
        };
        let args = self.grammar.args;

        for spec in args.iter().filter(positional(Position::Leading)) {
            render(spec, store, &mut tokens)?;
        }
        for spec in args
            .iter()
            .filter(|spec| !matches!(spec.kind, ArgKind::Positional(_)))
        {
            render(spec, store, &mut tokens)?;
        }
        for spec in args.iter().filter(positional(Position::Trailing)) {
            render(spec, store, &mut tokens)?;
        }

        Ok(tokens)
    }
}

fn render(spec: &ArgSpec, store: &OptionStore, tokens: &mut Vec<String>) -> Result<(), ConfigError> {
    let Some(value) = present(store.get(spec.option)) else {
        return match spec.required {
            Some(message) => Err(ConfigError::MissingOption {
                option: spec.option.to_string(),
                message: message.to_string(),
            }),
            None => Ok(()),
        };
    };

    match spec.kind {
        ArgKind::Positional(_) => {
            tokens.push(scalar(spec, value, "string or list")?);
        }
        ArgKind::Valued { flag, style } => {
            let rendered = scalar(spec, value, "string or list")?;
            match style {
                FlagStyle::Joined(sep) => tokens.push(format!("{flag}{sep}{rendered}")),
                FlagStyle::Separate => {
                    tokens.push(flag.to_string());
                    tokens.push(rendered);
                }
            }
        }
        ArgKind::Switch { flag } => match value {
            OptionValue::Flag(true) => tokens.push(flag.to_string()),
            OptionValue::Flag(false) => {}
            other => return Err(mismatch(spec, "flag", other)),
        },
        ArgKind::Properties { prefix, separator } => match value {
            OptionValue::Map(entries) => {
                for (key, val) in entries {
                    tokens.push(format!(
                        "{prefix}{key}{separator}{}",
                        spec.quoting.apply(val)
                    ));
                }
            }
            other => return Err(mismatch(spec, "map", other)),
        },
    }
    Ok(())
}

/// Empty strings, lists and maps count as unset.
fn present(value: Option<&OptionValue>) -> Option<&OptionValue> {
    value.filter(|value| match value {
        OptionValue::Str(s) => !s.is_empty(),
        OptionValue::List(items) => !items.is_empty(),
        OptionValue::Map(entries) => !entries.is_empty(),
        OptionValue::Flag(_) => true,
    })
}

fn scalar(spec: &ArgSpec, value: &OptionValue, expected: &'static str) -> Result<String, ConfigError> {
    match value {
        OptionValue::Str(s) => Ok(spec.quoting.apply(s)),
        OptionValue::List(items) => Ok(spec.quoting.apply(&items.join(spec.joiner))),
        other => Err(mismatch(spec, expected, other)),
    }
}

fn mismatch(spec: &ArgSpec, expected: &'static str, found: &OptionValue) -> ConfigError {
    ConfigError::TypeMismatch {
        option: spec.option.to_string(),
        expected,
        found: found.shape(),
    }
}
