//! Declarative command-line grammars.
//!
//! A [`Grammar`] is static configuration data: which option maps to which
//! flag, how list values are joined, how values are quoted and where each
//! entry lands in the rendered command line. Tool wrappers declare one
//! `static` grammar each and hand it to [`crate::core::params::ParamBuilder`].

/// Where a positional argument is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// Right after the verb, before any flag.
    Leading,
    /// After every flag.
    Trailing,
}

/// Quoting rule applied to rendered values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quoting {
    Never,
    Always,
    IfWhitespace,
}

impl Quoting {
    pub fn apply(self, value: &str) -> String {
        let quote = match self {
            Quoting::Never => false,
            Quoting::Always => true,
            Quoting::IfWhitespace => value.chars().any(char::is_whitespace),
        };
        if quote {
            format!("\"{value}\"")
        } else {
            value.to_string()
        }
    }
}

/// How a valued flag is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagStyle {
    /// One token: flag, separator, value (`-RepositoryPath ./pkgs`, `/verbosity:quiet`).
    Joined(&'static str),
    /// Two tokens: flag, then value.
    Separate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Positional(Position),
    Valued { flag: &'static str, style: FlagStyle },
    /// Emitted bare when the backing flag option is `true`.
    Switch { flag: &'static str },
    /// One token per map entry: `{prefix}{key}{separator}{value}`.
    Properties {
        prefix: &'static str,
        separator: &'static str,
    },
}

/// One entry of a grammar table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgSpec {
    pub option: &'static str,
    pub kind: ArgKind,
    pub quoting: Quoting,
    /// Delimiter used to fold list values into a single token.
    pub joiner: &'static str,
    /// Diagnostic reported when a required option is missing.
    pub required: Option<&'static str>,
}

impl ArgSpec {
    pub const fn positional(option: &'static str, position: Position) -> Self {
        Self::new(option, ArgKind::Positional(position))
    }

    pub const fn valued(option: &'static str, flag: &'static str, style: FlagStyle) -> Self {
        Self::new(option, ArgKind::Valued { flag, style })
    }

    pub const fn switch(option: &'static str, flag: &'static str) -> Self {
        Self::new(option, ArgKind::Switch { flag })
    }

    pub const fn properties(
        option: &'static str,
        prefix: &'static str,
        separator: &'static str,
    ) -> Self {
        Self::new(option, ArgKind::Properties { prefix, separator })
    }

    const fn new(option: &'static str, kind: ArgKind) -> Self {
        Self {
            option,
            kind,
            quoting: Quoting::Never,
            joiner: ";",
            required: None,
        }
    }

    pub const fn quoted(mut self, quoting: Quoting) -> Self {
        self.quoting = quoting;
        self
    }

    pub const fn joined_by(mut self, joiner: &'static str) -> Self {
        self.joiner = joiner;
        self
    }

    pub const fn required(mut self, message: &'static str) -> Self {
        self.required = Some(message);
        self
    }
}

/// Versioned argument grammar for one external tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grammar {
    pub tool: &'static str,
    pub version: &'static str,
    /// Verb or subcommand tokens, always emitted first.
    pub verb: &'static [&'static str],
    /// Entries in schema order.
    pub args: &'static [ArgSpec],
}
