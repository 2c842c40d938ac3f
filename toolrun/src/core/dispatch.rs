//! Selecting a task variant for an input file.

use std::path::{Path, PathBuf};

use crate::error::DispatchError;

/// The static description of an input that predicates classify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    path: PathBuf,
}

impl InputFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lowercased extension without the leading dot.
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
    }

    pub fn has_extension(&self, candidates: &[&str]) -> bool {
        self.extension()
            .is_some_and(|ext| candidates.iter().any(|c| c.eq_ignore_ascii_case(&ext)))
    }
}

impl std::fmt::Display for InputFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// One interchangeable way of preparing a command for a category of input.
///
/// `accepts` must only look at the descriptor; it must not touch the filesystem.
pub trait Variant {
    fn name(&self) -> &str;
    fn accepts(&self, input: &InputFile) -> bool;
}

/// What to do when more than one variant accepts an input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Ambiguity {
    /// Registration order breaks the tie.
    #[default]
    FirstMatch,
    /// Treat overlapping predicates as a configuration mistake.
    Reject,
}

/// Ordered set of variants. Registered once, consulted many times.
pub struct VariantRegistry<V: ?Sized> {
    variants: Vec<Box<V>>,
    ambiguity: Ambiguity,
}

impl<V: Variant + ?Sized> VariantRegistry<V> {
    pub fn new() -> Self {
        Self::with_ambiguity(Ambiguity::default())
    }

    pub fn with_ambiguity(ambiguity: Ambiguity) -> Self {
        Self {
            variants: Vec::new(),
            ambiguity,
        }
    }

    pub fn register(&mut self, variant: Box<V>) -> &mut Self {
        self.variants.push(variant);
        self
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Evaluate predicates in registration order and return the chosen variant.
    pub fn dispatch(&self, input: &InputFile) -> Result<&V, DispatchError> {
        let mut accepting = self.variants.iter().filter(|v| v.accepts(input));
        let Some(first) = accepting.next() else {
            return Err(DispatchError::NoMatch {
                input: input.to_string(),
            });
        };

        if self.ambiguity == Ambiguity::Reject {
            let others: Vec<String> = accepting.map(|v| v.name().to_string()).collect();
            if !others.is_empty() {
                let mut variants = vec![first.name().to_string()];
                variants.extend(others);
                return Err(DispatchError::Ambiguous {
                    input: input.to_string(),
                    variants,
                });
            }
        }

        Ok(&**first)
    }
}

impl<V: Variant + ?Sized> Default for VariantRegistry<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ByExtension {
        name: &'static str,
        accepted: &'static [&'static str],
    }

    impl Variant for ByExtension {
        fn name(&self) -> &str {
            self.name
        }

        fn accepts(&self, input: &InputFile) -> bool {
            input.has_extension(self.accepted)
        }
    }

    fn registry(ambiguity: Ambiguity) -> VariantRegistry<dyn Variant> {
        let mut registry: VariantRegistry<dyn Variant> = VariantRegistry::with_ambiguity(ambiguity);
        registry
            .register(Box::new(ByExtension {
                name: "nuspec",
                accepted: &["nuspec"],
            }))
            .register(Box::new(ByExtension {
                name: "project",
                accepted: &["csproj", "fsproj"],
            }));
        registry
    }

    #[test]
    fn dispatch_picks_by_extension() {
        let registry = registry(Ambiguity::FirstMatch);
        let nuspec = registry
            .dispatch(&InputFile::new("foo.nuspec"))
            .expect("nuspec");
        assert_eq!(nuspec.name(), "nuspec");
        let project = registry
            .dispatch(&InputFile::new("src/foo.CSPROJ"))
            .expect("project");
        assert_eq!(project.name(), "project");
    }

    #[test]
    fn dispatch_reports_unmatched_input() {
        let err = registry(Ambiguity::FirstMatch)
            .dispatch(&InputFile::new("readme.md"))
            .err()
            .expect("no match");
        assert_eq!(
            err,
            DispatchError::NoMatch {
                input: "readme.md".to_string()
            }
        );
    }

    #[test]
    fn overlapping_variants_follow_policy() {
        let mut first_match = registry(Ambiguity::FirstMatch);
        first_match.register(Box::new(ByExtension {
            name: "catch-all",
            accepted: &["nuspec", "csproj"],
        }));
        let chosen = first_match
            .dispatch(&InputFile::new("a.nuspec"))
            .expect("first match");
        assert_eq!(chosen.name(), "nuspec");

        let mut strict = registry(Ambiguity::Reject);
        strict.register(Box::new(ByExtension {
            name: "catch-all",
            accepted: &["nuspec"],
        }));
        let err = strict
            .dispatch(&InputFile::new("a.nuspec"))
            .err()
            .expect("ambiguous");
        assert!(matches!(err, DispatchError::Ambiguous { ref variants, .. } if variants.len() == 2));
    }

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(
            InputFile::new("Pkg.NuSpec").extension().as_deref(),
            Some("nuspec")
        );
        assert_eq!(InputFile::new("Makefile").extension(), None);
    }
}
