//! Artifact naming conventions: classification and canonicalization.
//!
//! Stacks are named `<token>-<env>` (env optional), templates
//! `<token>.<ext>`, parameter files `<token>-params-<env>.json`. Everything
//! here is pure string inspection; existence checks live in the resolver.

use std::path::{Path, PathBuf};

/// Template extensions, in the order candidates are probed.
pub(crate) const TEMPLATE_EXTENSIONS: [&str; 3] = ["json", "yml", "yaml"];

const PARAMS_TOKEN: &str = "-params";

/// Role a single positional argument plays, decided by filename shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ArgKind {
    Stack(String),
    Template(PathBuf),
    Params(PathBuf),
    Ambiguous(String),
}

/// Classify one bare token.
///
/// Applies only when a command receives a single positional argument;
/// explicit `stack template [params]` lists skip classification entirely.
/// Rules, in order: a `-params-`/`-params.` marker wins, a dotless token is
/// a stack name, a known template extension makes a template path, and
/// anything else is ambiguous.
pub(crate) fn classify(token: &str) -> ArgKind {
    if token.contains("-params-") || token.contains("-params.") {
        return ArgKind::Params(PathBuf::from(token));
    }
    if !token.contains('.') {
        return ArgKind::Stack(token.to_string());
    }
    match token.rsplit_once('.') {
        Some((_, ext)) if TEMPLATE_EXTENSIONS.contains(&ext) => {
            ArgKind::Template(PathBuf::from(token))
        }
        _ => ArgKind::Ambiguous(token.to_string()),
    }
}

/// Basename of `path` with its extension stripped.
pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Drop the trailing `-<suffix>` token: `a-b-c` becomes `a-b`.
pub(crate) fn strip_last_suffix(name: &str) -> Option<&str> {
    name.rfind('-').map(|idx| &name[..idx])
}

/// Stack name implied by a template path: the filename taken verbatim,
/// extension stripped.
pub(crate) fn stack_from_template(path: &Path) -> String {
    file_stem(path)
}

/// Stack name implied by a params path: extension stripped, then the
/// `-params` token removed, keeping any env suffix.
///
/// `mywebsite-params-test.json` yields `mywebsite-test`;
/// `foo-params.json` yields `foo`.
pub(crate) fn stack_from_params(path: &Path) -> String {
    let stem = file_stem(path);
    match stem.find(PARAMS_TOKEN) {
        Some(idx) => {
            let rest = &stem[idx + PARAMS_TOKEN.len()..];
            format!("{}{}", &stem[..idx], rest)
        }
        None => stem,
    }
}

/// Template slug implied by a params path: everything before `-params`.
pub(crate) fn template_slug_from_params(path: &Path) -> String {
    let stem = file_stem(path);
    match stem.find(PARAMS_TOKEN) {
        Some(idx) => stem[..idx].to_string(),
        None => stem,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_bare_name_is_stack() {
        assert_eq!(
            classify("mywebsite-test"),
            ArgKind::Stack("mywebsite-test".to_string())
        );
    }

    #[test]
    fn classify_template_extensions() {
        for token in ["vpc.json", "vpc.yml", "vpc.yaml"] {
            assert_eq!(classify(token), ArgKind::Template(PathBuf::from(token)));
        }
    }

    #[test]
    fn classify_params_marker_wins_over_extension() {
        assert_eq!(
            classify("mywebsite-params-test.json"),
            ArgKind::Params(PathBuf::from("mywebsite-params-test.json"))
        );
        assert_eq!(
            classify("foo-params.json"),
            ArgKind::Params(PathBuf::from("foo-params.json"))
        );
    }

    #[test]
    fn classify_unknown_extension_is_ambiguous() {
        assert_eq!(
            classify("notes.txt"),
            ArgKind::Ambiguous("notes.txt".to_string())
        );
    }

    #[test]
    fn stack_from_params_keeps_env_suffix() {
        assert_eq!(
            stack_from_params(Path::new("mywebsite-params-test.json")),
            "mywebsite-test"
        );
        assert_eq!(stack_from_params(Path::new("foo-params.json")), "foo");
        assert_eq!(
            stack_from_params(Path::new("params/foo-params-dev.json")),
            "foo-dev"
        );
    }

    #[test]
    fn template_slug_drops_params_and_env() {
        assert_eq!(
            template_slug_from_params(Path::new("mywebsite-params-test.json")),
            "mywebsite"
        );
        assert_eq!(template_slug_from_params(Path::new("foo-params.json")), "foo");
    }

    #[test]
    fn strip_last_suffix_walks_tokens() {
        assert_eq!(strip_last_suffix("a-b-c"), Some("a-b"));
        assert_eq!(strip_last_suffix("a-b"), Some("a"));
        assert_eq!(strip_last_suffix("a"), None);
    }
}
