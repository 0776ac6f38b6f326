//! Classification of raw `run` tokens into source, `-O` level and pass options.

use crate::error::DriverError;

pub const USAGE: &str = "llpipe run <c-source> [llvm-options...]";

pub const SOURCE_SUFFIX: &str = ".c";
pub const OPT_LEVEL_PREFIX: &str = "-O";
pub const FLAG_PREFIX: &str = "-";

/// What one `run` was asked to do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    /// Source path exactly as given on the command line.
    pub source: String,
    /// Compiler optimization level (`-O2`, `-Os`, ...). The last one given wins.
    pub opt_level: Option<String>,
    /// Optimizer flags, in command-line order.
    pub pass_options: Vec<String>,
}

impl Invocation {
    pub fn classify<I, S>(tokens: I) -> Result<Self, DriverError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut sources: Vec<String> = Vec::new();
        let mut opt_level = None;
        let mut pass_options = Vec::new();
        let mut seen_any = false;

        for tok in tokens {
            let tok = tok.as_ref();
            seen_any = true;

            if tok.ends_with(SOURCE_SUFFIX) {
                sources.push(tok.to_string());
            } else if tok.starts_with(OPT_LEVEL_PREFIX) {
                opt_level = Some(tok.to_string());
            } else if tok.starts_with(FLAG_PREFIX) {
                pass_options.push(tok.to_string());
            } else {
                log::debug!("ignoring argument `{tok}`");
            }
        }

        if !seen_any {
            return Err(DriverError::Usage);
        }

        let source = match sources.len() {
            0 => return Err(DriverError::NoSource),
            1 => sources.remove(0),
            _ => return Err(DriverError::AmbiguousSource { candidates: sources }),
        };

        Ok(Self {
            source,
            opt_level,
            pass_options,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_source_level_and_passes() {
        let inv = Invocation::classify(["-O1", "foo.c", "-licm", "-gvn"]).unwrap();
        assert_eq!(inv.source, "foo.c");
        assert_eq!(inv.opt_level.as_deref(), Some("-O1"));
        assert_eq!(inv.pass_options, vec!["-licm", "-gvn"]);
    }

    #[test]
    fn last_opt_level_wins() {
        let inv = Invocation::classify(["foo.c", "-O3", "-Os"]).unwrap();
        assert_eq!(inv.opt_level.as_deref(), Some("-Os"));
        assert!(inv.pass_options.is_empty());
    }

    #[test]
    fn bare_words_are_ignored() {
        let inv = Invocation::classify(["foo.c", "stray", "-dce"]).unwrap();
        assert_eq!(inv.pass_options, vec!["-dce"]);
    }

    #[test]
    fn hyphenated_source_is_still_the_source() {
        let inv = Invocation::classify(["-weird.c", "-dce"]).unwrap();
        assert_eq!(inv.source, "-weird.c");
    }

    #[test]
    fn empty_is_usage() {
        let err = Invocation::classify(Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, DriverError::Usage));
    }

    #[test]
    fn only_flags_is_no_source() {
        let err = Invocation::classify(["-licm", "-O2"]).unwrap_err();
        assert!(matches!(err, DriverError::NoSource));
    }

    #[test]
    fn two_sources_are_ambiguous() {
        let err = Invocation::classify(["a.c", "-licm", "b.c"]).unwrap_err();
        match err {
            DriverError::AmbiguousSource { candidates } => assert_eq!(candidates, vec!["a.c", "b.c"]),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
