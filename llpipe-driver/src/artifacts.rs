use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::args::SOURCE_SUFFIX;
use crate::error::DriverError;

pub const IR_SUFFIX: &str = ".ll";
pub const BITCODE_SUFFIX: &str = ".bc";
pub const MEM2REG_PREFIX: &str = "m2r-";
pub const OPT_PREFIX: &str = "opt-";

/// File names derived from the source's base name. All of them live in the
/// working directory, whatever directory the source itself sits in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Artifacts {
    /// Front end output, removed after a successful run.
    pub ir: String,
    /// After `mem2reg`.
    pub mem2reg: String,
    /// After the user's passes.
    pub optimized: String,
}

impl Artifacts {
    pub fn derive(source: &str) -> Result<Self, DriverError> {
        let bad = || DriverError::BadSourcePath {
            path: source.to_string(),
        };

        let base = Path::new(source)
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(bad)?;
        let stem = base.strip_suffix(SOURCE_SUFFIX).ok_or_else(bad)?;
        if stem.is_empty() {
            return Err(bad());
        }

        let ir = format!("{stem}{IR_SUFFIX}");
        Ok(Self {
            mem2reg: format!("{MEM2REG_PREFIX}{ir}"),
            optimized: format!("{OPT_PREFIX}{ir}"),
            ir,
        })
    }

    pub fn names(&self) -> [&str; 3] {
        [&self.ir, &self.mem2reg, &self.optimized]
    }

    pub fn paths_in(&self, work_dir: &Path) -> Vec<PathBuf> {
        self.names().iter().map(|n| work_dir.join(n)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swaps_suffix_and_prefixes() {
        let a = Artifacts::derive("foo.c").unwrap();
        assert_eq!(a.ir, "foo.ll");
        assert_eq!(a.mem2reg, "m2r-foo.ll");
        assert_eq!(a.optimized, "opt-foo.ll");
    }

    #[test]
    fn uses_base_name_only() {
        let a = Artifacts::derive("src/nested/loop.c").unwrap();
        assert_eq!(a.names(), ["loop.ll", "m2r-loop.ll", "opt-loop.ll"]);
    }

    #[test]
    fn only_the_final_suffix_is_swapped() {
        let a = Artifacts::derive("a.c.c").unwrap();
        assert_eq!(a.ir, "a.c.ll");
    }

    #[test]
    fn bare_suffix_is_rejected() {
        assert!(matches!(
            Artifacts::derive(".c"),
            Err(DriverError::BadSourcePath { .. })
        ));
    }
}
