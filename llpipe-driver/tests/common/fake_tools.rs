use std::path::Path;
use std::process::Command;

use llpipe_driver::{ToolCommand, ToolError, ToolRunner, ToolStatus};

/// Records every command and "produces" its `-o` target as an empty file, so
/// cleanup can be observed without a real toolchain.
#[derive(Debug, Default)]
pub struct FakeTools {
    pub seen: Vec<ToolCommand>,
    /// 0-based index of the invocation that should fail, and with what code.
    pub fail_at: Option<(usize, i32)>,
}

impl FakeTools {
    pub fn failing_at(index: usize, code: i32) -> Self {
        Self {
            seen: Vec::new(),
            fail_at: Some((index, code)),
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.seen.iter().map(|c| c.to_string()).collect()
    }
}

impl ToolRunner for FakeTools {
    fn run(&mut self, command: &ToolCommand, work_dir: &Path) -> Result<ToolStatus, ToolError> {
        let index = self.seen.len();
        self.seen.push(command.clone());

        if let Some((at, code)) = self.fail_at {
            if at == index {
                return Ok(ToolStatus::exited(code));
            }
        }

        if let Some(pos) = command.args.iter().position(|a| a == "-o") {
            if let Some(out) = command.args.get(pos + 1) {
                std::fs::write(work_dir.join(out), "; fake output\n")
                    .expect("write fake output");
            }
        }
        Ok(ToolStatus::SUCCESS)
    }
}

pub fn have_tool(name: &str) -> bool {
    Command::new(name).arg("--version").output().is_ok()
}
