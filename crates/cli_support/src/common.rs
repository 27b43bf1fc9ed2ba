use clap::Args;
use std::path::{Path, PathBuf};

/// Root directory holding one sub-directory per recorded run.
#[derive(Debug, Clone, Args)]
pub struct DataRootArgs {
    /// Directory containing the run directories.
    #[arg(long, default_value = "data")]
    pub data_root: PathBuf,
}

impl DataRootArgs {
    /// `<data_root>/<run>`.
    pub fn run_dir(&self, run: &str) -> PathBuf {
        self.data_root.join(run)
    }

    /// Run names present under the data root, sorted. Missing root yields an empty list.
    pub fn list_runs(&self) -> Vec<String> {
        list_run_dirs(&self.data_root)
    }
}

fn list_run_dirs(root: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(root) else {
        return Vec::new();
    };
    let mut runs: Vec<String> = entries
        .flatten()
        .filter(|e| e.path().is_dir())
        .filter_map(|e| e.file_name().to_str().map(str::to_string))
        .collect();
    runs.sort();
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_runs_skips_files_and_sorts() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("2024_05_02_08_00")).unwrap();
        std::fs::create_dir(tmp.path().join("2024_05_01_08_00")).unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "x").unwrap();
        let args = DataRootArgs {
            data_root: tmp.path().to_path_buf(),
        };
        assert_eq!(args.list_runs(), ["2024_05_01_08_00", "2024_05_02_08_00"]);
        assert_eq!(
            args.run_dir("2024_05_01_08_00"),
            tmp.path().join("2024_05_01_08_00")
        );
    }

    #[test]
    fn missing_root_lists_nothing() {
        let args = DataRootArgs {
            data_root: PathBuf::from("/nonexistent/bearcart/data"),
        };
        assert!(args.list_runs().is_empty());
    }
}
