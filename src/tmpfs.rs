use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// A unique path under the test scratch directory. Nothing is created;
/// the path is handed to the code under test. Drop removes the backing
/// file plus any `_request`/`_lock` sentinels derived from it.
pub struct TempPath {
    path: PathBuf,
}

impl TempPath {
    pub fn new() -> Self {
        let base = PathBuf::from("/tmp/batonkv_tests");
        fs::create_dir_all(&base).expect("create test scratch dir");

        let unique_name = format!("state_{}_{}", std::process::id(), unique_suffix());
        Self {
            path: base.join(unique_name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn remove_all(&self) {
        let _ = fs::remove_file(&self.path);
        for suffix in ["_request", "_lock"] {
            let mut name = self.path.as_os_str().to_os_string();
            name.push(suffix);
            let sentinel = PathBuf::from(name);
            // Either strategy may have created it
            let _ = fs::remove_dir(&sentinel);
            let _ = fs::remove_file(&sentinel);
        }
    }
}

impl Drop for TempPath {
    fn drop(&mut self) {
        self.remove_all();
    }
}

fn unique_suffix() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos() as u64;
    nanos ^ (COUNTER.fetch_add(1, Ordering::Relaxed) << 48)
}
