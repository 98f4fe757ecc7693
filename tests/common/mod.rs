#![allow(dead_code)]

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;

/// Tab separated log of `n_agents` walking in straight lines over `n_frames` frames,
/// frame ids spaced by 10.
pub fn straight_walkers_log(n_agents: usize, n_frames: usize) -> String {
    let mut out = String::new();
    for f in 0..n_frames {
        for a in 0..n_agents {
            let x = 0.4 * f as f64 + 2.0 * a as f64;
            let y = 0.3 * f as f64 - 1.5 * a as f64;
            out.push_str(&format!("{}\t{}\t{x}\t{y}\n", f * 10, a + 1));
        }
    }
    out
}

/// One agent (id 99) following a sine wave, appended to a straight walkers log.
pub fn with_wavy_agent(mut log: String, n_frames: usize) -> String {
    for f in 0..n_frames {
        let t = f as f64;
        log.push_str(&format!("{}\t99\t{t}\t{}\n", f * 10, (1.3 * t).sin()));
    }
    log
}

/// Fresh temporary directory with a UTF-8 path.
pub fn temp_dir() -> (TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    (dir, path)
}

pub fn write_log(dir: &Utf8Path, name: &str, content: &str) -> Utf8PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}
