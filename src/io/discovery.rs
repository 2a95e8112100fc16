//! Finding the per-chain output files of a sampler run and reading them in
//! parallel.
//!
//! Samplers typically write one file per chain named `<prefix><n>.csv`, e.g.
//! `output_1.csv`, `output_2.csv`, ...

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use rayon::prelude::*;

use crate::chain::Chain;
use crate::error::Result;
use crate::io::reader::ChainReader;

/**
Lists the files in `dir` named `<prefix><n>.csv` for a positive integer `n`,
sorted by `n`.

Other entries, including subdirectories, are ignored.

# Examples

```rust
use mcmc_chains::io::discovery::discover_chain_files;

let dir = tempfile::tempdir()?;
for name in ["out10.csv", "out2.csv", "out.csv", "other1.csv"] {
    std::fs::write(dir.path().join(name), "a,b\n")?;
}
let files = discover_chain_files(dir.path(), "out")?;
let numbers: Vec<usize> = files.iter().map(|(n, _)| *n).collect();
assert_eq!(numbers, vec![2, 10]);
# Ok::<(), Box<dyn std::error::Error>>(())
```
*/
pub fn discover_chain_files<P: AsRef<Path>>(dir: P, prefix: &str) -> Result<Vec<(usize, PathBuf)>> {
    let mut found = Vec::new();
    for entry in fs::read_dir(dir.as_ref())? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let number = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| chain_number(name, prefix));
        match number {
            Some(n) => found.push((n, path)),
            None => log::trace!("ignoring {}", path.display()),
        }
    }
    found.sort_by_key(|(n, _)| *n);
    log::debug!(
        "found {} chain files with prefix `{}` in {}",
        found.len(),
        prefix,
        dir.as_ref().display()
    );
    Ok(found)
}

/// The `n` of a `<prefix><n>.csv` file name.
fn chain_number(file_name: &str, prefix: &str) -> Option<usize> {
    let digits = file_name.strip_prefix(prefix)?.strip_suffix(".csv")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<usize>().ok().filter(|&n| n > 0)
}

/// Reads every file in `paths` in parallel, keeping the input order.
///
/// Fails with the first error encountered; no chains are returned then.
pub fn read_chain_files<P>(reader: &ChainReader, paths: &[P]) -> Result<Vec<Chain>>
where
    P: AsRef<Path> + Sync,
{
    paths.par_iter().map(|p| reader.read_path(p)).collect()
}

/// Like [`read_chain_files`], showing one progress bar per file.
pub fn read_chain_files_with_progress<P>(reader: &ChainReader, paths: &[P]) -> Result<Vec<Chain>>
where
    P: AsRef<Path> + Sync,
{
    let multi = MultiProgress::new();
    let pb_style = ProgressStyle::default_bar()
        .template("{prefix} [{elapsed_precise}] {bar:40.cyan/blue} {bytes}/{total_bytes} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");

    paths
        .par_iter()
        .map(|path| -> Result<Chain> {
            let path = path.as_ref();
            let file = File::open(path)?;
            let pb = multi.add(ProgressBar::new(file.metadata()?.len()));
            pb.set_prefix(
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            );
            pb.set_style(pb_style.clone());

            let chain = reader.read(BufReader::new(pb.wrap_read(file)))?;
            pb.finish_with_message("Done!");
            Ok(chain)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use tempfile::tempdir;

    #[test]
    fn test_chain_number() {
        assert_eq!(chain_number("samples_3.csv", "samples_"), Some(3));
        assert_eq!(chain_number("samples_12.csv", "samples_"), Some(12));
        assert_eq!(chain_number("samples_0.csv", "samples_"), None);
        assert_eq!(chain_number("samples_.csv", "samples_"), None);
        assert_eq!(chain_number("samples_1.txt", "samples_"), None);
        assert_eq!(chain_number("samples_1a.csv", "samples_"), None);
        assert_eq!(chain_number("other_1.csv", "samples_"), None);
    }

    #[test]
    fn test_discover_sorted_by_number() {
        let dir = tempdir().unwrap();
        for name in ["s10.csv", "s2.csv", "s1.csv", "s1.csv.bak", "notes.txt"] {
            fs::write(dir.path().join(name), "a,b\n").unwrap();
        }
        fs::create_dir(dir.path().join("s3.csv")).unwrap();

        let files = discover_chain_files(dir.path(), "s").unwrap();
        let numbers: Vec<usize> = files.iter().map(|(n, _)| *n).collect();
        assert_eq!(numbers, vec![1, 2, 10]);
        assert!(files[2].1.ends_with("s10.csv"));
    }

    #[test]
    fn test_discover_missing_dir() {
        let dir = tempdir().unwrap();
        let result = discover_chain_files(dir.path().join("nope"), "s");
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_read_chain_files_keeps_order() {
        let dir = tempdir().unwrap();
        for n in 1..=4 {
            let body = format!("lp__,x\n{n},{}\n", n * 10);
            fs::write(dir.path().join(format!("c{n}.csv")), body).unwrap();
        }
        let paths: Vec<PathBuf> = discover_chain_files(dir.path(), "c")
            .unwrap()
            .into_iter()
            .map(|(_, p)| p)
            .collect();

        let reader = ChainReader::new();
        for chains in [
            read_chain_files(&reader, &paths).unwrap(),
            read_chain_files_with_progress(&reader, &paths).unwrap(),
        ] {
            let lp: Vec<f64> = chains.iter().map(|c| c.sample_matrix(false)[[0, 0]]).collect();
            assert_eq!(lp, vec![1.0, 2.0, 3.0, 4.0]);
        }
    }

    #[test]
    fn test_read_chain_files_propagates_errors() {
        let dir = tempdir().unwrap();
        let good = dir.path().join("c1.csv");
        let bad = dir.path().join("c2.csv");
        fs::write(&good, "a,b\n1,2\n").unwrap();
        fs::write(&bad, "a,b\n1\n").unwrap();
        let result = read_chain_files(&ChainReader::new(), &[good, bad]);
        assert!(matches!(result, Err(Error::RowWidthMismatch { .. })));
    }
}
