//! Run-scoped storage for stylesheets, retrieval indexes, and output.
//!
//! Every pipeline run owns a unique run id; the stylesheet and index
//! roots are scoped under it so concurrent runs never share state, and
//! cleanup removes exactly one run's directories.

use crate::config::CloneConfig;
use crate::error::{CloneError, CloneResult};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Characters kept verbatim in output file names.
const FILE_NAME_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'.')
    .remove(b'-')
    .remove(b'_');

static RUN_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Derive the hostname of a URL: network location with scheme, path, and
/// exactly one leading `www.` removed.
pub fn hostname_of(url: &str) -> String {
    let after_scheme = url.split("//").last().unwrap_or(url);
    let host = after_scheme.split('/').next().unwrap_or(after_scheme);
    host.strip_prefix("www.").unwrap_or(host).to_string()
}

/// Filesystem-safe output file name for a URL.
///
/// Scheme is dropped, path separators become underscores, and any
/// remaining unsafe characters are percent-encoded.
pub fn output_file_name(url: &str) -> String {
    let after_scheme = url.split("//").last().unwrap_or(url);
    let flattened = after_scheme.replace('/', "_");
    format!("{}.html", utf8_percent_encode(&flattened, FILE_NAME_SET))
}

/// Storage scoped to a single pipeline run.
#[derive(Debug)]
pub struct RunStorage {
    run_id: String,
    css_dir: PathBuf,
    index_dir: PathBuf,
}

impl RunStorage {
    /// Create the run-scoped directories under the configured roots.
    pub fn new(config: &CloneConfig) -> CloneResult<Self> {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        let seq = RUN_COUNTER.fetch_add(1, Ordering::Relaxed);
        let run_id = format!("run-{:x}-{:x}", nanos, seq);

        let css_dir = config.css_root.join(&run_id);
        let index_dir = config.index_root.join(&run_id);
        std::fs::create_dir_all(&css_dir)?;
        std::fs::create_dir_all(&index_dir)?;

        log::debug!("run {} storage at {:?}", run_id, css_dir.parent());

        Ok(Self {
            run_id,
            css_dir,
            index_dir,
        })
    }

    /// The unique id of this run.
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Directory holding this run's raw stylesheet files.
    pub fn css_dir(&self) -> &Path {
        &self.css_dir
    }

    /// Per-hostname retrieval index directory for this run.
    pub fn index_dir(&self, hostname: &str) -> PathBuf {
        self.index_dir.join(hostname)
    }

    /// Save raw CSS content for a URL's hostname.
    ///
    /// Multi-part content is joined with a blank-line separator. The file
    /// is overwritten on re-save.
    pub fn save_stylesheet<S: AsRef<str>>(
        &self,
        content: &[S],
        url: &str,
    ) -> CloneResult<PathBuf> {
        if url.is_empty() {
            return Err(CloneError::InvalidInput("No URL provided"));
        }
        if content.is_empty() || content.iter().all(|part| part.as_ref().is_empty()) {
            return Err(CloneError::InvalidInput("No CSS content provided"));
        }

        let joined = content
            .iter()
            .map(|part| part.as_ref())
            .collect::<Vec<_>>()
            .join("\n\n");

        let hostname = hostname_of(url);
        let path = self.css_dir.join(format!("{}.css", hostname));
        std::fs::write(&path, joined)?;

        log::debug!("saved stylesheet for {} to {:?}", hostname, path);

        Ok(path)
    }

    /// Load the raw stylesheet stored for a hostname.
    pub fn load_stylesheet(&self, hostname: &str) -> CloneResult<String> {
        let path = self.css_dir.join(format!("{}.css", hostname));
        if !path.exists() {
            return Err(CloneError::MissingStylesheet(hostname.to_string()));
        }
        Ok(std::fs::read_to_string(&path)?)
    }

    /// Remove this run's stylesheet and index directories.
    ///
    /// Scoped to the run id; other runs' storage is untouched.
    pub fn cleanup(&self) -> CloneResult<()> {
        for dir in [&self.css_dir, &self.index_dir] {
            if dir.exists() {
                std::fs::remove_dir_all(dir)?;
            }
        }
        log::debug!("run {} storage removed", self.run_id);
        Ok(())
    }
}
