//! Run configuration and its builder.

use super::executor::Sorter;
use crate::core::date::FilenameDatePatterns;
use crate::core::organize::{CollisionPolicy, NamingPattern, DEFAULT_PATTERN};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Default prune directory, relative to each scanned root
pub const DEFAULT_PRUNE_DIR: &str = ".pruned";

/// Configuration for one sort run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SortConfig {
    /// Directories to sort; all share one duplicate index
    pub roots: Vec<PathBuf>,
    /// Where sorted files go (None = the root itself; required with several roots)
    pub destination: Option<PathBuf>,
    /// Naming pattern template
    pub pattern: String,
    pub collision_policy: CollisionPolicy,
    /// Report what would happen without touching any file
    pub dry_run: bool,
    /// Move non-images aside into `prune_dir`
    pub prune: bool,
    /// Prune directory; relative paths are taken under each root
    pub prune_dir: PathBuf,
    /// Write resolved dates back into files that lack one
    pub fix_metadata: bool,
    /// Extra filename date regexes, tried before the default
    pub filename_patterns: Vec<String>,
    pub include_hidden: bool,
    pub follow_symlinks: bool,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            roots: vec![PathBuf::from(".")],
            destination: None,
            pattern: DEFAULT_PATTERN.to_string(),
            collision_policy: CollisionPolicy::default(),
            dry_run: false,
            prune: false,
            prune_dir: PathBuf::from(DEFAULT_PRUNE_DIR),
            fix_metadata: false,
            filename_patterns: Vec::new(),
            include_hidden: false,
            follow_symlinks: false,
        }
    }
}

/// Builder for a [`Sorter`]
pub struct SorterBuilder {
    config: SortConfig,
    cancel: Option<Arc<AtomicBool>>,
}

impl SorterBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self {
            config: SortConfig::default(),
            cancel: None,
        }
    }

    /// Start from an existing configuration
    pub fn from_config(config: SortConfig) -> Self {
        Self {
            config,
            cancel: None,
        }
    }

    /// Directory to sort, replacing any set earlier
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.roots = vec![root.into()];
        self
    }

    /// Several directories sorted into one destination
    pub fn roots<I, P>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.config.roots = roots.into_iter().map(Into::into).collect();
        self
    }

    /// Destination root for sorted files
    pub fn destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.config.destination = Some(destination.into());
        self
    }

    /// Naming pattern template
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.pattern = pattern.into();
        self
    }

    pub fn collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.config.collision_policy = policy;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.config.dry_run = dry_run;
        self
    }

    pub fn prune(mut self, prune: bool) -> Self {
        self.config.prune = prune;
        self
    }

    pub fn prune_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.prune_dir = dir.into();
        self
    }

    pub fn fix_metadata(mut self, fix: bool) -> Self {
        self.config.fix_metadata = fix;
        self
    }

    /// Add a filename date regex (tried before the default)
    pub fn filename_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.filename_patterns.push(pattern.into());
        self
    }

    /// Include hidden files
    pub fn include_hidden(mut self, include: bool) -> Self {
        self.config.include_hidden = include;
        self
    }

    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.config.follow_symlinks = follow;
        self
    }

    /// Flag checked between files; setting it stops the run
    pub fn cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Validate the configuration and build the sorter
    pub fn build(self) -> Result<Sorter, ConfigError> {
        let pattern = NamingPattern::parse(&self.config.pattern)?;
        let filename_dates = FilenameDatePatterns::new(&self.config.filename_patterns)?;

        match self.config.roots.len() {
            0 => {
                return Err(ConfigError::InvalidSources {
                    reason: "no directory to sort".to_string(),
                })
            }
            1 => {}
            _ if self.config.destination.is_none() => {
                return Err(ConfigError::InvalidSources {
                    reason: "sorting several directories needs a destination".to_string(),
                })
            }
            _ => {}
        }

        if let Some(ref destination) = self.config.destination {
            if destination.exists() && !destination.is_dir() {
                return Err(ConfigError::InvalidDestination {
                    path: destination.clone(),
                    reason: "not a directory".to_string(),
                });
            }
        }

        if self.config.prune_dir.as_os_str().is_empty() {
            return Err(ConfigError::InvalidDestination {
                path: self.config.prune_dir.clone(),
                reason: "prune directory must not be empty".to_string(),
            });
        }

        Ok(Sorter::new(
            self.config,
            pattern,
            Arc::new(filename_dates),
            self.cancel.unwrap_or_default(),
        ))
    }
}

impl Default for SorterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
