use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use subtopo_cli::CacheCommands;
use subtopo_io::{load_history, save_history, CacheKeyInputs, HistoryCache};
use tracing::info;

pub fn handle(command: &CacheCommands) -> Result<()> {
    match command {
        CacheCommands::Key { history } => {
            let history = load_history(history)?;
            println!("{}", CacheKeyInputs::of_history(&history).key());
            Ok(())
        }
        CacheCommands::Store { history, root } => {
            let cache = open(root.as_deref())?;
            let history = load_history(history)?;
            let key = CacheKeyInputs::of_history(&history).key();
            let path = cache.store(&key, &history)?;
            println!("{key}");
            info!("Stored under {}", path.display());
            Ok(())
        }
        CacheCommands::Load { key, out, root } => {
            let cache = open(root.as_deref())?;
            let Some(history) = cache.load(key)? else {
                bail!("no cached history for key {key} in {}", cache.root().display());
            };
            if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            save_history(out, &history)?;
            println!("History written to {}", out.display());
            Ok(())
        }
    }
}

fn open(root: Option<&Path>) -> Result<HistoryCache> {
    match root {
        Some(root) => Ok(HistoryCache::new(PathBuf::from(root))),
        None => HistoryCache::open_default(),
    }
}
