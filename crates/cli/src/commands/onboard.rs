//! `parley onboard`: first-time setup.

use parley_config::AppConfig;
use std::path::Path;

pub async fn run(config_path: Option<&Path>, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = match config_path {
        Some(path) => path.to_path_buf(),
        None => AppConfig::config_dir().join("config.toml"),
    };

    println!("parley setup");
    println!("============\n");

    if let Some(dir) = config_path.parent()
        && !dir.as_os_str().is_empty()
        && !dir.exists()
    {
        std::fs::create_dir_all(dir)?;
        println!("Created config directory: {}", dir.display());
    }

    if config_path.exists() && !force {
        println!("Config already exists at: {}", config_path.display());
        println!("Edit it manually, or re-run with --force to overwrite.");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("Wrote config: {}", config_path.display());

    println!("\nNext steps:");
    println!("  1. Set a model key:   export DASHSCOPE_API_KEY=...   (or PARLEY_API_KEY)");
    println!("  2. Set a search key:  export EXA_API_KEY=...         (or set tools.web_search = false)");
    println!("  3. Start serving:     parley serve");
    println!("  4. Or ask directly:   parley chat -m \"What is 2+2?\"");

    Ok(())
}
