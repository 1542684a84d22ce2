//! Built-in tool implementations for parley.
//!
//! Tools give the agent loop a way to act on the world. Which ones are
//! enabled is decided by the `[tools]` config section.

pub mod web_search;

use parley_config::AppConfig;
use parley_core::tool::Tool;
use parley_core::Result;
use std::sync::Arc;
use tracing::info;

pub use web_search::WebSearchTool;

/// Build the configured tools, in prompt order.
///
/// An enabled tool with missing credentials is a configuration error.
pub fn build_tools(config: &AppConfig) -> Result<Vec<Arc<dyn Tool>>> {
    let mut tools: Vec<Arc<dyn Tool>> = Vec::new();

    if config.tools.web_search {
        let key = config.tools.exa_api_key.clone().unwrap_or_default();
        let search = WebSearchTool::new(key, &config.tools.exa_api_url)?
            .with_num_results(config.tools.num_results);
        tools.push(Arc::new(search));
    }

    info!(
        tools = ?tools.iter().map(|t| t.name().to_string()).collect::<Vec<_>>(),
        "Tools ready"
    );
    Ok(tools)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn web_search_requires_key() {
        let config = AppConfig::default();
        assert!(build_tools(&config).is_err());
    }

    #[test]
    fn web_search_built_with_key() {
        let mut config = AppConfig::default();
        config.tools.exa_api_key = Some("exa-key".into());
        let tools = build_tools(&config).unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name(), "Exa Search API");
    }

    #[test]
    fn disabled_tools_need_no_credentials() {
        let mut config = AppConfig::default();
        config.tools.web_search = false;
        assert!(build_tools(&config).unwrap().is_empty());
    }
}
