use folio_core::config::{AppConfig, LoadOptions, ProviderSettings};

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let mut lines =
        vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(render_line("server.bind_address", &config.server.bind_address));
    lines.push(render_line("server.port", &config.server.port.to_string()));
    lines.push(render_line("server.cors_origins", &config.server.cors_origins.join(", ")));

    lines.push(render_line("data.data_dir", &config.data.data_dir.display().to_string()));
    lines.push(render_line("data.static_dir", &config.data.static_dir.display().to_string()));
    lines.push(render_line("data.asset_path", &config.data.asset_path));

    lines.extend(render_provider("ai.groq", &config.ai.groq));
    lines.extend(render_provider("ai.openai", &config.ai.openai));
    lines.extend(render_provider("ai.anthropic", &config.ai.anthropic));
    lines.push(render_line("ai.cache_enabled", &config.ai.cache_enabled.to_string()));
    lines.push(render_line("ai.cache_ttl_secs", &config.ai.cache_ttl_secs.to_string()));

    lines.push(render_line("logging.level", &config.logging.level));
    lines.push(render_line("logging.format", &format!("{:?}", config.logging.format)));

    lines.join("\n")
}

fn render_provider(prefix: &str, settings: &ProviderSettings) -> Vec<String> {
    // Keys are never printed, only their presence.
    let api_key = if settings.has_api_key() { "<redacted>" } else { "<unset>" };
    vec![
        render_line(&format!("{prefix}.api_key"), api_key),
        render_line(&format!("{prefix}.model"), &settings.model),
        render_line(&format!("{prefix}.temperature"), &settings.temperature.to_string()),
        render_line(&format!("{prefix}.max_tokens"), &settings.max_tokens.to_string()),
        render_line(&format!("{prefix}.timeout_secs"), &settings.timeout_secs.to_string()),
    ]
}

fn render_line(key: &str, value: &str) -> String {
    format!("  {key} = {value}")
}
