//! TOML parser with helpful error messages

use super::schema::ProjectConfig;
use anyhow::{Context, Result};
use std::path::Path;

/// Parse tessera.toml with detailed error messages
pub fn parse_project_toml(path: &Path) -> Result<ProjectConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_project_toml_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse tessera.toml content from string
pub fn parse_project_toml_str(content: &str) -> Result<ProjectConfig> {
    let config: ProjectConfig =
        toml::from_str(content).map_err(|e| enhance_toml_error(e, content))?;

    config.validate()?;

    Ok(config)
}

/// Attach the offending source lines to a TOML error
fn enhance_toml_error(error: toml::de::Error, content: &str) -> anyhow::Error {
    let message = error.message().to_string();

    let line_num = error.span().and_then(|span| {
        content
            .get(..span.start)
            .map(|before| before.matches('\n').count() + 1)
    });

    match line_num {
        Some(line_num) => anyhow::anyhow!(
            "TOML parsing error at line {}:\n{}\n\nError: {}",
            line_num,
            line_context(content, line_num),
            message
        ),
        None => anyhow::anyhow!("TOML parsing error: {}", message),
    }
}

fn line_context(content: &str, line_num: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start = line_num.saturating_sub(2);
    let end = (line_num + 1).min(lines.len());

    lines[start.min(end)..end]
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let num = start + i + 1;
            let marker = if num == line_num { ">>>" } else { "   " };
            format!("{} {:4} | {}", marker, num, line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const VALID: &str = r#"
project = "Example"

[options]
org_id = "org-1"
owners = ["0x1111111111111111111111111111111111111111"]
threshold = 1
proposers = ["0x2222222222222222222222222222222222222222"]
testnets = ["anvil"]

[networks.anvil]
chain_id = 31337
rpc_url = "http://127.0.0.1:8545"
local = true

[contracts.Token]
kind = "proxy"
code = "0x6080604052"
storage = [
  { key = "0x0000000000000000000000000000000000000000000000000000000000000001", value = "0x00000000000000000000000000000000000000000000000000000000000004d2" },
]

[protocol]
auth_factory = "0x000000000000000000000000000000000000a001"
auth_init_code_hash = "0x1111111111111111111111111111111111111111111111111111111111111111"
manager_factory = "0x000000000000000000000000000000000000a002"
manager_init_code_hash = "0x2222222222222222222222222222222222222222222222222222222222222222"
"#;

    #[test]
    fn parses_full_project() {
        let config = parse_project_toml_str(VALID).unwrap();
        assert_eq!(config.project, "Example");
        assert_eq!(config.options.org_id, "org-1");
        assert_eq!(config.networks["anvil"].chain_id, 31337);
        assert!(config.networks["anvil"].local);
        assert_eq!(config.contracts["Token"].storage.len(), 1);
        assert!(config.relay.is_none());
    }

    #[test]
    fn unknown_target_network_fails_validation() {
        let toml = VALID.replace(r#"testnets = ["anvil"]"#, r#"testnets = ["sepolia"]"#);
        let err = parse_project_toml_str(&toml).unwrap_err();
        assert!(format!("{err:#}").contains("sepolia"));
    }

    #[test]
    fn storage_on_immutable_is_rejected() {
        let toml = VALID.replace(r#"kind = "proxy""#, r#"kind = "immutable""#);
        assert!(parse_project_toml_str(&toml).is_err());
    }

    #[test]
    fn syntax_error_reports_line() {
        let toml = "project = \"x\"\n[options\nthreshold = 1\n";
        let err = parse_project_toml_str(toml).unwrap_err().to_string();
        assert!(err.contains("line 2"), "unexpected error: {err}");
        assert!(err.contains(">>>"));
    }

    #[test]
    fn parse_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", VALID).unwrap();

        let config = parse_project_toml(temp_file.path()).unwrap();
        assert!(config.contracts.contains_key("Token"));
    }

    #[test]
    fn parse_nonexistent_file() {
        let result = parse_project_toml(Path::new("/nonexistent/path/tessera.toml"));
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }
}
