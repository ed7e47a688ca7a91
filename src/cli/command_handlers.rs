use crate::cli::main_types::ConfigCommands;
use crate::core::{Arg, Chain, Registry};
use crate::display::TableDisplay;
use crate::error::{AppError, CliError, StorageError};
use crate::security::audit::AuditLogger;
use crate::storage::config::Config;
use crate::template::{self, MissingPolicy, RenderOptions};
use crate::utils::compress;
use crate::utils::logging::print_verbose;
use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn parse_json(what: &str, text: &str) -> Result<Value, AppError> {
    serde_json::from_str(text).map_err(|e| {
        CliError::InvalidJson {
            what: what.to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

fn read_file(path: &Path) -> Result<String, AppError> {
    fs::read_to_string(path).map_err(|source| {
        StorageError::FileIo {
            path: path.to_string_lossy().to_string(),
            source,
        }
        .into()
    })
}

/// Inputs of the `render` command
#[derive(Debug, Default)]
pub struct RenderRequest {
    pub template: String,
    pub context: Option<String>,
    pub context_file: Option<PathBuf>,
    pub raw: bool,
    pub missing: Option<MissingPolicy>,
}

#[derive(Default)]
pub struct RenderHandler;

impl RenderHandler {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, request: RenderRequest, config: &Config, verbose: bool) -> Result<String, AppError> {
        let source = if request.template == "-" {
            print_verbose(verbose, "Reading template from stdin");
            io::read_to_string(io::stdin()).map_err(|source| StorageError::FileIo {
                path: "<stdin>".to_string(),
                source,
            })?
        } else {
            read_file(Path::new(&request.template))?
        };

        let context = match (&request.context, &request.context_file) {
            (Some(inline), _) => parse_json("--context", inline)?,
            (None, Some(path)) => parse_json(&path.display().to_string(), &read_file(path)?)?,
            (None, None) => Value::Object(Map::new()),
        };

        let mut options = RenderOptions::from_config(&config.template);
        if request.raw {
            options.escape = false;
        }
        if let Some(missing) = request.missing {
            options.missing = missing;
        }
        print_verbose(
            verbose,
            &format!("Rendering with escape={} missing={}", options.escape, options.missing),
        );

        template::render(&source, &context, &options)
    }
}

#[derive(Default)]
pub struct CodecHandler;

impl CodecHandler {
    pub fn new() -> Self {
        Self
    }

    pub fn compress(&self, text: &str) -> String {
        compress::compress(text)
    }

    pub fn decompress(&self, text: &str) -> Result<String, AppError> {
        compress::decompress(text)
    }
}

pub struct ChainHandler {
    registry: Arc<Registry>,
}

impl ChainHandler {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Run `ops` left to right over `value` and pretty-print the result
    pub fn handle(&self, value: &str, ops: &[String], verbose: bool) -> Result<String, AppError> {
        let start = parse_json("chain value", value)?;
        let mut chain = Chain::with_registry(start, Arc::clone(&self.registry));

        for op in ops {
            let (name, args) = parse_operation(op)?;
            print_verbose(verbose, &format!("Applying '{}' with {} argument(s)", name, args.len()));
            chain = chain.invoke(name, &args)?;
        }

        serde_json::to_string_pretty(chain.value_ref()).map_err(|e| {
            CliError::InvalidJson {
                what: "chain result".to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }

    pub fn list(&self, display: &TableDisplay) -> String {
        display.render_operations(self.registry.operations())
    }
}

/// Split `name` or `name:[args...]` into the operation name and its arguments
pub fn parse_operation(op: &str) -> Result<(&str, Vec<Arg>), AppError> {
    let (name, args) = match op.split_once(':') {
        Some((name, json)) => match parse_json(&format!("arguments of '{}'", name), json)? {
            Value::Array(items) => (name, items.into_iter().map(Arg::Value).collect()),
            other => {
                return Err(CliError::InvalidArguments(format!(
                    "arguments of '{}' must be a JSON array, got {}",
                    name, other
                ))
                .into());
            }
        },
        None => (op, Vec::new()),
    };

    let name = name.trim();
    if name.is_empty() {
        return Err(CliError::InvalidArguments(format!("missing operation name in '{}'", op)).into());
    }
    Ok((name, args))
}

#[derive(Default)]
pub struct AuditHandler;

impl AuditHandler {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(
        &self,
        event: &str,
        message: &str,
        log_file: Option<PathBuf>,
        config: &Config,
        verbose: bool,
    ) -> Result<String, AppError> {
        let logger = match log_file {
            Some(path) => AuditLogger::open(path)?,
            None => AuditLogger::from_config(&config.audit)?,
        };
        print_verbose(verbose, &format!("Audit log: {}", logger.path().display()));

        let entry = logger.log(event, message)?;
        Ok(format!(
            "✅ Recorded {} in {}",
            entry.event_type,
            logger.path().display()
        ))
    }
}

#[derive(Default)]
pub struct ConfigHandler;

impl ConfigHandler {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(
        &self,
        command: ConfigCommands,
        config: &mut Config,
        config_path: &Path,
        display: &TableDisplay,
        verbose: bool,
    ) -> Result<String, AppError> {
        match command {
            ConfigCommands::Show => {
                print_verbose(verbose, &format!("Config file: {}", config_path.display()));
                Ok(format!(
                    "Current Configuration ({}):\n{}",
                    config_path.display(),
                    display.render_key_values(&config.entries())
                ))
            }
            ConfigCommands::Set { key, value } => {
                print_verbose(verbose, &format!("Setting {} = {}", key, value));
                config.set(&key, &value)?;
                config.save(Some(config_path.to_path_buf()))?;
                Ok(format!("✅ {} = {}", key, value))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChainError;
    use crate::security::audit::read_entries;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_parse_operation() {
        let (name, args) = parse_operation("first").unwrap();
        assert_eq!(name, "first");
        assert!(args.is_empty());

        let (name, args) = parse_operation("pluck:[\"name\"]").unwrap();
        assert_eq!(name, "pluck");
        assert_eq!(args[0].as_value(), Some(&json!("name")));

        assert!(parse_operation("pluck:\"name\"").is_err());
        assert!(parse_operation("pluck:[").is_err());
        assert!(parse_operation(":[1]").is_err());
    }

    #[test]
    fn test_chain_handler_runs_operations_in_order() {
        let handler = ChainHandler::new(Registry::shared());
        let ops = vec!["flatten".to_string(), "uniq".to_string(), "last:[2]".to_string()];
        let output = handler.handle("[[1, 2], [2, 3]]", &ops, false).unwrap();
        assert_eq!(serde_json::from_str::<Value>(&output).unwrap(), json!([2, 3]));
    }

    #[test]
    fn test_chain_handler_unknown_operation() {
        let handler = ChainHandler::new(Registry::shared());
        let err = handler.handle("[1]", &["frobnicate".to_string()], false).unwrap_err();
        assert!(matches!(err, AppError::Chain(ChainError::UnknownFunction { .. })));
    }

    #[test]
    fn test_render_handler_with_file_and_overrides() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("greeting.tpl");
        fs::write(&path, "Hi <%= name %><%= title %>").unwrap();

        let request = RenderRequest {
            template: path.to_string_lossy().to_string(),
            context: Some("{\"name\": \"<Ann>\"}".to_string()),
            missing: Some(MissingPolicy::Empty),
            ..RenderRequest::default()
        };
        let output = RenderHandler::new().handle(request, &Config::default(), false).unwrap();
        assert_eq!(output, "Hi &lt;Ann&gt;");
    }

    #[test]
    fn test_render_handler_rejects_bad_context() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.tpl");
        fs::write(&path, "x").unwrap();

        let request = RenderRequest {
            template: path.to_string_lossy().to_string(),
            context: Some("{not json".to_string()),
            ..RenderRequest::default()
        };
        assert!(matches!(
            RenderHandler::new().handle(request, &Config::default(), false),
            Err(AppError::Cli(CliError::InvalidJson { .. }))
        ));
    }

    #[test]
    fn test_audit_handler_appends() {
        let dir = tempdir().unwrap();
        let log_file = dir.path().join("audit.log");
        let output = AuditHandler::new()
            .handle("login", "alice", Some(log_file.clone()), &Config::default(), false)
            .unwrap();

        assert!(output.contains("LOGIN"));
        assert_eq!(read_entries(&log_file).unwrap()[0].message, "alice");
    }

    #[test]
    fn test_config_handler_set_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        let display = TableDisplay::new().with_colors(false);

        ConfigHandler::new()
            .handle(
                ConfigCommands::Set {
                    key: "rate_limit.max_calls".to_string(),
                    value: "7".to_string(),
                },
                &mut config,
                &path,
                &display,
                false,
            )
            .unwrap();

        assert_eq!(Config::load(Some(path.clone())).unwrap().rate_limit.max_calls, 7);
        let shown = ConfigHandler::new()
            .handle(ConfigCommands::Show, &mut config, &path, &display, false)
            .unwrap();
        assert!(shown.contains("rate_limit.max_calls"));
    }

    #[test]
    fn test_codec_handler() {
        let codec = CodecHandler::new();
        assert_eq!(codec.compress("aaab"), "3a1b");
        assert_eq!(codec.decompress("3a1b").unwrap(), "aaab");
    }
}
