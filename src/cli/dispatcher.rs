use crate::cli::command_handlers::{
    AuditHandler, ChainHandler, CodecHandler, ConfigHandler, RenderHandler, RenderRequest,
};
use crate::cli::main_types::Commands;
use crate::core::Registry;
use crate::display::TableDisplay;
use crate::error::AppError;
use crate::storage::config::Config;
use crate::utils::logging::VerboseLogger;
use std::path::PathBuf;

pub struct Dispatcher {
    config: Config,
    config_path: PathBuf,
    logger: VerboseLogger,
    display: TableDisplay,
}

impl Dispatcher {
    pub fn new(config: Config, config_path: PathBuf, verbose: bool) -> Self {
        Self {
            config,
            config_path,
            logger: VerboseLogger::new(verbose),
            display: TableDisplay::new(),
        }
    }

    fn verbose(&self) -> bool {
        self.logger.is_enabled()
    }

    /// Run one command and return what it prints
    pub async fn dispatch(&mut self, command: Commands) -> Result<String, AppError> {
        match command {
            Commands::Render {
                template,
                context,
                context_file,
                raw,
                missing,
            } => {
                self.logger.log(&format!("Attempting render command - template: {}", template));
                let request = RenderRequest {
                    template,
                    context,
                    context_file,
                    raw,
                    missing,
                };
                RenderHandler::new().handle(request, &self.config, self.verbose())
            }
            Commands::Compress { text } => {
                self.logger.log("Attempting compress command");
                Ok(CodecHandler::new().compress(&text))
            }
            Commands::Decompress { text } => {
                self.logger.log("Attempting decompress command");
                CodecHandler::new().decompress(&text)
            }
            Commands::Chain { value, ops } => {
                self.logger.log(&format!("Attempting chain command - {} operation(s)", ops.len()));
                ChainHandler::new(Registry::shared()).handle(&value, &ops, self.verbose())
            }
            Commands::Functions => {
                self.logger.log("Attempting functions command");
                Ok(ChainHandler::new(Registry::shared()).list(&self.display))
            }
            Commands::Audit {
                event,
                message,
                log_file,
            } => {
                self.logger.log(&format!("Attempting audit command - event: {}", event));
                AuditHandler::new().handle(&event, &message, log_file, &self.config, self.verbose())
            }
            Commands::Config { command } => {
                self.logger.log(&format!("Attempting config command - {:?}", command));
                let verbose = self.verbose();
                ConfigHandler::new().handle(
                    command,
                    &mut self.config,
                    &self.config_path,
                    &self.display,
                    verbose,
                )
            }
        }
    }
}
