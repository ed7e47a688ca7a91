use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("ChainError: {0}")]
    Chain(#[from] ChainError),
    #[error("UtilsError: {0}")]
    Utils(#[from] UtilsError),
    #[error("FunctionError: {0}")]
    Function(#[from] FunctionError),
    #[error("SecurityError: {0}")]
    Security(#[from] SecurityError),
    #[error("TemplateError: {0}")]
    Template(#[from] TemplateError),
    #[error("StorageError: {0}")]
    Storage(#[from] StorageError),
    #[error("CliError: {0}")]
    Cli(#[from] CliError),
}

/// Failures of the chain wrapper's dynamic dispatch
#[derive(Error, Debug)]
pub enum ChainError {
    #[error("No callable function named '{name}'")]
    UnknownFunction { name: String },
    #[error("'{function}' expects {expected} argument(s), got {actual}")]
    ArityMismatch {
        function: String,
        expected: String,
        actual: usize,
    },
    #[error("Invalid argument {position} for '{function}': {message}")]
    InvalidArgument {
        function: String,
        position: usize,
        message: String,
    },
}

#[derive(Error, Debug)]
pub enum UtilsError {
    #[error("'{function}' expected {expected}, got {actual}")]
    TypeMismatch {
        function: String,
        expected: String,
        actual: String,
    },
    #[error("Invalid value: {message}")]
    InvalidValue { message: String },
    #[error("Callback failed: {message}")]
    Callback { message: String },
}

#[derive(Error, Debug)]
pub enum FunctionError {
    #[error("No tokio runtime available to schedule '{primitive}'")]
    NoRuntime { primitive: String },
}

/// Security domain failures: validation, sanitization, authorization and rate limiting
#[derive(Error, Debug)]
pub enum SecurityError {
    #[error("Rate limit exceeded: at most {max_calls} call(s) per {window_secs}s")]
    RateLimitExceeded { max_calls: usize, window_secs: f64 },
    #[error("Input validation failed for {param}: {message}")]
    InputValidation { param: String, message: String },
    #[error("Sanitization failed: {message}")]
    Sanitization { message: String },
    #[error("Authorization failed: {message}")]
    Authorization { message: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TemplateError {
    #[error("Unterminated tag starting at offset {offset}")]
    UnterminatedTag { offset: usize },
    #[error("Unknown tag '{tag}'")]
    UnknownTag { tag: String },
    #[error("Unmatched '{tag}' found")]
    UnmatchedEnd { tag: String },
    #[error("Unclosed '{block}' statement detected")]
    UnclosedBlock { block: String },
    #[error("Invalid expression: '{expr}'")]
    InvalidExpression { expr: String },
    #[error("Name '{name}' is not defined")]
    UndefinedName { name: String },
    #[error("Key '{key}' not found in '{path}'")]
    MissingKey { path: String, key: String },
    #[error("Method '{method}' is not allowed on {kind}")]
    MethodNotAllowed { method: String, kind: String },
    #[error("Forbidden identifier '{name}'")]
    Forbidden { name: String },
    #[error("Template exceeds maximum length of {max_length} characters")]
    TooLong { max_length: usize },
    #[error("Template context must be an object, got {kind}")]
    InvalidContext { kind: String },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("File I/O error at {path}: {source}")]
    FileIo {
        path: String,
        source: std::io::Error,
    },
    #[error("Configuration parse error: {message}")]
    ConfigParseError { message: String },
    #[error("Configuration save failed: {message}")]
    ConfigSaveFailed { message: String },
    #[error("Configuration directory not found")]
    ConfigDirNotFound,
    #[error("Malformed audit entry at line {line}")]
    MalformedAuditEntry { line: usize },
}

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("Invalid JSON in {what}: {message}")]
    InvalidJson { what: String, message: String },
    #[error("Unknown configuration key: {key}")]
    UnknownConfigKey { key: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ErrorSeverity {
    Critical,
    High,
    Medium,
    Low,
}

impl ErrorSeverity {
    pub fn emoji(&self) -> &'static str {
        match self {
            ErrorSeverity::Critical => "🚨",
            ErrorSeverity::High => "❌",
            ErrorSeverity::Medium => "⚠️",
            ErrorSeverity::Low => "ℹ️",
        }
    }
}

impl AppError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            AppError::Chain(_) => ErrorSeverity::Medium,
            AppError::Utils(_) => ErrorSeverity::Low,
            AppError::Function(_) => ErrorSeverity::Medium,
            AppError::Security(security_error) => match security_error {
                SecurityError::RateLimitExceeded { .. } => ErrorSeverity::Medium,
                SecurityError::Authorization { .. } => ErrorSeverity::Critical,
                _ => ErrorSeverity::High,
            },
            AppError::Template(_) => ErrorSeverity::Medium,
            AppError::Storage(StorageError::ConfigDirNotFound) => ErrorSeverity::Critical,
            AppError::Storage(_) => ErrorSeverity::High,
            AppError::Cli(_) => ErrorSeverity::Medium,
        }
    }

    /// Whether the error is the rate limiter rejecting an entry
    pub fn is_rate_limited(&self) -> bool {
        matches!(
            self,
            AppError::Security(SecurityError::RateLimitExceeded { .. })
        )
    }

    pub fn troubleshooting_hint(&self) -> Option<String> {
        match self {
            AppError::Chain(ChainError::UnknownFunction { .. }) => {
                Some("'unicore functions' lists every registered operation".to_string())
            }
            AppError::Security(SecurityError::RateLimitExceeded { window_secs, .. }) => Some(
                format!("Back off and retry after at most {}s", window_secs),
            ),
            AppError::Template(TemplateError::UndefinedName { .. })
            | AppError::Template(TemplateError::MissingKey { .. }) => Some(
                "Add the key to the context or render with '--missing empty'".to_string(),
            ),
            AppError::Storage(StorageError::ConfigParseError { .. }) => {
                Some("'unicore config show' prints the effective configuration".to_string())
            }
            _ => None,
        }
    }
}
