use permtrail_core_types::RunId;
use thiserror::Error;

/// Result type alias using AuditError
pub type Result<T> = std::result::Result<T, AuditError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// This taxonomy provides a stable, structured classification of all errors
/// in permtrail. Each kind maps to a stable error code that can be used for
/// programmatic error handling, testing, and log assertions.
///
/// Only `Capture`, `Parse` and `Timeout` are fatal to an audit run. The
/// orchestrator degrades on `Persistence` and `Notify` so that an operator is
/// still told about detected changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExErrorKind {
    // Structural/Validation
    InvalidInput,
    /// A resource that must already exist (such as the change database) is missing
    NotFound,

    // Audit pipeline
    /// Permission source unreachable, exited non-zero, or produced no output
    Capture,
    /// Capture bytes could not be read or decoded at all
    Parse,
    /// Change store unavailable or corrupt
    Persistence,
    /// Alert sink unreachable or rejected the message
    Notify,
    /// A bounded wait (capture, trigger, dispatch) expired
    Timeout,
    /// The trigger source went away before signalling
    Cancelled,
    /// Audit run moved along an edge the run state machine does not allow
    InvalidTransition,

    // Integration/IO
    Io,
    Serialization,
    Concurrency,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::Capture => "ERR_CAPTURE",
            ExErrorKind::Parse => "ERR_PARSE",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Notify => "ERR_NOTIFY",
            ExErrorKind::Timeout => "ERR_TIMEOUT",
            ExErrorKind::Cancelled => "ERR_CANCELLED",
            ExErrorKind::InvalidTransition => "ERR_INVALID_TRANSITION",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Concurrency => "ERR_CONCURRENCY",
        }
    }

    /// Whether an error of this kind ends an audit run in `Failed`
    pub fn is_fatal_to_run(&self) -> bool {
        matches!(
            self,
            ExErrorKind::Capture
                | ExErrorKind::Parse
                | ExErrorKind::Timeout
                | ExErrorKind::Cancelled
        )
    }
}

/// Canonical structured error type
///
/// This error type provides a structured representation of errors with
/// classification fields for programmatic handling and rich context for debugging.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    run_id: Option<RunId>,
    path: Option<String>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            run_id: None,
            path: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add audit run context
    pub fn with_run_id(mut self, run_id: RunId) -> Self {
        self.run_id = Some(run_id);
        self
    }

    /// Add filesystem path context (a monitored target or a file on disk)
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the audit run context, if any
    pub fn run_id(&self) -> Option<&RunId> {
        self.run_id.as_ref()
    }

    /// Get the path context, if any
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(path) = &self.path {
            write!(f, " (path: {})", path)?;
        }
        if let Some(run_id) = &self.run_id {
            write!(f, " (run_id: {})", run_id)?;
        }
        if let Some(source) = &self.source {
            write!(f, " caused by {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Domain error taxonomy for audit operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuditError {
    // ===== Capture Errors =====
    /// The permission source could not be started or reached
    #[error("Permission source unavailable for {target}: {reason}")]
    SourceUnavailable { target: String, reason: String },

    /// The permission source exited unsuccessfully
    #[error("Permission source exited with status {status} for {target}")]
    SourceExited { target: String, status: String },

    /// The permission source produced no output
    #[error("Permission source returned empty output for {target}")]
    EmptyCapture { target: String },

    /// The permission source did not finish in time
    #[error("Permission source timed out after {waited_ms}ms for {target}")]
    CaptureTimedOut { target: String, waited_ms: u64 },

    // ===== Parse Errors =====
    /// Capture text could not be read or decoded
    #[error("Capture is unreadable: {reason}")]
    UnreadableCapture { reason: String },

    // ===== Trigger Errors =====
    /// Nobody signalled the trigger before the deadline
    #[error("Trigger not received within {waited_ms}ms")]
    TriggerTimedOut { waited_ms: u64 },

    /// The trigger source disconnected without signalling
    #[error("Trigger source closed before signalling")]
    TriggerCancelled,

    // ===== Run Lifecycle Errors =====
    /// An audit run was mutated after reaching a terminal state
    #[error("Audit run {run_id} is already {status} and cannot move to {stage}")]
    RunFinalized {
        run_id: String,
        status: String,
        stage: String,
    },

    /// The requested stage does not follow the current one
    #[error("Audit run {run_id} cannot move from {from} to {to}")]
    IllegalTransition {
        run_id: String,
        from: String,
        to: String,
    },

    // ===== Delivery Errors =====
    /// The alert sink refused or failed to deliver a message
    #[error("Alert sink rejected message to {recipient}: {reason}")]
    SinkRejected { recipient: String, reason: String },

    // ===== Configuration Errors =====
    /// A configuration value is unusable
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl From<AuditError> for ExError {
    fn from(err: AuditError) -> Self {
        match err {
            AuditError::SourceUnavailable { target, reason } => ExError::new(ExErrorKind::Capture)
                .with_op("capture")
                .with_path(target)
                .with_message(format!("permission source unavailable: {}", reason)),

            AuditError::SourceExited { target, status } => ExError::new(ExErrorKind::Capture)
                .with_op("capture")
                .with_path(target)
                .with_message(format!("permission source exited with {}", status)),

            AuditError::EmptyCapture { target } => ExError::new(ExErrorKind::Capture)
                .with_op("capture")
                .with_path(target)
                .with_message("permission source returned empty output"),

            AuditError::CaptureTimedOut { target, waited_ms } => {
                ExError::new(ExErrorKind::Timeout)
                    .with_op("capture")
                    .with_path(target)
                    .with_message(format!("capture timed out after {}ms", waited_ms))
            }

            AuditError::UnreadableCapture { reason } => ExError::new(ExErrorKind::Parse)
                .with_op("parse_snapshot")
                .with_message(reason),

            AuditError::TriggerTimedOut { waited_ms } => ExError::new(ExErrorKind::Timeout)
                .with_op("await_trigger")
                .with_message(format!("trigger not received within {}ms", waited_ms)),

            AuditError::TriggerCancelled => ExError::new(ExErrorKind::Cancelled)
                .with_op("await_trigger")
                .with_message("trigger source closed before signalling"),

            AuditError::RunFinalized {
                run_id,
                status,
                stage,
            } => ExError::new(ExErrorKind::InvalidTransition)
                .with_op("advance_run")
                .with_run_id(RunId::from_string(run_id))
                .with_message(format!("run is already {}; cannot move to {}", status, stage)),

            AuditError::IllegalTransition { run_id, from, to } => {
                ExError::new(ExErrorKind::InvalidTransition)
                    .with_op("advance_run")
                    .with_run_id(RunId::from_string(run_id))
                    .with_message(format!("cannot move from {} to {}", from, to))
            }

            AuditError::SinkRejected { recipient, reason } => ExError::new(ExErrorKind::Notify)
                .with_op("send_alert")
                .with_message(format!("delivery to {} failed: {}", recipient, reason)),

            AuditError::InvalidConfig { reason } => ExError::new(ExErrorKind::InvalidInput)
                .with_op("config")
                .with_message(reason),
        }
    }
}
