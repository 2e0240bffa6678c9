//! Logging macros shared by the HTTP handlers, services and store.
//!
//! Quiz, section and attempt identifiers are always logged under the same field
//! names (`quiz_id`, `section_id`, `attempt_id`) so log queries can join on them.

// ----------------------------------------------------------------------------
// HTTP handlers
// ----------------------------------------------------------------------------

#[macro_export]
macro_rules! log_api_start {
    ($operation:expr, quiz_id = $quiz_id:expr) => {
        tracing::debug!(operation = $operation, quiz_id = %$quiz_id, "Handling request");
    };
    ($operation:expr, section_id = $section_id:expr) => {
        tracing::debug!(operation = $operation, section_id = %$section_id, "Handling request");
    };
    ($operation:expr, attempt_id = $attempt_id:expr) => {
        tracing::debug!(operation = $operation, attempt_id = %$attempt_id, "Handling request");
    };
    ($operation:expr) => {
        tracing::debug!(operation = $operation, "Handling request");
    };
}

#[macro_export]
macro_rules! log_api_success {
    ($operation:expr, quiz_id = $quiz_id:expr, $msg:expr) => {
        tracing::info!(operation = $operation, quiz_id = %$quiz_id, "Request handled: {}", $msg);
    };
    ($operation:expr, section_id = $section_id:expr, $msg:expr) => {
        tracing::info!(operation = $operation, section_id = %$section_id, "Request handled: {}", $msg);
    };
    ($operation:expr, attempt_id = $attempt_id:expr, $msg:expr) => {
        tracing::info!(operation = $operation, attempt_id = %$attempt_id, "Request handled: {}", $msg);
    };
    ($operation:expr, count = $count:expr, $msg:expr) => {
        tracing::info!(operation = $operation, count = $count, "Request handled: {}", $msg);
    };
}

#[macro_export]
macro_rules! log_api_error {
    ($operation:expr, quiz_id = $quiz_id:expr, error = $error:expr, $msg:expr) => {
        tracing::error!(
            operation = $operation,
            quiz_id = %$quiz_id,
            error = %$error,
            "Request failed: {}", $msg
        );
    };
}

#[macro_export]
macro_rules! log_api_warn {
    ($operation:expr, quiz_id = $quiz_id:expr, $msg:expr) => {
        tracing::warn!(operation = $operation, quiz_id = %$quiz_id, "Request warning: {}", $msg);
    };
}

// ----------------------------------------------------------------------------
// Services
// ----------------------------------------------------------------------------

#[macro_export]
macro_rules! log_service_start {
    ($service:expr, $operation:expr, quiz_count = $count:expr) => {
        tracing::info!(
            service = $service,
            operation = $operation,
            quiz_count = $count,
            "Service operation started"
        );
    };
}

#[macro_export]
macro_rules! log_service_success {
    ($service:expr, $operation:expr, quiz_id = $quiz_id:expr, question_count = $count:expr) => {
        tracing::info!(
            service = $service,
            operation = $operation,
            quiz_id = %$quiz_id,
            question_count = $count,
            "Service operation completed"
        );
    };
    ($service:expr, $operation:expr, quiz_count = $count:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            service = $service,
            operation = $operation,
            quiz_count = $count,
            duration_ms = $duration,
            "Service operation completed"
        );
    };
}

/// Statement position only: the expansion ends in `;`
#[macro_export]
macro_rules! log_service_error {
    ($service:expr, $operation:expr, quiz_id = $quiz_id:expr, error = $error:expr) => {
        tracing::error!(
            service = $service,
            operation = $operation,
            quiz_id = %$quiz_id,
            error = %$error,
            "Service operation failed"
        );
    };
    ($service:expr, $operation:expr, error = $error:expr) => {
        tracing::error!(service = $service, operation = $operation, error = %$error, "Service operation failed");
    };
}

#[macro_export]
macro_rules! log_service_warn {
    ($service:expr, $operation:expr, $msg:expr) => {
        tracing::warn!(service = $service, operation = $operation, "Service warning: {}", $msg);
    };
}

// ----------------------------------------------------------------------------
// Store
// ----------------------------------------------------------------------------

#[macro_export]
macro_rules! log_db_operation {
    (debug, $operation:expr, quiz_id = $quiz_id:expr, duration_ms = $duration:expr) => {
        tracing::debug!(
            component = "database",
            operation = $operation,
            quiz_id = %$quiz_id,
            duration_ms = $duration,
            "Query finished"
        );
    };
    (debug, $operation:expr, count = $count:expr, duration_ms = $duration:expr) => {
        tracing::debug!(
            component = "database",
            operation = $operation,
            result_count = $count,
            duration_ms = $duration,
            "Query finished"
        );
    };
    (info, $operation:expr, $msg:expr) => {
        tracing::info!(component = "database", operation = $operation, "Store: {}", $msg);
    };
}

// ----------------------------------------------------------------------------
// Attempts
// ----------------------------------------------------------------------------

#[macro_export]
macro_rules! log_attempt_event {
    (started, attempt_id = $attempt_id:expr, quiz_id = $quiz_id:expr, mode = $mode:expr) => {
        tracing::info!(
            component = "attempt",
            attempt_id = %$attempt_id,
            quiz_id = %$quiz_id,
            mode = ?$mode,
            "Attempt started"
        );
    };
    (timed_out, attempt_id = $attempt_id:expr, questions = $questions:expr) => {
        tracing::debug!(
            component = "attempt",
            attempt_id = %$attempt_id,
            questions = ?$questions,
            "Question countdown elapsed"
        );
    };
    (finished, attempt_id = $attempt_id:expr, correct = $correct:expr, total = $total:expr) => {
        tracing::info!(
            component = "attempt",
            attempt_id = %$attempt_id,
            correct = $correct,
            total = $total,
            "Attempt finished"
        );
    };
}

// ----------------------------------------------------------------------------
// Startup and validation
// ----------------------------------------------------------------------------

#[macro_export]
macro_rules! log_system_event {
    (startup, component = $component:expr, $msg:expr) => {
        tracing::info!(event_type = "startup", component = $component, "System event: {}", $msg);
    };
    (config, $msg:expr) => {
        tracing::info!(event_type = "configuration", "System event: {}", $msg);
    };
}

#[macro_export]
macro_rules! log_validation {
    (success, $component:expr, $msg:expr) => {
        tracing::debug!(
            event_type = "validation",
            component = $component,
            result = "success",
            "Validation passed: {}", $msg
        );
    };
    (failure, $component:expr, error = $error:expr) => {
        tracing::warn!(
            event_type = "validation",
            component = $component,
            result = "failure",
            error = %$error,
            "Validation failed"
        );
    };
}
