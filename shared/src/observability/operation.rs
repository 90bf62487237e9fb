//! Operation timing for storage calls

use std::time::Instant;
use tracing::{info, warn, Span};
use uuid::Uuid;

/// Timing and identity for a single storage operation
#[derive(Debug, Clone)]
pub struct OperationContext {
    pub operation_id: String,
    pub operation: &'static str,
    pub target: String,
    pub start_time: Instant,
}

impl OperationContext {
    pub fn new(operation: &'static str, target: impl Into<String>) -> Self {
        Self {
            operation_id: Uuid::new_v4().to_string(),
            operation,
            target: target.into(),
            start_time: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.start_time.elapsed().as_millis()
    }

    pub fn span(&self) -> Span {
        tracing::info_span!(
            "storage_op",
            operation = self.operation,
            operation_id = %self.operation_id,
            resource = %self.target
        )
    }

    pub fn log_completion(&self, succeeded: bool) {
        let elapsed = self.elapsed_ms();

        if succeeded {
            info!(
                operation_id = %self.operation_id,
                operation = self.operation,
                resource = %self.target,
                duration_ms = elapsed,
                "Operation completed"
            );
        } else {
            warn!(
                operation_id = %self.operation_id,
                operation = self.operation,
                resource = %self.target,
                duration_ms = elapsed,
                "Operation failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_context() {
        let ctx = OperationContext::new("upload", "data/report.json.zstd");
        assert!(!ctx.operation_id.is_empty());
        assert_eq!(ctx.operation, "upload");
        assert_eq!(ctx.target, "data/report.json.zstd");
    }

    #[test]
    fn test_elapsed_time() {
        let ctx = OperationContext::new("list", "data/");
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert!(ctx.elapsed_ms() >= 10);
    }
}
