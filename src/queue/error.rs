//! Error types for work queue operations.

use thiserror::Error;

/// Errors that can occur during work queue operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    /// `acknowledge` was called with no outstanding item.
    #[error("acknowledge called more times than items were put ({puts} put, {acknowledged} acknowledged)")]
    Unbalanced {
        /// Items put so far.
        puts: u64,
        /// Acknowledgements accepted so far.
        acknowledged: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbalanced_display() {
        let msg = QueueError::Unbalanced {
            puts: 2,
            acknowledged: 2,
        }
        .to_string();
        assert!(msg.contains("2 put"), "got: {msg}");
        assert!(msg.contains("2 acknowledged"), "got: {msg}");
    }
}
