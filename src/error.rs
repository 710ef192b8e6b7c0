use thiserror::Error;

/// Errors surfaced by key generation, signing and verification.
///
/// Cache failures are deliberately absent: the bottom-tree cache degrades to
/// recomputation and never propagates into the signing path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error(
        "activation window [{activation_epoch}, {activation_epoch} + {num_active_epochs}) \
         does not fit a lifetime of {num_epochs} epochs"
    )]
    InvalidActivationParameters {
        activation_epoch: u64,
        num_active_epochs: u64,
        num_epochs: u64,
    },

    #[error("expanded activation window spans fewer than two bottom trees")]
    InsufficientBottomTrees,

    #[error("epoch {epoch} is outside the active window [{activation_start}, {activation_end})")]
    KeyNotActive {
        epoch: u64,
        activation_start: u64,
        activation_end: u64,
    },

    #[error("epoch {epoch} is outside the prepared window [{prepared_start}, {prepared_end})")]
    EpochNotPrepared {
        epoch: u64,
        prepared_start: u64,
        prepared_end: u64,
    },

    #[error("no encoding with the required digit sum found within {tries} attempts")]
    EncodingAttemptsExceeded { tries: usize },

    #[error("top tree has an empty root layer")]
    InvalidTopTree,

    #[error("bottom tree has an empty root layer")]
    InvalidBottomTree,

    #[error("epoch {epoch} exceeds the lifetime of {num_epochs} epochs")]
    EpochTooLarge { epoch: u64, num_epochs: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_offending_window() {
        let err = SignatureError::KeyNotActive {
            epoch: 16,
            activation_start: 0,
            activation_end: 16,
        };
        assert_eq!(
            err.to_string(),
            "epoch 16 is outside the active window [0, 16)"
        );
    }

    #[test]
    fn errors_compare_by_value() {
        assert_eq!(
            SignatureError::InsufficientBottomTrees,
            SignatureError::InsufficientBottomTrees
        );
        assert_ne!(
            SignatureError::InvalidTopTree,
            SignatureError::InvalidBottomTree
        );
    }
}
