//! Symbols that older artifacts reference.
//!
//! Artifacts written by earlier releases contain a `remainder` stage: a
//! placeholder recording the training columns that no role covered. Current
//! code still writes it, but decoding it is gated on registration so that the
//! set of accepted stage kinds is explicit. Call [`ensure_legacy_symbols`]
//! before decoding any artifact.

use once_cell::sync::OnceCell;
use tracing::debug;

static REMAINDER_STAGE: OnceCell<()> = OnceCell::new();

/// Register the legacy stage kinds. Idempotent and thread-safe.
pub fn ensure_legacy_symbols() {
    REMAINDER_STAGE.get_or_init(|| {
        debug!("Registered legacy 'remainder' stage kind");
    });
}

/// Whether the `remainder` stage kind may be decoded.
pub fn remainder_registered() -> bool {
    REMAINDER_STAGE.get().is_some()
}
