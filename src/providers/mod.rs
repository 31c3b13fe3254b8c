//! Production implementations of the trait abstractions in [`crate::traits`].
//!
//! Applications wire these in at startup; tests use [`crate::testing`]'s
//! fakes instead.

mod alloy;
mod http_proof_source;
mod local_signer;
mod tokio_clock;

pub use self::alloy::AlloyProvider;
pub use self::http_proof_source::HttpProofSource;
pub use self::local_signer::LocalSigner;
pub use self::tokio_clock::TokioClock;
