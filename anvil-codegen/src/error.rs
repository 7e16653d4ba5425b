//! The crate's single error taxonomy.
//!
//! Every fallible public entry point returns `Result<T, Error>`. `Context`
//! additionally mirrors the most recent failure in an error slot
//! ([`crate::context::Context::last_error`]) so the C-style surface
//! described in the design (`ctx_get_error`) has something to read without
//! forcing every caller through `?`.

/// This crate's result alias.
pub type Result<T> = core::result::Result<T, Error>;

/// The closed set of ways a public `anvil-codegen` call can fail.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A null required argument, an out-of-range enumeration value, a
    /// struct field index past the end of the field list, or operands with
    /// mismatched types were passed to a construction API.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Allocation failed while building IR or growing an emission buffer.
    ///
    /// Rust aborts on allocation failure rather than returning it as a
    /// `Result`, so no code path in this crate currently constructs this
    /// variant; it is retained for taxonomy parity with the C-style API
    /// this crate's design is modeled on, and for forward compatibility
    /// with a caller-supplied fallible allocator.
    #[error("out of memory")]
    OutOfMemory,

    /// `Context::set_target` was asked for an architecture with no
    /// registered backend.
    #[error("no backend registered for architecture {0:?}")]
    NoBackend(crate::isa::Arch),

    /// The selected backend cannot lower a requested opcode/type
    /// combination, or a requested configuration (e.g. IEEE-754 on a target
    /// that only has IBM Hexadecimal Floating-Point) is not supported.
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// `Module::write` failed to open or write its destination file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An invariant the core itself is responsible for maintaining was
    /// violated. This indicates a bug in `anvil-codegen`, not misuse by the
    /// caller.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build an [`Error::InvalidArgument`] from a `Display`-able reason.
    pub fn invalid_argument(reason: impl core::fmt::Display) -> Self {
        Error::InvalidArgument(reason.to_string())
    }

    /// Build an [`Error::UnsupportedFeature`] from a `Display`-able reason.
    pub fn unsupported(reason: impl core::fmt::Display) -> Self {
        Error::UnsupportedFeature(reason.to_string())
    }

    /// Build an [`Error::Internal`] from a `Display`-able reason.
    pub fn internal(reason: impl core::fmt::Display) -> Self {
        Error::Internal(reason.to_string())
    }
}
