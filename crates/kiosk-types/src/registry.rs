//! Registry trait for self-registering backend implementations.

/// Base trait for implementation registries.
///
/// Each pluggable backend module provides a `Registry` struct implementing
/// this trait, declaring the name it is configured under and the factory that
/// builds it.
pub trait ImplementationRegistry {
	/// Name used in configuration files, e.g. "sqlite" for
	/// `[storage.implementations.sqlite]`.
	const NAME: &'static str;

	/// Factory function type of this implementation family.
	type Factory;

	/// Returns the factory function for this implementation.
	fn factory() -> Self::Factory;
}
