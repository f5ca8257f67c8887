//! Caller identity context for mutating operations.
//!
//! # Responsibility
//! - Carry the acting user identity through content-mutating calls.
//!
//! # Invariants
//! - The context is scoped to one logical operation; callers construct it
//!   for the call and drop it afterwards instead of stashing it globally.

/// Identity of the caller performing a mutation.
///
/// Backends stamp `created_by`/`modified_by` from this value. The context is
/// passed explicitly through each call boundary; there is no ambient
/// process-wide current user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorContext {
    name: String,
}

impl ActorContext {
    /// Creates a context for the named actor.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Creates the fallback context used when no caller identity exists.
    pub fn anonymous() -> Self {
        Self::new("nobody")
    }

    /// Returns the actor name used for audit stamping.
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::ActorContext;

    #[test]
    fn name_is_preserved() {
        assert_eq!(ActorContext::new("guest1").name(), "guest1");
        assert_eq!(ActorContext::anonymous().name(), "nobody");
    }
}
