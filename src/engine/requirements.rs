//! Requirement and composition expression parsing.
//!
//! Both languages are the same comma-separated identifier list, e.g.
//! `"position, velocity, !frozen"`. Whitespace is stripped before
//! splitting and empty tokens are skipped, so `"a,,b"` and `" a , b "`
//! both parse. The input is never mutated; tokens borrow nothing.
//!
//! For **system requirements**, a `!`-prefixed token contributes to the
//! `must_not_have` mask and is not recorded in the ordered type list; plain
//! tokens contribute to `must_have` and are appended in token order, which
//! is the order the callback context's component indices refer to.
//!
//! For **entity compositions**, only plain tokens are recognised. A `!`
//! token never matches a registered identifier and fails like any unknown
//! name.

use crate::engine::component::TypeRegistry;
use crate::engine::error::RequirementError;
use crate::engine::signature::Signature;
use crate::engine::types::ComponentId;


/// Splits an expression into identifier tokens.
///
/// Strips all whitespace, splits on commas, and drops empty tokens.
pub fn tokenize(input: &str) -> Vec<String> {
    let stripped: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    stripped
        .split(',')
        .filter(|token| !token.is_empty())
        .map(String::from)
        .collect()
}

/// Parsed form of a system requirement expression.
#[derive(Debug)]
pub struct SystemRequirements {
    /// Types the archetype signature must contain.
    pub must_have: Signature,

    /// Types the archetype signature must not contain.
    pub must_not_have: Signature,

    /// Positive requirements in token order; the callback context indexes
    /// components by position in this list.
    pub types: Vec<ComponentId>,
}

/// Parses a system requirement expression against the registry.
///
/// ## Errors
/// - `TooManyRequirements` if the expression names more types than are
///   registered.
/// - `UnknownType` if a token (after stripping `!`) fails to resolve.
pub fn parse_system_requirements(
    registry: &TypeRegistry,
    input: &str,
) -> Result<SystemRequirements, RequirementError> {
    let tokens = tokenize(input);
    if tokens.len() > registry.len() {
        return Err(RequirementError::TooManyRequirements {
            requested: tokens.len(),
            registered: registry.len(),
        });
    }

    let mut must_have = Signature::with_capacity(registry.len());
    let mut must_not_have = Signature::with_capacity(registry.len());
    let mut types = Vec::with_capacity(tokens.len());

    for token in tokens {
        match token.strip_prefix('!') {
            Some(name) => {
                let id = registry
                    .lookup(name)
                    .ok_or(RequirementError::UnknownType { token: token.clone() })?;
                must_not_have.set(id);
            }
            None => {
                let id = registry
                    .lookup(&token)
                    .ok_or(RequirementError::UnknownType { token: token.clone() })?;
                must_have.set(id);
                types.push(id);
            }
        }
    }

    Ok(SystemRequirements { must_have, must_not_have, types })
}

/// Parses an entity composition expression into a signature.
///
/// Only positive tokens are recognised; `!`-prefixed or unknown tokens
/// fail with `UnknownType`.
pub fn parse_composition(
    registry: &TypeRegistry,
    input: &str,
) -> Result<Signature, RequirementError> {
    let tokens = tokenize(input);
    if tokens.len() > registry.len() {
        return Err(RequirementError::TooManyRequirements {
            requested: tokens.len(),
            registered: registry.len(),
        });
    }

    let mut mask = Signature::with_capacity(registry.len());
    for token in tokens {
        let id = registry
            .lookup(&token)
            .ok_or(RequirementError::UnknownType { token: token.clone() })?;
        mask.set(id);
    }

    Ok(mask)
}
