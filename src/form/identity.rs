use std::collections::HashSet;

use crate::form::field_model::FieldType;

pub fn text_fingerprint(text: &str) -> String {
    use sha1::{Digest, Sha1};

    let mut hasher = Sha1::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Stable identifier for a control that carries neither `id` nor `name`.
///
/// Derived from what the control looks like and where it sits, so two passes
/// over the same markup synthesize the same token.
pub fn fallback_identifier(tag: &str, field_type: FieldType, label: &str, position: usize) -> String {
    let key = format!("{}::{}::{}::{}", tag, field_type, label, position);
    format!("field-{}", &text_fingerprint(&key)[..10])
}

/// Identifiers handed out during one extraction pass.
#[derive(Debug, Default)]
pub struct IdentifierRegistry {
    taken: HashSet<String>,
}

impl IdentifierRegistry {
    /// Claim `base`. On collision, returns the first free `base-N` (N >= 2)
    /// when `allow_suffix` is set, otherwise `None`.
    pub fn claim(&mut self, base: &str, allow_suffix: bool) -> Option<String> {
        if self.taken.insert(base.to_string()) {
            return Some(base.to_string());
        }
        if !allow_suffix {
            return None;
        }

        (2..)
            .map(|n| format!("{}-{}", base, n))
            .find(|candidate| !self.taken.contains(candidate))
            .inspect(|candidate| {
                self.taken.insert(candidate.clone());
            })
    }

    pub fn len(&self) -> usize {
        self.taken.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taken.is_empty()
    }
}
