//! Write semantics for single-document saves.

/// Selects how [`Collection::save_with`](crate::collection::Collection::save_with)
/// treats a record that already carries the envelope's id.
///
/// Both policies key off the caller's `id`, so both leave exactly one record with
/// that id in the source. They differ in whether prior content is consulted:
///
/// - [`SavePolicy::Replace`] looks the record up first and overwrites it in full
///   (no field-level merge).
/// - [`SavePolicy::CreateNew`] issues a blind write without reading prior content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SavePolicy {
    #[default]
    Replace,
    CreateNew,
}

impl SavePolicy {
    /// Whether the save should read the existing record before writing.
    pub fn consults_existing(&self) -> bool {
        matches!(self, SavePolicy::Replace)
    }
}
