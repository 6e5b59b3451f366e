// src/task/hash.rs

use blake3::Hasher;

use crate::task::TaskSpec;

/// Number of hex characters kept from the blake3 digest.
pub const TASK_HASH_LEN: usize = 32;

/// Compute the content hash of a task.
///
/// The session salt makes every run of the engine produce fresh work
/// directories, while two identical tasks within one run collide and are
/// separated by [`rehash`] at allocation time.
pub fn compute_task_hash(session: &str, spec: &TaskSpec) -> String {
    let mut hasher = Hasher::new();

    field(&mut hasher, "session", session);
    field(&mut hasher, "name", &spec.name);
    field(&mut hasher, "script", &spec.script);
    field(&mut hasher, "stdin", spec.stdin.as_deref().unwrap_or(""));

    for input in &spec.inputs {
        field(&mut hasher, "input", &input.source.to_string_lossy());
        field(&mut hasher, "stage_as", &input.stage_as);
    }
    for output in &spec.outputs {
        field(&mut hasher, "output", output);
    }
    // BTreeMap iteration is sorted, so the digest is independent of insertion order.
    for (key, value) in &spec.env {
        field(&mut hasher, "env", &format!("{key}={value}"));
    }

    truncate(hasher.finalize().to_hex().as_str())
}

/// Derive a replacement hash when the work directory for `hash` is taken.
pub fn rehash(hash: &str, attempt: u32) -> String {
    let mut hasher = Hasher::new();
    field(&mut hasher, "hash", hash);
    field(&mut hasher, "attempt", &attempt.to_string());
    truncate(hasher.finalize().to_hex().as_str())
}

/// Split a hash into its two-character bucket and the remainder.
pub fn split_hash(hash: &str) -> (&str, &str) {
    if hash.len() > 2 && hash.is_char_boundary(2) {
        hash.split_at(2)
    } else {
        (hash, "")
    }
}

/// Short form used in labels: `ab/cdef12`.
pub fn short_hash(hash: &str) -> String {
    let (bucket, rest) = split_hash(hash);
    let end = rest
        .char_indices()
        .nth(6)
        .map(|(i, _)| i)
        .unwrap_or(rest.len());
    format!("{}/{}", bucket, &rest[..end])
}

fn field(hasher: &mut Hasher, name: &str, value: &str) {
    hasher.update(name.as_bytes());
    hasher.update(&(value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}

fn truncate(hex: &str) -> String {
    hex[..TASK_HASH_LEN].to_string()
}
