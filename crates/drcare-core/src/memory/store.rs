//! Per-user context store.
//!
//! The store owns one [`MemoryRecord`] per user identifier. Records are
//! created on first reference and live for the lifetime of the store. Each
//! record sits behind its own mutex, so requests for different users never
//! contend, and appends for the same user are serialized.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::config::MemoryLimits;

/// Accumulated state for one user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Long-term notes replayed into every prompt.
    pub context: String,
    /// Exchange log, one `"User: … | Bot: …"` line per consultation.
    pub history: Vec<String>,
}

impl MemoryRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.context.is_empty() && self.history.is_empty()
    }
}

/// Shared handle to a record owned by a [`ContextStore`].
pub type MemoryHandle = Arc<Mutex<MemoryRecord>>;

/// Policy applied to a record after every mutation.
///
/// This is where a bound on memory growth plugs in. The default,
/// [`Unbounded`], keeps everything.
pub trait GrowthPolicy: Send + Sync {
    /// Bring the record back within the policy's limits.
    fn enforce(&self, record: &mut MemoryRecord);

    /// Policy name for logs.
    fn name(&self) -> &'static str;
}

/// Keeps every note and every history line.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unbounded;

impl GrowthPolicy for Unbounded {
    fn enforce(&self, _record: &mut MemoryRecord) {}

    fn name(&self) -> &'static str {
        "unbounded"
    }
}

/// Drops the oldest history lines and the oldest context bytes once a
/// record exceeds its limits.
#[derive(Debug, Clone, Default)]
pub struct BoundedGrowth {
    /// Maximum context size in bytes.
    pub max_context_bytes: Option<usize>,
    /// Maximum number of history lines.
    pub max_history_entries: Option<usize>,
}

impl BoundedGrowth {
    /// Create a policy from configured limits.
    pub fn new(limits: &MemoryLimits) -> Self {
        Self {
            max_context_bytes: limits.max_context_bytes,
            max_history_entries: limits.max_history_entries,
        }
    }
}

impl GrowthPolicy for BoundedGrowth {
    fn enforce(&self, record: &mut MemoryRecord) {
        if let Some(max) = self.max_history_entries {
            if record.history.len() > max {
                let excess = record.history.len() - max;
                record.history.drain(..excess);
            }
        }
        if let Some(max) = self.max_context_bytes {
            trim_context_front(&mut record.context, max);
        }
    }

    fn name(&self) -> &'static str {
        "bounded"
    }
}

/// Remove bytes from the front of `context` until it fits in `max`,
/// cutting at the first line break after the required cut point.
fn trim_context_front(context: &mut String, max: usize) {
    if context.len() <= max {
        return;
    }

    let mut cut = context.len() - max;
    while !context.is_char_boundary(cut) {
        cut += 1;
    }

    match context[cut..].find('\n') {
        Some(offset) => {
            context.drain(..cut + offset);
        }
        None => context.clear(),
    }
}

/// Process-wide mapping from user identifier to memory record.
pub struct ContextStore {
    records: RwLock<HashMap<String, MemoryHandle>>,
    policy: Arc<dyn GrowthPolicy>,
}

impl ContextStore {
    /// Create an empty store with unbounded growth.
    pub fn new() -> Self {
        Self::with_policy(Arc::new(Unbounded))
    }

    /// Create an empty store with a custom growth policy.
    pub fn with_policy(policy: Arc<dyn GrowthPolicy>) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            policy,
        }
    }

    /// Create a store whose policy follows the configured limits.
    pub fn from_limits(limits: &MemoryLimits) -> Self {
        if limits.is_bounded() {
            Self::with_policy(Arc::new(BoundedGrowth::new(limits)))
        } else {
            Self::new()
        }
    }

    /// Name of the active growth policy.
    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    /// Return the user's record, creating an empty one on first access.
    ///
    /// Any string is a valid key, including the empty string.
    pub async fn get_or_create(&self, user_name: &str) -> MemoryHandle {
        if let Some(handle) = self.records.read().await.get(user_name) {
            return Arc::clone(handle);
        }

        let mut records = self.records.write().await;
        // Another request may have registered the user between the locks
        Arc::clone(records.entry(user_name.to_string()).or_insert_with(|| {
            debug!(user_name = %user_name, "Creating memory record");
            Arc::new(Mutex::new(MemoryRecord::new()))
        }))
    }

    /// Return the user's record if one exists.
    pub async fn get(&self, user_name: &str) -> Option<MemoryHandle> {
        self.records.read().await.get(user_name).cloned()
    }

    /// Copy of the user's record if one exists.
    pub async fn snapshot(&self, user_name: &str) -> Option<MemoryRecord> {
        let handle = self.get(user_name).await?;
        let record = handle.lock().await;
        Some(record.clone())
    }

    /// Current context of a record.
    pub async fn read_context(&self, handle: &MemoryHandle) -> String {
        handle.lock().await.context.clone()
    }

    /// Apply `f` to the record under its lock, then enforce the growth policy.
    ///
    /// All appends made by `f` land together.
    pub async fn update<F, T>(&self, handle: &MemoryHandle, f: F) -> T
    where
        F: FnOnce(&mut MemoryRecord) -> T,
    {
        let mut record = handle.lock().await;
        let result = f(&mut record);
        self.policy.enforce(&mut record);
        result
    }

    /// Single-append helper: add raw text to the record's context.
    pub async fn append_context(&self, handle: &MemoryHandle, entry: &str) {
        self.update(handle, |record| record.context.push_str(entry))
            .await
    }

    /// Single-append helper: add one line to the record's history.
    pub async fn append_history(&self, handle: &MemoryHandle, entry: impl Into<String>) {
        let entry = entry.into();
        self.update(handle, move |record| record.history.push(entry))
            .await
    }

    /// Number of known users.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether no user has been seen yet.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl Default for ContextStore {
    fn default() -> Self {
        Self::new()
    }
}
