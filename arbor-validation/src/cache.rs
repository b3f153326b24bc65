// Memoized schema compilation

use crate::compile::CompiledSchema;
use crate::errors::SchemaError;
use crate::schema::Schema;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

static GLOBAL_CACHE: Lazy<SchemaCache> = Lazy::new(SchemaCache::new);

/// Compile a schema through the process-wide cache.
///
/// The cache is keyed by the identity of the `Arc`, not by structural
/// equality: compiling the same `Arc<Schema>` twice returns the very same
/// `Arc<CompiledSchema>`, while two equal but separately allocated schemas
/// compile independently.
///
/// ```
/// use arbor_validation::{compile, Schema};
/// use std::sync::Arc;
///
/// let schema = Schema::object([("name", Schema::string())]).shared();
/// let a = compile(&schema).unwrap();
/// let b = compile(&schema).unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
/// ```
pub fn compile(schema: &Arc<Schema>) -> Result<Arc<CompiledSchema>, SchemaError> {
    GLOBAL_CACHE.get_or_compile(schema)
}

/// Access the process-wide cache
pub fn global_cache() -> &'static SchemaCache {
    &GLOBAL_CACHE
}

struct CacheEntry {
    // Holding the schema keeps its address from being reused by another
    // allocation while the entry exists.
    _schema: Arc<Schema>,
    compiled: Arc<CompiledSchema>,
}

/// Cache of compiled schemas keyed by schema identity
pub struct SchemaCache {
    entries: RwLock<HashMap<usize, CacheEntry>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn key(schema: &Arc<Schema>) -> usize {
        Arc::as_ptr(schema) as usize
    }

    /// Return the cached checker for `schema`, compiling it on first use.
    ///
    /// Compilation happens outside the lock. When two threads race on the
    /// same schema the second one to take the write lock drops its own
    /// result and returns the first one's, so every caller observes a
    /// single checker.
    pub fn get_or_compile(
        &self,
        schema: &Arc<Schema>,
    ) -> Result<Arc<CompiledSchema>, SchemaError> {
        let key = Self::key(schema);

        // Fast path: read lock only
        if let Some(entry) = self.entries.read().get(&key) {
            return Ok(Arc::clone(&entry.compiled));
        }

        let compiled = Arc::new(CompiledSchema::new(schema)?);

        let mut entries = self.entries.write();
        if let Some(existing) = entries.get(&key) {
            debug!(kind = schema.type_name(), "Schema compiled by another thread");
            return Ok(Arc::clone(&existing.compiled));
        }
        entries.insert(
            key,
            CacheEntry {
                _schema: Arc::clone(schema),
                compiled: Arc::clone(&compiled),
            },
        );
        debug!(
            kind = schema.type_name(),
            cache_size = entries.len(),
            "Schema compiled and cached"
        );
        Ok(compiled)
    }

    /// Whether `schema` has already been compiled
    pub fn contains(&self, schema: &Arc<Schema>) -> bool {
        self.entries.read().contains_key(&Self::key(schema))
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for SchemaCache {
    fn default() -> Self {
        Self::new()
    }
}
