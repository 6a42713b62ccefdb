//! Column-name to field-path resolution with a per-type cache

use std::any::TypeId;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tracing::debug;

use super::naming::NameConvention;
use crate::error::{Error, Result};
use crate::traits::{FieldKind, Record, RecordRef, ScanKind};

static NEXT_VERSION: AtomicU64 = AtomicU64::new(1);

/// The index chain from a record's root to one of its leaf fields.
///
/// An empty path marks a column with no destination field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<usize>);

impl FieldPath {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }
}

impl From<Vec<usize>> for FieldPath {
    fn from(indexes: Vec<usize>) -> Self {
        Self(indexes)
    }
}

/// Every column name a record type answers to, with its scan classification.
#[derive(Debug)]
pub struct FieldMap {
    type_name: &'static str,
    kind: ScanKind,
    fold_case: bool,
    index: HashMap<String, FieldPath>,
    names: Vec<String>,
}

impl FieldMap {
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// `Direct` when the record is declared direct or has no mappable fields.
    pub fn kind(&self) -> ScanKind {
        self.kind
    }

    /// Resolved names in breadth-first order (shallowest fields first).
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// The field a column name resolves to.
    pub fn get(&self, name: &str) -> Option<&FieldPath> {
        if self.fold_case {
            self.index.get(name.to_lowercase().as_str())
        } else {
            self.index.get(name)
        }
    }

    /// One path per column, empty for columns without a field.
    pub fn traversals(&self, columns: &[String]) -> Vec<FieldPath> {
        columns
            .iter()
            .map(|column| self.get(column).cloned().unwrap_or_default())
            .collect()
    }

    fn build(root: RecordRef, convention: NameConvention) -> Result<Self> {
        struct Pending {
            record: RecordRef,
            path: Vec<usize>,
            prefix: String,
            ancestors: Vec<TypeId>,
        }

        let mut index = HashMap::new();
        let mut names = Vec::new();
        let mut direct = false;
        let mut queue = VecDeque::from([Pending {
            record: root,
            path: Vec::new(),
            prefix: String::new(),
            ancestors: vec![root.type_id],
        }]);

        while let Some(pending) = queue.pop_front() {
            let record_type = (pending.record.describe)();
            if pending.path.is_empty() {
                direct = record_type.direct;
            }

            for (i, field) in record_type.fields.iter().enumerate() {
                let name = match field.rename {
                    Some(rename) => rename.to_string(),
                    None => convention.field_name(field.ident),
                };
                let mut path = pending.path.clone();
                path.push(i);

                match field.kind {
                    FieldKind::Value => {
                        let full = qualify(&pending.prefix, &name);
                        let key = convention.fold(&full).into_owned();
                        // breadth-first: the shallowest field with a name wins
                        if !index.contains_key(&key) {
                            index.insert(key, FieldPath(path));
                            names.push(full);
                        }
                    }
                    FieldKind::Record { record, flatten } => {
                        if pending.ancestors.contains(&record.type_id) {
                            return Err(Error::CyclicRecord(format!(
                                "{} reaches itself through field `{}` of {}",
                                record.type_name, field.ident, record_type.name
                            )));
                        }
                        let prefix = if flatten && field.rename.is_none() {
                            pending.prefix.clone()
                        } else {
                            qualify(&pending.prefix, &name)
                        };
                        let mut ancestors = pending.ancestors.clone();
                        ancestors.push(record.type_id);
                        queue.push_back(Pending {
                            record,
                            path,
                            prefix,
                            ancestors,
                        });
                    }
                }
            }
        }

        let kind = if direct || index.is_empty() {
            ScanKind::Direct
        } else {
            ScanKind::Structured
        };

        Ok(Self {
            type_name: root.type_name,
            kind,
            fold_case: matches!(convention, NameConvention::Lowercase),
            index,
            names,
        })
    }
}

fn qualify(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

/// Index of the first column without a destination field.
pub fn missing_field(fields: &[FieldPath]) -> Option<usize> {
    fields.iter().position(FieldPath::is_empty)
}

/// Resolves column names to field paths and caches the work per type.
///
/// A mapper's naming convention is fixed at construction. To use a different
/// convention, build another mapper (or install a new default with
/// [`set_default_convention`]); each mapper has its own cache and a
/// process-unique [`version`](Mapper::version).
pub struct Mapper {
    convention: NameConvention,
    version: u64,
    cache: RwLock<HashMap<TypeId, Arc<FieldMap>>>,
}

impl Mapper {
    pub fn new(convention: NameConvention) -> Self {
        Self {
            convention,
            version: NEXT_VERSION.fetch_add(1, Ordering::Relaxed),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn convention(&self) -> NameConvention {
        self.convention
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of record types resolved so far.
    pub fn cached_types(&self) -> usize {
        self.cache.read().len()
    }

    /// The field map of `record`, built on first use.
    ///
    /// The map is built without holding the cache lock, so lookups of other
    /// types never wait on a build. When two threads race on the same type
    /// the first insert wins and both get that map.
    pub fn type_map(&self, record: RecordRef) -> Result<Arc<FieldMap>> {
        if let Some(map) = self.cache.read().get(&record.type_id) {
            return Ok(Arc::clone(map));
        }

        let built = Arc::new(FieldMap::build(record, self.convention)?);
        let mut cache = self.cache.write();
        let map = cache
            .entry(record.type_id)
            .or_insert_with(|| {
                debug!(
                    "Resolved {} fields for {} (mapper v{}, {:?})",
                    built.len(),
                    record.type_name,
                    self.version,
                    built.kind()
                );
                Arc::clone(&built)
            });
        Ok(Arc::clone(map))
    }

    /// The field map of `R`.
    pub fn type_map_of<R: Record>(&self) -> Result<Arc<FieldMap>> {
        self.type_map(R::record_ref())
    }

    /// One field path per column; unmatched columns get an empty path.
    pub fn traversals_by_name(
        &self,
        record: RecordRef,
        columns: &[String],
    ) -> Result<Vec<FieldPath>> {
        Ok(self.type_map(record)?.traversals(columns))
    }

    /// Field paths for `columns` and whether every column was matched.
    pub fn resolve(&self, record: RecordRef, columns: &[String]) -> Result<(Vec<FieldPath>, bool)> {
        let fields = self.traversals_by_name(record, columns)?;
        let complete = missing_field(&fields).is_none();
        Ok((fields, complete))
    }
}

impl Default for Mapper {
    fn default() -> Self {
        Self::new(NameConvention::default())
    }
}

impl std::fmt::Debug for Mapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mapper")
            .field("convention", &self.convention)
            .field("version", &self.version)
            .field("cached_types", &self.cached_types())
            .finish()
    }
}

fn default_slot() -> &'static RwLock<Arc<Mapper>> {
    static DEFAULT: OnceLock<RwLock<Arc<Mapper>>> = OnceLock::new();
    DEFAULT.get_or_init(|| RwLock::new(Arc::new(Mapper::default())))
}

/// The process-wide mapper used when a [`Db`](crate::Db) is created without
/// an explicit one.
pub fn default_mapper() -> Arc<Mapper> {
    Arc::clone(&default_slot().read())
}

/// Install a fresh default mapper using `convention` and return it.
///
/// Mappers already handed out keep their convention and cache; everything
/// that asks for the default afterwards resolves with the new convention.
/// Prefer configuring this once at startup.
pub fn set_default_convention(convention: NameConvention) -> Arc<Mapper> {
    let mapper = Arc::new(Mapper::new(convention));
    *default_slot().write() = Arc::clone(&mapper);
    debug!(
        "Installed default mapper v{} ({:?})",
        mapper.version(),
        convention
    );
    mapper
}
