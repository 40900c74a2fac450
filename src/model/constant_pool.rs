//! Class-file constant pool.
//!
//! Only the entry kinds that annotation element values and class references
//! resolve through are modelled. Indices are 1-based, and `long`/`double`
//! entries occupy two slots as in the class-file format.

/// One constant-pool entry.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantPoolEntry {
    /// Modified-UTF-8 string.
    Utf8(String),
    /// 32-bit integer (also booleans, bytes, chars and shorts).
    Integer(i32),
    /// 32-bit float.
    Float(f32),
    /// 64-bit integer; occupies two slots.
    Long(i64),
    /// 64-bit float; occupies two slots.
    Double(f64),
    /// Class reference by name index.
    Class {
        /// Index of the `Utf8` internal name.
        name_index: u16,
    },
    /// String literal by UTF-8 index.
    String {
        /// Index of the `Utf8` contents.
        string_index: u16,
    },
}

impl ConstantPoolEntry {
    fn is_wide(&self) -> bool {
        matches!(self, ConstantPoolEntry::Long(_) | ConstantPoolEntry::Double(_))
    }
}

/// A constant pool with 1-based indexing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstantPool {
    // Slot 0 and the upper half of wide entries are `None`.
    entries: Vec<Option<ConstantPoolEntry>>,
}

impl ConstantPool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: vec![None],
        }
    }

    /// Number of slots, including the unused slot 0.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.entries.len().max(1)
    }

    /// Returns the entry at `index`.
    #[must_use]
    pub fn get(&self, index: u16) -> Option<&ConstantPoolEntry> {
        self.entries.get(usize::from(index)).and_then(Option::as_ref)
    }

    /// Resolves a `Utf8` entry.
    #[must_use]
    pub fn utf8(&self, index: u16) -> Option<&str> {
        match self.get(index)? {
            ConstantPoolEntry::Utf8(s) => Some(s),
            _ => None,
        }
    }

    /// Resolves a `Class` entry to its internal name.
    #[must_use]
    pub fn class_name(&self, index: u16) -> Option<&str> {
        match self.get(index)? {
            ConstantPoolEntry::Class { name_index } => self.utf8(*name_index),
            _ => None,
        }
    }

    /// Appends an entry and returns its index.
    ///
    /// Identical entries are shared rather than duplicated.
    pub fn add(&mut self, entry: ConstantPoolEntry) -> u16 {
        if self.entries.is_empty() {
            self.entries.push(None);
        }
        if let Some(existing) = self
            .entries
            .iter()
            .position(|slot| slot.as_ref() == Some(&entry))
        {
            return u16::try_from(existing).unwrap_or(u16::MAX);
        }
        let index = self.entries.len();
        let wide = entry.is_wide();
        self.entries.push(Some(entry));
        if wide {
            self.entries.push(None);
        }
        u16::try_from(index).unwrap_or(u16::MAX)
    }

    /// Adds (or reuses) a `Utf8` entry.
    pub fn add_utf8(&mut self, value: impl Into<String>) -> u16 {
        self.add(ConstantPoolEntry::Utf8(value.into()))
    }

    /// Adds (or reuses) a `Class` entry and its name.
    pub fn add_class(&mut self, internal_name: impl Into<String>) -> u16 {
        let name_index = self.add_utf8(internal_name);
        self.add(ConstantPoolEntry::Class { name_index })
    }
}
