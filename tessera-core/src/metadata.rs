//! Presentation metadata table

use crate::error::{Error, Result};
use crate::ids::MetadataId;
use crate::serialization::record::Record;
use crate::factory::QualifiedName;

/// One `name = content` entry, e.g. `dc:title = Moby Dick`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetadataEntry {
    id: MetadataId,
    pub name: String,
    pub content: String,
}

impl MetadataEntry {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::with_id(MetadataId::generate(), name, content)
    }

    pub fn with_id(id: MetadataId, name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            content: content.into(),
        }
    }

    pub fn id(&self) -> &MetadataId {
        &self.id
    }

    pub(crate) fn from_record(record: &Record) -> Result<Self> {
        Ok(Self::with_id(
            record.get("id")?,
            record.str("name")?,
            record.opt_str("content")?.unwrap_or_default(),
        ))
    }

    pub fn to_record(&self) -> Result<Record> {
        let mut record = Record::new(&QualifiedName::core("Metadata"));
        record.set("id", &self.id)?;
        record.set("name", &self.name)?;
        record.set("content", &self.content)?;
        Ok(record)
    }
}

/// Ordered metadata entries, unique by id
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetadataTable {
    entries: Vec<MetadataEntry>,
}

impl MetadataTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &MetadataId) -> Option<&MetadataEntry> {
        self.entries.iter().find(|e| &e.id == id)
    }

    /// Entries named `name`, in insertion order
    pub fn by_name<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MetadataEntry> + 'a {
        self.entries.iter().filter(move |e| e.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetadataEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn insert(&mut self, index: usize, entry: MetadataEntry) -> Result<()> {
        if self.get(&entry.id).is_some() {
            return Err(Error::structural(format!("duplicate metadata id {}", entry.id)));
        }
        if index > self.entries.len() {
            return Err(Error::structural(format!(
                "metadata index {} out of range 0..={}",
                index,
                self.entries.len()
            )));
        }
        self.entries.insert(index, entry);
        Ok(())
    }

    pub(crate) fn push(&mut self, entry: MetadataEntry) -> Result<()> {
        self.insert(self.entries.len(), entry)
    }

    pub(crate) fn remove(&mut self, id: &MetadataId) -> Result<(usize, MetadataEntry)> {
        let index = self
            .entries
            .iter()
            .position(|e| &e.id == id)
            .ok_or_else(|| Error::not_found(format!("metadata {}", id)))?;
        Ok((index, self.entries.remove(index)))
    }

    /// Replace an entry's content, returning the previous content
    pub(crate) fn set_content(&mut self, id: &MetadataId, content: &str) -> Result<String> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| &e.id == id)
            .ok_or_else(|| Error::not_found(format!("metadata {}", id)))?;
        Ok(std::mem::replace(&mut entry.content, content.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_operations() {
        let mut table = MetadataTable::new();
        let title = MetadataEntry::with_id(MetadataId::new("m1"), "dc:title", "Draft");
        table.push(title.clone()).unwrap();
        table.push(MetadataEntry::new("dc:creator", "A. Author")).unwrap();
        assert!(matches!(table.push(title), Err(Error::Structural(_))));

        assert_eq!(table.set_content(&MetadataId::new("m1"), "Final").unwrap(), "Draft");
        assert_eq!(table.by_name("dc:title").next().unwrap().content, "Final");

        let (index, removed) = table.remove(&MetadataId::new("m1")).unwrap();
        assert_eq!(index, 0);
        assert_eq!(removed.name, "dc:title");
        assert!(table.remove(&MetadataId::new("m1")).is_err());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_record_round_trip() {
        let entry = MetadataEntry::with_id(MetadataId::new("m9"), "dc:language", "en");
        let record = entry.to_record().unwrap();
        assert_eq!(MetadataEntry::from_record(&record).unwrap(), entry);
    }
}
