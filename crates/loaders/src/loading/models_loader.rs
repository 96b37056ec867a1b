//! The capability shared by every loader kind

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ModelResult;
use crate::record::Record;

/// Attribute writes computed by a loader but not yet applied.
///
/// Splitting computation from writing is what keeps a load atomic: a
/// loader that fails never touches a record, and several loaders can
/// compute over the same shared batch before anything is written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotations {
    writes: Vec<(usize, String, Value)>,
}

impl Annotations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `attribute = value` for the record at `index` in the batch
    pub fn push(&mut self, index: usize, attribute: &str, value: Value) {
        self.writes.push((index, attribute.to_string(), value));
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Value queued for a record, if any
    pub fn get(&self, index: usize, attribute: &str) -> Option<&Value> {
        self.writes
            .iter()
            .find(|(i, name, _)| *i == index && name == attribute)
            .map(|(_, _, value)| value)
    }

    /// Write every queued value into the batch the annotations were
    /// computed for. Returns the number of writes applied.
    pub fn apply(self, records: &mut [Record]) -> usize {
        let mut applied = 0;
        for (index, attribute, value) in self.writes {
            if let Some(record) = records.get_mut(index) {
                record.set_attribute(&attribute, value);
                applied += 1;
            }
        }
        applied
    }
}

/// Loads some derived data for a whole batch of records at once and reads
/// it back off single records afterwards
#[async_trait]
pub trait ModelsLoader: Send + Sync {
    /// Compute the annotations for a batch without modifying it
    async fn fetch(&self, parents: &[Record]) -> ModelResult<Annotations>;

    /// Annotate every record of the batch in place; all or nothing
    async fn load(&self, parents: &mut [Record]) -> ModelResult<()> {
        let annotations = self.fetch(parents).await?;
        annotations.apply(parents);
        Ok(())
    }

    /// Read the loaded value off a record. Pure: no I/O, no mutation.
    fn extract(&self, model: &Record) -> Value;
}
