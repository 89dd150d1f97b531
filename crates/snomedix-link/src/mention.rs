//! Linked entity records.

use serde::ser::{SerializeTuple, Serializer};
use serde::Serialize;
use snomedix_ontology::ConceptId;

/// One linked entity in a tagged document.
///
/// Offsets are character offsets into [`TaggedText::text`]. Serialises as
/// the brat-style array `[id, tag, [[start, end]], name, "concept_id: <code>"]`.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityMention {
    pub id: String,
    pub tag: String,
    pub offsets: Vec<(usize, usize)>,
    /// Text covered by the mention
    pub surface: String,
    pub concept_name: String,
    pub concept_id: ConceptId,
}

impl EntityMention {
    /// `"concept_id: <code>"`
    pub fn concept_code(&self) -> String {
        format!("concept_id: {}", self.concept_id)
    }

    pub fn start(&self) -> usize {
        self.offsets.first().map(|(s, _)| *s).unwrap_or(0)
    }

    pub fn end(&self) -> usize {
        self.offsets.last().map(|(_, e)| *e).unwrap_or(0)
    }
}

impl Serialize for EntityMention {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let offsets: Vec<[usize; 2]> = self.offsets.iter().map(|&(s, e)| [s, e]).collect();
        let mut tuple = serializer.serialize_tuple(5)?;
        tuple.serialize_element(&self.id)?;
        tuple.serialize_element(&self.tag)?;
        tuple.serialize_element(&offsets)?;
        tuple.serialize_element(&self.concept_name)?;
        tuple.serialize_element(&self.concept_code())?;
        tuple.end()
    }
}

/// Output of [`crate::Tagger::tag`]: the trimmed input and its entities in
/// detection order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaggedText {
    pub text: String,
    pub entities: Vec<EntityMention>,
}
