//! Concept graph and surface-form index entries.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::{OntologyError, Result};

/// SNOMED CT concept identifier (SCTID), kept as its decimal string.
pub type ConceptId = String;

/// A single ontology entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concept {
    pub id: ConceptId,
    /// Preferred term, used when a concept has to be named without a mention.
    pub name: String,
    /// Semantic tag from the fully specified name, e.g. `disorder`.
    pub semantic_tag: Option<String>,
    /// Every surface form of the concept; the preferred term comes first.
    pub synonyms: Vec<String>,
    pub parents: Vec<ConceptId>,
    pub children: Vec<ConceptId>,
}

impl Concept {
    pub fn new(id: impl Into<ConceptId>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            synonyms: vec![name.clone()],
            name,
            semantic_tag: None,
            parents: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_synonyms<I, S>(mut self, synonyms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for synonym in synonyms {
            push_unique(&mut self.synonyms, synonym.into());
        }
        self
    }

    pub fn with_parents<I, S>(mut self, parents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ConceptId>,
    {
        self.parents.extend(parents.into_iter().map(Into::into));
        self
    }

    pub fn with_semantic_tag(mut self, tag: impl Into<String>) -> Self {
        self.semantic_tag = Some(tag.into());
        self
    }
}

/// Pushes `term` unless an equal (case-insensitive) surface form is present.
pub(crate) fn push_unique(terms: &mut Vec<String>, term: String) {
    let term = term.trim().to_string();
    if term.is_empty() {
        return;
    }
    let lowered = term.to_lowercase();
    if !terms.iter().any(|t| t.to_lowercase() == lowered) {
        terms.push(term);
    }
}

/// One `(surface string, concept id)` pair. Position in
/// [`Ontology::surface_entries`] is the row of the matching embedding vector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurfaceEntry {
    pub surface: String,
    pub concept_id: ConceptId,
}

/// Immutable concept graph with a flattened surface-form index.
#[derive(Debug, Clone)]
pub struct Ontology {
    concepts: Vec<Concept>,
    by_id: HashMap<ConceptId, usize>,
    surfaces: Vec<SurfaceEntry>,
}

impl Ontology {
    /// Load an RF2 snapshot directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        crate::rf2::load_snapshot(path.as_ref())
    }

    /// Build an ontology from concepts whose `parents` are already set.
    ///
    /// Children are derived from the parent edges; edges to unknown concepts
    /// are dropped.
    pub fn from_concepts(mut concepts: Vec<Concept>) -> Result<Self> {
        if concepts.is_empty() {
            return Err(OntologyError::Empty);
        }

        let mut by_id = HashMap::with_capacity(concepts.len());
        for (i, concept) in concepts.iter_mut().enumerate() {
            concept.children.clear();
            let name = concept.name.clone();
            if !concept.synonyms.iter().any(|s| s == &name) {
                concept.synonyms.insert(0, name);
            }
            by_id.insert(concept.id.clone(), i);
        }

        let mut edges = Vec::new();
        let mut dropped = 0usize;
        for concept in concepts.iter_mut() {
            let mut seen = HashSet::new();
            concept.parents.retain(|p| {
                let known = by_id.contains_key(p) && seen.insert(p.clone());
                if !known {
                    dropped += 1;
                }
                known
            });
            for parent in &concept.parents {
                edges.push((by_id[parent], concept.id.clone()));
            }
        }
        for (parent, child) in edges {
            concepts[parent].children.push(child);
        }
        if dropped > 0 {
            debug!("Dropped {} parent edges to unknown or duplicate concepts", dropped);
        }

        let surfaces = concepts
            .iter()
            .flat_map(|c| {
                c.synonyms.iter().map(move |s| SurfaceEntry {
                    surface: s.clone(),
                    concept_id: c.id.clone(),
                })
            })
            .collect::<Vec<_>>();

        info!(
            "Ontology ready: {} concepts, {} surface forms",
            concepts.len(),
            surfaces.len()
        );

        Ok(Self {
            concepts,
            by_id,
            surfaces,
        })
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    pub fn concept(&self, id: &str) -> Option<&Concept> {
        self.by_id.get(id).map(|&i| &self.concepts[i])
    }

    pub fn concepts(&self) -> impl Iterator<Item = &Concept> {
        self.concepts.iter()
    }

    pub fn parents(&self, id: &str) -> Vec<&Concept> {
        self.related(id, |c| &c.parents)
    }

    pub fn children(&self, id: &str) -> Vec<&Concept> {
        self.related(id, |c| &c.children)
    }

    fn related<'a>(&'a self, id: &str, edges: impl Fn(&'a Concept) -> &'a Vec<ConceptId>) -> Vec<&'a Concept> {
        self.concept(id)
            .map(|c| edges(c).iter().filter_map(|r| self.concept(r)).collect())
            .unwrap_or_default()
    }

    /// All surface forms in concept order, synonyms in load order.
    pub fn surface_entries(&self) -> &[SurfaceEntry] {
        &self.surfaces
    }

    /// SHA-256 over every surface entry; changes whenever the index would.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for entry in &self.surfaces {
            hasher.update(entry.surface.as_bytes());
            hasher.update(b"\t");
            hasher.update(entry.concept_id.as_bytes());
            hasher.update(b"\n");
        }
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Ontology {
        Ontology::from_concepts(vec![
            Concept::new("404684003", "Clinical finding"),
            Concept::new("25064002", "Headache")
                .with_synonyms(["Cephalalgia", "cephalalgia", "Head pain"])
                .with_parents(["404684003"]),
            Concept::new("37796009", "Migraine")
                .with_parents(["25064002", "999"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_surface_entries_follow_concept_order() {
        let ontology = sample();
        let surfaces: Vec<&str> = ontology
            .surface_entries()
            .iter()
            .map(|e| e.surface.as_str())
            .collect();
        assert_eq!(
            surfaces,
            vec!["Clinical finding", "Headache", "Cephalalgia", "Head pain", "Migraine"]
        );
        assert_eq!(ontology.surface_entries()[2].concept_id, "25064002");
    }

    #[test]
    fn test_children_derived_from_parents() {
        let ontology = sample();
        let children: Vec<&str> = ontology.children("25064002").iter().map(|c| c.id.as_str()).collect();
        assert_eq!(children, vec!["37796009"]);
        // Unknown parent "999" is dropped
        assert_eq!(ontology.concept("37796009").unwrap().parents, vec!["25064002".to_string()]);
        assert_eq!(ontology.parents("25064002")[0].name, "Clinical finding");
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = sample();
        let b = sample();
        assert_eq!(a.fingerprint(), b.fingerprint());

        let c = Ontology::from_concepts(vec![Concept::new("25064002", "Headache")]).unwrap();
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn test_empty_ontology_rejected() {
        assert!(matches!(Ontology::from_concepts(vec![]), Err(OntologyError::Empty)));
    }
}
