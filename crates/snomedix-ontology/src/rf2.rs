//! RF2 snapshot reader.
//!
//! Expects the tab-separated `sct2_Concept_*`, `sct2_Description_*` and
//! (optionally) `sct2_Relationship_*` files of a SNOMED CT release, either
//! directly in the given directory or under `Snapshot/Terminology`.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::concept::push_unique;
use crate::{Concept, ConceptId, Ontology, OntologyError, Result};

pub const FSN_TYPE_ID: &str = "900000000000003001";
pub const SYNONYM_TYPE_ID: &str = "900000000000013009";
pub const IS_A_TYPE_ID: &str = "116680003";

const CONCEPT_PREFIX: &str = "sct2_Concept_";
const DESCRIPTION_PREFIX: &str = "sct2_Description_";
const RELATIONSHIP_PREFIX: &str = "sct2_Relationship_";

/// Load a snapshot directory into an [`Ontology`].
pub fn load_snapshot(path: &Path) -> Result<Ontology> {
    if !path.exists() {
        return Err(OntologyError::NotFound(path.to_path_buf()));
    }
    let dir = terminology_dir(path);
    info!("Loading SNOMED CT snapshot from {:?}", dir);

    let concept_file = find_file(&dir, CONCEPT_PREFIX)?
        .ok_or_else(|| OntologyError::MissingFile { prefix: CONCEPT_PREFIX, dir: dir.clone() })?;
    let description_file = find_file(&dir, DESCRIPTION_PREFIX)?
        .ok_or_else(|| OntologyError::MissingFile { prefix: DESCRIPTION_PREFIX, dir: dir.clone() })?;

    let mut order = Vec::new();
    for_each_row(&concept_file, 5, |row| {
        if row[2] == "1" {
            order.push(row[0].to_string());
        }
        Ok(())
    })?;
    debug!("{} active concepts", order.len());

    let mut fsn: HashMap<ConceptId, String> = HashMap::new();
    let mut synonyms: HashMap<ConceptId, Vec<String>> = HashMap::new();
    for_each_row(&description_file, 9, |row| {
        if row[2] != "1" {
            return Ok(());
        }
        let concept_id = row[4];
        let term = row[7];
        match row[6] {
            FSN_TYPE_ID => {
                fsn.insert(concept_id.to_string(), term.to_string());
            }
            SYNONYM_TYPE_ID => {
                push_unique(synonyms.entry(concept_id.to_string()).or_default(), term.to_string());
            }
            _ => {}
        }
        Ok(())
    })?;

    let mut parents: HashMap<ConceptId, Vec<ConceptId>> = HashMap::new();
    match find_file(&dir, RELATIONSHIP_PREFIX)? {
        Some(relationship_file) => {
            for_each_row(&relationship_file, 10, |row| {
                if row[2] == "1" && row[7] == IS_A_TYPE_ID {
                    parents.entry(row[4].to_string()).or_default().push(row[5].to_string());
                }
                Ok(())
            })?;
        }
        None => debug!("No relationship file, concept graph has no edges"),
    }

    let concepts = order
        .into_iter()
        .filter_map(|id| {
            let (stripped_fsn, tag) = match fsn.get(&id) {
                Some(full) => {
                    let (term, tag) = split_semantic_tag(full);
                    (Some(term.to_string()), tag.map(str::to_string))
                }
                None => (None, None),
            };
            let mut surfaces = synonyms.remove(&id).unwrap_or_default();
            if let Some(term) = &stripped_fsn {
                push_unique(&mut surfaces, term.clone());
            }
            // Concepts without any description cannot be linked to.
            let name = surfaces.first().cloned()?;

            let mut concept = Concept::new(id.clone(), name).with_synonyms(surfaces);
            concept.semantic_tag = tag;
            concept.parents = parents.remove(&id).unwrap_or_default();
            Some(concept)
        })
        .collect::<Vec<_>>();

    Ontology::from_concepts(concepts)
}

/// Split `"Migraine (disorder)"` into `("Migraine", Some("disorder"))`.
pub fn split_semantic_tag(fsn: &str) -> (&str, Option<&str>) {
    let trimmed = fsn.trim_end();
    if let Some(body) = trimmed.strip_suffix(')') {
        if let Some(open) = body.rfind(" (") {
            let tag = &body[open + 2..];
            if !tag.is_empty() && !tag.contains('(') {
                return (body[..open].trim_end(), Some(tag));
            }
        }
    }
    (trimmed, None)
}

fn terminology_dir(path: &Path) -> PathBuf {
    let nested = path.join("Snapshot").join("Terminology");
    if nested.is_dir() {
        nested
    } else {
        path.to_path_buf()
    }
}

fn find_file(dir: &Path, prefix: &str) -> Result<Option<PathBuf>> {
    let mut matches = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| {
            p.is_file()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with(prefix))
                    .unwrap_or(false)
        })
        .collect::<Vec<_>>();
    matches.sort();
    Ok(matches.into_iter().next())
}

/// Calls `f` on every data row (header skipped) after checking its arity.
fn for_each_row<F>(file: &Path, columns: usize, mut f: F) -> Result<()>
where
    F: FnMut(&[&str]) -> Result<()>,
{
    let reader = BufReader::new(File::open(file)?);
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if i == 0 || line.is_empty() {
            continue;
        }
        let row: Vec<&str> = line.trim_end_matches('\r').split('\t').collect();
        if row.len() != columns {
            return Err(OntologyError::Malformed {
                file: file.to_path_buf(),
                line: i + 1,
                reason: format!("expected {} columns, found {}", columns, row.len()),
            });
        }
        if row[2] != "0" && row[2] != "1" {
            return Err(OntologyError::Malformed {
                file: file.to_path_buf(),
                line: i + 1,
                reason: format!("invalid active flag '{}'", row[2]),
            });
        }
        f(&row)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_semantic_tag() {
        assert_eq!(split_semantic_tag("Migraine (disorder)"), ("Migraine", Some("disorder")));
        assert_eq!(
            split_semantic_tag("Pain in head (finding) "),
            ("Pain in head", Some("finding"))
        );
        assert_eq!(split_semantic_tag("Aspirin"), ("Aspirin", None));
    }
}
