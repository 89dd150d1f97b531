//! Loads a miniature RF2 snapshot written to a temp directory.

use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use snomedix_ontology::{Ontology, OntologyError};

const CONCEPTS: &str = "id\teffectiveTime\tactive\tmoduleId\tdefinitionStatusId
404684003\t20020131\t1\t900000000000207008\t900000000000074008
25064002\t20020131\t1\t900000000000207008\t900000000000074008
37796009\t20020131\t1\t900000000000207008\t900000000000074008
387458008\t20020131\t1\t900000000000207008\t900000000000074008
111111111\t20020131\t0\t900000000000207008\t900000000000074008
";

const DESCRIPTIONS: &str = "id\teffectiveTime\tactive\tmoduleId\tconceptId\tlanguageCode\ttypeId\tterm\tcaseSignificanceId
1\t20020131\t1\t900000000000207008\t404684003\ten\t900000000000003001\tClinical finding (finding)\t900000000000448009
2\t20020131\t1\t900000000000207008\t25064002\ten\t900000000000013009\tHeadache\t900000000000448009
3\t20020131\t1\t900000000000207008\t25064002\ten\t900000000000013009\tCephalgia\t900000000000448009
4\t20020131\t1\t900000000000207008\t25064002\ten\t900000000000003001\tHeadache (finding)\t900000000000448009
5\t20020131\t1\t900000000000207008\t37796009\ten\t900000000000013009\tMigraine\t900000000000448009
6\t20020131\t0\t900000000000207008\t37796009\ten\t900000000000013009\tSick headache\t900000000000448009
7\t20020131\t1\t900000000000207008\t387458008\ten\t900000000000013009\tAspirin\t900000000000448009
8\t20020131\t1\t900000000000207008\t387458008\ten\t900000000000013009\tAcetylsalicylic acid\t900000000000448009
9\t20020131\t1\t900000000000207008\t111111111\ten\t900000000000013009\tRetired concept\t900000000000448009
";

const RELATIONSHIPS: &str = "id\teffectiveTime\tactive\tmoduleId\tsourceId\tdestinationId\trelationshipGroup\ttypeId\tcharacteristicTypeId\tmodifierId
10\t20020131\t1\t900000000000207008\t25064002\t404684003\t0\t116680003\t900000000000011006\t900000000000451002
11\t20020131\t1\t900000000000207008\t37796009\t25064002\t0\t116680003\t900000000000011006\t900000000000451002
12\t20020131\t1\t900000000000207008\t37796009\t404684003\t0\t363698007\t900000000000011006\t900000000000451002
";

fn write_snapshot(dir: &Path, relationships: bool) {
    let terminology = dir.join("Snapshot").join("Terminology");
    fs::create_dir_all(&terminology).unwrap();
    fs::write(terminology.join("sct2_Concept_Snapshot_INT_20240101.txt"), CONCEPTS).unwrap();
    fs::write(
        terminology.join("sct2_Description_Snapshot-en_INT_20240101.txt"),
        DESCRIPTIONS,
    )
    .unwrap();
    if relationships {
        fs::write(
            terminology.join("sct2_Relationship_Snapshot_INT_20240101.txt"),
            RELATIONSHIPS,
        )
        .unwrap();
    }
}

#[test]
fn test_load_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    write_snapshot(dir.path(), true);

    let ontology = Ontology::load(dir.path()).unwrap();
    assert_eq!(ontology.len(), 4);
    assert!(ontology.concept("111111111").is_none());

    let headache = ontology.concept("25064002").unwrap();
    assert_eq!(headache.name, "Headache");
    assert_eq!(headache.semantic_tag.as_deref(), Some("finding"));
    assert_eq!(headache.synonyms, vec!["Headache".to_string(), "Cephalgia".to_string()]);

    let finding = ontology.concept("404684003").unwrap();
    assert_eq!(finding.name, "Clinical finding");

    // Only IS-A edges count
    let migraine_parents: Vec<&str> = ontology.parents("37796009").iter().map(|c| c.id.as_str()).collect();
    assert_eq!(migraine_parents, vec!["25064002"]);

    let surfaces: Vec<&str> = ontology.surface_entries().iter().map(|e| e.surface.as_str()).collect();
    assert_eq!(
        surfaces,
        vec!["Clinical finding", "Headache", "Cephalgia", "Migraine", "Aspirin", "Acetylsalicylic acid"]
    );
}

#[test]
fn test_relationships_are_optional() {
    let dir = tempfile::tempdir().unwrap();
    write_snapshot(dir.path(), false);

    let ontology = Ontology::load(dir.path()).unwrap();
    assert!(ontology.parents("37796009").is_empty());
    assert_eq!(ontology.len(), 4);
}

#[test]
fn test_missing_resource_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope");
    assert!(matches!(Ontology::load(&missing), Err(OntologyError::NotFound(_))));

    assert!(matches!(
        Ontology::load(dir.path()),
        Err(OntologyError::MissingFile { .. })
    ));
}

#[test]
fn test_malformed_row_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    write_snapshot(dir.path(), false);
    let concept_file = dir
        .path()
        .join("Snapshot/Terminology/sct2_Concept_Snapshot_INT_20240101.txt");
    fs::write(&concept_file, format!("{}broken\trow\n", CONCEPTS)).unwrap();

    match Ontology::load(dir.path()) {
        Err(OntologyError::Malformed { line, .. }) => assert_eq!(line, 7),
        other => panic!("expected malformed error, got {:?}", other.map(|o| o.len())),
    }
}
