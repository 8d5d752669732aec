use shelter_core::{
    import_csv, import_reader, AnimalRepository, AnimalShelter, FieldValue, ImportError, Query,
};
use std::io::Write;

const ANIMALS_CSV: &str = "\
,age_upon_outcome,animal_id,animal_type,breed,location_lat,location_long,name
0,3 years,A1,Dog,Beagle,30.75,-97.48,Rex
1,2 months,A2,Cat,Tabby,30.6,-97.3,
2,1 year,A3,Dog,Labrador Retriever Mix,30.5,-97.5,Buddy
";

fn shelter() -> AnimalShelter {
    AnimalShelter::open_in_memory("animals").unwrap()
}

#[test]
fn import_inserts_every_row_with_inferred_types() {
    let repo = shelter();
    let report = import_reader(ANIMALS_CSV.as_bytes(), &repo).unwrap();

    assert_eq!(report.total_rows, 3);
    assert_eq!(report.success_count, 3);
    assert_eq!(report.error_count, 0);
    assert!(report.errors.is_empty());

    let rex = repo.read(Some(&Query::new().with("animal_id", "A1")));
    assert_eq!(rex.len(), 1);
    assert_eq!(rex[0].get("Unnamed: 0"), Some(&FieldValue::Integer(0)));
    assert_eq!(rex[0].get("location_lat"), Some(&FieldValue::Float(30.75)));
    assert_eq!(rex[0].text("age_upon_outcome").as_deref(), Some("3 years"));

    let tabby = repo.read(Some(&Query::new().with("animal_id", "A2")));
    assert_eq!(tabby[0].get("name"), Some(&FieldValue::Null));
}

#[test]
fn malformed_rows_are_counted_and_the_rest_imported() {
    let repo = shelter();
    let input = "animal_id,breed\nA1,Beagle\nA2\nA3,Husky,extra\nA4,Tabby\n";
    let report = import_reader(input.as_bytes(), &repo).unwrap();

    assert_eq!(report.total_rows, 4);
    assert_eq!(report.success_count, 2);
    assert_eq!(report.error_count, 2);
    assert_eq!(report.errors.len(), 2);
    assert!(report.errors[0].starts_with("row 1:"));
    assert_eq!(repo.read(None).len(), 2);
}

#[test]
fn error_messages_are_capped_but_count_is_exact() {
    let repo = shelter();
    let mut input = String::from("animal_id,breed\n");
    for n in 0..8 {
        input.push_str(&format!("A{n}\n"));
    }
    input.push_str("A9,Beagle\n");

    let report = import_reader(input.as_bytes(), &repo).unwrap();
    assert_eq!(report.error_count, 8);
    assert_eq!(report.errors.len(), 5);
    assert_eq!(report.success_count, 1);
}

#[test]
fn rejected_create_counts_as_error() {
    let repo = shelter();
    let input = "_id,animal_id\nsame,A1\nsame,A2\n";
    let report = import_reader(input.as_bytes(), &repo).unwrap();

    assert_eq!(report.success_count, 1);
    assert_eq!(report.error_count, 1);
    assert!(report.errors[0].contains("row 1"));
}

#[test]
fn import_csv_reads_file_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("aac_shelter_outcomes.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(ANIMALS_CSV.as_bytes()).unwrap();
    drop(file);

    let repo = shelter();
    let report = import_csv(&path, &repo).unwrap();
    assert_eq!(report.success_count, 3);
}

#[test]
fn missing_file_aborts_before_any_insert() {
    let dir = tempfile::tempdir().unwrap();
    let repo = shelter();

    let err = import_csv(dir.path().join("missing.csv"), &repo).unwrap_err();
    assert!(matches!(err, ImportError::Open { .. }));
    assert!(repo.read(None).is_empty());
}

#[test]
fn empty_input_imports_nothing() {
    let repo = shelter();
    let report = import_reader("".as_bytes(), &repo).unwrap();
    assert_eq!(report.total_rows, 0);
    assert_eq!(report.error_count, 0);
}
