use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;

fn get_test_dir() -> PathBuf {
    let dir = PathBuf::from("target/tmp/tests");
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn test_cli_convert_to_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = get_test_dir();
    let edges = dir.join("cli_relations.csv");
    let output = dir.join("cli_output.gexf");
    fs::write(&edges, "source,target,weight\na,b,3\na,c,x\n")?;

    let mut cmd = Command::cargo_bin("csv2graph")?;
    cmd.arg("convert").arg("--edges").arg(&edges).arg("-o").arg(&output);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Wrote 3 nodes and 2 edges"));

    let doc = fs::read_to_string(&output)?;
    assert_eq!(doc.matches("<edge ").count(), 2);

    fs::remove_file(edges)?;
    fs::remove_file(output)?;
    Ok(())
}

#[test]
fn test_cli_graphml_to_stdout() -> Result<(), Box<dyn std::error::Error>> {
    let dir = get_test_dir();
    let edges = dir.join("cli_semicolon.csv");
    fs::write(&edges, "from;to\np;q\n")?;

    let mut cmd = Command::cargo_bin("csv2graph")?;
    cmd.arg("convert")
        .arg("--edges")
        .arg(&edges)
        .args(["-d", "semicolon", "--source", "from", "--target", "to"])
        .args(["-f", "graphml", "-o", "-"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("<graphml"))
        .stdout(predicate::str::contains(r#"<edge id="0" source="p" target="q"/>"#));

    fs::remove_file(edges)?;
    Ok(())
}

#[test]
fn test_cli_selections_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = get_test_dir();
    let edges = dir.join("cli_selections.csv");
    let selections = dir.join("cli_selections.json");
    fs::write(&edges, "a,b,kind,note\nx,y,friend,hi\n")?;
    fs::write(
        &selections,
        r#"{"source": "a", "target": "b", "attributes": {"only": ["kind"]}}"#,
    )?;

    let mut cmd = Command::cargo_bin("csv2graph")?;
    cmd.arg("convert")
        .arg("--edges")
        .arg(&edges)
        .arg("--selections")
        .arg(&selections)
        .args(["-o", "-"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(r#"title="kind""#))
        .stdout(predicate::str::contains("note").not());

    fs::remove_file(edges)?;
    fs::remove_file(selections)?;
    Ok(())
}

#[test]
fn test_cli_missing_relations_json_error() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("csv2graph")?;
    cmd.args(["convert", "--json-errors"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains(r#""kind":"MissingRelationsFileError""#))
        .stderr(predicate::str::contains(r#""stage":"load""#));
    Ok(())
}

#[test]
fn test_cli_unresolved_source() -> Result<(), Box<dyn std::error::Error>> {
    let dir = get_test_dir();
    let edges = dir.join("cli_unresolved.csv");
    fs::write(&edges, "from,target\na,b\n")?;

    let mut cmd = Command::cargo_bin("csv2graph")?;
    cmd.arg("convert").arg("--edges").arg(&edges).args(["-o", "-"]);
    cmd.assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("no source column selected"));

    fs::remove_file(edges)?;
    Ok(())
}

#[test]
fn test_cli_columns() -> Result<(), Box<dyn std::error::Error>> {
    let dir = get_test_dir();
    let nodes = dir.join("cli_columns.csv");
    fs::write(&nodes, "Name,Type\nann,person\n")?;

    let mut cmd = Command::cargo_bin("csv2graph")?;
    cmd.arg("columns").arg(&nodes).arg("--nodes");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Columns: name, relation_type"))
        .stdout(predicate::str::contains("label: (none, choose one with --label)"));

    fs::remove_file(nodes)?;
    Ok(())
}
