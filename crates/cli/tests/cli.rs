use assert_cmd::Command;

#[test]
fn help_lists_subcommands() {
    let output = Command::cargo_bin("shelf-cli")
        .unwrap()
        .arg("--help")
        .output()
        .unwrap();

    assert!(output.status.success());
    let text = String::from_utf8_lossy(&output.stdout);
    for subcommand in ["serve", "init-db", "seed", "import-genres"] {
        assert!(text.contains(subcommand), "missing {subcommand} in help");
    }
}

#[test]
fn unknown_subcommand_fails() {
    Command::cargo_bin("shelf-cli")
        .unwrap()
        .arg("shelve")
        .assert()
        .failure();
}

#[test]
fn import_requires_a_file_argument() {
    Command::cargo_bin("shelf-cli")
        .unwrap()
        .arg("import-genres")
        .assert()
        .failure();
}
