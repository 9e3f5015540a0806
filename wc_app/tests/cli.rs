use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn scratch_dir() -> PathBuf {
    let path = std::env::temp_dir().join(format!("wordcount-cli-{:016x}", rand::random::<u64>()));
    fs::create_dir_all(&path).expect("Failed to create test directory");
    path
}

fn wordcount(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_wordcount"))
        .args(args)
        .env("RUST_LOG", "warn")
        .env_remove("WORDCOUNT_FORCE")
        .env_remove("WORDCOUNT_PARTITIONS")
        .env_remove("WORDCOUNT_PARALLELISM")
        .env_remove("WORDCOUNT_FORMAT")
        .env_remove("WORDCOUNT_MIN_SPLIT_BYTES")
        .output()
        .expect("Failed to run wordcount")
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

fn output_records(dir: &Path) -> Vec<String> {
    let mut records: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.file_name().unwrap().to_str().unwrap().starts_with("part-"))
        .flat_map(|p| fs::read_to_string(p).unwrap().lines().map(String::from).collect::<Vec<_>>())
        .collect();
    records.sort();
    records
}

#[test]
fn counts_words_and_prints_timing() {
    let dir = scratch_dir();
    let input = dir.join("input.txt");
    fs::write(&input, "the quick fox\nthe lazy fox\n").unwrap();
    let out = dir.join("out");

    let output = wordcount(&[path_str(&input), path_str(&out), "-p", "2"]);

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("Execution time (ms): "), "{}", stdout);
    assert_eq!(output_records(&out), vec!["fox 2", "lazy 1", "quick 1", "the 2"]);
    assert!(out.join("_SUCCESS").exists());
    fs::remove_dir_all(dir).unwrap();
}

#[test]
fn bad_arguments_exit_with_one() {
    let output = wordcount(&[]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Usage"));

    let dir = scratch_dir();
    let input = dir.join("input.txt");
    fs::write(&input, "a\n").unwrap();
    let output = wordcount(&[path_str(&input), path_str(&dir.join("out")), "--partitions", "0"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(!dir.join("out").exists());
    fs::remove_dir_all(dir).unwrap();
}

#[test]
fn help_exits_with_zero() {
    let output = wordcount(&["--help"]);
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn missing_input_exits_with_two() {
    let dir = scratch_dir();
    let output = wordcount(&[path_str(&dir.join("missing")), path_str(&dir.join("out"))]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("input path does not exist"));
    fs::remove_dir_all(dir).unwrap();
}

#[test]
fn existing_output_exits_with_three_and_is_untouched() {
    let dir = scratch_dir();
    let input = dir.join("input.txt");
    fs::write(&input, "new words\n").unwrap();
    let out = dir.join("out");
    fs::create_dir_all(&out).unwrap();
    fs::write(out.join("part-00000"), "old 1\n").unwrap();

    let output = wordcount(&[path_str(&input), path_str(&out)]);

    assert_eq!(output.status.code(), Some(3));
    assert_eq!(fs::read_to_string(out.join("part-00000")).unwrap(), "old 1\n");
    assert_eq!(fs::read_dir(&out).unwrap().count(), 1);

    let output = wordcount(&[path_str(&input), path_str(&out), "--force", "-p", "1"]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(output_records(&out), vec!["new 1", "words 1"]);
    fs::remove_dir_all(dir).unwrap();
}

#[test]
fn unwritable_output_exits_with_three() {
    let dir = scratch_dir();
    let input = dir.join("input.txt");
    fs::write(&input, "a b\n").unwrap();
    fs::write(dir.join("blocker"), "not a directory\n").unwrap();

    let output = wordcount(&[path_str(&input), path_str(&dir.join("blocker/out"))]);

    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to write output"));
    let hidden = fs::read_dir(&dir)
        .unwrap()
        .filter(|e| e.as_ref().unwrap().file_name().to_string_lossy().starts_with('.'))
        .count();
    assert_eq!(hidden, 0);
    fs::remove_dir_all(dir).unwrap();
}

#[test]
fn existing_directory_without_a_name_exits_with_three() {
    let dir = scratch_dir();
    let input = dir.join("input.txt");
    fs::write(&input, "a\n").unwrap();

    let output = wordcount(&[path_str(&input), path_str(&dir.join("..")), "--force"]);

    assert_eq!(output.status.code(), Some(3));
    fs::remove_dir_all(dir).unwrap();
}

#[test]
fn report_is_printed_as_json() {
    let dir = scratch_dir();
    let input = dir.join("input.txt");
    fs::write(&input, "a b a\n\n").unwrap();
    let out = dir.join("out");

    let output = wordcount(&[path_str(&input), path_str(&out), "--report", "--format", "tsv", "-p", "1"]);

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8(output.stdout).unwrap();
    let (_, json) = stdout.split_once('\n').unwrap();
    let report: serde_json::Value = serde_json::from_str(json).unwrap();
    assert_eq!(report["lines"], 2);
    assert_eq!(report["words"], 3);
    assert_eq!(report["distinct_words"], 2);
    assert_eq!(output_records(&out), vec!["a\t2", "b\t1"]);
    fs::remove_dir_all(dir).unwrap();
}
