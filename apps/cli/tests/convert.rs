use std::error::Error;
use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn convert_single_file_to_gbk() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("input.txt");
    fs::write(&input, "简体中文内容\n")?;
    let output = dir.path().join("output.txt");

    Command::cargo_bin("quillpad-cli")?
        .args([
            "convert",
            input.to_str().unwrap(),
            "--to",
            "gbk",
            "--output",
            output.to_str().unwrap(),
        ])
        .assert()
        .success();

    let bytes = fs::read(&output)?;
    let (decoded, _, had_errors) = encoding_rs::GBK.decode(&bytes);
    assert!(!had_errors);
    assert_eq!(decoded.as_ref(), "简体中文内容\n");

    Ok(())
}

#[test]
fn convert_gbk_back_to_utf8_in_place() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("legacy.txt");
    let (encoded, _, _) = encoding_rs::GBK.encode("中文测试\n");
    fs::write(&input, encoded.as_ref())?;

    Command::cargo_bin("quillpad-cli")?
        .args(["convert", input.to_str().unwrap(), "--to", "utf8", "--in-place"])
        .assert()
        .success();

    assert_eq!(fs::read_to_string(&input)?, "中文测试\n");
    Ok(())
}

#[test]
fn convert_fails_when_from_encoding_mismatches_detection() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("notes.txt");
    fs::write(&input, "Plain ASCII")?;
    let output = dir.path().join("notes-converted.txt");

    Command::cargo_bin("quillpad-cli")?
        .args([
            "convert",
            input.to_str().unwrap(),
            "--from",
            "iso-8859-1",
            "--to",
            "gbk",
            "--output",
            output.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("detected as utf-8"));

    assert!(!output.exists());
    Ok(())
}

#[test]
fn batch_conversion_requires_a_destination() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let first = dir.path().join("a.txt");
    let second = dir.path().join("b.txt");
    fs::write(&first, "a")?;
    fs::write(&second, "b")?;

    Command::cargo_bin("quillpad-cli")?
        .args([
            "convert",
            first.to_str().unwrap(),
            second.to_str().unwrap(),
            "--to",
            "gbk",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("batch conversions require"));

    Ok(())
}

#[test]
fn batch_conversion_writes_into_the_output_dir() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let first = dir.path().join("a.txt");
    let second = dir.path().join("b.txt");
    fs::write(&first, "甲\n")?;
    fs::write(&second, "乙\n")?;
    let out_dir = dir.path().join("converted");

    Command::cargo_bin("quillpad-cli")?
        .args([
            "convert",
            first.to_str().unwrap(),
            second.to_str().unwrap(),
            "--to",
            "gbk",
            "--output-dir",
            out_dir.to_str().unwrap(),
        ])
        .assert()
        .success();

    for (name, expected) in [("a.txt", "甲\n"), ("b.txt", "乙\n")] {
        let bytes = fs::read(out_dir.join(name))?;
        let (decoded, _, _) = encoding_rs::GBK.decode(&bytes);
        assert_eq!(decoded.as_ref(), expected);
    }
    Ok(())
}
