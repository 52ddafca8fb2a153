use clap::CommandFactory;
use clap_complete::aot::{generate, Shell};
use std::io::BufWriter;

fn completions_for(shell: Shell) -> String {
    let mut buf = BufWriter::new(Vec::new());
    generate(shell, &mut devhost::cli::Cli::command(), "devhost", &mut buf);
    String::from_utf8(buf.into_inner().unwrap()).unwrap()
}

#[test]
fn completions_bash_generates_output() {
    let output = completions_for(Shell::Bash);
    assert!(!output.is_empty(), "bash completions should not be empty");
    assert!(output.contains("devhost"));
    assert!(output.contains("purge"), "every subcommand should be completed");
}

#[test]
fn completions_zsh_generates_output() {
    let output = completions_for(Shell::Zsh);
    assert!(output.contains("devhost"));
}

#[test]
fn completions_command_writes_to_stdout() {
    assert_cmd::Command::cargo_bin("devhost")
        .unwrap()
        .args(["completions", "fish"])
        .assert()
        .success()
        .stdout(predicates::str::contains("devhost"));
}
