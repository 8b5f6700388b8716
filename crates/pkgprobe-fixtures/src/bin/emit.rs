//! Fixture: writes to stdout, stderr and files, then exits.
//!
//! Usage: `emit [--out TEXT] [--err TEXT] [--write PATH CONTENT] [--exit CODE]`
//! Options may repeat; relative paths are resolved against the working directory.

// Test fixtures require special allowances - they are not production code
#![allow(clippy::print_stdout)]
#![allow(clippy::print_stderr)]
#![allow(clippy::exit)]

use std::env;
use std::fs;
use std::process;

fn main() {
    let mut args = env::args().skip(1);
    let mut code = 0;
    while let Some(flag) = args.next() {
        match flag.as_str() {
            "--out" => println!("{}", args.next().unwrap_or_default()),
            "--err" => eprintln!("{}", args.next().unwrap_or_default()),
            "--write" => {
                let path = args.next().unwrap_or_default();
                let content = args.next().unwrap_or_default();
                if let Err(err) = fs::write(&path, content) {
                    eprintln!("emit: cannot write {path}: {err}");
                    process::exit(2);
                }
            }
            "--exit" => code = args.next().and_then(|s| s.parse().ok()).unwrap_or(0),
            other => {
                eprintln!("emit: unknown option {other}");
                process::exit(2);
            }
        }
    }
    process::exit(code);
}
