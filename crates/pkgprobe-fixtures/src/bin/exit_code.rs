//! Fixture: announces an exit code on stdout, optionally complains on stderr, then exits with it.
//!
//! Usage: `pkgprobe-exit-code <code> [stderr message...]`

// Test fixtures require special allowances - they are not production code
#![allow(clippy::print_stdout)]
#![allow(clippy::print_stderr)]
#![allow(clippy::exit)]

fn main() {
    let mut args = std::env::args().skip(1);
    let code = args.next().and_then(|raw| raw.parse::<i32>().ok()).unwrap_or(0);
    let complaint: Vec<String> = args.collect();

    println!("exiting with code {code}");
    if !complaint.is_empty() {
        eprintln!("{}", complaint.join(" "));
    }
    std::process::exit(code);
}
