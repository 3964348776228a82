use std::env;
use std::fs;
use std::io::{self, Read};
use std::process;

use y4d_format::format;

fn main() {
    env_logger::init();

    let mut input: Option<String> = None;
    let mut in_place = false;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_usage();
                return;
            }
            "--in-place" => in_place = true,
            _ => {
                if input.is_none() {
                    input = Some(arg);
                } else {
                    eprintln!("unexpected argument: {}", arg);
                    print_usage();
                    process::exit(2);
                }
            }
        }
    }

    if in_place {
        let Some(path) = input else {
            eprintln!("--in-place requires an input file");
            print_usage();
            process::exit(2);
        };
        let before = read_file(&path);
        let after = format(&before);
        // Write back only when formatting actually changed something.
        if after != before
            && let Err(err) = fs::write(&path, &after)
        {
            eprintln!("failed to write {}: {}", path, err);
            process::exit(1);
        }
        return;
    }

    let source = match input {
        Some(path) => read_file(&path),
        None => read_stdin(),
    };
    print!("{}", format(&source));
}

fn read_file(path: &str) -> String {
    fs::read_to_string(path).unwrap_or_else(|err| {
        eprintln!("failed to read {}: {}", path, err);
        process::exit(1);
    })
}

fn read_stdin() -> String {
    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .unwrap_or_else(|err| {
            eprintln!("failed to read stdin: {}", err);
            process::exit(1);
        });
    buffer
}

fn print_usage() {
    eprintln!("Usage: y4d-cli [--in-place] [input]");
}
