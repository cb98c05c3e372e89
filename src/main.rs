extern crate conspack;

use std::env;
use std::fs;
use std::process;

fn main() {
    env_logger::init();

    let mut args = env::args();
    let program = args.next().unwrap_or_else(|| "conspack".to_string());
    let path = match args.next() {
        Some(path) => path,
        None => {
            eprintln!("usage: {program} <file>");
            process::exit(2);
        }
    };

    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("{program}: {path}: {e}");
            process::exit(1);
        }
    };

    let value = conspack::decode_lenient(&bytes);
    println!("{}", conspack::explain_to_string(&value));
}
