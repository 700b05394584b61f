use std::path::Path;
use std::process;

use spacexp_common::config::load_config;
use spacexp_common::logging;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: spacexp-extract <file-path>");
        eprintln!();
        eprintln!("Classifies one file and prints its metadata record as JSON.");
        process::exit(1);
    }

    let config = match load_config(None) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {e:#}");
            process::exit(1);
        }
    };
    let _guard = logging::init(&config.log, "warn");

    let path = Path::new(&args[1]);
    let Some(record) = spacexp_extract_dispatch::process_file(path, &config.index.extractor()) else {
        eprintln!("Error reading {}", path.display());
        process::exit(1);
    };

    match serde_json::to_string_pretty(&record) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Error serializing to JSON: {e}");
            process::exit(1);
        }
    }
}
