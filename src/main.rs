extern crate hexkit;

use std::env;
use std::error::Error;
use std::fs;
use std::process;

use hexkit::codec;
use hexkit::scene::Scene;

const USAGE: &str = "usage: hexkit [--verbose] <file.hexcells>...";

fn run_file(path: &str, verbose: bool) -> Result<(), Box<dyn Error>> {
    let text = fs::read_to_string(path)?;
    let blocks = codec::split_levels(&text);
    if blocks.is_empty() {
        return Err(format!("{}: no level header found", path).into());
    }
    for block in &blocks {
        let mut scene = Scene::load_text(block)?;
        scene.verbose = verbose;
        let title = scene.level.title.replace('"', "'");
        let mut steps = 0;
        let solved = loop {
            match scene.solve_step()? {
                None => break false,
                Some(conclusions) if conclusions.is_empty() => {
                    break scene.remaining() == 0;
                }
                Some(_) => steps += 1,
            }
        };
        let classif = if solved { "Solved" } else { "Stuck" };
        println!(
            "{},{},{},\"{}\",{}",
            classif,
            steps,
            scene.remaining(),
            title,
            path
        );
    }
    Ok(())
}

fn main() {
    let mut verbose = false;
    let mut files = vec![];
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--verbose" | "-v" => verbose = true,
            "--help" | "-h" => {
                println!("{}", USAGE);
                return;
            }
            _ => files.push(arg),
        }
    }
    if files.is_empty() {
        eprintln!("{}", USAGE);
        process::exit(2);
    }
    let mut failed = false;
    for file in &files {
        if let Err(err) = run_file(file, verbose) {
            eprintln!("{}: {}", file, err);
            failed = true;
        }
    }
    if failed {
        process::exit(1);
    }
}
