//! Cascade file inspection tool: dumps the reserved header and the parsed
//! model dimensions.

use std::env;
use std::fs;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <cascade-file>", args[0]);
        std::process::exit(1);
    }

    let path = &args[1];
    println!("Reading cascade: {}", path);

    let bytes = fs::read(path).expect("Failed to read file");
    println!("File size: {} bytes", bytes.len());

    println!("\nFirst 64 bytes:");
    for (i, chunk) in bytes.chunks(16).take(4).enumerate() {
        print!("{:04x}: ", i * 16);
        for b in chunk {
            print!("{:02x} ", b);
        }
        print!(" ");
        for b in chunk {
            if *b >= 32 && *b < 127 {
                print!("{}", *b as char);
            } else {
                print!(".");
            }
        }
        println!();
    }

    println!("\nTrying pico_face::Cascade::from_bytes...");
    match pico_face::Cascade::from_bytes(&bytes) {
        Ok(cascade) => {
            let depth = cascade.tree_depth();
            let count = cascade.tree_count();
            let splits = (1u32 << depth) - 1;
            let leaves = 1u32 << depth;
            let per_tree = splits as usize * 4 + (leaves as usize + 1) * 4;

            println!("SUCCESS! Cascade loaded:");
            println!("  tree depth: {}", depth);
            println!("  tree count: {}", count);
            println!("  nodes per tree: {}", splits);
            println!("  leaves per tree: {}", leaves);
            println!(
                "  stream size: {} of {} bytes used",
                16 + count as usize * per_tree,
                bytes.len()
            );
        }
        Err(e) => {
            println!("FAILED: {}", e);
        }
    }
}
