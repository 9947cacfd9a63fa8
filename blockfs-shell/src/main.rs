use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;

use clap::{App, Arg};

use blockfs::io::{open_or_create, BlockStorage, DiskConfig};
use blockfs::{DirectoryTree, FileStore, FsError};

#[derive(Debug)]
enum Flow {
    Continue,
    Exit,
}

pub fn main() {
    let matches = App::new("blockfs shell")
        .about("Interactive shell over a simulated file system")
        .arg(
            Arg::with_name("image")
                .long("image")
                .takes_value(true)
                .default_value("virtual_disk.bin")
                .help("Path of the device image"),
        )
        .arg(
            Arg::with_name("block-size")
                .long("block-size")
                .takes_value(true)
                .help("Block size in bytes"),
        )
        .arg(
            Arg::with_name("blocks")
                .long("blocks")
                .takes_value(true)
                .help("Total number of blocks on the device"),
        )
        .get_matches();

    let config = DiskConfig {
        path: PathBuf::from(matches.value_of("image").unwrap_or("virtual_disk.bin")),
        block_size: parse_flag(matches.value_of("block-size"), blockfs::BLOCK_SIZE),
        total_blocks: parse_flag(matches.value_of("blocks"), blockfs::TOTAL_BLOCKS),
    };

    let dev = match open_or_create(&config) {
        Ok(dev) => dev,
        Err(err) => {
            eprintln!("failed to open device image {}: {}", config.path.display(), err);
            process::exit(1);
        }
    };

    let mut files = FileStore::new(dev);
    let mut dirs = DirectoryTree::new();

    println!("File system simulator. Type 'exit' to quit.");
    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("{} >> ", dirs.path());
        if io::stdout().flush().is_err() {
            break;
        }

        line.clear();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }

        match dispatch(&mut files, &mut dirs, &line) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Exit) => break,
            Err(err) if err.is_fatal() => {
                eprintln!("fatal: {}", err);
                process::exit(1);
            }
            Err(err) => println!("{}", err),
        }
    }

    if let Err(err) = files.sync() {
        eprintln!("failed to sync device image: {}", err);
        process::exit(1);
    }
}

fn parse_flag(value: Option<&str>, default: usize) -> usize {
    match value {
        Some(raw) => match raw.parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                eprintln!("invalid numeric flag value: {}", raw);
                process::exit(1);
            }
        },
        None => default,
    }
}

fn dispatch<T: BlockStorage>(
    files: &mut FileStore<T>,
    dirs: &mut DirectoryTree,
    line: &str,
) -> Result<Flow, FsError> {
    let mut parts = line.split_whitespace();
    let cmd = match parts.next() {
        Some(cmd) => cmd.to_ascii_lowercase(),
        None => return Ok(Flow::Continue),
    };
    let args: Vec<&str> = parts.collect();

    match cmd.as_str() {
        "touch" => match args.as_slice() {
            [name] => files.create_file(name)?,
            _ => println!("Usage: touch <file_name>"),
        },
        "write" => match args.as_slice() {
            // The payload is every token after the name, joined by single
            // spaces.
            [name, data @ ..] if !data.is_empty() => {
                files.write_to_file(name, data.join(" ").as_bytes())?
            }
            _ => println!("Usage: write <file_name> <data>"),
        },
        "cat" => match args.as_slice() {
            [name] => {
                let content = files.read_file(name)?;
                println!("{}", String::from_utf8_lossy(&content));
            }
            _ => println!("Usage: cat <file_name>"),
        },
        "rm" => match args.as_slice() {
            [name] => files.delete_file(name)?,
            _ => println!("Usage: rm <file_name>"),
        },
        "mkdir" => match args.as_slice() {
            [name] => dirs.mkdir(name)?,
            _ => println!("Usage: mkdir <directory_name>"),
        },
        "rmdir" => match args.as_slice() {
            [name] => dirs.rmdir(name)?,
            _ => println!("Usage: rmdir <directory_name>"),
        },
        "cd" => match args.as_slice() {
            [name] => dirs.cd(name)?,
            _ => println!("Usage: cd <directory_name>"),
        },
        "ls" => println!("{}", dirs.ls().join(", ")),
        "exit" => {
            println!("Exiting the file system.");
            return Ok(Flow::Exit);
        }
        unknown => println!("Unknown command: {}", unknown),
    }

    Ok(Flow::Continue)
}
