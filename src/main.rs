use std::path::{Path, PathBuf};
use std::time::Instant;

use lemmatizer_be::{
    LemmatizerRegistry, StorageMode,
    config::load_config,
    disk_index::DEFAULT_BLOCK_SIZE,
    indexer::indexer::build_index,
};
use mimalloc::MiMalloc;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn print_help() {
    println!("The valid commands are->");
    println!("build [corpus_dir]: Builds the lemma index from the grammar corpus");
    println!("lemmas <word> [pos]: Lists every lemma of the word, optionally for one part of speech");
    println!("lemmatize <word> [pos]: Prints the preferred lemma of the word");
    println!("mode <memory|disk>: Switches the storage mode used for lookups");
    println!("stats: Prints the size of the loaded index");
    println!("exit: Quits");
}

fn run_build(registry: &mut LemmatizerRegistry, corpus_dir: Option<&str>) {
    let config = registry.config();
    let corpus_dir = corpus_dir
        .map(PathBuf::from)
        .unwrap_or_else(|| config.corpus_dir.clone());

    #[cfg(feature = "download")]
    if let Err(e) = lemmatizer_be::fetch::ensure_corpus(&corpus_dir, &config.corpus_url) {
        eprintln!("Error: {}", e);
        return;
    }

    let data_dir = config.data_dir();
    let start_time = Instant::now();
    match build_index(&corpus_dir, &data_dir, DEFAULT_BLOCK_SIZE) {
        Ok(summary) => {
            println!(
                "Indexed {} paradigms from {} documents in {:.2} seconds",
                summary.no_of_paradigms,
                summary.no_of_documents,
                start_time.elapsed().as_secs_f64()
            );
            println!(
                "Found {} words to be left unchanged and {} changeable words",
                summary.no_of_invariant, summary.no_of_changeable
            );
            if summary.no_of_skipped_records > 0 {
                println!("Skipped {} malformed records", summary.no_of_skipped_records);
            }
            println!("The index has been written to {}", data_dir.display());
            registry.reset();
        }
        Err(e) => eprintln!("Error: {}", e),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(Path::new("config.json"));
    let mut mode = match config.storage_mode() {
        Ok(mode) => mode,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    println!("\nCurrent Configuration:");
    println!("  Data Directory:   {}", config.data_dir().display());
    println!("  Corpus Directory: {}", config.corpus_dir.display());
    println!("  Storage Mode:     {}", mode);
    println!("\nType 'help' for commands or 'exit' to quit.\n");

    let mut registry = LemmatizerRegistry::new(config);

    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    loop {
        let readline = rl.readline("> ");

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);

                let parts: Vec<&str> = line.split_whitespace().collect();
                match parts[0] {
                    "help" => print_help(),
                    "build" => run_build(&mut registry, parts.get(1).copied()),
                    "lemmas" | "lemmatize" if parts.len() >= 2 => {
                        let start_time = Instant::now();
                        let lemmatizer = match registry.get_with_mode(mode) {
                            Ok(lemmatizer) => lemmatizer,
                            Err(e) => {
                                eprintln!("Error: {}", e);
                                continue;
                            }
                        };
                        let pos = parts.get(2).copied();
                        if parts[0] == "lemmas" {
                            println!("{}", lemmatizer.lemmas(parts[1], pos).join(", "));
                        } else {
                            println!("{}", lemmatizer.lemmatize(parts[1], pos));
                        }
                        println!("({} µs)", start_time.elapsed().as_micros());
                    }
                    "mode" if parts.len() == 2 => match parts[1].parse::<StorageMode>() {
                        Ok(new_mode) => {
                            mode = new_mode;
                            println!("Storage mode set to {}", mode);
                        }
                        Err(e) => eprintln!("Error: {}", e),
                    },
                    "stats" => match registry.get_with_mode(mode) {
                        Ok(lemmatizer) => {
                            println!("Storage mode: {}", lemmatizer.mode());
                            println!("Invariant forms: {}", lemmatizer.no_of_invariant());
                            println!("Changeable forms: {}", lemmatizer.no_of_changeable());
                        }
                        Err(e) => eprintln!("Error: {}", e),
                    },
                    "quit" | "exit" => {
                        println!("Goodbye!");
                        break;
                    }
                    _ => {
                        println!("Invalid command. Type help if you want to see the valid commands");
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }
}
