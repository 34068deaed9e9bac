use flatdb::catalog::types::Record;
use flatdb::config::{FlatDbConfig, SnapshotFormat};
use flatdb::movies::{Genre, Movie, MovieSearch};
use flatdb::repository::Entity;
use flatdb::{FlatDb, QueryOutput};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const VALUE_FLAGS: &[&str] = &[
    "--db",
    "--format",
    "--title",
    "--director",
    "--year",
    "--runtime",
    "--genres",
    "--actors",
    "--plot",
    "--poster-url",
    "--duration",
];

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let words = positional(&args);
    if words.is_empty() {
        print_usage();
        return Err("missing command".into());
    }
    let db = open(&args).await?;
    match words[0] {
        "init" => cmd_init(&db).await,
        "dump" => cmd_dump(&db).await,
        "genres" => match words.get(1).copied() {
            Some("list") => cmd_genres_list(&db).await,
            Some("add") => {
                let name = words.get(2).ok_or("genres add needs a name")?;
                cmd_genres_add(&db, name).await
            }
            Some(other) => Err(format!("unknown genres command: {other}")),
            None => Err("missing genres subcommand".into()),
        },
        "movies" => match words.get(1).copied() {
            Some("add") => cmd_movies_add(&db, &args).await,
            Some("search") => cmd_movies_search(&db, &args).await,
            Some(other) => Err(format!("unknown movies command: {other}")),
            None => Err("missing movies subcommand".into()),
        },
        other => {
            print_usage();
            Err(format!("unknown top-level command: {other}"))
        }
    }
}

async fn open(args: &[String]) -> Result<FlatDb, String> {
    let path = parse_flag_value(args, "--db").ok_or("--db is required")?;
    let mut config = FlatDbConfig::default();
    if let Some(format) = parse_flag_value(args, "--format") {
        let format = SnapshotFormat::parse(&format).map_err(|e| e.to_string())?;
        config = config.with_format(format);
    }
    FlatDb::open_file(config, &PathBuf::from(path))
        .await
        .map_err(|e| format!("open database: {e}"))
}

async fn cmd_init(db: &FlatDb) -> Result<(), String> {
    let added = db
        .ensure_collections(&[Genre::collection(), Movie::collection()])
        .await
        .map_err(|e| format!("init: {e}"))?;
    println!("ok\t{added}");
    Ok(())
}

async fn cmd_dump(db: &FlatDb) -> Result<(), String> {
    let snapshot = db.snapshot().await.map_err(|e| format!("dump: {e}"))?;
    print_json(&snapshot)
}

async fn cmd_genres_list(db: &FlatDb) -> Result<(), String> {
    let names = Genre::names(db)
        .await
        .map_err(|e| format!("list genres: {e}"))?;
    print_json(&names)
}

async fn cmd_genres_add(db: &FlatDb, name: &str) -> Result<(), String> {
    let mut genre = Genre::new(name);
    genre
        .save(db)
        .await
        .map_err(|e| format!("add genre: {e}"))?;
    print_json(genre.record())
}

async fn cmd_movies_add(db: &FlatDb, args: &[String]) -> Result<(), String> {
    let mut record = Record::new();
    for (flag, field) in [
        ("--title", "title"),
        ("--director", "director"),
        ("--year", "year"),
        ("--runtime", "runtime"),
        ("--actors", "actors"),
        ("--plot", "plot"),
        ("--poster-url", "posterUrl"),
    ] {
        if let Some(value) = parse_flag_value(args, flag) {
            record.insert(field, value);
        }
    }
    if let Some(genres) = parse_flag_value(args, "--genres") {
        record.insert("genres", split_list(&genres));
    }
    let mut movie = Movie::from_fields(record);
    movie
        .save(db)
        .await
        .map_err(|e| format!("add movie: {e}"))?;
    print_json(movie.record())
}

async fn cmd_movies_search(db: &FlatDb, args: &[String]) -> Result<(), String> {
    let mut search = MovieSearch::new();
    if let Some(duration) = parse_flag_value(args, "--duration") {
        let minutes = duration
            .trim()
            .parse::<i64>()
            .map_err(|e| format!("invalid --duration: {e}"))?;
        search = search.duration(minutes);
    }
    if let Some(genres) = parse_flag_value(args, "--genres") {
        search = search.genres(split_list(&genres));
    }
    let found = search
        .run(db)
        .await
        .map_err(|e| format!("search movies: {e}"))?;
    match found {
        QueryOutput::Many(movies) => {
            let records: Vec<&Record> = movies.iter().map(|movie| movie.record()).collect();
            print_json(&records)
        }
        QueryOutput::One(movie) => print_json(&movie.as_ref().map(|movie| movie.record())),
    }
}

/// Every argument that is neither a known flag nor a flag's value.
fn positional(args: &[String]) -> Vec<&str> {
    let mut words = Vec::new();
    let mut idx = 0;
    while idx < args.len() {
        if VALUE_FLAGS.contains(&args[idx].as_str()) {
            idx += 2;
            continue;
        }
        words.push(args[idx].as_str());
        idx += 1;
    }
    words
}

fn parse_flag_value(args: &[String], flag: &str) -> Option<String> {
    for idx in 0..args.len() {
        if args[idx] == flag {
            return args.get(idx + 1).cloned();
        }
    }
    None
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value).map_err(|e| format!("encode output: {e}"))?;
    println!("{text}");
    Ok(())
}

fn print_usage() {
    eprintln!("usage:");
    eprintln!("  flatdb init --db <file> [--format json|msgpack]");
    eprintln!("  flatdb dump --db <file> [--format json|msgpack]");
    eprintln!("  flatdb genres list --db <file>");
    eprintln!("  flatdb genres add <name> --db <file>");
    eprintln!(
        "  flatdb movies add --db <file> --title <t> --director <d> --year <y> --runtime <min> --genres <a,b> [--actors <a>] [--plot <p>] [--poster-url <url>]"
    );
    eprintln!("  flatdb movies search --db <file> [--duration <min>] [--genres <a,b>]");
}
