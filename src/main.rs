use anyhow::Result;
use chrono::Local;
use clap::{App, Arg, SubCommand};
use evergreen::audit;
use evergreen::catalog::{CatalogStore, JsonCatalogStore};
use evergreen::config::Config;
use evergreen::document::Document;
use evergreen::journal::Journal;
use evergreen::refresh;
use evergreen::render::RandomFacts;
use evergreen::sitemap;
use std::path::PathBuf;

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("evergreen: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let matches = App::new("evergreen")
        .about("Keeps a static site's marketing articles fresh")
        .arg(
            Arg::with_name("project")
                .short("p")
                .long("project")
                .takes_value(true)
                .help("Project directory (defaults to the current directory)"),
        )
        .subcommand(SubCommand::with_name("refresh").about("Run a full refresh pass (the default)"))
        .subcommand(SubCommand::with_name("audit").about("Report duplicated auto-content markers"))
        .subcommand(SubCommand::with_name("sitemap").about("Rewrite sitemap lastmod dates to today"))
        .get_matches();

    let dir = match matches.value_of("project") {
        Some(dir) => PathBuf::from(dir),
        None => std::env::current_dir()?,
    };
    let config = Config::from_directory(&dir)?;
    let journal = Journal::open(&config.log_path);
    let now = Local::now().naive_local();

    match matches.subcommand_name() {
        Some("sitemap") => {
            sitemap::update_lastmod(&config.sitemap_path, now.date(), &journal)?;
        }
        Some("audit") => report_duplicates(&config)?,
        _ => {
            journal.record("starting refresh pass");
            let store = JsonCatalogStore::new(
                config.catalog_path.clone(),
                config.articles_directory.clone(),
            );
            let mut facts = RandomFacts::new();
            let summary = refresh::run(&config, &store, &mut facts, &journal, now)?;
            journal.record(&format!(
                "refresh pass complete: {} refreshed, {} skipped, {} failed",
                summary.refreshed, summary.skipped, summary.failed
            ));
        }
    }
    Ok(())
}

fn report_duplicates(config: &Config) -> Result<()> {
    let store = JsonCatalogStore::new(
        config.catalog_path.clone(),
        config.articles_directory.clone(),
    );
    let mut clean = true;
    for article in &store.load()?.articles {
        let path = config.articles_directory.join(&article.file);
        let doc = match Document::load(&path) {
            Ok(doc) => doc,
            Err(e) => {
                println!("{}: {}", article.file, e);
                clean = false;
                continue;
            }
        };
        let duplicated = audit::scan(&doc.html);
        if !duplicated.is_empty() {
            clean = false;
            println!(
                "{}: duplicated {}",
                article.file,
                duplicated
                    .iter()
                    .map(|kind| kind.slug())
                    .collect::<Vec<&str>>()
                    .join(", ")
            );
        }
    }
    if clean {
        println!("no duplicate markers found");
    }
    Ok(())
}
