mod catalog;
mod db;
mod error;
mod history;
mod models;
mod pool;
mod question;
mod runner;
mod sampling;
mod session;
mod store;
mod wrongbook;

use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::{self, Read};
use std::path::PathBuf;

use catalog::{CatalogSource, EmbeddedCatalog, FileCatalog};
use db::Database;
use models::{Category, CategoryFilter, IdiomRecord, JsonOutput, QuestionMode, LEARNERS};
use session::QuizService;
use store::{Bin, KeyValueStore, MemoryStore};

const DEFAULT_DB_NAME: &str = "idiom-drill.db";

#[derive(Parser)]
#[command(name = "idiom-drill")]
#[command(about = "Practise Chinese idioms with quizzes, recency avoidance and a wrongbook")]
#[command(version)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Idiom catalog JSON file (defaults to the built-in set)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// List the learners
    Learners,

    /// Show or change quiz settings
    #[command(subcommand)]
    Settings(SettingsCommands),

    /// Take a quiz
    Quiz {
        /// Only ask idioms from the wrongbook
        #[arg(long)]
        only_wrong: bool,

        /// Seed for reproducible draws
        #[arg(long)]
        seed: Option<u64>,

        /// Practice run: nothing is written to history or the wrongbook
        #[arg(long)]
        practice: bool,
    },

    /// Review or clear missed idioms
    #[command(subcommand)]
    Wrongbook(WrongbookCommands),

    /// Show recent draws for the current learner
    History,

    /// Search the idiom catalog
    Catalog {
        /// Text to look for in the idiom, meaning or story
        #[arg(long, short)]
        query: Option<String>,

        /// Category name
        #[arg(long, short)]
        category: Option<String>,
    },

    /// Manage story video overrides
    #[command(subcommand)]
    Media(MediaCommands),

    /// Remove settings, wrongbook, history and overrides
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum SettingsCommands {
    /// Show current settings
    Show,

    /// Update settings (unset options keep their value)
    Set {
        /// Learner name
        #[arg(long, short)]
        learner: Option<String>,

        /// Comma-separated categories, or 全部 for all
        #[arg(long, short)]
        categories: Option<String>,

        /// Questions per quiz
        #[arg(long, short = 'n')]
        count: Option<usize>,

        /// Skip idioms drawn in this many recent days (0 disables)
        #[arg(long, short)]
        avoid_days: Option<u32>,

        /// Comma-separated question modes: mc_meaning, fill_drag, scene, tf
        #[arg(long, short)]
        modes: Option<String>,
    },
}

#[derive(Subcommand)]
enum WrongbookCommands {
    /// List missed idioms for the current learner
    List,

    /// Remove an idiom from the wrongbook
    Clear {
        /// Idiom ID
        id: String,
    },
}

#[derive(Subcommand)]
enum MediaCommands {
    /// Set the video ID for an idiom
    Set {
        /// Idiom ID
        id: String,

        /// Video ID (not the full URL)
        link: String,
    },

    /// Remove the override for an idiom
    Clear {
        /// Idiom ID
        id: String,
    },

    /// Print all overrides as JSON
    Export,

    /// Replace overrides from a JSON file, or stdin when omitted or "-"
    Import {
        file: Option<PathBuf>,
    },
}

fn get_db_path() -> PathBuf {
    if let Ok(path) = std::env::var("IDIOM_DRILL_DB") {
        return PathBuf::from(path);
    }

    let config_dir = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("idiom-drill");

    std::fs::create_dir_all(&config_dir).ok();
    config_dir.join(DEFAULT_DB_NAME)
}

fn catalog_source(flag: Option<PathBuf>) -> Box<dyn CatalogSource> {
    match flag.or_else(|| std::env::var_os("IDIOM_DRILL_CATALOG").map(PathBuf::from)) {
        Some(path) => Box::new(FileCatalog::new(path)),
        None => Box::new(EmbeddedCatalog),
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("idiom_drill=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let db_path = get_db_path();
    let db = Database::open(&db_path)?;
    db.init()?;
    let source = catalog_source(cli.catalog);

    match cli.command {
        Commands::Init => {
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::<()>::ok(()))?);
            } else {
                println!("Database initialized at: {}", db_path.display());
            }
        }

        Commands::Learners => {
            let current = store::load_settings(&db)?.learner;
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(LEARNERS))?);
            } else {
                for name in LEARNERS {
                    let marker = if name == current { "*" } else { " " };
                    println!("{} {}", marker, name);
                }
            }
        }

        Commands::Settings(cmd) => match cmd {
            SettingsCommands::Show => {
                let settings = store::load_settings(&db)?;
                print_settings(&settings, cli.json)?;
                if !cli.json {
                    match db.updated_at(Bin::Settings)? {
                        Some(ts) => println!("Saved:      {}", ts),
                        None => println!("Saved:      never (defaults)"),
                    }
                }
            }

            SettingsCommands::Set {
                learner,
                categories,
                count,
                avoid_days,
                modes,
            } => {
                let mut settings = store::load_settings(&db)?;
                if let Some(learner) = learner {
                    settings.learner = learner;
                }
                if let Some(categories) = categories {
                    settings.categories = CategoryFilter::from_names(&split_list(&categories));
                }
                if let Some(count) = count {
                    settings.count = count;
                }
                if let Some(avoid_days) = avoid_days {
                    settings.avoid_days = avoid_days;
                }
                if let Some(modes) = modes {
                    settings.modes = parse_modes(&modes)?;
                }

                let saved = store::save_settings(&db, settings)?;
                print_settings(&saved, cli.json)?;
            }
        },

        Commands::Quiz {
            only_wrong,
            seed,
            practice,
        } => {
            let all = catalog::load_with_overrides(source.as_ref(), &db)?;
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };

            if practice {
                let scratch = MemoryStore::new();
                store::save(&scratch, Bin::Settings, &store::load_settings(&db)?)?;
                store::save_history(&scratch, &store::load_history(&db)?)?;
                store::save_wrongbook(&scratch, &store::load_wrongbook(&db)?)?;
                quiz(&scratch, all, only_wrong, cli.json, &mut rng)?;
            } else {
                quiz(&db, all, only_wrong, cli.json, &mut rng)?;
            }
        }

        Commands::Wrongbook(cmd) => match cmd {
            WrongbookCommands::List => {
                let learner = store::load_settings(&db)?.learner;
                let all = catalog::load_with_overrides(source.as_ref(), &db)?;
                let wrongbook = store::load_wrongbook(&db)?;

                let rows: Vec<serde_json::Value> = wrongbook
                    .entries(&learner)
                    .into_iter()
                    .filter_map(|(id, entry)| {
                        let it = find(&all, id)?;
                        Some(serde_json::json!({
                            "id": id,
                            "idiom": it.idiom,
                            "category": it.category,
                            "zhuyin": it.zhuyin,
                            "meaning": it.meaning,
                            "count": entry.count,
                            "last": entry.last,
                            "types": entry.types,
                        }))
                    })
                    .collect();

                if cli.json {
                    println!("{}", serde_json::to_string(&JsonOutput::ok(&rows))?);
                } else if rows.is_empty() {
                    println!("No missed idioms for {}.", learner);
                } else {
                    println!("{:<6} {:<14} {:<6} TYPES", "ID", "IDIOM", "MISSES");
                    println!("{}", "-".repeat(50));
                    for row in &rows {
                        let types: Vec<&str> = row["types"]
                            .as_array()
                            .map(|t| t.iter().filter_map(|v| v.as_str()).collect())
                            .unwrap_or_default();
                        println!(
                            "{:<6} {:<14} {:<6} {}",
                            row["id"].as_str().unwrap_or("-"),
                            row["idiom"].as_str().unwrap_or("-"),
                            row["count"],
                            types.join(", ")
                        );
                    }
                }
            }

            WrongbookCommands::Clear { id } => {
                let learner = store::load_settings(&db)?.learner;
                let removed = QuizService::new(&db).clear_wrong(&learner, &id)?;
                if cli.json {
                    println!("{}", serde_json::to_string(&JsonOutput::ok(removed))?);
                } else if removed {
                    println!("Removed {} from {}'s wrongbook.", id, learner);
                } else {
                    println!("{} is not in {}'s wrongbook.", id, learner);
                }
            }
        },

        Commands::History => {
            let learner = store::load_settings(&db)?.learner;
            let all = source.load()?;
            let history = store::load_history(&db)?;
            let days = history.days(&learner);

            if cli.json {
                let map: serde_json::Map<String, serde_json::Value> = days
                    .iter()
                    .map(|(day, ids)| (day.to_string(), serde_json::json!(ids)))
                    .collect();
                println!("{}", serde_json::to_string(&JsonOutput::ok(map))?);
            } else if days.is_empty() {
                println!("No draws recorded for {}.", learner);
            } else {
                for (day, ids) in days {
                    let names: Vec<&str> = ids
                        .iter()
                        .map(|id| find(&all, id).map_or(id.as_str(), |it| it.idiom.as_str()))
                        .collect();
                    println!("{}  {}", day, names.join("、"));
                }
            }
        }

        Commands::Catalog { query, category } => {
            let category = match category.as_deref() {
                None => None,
                Some(name) => Some(
                    Category::from_str(name).ok_or_else(|| format!("Unknown category '{}'", name))?,
                ),
            };
            let all = catalog::load_with_overrides(source.as_ref(), &db)?;
            let found = catalog::search(&all, query.as_deref(), category);

            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&found))?);
            } else {
                println!("{} idioms", found.len());
                println!("{:<6} {:<14} {:<10} VIDEO", "ID", "IDIOM", "CATEGORY");
                println!("{}", "-".repeat(50));
                for it in found {
                    println!(
                        "{:<6} {:<14} {:<10} {}",
                        it.id,
                        it.idiom,
                        it.category.as_str(),
                        it.media_link.as_deref().unwrap_or("-")
                    );
                }
            }
        }

        Commands::Media(cmd) => match cmd {
            MediaCommands::Set { id, link } => {
                catalog::set_override(&db, &id, &link)?;
                if cli.json {
                    println!("{}", serde_json::to_string(&JsonOutput::<()>::ok(()))?);
                } else {
                    println!("Saved video for {}.", id);
                }
            }

            MediaCommands::Clear { id } => {
                let removed = catalog::clear_override(&db, &id)?;
                if cli.json {
                    println!("{}", serde_json::to_string(&JsonOutput::ok(removed))?);
                } else if removed {
                    println!("Cleared video for {}.", id);
                } else {
                    println!("No override for {}.", id);
                }
            }

            MediaCommands::Export => {
                println!("{}", catalog::export_overrides(&db)?);
            }

            MediaCommands::Import { file } => {
                let text = match file {
                    Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(path)?,
                    _ => {
                        let mut buf = String::new();
                        io::stdin().read_to_string(&mut buf)?;
                        buf
                    }
                };

                match catalog::import_overrides(&db, &text) {
                    Ok(()) => {
                        if cli.json {
                            println!("{}", serde_json::to_string(&JsonOutput::<()>::ok(()))?);
                        } else {
                            println!("Overrides imported.");
                        }
                    }
                    Err(e) if cli.json => {
                        println!("{}", serde_json::to_string(&JsonOutput::<()>::err(e.to_string()))?);
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        },

        Commands::Reset { yes } => {
            if !yes {
                return Err("Reset removes settings, wrongbook, history and overrides. Re-run with --yes.".into());
            }
            store::reset(&db)?;
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::<()>::ok(()))?);
            } else {
                println!("All saved data removed.");
            }
        }
    }

    Ok(())
}

fn quiz<S: KeyValueStore + ?Sized>(
    store: &S,
    all: Vec<IdiomRecord>,
    only_wrong: bool,
    json: bool,
    rng: &mut StdRng,
) -> Result<(), Box<dyn std::error::Error>> {
    let service = QuizService::new(store);

    let Some(mut session) = service.start_session(all, only_wrong, rng)? else {
        if json {
            println!(
                "{}",
                serde_json::to_string(&JsonOutput::<()>::err("No questions available"))?
            );
        } else {
            println!("No questions available.");
            if only_wrong {
                println!("The wrongbook is empty for this learner.");
            } else {
                println!("Try more categories or a smaller avoid-days window.");
            }
        }
        return Ok(());
    };

    let stdin = io::stdin();
    let mut input = stdin.lock();

    if json {
        let mut prompts = io::stderr();
        let outcome = runner::run_quiz(&service, &mut session, &mut input, &mut prompts, rng)?;
        println!("{}", serde_json::to_string(&JsonOutput::ok(outcome))?);
    } else {
        let settings = session.settings();
        println!(
            "Learner: {}  Categories: {}  Avoid: {} days{}",
            settings.learner,
            settings.categories.label(),
            settings.avoid_days,
            if session.only_wrong() { "  [wrongbook]" } else { "" }
        );
        println!("Type the option number or the answer. ? shows 注音, q quits.");
        let mut out = io::stdout();
        runner::run_quiz(&service, &mut session, &mut input, &mut out, rng)?;
    }
    Ok(())
}

fn find<'a>(all: &'a [IdiomRecord], id: &str) -> Option<&'a IdiomRecord> {
    all.iter().find(|it| it.id == id)
}

fn split_list(s: &str) -> Vec<String> {
    s.split([',', '，', '、'])
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

fn parse_modes(s: &str) -> Result<Vec<QuestionMode>, String> {
    split_list(s)
        .iter()
        .map(|m| {
            QuestionMode::from_str(m).ok_or_else(|| {
                format!(
                    "Invalid mode '{}'. Use: mc_meaning, fill_drag, scene, tf",
                    m
                )
            })
        })
        .collect()
}

fn print_settings(
    settings: &models::LearnerSettings,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string(&JsonOutput::ok(settings))?);
    } else {
        let modes: Vec<&str> = settings.modes.iter().map(|m| m.as_str()).collect();
        println!("Learner:    {}", settings.learner);
        println!("Categories: {}", settings.categories.label());
        println!("Count:      {}", settings.count);
        println!("Avoid days: {}", settings.avoid_days);
        println!("Modes:      {}", modes.join(", "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    mod helper_tests {
        use super::*;

        #[test]
        fn split_list_accepts_chinese_separators() {
            assert_eq!(
                split_list("生活行為，情緒表情、 時間流程,"),
                vec!["生活行為", "情緒表情", "時間流程"]
            );
        }

        #[test]
        fn split_list_empty() {
            assert!(split_list("").is_empty());
        }

        #[test]
        fn parse_modes_valid() {
            assert_eq!(
                parse_modes("tf,scene").unwrap(),
                vec![QuestionMode::TrueFalse, QuestionMode::SceneChoice]
            );
        }

        #[test]
        fn parse_modes_invalid() {
            let err = parse_modes("tf,essay").unwrap_err();
            assert!(err.contains("essay"));
        }
    }

    mod cli_parsing_tests {
        use super::*;

        #[test]
        fn parse_init_command() {
            let cli = Cli::try_parse_from(["idiom-drill", "init"]).unwrap();
            assert!(!cli.json);
            assert!(matches!(cli.command, Commands::Init));
        }

        #[test]
        fn parse_quiz_defaults() {
            let cli = Cli::try_parse_from(["idiom-drill", "quiz"]).unwrap();
            match cli.command {
                Commands::Quiz {
                    only_wrong,
                    seed,
                    practice,
                } => {
                    assert!(!only_wrong);
                    assert!(seed.is_none());
                    assert!(!practice);
                }
                _ => panic!("Expected Quiz command"),
            }
        }

        #[test]
        fn parse_quiz_only_wrong_with_seed() {
            let cli =
                Cli::try_parse_from(["idiom-drill", "quiz", "--only-wrong", "--seed", "7"]).unwrap();
            match cli.command {
                Commands::Quiz { only_wrong, seed, .. } => {
                    assert!(only_wrong);
                    assert_eq!(seed, Some(7));
                }
                _ => panic!("Expected Quiz command"),
            }
        }

        #[test]
        fn parse_quiz_practice() {
            let cli = Cli::try_parse_from(["idiom-drill", "quiz", "--practice"]).unwrap();
            assert!(matches!(cli.command, Commands::Quiz { practice: true, .. }));
        }

        #[test]
        fn parse_settings_set() {
            let cli = Cli::try_parse_from([
                "idiom-drill",
                "settings",
                "set",
                "--learner",
                "安安",
                "-n",
                "5",
                "--avoid-days",
                "0",
                "--modes",
                "tf",
            ])
            .unwrap();
            match cli.command {
                Commands::Settings(SettingsCommands::Set {
                    learner,
                    categories,
                    count,
                    avoid_days,
                    modes,
                }) => {
                    assert_eq!(learner, Some("安安".to_string()));
                    assert!(categories.is_none());
                    assert_eq!(count, Some(5));
                    assert_eq!(avoid_days, Some(0));
                    assert_eq!(modes, Some("tf".to_string()));
                }
                _ => panic!("Expected Settings Set command"),
            }
        }

        #[test]
        fn parse_wrongbook_clear() {
            let cli = Cli::try_parse_from(["idiom-drill", "wrongbook", "clear", "i003"]).unwrap();
            match cli.command {
                Commands::Wrongbook(WrongbookCommands::Clear { id }) => assert_eq!(id, "i003"),
                _ => panic!("Expected Wrongbook Clear command"),
            }
        }

        #[test]
        fn parse_media_import_stdin() {
            let cli = Cli::try_parse_from(["idiom-drill", "media", "import"]).unwrap();
            match cli.command {
                Commands::Media(MediaCommands::Import { file }) => assert!(file.is_none()),
                _ => panic!("Expected Media Import command"),
            }
        }

        #[test]
        fn parse_catalog_with_global_flags() {
            let cli = Cli::try_parse_from([
                "idiom-drill",
                "catalog",
                "-q",
                "心",
                "--json",
                "--catalog",
                "/tmp/idioms.json",
            ])
            .unwrap();
            assert!(cli.json);
            assert_eq!(cli.catalog, Some(PathBuf::from("/tmp/idioms.json")));
            match cli.command {
                Commands::Catalog { query, category } => {
                    assert_eq!(query, Some("心".to_string()));
                    assert!(category.is_none());
                }
                _ => panic!("Expected Catalog command"),
            }
        }

        #[test]
        fn parse_reset_requires_nothing_but_flag_defaults_off() {
            let cli = Cli::try_parse_from(["idiom-drill", "reset"]).unwrap();
            assert!(matches!(cli.command, Commands::Reset { yes: false }));
        }

        #[test]
        fn parse_invalid_command_fails() {
            assert!(Cli::try_parse_from(["idiom-drill", "invalid"]).is_err());
            assert!(Cli::try_parse_from(["idiom-drill", "media", "set", "i001"]).is_err());
        }
    }

    mod path_tests {
        use super::*;
        use std::env;

        #[test]
        fn get_db_path_uses_env_var() {
            let test_path = "/tmp/test_idiom_drill.db";
            env::set_var("IDIOM_DRILL_DB", test_path);

            let path = get_db_path();
            assert_eq!(path.to_str().unwrap(), test_path);

            env::remove_var("IDIOM_DRILL_DB");
        }

        #[test]
        fn catalog_flag_selects_file_source() {
            let dir = tempfile::tempdir().unwrap();
            let source = catalog_source(Some(dir.path().join("missing.json")));
            assert!(source.load().is_err());
        }
    }
}
