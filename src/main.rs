mod api;
mod auth;
mod cli;
mod config;
mod journal;
mod routes;
mod session;
mod stores;
mod types;
mod upload;
mod validate;

use anyhow::Result;
use clap::Parser;
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

#[derive(Parser)]
#[command(name = "vitrina", about = "A terminal storefront client")]
pub struct Args {
    #[arg(short = 'c', long, help = "Run one command and exit")]
    pub command: Option<String>,

    #[arg(long, env = "VITRINA_BASE_URL", help = "Base URL of the catalog API")]
    pub base_url: Option<String>,

    #[arg(long, help = "Config file path")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Session storage directory")]
    pub session_dir: Option<PathBuf>,

    #[arg(long, help = "Journal directory")]
    pub journal_dir: Option<PathBuf>,

    #[arg(long, help = "Page size for listings")]
    pub limit: Option<u64>,

    #[arg(long, help = "Sort order for post listings (e.g. '-createdAt')")]
    pub sort: Option<String>,

    #[arg(long, help = "Verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Debug output (print HTTP details and settings)")]
    pub debug: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Load configuration (builtin defaults plus any layered files)
    let mut cfg = if let Some(config_path) = &args.config {
        config::Config::load_from(config_path)?
    } else {
        config::Config::load().unwrap_or_default()
    };

    // CLI flags and env vars win over files
    if let Some(base_url) = &args.base_url {
        cfg.api.base_url = base_url.clone();
    }
    if let Some(limit) = args.limit {
        cfg.ui.page_limit = limit;
    }
    if let Some(sort) = &args.sort {
        cfg.ui.sort = Some(sort.clone());
    }

    if let Err(errors) = cfg.validate() {
        for error in &errors {
            eprintln!("Config error {}", error);
        }
        return Err(anyhow::anyhow!("invalid configuration"));
    }

    if args.debug {
        eprintln!("[DEBUG] Base URL: {}", cfg.api.base_url);
        eprintln!("[DEBUG] Page limit: {}", cfg.ui.page_limit);
        eprintln!(
            "[DEBUG] Uploads configured: {}",
            cfg.uploads.endpoint().is_some()
        );
    }

    let state_dir = config::state_dir();
    let session_dir = args
        .session_dir
        .clone()
        .unwrap_or_else(|| state_dir.join("session"));
    let journal_dir = args
        .journal_dir
        .clone()
        .unwrap_or_else(|| state_dir.join("sessions"));
    std::fs::create_dir_all(&journal_dir)?;

    let session_id = uuid::Uuid::new_v4().to_string();
    let journal_path = journal_dir.join(format!("{}.jsonl", session_id));
    let journal = Rc::new(RefCell::new(journal::Journal::new(
        &journal_path,
        &session_id,
    )?));
    let _ = journal.borrow_mut().session_start(&cfg.api.base_url);

    let session = session::SessionStore::new(&session_dir)?;
    let api: Rc<dyn api::Api> = Rc::new(api::HttpApi::new(
        &cfg.api.base_url,
        session.clone(),
        args.debug,
    ));

    // Resolve the persisted session once, before any gate runs
    let mut auth = auth::AuthStore::new(api.clone(), session, journal.clone());
    auth.bootstrap();

    let categories = stores::categories::CategoryStore::new(api.clone(), journal.clone());
    let posts = stores::posts::PostStore::new(
        api.clone(),
        journal.clone(),
        cfg.ui.page_limit,
        cfg.ui.sort.clone(),
    );
    let admin = stores::users::AdminStore::new(api.clone(), journal.clone(), cfg.ui.page_limit);

    let ctx = cli::Context {
        args,
        config: cfg,
        session_id,
        auth: RefCell::new(auth),
        categories: RefCell::new(categories),
        posts: RefCell::new(posts),
        admin: RefCell::new(admin),
        journal,
    };

    if let Some(command) = ctx.args.command.clone() {
        cli::run_once(&ctx, &command)
    } else {
        cli::run_repl(ctx)
    }
}
