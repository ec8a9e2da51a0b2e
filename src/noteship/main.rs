use clap::Parser;
use colored::*;
use console::Term;
use noteship::api::{CmdMessage, MessageLevel, NoteshipApi, ProcessOptions, UploadOptions};
use noteship::commands::{self, BatchReport, StageTally, UploadReport};
use noteship::error::{NoteshipError, Result};
use noteship::fetch::HttpFetcher;
use noteship::filter::UploadFilter;
use noteship::store::http::EtapiClient;
use noteship::envfile;
use std::path::PathBuf;
use unicode_width::UnicodeWidthStr;

mod args;
use args::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

struct AppContext {
    api: NoteshipApi<EtapiClient>,
    verbose: bool,
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let env_path = envfile::resolve_path(cli.env_file.as_deref(), cli.global)?;

    match cli.command {
        Commands::Token { server, password } => handle_token(&env_path, server, password),
        Commands::Info => {
            let mut ctx = init_context(&env_path, cli.verbose)?;
            handle_info(&mut ctx)
        }
        Commands::Upload {
            dir,
            parent,
            create_parent,
            ignore_dirs,
            ignore_files,
            include,
            ignore_list,
        } => {
            let mut ctx = init_context(&env_path, cli.verbose)?;
            let filter = build_filter(ignore_dirs, ignore_files, include, ignore_list)?;
            handle_upload(&mut ctx, dir, parent, create_parent, filter)
        }
        Commands::Process {
            days_back,
            max_notes,
            note_id,
        } => {
            let mut ctx = init_context(&env_path, cli.verbose)?;
            handle_process(&mut ctx, days_back, max_notes, note_id)
        }
    }
}

fn init_context(env_path: &std::path::Path, verbose: bool) -> Result<AppContext> {
    let conn = envfile::load(env_path)?;
    let store = EtapiClient::new(&conn.server_url, &conn.token)?;
    Ok(AppContext {
        api: NoteshipApi::new(store),
        verbose,
    })
}

fn handle_token(env_path: &std::path::Path, server: String, password: Option<String>) -> Result<()> {
    let password = match password {
        Some(p) => p,
        None => prompt_password()?,
    };
    let token = EtapiClient::login(&server, &password)?;
    let result = commands::token::run(env_path, server, token)?;
    print_messages(&result.messages, true);
    Ok(())
}

fn prompt_password() -> Result<String> {
    let term = Term::stderr();
    if !term.is_term() {
        return Err(NoteshipError::Usage(
            "No terminal available; pass the password with --password".to_string(),
        ));
    }
    term.write_str("Trilium password: ")?;
    let password = term.read_secure_line()?;
    if password.is_empty() {
        return Err(NoteshipError::Usage("Password cannot be empty".to_string()));
    }
    Ok(password)
}

fn handle_info(ctx: &mut AppContext) -> Result<()> {
    let result = ctx.api.server_info()?;
    if let Some(info) = &result.app_info {
        let rows = [
            ("App version", info.app_version.clone()),
            ("DB version", info.db_version.to_string()),
            ("Build date", info.build_date.clone()),
        ];
        let label_width = rows.iter().map(|(l, _)| l.width()).max().unwrap_or(0);
        for (label, value) in &rows {
            println!(
                "{}{}  {}",
                label.bold(),
                " ".repeat(label_width - label.width()),
                value
            );
        }
    }
    print_messages(&result.messages, ctx.verbose);
    Ok(())
}

fn build_filter(
    ignore_dirs: Vec<String>,
    ignore_files: Vec<String>,
    include: Vec<String>,
    ignore_list: Option<PathBuf>,
) -> Result<UploadFilter> {
    let mut builder = UploadFilter::builder()
        .ignore_dirs(ignore_dirs)
        .ignore_files(ignore_files)
        .include(include);
    if let Some(path) = &ignore_list {
        builder = builder.ignore_list_file(path)?;
    }
    builder.build()
}

fn handle_upload(
    ctx: &mut AppContext,
    dir: PathBuf,
    parent: String,
    create_parent: bool,
    filter: UploadFilter,
) -> Result<()> {
    let mut opts = UploadOptions {
        root: dir,
        parent_title: parent,
        create_parent,
        filter,
    };

    let result = match ctx.api.upload_folder(&opts) {
        Err(NoteshipError::ParentNotFound(title)) if !opts.create_parent => {
            if !confirm_create_parent(&title)? {
                return Err(NoteshipError::ParentNotFound(title));
            }
            opts.create_parent = true;
            ctx.api.upload_folder(&opts)?
        }
        other => other?,
    };

    if let Some(report) = &result.upload {
        print_upload_report(report);
    }
    print_messages(&result.messages, ctx.verbose);
    Ok(())
}

fn confirm_create_parent(title: &str) -> Result<bool> {
    let term = Term::stderr();
    if !term.is_term() {
        return Ok(false);
    }
    term.write_str(&format!("Parent note '{}' not found. Create it? [y/N] ", title))?;
    let answer = term.read_line()?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn print_upload_report(report: &UploadReport) {
    println!("Notes created:   {}", report.notes_created);
    println!("Assets attached: {}", report.assets_attached);
    if report.assets_skipped > 0 {
        println!("Assets skipped:  {}", report.assets_skipped);
    }
    if report.failed > 0 {
        println!("{}", format!("Failed:          {}", report.failed).red());
        for err in &report.errors {
            eprintln!("  {}", err.red());
        }
    }
}

fn handle_process(
    ctx: &mut AppContext,
    days_back: u32,
    max_notes: usize,
    note_id: Option<String>,
) -> Result<()> {
    let fetcher = HttpFetcher::new()?;
    let opts = ProcessOptions {
        days_back,
        max_notes,
        note_id,
    };
    let result = ctx.api.process_notes(&fetcher, &opts)?;

    if let Some(report) = &result.batch {
        print_batch_report(report);
    }
    print_messages(&result.messages, ctx.verbose);
    Ok(())
}

const STAGE_WIDTH: usize = 16;

fn print_batch_report(report: &BatchReport) {
    println!("Found {} notes, processed {}", report.found, report.processed);
    if report.modified_found > 0 {
        println!("Modified in window: {}", report.modified_found);
    }
    println!();
    let header = format!(
        "{:<width$} {:>6} {:>11} {:>7}",
        "Stage",
        "Total",
        "Successful",
        "Failed",
        width = STAGE_WIDTH
    );
    println!("{}", header.bold());
    print_tally("Revisions", &report.revisions);
    print_tally("Internal links", &report.linking);
    print_tally("Articles", &report.enrichment);
    print_tally("Clippings", &report.reading);
    println!();
    println!("Links added:          {}", report.links_added);
    println!("URLs found:           {}", report.urls_found);
    println!("Articles fetched:     {}", report.articles_fetched);
    println!("Highlights extracted: {}", report.highlights_extracted);

    let errors = report.all_errors();
    if !errors.is_empty() {
        println!();
        for err in errors {
            eprintln!("{}", err.red());
        }
    }
}

fn print_tally(stage: &str, tally: &StageTally) {
    let failed = format!("{:>7}", tally.failed);
    let failed = if tally.failed > 0 {
        failed.red()
    } else {
        failed.normal()
    };
    println!(
        "{:<width$} {:>6} {:>11} {}",
        stage,
        tally.total,
        tally.succeeded,
        failed,
        width = STAGE_WIDTH
    );
}

fn print_messages(messages: &[CmdMessage], verbose: bool) {
    for message in messages {
        match message.level {
            MessageLevel::Info => {
                if verbose {
                    println!("{}", message.content.dimmed())
                }
            }
            MessageLevel::Success => println!("{}", message.content.green()),
            MessageLevel::Warning => println!("{}", message.content.yellow()),
            MessageLevel::Error => println!("{}", message.content.red()),
        }
    }
}
