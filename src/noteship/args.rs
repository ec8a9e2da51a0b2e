use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "noteship")]
#[command(about = "Trilium automation: bulk Markdown upload and daily note processing", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the .env file with connection settings
    #[arg(short, long, global = true)]
    pub env_file: Option<std::path::PathBuf>,

    /// Use the global config directory instead of ./.env
    #[arg(short, long, global = true)]
    pub global: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Obtain an ETAPI token and store it in the env file
    Token {
        /// Server URL, e.g. http://localhost:8080
        #[arg(short, long)]
        server: String,

        /// Trilium password (prompted when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Show server version information
    Info,

    /// Upload a folder of Markdown files as a note subtree
    #[command(alias = "up")]
    Upload {
        /// Folder to upload
        dir: std::path::PathBuf,

        /// Title of the existing parent note to upload under
        #[arg(short, long)]
        parent: String,

        /// Create the parent note when it does not exist, without prompting
        #[arg(long)]
        create_parent: bool,

        /// Additional directory name to skip (repeatable)
        #[arg(long = "ignore-dir")]
        ignore_dirs: Vec<String>,

        /// Additional file name to skip (repeatable)
        #[arg(long = "ignore-file")]
        ignore_files: Vec<String>,

        /// Additional filename glob to include (repeatable)
        #[arg(long = "include")]
        include: Vec<String>,

        /// File listing names to skip, one per line (dirs end with /)
        #[arg(long = "ignore-list")]
        ignore_list: Option<std::path::PathBuf>,
    },

    /// Process recently created notes: revisions, internal links, #link articles
    #[command(alias = "proc")]
    Process {
        /// How many days back to look for notes
        #[arg(short, long, default_value_t = 1)]
        days_back: u32,

        /// Maximum number of notes to process in one run
        #[arg(short, long, default_value_t = 100)]
        max_notes: usize,

        /// Process a single note by id instead of a window
        #[arg(short, long)]
        note_id: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_upload_with_filters() {
        let cli = Cli::parse_from([
            "noteship",
            "upload",
            "./docs",
            "--parent",
            "Inbox",
            "--ignore-dir",
            "drafts",
            "--ignore-file",
            "SCRATCH.md",
            "--include",
            "*.markdown",
        ]);
        match cli.command {
            Commands::Upload {
                parent,
                ignore_dirs,
                ignore_files,
                include,
                create_parent,
                ..
            } => {
                assert_eq!(parent, "Inbox");
                assert_eq!(ignore_dirs, vec!["drafts"]);
                assert_eq!(ignore_files, vec!["SCRATCH.md"]);
                assert_eq!(include, vec!["*.markdown"]);
                assert!(!create_parent);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn process_defaults() {
        let cli = Cli::parse_from(["noteship", "process"]);
        match cli.command {
            Commands::Process {
                days_back,
                max_notes,
                note_id,
            } => {
                assert_eq!(days_back, 1);
                assert_eq!(max_notes, 100);
                assert!(note_id.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn env_file_is_global() {
        let cli = Cli::parse_from(["noteship", "info", "--env-file", "/tmp/custom.env"]);
        assert_eq!(
            cli.env_file.as_deref(),
            Some(std::path::Path::new("/tmp/custom.env"))
        );
    }
}
