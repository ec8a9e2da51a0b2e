use crate::model::AppInfo;

pub mod info;
pub mod process;
pub mod token;
pub mod upload;

#[derive(Debug, Clone)]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

/// Per-stage aggregation of item outcomes. Threaded through the loops and
/// returned from the command, never printed inline.
#[derive(Debug, Default, Clone)]
pub struct StageTally {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

impl StageTally {
    pub fn record_ok(&mut self) {
        self.succeeded += 1;
    }

    pub fn record_err(&mut self, message: impl Into<String>) {
        self.failed += 1;
        self.errors.push(message.into());
    }
}

/// Outcome of one folder upload run.
#[derive(Debug, Default, Clone)]
pub struct UploadReport {
    pub notes_created: usize,
    pub assets_attached: usize,
    pub assets_skipped: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

impl UploadReport {
    pub fn record_err(&mut self, message: impl Into<String>) {
        self.failed += 1;
        self.errors.push(message.into());
    }
}

/// Outcome of one daily batch run, one tally per stage.
#[derive(Debug, Default, Clone)]
pub struct BatchReport {
    pub found: usize,
    pub modified_found: usize,
    pub processed: usize,
    pub revisions: StageTally,
    pub linking: StageTally,
    pub links_added: usize,
    pub enrichment: StageTally,
    pub urls_found: usize,
    pub articles_fetched: usize,
    pub reading: StageTally,
    pub highlights_extracted: usize,
}

impl BatchReport {
    pub fn all_errors(&self) -> Vec<&String> {
        self.revisions
            .errors
            .iter()
            .chain(self.linking.errors.iter())
            .chain(self.enrichment.errors.iter())
            .chain(self.reading.errors.iter())
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct CmdResult {
    pub messages: Vec<CmdMessage>,
    pub app_info: Option<AppInfo>,
    pub upload: Option<UploadReport>,
    pub batch: Option<BatchReport>,
}

impl CmdResult {
    pub fn add_message(&mut self, message: CmdMessage) {
        self.messages.push(message);
    }

    pub fn with_app_info(mut self, info: AppInfo) -> Self {
        self.app_info = Some(info);
        self
    }

    pub fn with_upload(mut self, report: UploadReport) -> Self {
        self.upload = Some(report);
        self
    }

    pub fn with_batch(mut self, report: BatchReport) -> Self {
        self.batch = Some(report);
        self
    }
}
