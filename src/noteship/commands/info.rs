use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::store::NoteStore;

/// Fetch server info. Doubles as the connectivity/auth check: a failure
/// here is fatal and surfaces before any per-item work elsewhere.
pub fn run<S: NoteStore>(store: &S) -> Result<CmdResult> {
    let info = store.app_info()?;
    let mut result = CmdResult::default().with_app_info(info.clone());
    result.add_message(CmdMessage::success(format!(
        "Connected to Trilium {}",
        info.app_version
    )));
    Ok(result)
}
