use crate::commands::{CmdMessage, CmdResult};
use crate::envfile::{self, Connection};
use crate::error::Result;
use std::path::Path;

/// Persist a freshly acquired token to the given env file. The login
/// itself happens at the CLI boundary; this only records the outcome.
pub fn run(path: &Path, server_url: String, token: String) -> Result<CmdResult> {
    let conn = Connection { server_url, token };
    envfile::save(path, &conn)?;

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Token saved to {}",
        path.display()
    )));
    result.add_message(CmdMessage::info(format!(
        "Server: {}  Token: {}",
        conn.server_url,
        conn.masked_token()
    )));
    Ok(result)
}
