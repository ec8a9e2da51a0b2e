use super::NoteStore;
use crate::error::{NoteshipError, Result};
use crate::model::{AppInfo, Label, Note};
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Blocking client for the Trilium external API (ETAPI).
///
/// One instance per run; every call is a synchronous request/response.
pub struct EtapiClient {
    base: String,
    http: Client,
}

#[derive(Deserialize)]
struct SearchResponse {
    results: Vec<Note>,
}

#[derive(Deserialize)]
struct CreateNoteResponse {
    note: Note,
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(rename = "authToken")]
    auth_token: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    message: String,
}

impl EtapiClient {
    pub fn new(server_url: &str, token: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(token)
            .map_err(|_| NoteshipError::Config("Token contains invalid characters".to_string()))?;
        headers.insert(AUTHORIZATION, value);

        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            base: server_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Exchange the server password for an ETAPI token.
    pub fn login(server_url: &str, password: &str) -> Result<String> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let url = format!("{}/etapi/auth/login", server_url.trim_end_matches('/'));
        let resp = http.post(url).json(&json!({ "password": password })).send()?;
        let resp = check(resp)?;
        let login: LoginResponse = resp.json()?;
        Ok(login.auth_token)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/etapi/{}", self.base, path)
    }
}

/// Map non-2xx responses to `Api` errors, extracting the server's message
/// field when the body carries one.
fn check(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|e| e.message)
        .unwrap_or(body);
    Err(NoteshipError::Api {
        status: status.as_u16(),
        message,
    })
}

impl NoteStore for EtapiClient {
    fn app_info(&self) -> Result<AppInfo> {
        let resp = check(self.http.get(self.url("app-info")).send()?)?;
        Ok(resp.json()?)
    }

    fn search_notes(&self, query: &str) -> Result<Vec<Note>> {
        let resp = check(
            self.http
                .get(self.url("notes"))
                .query(&[("search", query)])
                .send()?,
        )?;
        let parsed: SearchResponse = resp.json()?;
        Ok(parsed.results)
    }

    fn get_note(&self, note_id: &str) -> Result<Note> {
        let resp = self.http.get(self.url(&format!("notes/{}", note_id))).send()?;
        if resp.status().as_u16() == 404 {
            return Err(NoteshipError::NoteNotFound(note_id.to_string()));
        }
        Ok(check(resp)?.json()?)
    }

    fn get_note_content(&self, note_id: &str) -> Result<String> {
        let resp = self
            .http
            .get(self.url(&format!("notes/{}/content", note_id)))
            .send()?;
        if resp.status().as_u16() == 404 {
            return Err(NoteshipError::NoteNotFound(note_id.to_string()));
        }
        Ok(check(resp)?.text()?)
    }

    fn create_note(
        &mut self,
        parent_id: &str,
        title: &str,
        note_type: &str,
        content: &str,
    ) -> Result<Note> {
        let resp = check(
            self.http
                .post(self.url("create-note"))
                .json(&json!({
                    "parentNoteId": parent_id,
                    "title": title,
                    "type": note_type,
                    "content": content,
                }))
                .send()?,
        )?;
        let parsed: CreateNoteResponse = resp.json()?;
        Ok(parsed.note)
    }

    fn create_file_note(
        &mut self,
        parent_id: &str,
        title: &str,
        mime: &str,
        data: Vec<u8>,
    ) -> Result<Note> {
        let note_type = if mime.starts_with("image/") {
            "image"
        } else {
            "file"
        };
        let resp = check(
            self.http
                .post(self.url("create-note"))
                .json(&json!({
                    "parentNoteId": parent_id,
                    "title": title,
                    "type": note_type,
                    "mime": mime,
                    "content": "",
                }))
                .send()?,
        )?;
        let parsed: CreateNoteResponse = resp.json()?;

        // Binary payloads go through a separate content PUT
        check(
            self.http
                .put(self.url(&format!("notes/{}/content", parsed.note.note_id)))
                .header(CONTENT_TYPE, "application/octet-stream")
                .header("Content-Transfer-Encoding", "binary")
                .body(data)
                .send()?,
        )?;
        Ok(parsed.note)
    }

    fn update_note_content(&mut self, note_id: &str, content: &str) -> Result<()> {
        check(
            self.http
                .put(self.url(&format!("notes/{}/content", note_id)))
                .header(CONTENT_TYPE, "text/plain")
                .body(content.to_string())
                .send()?,
        )?;
        Ok(())
    }

    fn save_revision(&mut self, note_id: &str) -> Result<()> {
        check(
            self.http
                .post(self.url(&format!("notes/{}/revision", note_id)))
                .send()?,
        )?;
        Ok(())
    }

    fn create_label(&mut self, note_id: &str, name: &str, value: &str) -> Result<()> {
        check(
            self.http
                .post(self.url("attributes"))
                .json(&json!({
                    "noteId": note_id,
                    "type": "label",
                    "name": name,
                    "value": value,
                    "isInheritable": false,
                }))
                .send()?,
        )?;
        Ok(())
    }

    fn note_labels(&self, note_id: &str) -> Result<Vec<Label>> {
        let note = self.get_note(note_id)?;
        Ok(note
            .attributes
            .into_iter()
            .filter(|a| a.kind == "label")
            .collect())
    }
}
