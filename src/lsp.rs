//! A minimal Language Server Protocol responder over stdin/stdout.
//!
//! Messages are framed with a `Content-Length` header, a blank line and a
//! JSON body. The server answers from fixed tables: the completion list is
//! the 17 keywords plus the 14 primitive types, hover is a fixed string, and
//! the only diagnostic is the missing-header check.

use std::collections::HashMap;
use std::io::{self, BufRead, Read, Write};

use serde::Serialize;
use serde_json::{Value as Json, json};

#[derive(Serialize, Debug, Clone, Copy)]
pub struct CompletionItem {
    pub label: &'static str,
    pub kind: &'static str,
    pub detail: &'static str,
    pub documentation: &'static str,
}

const fn item(
    label: &'static str,
    kind: &'static str,
    detail: &'static str,
    documentation: &'static str,
) -> CompletionItem {
    CompletionItem {
        label,
        kind,
        detail,
        documentation,
    }
}

pub const KEYWORD_COMPLETIONS: [CompletionItem; 17] = [
    item("i", "keyword", "if statement", "Conditional logic"),
    item("e", "keyword", "else statement", "Alternative path"),
    item("l", "keyword", "loop statement", "Repetition"),
    item("b", "keyword", "break", "Exit loop"),
    item("k", "keyword", "continue", "Next iteration"),
    item("r", "keyword", "return", "Return from function"),
    item("t", "keyword", "try", "Exception handling"),
    item("h", "keyword", "handle", "Catch exception"),
    item("c", "keyword", "class", "Define class"),
    item("a", "keyword", "abstract", "Abstract class"),
    item("j", "keyword", "interface", "Interface definition"),
    item("n", "keyword", "new", "Instantiate object"),
    item("s", "keyword", "static", "Static member"),
    item("v", "keyword", "public", "Public visibility"),
    item("p", "keyword", "private", "Private visibility"),
    item("m", "keyword", "method", "Function definition"),
    item("z", "keyword", "system", "System library"),
];

pub const TYPE_COMPLETIONS: [CompletionItem; 14] = [
    item("1", "type", "i8", "8-bit integer"),
    item("2", "type", "i16", "16-bit integer"),
    item("3", "type", "i32", "32-bit integer"),
    item("4", "type", "i64", "64-bit integer"),
    item("5", "type", "int", "Generic integer"),
    item("6", "type", "f32", "32-bit float"),
    item("7", "type", "f64", "64-bit float"),
    item("8", "type", "float", "Generic float"),
    item("9", "type", "dec", "Decimal"),
    item("10", "type", "cpx", "Complex number"),
    item("11", "type", "bool", "Boolean"),
    item("12", "type", "str", "String"),
    item("13", "type", "list", "Array"),
    item("14", "type", "map", "Hash map"),
];

pub struct LanguageServer {
    documents: HashMap<String, String>,
    exited: bool,
}

impl Default for LanguageServer {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageServer {
    pub fn new() -> Self {
        Self {
            documents: HashMap::new(),
            exited: false,
        }
    }

    /// Blocks on stdin until `exit` or end-of-input.
    pub fn run(&mut self) -> io::Result<()> {
        let stdin = io::stdin();
        let mut reader = stdin.lock();
        let stdout = io::stdout();
        let mut writer = stdout.lock();

        while let Some(body) = read_frame(&mut reader)? {
            tracing::trace!(bytes = body.len(), "lsp request");
            if let Some(response) = self.process_message(&body) {
                write_frame(&mut writer, &response)?;
            }
            if self.exited {
                break;
            }
        }
        Ok(())
    }

    /// Dispatches one JSON-RPC message and returns the response body, if the
    /// method produces one. Unknown methods get error −32601.
    pub fn process_message(&mut self, raw: &str) -> Option<String> {
        let message: Json = serde_json::from_str(raw).ok()?;
        let method = message
            .get("method")
            .and_then(Json::as_str)
            .unwrap_or_default()
            .to_string();
        let id = message.get("id").and_then(Json::as_i64).unwrap_or(-1);
        let params = message.get("params").cloned().unwrap_or(Json::Null);

        match method.as_str() {
            "initialize" => Some(response(id, capabilities())),
            "textDocument/didOpen" => {
                if let (Some(uri), Some(text)) = (
                    params["textDocument"]["uri"].as_str(),
                    params["textDocument"]["text"].as_str(),
                ) {
                    self.documents.insert(uri.to_string(), text.to_string());
                }
                None
            }
            "textDocument/didChange" => {
                if let Some(uri) = params["textDocument"]["uri"].as_str() {
                    if let Some(text) = params["contentChanges"][0]["text"].as_str() {
                        self.documents.insert(uri.to_string(), text.to_string());
                    }
                    if let Some(content) = self.documents.get(uri) {
                        let diagnostics = diagnostics_for(content);
                        tracing::trace!(uri, count = diagnostics.len(), "diagnostics");
                    }
                }
                None
            }
            "textDocument/completion" => {
                let items: Vec<&CompletionItem> = KEYWORD_COMPLETIONS
                    .iter()
                    .chain(TYPE_COMPLETIONS.iter())
                    .collect();
                Some(response(id, json!(items)))
            }
            "textDocument/hover" => Some(response(
                id,
                json!({"contents": {"kind": "markdown", "value": "Alphabet Language Keyword"}}),
            )),
            "shutdown" => Some(response(id, Json::Null)),
            "exit" => {
                self.exited = true;
                None
            }
            _ => Some(error_response(
                id,
                -32601,
                &format!("Method not found: {method}"),
            )),
        }
    }

    pub fn document(&self, uri: &str) -> Option<&str> {
        self.documents.get(uri).map(String::as_str)
    }
}

/// The one static check the server performs.
pub fn diagnostics_for(content: &str) -> Vec<Json> {
    let mut diagnostics = Vec::new();
    if !content.contains("#alphabet<") {
        diagnostics.push(json!({
            "range": {
                "start": {"line": 0, "character": 0},
                "end": {"line": 0, "character": 0},
            },
            "severity": 1,
            "message": "Missing magic header '#alphabet<lang>' on line 1",
            "code": "MISSING_HEADER",
        }));
    }
    diagnostics
}

fn capabilities() -> Json {
    json!({
        "capabilities": {
            "textDocumentSync": 1,
            "completionProvider": {
                "resolveProvider": true,
                "triggerCharacters": [".", "(", " "],
            },
            "hoverProvider": true,
            "diagnosticProvider": {
                "interFileDependencies": false,
                "workspaceDiagnostics": false,
            },
        },
        "serverInfo": {
            "name": "alphabet-lsp",
            "version": env!("CARGO_PKG_VERSION"),
        },
    })
}

fn response(id: i64, result: Json) -> String {
    json!({"jsonrpc": "2.0", "id": id, "result": result}).to_string()
}

fn error_response(id: i64, code: i64, message: &str) -> String {
    json!({"jsonrpc": "2.0", "id": id, "error": {"code": code, "message": message}}).to_string()
}

/// Reads one `Content-Length`-framed message. `None` on end-of-input.
fn read_frame<R: BufRead>(reader: &mut R) -> io::Result<Option<String>> {
    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let line = line.trim_end();
        if line.is_empty() {
            if content_length > 0 {
                break;
            }
            continue;
        }
        if let Some(rest) = line.strip_prefix("Content-Length:") {
            content_length = rest.trim().parse().unwrap_or(0);
        }
    }

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body)?;
    Ok(Some(String::from_utf8_lossy(&body).into_owned()))
}

fn write_frame<W: Write>(writer: &mut W, body: &str) -> io::Result<()> {
    write!(writer, "Content-Length: {}\r\n\r\n{}", body.len(), body)?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(method: &str, id: i64, params: Json) -> String {
        json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params}).to_string()
    }

    fn parse(response: &str) -> Json {
        serde_json::from_str(response).unwrap()
    }

    #[test]
    fn initialize_returns_fixed_capabilities() {
        let mut server = LanguageServer::new();
        let raw = server
            .process_message(&request("initialize", 1, json!({})))
            .unwrap();
        let reply = parse(&raw);
        assert_eq!(reply["id"], 1);
        assert_eq!(reply["result"]["capabilities"]["textDocumentSync"], 1);
        assert_eq!(reply["result"]["capabilities"]["hoverProvider"], true);
        assert_eq!(reply["result"]["serverInfo"]["name"], "alphabet-lsp");
    }

    #[test]
    fn completion_lists_keywords_and_primitive_types() {
        let mut server = LanguageServer::new();
        let raw = server
            .process_message(&request("textDocument/completion", 2, json!({})))
            .unwrap();
        let reply = parse(&raw);
        let items = reply["result"].as_array().unwrap();
        assert_eq!(items.len(), 31);
        assert!(items.iter().any(|i| i["label"] == "z" && i["kind"] == "keyword"));
        assert!(items.iter().any(|i| i["label"] == "14" && i["detail"] == "map"));
    }

    #[test]
    fn hover_is_a_fixed_string() {
        let mut server = LanguageServer::new();
        let raw = server
            .process_message(&request("textDocument/hover", 3, json!({})))
            .unwrap();
        let reply = parse(&raw);
        assert_eq!(
            reply["result"]["contents"]["value"],
            "Alphabet Language Keyword"
        );
    }

    #[test]
    fn unknown_methods_get_the_method_not_found_error() {
        let mut server = LanguageServer::new();
        let raw = server
            .process_message(&request("workspace/symbol", 4, json!({})))
            .unwrap();
        let reply = parse(&raw);
        assert_eq!(reply["error"]["code"], -32601);
    }

    #[test]
    fn shutdown_acknowledges_and_exit_stops_the_loop() {
        let mut server = LanguageServer::new();
        let raw = server
            .process_message(&request("shutdown", 5, json!(null)))
            .unwrap();
        assert_eq!(parse(&raw)["result"], Json::Null);

        assert!(server.process_message(&request("exit", -1, json!(null))).is_none());
        assert!(server.exited);
    }

    #[test]
    fn did_open_and_did_change_track_the_document() {
        let mut server = LanguageServer::new();
        let open = request(
            "textDocument/didOpen",
            -1,
            json!({"textDocument": {"uri": "file:///t.abc", "text": "#alphabet<x>\nz"}}),
        );
        assert!(server.process_message(&open).is_none());
        assert_eq!(server.document("file:///t.abc"), Some("#alphabet<x>\nz"));

        let change = request(
            "textDocument/didChange",
            -1,
            json!({
                "textDocument": {"uri": "file:///t.abc"},
                "contentChanges": [{"text": "5 x = 1"}],
            }),
        );
        assert!(server.process_message(&change).is_none());
        assert_eq!(server.document("file:///t.abc"), Some("5 x = 1"));
    }

    #[test]
    fn the_only_diagnostic_is_the_missing_header() {
        assert!(diagnostics_for("#alphabet<x>\nz.o(1)").is_empty());
        let diagnostics = diagnostics_for("5 x = 1");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0]["code"], "MISSING_HEADER");
        assert_eq!(diagnostics[0]["severity"], 1);
    }

    #[test]
    fn frames_round_trip() {
        let mut out = Vec::new();
        write_frame(&mut out, "{\"x\":1}").unwrap();
        let mut reader = io::BufReader::new(out.as_slice());
        assert_eq!(read_frame(&mut reader).unwrap().as_deref(), Some("{\"x\":1}"));
        assert!(read_frame(&mut reader).unwrap().is_none());
    }
}
