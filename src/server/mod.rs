//! LSP dispatch glue: request envelope → component call → response
//! envelope.
//!
//! The stdio loop owns the analysis host and the overlay notifications;
//! position requests run on a worker pool bounded by `MaxParallelism`,
//! each over the view snapshot it started with and holding a
//! cancellation token that `$/cancelRequest` trips.

mod convert;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use crossbeam_channel::Sender;
use lsp_server::{Connection, Message, Notification, Request, RequestId, Response};
use lsp_types::notification::Notification as _;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tracing::{debug, warn};

use crate::base::uri;
use crate::ide::{self, IdeError, RequestCtx};
use crate::project::{watcher, AnalysisHost, Config, View};

use convert::*;

/// JSON-RPC error codes used by the dispatch layer.
const CODE_INVALID_PARAMS: i32 = -32602;
const CODE_INTERNAL_ERROR: i32 = -32603;
const CODE_REQUEST_CANCELED: i32 = -32800;

/// Run the language server over stdio until the client disconnects.
pub fn run_stdio_server() -> Result<()> {
    let (connection, io_threads) = Connection::stdio();

    let capabilities = server_capabilities();
    let init_value = connection
        .initialize(serde_json::to_value(&capabilities)?)
        .context("initialize handshake failed")?;
    let init_params: lsp_types::InitializeParams = serde_json::from_value(init_value)?;

    let root = workspace_root(&init_params)
        .context("initialize did not carry a usable workspace root")?;
    let config = Config::from_env();
    let max_parallelism = config.max_parallelism.unwrap_or(0);

    let host = Arc::new(
        AnalysisHost::new(root, config)
            .map_err(|err| anyhow::anyhow!("workspace classification failed: {err}"))?,
    );
    host.initialize();
    let _watcher = match watcher::spawn(host.clone()) {
        Ok(watcher) => Some(watcher),
        Err(err) => {
            warn!("file watching unavailable: {}", err);
            None
        }
    };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(max_parallelism)
        .thread_name(|i| format!("golangd-worker-{i}"))
        .build()?;

    let server = Server {
        host,
        sender: connection.sender.clone(),
        pending: Arc::new(Mutex::new(FxHashMap::default())),
    };

    for message in &connection.receiver {
        match message {
            Message::Request(request) => {
                if connection.handle_shutdown(&request)? {
                    break;
                }
                server.dispatch(&pool, request);
            }
            Message::Notification(notification) => server.handle_notification(notification),
            Message::Response(_) => {}
        }
    }

    drop(server);
    drop(connection);
    io_threads.join()?;
    Ok(())
}

fn workspace_root(params: &lsp_types::InitializeParams) -> Option<PathBuf> {
    #[allow(deprecated)]
    if let Some(root_uri) = &params.root_uri {
        if let Some(path) = uri::uri_to_path(root_uri.as_str()) {
            return Some(path);
        }
    }
    #[allow(deprecated)]
    if let Some(root_path) = &params.root_path {
        if !root_path.is_empty() {
            return Some(PathBuf::from(root_path));
        }
    }
    std::env::current_dir().ok()
}

fn server_capabilities() -> lsp_types::ServerCapabilities {
    lsp_types::ServerCapabilities {
        text_document_sync: Some(lsp_types::TextDocumentSyncCapability::Kind(
            lsp_types::TextDocumentSyncKind::FULL,
        )),
        hover_provider: Some(lsp_types::HoverProviderCapability::Simple(true)),
        definition_provider: Some(lsp_types::OneOf::Left(true)),
        type_definition_provider: Some(
            lsp_types::TypeDefinitionProviderCapability::Simple(true),
        ),
        references_provider: Some(lsp_types::OneOf::Left(true)),
        implementation_provider: Some(
            lsp_types::ImplementationProviderCapability::Simple(true),
        ),
        document_symbol_provider: Some(lsp_types::OneOf::Left(true)),
        workspace_symbol_provider: Some(lsp_types::OneOf::Left(true)),
        signature_help_provider: Some(lsp_types::SignatureHelpOptions {
            trigger_characters: Some(vec!["(".to_string(), ",".to_string()]),
            retrigger_characters: None,
            work_done_progress_options: Default::default(),
        }),
        code_action_provider: Some(lsp_types::CodeActionProviderCapability::Simple(true)),
        ..Default::default()
    }
}

struct Server {
    host: Arc<AnalysisHost>,
    sender: Sender<Message>,
    pending: Arc<Mutex<FxHashMap<RequestId, RequestCtx>>>,
}

impl Server {
    fn dispatch(&self, pool: &rayon::ThreadPool, request: Request) {
        let ctx = RequestCtx::new();
        self.pending.lock().insert(request.id.clone(), ctx.clone());

        let view = self.host.snapshot();
        let sender = self.sender.clone();
        let pending = self.pending.clone();

        pool.spawn(move || {
            let id = request.id.clone();
            let response = handle_request(&view, &ctx, &sender, request);
            pending.lock().remove(&id);
            if let Err(err) = sender.send(Message::Response(response)) {
                debug!("response channel closed: {}", err);
            }
        });
    }

    fn handle_notification(&self, notification: Notification) {
        use lsp_types::notification::*;

        match notification.method.as_str() {
            DidOpenTextDocument::METHOD => {
                let Ok(params) = serde_json::from_value::<lsp_types::DidOpenTextDocumentParams>(
                    notification.params,
                ) else {
                    return;
                };
                if let Some(path) = uri::uri_to_path(params.text_document.uri.as_str()) {
                    self.host
                        .snapshot()
                        .set_overlay(&path, params.text_document.text);
                }
            }
            DidChangeTextDocument::METHOD => {
                let Ok(params) = serde_json::from_value::<
                    lsp_types::DidChangeTextDocumentParams,
                >(notification.params) else {
                    return;
                };
                let Some(path) = uri::uri_to_path(params.text_document.uri.as_str()) else {
                    return;
                };
                // Full-document sync: the last change wins.
                if let Some(change) = params.content_changes.into_iter().last() {
                    self.host.snapshot().set_overlay(&path, change.text);
                }
            }
            DidCloseTextDocument::METHOD => {
                let Ok(params) = serde_json::from_value::<lsp_types::DidCloseTextDocumentParams>(
                    notification.params,
                ) else {
                    return;
                };
                if let Some(path) = uri::uri_to_path(params.text_document.uri.as_str()) {
                    self.host.snapshot().remove_overlay(&path);
                }
            }
            Cancel::METHOD => {
                let Ok(params) =
                    serde_json::from_value::<lsp_types::CancelParams>(notification.params)
                else {
                    return;
                };
                let id: RequestId = match params.id {
                    lsp_types::NumberOrString::Number(n) => n.into(),
                    lsp_types::NumberOrString::String(s) => s.into(),
                };
                if let Some(ctx) = self.pending.lock().get(&id) {
                    ctx.cancel();
                }
            }
            _ => {}
        }
    }
}

/// Resolve the document position out of request params.
fn doc_position(params: &Value) -> Result<(PathBuf, u32, u32), IdeError> {
    let text_document = params
        .get("textDocument")
        .and_then(|d| d.get("uri"))
        .and_then(Value::as_str)
        .ok_or_else(|| IdeError::InvalidParams("missing textDocument.uri".to_string()))?;
    if !uri::is_uri(text_document) {
        return Err(IdeError::InvalidParams(format!(
            "not a file URI: {text_document}"
        )));
    }
    let path = uri::uri_to_path(text_document)
        .ok_or_else(|| IdeError::InvalidParams(format!("bad URI: {text_document}")))?;
    let position = params
        .get("position")
        .ok_or_else(|| IdeError::InvalidParams("missing position".to_string()))?;
    let line = position.get("line").and_then(Value::as_u64).unwrap_or(0) as u32;
    let character = position
        .get("character")
        .and_then(Value::as_u64)
        .unwrap_or(0) as u32;
    Ok((path, line, character))
}

fn handle_request(
    view: &Arc<View>,
    ctx: &RequestCtx,
    sender: &Sender<Message>,
    request: Request,
) -> Response {
    let id = request.id.clone();
    let result = route(view, ctx, sender, &request.method, request.params);
    match result {
        Ok(value) => Response {
            id,
            result: Some(value),
            error: None,
        },
        Err(err) => error_response(id, sender, err),
    }
}

/// Map engine errors onto the propagation policy: cancellation and
/// invalid params reach the client, everything else degrades to an
/// empty result to avoid noise.
fn error_response(id: RequestId, sender: &Sender<Message>, err: IdeError) -> Response {
    match err {
        IdeError::Canceled => Response::new_err(
            id,
            CODE_REQUEST_CANCELED,
            "request canceled".to_string(),
        ),
        IdeError::InvalidParams(message) => {
            Response::new_err(id, CODE_INVALID_PARAMS, message)
        }
        err if err.is_empty_result() => Response {
            id,
            result: Some(Value::Null),
            error: None,
        },
        IdeError::Loader(err) => {
            log_message(sender, format!("load failed: {err}"));
            Response {
                id,
                result: Some(Value::Null),
                error: None,
            }
        }
        err => Response::new_err(id, CODE_INTERNAL_ERROR, err.to_string()),
    }
}

fn log_message(sender: &Sender<Message>, message: String) {
    let notification = Notification::new(
        lsp_types::notification::LogMessage::METHOD.to_string(),
        serde_json::json!({
            "type": lsp_types::MessageType::INFO,
            "message": message,
        }),
    );
    let _ = sender.send(Message::Notification(notification));
}

fn route(
    view: &Arc<View>,
    ctx: &RequestCtx,
    sender: &Sender<Message>,
    method: &str,
    params: Value,
) -> Result<Value, IdeError> {
    match method {
        "textDocument/hover" => {
            let (path, line, character) = doc_position(&params)?;
            let hover = ide::hover(view, ctx, &path, line, character)?;
            match hover {
                Some(hover) => {
                    let index = view.fset.line_index(hover.file).ok_or_else(|| {
                        IdeError::NotFound("missing line index".to_string())
                    })?;
                    Ok(serde_json::to_value(to_lsp_hover(hover, &index))
                        .unwrap_or(Value::Null))
                }
                None => Ok(Value::Null),
            }
        }
        "textDocument/definition" => {
            let (path, line, character) = doc_position(&params)?;
            let locs = ide::definition(view, ctx, &path, line, character)?;
            Ok(serde_json::to_value(to_lsp_locations(locs)).unwrap_or(Value::Null))
        }
        "textDocument/typeDefinition" => {
            let (path, line, character) = doc_position(&params)?;
            let locs = ide::type_definition(view, ctx, &path, line, character)?;
            Ok(serde_json::to_value(to_lsp_locations(locs)).unwrap_or(Value::Null))
        }
        "textDocument/xdefinition" => {
            let (path, line, character) = doc_position(&params)?;
            let symbols = ide::xdefinition(view, ctx, &path, line, character)?;
            let records: Vec<SymbolLocationInformation> = symbols
                .into_iter()
                .filter_map(|s| {
                    Some(SymbolLocationInformation {
                        location: to_lsp_location(&s.location)?,
                        symbol: s.symbol.as_ref().map(descriptor_to_json),
                    })
                })
                .collect();
            Ok(serde_json::to_value(records).unwrap_or(Value::Null))
        }
        "textDocument/references" => {
            let parsed: ReferenceParams = serde_json::from_value(params)
                .map_err(|err| IdeError::InvalidParams(err.to_string()))?;
            let path = uri::uri_to_path(parsed.text_document.uri.as_str())
                .ok_or_else(|| IdeError::InvalidParams("bad URI".to_string()))?;
            let context = parsed.context.unwrap_or_default();
            let locs = ide::references(
                view,
                ctx,
                &path,
                parsed.position.line,
                parsed.position.character,
                context.include_declaration,
                context.xlimit,
            )?;
            Ok(serde_json::to_value(to_lsp_locations(locs)).unwrap_or(Value::Null))
        }
        "textDocument/implementation" => {
            let (path, line, character) = doc_position(&params)?;
            let impls = ide::implementation(view, ctx, &path, line, character)?;
            let records: Vec<Value> = impls
                .into_iter()
                .filter_map(|i| {
                    let loc = to_lsp_location(&i.location)?;
                    let mut value = serde_json::to_value(loc).ok()?;
                    let obj = value.as_object_mut()?;
                    obj.insert("type".to_string(), Value::String(i.typ.to_string()));
                    obj.insert("ptr".to_string(), Value::Bool(i.ptr));
                    obj.insert("method".to_string(), Value::Bool(i.method));
                    Some(value)
                })
                .collect();
            Ok(Value::Array(records))
        }
        "textDocument/documentSymbol" => {
            let text_document = params
                .get("textDocument")
                .and_then(|d| d.get("uri"))
                .and_then(Value::as_str)
                .ok_or_else(|| IdeError::InvalidParams("missing textDocument".to_string()))?;
            let path = uri::uri_to_path(text_document)
                .ok_or_else(|| IdeError::InvalidParams("bad URI".to_string()))?;
            let symbols = ide::document_symbols(view, &path)?;
            let records: Vec<lsp_types::SymbolInformation> =
                symbols.into_iter().filter_map(to_lsp_symbol).collect();
            Ok(serde_json::to_value(records).unwrap_or(Value::Null))
        }
        "workspace/symbol" => {
            let parsed: WorkspaceSymbolParams = serde_json::from_value(params)
                .map_err(|err| IdeError::InvalidParams(err.to_string()))?;
            let symbols =
                ide::workspace_symbols(view, ctx, &parsed.query, parsed.symbol, parsed.limit)?;
            let records: Vec<lsp_types::SymbolInformation> =
                symbols.into_iter().filter_map(to_lsp_symbol).collect();
            Ok(serde_json::to_value(records).unwrap_or(Value::Null))
        }
        "workspace/xreferences" => {
            let parsed: XReferencesParams = serde_json::from_value(params)
                .map_err(|err| IdeError::InvalidParams(err.to_string()))?;
            xreferences(view, ctx, parsed)
        }
        "textDocument/signatureHelp" => {
            let (path, line, character) = doc_position(&params)?;
            let help = ide::signature_help(view, ctx, &path, line, character)?;
            match help {
                Some(help) => Ok(serde_json::json!({
                    "signatures": [{
                        "label": help.label,
                        "documentation": help.documentation,
                        "parameters": help.parameters.iter()
                            .map(|p| serde_json::json!({"label": p}))
                            .collect::<Vec<_>>(),
                    }],
                    "activeSignature": 0,
                    "activeParameter": help.active_parameter,
                })),
                None => Ok(Value::Null),
            }
        }
        "textDocument/codeAction" => {
            // The import organizer lives outside the semantic engine.
            Ok(Value::Array(Vec::new()))
        }
        _ => Err(IdeError::InvalidParams(format!(
            "unsupported request {method}"
        ))),
    }
}

/// `workspace/xreferences`: enumerate references to definitions matching
/// a symbol descriptor.
fn xreferences(
    view: &Arc<View>,
    ctx: &RequestCtx,
    params: XReferencesParams,
) -> Result<Value, IdeError> {
    let limit = if params.limit == 0 { 50 } else { params.limit };
    let symbols = ide::workspace_symbols(view, ctx, "", Some(params.query), limit)?;

    let mut records: Vec<ReferenceInformation> = Vec::new();
    for symbol in symbols {
        if records.len() >= limit {
            break;
        }
        let Some(path) = uri::uri_to_path(&symbol.location.uri) else {
            continue;
        };
        let locs = ide::references(
            view,
            ctx,
            &path,
            symbol.location.start.line,
            symbol.location.start.col,
            true,
            limit - records.len(),
        )?;
        let desc = descriptor_to_json(&symbol.desc);
        for loc in locs {
            if records.len() >= limit {
                break;
            }
            let Some(reference) = to_lsp_location(&loc) else {
                continue;
            };
            records.push(ReferenceInformation {
                reference,
                symbol: desc.clone(),
            });
        }
    }
    Ok(serde_json::to_value(records).unwrap_or(Value::Null))
}
