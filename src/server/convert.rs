//! Conversions between engine types and wire types, plus the custom
//! request/response shapes of the `xdefinition`/`xreferences`
//! extensions.

use std::collections::BTreeMap;

use lsp_types::{self as lsp, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ide;

pub fn to_lsp_position(pos: crate::base::LineCol) -> lsp::Position {
    lsp::Position {
        line: pos.line,
        character: pos.col,
    }
}

pub fn to_lsp_location(loc: &ide::Location) -> Option<lsp::Location> {
    let uri = Url::parse(&loc.uri).ok()?;
    Some(lsp::Location {
        uri,
        range: lsp::Range {
            start: to_lsp_position(loc.start),
            end: to_lsp_position(loc.end),
        },
    })
}

pub fn to_lsp_locations(locs: Vec<ide::Location>) -> Vec<lsp::Location> {
    locs.iter().filter_map(to_lsp_location).collect()
}

pub fn to_lsp_hover(hover: ide::HoverResult, index: &crate::base::LineIndex) -> lsp::Hover {
    let contents = hover
        .contents
        .into_iter()
        .map(|c| match c.language {
            Some(language) => lsp::MarkedString::LanguageString(lsp::LanguageString {
                language: language.to_string(),
                value: c.value,
            }),
            None => lsp::MarkedString::String(c.value),
        })
        .collect();
    lsp::Hover {
        contents: lsp::HoverContents::Array(contents),
        range: Some(lsp::Range {
            start: to_lsp_position(index.line_col(hover.range.start())),
            end: to_lsp_position(index.line_col(hover.range.end())),
        }),
    }
}

pub fn to_lsp_symbol_kind(kind: ide::SymbolKind) -> lsp::SymbolKind {
    match kind {
        ide::SymbolKind::Package => lsp::SymbolKind::PACKAGE,
        ide::SymbolKind::Class => lsp::SymbolKind::CLASS,
        ide::SymbolKind::Method => lsp::SymbolKind::METHOD,
        ide::SymbolKind::Field => lsp::SymbolKind::FIELD,
        ide::SymbolKind::Function => lsp::SymbolKind::FUNCTION,
        ide::SymbolKind::Variable => lsp::SymbolKind::VARIABLE,
        ide::SymbolKind::Constant => lsp::SymbolKind::CONSTANT,
        ide::SymbolKind::Interface => lsp::SymbolKind::INTERFACE,
    }
}

#[allow(deprecated)]
pub fn to_lsp_symbol(sym: ide::SymbolInformation) -> Option<lsp::SymbolInformation> {
    Some(lsp::SymbolInformation {
        name: sym.name,
        kind: to_lsp_symbol_kind(sym.kind),
        tags: None,
        deprecated: None,
        location: to_lsp_location(&sym.location)?,
        container_name: if sym.container_name.is_empty() {
            None
        } else {
            Some(sym.container_name)
        },
    })
}

/// The descriptor map keyed `vendor, package, packageName, recv, name, id`.
pub fn descriptor_to_json(desc: &ide::SymbolDescriptor) -> Value {
    serde_json::json!({
        "vendor": desc.vendor,
        "package": desc.package,
        "packageName": desc.package_name,
        "recv": desc.recv,
        "name": desc.name,
        "id": desc.id,
    })
}

/// `textDocument/xdefinition` response record.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolLocationInformation {
    pub location: lsp::Location,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<Value>,
}

/// `workspace/xreferences` response record.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceInformation {
    pub reference: lsp::Location,
    pub symbol: Value,
}

/// `textDocument/references` params carrying the `xlimit` extension.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceParams {
    pub text_document: lsp::TextDocumentIdentifier,
    pub position: lsp::Position,
    #[serde(default)]
    pub context: Option<ReferenceContext>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceContext {
    #[serde(default)]
    pub include_declaration: bool,
    /// `0` means no limit.
    #[serde(default, rename = "xlimit")]
    pub xlimit: usize,
}

/// `workspace/symbol` params with the `limit` and `symbol` extensions.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceSymbolParams {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub limit: usize,
    #[serde(default)]
    pub symbol: Option<BTreeMap<String, Value>>,
}

/// `workspace/xreferences` params.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XReferencesParams {
    pub query: BTreeMap<String, Value>,
    #[serde(default)]
    pub limit: usize,
}
