use mcp_sdk_rs::types::{MessageContent, Tool, ToolAnnotations, ToolResult, ToolSchema};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use crate::config::{DEFAULT_LIST_LIMIT, DEFAULT_SEARCH_LIMIT};
use crate::model::{IdentifierType, RelationType, SourceFilter, Status, Vocabulary};
use crate::reference::SourceRef;
use crate::storage::LiteratureStore;

/// One finished tool call: the text result and whether it reports a failure
#[derive(Debug, Clone)]
pub struct ToolReply {
    pub result: ToolResult,
    pub is_error: bool,
}

impl ToolReply {
    fn text(text: String) -> Self {
        Self {
            result: ToolResult {
                content: vec![MessageContent::Text { text }],
                structured_content: None,
            },
            is_error: false,
        }
    }

    fn error(text: String) -> Self {
        Self { is_error: true, ..Self::text(text) }
    }

    pub fn is_error(&self) -> bool {
        self.is_error
    }

    /// Text of the first content block
    pub fn first_text(&self) -> &str {
        match self.result.content.first() {
            Some(MessageContent::Text { text }) => text,
            _ => "",
        }
    }

    /// Wire form of a `tools/call` result, with `isError` set on failures
    pub fn into_value(self) -> serde_json::Result<Value> {
        let mut value = serde_json::to_value(self.result)?;
        if self.is_error {
            if let Value::Object(map) = &mut value {
                map.insert("isError".into(), Value::Bool(true));
            }
        }
        Ok(value)
    }
}

/// The four arguments every source-addressing tool takes
#[derive(Debug, Deserialize)]
struct RefArgs {
    title: String,
    source_type: String,
    identifier_type: String,
    identifier_value: String,
}

impl RefArgs {
    fn to_ref(&self) -> crate::Result<SourceRef> {
        SourceRef::parse(&self.title, &self.source_type, &self.identifier_type, &self.identifier_value)
    }
}

#[derive(Debug, Deserialize)]
struct AddSourceArgs {
    title: String,
    source_type: String,
    identifier_type: String,
    identifier_value: String,
    initial_note_title: Option<String>,
    initial_note_content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AddIdentifierArgs {
    #[serde(flatten)]
    source: RefArgs,
    new_identifier_type: String,
    new_identifier_value: String,
}

#[derive(Debug, Deserialize)]
struct AddNoteArgs {
    #[serde(flatten)]
    source: RefArgs,
    note_title: String,
    note_content: String,
}

#[derive(Debug, Deserialize)]
struct UpdateStatusArgs {
    #[serde(flatten)]
    source: RefArgs,
    new_status: String,
}

#[derive(Debug, Deserialize)]
struct LinkArgs {
    #[serde(flatten)]
    source: RefArgs,
    entity_name: String,
    relation_type: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EntityArgs {
    entity_name: String,
}

#[derive(Debug, Deserialize)]
struct ListArgs {
    source_type: Option<String>,
    status: Option<String>,
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    limit: Option<usize>,
}

fn ref_properties() -> serde_json::Map<String, Value> {
    let vocab = Vocabulary::current();
    let mut props = serde_json::Map::new();
    props.insert("title".into(), json!({ "type": "string", "description": "Title of the source" }));
    props.insert(
        "source_type".into(),
        json!({ "type": "string", "enum": vocab.source_types, "description": "Kind of source" }),
    );
    props.insert(
        "identifier_type".into(),
        json!({ "type": "string", "enum": vocab.identifier_types, "description": "Type of an identifier the source already has" }),
    );
    props.insert(
        "identifier_value".into(),
        json!({ "type": "string", "description": "Value of that identifier" }),
    );
    props
}

const REF_REQUIRED: [&str; 4] = ["title", "source_type", "identifier_type", "identifier_value"];

fn schema(properties: Value, required: &[&str]) -> ToolSchema {
    ToolSchema {
        properties: Some(properties),
        required: (!required.is_empty()).then(|| required.iter().map(|r| r.to_string()).collect()),
    }
}

/// Schema for a tool addressing one source, plus its own properties
fn ref_schema(extra: Value, extra_required: &[&str]) -> ToolSchema {
    let mut props = ref_properties();
    if let Value::Object(extra) = extra {
        props.extend(extra);
    }
    let mut required: Vec<&str> = REF_REQUIRED.to_vec();
    required.extend_from_slice(extra_required);
    schema(Value::Object(props), &required)
}

fn tool(name: &str, description: &str, input_schema: ToolSchema, read_only: bool) -> Tool {
    Tool {
        name: name.into(),
        description: description.into(),
        input_schema: Some(input_schema),
        annotations: Some(ToolAnnotations {
            title: None,
            read_only_hint: Some(read_only),
            destructive_hint: Some(false),
            idempotent_hint: None,
            open_world_hint: Some(false),
        }),
    }
}

/// Every tool the server exposes.
pub fn list_tools() -> Vec<Tool> {
    let vocab = Vocabulary::current();

    vec![
        tool(
            "add_source",
            "Add a new source (paper, book, webpage, video, blog) with its first identifier and an optional initial note.",
            ref_schema(
                json!({
                    "initial_note_title": { "type": "string", "description": "Title of an optional first note" },
                    "initial_note_content": { "type": "string", "description": "Content of an optional first note" }
                }),
                &[],
            ),
            false,
        ),
        tool(
            "add_identifier",
            "Attach another identifier (e.g. a DOI next to an arXiv id) to an existing source.",
            ref_schema(
                json!({
                    "new_identifier_type": { "type": "string", "enum": vocab.identifier_types },
                    "new_identifier_value": { "type": "string" }
                }),
                &["new_identifier_type", "new_identifier_value"],
            ),
            false,
        ),
        tool(
            "add_note",
            "Add a note to an existing source.",
            ref_schema(
                json!({
                    "note_title": { "type": "string" },
                    "note_content": { "type": "string" }
                }),
                &["note_title", "note_content"],
            ),
            false,
        ),
        tool(
            "update_status",
            "Change the reading status of a source.",
            ref_schema(
                json!({ "new_status": { "type": "string", "enum": vocab.statuses } }),
                &["new_status"],
            ),
            false,
        ),
        tool(
            "link_to_entity",
            "Link a source to a named concept. Linking the same concept with the same relation again replaces the description.",
            ref_schema(
                json!({
                    "entity_name": { "type": "string", "description": "Concept name (case-sensitive)" },
                    "relation_type": { "type": "string", "enum": vocab.relation_types },
                    "description": { "type": "string", "description": "Optional free-text description of the link" }
                }),
                &["entity_name", "relation_type"],
            ),
            false,
        ),
        tool(
            "get_entity_sources",
            "List every source linked to a concept, with the relation and description.",
            schema(json!({ "entity_name": { "type": "string" } }), &["entity_name"]),
            true,
        ),
        tool(
            "list_sources",
            "List sources, most recently updated first, optionally filtered by type and status.",
            schema(
                json!({
                    "source_type": { "type": "string", "enum": vocab.source_types },
                    "status": { "type": "string", "enum": vocab.statuses },
                    "limit": { "type": "integer", "default": DEFAULT_LIST_LIMIT }
                }),
                &[],
            ),
            true,
        ),
        tool(
            "search_sources",
            "Case-insensitive substring search over source titles.",
            schema(
                json!({
                    "query": { "type": "string" },
                    "limit": { "type": "integer", "default": DEFAULT_SEARCH_LIMIT }
                }),
                &["query"],
            ),
            true,
        ),
        tool(
            "get_source_details",
            "Get a source with all of its identifiers, notes and entity links.",
            ref_schema(json!({}), &[]),
            true,
        ),
        tool(
            "database_stats",
            "Counts of sources by type and status, identifiers, notes, entities and links.",
            schema(json!({}), &[]),
            true,
        ),
        tool(
            "get_help",
            "Usage overview and the valid values for every enumerated argument.",
            schema(json!({}), &[]),
            true,
        ),
    ]
}

/// Run one tool against the store. Failures come back as error results, never as panics.
pub fn call_tool(store: &mut LiteratureStore, name: &str, args: Value) -> ToolReply {
    debug!(tool = name, "calling tool");
    let outcome = match name {
        "add_source" => add_source(store, args),
        "add_identifier" => add_identifier(store, args),
        "add_note" => add_note(store, args),
        "update_status" => update_status(store, args),
        "link_to_entity" => link_to_entity(store, args),
        "get_entity_sources" => get_entity_sources(store, args),
        "list_sources" => list_sources(store, args),
        "search_sources" => search_sources(store, args),
        "get_source_details" => get_source_details(store, args),
        "database_stats" => store.database_stats().map(|s| json!(s)).map_err(store_error),
        "get_help" => Ok(help()),
        _ => Err(ToolReply::error(format!("unknown tool: {name}"))),
    };

    match outcome {
        Ok(value) => ToolReply::text(pretty(&value)),
        Err(reply) => reply,
    }
}

type Outcome = Result<Value, ToolReply>;

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn store_error(err: crate::Error) -> ToolReply {
    ToolReply::error(pretty(&json!({
        "kind": err.kind(),
        "message": err.to_string(),
    })))
}

fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, ToolReply> {
    let args = if args.is_null() { json!({}) } else { args };
    serde_json::from_value(args).map_err(|e| {
        ToolReply::error(pretty(&json!({
            "kind": "invalid_arguments",
            "message": e.to_string(),
        })))
    })
}

fn add_source(store: &mut LiteratureStore, args: Value) -> Outcome {
    let args: AddSourceArgs = parse_args(args)?;
    let source_ref = SourceRef::parse(&args.title, &args.source_type, &args.identifier_type, &args.identifier_value)
        .map_err(store_error)?;

    // A lone half of the initial note is ignored
    let note = args.initial_note_title.as_deref().zip(args.initial_note_content.as_deref());
    let (source_id, note_id) = store
        .add_source_with_note(
            &source_ref.title,
            source_ref.source_type,
            source_ref.identifier_type,
            &source_ref.identifier_value,
            note,
        )
        .map_err(store_error)?;

    Ok(json!({
        "source_id": source_id,
        "note_id": note_id,
        "source": source_ref.describe(),
    }))
}

fn add_identifier(store: &mut LiteratureStore, args: Value) -> Outcome {
    let args: AddIdentifierArgs = parse_args(args)?;
    let source_ref = args.source.to_ref().map_err(store_error)?;
    let identifier_type: IdentifierType = args.new_identifier_type.parse().map_err(store_error)?;

    store
        .add_identifier(&source_ref, identifier_type, &args.new_identifier_value)
        .map_err(store_error)?;

    Ok(json!({
        "source": source_ref.describe(),
        "identifier_type": identifier_type,
        "identifier_value": args.new_identifier_value,
    }))
}

fn add_note(store: &mut LiteratureStore, args: Value) -> Outcome {
    let args: AddNoteArgs = parse_args(args)?;
    let source_ref = args.source.to_ref().map_err(store_error)?;

    let note_id = store
        .add_note(&source_ref, &args.note_title, &args.note_content)
        .map_err(store_error)?;

    Ok(json!({ "note_id": note_id, "source": source_ref.describe() }))
}

fn update_status(store: &mut LiteratureStore, args: Value) -> Outcome {
    let args: UpdateStatusArgs = parse_args(args)?;
    let source_ref = args.source.to_ref().map_err(store_error)?;
    let status: Status = args.new_status.parse().map_err(store_error)?;

    store.update_status(&source_ref, status).map_err(store_error)?;

    Ok(json!({ "source": source_ref.describe(), "status": status }))
}

fn link_to_entity(store: &mut LiteratureStore, args: Value) -> Outcome {
    let args: LinkArgs = parse_args(args)?;
    let source_ref = args.source.to_ref().map_err(store_error)?;
    let relation_type: RelationType = args.relation_type.parse().map_err(store_error)?;

    store
        .link_to_entity(&source_ref, &args.entity_name, relation_type, args.description.as_deref())
        .map_err(store_error)?;

    Ok(json!({
        "source": source_ref.describe(),
        "entity_name": args.entity_name,
        "relation_type": relation_type,
        "description": args.description,
    }))
}

fn get_entity_sources(store: &mut LiteratureStore, args: Value) -> Outcome {
    let args: EntityArgs = parse_args(args)?;
    let sources = store.get_entity_sources(&args.entity_name).map_err(store_error)?;
    Ok(json!({ "entity_name": args.entity_name, "sources": sources }))
}

fn list_sources(store: &mut LiteratureStore, args: Value) -> Outcome {
    let args: ListArgs = parse_args(args)?;
    let filter = SourceFilter {
        source_type: args.source_type.as_deref().map(str::parse).transpose().map_err(store_error)?,
        status: args.status.as_deref().map(str::parse).transpose().map_err(store_error)?,
        limit: Some(args.limit.unwrap_or(DEFAULT_LIST_LIMIT)),
    };

    let sources = store.list_sources(&filter).map_err(store_error)?;
    Ok(json!({ "count": sources.len(), "sources": sources }))
}

fn search_sources(store: &mut LiteratureStore, args: Value) -> Outcome {
    let args: SearchArgs = parse_args(args)?;
    let limit = args.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);

    let sources = store.search_sources(&args.query, Some(limit)).map_err(store_error)?;
    Ok(json!({ "query": args.query, "count": sources.len(), "sources": sources }))
}

fn get_source_details(store: &mut LiteratureStore, args: Value) -> Outcome {
    let args: RefArgs = parse_args(args)?;
    let source_ref = args.to_ref().map_err(store_error)?;
    let details = store.get_source_details(&source_ref).map_err(store_error)?;
    Ok(json!(details))
}

fn help() -> Value {
    json!({
        "tools": {
            "add_source": "Add a new paper, book or other source with its first identifier",
            "add_identifier": "Attach another identifier to an existing source",
            "add_note": "Add a note to an existing source",
            "update_status": "Change the reading status",
            "link_to_entity": "Connect a source to a concept",
            "get_entity_sources": "Sources linked to a concept",
            "list_sources": "List sources with optional type/status filters",
            "search_sources": "Search sources by title",
            "get_source_details": "Everything known about one source",
            "database_stats": "Catalogue statistics"
        },
        "addressing": "Existing sources are named by title, source_type, identifier_type and identifier_value. Only the identifier is used to find the source.",
        "vocabulary": Vocabulary::current(),
        "example": {
            "tool": "add_source",
            "arguments": {
                "title": "Attention Is All You Need",
                "source_type": "paper",
                "identifier_type": "arxiv",
                "identifier_value": "1706.03762"
            }
        }
    })
}
