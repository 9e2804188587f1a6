///! Resource commands: listing, detail, raw edits and actions

use super::Context;
use crate::api::Csrf;
use crate::output;
use anyhow::{Context as _, Result};
use arkdash_common::view::NamespaceScope;
use arkdash_common::{
    EndpointManager, Error, ObjectMeta, ObjectReference, RawResource, ResourceKind, ViewContext,
};
use clap::Subcommand;
use serde_json::Value;
use std::path::PathBuf;
use tabled::Tabled;

#[derive(Subcommand)]
pub enum UrlCommands {
    /// Collection URL of a kind
    List {
        kind: ResourceKind,
        #[arg(short, long)]
        namespace: Option<String>,
        #[arg(short = 'A', long)]
        all_namespaces: bool,
    },
    /// URL of one object
    Detail {
        kind: ResourceKind,
        name: String,
        #[arg(short, long)]
        namespace: Option<String>,
    },
    /// Canonical URL used to edit or delete one object
    Raw {
        kind: ResourceKind,
        name: String,
        #[arg(short, long)]
        namespace: Option<String>,
        #[arg(long)]
        id: Option<i64>,
    },
}

#[derive(Tabled)]
struct ObjectRow {
    name: String,
    namespace: String,
    tenant: String,
    status: String,
    age: String,
}

impl ObjectRow {
    fn from_value(item: &Value, now: chrono::DateTime<chrono::Utc>) -> Self {
        let meta: ObjectMeta = item
            .get("objectMeta")
            .cloned()
            .and_then(|m| serde_json::from_value(m).ok())
            .unwrap_or_default();

        Self {
            name: meta.name,
            namespace: meta.namespace.unwrap_or_else(|| "-".to_string()),
            tenant: meta.tenant.unwrap_or_else(|| "-".to_string()),
            status: output::colorize_status(&status_of(item)),
            age: output::format_age(meta.creation_timestamp, now),
        }
    }
}

/// Status text of a listed object, wherever the backend put it
fn status_of(item: &Value) -> String {
    let candidates = [
        item.get("status").and_then(Value::as_str),
        item.get("phase").and_then(Value::as_str),
        item.pointer("/podStatus/status").and_then(Value::as_str),
        item.pointer("/status/phase").and_then(Value::as_str),
        item.get("ready").and_then(Value::as_str),
    ];
    candidates
        .into_iter()
        .flatten()
        .next()
        .unwrap_or("-")
        .to_string()
}

/// Objects of a list response: the first array whose entries carry `objectMeta`
fn list_items(response: &Value) -> Vec<Value> {
    let Some(fields) = response.as_object() else {
        return Vec::new();
    };
    fields
        .values()
        .filter_map(Value::as_array)
        .find(|items| items.iter().any(|i| i.get("objectMeta").is_some()))
        .cloned()
        .unwrap_or_default()
}

/// Escape a user-supplied path segment
fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

fn scope<'a>(namespace: Option<&'a str>, all_namespaces: bool) -> NamespaceScope<'a> {
    match (namespace, all_namespaces) {
        (_, true) => NamespaceScope::All,
        (Some(ns), false) => NamespaceScope::Named(ns),
        (None, false) => NamespaceScope::Context,
    }
}

/// Metadata addressing one object for raw requests, with name and namespace escaped
fn object_meta(kind: ResourceKind, view: &ViewContext, name: &str, namespace: Option<String>, id: Option<i64>) -> ObjectMeta {
    let mut meta = ObjectMeta::named(segment(name));
    if kind.is_namespaced() {
        let namespace = namespace.unwrap_or_else(|| view.namespace.clone());
        meta = meta.in_namespace(segment(&namespace));
    }
    meta.tenant = Some(view.tenant.clone());
    meta.id = id;
    meta
}

fn raw_url(ctx: &Context, view: &ViewContext, kind: ResourceKind, meta: ObjectMeta) -> Result<String> {
    let raw = RawResource::new(&ctx.session);
    let object = ObjectReference::new(kind.as_str(), meta);
    match raw.url_of(&view.tenant, &object) {
        Err(Error::SelfOperation(name)) => {
            anyhow::bail!("Refusing to modify '{}': it is the signed-in user", name)
        }
        other => Ok(other?),
    }
}

pub async fn handle_get(
    ctx: &mut Context,
    kind: ResourceKind,
    name: Option<String>,
    namespace: Option<String>,
    all_namespaces: bool,
) -> Result<()> {
    ctx.require_login()?;
    let view = ctx.view();
    let endpoint = kind.default_endpoint();

    match name {
        Some(name) => {
            let namespace = namespace.as_deref().map(segment);
            let url = view.detail_url(&endpoint, namespace.as_deref(), &segment(&name))?;
            let object: Value = ctx.api.get(&url).await?;
            output::print_single(&object, ctx.format)?;
        }
        None => {
            let url = view.list_url(&endpoint, scope(namespace.as_deref(), all_namespaces));
            let response: Value = ctx.api.get(&url).await?;

            let now = chrono::Utc::now();
            let items = list_items(&response);
            let rows: Vec<ObjectRow> = items.iter().map(|i| ObjectRow::from_value(i, now)).collect();
            output::print_output(rows, &items, ctx.format)?;

            view.record(&ctx.session, kind);
            ctx.save()?;
        }
    }

    Ok(())
}

pub async fn handle_delete(
    ctx: &mut Context,
    kind: ResourceKind,
    name: String,
    namespace: Option<String>,
    id: Option<i64>,
    yes: bool,
) -> Result<()> {
    ctx.require_login()?;
    let view = ctx.view();
    let meta = object_meta(kind, &view, &name, namespace, id);
    let url = raw_url(ctx, &view, kind, meta)?;

    if !yes {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(format!("Delete {} '{}' in tenant '{}'?", kind, name, view.tenant))
            .default(false)
            .interact()?;
        if !confirmed {
            output::print_info("Aborted");
            return Ok(());
        }
    }

    ctx.api.delete(&url, Some(Csrf::new(&view.tenant, kind.as_str()))).await?;
    output::print_deleted(kind.as_str(), &name);
    Ok(())
}

pub async fn handle_edit(
    ctx: &mut Context,
    kind: ResourceKind,
    name: String,
    namespace: Option<String>,
    id: Option<i64>,
    file: PathBuf,
) -> Result<()> {
    ctx.require_login()?;
    let contents = std::fs::read_to_string(&file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let body: Value = match serde_json::from_str(&contents) {
        Ok(value) => value,
        Err(_) => serde_yaml::from_str(&contents)
            .with_context(|| format!("{} is neither JSON nor YAML", file.display()))?,
    };

    let view = ctx.view();
    let meta = object_meta(kind, &view, &name, namespace, id);
    let url = raw_url(ctx, &view, kind, meta)?;

    ctx.api
        .put_empty(&url, &body, &[], Some(Csrf::new(&view.tenant, kind.as_str())))
        .await?;
    output::print_success(&format!("{} '{}' updated", kind, name));
    Ok(())
}

pub async fn handle_scale(
    ctx: &mut Context,
    kind: ResourceKind,
    namespace: String,
    name: String,
    replicas: u32,
) -> Result<()> {
    ctx.require_login()?;
    let view = ctx.view();
    let url = EndpointManager::scale(Some(&view.tenant), kind.as_str(), &segment(&namespace), &segment(&name));

    ctx.api
        .put_empty(&url, &replicas, &[("scaleBy", replicas.to_string())], None)
        .await?;
    output::print_success(&format!("{} '{}' scaled to {}", kind, name, replicas));
    Ok(())
}

pub async fn handle_trigger(ctx: &mut Context, namespace: String, name: String) -> Result<()> {
    ctx.require_login()?;
    let url = EndpointManager::trigger(&segment(&namespace), &segment(&name));

    ctx.api.put_empty(&url, &serde_json::json!({}), &[], None).await?;
    output::print_success(&format!("cronjob '{}' triggered", name));
    Ok(())
}

/// Resolve a URL without contacting the backend
pub fn resolve_url(ctx: &mut Context, command: UrlCommands) -> Result<String> {
    let view = ctx.view();
    let url = match command {
        UrlCommands::List {
            kind,
            namespace,
            all_namespaces,
        } => view.list_url(&kind.default_endpoint(), scope(namespace.as_deref(), all_namespaces)),
        UrlCommands::Detail { kind, name, namespace } => {
            let namespace = namespace.as_deref().map(segment);
            view.detail_url(&kind.default_endpoint(), namespace.as_deref(), &segment(&name))?
        }
        UrlCommands::Raw {
            kind,
            name,
            namespace,
            id,
        } => {
            let meta = object_meta(kind, &view, &name, namespace, id);
            raw_url(ctx, &view, kind, meta)?
        }
    };
    Ok(url)
}

pub fn handle_url(ctx: &mut Context, command: UrlCommands) -> Result<()> {
    println!("{}", resolve_url(ctx, command)?);
    Ok(())
}
