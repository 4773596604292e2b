//! Dispatch for every memory subcommand (SPEC_FULL.md §10.5). Each function
//! resolves the db path, touches the process-wide store once, and prints
//! either JSON or a short human-readable line — the same underlying
//! `storage`/`sync`/`maintenance`/`filecache` calls the `tools` surface uses.

use crate::cli::{LinkCommands, ListArgs, SearchArgs, StoreArgs, TagCommands, UpdateArgs};
use crate::config::{self, Config};
use crate::error::{Error, Result};
use crate::model::{ListFilter, Memory, MemoryInput, MemoryPatch, Relationship, Scope};
use crate::storage::{self, Store};
use crate::{filecache, maintenance, sync};
use std::path::{Path, PathBuf};

fn parse_scope(scope: Option<&str>) -> Scope {
    match scope {
        Some("project") => Scope::Project,
        Some("global") => Scope::Global,
        _ => Scope::All,
    }
}

fn with_db<T>(db: Option<&PathBuf>, f: impl FnOnce(&mut Store) -> Result<T>) -> Result<T> {
    let path = config::resolve_db_path(db.cloned())?;
    storage::with_store(&path, f)
}

fn print_value<T: serde::Serialize>(value: &T, json: bool, human: impl FnOnce(&T) -> String) {
    if json {
        println!("{}", serde_json::to_string_pretty(value).unwrap_or_else(|e| e.to_string()));
    } else {
        println!("{}", human(value));
    }
}

fn memory_line(m: &Memory) -> String {
    format!("{}  [{}]  {}", m.id, m.category, m.content)
}

pub fn store(args: &StoreArgs, db: Option<&PathBuf>, global_project: Option<&str>, json: bool) -> Result<()> {
    let project_id = args.project_id.clone().or_else(|| global_project.map(str::to_string));
    let memory = with_db(db, |store| {
        store.insert(MemoryInput {
            content: args.content.clone(),
            category: args.category.clone(),
            session_id: args.session_id.clone(),
            project_id,
            source: args.source.clone(),
            tags: args.tags.clone(),
            global: args.global,
            force: args.force,
        })
    })?;
    print_value(&memory, json, |m| memory_line(m));
    Ok(())
}

pub fn search(args: &SearchArgs, db: Option<&PathBuf>, global_project: Option<&str>, json: bool) -> Result<()> {
    let cfg = Config::load();
    let project_id = args.project_id.clone().or_else(|| global_project.map(str::to_string));
    let limit = cfg.effective_search_limit(args.limit);
    let results = with_db(db, |store| {
        store.search(&args.query, parse_scope(args.scope.as_deref()), project_id.as_deref(), limit)
    })?;
    if json {
        println!("{}", serde_json::to_string_pretty(&results).unwrap_or_default());
    } else if results.is_empty() {
        println!("No memories matched.");
    } else {
        for m in &results {
            println!("{}", memory_line(m));
        }
    }
    Ok(())
}

pub fn update(args: &UpdateArgs, db: Option<&PathBuf>, json: bool) -> Result<()> {
    let project_id = args.project_id.as_ref().map(|p| if p.is_empty() { None } else { Some(p.clone()) });
    let result = with_db(db, |store| {
        store.update(
            &args.id,
            MemoryPatch {
                content: args.content.clone(),
                category: args.category.clone(),
                source: args.source.clone(),
                session_id: args.session_id.clone(),
                project_id,
            },
        )
    })?;
    match result {
        Some(memory) => {
            print_value(&memory, json, |m| memory_line(m));
            Ok(())
        }
        None => Err(Error::NotFound { kind: "memory", id: args.id.clone() }),
    }
}

pub fn delete(id: &str, db: Option<&PathBuf>, json: bool) -> Result<()> {
    let deleted = with_db(db, |store| store.delete(id))?;
    print_value(&serde_json::json!({ "id": id, "deleted": deleted }), json, |_| {
        if deleted { format!("Deleted {id}") } else { format!("No such memory: {id}") }
    });
    Ok(())
}

pub fn list(args: &ListArgs, db: Option<&PathBuf>, global_project: Option<&str>, json: bool) -> Result<()> {
    let project_id = args.project_id.clone().or_else(|| global_project.map(str::to_string));
    let memories = with_db(db, |store| {
        store.list(ListFilter {
            category: args.category.clone(),
            project_id,
            session_id: args.session_id.clone(),
            scope: parse_scope(args.scope.as_deref()),
            limit: args.limit.unwrap_or_else(ListFilter::default_limit),
        })
    })?;
    if json {
        println!("{}", serde_json::to_string_pretty(&memories).unwrap_or_default());
    } else if memories.is_empty() {
        println!("No memories found.");
    } else {
        for m in &memories {
            println!("{}", memory_line(m));
        }
    }
    Ok(())
}

pub fn stats(db: Option<&PathBuf>, json: bool) -> Result<()> {
    let report = with_db(db, |store| store.stats())?;
    print_value(&report, json, |r| {
        let mut lines = vec![format!("total: {}", r.total)];
        for (category, count) in &r.by_category {
            lines.push(format!("  {category}: {count}"));
        }
        lines.join("\n")
    });
    Ok(())
}

pub fn refresh(id: &str, db: Option<&PathBuf>, json: bool) -> Result<()> {
    let result = with_db(db, |store| store.refresh(id))?;
    match result {
        Some(memory) => {
            print_value(&memory, json, |m| memory_line(m));
            Ok(())
        }
        None => Err(Error::NotFound { kind: "memory", id: id.to_string() }),
    }
}

pub fn tag(command: &TagCommands, db: Option<&PathBuf>, json: bool) -> Result<()> {
    match command {
        TagCommands::Add { id, tags } => {
            let result = with_db(db, |store| store.tags_add(id, tags))?;
            print_value(&result, json, |t| t.join(", "));
        }
        TagCommands::Remove { id, tags } => {
            let result = with_db(db, |store| store.tags_remove(id, tags))?;
            print_value(&result, json, |t| t.join(", "));
        }
        TagCommands::Set { id, tags } => {
            let result = with_db(db, |store| store.tags_set(id, tags))?;
            print_value(&result, json, |t| t.join(", "));
        }
        TagCommands::List { id } => {
            let result = with_db(db, |store| store.tags_get(id))?;
            print_value(&result, json, |t| t.join(", "));
        }
        TagCommands::ListAll => {
            let result = with_db(db, |store| store.tags_list_all())?;
            print_value(&result, json, |counts| {
                counts.iter().map(|c| format!("{} ({})", c.tag, c.count)).collect::<Vec<_>>().join("\n")
            });
        }
        TagCommands::Search { tag, project_id, limit } => {
            let project_id = project_id.clone();
            let result = with_db(db, |store| store.search_by_tag(tag, project_id.as_deref(), *limit))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result).unwrap_or_default());
            } else {
                for m in &result {
                    println!("{}", memory_line(m));
                }
            }
        }
    }
    Ok(())
}

fn require_relationship(raw: &str) -> Result<Relationship> {
    Relationship::from_str_opt(raw).ok_or_else(|| {
        Error::Validation(format!("unknown link relationship: {raw} (expected related, supersedes, contradicts, or extends)"))
    })
}

pub fn link(command: &LinkCommands, db: Option<&PathBuf>, json: bool) -> Result<()> {
    match command {
        LinkCommands::Add { source, target, relationship } => {
            let rel = require_relationship(relationship)?;
            let source = source.clone();
            let target = target.clone();
            let linked = with_db(db, move |store| store.link_add(&source, &target, rel))?;
            print_value(&serde_json::json!({ "linked": linked }), json, |_| {
                if linked { "linked".to_string() } else { "not linked (missing id or self-link)".to_string() }
            });
        }
        LinkCommands::Remove { source, target } => {
            let source = source.clone();
            let target = target.clone();
            let removed = with_db(db, move |store| store.link_remove(&source, &target))?;
            print_value(&serde_json::json!({ "removed": removed }), json, |_| removed.to_string());
        }
        LinkCommands::List { id } => {
            let edges = with_db(db, |store| store.link_list(id))?;
            print_value(&edges, json, |edges| {
                edges
                    .iter()
                    .map(|e| {
                        let arrow = if e.outgoing { "->" } else { "<-" };
                        format!("{arrow} {} ({})", e.other_id, e.relationship.as_str())
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            });
        }
    }
    Ok(())
}

pub fn cleanup(purge_days: Option<i64>, vacuum: bool, db: Option<&PathBuf>, json: bool) -> Result<()> {
    let report = with_db(db, |store| -> Result<_> {
        let cfg = Config::load();
        if let Some(days) = purge_days {
            maintenance::purge(store, days)?;
        }
        if vacuum {
            store.vacuum()?;
        }
        Ok(maintenance::run(store, cfg.max_memories))
    })?;
    print_value(&report, json, |r| format!("{r:?}"));
    Ok(())
}

pub fn export(out: Option<&Path>, db: Option<&PathBuf>) -> Result<()> {
    let document = with_db(db, |store| sync::export_all(store))?;
    let payload = serde_json::to_string_pretty(&document)?;
    match out {
        Some(path) => sync::file::atomic_write(path, &payload)?,
        None => println!("{payload}"),
    }
    Ok(())
}

pub fn import(input: Option<&Path>, db: Option<&PathBuf>, json: bool) -> Result<()> {
    let raw = match input {
        Some(path) => std::fs::read_to_string(path)?,
        None => std::io::read_to_string(std::io::stdin())?,
    };
    let document = serde_json::from_str(&raw)?;
    let stats = with_db(db, |store| sync::import_all(store, &document))?;
    print_value(&stats, json, |s| {
        format!("inserted: {}, skipped: {}, links restored: {}", s.inserted, s.skipped_existing, s.links_restored)
    });
    Ok(())
}

pub fn file_check(path: &str, project_id: Option<&str>, db: Option<&PathBuf>, json: bool) -> Result<()> {
    let project_id = project_id.map(str::to_string);
    let path_owned = path.to_string();
    let result = with_db(db, move |store| filecache::check_freshness(store, &path_owned, project_id.as_deref()))?;
    match result {
        Some(check) => {
            print_value(&check, json, |c| format!("fresh: {}", c.fresh));
            Ok(())
        }
        None => {
            print_value(&serde_json::json!({ "fresh": null, "stored_content": null }), json, |_| {
                "no cache entry for this path".to_string()
            });
            Ok(())
        }
    }
}
