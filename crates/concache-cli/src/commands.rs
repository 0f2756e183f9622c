use std::io::{self, BufRead};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use tracing::warn;

use concache_core::auth::TokenStore;
use concache_core::config::APP_NAME;
use concache_core::schema::{self, FieldKind};
use concache_core::storage::open_backend;
use concache_core::utils::format_age;
use concache_core::{ApiClient, Config, DataCache, NoopScheduler, Record, SyncError};

/// Build and hydrate the cache described by `config`.
pub async fn open_cache(config: &Config) -> Result<Arc<DataCache>> {
    let dir = config.cache_dir()?;
    let storage = open_backend(config.storage, dir.clone(), APP_NAME)
        .with_context(|| format!("Failed to open cache storage in {}", dir.display()))?;

    let mut client = ApiClient::new(config.api_base_url()?)?;
    match TokenStore::new(APP_NAME).load() {
        Ok(Some(token)) => client.set_token(Arc::new(token)),
        Ok(None) => {}
        Err(e) => warn!(error = %e, "Could not read access token, continuing signed out"),
    }

    let cache = DataCache::new(
        config.cache_options()?,
        storage,
        Arc::new(client),
        Arc::new(NoopScheduler),
    );
    cache.initialize().await.context("Failed to load the cache")?;
    Ok(cache)
}

pub async fn run(cache: &Arc<DataCache>, command: &str, args: &[String]) -> Result<()> {
    match (command, args) {
        ("sync", []) => sync(cache).await,
        ("status", []) => {
            status(cache);
            Ok(())
        }
        ("show", [field]) => show(cache, field),
        ("events", []) => {
            events(cache);
            Ok(())
        }
        ("search", [field, query @ ..]) if !query.is_empty() => search(cache, field, &query.join(" ")),
        ("hide", [event_id]) => {
            if !cache.events().contains(event_id) {
                warn!(event_id = %event_id, "Hiding an event that is not cached");
            }
            cache.hide_event(event_id).await?;
            println!("Hidden {event_id}");
            Ok(())
        }
        ("remind", [event_id]) => {
            let reminder = cache.add_event_reminder(event_id).await?;
            println!(
                "Reminder for {} at {}",
                reminder.record_id,
                reminder.date_scheduled_utc.format("%Y-%m-%d %H:%M UTC")
            );
            Ok(())
        }
        ("forget", [event_id]) => {
            if cache.remove_event_reminder(event_id).await? {
                println!("Reminder for {event_id} removed");
            } else {
                println!("No reminder for {event_id}");
            }
            Ok(())
        }
        ("reset", []) => {
            cache.reset().await?;
            println!("Cache cleared");
            Ok(())
        }
        _ => bail!("Unknown command or wrong arguments: {command} (see --help)"),
    }
}

pub fn token(action: &str, token: Option<&str>) -> Result<()> {
    let store = TokenStore::new(APP_NAME);
    match action {
        "set" => {
            let token = match token {
                Some(token) => token.to_string(),
                None => {
                    let mut line = String::new();
                    io::stdin().lock().read_line(&mut line)?;
                    line.trim().to_string()
                }
            };
            if token.is_empty() {
                bail!("Empty token");
            }
            store.store(&token)?;
            println!("Access token stored");
        }
        "clear" => {
            store.clear()?;
            println!("Access token removed");
        }
        other => bail!("Unknown token action: {other}"),
    }
    Ok(())
}

async fn sync(cache: &Arc<DataCache>) -> Result<()> {
    match cache.synchronize().await {
        Ok(report) => {
            println!("Updated {} collections", report.updated.len());
            for failure in &report.failures {
                println!("  {} failed: {}", failure.field, failure.message);
            }
            if !report.skipped.is_empty() {
                println!("Skipped (not signed in): {}", report.skipped.join(", "));
            }
            Ok(())
        }
        Err(SyncError::Unauthorized) => {
            bail!("Access token was rejected; store a new one with `concache token set`")
        }
        Err(e) => Err(e.into()),
    }
}

fn status(cache: &DataCache) {
    println!("Convention:  {}", cache.options().convention_id);
    match cache.last_synchronised() {
        Some(at) => println!("Last sync:   {}", format_age(at, Utc::now())),
        None => println!("Last sync:   never"),
    }
    let counts = [
        ("events", cache.events().len()),
        ("eventDays", cache.event_days().len()),
        ("eventRooms", cache.event_rooms().len()),
        ("eventTracks", cache.event_tracks().len()),
        ("dealers", cache.dealers().len()),
        ("announcements", cache.announcements().len()),
        ("images", cache.images().len()),
        ("maps", cache.maps().len()),
        ("knowledgeGroups", cache.knowledge_groups().len()),
        ("knowledgeEntries", cache.knowledge_entries().len()),
        ("artistAlley", cache.artist_alley().len()),
        ("communications", cache.communications().len()),
    ];
    for (name, count) in counts {
        println!("  {name:<18} {count}");
    }
    println!("Reminders:   {}", cache.notifications().len());

    let summary = cache.summary(Utc::now() + cache.settings().time_offset());
    println!("Announcements active: {}", summary.active_announcements);
    println!("Unread messages:      {}", summary.unread_communications);
    match summary.latest_event_change {
        Some(at) => println!("Events changed:       {}", format_age(at, Utc::now())),
        None => println!("Events changed:       never"),
    }
}

fn show(cache: &DataCache, field: &str) -> Result<()> {
    let raw = cache.raw_value(field)?;
    match serde_json::from_str::<serde_json::Value>(&raw) {
        Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        Err(_) => println!("{raw}"),
    }
    Ok(())
}

fn events(cache: &DataCache) {
    let settings = cache.settings();
    let now = Utc::now() + settings.time_offset();
    for event in cache
        .events()
        .iter()
        .filter(|e| e.start_date_time_utc >= now && !settings.is_event_hidden(&e.id))
    {
        let marker = if cache.has_reminder(&event.id) { "*" } else { " " };
        println!(
            "{} {}  {:<38} {}",
            marker,
            event.start_date_time_utc.format("%a %H:%M"),
            event.id,
            event.full_title()
        );
    }
}

fn search(cache: &DataCache, field: &str, query: &str) -> Result<()> {
    match field {
        "events" => print_matches(cache.events().search(query)),
        "dealers" => print_matches(cache.dealers().search(query)),
        "announcements" => print_matches(cache.announcements().search(query)),
        "knowledgeEntries" => print_matches(cache.knowledge_entries().search(query)),
        "artistAlley" => print_matches(cache.artist_alley().search(query)),
        other => {
            let known = schema::find_field(other).is_some_and(|spec| spec.kind == FieldKind::Entity);
            if known {
                bail!("{other} is not searchable");
            }
            bail!("Unknown collection: {other}");
        }
    }
    Ok(())
}

fn print_matches<T: Record>(matches: Vec<&T>) {
    if matches.is_empty() {
        println!("No matches");
    }
    for record in matches {
        let label = record.search_fields().first().copied().unwrap_or("");
        println!("{:<38} {}", record.id(), label);
    }
}
