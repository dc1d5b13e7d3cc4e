//! Listing commands: show, edit and delete services.

use clap::Args;
use fys_client::DirectoryClient;
use fys_core::ServiceDraft;
use fys_sync::{App, SyncSnapshot};

/// Fields accepted by `edit`; anything left out is not sent.
#[derive(Debug, Clone, Default, Args)]
pub struct EditFields {
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long)]
    pub city: Option<String>,
    #[arg(long)]
    pub state: Option<String>,
    #[arg(long)]
    pub zip_code: Option<String>,
    #[arg(long, requires = "set_lng", allow_negative_numbers = true)]
    pub set_lat: Option<f64>,
    #[arg(long, requires = "set_lat", allow_negative_numbers = true)]
    pub set_lng: Option<f64>,
}

impl From<EditFields> for ServiceDraft {
    fn from(fields: EditFields) -> Self {
        Self {
            title: fields.title,
            description: fields.description,
            address: fields.address,
            city: fields.city,
            state: fields.state,
            zip_code: fields.zip_code,
            lat: fields.set_lat,
            lng: fields.set_lng,
        }
    }
}

/// Applies the optional filter overrides, waits for the engine to settle on
/// the resulting filter and prints the visible listings.
///
/// # Errors
///
/// Returns an error if the new distance cannot be persisted.
pub(crate) async fn run_list(
    app: &App<DirectoryClient>,
    distance: Option<&str>,
    search: Option<&str>,
) -> anyhow::Result<()> {
    if let Some(raw) = distance {
        app.filters().set_distance_str(raw)?;
    }
    if let Some(text) = search {
        app.filters().set_search(text);
    }

    let snapshot = settle(app).await;
    print_listing(&snapshot);
    Ok(())
}

/// Waits until the engine has caught up with the current filter and has no
/// fetch outstanding.
pub(crate) async fn settle(app: &App<DirectoryClient>) -> SyncSnapshot {
    let target = app.filters().get();
    let mut snapshots = app.engine().subscribe();
    let settled = snapshots
        .wait_for(|s| !s.loading && s.filter == target)
        .await
        .map(|s| s.clone());
    settled.unwrap_or_else(|_| app.snapshot())
}

pub(crate) fn print_listing(snapshot: &SyncSnapshot) {
    let filter = &snapshot.filter;
    let visible = snapshot.visible();
    println!(
        "{} of {} services within {} of {}{}",
        visible.len(),
        snapshot.records().len(),
        filter.distance,
        filter.center,
        if filter.search_text.is_empty() {
            String::new()
        } else {
            format!(" matching \"{}\"", filter.search_text)
        }
    );
    if visible.is_empty() {
        return;
    }

    println!();
    println!("{:<8}{:<32}{:<28}{:<16}ZIP", "ID", "TITLE", "ADDRESS", "CITY");
    for record in visible {
        println!(
            "{:<8}{:<32}{:<28}{:<16}{}",
            record.id,
            truncate(&record.title, 30),
            truncate(&record.address, 26),
            truncate(&record.city, 14),
            record.zip_code
        );
    }
}

pub(crate) fn print_map(snapshot: &SyncSnapshot) {
    let view = snapshot.map_view();
    println!("center {} zoom {}", view.center, view.zoom);
    for marker in &view.markers {
        println!("  #{:<6} {} {}", marker.id, marker.position, marker.title);
    }
}

fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() > max {
        format!("{}...", value.chars().take(max - 3).collect::<String>())
    } else {
        value.to_string()
    }
}

/// # Errors
///
/// Returns an error if the directory rejects the delete.
pub(crate) async fn run_delete(app: &App<DirectoryClient>, id: i64) -> anyhow::Result<()> {
    app.directory().delete_service(id).await?;
    println!("deleted service {id}");
    app.engine().refresh().await;
    Ok(())
}

/// # Errors
///
/// Returns an error if no field was given or the directory rejects the
/// update.
pub(crate) async fn run_edit(
    app: &App<DirectoryClient>,
    id: i64,
    fields: EditFields,
) -> anyhow::Result<()> {
    let draft = ServiceDraft::from(fields);
    if draft.is_empty() {
        anyhow::bail!("nothing to update; pass at least one field");
    }
    let updated = app.directory().update_service(id, &draft).await?;
    println!(
        "updated service {}: {} ({}, {})",
        updated.id, updated.title, updated.city, updated.location
    );
    app.engine().refresh().await;
    Ok(())
}
