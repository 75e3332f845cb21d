//! Headless offline-sync binary.
//!
//! Downloads books for offline reading from the command line, without
//! the portal UI. Also lists and removes saved books.
//!
//! Usage:
//!   veda-portal-sync <code>...        download books
//!   veda-portal-sync --list           list saved books
//!   veda-portal-sync --remove <code>  remove saved books

use tracing_subscriber::EnvFilter;

use library_client::api::LibraryClient;
use veda_portal_lib::app::SharedState;
use veda_portal_lib::events;
use veda_portal_lib::inbox::NotificationInput;
use veda_portal_lib::services::offline_books::{OfflineBookService, format_bytes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("usage: veda-portal-sync <code>... | --list | --remove <code>...");
        std::process::exit(2);
    }

    let (db, config, dir) = veda_portal_lib::init_foundation()?;
    let state = SharedState::new(db.clone(), config.clone(), dir);

    let client = LibraryClient::new(config.api_base_url.clone(), config.api_token.clone());
    let service = OfflineBookService::new(client.clone(), db);

    match args[0].as_str() {
        "--list" => {
            let saved = service.get_saved_books();
            if saved.is_empty() {
                println!("No books saved offline");
                return Ok(());
            }
            for info in saved {
                println!(
                    "{:<12} {:<40} {:>4} chapters {:>6} verses {:>10}",
                    info.code,
                    info.name_en,
                    info.chapters_count,
                    info.verses_count,
                    format_bytes(info.size_bytes)
                );
            }
            println!("Total: {}", format_bytes(service.total_offline_size()));
        }
        "--remove" => {
            for code in &args[1..] {
                if service.remove_book(code) {
                    state.emit_event(
                        events::BOOK_REMOVED,
                        events::BookPayload { code: code.clone() },
                    );
                    println!("Removed {code}");
                }
            }
        }
        _ => {
            // Progress reporting: subscribe before starting so no
            // checkpoint is missed
            let mut progress = service.subscribe_progress();
            let progress_state = state.clone();
            tokio::spawn(async move {
                while let Ok(update) = progress.recv().await {
                    tracing::info!("[{}] {:>3}% {}", update.code, update.pct, update.status);
                    progress_state.emit_event(
                        events::SYNC_PROGRESS,
                        events::SyncProgressPayload {
                            code: update.code,
                            pct: update.pct,
                            status: update.status,
                        },
                    );
                }
            });

            let languages: Vec<&str> = config
                .offline_languages
                .iter()
                .map(String::as_str)
                .collect();

            let mut failures = 0;
            for code in &args {
                let book = match client.get_book_details(code).await {
                    Ok(book) => book,
                    Err(e) => {
                        tracing::error!("Failed to look up book {code}: {e}");
                        failures += 1;
                        continue;
                    }
                };

                if service.save_book_offline(&book, &languages).await {
                    state.emit_event(
                        events::BOOK_SAVED,
                        events::BookPayload { code: code.clone() },
                    );
                    state.notifications().add(NotificationInput {
                        kind: "library".into(),
                        title: "Book saved offline".into(),
                        body: book.name_en.clone(),
                        data: serde_json::json!({ "screen": "library", "book": code }),
                    });
                    println!("Saved {code} ({})", book.name_en);
                } else {
                    failures += 1;
                    eprintln!("Failed to save {code}");
                }
            }

            if failures > 0 {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
