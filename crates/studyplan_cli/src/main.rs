//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `studyplan_core` linkage without the Flutter runtime.
//! - With a database path, print per-column task counts of the stored board.

use studyplan_core::db::open_db;
use studyplan_core::service::study_store::column_counts;
use studyplan_core::{SqliteBlobRepository, StudyStore, SystemClock};

fn main() {
    println!("studyplan_core ping={}", studyplan_core::ping());
    println!("studyplan_core version={}", studyplan_core::core_version());

    let Some(db_path) = std::env::args().nth(1) else {
        return;
    };
    let conn = match open_db(&db_path) {
        Ok(conn) => conn,
        Err(err) => {
            eprintln!("failed to open `{db_path}`: {err}");
            std::process::exit(1);
        }
    };
    let store = StudyStore::open(SqliteBlobRepository::new(conn), SystemClock::shared());
    println!("subjects={}", store.subjects().len());
    for (status, count) in column_counts(store.data()) {
        println!("{status}={count}");
    }
}
